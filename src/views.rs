//! Server-rendered pages.

use serde::Serialize;
use tera::{Context, Tera};

use crate::geolocation::{CoordinateSource, EffectiveCoordinate};
use crate::models::{GeoPoint, RankedSchool, School};

/// Templates are compiled into the binary.
pub struct Views {
    tera: Tera,
}

#[derive(Serialize)]
struct SchoolRow<'a> {
    id: &'a str,
    name: &'a str,
    address: &'a str,
    latitude: f64,
    longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance_km: Option<f64>,
}

impl<'a> From<&'a School> for SchoolRow<'a> {
    fn from(school: &'a School) -> Self {
        Self {
            id: &school.id,
            name: &school.name,
            address: &school.address,
            latitude: school.latitude,
            longitude: school.longitude,
            distance_km: None,
        }
    }
}

impl<'a> From<&'a RankedSchool> for SchoolRow<'a> {
    fn from(ranked: &'a RankedSchool) -> Self {
        Self {
            distance_km: Some(ranked.distance_km),
            ..SchoolRow::from(&ranked.school)
        }
    }
}

#[derive(Serialize)]
struct ListContext<'a> {
    schools: Vec<SchoolRow<'a>>,
    ranked: bool,
    geolocated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<GeoPoint>,
}

impl Views {
    const LIST_SCHOOLS: &'static str = "list_schools.html";
    const ADD_SCHOOL: &'static str = "add_school.html";

    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                Self::LIST_SCHOOLS,
                include_str!("../templates/list_schools.html"),
            ),
            (Self::ADD_SCHOOL, include_str!("../templates/add_school.html")),
        ])?;
        Ok(Self { tera })
    }

    /// Plain collection, storage order
    pub fn list(&self, schools: &[School]) -> Result<String, tera::Error> {
        self.render_list(&ListContext {
            schools: schools.iter().map(SchoolRow::from).collect(),
            ranked: false,
            geolocated: false,
            origin: None,
        })
    }

    /// Collection ordered by distance from `origin`
    pub fn ranked(
        &self,
        origin: &EffectiveCoordinate,
        schools: &[RankedSchool],
    ) -> Result<String, tera::Error> {
        self.render_list(&ListContext {
            schools: schools.iter().map(SchoolRow::from).collect(),
            ranked: true,
            geolocated: origin.source == CoordinateSource::Geolocation,
            origin: Some(origin.point),
        })
    }

    pub fn add_form(&self) -> Result<String, tera::Error> {
        self.tera.render(Self::ADD_SCHOOL, &Context::new())
    }

    fn render_list(&self, context: &ListContext<'_>) -> Result<String, tera::Error> {
        let context = Context::from_serialize(context)?;
        self.tera.render(Self::LIST_SCHOOLS, &context)
    }
}
