//! School creation and plain listing.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CatalogError, FieldError, StoreError, ValidationError};
use crate::models::{School, MAX_LATITUDE, MAX_LONGITUDE};
use crate::store::SchoolStore;

/// A body field as posted: a JSON number, form or JSON text, or any other
/// JSON value (booleans, arrays, objects) that validation will reject
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Other(Value),
}

impl FieldValue {
    /// Finite float value; blank text counts as missing
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
            FieldValue::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Non-blank text; numbers are taken in their decimal form
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) if !s.trim().is_empty() => Some(s.clone()),
            FieldValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }

    fn to_json(&self) -> Value {
        match self {
            FieldValue::Number(n) => Value::from(*n),
            FieldValue::Text(s) => Value::from(s.as_str()),
            FieldValue::Other(v) => v.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

/// Raw create request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchoolInput {
    pub name: Option<FieldValue>,
    pub address: Option<FieldValue>,
    pub latitude: Option<FieldValue>,
    pub longitude: Option<FieldValue>,
}

/// Fields that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct NewSchool {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl SchoolInput {
    pub fn new(name: &str, address: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: Some(name.into()),
            address: Some(address.into()),
            latitude: Some(latitude.into()),
            longitude: Some(longitude.into()),
        }
    }

    /// Check every field, collecting all failures
    pub fn validate(&self) -> Result<NewSchool, ValidationError> {
        let mut errors = Vec::new();

        let name = required_text(&self.name, "name", "Name is required", &mut errors);
        let address = required_text(&self.address, "address", "Address is required", &mut errors);
        let latitude = float_in_range(
            &self.latitude,
            "latitude",
            MAX_LATITUDE,
            "Invalid latitude",
            &mut errors,
        );
        let longitude = float_in_range(
            &self.longitude,
            "longitude",
            MAX_LONGITUDE,
            "Invalid longitude",
            &mut errors,
        );

        match (name, address, latitude, longitude) {
            (Some(name), Some(address), Some(latitude), Some(longitude)) if errors.is_empty() => {
                Ok(NewSchool {
                    name,
                    address,
                    latitude,
                    longitude,
                })
            }
            _ => Err(ValidationError { errors }),
        }
    }
}

fn required_text(
    value: &Option<FieldValue>,
    path: &str,
    msg: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value.as_ref().and_then(FieldValue::as_text) {
        Some(text) => Some(text),
        None => {
            let raw = value.as_ref().map(FieldValue::to_json).unwrap_or(Value::Null);
            errors.push(FieldError::body(path, raw, msg));
            None
        }
    }
}

fn float_in_range(
    value: &Option<FieldValue>,
    path: &str,
    bound: f64,
    msg: &str,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    match value.as_ref().and_then(FieldValue::as_f64) {
        Some(v) if (-bound..=bound).contains(&v) => Some(v),
        _ => {
            let raw = value.as_ref().map(FieldValue::to_json).unwrap_or(Value::Null);
            errors.push(FieldError::body(path, raw, msg));
            None
        }
    }
}

/// Optional origin fields of a ranking request.
///
/// No range check here: whatever the client sends is ranked from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoordinateInput {
    pub latitude: Option<FieldValue>,
    pub longitude: Option<FieldValue>,
}

impl CoordinateInput {
    /// Blank or missing fields become `None`; unparseable text is rejected
    pub fn parse(&self) -> Result<(Option<f64>, Option<f64>), ValidationError> {
        let mut errors = Vec::new();
        let lat = optional_float(&self.latitude, "latitude", "Invalid latitude", &mut errors);
        let lon = optional_float(&self.longitude, "longitude", "Invalid longitude", &mut errors);

        if errors.is_empty() {
            Ok((lat, lon))
        } else {
            Err(ValidationError { errors })
        }
    }
}

fn optional_float(
    value: &Option<FieldValue>,
    path: &str,
    msg: &str,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    let value = value.as_ref().filter(|v| !v.is_blank())?;
    let parsed = value.as_f64();
    if parsed.is_none() {
        errors.push(FieldError::body(path, value.to_json(), msg));
    }
    parsed
}

pub struct SchoolCatalog {
    store: Arc<dyn SchoolStore>,
}

impl SchoolCatalog {
    pub fn new(store: Arc<dyn SchoolStore>) -> Self {
        Self { store }
    }

    /// Validate, assign a fresh id and persist. Returns the new id.
    pub async fn create(&self, input: &SchoolInput) -> Result<String, CatalogError> {
        let new = input.validate()?;

        let school = School {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            address: new.address,
            latitude: new.latitude,
            longitude: new.longitude,
        };

        self.store.insert(&school).await?;
        info!("Added school {} ({})", school.name, school.id);
        Ok(school.id)
    }

    pub async fn get(&self, id: &str) -> Result<Option<School>, StoreError> {
        self.store.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<School>, StoreError> {
        let schools = self.store.list().await?;
        debug!("Listed {} schools", schools.len());
        Ok(schools)
    }
}
