//! Registry of monitored cities.
//!
//! `CITIES` may be configured either as a plain list of names or as a map of
//! name to `{ "lat": .., "lon": .. }`. Both shapes are normalized here so the
//! rest of the service only ever sees [`CityRegistry::list_cities`] and
//! [`CityRegistry::coordinates_for`].

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::models::Coordinates;

// ---

pub const DEFAULT_CITIES: &[&str] = &["Delhi", "Mumbai", "Chennai", "Bangalore", "Kolkata", "Hyderabad"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityConfig {
    pub name: String,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Default)]
pub struct CityRegistry {
    // ---
    cities: Vec<CityConfig>,
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl CityRegistry {
    // ---
    /// Parse the raw `CITIES` setting (JSON text).
    pub fn from_json_str(raw: &str) -> AppResult<Self> {
        // ---
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| AppError::Configuration(format!("CITIES is not valid JSON: {e}")))?;
        Self::from_value(&value)
    }

    /// Normalize either accepted shape into a registry.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        // ---
        let cities = match value {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(name) => Ok(CityConfig {
                        name: name.clone(),
                        coordinates: None,
                    }),
                    other => Err(AppError::Configuration(format!(
                        "CITIES list entries must be strings, got {other}"
                    ))),
                })
                .collect::<AppResult<Vec<_>>>()?,
            Value::Object(map) => map
                .iter()
                .map(|(name, coords)| {
                    Ok(CityConfig {
                        name: name.clone(),
                        coordinates: Some(parse_coordinates(name, coords)?),
                    })
                })
                .collect::<AppResult<Vec<_>>>()?,
            other => {
                return Err(AppError::Configuration(format!(
                    "CITIES must be a list of names or a map of name to coordinates, got {other}"
                )))
            }
        };

        Self::from_cities(cities)
    }

    pub fn from_names(names: &[&str]) -> AppResult<Self> {
        // ---
        Self::from_cities(
            names
                .iter()
                .map(|n| CityConfig {
                    name: n.to_string(),
                    coordinates: None,
                })
                .collect(),
        )
    }

    pub fn from_cities(cities: Vec<CityConfig>) -> AppResult<Self> {
        // ---
        let mut index = HashMap::with_capacity(cities.len());
        for (i, city) in cities.iter().enumerate() {
            if city.name.trim().is_empty() {
                return Err(AppError::Configuration("CITIES contains an empty city name".into()));
            }
            if index.insert(city.name.clone(), i).is_some() {
                return Err(AppError::Configuration(format!(
                    "CITIES contains duplicate city '{}'",
                    city.name
                )));
            }
        }

        let names = cities.iter().map(|c| c.name.clone()).collect();
        Ok(Self { cities, names, index })
    }

    /// Monitored city names in configured order.
    pub fn list_cities(&self) -> &[String] {
        &self.names
    }

    /// Coordinates for `city`, if the map form supplied them.
    pub fn coordinates_for(&self, city: &str) -> Option<Coordinates> {
        self.index.get(city).and_then(|&i| self.cities[i].coordinates)
    }

    pub fn cities(&self) -> &[CityConfig] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

fn parse_coordinates(name: &str, value: &Value) -> AppResult<Coordinates> {
    // ---
    let field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                AppError::Configuration(format!("CITIES entry '{name}' needs a numeric '{key}'"))
            })
    };

    Ok(Coordinates {
        lat: field("lat")?,
        lon: field("lon")?,
    })
}
