// ABOUTME: Property listing data model deserialized leniently from the listings API
// ABOUTME: Covers identity, address, price, rooms, construction details, features and media
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Listing records come from a third-party schema that omits fields freely,
//! sends numeric ids and renames collections between versions. Everything
//! beyond `id` is optional and collections default to empty.
//!
//! Numbers may arrive as strings or with fractions, collections may be
//! `null`. A record that still cannot be read is skipped on its own and the
//! rest of the page survives.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// MIME prefixes accepted for captioning
const SUPPORTED_IMAGE_MIME: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// File extensions accepted for captioning when no MIME type is given
const SUPPORTED_IMAGE_EXT: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

/// One page returned by the listings search
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListingsPage {
    /// Listings on this page that parsed
    pub properties: Vec<Property>,
    /// Records on this page, unreadable ones included
    #[serde(skip)]
    pub total_found: usize,
    /// Pagination block, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Value>,
}

impl ListingsPage {
    /// Parse a raw payload record by record
    ///
    /// The list is read from `properties` or `results`; a missing list is an
    /// empty page. Records that fail to parse are logged with their id and
    /// left out of `properties` but still counted in `total_found`.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload is not an object or the property
    /// list is not an array
    pub fn from_value(payload: Value) -> Result<Self, serde_json::Error> {
        let mut body = match payload {
            Value::Object(body) => body,
            other => {
                return Err(serde_json::Error::custom(format!(
                    "expected a JSON object, got {other}"
                )))
            }
        };

        let records = match body.remove("properties").or_else(|| body.remove("results")) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(records)) => records,
            Some(other) => {
                return Err(serde_json::Error::custom(format!(
                    "expected a property list, got {other}"
                )))
            }
        };

        let total_found = records.len();
        let properties = records.into_iter().filter_map(parse_record).collect();

        Ok(Self {
            properties,
            total_found,
            pagination: body.remove("pagination").filter(|value| !value.is_null()),
        })
    }

    /// Records that could not be parsed
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.total_found.saturating_sub(self.properties.len())
    }
}

fn parse_record(record: Value) -> Option<Property> {
    let id = match record.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => "unknown".to_owned(),
    };
    match serde_json::from_value::<Property>(record) {
        Ok(property) => Some(property),
        Err(e) => {
            warn!(property_id = %id, error = %e, "Skipping unreadable listing record");
            None
        }
    }
}

/// A property listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Listing id (numeric ids are stringified)
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Agency reference
    #[serde(default)]
    pub reference: Option<String>,
    /// Headline
    #[serde(default)]
    pub title: Option<String>,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// apartment, house, villa, ...
    #[serde(default, alias = "type")]
    pub property_type: Option<String>,
    /// available, sold, rented, ...
    #[serde(default)]
    pub status: Option<String>,
    /// sale or rent
    #[serde(default)]
    pub listing_type: Option<String>,
    /// Asking price
    #[serde(default)]
    pub price: Option<Price>,
    /// Location
    #[serde(default)]
    pub address: Option<Address>,
    /// Room counts
    #[serde(default)]
    pub rooms: Option<Rooms>,
    /// Construction details and feature flags
    #[serde(default)]
    pub details: Option<Details>,
    /// Amenities as free labels
    #[serde(default, alias = "amenities", deserialize_with = "null_as_empty")]
    pub features: Vec<String>,
    /// Attached files
    #[serde(default, alias = "media", deserialize_with = "null_as_empty")]
    pub files: Vec<MediaFile>,
    /// Creation timestamp as sent by the API
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Asking price
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in `currency`
    #[serde(default, deserialize_with = "lenient_number")]
    pub amount: Option<f64>,
    /// ISO currency code
    #[serde(default)]
    pub currency: Option<String>,
}

/// Postal address and coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// Street name
    #[serde(default)]
    pub street: Option<String>,
    /// House number
    #[serde(default)]
    pub house_number: Option<String>,
    /// Postal code
    #[serde(default, alias = "zip_code")]
    pub postal_code: Option<String>,
    /// City
    #[serde(default)]
    pub city: Option<String>,
    /// Region, state or province
    #[serde(default, alias = "state")]
    pub region: Option<String>,
    /// Country
    #[serde(default)]
    pub country: Option<String>,
    /// Latitude
    #[serde(default, deserialize_with = "lenient_number")]
    pub latitude: Option<f64>,
    /// Longitude
    #[serde(default, deserialize_with = "lenient_number")]
    pub longitude: Option<f64>,
}

impl Address {
    /// Address parts in display order, absent parts skipped
    #[must_use]
    pub fn display_line(&self) -> Option<String> {
        let street = match (&self.street, &self.house_number) {
            (Some(street), Some(number)) => Some(format!("{street} {number}")),
            (Some(street), None) => Some(street.clone()),
            _ => None,
        };
        let locality = match (&self.postal_code, &self.city) {
            (Some(code), Some(city)) => Some(format!("{code} {city}")),
            (None, Some(city)) => Some(city.clone()),
            (Some(code), None) => Some(code.clone()),
            (None, None) => None,
        };
        let parts: Vec<String> = [street, locality, self.region.clone(), self.country.clone()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

/// Room counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rooms {
    /// Bedrooms
    #[serde(default, deserialize_with = "lenient_count")]
    pub bedrooms: Option<u32>,
    /// Bathrooms, half baths included
    #[serde(default, deserialize_with = "lenient_number")]
    pub bathrooms: Option<f64>,
    /// All rooms
    #[serde(default, deserialize_with = "lenient_count")]
    pub total: Option<u32>,
}

/// Construction details and feature flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Details {
    /// Living area in square metres
    #[serde(default, deserialize_with = "lenient_number")]
    pub living_area: Option<f64>,
    /// Plot area in square metres
    #[serde(default, deserialize_with = "lenient_number")]
    pub plot_area: Option<f64>,
    /// Year of construction
    #[serde(default, deserialize_with = "lenient_year")]
    pub year_built: Option<i32>,
    /// Floors
    #[serde(default, deserialize_with = "lenient_count")]
    pub floors: Option<u32>,
    /// Energy label
    #[serde(default)]
    pub energy_label: Option<String>,
    /// Heating system
    #[serde(default)]
    pub heating: Option<String>,
    /// Condition
    #[serde(default)]
    pub condition: Option<String>,
    /// Parking spaces
    #[serde(default, deserialize_with = "lenient_count")]
    pub parking_spaces: Option<u32>,
    /// Garden
    #[serde(default)]
    pub garden: Option<bool>,
    /// Balcony or terrace
    #[serde(default)]
    pub balcony: Option<bool>,
    /// Swimming pool
    #[serde(default)]
    pub pool: Option<bool>,
    /// Elevator
    #[serde(default)]
    pub elevator: Option<bool>,
    /// Furnished
    #[serde(default)]
    pub furnished: Option<bool>,
    /// Pets allowed
    #[serde(default)]
    pub pets_allowed: Option<bool>,
}

impl Details {
    /// Names of the flags set to `true`
    #[must_use]
    pub fn enabled_flags(&self) -> Vec<&'static str> {
        [
            ("garden", self.garden),
            ("balcony", self.balcony),
            ("pool", self.pool),
            ("elevator", self.elevator),
            ("furnished", self.furnished),
            ("pets allowed", self.pets_allowed),
        ]
        .into_iter()
        .filter_map(|(name, flag)| (flag == Some(true)).then_some(name))
        .collect()
    }
}

/// An attached file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Public URL, empty when the API omits it
    #[serde(default)]
    pub url: String,
    /// image, floorplan, document, ...
    #[serde(default, rename = "type")]
    pub file_type: Option<String>,
    /// MIME type
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Display position
    #[serde(default, alias = "order", alias = "position")]
    pub sort: Option<i64>,
}

impl MediaFile {
    /// Whether this file is a photo the vision model can read
    #[must_use]
    pub fn is_supported_image(&self) -> bool {
        if self
            .file_type
            .as_deref()
            .is_some_and(|kind| !kind.eq_ignore_ascii_case("image") && !kind.eq_ignore_ascii_case("photo"))
        {
            return false;
        }

        if let Some(mime) = self.mime_type.as_deref() {
            let mime = mime.to_ascii_lowercase();
            return SUPPORTED_IMAGE_MIME.iter().any(|supported| mime == *supported);
        }

        let path = self
            .url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        self.file_type.is_some() || SUPPORTED_IMAGE_EXT.iter().any(|ext| path.ends_with(ext))
    }
}

impl Property {
    /// Supported images ordered by their sort field, at most `limit`
    #[must_use]
    pub fn caption_candidates(&self, limit: usize) -> Vec<&MediaFile> {
        let mut images: Vec<&MediaFile> = self
            .files
            .iter()
            .filter(|file| !file.url.trim().is_empty() && file.is_supported_image())
            .collect();
        images.sort_by_key(|file| file.sort.unwrap_or(i64::MAX));
        images.truncate(limit);
        images
    }
}

/// Accept `"42"` and `42` alike
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// `null` reads as an empty list
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Numbers or numeric strings; anything else reads as absent
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(numeric(&Value::deserialize(deserializer)?))
}

/// Non-negative counts, fractions rounded
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(numeric(&Value::deserialize(deserializer)?)
        .filter(|n| *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n.round() as u32))
}

#[allow(clippy::cast_possible_truncation)]
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(numeric(&Value::deserialize(deserializer)?)
        .filter(|n| n.abs() <= f64::from(i32::MAX))
        .map(|n| n.round() as i32))
}
