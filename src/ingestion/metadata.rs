// ABOUTME: Flattens a property into vector-store metadata with explicit defaults
// ABOUTME: Every key is always present and every value is a primitive or a string list
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::vector_store::MAX_METADATA_TEXT_CHARS;
use crate::listings::{Address, Details, Price, Property, Rooms};
use crate::vector_store::{Metadata, MetadataValue};

/// Placeholder for absent categorical fields
const UNKNOWN: &str = "unknown";

/// Flat metadata for `property`.
///
/// Missing strings become `""` (or `"unknown"` for categories), missing
/// numbers `0` and missing flags `false`, so filters never meet a null.
#[must_use]
pub fn build_metadata(property: &Property, text: &str, captions: &[String]) -> Metadata {
    let mut metadata = Metadata::new();
    let mut put = |key: &str, value: MetadataValue| {
        metadata.insert(key.to_owned(), value);
    };

    put("property_id", property.id.as_str().into());
    put("title", or_empty(property.title.as_deref()));
    put("reference", or_empty(property.reference.as_deref()));
    put("property_type", or_unknown(property.property_type.as_deref()));
    put("status", or_unknown(property.status.as_deref()));
    put("listing_type", or_unknown(property.listing_type.as_deref()));
    put("created_at", or_empty(property.created_at.as_deref()));

    let price = property.price.clone().unwrap_or_default();
    put_price(&mut put, &price);

    let address = property.address.clone().unwrap_or_default();
    put_address(&mut put, &address);

    let rooms = property.rooms.clone().unwrap_or_default();
    put_rooms(&mut put, &rooms);

    let details = property.details.clone().unwrap_or_default();
    put_details(&mut put, &details);

    put(
        "features",
        MetadataValue::List(
            property
                .features
                .iter()
                .filter(|f| !f.trim().is_empty())
                .cloned()
                .collect(),
        ),
    );
    put(
        "image_urls",
        MetadataValue::List(property.files.iter().map(|f| f.url.clone()).collect()),
    );
    put("image_captions", MetadataValue::List(captions.to_vec()));
    put("text", truncate_chars(text, MAX_METADATA_TEXT_CHARS).into());

    metadata
}

fn put_price(put: &mut impl FnMut(&str, MetadataValue), price: &Price) {
    put("price", price.amount.unwrap_or(0.0).into());
    put("currency", or_empty(price.currency.as_deref()));
}

fn put_address(put: &mut impl FnMut(&str, MetadataValue), address: &Address) {
    put("address", address.display_line().unwrap_or_default().into());
    put("city", or_empty(address.city.as_deref()));
    put("region", or_empty(address.region.as_deref()));
    put("postal_code", or_empty(address.postal_code.as_deref()));
    put("country", or_empty(address.country.as_deref()));
    put("latitude", address.latitude.unwrap_or(0.0).into());
    put("longitude", address.longitude.unwrap_or(0.0).into());
}

fn put_rooms(put: &mut impl FnMut(&str, MetadataValue), rooms: &Rooms) {
    put("bedrooms", rooms.bedrooms.unwrap_or(0).into());
    put("bathrooms", rooms.bathrooms.unwrap_or(0.0).into());
    put("rooms", rooms.total.unwrap_or(0).into());
}

fn put_details(put: &mut impl FnMut(&str, MetadataValue), details: &Details) {
    put("living_area", details.living_area.unwrap_or(0.0).into());
    put("plot_area", details.plot_area.unwrap_or(0.0).into());
    put("year_built", details.year_built.unwrap_or(0).into());
    put("floors", details.floors.unwrap_or(0).into());
    put("parking_spaces", details.parking_spaces.unwrap_or(0).into());
    put("energy_label", or_empty(details.energy_label.as_deref()));
    put("heating", or_empty(details.heating.as_deref()));
    put("condition", or_empty(details.condition.as_deref()));
    put("garden", details.garden.unwrap_or(false).into());
    put("balcony", details.balcony.unwrap_or(false).into());
    put("pool", details.pool.unwrap_or(false).into());
    put("elevator", details.elevator.unwrap_or(false).into());
    put("furnished", details.furnished.unwrap_or(false).into());
    put("pets_allowed", details.pets_allowed.unwrap_or(false).into());
}

fn or_empty(value: Option<&str>) -> MetadataValue {
    MetadataValue::Text(value.unwrap_or_default().to_owned())
}

fn or_unknown(value: Option<&str>) -> MetadataValue {
    MetadataValue::Text(
        value
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(UNKNOWN)
            .to_owned(),
    )
}

/// First `max` characters of `text`, on a character boundary
fn truncate_chars(text: &str, max: usize) -> &str {
    text.char_indices()
        .nth(max)
        .map_or(text, |(index, _)| &text[..index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_property_gets_defaults() {
        let property: Property = serde_json::from_value(json!({"id": "p1"})).unwrap();
        let metadata = build_metadata(&property, "Property p1", &[]);

        assert_eq!(metadata["property_id"], MetadataValue::Text("p1".to_owned()));
        assert_eq!(metadata["property_type"], MetadataValue::Text("unknown".to_owned()));
        assert_eq!(metadata["price"], MetadataValue::Number(0.0));
        assert_eq!(metadata["garden"], MetadataValue::Bool(false));
        assert_eq!(metadata["features"], MetadataValue::List(Vec::new()));

        let json = serde_json::to_value(&metadata).unwrap();
        assert!(json.as_object().unwrap().values().all(|v| !v.is_null()));
    }

    #[test]
    fn test_text_is_truncated_on_char_boundary() {
        let text = "é".repeat(MAX_METADATA_TEXT_CHARS + 10);
        let property: Property = serde_json::from_value(json!({"id": 1})).unwrap();
        let metadata = build_metadata(&property, &text, &[]);
        let MetadataValue::Text(stored) = &metadata["text"] else {
            panic!("text must be a string");
        };
        assert_eq!(stored.chars().count(), MAX_METADATA_TEXT_CHARS);
    }

    #[test]
    fn test_present_values_are_kept() {
        let property: Property = serde_json::from_value(json!({
            "id": "p2",
            "price": {"amount": 99000.0, "currency": "EUR"},
            "address": {"city": "Braga", "latitude": 41.55},
            "rooms": {"bedrooms": 4},
            "details": {"pool": true}
        }))
        .unwrap();
        let metadata = build_metadata(&property, "", &["a caption".to_owned()]);

        assert_eq!(metadata["price"], MetadataValue::Number(99000.0));
        assert_eq!(metadata["city"], MetadataValue::Text("Braga".to_owned()));
        assert_eq!(metadata["bedrooms"], MetadataValue::Number(4.0));
        assert_eq!(metadata["pool"], MetadataValue::Bool(true));
        assert_eq!(
            metadata["image_captions"],
            MetadataValue::List(vec!["a caption".to_owned()])
        );
    }
}
