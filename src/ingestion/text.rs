// ABOUTME: Builds the descriptive text blob that is embedded for each property
// ABOUTME: Deterministic line-per-fact layout; absent attributes produce no line
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::ingestion::CAPTION_UNAVAILABLE;
use crate::listings::Property;

/// Compose the embedding input for `property`.
///
/// Order: identity, location, price, rooms, construction details, features,
/// description, image captions. The sentinel caption is left out.
#[must_use]
pub fn build_property_text(property: &Property, captions: &[String]) -> String {
    let mut lines: Vec<String> = Vec::new();

    // Identity
    match property.title.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(title) => lines.push(format!("Property {}: {}", property.id, title.trim())),
        None => lines.push(format!("Property {}", property.id)),
    }
    push_field(&mut lines, "Reference", property.reference.as_deref());
    push_field(&mut lines, "Type", property.property_type.as_deref());
    push_field(&mut lines, "Listing", property.listing_type.as_deref());
    push_field(&mut lines, "Status", property.status.as_deref());

    // Location
    if let Some(address) = &property.address {
        if let Some(line) = address.display_line() {
            lines.push(format!("Location: {line}"));
        }
        if let (Some(lat), Some(lon)) = (address.latitude, address.longitude) {
            lines.push(format!("Coordinates: {lat:.5}, {lon:.5}"));
        }
    }

    if let Some(amount) = property.price.as_ref().and_then(|p| p.amount) {
        let currency = property
            .price
            .as_ref()
            .and_then(|p| p.currency.as_deref())
            .unwrap_or_default();
        lines.push(format!("Price: {amount:.0} {currency}").trim_end().to_owned());
    }

    // Rooms
    if let Some(rooms) = &property.rooms {
        push_count(&mut lines, "Bedrooms", rooms.bedrooms);
        if let Some(bathrooms) = rooms.bathrooms {
            lines.push(format!("Bathrooms: {bathrooms}"));
        }
        push_count(&mut lines, "Rooms", rooms.total);
    }

    // Construction details
    let mut flags: Vec<String> = Vec::new();
    if let Some(details) = &property.details {
        if let Some(area) = details.living_area {
            lines.push(format!("Living area: {area:.0} m2"));
        }
        if let Some(area) = details.plot_area {
            lines.push(format!("Plot area: {area:.0} m2"));
        }
        if let Some(year) = details.year_built {
            lines.push(format!("Year built: {year}"));
        }
        push_count(&mut lines, "Floors", details.floors);
        push_count(&mut lines, "Parking spaces", details.parking_spaces);
        push_field(&mut lines, "Energy label", details.energy_label.as_deref());
        push_field(&mut lines, "Heating", details.heating.as_deref());
        push_field(&mut lines, "Condition", details.condition.as_deref());
        flags.extend(details.enabled_flags().into_iter().map(str::to_owned));
    }

    flags.extend(
        property
            .features
            .iter()
            .map(String::as_str)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_owned),
    );
    if !flags.is_empty() {
        lines.push(format!("Features: {}", flags.join(", ")));
    }

    push_field(&mut lines, "Description", property.description.as_deref());

    let described: Vec<&str> = captions
        .iter()
        .map(String::as_str)
        .filter(|c| *c != CAPTION_UNAVAILABLE && !c.trim().is_empty())
        .collect();
    if !described.is_empty() {
        let items: Vec<String> = described
            .iter()
            .map(|caption| format!("- {}", caption.trim()))
            .collect();
        lines.push(format!("Images:\n{}", items.join("\n")));
    }

    lines.join("\n")
}

fn push_field(lines: &mut Vec<String>, label: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        lines.push(format!("{label}: {value}"));
    }
}

fn push_count(lines: &mut Vec<String>, label: &str, value: Option<u32>) {
    if let Some(value) = value {
        lines.push(format!("{label}: {value}"));
    }
}
