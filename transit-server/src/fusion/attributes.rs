//! Special-attribute tags.
//!
//! The feed packs four vehicle attributes into one integer; they decode
//! as independent bit flags. Buses additionally derive tags from their
//! already-resolved route.

use super::entity::RouteDescriptor;

const SPECIAL_LIVERY: i32 = 1 << 0;
const WI_FI: i32 = 1 << 1;
const CHRISTMAS_BUS: i32 = 1 << 2;
const SOCIAL_DISTANCING: i32 = 1 << 3;

/// Decode the special-vehicle-attributes mask into human-readable tags.
pub fn special_attribute_tags(mask: i32) -> Vec<String> {
    let mut tags = Vec::new();
    if mask & SOCIAL_DISTANCING != 0 {
        tags.push("Social Distancing".to_string());
    }
    if mask & CHRISTMAS_BUS != 0 {
        tags.push("Christmas Bus".to_string());
    }
    if mask & WI_FI != 0 {
        tags.push("Wi-Fi".to_string());
    }
    if mask & SPECIAL_LIVERY != 0 {
        tags.push("Special Livery".to_string());
    }
    tags
}

/// Derive bus attribute tags from the resolved route.
///
/// `urban` is true for the Sydney metropolitan bus feed; every other bus
/// feed is regional.
pub fn bus_route_tags(route: &RouteDescriptor, urban: bool) -> Vec<String> {
    let mut tags = Vec::new();
    let short_name = route.short_name.as_deref().unwrap_or("");
    let description = route.description.as_deref();

    // Route 535 runs as a temporary service without the usual naming.
    let penultimate_is_t = short_name
        .chars()
        .rev()
        .nth(1)
        .is_some_and(|c| c == 'T');
    if description == Some("Temporary Buses") || penultimate_is_t || short_name == "535" {
        tags.push("Temporary Bus".to_string());
    }
    if short_name.starts_with('M') {
        tags.push("Metro Bus".to_string());
    }
    if short_name.starts_with('N') {
        tags.push("NightRide".to_string());
    }
    if short_name.starts_with("SW") {
        tags.push("South West Link".to_string());
    }
    if urban {
        tags.push("Sydney Area Bus".to_string());
    } else {
        tags.push("Regional Bus".to_string());
    }
    if description == Some("School Buses") {
        tags.push("School Bus".to_string());
    }
    if short_name.contains('X') && description == Some("Sydney Buses Network") {
        tags.push("Express".to_string());
    }
    tags
}
