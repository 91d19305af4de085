//! Vehicle model decoding.
//!
//! Rail vehicles report a single code or name that maps through the
//! rolling-stock table. Buses report a tilde-delimited
//! `chassisMfr~chassis~bodyMfr~body` descriptor; a couple of chassis
//! codes additionally imply attribute tags.

use super::entity::{BusModel, VehicleModel};

/// Rolling-stock table: feed code or name → (display name, fleet letter).
///
/// Passenger sets first, then freight and maintenance stock.
const ROLLING_STOCK: &[(&str, &str, &str)] = &[
    ("A", "Waratah Series 1", "A"),
    ("B", "Waratah Series 2", "B"),
    ("C", "C-Set", "C"),
    ("D", "Mariyung/NIF", "D"),
    ("H", "Oscar", "H"),
    ("J", "Hunter", "J"),
    ("Hunter Railcar", "Hunter", "J"),
    ("K", "K-Set", "K"),
    ("M", "Millenium", "M"),
    ("N", "Endeavour", "N"),
    ("Endeavour", "Endeavour", "N"),
    ("P", "Xplorer", "P"),
    ("Xplorer", "Xplorer", "P"),
    ("S", "S-Set", "S"),
    ("T", "Tangara", "T"),
    ("V", "Intercity V Set", "V"),
    ("X", "XPT", "X"),
    ("XPT", "XPT", "X"),
    ("Z", "Heritage", "Z"),
    ("G", "Freight", "G"),
    ("I", "Track Inspection", "I"),
    ("L", "Light Locomotive", "L"),
    ("O", "Other", "O"),
    ("Q", "Maintinence Track Machine", "Q"),
    ("U", "Track Occupation", "U"),
    ("W", "Fast Freight", "W"),
    ("Y", "Other", "Y"),
];

/// Articulated chassis codes.
const ARTICULATED_CHASSIS: &[&str] = &["B12BLEA"];

/// Electric chassis codes.
const ELECTRIC_CHASSIS: &[&str] = &["ZK6131HG1", "D9RA", "BYDK9", "ELEMENT"];

/// Map a rail model code through the rolling-stock table.
///
/// Unrecognised codes become `Unknown` but keep the raw code as the
/// letter so it still shows up in clients.
pub fn rolling_stock(code: &str) -> VehicleModel {
    match ROLLING_STOCK.iter().find(|(key, _, _)| *key == code) {
        Some((_, name, letter)) => VehicleModel::RollingStock {
            name: (*name).to_string(),
            letter: (*letter).to_string(),
        },
        None => VehicleModel::RollingStock {
            name: "Unknown".to_string(),
            letter: code.to_string(),
        },
    }
}

/// Decode a bus model descriptor, returning the model and any attribute
/// tags implied by the chassis code.
pub fn bus_model(descriptor: &str) -> (BusModel, Vec<String>) {
    let parts: Vec<&str> = descriptor.split('~').collect();
    let field = |i: usize| parts.get(i).map(|s: &&str| s.to_string());
    let model = BusModel {
        chassis_manufacturer: field(0),
        chassis: field(1),
        body_manufacturer: field(2),
        body: field(3),
    };

    let mut tags = Vec::new();
    if let Some(chassis) = model.chassis.as_deref() {
        if ARTICULATED_CHASSIS.contains(&chassis) {
            tags.push("Articulated Bus".to_string());
        }
        if ELECTRIC_CHASSIS.contains(&chassis) {
            tags.push("Electric Bus".to_string());
        }
    }
    (model, tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_rail_codes_resolve() {
        assert_eq!(
            rolling_stock("A"),
            VehicleModel::RollingStock {
                name: "Waratah Series 1".into(),
                letter: "A".into()
            }
        );
        assert_eq!(
            rolling_stock("T"),
            VehicleModel::RollingStock {
                name: "Tangara".into(),
                letter: "T".into()
            }
        );
    }

    #[test]
    fn full_names_alias_to_their_letter() {
        assert_eq!(
            rolling_stock("Hunter Railcar"),
            VehicleModel::RollingStock {
                name: "Hunter".into(),
                letter: "J".into()
            }
        );
        assert_eq!(
            rolling_stock("XPT"),
            VehicleModel::RollingStock {
                name: "XPT".into(),
                letter: "X".into()
            }
        );
    }

    #[test]
    fn non_revenue_codes_resolve() {
        assert_eq!(
            rolling_stock("U"),
            VehicleModel::RollingStock {
                name: "Track Occupation".into(),
                letter: "U".into()
            }
        );
    }

    #[test]
    fn unknown_code_keeps_raw_letter() {
        assert_eq!(
            rolling_stock("ZZ9"),
            VehicleModel::RollingStock {
                name: "Unknown".into(),
                letter: "ZZ9".into()
            }
        );
    }

    #[test]
    fn bus_descriptor_field_order() {
        let (model, tags) = bus_model("Volvo~B12BLE~Custom Coaches~CB60");
        assert_eq!(model.chassis_manufacturer.as_deref(), Some("Volvo"));
        assert_eq!(model.chassis.as_deref(), Some("B12BLE"));
        assert_eq!(model.body_manufacturer.as_deref(), Some("Custom Coaches"));
        assert_eq!(model.body.as_deref(), Some("CB60"));
        assert!(tags.is_empty());
    }

    #[test]
    fn articulated_chassis_tag() {
        let (_, tags) = bus_model("Volvo~B12BLEA~Custom Coaches~CB60");
        assert_eq!(tags, ["Articulated Bus"]);
    }

    #[test]
    fn electric_chassis_tag() {
        let (_, tags) = bus_model("Yutong~ZK6131HG1~Yutong~E12");
        assert_eq!(tags, ["Electric Bus"]);

        let (_, tags) = bus_model("BYD~BYDK9~Gemilang~Eco");
        assert_eq!(tags, ["Electric Bus"]);
    }

    #[test]
    fn short_descriptor_leaves_missing_fields_empty() {
        let (model, tags) = bus_model("unknown");
        assert_eq!(model.chassis_manufacturer.as_deref(), Some("unknown"));
        assert_eq!(model.chassis, None);
        assert_eq!(model.body, None);
        assert!(tags.is_empty());
    }
}
