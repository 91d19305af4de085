//! Bounding-box filtering.

/// A latitude/longitude rectangle with exclusive bounds.
///
/// Defaults to the whole world, matching the query-parameter defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox {
            min_lat: -90.0,
            max_lat: 90.0,
            min_lng: -180.0,
            max_lng: 180.0,
        }
    }
}

impl BoundingBox {
    /// Build a box from optional query parameters, defaulting each
    /// missing bound to the whole world.
    pub fn from_query(
        min_lat: Option<f64>,
        max_lat: Option<f64>,
        min_lng: Option<f64>,
        max_lng: Option<f64>,
    ) -> Self {
        let whole = Self::default();
        BoundingBox {
            min_lat: min_lat.unwrap_or(whole.min_lat),
            max_lat: max_lat.unwrap_or(whole.max_lat),
            min_lng: min_lng.unwrap_or(whole.min_lng),
            max_lng: max_lng.unwrap_or(whole.max_lng),
        }
    }

    /// Whether a point falls strictly inside the box.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat > self.min_lat && lat < self.max_lat && lng > self.min_lng && lng < self.max_lng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sydney_vehicle_filtering() {
        // Vehicle at (-34, 151)
        let excluded = BoundingBox::from_query(Some(-33.0), None, None, None);
        assert!(!excluded.contains(-34.0, 151.0));

        let included = BoundingBox::from_query(Some(-35.0), Some(-33.0), None, None);
        assert!(included.contains(-34.0, 151.0));
    }

    #[test]
    fn bounds_are_exclusive() {
        let bbox = BoundingBox {
            min_lat: -35.0,
            max_lat: -33.0,
            min_lng: 150.0,
            max_lng: 152.0,
        };
        assert!(!bbox.contains(-35.0, 151.0));
        assert!(!bbox.contains(-33.0, 151.0));
        assert!(!bbox.contains(-34.0, 150.0));
        assert!(!bbox.contains(-34.0, 152.0));
        assert!(bbox.contains(-34.0, 151.0));
    }

    #[test]
    fn default_covers_everything_sensible() {
        let bbox = BoundingBox::default();
        assert!(bbox.contains(-33.87, 151.21));
        assert!(bbox.contains(51.5, -0.1));
    }
}
