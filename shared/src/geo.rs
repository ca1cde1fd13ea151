use serde::{Deserialize, Serialize};

/// Seoul City Hall; used whenever no position is available.
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 37.566826,
    lng: 126.9786567,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a coordinate from optional wire fields, rejecting missing or non-finite values.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some(Self { lat, lng }),
            _ => None,
        }
    }

    /// `위도{lat}, 경도{lng}` style pair with four decimals, as used in SMS bodies.
    pub fn short_label(&self) -> (String, String) {
        (format!("{:.4}", self.lat), format!("{:.4}", self.lng))
    }
}

/// Viewport rectangle (south-west / north-east corners).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub sw: LatLng,
    pub ne: LatLng,
}

impl Bounds {
    pub fn new(sw: LatLng, ne: LatLng) -> Self {
        Self { sw, ne }
    }

    /// Smallest rectangle covering every point, or `None` for an empty input.
    pub fn covering<'a>(points: impl IntoIterator<Item = &'a LatLng>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self {
            sw: first,
            ne: first,
        };
        for p in iter {
            bounds.sw.lat = bounds.sw.lat.min(p.lat);
            bounds.sw.lng = bounds.sw.lng.min(p.lng);
            bounds.ne.lat = bounds.ne.lat.max(p.lat);
            bounds.ne.lng = bounds.ne.lng.max(p.lng);
        }
        Some(bounds)
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.sw.lat && p.lat <= self.ne.lat && p.lng >= self.sw.lng && p.lng <= self.ne.lng
    }

    /// Query-string fragment understood by the facility endpoint.
    pub fn query(&self) -> String {
        format!(
            "swLat={}&swLng={}&neLat={}&neLng={}",
            self.sw.lat, self.sw.lng, self.ne.lat, self.ne.lng
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covering_spans_all_points() {
        let points = [
            LatLng::new(37.5, 127.0),
            LatLng::new(37.4, 127.2),
            LatLng::new(37.6, 126.9),
        ];
        let bounds = Bounds::covering(&points).unwrap();
        assert_eq!(bounds.sw, LatLng::new(37.4, 126.9));
        assert_eq!(bounds.ne, LatLng::new(37.6, 127.2));
        assert!(points.iter().all(|p| bounds.contains(*p)));
    }

    #[test]
    fn covering_empty_is_none() {
        assert!(Bounds::covering(&[]).is_none());
    }

    #[test]
    fn from_parts_requires_both_coordinates() {
        assert!(LatLng::from_parts(Some(37.0), None).is_none());
        assert!(LatLng::from_parts(Some(f64::NAN), Some(127.0)).is_none());
        assert_eq!(
            LatLng::from_parts(Some(37.0), Some(127.0)),
            Some(LatLng::new(37.0, 127.0))
        );
    }

    #[test]
    fn query_lists_corners_in_order() {
        let bounds = Bounds::new(LatLng::new(1.0, 2.0), LatLng::new(3.0, 4.0));
        assert_eq!(bounds.query(), "swLat=1&swLng=2&neLat=3&neLng=4");
    }
}
