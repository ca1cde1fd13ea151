use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// Wall-clock interval between simulation steps.
pub const SIMULATION_INTERVAL_MS: u32 = 50;
/// Approximate number of steps a simulation takes, whatever the path density.
pub const SIMULATION_TARGET_STEPS: usize = 300;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Car,
    Bus,
    Walk,
    Bike,
}

impl TravelMode {
    pub const ALL: [TravelMode; 4] = [Self::Car, Self::Bus, Self::Walk, Self::Bike];

    /// Nominal speed for modes whose duration is derived locally.
    pub fn nominal_speed_kmh(self) -> Option<f64> {
        match self {
            Self::Car => None,
            Self::Bus => Some(20.0),
            Self::Walk => Some(4.0),
            Self::Bike => Some(15.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Car => "🚗 차량",
            Self::Bus => "🚌 대중교통(예상)",
            Self::Walk => "🚶 도보",
            Self::Bike => "🚴 자전거",
        }
    }

    /// Walking paths are drawn dashed green; everything else solid blue.
    pub fn line_style(self) -> (&'static str, &'static str) {
        match self {
            Self::Walk => ("#28a745", "shortdash"),
            _ => ("#337cf4", "solid"),
        }
    }
}

/// Minutes for a route. Driving uses the router's duration; other modes divide the distance
/// (rounded to 0.1 km) by the nominal speed and round up.
pub fn eta_minutes(mode: TravelMode, distance_m: f64, driving_duration_s: f64) -> u32 {
    match mode.nominal_speed_kmh() {
        None => (driving_duration_s / 60.0).round().max(0.0) as u32,
        Some(speed) => {
            let km = (distance_m / 100.0).round() / 10.0;
            (km / speed * 60.0).ceil().max(0.0) as u32
        }
    }
}

pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        format!("{minutes}분")
    } else {
        format!("{}시간 {}분", minutes / 60, minutes % 60)
    }
}

pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1}km", meters / 1000.0)
    } else {
        format!("{}m", meters.round() as i64)
    }
}

/// Router response: `routes[0]` carries the summary and road geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    #[serde(default)]
    pub summary: Option<RouteSummary>,
    #[serde(default)]
    pub sections: Vec<RouteSection>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Metres.
    #[serde(default)]
    pub distance: f64,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSection {
    #[serde(default)]
    pub roads: Vec<RouteRoad>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteRoad {
    /// Flat `x, y, x, y, ...` (longitude, latitude) pairs.
    #[serde(default)]
    pub vertexes: Vec<f64>,
}

impl RouteResponse {
    pub fn summary(&self) -> Option<RouteSummary> {
        self.routes.first().and_then(|r| r.summary)
    }

    /// Decoded polyline of the first route, all sections concatenated.
    pub fn path(&self) -> Vec<LatLng> {
        let Some(route) = self.routes.first() else {
            return Vec::new();
        };
        route
            .sections
            .iter()
            .flat_map(|s| s.roads.iter())
            .flat_map(|road| {
                road.vertexes
                    .chunks_exact(2)
                    .map(|pair| LatLng::new(pair[1], pair[0]))
            })
            .collect()
    }
}

/// A computed route ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    pub mode: TravelMode,
    pub distance_m: f64,
    pub minutes: u32,
    pub path: Vec<LatLng>,
}

impl PlannedRoute {
    /// `None` when the router returned no summary or no geometry.
    pub fn from_response(mode: TravelMode, response: &RouteResponse) -> Option<Self> {
        let summary = response.summary()?;
        let path = response.path();
        if path.len() < 2 {
            return None;
        }
        Some(Self {
            mode,
            distance_m: summary.distance,
            minutes: eta_minutes(mode, summary.distance, summary.duration),
            path,
        })
    }

    pub fn duration_label(&self) -> String {
        format_duration(self.minutes)
    }

    pub fn distance_label(&self) -> String {
        format!("{:.1}km", self.distance_m / 1000.0)
    }
}

/// Points skipped per simulation step.
pub fn simulation_stride(path_len: usize) -> usize {
    (path_len / SIMULATION_TARGET_STEPS).max(1)
}

/// Walks a path at a fixed stride; yields each marker position, then `None` once finished.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationCursor {
    path: Vec<LatLng>,
    index: usize,
    stride: usize,
}

impl SimulationCursor {
    pub fn new(path: Vec<LatLng>) -> Self {
        let stride = simulation_stride(path.len());
        Self {
            path,
            index: 0,
            stride,
        }
    }

    pub fn start(&self) -> Option<LatLng> {
        self.path.first().copied()
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.path.len()
    }
}

impl Iterator for SimulationCursor {
    type Item = LatLng;

    fn next(&mut self) -> Option<LatLng> {
        let point = *self.path.get(self.index)?;
        self.index += self.stride;
        Some(point)
    }
}

/// Shelter suggestion from the recommendation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub facility_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub recommendation_type: String,
    #[serde(default)]
    pub distance_meter: f64,
    #[serde(default)]
    pub time_walk: i64,
    #[serde(default)]
    pub time_car: i64,
    #[serde(default)]
    pub operating_status: Option<String>,
    #[serde(default)]
    pub max_capacity: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationBadge {
    Best,
    Shortest,
    Plain,
}

impl RecommendationBadge {
    pub fn color_hex(self) -> &'static str {
        match self {
            Self::Best => "#28a745",
            Self::Shortest => "#fd7e14",
            Self::Plain => "#6c757d",
        }
    }
}

impl Recommendation {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    pub fn badge(&self) -> RecommendationBadge {
        if self.recommendation_type.contains("최적") {
            RecommendationBadge::Best
        } else if self.recommendation_type.contains("최단") {
            RecommendationBadge::Shortest
        } else {
            RecommendationBadge::Plain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walking_four_km_takes_an_hour() {
        let minutes = eta_minutes(TravelMode::Walk, 4000.0, 0.0);
        assert_eq!(minutes, 60);
        assert_eq!(format_duration(minutes), "1시간 0분");
    }

    #[test]
    fn derived_modes_round_distance_then_ceil() {
        // 1.04 km rounds to 1.0 km: 1.0 / 15 * 60 = 4.0
        assert_eq!(eta_minutes(TravelMode::Bike, 1040.0, 0.0), 4);
        // 1.06 km rounds to 1.1 km: 1.1 / 20 * 60 = 3.3 -> 4
        assert_eq!(eta_minutes(TravelMode::Bus, 1060.0, 0.0), 4);
    }

    #[test]
    fn driving_uses_router_duration() {
        assert_eq!(eta_minutes(TravelMode::Car, 50_000.0, 1710.0), 29);
        assert_eq!(eta_minutes(TravelMode::Car, 50_000.0, 1650.0), 28);
    }

    #[test]
    fn formats() {
        assert_eq!(format_duration(59), "59분");
        assert_eq!(format_duration(135), "2시간 15분");
        assert_eq!(format_distance(999.4), "999m");
        assert_eq!(format_distance(1250.0), "1.2km");
    }

    #[test]
    fn response_decodes_vertex_pairs() {
        let response: RouteResponse = serde_json::from_str(
            r#"{"routes":[{"summary":{"distance":1200,"duration":300},
                "sections":[{"roads":[{"vertexes":[127.0,37.0,127.1,37.1]},{"vertexes":[127.2,37.2]}]}]}]}"#,
        )
        .unwrap();
        let path = response.path();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], LatLng::new(37.0, 127.0));
        assert_eq!(path[2], LatLng::new(37.2, 127.2));

        let planned = PlannedRoute::from_response(TravelMode::Car, &response).unwrap();
        assert_eq!(planned.minutes, 5);
        assert_eq!(planned.distance_label(), "1.2km");
    }

    #[test]
    fn empty_response_plans_nothing() {
        assert!(PlannedRoute::from_response(TravelMode::Walk, &RouteResponse::default()).is_none());
    }

    #[test]
    fn stride_targets_three_hundred_steps() {
        assert_eq!(simulation_stride(0), 1);
        assert_eq!(simulation_stride(299), 1);
        assert_eq!(simulation_stride(900), 3);

        let path: Vec<LatLng> = (0..900).map(|i| LatLng::new(i as f64, 0.0)).collect();
        let mut cursor = SimulationCursor::new(path);
        let steps: Vec<LatLng> = cursor.by_ref().collect();
        assert_eq!(steps.len(), 300);
        assert_eq!(steps[1], LatLng::new(3.0, 0.0));
        assert!(cursor.is_finished());
    }

    #[test]
    fn recommendation_badges() {
        let mut rec: Recommendation = serde_json::from_str(
            r#"{"facilityId":1,"name":"대피소","type":"shelter","latitude":37.0,"longitude":127.0,
                "recommendationType":"최적 경로","distanceMeter":420.0,"timeWalk":6,"timeCar":2}"#,
        )
        .unwrap();
        assert_eq!(rec.badge(), RecommendationBadge::Best);
        rec.recommendation_type = "최단".to_string();
        assert_eq!(rec.badge(), RecommendationBadge::Shortest);
    }
}
