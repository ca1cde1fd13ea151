use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// Facility categories the map can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityKind {
    Police,
    Fire,
    Hospital,
    Shelter,
}

impl FacilityKind {
    pub const ALL: [FacilityKind; 4] = [Self::Police, Self::Fire, Self::Hospital, Self::Shelter];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "police" => Some(Self::Police),
            "fire" => Some(Self::Fire),
            "hospital" => Some(Self::Hospital),
            "shelter" => Some(Self::Shelter),
            _ => None,
        }
    }

    /// Value of the `type` query parameter.
    pub fn key(self) -> &'static str {
        match self {
            Self::Police => "police",
            Self::Fire => "fire",
            Self::Hospital => "hospital",
            Self::Shelter => "shelter",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Police => "경찰서",
            Self::Fire => "소방서",
            Self::Hospital => "병원",
            Self::Shelter => "대피소",
        }
    }
}

/// Operating state derived from the free-text status reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingState {
    Open,
    /// Temporarily not operating (휴업, 일시중지).
    Resting,
    /// Permanently closed or licence cancelled (폐업, 취소).
    Closed,
}

impl OperatingState {
    pub fn classify(status: Option<&str>) -> Self {
        let Some(status) = status else {
            return Self::Open;
        };
        if status.contains("휴업") || status.contains("일시중지") {
            Self::Resting
        } else if status.contains("폐업") || status.contains("취소") {
            Self::Closed
        } else {
            Self::Open
        }
    }

    pub fn is_operating(self) -> bool {
        self == Self::Open
    }
}

/// Capacity band used for shelter icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShelterTier {
    Low,
    Mid,
    High,
}

impl ShelterTier {
    pub fn from_capacity(capacity: i64) -> Self {
        if capacity >= 1000 {
            Self::High
        } else if capacity >= 300 {
            Self::Mid
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerIcon {
    Police,
    Fire,
    Hospital,
    Shelter(ShelterTier),
    Resting,
    Default,
}

impl MarkerIcon {
    /// Closure state wins over type; shelters are tiered by capacity.
    pub fn select(kind: Option<FacilityKind>, state: OperatingState, capacity: i64) -> Self {
        match state {
            OperatingState::Resting => return Self::Resting,
            OperatingState::Closed => return Self::Default,
            OperatingState::Open => {}
        }
        match kind {
            Some(FacilityKind::Police) => Self::Police,
            Some(FacilityKind::Fire) => Self::Fire,
            Some(FacilityKind::Hospital) => Self::Hospital,
            Some(FacilityKind::Shelter) => Self::Shelter(ShelterTier::from_capacity(capacity)),
            None => Self::Default,
        }
    }

    pub fn image_path(self) -> &'static str {
        match self {
            Self::Police => "/img/markers/marker_police.png",
            Self::Fire => "/img/markers/marker_fire.png",
            Self::Hospital => "/img/markers/marker_hospital.png",
            Self::Shelter(ShelterTier::High) => "/img/markers/marker_shelter_high.png",
            Self::Shelter(ShelterTier::Mid) => "/img/markers/marker_shelter_mid.png",
            Self::Shelter(ShelterTier::Low) => "/img/markers/marker_shelter_low.png",
            Self::Resting => "/img/markers/marker_resting.png",
            Self::Default => "/img/markers/marker_default.png",
        }
    }
}

/// Row of the viewport facility query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityRecord {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub operating_status: Option<String>,
    #[serde(default)]
    pub max_capacity: Option<i64>,
}

/// A facility classified once at ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub id: i64,
    pub kind: Option<FacilityKind>,
    pub name: String,
    pub position: Option<LatLng>,
    pub state: OperatingState,
    pub status_text: Option<String>,
    pub capacity: i64,
    pub icon: MarkerIcon,
}

impl From<FacilityRecord> for Facility {
    fn from(record: FacilityRecord) -> Self {
        let kind = FacilityKind::parse(&record.kind);
        let state = OperatingState::classify(record.operating_status.as_deref());
        let capacity = record.max_capacity.unwrap_or(0);
        Self {
            id: record.id,
            kind,
            name: record.name,
            position: LatLng::from_parts(record.latitude, record.longitude),
            state,
            status_text: record.operating_status,
            capacity,
            icon: MarkerIcon::select(kind, state, capacity),
        }
    }
}

impl Facility {
    /// Status line of the detail overlay: text and CSS color.
    pub fn status_badge(&self) -> (String, &'static str) {
        match (self.state, self.status_text.as_deref()) {
            (OperatingState::Open, _) | (_, None) => ("운영중".to_string(), "#28a745"),
            (_, Some(raw)) => (raw.to_string(), "#d9534f"),
        }
    }

    pub fn capacity_label(&self) -> Option<String> {
        (self.kind == Some(FacilityKind::Shelter)).then(|| format!("수용: {}명", self.capacity))
    }
}

/// Union of the per-type detail payloads; absent fields are simply `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityDetail {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub road_address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub phone_number_hq: Option<String>,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub gubun: Option<String>,
    #[serde(default)]
    pub sido_cheong: Option<String>,
    #[serde(default)]
    pub operating_status: Option<String>,
    #[serde(default)]
    pub max_capacity: Option<i64>,
    #[serde(default)]
    pub area_m2: Option<f64>,
}

impl FacilityDetail {
    pub fn position(&self) -> Option<LatLng> {
        LatLng::from_parts(self.latitude, self.longitude)
    }

    pub fn phone(&self) -> Option<&str> {
        [&self.phone_number, &self.phone_number_hq]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .find(|p| !p.trim().is_empty())
    }

    /// Label/value rows for the detail panel, skipping empty fields.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = Vec::new();
        let mut push = |label: &'static str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                rows.push((label, value));
            }
        };
        push("주소", self.road_address.clone().or_else(|| self.address.clone()));
        push("전화", self.phone().map(str::to_string));
        push("구분", self.sub_type.clone().or_else(|| self.gubun.clone()));
        push("관할", self.sido_cheong.clone());
        push("상태", self.operating_status.clone());
        push("수용 인원", self.max_capacity.map(|c| format!("{c}명")));
        push("면적", self.area_m2.map(|a| format!("{a:.0}㎡")));
        rows
    }
}

/// Row of the keyword search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl SearchHit {
    pub fn type_label(&self) -> &str {
        FacilityKind::parse(&self.kind).map_or("시설", FacilityKind::label)
    }

    pub fn position(&self) -> Option<LatLng> {
        LatLng::from_parts(self.latitude, self.longitude)
    }
}
