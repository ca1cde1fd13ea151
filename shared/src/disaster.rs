use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// Disaster categories. The backend sends a free-text key which is classified once here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisasterKind {
    Fire,
    Missile,
    Lightning,
    Quake,
    Typhoon,
    Heatwave,
    HeavyRain,
    Flood,
    Tsunami,
    Snow,
    ColdWave,
    Dust,
    Other,
}

/// Fill/stroke pair used for zone circles and polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneStyle {
    pub fill: &'static str,
    pub stroke: &'static str,
}

impl ZoneStyle {
    pub const FILL_OPACITY: f64 = 0.3;
    pub const STROKE_OPACITY: f64 = 0.8;
    pub const STROKE_WEIGHT: u32 = 2;
}

impl DisasterKind {
    /// Ordered for substring matching: earlier keys win.
    const KEYS: [(&'static str, DisasterKind); 12] = [
        ("fire", Self::Fire),
        ("missile", Self::Missile),
        ("lightning", Self::Lightning),
        ("quake", Self::Quake),
        ("typhoon", Self::Typhoon),
        ("heatwave", Self::Heatwave),
        ("heavyrain", Self::HeavyRain),
        ("flood", Self::Flood),
        ("tsunami", Self::Tsunami),
        ("snow", Self::Snow),
        ("coldwave", Self::ColdWave),
        ("dust", Self::Dust),
    ];

    const KOREAN_KEYWORDS: [(&'static str, DisasterKind); 6] = [
        ("화재", Self::Fire),
        ("산불", Self::Fire),
        ("호우", Self::HeavyRain),
        ("지진", Self::Quake),
        ("대설", Self::Snow),
        ("황사", Self::Dust),
    ];

    pub fn classify(raw: &str) -> Self {
        let key = raw.trim().to_ascii_lowercase();
        if let Some((_, kind)) = Self::KEYS.iter().find(|(k, _)| *k == key) {
            return *kind;
        }
        if let Some((_, kind)) = Self::KEYS.iter().find(|(k, _)| key.contains(k)) {
            return *kind;
        }
        if key.contains("heat") {
            return Self::Heatwave;
        }
        if key.contains("rain") || key.contains("water") {
            return Self::HeavyRain;
        }
        if key.contains("cold") {
            return Self::ColdWave;
        }
        Self::KOREAN_KEYWORDS
            .iter()
            .find(|(k, _)| raw.contains(k))
            .map_or(Self::Other, |(_, kind)| *kind)
    }

    /// Kinds an operator can simulate.
    pub fn simulatable() -> impl Iterator<Item = DisasterKind> {
        Self::KEYS.iter().map(|(_, kind)| *kind)
    }

    pub fn key(self) -> &'static str {
        Self::KEYS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map_or("etc", |(k, _)| k)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Fire => "🔥 화재/산불",
            Self::Missile => "🚀 미사일/공습",
            Self::Lightning => "⚡ 낙뢰",
            Self::Quake => "🌋 지진",
            Self::Typhoon => "🌀 태풍",
            Self::Heatwave => "☀️ 폭염",
            Self::HeavyRain => "🌧️ 호우/장마",
            Self::Tsunami => "🌊 해일",
            Self::Flood => "🌊 홍수",
            Self::Snow => "❄️ 대설",
            Self::ColdWave => "🥶 한파",
            Self::Dust => "🌫️ 황사/미세먼지",
            Self::Other => "⚠️ 재난 경보",
        }
    }

    pub fn icon_path(self) -> String {
        format!("/img/disaster/{}.png", self.key())
    }

    pub fn style(self) -> ZoneStyle {
        match self {
            Self::Fire | Self::Missile | Self::Heatwave => ZoneStyle {
                fill: "#FF0000",
                stroke: "#FF0000",
            },
            Self::HeavyRain | Self::Flood | Self::Tsunami => ZoneStyle {
                fill: "#0000FF",
                stroke: "#0000FF",
            },
            Self::Quake => ZoneStyle {
                fill: "#8B4513",
                stroke: "#D2691E",
            },
            Self::Snow | Self::ColdWave => ZoneStyle {
                fill: "#B0C4DE",
                stroke: "#778899",
            },
            Self::Dust => ZoneStyle {
                fill: "#FFD700",
                stroke: "#DAA520",
            },
            Self::Lightning | Self::Typhoon | Self::Other => ZoneStyle {
                fill: "#FFA500",
                stroke: "#FF8C00",
            },
        }
    }
}

/// Row of the active-zone poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisasterZoneRecord {
    pub id: i64,
    #[serde(default)]
    pub disaster_type: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub area_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_instant")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_instant")]
    pub expiry_time: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 strings or epoch seconds; anything else becomes `None` instead of
/// failing the whole poll.
fn lenient_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs.trunc() as i64, 0)),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisasterZone {
    pub id: i64,
    pub kind: DisasterKind,
    pub raw_type: String,
    pub center: Option<LatLng>,
    /// Metres; only set when the zone has a drawable circle.
    pub radius_m: Option<f64>,
    pub area_name: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<DisasterZoneRecord> for DisasterZone {
    fn from(record: DisasterZoneRecord) -> Self {
        let center = LatLng::from_parts(record.latitude, record.longitude);
        let radius_m = record.radius.filter(|r| *r > 0.0 && center.is_some());
        Self {
            id: record.id,
            kind: DisasterKind::classify(&record.disaster_type),
            raw_type: record.disaster_type,
            center,
            radius_m,
            area_name: record.area_name.filter(|a| !a.trim().is_empty()),
            starts_at: record.start_time,
            expires_at: record.expiry_time,
        }
    }
}

impl DisasterZone {
    /// Circle geometry when both a center and a positive radius are known.
    pub fn circle(&self) -> Option<(LatLng, f64)> {
        Some((self.center?, self.radius_m?))
    }

    pub fn alert_text(&self) -> String {
        let area = self.area_name.as_deref().unwrap_or("인근");
        format!("🚨 긴급: '{area}' 지역 {}", self.kind.display_name())
    }

    /// Whole minutes left before expiry, clamped at zero.
    pub fn minutes_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at
            .map(|end| (end - now).num_minutes().max(0))
    }

    /// Hover title of the zone marker.
    pub fn marker_title(&self, now: DateTime<Utc>) -> String {
        match self.minutes_remaining(now) {
            Some(minutes) => format!("{} ({minutes}분 남음)", self.kind.display_name()),
            None => self.kind.display_name().to_string(),
        }
    }
}

/// Admin request for a circular simulated zone.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleZoneRequest {
    pub center: LatLng,
    pub kind_key: String,
    pub radius_m: u32,
    pub duration_minutes: u32,
}

impl CircleZoneRequest {
    pub fn query(&self) -> String {
        format!(
            "lat={}&lon={}&type={}&radius={}&durationMinutes={}",
            self.center.lat,
            self.center.lng,
            urlencoding::encode(&self.kind_key),
            self.radius_m,
            self.duration_minutes
        )
    }
}

/// Admin request for an administrative-area zone.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaZoneRequest {
    pub area_name: String,
    pub kind_key: String,
    pub duration_minutes: u32,
}

impl AreaZoneRequest {
    pub fn query(&self) -> String {
        format!(
            "areaName={}&type={}&durationMinutes={}",
            urlencoding::encode(&self.area_name),
            urlencoding::encode(&self.kind_key),
            self.duration_minutes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, kind: &str) -> DisasterZoneRecord {
        DisasterZoneRecord {
            id,
            disaster_type: kind.to_string(),
            latitude: Some(37.5),
            longitude: Some(127.0),
            radius: Some(500.0),
            area_name: None,
            start_time: None,
            expiry_time: None,
        }
    }

    #[test]
    fn exact_keys_classify_directly() {
        assert_eq!(DisasterKind::classify("quake"), DisasterKind::Quake);
        assert_eq!(DisasterKind::classify("HEAVYRAIN"), DisasterKind::HeavyRain);
        assert_eq!(DisasterKind::classify("coldwave"), DisasterKind::ColdWave);
    }

    #[test]
    fn substring_and_korean_fallbacks() {
        assert_eq!(DisasterKind::classify("forest_fire"), DisasterKind::Fire);
        assert_eq!(DisasterKind::classify("rainstorm"), DisasterKind::HeavyRain);
        assert_eq!(DisasterKind::classify("대형 화재"), DisasterKind::Fire);
        assert_eq!(DisasterKind::classify("지진 해일"), DisasterKind::Quake);
        assert_eq!(DisasterKind::classify("unknown"), DisasterKind::Other);
    }

    #[test]
    fn other_kind_uses_generic_descriptors() {
        let kind = DisasterKind::Other;
        assert_eq!(kind.display_name(), "⚠️ 재난 경보");
        assert_eq!(kind.icon_path(), "/img/disaster/etc.png");
        assert_eq!(kind.style().fill, "#FFA500");
    }

    #[test]
    fn styles_group_by_hazard_family() {
        assert_eq!(DisasterKind::Missile.style().fill, "#FF0000");
        assert_eq!(DisasterKind::Tsunami.style().stroke, "#0000FF");
        assert_eq!(DisasterKind::Quake.style().stroke, "#D2691E");
        assert_eq!(DisasterKind::ColdWave.style().fill, "#B0C4DE");
        assert_eq!(DisasterKind::Dust.style().stroke, "#DAA520");
    }

    #[test]
    fn circle_needs_positive_radius_and_center() {
        let zone = DisasterZone::from(record(1, "fire"));
        assert_eq!(zone.circle(), Some((LatLng::new(37.5, 127.0), 500.0)));

        let mut no_radius = record(2, "fire");
        no_radius.radius = Some(0.0);
        assert!(DisasterZone::from(no_radius).circle().is_none());

        let mut no_center = record(3, "fire");
        no_center.latitude = None;
        assert!(DisasterZone::from(no_center).circle().is_none());
    }

    #[test]
    fn alert_text_falls_back_to_nearby() {
        let zone = DisasterZone::from(record(1, "fire"));
        assert_eq!(zone.alert_text(), "🚨 긴급: '인근' 지역 🔥 화재/산불");

        let mut with_area = record(2, "snow");
        with_area.area_name = Some("강원 평창군".to_string());
        assert_eq!(
            DisasterZone::from(with_area).alert_text(),
            "🚨 긴급: '강원 평창군' 지역 ❄️ 대설"
        );
    }

    #[test]
    fn record_parses_iso_timestamps() {
        let json = r#"{"id":3,"disasterType":"dust","areaName":"서울","expiryTime":"2026-01-01T00:30:00Z"}"#;
        let zone = DisasterZone::from(serde_json::from_str::<DisasterZoneRecord>(json).unwrap());
        let now = "2026-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(zone.kind, DisasterKind::Dust);
        assert_eq!(zone.minutes_remaining(now), Some(30));
        assert!(zone.marker_title(now).ends_with("(30분 남음)"));
        assert!(zone.circle().is_none());
    }

    #[test]
    fn unparseable_timestamps_do_not_fail_the_record() {
        let json = r#"{"id":4,"disasterType":"fire","expiryTime":"soon","startTime":1767225600}"#;
        let record = serde_json::from_str::<DisasterZoneRecord>(json).unwrap();
        assert!(record.expiry_time.is_none());
        assert_eq!(record.start_time.map(|t| t.timestamp()), Some(1767225600));
    }

    #[test]
    fn admin_queries_encode_korean_area_names() {
        let request = AreaZoneRequest {
            area_name: "서울".to_string(),
            kind_key: "fire".to_string(),
            duration_minutes: 30,
        };
        assert_eq!(
            request.query(),
            "areaName=%EC%84%9C%EC%9A%B8&type=fire&durationMinutes=30"
        );
    }
}
