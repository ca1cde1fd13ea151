//! Administrative boundary dataset (GeoJSON subset) used to draw area-based disaster zones.

use serde::Deserialize;

use crate::geo::LatLng;

pub const BOUNDARY_DATASET_URL: &str = "/geojson/skorea-municipalities-2018-geo.json";

/// Province name fragments and the municipality code prefix they own.
pub const PROVINCE_CODES: [(&str, &str); 17] = [
    ("서울", "11"),
    ("부산", "21"),
    ("대구", "22"),
    ("인천", "23"),
    ("광주", "24"),
    ("대전", "25"),
    ("울산", "26"),
    ("세종", "29"),
    ("경기", "31"),
    ("강원", "32"),
    ("충북", "33"),
    ("충남", "34"),
    ("전북", "35"),
    ("전남", "36"),
    ("경북", "37"),
    ("경남", "38"),
    ("제주", "39"),
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoundaryDataset {
    #[serde(default)]
    pub features: Vec<BoundaryFeature>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoundaryFeature {
    pub properties: BoundaryProperties,
    pub geometry: BoundaryGeometry,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoundaryProperties {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

/// GeoJSON positions are `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum BoundaryGeometry {
    Polygon(Vec<Vec<[f64; 2]>>),
    MultiPolygon(Vec<Vec<Vec<[f64; 2]>>>),
}

impl BoundaryFeature {
    /// Outer ring of each polygon part as map coordinates.
    pub fn outer_rings(&self) -> Vec<Vec<LatLng>> {
        let to_path = |ring: &Vec<[f64; 2]>| -> Vec<LatLng> {
            ring.iter().map(|[lng, lat]| LatLng::new(*lat, *lng)).collect()
        };
        match &self.geometry {
            BoundaryGeometry::Polygon(rings) => rings.first().map(to_path).into_iter().collect(),
            BoundaryGeometry::MultiPolygon(parts) => parts
                .iter()
                .filter_map(|rings| rings.first().map(to_path))
                .collect(),
        }
    }
}

impl BoundaryDataset {
    /// Features covering an area name such as `"서울"`, `"경기 수원시"` or `"부산,해운대구,수영구"`.
    ///
    /// A province fragment narrows by code prefix. Extra comma-separated parts select
    /// municipalities by name; otherwise municipalities named inside the primary part are used,
    /// falling back to the whole province. Without a province fragment, any municipality whose
    /// name appears in the area name matches.
    pub fn resolve(&self, area_name: &str) -> Vec<&BoundaryFeature> {
        let parts: Vec<&str> = area_name.split(',').map(str::trim).collect();
        let primary = parts.first().copied().unwrap_or_default();

        let province = PROVINCE_CODES
            .iter()
            .find(|(name, _)| primary.contains(name))
            .map(|(_, code)| *code);

        let Some(code) = province else {
            return self
                .features
                .iter()
                .filter(|f| !f.properties.name.is_empty() && area_name.contains(&f.properties.name))
                .collect();
        };

        let in_province: Vec<&BoundaryFeature> = self
            .features
            .iter()
            .filter(|f| f.properties.code.starts_with(code))
            .collect();

        if parts.len() > 1 {
            let wanted = &parts[1..];
            return in_province
                .into_iter()
                .filter(|f| {
                    wanted
                        .iter()
                        .any(|w| !w.is_empty() && f.properties.name.contains(w))
                })
                .collect();
        }

        let named: Vec<&BoundaryFeature> = in_province
            .iter()
            .copied()
            .filter(|f| !f.properties.name.is_empty() && primary.contains(&f.properties.name))
            .collect();
        if named.is_empty() { in_province } else { named }
    }
}

/// Marker anchor for a set of rings: mean of each ring's first vertex.
pub fn rings_anchor(rings: &[Vec<LatLng>]) -> Option<LatLng> {
    let firsts: Vec<LatLng> = rings.iter().filter_map(|r| r.first().copied()).collect();
    if firsts.is_empty() {
        return None;
    }
    let n = firsts.len() as f64;
    let (lat, lng) = firsts
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
    Some(LatLng::new(lat / n, lng / n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> BoundaryDataset {
        serde_json::from_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"code":"11010","name":"종로구"},
                 "geometry":{"type":"Polygon","coordinates":[[[126.9,37.5],[127.0,37.5],[127.0,37.6]]]}},
                {"type":"Feature","properties":{"code":"11020","name":"중구"},
                 "geometry":{"type":"Polygon","coordinates":[[[126.95,37.55],[126.99,37.55],[126.99,37.57]]]}},
                {"type":"Feature","properties":{"code":"21090","name":"해운대구"},
                 "geometry":{"type":"MultiPolygon","coordinates":[
                    [[[129.1,35.1],[129.2,35.1],[129.2,35.2]]],
                    [[[129.3,35.3],[129.4,35.3],[129.4,35.4]]]]}},
                {"type":"Feature","properties":{"code":"21100","name":"수영구"},
                 "geometry":{"type":"Polygon","coordinates":[[[129.0,35.0],[129.1,35.0],[129.1,35.1]]]}},
                {"type":"Feature","properties":{"code":"31010","name":"수원시"},
                 "geometry":{"type":"Polygon","coordinates":[[[127.0,37.2],[127.1,37.2],[127.1,37.3]]]}}
            ]}"#,
        )
        .unwrap()
    }

    fn names<'a>(features: &[&'a BoundaryFeature]) -> Vec<&'a str> {
        features.iter().map(|f| f.properties.name.as_str()).collect()
    }

    #[test]
    fn province_only_selects_whole_province() {
        let data = dataset();
        assert_eq!(names(&data.resolve("서울")), vec!["종로구", "중구"]);
    }

    #[test]
    fn province_with_municipality_narrows() {
        let data = dataset();
        assert_eq!(names(&data.resolve("서울 종로구")), vec!["종로구"]);
        assert_eq!(names(&data.resolve("경기도 수원시")), vec!["수원시"]);
    }

    #[test]
    fn comma_parts_select_listed_municipalities() {
        let data = dataset();
        assert_eq!(
            names(&data.resolve("부산, 해운대구, 수영구")),
            vec!["해운대구", "수영구"]
        );
        assert!(data.resolve("부산,기장군").is_empty());
    }

    #[test]
    fn without_province_falls_back_to_name_substring() {
        let data = dataset();
        assert_eq!(names(&data.resolve("수원시 일대")), vec!["수원시"]);
        assert!(data.resolve("알 수 없는 지역").is_empty());
    }

    #[test]
    fn multipolygon_yields_outer_ring_per_part() {
        let data = dataset();
        let feature = data.resolve("부산 해운대구")[0];
        let rings = feature.outer_rings();
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0][0], LatLng::new(35.1, 129.1));
        assert_eq!(
            rings_anchor(&rings),
            Some(LatLng::new((35.1 + 35.3) / 2.0, (129.1 + 129.3) / 2.0))
        );
    }

    #[test]
    fn anchor_of_no_rings_is_none() {
        assert!(rings_anchor(&[]).is_none());
        assert!(rings_anchor(&[Vec::new()]).is_none());
    }
}
