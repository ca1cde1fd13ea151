use serde::{Deserialize, Serialize};

use crate::account::ValidationError;
use crate::geo::LatLng;

pub const FAVORITE_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlaceKind {
    Home,
    Company,
    Favorite,
}

impl PlaceKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "🏠 집",
            Self::Company => "🏢 회사",
            Self::Favorite => "⭐ 즐겨찾기",
        }
    }

    pub fn marker_image(self) -> &'static str {
        match self {
            Self::Home => "/img/places/marker_home.png",
            Self::Company => "/img/places/marker_company.png",
            Self::Favorite => "/img/places/marker_star.png",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyPlace {
    pub id: i64,
    pub place_type: PlaceKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl MyPlace {
    pub fn position(&self) -> Option<LatLng> {
        LatLng::from_parts(self.latitude, self.longitude)
    }

    pub fn title(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.place_type.label())
    }
}

/// Saved places grouped the way the panel shows them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceBook {
    pub home: Option<MyPlace>,
    pub company: Option<MyPlace>,
    pub favorites: Vec<MyPlace>,
}

impl PlaceBook {
    pub fn from_places(places: Vec<MyPlace>) -> Self {
        let mut book = Self::default();
        for place in places {
            match place.place_type {
                PlaceKind::Home => book.home = Some(place),
                PlaceKind::Company => book.company = Some(place),
                PlaceKind::Favorite => book.favorites.push(place),
            }
        }
        book.favorites.truncate(FAVORITE_LIMIT);
        book
    }

    pub fn check_favorite_capacity(&self) -> Result<(), ValidationError> {
        if self.favorites.len() >= FAVORITE_LIMIT {
            Err(ValidationError::FavoriteLimit)
        } else {
            Ok(())
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &MyPlace> {
        self.home
            .iter()
            .chain(self.company.iter())
            .chain(self.favorites.iter())
    }
}

/// Body of `POST /api/map/special-place` (home or company).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialPlaceRequest {
    #[serde(rename = "type")]
    pub kind: PlaceKind,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Body of `POST /api/map/favorite`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRequest {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyContact {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFamilyContact {
    pub name: String,
    pub phone: String,
}

impl NewFamilyContact {
    pub fn new(name: &str, phone: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        let phone = crate::account::digits_only(phone);
        if name.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        if !crate::account::is_valid_phone(&phone) {
            return Err(ValidationError::Phone);
        }
        Ok(Self {
            name: name.to_string(),
            phone,
        })
    }
}

/// `sms:` link asking a family member to check in on the sender.
pub fn family_sms_link(phone: &str, at: LatLng) -> String {
    let (lat, lng) = at.short_label();
    let body = format!("[안전네비] 현재 제 위치는 위도:{lat}, 경도:{lng} 입니다. 안전한지 확인해주세요.");
    format!("sms:{phone}?body={}", urlencoding::encode(&body))
}

/// `sms:119` rescue request with the current position.
pub fn rescue_sms_link(at: LatLng) -> String {
    let (lat, lng) = at.short_label();
    let body = format!("[구조요청] 위급상황! 위치: 위도{lat}, 경도{lng}");
    format!("sms:119?body={}", urlencoding::encode(&body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: i64, kind: PlaceKind) -> MyPlace {
        MyPlace {
            id,
            place_type: kind,
            name: None,
            address: format!("주소 {id}"),
            latitude: Some(37.0),
            longitude: Some(127.0),
        }
    }

    #[test]
    fn book_groups_by_kind_and_caps_favorites() {
        let mut places = vec![place(1, PlaceKind::Home), place(2, PlaceKind::Company)];
        places.extend((10..17).map(|id| place(id, PlaceKind::Favorite)));
        let book = PlaceBook::from_places(places);
        assert_eq!(book.home.as_ref().map(|p| p.id), Some(1));
        assert_eq!(book.company.as_ref().map(|p| p.id), Some(2));
        assert_eq!(book.favorites.len(), FAVORITE_LIMIT);
        assert_eq!(book.all().count(), 7);
        assert_eq!(
            book.check_favorite_capacity(),
            Err(ValidationError::FavoriteLimit)
        );
    }

    #[test]
    fn favorites_below_limit_accept_more() {
        let book = PlaceBook::from_places(vec![place(1, PlaceKind::Favorite)]);
        assert!(book.check_favorite_capacity().is_ok());
    }

    #[test]
    fn unnamed_place_uses_kind_label() {
        assert_eq!(place(1, PlaceKind::Home).title(), "🏠 집");
    }

    #[test]
    fn family_contact_normalizes_phone() {
        let contact = NewFamilyContact::new(" 엄마 ", "010-1111-2222").unwrap();
        assert_eq!(contact.name, "엄마");
        assert_eq!(contact.phone, "01011112222");
        assert_eq!(
            NewFamilyContact::new("아빠", "02-123-4567"),
            Err(ValidationError::Phone)
        );
    }

    #[test]
    fn sms_links_carry_four_decimal_position() {
        let link = rescue_sms_link(LatLng::new(37.566826, 126.9786567));
        assert!(link.starts_with("sms:119?body="));
        assert!(link.contains("37.5668"));
        assert!(link.contains("126.9787"));
        let family = family_sms_link("01011112222", LatLng::new(37.0, 127.0));
        assert!(family.starts_with("sms:01011112222?body="));
    }

    #[test]
    fn sms_body_is_percent_encoded() {
        let link = rescue_sms_link(LatLng::new(37.5, 127.0));
        assert!(link.starts_with("sms:119?body=%5B%EA%B5%AC%EC%A1%B0%EC%9A%94%EC%B2%AD%5D%20"));
        assert!(!link.contains(' '));
        assert!(link.contains("37.5000"));
    }

    #[test]
    fn special_place_request_wire_shape() {
        let json = serde_json::to_value(SpecialPlaceRequest {
            kind: PlaceKind::Company,
            address: "판교".to_string(),
            latitude: 37.4,
            longitude: 127.1,
        })
        .unwrap();
        assert_eq!(json["type"], "COMPANY");
    }
}
