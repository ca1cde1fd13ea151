pub mod account;
pub mod board;
pub mod boundary;
pub mod disaster;
pub mod events;
pub mod facility;
pub mod geo;
pub mod places;
pub mod route;
pub mod safety;
pub mod search;
pub mod weather;

pub use account::ValidationError;
pub use board::{BoardCategory, BoardPost, Comment, LocationSource};
pub use disaster::{DisasterKind, DisasterZone, DisasterZoneRecord};
pub use events::{BoardEvent, FeedTopic};
pub use facility::{Facility, FacilityDetail, FacilityKind, FacilityRecord, MarkerIcon};
pub use geo::{Bounds, DEFAULT_CENTER, LatLng};
pub use route::{PlannedRoute, Recommendation, RouteResponse, TravelMode};
pub use safety::{SafetyGrade, SafetyScore};
