pub mod api;
pub mod proxy;
