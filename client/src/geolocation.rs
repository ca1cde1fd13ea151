use js_sys::{Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use safenavi_shared::LatLng;

const POSITION_TIMEOUT_MS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeoError {
    #[error("geolocation unavailable")]
    Unavailable,
    #[error("geolocation failed: {0}")]
    Failed(String),
}

fn geolocation() -> Result<web_sys::Geolocation, GeoError> {
    web_sys::window()
        .ok_or(GeoError::Unavailable)?
        .navigator()
        .geolocation()
        .map_err(|_| GeoError::Unavailable)
}

fn options() -> web_sys::PositionOptions {
    let options = Object::new();
    let _ = Reflect::set(&options, &"enableHighAccuracy".into(), &JsValue::TRUE);
    let _ = Reflect::set(
        &options,
        &"timeout".into(),
        &JsValue::from(POSITION_TIMEOUT_MS),
    );
    options.unchecked_into()
}

fn read_position(position: &JsValue) -> Option<LatLng> {
    let coords = Reflect::get(position, &"coords".into()).ok()?;
    let lat = Reflect::get(&coords, &"latitude".into()).ok()?.as_f64();
    let lng = Reflect::get(&coords, &"longitude".into()).ok()?.as_f64();
    LatLng::from_parts(lat, lng)
}

fn error_message(error: &JsValue) -> String {
    Reflect::get(error, &"message".into())
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// One-shot position fix.
pub async fn current_position() -> Result<LatLng, GeoError> {
    let geo = geolocation()?;
    let mut request_error = None;
    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        if let Err(e) = geo.get_current_position_with_error_callback_and_options(
            &resolve,
            Some(&reject),
            &options(),
        ) {
            request_error = Some(error_message(&e));
        }
    });
    if let Some(message) = request_error {
        return Err(GeoError::Failed(message));
    }
    let position = JsFuture::from(promise)
        .await
        .map_err(|e| GeoError::Failed(error_message(&e)))?;
    read_position(&position).ok_or_else(|| GeoError::Failed("no coordinates".to_string()))
}

/// Active `watchPosition` registration; dropping it calls `clearWatch`.
pub struct PositionWatch {
    geolocation: web_sys::Geolocation,
    watch_id: i32,
    _on_update: Closure<dyn Fn(JsValue)>,
    _on_error: Closure<dyn Fn(JsValue)>,
}

impl PositionWatch {
    pub fn start(on_update: impl Fn(LatLng) + 'static) -> Result<Self, GeoError> {
        let geolocation = geolocation()?;
        let update = Closure::<dyn Fn(JsValue)>::new(move |position: JsValue| {
            if let Some(at) = read_position(&position) {
                on_update(at);
            }
        });
        let error = Closure::<dyn Fn(JsValue)>::new(|e: JsValue| {
            web_sys::console::warn_1(&format!("watchPosition error: {}", error_message(&e)).into());
        });
        let watch_id = geolocation
            .watch_position_with_error_callback_and_options(
                update.as_ref().unchecked_ref(),
                Some(error.as_ref().unchecked_ref()),
                &options(),
            )
            .map_err(|e| GeoError::Failed(error_message(&e)))?;
        Ok(Self {
            geolocation,
            watch_id,
            _on_update: update,
            _on_error: error,
        })
    }
}

impl Drop for PositionWatch {
    fn drop(&mut self) {
        self.geolocation.clear_watch(self.watch_id);
    }
}
