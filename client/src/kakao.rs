use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use safenavi_shared::{Bounds, LatLng};

use crate::surface::{Graphic, GraphicId, MapLayer, MapSurface, MarkerSpec, ShapeStyle};

pub const DEFAULT_LEVEL: u8 = 4;
const CLUSTER_MIN_LEVEL: u8 = 5;
const CLUSTER_GRID_SIZE: u32 = 35;

mod sdk {
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen(js_namespace = ["kakao", "maps"])]
    extern "C" {
        pub type LatLng;
        #[wasm_bindgen(constructor)]
        pub fn new(lat: f64, lng: f64) -> LatLng;
        #[wasm_bindgen(method, js_name = getLat)]
        pub fn get_lat(this: &LatLng) -> f64;
        #[wasm_bindgen(method, js_name = getLng)]
        pub fn get_lng(this: &LatLng) -> f64;

        pub type LatLngBounds;
        #[wasm_bindgen(constructor)]
        pub fn new() -> LatLngBounds;
        #[wasm_bindgen(method)]
        pub fn extend(this: &LatLngBounds, point: &LatLng);
        #[wasm_bindgen(method, js_name = getSouthWest)]
        pub fn get_south_west(this: &LatLngBounds) -> LatLng;
        #[wasm_bindgen(method, js_name = getNorthEast)]
        pub fn get_north_east(this: &LatLngBounds) -> LatLng;

        pub type Size;
        #[wasm_bindgen(constructor)]
        pub fn new(width: u32, height: u32) -> Size;

        pub type MarkerImage;
        #[wasm_bindgen(constructor)]
        pub fn new(src: &str, size: &Size) -> MarkerImage;

        pub type Map;
        #[wasm_bindgen(constructor)]
        pub fn new(container: &web_sys::HtmlElement, options: &JsValue) -> Map;
        #[wasm_bindgen(method, js_name = panTo)]
        pub fn pan_to(this: &Map, to: &LatLng);
        #[wasm_bindgen(method, js_name = setLevel)]
        pub fn set_level(this: &Map, level: u8);
        #[wasm_bindgen(method, js_name = getBounds)]
        pub fn get_bounds(this: &Map) -> LatLngBounds;
        #[wasm_bindgen(method, js_name = getCenter)]
        pub fn get_center(this: &Map) -> LatLng;
        #[wasm_bindgen(method, js_name = setBounds)]
        pub fn set_bounds(this: &Map, bounds: &LatLngBounds);
        #[wasm_bindgen(method, js_name = addOverlayMapTypeId)]
        pub fn add_overlay_map_type_id(this: &Map, id: &JsValue);
        #[wasm_bindgen(method, js_name = removeOverlayMapTypeId)]
        pub fn remove_overlay_map_type_id(this: &Map, id: &JsValue);
        #[wasm_bindgen(method, js_name = setMapTypeId)]
        pub fn set_map_type_id(this: &Map, id: &JsValue);
        #[wasm_bindgen(method)]
        pub fn relayout(this: &Map);

        pub type Marker;
        #[wasm_bindgen(constructor)]
        pub fn new(options: &JsValue) -> Marker;
        #[wasm_bindgen(method, js_name = setPosition)]
        pub fn set_position(this: &Marker, to: &LatLng);

        pub type Circle;
        #[wasm_bindgen(constructor)]
        pub fn new(options: &JsValue) -> Circle;

        pub type Polygon;
        #[wasm_bindgen(constructor)]
        pub fn new(options: &JsValue) -> Polygon;

        pub type Polyline;
        #[wasm_bindgen(constructor)]
        pub fn new(options: &JsValue) -> Polyline;

        pub type CustomOverlay;
        #[wasm_bindgen(constructor)]
        pub fn new(options: &JsValue) -> CustomOverlay;

        pub type MarkerClusterer;
        #[wasm_bindgen(constructor)]
        pub fn new(options: &JsValue) -> MarkerClusterer;
        #[wasm_bindgen(method, js_name = addMarkers)]
        pub fn add_markers(this: &MarkerClusterer, markers: &js_sys::Array);
        #[wasm_bindgen(method)]
        pub fn clear(this: &MarkerClusterer);

        pub type Roadview;
        #[wasm_bindgen(constructor)]
        pub fn new(container: &web_sys::HtmlElement) -> Roadview;
        #[wasm_bindgen(method, js_name = setPanoId)]
        pub fn set_pano_id(this: &Roadview, pano_id: &JsValue, position: &LatLng);

        pub type RoadviewClient;
        #[wasm_bindgen(constructor)]
        pub fn new() -> RoadviewClient;
        #[wasm_bindgen(method, js_name = getNearestPanoId)]
        pub fn get_nearest_pano_id(
            this: &RoadviewClient,
            position: &LatLng,
            radius: u32,
            callback: &js_sys::Function,
        );
    }

    #[wasm_bindgen]
    extern "C" {
        /// Any SDK object with `setMap`: markers, shapes and custom overlays.
        pub type MapObject;
        #[wasm_bindgen(method, js_name = setMap)]
        pub fn set_map(this: &MapObject, map: &JsValue);
    }

    #[wasm_bindgen(js_namespace = ["kakao", "maps", "event"])]
    extern "C" {
        #[wasm_bindgen(js_name = addListener)]
        pub fn add_listener(target: &JsValue, kind: &str, handler: &js_sys::Function);
        #[wasm_bindgen(js_name = removeListener)]
        pub fn remove_listener(target: &JsValue, kind: &str, handler: &js_sys::Function);
    }

    #[wasm_bindgen(js_namespace = ["kakao", "maps", "services"])]
    extern "C" {
        pub type Geocoder;
        #[wasm_bindgen(constructor)]
        pub fn new() -> Geocoder;
        #[wasm_bindgen(method, js_name = addressSearch)]
        pub fn address_search(this: &Geocoder, query: &str, callback: &js_sys::Function);

        pub type Places;
        #[wasm_bindgen(constructor)]
        pub fn new() -> Places;
        #[wasm_bindgen(method, js_name = keywordSearch)]
        pub fn keyword_search(this: &Places, query: &str, callback: &js_sys::Function);
    }
}

fn to_sdk(p: LatLng) -> sdk::LatLng {
    sdk::LatLng::new(p.lat, p.lng)
}

fn from_sdk(p: &sdk::LatLng) -> LatLng {
    LatLng::new(p.get_lat(), p.get_lng())
}

fn set(target: &Object, key: &str, value: impl Into<JsValue>) {
    let _ = Reflect::set(target, &JsValue::from_str(key), &value.into());
}

fn path_array(path: &[LatLng]) -> Array {
    path.iter().map(|p| JsValue::from(to_sdk(*p))).collect()
}

fn style_options(options: &Object, style: &ShapeStyle) {
    set(options, "strokeWeight", style.stroke_weight);
    set(options, "strokeColor", style.stroke_color.as_str());
    set(options, "strokeOpacity", style.stroke_opacity);
    set(options, "strokeStyle", style.stroke_style);
    if let Some(fill) = &style.fill_color {
        set(options, "fillColor", fill.as_str());
        set(options, "fillOpacity", style.fill_opacity);
    }
}

fn marker_options(spec: &MarkerSpec) -> Object {
    let options = Object::new();
    set(&options, "position", to_sdk(spec.position));
    if let Some(image) = &spec.image {
        let size = sdk::Size::new(image.width, image.height);
        set(&options, "image", sdk::MarkerImage::new(&image.src, &size));
    }
    if let Some(title) = &spec.title {
        set(&options, "title", title.as_str());
    }
    if let Some(z) = spec.z_index {
        set(&options, "zIndex", z);
    }
    options
}

/// `kakao.maps.MapTypeId.<name>`.
fn map_type_id(name: &str) -> JsValue {
    let Some(window) = web_sys::window() else {
        return JsValue::UNDEFINED;
    };
    ["kakao", "maps", "MapTypeId", name]
        .iter()
        .try_fold(JsValue::from(window), |obj, key| {
            Reflect::get(&obj, &JsValue::from_str(key)).ok()
        })
        .unwrap_or(JsValue::UNDEFINED)
}

/// `true` once the SDK script has defined `kakao.maps`.
pub fn sdk_loaded() -> bool {
    !map_type_id("ROADMAP").is_undefined()
}

struct Listener {
    target: JsValue,
    kind: &'static str,
    callback: Closure<dyn Fn()>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        sdk::remove_listener(&self.target, self.kind, self.callback.as_ref().unchecked_ref());
    }
}

/// Kakao Maps widget behind [`MapSurface`].
pub struct KakaoSurface {
    map: sdk::Map,
    clusterer: sdk::MarkerClusterer,
    next_id: Cell<u32>,
    objects: RefCell<HashMap<GraphicId, sdk::MapObject>>,
    clustered: RefCell<Vec<GraphicId>>,
    listeners: RefCell<HashMap<GraphicId, Listener>>,
    map_listeners: RefCell<Vec<Box<dyn std::any::Any>>>,
}

impl KakaoSurface {
    pub fn create(container: &web_sys::HtmlElement, center: LatLng) -> Self {
        let options = Object::new();
        set(&options, "center", to_sdk(center));
        set(&options, "level", DEFAULT_LEVEL);
        let map = sdk::Map::new(container, &options);

        let cluster_options = Object::new();
        set(&cluster_options, "map", JsValue::from(map.clone()));
        set(&cluster_options, "averageCenter", true);
        set(&cluster_options, "minLevel", CLUSTER_MIN_LEVEL);
        set(&cluster_options, "gridSize", CLUSTER_GRID_SIZE);
        let clusterer = sdk::MarkerClusterer::new(&cluster_options);

        Self {
            map,
            clusterer,
            next_id: Cell::new(1),
            objects: RefCell::default(),
            clustered: RefCell::default(),
            listeners: RefCell::default(),
            map_listeners: RefCell::default(),
        }
    }

    fn allocate(&self) -> GraphicId {
        let id = GraphicId(self.next_id.get());
        self.next_id.set(id.0.wrapping_add(1));
        id
    }

    fn attach(&self, object: JsValue) -> GraphicId {
        let object: sdk::MapObject = object.unchecked_into();
        object.set_map(self.map.as_ref());
        let id = self.allocate();
        self.objects.borrow_mut().insert(id, object);
        id
    }

    /// Fires after every pan or zoom settles.
    pub fn on_idle(&self, handler: impl Fn() + 'static) {
        let callback = Closure::<dyn Fn()>::new(handler);
        sdk::add_listener(self.map.as_ref(), "idle", callback.as_ref().unchecked_ref());
        self.map_listeners.borrow_mut().push(Box::new(callback));
    }

    /// Fires with the clicked coordinate on a bare map click.
    pub fn on_map_click(&self, handler: impl Fn(LatLng) + 'static) {
        let callback = Closure::<dyn Fn(JsValue)>::new(move |event: JsValue| {
            let Ok(raw) = Reflect::get(&event, &JsValue::from_str("latLng")) else {
                return;
            };
            if raw.is_undefined() {
                return;
            }
            handler(from_sdk(raw.unchecked_ref()));
        });
        sdk::add_listener(self.map.as_ref(), "click", callback.as_ref().unchecked_ref());
        self.map_listeners.borrow_mut().push(Box::new(callback));
    }

    pub fn relayout(&self) {
        self.map.relayout();
    }
}

impl MapSurface for KakaoSurface {
    fn draw(&self, graphic: Graphic) -> GraphicId {
        let object: JsValue = match graphic {
            Graphic::Marker(spec) => sdk::Marker::new(&marker_options(&spec)).into(),
            Graphic::Circle {
                center,
                radius_m,
                style,
            } => {
                let options = Object::new();
                set(&options, "center", to_sdk(center));
                set(&options, "radius", radius_m);
                style_options(&options, &style);
                sdk::Circle::new(&options).into()
            }
            Graphic::Polygon { path, style } => {
                let options = Object::new();
                set(&options, "path", path_array(&path));
                style_options(&options, &style);
                sdk::Polygon::new(&options).into()
            }
            Graphic::Polyline { path, style } => {
                let options = Object::new();
                set(&options, "path", path_array(&path));
                style_options(&options, &style);
                sdk::Polyline::new(&options).into()
            }
        };
        self.attach(object)
    }

    fn draw_clustered(&self, markers: Vec<MarkerSpec>) -> Vec<GraphicId> {
        let batch = Array::new();
        let mut ids = Vec::with_capacity(markers.len());
        {
            let mut objects = self.objects.borrow_mut();
            for spec in &markers {
                let marker = sdk::Marker::new(&marker_options(spec));
                batch.push(marker.as_ref());
                let id = self.allocate();
                objects.insert(id, marker.unchecked_into());
                ids.push(id);
            }
        }
        self.clusterer.add_markers(&batch);
        self.clustered.borrow_mut().extend(ids.iter().copied());
        ids
    }

    fn clear_clusters(&self) {
        self.clusterer.clear();
        let ids: Vec<GraphicId> = self.clustered.borrow_mut().drain(..).collect();
        let mut objects = self.objects.borrow_mut();
        let mut listeners = self.listeners.borrow_mut();
        for id in ids {
            objects.remove(&id);
            listeners.remove(&id);
        }
    }

    fn remove(&self, id: GraphicId) {
        self.listeners.borrow_mut().remove(&id);
        if let Some(object) = self.objects.borrow_mut().remove(&id) {
            object.set_map(&JsValue::NULL);
        }
    }

    fn move_marker(&self, id: GraphicId, to: LatLng) {
        if let Some(object) = self.objects.borrow().get(&id) {
            object.unchecked_ref::<sdk::Marker>().set_position(&to_sdk(to));
        }
    }

    fn on_click(&self, id: GraphicId, handler: Rc<dyn Fn()>) {
        let Some(target) = self.objects.borrow().get(&id).map(|o| JsValue::from(o.clone())) else {
            return;
        };
        let callback = Closure::<dyn Fn()>::new(move || handler());
        sdk::add_listener(&target, "click", callback.as_ref().unchecked_ref());
        self.listeners.borrow_mut().insert(
            id,
            Listener {
                target,
                kind: "click",
                callback,
            },
        );
    }

    fn open_overlay(&self, anchor: LatLng, content: &web_sys::Element) -> GraphicId {
        let options = Object::new();
        set(&options, "position", to_sdk(anchor));
        set(&options, "content", content.clone());
        set(&options, "yAnchor", 1.15);
        set(&options, "zIndex", 10);
        set(&options, "clickable", true);
        self.attach(sdk::CustomOverlay::new(&options).into())
    }

    fn pan_to(&self, to: LatLng) {
        self.map.pan_to(&to_sdk(to));
    }

    fn set_level(&self, level: u8) {
        self.map.set_level(level);
    }

    fn fit_to(&self, bounds: Bounds) {
        let sdk_bounds = sdk::LatLngBounds::new();
        sdk_bounds.extend(&to_sdk(bounds.sw));
        sdk_bounds.extend(&to_sdk(bounds.ne));
        self.map.set_bounds(&sdk_bounds);
    }

    fn viewport(&self) -> Option<Bounds> {
        let bounds = self.map.get_bounds();
        let sw = from_sdk(&bounds.get_south_west());
        let ne = from_sdk(&bounds.get_north_east());
        (sw.lat.is_finite() && ne.lat.is_finite()).then(|| Bounds::new(sw, ne))
    }

    fn center(&self) -> LatLng {
        from_sdk(&self.map.get_center())
    }

    fn set_layer(&self, layer: MapLayer, visible: bool) {
        match layer {
            MapLayer::Skyview => {
                let id = if visible { "HYBRID" } else { "ROADMAP" };
                self.map.set_map_type_id(&map_type_id(id));
            }
            MapLayer::Traffic | MapLayer::Terrain => {
                let id = map_type_id(if layer == MapLayer::Traffic {
                    "TRAFFIC"
                } else {
                    "TERRAIN"
                });
                if visible {
                    self.map.add_overlay_map_type_id(&id);
                } else {
                    self.map.remove_overlay_map_type_id(&id);
                }
            }
        }
    }
}

/// A geocoded place.
#[derive(Debug, Clone, PartialEq)]
pub struct Geocoded {
    pub position: LatLng,
    pub label: String,
}

/// Wraps a callback-style SDK search into a future; resolves to the first result or `None`.
async fn first_result(start: impl FnOnce(&js_sys::Function)) -> Option<JsValue> {
    let mut start = Some(start);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let Some(start) = start.take() else {
            return;
        };
        let callback = Closure::once_into_js(move |result: JsValue, status: JsValue| {
            let ok = status.as_string().as_deref() == Some("OK");
            let value = if ok { result } else { JsValue::NULL };
            let _ = resolve.call1(&JsValue::NULL, &value);
        });
        start(callback.unchecked_ref());
    });
    let value = JsFuture::from(promise).await.ok()?;
    if value.is_null() {
        return None;
    }
    let first = Array::from(&value).get(0);
    (!first.is_undefined()).then_some(first)
}

/// One hit of the SDK's address or keyword search; coordinates arrive as strings.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SearchHit {
    x: String,
    y: String,
    place_name: Option<String>,
    address_name: Option<String>,
}

impl SearchHit {
    fn into_geocoded(self, query: &str) -> Option<Geocoded> {
        let position = LatLng::from_parts(self.y.trim().parse().ok(), self.x.trim().parse().ok())?;
        let label = [self.place_name, self.address_name]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or_else(|| query.to_string());
        Some(Geocoded { position, label })
    }
}

fn parse_result(result: JsValue, query: &str) -> Option<Geocoded> {
    match serde_wasm_bindgen::from_value::<SearchHit>(result) {
        Ok(hit) => hit.into_geocoded(query),
        Err(e) => {
            web_sys::console::warn_1(&format!("unexpected search result: {e}").into());
            None
        }
    }
}

/// Address search first, then keyword search.
pub async fn geocode(query: &str) -> Option<Geocoded> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    let geocoder = sdk::Geocoder::new();
    if let Some(hit) = first_result(|cb| geocoder.address_search(query, cb)).await
        && let Some(place) = parse_result(hit, query)
    {
        return Some(place);
    }
    let places = sdk::Places::new();
    let hit = first_result(|cb| places.keyword_search(query, cb)).await?;
    parse_result(hit, query)
}

/// Shows the nearest street-level panorama within 50 m of `at`; `false` when there is none.
pub async fn show_roadview(container: &web_sys::HtmlElement, at: LatLng) -> bool {
    let client = sdk::RoadviewClient::new();
    let position = to_sdk(at);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let callback = Closure::once_into_js(move |pano_id: JsValue| {
            let _ = resolve.call1(&JsValue::NULL, &pano_id);
        });
        client.get_nearest_pano_id(&position, 50, callback.unchecked_ref());
    });
    let Ok(pano_id) = JsFuture::from(promise).await else {
        return false;
    };
    if pano_id.is_null() || pano_id.is_undefined() {
        return false;
    }
    let roadview = sdk::Roadview::new(container);
    roadview.set_pano_id(&pano_id, &position);
    true
}
