use std::rc::Rc;

use safenavi_shared::{Bounds, LatLng};

/// Handle to something drawn on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphicId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerImage {
    pub src: String,
    pub width: u32,
    pub height: u32,
}

impl MarkerImage {
    pub fn new(src: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            src: src.into(),
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: LatLng,
    pub image: Option<MarkerImage>,
    pub title: Option<String>,
    pub z_index: Option<i32>,
}

impl MarkerSpec {
    pub fn at(position: LatLng) -> Self {
        Self {
            position,
            image: None,
            title: None,
            z_index: None,
        }
    }

    pub fn image(mut self, image: MarkerImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn z_index(mut self, z: i32) -> Self {
        self.z_index = Some(z);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeStyle {
    pub stroke_color: String,
    pub stroke_weight: u32,
    pub stroke_opacity: f64,
    pub stroke_style: &'static str,
    pub fill_color: Option<String>,
    pub fill_opacity: f64,
}

impl ShapeStyle {
    pub fn line(color: &str, weight: u32, style: &'static str) -> Self {
        Self {
            stroke_color: color.to_string(),
            stroke_weight: weight,
            stroke_opacity: 0.8,
            stroke_style: style,
            fill_color: None,
            fill_opacity: 0.0,
        }
    }

    pub fn area(stroke: &str, fill: &str, fill_opacity: f64) -> Self {
        Self {
            stroke_color: stroke.to_string(),
            stroke_weight: 2,
            stroke_opacity: 0.8,
            stroke_style: "solid",
            fill_color: Some(fill.to_string()),
            fill_opacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Graphic {
    Marker(MarkerSpec),
    Circle {
        center: LatLng,
        radius_m: f64,
        style: ShapeStyle,
    },
    Polygon {
        path: Vec<LatLng>,
        style: ShapeStyle,
    },
    Polyline {
        path: Vec<LatLng>,
        style: ShapeStyle,
    },
}

/// Optional overlay map types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapLayer {
    Traffic,
    Terrain,
    Skyview,
}

/// Everything view models need from the map widget.
pub trait MapSurface {
    fn draw(&self, graphic: Graphic) -> GraphicId;
    /// Adds markers to the clusterer; they are removed together by [`MapSurface::clear_clusters`].
    fn draw_clustered(&self, markers: Vec<MarkerSpec>) -> Vec<GraphicId>;
    fn clear_clusters(&self);
    fn remove(&self, id: GraphicId);
    fn move_marker(&self, id: GraphicId, to: LatLng);
    fn on_click(&self, id: GraphicId, handler: Rc<dyn Fn()>);
    fn open_overlay(&self, anchor: LatLng, content: &web_sys::Element) -> GraphicId;
    fn pan_to(&self, to: LatLng);
    fn set_level(&self, level: u8);
    fn fit_to(&self, bounds: Bounds);
    fn viewport(&self) -> Option<Bounds>;
    fn center(&self) -> LatLng;
    fn set_layer(&self, layer: MapLayer, visible: bool);
}

#[cfg(test)]
pub mod testing {
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::rc::Rc;

    use safenavi_shared::{Bounds, DEFAULT_CENTER, LatLng};

    use super::{Graphic, GraphicId, MapLayer, MapSurface, MarkerSpec};

    /// In-memory map used by view-model tests.
    pub struct RecordingSurface {
        next_id: Cell<u32>,
        pub graphics: RefCell<BTreeMap<GraphicId, Graphic>>,
        pub clustered: RefCell<BTreeMap<GraphicId, MarkerSpec>>,
        pub overlays: RefCell<HashSet<GraphicId>>,
        handlers: RefCell<HashMap<GraphicId, Rc<dyn Fn()>>>,
        pub center: Cell<LatLng>,
        pub level: Cell<u8>,
        pub view: Cell<Option<Bounds>>,
        pub fitted: RefCell<Vec<Bounds>>,
        pub layers: RefCell<HashSet<MapLayer>>,
    }

    impl Default for RecordingSurface {
        fn default() -> Self {
            Self {
                next_id: Cell::new(1),
                graphics: RefCell::default(),
                clustered: RefCell::default(),
                overlays: RefCell::default(),
                handlers: RefCell::default(),
                center: Cell::new(DEFAULT_CENTER),
                level: Cell::new(4),
                view: Cell::new(Some(Bounds::new(
                    LatLng::new(37.5, 126.9),
                    LatLng::new(37.6, 127.1),
                ))),
                fitted: RefCell::default(),
                layers: RefCell::default(),
            }
        }
    }

    impl RecordingSurface {
        fn allocate(&self) -> GraphicId {
            let id = GraphicId(self.next_id.get());
            self.next_id.set(id.0 + 1);
            id
        }

        pub fn count_where(&self, pred: impl Fn(&Graphic) -> bool) -> usize {
            self.graphics.borrow().values().filter(|g| pred(g)).count()
        }

        pub fn markers(&self) -> usize {
            self.count_where(|g| matches!(g, Graphic::Marker(_)))
        }

        pub fn click(&self, id: GraphicId) {
            let handler = self.handlers.borrow().get(&id).cloned();
            if let Some(handler) = handler {
                handler();
            }
        }

        /// Fake overlay id, as if a panel had been opened.
        pub fn fake_overlay(&self) -> GraphicId {
            let id = self.allocate();
            self.overlays.borrow_mut().insert(id);
            id
        }
    }

    impl MapSurface for RecordingSurface {
        fn draw(&self, graphic: Graphic) -> GraphicId {
            let id = self.allocate();
            self.graphics.borrow_mut().insert(id, graphic);
            id
        }

        fn draw_clustered(&self, markers: Vec<MarkerSpec>) -> Vec<GraphicId> {
            markers
                .into_iter()
                .map(|m| {
                    let id = self.allocate();
                    self.clustered.borrow_mut().insert(id, m);
                    id
                })
                .collect()
        }

        fn clear_clusters(&self) {
            let mut clustered = self.clustered.borrow_mut();
            let mut handlers = self.handlers.borrow_mut();
            for id in clustered.keys() {
                handlers.remove(id);
            }
            clustered.clear();
        }

        fn remove(&self, id: GraphicId) {
            self.graphics.borrow_mut().remove(&id);
            self.clustered.borrow_mut().remove(&id);
            self.overlays.borrow_mut().remove(&id);
            self.handlers.borrow_mut().remove(&id);
        }

        fn move_marker(&self, id: GraphicId, to: LatLng) {
            if let Some(Graphic::Marker(spec)) = self.graphics.borrow_mut().get_mut(&id) {
                spec.position = to;
            }
        }

        fn on_click(&self, id: GraphicId, handler: Rc<dyn Fn()>) {
            self.handlers.borrow_mut().insert(id, handler);
        }

        fn open_overlay(&self, _anchor: LatLng, _content: &web_sys::Element) -> GraphicId {
            self.fake_overlay()
        }

        fn pan_to(&self, to: LatLng) {
            self.center.set(to);
        }

        fn set_level(&self, level: u8) {
            self.level.set(level);
        }

        fn fit_to(&self, bounds: Bounds) {
            self.fitted.borrow_mut().push(bounds);
        }

        fn viewport(&self) -> Option<Bounds> {
            self.view.get()
        }

        fn center(&self) -> LatLng {
            self.center.get()
        }

        fn set_layer(&self, layer: MapLayer, visible: bool) {
            let mut layers = self.layers.borrow_mut();
            if visible {
                layers.insert(layer);
            } else {
                layers.remove(&layer);
            }
        }
    }
}
