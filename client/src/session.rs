use std::any::Any;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crate::board::BoardLayer;
use crate::controls::MapControls;
use crate::disaster::ZoneLayer;
use crate::markers::FacilityRegistry;
use crate::places::PlaceLayer;
use crate::route::RoutePlanner;
use crate::surface::{GraphicId, MapSurface};

/// Returned when a response arrives after a newer request superseded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("stale response")]
pub struct Stale;

/// Request counter; only the latest token may apply its response.
#[derive(Debug, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn bump(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }

    pub fn check(&self, token: u64) -> Result<(), Stale> {
        if token == self.0 { Ok(()) } else { Err(Stale) }
    }
}

/// What the single detail overlay is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayOwner {
    Facility(i64),
    Post(i64),
}

struct OpenOverlay {
    owner: OverlayOwner,
    graphic: GraphicId,
    _mount: Option<Box<dyn Any>>,
}

/// The one overlay slot shared by every layer; opening replaces whatever was open.
#[derive(Default)]
pub struct OverlaySlot {
    current: Option<OpenOverlay>,
}

impl OverlaySlot {
    pub fn owner(&self) -> Option<OverlayOwner> {
        self.current.as_ref().map(|o| o.owner)
    }

    pub fn is_open(&self, owner: OverlayOwner) -> bool {
        self.owner() == Some(owner)
    }

    /// Records a freshly opened overlay, removing the previous one first.
    pub fn install(
        &mut self,
        surface: &dyn MapSurface,
        owner: OverlayOwner,
        graphic: GraphicId,
        mount: Option<Box<dyn Any>>,
    ) {
        self.close(surface);
        self.current = Some(OpenOverlay {
            owner,
            graphic,
            _mount: mount,
        });
    }

    pub fn close(&mut self, surface: &dyn MapSurface) -> Option<OverlayOwner> {
        let open = self.current.take()?;
        surface.remove(open.graphic);
        Some(open.owner)
    }

    pub fn close_if(&mut self, surface: &dyn MapSurface, owner: OverlayOwner) -> bool {
        if self.is_open(owner) {
            self.close(surface);
            true
        } else {
            false
        }
    }
}

/// All map state of one page session.
pub struct MapSession {
    pub surface: Rc<dyn MapSurface>,
    pub overlay: OverlaySlot,
    pub facilities: FacilityRegistry,
    pub zones: ZoneLayer,
    pub board: BoardLayer,
    pub route: RoutePlanner,
    pub places: PlaceLayer,
    pub controls: MapControls,
}

impl MapSession {
    pub fn new(surface: Rc<dyn MapSurface>) -> Self {
        Self {
            surface,
            overlay: OverlaySlot::default(),
            facilities: FacilityRegistry::default(),
            zones: ZoneLayer::default(),
            board: BoardLayer::default(),
            route: RoutePlanner::default(),
            places: PlaceLayer::default(),
            controls: MapControls::default(),
        }
    }
}

/// Copyable handle to the session, shared through context.
#[derive(Clone, Copy)]
pub(crate) struct Session(pub StoredValue<Option<MapSession>, LocalStorage>);

impl Session {
    pub fn new() -> Self {
        Self(StoredValue::new_local(None))
    }

    pub fn attach(&self, session: MapSession) {
        self.0.set_value(Some(session));
    }

    pub fn is_ready(&self) -> bool {
        self.0.with_value(Option::is_some)
    }

    /// Runs `f` against the session; `None` until the map has been created.
    pub fn with<R>(&self, f: impl FnOnce(&mut MapSession) -> R) -> Option<R> {
        self.0.try_update_value(|slot| slot.as_mut().map(f)).flatten()
    }
}

/// Mounts `view` into a detached `<div>` for use as overlay content.
pub(crate) fn mount_detached(
    view: impl FnOnce() -> AnyView + 'static,
) -> Option<(web_sys::HtmlElement, Box<dyn Any>)> {
    let document = web_sys::window()?.document()?;
    let element = document
        .create_element("div")
        .ok()?
        .dyn_into::<web_sys::HtmlElement>()
        .ok()?;
    let handle = leptos::mount::mount_to(element.clone(), view);
    Some((element, Box::new(handle)))
}
