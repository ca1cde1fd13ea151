use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use safenavi_shared::boundary::{BOUNDARY_DATASET_URL, BoundaryDataset, rings_anchor};
use safenavi_shared::disaster::ZoneStyle;
use safenavi_shared::{DisasterZone, DisasterZoneRecord, LatLng};

use crate::api;
use crate::app::MapCtx;
use crate::session::{Generation, Stale};
use crate::surface::{Graphic, GraphicId, MapSurface, MarkerImage, MarkerSpec, ShapeStyle};

pub const POLL_INTERVAL_MS: i32 = 10_000;
pub const ALERT_DISMISS_MS: u32 = 5_000;
pub const ALERT_FOCUS_LEVEL: u8 = 7;
const ZONE_MARKER_SIZE: u32 = 40;

/// The modal alert for a newly seen zone.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneAlert {
    pub zone_id: i64,
    pub text: String,
    pub focus: Option<LatLng>,
}

#[derive(Default)]
enum Boundaries {
    #[default]
    Missing,
    Loading,
    Ready(Rc<BoundaryDataset>),
}

/// Disaster zone graphics, replaced wholesale on every poll.
#[derive(Default)]
pub struct ZoneLayer {
    generation: Generation,
    drawn: Vec<GraphicId>,
    zones: Vec<DisasterZone>,
    alerted: HashSet<i64>,
    alert_visible: bool,
    boundaries: Boundaries,
}

impl ZoneLayer {
    pub fn begin_poll(&mut self) -> u64 {
        self.generation.bump()
    }

    /// Whether the boundary dataset should be fetched before `zones` can be drawn. Marks the
    /// fetch as started so concurrent polls do not repeat it.
    pub fn claim_boundary_fetch(&mut self, zones: &[DisasterZone]) -> bool {
        let wanted = zones.iter().any(|z| z.area_name.is_some());
        if wanted && matches!(self.boundaries, Boundaries::Missing) {
            self.boundaries = Boundaries::Loading;
            true
        } else {
            false
        }
    }

    /// Stores the fetched dataset, or re-arms the fetch for the next poll on failure.
    pub fn boundaries_loaded(&mut self, dataset: Option<BoundaryDataset>) {
        self.boundaries = match dataset {
            Some(dataset) => Boundaries::Ready(Rc::new(dataset)),
            None => Boundaries::Missing,
        };
    }

    /// Redraws from `zones` and returns the alert to show, if any.
    pub fn apply(
        &mut self,
        surface: &dyn MapSurface,
        generation: u64,
        zones: Vec<DisasterZone>,
    ) -> Result<Option<ZoneAlert>, Stale> {
        self.generation.check(generation)?;
        self.clear(surface);

        let mut anchors = Vec::with_capacity(zones.len());
        for zone in &zones {
            anchors.push(self.draw_zone(surface, zone));
        }
        let alert = self.admit_alert(&zones, &anchors);
        self.zones = zones;
        Ok(alert)
    }

    /// Draws one zone; returns where its marker went.
    fn draw_zone(&mut self, surface: &dyn MapSurface, zone: &DisasterZone) -> Option<LatLng> {
        let style = zone.kind.style();
        let shape = ShapeStyle {
            stroke_color: style.stroke.to_string(),
            stroke_weight: ZoneStyle::STROKE_WEIGHT,
            stroke_opacity: ZoneStyle::STROKE_OPACITY,
            stroke_style: "solid",
            fill_color: Some(style.fill.to_string()),
            fill_opacity: ZoneStyle::FILL_OPACITY,
        };
        let icon = MarkerImage::new(zone.kind.icon_path(), ZONE_MARKER_SIZE, ZONE_MARKER_SIZE);
        let mut anchor = None;

        if let Some((center, radius_m)) = zone.circle() {
            self.drawn.push(surface.draw(Graphic::Circle {
                center,
                radius_m,
                style: shape.clone(),
            }));
            self.drawn.push(Self::zone_marker(surface, center, &icon, zone));
            anchor = Some(center);
        }

        if let (Some(area), Boundaries::Ready(dataset)) = (&zone.area_name, &self.boundaries) {
            let dataset = dataset.clone();
            let rings: Vec<Vec<LatLng>> = dataset
                .resolve(area)
                .into_iter()
                .flat_map(|feature| feature.outer_rings())
                .filter(|ring| ring.len() >= 3)
                .collect();
            for ring in &rings {
                self.drawn.push(surface.draw(Graphic::Polygon {
                    path: ring.clone(),
                    style: shape.clone(),
                }));
            }
            if let Some(at) = rings_anchor(&rings) {
                self.drawn.push(Self::zone_marker(surface, at, &icon, zone));
                anchor = anchor.or(Some(at));
            }
        }
        anchor
    }

    fn zone_marker(
        surface: &dyn MapSurface,
        at: LatLng,
        icon: &MarkerImage,
        zone: &DisasterZone,
    ) -> GraphicId {
        let spec = MarkerSpec::at(at)
            .image(icon.clone())
            .title(zone.marker_title(chrono::Utc::now()))
            .z_index(10);
        surface.draw(Graphic::Marker(spec))
    }

    /// At most one alert is visible. While it is, nothing is recorded and new zones wait for a
    /// later poll. Otherwise the first unseen zone is shown and every unseen zone of this
    /// snapshot is recorded.
    fn admit_alert(
        &mut self,
        zones: &[DisasterZone],
        anchors: &[Option<LatLng>],
    ) -> Option<ZoneAlert> {
        if self.alert_visible {
            return None;
        }
        let mut fresh = zones
            .iter()
            .zip(anchors)
            .filter(|(zone, _)| !self.alerted.contains(&zone.id))
            .peekable();
        let (first, focus) = fresh.peek().copied()?;
        let alert = ZoneAlert {
            zone_id: first.id,
            text: first.alert_text(),
            focus: *focus,
        };
        let ids: Vec<i64> = fresh.map(|(zone, _)| zone.id).collect();
        self.alerted.extend(ids);
        self.alert_visible = true;
        Some(alert)
    }

    pub fn dismiss_alert(&mut self) {
        self.alert_visible = false;
    }

    pub fn clear(&mut self, surface: &dyn MapSurface) {
        for id in self.drawn.drain(..) {
            surface.remove(id);
        }
    }

    pub fn zones(&self) -> &[DisasterZone] {
        &self.zones
    }
}

pub async fn fetch_zones() -> Result<Vec<DisasterZone>, api::ApiError> {
    let records: Vec<DisasterZoneRecord> = api::get_json("/api/disaster-zones").await?;
    Ok(records.into_iter().map(DisasterZone::from).collect())
}

async fn fetch_boundaries() -> Option<BoundaryDataset> {
    match api::get_json::<BoundaryDataset>(BOUNDARY_DATASET_URL).await {
        Ok(dataset) => Some(dataset),
        Err(e) => {
            web_sys::console::warn_1(&format!("boundary dataset fetch failed: {e}").into());
            None
        }
    }
}

/// One poll cycle: fetch, resolve boundaries if needed, redraw, raise an alert.
pub(crate) fn poll(ctx: MapCtx) {
    let Some(generation) = ctx.session.with(|s| s.zones.begin_poll()) else {
        return;
    };
    spawn_local(async move {
        let zones = match fetch_zones().await {
            Ok(zones) => zones,
            Err(e) => {
                web_sys::console::warn_1(&format!("disaster zone poll failed: {e}").into());
                return;
            }
        };
        if ctx.session.with(|s| s.zones.claim_boundary_fetch(&zones)) == Some(true) {
            let dataset = fetch_boundaries().await;
            ctx.session.with(|s| s.zones.boundaries_loaded(dataset));
        }
        let alert = ctx
            .session
            .with(|s| s.zones.apply(&*s.surface, generation, zones));
        if let Some(Ok(Some(alert))) = alert {
            show_alert(ctx, alert);
        }
    });
}

fn show_alert(ctx: MapCtx, alert: ZoneAlert) {
    let zone_id = alert.zone_id;
    ctx.zone_alert.set(Some(alert));
    gloo_timers::callback::Timeout::new(ALERT_DISMISS_MS, move || {
        if ctx
            .zone_alert
            .with_untracked(|a| a.as_ref().map(|a| a.zone_id))
            == Some(zone_id)
        {
            ctx.zone_alert.set(None);
        }
        ctx.session.with(|s| s.zones.dismiss_alert());
    })
    .forget();
}

struct PollBinding {
    window: web_sys::Window,
    interval_id: i32,
    _callback: Closure<dyn Fn()>,
}

thread_local! {
    static POLL_BINDING: RefCell<Option<PollBinding>> = const { RefCell::new(None) };
}

/// Polls immediately, then every [`POLL_INTERVAL_MS`].
pub(crate) fn start_polling(ctx: MapCtx) {
    stop_polling();
    poll(ctx);
    let Some(window) = web_sys::window() else {
        return;
    };
    let cb = Closure::<dyn Fn()>::new(move || poll(ctx));
    let Ok(interval_id) = window.set_interval_with_callback_and_timeout_and_arguments_0(
        cb.as_ref().unchecked_ref(),
        POLL_INTERVAL_MS,
    ) else {
        return;
    };
    POLL_BINDING.with(|slot| {
        *slot.borrow_mut() = Some(PollBinding {
            window,
            interval_id,
            _callback: cb,
        });
    });
}

pub(crate) fn stop_polling() {
    POLL_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            old.window.clear_interval_with_handle(old.interval_id);
        }
    });
}

#[component]
pub fn DisasterAlertModal() -> impl IntoView {
    let ctx = expect_context::<MapCtx>();
    let focus = move |_| {
        if let Some(at) = ctx.zone_alert.get_untracked().and_then(|a| a.focus) {
            ctx.session.with(|s| {
                s.surface.set_level(ALERT_FOCUS_LEVEL);
                s.surface.pan_to(at);
            });
        }
    };
    view! {
        <div
            id="disaster-modal"
            class="disaster-modal"
            class:show=move || ctx.zone_alert.with(Option::is_some)
            on:click=focus
        >
            <p class="disaster-modal-message">
                {move || ctx.zone_alert.get().map(|a| a.text).unwrap_or_default()}
            </p>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safenavi_shared::boundary::{BoundaryFeature, BoundaryGeometry, BoundaryProperties};

    fn zone(id: i64, kind: &str, circle: bool, area: Option<&str>) -> DisasterZone {
        DisasterZone::from(DisasterZoneRecord {
            id,
            disaster_type: kind.to_string(),
            latitude: circle.then_some(37.5),
            longitude: circle.then_some(127.0),
            radius: circle.then_some(500.0),
            area_name: area.map(str::to_string),
            start_time: None,
            expiry_time: None,
        })
    }

    fn seoul_dataset() -> BoundaryDataset {
        BoundaryDataset {
            features: vec![BoundaryFeature {
                properties: BoundaryProperties {
                    code: "11010".to_string(),
                    name: "종로구".to_string(),
                },
                geometry: BoundaryGeometry::Polygon(vec![vec![
                    [126.9, 37.5],
                    [127.0, 37.5],
                    [127.0, 37.6],
                    [126.9, 37.5],
                ]]),
            }],
        }
    }

    #[test]
    fn each_poll_replaces_previous_graphics() {
        let surface = crate::surface::testing::RecordingSurface::default();
        let mut layer = ZoneLayer::default();

        let g = layer.begin_poll();
        layer
            .apply(&surface, g, vec![zone(1, "fire", true, None), zone(2, "flood", true, None)])
            .unwrap();
        assert_eq!(surface.graphics.borrow().len(), 4);

        let g = layer.begin_poll();
        layer.apply(&surface, g, vec![zone(2, "flood", true, None)]).unwrap();
        assert_eq!(surface.graphics.borrow().len(), 2);
        assert_eq!(layer.zones().len(), 1);
    }

    #[test]
    fn two_new_zones_raise_one_alert_and_record_both() {
        let surface = crate::surface::testing::RecordingSurface::default();
        let mut layer = ZoneLayer::default();
        let g = layer.begin_poll();
        let alert = layer
            .apply(&surface, g, vec![zone(1, "fire", true, None), zone(2, "quake", true, None)])
            .unwrap()
            .unwrap();
        assert_eq!(alert.zone_id, 1);
        assert_eq!(alert.focus, Some(LatLng::new(37.5, 127.0)));

        layer.dismiss_alert();
        let g = layer.begin_poll();
        let next = layer
            .apply(&surface, g, vec![zone(1, "fire", true, None), zone(2, "quake", true, None)])
            .unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn visible_alert_defers_new_zones_to_a_later_poll() {
        let surface = crate::surface::testing::RecordingSurface::default();
        let mut layer = ZoneLayer::default();
        let g = layer.begin_poll();
        layer.apply(&surface, g, vec![zone(1, "fire", true, None)]).unwrap();

        let g = layer.begin_poll();
        let while_open = layer
            .apply(&surface, g, vec![zone(1, "fire", true, None), zone(3, "snow", true, None)])
            .unwrap();
        assert_eq!(while_open, None);

        layer.dismiss_alert();
        let g = layer.begin_poll();
        let later = layer
            .apply(&surface, g, vec![zone(1, "fire", true, None), zone(3, "snow", true, None)])
            .unwrap();
        assert_eq!(later.map(|a| a.zone_id), Some(3));
    }

    #[test]
    fn area_zones_wait_for_boundaries() {
        let surface = crate::surface::testing::RecordingSurface::default();
        let mut layer = ZoneLayer::default();
        let zones = vec![zone(5, "heavyrain", false, Some("서울특별시 종로구"))];

        assert!(layer.claim_boundary_fetch(&zones));
        assert!(!layer.claim_boundary_fetch(&zones));
        layer.boundaries_loaded(Some(seoul_dataset()));

        let g = layer.begin_poll();
        let alert = layer.apply(&surface, g, zones).unwrap().unwrap();
        assert_eq!(surface.count_where(|g| matches!(g, Graphic::Polygon { .. })), 1);
        assert_eq!(surface.markers(), 1);
        assert!(alert.text.contains("서울특별시 종로구"));
        assert!(alert.focus.is_some());
    }

    #[test]
    fn failed_boundary_fetch_is_retried() {
        let mut layer = ZoneLayer::default();
        let zones = vec![zone(5, "flood", false, Some("종로구"))];
        assert!(layer.claim_boundary_fetch(&zones));
        layer.boundaries_loaded(None);
        assert!(layer.claim_boundary_fetch(&zones));
    }

    #[test]
    fn stale_poll_is_ignored() {
        let surface = crate::surface::testing::RecordingSurface::default();
        let mut layer = ZoneLayer::default();
        let old = layer.begin_poll();
        let new = layer.begin_poll();
        layer.apply(&surface, new, vec![]).unwrap();
        assert_eq!(layer.apply(&surface, old, vec![zone(1, "fire", true, None)]), Err(Stale));
        assert!(surface.graphics.borrow().is_empty());
    }
}
