use std::cell::RefCell;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use safenavi_shared::route::{
    RouteResponse, SIMULATION_INTERVAL_MS, SimulationCursor, format_distance,
};
use safenavi_shared::{Bounds, LatLng, PlannedRoute, Recommendation, TravelMode};

use crate::api;
use crate::app::{MapCtx, Panel};
use crate::geolocation;
use crate::kakao;
use crate::markers::close_overlay_later;
use crate::session::{Generation, Stale};
use crate::surface::{Graphic, GraphicId, MapSurface, MarkerImage, MarkerSpec, ShapeStyle};

const START_IMAGE: &str = "/img/markers/route_start.png";
const END_IMAGE: &str = "/img/markers/route_end.png";
const SIMULATION_IMAGE: &str = "/img/markers/marker_me.png";
const NOT_FOUND: &str = "장소를 찾을 수 없습니다.";
const NO_LOCATION: &str = "위치 확인 실패. GPS를 켜주세요.";
const NO_RECOMMENDATION: &str = "근처에 추천할만한 대피소가 없습니다.";
const ARRIVED: &str = "🏁 목적지에 도착했습니다!";

/// A resolved route endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePoint {
    pub position: LatLng,
    pub label: String,
}

impl RoutePoint {
    pub fn new(position: LatLng, label: impl Into<String>) -> Self {
        Self {
            position,
            label: label.into(),
        }
    }
}

/// One path request; only the newest ticket's response is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTicket {
    pub generation: u64,
    pub start: LatLng,
    pub end: LatLng,
    pub mode: TravelMode,
}

impl RouteTicket {
    pub fn url(&self) -> String {
        format!(
            "/api/route/path?startLat={}&startLon={}&endLat={}&endLon={}",
            self.start.lat, self.start.lng, self.end.lat, self.end.lng
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimStep {
    Moved(LatLng),
    Arrived,
    Idle,
}

struct Simulation {
    cursor: SimulationCursor,
    marker: GraphicId,
}

/// Endpoints, the drawn route and the simulation marker.
#[derive(Default)]
pub struct RoutePlanner {
    generation: Generation,
    start: Option<RoutePoint>,
    end: Option<RoutePoint>,
    mode: TravelMode,
    route: Option<PlannedRoute>,
    drawn: Vec<GraphicId>,
    simulation: Option<Simulation>,
}

impl RoutePlanner {
    pub fn start(&self) -> Option<&RoutePoint> {
        self.start.as_ref()
    }

    pub fn end(&self) -> Option<&RoutePoint> {
        self.end.as_ref()
    }

    /// `None` un-resolves the endpoint, e.g. after its text was edited.
    pub fn set_start(&mut self, point: Option<RoutePoint>) {
        self.start = point;
    }

    pub fn set_end(&mut self, point: Option<RoutePoint>) {
        self.end = point;
    }

    pub fn mode(&self) -> TravelMode {
        self.mode
    }

    /// Changes the mode; re-plans when a route is already on the map.
    pub fn set_mode(&mut self, mode: TravelMode) -> Option<RouteTicket> {
        self.mode = mode;
        self.route.as_ref()?;
        self.plan()
    }

    /// Exchanges the endpoints; a new ticket only when both are resolved.
    pub fn swap(&mut self) -> Option<RouteTicket> {
        std::mem::swap(&mut self.start, &mut self.end);
        self.plan()
    }

    pub fn plan(&mut self) -> Option<RouteTicket> {
        let start = self.start.as_ref()?.position;
        let end = self.end.as_ref()?.position;
        Some(RouteTicket {
            generation: self.generation.bump(),
            start,
            end,
            mode: self.mode,
        })
    }

    /// Draws the route for `ticket`. `Ok(None)` when the router found nothing.
    pub fn apply(
        &mut self,
        surface: &dyn MapSurface,
        ticket: &RouteTicket,
        response: &RouteResponse,
    ) -> Result<Option<PlannedRoute>, Stale> {
        self.generation.check(ticket.generation)?;
        self.erase(surface);
        let Some(route) = PlannedRoute::from_response(ticket.mode, response) else {
            return Ok(None);
        };
        let (color, dash) = route.mode.line_style();
        self.drawn.push(surface.draw(Graphic::Polyline {
            path: route.path.clone(),
            style: ShapeStyle::line(color, 6, dash),
        }));
        for (at, image, title) in [
            (ticket.start, START_IMAGE, "출발"),
            (ticket.end, END_IMAGE, "도착"),
        ] {
            let spec = MarkerSpec::at(at)
                .image(MarkerImage::new(image, 50, 45))
                .title(title);
            self.drawn.push(surface.draw(Graphic::Marker(spec)));
        }
        if let Some(bounds) = Bounds::covering(&route.path) {
            surface.fit_to(bounds);
        }
        self.route = Some(route.clone());
        Ok(Some(route))
    }

    pub fn route(&self) -> Option<&PlannedRoute> {
        self.route.as_ref()
    }

    /// Removes everything and forgets the endpoints; in-flight responses are discarded.
    pub fn clear(&mut self, surface: &dyn MapSurface) {
        self.generation.bump();
        self.erase(surface);
        self.start = None;
        self.end = None;
    }

    fn erase(&mut self, surface: &dyn MapSurface) {
        self.stop_simulation(surface);
        for id in self.drawn.drain(..) {
            surface.remove(id);
        }
        self.route = None;
    }

    /// Places the simulation marker at the route start; `false` without a route.
    pub fn start_simulation(&mut self, surface: &dyn MapSurface) -> bool {
        self.stop_simulation(surface);
        let Some(route) = &self.route else {
            return false;
        };
        let mut cursor = SimulationCursor::new(route.path.clone());
        let Some(first) = cursor.next() else {
            return false;
        };
        let spec = MarkerSpec::at(first)
            .image(MarkerImage::new(SIMULATION_IMAGE, 24, 24))
            .z_index(30);
        let marker = surface.draw(Graphic::Marker(spec));
        self.simulation = Some(Simulation { cursor, marker });
        true
    }

    /// Advances one stride; the marker is removed on arrival.
    pub fn step_simulation(&mut self, surface: &dyn MapSurface) -> SimStep {
        let Some(simulation) = &mut self.simulation else {
            return SimStep::Idle;
        };
        match simulation.cursor.next() {
            Some(at) => {
                surface.move_marker(simulation.marker, at);
                surface.pan_to(at);
                SimStep::Moved(at)
            }
            None => {
                self.stop_simulation(surface);
                SimStep::Arrived
            }
        }
    }

    pub fn stop_simulation(&mut self, surface: &dyn MapSurface) {
        if let Some(simulation) = self.simulation.take() {
            surface.remove(simulation.marker);
        }
    }

    pub fn is_simulating(&self) -> bool {
        self.simulation.is_some()
    }
}

/// State of the "safe routes near me" list.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Recommendations {
    #[default]
    Idle,
    Locating,
    NoLocation,
    Empty,
    Failed(String),
    Ready {
        origin: LatLng,
        items: Vec<Recommendation>,
        selected: i64,
    },
}

impl Recommendations {
    /// The first entry is the best-ranked one and starts selected.
    pub fn loaded(origin: LatLng, items: Vec<Recommendation>) -> Self {
        match items.first() {
            None => Self::Empty,
            Some(best) => Self::Ready {
                origin,
                selected: best.facility_id,
                items,
            },
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Locating => Some("현재 위치를 확인하는 중..."),
            Self::NoLocation => Some(NO_LOCATION),
            Self::Empty => Some(NO_RECOMMENDATION),
            Self::Failed(text) => Some(text),
            Self::Idle | Self::Ready { .. } => None,
        }
    }

    pub fn select(&mut self, facility_id: i64) -> Option<(LatLng, Recommendation)> {
        let Self::Ready {
            origin,
            items,
            selected,
        } = self
        else {
            return None;
        };
        let item = items.iter().find(|r| r.facility_id == facility_id)?.clone();
        *selected = facility_id;
        Some((*origin, item))
    }
}

/// Signals behind the route panel.
#[derive(Clone, Copy)]
pub(crate) struct RouteSignals {
    pub start_text: RwSignal<String>,
    pub end_text: RwSignal<String>,
    pub mode: RwSignal<TravelMode>,
    pub result: RwSignal<Option<PlannedRoute>>,
    pub recommendations: RwSignal<Recommendations>,
    pub simulating: RwSignal<bool>,
}

impl RouteSignals {
    pub fn new() -> Self {
        Self {
            start_text: RwSignal::new(String::new()),
            end_text: RwSignal::new(String::new()),
            mode: RwSignal::new(TravelMode::default()),
            result: RwSignal::new(None),
            recommendations: RwSignal::new(Recommendations::Idle),
            simulating: RwSignal::new(false),
        }
    }
}

fn request(ctx: MapCtx, ticket: RouteTicket) {
    spawn_local(async move {
        let response = match api::get_json::<RouteResponse>(&ticket.url()).await {
            Ok(response) => response,
            Err(e) => {
                ctx.notices.api_error(&e, "경로를 불러오지 못했습니다.");
                return;
            }
        };
        let applied = ctx
            .session
            .with(|s| s.route.apply(&*s.surface, &ticket, &response));
        match applied {
            Some(Ok(Some(route))) => ctx.route.result.set(Some(route)),
            Some(Ok(None)) => {
                ctx.route.result.set(None);
                ctx.notices.error("경로를 찾을 수 없습니다.");
            }
            Some(Err(Stale)) | None => {}
        }
    });
}

/// Geocodes whichever endpoints are still text, then requests the path.
pub(crate) fn plan_from_inputs(ctx: MapCtx) {
    let Some((start, end)) = ctx
        .session
        .with(|s| (s.route.start().cloned(), s.route.end().cloned()))
    else {
        return;
    };
    let start_text = ctx.route.start_text.get_untracked();
    let end_text = ctx.route.end_text.get_untracked();
    spawn_local(async move {
        let Some(start) = resolve(start, &start_text).await else {
            ctx.notices.error(NOT_FOUND);
            return;
        };
        let Some(end) = resolve(end, &end_text).await else {
            ctx.notices.error(NOT_FOUND);
            return;
        };
        let ticket = ctx.session.with(|s| {
            s.route.set_start(Some(start));
            s.route.set_end(Some(end));
            s.route.plan()
        });
        if let Some(Some(ticket)) = ticket {
            request(ctx, ticket);
        }
    });
}

async fn resolve(known: Option<RoutePoint>, text: &str) -> Option<RoutePoint> {
    if known.is_some() {
        return known;
    }
    let place = kakao::geocode(text).await?;
    Some(RoutePoint::new(place.position, place.label))
}

/// Routes from the current position to `destination`.
pub(crate) fn route_here(ctx: MapCtx, destination: RoutePoint) {
    close_overlay_later(ctx);
    ctx.panel.set(Panel::Route);
    ctx.route.end_text.set(destination.label.clone());
    spawn_local(async move {
        let start = match geolocation::current_position().await {
            Ok(at) => RoutePoint::new(at, "내 위치"),
            Err(e) => {
                web_sys::console::warn_1(&format!("{e}").into());
                ctx.notices.error(NO_LOCATION);
                return;
            }
        };
        ctx.route.start_text.set(start.label.clone());
        let ticket = ctx.session.with(|s| {
            s.route.set_start(Some(start));
            s.route.set_end(Some(destination));
            s.route.plan()
        });
        if let Some(Some(ticket)) = ticket {
            request(ctx, ticket);
        }
    });
}

fn swap(ctx: MapCtx) {
    let start_text = ctx.route.start_text.get_untracked();
    ctx.route.start_text.set(ctx.route.end_text.get_untracked());
    ctx.route.end_text.set(start_text);
    if let Some(Some(ticket)) = ctx.session.with(|s| s.route.swap()) {
        request(ctx, ticket);
    }
}

fn change_mode(ctx: MapCtx, mode: TravelMode) {
    ctx.route.mode.set(mode);
    if let Some(Some(ticket)) = ctx.session.with(|s| s.route.set_mode(mode)) {
        request(ctx, ticket);
    }
}

pub(crate) fn clear_route(ctx: MapCtx) {
    stop_simulation_timer();
    ctx.session.with(|s| s.route.clear(&*s.surface));
    ctx.route.result.set(None);
    ctx.route.simulating.set(false);
    ctx.route.start_text.set(String::new());
    ctx.route.end_text.set(String::new());
}

/// Looks up shelters near the current position and routes to the best one.
pub(crate) fn find_safe_routes(ctx: MapCtx) {
    ctx.route.recommendations.set(Recommendations::Locating);
    spawn_local(async move {
        let origin = match geolocation::current_position().await {
            Ok(at) => at,
            Err(e) => {
                web_sys::console::warn_1(&format!("{e}").into());
                ctx.route.recommendations.set(Recommendations::NoLocation);
                return;
            }
        };
        let url = format!("/api/route/recommend?lat={}&lon={}", origin.lat, origin.lng);
        let state = match api::get_json::<Vec<Recommendation>>(&url).await {
            Ok(items) => Recommendations::loaded(origin, items),
            Err(e) => Recommendations::Failed(e.user_message("추천 경로를 불러오지 못했습니다.")),
        };
        let best = match &state {
            Recommendations::Ready { selected, .. } => Some(*selected),
            _ => None,
        };
        ctx.route.recommendations.set(state);
        if let Some(id) = best {
            choose_recommendation(ctx, id);
        }
    });
}

fn choose_recommendation(ctx: MapCtx, facility_id: i64) {
    let mut chosen = None;
    ctx.route
        .recommendations
        .update(|state| chosen = state.select(facility_id));
    let Some((origin, item)) = chosen else {
        return;
    };
    ctx.route.start_text.set("내 위치".to_string());
    ctx.route.end_text.set(item.name.clone());
    let ticket = ctx.session.with(|s| {
        s.route.set_start(Some(RoutePoint::new(origin, "내 위치")));
        s.route
            .set_end(Some(RoutePoint::new(item.position(), item.name.clone())));
        s.route.plan()
    });
    if let Some(Some(ticket)) = ticket {
        request(ctx, ticket);
    }
}

struct SimulationBinding {
    window: web_sys::Window,
    interval_id: i32,
    _callback: Closure<dyn Fn()>,
}

thread_local! {
    static SIMULATION_BINDING: RefCell<Option<SimulationBinding>> = const { RefCell::new(None) };
}

fn stop_simulation_timer() {
    SIMULATION_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            old.window.clear_interval_with_handle(old.interval_id);
        }
    });
}

fn simulation_tick(ctx: MapCtx) {
    let step = ctx.session.with(|s| s.route.step_simulation(&*s.surface));
    if matches!(step, Some(SimStep::Arrived | SimStep::Idle) | None) {
        // The interval closure is still on the stack here.
        spawn_local(async move { stop_simulation_timer() });
        ctx.route.simulating.set(false);
        if step == Some(SimStep::Arrived) {
            ctx.notices.success(ARRIVED);
        }
    }
}

fn start_simulation(ctx: MapCtx) {
    stop_simulation_timer();
    let started = ctx
        .session
        .with(|s| s.route.start_simulation(&*s.surface))
        .unwrap_or(false);
    if !started {
        ctx.notices.info("먼저 경로를 검색해주세요.");
        return;
    }
    let Some(window) = web_sys::window() else {
        return;
    };
    let cb = Closure::<dyn Fn()>::new(move || simulation_tick(ctx));
    let Ok(interval_id) = window.set_interval_with_callback_and_timeout_and_arguments_0(
        cb.as_ref().unchecked_ref(),
        SIMULATION_INTERVAL_MS as i32,
    ) else {
        return;
    };
    ctx.route.simulating.set(true);
    SIMULATION_BINDING.with(|slot| {
        *slot.borrow_mut() = Some(SimulationBinding {
            window,
            interval_id,
            _callback: cb,
        });
    });
}

#[component]
pub fn RoutePanel() -> impl IntoView {
    let ctx = expect_context::<MapCtx>();
    let signals = ctx.route;

    let summary = move || {
        signals.result.get().map(|route| {
            view! {
                <div class="route-summary">
                    <span class="route-mode">{route.mode.label()}</span>
                    <strong class="route-time">{route.duration_label()}</strong>
                    <span class="route-distance">{route.distance_label()}</span>
                </div>
            }
        })
    };

    let recommendation_list = move || {
        let state = signals.recommendations.get();
        if let Some(message) = state.message() {
            return view! { <p class="recommend-message">{message.to_string()}</p> }.into_any();
        }
        let Recommendations::Ready {
            items, selected, ..
        } = state
        else {
            return ().into_any();
        };
        items
            .into_iter()
            .map(|item| {
                let id = item.facility_id;
                let badge = item.badge();
                view! {
                    <li
                        class="recommend-item"
                        class:selected=id == selected
                        on:click=move |_| choose_recommendation(ctx, id)
                    >
                        <span class="recommend-badge" style=format!("background:{}", badge.color_hex())>
                            {item.recommendation_type.clone()}
                        </span>
                        <span class="recommend-name">{item.name.clone()}</span>
                        <span class="recommend-meta">
                            {format!(
                                "{} · 도보 {}분 · 차량 {}분",
                                format_distance(item.distance_meter),
                                item.time_walk,
                                item.time_car,
                            )}
                        </span>
                    </li>
                }
            })
            .collect_view()
            .into_any()
    };

    view! {
        <div class="route-panel">
            <div class="route-inputs">
                <input
                    type="text"
                    placeholder="출발지"
                    prop:value=signals.start_text
                    on:input=move |ev| {
                        signals.start_text.set(event_target_value(&ev));
                        ctx.session.with(|s| s.route.set_start(None));
                    }
                />
                <button class="route-swap" title="출발/도착 바꾸기" on:click=move |_| swap(ctx)>
                    "⇅"
                </button>
                <input
                    type="text"
                    placeholder="도착지"
                    prop:value=signals.end_text
                    on:input=move |ev| {
                        signals.end_text.set(event_target_value(&ev));
                        ctx.session.with(|s| s.route.set_end(None));
                    }
                />
            </div>
            <div class="route-modes">
                {TravelMode::ALL
                    .into_iter()
                    .map(|mode| {
                        view! {
                            <button
                                class="route-mode-btn"
                                class:active=move || signals.mode.get() == mode
                                on:click=move |_| change_mode(ctx, mode)
                            >
                                {mode.label()}
                            </button>
                        }
                    })
                    .collect_view()}
            </div>
            <div class="route-actions">
                <button class="btn btn-primary" on:click=move |_| plan_from_inputs(ctx)>
                    "길찾기"
                </button>
                <button
                    class="btn"
                    disabled=move || signals.simulating.get()
                    on:click=move |_| start_simulation(ctx)
                >
                    "▶ 모의주행"
                </button>
                <button class="btn btn-secondary" on:click=move |_| clear_route(ctx)>
                    "초기화"
                </button>
            </div>
            {summary}
            <div class="route-recommend">
                <button class="btn btn-safe" on:click=move |_| find_safe_routes(ctx)>
                    "🛡️ 내 주변 안전 경로"
                </button>
                <ul class="recommend-list">{recommendation_list}</ul>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use safenavi_shared::route::{RouteEntry, RouteRoad, RouteSection, RouteSummary};

    use super::*;
    use crate::surface::testing::RecordingSurface;

    fn point(lat: f64, lng: f64) -> RoutePoint {
        RoutePoint::new(LatLng::new(lat, lng), "지점")
    }

    fn response(points: usize) -> RouteResponse {
        let vertexes = (0..points)
            .flat_map(|i| [127.0 + i as f64 * 0.001, 37.0 + i as f64 * 0.001])
            .collect();
        RouteResponse {
            routes: vec![RouteEntry {
                summary: Some(RouteSummary {
                    distance: 2000.0,
                    duration: 600.0,
                }),
                sections: vec![RouteSection {
                    roads: vec![RouteRoad { vertexes }],
                }],
            }],
        }
    }

    fn recommendation(id: i64) -> Recommendation {
        Recommendation {
            facility_id: id,
            name: format!("대피소 {id}"),
            kind: "shelter".to_string(),
            latitude: 37.0,
            longitude: 127.0,
            recommendation_type: "최적".to_string(),
            distance_meter: 300.0,
            time_walk: 5,
            time_car: 1,
            operating_status: None,
            max_capacity: None,
        }
    }

    #[test]
    fn planning_needs_both_endpoints() {
        let mut planner = RoutePlanner::default();
        assert!(planner.plan().is_none());
        planner.set_start(Some(point(37.0, 127.0)));
        assert!(planner.plan().is_none());
        planner.set_end(Some(point(37.1, 127.1)));
        let ticket = planner.plan().unwrap();
        assert_eq!(
            ticket.url(),
            "/api/route/path?startLat=37&startLon=127&endLat=37.1&endLon=127.1"
        );
    }

    #[test]
    fn swap_replans_only_when_resolved() {
        let mut planner = RoutePlanner::default();
        planner.set_start(Some(point(37.0, 127.0)));
        assert!(planner.swap().is_none());
        assert!(planner.start().is_none());
        assert!(planner.end().is_some());

        planner.set_start(Some(point(36.0, 126.0)));
        let ticket = planner.swap().unwrap();
        assert_eq!(ticket.start, LatLng::new(37.0, 127.0));
        assert_eq!(ticket.end, LatLng::new(36.0, 126.0));
    }

    #[test]
    fn walking_route_draws_dashed_line_and_fits_view() {
        let surface = RecordingSurface::default();
        let mut planner = RoutePlanner::default();
        planner.set_start(Some(point(37.0, 127.0)));
        planner.set_end(Some(point(37.1, 127.1)));
        planner.set_mode(TravelMode::Walk);
        let ticket = planner.plan().unwrap();

        let route = planner.apply(&surface, &ticket, &response(10)).unwrap().unwrap();
        assert_eq!(route.minutes, 30);
        let dashed = surface.count_where(|g| {
            matches!(g, Graphic::Polyline { style, .. } if style.stroke_style == "shortdash")
        });
        assert_eq!(dashed, 1);
        assert_eq!(surface.markers(), 2);
        assert_eq!(surface.fitted.borrow().len(), 1);
    }

    #[test]
    fn superseded_route_response_is_dropped() {
        let surface = RecordingSurface::default();
        let mut planner = RoutePlanner::default();
        planner.set_start(Some(point(37.0, 127.0)));
        planner.set_end(Some(point(37.1, 127.1)));
        let old = planner.plan().unwrap();
        let new = planner.plan().unwrap();
        assert_eq!(planner.apply(&surface, &old, &response(5)), Err(Stale));
        assert!(surface.graphics.borrow().is_empty());
        assert!(planner.apply(&surface, &new, &response(5)).unwrap().is_some());
    }

    #[test]
    fn empty_router_response_leaves_map_clear() {
        let surface = RecordingSurface::default();
        let mut planner = RoutePlanner::default();
        planner.set_start(Some(point(37.0, 127.0)));
        planner.set_end(Some(point(37.1, 127.1)));
        let ticket = planner.plan().unwrap();
        planner.apply(&surface, &ticket, &response(10)).unwrap();
        let ticket = planner.plan().unwrap();
        let outcome = planner.apply(&surface, &ticket, &RouteResponse::default());
        assert_eq!(outcome, Ok(None));
        assert!(surface.graphics.borrow().is_empty());
    }

    #[test]
    fn mode_change_replans_only_a_drawn_route() {
        let surface = RecordingSurface::default();
        let mut planner = RoutePlanner::default();
        planner.set_start(Some(point(37.0, 127.0)));
        planner.set_end(Some(point(37.1, 127.1)));
        assert!(planner.set_mode(TravelMode::Bike).is_none());

        let ticket = planner.plan().unwrap();
        planner.apply(&surface, &ticket, &response(4)).unwrap();
        let replanned = planner.set_mode(TravelMode::Bus).unwrap();
        assert_eq!(replanned.mode, TravelMode::Bus);
    }

    #[test]
    fn simulation_walks_to_the_end_then_stops() {
        let surface = RecordingSurface::default();
        let mut planner = RoutePlanner::default();
        assert!(!planner.start_simulation(&surface));

        planner.set_start(Some(point(37.0, 127.0)));
        planner.set_end(Some(point(37.1, 127.1)));
        let ticket = planner.plan().unwrap();
        planner.apply(&surface, &ticket, &response(4)).unwrap();
        assert!(planner.start_simulation(&surface));

        let mut moves = 0;
        loop {
            match planner.step_simulation(&surface) {
                SimStep::Moved(_) => moves += 1,
                SimStep::Arrived => break,
                SimStep::Idle => panic!("simulation ended early"),
            }
        }
        assert_eq!(moves, 3);
        assert!(!planner.is_simulating());
        assert_eq!(planner.step_simulation(&surface), SimStep::Idle);
        assert_eq!(
            surface.center.get(),
            LatLng::new(37.0 + 3.0 * 0.001, 127.0 + 3.0 * 0.001)
        );
    }

    #[test]
    fn clear_removes_route_and_simulation() {
        let surface = RecordingSurface::default();
        let mut planner = RoutePlanner::default();
        planner.set_start(Some(point(37.0, 127.0)));
        planner.set_end(Some(point(37.1, 127.1)));
        let ticket = planner.plan().unwrap();
        planner.apply(&surface, &ticket, &response(4)).unwrap();
        planner.start_simulation(&surface);
        planner.clear(&surface);
        assert!(surface.graphics.borrow().is_empty());
        assert!(planner.route().is_none());
        assert!(planner.start().is_none());
        assert_eq!(planner.apply(&surface, &ticket, &response(4)), Err(Stale));
    }

    #[test]
    fn recommendation_states_have_distinct_messages() {
        let origin = LatLng::new(37.0, 127.0);
        let empty = Recommendations::loaded(origin, Vec::new());
        assert_eq!(empty.message(), Some(NO_RECOMMENDATION));
        assert_eq!(Recommendations::NoLocation.message(), Some(NO_LOCATION));
        assert_ne!(empty.message(), Recommendations::NoLocation.message());

        let mut ready = Recommendations::loaded(origin, vec![recommendation(7), recommendation(8)]);
        assert!(matches!(ready, Recommendations::Ready { selected: 7, .. }));
        let (from, item) = ready.select(8).unwrap();
        assert_eq!(from, origin);
        assert_eq!(item.facility_id, 8);
        assert!(ready.select(99).is_none());
    }
}
