use std::cell::RefCell;
use std::rc::Rc;

use gloo_storage::Storage;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen_futures::spawn_local;

use safenavi_shared::places::{PlaceBook, rescue_sms_link};
use safenavi_shared::{DEFAULT_CENTER, FacilityDetail, FacilityKind, SafetyScore};

use crate::board::{self, BoardComposer, ComposeStage, ImageViewer, OpenPost, ReportDialog, ReportSubject};
use crate::disaster::{self, DisasterAlertModal, ZoneAlert};
use crate::geolocation::PositionWatch;
use crate::kakao::{self, KakaoSurface};
use crate::live_feed::{self, FeedIndicator, FeedStatus};
use crate::markers::{self, FacilityDetailPanel, SafetyScorePanel};
use crate::notice::{NoticeStack, Notices};
use crate::places::{self, FamilyPanel, MyPlacesPanel};
use crate::route::{RoutePanel, RouteSignals};
use crate::search::SearchPanel;
use crate::session::{MapSession, Session};
use crate::storage::BlockList;
use crate::surface::{MapLayer, MapSurface};
use crate::weather::WeatherWidget;

const SETTINGS_KEY: &str = "safety_map_settings";
const DARK_MODE_CLASS: &str = "dark-mode";

/// Side panel currently shown next to the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Panel {
    None,
    FacilityDetail,
    Route,
    Search,
    MyPlaces,
    Family,
}

impl Panel {
    /// Clicking the active panel's button closes it.
    pub fn toggled(self, requested: Panel) -> Panel {
        if self == requested { Panel::None } else { requested }
    }
}

/// Everything the map page's components share, provided once through context.
#[derive(Clone, Copy)]
pub(crate) struct MapCtx {
    pub session: Session,
    pub notices: Notices,
    pub filters: RwSignal<Vec<FacilityKind>>,
    pub safety: RwSignal<Option<SafetyScore>>,
    pub facility_detail: RwSignal<Option<FacilityDetail>>,
    /// Bumped per detail request; responses for older tokens are dropped.
    pub detail_request: StoredValue<u64>,
    pub panel: RwSignal<Panel>,
    pub zone_alert: RwSignal<Option<ZoneAlert>>,
    pub open_post: RwSignal<Option<OpenPost>>,
    pub blocked: RwSignal<BlockList>,
    pub compose: RwSignal<ComposeStage>,
    pub image_view: RwSignal<Option<String>>,
    pub report: RwSignal<Option<ReportSubject>>,
    pub route: RouteSignals,
    pub places: RwSignal<PlaceBook>,
    pub feed: RwSignal<FeedStatus>,
    /// The viewport moved since the last facility query.
    pub stale_view: RwSignal<bool>,
}

impl MapCtx {
    fn new(notices: Notices, settings: &MapSettings) -> Self {
        Self {
            session: Session::new(),
            notices,
            filters: RwSignal::new(settings.filters.clone()),
            safety: RwSignal::new(None),
            facility_detail: RwSignal::new(None),
            detail_request: StoredValue::new(0),
            panel: RwSignal::new(Panel::None),
            zone_alert: RwSignal::new(None),
            open_post: RwSignal::new(None),
            blocked: RwSignal::new(BlockList::load()),
            compose: RwSignal::new(ComposeStage::Idle),
            image_view: RwSignal::new(None),
            report: RwSignal::new(None),
            route: RouteSignals::new(),
            places: RwSignal::new(PlaceBook::default()),
            feed: RwSignal::new(FeedStatus::Connecting),
            stale_view: RwSignal::new(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct MapSettings {
    filters: Vec<FacilityKind>,
    dark_mode: bool,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            filters: FacilityKind::ALL.to_vec(),
            dark_mode: false,
        }
    }
}

/// Flips `kind` in the filter set, keeping the canonical order.
fn toggle_filter(filters: &[FacilityKind], kind: FacilityKind) -> Vec<FacilityKind> {
    let on = !filters.contains(&kind);
    FacilityKind::ALL
        .into_iter()
        .filter(|k| if *k == kind { on } else { filters.contains(k) })
        .collect()
}

fn set_dark_mode(enabled: bool) {
    let Some(body) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.body())
    else {
        return;
    };
    if let Err(e) = body.class_list().toggle_with_force(DARK_MODE_CLASS, enabled) {
        web_sys::console::warn_1(&e);
    }
}

struct KeydownBinding {
    window: web_sys::Window,
    _handler: Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
    static POSITION_WATCH: RefCell<Option<PositionWatch>> = const { RefCell::new(None) };
}

/// Starts or stops live location tracking. Returns whether tracking is now on.
fn toggle_tracking(ctx: MapCtx) -> bool {
    let was_on = POSITION_WATCH.with(|slot| slot.borrow_mut().take().is_some());
    if was_on {
        ctx.session.with(|s| s.controls.stop_tracking(&*s.surface));
        return false;
    }
    let first_fix = Rc::new(std::cell::Cell::new(true));
    let watch = PositionWatch::start(move |at| {
        ctx.session.with(|s| {
            s.controls.track(&*s.surface, at);
            if first_fix.replace(false) {
                s.surface.pan_to(at);
            }
        });
    });
    match watch {
        Ok(watch) => {
            POSITION_WATCH.with(|slot| *slot.borrow_mut() = Some(watch));
            true
        }
        Err(e) => {
            web_sys::console::warn_1(&format!("tracking unavailable: {e}").into());
            ctx.notices.error("위치 정보를 가져올 수 없습니다.");
            false
        }
    }
}

fn stop_tracking() {
    POSITION_WATCH.with(|slot| slot.borrow_mut().take());
}

/// Escape backs out of whatever the user is in the middle of.
fn bind_escape(ctx: MapCtx) {
    let Some(window) = web_sys::window() else {
        return;
    };
    KEYDOWN_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old
                .window
                .remove_event_listener_with_callback("keydown", old._handler.as_ref().unchecked_ref());
        }
    });
    let handler = Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
        if e.key() != "Escape" {
            return;
        }
        if ctx.image_view.get_untracked().is_some() {
            ctx.image_view.set(None);
        } else if ctx.report.get_untracked().is_some() {
            ctx.report.set(None);
        } else if ctx.compose.get_untracked() != ComposeStage::Idle {
            board::leave_write_mode(ctx);
        } else if ctx.panel.get_untracked() != Panel::None {
            ctx.panel.set(Panel::None);
        } else {
            ctx.session.with(|s| s.overlay.close(&*s.surface));
        }
    });
    if window
        .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
        .is_ok()
    {
        KEYDOWN_BINDING.with(|slot| {
            *slot.borrow_mut() = Some(KeydownBinding {
                window,
                _handler: handler,
            });
        });
    }
}

/// Creates the map in `container` and starts every background feed.
fn start_session(ctx: MapCtx, container: &web_sys::HtmlElement) {
    if !kakao::sdk_loaded() {
        web_sys::console::warn_1(&"kakao maps SDK is not loaded".into());
        ctx.notices.error("지도를 불러오지 못했습니다. 잠시 후 다시 시도해주세요.");
        return;
    }
    let surface = Rc::new(KakaoSurface::create(container, DEFAULT_CENTER));
    surface.on_idle(move || ctx.stale_view.set(true));
    surface.on_map_click(move |at| {
        if board::compose_map_click(ctx, at) {
            return;
        }
        ctx.session.with(|s| s.overlay.close(&*s.surface));
    });
    ctx.session.attach(MapSession::new(surface as Rc<dyn MapSurface>));

    markers::refresh(ctx);
    disaster::start_polling(ctx);
    board::reload(ctx);
    live_feed::connect(ctx);
    places::load_places(ctx);
}

/// Sends the 119 rescue SMS with the best known position.
fn request_rescue(ctx: MapCtx) {
    spawn_local(async move {
        if let Some(at) = places::message_position(ctx).await {
            places::open_link(&rescue_sms_link(at));
        }
    });
}

#[component]
fn MapToolbar(ctx: MapCtx, dark_mode: RwSignal<bool>) -> impl IntoView {
    let layers = RwSignal::new(Vec::<MapLayer>::new());
    let radius_on = RwSignal::new(false);
    let tracking = RwSignal::new(false);

    let toggle_layer = move |layer: MapLayer| {
        let visible = !layers.with_untracked(|l| l.contains(&layer));
        layers.update(|l| {
            if visible {
                l.push(layer);
            } else {
                l.retain(|x| *x != layer);
            }
        });
        ctx.session.with(|s| s.surface.set_layer(layer, visible));
    };
    let toggle_radius = move |_| {
        let shown = ctx.session.with(|s| {
            let center = s.surface.center();
            s.controls.toggle_radius(&*s.surface, center)
        });
        radius_on.set(shown.unwrap_or(false));
    };

    view! {
        <div class="map-toolbar">
            {[
                (MapLayer::Traffic, "교통정보"),
                (MapLayer::Terrain, "지형도"),
                (MapLayer::Skyview, "스카이뷰"),
            ]
                .into_iter()
                .map(|(layer, label)| {
                    view! {
                        <button
                            class="toolbar-btn"
                            class:active=move || layers.with(|l| l.contains(&layer))
                            on:click=move |_| toggle_layer(layer)
                        >
                            {label}
                        </button>
                    }
                })
                .collect_view()}
            <button class="toolbar-btn" class:active=move || radius_on.get() on:click=toggle_radius>"반경"</button>
            <button
                class="toolbar-btn"
                class:active=move || tracking.get()
                on:click=move |_| tracking.set(toggle_tracking(ctx))
            >
                "내 위치"
            </button>
            <button
                class="toolbar-btn"
                class:active=move || dark_mode.get()
                on:click=move |_| dark_mode.update(|on| *on = !*on)
            >
                "다크모드"
            </button>
            <button class="toolbar-btn toolbar-sos" on:click=move |_| request_rescue(ctx)>"119 문자"</button>
        </div>
    }
}

#[component]
fn FilterBar(ctx: MapCtx) -> impl IntoView {
    let toggle = move |kind: FacilityKind| {
        ctx.filters.update(|f| *f = toggle_filter(f, kind));
        markers::refresh(ctx);
    };
    view! {
        <div class="filter-bar">
            {FacilityKind::ALL
                .into_iter()
                .map(|kind| {
                    view! {
                        <button
                            class="filter-btn"
                            class:active=move || ctx.filters.with(|f| f.contains(&kind))
                            on:click=move |_| toggle(kind)
                        >
                            {kind.label()}
                        </button>
                    }
                })
                .collect_view()}
        </div>
        <Show when=move || ctx.stale_view.get()>
            <button
                class="research-btn"
                on:click=move |_| {
                    ctx.stale_view.set(false);
                    markers::refresh(ctx);
                }
            >
                "현 지도에서 재검색"
            </button>
        </Show>
    }
}

#[component]
fn RoadviewPanel(ctx: MapCtx) -> impl IntoView {
    let open = RwSignal::new(false);
    let container = NodeRef::<leptos::html::Div>::new();

    let show = move |_| {
        let Some(at) = ctx.session.with(|s| s.surface.center()) else {
            return;
        };
        open.set(true);
        spawn_local(async move {
            let Some(el) = container.get_untracked() else {
                return;
            };
            if !kakao::show_roadview(&el, at).await {
                open.set(false);
                ctx.notices.info("이 위치에는 로드뷰가 없습니다.");
            }
        });
    };

    view! {
        <button class="toolbar-btn roadview-btn" on:click=show>"로드뷰"</button>
        <div class="roadview-panel" class:show=move || open.get()>
            <button class="roadview-close" on:click=move |_| open.set(false)>"×"</button>
            <div class="roadview-container" node_ref=container></div>
        </div>
    }
}

#[component]
fn PanelNav(ctx: MapCtx) -> impl IntoView {
    view! {
        <nav class="panel-nav">
            {[
                (Panel::Search, "검색"),
                (Panel::Route, "길찾기"),
                (Panel::MyPlaces, "내 장소"),
                (Panel::Family, "가족"),
            ]
                .into_iter()
                .map(|(panel, label)| {
                    view! {
                        <button
                            class="panel-nav-btn"
                            class:active=move || ctx.panel.get() == panel
                            on:click=move |_| ctx.panel.update(|p| *p = p.toggled(panel))
                        >
                            {label}
                        </button>
                    }
                })
                .collect_view()}
        </nav>
    }
}

/// Root of the map page.
#[component]
pub fn App() -> impl IntoView {
    let settings: MapSettings = gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default();
    let notices = Notices::new();
    let ctx = MapCtx::new(notices, &settings);
    let dark_mode = RwSignal::new(settings.dark_mode);
    provide_context(notices);
    provide_context(ctx);

    Effect::new(move || {
        let settings = MapSettings {
            filters: ctx.filters.get(),
            dark_mode: dark_mode.get(),
        };
        set_dark_mode(settings.dark_mode);
        if let Err(e) = gloo_storage::LocalStorage::set(SETTINGS_KEY, &settings) {
            web_sys::console::warn_1(&format!("failed to save map settings: {e}").into());
        }
    });

    let map_ref = NodeRef::<leptos::html::Div>::new();
    Effect::new(move || {
        let Some(container) = map_ref.get() else {
            return;
        };
        if ctx.session.is_ready() {
            return;
        }
        start_session(ctx, &container);
        bind_escape(ctx);
    });

    on_cleanup(|| {
        live_feed::disconnect();
        disaster::stop_polling();
        stop_tracking();
    });

    let panel = move || ctx.panel.get();

    view! {
        <NoticeStack />
        <div class="map-wrap">
            <div id="map" class="map" node_ref=map_ref></div>
            <FilterBar ctx=ctx />
            <MapToolbar ctx=ctx dark_mode=dark_mode />
            <RoadviewPanel ctx=ctx />
            <WeatherWidget />
            <SafetyScorePanel />
            <FeedIndicator />
            <BoardComposer />
        </div>
        <aside class="side-panel" class:open=move || panel() != Panel::None>
            <PanelNav ctx=ctx />
            <Show when=move || panel() == Panel::FacilityDetail>
                <FacilityDetailPanel />
            </Show>
            <Show when=move || panel() == Panel::Search>
                <SearchPanel />
            </Show>
            <Show when=move || panel() == Panel::Route>
                <RoutePanel />
            </Show>
            <Show when=move || panel() == Panel::MyPlaces>
                <MyPlacesPanel />
            </Show>
            <Show when=move || panel() == Panel::Family>
                <FamilyPanel />
            </Show>
        </aside>
        <DisasterAlertModal />
        <ReportDialog />
        <ImageViewer />
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_toggle_keeps_canonical_order() {
        let filters = vec![FacilityKind::Shelter];
        let filters = toggle_filter(&filters, FacilityKind::Police);
        assert_eq!(filters, vec![FacilityKind::Police, FacilityKind::Shelter]);
        let filters = toggle_filter(&filters, FacilityKind::Shelter);
        assert_eq!(filters, vec![FacilityKind::Police]);
        assert!(toggle_filter(&filters, FacilityKind::Police).is_empty());
    }

    #[test]
    fn active_panel_button_closes_it() {
        assert_eq!(Panel::None.toggled(Panel::Route), Panel::Route);
        assert_eq!(Panel::Route.toggled(Panel::Route), Panel::None);
        assert_eq!(Panel::Route.toggled(Panel::Search), Panel::Search);
    }

    #[test]
    fn settings_default_to_every_filter() {
        let settings: MapSettings = serde_json::from_str(r#"{"darkMode":true}"#).unwrap();
        assert_eq!(settings.filters, FacilityKind::ALL.to_vec());
        let settings: MapSettings = serde_json::from_str(r#"{"dark_mode":true,"filters":["fire"]}"#).unwrap();
        assert!(settings.dark_mode);
        assert_eq!(settings.filters, vec![FacilityKind::Fire]);
    }
}
