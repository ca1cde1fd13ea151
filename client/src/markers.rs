use std::rc::Rc;

use futures::future::try_join_all;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use safenavi_shared::{
    Bounds, Facility, FacilityDetail, FacilityKind, FacilityRecord, SafetyScore,
};

use crate::api;
use crate::app::MapCtx;
use crate::session::{Generation, OverlayOwner, OverlaySlot, Stale, mount_detached};
use crate::surface::{GraphicId, MapSurface, MarkerImage, MarkerSpec};

const MARKER_SIZE: u32 = 40;

/// A facility query about to be issued for the current viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityQuery {
    pub generation: u64,
    pub kinds: Vec<FacilityKind>,
    pub bounds: Bounds,
}

impl FacilityQuery {
    pub fn urls(&self) -> Vec<String> {
        self.kinds
            .iter()
            .map(|kind| format!("/api/facilities?type={}&{}", kind.key(), self.bounds.query()))
            .collect()
    }
}

/// Facility markers currently on the map and the score derived from them.
#[derive(Default)]
pub struct FacilityRegistry {
    generation: Generation,
    drawn: Vec<GraphicId>,
    visible: Vec<Facility>,
    score: Option<SafetyScore>,
}

impl FacilityRegistry {
    /// Clears every facility graphic and the open overlay. Returns the query to run, or `None`
    /// when no filter is active (the score is reset in that case).
    pub fn begin_refresh(
        &mut self,
        surface: &dyn MapSurface,
        overlay: &mut OverlaySlot,
        filters: &[FacilityKind],
    ) -> Option<FacilityQuery> {
        let generation = self.generation.bump();
        self.clear(surface);
        overlay.close(surface);
        if filters.is_empty() {
            self.score = None;
            return None;
        }
        let bounds = surface.viewport()?;
        Some(FacilityQuery {
            generation,
            kinds: filters.to_vec(),
            bounds,
        })
    }

    /// Draws the combined result of `query`. `on_select` builds the click handler per facility.
    pub fn apply(
        &mut self,
        surface: &dyn MapSurface,
        generation: u64,
        records: Vec<FacilityRecord>,
        on_select: &dyn Fn(&Facility) -> Rc<dyn Fn()>,
    ) -> Result<SafetyScore, Stale> {
        self.generation.check(generation)?;
        self.clear(surface);

        let facilities: Vec<Facility> = records
            .into_iter()
            .map(Facility::from)
            .filter(|f| f.position.is_some())
            .collect();
        let specs = facilities
            .iter()
            .filter_map(|f| {
                let at = f.position?;
                Some(
                    MarkerSpec::at(at)
                        .image(MarkerImage::new(
                            f.icon.image_path(),
                            MARKER_SIZE,
                            MARKER_SIZE,
                        ))
                        .title(f.name.clone()),
                )
            })
            .collect();
        let ids = surface.draw_clustered(specs);
        for (id, facility) in ids.iter().zip(&facilities) {
            surface.on_click(*id, on_select(facility));
        }

        let score = SafetyScore::from_facilities(&facilities);
        self.drawn = ids;
        self.visible = facilities;
        self.score = Some(score);
        Ok(score)
    }

    /// A type fetch of `generation` failed: the layer stays empty and the score is withdrawn
    /// rather than computed over a partial set.
    pub fn fail(&mut self, surface: &dyn MapSurface, generation: u64) -> Result<(), Stale> {
        self.generation.check(generation)?;
        self.clear(surface);
        self.score = None;
        Ok(())
    }

    pub fn clear(&mut self, surface: &dyn MapSurface) {
        if !self.drawn.is_empty() {
            surface.clear_clusters();
        }
        self.drawn.clear();
        self.visible.clear();
    }

    pub fn score(&self) -> Option<SafetyScore> {
        self.score
    }

    pub fn visible(&self) -> &[Facility] {
        &self.visible
    }
}

/// One request per facility type, issued together; any failure fails the whole query.
async fn fetch_all(query: &FacilityQuery) -> Result<Vec<FacilityRecord>, api::ApiError> {
    let urls = query.urls();
    let batches =
        try_join_all(urls.iter().map(|url| api::get_json::<Vec<FacilityRecord>>(url))).await?;
    Ok(batches.into_iter().flatten().collect())
}

pub async fn fetch_detail(id: i64) -> Result<FacilityDetail, api::ApiError> {
    api::get_json(&format!("/api/facilities/detail/{id}")).await
}

/// Re-queries facilities for the current viewport and active filters.
pub(crate) fn refresh(ctx: MapCtx) {
    let filters = ctx.filters.get_untracked();
    let Some(query) = ctx.session.with(|s| {
        let query = s
            .facilities
            .begin_refresh(&*s.surface, &mut s.overlay, &filters);
        if query.is_none() {
            ctx.safety.set(None);
        }
        query
    }) else {
        return;
    };
    let Some(query) = query else {
        return;
    };

    spawn_local(async move {
        let records = match fetch_all(&query).await {
            Ok(records) => records,
            Err(e) => {
                web_sys::console::warn_1(&format!("Facility fetch failed: {e}").into());
                let failed = ctx
                    .session
                    .with(|s| s.facilities.fail(&*s.surface, query.generation));
                if let Some(Ok(())) = failed {
                    ctx.safety.set(None);
                    ctx.notices.api_error(&e, "시설 정보를 불러오지 못했습니다.");
                }
                return;
            }
        };
        let applied = ctx.session.with(|s| {
            s.facilities.apply(&*s.surface, query.generation, records, &|facility| {
                let facility = facility.clone();
                Rc::new(move || open_facility(ctx, facility.clone())) as Rc<dyn Fn()>
            })
        });
        match applied {
            Some(Ok(score)) => ctx.safety.set(Some(score)),
            Some(Err(Stale)) | None => {}
        }
    });
}

/// Opens the summary overlay for `facility` and loads its detail into the side panel.
pub(crate) fn open_facility(ctx: MapCtx, facility: Facility) {
    let Some(anchor) = facility.position else {
        return;
    };
    let id = facility.id;
    let Some((element, mount)) =
        mount_detached(move || view! { <FacilityOverlay ctx facility /> }.into_any())
    else {
        return;
    };
    ctx.session.with(|s| {
        let graphic = s.surface.open_overlay(anchor, &element);
        s.overlay
            .install(&*s.surface, OverlayOwner::Facility(id), graphic, Some(mount));
    });

    ctx.detail_request.update_value(|n| *n = n.wrapping_add(1));
    let token = ctx.detail_request.get_value();
    spawn_local(async move {
        let result = fetch_detail(id).await;
        if ctx.detail_request.get_value() != token {
            return;
        }
        match result {
            Ok(detail) => ctx.facility_detail.set(Some(detail)),
            Err(e) => ctx.notices.api_error(&e, "시설 정보를 불러오지 못했습니다."),
        }
    });
}

/// Closes whatever overlay is open once the current event handler has returned.
pub(crate) fn close_overlay_later(ctx: MapCtx) {
    spawn_local(async move {
        ctx.session.with(|s| s.overlay.close(&*s.surface));
    });
}

#[component]
fn FacilityOverlay(ctx: MapCtx, facility: Facility) -> impl IntoView {
    let (status, color) = facility.status_badge();
    let capacity = facility.capacity_label();
    let destination = facility
        .position
        .map(|at| crate::route::RoutePoint::new(at, facility.name.clone()));
    let kind_label = facility.kind.map(FacilityKind::label).unwrap_or("시설");

    view! {
        <div class="kb-custom-overlay">
            <div class="overlay-head">
                <span class="overlay-kind">{kind_label}</span>
                <button class="overlay-close" on:click=move |_| close_overlay_later(ctx)>"×"</button>
            </div>
            <div class="overlay-title">{facility.name.clone()}</div>
            <div class="overlay-status" style=format!("color:{color}")>{format!("● {status}")}</div>
            {capacity.map(|text| view! { <div class="overlay-capacity">{text}</div> })}
            <div class="overlay-actions">
                <button
                    class="overlay-btn"
                    on:click=move |_| ctx.panel.set(crate::app::Panel::FacilityDetail)
                >
                    "자세히 보기 >"
                </button>
                {destination
                    .map(|dest| {
                        view! {
                            <button
                                class="overlay-btn overlay-btn-route"
                                on:click=move |_| crate::route::route_here(ctx, dest.clone())
                            >
                                "길찾기"
                            </button>
                        }
                    })}
            </div>
        </div>
    }
}

/// Side panel with the last fetched facility detail.
#[component]
pub fn FacilityDetailPanel() -> impl IntoView {
    let ctx = expect_context::<MapCtx>();
    view! {
        <div class="panel facility-detail">
            {move || match ctx.facility_detail.get() {
                None => view! { <p class="panel-empty">"시설을 선택하세요."</p> }.into_any(),
                Some(detail) => {
                    let title = detail.name.clone().unwrap_or_else(|| "이름 없음".to_string());
                    let phone = detail.phone().map(str::to_string);
                    let rows = detail
                        .rows()
                        .into_iter()
                        .map(|(label, value)| {
                            view! {
                                <tr>
                                    <th>{label}</th>
                                    <td>{value}</td>
                                </tr>
                            }
                        })
                        .collect_view();
                    view! {
                        <h3 class="panel-title">{title}</h3>
                        <table class="detail-table">{rows}</table>
                        {phone
                            .map(|phone| {
                                view! {
                                    <a class="btn btn-call" href=format!("tel:{phone}")>
                                        "📞 전화하기"
                                    </a>
                                }
                            })}
                    }
                        .into_any()
                }
            }}
        </div>
    }
}

/// Safety score badge for the visible facility set.
#[component]
pub fn SafetyScorePanel() -> impl IntoView {
    let ctx = expect_context::<MapCtx>();
    view! {
        <Show when=move || ctx.safety.get().is_some()>
            {move || {
                ctx.safety
                    .get()
                    .map(|score| {
                        let grade = score.grade();
                        view! {
                            <div class="safety-score-panel">
                                <span
                                    class="safety-score-val"
                                    style=format!("background-color:{}", grade.color_hex())
                                >
                                    {score.value()}
                                </span>
                                <span class="safety-grade" style=format!("color:{}", grade.color_hex())>
                                    {grade.label()}
                                </span>
                            </div>
                        }
                    })
            }}
        </Show>
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::surface::testing::RecordingSurface;

    fn record(id: i64, kind: &str, lat: Option<f64>) -> FacilityRecord {
        FacilityRecord {
            id,
            kind: kind.to_string(),
            name: format!("시설 {id}"),
            latitude: lat,
            longitude: lat.map(|_| 127.0),
            operating_status: None,
            max_capacity: None,
        }
    }

    fn no_click(_: &Facility) -> Rc<dyn Fn()> {
        Rc::new(|| {})
    }

    #[test]
    fn refresh_draws_one_marker_per_located_facility() {
        let surface = RecordingSurface::default();
        let mut overlay = OverlaySlot::default();
        let mut registry = FacilityRegistry::default();

        let query = registry
            .begin_refresh(&surface, &mut overlay, &[FacilityKind::Police, FacilityKind::Shelter])
            .unwrap();
        assert_eq!(query.urls().len(), 2);
        assert!(query.urls()[0].starts_with("/api/facilities?type=police&swLat="));

        let records = vec![
            record(1, "police", Some(37.5)),
            record(2, "shelter", Some(37.51)),
            record(3, "shelter", None),
        ];
        let score = registry
            .apply(&surface, query.generation, records, &no_click)
            .unwrap();
        assert_eq!(surface.clustered.borrow().len(), 2);
        assert_eq!(score.value(), 12);
        assert_eq!(registry.visible().len(), 2);
    }

    #[test]
    fn empty_filters_clear_graphics_overlay_and_score() {
        let surface = RecordingSurface::default();
        let mut overlay = OverlaySlot::default();
        let mut registry = FacilityRegistry::default();
        let query = registry
            .begin_refresh(&surface, &mut overlay, &[FacilityKind::Fire])
            .unwrap();
        registry
            .apply(&surface, query.generation, vec![record(1, "fire", Some(37.5))], &no_click)
            .unwrap();
        let open = surface.fake_overlay();
        overlay.install(&surface, OverlayOwner::Facility(1), open, None);

        assert!(registry.begin_refresh(&surface, &mut overlay, &[]).is_none());
        assert!(surface.clustered.borrow().is_empty());
        assert!(surface.overlays.borrow().is_empty());
        assert_eq!(registry.score(), None);
    }

    #[test]
    fn stale_responses_are_discarded() {
        let surface = RecordingSurface::default();
        let mut overlay = OverlaySlot::default();
        let mut registry = FacilityRegistry::default();
        let slow = registry
            .begin_refresh(&surface, &mut overlay, &[FacilityKind::Hospital])
            .unwrap();
        let fresh = registry
            .begin_refresh(&surface, &mut overlay, &[FacilityKind::Hospital])
            .unwrap();

        registry
            .apply(&surface, fresh.generation, vec![record(1, "hospital", Some(37.5))], &no_click)
            .unwrap();
        let late = registry.apply(
            &surface,
            slow.generation,
            vec![record(2, "hospital", Some(37.5)), record(3, "hospital", Some(37.5))],
            &no_click,
        );
        assert_eq!(late, Err(Stale));
        assert_eq!(surface.clustered.borrow().len(), 1);
        assert_eq!(registry.score().map(SafetyScore::value), Some(5));
    }

    #[test]
    fn failed_type_fetch_leaves_layer_and_score_empty() {
        let surface = RecordingSurface::default();
        let mut overlay = OverlaySlot::default();
        let mut registry = FacilityRegistry::default();
        let first = registry
            .begin_refresh(&surface, &mut overlay, &[FacilityKind::Shelter])
            .unwrap();
        registry
            .apply(&surface, first.generation, vec![record(1, "shelter", Some(37.5))], &no_click)
            .unwrap();
        assert!(registry.score().is_some());

        let second = registry
            .begin_refresh(&surface, &mut overlay, &[FacilityKind::Police, FacilityKind::Shelter])
            .unwrap();
        assert_eq!(registry.fail(&surface, second.generation), Ok(()));
        assert!(surface.clustered.borrow().is_empty());
        assert!(registry.visible().is_empty());
        assert_eq!(registry.score(), None);
        assert_eq!(registry.fail(&surface, first.generation), Err(Stale));
    }

    #[test]
    fn marker_click_reports_its_facility() {
        let surface = RecordingSurface::default();
        let mut overlay = OverlaySlot::default();
        let mut registry = FacilityRegistry::default();
        let query = registry
            .begin_refresh(&surface, &mut overlay, &[FacilityKind::Police])
            .unwrap();
        let clicked = Rc::new(RefCell::new(Vec::new()));
        let sink = clicked.clone();
        registry
            .apply(
                &surface,
                query.generation,
                vec![record(7, "police", Some(37.5)), record(8, "police", Some(37.6))],
                &move |f: &Facility| {
                    let sink = sink.clone();
                    let id = f.id;
                    Rc::new(move || sink.borrow_mut().push(id)) as Rc<dyn Fn()>
                },
            )
            .unwrap();
        let second = *surface.clustered.borrow().keys().nth(1).unwrap();
        surface.click(second);
        assert_eq!(*clicked.borrow(), vec![8]);
    }

    #[test]
    fn score_ignores_input_order() {
        let surface = RecordingSurface::default();
        let mut overlay = OverlaySlot::default();
        let mut a = FacilityRegistry::default();
        let mut b = FacilityRegistry::default();
        let kinds = [FacilityKind::Police, FacilityKind::Hospital];
        let records = vec![
            record(1, "police", Some(37.5)),
            record(2, "hospital", Some(37.5)),
            record(3, "police", Some(37.5)),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let qa = a.begin_refresh(&surface, &mut overlay, &kinds).unwrap();
        let qb = b.begin_refresh(&surface, &mut overlay, &kinds).unwrap();
        assert_eq!(
            a.apply(&surface, qa.generation, records, &no_click),
            b.apply(&surface, qb.generation, reversed, &no_click)
        );
    }
}
