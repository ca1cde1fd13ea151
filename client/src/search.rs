use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use safenavi_shared::facility::SearchHit;
use safenavi_shared::search::{RecentSearches, highlight_segments, normalize_keyword};
use safenavi_shared::{Facility, FacilityRecord};

use crate::api;
use crate::app::MapCtx;
use crate::markers::open_facility;
use crate::storage;

const SELECT_LEVEL: u8 = 3;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SearchResults {
    #[default]
    Idle,
    Loading,
    Found {
        keyword: String,
        hits: Vec<SearchHit>,
    },
    Failed(String),
}

impl SearchResults {
    pub fn found(keyword: String, hits: Vec<SearchHit>) -> Self {
        Self::Found { keyword, hits }
    }
}

/// The overlay summary for a search hit; search rows carry no status or capacity.
pub fn hit_facility(hit: &SearchHit) -> Facility {
    Facility::from(FacilityRecord {
        id: hit.id,
        kind: hit.kind.clone(),
        name: hit.name.clone(),
        latitude: hit.latitude,
        longitude: hit.longitude,
        operating_status: None,
        max_capacity: None,
    })
}

fn run_search(ctx: MapCtx, raw: String, recent: RwSignal<RecentSearches>, results: RwSignal<SearchResults>) {
    let keyword = match normalize_keyword(&raw) {
        Ok(keyword) => keyword,
        Err(e) => {
            ctx.notices.error(e.to_string());
            return;
        }
    };
    recent.update(|r| r.record(&keyword));
    recent.with_untracked(storage::save_recent_searches);
    results.set(SearchResults::Loading);
    spawn_local(async move {
        let url = format!("/api/facilities/search?keyword={}", urlencoding::encode(&keyword));
        let next = match api::get_json::<Vec<SearchHit>>(&url).await {
            Ok(hits) => SearchResults::found(keyword, hits),
            Err(e) => SearchResults::Failed(e.user_message("검색에 실패했습니다.")),
        };
        results.set(next);
    });
}

fn select(ctx: MapCtx, hit: &SearchHit) {
    let Some(at) = hit.position() else {
        ctx.notices.error("위치 정보가 없는 시설입니다.");
        return;
    };
    ctx.session.with(|s| {
        s.surface.set_level(SELECT_LEVEL);
        s.surface.pan_to(at);
    });
    open_facility(ctx, hit_facility(hit));
}

fn highlighted(text: &str, keyword: &str) -> impl IntoView + use<> {
    highlight_segments(text, keyword)
        .into_iter()
        .map(|(segment, hit)| {
            if hit {
                view! { <mark class="search-highlight">{segment}</mark> }.into_any()
            } else {
                segment.into_any()
            }
        })
        .collect_view()
}

#[component]
pub fn SearchPanel() -> impl IntoView {
    let ctx = expect_context::<MapCtx>();
    let query = RwSignal::new(String::new());
    let recent = RwSignal::new(storage::load_recent_searches());
    let results = RwSignal::new(SearchResults::Idle);

    let submit = move || run_search(ctx, query.get_untracked(), recent, results);

    let list = move || match results.get() {
        SearchResults::Idle => ().into_any(),
        SearchResults::Loading => view! { <p class="search-message">"검색 중..."</p> }.into_any(),
        SearchResults::Failed(text) => view! { <p class="search-message">{text}</p> }.into_any(),
        SearchResults::Found { hits, .. } if hits.is_empty() => {
            view! { <p class="search-message">"검색 결과가 없습니다."</p> }.into_any()
        }
        SearchResults::Found { keyword, hits } => hits
            .into_iter()
            .map(|hit| {
                let name = highlighted(&hit.name, &keyword);
                let address = hit.address.clone().unwrap_or_default();
                let label = hit.type_label().to_string();
                view! {
                    <li class="search-item" on:click=move |_| select(ctx, &hit)>
                        <span class="search-type">{label}</span>
                        <span class="search-name">{name}</span>
                        <span class="search-address">{address}</span>
                    </li>
                }
            })
            .collect_view()
            .into_any(),
    };

    view! {
        <div class="search-panel">
            <div class="search-bar">
                <input
                    type="text"
                    placeholder="시설 이름 검색"
                    prop:value=query
                    on:input=move |ev| query.set(event_target_value(&ev))
                    on:keydown=move |ev: web_sys::KeyboardEvent| {
                        if ev.key() == "Enter" {
                            submit();
                        }
                    }
                />
                <button class="search-btn" on:click=move |_| submit()>"🔍"</button>
            </div>
            <ul class="recent-searches">
                <For
                    each=move || recent.with(|r| r.keywords().to_vec())
                    key=|keyword| keyword.clone()
                    children=move |keyword| {
                        let again = keyword.clone();
                        let removed = keyword.clone();
                        view! {
                            <li class="recent-item">
                                <span on:click=move |_| {
                                    query.set(again.clone());
                                    run_search(ctx, again.clone(), recent, results);
                                }>{keyword}</span>
                                <span
                                    class="recent-remove"
                                    on:click=move |_| {
                                        recent.update(|r| r.remove(&removed));
                                        recent.with_untracked(storage::save_recent_searches);
                                    }
                                >
                                    "✕"
                                </span>
                            </li>
                        }
                    }
                />
            </ul>
            <ul class="search-results">{list}</ul>
        </div>
    }
}
