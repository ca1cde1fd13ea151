use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use safenavi_shared::LatLng;
use safenavi_shared::places::{
    FamilyContact, FavoriteRequest, MyPlace, NewFamilyContact, PlaceBook, PlaceKind,
    SpecialPlaceRequest, family_sms_link,
};

use crate::api;
use crate::app::MapCtx;
use crate::geolocation;
use crate::kakao;
use crate::route::{RoutePoint, route_here};
use crate::surface::{Graphic, GraphicId, MapSurface, MarkerImage, MarkerSpec};

/// Saved-place markers.
#[derive(Default)]
pub struct PlaceLayer {
    drawn: Vec<GraphicId>,
}

impl PlaceLayer {
    pub fn apply(
        &mut self,
        surface: &dyn MapSurface,
        book: &PlaceBook,
        on_select: &dyn Fn(&MyPlace) -> Rc<dyn Fn()>,
    ) -> usize {
        self.clear(surface);
        for place in book.all() {
            let Some(at) = place.position() else {
                continue;
            };
            let spec = MarkerSpec::at(at)
                .image(MarkerImage::new(place.place_type.marker_image(), 36, 36))
                .title(place.title().to_string());
            let id = surface.draw(Graphic::Marker(spec));
            surface.on_click(id, on_select(place));
            self.drawn.push(id);
        }
        self.drawn.len()
    }

    pub fn clear(&mut self, surface: &dyn MapSurface) {
        for id in self.drawn.drain(..) {
            surface.remove(id);
        }
    }
}

fn place_destination(place: &MyPlace) -> Option<RoutePoint> {
    place
        .position()
        .map(|at| RoutePoint::new(at, place.title().to_string()))
}

pub(crate) fn load_places(ctx: MapCtx) {
    spawn_local(async move {
        let places = match api::get_json::<Vec<MyPlace>>("/api/map/my-places").await {
            Ok(places) => places,
            // Guests have no saved places.
            Err(e) if e.is_unauthorized() => Vec::new(),
            Err(e) => {
                web_sys::console::warn_1(&format!("my places fetch failed: {e}").into());
                return;
            }
        };
        let book = PlaceBook::from_places(places);
        ctx.session.with(|s| {
            s.places.apply(&*s.surface, &book, &|place| {
                let destination = place_destination(place);
                Rc::new(move || {
                    if let Some(dest) = destination.clone() {
                        route_here(ctx, dest);
                    }
                }) as Rc<dyn Fn()>
            })
        });
        ctx.places.set(book);
    });
}

async fn locate_address(ctx: MapCtx, address: &str) -> Option<(String, LatLng)> {
    match kakao::geocode(address).await {
        Some(place) => Some((address.trim().to_string(), place.position)),
        None => {
            ctx.notices.error("주소를 찾을 수 없습니다.");
            None
        }
    }
}

fn save_special(ctx: MapCtx, kind: PlaceKind, address: String) {
    spawn_local(async move {
        let Some((address, at)) = locate_address(ctx, &address).await else {
            return;
        };
        let request = SpecialPlaceRequest {
            kind,
            address,
            latitude: at.lat,
            longitude: at.lng,
        };
        match api::post_json_unit("/api/map/special-place", &request).await {
            Ok(()) => {
                ctx.notices.success(format!("{} 위치가 저장되었습니다.", kind.label()));
                load_places(ctx);
            }
            Err(e) => ctx.notices.api_error(&e, "장소 저장에 실패했습니다."),
        }
    });
}

fn add_favorite(ctx: MapCtx, name: String, address: String) {
    if let Err(e) = ctx.places.with_untracked(PlaceBook::check_favorite_capacity) {
        ctx.notices.error(e.to_string());
        return;
    }
    spawn_local(async move {
        let Some((address, at)) = locate_address(ctx, &address).await else {
            return;
        };
        let name = match name.trim() {
            "" => address.clone(),
            name => name.to_string(),
        };
        let request = FavoriteRequest {
            name,
            address,
            latitude: at.lat,
            longitude: at.lng,
        };
        match api::post_json_unit("/api/map/favorite", &request).await {
            Ok(()) => {
                ctx.notices.success("즐겨찾기에 추가되었습니다.");
                load_places(ctx);
            }
            Err(e) => ctx.notices.api_error(&e, "즐겨찾기 추가에 실패했습니다."),
        }
    });
}

fn delete_place(ctx: MapCtx, id: i64) {
    spawn_local(async move {
        match api::delete(&format!("/api/map/place/{id}")).await {
            Ok(()) => load_places(ctx),
            Err(e) => ctx.notices.api_error(&e, "삭제에 실패했습니다."),
        }
    });
}

fn place_row(ctx: MapCtx, place: MyPlace) -> impl IntoView {
    let id = place.id;
    let destination = place_destination(&place);
    view! {
        <li class="place-item">
            <span class="place-kind">{place.place_type.label()}</span>
            <span class="place-title">{place.title().to_string()}</span>
            <span class="place-address">{place.address.clone()}</span>
            <button
                class="place-route"
                disabled=destination.is_none()
                on:click=move |_| {
                    if let Some(dest) = destination.clone() {
                        route_here(ctx, dest);
                    }
                }
            >
                "길찾기"
            </button>
            <button class="place-delete" on:click=move |_| delete_place(ctx, id)>"삭제"</button>
        </li>
    }
}

#[component]
pub fn MyPlacesPanel() -> impl IntoView {
    let ctx = expect_context::<MapCtx>();
    let kind = RwSignal::new(PlaceKind::Home);
    let name = RwSignal::new(String::new());
    let address = RwSignal::new(String::new());

    let save = move |_| {
        let typed = address.get_untracked();
        if typed.trim().is_empty() {
            ctx.notices.error("주소를 입력해주세요.");
            return;
        }
        match kind.get_untracked() {
            PlaceKind::Favorite => add_favorite(ctx, name.get_untracked(), typed),
            special => save_special(ctx, special, typed),
        }
        address.set(String::new());
        name.set(String::new());
    };

    view! {
        <div class="places-panel">
            <ul class="place-list">
                {move || {
                    ctx.places
                        .get()
                        .all()
                        .cloned()
                        .map(|place| place_row(ctx, place))
                        .collect_view()
                }}
            </ul>
            <div class="place-form">
                <select on:change=move |ev| {
                    kind.set(
                        match event_target_value(&ev).as_str() {
                            "COMPANY" => PlaceKind::Company,
                            "FAVORITE" => PlaceKind::Favorite,
                            _ => PlaceKind::Home,
                        },
                    )
                }>
                    <option value="HOME">{PlaceKind::Home.label()}</option>
                    <option value="COMPANY">{PlaceKind::Company.label()}</option>
                    <option value="FAVORITE">{PlaceKind::Favorite.label()}</option>
                </select>
                <Show when=move || kind.get() == PlaceKind::Favorite>
                    <input
                        type="text"
                        placeholder="이름"
                        prop:value=name
                        on:input=move |ev| name.set(event_target_value(&ev))
                    />
                </Show>
                <input
                    type="text"
                    placeholder="주소"
                    prop:value=address
                    on:input=move |ev| address.set(event_target_value(&ev))
                />
                <button class="btn btn-primary" on:click=save>"저장"</button>
            </div>
        </div>
    }
}

/// Position for check-in messages: a GPS fix, else the map center.
pub(crate) async fn message_position(ctx: MapCtx) -> Option<LatLng> {
    match geolocation::current_position().await {
        Ok(at) => Some(at),
        Err(e) => {
            web_sys::console::warn_1(&format!("{e}").into());
            ctx.session.with(|s| s.surface.center())
        }
    }
}

pub(crate) fn open_link(href: &str) {
    if let Some(window) = web_sys::window()
        && let Err(e) = window.location().set_href(href)
    {
        web_sys::console::warn_1(&e);
    }
}

/// Opens an SMS to `phone` carrying the current position.
fn message_family(ctx: MapCtx, phone: String) {
    spawn_local(async move {
        if let Some(at) = message_position(ctx).await {
            open_link(&family_sms_link(&phone, at));
        }
    });
}

#[component]
pub fn FamilyPanel() -> impl IntoView {
    let ctx = expect_context::<MapCtx>();
    let contacts = RwSignal::new(Vec::<FamilyContact>::new());
    let name = RwSignal::new(String::new());
    let phone = RwSignal::new(String::new());

    let reload = move || {
        spawn_local(async move {
            match api::get_json::<Vec<FamilyContact>>("/api/map/family").await {
                Ok(list) => {
                    contacts.try_set(list);
                }
                Err(e) => ctx.notices.api_error(&e, "가족 연락처를 불러오지 못했습니다."),
            }
        })
    };
    reload();

    let add = move |_| {
        let contact = match NewFamilyContact::new(&name.get_untracked(), &phone.get_untracked()) {
            Ok(contact) => contact,
            Err(e) => {
                ctx.notices.error(e.to_string());
                return;
            }
        };
        spawn_local(async move {
            match api::post_json_unit("/api/map/family", &contact).await {
                Ok(()) => {
                    name.set(String::new());
                    phone.set(String::new());
                    reload();
                }
                Err(e) => ctx.notices.api_error(&e, "연락처 등록에 실패했습니다."),
            }
        });
    };

    let remove = move |id: i64| {
        spawn_local(async move {
            match api::delete(&format!("/api/map/family/{id}")).await {
                Ok(()) => reload(),
                Err(e) => ctx.notices.api_error(&e, "삭제에 실패했습니다."),
            }
        })
    };

    view! {
        <div class="family-panel">
            <ul class="family-list">
                <For
                    each=move || contacts.get()
                    key=|contact| contact.id
                    children=move |contact| {
                        let id = contact.id;
                        let number = contact.phone.clone();
                        view! {
                            <li class="family-item">
                                <span class="family-name">{contact.name}</span>
                                <span class="family-phone">{contact.phone}</span>
                                <button
                                    class="family-sms"
                                    on:click=move |_| message_family(ctx, number.clone())
                                >
                                    "📩 위치 보내기"
                                </button>
                                <button class="family-delete" on:click=move |_| remove(id)>
                                    "삭제"
                                </button>
                            </li>
                        }
                    }
                />
            </ul>
            <div class="family-form">
                <input
                    type="text"
                    placeholder="이름"
                    prop:value=name
                    on:input=move |ev| name.set(event_target_value(&ev))
                />
                <input
                    type="tel"
                    placeholder="010-0000-0000"
                    prop:value=phone
                    on:input=move |ev| phone.set(event_target_value(&ev))
                />
                <button class="btn btn-primary" on:click=add>"추가"</button>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn place(id: i64, kind: PlaceKind, at: Option<(f64, f64)>) -> MyPlace {
        MyPlace {
            id,
            place_type: kind,
            name: None,
            address: "주소".to_string(),
            latitude: at.map(|p| p.0),
            longitude: at.map(|p| p.1),
        }
    }

    #[test]
    fn only_placed_entries_get_markers() {
        let surface = crate::surface::testing::RecordingSurface::default();
        let mut layer = PlaceLayer::default();
        let book = PlaceBook::from_places(vec![
            place(1, PlaceKind::Home, Some((37.5, 127.0))),
            place(2, PlaceKind::Favorite, None),
            place(3, PlaceKind::Favorite, Some((37.6, 127.1))),
        ]);
        let drawn = layer.apply(&surface, &book, &|_| Rc::new(|| {}) as Rc<dyn Fn()>);
        assert_eq!(drawn, 2);

        let drawn = layer.apply(&surface, &PlaceBook::default(), &|_| Rc::new(|| {}) as Rc<dyn Fn()>);
        assert_eq!(drawn, 0);
        assert_eq!(surface.markers(), 0);
    }

    #[test]
    fn clicking_a_place_selects_it() {
        let surface = crate::surface::testing::RecordingSurface::default();
        let mut layer = PlaceLayer::default();
        let picked = Rc::new(Cell::new(0));
        let sink = picked.clone();
        let book = PlaceBook::from_places(vec![place(5, PlaceKind::Company, Some((37.4, 127.1)))]);
        layer.apply(&surface, &book, &move |p: &MyPlace| {
            let sink = sink.clone();
            let id = p.id;
            Rc::new(move || sink.set(id)) as Rc<dyn Fn()>
        });
        let id = *surface.graphics.borrow().keys().next().unwrap();
        surface.click(id);
        assert_eq!(picked.get(), 5);
    }

    #[test]
    fn destination_uses_place_title() {
        let dest = place_destination(&place(1, PlaceKind::Home, Some((37.5, 127.0)))).unwrap();
        assert_eq!(dest.label, "🏠 집");
        assert!(place_destination(&place(2, PlaceKind::Home, None)).is_none());
    }
}
