use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use safenavi_shared::disaster::{AreaZoneRequest, CircleZoneRequest};
use safenavi_shared::{DisasterKind, DisasterZone, LatLng};

use crate::api;
use crate::disaster::fetch_zones;
use crate::kakao;
use crate::notice::{NoticeStack, Notices};

/// Inputs of the zone simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorForm {
    pub position: Option<LatLng>,
    pub area: Option<String>,
    pub kind: DisasterKind,
    pub radius: String,
    pub duration: String,
}

impl Default for SimulatorForm {
    fn default() -> Self {
        Self {
            position: None,
            area: None,
            kind: DisasterKind::Fire,
            radius: "500".to_string(),
            duration: "60".to_string(),
        }
    }
}

fn positive(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

const NUMBERS_REQUIRED: &str = "반경과 지속 시간을 숫자로 입력해주세요.";

impl SimulatorForm {
    pub fn circle_request(&self) -> Result<CircleZoneRequest, &'static str> {
        let center = self.position.ok_or("주소를 검색하여 좌표를 설정해주세요.")?;
        let (Some(radius_m), Some(duration_minutes)) =
            (positive(&self.radius), positive(&self.duration))
        else {
            return Err(NUMBERS_REQUIRED);
        };
        Ok(CircleZoneRequest {
            center,
            kind_key: self.kind.key().to_string(),
            radius_m,
            duration_minutes,
        })
    }

    pub fn area_request(&self) -> Result<AreaZoneRequest, &'static str> {
        let area_name = self.area.clone().ok_or("지역명이 설정되지 않았습니다.")?;
        let duration_minutes = positive(&self.duration).ok_or(NUMBERS_REQUIRED)?;
        Ok(AreaZoneRequest {
            area_name,
            kind_key: self.kind.key().to_string(),
            duration_minutes,
        })
    }
}

/// District (시/군/구) of a road address: its second word.
pub fn district_of(address: &str) -> Option<String> {
    address.split_whitespace().nth(1).map(str::to_string)
}

fn location_text(zone: &DisasterZone) -> String {
    match (&zone.area_name, zone.center) {
        (Some(area), _) => format!("[지역] {area}"),
        (None, Some(at)) => format!("[좌표] {:.4}, {:.4}", at.lat, at.lng),
        (None, None) => "-".to_string(),
    }
}

/// Disaster simulator and active-zone list for operators.
#[component]
pub fn DisasterConsole() -> impl IntoView {
    let notices = Notices::new();
    provide_context(notices);

    let form = RwSignal::new(SimulatorForm::default());
    let address = RwSignal::new(String::new());
    let zones = RwSignal::new(Vec::<DisasterZone>::new());

    let reload = move || {
        spawn_local(async move {
            match fetch_zones().await {
                Ok(list) => {
                    zones.try_set(list);
                }
                Err(e) => web_sys::console::warn_1(&format!("zone list failed: {e}").into()),
            }
        })
    };
    reload();

    let locate = move |_| {
        let query = address.get_untracked();
        spawn_local(async move {
            match kakao::geocode(&query).await {
                Some(place) => form.update(|f| {
                    f.position = Some(place.position);
                    f.area = district_of(&query).or_else(|| district_of(&place.label));
                }),
                None => notices.error("주소를 찾을 수 없습니다."),
            }
        });
    };

    let simulate = move |url: String| {
        spawn_local(async move {
            match api::post_unit(&url).await {
                Ok(()) => {
                    notices.success("재난 경보가 발령되었습니다!");
                    reload();
                }
                Err(e) => {
                    web_sys::console::warn_1(&format!("simulate failed: {e}").into());
                    notices.error("발령 실패: 입력 값을 확인하거나 서버 상태를 확인해주세요.");
                }
            }
        })
    };

    let circle = move |_| match form.with_untracked(SimulatorForm::circle_request) {
        Ok(request) => simulate(format!("/api/admin/simulate?{}", request.query())),
        Err(message) => notices.error(message),
    };
    let area = move |_| match form.with_untracked(SimulatorForm::area_request) {
        Ok(request) => simulate(format!("/api/admin/simulate-area?{}", request.query())),
        Err(message) => notices.error(message),
    };

    let terminate = move |id: i64| {
        let confirmed = web_sys::window()
            .and_then(|w| w.confirm_with_message("해당 재난 상황을 종료하시겠습니까?").ok())
            .unwrap_or(false);
        if !confirmed {
            return;
        }
        spawn_local(async move {
            match api::delete(&format!("/api/admin/disaster/{id}")).await {
                Ok(()) => reload(),
                Err(e) => notices.api_error(&e, "종료 처리에 실패했습니다."),
            }
        });
    };

    view! {
        <NoticeStack />
        <section class="admin-simulator">
            <div class="form-row">
                <input
                    type="text"
                    placeholder="주소"
                    prop:value=address
                    on:input=move |ev| address.set(event_target_value(&ev))
                />
                <button class="btn" on:click=locate>"주소 검색"</button>
            </div>
            <div class="form-row">
                <span class="admin-area">
                    {move || form.with(|f| f.area.clone()).unwrap_or_else(|| "지역 미설정".to_string())}
                </span>
                <span class="admin-coords">
                    {move || {
                        form.with(|f| f.position)
                            .map(|at| format!("{:.4}, {:.4}", at.lat, at.lng))
                            .unwrap_or_default()
                    }}
                </span>
            </div>
            <div class="form-row">
                <select on:change=move |ev| {
                    let key = event_target_value(&ev);
                    form.update(|f| f.kind = DisasterKind::classify(&key));
                }>
                    {DisasterKind::simulatable()
                        .map(|kind| view! { <option value=kind.key()>{kind.display_name()}</option> })
                        .collect_view()}
                </select>
                <input
                    type="number"
                    placeholder="반경(m)"
                    prop:value=move || form.with(|f| f.radius.clone())
                    on:input=move |ev| form.update(|f| f.radius = event_target_value(&ev))
                />
                <input
                    type="number"
                    placeholder="지속(분)"
                    prop:value=move || form.with(|f| f.duration.clone())
                    on:input=move |ev| form.update(|f| f.duration = event_target_value(&ev))
                />
            </div>
            <div class="form-row">
                <button class="btn btn-danger" on:click=circle>"반경 재난 발령"</button>
                <button class="btn btn-danger" on:click=area>"지역 재난 발령"</button>
            </div>
        </section>
        <table class="admin-table">
            <thead>
                <tr>
                    <th>"ID"</th>
                    <th>"유형"</th>
                    <th>"위치"</th>
                    <th>"상태"</th>
                    <th>"관리"</th>
                </tr>
            </thead>
            <tbody>
                <Show
                    when=move || zones.with(|z| !z.is_empty())
                    fallback=|| view! {
                        <tr>
                            <td colspan="5" class="admin-empty">"현재 발령된 재난이 없습니다. ✅"</td>
                        </tr>
                    }
                >
                    <For
                        each=move || zones.get()
                        key=|zone| zone.id
                        children=move |zone| {
                            let id = zone.id;
                            let badge = zone.kind.style().fill;
                            view! {
                                <tr>
                                    <td>{format!("#{id}")}</td>
                                    <td>
                                        <span class="status-badge" style=format!("background-color:{badge}")>
                                            {zone.kind.display_name()}
                                        </span>
                                    </td>
                                    <td>{location_text(&zone)}</td>
                                    <td>"진행중"</td>
                                    <td>
                                        <button class="btn-danger-soft" on:click=move |_| terminate(id)>
                                            "종료"
                                        </button>
                                    </td>
                                </tr>
                            }
                        }
                    />
                </Show>
            </tbody>
        </table>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_needs_a_located_address() {
        let mut form = SimulatorForm::default();
        assert_eq!(
            form.circle_request(),
            Err("주소를 검색하여 좌표를 설정해주세요.")
        );
        form.position = Some(LatLng::new(37.5, 127.0));
        let request = form.circle_request().unwrap();
        assert_eq!(request.kind_key, "fire");
        assert_eq!(request.radius_m, 500);
    }

    #[test]
    fn non_numeric_inputs_are_rejected() {
        let form = SimulatorForm {
            position: Some(LatLng::new(37.5, 127.0)),
            area: Some("강남구".to_string()),
            radius: "abc".to_string(),
            duration: "0".to_string(),
            ..SimulatorForm::default()
        };
        assert_eq!(form.circle_request(), Err(NUMBERS_REQUIRED));
        assert_eq!(form.area_request(), Err(NUMBERS_REQUIRED));
    }

    #[test]
    fn area_request_uses_district() {
        let form = SimulatorForm {
            area: district_of("서울 강남구 테헤란로 1"),
            kind: DisasterKind::Flood,
            ..SimulatorForm::default()
        };
        let request = form.area_request().unwrap();
        assert_eq!(request.area_name, "강남구");
        assert_eq!(request.kind_key, "flood");
        assert!(district_of("서울").is_none());
    }
}
