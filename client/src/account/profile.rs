use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use safenavi_shared::BoardPost;
use safenavi_shared::account::{
    PasswordChange, ProfileUpdate, WithdrawRequest, digits_only, is_valid_nickname,
    is_valid_phone, is_valid_profile_password,
};

use super::{finish_and_go, input_message};
use crate::api;
use crate::board::fetch_post;
use crate::notice::{NoticeStack, Notices};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileTab {
    Info,
    Password,
    Posts,
    Withdrawal,
}

impl ProfileTab {
    pub const ALL: [ProfileTab; 4] = [Self::Info, Self::Password, Self::Posts, Self::Withdrawal];

    /// Tab named by a location hash such as `#password`; unknown hashes open the info tab.
    pub fn from_hash(hash: &str) -> Self {
        match hash.trim_start_matches('#') {
            "password" => Self::Password,
            "posts" => Self::Posts,
            "withdrawal" => Self::Withdrawal,
            _ => Self::Info,
        }
    }

    pub fn hash(self) -> &'static str {
        match self {
            Self::Info => "#info",
            Self::Password => "#password",
            Self::Posts => "#posts",
            Self::Withdrawal => "#withdrawal",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "내 정보 수정",
            Self::Password => "비밀번호 변경",
            Self::Posts => "내가 쓴 글",
            Self::Withdrawal => "회원 탈퇴",
        }
    }
}

fn current_hash() -> String {
    web_sys::window()
        .and_then(|w| w.location().hash().ok())
        .unwrap_or_default()
}

fn set_hash(tab: ProfileTab) {
    if let Some(window) = web_sys::window()
        && let Err(e) = window.location().set_hash(tab.hash())
    {
        web_sys::console::warn_1(&e);
    }
}

fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

fn field_message(valid: bool, ok: &str, bad: &str) -> (String, bool) {
    (if valid { ok } else { bad }.to_string(), valid)
}

/// Current values are rendered into the page by the server and handed in on mount.
#[component]
pub fn ProfilePage(initial: ProfileUpdate) -> impl IntoView {
    let notices = Notices::new();
    provide_context(notices);

    let tab = RwSignal::new(ProfileTab::from_hash(&current_hash()));
    let switch = move |next: ProfileTab| {
        tab.set(next);
        set_hash(next);
    };

    view! {
        <NoticeStack />
        <nav class="kb-tabs">
            {ProfileTab::ALL
                .into_iter()
                .map(|t| {
                    view! {
                        <button
                            type="button"
                            class="kb-tab"
                            class:active=move || tab.get() == t
                            on:click=move |_| switch(t)
                        >
                            {t.label()}
                        </button>
                    }
                })
                .collect_view()}
        </nav>
        {move || match tab.get() {
            ProfileTab::Info => view! { <InfoTab initial=initial.clone() /> }.into_any(),
            ProfileTab::Password => view! { <PasswordTab /> }.into_any(),
            ProfileTab::Posts => view! { <PostsTab /> }.into_any(),
            ProfileTab::Withdrawal => view! { <WithdrawalTab /> }.into_any(),
        }}
    }
}

#[component]
fn InfoTab(initial: ProfileUpdate) -> impl IntoView {
    let notices = expect_context::<Notices>();
    let form = RwSignal::new(initial);

    let submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let update = form.get_untracked();
        if let Err(e) = update.validate() {
            notices.error(e.to_string());
            return;
        }
        spawn_local(async move {
            match api::post_json_unit("/api/myinfo/update", &update).await {
                Ok(()) => notices.success("정보가 수정되었습니다."),
                Err(e) => notices.api_error(&e, "정보 수정에 실패했습니다."),
            }
        });
    };

    let nickname_message = move || {
        let nickname = form.with(|f| f.nickname.clone());
        (!nickname.is_empty()).then(|| {
            field_message(is_valid_nickname(&nickname), "사용 가능", "특수문자 제외 2~10자")
        })
    };
    let phone_message = move || {
        let phone = form.with(|f| f.phone.clone());
        (!phone.is_empty()).then(|| field_message(is_valid_phone(&phone), "올바른 형식", "010XXXXXXXX 형식"))
    };

    view! {
        <form id="info-update-form" on:submit=submit>
            <label>"닉네임"</label>
            <input
                type="text"
                prop:value=move || form.with(|f| f.nickname.clone())
                on:input=move |ev| form.update(|f| f.nickname = event_target_value(&ev))
            />
            {move || input_message(nickname_message())}
            <label>"비상 연락처"</label>
            <input
                type="tel"
                prop:value=move || form.with(|f| f.phone.clone())
                on:input=move |ev| form.update(|f| f.phone = digits_only(&event_target_value(&ev)))
            />
            {move || input_message(phone_message())}
            <label>"주소"</label>
            <input
                type="text"
                prop:value=move || form.with(|f| f.address.clone())
                on:input=move |ev| form.update(|f| f.address = event_target_value(&ev))
            />
            <input
                type="text"
                placeholder="상세 주소"
                prop:value=move || form.with(|f| f.detail_address.clone())
                on:input=move |ev| form.update(|f| f.detail_address = event_target_value(&ev))
            />
            <button type="submit" class="kb-btn-primary">"저장"</button>
        </form>
    }
}

#[component]
fn PasswordTab() -> impl IntoView {
    let notices = expect_context::<Notices>();
    let current = RwSignal::new(String::new());
    let answer = RwSignal::new(String::new());
    let new_password = RwSignal::new(String::new());
    let confirmation = RwSignal::new(String::new());

    let submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let change = PasswordChange {
            current_password: current.get_untracked(),
            security_answer: answer.get_untracked(),
            new_password: new_password.get_untracked(),
        };
        if let Err(e) = change.validate(&confirmation.get_untracked()) {
            notices.error(e.to_string());
            return;
        }
        spawn_local(async move {
            match api::post_json_unit("/api/myinfo/change-pw", &change).await {
                Ok(()) => finish_and_go("비밀번호가 변경되었습니다. 다시 로그인해주세요.", "/logout"),
                Err(e) => notices.api_error(&e, "비밀번호 변경 실패"),
            }
        });
    };

    let strength_message = move || {
        let pw = new_password.get();
        (!pw.is_empty()).then(|| {
            field_message(
                is_valid_profile_password(&pw),
                "사용 가능",
                "8자 이상, 대문자/숫자/특수문자 포함",
            )
        })
    };
    let match_message = move || {
        let confirm = confirmation.get();
        (!confirm.is_empty())
            .then(|| field_message(confirm == new_password.get(), "일치합니다.", "일치하지 않습니다."))
    };

    view! {
        <form id="pw-change-form" on:submit=submit>
            <input
                type="password"
                placeholder="현재 비밀번호"
                prop:value=current
                on:input=move |ev| current.set(event_target_value(&ev))
            />
            <input
                type="text"
                placeholder="본인 확인 답변"
                prop:value=answer
                on:input=move |ev| answer.set(event_target_value(&ev))
            />
            <input
                type="password"
                placeholder="새 비밀번호"
                prop:value=new_password
                on:input=move |ev| new_password.set(event_target_value(&ev))
            />
            {move || input_message(strength_message())}
            <input
                type="password"
                placeholder="새 비밀번호 확인"
                prop:value=confirmation
                on:input=move |ev| confirmation.set(event_target_value(&ev))
            />
            {move || input_message(match_message())}
            <button type="submit" class="kb-btn-primary">"비밀번호 변경"</button>
        </form>
    }
}

#[component]
fn PostsTab() -> impl IntoView {
    let notices = expect_context::<Notices>();
    let posts = RwSignal::new(None::<Vec<BoardPost>>);
    let detail = RwSignal::new(None::<BoardPost>);

    let load = move || {
        spawn_local(async move {
            match api::get_json::<Vec<BoardPost>>("/api/board/my").await {
                Ok(list) => {
                    posts.try_set(Some(list));
                }
                Err(e) => {
                    posts.try_set(Some(Vec::new()));
                    notices.api_error(&e, "작성한 글을 불러오지 못했습니다.");
                }
            }
        });
    };
    load();

    let remove = move |id: i64| {
        if !confirm("정말로 삭제하시겠습니까?") {
            return;
        }
        spawn_local(async move {
            match api::delete(&format!("/api/board/{id}")).await {
                Ok(()) => {
                    notices.success("삭제되었습니다.");
                    detail.update(|d| {
                        if d.as_ref().is_some_and(|p| p.id == id) {
                            *d = None;
                        }
                    });
                    load();
                }
                Err(e) => notices.api_error(&e, "삭제 중 오류 발생"),
            }
        });
    };

    let open = move |id: i64| {
        spawn_local(async move {
            match fetch_post(id).await {
                Ok(post) => {
                    detail.try_set(Some(post));
                }
                Err(e) => web_sys::console::warn_1(&format!("post {id} fetch failed: {e}").into()),
            }
        });
    };

    view! {
        <ul class="kb-board-list">
            {move || match posts.get() {
                None => view! { <li class="kb-empty">"불러오는 중..."</li> }.into_any(),
                Some(list) if list.is_empty() => {
                    view! { <li class="kb-empty">"작성한 글이 없습니다."</li> }.into_any()
                }
                Some(list) => list
                    .into_iter()
                    .map(|post| {
                        let id = post.id;
                        view! {
                            <li class="kb-board-item" on:click=move |_| open(id)>
                                <span class="kb-badge">{post.category.label().to_string()}</span>
                                <span class="kb-board-title">{post.title}</span>
                                <span class="kb-date">{post.date}</span>
                                <button
                                    type="button"
                                    class="btn-delete-post"
                                    on:click=move |ev| {
                                        ev.stop_propagation();
                                        remove(id);
                                    }
                                >
                                    "삭제"
                                </button>
                            </li>
                        }
                    })
                    .collect_view()
                    .into_any(),
            }}
        </ul>
        {move || {
            detail.get().map(|post| {
                let comments = post.comments.clone();
                view! {
                    <div class="kb-modal" on:click=move |_| detail.set(None)>
                        <div class="kb-modal-body" on:click=|ev| ev.stop_propagation()>
                            <div class="kb-post-header">
                                <span class="kb-badge">{post.category.label().to_string()}</span>
                                <span class="kb-date">{post.date.clone()}</span>
                            </div>
                            <h3 class="kb-post-title">{post.title.clone()}</h3>
                            {post.image().map(|src| view! { <img class="kb-post-img" src=src.to_string() alt="image" /> })}
                            <div class="kb-post-content">{post.content.clone()}</div>
                            <h6>{format!("댓글 ({})", comments.len())}</h6>
                            <ul class="kb-comment-list">
                                {if comments.is_empty() {
                                    view! { <li class="kb-empty">"댓글이 없습니다."</li> }.into_any()
                                } else {
                                    comments
                                        .into_iter()
                                        .map(|c| view! {
                                            <li class="kb-post-comment-item">
                                                <span class="writer">{c.writer}</span>
                                                <span>{c.content}</span>
                                            </li>
                                        })
                                        .collect_view()
                                        .into_any()
                                }}
                            </ul>
                            <button type="button" class="kb-btn-secondary" on:click=move |_| detail.set(None)>
                                "닫기"
                            </button>
                        </div>
                    </div>
                }
            })
        }}
    }
}

#[component]
fn WithdrawalTab() -> impl IntoView {
    let notices = expect_context::<Notices>();
    let agreed = RwSignal::new(false);
    let password = RwSignal::new(String::new());

    let submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let request = match WithdrawRequest::confirmed(agreed.get_untracked(), &password.get_untracked()) {
            Ok(request) => request,
            Err(e) => {
                notices.error(e.to_string());
                return;
            }
        };
        if !confirm("정말 탈퇴하시겠습니까? (복구 불가)") {
            return;
        }
        spawn_local(async move {
            match api::post_json_unit("/api/member/withdraw", &request).await {
                Ok(()) => finish_and_go("탈퇴 처리가 완료되었습니다.", "/"),
                Err(e) => {
                    web_sys::console::warn_1(&format!("withdrawal failed: {e}").into());
                    notices.error("비밀번호가 일치하지 않거나 오류가 발생했습니다.");
                }
            }
        });
    };

    view! {
        <form id="withdrawal-form" on:submit=submit>
            <p class="kb-warning">"탈퇴 시 작성한 게시글과 저장된 장소 정보는 복구할 수 없습니다."</p>
            <label>
                <input
                    type="checkbox"
                    prop:checked=agreed
                    on:change=move |ev| agreed.set(event_target_checked(&ev))
                />
                " 안내 사항을 확인했습니다."
            </label>
            <input
                type="password"
                placeholder="비밀번호"
                prop:value=password
                on:input=move |ev| password.set(event_target_value(&ev))
            />
            <button type="submit" class="kb-btn-danger">"회원 탈퇴"</button>
        </form>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_follow_the_location_hash() {
        assert_eq!(ProfileTab::from_hash("#password"), ProfileTab::Password);
        assert_eq!(ProfileTab::from_hash("posts"), ProfileTab::Posts);
        assert_eq!(ProfileTab::from_hash("#withdrawal"), ProfileTab::Withdrawal);
        assert_eq!(ProfileTab::from_hash(""), ProfileTab::Info);
        assert_eq!(ProfileTab::from_hash("#nope"), ProfileTab::Info);
        for tab in ProfileTab::ALL {
            assert_eq!(ProfileTab::from_hash(tab.hash()), tab);
        }
    }

    #[test]
    fn field_messages_pick_text_by_validity() {
        assert_eq!(
            field_message(false, "사용 가능", "특수문자 제외 2~10자"),
            ("특수문자 제외 2~10자".to_string(), false)
        );
        assert_eq!(
            field_message(true, "일치합니다.", "일치하지 않습니다."),
            ("일치합니다.".to_string(), true)
        );
    }
}
