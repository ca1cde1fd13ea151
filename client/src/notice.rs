use leptos::prelude::*;

const NOTICE_LIFETIME_MS: u32 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
    LoginRequired,
}

impl NoticeKind {
    fn class(self) -> &'static str {
        match self {
            Self::Info => "notice notice-info",
            Self::Success => "notice notice-success",
            Self::Error => "notice notice-error",
            Self::LoginRequired => "notice notice-login",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub text: String,
}

/// Toast queue shared through context.
#[derive(Clone, Copy)]
pub(crate) struct Notices {
    items: RwSignal<Vec<Notice>>,
    next_id: StoredValue<u64>,
}

impl Notices {
    pub fn new() -> Self {
        Self {
            items: RwSignal::new(Vec::new()),
            next_id: StoredValue::new(0),
        }
    }

    pub fn push(&self, kind: NoticeKind, text: impl Into<String>) {
        let id = self.next_id.get_value();
        self.next_id.set_value(id.wrapping_add(1));
        self.items.update(|items| {
            items.push(Notice {
                id,
                kind,
                text: text.into(),
            })
        });
        let items = self.items;
        gloo_timers::callback::Timeout::new(NOTICE_LIFETIME_MS, move || {
            items.try_update(|items| items.retain(|n| n.id != id));
        })
        .forget();
    }

    pub fn info(&self, text: impl Into<String>) {
        self.push(NoticeKind::Info, text);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.push(NoticeKind::Success, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(NoticeKind::Error, text);
    }

    /// Reports a failed request; 401/403 turn into a login prompt.
    pub fn api_error(&self, error: &crate::api::ApiError, fallback: &str) {
        if error.is_unauthorized() {
            self.push(NoticeKind::LoginRequired, "로그인이 필요합니다.");
        } else {
            web_sys::console::warn_1(&format!("{fallback}: {error}").into());
            self.error(error.user_message(fallback));
        }
    }
}

#[component]
pub fn NoticeStack() -> impl IntoView {
    let notices = expect_context::<Notices>();
    view! {
        <div class="notice-stack">
            <For
                each=move || notices.items.get()
                key=|notice| notice.id
                children=move |notice| {
                    let login = notice.kind == NoticeKind::LoginRequired;
                    view! {
                        <div class=notice.kind.class()>
                            <span>{notice.text}</span>
                            {login.then(|| view! { <a class="notice-link" href="/login">"로그인"</a> })}
                        </div>
                    }
                }
            />
        </div>
    }
}
