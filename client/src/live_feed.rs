use std::cell::RefCell;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{EventSource, MessageEvent};

use safenavi_shared::board::BoardPost;
use safenavi_shared::events::{CommentEvent, LikeEvent};
use safenavi_shared::{BoardEvent, FeedTopic};

use crate::app::MapCtx;
use crate::board;
use crate::session::OverlayOwner;
use crate::storage::BlockList;

const FEED_URL: &str = "/api/board/stream";
const RECONNECT_BASE_MS: f64 = 500.0;
const RECONNECT_MAX_MS: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedStatus {
    #[default]
    Connecting,
    Live,
    Reconnecting,
}

/// What a pushed event does to the map.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedAction {
    AddPost(BoardPost),
    RemovePost(i64),
    Comment(CommentEvent),
    Like(LikeEvent),
    Ignore,
}

impl FeedAction {
    pub fn from_event(event: BoardEvent, blocked: &BlockList) -> Self {
        match event {
            BoardEvent::NewPost(post) if blocked.contains(&post.writer) => Self::Ignore,
            BoardEvent::NewPost(post) => Self::AddPost(post),
            BoardEvent::DeletedPost(id) => Self::RemovePost(id),
            BoardEvent::NewComment(event) => Self::Comment(event),
            BoardEvent::LikeChanged(event) => Self::Like(event),
        }
    }
}

fn reconnect_delay_ms(consecutive_failures: u32) -> f64 {
    let exponent = consecutive_failures.saturating_sub(1).min(6);
    let factor = 1u32 << exponent;
    (RECONNECT_BASE_MS * factor as f64).min(RECONNECT_MAX_MS)
}

struct FeedConnection {
    es: EventSource,
    on_open: Closure<dyn Fn()>,
    on_error: Closure<dyn Fn()>,
    handlers: Vec<(FeedTopic, Closure<dyn Fn(MessageEvent)>)>,
}

impl FeedConnection {
    fn close(self) {
        let _ = self.on_open.as_ref();
        let _ = self.on_error.as_ref();
        self.es.set_onopen(None);
        self.es.set_onerror(None);
        for (topic, handler) in &self.handlers {
            self.es
                .remove_event_listener_with_callback(
                    topic.event_name(),
                    handler.as_ref().unchecked_ref(),
                )
                .ok();
        }
        self.es.close();
    }
}

#[derive(Default)]
struct ReconnectState {
    consecutive_failures: u32,
    ever_opened: bool,
    pending: Option<gloo_timers::callback::Timeout>,
}

thread_local! {
    static FEED_CONNECTION: RefCell<Option<FeedConnection>> = const { RefCell::new(None) };
    static RECONNECT: RefCell<ReconnectState> = RefCell::new(ReconnectState::default());
}

pub fn disconnect() {
    FEED_CONNECTION.with(|slot| {
        if let Some(connection) = slot.borrow_mut().take() {
            connection.close();
        }
    });
    RECONNECT.with(|state| *state.borrow_mut() = ReconnectState::default());
}

fn apply(ctx: MapCtx, action: FeedAction) {
    match action {
        FeedAction::AddPost(post) => {
            if board::add_live_post(ctx, &post) {
                ctx.notices.info(format!("📢 새 글: {}", post.title));
            }
        }
        FeedAction::RemovePost(id) => {
            ctx.session
                .with(|s| s.overlay.close_if(&*s.surface, OverlayOwner::Post(id)));
            board::reload(ctx);
        }
        FeedAction::Comment(event) => {
            board::route_comment(ctx, event);
        }
        FeedAction::Like(event) => board::route_like(ctx, event.board_id, event.total_likes),
        FeedAction::Ignore => {}
    }
}

fn schedule_reconnect(ctx: MapCtx) {
    RECONNECT.with(|state| {
        let mut state = state.borrow_mut();
        if state.pending.is_some() {
            return;
        }
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        let delay = reconnect_delay_ms(state.consecutive_failures);
        web_sys::console::warn_1(
            &format!(
                "board feed closed (attempt {}); reconnecting in {}ms",
                state.consecutive_failures,
                delay.round()
            )
            .into(),
        );
        state.pending = Some(gloo_timers::callback::Timeout::new(delay as u32, move || {
            RECONNECT.with(|state| state.borrow_mut().pending = None);
            connect(ctx);
        }));
    });
}

/// Subscribes to board pushes, replacing any existing subscription.
pub(crate) fn connect(ctx: MapCtx) {
    ctx.feed.set(FeedStatus::Connecting);

    let es = match EventSource::new(FEED_URL) {
        Ok(es) => es,
        Err(_) => {
            ctx.feed.set(FeedStatus::Reconnecting);
            schedule_reconnect(ctx);
            return;
        }
    };

    let on_open = Closure::<dyn Fn()>::new(move || {
        ctx.feed.set(FeedStatus::Live);
        let reopened = RECONNECT.with(|state| {
            let mut state = state.borrow_mut();
            state.consecutive_failures = 0;
            std::mem::replace(&mut state.ever_opened, true)
        });
        // Pushes sent while disconnected are gone; catch up from the list.
        if reopened {
            board::reload(ctx);
        }
    });
    es.set_onopen(Some(on_open.as_ref().unchecked_ref()));

    let handlers = FeedTopic::ALL
        .into_iter()
        .map(|topic| {
            let handler = Closure::<dyn Fn(MessageEvent)>::new(move |e: MessageEvent| {
                let Some(data) = e.data().as_string() else {
                    return;
                };
                match BoardEvent::parse(topic, &data) {
                    Ok(event) => {
                        let action = ctx
                            .blocked
                            .with_untracked(|blocked| FeedAction::from_event(event, blocked));
                        apply(ctx, action);
                    }
                    Err(e) => web_sys::console::warn_1(
                        &format!("bad {} payload: {e}", topic.event_name()).into(),
                    ),
                }
            });
            es.add_event_listener_with_callback(
                topic.event_name(),
                handler.as_ref().unchecked_ref(),
            )
            .ok();
            (topic, handler)
        })
        .collect();

    let source = es.clone();
    let on_error = Closure::<dyn Fn()>::new(move || {
        ctx.feed.set(FeedStatus::Reconnecting);
        // The browser retries on its own unless the stream was closed for good.
        if source.ready_state() == EventSource::CLOSED {
            schedule_reconnect(ctx);
        }
    });
    es.set_onerror(Some(on_error.as_ref().unchecked_ref()));

    FEED_CONNECTION.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(old) = slot.take() {
            old.close();
        }
        *slot = Some(FeedConnection {
            es,
            on_open,
            on_error,
            handlers,
        });
    });
}

#[component]
pub fn FeedIndicator() -> impl IntoView {
    let ctx = expect_context::<MapCtx>();
    let label = move || match ctx.feed.get() {
        FeedStatus::Connecting => ("feed-dot connecting", "연결 중"),
        FeedStatus::Live => ("feed-dot live", "실시간"),
        FeedStatus::Reconnecting => ("feed-dot reconnecting", "재연결 중"),
    };
    view! {
        <div class="feed-indicator" title=move || label().1>
            <span class=move || label().0></span>
            <span class="feed-label">{move || label().1}</span>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use safenavi_shared::{BoardCategory, Comment, LocationSource};

    use super::*;

    fn post(writer: &str) -> BoardPost {
        BoardPost {
            id: 4,
            title: "도로 침수".to_string(),
            content: String::new(),
            category: BoardCategory::Report,
            writer: writer.to_string(),
            latitude: Some(37.5),
            longitude: Some(127.0),
            date: String::new(),
            image_url: None,
            like_count: 0,
            liked: false,
            location_type: LocationSource::Manual,
            can_delete: false,
            comments: Vec::<Comment>::new(),
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(reconnect_delay_ms(1), 500.0);
        assert_eq!(reconnect_delay_ms(2), 1_000.0);
        assert_eq!(reconnect_delay_ms(5), 8_000.0);
        assert_eq!(reconnect_delay_ms(6), 10_000.0);
        assert_eq!(reconnect_delay_ms(40), 10_000.0);
    }

    #[test]
    fn new_posts_from_blocked_writers_are_ignored() {
        let blocked = BlockList::new(vec!["스패머".to_string()]);
        assert_eq!(
            FeedAction::from_event(BoardEvent::NewPost(post("스패머")), &blocked),
            FeedAction::Ignore
        );
        assert_eq!(
            FeedAction::from_event(BoardEvent::NewPost(post("이웃")), &blocked),
            FeedAction::AddPost(post("이웃"))
        );
    }

    #[test]
    fn events_map_to_their_actions() {
        let blocked = BlockList::default();
        assert_eq!(
            FeedAction::from_event(BoardEvent::DeletedPost(9), &blocked),
            FeedAction::RemovePost(9)
        );
        let like = LikeEvent {
            board_id: 9,
            total_likes: 3,
        };
        assert_eq!(
            FeedAction::from_event(BoardEvent::LikeChanged(like), &blocked),
            FeedAction::Like(like)
        );
    }
}
