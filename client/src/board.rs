use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use leptos::html;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use safenavi_shared::board::{
    CommentInsert, CommentRequest, LikeResponse, PostDraft, ReportReason, ReportRequest,
    ReportTarget, count_comments, find_comment, insert_comment,
};
use safenavi_shared::events::CommentEvent;
use safenavi_shared::{BoardCategory, BoardPost, Comment, LatLng, LocationSource};

use crate::api;
use crate::app::MapCtx;
use crate::geolocation;
use crate::markers::close_overlay_later;
use crate::session::{Generation, OverlayOwner, Stale, mount_detached};
use crate::storage::BlockList;
use crate::surface::{Graphic, GraphicId, MapSurface, MarkerImage, MarkerSpec};

/// Top-level comments shown before "더보기".
pub const VISIBLE_COMMENTS: usize = 3;
const BOARD_MARKER_SIZE: u32 = 60;

/// Post markers on the map.
#[derive(Default)]
pub struct BoardLayer {
    generation: Generation,
    markers: HashMap<i64, GraphicId>,
    draft_marker: Option<GraphicId>,
}

impl BoardLayer {
    pub fn begin_reload(&mut self) -> u64 {
        self.generation.bump()
    }

    /// Replaces every post marker with `posts`, skipping blocked authors.
    pub fn apply(
        &mut self,
        surface: &dyn MapSurface,
        generation: u64,
        posts: &[BoardPost],
        blocked: &BlockList,
        on_select: &dyn Fn(&BoardPost) -> Rc<dyn Fn()>,
    ) -> Result<usize, Stale> {
        self.generation.check(generation)?;
        self.clear(surface);
        Ok(posts
            .iter()
            .filter(|post| self.add(surface, post, blocked, on_select))
            .count())
    }

    /// Draws one post; `false` when it is blocked, unplaced or already on the map.
    pub fn add(
        &mut self,
        surface: &dyn MapSurface,
        post: &BoardPost,
        blocked: &BlockList,
        on_select: &dyn Fn(&BoardPost) -> Rc<dyn Fn()>,
    ) -> bool {
        if blocked.contains(&post.writer) || self.markers.contains_key(&post.id) {
            return false;
        }
        let Some(at) = post.position() else {
            return false;
        };
        let spec = MarkerSpec::at(at)
            .image(MarkerImage::new(
                post.category.marker_image(),
                BOARD_MARKER_SIZE,
                BOARD_MARKER_SIZE,
            ))
            .title(post.title.clone());
        let id = surface.draw(Graphic::Marker(spec));
        surface.on_click(id, on_select(post));
        self.markers.insert(post.id, id);
        true
    }

    pub fn clear(&mut self, surface: &dyn MapSurface) {
        for (_, id) in self.markers.drain() {
            surface.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn show_draft_marker(&mut self, surface: &dyn MapSurface, at: LatLng) {
        self.clear_draft_marker(surface);
        self.draft_marker = Some(surface.draw(Graphic::Marker(MarkerSpec::at(at))));
    }

    pub fn clear_draft_marker(&mut self, surface: &dyn MapSurface) {
        if let Some(id) = self.draft_marker.take() {
            surface.remove(id);
        }
    }
}

/// The post shown in the detail overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPost {
    pub post: BoardPost,
    initial_roots: usize,
    expanded: bool,
    comment_count: usize,
    /// Reply forms created so far and whether each is shown.
    reply_forms: BTreeMap<i64, bool>,
}

impl OpenPost {
    pub fn new(post: BoardPost) -> Self {
        Self {
            initial_roots: post.comments.len(),
            comment_count: count_comments(&post.comments),
            expanded: false,
            reply_forms: BTreeMap::new(),
            post,
        }
    }

    pub fn id(&self) -> i64 {
        self.post.id
    }

    pub fn comment_count(&self) -> usize {
        self.comment_count
    }

    /// Top-level comments hidden behind "더보기".
    pub fn hidden_count(&self) -> usize {
        if self.expanded {
            0
        } else {
            self.initial_roots.saturating_sub(VISIBLE_COMMENTS)
        }
    }

    /// Collapsed: the first three loaded comments plus any that arrived while open.
    pub fn visible_roots(&self) -> Vec<Comment> {
        let comments = &self.post.comments;
        if self.hidden_count() == 0 {
            return comments.clone();
        }
        comments
            .iter()
            .take(VISIBLE_COMMENTS)
            .chain(comments.iter().skip(self.initial_roots))
            .cloned()
            .collect()
    }

    /// Shows the full list; `false` if it already was.
    pub fn expand(&mut self) -> bool {
        let changed = self.hidden_count() > 0;
        self.expanded = true;
        changed
    }

    pub fn apply_comment(&mut self, event: CommentEvent) -> CommentInsert {
        let parent = event.parent();
        let outcome = insert_comment(&mut self.post.comments, parent, event.comment);
        if outcome.applied() {
            self.comment_count += 1;
        }
        if let CommentInsert::Reply { parent } = outcome
            && let Some(shown) = self.reply_forms.get_mut(&parent)
        {
            *shown = false;
        }
        outcome
    }

    /// Flips the reply form of `comment_id`, creating it on first use. Returns visibility.
    pub fn toggle_reply_form(&mut self, comment_id: i64) -> bool {
        let shown = self.reply_forms.entry(comment_id).or_insert(false);
        *shown = !*shown;
        *shown
    }

    /// `None` until the form has been created.
    pub fn reply_form(&self, comment_id: i64) -> Option<bool> {
        self.reply_forms.get(&comment_id).copied()
    }

    pub fn set_like_count(&mut self, total: i64) {
        self.post.like_count = total.max(0);
    }
}

/// Write-mode flow: choose GPS or a map pin, then fill in the form.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum ComposeStage {
    #[default]
    Idle,
    ChoosingSource,
    PickingOnMap,
    Editing {
        position: LatLng,
        source: LocationSource,
    },
}

impl ComposeStage {
    /// The write button opens the source chooser, or leaves write mode when already in it.
    pub fn toggle(self) -> Self {
        match self {
            Self::Idle => Self::ChoosingSource,
            _ => Self::Idle,
        }
    }

    /// A map click while picking (or editing a picked spot) moves the pin.
    pub fn map_clicked(self, at: LatLng) -> Option<Self> {
        match self {
            Self::PickingOnMap
            | Self::Editing {
                source: LocationSource::Manual,
                ..
            } => Some(Self::Editing {
                position: at,
                source: LocationSource::Manual,
            }),
            _ => None,
        }
    }

    pub fn captures_map_clicks(self) -> bool {
        self.map_clicked(LatLng::new(0.0, 0.0)).is_some()
    }
}

/// A report about to be filed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSubject {
    pub target: ReportTarget,
    pub id: i64,
    pub title: String,
    pub writer: String,
}

pub async fn fetch_posts() -> Result<Vec<BoardPost>, api::ApiError> {
    api::get_json("/api/board").await
}

pub async fn fetch_post(id: i64) -> Result<BoardPost, api::ApiError> {
    api::get_json(&format!("/api/board/{id}")).await
}

fn marker_click(ctx: MapCtx) -> impl Fn(&BoardPost) -> Rc<dyn Fn()> {
    move |post: &BoardPost| {
        let post = post.clone();
        Rc::new(move || open_post(ctx, post.clone())) as Rc<dyn Fn()>
    }
}

/// Reloads every post marker.
pub(crate) fn reload(ctx: MapCtx) {
    let Some(generation) = ctx.session.with(|s| s.board.begin_reload()) else {
        return;
    };
    spawn_local(async move {
        let posts = match fetch_posts().await {
            Ok(posts) => posts,
            Err(e) => {
                web_sys::console::warn_1(&format!("board reload failed: {e}").into());
                return;
            }
        };
        let blocked = ctx.blocked.get_untracked();
        let on_select = marker_click(ctx);
        ctx.session
            .with(|s| s.board.apply(&*s.surface, generation, &posts, &blocked, &on_select));
    });
}

/// Adds a pushed post unless its author is blocked. Returns whether it was drawn.
pub(crate) fn add_live_post(ctx: MapCtx, post: &BoardPost) -> bool {
    let blocked = ctx.blocked.get_untracked();
    let on_select = marker_click(ctx);
    ctx.session
        .with(|s| s.board.add(&*s.surface, post, &blocked, &on_select))
        .unwrap_or(false)
}

/// Opens the overlay for a post, preferring its fresh detail over the list snapshot.
pub(crate) fn open_post(ctx: MapCtx, summary: BoardPost) {
    spawn_local(async move {
        let post = match fetch_post(summary.id).await {
            Ok(post) => post,
            Err(e) => {
                web_sys::console::warn_1(&format!("post detail fetch failed: {e}").into());
                summary
            }
        };
        show_post(ctx, post);
    });
}

fn show_post(ctx: MapCtx, post: BoardPost) {
    let Some(anchor) = post.position() else {
        return;
    };
    let id = post.id;
    ctx.open_post.set(Some(OpenPost::new(post.clone())));
    let Some((element, mount)) =
        mount_detached(move || view! { <BoardOverlay ctx post /> }.into_any())
    else {
        return;
    };
    ctx.session.with(|s| {
        let graphic = s.surface.open_overlay(anchor, &element);
        s.overlay
            .install(&*s.surface, OverlayOwner::Post(id), graphic, Some(mount));
    });
}

/// Routes a comment into the open overlay; dropped when that post is not open.
pub(crate) fn route_comment(ctx: MapCtx, event: CommentEvent) -> Option<CommentInsert> {
    let open = ctx
        .session
        .with(|s| s.overlay.is_open(OverlayOwner::Post(event.board_id)))
        .unwrap_or(false);
    if !open {
        return None;
    }
    let mut outcome = None;
    ctx.open_post.update(|slot| {
        if let Some(open) = slot.as_mut().filter(|p| p.id() == event.board_id) {
            outcome = Some(open.apply_comment(event));
        }
    });
    outcome
}

pub(crate) fn route_like(ctx: MapCtx, board_id: i64, total: i64) {
    let open = ctx
        .session
        .with(|s| s.overlay.is_open(OverlayOwner::Post(board_id)))
        .unwrap_or(false);
    if open {
        ctx.open_post.update(|slot| {
            if let Some(open) = slot.as_mut().filter(|p| p.id() == board_id) {
                open.set_like_count(total);
            }
        });
    }
}

fn submit_comment(ctx: MapCtx, post_id: i64, parent: Option<i64>, draft: RwSignal<String>) {
    let Some(request) = CommentRequest::new(&draft.get_untracked(), parent) else {
        return;
    };
    spawn_local(async move {
        let url = format!("/api/board/{post_id}/comment");
        match api::post_json::<_, Comment>(&url, &request).await {
            Ok(comment) => {
                draft.try_set(String::new());
                route_comment(
                    ctx,
                    CommentEvent {
                        board_id: post_id,
                        parent_id: parent,
                        comment,
                    },
                );
            }
            Err(e) => ctx.notices.api_error(&e, "댓글 등록에 실패했습니다."),
        }
    });
}

fn toggle_like(ctx: MapCtx, post_id: i64) {
    spawn_local(async move {
        match api::post_empty::<LikeResponse>(&format!("/api/board/{post_id}/like")).await {
            Ok(response) => ctx.open_post.update(|slot| {
                if let Some(open) = slot.as_mut().filter(|p| p.id() == post_id) {
                    open.post.liked = response.liked;
                }
            }),
            Err(e) => ctx.notices.api_error(&e, "좋아요 처리에 실패했습니다."),
        }
    });
}

fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

fn delete_post(ctx: MapCtx, post_id: i64) {
    if !confirm("게시글을 삭제하시겠습니까?") {
        return;
    }
    spawn_local(async move {
        match api::delete(&format!("/api/board/{post_id}")).await {
            Ok(()) => {
                ctx.notices.success("삭제되었습니다.");
                ctx.session.with(|s| {
                    s.overlay.close_if(&*s.surface, OverlayOwner::Post(post_id));
                });
                reload(ctx);
            }
            Err(e) => {
                web_sys::console::warn_1(&format!("delete failed: {e}").into());
                ctx.notices.error("권한이 없습니다");
            }
        }
    });
}

fn block_author(ctx: MapCtx, writer: String) {
    if !confirm(&format!("{writer}님의 글을 더 이상 보지 않으시겠습니까?")) {
        return;
    }
    let mut changed = false;
    ctx.blocked.update(|list| changed = list.block(&writer));
    if changed {
        ctx.blocked.with_untracked(BlockList::save);
    }
    ctx.notices.info(format!("{writer}님을 차단했습니다."));
    close_overlay_later(ctx);
    reload(ctx);
}

fn comment_node(ctx: MapCtx, post_id: i64, comment: Comment) -> AnyView {
    let id = comment.id;
    let draft = RwSignal::new(String::new());
    let replies = move || {
        ctx.open_post.with(|slot| {
            slot.as_ref()
                .and_then(|p| find_comment(&p.post.comments, id))
                .map(|c| c.replies.clone())
                .unwrap_or_default()
        })
    };
    let form_shown = move || {
        ctx.open_post
            .with(|slot| slot.as_ref().and_then(|p| p.reply_form(id)) == Some(true))
    };
    let toggle = move |_| {
        ctx.open_post.update(|slot| {
            if let Some(open) = slot.as_mut() {
                open.toggle_reply_form(id);
            }
        })
    };

    view! {
        <li class="comment-item">
            <div class="comment-bubble">
                <div class="comment-header">
                    <span class="comment-writer">{comment.writer}</span>
                    <span class="comment-time">{comment.time_ago}</span>
                    <span class="btn-reply" on:click=toggle>"답글"</span>
                </div>
                <div class="comment-text">{comment.content}</div>
            </div>
            <ul class="reply-list">
                <For
                    each=replies
                    key=|reply| reply.id
                    children=move |reply| comment_node(ctx, post_id, reply)
                />
            </ul>
            <Show when=form_shown>
                <div class="reply-form">
                    <input
                        type="text"
                        class="reply-input"
                        placeholder="답글 작성..."
                        prop:value=draft
                        on:input=move |ev| draft.set(event_target_value(&ev))
                    />
                    <button
                        class="reply-submit"
                        on:click=move |_| submit_comment(ctx, post_id, Some(id), draft)
                    >
                        "등록"
                    </button>
                </div>
            </Show>
        </li>
    }
    .into_any()
}

#[component]
fn BoardOverlay(ctx: MapCtx, post: BoardPost) -> impl IntoView {
    let post_id = post.id;
    let draft = RwSignal::new(String::new());
    let is_gps = post.location_type == LocationSource::Gps;
    let writer = post.writer.clone();
    let report_subject = ReportSubject {
        target: ReportTarget::Board,
        id: post_id,
        title: post.title.clone(),
        writer: post.writer.clone(),
    };
    let destination = post
        .position()
        .map(|at| crate::route::RoutePoint::new(at, post.title.clone()));

    let current = move |f: fn(&OpenPost) -> String| {
        ctx.open_post.with(|slot| {
            slot.as_ref()
                .filter(|p| p.id() == post_id)
                .map(f)
                .unwrap_or_default()
        })
    };
    let liked = move || {
        ctx.open_post
            .with(|slot| slot.as_ref().is_some_and(|p| p.id() == post_id && p.post.liked))
    };
    let roots = move || {
        ctx.open_post.with(|slot| {
            slot.as_ref()
                .filter(|p| p.id() == post_id)
                .map(OpenPost::visible_roots)
                .unwrap_or_default()
        })
    };
    let hidden = move || {
        ctx.open_post.with(|slot| {
            slot.as_ref()
                .filter(|p| p.id() == post_id)
                .map_or(0, OpenPost::hidden_count)
        })
    };
    let expand = move |_| {
        ctx.open_post.update(|slot| {
            if let Some(open) = slot.as_mut() {
                open.expand();
            }
        })
    };

    let action = if post.can_delete {
        view! {
            <span class="board-delete-btn" on:click=move |_| delete_post(ctx, post_id)>"🗑️"</span>
        }
        .into_any()
    } else {
        view! {
            <span
                class="board-report-btn"
                title="신고하기"
                on:click=move |_| ctx.report.set(Some(report_subject.clone()))
            >
                "🚨"
            </span>
            <span
                class="board-block-btn"
                title="차단하기"
                on:click=move |_| block_author(ctx, writer.clone())
            >
                "🚫"
            </span>
        }
        .into_any()
    };

    let image = post.image().map(str::to_string).map(|url| {
        let full = url.clone();
        view! {
            <img
                src=url
                class="board-image-thumbnail"
                alt="첨부 이미지"
                on:click=move |_| ctx.image_view.set(Some(full.clone()))
            />
        }
    });

    view! {
        <div class="board-overlay">
            <div class="board-header">
                <div class="board-writer">
                    <span class="board-badge">{post.category.label().to_string()}</span>
                    " "
                    {post.writer.clone()}
                    {is_gps.then(|| view! { <span class="verified-badge">"✅"</span> })}
                </div>
                <div class="board-header-actions">
                    <span class="board-date">{post.date.clone()}</span>
                    {action}
                    <span class="board-close" on:click=move |_| close_overlay_later(ctx)>"✕"</span>
                </div>
            </div>
            <div class="board-body">
                {image}
                <span class="board-title">{post.title.clone()}</span>
                <div class="board-content">{post.content.clone()}</div>
            </div>
            <div class="board-actions">
                <div class="action-btn like-btn" class:liked=liked on:click=move |_| toggle_like(ctx, post_id)>
                    {move || if liked() { "❤️" } else { "🤍" }}
                    " "
                    <span>{move || current(|p| p.post.like_count.to_string())}</span>
                </div>
                <div class="action-btn">
                    "💬 "
                    <span>{move || current(|p| p.comment_count().to_string())}</span>
                </div>
                {destination
                    .map(|dest| {
                        view! {
                            <div
                                class="action-btn"
                                on:click=move |_| crate::route::route_here(ctx, dest.clone())
                            >
                                "🧭 길찾기"
                            </div>
                        }
                    })}
            </div>
            <div class="board-comments">
                <ul class="comment-list">
                    <For
                        each=roots
                        key=|comment| comment.id
                        children=move |comment| comment_node(ctx, post_id, comment)
                    />
                    <Show when=move || (hidden() > 0)>
                        <button class="btn-more-comments" on:click=expand>
                            {move || format!("댓글 {}개 더보기 ▼", hidden())}
                        </button>
                    </Show>
                </ul>
                <div class="comment-form">
                    <input
                        type="text"
                        class="comment-input"
                        placeholder="댓글 작성..."
                        prop:value=draft
                        on:input=move |ev| draft.set(event_target_value(&ev))
                    />
                    <button
                        class="comment-submit"
                        on:click=move |_| submit_comment(ctx, post_id, None, draft)
                    >
                        "게시"
                    </button>
                </div>
            </div>
        </div>
    }
}

/// Moves the compose flow to the form once a GPS fix arrives.
fn compose_with_gps(ctx: MapCtx) {
    ctx.compose.set(ComposeStage::Idle);
    ctx.notices.info("위치 확인 중...");
    spawn_local(async move {
        match geolocation::current_position().await {
            Ok(at) => begin_editing(ctx, at, LocationSource::Gps),
            Err(e) => {
                web_sys::console::warn_1(&format!("{e}").into());
                ctx.notices.error("위치 확인 실패");
            }
        }
    });
}

fn begin_editing(ctx: MapCtx, position: LatLng, source: LocationSource) {
    ctx.session
        .with(|s| s.board.show_draft_marker(&*s.surface, position));
    ctx.compose.set(ComposeStage::Editing { position, source });
}

/// Feeds a bare map click to the compose flow; `true` when it was consumed.
pub(crate) fn compose_map_click(ctx: MapCtx, at: LatLng) -> bool {
    match ctx.compose.get_untracked().map_clicked(at) {
        Some(ComposeStage::Editing { position, source }) => {
            begin_editing(ctx, position, source);
            true
        }
        _ => false,
    }
}

pub(crate) fn leave_write_mode(ctx: MapCtx) {
    ctx.compose.set(ComposeStage::Idle);
    ctx.session
        .with(|s| s.board.clear_draft_marker(&*s.surface));
}

fn build_form(draft: &PostDraft, image: Option<web_sys::File>) -> Option<web_sys::FormData> {
    let form = web_sys::FormData::new().ok()?;
    for (name, value) in draft.fields() {
        form.append_with_str(name, &value).ok()?;
    }
    if let Some(file) = image {
        form.append_with_blob("imageFile", &file).ok()?;
    }
    Some(form)
}

/// Write-mode chooser and post form.
#[component]
pub fn BoardComposer() -> impl IntoView {
    let ctx = expect_context::<MapCtx>();
    let title = RwSignal::new(String::new());
    let content = RwSignal::new(String::new());
    let category = RwSignal::new(BoardCategory::Report);
    let image_ref = NodeRef::<html::Input>::new();

    let save = move |_| {
        let ComposeStage::Editing { position, source } = ctx.compose.get_untracked() else {
            return;
        };
        let draft = PostDraft {
            title: title.get_untracked(),
            content: content.get_untracked(),
            category: category.get_untracked(),
            position,
            source,
        };
        if let Err(e) = draft.validate() {
            ctx.notices.error(e.to_string());
            return;
        }
        let image = image_ref
            .get_untracked()
            .and_then(|input| input.files())
            .and_then(|files| files.get(0));
        let Some(form) = build_form(&draft, image) else {
            ctx.notices.error("게시글을 준비하지 못했습니다.");
            return;
        };
        spawn_local(async move {
            match api::post_form("/api/board", &form).await {
                Ok(()) => {
                    ctx.notices.success("게시글 등록 완료");
                    title.set(String::new());
                    content.set(String::new());
                    if let Some(input) = image_ref.get_untracked() {
                        input.set_value("");
                    }
                    leave_write_mode(ctx);
                }
                Err(e) => ctx.notices.api_error(&e, "게시글 등록에 실패했습니다."),
            }
        });
    };

    let pick_on_map = move |_| {
        ctx.compose.set(ComposeStage::PickingOnMap);
        ctx.notices.info("지도에서 위치를 선택해주세요.");
    };

    view! {
        <button
            id="btn-mode-write"
            class="map-btn"
            class:active=move || ctx.compose.get() != ComposeStage::Idle
            on:click=move |_| {
                if ctx.compose.get_untracked() == ComposeStage::Idle {
                    ctx.compose.set(ComposeStage::ChoosingSource);
                } else {
                    leave_write_mode(ctx);
                }
            }
        >
            "✏️ 글쓰기"
        </button>
        <Show when=move || ctx.compose.get() == ComposeStage::ChoosingSource>
            <div class="modal write-mode-modal">
                <p>"어디에 글을 남길까요?"</p>
                <button class="btn" on:click=move |_| compose_with_gps(ctx)>
                    {LocationSource::Gps.label()}
                </button>
                <button class="btn" on:click=pick_on_map>
                    {LocationSource::Manual.label()}
                </button>
                <button class="btn btn-secondary" on:click=move |_| leave_write_mode(ctx)>
                    "취소"
                </button>
            </div>
        </Show>
        <Show when=move || matches!(ctx.compose.get(), ComposeStage::Editing { .. })>
            <div class="modal board-modal">
                <h3>"게시글 작성"</h3>
                <select on:change=move |ev| {
                    category.set(BoardCategory::from(event_target_value(&ev)))
                }>
                    {BoardCategory::SELECTABLE
                        .iter()
                        .map(|c| {
                            let label = c.label().to_string();
                            view! { <option value=label.clone()>{label.clone()}</option> }
                        })
                        .collect_view()}
                </select>
                <input
                    type="text"
                    placeholder="제목"
                    prop:value=title
                    on:input=move |ev| title.set(event_target_value(&ev))
                />
                <textarea
                    placeholder="내용"
                    prop:value=content
                    on:input=move |ev| content.set(event_target_value(&ev))
                ></textarea>
                <input type="file" accept="image/*" node_ref=image_ref />
                <div class="modal-actions">
                    <button class="btn btn-primary" on:click=save>"등록"</button>
                    <button class="btn btn-secondary" on:click=move |_| leave_write_mode(ctx)>
                        "취소"
                    </button>
                </div>
            </div>
        </Show>
    }
}

/// Report form for the subject in `MapCtx::report`.
#[component]
pub fn ReportDialog() -> impl IntoView {
    let ctx = expect_context::<MapCtx>();
    let reason = RwSignal::new(ReportReason::Spam);
    let description = RwSignal::new(String::new());

    let submit = move |_| {
        let Some(subject) = ctx.report.get_untracked() else {
            return;
        };
        let request = ReportRequest {
            target_type: subject.target,
            target_id: subject.id,
            target_user: subject.writer,
            reason: reason.get_untracked(),
            description: description.get_untracked().trim().to_string(),
        };
        spawn_local(async move {
            match api::post_json_unit("/api/report", &request).await {
                Ok(()) => {
                    ctx.notices.success("신고가 접수되었습니다.");
                    description.set(String::new());
                    ctx.report.set(None);
                }
                Err(e) => ctx.notices.api_error(&e, "신고 접수에 실패했습니다."),
            }
        });
    };

    view! {
        <Show when=move || ctx.report.with(Option::is_some)>
            <div class="modal report-modal">
                <h3>"🚨 신고하기"</h3>
                <p class="report-target">
                    {move || ctx.report.get().map(|s| s.title).unwrap_or_default()}
                </p>
                <select on:change=move |ev| {
                    let picked = event_target_value(&ev);
                    if let Some(r) = ReportReason::ALL.into_iter().find(|r| r.label() == picked) {
                        reason.set(r);
                    }
                }>
                    {ReportReason::ALL
                        .into_iter()
                        .map(|r| view! { <option value=r.label()>{r.label()}</option> })
                        .collect_view()}
                </select>
                <textarea
                    placeholder="상세 내용 (선택)"
                    prop:value=description
                    on:input=move |ev| description.set(event_target_value(&ev))
                ></textarea>
                <div class="modal-actions">
                    <button class="btn btn-danger" on:click=submit>"신고"</button>
                    <button class="btn btn-secondary" on:click=move |_| ctx.report.set(None)>
                        "취소"
                    </button>
                </div>
            </div>
        </Show>
    }
}

/// Full-size view of a post image.
#[component]
pub fn ImageViewer() -> impl IntoView {
    let ctx = expect_context::<MapCtx>();
    view! {
        <Show when=move || ctx.image_view.with(Option::is_some)>
            <div class="image-view-modal" on:click=move |_| ctx.image_view.set(None)>
                <span class="image-view-close">"✕"</span>
                <img src=move || ctx.image_view.get().unwrap_or_default() alt="원본 이미지" />
            </div>
        </Show>
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::surface::testing::RecordingSurface;

    fn comment(id: i64) -> Comment {
        Comment {
            id,
            writer: "이웃".to_string(),
            content: format!("댓글 {id}"),
            time_ago: "방금 전".to_string(),
            replies: Vec::new(),
        }
    }

    fn post(id: i64, writer: &str, roots: usize) -> BoardPost {
        BoardPost {
            id,
            title: format!("제목 {id}"),
            content: "내용".to_string(),
            category: BoardCategory::Report,
            writer: writer.to_string(),
            latitude: Some(37.5),
            longitude: Some(127.0),
            date: "2024-05-01".to_string(),
            image_url: None,
            like_count: 0,
            liked: false,
            location_type: LocationSource::Gps,
            can_delete: false,
            comments: (1..=roots as i64).map(comment).collect(),
        }
    }

    fn pushed(board_id: i64, parent: Option<i64>, id: i64) -> CommentEvent {
        CommentEvent {
            board_id,
            parent_id: parent,
            comment: comment(id),
        }
    }

    fn no_click(_: &BoardPost) -> Rc<dyn Fn()> {
        Rc::new(|| {})
    }

    #[test]
    fn blocked_authors_are_never_drawn() {
        let surface = RecordingSurface::default();
        let mut layer = BoardLayer::default();
        let blocked = BlockList::new(vec!["악플러".to_string()]);
        let g = layer.begin_reload();
        let drawn = layer
            .apply(
                &surface,
                g,
                &[post(1, "이웃", 0), post(2, "악플러", 0)],
                &blocked,
                &no_click,
            )
            .unwrap();
        assert_eq!(drawn, 1);
        assert!(!layer.add(&surface, &post(3, "악플러", 0), &blocked, &no_click));
        assert_eq!(surface.markers(), 1);
    }

    #[test]
    fn reload_replaces_markers_and_live_posts_are_not_doubled() {
        let surface = RecordingSurface::default();
        let mut layer = BoardLayer::default();
        let blocked = BlockList::default();
        let g = layer.begin_reload();
        layer
            .apply(&surface, g, &[post(1, "a", 0), post(2, "b", 0)], &blocked, &no_click)
            .unwrap();
        assert!(!layer.add(&surface, &post(2, "b", 0), &blocked, &no_click));
        assert!(layer.add(&surface, &post(3, "c", 0), &blocked, &no_click));

        let g = layer.begin_reload();
        layer.apply(&surface, g, &[post(1, "a", 0)], &blocked, &no_click).unwrap();
        assert_eq!(surface.markers(), 1);
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn marker_click_selects_its_post() {
        let surface = RecordingSurface::default();
        let mut layer = BoardLayer::default();
        let picked = Rc::new(Cell::new(0));
        let sink = picked.clone();
        layer.add(
            &surface,
            &post(9, "a", 0),
            &BlockList::default(),
            &move |p: &BoardPost| {
                let sink = sink.clone();
                let id = p.id;
                Rc::new(move || sink.set(id)) as Rc<dyn Fn()>
            },
        );
        let id = *surface.graphics.borrow().keys().next().unwrap();
        surface.click(id);
        assert_eq!(picked.get(), 9);
    }

    #[test]
    fn long_threads_are_truncated_until_expanded() {
        let mut open = OpenPost::new(post(1, "a", 5));
        assert_eq!(open.visible_roots().len(), 3);
        assert_eq!(open.hidden_count(), 2);

        assert!(open.expand());
        assert_eq!(open.visible_roots().len(), 5);
        assert!(!open.expand());
        assert_eq!(open.visible_roots().len(), 5);
        assert_eq!(open.hidden_count(), 0);
    }

    #[test]
    fn live_roots_show_while_collapsed() {
        let mut open = OpenPost::new(post(1, "a", 4));
        assert_eq!(open.apply_comment(pushed(1, None, 50)), CommentInsert::Root);
        let ids: Vec<i64> = open.visible_roots().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 50]);
        assert_eq!(open.hidden_count(), 1);
        assert_eq!(open.comment_count(), 5);
    }

    #[test]
    fn reply_lands_once_under_its_parent() {
        let mut open = OpenPost::new(post(1, "a", 2));
        assert!(open.toggle_reply_form(2));

        let own_echo = pushed(1, Some(2), 77);
        assert_eq!(open.apply_comment(own_echo.clone()), CommentInsert::Reply { parent: 2 });
        assert_eq!(open.apply_comment(own_echo), CommentInsert::Duplicate);

        let parent = find_comment(&open.post.comments, 2).unwrap();
        assert_eq!(parent.replies.len(), 1);
        assert_eq!(open.comment_count(), 3);
        assert_eq!(open.reply_form(2), Some(false));
    }

    #[test]
    fn reply_to_unknown_parent_is_dropped() {
        let mut open = OpenPost::new(post(1, "a", 1));
        assert_eq!(open.apply_comment(pushed(1, Some(999), 5)), CommentInsert::MissingParent);
        assert_eq!(open.comment_count(), 1);
    }

    #[test]
    fn reply_forms_are_created_lazily_and_toggle() {
        let mut open = OpenPost::new(post(1, "a", 1));
        assert_eq!(open.reply_form(1), None);
        assert!(open.toggle_reply_form(1));
        assert!(!open.toggle_reply_form(1));
        assert_eq!(open.reply_form(1), Some(false));
    }

    #[test]
    fn compose_flow_tracks_manual_pins() {
        let at = LatLng::new(37.55, 126.97);
        assert_eq!(ComposeStage::Idle.toggle(), ComposeStage::ChoosingSource);
        assert_eq!(ComposeStage::PickingOnMap.toggle(), ComposeStage::Idle);
        assert_eq!(ComposeStage::Idle.map_clicked(at), None);
        assert_eq!(
            ComposeStage::PickingOnMap.map_clicked(at),
            Some(ComposeStage::Editing {
                position: at,
                source: LocationSource::Manual
            })
        );
        let gps = ComposeStage::Editing {
            position: at,
            source: LocationSource::Gps,
        };
        assert!(!gps.captures_map_clicks());
    }

    #[test]
    fn draft_marker_is_single() {
        let surface = RecordingSurface::default();
        let mut layer = BoardLayer::default();
        layer.show_draft_marker(&surface, LatLng::new(37.0, 127.0));
        layer.show_draft_marker(&surface, LatLng::new(37.1, 127.0));
        assert_eq!(surface.markers(), 1);
        layer.clear_draft_marker(&surface);
        assert_eq!(surface.markers(), 0);
    }
}
