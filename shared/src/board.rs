use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::LatLng;

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Post category, carried on the wire as its Korean label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BoardCategory {
    Report,
    Question,
    Chat,
    Other(String),
}

impl From<String> for BoardCategory {
    fn from(label: String) -> Self {
        match label.trim() {
            "제보" => Self::Report,
            "질문" => Self::Question,
            "잡담" => Self::Chat,
            _ => Self::Other(label),
        }
    }
}

impl From<BoardCategory> for String {
    fn from(category: BoardCategory) -> Self {
        category.label().to_string()
    }
}

impl Default for BoardCategory {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl BoardCategory {
    pub const SELECTABLE: [BoardCategory; 3] = [Self::Report, Self::Question, Self::Chat];

    pub fn label(&self) -> &str {
        match self {
            Self::Report => "제보",
            Self::Question => "질문",
            Self::Chat => "잡담",
            Self::Other(label) => label,
        }
    }

    pub fn marker_image(&self) -> &'static str {
        match self {
            Self::Report => "/img/board/marker_report.png",
            Self::Question => "/img/board/marker_question.png",
            Self::Chat => "/img/board/marker_talk.png",
            Self::Other(_) => "/img/board/marker_default.png",
        }
    }
}

/// How the author picked the post position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LocationSource {
    Gps,
    #[default]
    #[serde(other)]
    Manual,
}

impl LocationSource {
    pub fn wire(self) -> &'static str {
        match self {
            Self::Gps => "GPS",
            Self::Manual => "MANUAL",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Gps => "📍 GPS 인증",
            Self::Manual => "📌 지도 선택",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub writer: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_ago: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub replies: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPost {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: BoardCategory,
    #[serde(default, deserialize_with = "null_as_default")]
    pub writer: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub like_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub liked: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location_type: LocationSource,
    #[serde(default, deserialize_with = "null_as_default")]
    pub can_delete: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
}

impl BoardPost {
    pub fn position(&self) -> Option<LatLng> {
        LatLng::from_parts(self.latitude, self.longitude)
    }

    pub fn image(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

/// Number of comments in a tree, replies included.
pub fn count_comments(comments: &[Comment]) -> usize {
    comments
        .iter()
        .map(|c| 1 + count_comments(&c.replies))
        .sum()
}

pub fn find_comment(comments: &[Comment], id: i64) -> Option<&Comment> {
    comments.iter().find_map(|c| {
        if c.id == id {
            Some(c)
        } else {
            find_comment(&c.replies, id)
        }
    })
}

fn find_comment_mut(comments: &mut [Comment], id: i64) -> Option<&mut Comment> {
    for comment in comments.iter_mut() {
        if comment.id == id {
            return Some(comment);
        }
        if let Some(found) = find_comment_mut(&mut comment.replies, id) {
            return Some(found);
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentInsert {
    Root,
    Reply { parent: i64 },
    /// Same comment id already present.
    Duplicate,
    /// Reply whose parent is not in the tree.
    MissingParent,
}

impl CommentInsert {
    pub fn applied(self) -> bool {
        matches!(self, Self::Root | Self::Reply { .. })
    }
}

/// Inserts a pushed comment. A reply whose parent is unknown is dropped, and a comment id that
/// is already present is not inserted twice.
pub fn insert_comment(
    comments: &mut Vec<Comment>,
    parent: Option<i64>,
    comment: Comment,
) -> CommentInsert {
    if find_comment(comments, comment.id).is_some() {
        return CommentInsert::Duplicate;
    }
    match parent {
        None => {
            comments.push(comment);
            CommentInsert::Root
        }
        Some(parent) => match find_comment_mut(comments, parent) {
            Some(target) => {
                target.replies.push(comment);
                CommentInsert::Reply { parent }
            }
            None => CommentInsert::MissingParent,
        },
    }
}

/// Body of `POST /api/board/{id}/comment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub content: String,
    pub parent_id: Option<i64>,
}

impl CommentRequest {
    /// `None` for blank text, so nothing is sent.
    pub fn new(content: &str, parent_id: Option<i64>) -> Option<Self> {
        let content = content.trim();
        (!content.is_empty()).then(|| Self {
            content: content.to_string(),
            parent_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub total_likes: i64,
}

/// Text fields of a new post; the image travels separately as a multipart file.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub category: BoardCategory,
    pub position: LatLng,
    pub source: LocationSource,
}

impl PostDraft {
    pub fn validate(&self) -> Result<(), crate::account::ValidationError> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(crate::account::ValidationError::MissingPostFields);
        }
        Ok(())
    }

    /// Multipart text fields in the order the backend binds them.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("title", self.title.trim().to_string()),
            ("content", self.content.trim().to_string()),
            ("category", self.category.label().to_string()),
            ("latitude", self.position.lat.to_string()),
            ("longitude", self.position.lng.to_string()),
            ("locationType", self.source.wire().to_string()),
        ]
    }
}

/// Body of `POST /api/report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub target_type: ReportTarget,
    pub target_id: i64,
    pub target_user: String,
    pub reason: ReportReason,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportTarget {
    Board,
    Facility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportReason {
    Spam,
    Abuse,
    FalseInfo,
    Obscene,
    Etc,
}

impl ReportReason {
    pub const ALL: [ReportReason; 5] = [
        Self::Spam,
        Self::Abuse,
        Self::FalseInfo,
        Self::Obscene,
        Self::Etc,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Spam => "스팸/홍보",
            Self::Abuse => "욕설/비방",
            Self::FalseInfo => "허위 정보",
            Self::Obscene => "음란물",
            Self::Etc => "기타",
        }
    }
}
