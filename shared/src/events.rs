use serde::{Deserialize, Serialize};

use crate::board::{BoardPost, Comment};

/// Named events of the board push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedTopic {
    NewPost,
    DeletedPost,
    NewComment,
    LikeChanged,
}

impl FeedTopic {
    pub const ALL: [FeedTopic; 4] = [
        Self::NewPost,
        Self::DeletedPost,
        Self::NewComment,
        Self::LikeChanged,
    ];

    pub fn event_name(self) -> &'static str {
        match self {
            Self::NewPost => "board-new",
            Self::DeletedPost => "board-delete",
            Self::NewComment => "board-comment",
            Self::LikeChanged => "board-like",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    NewPost(BoardPost),
    DeletedPost(i64),
    NewComment(CommentEvent),
    LikeChanged(LikeEvent),
}

impl BoardEvent {
    pub fn parse(topic: FeedTopic, data: &str) -> Result<Self, serde_json::Error> {
        Ok(match topic {
            FeedTopic::NewPost => Self::NewPost(serde_json::from_str(data)?),
            FeedTopic::DeletedPost => Self::DeletedPost(serde_json::from_str(data)?),
            FeedTopic::NewComment => Self::NewComment(serde_json::from_str(data)?),
            FeedTopic::LikeChanged => Self::LikeChanged(serde_json::from_str(data)?),
        })
    }

    /// Post the event is about; `None` for new posts, which are not overlay-bound.
    pub fn target_post(&self) -> Option<i64> {
        match self {
            Self::NewPost(_) => None,
            Self::DeletedPost(id) => Some(*id),
            Self::NewComment(event) => Some(event.board_id),
            Self::LikeChanged(event) => Some(event.board_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEvent {
    pub board_id: i64,
    /// `-1` or absent for a root comment.
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub comment: Comment,
}

impl CommentEvent {
    pub fn parent(&self) -> Option<i64> {
        self.parent_id.filter(|id| *id > 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeEvent {
    pub board_id: i64,
    pub total_likes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_comment_sentinel() {
        let event = BoardEvent::parse(
            FeedTopic::NewComment,
            r#"{"boardId":5,"parentId":-1,"comment":{"id":9,"writer":"w","content":"c","timeAgo":"방금 전"}}"#,
        )
        .unwrap();
        let BoardEvent::NewComment(event) = event else {
            panic!("expected comment event");
        };
        assert_eq!(event.parent(), None);
        assert_eq!(event.comment.id, 9);
    }

    #[test]
    fn reply_comment_keeps_parent() {
        let event: CommentEvent = serde_json::from_str(
            r#"{"boardId":5,"parentId":3,"comment":{"id":10,"writer":"w","content":"c"}}"#,
        )
        .unwrap();
        assert_eq!(event.parent(), Some(3));
    }

    #[test]
    fn delete_payload_is_bare_id() {
        let event = BoardEvent::parse(FeedTopic::DeletedPost, "42").unwrap();
        assert_eq!(event, BoardEvent::DeletedPost(42));
        assert_eq!(event.target_post(), Some(42));
    }

    #[test]
    fn like_event_targets_post() {
        let event =
            BoardEvent::parse(FeedTopic::LikeChanged, r#"{"boardId":2,"totalLikes":7}"#).unwrap();
        assert_eq!(
            event,
            BoardEvent::LikeChanged(LikeEvent {
                board_id: 2,
                total_likes: 7
            })
        );
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(BoardEvent::parse(FeedTopic::NewPost, "{").is_err());
    }
}
