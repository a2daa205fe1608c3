use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Id, UserRef};

/// Comment entity - a reader's note under a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Id,
    pub text: String,
    pub post_id: Id,
    pub author_id: Id,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub text: String,
    pub post_id: Id,
    pub author_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: UserRef,
}
