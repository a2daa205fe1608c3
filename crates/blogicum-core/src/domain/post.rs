use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CategoryRef, Id, LocationRef, UserRef};

/// Post entity - a blog entry with publish scheduling and ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Id,
    pub title: String,
    pub text: String,
    /// Publication time; a future value schedules the post.
    pub pub_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_published: bool,
    /// Path of an uploaded image in external storage.
    pub image: Option<String>,
    pub author_id: Id,
    pub category_id: Option<Id>,
    pub location_id: Option<Id>,
}

/// Fields of a post about to be stored; the store assigns id and creation time.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub image: Option<String>,
    pub author_id: Id,
    pub category_id: Option<Id>,
    pub location_id: Option<Id>,
}

/// A post joined with its author, category and location, annotated with the
/// number of comments it has.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithRelations {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserRef,
    pub category: Option<CategoryRef>,
    pub location: Option<LocationRef>,
    pub comment_count: u64,
}
