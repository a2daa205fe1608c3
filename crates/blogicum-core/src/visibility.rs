//! Public visibility of posts.
//!
//! A post is publicly listed when it is published, its category is published
//! and its publication time has been reached. The current time is always an
//! explicit argument so that a scheduled post becomes visible exactly at its
//! `pub_date` and the rule stays deterministic under test.

use chrono::{DateTime, Utc};

use crate::domain::{Category, Id, Post};

/// Which posts a listing may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only posts satisfying the public rule at `now`.
    Public { now: DateTime<Utc> },
    /// Every post, including unpublished and scheduled ones. Used for an
    /// author's own profile.
    Unrestricted,
}

/// Filter for post listings, evaluated in memory by [`PostQuery::matches`] and
/// translated to SQL conditions by database adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub visibility: Visibility,
    pub author_id: Option<Id>,
    pub category_id: Option<Id>,
}

/// Posts eligible for anonymous listings at `now`.
pub fn visible_posts(now: DateTime<Utc>) -> PostQuery {
    PostQuery {
        visibility: Visibility::Public { now },
        author_id: None,
        category_id: None,
    }
}

impl PostQuery {
    /// All posts regardless of publication state.
    pub fn unrestricted() -> Self {
        Self {
            visibility: Visibility::Unrestricted,
            author_id: None,
            category_id: None,
        }
    }

    pub fn by_author(mut self, author_id: Id) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn in_category(mut self, category_id: Id) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Evaluate the filter against a post and the category it points to.
    ///
    /// `category` must be the record referenced by `post.category_id`, or
    /// `None` when the post has no category.
    pub fn matches(&self, post: &Post, category: Option<&Category>) -> bool {
        if self.author_id.is_some_and(|id| id != post.author_id) {
            return false;
        }
        if self.category_id.is_some() && self.category_id != post.category_id {
            return false;
        }
        match self.visibility {
            Visibility::Public { now } => is_publicly_visible(post, category, now),
            Visibility::Unrestricted => true,
        }
    }
}

/// `is_published AND category.is_published AND pub_date <= now`.
///
/// A post without a category never satisfies the category clause.
pub fn is_publicly_visible(post: &Post, category: Option<&Category>, now: DateTime<Utc>) -> bool {
    post.is_published && category.is_some_and(|c| c.is_published) && post.pub_date <= now
}
