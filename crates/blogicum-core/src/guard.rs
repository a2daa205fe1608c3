//! Ownership guard for post and comment mutations.

use crate::domain::{Comment, Id, Post};

/// A record with a single author allowed to change it.
pub trait Authored {
    fn author_id(&self) -> Id;
}

impl Authored for Post {
    fn author_id(&self) -> Id {
        self.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> Id {
        self.author_id
    }
}

/// Outcome of an ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied(DenialReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// The requester is authenticated but did not write the resource.
    NotAuthor { requester: Id, author: Id },
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Access::Allowed)
    }
}

/// Allow the mutation iff `requester` authored `resource`.
pub fn guard<R: Authored + ?Sized>(requester: Id, resource: &R) -> Access {
    let author = resource.author_id();
    if requester == author {
        Access::Allowed
    } else {
        Access::Denied(DenialReason::NotAuthor { requester, author })
    }
}
