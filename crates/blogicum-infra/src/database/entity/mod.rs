//! SeaORM entities for the blog schema.
//!
//! Each entity converts its `Model` into the domain record and builds an
//! `ActiveModel` from either the domain record (update) or its `New*`
//! counterpart (insert, with the id left to the sequence).

pub mod category;
pub mod comment;
pub mod location;
pub mod post;
pub mod user;
