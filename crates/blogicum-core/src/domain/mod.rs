//! Domain entities - the core business objects.

mod category;
mod comment;
mod location;
mod post;
mod user;

pub use category::{Category, CategoryRef, NewCategory};
pub use comment::{Comment, CommentWithAuthor, NewComment};
pub use location::{Location, LocationRef, NewLocation};
pub use post::{NewPost, Post, PostWithRelations};
pub use user::{NewUser, User, UserRef};

/// Store-assigned record identifier.
pub type Id = i64;
