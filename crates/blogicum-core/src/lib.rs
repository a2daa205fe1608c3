//! # Blogicum Core
//!
//! The domain layer of the Blogicum blog service.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! the records, the public visibility rule for posts, the ownership guard that
//! gates mutations, pagination and field validation.

pub mod domain;
pub mod error;
pub mod guard;
pub mod pagination;
pub mod ports;
pub mod validation;
pub mod visibility;

pub use error::{DomainError, RepoError};
pub use guard::{Access, Authored, DenialReason, guard};
pub use pagination::{PAGE_SIZE, Page, PageRequest, PageSelector};
pub use validation::ValidationErrors;
pub use visibility::{PostQuery, Visibility, visible_posts};
