//! # Blogicum Shared
//!
//! Wire types of the Blogicum API: request forms, response bodies and the
//! RFC 7807 problem document. Free of server dependencies so that clients
//! can share them.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
