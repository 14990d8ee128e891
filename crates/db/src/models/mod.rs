//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - `Serialize` projection structs for API responses
//! - `Deserialize` DTOs for writes

pub mod annotation;
pub mod assignment;
pub mod category;
pub mod edit_request;
pub mod image;
pub mod notification;
pub mod setting;
pub mod user;
