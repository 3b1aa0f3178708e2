//! Data Transfer Objects for REST request/response serialization.

pub mod bucket_dto;
pub mod common_dto;
pub mod listing_dto;

pub use bucket_dto::*;
pub use common_dto::*;
pub use listing_dto::*;
