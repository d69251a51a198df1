//! HTTP handlers for collection CRUD and discovery.

pub mod docs;
pub mod entity;
pub use docs::*;
