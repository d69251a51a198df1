//! CrudService: generic CRUD over the storage contract, plus body validation and typed repositories.

mod crud;
mod repository;
mod validation;
pub use crud::CrudService;
pub use repository::Repository;
pub use validation::{check_value, RequestValidator};
