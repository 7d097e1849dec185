// Utility functions
pub mod cache;
pub mod crypto;
pub mod error;
pub mod validation;

pub use error::{ApiError, ApiResult, FieldError};
