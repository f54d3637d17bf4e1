//! Transcoder Common Library
//!
//! Shared preset model and error types for the transcoder preset provider.

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;

/// Resource type name of the preset resource
pub const PRESET_RESOURCE_TYPE: &str = "aws_elastictranscoder_preset";
