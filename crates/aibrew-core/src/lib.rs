pub mod config;
pub mod error;
pub mod types;

pub use config::{AibrewConfig, CredentialMode};
pub use error::{AibrewError, Result};
pub use types::*;
