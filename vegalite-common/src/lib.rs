pub mod error;
pub mod escape;

pub use serde_json;
