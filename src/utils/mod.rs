pub mod endpoint;
pub mod serde_helpers;
pub mod validation;
