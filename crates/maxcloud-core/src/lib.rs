//! max-cloud Core — domain models, store traits, and the bearer
//! credential codec shared by every other crate.

pub mod context;
pub mod credential;
pub mod error;
pub mod models;
pub mod store;

pub use context::Ctx;
pub use error::{Error, Result};
