//! max-cloud Server — HTTP surface, authentication middleware,
//! reconciliation loop, and process wiring for the control plane.

pub mod config;
pub mod email;
pub mod handlers;
pub mod middleware;
pub mod reconciler;
pub mod router;
pub mod state;

pub use config::Config;
pub use reconciler::Reconciler;
pub use router::build_router;
pub use state::AppState;
