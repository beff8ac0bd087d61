//! Shared application state handed to every handler.

use std::sync::Arc;

use maxcloud_core::store::{AuthStore, ServiceStore};
use maxcloud_orchestrator::Orchestrator;

use crate::config::Config;
use crate::email::Sender;

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<dyn ServiceStore>,
    pub auth: Arc<dyn AuthStore>,
    pub orchestrator: Arc<dyn Orchestrator>,
    pub email: Arc<dyn Sender>,
    pub config: Arc<Config>,
}
