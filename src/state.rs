use crate::{config::Config, store::Store, websocket::SessionRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub registry: SessionRegistry,
    pub config: Arc<Config>,
}
