use std::sync::Arc;

use application::ChatHub;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<ChatHub>,
}

impl AppState {
    pub fn new(hub: Arc<ChatHub>) -> Self {
        Self { hub }
    }
}
