use crate::assistant::AssistantSession;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single assistant instance this service fronts
    pub assistant: Arc<AssistantSession>,
}

impl AppState {
    pub fn new(assistant: Arc<AssistantSession>) -> Self {
        Self { assistant }
    }
}
