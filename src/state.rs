use std::sync::Arc;

use crate::docs::ContextStore;
use crate::router::QueryRouter;

pub struct AppState {
    pub router: Arc<QueryRouter>,
    pub contexts: Arc<ContextStore>,
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
