use crate::movie_store::MovieStore;
use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedMovieStore = Arc<MovieStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub store: GuardedMovieStore,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedMovieStore {
    fn from_ref(input: &ServerState) -> Self {
        input.store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
