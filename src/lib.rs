//! Movie Catalog Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod cli_style;
pub mod movie_store;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use movie_store::{MovieDetails, MovieRow, MovieStore, NewMovie, StoreError};
pub use server::{run_server, RequestsLoggingLevel};
