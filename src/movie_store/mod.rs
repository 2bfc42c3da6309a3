mod models;
mod schema;
mod store;

pub use models::{LookupRow, MovieDetails, MovieRow, NewMovie, RawQueryResult};
pub use schema::MOVIE_SCHEMA;
pub use store::{MovieStore, StoreError};
