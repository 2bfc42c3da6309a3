//! SQLite schema for the movie catalog.
//!
//! Table and column names match the original store so an existing database
//! keeps working across the rewrite. Lookup names carry a UNIQUE constraint
//! so find-or-create can be a single upsert.

use crate::sqlite_persistence::{Column, Schema, SqlType, Table};

const MOVIES_TABLE: Table = Table {
    name: "movies",
    columns: &[
        Column::new("movie_id", SqlType::Integer).primary_key(),
        Column::new("title", SqlType::Text).non_null(),
        Column::new("runtime_min", SqlType::Integer),
        Column::new("rating", SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[],
};

const GENRES_TABLE: Table = Table {
    name: "genres",
    columns: &[
        Column::new("genre_id", SqlType::Integer).primary_key(),
        Column::new("genre_name", SqlType::Text).non_null().unique(),
    ],
    unique_constraints: &[],
    indices: &[],
};

const ACTORS_TABLE: Table = Table {
    name: "actors",
    columns: &[
        Column::new("actor_id", SqlType::Integer).primary_key(),
        Column::new("actor_name", SqlType::Text).non_null().unique(),
    ],
    unique_constraints: &[],
    indices: &[],
};

const DIRECTORS_TABLE: Table = Table {
    name: "directors",
    columns: &[
        Column::new("director_id", SqlType::Integer).primary_key(),
        Column::new("director_name", SqlType::Text).non_null().unique(),
    ],
    unique_constraints: &[],
    indices: &[],
};

const MOVIE_TO_GENRE_TABLE: Table = Table {
    name: "movietogenre",
    columns: &[
        Column::new("movie_id", SqlType::Integer)
            .non_null()
            .references("movies", "movie_id"),
        Column::new("genre_id", SqlType::Integer)
            .non_null()
            .references("genres", "genre_id"),
    ],
    unique_constraints: &[&["movie_id", "genre_id"]],
    indices: &[("idx_movietogenre_movie", "movie_id")],
};

const MOVIE_TO_ACTOR_TABLE: Table = Table {
    name: "movietoactor",
    columns: &[
        Column::new("movie_id", SqlType::Integer)
            .non_null()
            .references("movies", "movie_id"),
        Column::new("actor_id", SqlType::Integer)
            .non_null()
            .references("actors", "actor_id"),
        Column::new("character_name", SqlType::Text),
    ],
    unique_constraints: &[&["movie_id", "actor_id"]],
    indices: &[("idx_movietoactor_movie", "movie_id")],
};

const MOVIE_TO_DIRECTOR_TABLE: Table = Table {
    name: "movietodirector",
    columns: &[
        Column::new("movie_id", SqlType::Integer)
            .non_null()
            .references("movies", "movie_id"),
        Column::new("director_id", SqlType::Integer)
            .non_null()
            .references("directors", "director_id"),
    ],
    unique_constraints: &[&["movie_id", "director_id"]],
    indices: &[("idx_movietodirector_movie", "movie_id")],
};

pub const MOVIE_SCHEMA: Schema = Schema {
    version: 0,
    tables: &[
        MOVIES_TABLE,
        GENRES_TABLE,
        ACTORS_TABLE,
        DIRECTORS_TABLE,
        MOVIE_TO_GENRE_TABLE,
        MOVIE_TO_ACTOR_TABLE,
        MOVIE_TO_DIRECTOR_TABLE,
    ],
};
