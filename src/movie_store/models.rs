use serde::{Deserialize, Serialize};

/// A bare row from the movies table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRow {
    pub movie_id: i64,
    pub title: String,
    pub runtime_min: Option<i64>,
    pub rating: Option<i64>,
}

/// A movie with its joined relations flattened into name lists.
///
/// This is the shape the API serves: `genre` and `actors` are name lists in
/// join-row insertion order, `director` is the first linked director's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub movie_id: i64,
    pub title: String,
    pub runtime_min: Option<i64>,
    pub rating: Option<i64>,
    pub genre: Vec<String>,
    pub actors: Vec<String>,
    pub director: Option<String>,
}

/// Input for creating a movie together with its relations.
#[derive(Debug, Clone, Default)]
pub struct NewMovie {
    pub title: String,
    pub rating: Option<i64>,
    pub runtime_min: Option<i64>,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
}

/// An id/name pair from one of the lookup tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupRow {
    pub id: i64,
    pub name: String,
}

/// Outcome of a raw SQL passthrough statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawQueryResult {
    /// A statement that produced rows; every value is rendered as text.
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// A statement that produced no rows, with its affected-row count.
    Affected(usize),
}
