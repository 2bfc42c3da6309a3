//! SQLite-backed movie store.
//!
//! One guarded connection per store; every write runs in a single
//! transaction so a movie and its join rows commit or roll back together.
//! Find-or-create on the lookup tables is a single upsert-and-fetch, so
//! concurrent creation of the same name cannot leave duplicates or force a
//! retry loop.

use super::models::{LookupRow, MovieDetails, MovieRow, NewMovie, RawQueryResult};
use super::schema::MOVIE_SCHEMA;
use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("movie with id {0} not found")]
    MovieNotFound(i64),
    #[error("title must not be empty")]
    EmptyTitle,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Clone)]
pub struct MovieStore {
    conn: Arc<Mutex<Connection>>,
}

impl MovieStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open movie database at {:?}", db_path.as_ref()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        MOVIE_SCHEMA.create_or_validate(&conn)?;

        let movie_count: i64 = conn.query_row("SELECT COUNT(*) FROM movies", [], |r| r.get(0))?;
        let genre_count: i64 = conn.query_row("SELECT COUNT(*) FROM genres", [], |r| r.get(0))?;
        info!(
            "Opened movie catalog: {} movies, {} genres",
            movie_count, genre_count
        );

        Ok(MovieStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        MOVIE_SCHEMA.create(&conn)?;
        Ok(MovieStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Create a movie with its genre/actor/director links in one transaction.
    ///
    /// Lookup names are deduplicated by exact match; repeated names within one
    /// request collapse into a single join row. Returns the created movie
    /// re-read with its flattened relations.
    pub fn create_movie(&self, new: &NewMovie) -> Result<MovieDetails, StoreError> {
        if new.title.trim().is_empty() {
            return Err(StoreError::EmptyTitle);
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO movies (title, runtime_min, rating) VALUES (?1, ?2, ?3)",
            params![new.title, new.runtime_min, new.rating],
        )?;
        let movie_id = tx.last_insert_rowid();

        for name in &new.genres {
            let genre_id = upsert_lookup(&tx, "genres", "genre_id", "genre_name", name)?;
            tx.execute(
                "INSERT OR IGNORE INTO movietogenre (movie_id, genre_id) VALUES (?1, ?2)",
                params![movie_id, genre_id],
            )?;
        }

        for name in &new.actors {
            let actor_id = upsert_lookup(&tx, "actors", "actor_id", "actor_name", name)?;
            tx.execute(
                "INSERT OR IGNORE INTO movietoactor (movie_id, actor_id, character_name) VALUES (?1, ?2, NULL)",
                params![movie_id, actor_id],
            )?;
        }

        for name in &new.directors {
            let director_id =
                upsert_lookup(&tx, "directors", "director_id", "director_name", name)?;
            tx.execute(
                "INSERT OR IGNORE INTO movietodirector (movie_id, director_id) VALUES (?1, ?2)",
                params![movie_id, director_id],
            )?;
        }

        let details = fetch_details(&tx, movie_id)?.ok_or(StoreError::MovieNotFound(movie_id))?;
        tx.commit()?;
        Ok(details)
    }

    /// Delete a movie and all of its join rows in one transaction.
    ///
    /// Lookup rows are kept even when they become unreferenced.
    pub fn delete_movie(&self, movie_id: i64) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let exists: bool = tx
            .query_row(
                "SELECT 1 FROM movies WHERE movie_id = ?1",
                params![movie_id],
                |_| Ok(true),
            )
            .unwrap_or(false);
        if !exists {
            return Err(StoreError::MovieNotFound(movie_id));
        }

        tx.execute(
            "DELETE FROM movietogenre WHERE movie_id = ?1",
            params![movie_id],
        )?;
        tx.execute(
            "DELETE FROM movietoactor WHERE movie_id = ?1",
            params![movie_id],
        )?;
        tx.execute(
            "DELETE FROM movietodirector WHERE movie_id = ?1",
            params![movie_id],
        )?;
        tx.execute("DELETE FROM movies WHERE movie_id = ?1", params![movie_id])?;

        tx.commit()?;
        Ok(())
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    pub fn get_movie(&self, movie_id: i64) -> Result<Option<MovieDetails>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Ok(fetch_details(&conn, movie_id)?)
    }

    /// All movies ordered by id ascending, with flattened relations.
    pub fn list_movies(&self) -> Result<Vec<MovieDetails>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let ids: Vec<i64> = {
            let mut stmt = conn.prepare_cached("SELECT movie_id FROM movies ORDER BY movie_id")?;
            let ids = stmt.query_map([], |r| r.get(0))?.collect::<Result<_, _>>()?;
            ids
        };

        let mut movies = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(details) = fetch_details(&conn, id)? {
                movies.push(details);
            }
        }
        Ok(movies)
    }

    pub fn list_genres(&self) -> Result<Vec<LookupRow>, StoreError> {
        self.list_lookup("genres", "genre_id", "genre_name")
    }

    pub fn list_actors(&self) -> Result<Vec<LookupRow>, StoreError> {
        self.list_lookup("actors", "actor_id", "actor_name")
    }

    pub fn list_directors(&self) -> Result<Vec<LookupRow>, StoreError> {
        self.list_lookup("directors", "director_id", "director_name")
    }

    fn list_lookup(
        &self,
        table: &str,
        id_col: &str,
        name_col: &str,
    ) -> Result<Vec<LookupRow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {id_col}, {name_col} FROM {table} ORDER BY {id_col}"
        ))?;
        let rows = stmt
            .query_map([], |r| {
                Ok(LookupRow {
                    id: r.get(0)?,
                    name: r.get(1)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Movies linked to the named genre, or None when the genre is unknown.
    pub fn movies_by_genre(&self, genre_name: &str) -> Result<Option<Vec<MovieRow>>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let genre_id: i64 = match conn.query_row(
            "SELECT genre_id FROM genres WHERE genre_name = ?1",
            params![genre_name],
            |r| r.get(0),
        ) {
            Ok(id) => id,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut stmt = conn.prepare_cached(
            "SELECT m.movie_id, m.title, m.runtime_min, m.rating
             FROM movietogenre mtg
             JOIN movies m ON m.movie_id = mtg.movie_id
             WHERE mtg.genre_id = ?1
             ORDER BY m.movie_id",
        )?;
        let movies = stmt
            .query_map(params![genre_id], |r| {
                Ok(MovieRow {
                    movie_id: r.get(0)?,
                    title: r.get(1)?,
                    runtime_min: r.get(2)?,
                    rating: r.get(3)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(Some(movies))
    }

    // =========================================================================
    // Raw Passthrough
    // =========================================================================

    /// Execute caller-supplied SQL verbatim.
    ///
    /// Trusted-operator escape hatch for the admin CLI; never reachable over
    /// HTTP. Failures from the underlying statement propagate unmodified.
    pub fn raw_query(&self, sql: &str) -> Result<RawQueryResult, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;

        if stmt.column_count() == 0 {
            let affected = stmt.execute([])?;
            return Ok(RawQueryResult::Affected(affected));
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mut out = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for i in 0..column_count {
                cells.push(render_value(row.get_ref(i)?));
            }
            out.push(cells);
        }

        Ok(RawQueryResult::Rows { columns, rows: out })
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

/// Find-or-create a lookup row by name, returning its id.
///
/// Single statement, so two simultaneous creates of the same name resolve to
/// the same row without a read-then-write race.
fn upsert_lookup(
    conn: &Connection,
    table: &str,
    id_col: &str,
    name_col: &str,
    name: &str,
) -> Result<i64, rusqlite::Error> {
    conn.query_row(
        &format!(
            "INSERT INTO {table} ({name_col}) VALUES (?1)
             ON CONFLICT({name_col}) DO UPDATE SET {name_col} = excluded.{name_col}
             RETURNING {id_col}"
        ),
        params![name],
        |r| r.get(0),
    )
}

fn fetch_details(
    conn: &Connection,
    movie_id: i64,
) -> Result<Option<MovieDetails>, rusqlite::Error> {
    let row = match conn.query_row(
        "SELECT movie_id, title, runtime_min, rating FROM movies WHERE movie_id = ?1",
        params![movie_id],
        |r| {
            Ok(MovieRow {
                movie_id: r.get(0)?,
                title: r.get(1)?,
                runtime_min: r.get(2)?,
                rating: r.get(3)?,
            })
        },
    ) {
        Ok(row) => row,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e),
    };

    // Derived lists come back in join-row insertion order.
    let genre = joined_names(
        conn,
        "SELECT g.genre_name FROM movietogenre mtg
         JOIN genres g ON g.genre_id = mtg.genre_id
         WHERE mtg.movie_id = ?1 ORDER BY mtg.rowid",
        movie_id,
    )?;
    let actors = joined_names(
        conn,
        "SELECT a.actor_name FROM movietoactor mta
         JOIN actors a ON a.actor_id = mta.actor_id
         WHERE mta.movie_id = ?1 ORDER BY mta.rowid",
        movie_id,
    )?;
    let director = joined_names(
        conn,
        "SELECT d.director_name FROM movietodirector mtd
         JOIN directors d ON d.director_id = mtd.director_id
         WHERE mtd.movie_id = ?1 ORDER BY mtd.rowid",
        movie_id,
    )?
    .into_iter()
    .next();

    Ok(Some(MovieDetails {
        movie_id: row.movie_id,
        title: row.title,
        runtime_min: row.runtime_min,
        rating: row.rating,
        genre,
        actors,
        director,
    }))
}

fn joined_names(
    conn: &Connection,
    sql: &str,
    movie_id: i64,
) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(sql)?;
    let names = stmt.query_map(params![movie_id], |r| r.get(0))?.collect();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(store: &MovieStore, table: &str) -> usize {
        match store
            .raw_query(&format!("SELECT COUNT(*) FROM {table}"))
            .unwrap()
        {
            RawQueryResult::Rows { rows, .. } => rows[0][0].parse().unwrap(),
            RawQueryResult::Affected(_) => panic!("expected rows"),
        }
    }

    fn inception() -> NewMovie {
        NewMovie {
            title: "Inception".to_string(),
            rating: Some(9),
            runtime_min: Some(148),
            genres: vec!["Sci-Fi".to_string()],
            actors: vec!["Leonardo DiCaprio".to_string()],
            directors: vec!["Christopher Nolan".to_string()],
        }
    }

    #[test]
    fn create_movie_returns_flattened_details() {
        let store = MovieStore::open_in_memory().unwrap();
        let details = store.create_movie(&inception()).unwrap();

        assert_eq!(details.title, "Inception");
        assert_eq!(details.rating, Some(9));
        assert_eq!(details.runtime_min, Some(148));
        assert_eq!(details.genre, vec!["Sci-Fi"]);
        assert_eq!(details.actors, vec!["Leonardo DiCaprio"]);
        assert_eq!(details.director, Some("Christopher Nolan".to_string()));
    }

    #[test]
    fn create_with_new_genres_inserts_lookup_and_join_rows() {
        let store = MovieStore::open_in_memory().unwrap();
        let new = NewMovie {
            title: "Arrival".to_string(),
            genres: vec!["Sci-Fi".to_string(), "Drama".to_string()],
            ..Default::default()
        };
        store.create_movie(&new).unwrap();

        assert_eq!(count(&store, "genres"), 2);
        assert_eq!(count(&store, "movietogenre"), 2);
    }

    #[test]
    fn genre_rows_are_shared_between_movies() {
        let store = MovieStore::open_in_memory().unwrap();
        store
            .create_movie(&NewMovie {
                title: "Arrival".to_string(),
                genres: vec!["Sci-Fi".to_string(), "Drama".to_string()],
                ..Default::default()
            })
            .unwrap();
        store
            .create_movie(&NewMovie {
                title: "Interstellar".to_string(),
                genres: vec!["Sci-Fi".to_string()],
                ..Default::default()
            })
            .unwrap();

        // No duplicate genre row; both movies link to the same Sci-Fi id.
        assert_eq!(count(&store, "genres"), 2);
        match store
            .raw_query(
                "SELECT COUNT(*) FROM movietogenre mtg
                 JOIN genres g ON g.genre_id = mtg.genre_id
                 WHERE g.genre_name = 'Sci-Fi'",
            )
            .unwrap()
        {
            RawQueryResult::Rows { rows, .. } => assert_eq!(rows[0][0], "2"),
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn repeated_names_in_one_request_collapse() {
        let store = MovieStore::open_in_memory().unwrap();
        store
            .create_movie(&NewMovie {
                title: "Adaptation".to_string(),
                actors: vec!["Nicolas Cage".to_string(), "Nicolas Cage".to_string()],
                ..Default::default()
            })
            .unwrap();

        assert_eq!(count(&store, "actors"), 1);
        assert_eq!(count(&store, "movietoactor"), 1);
    }

    #[test]
    fn empty_title_is_rejected_and_leaves_no_state() {
        let store = MovieStore::open_in_memory().unwrap();
        let new = NewMovie {
            title: "   ".to_string(),
            genres: vec!["Sci-Fi".to_string()],
            ..Default::default()
        };

        let err = store.create_movie(&new).unwrap_err();
        assert!(matches!(err, StoreError::EmptyTitle));
        assert_eq!(count(&store, "movies"), 0);
        assert_eq!(count(&store, "genres"), 0);
        assert_eq!(count(&store, "movietogenre"), 0);
    }

    #[test]
    fn failed_create_rolls_back_everything() {
        let store = MovieStore::open_in_memory().unwrap();
        // Break the last insert in the sequence; the whole transaction must
        // roll back, including the movie row and the lookup rows.
        store.raw_query("DROP TABLE movietodirector").unwrap();

        let result = store.create_movie(&inception());
        assert!(result.is_err());
        assert_eq!(count(&store, "movies"), 0);
        assert_eq!(count(&store, "genres"), 0);
        assert_eq!(count(&store, "actors"), 0);
    }

    #[test]
    fn get_movie_returns_none_for_unknown_id() {
        let store = MovieStore::open_in_memory().unwrap();
        assert!(store.get_movie(123).unwrap().is_none());
    }

    #[test]
    fn list_movies_is_ordered_by_id() {
        let store = MovieStore::open_in_memory().unwrap();
        for title in ["First", "Second", "Third"] {
            store
                .create_movie(&NewMovie {
                    title: title.to_string(),
                    ..Default::default()
                })
                .unwrap();
        }

        let movies = store.list_movies().unwrap();
        let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
        assert!(movies.windows(2).all(|w| w[0].movie_id < w[1].movie_id));
    }

    #[test]
    fn delete_movie_removes_join_rows_but_not_lookups() {
        let store = MovieStore::open_in_memory().unwrap();
        let created = store.create_movie(&inception()).unwrap();
        let other = store
            .create_movie(&NewMovie {
                title: "Interstellar".to_string(),
                genres: vec!["Sci-Fi".to_string()],
                actors: vec!["Matthew McConaughey".to_string()],
                directors: vec!["Christopher Nolan".to_string()],
                ..Default::default()
            })
            .unwrap();

        store.delete_movie(created.movie_id).unwrap();

        assert!(store.get_movie(created.movie_id).unwrap().is_none());
        // Unrelated movie and its join rows are untouched.
        let remaining = store.get_movie(other.movie_id).unwrap().unwrap();
        assert_eq!(remaining.genre, vec!["Sci-Fi"]);
        assert_eq!(remaining.director, Some("Christopher Nolan".to_string()));
        // Orphaned lookup rows are not garbage collected.
        assert_eq!(count(&store, "actors"), 2);
        assert_eq!(count(&store, "movietoactor"), 1);
        assert_eq!(count(&store, "movietogenre"), 1);
        assert_eq!(count(&store, "movietodirector"), 1);
    }

    #[test]
    fn delete_unknown_movie_is_not_found() {
        let store = MovieStore::open_in_memory().unwrap();
        let err = store.delete_movie(42).unwrap_err();
        assert!(matches!(err, StoreError::MovieNotFound(42)));
    }

    #[test]
    fn movies_by_genre_distinguishes_unknown_from_empty() {
        let store = MovieStore::open_in_memory().unwrap();
        store.create_movie(&inception()).unwrap();

        assert!(store.movies_by_genre("Western").unwrap().is_none());

        let sci_fi = store.movies_by_genre("Sci-Fi").unwrap().unwrap();
        assert_eq!(sci_fi.len(), 1);
        assert_eq!(sci_fi[0].title, "Inception");
    }

    #[test]
    fn raw_query_reports_affected_rows_for_writes() {
        let store = MovieStore::open_in_memory().unwrap();
        let result = store
            .raw_query("INSERT INTO genres (genre_name) VALUES ('Noir')")
            .unwrap();
        assert_eq!(result, RawQueryResult::Affected(1));
    }

    #[test]
    fn raw_query_renders_rows_as_text() {
        let store = MovieStore::open_in_memory().unwrap();
        store
            .create_movie(&NewMovie {
                title: "Alien".to_string(),
                rating: Some(9),
                ..Default::default()
            })
            .unwrap();

        match store
            .raw_query("SELECT title, rating, runtime_min FROM movies")
            .unwrap()
        {
            RawQueryResult::Rows { columns, rows } => {
                assert_eq!(columns, vec!["title", "rating", "runtime_min"]);
                assert_eq!(rows, vec![vec!["Alien", "9", "NULL"]]);
            }
            RawQueryResult::Affected(_) => panic!("expected rows"),
        }
    }

    #[test]
    fn raw_query_propagates_sql_errors_verbatim() {
        let store = MovieStore::open_in_memory().unwrap();
        assert!(store.raw_query("SELECT * FROM no_such_table").is_err());
    }
}
