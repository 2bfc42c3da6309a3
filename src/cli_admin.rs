use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli_style;
mod movie_store;
mod sqlite_persistence;

use cli_style::{get_styles, print_empty_list, print_error, print_success, TableBuilder};
use movie_store::{LookupRow, MovieDetails, MovieStore, NewMovie, RawQueryResult};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to the SQLite movie database file.
    #[clap(value_parser = parse_path, env = "MOVIEDB_PATH")]
    pub path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a movie along with its genres, actors and directors.
    /// Names that already exist in the catalog are reused, not duplicated.
    AddMovie {
        #[clap(long)]
        title: String,

        #[clap(long)]
        rating: Option<i64>,

        /// Runtime in minutes.
        #[clap(long)]
        runtime: Option<i64>,

        /// Genre name, can be repeated.
        #[clap(long = "genre")]
        genres: Vec<String>,

        /// Actor name, can be repeated.
        #[clap(long = "actor")]
        actors: Vec<String>,

        /// Director name, can be repeated.
        #[clap(long = "director")]
        directors: Vec<String>,
    },

    /// Shows all movies with their genres, actors and directors.
    ViewMovies,

    /// Shows all genres.
    ViewGenres,

    /// Shows all actors.
    ViewActors,

    /// Shows all directors.
    ViewDirectors,

    /// Runs an arbitrary SQL statement against the database, verbatim.
    /// There is no sanitization whatsoever, you have been warned.
    Query { sql: String },
}

fn optional_number(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_movies_table(movies: &[MovieDetails]) {
    if movies.is_empty() {
        print_empty_list("No movies in the catalog");
        return;
    }

    let mut table = TableBuilder::new(vec![
        "Id", "Title", "Runtime", "Rating", "Genres", "Actors", "Director",
    ]);
    for movie in movies {
        let id = movie.movie_id.to_string();
        let runtime = optional_number(movie.runtime_min);
        let rating = optional_number(movie.rating);
        let genres = movie.genre.join(", ");
        let actors = movie.actors.join(", ");
        let director = movie.director.clone().unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            &id,
            &movie.title,
            &runtime,
            &rating,
            &genres,
            &actors,
            &director,
        ]);
    }
    table.print();
}

fn print_lookup_table(rows: &[LookupRow], empty_message: &str) {
    if rows.is_empty() {
        print_empty_list(empty_message);
        return;
    }

    let mut table = TableBuilder::new(vec!["Id", "Name"]);
    for row in rows {
        let id = row.id.to_string();
        table.add_row(vec![&id, &row.name]);
    }
    table.print();
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let store = MovieStore::new(&cli_args.path)?;

    match cli_args.command {
        Command::AddMovie {
            title,
            rating,
            runtime,
            genres,
            actors,
            directors,
        } => {
            let new = NewMovie {
                title,
                rating,
                runtime_min: runtime,
                genres,
                actors,
                directors,
            };
            match store.create_movie(&new) {
                Ok(details) => {
                    print_success(&format!(
                        "Created movie '{}' with id {}",
                        details.title, details.movie_id
                    ));
                    print_movies_table(&[details]);
                }
                Err(err) => print_error(&format!("{}", err)),
            }
        }
        Command::ViewMovies => print_movies_table(&store.list_movies()?),
        Command::ViewGenres => print_lookup_table(&store.list_genres()?, "No genres"),
        Command::ViewActors => print_lookup_table(&store.list_actors()?, "No actors"),
        Command::ViewDirectors => print_lookup_table(&store.list_directors()?, "No directors"),
        Command::Query { sql } => match store.raw_query(&sql) {
            Ok(RawQueryResult::Affected(count)) => {
                print_success(&format!("{} row(s) affected", count));
            }
            Ok(RawQueryResult::Rows { columns, rows }) => {
                if rows.is_empty() {
                    print_empty_list("Query returned no rows");
                } else {
                    let mut table =
                        TableBuilder::new(columns.iter().map(String::as_str).collect());
                    for row in &rows {
                        table.add_row(row.iter().map(String::as_str).collect());
                    }
                    table.print();
                }
            }
            Err(err) => print_error(&format!("{}", err)),
        },
    }
    Ok(())
}
