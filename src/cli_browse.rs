use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod cli_style;
mod movie_store;
mod sqlite_persistence;

use cli_style::{
    get_styles, print_command_echo, print_empty_list, print_goodbye, print_help, print_warning,
    CommandHelp, TableBuilder,
};
use movie_store::{MovieDetails, MovieRow, MovieStore};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

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
}

#[derive(Parser)]
#[command(styles=get_styles(), name = "", disable_help_subcommand = true)]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Shows all movies with their genres, actors and directors.
    Movies,

    /// Shows all genres in the catalog.
    Genres,

    /// Shows the movies linked to the given genre.
    ByGenre { genre_name: String },

    /// Shows the path of the current movie db.
    Where,

    /// Shows the available commands.
    Help,

    /// Close this program.
    Exit,
}

const COMMANDS_HELP: &[CommandHelp] = &[
    CommandHelp {
        name: "movies",
        args: "",
        description: "Shows all movies with their relations",
    },
    CommandHelp {
        name: "genres",
        args: "",
        description: "Shows all genres in the catalog",
    },
    CommandHelp {
        name: "by-genre",
        args: "<name>",
        description: "Shows the movies linked to a genre",
    },
    CommandHelp {
        name: "where",
        args: "",
        description: "Shows the path of the current movie db",
    },
    CommandHelp {
        name: "help",
        args: "",
        description: "Shows this message",
    },
    CommandHelp {
        name: "exit",
        args: "",
        description: "Close this program",
    },
];

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

fn print_movies_table(movies: &[MovieDetails]) {
    if movies.is_empty() {
        print_empty_list("No movies in the catalog");
        return;
    }

    let mut table = TableBuilder::new(vec!["Id", "Title", "Genres", "Actors", "Director"]);
    for movie in movies {
        let id = movie.movie_id.to_string();
        let genres = movie.genre.join(", ");
        let actors = movie.actors.join(", ");
        let director = movie.director.clone().unwrap_or_else(|| "-".to_string());
        table.add_row(vec![&id, &movie.title, &genres, &actors, &director]);
    }
    table.print();
}

fn print_movie_rows_table(movies: &[MovieRow]) {
    let mut table = TableBuilder::new(vec!["Id", "Title", "Runtime", "Rating"]);
    for movie in movies {
        let id = movie.movie_id.to_string();
        let runtime = movie
            .runtime_min
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let rating = movie
            .rating
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![&id, &movie.title, &runtime, &rating]);
    }
    table.print();
}

fn execute_command(line: String, store: &MovieStore, db_path: String) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => {
            print_command_echo(&line);
            match cli.command {
                InnerCommand::Movies => match store.list_movies() {
                    Ok(movies) => print_movies_table(&movies),
                    Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                },
                InnerCommand::Genres => match store.list_genres() {
                    Ok(genres) => {
                        if genres.is_empty() {
                            print_empty_list("No genres in the catalog");
                        } else {
                            let mut table = TableBuilder::new(vec!["Id", "Name"]);
                            for genre in &genres {
                                let id = genre.id.to_string();
                                table.add_row(vec![&id, &genre.name]);
                            }
                            table.print();
                        }
                    }
                    Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                },
                InnerCommand::ByGenre { genre_name } => match store.movies_by_genre(&genre_name) {
                    Ok(Some(movies)) => {
                        if movies.is_empty() {
                            print_empty_list(&format!("No movies in genre '{}'", genre_name));
                        } else {
                            print_movie_rows_table(&movies);
                        }
                    }
                    Ok(None) => print_warning(&format!("Unknown genre '{}'", genre_name)),
                    Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                },
                InnerCommand::Where => {
                    println!("{}", db_path);
                }
                InnerCommand::Help => print_help(COMMANDS_HELP),
                InnerCommand::Exit => return CommandExecutionResult::Exit,
            }
        }

        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct MyHelper {
    commands_names: Vec<String>,
}

impl MyHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        MyHelper { commands_names }
    }
}

impl Completer for MyHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(" ") {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for MyHelper {}
impl Validator for MyHelper {}
impl Helper for MyHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let store = MovieStore::new(&cli_args.path)?;

    cli_style::print_welcome(&cli_args.path.display().to_string());

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<MyHelper, FileHistory>::with_config(config)?;

    let helper = MyHelper::new();
    rl.set_helper(Some(helper));

    loop {
        let readline = rl.readline(PROMPT);

        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &store, cli_args.path.display().to_string()) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        eprintln!("Error: {:?}", err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    print_goodbye();
    Ok(())
}
