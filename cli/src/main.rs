use anyhow::{bail, Result};
use catalog::GoogleBooks;
use clap::{Parser, Subcommand};
use shelf_core::search::{DEFAULT_ENDPOINT, DEFAULT_MAX_RESULTS};
use shelf_core::{SearchConfig, SearchController, Shelf, SledStore};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

mod session;

use session::{print_books, Session};

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Search a book catalog and file results into categories", long_about = None)]
struct Cli {
    /// State store directory
    #[arg(long, global = true, default_value = "./shelf-data")]
    data_dir: PathBuf,
    /// Catalog volumes endpoint
    #[arg(long, global = true, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    /// Results requested per search (1-40)
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: u32,
    /// Catalog request timeout seconds
    #[arg(long, global = true, default_value_t = 10)]
    timeout_secs: u64,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read commands from stdin until `quit` (default)
    Interactive,
    /// Run one search and record it in the recent list
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Show recent searches
    Recent,
    /// List categories with their book counts
    Categories,
    /// List the books saved in a category
    Show { category: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();

    let config = SearchConfig {
        endpoint: cli.endpoint,
        max_results: cli.max_results,
        timeout: Duration::from_secs(cli.timeout_secs),
        ..SearchConfig::default()
    };
    let store = SledStore::open(&cli.data_dir)?;
    let shelf = Shelf::open(store);
    let controller = SearchController::new(GoogleBooks::new(&config)?, config);
    let mut session = Session::new(controller, shelf);
    let mut out = io::stdout().lock();

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Interactive => interactive(&mut session, &mut out).await,
        Commands::Search { query } => {
            if !session.search(&query.join(" "), &mut out).await? {
                bail!("search did not complete");
            }
            Ok(())
        }
        Commands::Recent => session.print_recent(&mut out),
        Commands::Categories => session.print_categories(&mut out),
        Commands::Show { category } => {
            if !session.shelf.categories().contains(&category) {
                writeln!(out, "no category named {category}")?;
                return Ok(());
            }
            print_books(&mut out, session.shelf.books_in(&category))
        }
    }
}

async fn interactive<W: Write>(session: &mut Session<GoogleBooks, SledStore>, out: &mut W) -> Result<()> {
    writeln!(out, "type `help` for commands")?;
    let stdin = io::stdin();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if !session.handle_line(&line, out).await? {
            break;
        }
    }
    tracing::debug!("session closed");
    Ok(())
}
