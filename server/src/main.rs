use anyhow::Result;
use axum::Router;
use catalog::GoogleBooks;
use clap::Parser;
use server::{build_app, AppConfig};
use shelf_core::search::{DEFAULT_ENDPOINT, DEFAULT_MAX_RESULTS};
use shelf_core::SearchConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// State store directory
    #[arg(long, default_value = "./shelf-data")]
    data_dir: PathBuf,
    /// Directory holding the static app shell
    #[arg(long)]
    assets: Option<PathBuf>,
    /// Catalog volumes endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    /// Results requested per search (1-40)
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: u32,
    /// Catalog request timeout seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    /// Request every volume type instead of books only
    #[arg(long, default_value_t = false)]
    all_types: bool,
    /// Host to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let search = SearchConfig {
        endpoint: args.endpoint,
        max_results: args.max_results,
        result_type_filter: if args.all_types { None } else { Some("books".to_string()) },
        timeout: Duration::from_secs(args.timeout_secs),
    };
    let catalog = GoogleBooks::new(&search)?;
    let config = AppConfig { data_dir: args.data_dir, search, assets: args.assets };
    let app: Router = build_app(config, catalog)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
