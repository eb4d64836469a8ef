use std::path::PathBuf;

use clap::Parser;
use luno_server::{
    api, config::Config, error::set_include_details, state::AppState, utils::init_log,
};
use sqlx::MySqlPool;
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to bind, the port comes from PORT
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Directory for daily-rotated log files, stdout when omitted
    #[arg(short, long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let _guard = init_log(args.log_dir.clone());

    let config = Config::from_env()?;
    set_include_details(!config.production);

    // Key status without exposing the key
    match config.openai_api_key.as_deref() {
        Some(key) => {
            let provider = if config.uses_openrouter() {
                "OpenRouter"
            } else {
                "OpenAI"
            };
            let prefix: String = key.chars().take(7).collect();
            tracing::info!("OpenAI API key configured ({provider}) - {prefix}...");
        }
        None => tracing::warn!("OPENAI_API_KEY not found in environment variables"),
    }

    let database = MySqlPool::connect(&config.database_url).await?;
    sqlx::migrate!().run(&database).await?;

    let addr = format!("{}:{}", args.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    println!("Luno server running on http://{addr}");
    println!(
        "Environment: {}",
        if config.production {
            "production"
        } else {
            "development"
        }
    );

    let state = AppState::new(database, config);
    axum::serve(listener, api::router(state)).await?;

    Ok(())
}
