mod agent;
mod config;
mod error;
mod llm;
mod tools;
mod web;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::agent::ConversationDriver;
use crate::config::Config;
use crate::llm::GeminiClient;
use crate::web::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything reads env vars
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    if args.iter().any(|a| a == "--default-config") {
        print!("{}", Config::default_config_contents());
        return;
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load config
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let mut config = match Config::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };
    config.apply_env_overrides();

    // The credential is resolved exactly once, here.
    let api_key = match config.api_key() {
        Ok(k) => k,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let client = match GeminiClient::new(&config.gemini, api_key) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to initialize Gemini client: {e}");
            std::process::exit(1);
        }
    };

    if args.iter().any(|a| a == "--check") {
        run_checks(&config, &client);
        return;
    }

    info!(
        bind = %config.bind,
        model = %client.model(),
        response_format = ?config.generation.response_format,
        "code companion starting"
    );

    let driver = ConversationDriver::from_config(&config, Arc::new(client));
    let app = web::routes::build(AppState {
        driver: Arc::new(driver),
    });

    if let Err(e) = web::serve(app, &config.bind).await {
        error!("server error: {e}");
        std::process::exit(1);
    }

    info!("code companion stopped");
}

fn run_checks(config: &Config, client: &GeminiClient) {
    info!("config: OK");
    info!("  bind: {}", config.bind);
    info!("  model: {}", client.model());
    info!("  endpoint: {}", client.endpoint());
    info!("  response_format: {:?}", config.generation.response_format);
    info!("  tools: {}", if config.tools.enabled { "enabled" } else { "disabled" });
    info!("api key: OK");
}

fn print_usage() {
    println!(
        "code-companion — web front-end for Gemini code generation

USAGE:
    code-companion [OPTIONS]

OPTIONS:
    --config <PATH>     Path to config file (default: ~/.config/code-companion/config.toml)
    --default-config    Print default config to stdout and exit
    --check             Validate config and credentials, then exit
    -h, --help          Print this help message

ENVIRONMENT:
    GOOGLE_API_KEY      Gemini API key (required; may live in .env)
    GEMINI_MODEL        Model name, e.g. gemini-1.5-flash
    GEMINI_BASE_URL     API base URL
    COMPANION_BIND      Listen address, e.g. 127.0.0.1:5000
    RUST_LOG            Log filter (default: info)"
    );
}
