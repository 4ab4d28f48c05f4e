//! decoy-resolve: resolve one described request against a stub configuration.
//!
//! A development companion to the engine: point it at an engine config,
//! describe a request on the command line, and see exactly what the
//! resolution pipeline would serve — useful for checking stub files and
//! prompts without standing up the transport.

use anyhow::{Context, Result};
use clap::Parser;
use decoy_stub_engine::config::EngineConfig;
use decoy_stub_engine::engine::ResolutionEngine;
use decoy_stub_engine::request::RequestView;
use decoy_stub_engine::state::create_state_store;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "decoy-resolve",
    about = "Resolve a request against declarative stub sources"
)]
struct Args {
    /// Engine configuration file (YAML)
    #[arg(short, long, env = "DECOY_CONFIG")]
    config: PathBuf,

    /// Logical service (spec) name
    #[arg(short, long)]
    spec: String,

    /// Environment key (empty = root environment)
    #[arg(short, long, default_value = "")]
    env: String,

    /// HTTP method
    #[arg(short, long, default_value = "get")]
    method: String,

    /// Request path
    path: String,

    /// Query parameter, key=value (repeatable)
    #[arg(short = 'q', long = "query", value_name = "KEY=VALUE")]
    query: Vec<String>,

    /// Form/body parameter, key=value (repeatable)
    #[arg(short = 'd', long = "data", value_name = "KEY=VALUE")]
    data: Vec<String>,

    /// Request header, name=value (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME=VALUE")]
    header: Vec<String>,

    /// Request cookie, name=value (repeatable)
    #[arg(short = 'C', long = "cookie", value_name = "NAME=VALUE")]
    cookie: Vec<String>,

    /// Disallow falling through to OpenAPI examples
    #[arg(long)]
    explicit: bool,
}

fn split_pair(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .with_context(|| format!("expected key=value, got '{raw}'"))
}

fn build_request(args: &Args) -> Result<RequestView> {
    let mut request = RequestView::new(args.method.clone(), args.path.clone());
    for raw in &args.query {
        let (key, value) = split_pair(raw)?;
        request = request.with_query(key, value);
    }
    for raw in &args.data {
        let (key, value) = split_pair(raw)?;
        request = request.with_form(key, value);
    }
    for raw in &args.header {
        let (name, value) = split_pair(raw)?;
        request = request.with_header(name, value);
    }
    for raw in &args.cookie {
        let (name, value) = split_pair(raw)?;
        request = request.with_cookie(name, value);
    }
    Ok(request)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = EngineConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let state = create_state_store(&config.state)?;
    let engine = ResolutionEngine::new(config, state, None);

    let request = build_request(&args)?;
    let path = request.path.clone();

    match engine.resolve(&args.spec, &request, &path, args.explicit, &args.env) {
        Some(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        None => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({"error": "not_specified"}))?
            );
            std::process::exit(1);
        }
    }
}
