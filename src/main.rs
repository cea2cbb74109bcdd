//! Rabbit BQ Interceptor CLI
//!
//! Entry point for the `rabbit-bq` operator tool.

use clap::{Args, Parser, Subcommand};
use rabbit_bq_interceptor::dynamic_config::validate;
use rabbit_bq_interceptor::plugin::{build_interceptor, open_stores};
use rabbit_bq_interceptor::settings::{default_host_path, DEFAULT_PROJECT_PATH};
use rabbit_bq_interceptor::submit::FnSubmitter;
use rabbit_bq_interceptor::{
    logging, ConfigProvider, CredentialProvider, EffectiveSettings, MemorySink, SubmissionError,
    SubmissionRequest,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rabbit-bq")]
#[command(about = "Rabbit BigQuery job optimizer interceptor", version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to project settings file (default: .rabbit/bq-interceptor.toml)
    #[arg(long, short = 's', global = true)]
    settings: Option<PathBuf>,

    /// Read variables and connections from this JSON store file
    #[arg(long, global = true)]
    store_file: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective settings and where they came from
    Settings {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Check the optimizer config and API connection without submitting
    Verify,

    /// Show what would be submitted for a job configuration (dry run)
    Explain {
        /// Path to a JSON job configuration
        #[arg(long, short = 'j')]
        job: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let settings = match load_settings(&cli.global) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Settings error: {}", e);
            process::exit(1);
        }
    };
    logging::init(&settings.interceptor_settings().log_level);

    match cli.command {
        Commands::Settings { json } => run_settings(&settings, json),
        Commands::Verify => run_verify(&settings),
        Commands::Explain { job } => run_explain(&settings, &job),
    }
}

fn load_settings(global: &GlobalArgs) -> Result<EffectiveSettings, String> {
    let mut overrides = serde_json::Map::new();
    if let Some(ref path) = global.store_file {
        overrides.insert(
            "store".to_string(),
            json!({"backend": "file", "path": path.to_string_lossy()}),
        );
    }
    if let Some(ref level) = global.log_level {
        overrides.insert("logging".to_string(), json!({"level": level}));
    }

    let project = global
        .settings
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECT_PATH));
    let cli_layer = (!overrides.is_empty()).then(|| Value::Object(overrides));

    EffectiveSettings::build(default_host_path().as_deref(), Some(&project), cli_layer)
        .map_err(|e| e.to_string())
}

fn run_settings(settings: &EffectiveSettings, json: bool) {
    if json {
        match settings.to_json() {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let typed = settings.interceptor_settings();
    println!("Sources:");
    for source in &settings.sources {
        match (&source.path, &source.digest) {
            (Some(path), Some(digest)) => println!("  {:?}: {} ({})", source.origin, path, &digest[..12]),
            _ => println!("  {:?}", source.origin),
        }
    }
    println!();
    println!("  Config key: {}", typed.config_key);
    println!("  Connection: {}", typed.connection_id);
    println!("  Optimizer: {}", typed.optimizer.default_base_url);
    println!(
        "  Timeouts: connect {}s, request {}s",
        typed.optimizer.connect_timeout.as_secs(),
        typed.optimizer.request_timeout.as_secs()
    );
    println!("  Store: {:?}", typed.store);
}

fn run_verify(settings: &EffectiveSettings) {
    let typed = settings.interceptor_settings();
    let (variables, connections) = open_stores(&typed);

    let raw = match ConfigProvider::new(variables).load(&typed.config_key) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("✗ {}", e);
            process::exit(1);
        }
    };
    let config = match validate(&raw) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Variable '{}': {}", typed.config_key, e);
            process::exit(1);
        }
    };
    println!("✓ Variable '{}' is configured", typed.config_key);
    println!("  Pricing mode: {}", config.default_pricing_mode);
    println!("  Reservations: {}", config.reservation_ids.join(", "));

    let credentials = match CredentialProvider::new(connections)
        .with_base_url_extra_key(typed.base_url_extra_key.clone())
        .resolve(&typed.connection_id)
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✗ {}", e);
            process::exit(1);
        }
    };
    println!("✓ Connection '{}' is configured", typed.connection_id);
    println!("  API key: {}", credentials.api_key.masked());
    println!(
        "  Base URL: {}",
        credentials
            .base_url
            .as_deref()
            .unwrap_or(&typed.optimizer.default_base_url)
    );
}

fn run_explain(settings: &EffectiveSettings, job_path: &Path) {
    let configuration: Value = match std::fs::read_to_string(job_path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
    {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error reading job {}: {}", job_path.display(), e);
            process::exit(1);
        }
    };

    // Dry run: the decision never reaches a submitter
    let refuse = FnSubmitter(|_: SubmissionRequest| {
        Err(SubmissionError::Rejected("dry run".to_string()))
    });
    let sink = Arc::new(MemorySink::new());
    let interceptor = build_interceptor(refuse, &settings.interceptor_settings(), sink.clone());

    let request = SubmissionRequest::new(configuration);
    let decision = interceptor.decide(&request);

    let output = json!({
        "decision": decision.to_json(&request),
        "diagnostics": sink.records(),
    });
    match serde_json::to_string_pretty(&output) {
        Ok(out) => println!("{}", out),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}
