//! Vigil CLI - API monitoring from the command line
//!
//! Serve the monitoring API, or probe a target directly.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use vigil::api::{ApiState, start_api_server};
use vigil::auth::generate_token;
use vigil::client::{PingOptions, VigilClient, ping};
use vigil::config::Config;
use vigil::execution::{Dispatcher, RunResult, TargetDefinition};

/// Vigil - concurrent API endpoint monitoring
#[derive(Debug, Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the monitoring API server
    Serve {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Probe the endpoints of a target definition
    Run {
        /// Target definition file (YAML or JSON)
        #[arg(short, long)]
        target: String,

        /// Submit to a remote Vigil service instead of probing locally
        #[arg(short, long)]
        remote: Option<String>,

        /// Bearer token for the remote service
        #[arg(long, env = "VIGIL_TOKEN")]
        token: Option<String>,

        /// Per-request timeout in seconds (overrides the target file)
        #[arg(long)]
        timeout: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        output_json: bool,
    },

    /// Ping a URL for liveness
    Ping {
        /// URL to ping
        url: String,

        /// Number of pings
        #[arg(short, long, default_value_t = 1)]
        count: u32,

        /// Timeout per ping in seconds
        #[arg(short, long, default_value_t = 5)]
        timeout: u64,
    },

    /// Mint a bearer token for the API
    Token {
        /// User id the token is issued to
        #[arg(short, long)]
        user_id: String,

        /// Email embedded in the token
        #[arg(short, long)]
        email: Option<String>,

        /// Path to configuration file holding the signing secret
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Generate a default configuration file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "vigil.yaml")]
        output: String,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "vigil.yaml")]
        config: String,
    },
}

fn setup_logging(verbose: bool, json: bool) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.json);

    match cli.command {
        Commands::Serve { config, port } => serve(config.as_deref(), port).await,

        Commands::Run {
            target,
            remote,
            token,
            timeout,
            output_json,
        } => {
            run_target(
                &target,
                remote.as_deref(),
                token.as_deref(),
                timeout,
                output_json,
            )
            .await
        }

        Commands::Ping {
            url,
            count,
            timeout,
        } => ping_url(&url, count, timeout).await,

        Commands::Token {
            user_id,
            email,
            config,
        } => mint_token(&user_id, email.as_deref(), config.as_deref()),

        Commands::Init { output } => init_config(&output),

        Commands::Validate { config } => validate_config(&config),
    }
}

fn load_config(path: Option<&str>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            tracing::info!(config = %path, "Loading configuration");
            Config::from_file(path)
                .with_context(|| format!("Failed to load config from {path}"))?
        }
        None => Config::default(),
    };
    Ok(config.with_env_overrides())
}

/// Cancel `token` on Ctrl+C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            token.cancel();
        }
    });
}

/// Run the API server until Ctrl+C
async fn serve(config_path: Option<&str>, port: Option<u16>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate().context("Invalid configuration")?;

    let (host, port) = config.server.bind_address()?;
    let jwt = config.auth.jwt_config();
    if jwt.is_none() {
        if config.server.is_local() {
            tracing::warn!("No JWT secret configured, API authentication is disabled");
        } else {
            tracing::error!(
                environment = %config.server.environment,
                "No JWT secret configured outside a local environment, API authentication is disabled"
            );
        }
    }

    let shutdown = CancellationToken::new();
    let state = ApiState::new(config.dispatcher(), Arc::new(config.store()))
        .with_jwt(jwt)
        .with_environment(&config.server.environment)
        .with_shutdown(shutdown.clone());

    tracing::info!(
        environment = %config.server.environment,
        default_timeout_ms = config.dispatch.default_timeout.as_millis(),
        max_concurrency = ?config.dispatch.max_concurrency,
        history_limit = config.storage.history_limit,
        "Service configuration loaded"
    );

    cancel_on_ctrl_c(shutdown.clone());
    start_api_server((host.as_str(), port), state, shutdown)
        .await
        .context("API server error")
}

/// Read a target definition from YAML or JSON
fn load_target(path: &str) -> Result<TargetDefinition> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;

    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {path}"))
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {path}"))
    }
}

/// Probe a target locally or through a remote service
async fn run_target(
    target_path: &str,
    remote: Option<&str>,
    token: Option<&str>,
    timeout: Option<u64>,
    output_json: bool,
) -> Result<()> {
    let mut target = load_target(target_path)?;
    if let Some(seconds) = timeout {
        target = target.with_timeout_seconds(seconds);
    }

    tracing::info!(
        base_url = %target.base_url,
        endpoints = target.endpoints.len(),
        remote = ?remote,
        "Running tests"
    );

    let result = match remote {
        Some(url) => {
            let mut client = VigilClient::new(url)
                .with_context(|| format!("Invalid remote URL {url}"))?;
            if let Some(token) = token {
                client = client.with_token(token);
            }
            client.run(&target).await.context("Remote run failed")?
        }
        None => {
            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(cancel.clone());
            Dispatcher::new()
                .dispatch_with_cancel(target, cancel)
                .await
                .context("Test run failed")?
        }
    };

    if output_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize report")?
        );
    } else {
        print_report(&result);
    }

    if result.status.is_fail() {
        anyhow::bail!(
            "{} of {} endpoints FAILED",
            result.failed_count(),
            result.results.len()
        )
    }
    Ok(())
}

fn print_report(result: &RunResult) {
    println!("Run {} against {}", result.request_id, result.base_url);
    println!();
    println!("  {:<6} {:<40} {:>8} {:>8}", "STATUS", "PATH", "EXPECTED", "ACTUAL");
    for outcome in &result.results {
        println!(
            "  {:<6} {:<40} {:>8} {:>8}",
            outcome.status.to_string(),
            outcome.path,
            outcome.expected_status,
            outcome.actual_status
        );
    }
    println!();
    println!(
        "Verdict: {} ({} passed, {} failed)",
        result.status,
        result.passed_count(),
        result.failed_count()
    );
}

/// Ping a URL and print each answer
async fn ping_url(url: &str, count: u32, timeout: u64) -> Result<()> {
    let options = PingOptions {
        count,
        timeout: Duration::from_secs(timeout),
        ..PingOptions::default()
    };

    let summary = ping(url, &options)
        .await
        .with_context(|| format!("Failed to reach target {url}"))?;

    for attempt in &summary.attempts {
        let label = if attempt.is_live() { "LIVE" } else { "DOWN" };
        println!(
            "[{label}] {} -> HTTP {} in {}ms ({}/{})",
            summary.url,
            attempt.status,
            attempt.latency.as_millis(),
            attempt.seq,
            summary.count()
        );
    }
    println!(
        "Got {} of {} pings successful, average duration of {}ms",
        summary.successful(),
        summary.count(),
        summary.average_latency().as_millis()
    );

    Ok(())
}

/// Mint a bearer token with the configured secret
fn mint_token(user_id: &str, email: Option<&str>, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let jwt = config.auth.jwt_config().context(
        "No JWT secret configured; set auth.jwt_secret or VIGIL_JWT_SECRET",
    )?;

    let token = generate_token(user_id, email, &jwt).context("Failed to generate token")?;
    tracing::debug!(user_id = %user_id, expiry_secs = jwt.expiry.as_secs(), "Token issued");
    println!("{token}");

    Ok(())
}

/// Generate a default configuration file
fn init_config(output: &str) -> Result<()> {
    let config = Config::default_config();
    let yaml = config.to_yaml().context("Failed to serialize config")?;

    std::fs::write(output, &yaml).with_context(|| format!("Failed to write config to {output}"))?;

    tracing::info!(path = %output, "Configuration file created");
    println!("Created {output}");
    println!();
    println!("Change auth.jwt_secret, then run:");
    println!("  vigil serve --config {output}");

    Ok(())
}

/// Validate a configuration file
fn validate_config(config_path: &str) -> Result<()> {
    tracing::info!(config = %config_path, "Validating configuration");

    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    println!("Configuration is valid!");
    println!();
    println!(
        "Server: {}:{} ({})",
        config.server.host, config.server.port, config.server.environment
    );
    println!(
        "Auth: {}",
        if config.auth.jwt_config().is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "Dispatch: timeout {:?}, max concurrency {}",
        config.dispatch.default_timeout,
        config
            .dispatch
            .max_concurrency
            .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
    );
    println!("History limit: {}", config.storage.history_limit);

    Ok(())
}
