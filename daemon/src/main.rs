//! Star registry daemon: entry point for running a registry node.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use starreg_crypto::Ed25519Verifier;
use starreg_node::{
    init_logging, open_environment, LogFormat, NodeConfig, NodeMetrics, StarRegistry,
};
use starreg_rpc::RpcServer;
use starreg_store_lmdb::{check_data_dir, check_integrity};
use starreg_types::SystemClock;

#[derive(Parser)]
#[command(name = "starreg-daemon", about = "Star registry node daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "STARREG_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB environment.
    #[arg(long, env = "STARREG_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Interface the HTTP server binds to.
    #[arg(long, env = "STARREG_RPC_HOST")]
    rpc_host: Option<String>,

    #[arg(long, env = "STARREG_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Answer cross-origin requests from any origin.
    #[arg(long, env = "STARREG_RPC_CORS")]
    rpc_cors: bool,

    /// How long a challenge stays open, in milliseconds.
    #[arg(long, env = "STARREG_VALIDATION_WINDOW_MS")]
    validation_window_ms: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "STARREG_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "STARREG_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Serve the HTTP API until SIGINT/SIGTERM.
    Run,
    /// Scan the stored chain and print the integrity report as JSON.
    ValidateChain,
    /// Print the effective configuration as TOML.
    PrintConfig,
}

impl Cli {
    /// File settings (or defaults), overridden by flags and env vars.
    fn resolve_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_toml_file(&path.to_string_lossy())?,
            None => NodeConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(host) = &self.rpc_host {
            config.rpc_host = host.clone();
        }
        if let Some(port) = self.rpc_port {
            config.rpc_port = port;
        }
        config.rpc_cors |= self.rpc_cors;
        if let Some(window) = self.validation_window_ms {
            config.validation_window_ms = window;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.parse::<LogFormat>()?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn open_registry(config: &NodeConfig) -> anyhow::Result<StarRegistry> {
    check_data_dir(&config.data_dir).map_err(anyhow::Error::msg)?;
    let env = open_environment(config)?;

    let report = check_integrity(&env)?;
    if !report.is_healthy() {
        for error in &report.errors {
            tracing::warn!(error = %error, "store integrity problem");
        }
    }
    tracing::info!(
        path = %env.path().display(),
        entries = report.total_entries,
        has_chain = report.has_chain,
        has_queue = report.has_queue,
        "store opened"
    );

    let registry = StarRegistry::open(
        Arc::new(env.kv_store()),
        Arc::new(SystemClock),
        Arc::new(Ed25519Verifier),
        config,
        Arc::new(NodeMetrics::new()?),
    )?;
    Ok(registry)
}

/// Resolves on the first SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let registry = Arc::new(open_registry(&config)?);

    let addr = config.rpc_bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        window_ms = config.validation_window_ms,
        policy = ?config.expiry_policy,
        "starting star registry"
    );

    RpcServer::new(registry, config.rpc_cors)
        .serve(listener, shutdown_signal())
        .await?;

    tracing::info!("star registry exited cleanly");
    Ok(())
}

fn validate_chain(config: &NodeConfig) -> anyhow::Result<bool> {
    let registry = open_registry(config)?;
    let report = registry.validate_chain()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.is_valid())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    match cli.command {
        Command::PrintConfig => {
            print!("{}", config.to_toml_string()?);
        }
        Command::ValidateChain => {
            init_logging(config.log_format, &config.log_level)?;
            if !validate_chain(&config)? {
                std::process::exit(1);
            }
        }
        Command::Run => {
            init_logging(config.log_format, &config.log_level)?;
            run(config).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("starreg-daemon").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "--rpc-port",
            "9000",
            "--validation-window-ms",
            "1000",
            "--log-format",
            "json",
            "print-config",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.rpc_port, 9000);
        assert_eq!(config.validation_window_ms, 1000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.rpc_host, "127.0.0.1");
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("starreg.toml");
        std::fs::write(&path, "rpc_port = 7000\nprotocol_tag = \"custom\"\n").unwrap();
        let cli = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--rpc-host",
            "0.0.0.0",
            "run",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.rpc_port, 7000);
        assert_eq!(config.rpc_host, "0.0.0.0");
        assert_eq!(config.protocol_tag, "custom");
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = parse(&["--validation-window-ms", "0", "run"]);
        assert!(cli.resolve_config().is_err());
        let cli = parse(&["--log-format", "xml", "run"]);
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn validate_chain_on_fresh_store_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            data_dir: dir.path().join("data"),
            map_size_mb: 16,
            ..NodeConfig::default()
        };
        assert!(validate_chain(&config).unwrap());
    }
}
