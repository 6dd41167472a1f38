//! ktop - terminal dashboard for Kubernetes cluster resource usage
//!
//! Runs the interactive dashboard by default, or prints a single
//! snapshot as JSON with `--show`.

mod api;
mod config;
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use ktop_lib::{
    collector::PollingLoopBuilder,
    export::{self, ExportKind},
    health::{Component, HealthRegistry},
    source::{ConnectOptions, KubeSource},
    Collector,
};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Overrides, Settings};

const KTOP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Terminal dashboard for Kubernetes cluster resource usage
#[derive(Parser, Debug)]
#[command(name = "ktop")]
#[command(version, about = "Terminal dashboard for Kubernetes cluster resource usage", long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file (default: KUBECONFIG or ~/.kube/config)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use (default: current context)
    #[arg(long)]
    pub context: Option<String>,

    /// Time between collection cycles, e.g. 2s or 500ms
    #[arg(long, value_parser = humantime::parse_duration)]
    pub refresh_interval: Option<Duration>,

    /// Deadline for the API reads of one cycle, e.g. 10s
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Number of pods to show
    #[arg(long)]
    pub top_pods: Option<i64>,

    /// Include system namespaces
    #[arg(long, short = 'A')]
    pub all_namespaces: bool,

    /// Print one snapshot as JSON and exit
    #[arg(long, value_name = "resources|pods|nodes")]
    pub show: Option<ExportKind>,

    /// Initial node sort field (name, cpu, memory, status, pods)
    #[arg(long)]
    pub sort_nodes: Option<String>,

    /// Initial pod sort field (namespace, name, cpu, memory, status)
    #[arg(long)]
    pub sort_pods: Option<String>,

    /// Serve /metrics and /healthz on this port
    #[arg(long)]
    pub metrics_port: Option<u16>,

    /// Write JSON logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Config file (default: ~/.config/ktop/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            kubeconfig: self.kubeconfig.clone(),
            context: self.context.clone(),
            refresh_interval: self.refresh_interval,
            timeout: self.timeout,
            top_pods: self.top_pods,
            all_namespaces: self.all_namespaces,
            sort_nodes: self.sort_nodes.clone(),
            sort_pods: self.sort_pods.clone(),
            metrics_port: self.metrics_port,
            log_file: self.log_file.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref(), &cli.overrides())?;

    init_logging(settings.log_file.as_deref(), cli.show.is_some())?;
    info!(version = KTOP_VERSION, "Starting ktop");

    let options = ConnectOptions {
        kubeconfig: settings.kubeconfig.clone(),
        context: settings.context.clone(),
        timeout: settings.timeout,
    };
    let source = match KubeSource::connect(&options).await {
        Ok(source) => source,
        Err(e) => {
            print_connect_hints();
            return Err(e.context("Failed to connect to cluster"));
        }
    };

    if let Err(e) = source.check_usage_api().await {
        warn!(error = %e, "Metrics API not available");
        print_usage_api_hints(&e);
    }

    let health_registry = HealthRegistry::new();
    health_registry.register(Component::ClusterApi).await;
    health_registry.register(Component::MetricsApi).await;

    let cluster = source.identity().clone();
    let collector =
        Arc::new(Collector::new(Arc::new(source), cluster).with_health(health_registry.clone()));

    if let Some(port) = settings.metrics_port {
        let state = Arc::new(api::AppState::new(health_registry.clone()));
        tokio::spawn(async move {
            if let Err(e) = api::serve(port, state).await {
                warn!(error = %e, port, "Metrics server stopped");
            }
        });
    }

    match cli.show {
        Some(kind) => run_export(&collector, kind, settings.timeout).await,
        None => run_dashboard(collector, &settings).await,
    }
}

/// JSON logs to `log_file`; without one, export mode logs warnings to
/// stderr and the dashboard discards logs since stderr is its terminal
fn init_logging(log_file: Option<&Path>, export: bool) -> Result<()> {
    let registry = tracing_subscriber::registry().with(log_filter(log_file, export));

    match (log_file, export) {
        (Some(path), _) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(fmt::layer().json().with_writer(Mutex::new(file)))
                .init();
        }
        (None, true) => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        (None, false) => registry
            .with(fmt::layer().json().with_writer(io::sink))
            .init(),
    }

    Ok(())
}

fn log_filter(log_file: Option<&Path>, export: bool) -> EnvFilter {
    match (log_file, export) {
        (None, false) => EnvFilter::new("off"),
        (Some(_), _) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        (None, true) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    }
}

/// One collection, printed to stdout; nothing else is written there
async fn run_export(collector: &Collector, kind: ExportKind, timeout: Duration) -> Result<()> {
    let snapshot = collector
        .collect(timeout)
        .await
        .context("Failed to collect cluster state")?;

    if let Some(warning) = &snapshot.error {
        eprintln!("Warning: {warning}");
    }

    let document = export::render(&snapshot, kind).context("Failed to encode JSON")?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(document.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

async fn run_dashboard(collector: Arc<Collector>, settings: &Settings) -> Result<()> {
    let (polling_loop, refresh) = PollingLoopBuilder::new()
        .collector(collector.clone())
        .interval(settings.refresh_interval)
        .timeout(settings.timeout)
        .build()?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let poller = tokio::spawn(polling_loop.run(shutdown_rx));

    collector
        .logger()
        .log_startup(KTOP_VERSION, settings.refresh_interval, settings.timeout);

    let app = tui::App::new(collector.reader(), refresh, settings);
    let ui_result = tokio::task::spawn_blocking(move || app.run()).await;

    let _ = shutdown_tx.send(());
    let stats = poller.await.context("Polling loop panicked")?;
    info!(
        succeeded = stats.succeeded,
        failed = stats.failed,
        "Polling loop stopped"
    );
    collector.logger().log_shutdown("user quit");

    ui_result
        .context("Dashboard thread panicked")?
        .context("Terminal error")
}

fn print_connect_hints() {
    eprintln!("Make sure:");
    eprintln!("  - Your kubeconfig is valid (default: ~/.kube/config)");
    eprintln!("  - The cluster is accessible");
    eprintln!("  - You have permission to list nodes and pods");
}

fn print_usage_api_hints(err: &anyhow::Error) {
    eprintln!("Warning: Metrics API not available: {err:#}");
    eprintln!("Please ensure metrics-server is installed in your cluster.");
    eprintln!();
    eprintln!("To install metrics-server:");
    eprintln!("  kubectl apply -f https://github.com/kubernetes-sigs/metrics-server/releases/latest/download/components.yaml");
    eprintln!();
    eprintln!("For MicroK8s:");
    eprintln!("  microk8s enable metrics-server");
    eprintln!();
    eprintln!("Continuing without usage data...");
}
