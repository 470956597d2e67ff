//! winddown-sim entry point: config loading, logging, and server wiring.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use winddown_sim::api::{self, AppState};
use winddown_sim::cli::Cli;
use winddown_sim::config::ServiceConfig;
use winddown_sim::io::export::export_csv;
use winddown_sim::profile::CapacityFactorSeries;
use winddown_sim::sim::simulator::EnergyBalanceSimulator;
use winddown_sim::telemetry::PrometheusSource;

fn init_tracing(cfg: &ServiceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_series(cfg: &ServiceConfig) -> CapacityFactorSeries {
    match CapacityFactorSeries::load(&cfg.profile.power_factors_path) {
        Ok(series) => series,
        Err(e) => {
            error!(error = %e, "capacity factors unavailable; generating at the fallback factor");
            CapacityFactorSeries::empty()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = cli.load_config()?;
    init_tracing(&cfg);

    let errors = cfg.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("{e}");
        }
        bail!("{} configuration error(s)", errors.len());
    }

    let series = Arc::new(load_series(&cfg));
    let telemetry = PrometheusSource::new(
        cfg.telemetry.prometheus_url.clone(),
        cfg.telemetry.query.clone(),
        cfg.telemetry.workload_label.clone(),
        cfg.poll_timeout(),
    )
    .context("building Prometheus client")?;

    let simulator = Arc::new(EnergyBalanceSimulator::new(
        Arc::new(telemetry),
        series,
        cfg.wind_down_policy(),
        cfg.simulator_options(),
    ));
    let state = Arc::new(AppState {
        simulator: Arc::clone(&simulator),
        default_tick_interval: cfg.default_tick_interval(),
    });

    let addr: SocketAddr = cfg
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address \"{}\"", cfg.server.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    info!(
        %addr,
        prometheus = %cfg.telemetry.prometheus_url,
        "API server listening"
    );

    api::serve(state, listener, shutdown_signal())
        .await
        .context("server error")?;

    let phase = simulator.stop().await;
    info!(%phase, "simulator stopped");

    if let Some(path) = &cli.telemetry_out {
        let records = simulator.history(None, None);
        export_csv(&records, path)
            .with_context(|| format!("failed to write CSV to {}", path.display()))?;
        info!(path = %path.display(), ticks = records.len(), "tick history written");
    }

    Ok(())
}
