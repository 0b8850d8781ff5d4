// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{net::SocketAddr, path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use xonotic_api::{
    cfg::{cli::Cli, config::{AppConfig, SharedConfig}, logger::init_logger},
    http::{build_router, AppState},
    mapcache::MapCache,
};

/// Parses arguments and loads the initial configuration. Any failure here
/// is fatal before the HTTP listener starts, per the exit-code-1 contract.
fn bootstrap() -> anyhow::Result<(Cli, AppConfig)> {
    let cli = Cli::try_parse().context("failed to parse command-line arguments")?;
    let config = AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    Ok((cli, config))
}

#[tokio::main]
async fn main() -> ExitCode {
    let _logger_guard = match init_logger("") {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logger: {err:#}");
            return ExitCode::FAILURE;
        },
    };

    let (cli, config) = match bootstrap() {
        Ok(pair) => pair,
        Err(err) => {
            error!(error = %err, "startup failed");
            return ExitCode::FAILURE;
        },
    };

    if let Err(err) = run(cli, config).await {
        error!(error = %err, "server exited with error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let config_path = cli.config.clone();
    let shared_config = Arc::new(SharedConfig::new(config));
    let maps = Arc::new(MapCache::new());

    let state = AppState {
        config: Arc::clone(&shared_config),
        maps,
        query_retries: cli.query_retries,
        query_timeout: Duration::from_millis(cli.query_timeout_ms),
    };

    let router = build_router(state);
    let addr = SocketAddr::new(cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let serve_task = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    watch_signals(config_path, shared_config, shutdown_tx).await;

    match tokio::time::timeout(cli.shutdown_timeout, serve_task).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(err))) => Err(err).context("http server error"),
        Ok(Err(join_err)) => Err(join_err).context("server task panicked"),
        Err(_) => {
            error!("graceful shutdown timed out, exiting anyway");
            Ok(())
        },
    }
}

/// Reloads configuration on SIGHUP, indefinitely, until one of
/// SIGINT/SIGTERM/SIGQUIT arrives, at which point it signals `shutdown_tx`
/// and returns. Mirrors the original implementation's single signal-dispatch
/// loop.
async fn watch_signals(
    config_path: PathBuf,
    config: Arc<SharedConfig>,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
) {
    let mut sighup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(err) => {
            error!(error = %err, "failed to install SIGHUP handler");
            return;
        },
    };
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(err) => {
            error!(error = %err, "failed to install SIGTERM handler");
            return;
        },
    };
    let mut sigquit = match signal(SignalKind::quit()) {
        Ok(s) => s,
        Err(err) => {
            error!(error = %err, "failed to install SIGQUIT handler");
            return;
        },
    };

    loop {
        tokio::select! {
            _ = sighup.recv() => {
                config.reload(&config_path);
            },
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down gracefully");
                break;
            },
            _ = sigquit.recv() => {
                info!("received SIGQUIT, shutting down gracefully");
                break;
            },
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT, shutting down gracefully");
                break;
            },
        }
    }

    let _ = shutdown_tx.send(());
}
