use std::path::PathBuf;

use clap::Args;
use rclonevol::{PluginRuntime, server};
use rclonevol_shared::constants::{plugin, provider};
use tokio::signal;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Unix socket Docker connects to
    #[arg(long, default_value = plugin::SOCKET_PATH)]
    pub socket: PathBuf,

    /// rclone executable
    #[arg(long, default_value = provider::BINARY)]
    pub rclone: PathBuf,

    /// rclone remote profile written before each mount
    #[arg(long, default_value = provider::PROFILE)]
    pub profile: String,
}

pub async fn execute(args: ServeArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let mut options = global.plugin_options();
    options.socket_path = args.socket;
    options.rclone_binary = args.rclone;
    options.profile = args.profile;

    let runtime = PluginRuntime::new(options)?;
    let registry = runtime.registry().clone();

    tracing::info!(
        root = %runtime.layout().root_dir().display(),
        volumes = registry.count()?,
        "rclonevol plugin starting"
    );

    let result = server::serve(
        registry.clone(),
        &runtime.options().socket_path,
        shutdown_signal(),
    )
    .await;

    // Mount processes die with the plugin; volumes reload unmounted
    tokio::task::spawn_blocking(move || registry.shutdown()).await??;

    tracing::info!("rclonevol plugin stopped");
    Ok(result?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down...");
}
