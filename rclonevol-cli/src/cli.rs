use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rclonevol::PluginOptions;
use rclonevol::runtime::layout::FilesystemLayout;
use rclonevol::volumes::StateStore;
use rclonevol_shared::constants::envs;

use crate::commands::{inspect, ls, serve};

#[derive(Parser, Debug)]
#[command(name = "rclonevol", version, about = "Docker volume plugin backed by rclone mounts")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the plugin daemon
    Serve(serve::ServeArgs),

    /// List persisted volumes
    #[command(visible_alias = "list")]
    Ls(ls::LsArgs),

    /// Show persisted records of one or more volumes
    Inspect(inspect::InspectArgs),
}

#[derive(Args, Debug)]
pub struct GlobalFlags {
    /// Plugin root directory (holds volumes/ and state/)
    #[arg(long, global = true, env = envs::ROOT)]
    pub root: Option<PathBuf>,

    /// Write logs to a daily-rotated file in this directory instead of stderr
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

impl GlobalFlags {
    /// Defaults, with the root taken from `--root` when given.
    pub fn plugin_options(&self) -> PluginOptions {
        let mut options = PluginOptions::default();
        if let Some(root) = &self.root {
            options.root_dir = root.clone();
        }
        options
    }

    /// State file of the selected root, for offline reads.
    pub fn state_store(&self) -> StateStore {
        let layout = FilesystemLayout::new(self.plugin_options().root_dir);
        StateStore::new(layout.state_file())
    }
}
