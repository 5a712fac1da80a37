use clap::{Args, ValueEnum};
use comfy_table::presets::NOTHING;
use comfy_table::{Cell, Table};

use super::VolumeRecord;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Only print volume names
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn execute(args: LsArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let volumes = global.state_store().read()?;

    if args.quiet {
        for name in volumes.keys() {
            println!("{}", name);
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Json => {
            let records: Vec<_> = volumes
                .iter()
                .map(|(name, volume)| VolumeRecord { name, volume })
                .collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(NOTHING);
            table.set_header(vec!["NAME", "BACKEND", "MOUNTPOINT", "CREATED"]);

            for (name, volume) in &volumes {
                let created = volume
                    .created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                table.add_row(vec![
                    Cell::new(name),
                    Cell::new(&volume.backend),
                    Cell::new(volume.mountpoint.display()),
                    Cell::new(created),
                ]);
            }

            println!("{table}");
        }
    }

    Ok(())
}
