use clap::Args;

use super::VolumeRecord;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Name of the volume(s) to inspect
    #[arg(required = true, num_args = 1..)]
    pub names: Vec<String>,
}

pub fn execute(args: InspectArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let volumes = global.state_store().read()?;

    let mut records = Vec::new();
    let mut missing = Vec::new();

    for name in &args.names {
        match volumes.get(name) {
            Some(volume) => records.push(VolumeRecord { name, volume }),
            None => {
                eprintln!("Error: No such volume: {}", name);
                missing.push(name.as_str());
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&records)?);

    if !missing.is_empty() {
        anyhow::bail!("No such volume(s): {}", missing.join(", "));
    }
    Ok(())
}
