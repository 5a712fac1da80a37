pub mod inspect;
pub mod ls;
pub mod serve;

use rclonevol::Volume;
use serde::Serialize;

/// A persisted volume with its name, as printed by `ls` and `inspect`.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeRecord<'a> {
    pub name: &'a str,
    #[serde(flatten)]
    pub volume: &'a Volume,
}
