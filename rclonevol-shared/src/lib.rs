//! rclonevol shared - types used by the plugin daemon and its tooling
//!
//! This crate contains the error type, protocol wire types and stable
//! constants shared by the core library (rclonevol) and the CLI.

pub mod constants;
pub mod errors;
pub mod protocol;

pub use errors::{VolumeError, VolumeResult};
