pub mod layout;
pub mod lock;
pub mod options;

mod core;
pub use core::PluginRuntime;
