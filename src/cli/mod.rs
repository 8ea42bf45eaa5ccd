//! Command-line interface

pub mod commands;
pub mod output;
pub mod types;

pub use output::handle_error;
pub use types::{ChatArgs, Cli, Commands, ServeArgs};
