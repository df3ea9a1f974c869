/// CLI argument parsing and command handling - Gateway
mod args;
mod commands;

pub use args::{Cli, Commands, LargestFilesArgs, ModeArgs, TargetArgs};
pub use commands::{discord, exec_line, handle_command, show_config};
