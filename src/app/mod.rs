// Gateway module for app - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod config;

// Public re-exports - the ONLY way to access app functionality
pub use config::{
    config_path, expand_home, load_config, load_config_from, render_config, Config, LogStyles,
    PackageManagers, SshSettings, TableSettings,
};
