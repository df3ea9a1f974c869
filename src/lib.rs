pub mod api;
pub mod app;
pub mod challenge;
pub mod cli;
pub mod constants;
pub mod editor;
pub mod flag;
pub mod remote;
pub mod sensai;
pub mod tui;
pub mod user;
pub mod utils;

pub use api::{DojoApi, DojoClient};
pub use app::{load_config, Config};
pub use utils::DojoError;
