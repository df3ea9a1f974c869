// Gateway module for utils - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod errors;
mod logger;
mod markdown;
mod output;
mod prompt;
mod style;

// Public re-exports - the ONLY way to access utils functionality
pub use errors::DojoError;
pub use logger::init_logger;
pub use markdown::{absolutize_links, parse_markdown, print_markdown, render_markdown};
pub use output::{
    belt_text, column_title, country_flag, error, fail, format_rank, format_rank_of, info,
    install_palette, show_table, success, title_case, warn, Status, TableData,
};
pub use prompt::{confirm, input, input_required, password};
pub use style::{paint, parse_color, parse_hex, TextStyle};
