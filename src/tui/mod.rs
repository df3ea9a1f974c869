// Gateway module for TUI - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod browser;
mod explorer;
mod terminal;
mod tree;

// Public re-exports - the ONLY way to access TUI functionality
pub use browser::{render_browser, tree, BrowserAction, StartPrompt, TreeBrowser};
pub use explorer::{explore_help, help_entries, render_explorer, HelpEntry, HelpExplorer};
pub use tree::{build_tree, lecture_description, load_tree, NodeKind, TreeFilter, TreeNode};
