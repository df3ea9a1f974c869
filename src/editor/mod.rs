// Gateway module for local editing of the challenge - follows the Train Station Pattern
// The remote home directory is mounted with sshfs and opened in a local editor

mod install;
mod launch;
mod mount;
mod zed;

pub use install::{
    homebrew_install, install_packages, locate, uv_tool_install, wax_install, zerobrew_install,
    PackageManager, Packages,
};
pub use launch::{edit, find_editor, PackageKind, SupportedEditor, SUPPORTED_EDITORS};
pub use mount::{mount, unmount_commands};
pub use zed::{zed, zed_url, ZedSettings};
