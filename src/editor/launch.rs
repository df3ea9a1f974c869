use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::install::{install_packages, locate, Packages};
use super::mount::mount;
use crate::api::DojoApi;
use crate::app::Config;
use crate::utils::{info, input};

/// How an editor is packaged for Homebrew-style managers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Formula,
    Cask,
}

/// An editor the client knows how to install and launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedEditor {
    pub name: &'static str,
    pub cli: &'static str,
    pub package: &'static str,
    pub kind: PackageKind,
}

impl SupportedEditor {
    const fn new(name: &'static str, cli: &'static str, package: &'static str, kind: PackageKind) -> Self {
        Self {
            name,
            cli,
            package,
            kind,
        }
    }

    fn packages(&self) -> Packages {
        match self.kind {
            PackageKind::Formula => Packages::formulae(&[self.package]),
            PackageKind::Cask => Packages::casks(&[self.package]),
        }
    }
}

pub const SUPPORTED_EDITORS: &[SupportedEditor] = &[
    SupportedEditor::new("Cursor", "cursor", "cursor", PackageKind::Cask),
    SupportedEditor::new("Google Antigravity", "agy", "antigravity", PackageKind::Cask),
    SupportedEditor::new("Emacs", "emacs", "emacs", PackageKind::Formula),
    SupportedEditor::new("Helix", "hx", "helix", PackageKind::Formula),
    SupportedEditor::new("Nano", "nano", "nano", PackageKind::Formula),
    SupportedEditor::new("Neovim", "nvim", "neovim", PackageKind::Formula),
    SupportedEditor::new("Sublime Text", "subl", "sublime-text", PackageKind::Cask),
    SupportedEditor::new("Vim", "vim", "vim", PackageKind::Formula),
    SupportedEditor::new("Visual Studio Code", "code", "visual-studio-code", PackageKind::Cask),
    SupportedEditor::new("Zed", "zed", "zed", PackageKind::Cask),
];

/// Look an editor up by display name or command
pub fn find_editor(name: &str) -> Option<&'static SupportedEditor> {
    SUPPORTED_EDITORS
        .iter()
        .find(|editor| editor.name.eq_ignore_ascii_case(name) || editor.cli == name)
}

async fn install_editor(config: &Config, editor: &SupportedEditor) -> Result<()> {
    if locate(editor.cli, &[]).is_some() {
        info(format!("{} is already installed.", editor.package));
        return Ok(());
    }
    info(format!("Installing {}...", editor.name));
    install_packages(config, &editor.packages()).await
}

async fn run_editor(cli: &str, mount_point: &Path) -> Result<()> {
    let program = locate(cli, &[]).with_context(|| format!("Editor {} not found.", cli))?;
    let status = Command::new(&program)
        .arg(mount_point)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .with_context(|| format!("Failed to launch {}", program.display()))?;
    if !status.success() {
        tracing::debug!("{} exited with {}", cli, status);
    }
    Ok(())
}

/// Mount the challenge and open it in an editor
pub async fn edit(config: &Config, api: &dyn DojoApi, editor: Option<&str>, mount_point: Option<&Path>) -> Result<()> {
    let name = editor.unwrap_or(&config.code_editor);
    let mount_point = mount(config, api, mount_point).await?;

    let supported = find_editor(name);
    if let Some(editor) = supported {
        install_editor(config, editor).await?;
    }

    if std::env::consts::OS == "macos" {
        info("You may need to enable Full Disk Access so that the editor can access the mounted volume.");
        info("Navigate to System Settings > Privacy & Security > Full Disk Access.");
        info(format!("Then turn on Full Disk Access permissions for {}.", name));
        input("Press Enter to continue once you are done:")?;
    }

    let cli = supported.map(|editor| editor.cli).unwrap_or(name);
    run_editor(cli, &mount_point).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_find_editor() {
        assert_eq!(find_editor("Visual Studio Code").unwrap().cli, "code");
        assert_eq!(find_editor("neovim").unwrap().package, "neovim");
        assert_eq!(find_editor("hx").unwrap().name, "Helix");
        assert!(find_editor("notepad").is_none());
    }

    #[test]
    fn test_editor_packages() {
        let cask = find_editor("Cursor").unwrap().packages();
        assert_eq!(cask.casks, vec!["cursor"]);
        assert!(cask.formulae.is_empty());

        let formula = find_editor("Vim").unwrap().packages();
        assert_eq!(formula.formulae, vec!["vim"]);
    }

    #[test]
    fn test_default_editor_is_supported() {
        assert!(find_editor(&Config::default().code_editor).is_some());
    }
}
