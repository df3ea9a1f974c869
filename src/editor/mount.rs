use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::install::{ensure_supported_os, homebrew_install, install_packages, locate, Packages, PackageManager};
use crate::api::{in_dojo, DojoApi};
use crate::app::{expand_home, Config};
use crate::remote::{Remote, SshTarget};
use crate::utils::{info, paint, warn, DojoError};

const FUSE_T_TAP: &str = "macos-fuse-t/cask";

/// Commands that undo a mount on this platform, gentle one first
pub fn unmount_commands(os: &str, mount_point: &Path) -> Option<[String; 2]> {
    let point = mount_point.display();
    match os {
        "macos" => Some([
            format!("diskutil umount {}", point),
            format!("diskutil umount force {}", point),
        ]),
        "linux" => Some([format!("umount {}", point), format!("umount -f {}", point)]),
        "windows" => Some([format!("net use {} /d", point), format!("net use {} /d /y", point)]),
        _ => None,
    }
}

/// Install sshfs with the configured package manager
async fn install_sshfs(config: &Config) -> Result<()> {
    ensure_supported_os()?;
    let manager = PackageManager::configured(config)?;

    if std::env::consts::OS == "macos" {
        info("Installing fuse-t-sshfs...");
        let packages = Packages::casks(&["fuse-t-sshfs"]).with_tap(FUSE_T_TAP);
        if manager != PackageManager::Homebrew {
            warn("Only Homebrew can install the fuse-t-sshfs cask, falling back to Homebrew.");
        }
        return homebrew_install(&packages).await;
    }

    info("Installing sshfs...");
    install_packages(config, &Packages::formulae(&["sshfs"])).await
}

/// Mount the remote project directory onto a local directory with sshfs
pub async fn mount(config: &Config, api: &dyn DojoApi, mount_point: Option<&Path>) -> Result<PathBuf> {
    if in_dojo() {
        return Err(DojoError::RunLocally.into());
    }
    Remote::new(config, api).require_challenge().await?;

    let ssh = &config.ssh;
    let mount_point = match mount_point {
        Some(point) => expand_home(point),
        None => expand_home(&ssh.mount_point),
    };
    std::fs::create_dir_all(&mount_point)
        .with_context(|| format!("Failed to create mount point {}", mount_point.display()))?;

    let occupied = std::fs::read_dir(&mount_point)?.next().is_some();
    if occupied {
        info("Mount point is non-empty, assuming project path is already mounted.");
        return Ok(mount_point);
    }

    let sshfs = match locate("sshfs", &[]) {
        Some(sshfs) => sshfs,
        None => {
            install_sshfs(config).await?;
            locate("sshfs", &[]).context("sshfs was installed but is not on PATH")?
        }
    };

    let target = SshTarget::from_config(ssh)?;
    tracing::info!("Mounting {} onto {}", ssh.project_path, mount_point.display());
    let status = Command::new(&sshfs)
        .args(target.sshfs_args(&ssh.project_path, &mount_point))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .context("Failed to run sshfs")?;
    if !status.success() {
        anyhow::bail!("sshfs exited with {}", status);
    }

    if let Some([unmount, force]) = unmount_commands(std::env::consts::OS, &mount_point) {
        info(format!("To unmount, run: {}", paint("bold cyan", unmount)));
        info(format!("If that does not work, run: {}", paint("bold cyan", force)));
    }
    Ok(mount_point)
}
