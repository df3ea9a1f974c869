use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::target::contains_host;
use crate::api::{in_dojo, DojoApi};
use crate::app::{expand_home, Config, SshSettings};
use crate::utils::{confirm, info, paint, success, warn, DojoError};

const KEY_COMMENT: &str = "dojo-cli";

/// Generate an SSH key pair, register it in the ssh config and with the account
pub async fn keygen(config: &Config, api: &dyn DojoApi) -> Result<()> {
    if in_dojo() {
        return Err(DojoError::RunLocally.into());
    }

    let ssh = &config.ssh;
    let identity_file = expand_home(&ssh.identity_file);
    let public_file = public_key_path(&identity_file);

    if identity_file.is_file() {
        warn(format!(
            "Identity file already exists at {}, override?",
            identity_file.display()
        ));
        if !confirm()? {
            warn("Aborting SSH key generation!");
            return Ok(());
        }
        // ssh-keygen would otherwise stop and ask again
        std::fs::remove_file(&identity_file)?;
        if public_file.is_file() {
            std::fs::remove_file(&public_file)?;
        }
    }

    generate_key(&ssh.algorithm, &identity_file).await?;
    success(format!(
        "Saved SSH private key to {}.",
        paint("bold", identity_file.display().to_string())
    ));
    success(format!(
        "Saved SSH public key to {}.",
        paint("bold", public_file.display().to_string())
    ));

    let config_file = expand_home(&ssh.config_file);
    if append_host_entry(&config_file, ssh, &identity_file)? {
        info(format!(
            "Updated SSH configuration at {}.",
            paint("bold", config_file.display().to_string())
        ));
    }

    let public_key = std::fs::read_to_string(&public_file)
        .with_context(|| format!("Failed to read {}", public_file.display()))?;
    let public_key = public_key.trim();

    if config.cookie_file().is_file() {
        let result = api.add_ssh_key(public_key).await?;
        if result.success {
            success("Successfully added public key to user settings.");
            success("You can now connect to the remote server after starting a challenge.");
        } else {
            anyhow::bail!(
                "Something went wrong: {}",
                result.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    } else {
        let settings_url = format!("{}/settings#ssh-key", config.base_url);
        info(format!("Public key: {}", paint("bold cyan", public_key)));
        info("Not logged in, could not automatically add the public key to your user settings.");
        info(format!(
            "Use a browser to log into {} and navigate to {}.",
            paint("bold underline", &config.base_url),
            paint("bold underline", &settings_url)
        ));
        info(format!(
            "Enter the above key into the {} field, and then click {}.",
            paint("bold cyan", "Add New SSH Key"),
            paint("bold cyan", "Add")
        ));
    }

    Ok(())
}

fn public_key_path(identity_file: &Path) -> PathBuf {
    let mut name = identity_file.as_os_str().to_os_string();
    name.push(".pub");
    PathBuf::from(name)
}

async fn generate_key(algorithm: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    tracing::info!("Generating new SSH key at {:?}", path);
    let key_path = path.to_string_lossy().to_string();
    let status = tokio::process::Command::new("ssh-keygen")
        .args([
            "-t",
            algorithm,
            "-f",
            key_path.as_str(),
            "-N",
            "",
            "-C",
            KEY_COMMENT,
        ])
        .status()
        .await
        .context("Failed to run ssh-keygen")?;

    if !status.success() {
        anyhow::bail!("ssh-keygen failed");
    }
    Ok(())
}

/// The `Host` block written to the ssh config
pub fn host_entry(ssh: &SshSettings, identity_file: &Path) -> String {
    format!(
        "Host {}\n  HostName {}\n  Port {}\n  User {}\n  IdentityFile {}\n  ServerAliveCountMax {}\n  ServerAliveInterval {}\n",
        ssh.host,
        ssh.host_name,
        ssh.port,
        ssh.user,
        identity_file.display(),
        ssh.server_alive_count_max,
        ssh.server_alive_interval
    )
}

/// Append our `Host` block unless one exists; true when the file changed
pub fn append_host_entry(config_file: &Path, ssh: &SshSettings, identity_file: &Path) -> Result<bool> {
    let mut contents = match std::fs::read_to_string(config_file) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    if contains_host(&contents, &ssh.host) {
        return Ok(false);
    }

    if !contents.is_empty() {
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents.push('\n');
    }
    contents.push_str(&host_entry(ssh, identity_file));

    if let Some(parent) = config_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_file, contents)?;
    Ok(true)
}
