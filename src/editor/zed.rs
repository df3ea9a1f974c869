use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::install::{ensure_supported_os, install_packages, locate, uv_tool_install, Packages, PackageManager};
use super::mount::mount;
use crate::api::{in_dojo, DojoApi};
use crate::app::{expand_home, Config, SshSettings};
use crate::remote::{Remote, SshTarget};
use crate::utils::{info, DojoError};

const ZED_SETTINGS_PATH: &str = "~/.config/zed/settings.json";
const LOCAL_BIN_DIR: &str = "~/.local/bin";
const PYTHON_LANGUAGE_SERVERS: &[&str] = &["ruff", "ty"];

/// Zed's settings file: JSON plus whole-line `//` comments, kept on save
#[derive(Debug, Clone, PartialEq)]
pub struct ZedSettings {
    pub settings: Value,
    pub comments: Vec<String>,
}

impl ZedSettings {
    pub fn parse(text: &str) -> Result<Self> {
        let (comments, body): (Vec<&str>, Vec<&str>) =
            text.lines().partition(|line| line.trim_start().starts_with("//"));
        let body = body.join("\n");

        let settings = if body.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(&body).context("Could not decode Zed settings")?
        };
        Ok(Self {
            settings,
            comments: comments.into_iter().map(str::to_string).collect(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::parse(""),
            Err(e) => Err(e.into()),
        }
    }

    pub fn render(&self) -> Result<String> {
        let mut text: String = self.comments.iter().map(|line| format!("{}\n", line)).collect();
        text.push_str(&serde_json::to_string_pretty(&self.settings)?);
        text.push('\n');
        Ok(text)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render()?)?;
        Ok(())
    }

    fn root(&mut self) -> &mut Map<String, Value> {
        if !self.settings.is_object() {
            self.settings = Value::Object(Map::new());
        }
        match &mut self.settings {
            Value::Object(map) => map,
            _ => unreachable!("settings root was just made an object"),
        }
    }

    /// Add language servers to `languages.Python.language_servers`; true when changed
    pub fn add_python_language_servers(&mut self, servers: &[&str]) -> bool {
        let languages = object_entry(self.root(), "languages");
        let python = object_entry(languages, "Python");
        let list = python
            .entry("language_servers")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !list.is_array() {
            *list = Value::Array(Vec::new());
        }

        let Value::Array(list) = list else {
            return false;
        };
        let mut changed = false;
        for server in servers {
            if !list.iter().any(|existing| existing.as_str() == Some(*server)) {
                list.push(Value::String(server.to_string()));
                changed = true;
            }
        }
        changed
    }

    /// Register the challenge host under `ssh_connections`; true when changed
    pub fn add_ssh_connection(&mut self, ssh: &SshSettings, identity_file: &Path) -> bool {
        let connections = self
            .root()
            .entry("ssh_connections")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !connections.is_array() {
            *connections = Value::Array(Vec::new());
        }
        let Value::Array(connections) = connections else {
            return false;
        };

        let known = connections.iter().any(|connection| {
            connection.get("nickname").and_then(Value::as_str) == Some(ssh.host.as_str())
                || connection.get("host").and_then(Value::as_str) == Some(ssh.host_name.as_str())
        });
        if known {
            return false;
        }

        connections.push(json!({
            "host": ssh.host_name,
            "port": ssh.port,
            "username": ssh.user,
            "args": [
                "-i", identity_file.display().to_string(),
                "-o", format!("ServerAliveCountMax={}", ssh.server_alive_count_max),
                "-o", format!("ServerAliveInterval={}", ssh.server_alive_interval),
            ],
            "projects": [{ "paths": [ssh.project_path] }],
            "nickname": ssh.host,
            "upload_binary_over_ssh": true,
        }));
        true
    }
}

fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry {
        Value::Object(inner) => inner,
        _ => unreachable!("entry was just made an object"),
    }
}

/// The `ssh://` URL Zed opens for a target
pub fn zed_url(target: &SshTarget, ssh: &SshSettings) -> String {
    match target {
        SshTarget::ConfigHost { host, .. } => format!("ssh://{}{}", host, ssh.project_path),
        SshTarget::Identity {
            user,
            host_name,
            port,
            ..
        } => format!("ssh://{}@{}:{}{}", user, host_name, port, ssh.project_path),
    }
}

async fn install_zed(config: &Config, language_servers: bool) -> Result<()> {
    ensure_supported_os()?;
    info("Installing Zed...");
    install_packages(config, &Packages::casks(&["zed"])).await?;

    if language_servers {
        info("Installing Python language servers...");
        match PackageManager::configured(config)? {
            PackageManager::Uv => {
                let tools: Vec<String> = PYTHON_LANGUAGE_SERVERS.iter().map(|s| s.to_string()).collect();
                uv_tool_install(&tools).await?;
            }
            _ => install_packages(config, &Packages::formulae(PYTHON_LANGUAGE_SERVERS)).await?,
        }
    }
    Ok(())
}

fn settings_path() -> PathBuf {
    expand_home(ZED_SETTINGS_PATH)
}

/// Open the running challenge in Zed over ssh
pub async fn zed(config: &Config, api: &dyn DojoApi, install: bool, language_servers: bool, use_mount: bool) -> Result<()> {
    if in_dojo() {
        return Err(DojoError::RunLocally.into());
    }
    Remote::new(config, api).require_challenge().await?;

    if install {
        install_zed(config, language_servers).await?;
    }
    if use_mount {
        mount(config, api, None).await?;
    }

    let path = settings_path();
    if language_servers {
        let mut settings = ZedSettings::load(&path)?;
        if settings.add_python_language_servers(PYTHON_LANGUAGE_SERVERS) {
            settings.save(&path)?;
            info(format!("Enabled {} in {}.", PYTHON_LANGUAGE_SERVERS.join(" and "), path.display()));
        }
    }

    let ssh = &config.ssh;
    let target = SshTarget::from_config(ssh)?;
    if let SshTarget::Identity { identity_file, .. } = &target {
        let mut settings = ZedSettings::load(&path)?;
        if settings.add_ssh_connection(ssh, identity_file) {
            settings.save(&path)?;
            tracing::info!("Added {} to Zed ssh_connections", ssh.host);
        }
    }

    let zed = locate("zed", &[LOCAL_BIN_DIR])
        .context("Please upgrade zed to the latest version and ensure its parent directory is in PATH.")?;
    let url = zed_url(&target, ssh);
    tracing::debug!("Opening {}", url);
    let status = Command::new(zed)
        .arg(&url)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .context("Failed to launch Zed")?;
    if !status.success() {
        anyhow::bail!("zed exited with {}", status);
    }
    Ok(())
}
