use anyhow::{Context, Result};
use directories::BaseDirs;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::constants::{CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API prefix appended to `base_url` for JSON endpoints
    pub api: String,

    /// Root URL of the dojo website
    pub base_url: String,

    /// Belt name -> hex colour used when printing handles and belts
    #[serde(default)]
    pub belt_colors: BTreeMap<String, String>,

    /// Editor opened by `dojo edit` when none is given
    pub code_editor: String,

    /// Where the session cookie is cached after `dojo login`
    pub cookie_path: String,

    /// Character echoed for each password keystroke (empty disables echo)
    pub echo_char: String,

    #[serde(default)]
    pub log_styles: LogStyles,

    #[serde(default)]
    pub package_manager: PackageManagers,

    #[serde(default)]
    pub ssh: SshSettings,

    #[serde(default)]
    pub table: TableSettings,
}

impl Default for Config {
    fn default() -> Self {
        let belt_colors = [
            ("white", "#f0f0f0"),
            ("orange", "#ff7f32"),
            ("yellow", "#ffc627"),
            ("green", "#78be20"),
            ("blue", "#00a3e0"),
            ("purple", "#7b2f8e"),
            ("black", "#111111"),
        ]
        .into_iter()
        .map(|(belt, hex)| (belt.to_string(), hex.to_string()))
        .collect();

        Self {
            api: "/pwncollege_api/v1".to_string(),
            base_url: "https://pwn.college".to_string(),
            belt_colors,
            code_editor: "Visual Studio Code".to_string(),
            cookie_path: "~/.cache/dojo-cli/cookie.json".to_string(),
            echo_char: "*".to_string(),
            log_styles: LogStyles::default(),
            package_manager: PackageManagers::default(),
            ssh: SshSettings::default(),
            table: TableSettings::default(),
        }
    }
}

impl Config {
    /// Hex colour for a belt, falling back to white for unknown belts
    pub fn belt_hex(&self, belt: &str) -> &str {
        self.belt_colors
            .get(belt)
            .or_else(|| self.belt_colors.get("white"))
            .map(String::as_str)
            .unwrap_or("#f0f0f0")
    }

    /// Resolved location of the session cookie
    pub fn cookie_file(&self) -> PathBuf {
        expand_home(&self.cookie_path)
    }
}

/// Styles for the five status line kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogStyles {
    pub error: String,
    pub fail: String,
    pub info: String,
    pub success: String,
    pub warn: String,
}

impl Default for LogStyles {
    fn default() -> Self {
        Self {
            error: "on red".to_string(),
            fail: "bold red".to_string(),
            info: "bold blue".to_string(),
            success: "bold green".to_string(),
            warn: "bold yellow".to_string(),
        }
    }
}

/// Package manager used to install tools, per platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManagers {
    pub darwin: String,
    pub linux: String,
    pub windows: String,
}

impl Default for PackageManagers {
    fn default() -> Self {
        Self {
            darwin: "homebrew".to_string(),
            linux: "homebrew".to_string(),
            windows: "homebrew".to_string(),
        }
    }
}

impl PackageManagers {
    /// Package manager configured for the running platform
    pub fn current(&self) -> &str {
        match std::env::consts::OS {
            "macos" => &self.darwin,
            "windows" => &self.windows,
            _ => &self.linux,
        }
    }
}

/// SSH connection settings
///
/// The OpenSSH-style keys keep their `ssh_config` spelling so the same block
/// can be pasted between this file and `~/.ssh/config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshSettings {
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "HostName")]
    pub host_name: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "IdentityFile")]
    pub identity_file: String,
    #[serde(rename = "ServerAliveInterval")]
    pub server_alive_interval: u32,
    #[serde(rename = "ServerAliveCountMax")]
    pub server_alive_count_max: u32,
    /// Key type passed to `ssh-keygen -t`
    pub algorithm: String,
    /// OpenSSH client configuration file
    pub config_file: String,
    /// Remote working directory for uploads, mounts and editors
    pub project_path: String,
    /// Local directory the project path is mounted onto
    pub mount_point: String,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            host: "pwn.college".to_string(),
            host_name: "dojo.pwn.college".to_string(),
            port: 22,
            user: "hacker".to_string(),
            identity_file: "~/.ssh/id_ed25519".to_string(),
            server_alive_interval: 20,
            server_alive_count_max: 3,
            algorithm: "ed25519".to_string(),
            config_file: "~/.ssh/config".to_string(),
            project_path: "/home/hacker".to_string(),
            mount_point: "~/.local/share/dojo-cli/mount".to_string(),
        }
    }
}

/// Table rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSettings {
    /// Border style: rounded, ascii, modern, sharp, psql, markdown, blank, extended
    pub style: String,
    /// Style applied to header cells
    pub header_style: String,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            style: "rounded".to_string(),
            header_style: "bold green".to_string(),
        }
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Location of the user configuration file
///
/// `DOJO_CONFIG` overrides the default. Relative paths live under the home
/// directory and a directory means `<dir>/config`.
pub fn config_path() -> PathBuf {
    let raw = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    resolve_config_path(&raw, home_dir())
}

fn resolve_config_path(raw: &str, home: Option<PathBuf>) -> PathBuf {
    let mut path = expand_home(raw);
    if path.is_relative() {
        if let Some(home) = home {
            path = home.join(path);
        }
    }
    if path.is_dir() {
        path.push("config");
    }
    path
}

/// Load configuration from the defaults, the user file and the environment
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path())
}

/// Load configuration layered on top of an explicit file
pub fn load_config_from(path: &Path) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    // YAML is a superset of JSON so one provider reads both formats
    let has_content = std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false);
    if has_content {
        tracing::debug!("Loading config file {}", path.display());
        figment = figment.merge(Yaml::file(path));
    }

    figment = figment.merge(
        Env::prefixed("DOJO_")
            .filter(|key| {
                !key.as_str().eq_ignore_ascii_case("config")
                    && !key.as_str().eq_ignore_ascii_case("auth_token")
            })
            .map(|key| env_key(key.as_str()).into())
            .lowercase(false),
    );

    figment
        .extract()
        .with_context(|| format!("Error loading config file at `{}`", path.display()))
}

/// `ssh_config` spelled keys of [`SshSettings`]
const SSH_CONFIG_KEYS: [&str; 7] = [
    "Host",
    "HostName",
    "Port",
    "User",
    "IdentityFile",
    "ServerAliveInterval",
    "ServerAliveCountMax",
];

/// Turn `SSH__HOST_NAME` style variable names into config key paths
///
/// Segments are lowercased except OpenSSH keys under `ssh`, which take their
/// `ssh_config` spelling whether written as `HOSTNAME` or `HOST_NAME`.
fn env_key(raw: &str) -> String {
    let segments: Vec<String> = raw.split("__").map(str::to_ascii_lowercase).collect();
    match segments.as_slice() {
        [section, field] if section == "ssh" => {
            let squashed = field.replace('_', "");
            let field = SSH_CONFIG_KEYS
                .iter()
                .find(|key| key.eq_ignore_ascii_case(&squashed))
                .map_or_else(|| field.clone(), |key| key.to_string());
            format!("{}.{}", section, field)
        }
        _ => segments.join("."),
    }
}

/// Render the configuration as pretty JSON
pub fn render_config(config: &Config) -> Result<String> {
    serde_json::to_string_pretty(config).context("Failed to serialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        // Jail holds the environment lock so overrides from other tests stay out
        Jail::expect_with(|_| {
            let temp_dir = TempDir::new().unwrap();
            let config = load_config_from(&temp_dir.path().join("absent")).unwrap();
            assert_eq!(config.base_url, Config::default().base_url);
            assert_eq!(config.ssh, SshSettings::default());
            Ok(())
        });
    }

    #[test]
    fn test_env_key_paths() {
        assert_eq!(env_key("BASE_URL"), "base_url");
        assert_eq!(env_key("SSH__PORT"), "ssh.Port");
        assert_eq!(env_key("SSH__HOST_NAME"), "ssh.HostName");
        assert_eq!(env_key("ssh__serveraliveinterval"), "ssh.ServerAliveInterval");
        assert_eq!(env_key("SSH__PROJECT_PATH"), "ssh.project_path");
        assert_eq!(env_key("TABLE__HEADER_STYLE"), "table.header_style");
    }

    #[test]
    fn test_env_overrides_nested_settings() {
        Jail::expect_with(|jail| {
            jail.set_env("DOJO_SSH__PORT", "2222");
            jail.set_env("DOJO_SSH__HOST_NAME", "localhost");
            jail.set_env("DOJO_SSH__MOUNT_POINT", "/mnt/dojo");
            jail.set_env("DOJO_BASE_URL", "http://localhost:1");
            jail.set_env("DOJO_TABLE__STYLE", "ascii");

            let path = jail.directory().join("config");
            std::fs::write(&path, "ssh:\n  Port: 2200\n  User: ctf\n").unwrap();

            let config = load_config_from(&path).unwrap();
            assert_eq!(config.base_url, "http://localhost:1");
            assert_eq!(config.ssh.port, 2222);
            assert_eq!(config.ssh.host_name, "localhost");
            assert_eq!(config.ssh.mount_point, "/mnt/dojo");
            // the file layer still applies underneath
            assert_eq!(config.ssh.user, "ctf");
            assert_eq!(config.table.style, "ascii");
            Ok(())
        });
    }

    #[test]
    fn test_yaml_overrides_are_deep_merged() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("config");
            std::fs::write(
                &path,
                "ssh:\n  Port: 2222\n  User: ctf\nbelt_colors:\n  red: '#ff0000'\n",
            )
            .unwrap();

            let config = load_config_from(&path).unwrap();
            assert_eq!(config.ssh.port, 2222);
            assert_eq!(config.ssh.user, "ctf");
            // untouched siblings keep their defaults
            assert_eq!(config.ssh.host_name, "dojo.pwn.college");
            assert_eq!(config.belt_hex("red"), "#ff0000");
            assert_eq!(config.belt_hex("blue"), "#00a3e0");
            Ok(())
        });
    }

    #[test]
    fn test_json_file_is_accepted() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("config");
            std::fs::write(&path, r#"{"base_url": "http://localhost:8080", "table": {"style": "ascii"}}"#)
                .unwrap();

            let config = load_config_from(&path).unwrap();
            assert_eq!(config.base_url, "http://localhost:8080");
            assert_eq!(config.table.style, "ascii");
            assert_eq!(config.table.header_style, "bold green");
            Ok(())
        });
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("config");
            std::fs::write(&path, "").unwrap();
            assert_eq!(load_config_from(&path).unwrap(), Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        std::fs::write(&path, "ssh: [unterminated").unwrap();
        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn test_directory_resolves_to_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let resolved = resolve_config_path(
            temp_dir.path().to_str().unwrap(),
            Some(temp_dir.path().to_path_buf()),
        );
        assert_eq!(resolved, temp_dir.path().join("config"));
    }

    #[test]
    fn test_relative_path_is_under_home() {
        let home = PathBuf::from("/home/someone");
        let resolved = resolve_config_path("dojo.yml", Some(home.clone()));
        assert_eq!(resolved, home.join("dojo.yml"));
    }

    #[test]
    fn test_rendered_config_keeps_ssh_key_names() {
        let rendered = render_config(&Config::default()).unwrap();
        assert!(rendered.contains("\"HostName\": \"dojo.pwn.college\""));
        assert!(rendered.contains("\"ServerAliveCountMax\": 3"));
    }
}
