use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::app::{expand_home, Config};
use crate::utils::{info, warn, DojoError};

const HOMEBREW_INSTALL_URL: &str = "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";
const RUSTUP_INSTALL_URL: &str = "https://sh.rustup.rs";
const UV_INSTALL_URL: &str = "https://astral.sh/uv/install.sh";
const ZEROBREW_GITHUB_URL: &str = "https://github.com/lucasgelfond/zerobrew";

const HOMEBREW_BIN_DIR: &str = "/opt/homebrew/bin";
const CARGO_BIN_DIR: &str = "~/.cargo/bin";
const LOCAL_BIN_DIR: &str = "~/.local/bin";
const SYSTEM_BIN_DIRS: &[&str] = &["/usr/local/bin", "/usr/bin"];

/// Package managers the installers know how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Homebrew,
    Wax,
    Zerobrew,
    Uv,
}

impl PackageManager {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "homebrew" | "brew" => Some(Self::Homebrew),
            "wax" => Some(Self::Wax),
            "zerobrew" | "zb" => Some(Self::Zerobrew),
            "uv" => Some(Self::Uv),
            _ => None,
        }
    }

    /// The manager configured for this platform
    pub fn configured(config: &Config) -> Result<Self> {
        let name = config.package_manager.current();
        Self::parse(name)
            .ok_or_else(|| DojoError::Unsupported(format!("Unknown package manager {}.", name)).into())
    }
}

/// What to install in one go
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packages {
    pub formulae: Vec<String>,
    pub casks: Vec<String>,
    pub taps: Vec<String>,
}

impl Packages {
    pub fn formulae(names: &[&str]) -> Self {
        Self {
            formulae: names.iter().map(|name| name.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn casks(names: &[&str]) -> Self {
        Self {
            casks: names.iter().map(|name| name.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_tap(mut self, tap: &str) -> Self {
        self.taps.push(tap.to_string());
        self
    }
}

/// Refuse platforms the installers have never been run on
pub fn ensure_supported_os() -> Result<()> {
    match std::env::consts::OS {
        "macos" | "linux" => Ok(()),
        "windows" => Err(DojoError::Unsupported("Windows is not yet supported.".to_string()).into()),
        _ => Err(DojoError::Unsupported("Your OS is not yet supported.".to_string()).into()),
    }
}

/// An executable on PATH or in one of the usual install locations
pub fn locate(program: &str, extra_dirs: &[&str]) -> Option<PathBuf> {
    if let Ok(path) = which::which(program) {
        return Some(path);
    }
    extra_dirs
        .iter()
        .chain(SYSTEM_BIN_DIRS)
        .map(|dir| expand_home(dir).join(program))
        .find(|path| path.is_file())
}

async fn run_inherited(program: impl AsRef<Path>, args: &[String]) -> Result<()> {
    let program = program.as_ref();
    tracing::debug!("Running {} {:?}", program.display(), args);
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .with_context(|| format!("Failed to run {}", program.display()))?;

    if !status.success() {
        anyhow::bail!("{} exited with {}", program.display(), status);
    }
    Ok(())
}

/// Download an installer script and pipe it through a shell
async fn run_install_script(url: &str, shell: &str) -> Result<()> {
    let script = reqwest::get(url)
        .await
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("Failed to download {}", url))?
        .text()
        .await?;
    run_inherited(shell, &["-c".to_string(), script]).await
}

fn args(head: &[&str], tail: &[String]) -> Vec<String> {
    head.iter().map(|arg| arg.to_string()).chain(tail.iter().cloned()).collect()
}

/// Commands run with `brew` once it is present
pub fn homebrew_commands(packages: &Packages) -> Vec<Vec<String>> {
    let mut commands = Vec::new();
    for tap in &packages.taps {
        commands.push(args(&["tap"], std::slice::from_ref(tap)));
    }
    if !packages.casks.is_empty() {
        commands.push(args(&["install", "--cask"], &packages.casks));
    }
    if !packages.formulae.is_empty() {
        commands.push(args(&["install"], &packages.formulae));
    }
    commands
}

/// Commands run with `wax` once it is present
pub fn wax_commands(packages: &Packages) -> Vec<Vec<String>> {
    let mut commands = Vec::new();
    for tap in &packages.taps {
        commands.push(args(&["tap", "add"], std::slice::from_ref(tap)));
    }
    if !packages.casks.is_empty() {
        commands.push(args(&["c"], &packages.casks));
    }
    if !packages.formulae.is_empty() {
        commands.push(args(&["i"], &packages.formulae));
    }
    commands
}

pub async fn homebrew_install(packages: &Packages) -> Result<()> {
    let brew = match locate("brew", &[HOMEBREW_BIN_DIR]) {
        Some(brew) => {
            run_inherited(&brew, &args(&["update"], &[])).await?;
            brew
        }
        None => {
            info("Installing Homebrew...");
            run_install_script(HOMEBREW_INSTALL_URL, "bash").await?;
            locate("brew", &[HOMEBREW_BIN_DIR, "/home/linuxbrew/.linuxbrew/bin"])
                .context("Homebrew was installed but brew is not on PATH")?
        }
    };

    for command in homebrew_commands(packages) {
        run_inherited(&brew, &command).await?;
    }
    Ok(())
}

async fn ensure_cargo() -> Result<PathBuf> {
    if let Some(cargo) = locate("cargo", &[CARGO_BIN_DIR]) {
        return Ok(cargo);
    }
    info("Installing Rust...");
    run_install_script(RUSTUP_INSTALL_URL, "sh").await?;
    locate("cargo", &[CARGO_BIN_DIR]).context("Rust was installed but cargo is not on PATH")
}

/// Wax cannot see Homebrew taps or casks it did not install itself
pub async fn wax_install(packages: &Packages) -> Result<()> {
    let cargo = ensure_cargo().await?;
    let wax = match locate("wax", &[CARGO_BIN_DIR]) {
        Some(wax) => {
            run_inherited(&wax, &args(&["update", "-s"], &[])).await?;
            wax
        }
        None => {
            info("Installing Wax...");
            run_inherited(&cargo, &args(&["install", "waxpkg"], &[])).await?;
            locate("wax", &[CARGO_BIN_DIR]).context("Wax was installed but is not on PATH")?
        }
    };

    for command in wax_commands(packages) {
        run_inherited(&wax, &command).await?;
    }
    Ok(())
}

/// Zerobrew only knows homebrew/core formulae; casks go through Homebrew
pub async fn zerobrew_install(packages: &Packages) -> Result<()> {
    let cargo = ensure_cargo().await?;
    let zb = match locate("zb", &[CARGO_BIN_DIR]) {
        Some(zb) => zb,
        None => {
            info("Installing Zerobrew...");
            run_inherited(&cargo, &args(&["install", "--git", ZEROBREW_GITHUB_URL], &[])).await?;
            locate("zb", &[CARGO_BIN_DIR]).context("Zerobrew was installed but zb is not on PATH")?
        }
    };

    if !packages.taps.is_empty() || !packages.casks.is_empty() {
        warn("Zerobrew does not support installing taps or casks yet, falling back to Homebrew.");
        homebrew_install(&Packages {
            formulae: Vec::new(),
            casks: packages.casks.clone(),
            taps: packages.taps.clone(),
        })
        .await?;
    }
    if !packages.formulae.is_empty() {
        run_inherited(&zb, &args(&["install"], &packages.formulae)).await?;
    }
    Ok(())
}

/// Install command line tools with `uv tool install -U`
pub async fn uv_tool_install(tools: &[String]) -> Result<()> {
    let uv = match locate("uv", &[LOCAL_BIN_DIR]) {
        Some(uv) => {
            run_inherited(&uv, &args(&["self", "update"], &[])).await?;
            uv
        }
        None => {
            info("Installing uv...");
            run_install_script(UV_INSTALL_URL, "sh").await?;
            locate("uv", &[LOCAL_BIN_DIR]).context("uv was installed but is not on PATH")?
        }
    };

    for tool in tools {
        run_inherited(&uv, &args(&["tool", "install", "-U"], std::slice::from_ref(tool))).await?;
    }
    Ok(())
}

/// Install with whichever manager is configured for this platform
pub async fn install_packages(config: &Config, packages: &Packages) -> Result<()> {
    ensure_supported_os()?;
    match PackageManager::configured(config)? {
        PackageManager::Homebrew => homebrew_install(packages).await,
        PackageManager::Wax => wax_install(packages).await,
        PackageManager::Zerobrew => zerobrew_install(packages).await,
        PackageManager::Uv => {
            if !packages.casks.is_empty() {
                warn("uv cannot install applications, falling back to Homebrew.");
                homebrew_install(&Packages {
                    casks: packages.casks.clone(),
                    taps: packages.taps.clone(),
                    formulae: Vec::new(),
                })
                .await?;
            }
            uv_tool_install(&packages.formulae).await
        }
    }
}
