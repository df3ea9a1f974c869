use anyhow::{Context, Result};
use std::process::{Output, Stdio};
use tokio::process::Command;

use super::target::SshTarget;
use crate::api::{in_dojo, DockerStatus, DojoApi};
use crate::app::Config;
use crate::constants::DEFAULT_SHELL;
use crate::utils::DojoError;

/// Runs commands in the challenge container
///
/// Inside the container commands run locally; elsewhere they go over ssh and
/// require a running challenge.
pub struct Remote<'a> {
    config: &'a Config,
    api: &'a dyn DojoApi,
}

impl<'a> Remote<'a> {
    pub fn new(config: &'a Config, api: &'a dyn DojoApi) -> Self {
        Self { config, api }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn api(&self) -> &dyn DojoApi {
        self.api
    }

    /// The running challenge, or an error telling the user to start one
    pub async fn require_challenge(&self) -> Result<DockerStatus> {
        let status = self.api.docker_status().await?;
        if !status.success {
            return Err(DojoError::no_challenge().into());
        }
        Ok(status)
    }

    async fn ssh_command(&self, tty: bool, command: Option<&str>) -> Result<Command> {
        self.require_challenge().await?;
        let ssh = which::which("ssh")
            .map_err(|_| DojoError::Ssh("Please install OpenSSH first.".to_string()))?;
        let target = SshTarget::from_config(&self.config.ssh)?;

        let mut cmd = Command::new(ssh);
        cmd.args(target.ssh_args(tty, command));
        Ok(cmd)
    }

    fn local_command(command: Option<&str>) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command.unwrap_or(DEFAULT_SHELL));
        cmd
    }

    /// Run interactively with the terminal attached
    pub async fn run(&self, command: Option<&str>) -> Result<()> {
        let mut cmd = if in_dojo() {
            Self::local_command(command)
        } else {
            self.ssh_command(true, command).await?
        };

        tracing::debug!("Running {:?}", cmd);
        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .context("Failed to start the remote session")?;

        if !status.success() {
            tracing::debug!("Remote command exited with {}", status);
        }
        Ok(())
    }

    /// Run without a terminal and collect the output
    pub async fn capture(&self, command: &str) -> Result<Output> {
        let mut cmd = if in_dojo() {
            Self::local_command(Some(command))
        } else {
            self.ssh_command(false, Some(command)).await?
        };

        tracing::debug!("Capturing {:?}", cmd);
        cmd.stdin(Stdio::null())
            .output()
            .await
            .context("Failed to run the remote command")
    }
}

/// `bash -l [-c command]`
pub fn bash_command(command: Option<&str>) -> String {
    login_shell("bash", &[("-c", command)])
}

/// `zsh -l [-c command]`
pub fn zsh_command(command: Option<&str>) -> String {
    login_shell("zsh", &[("-c", command)])
}

/// `fish -l [-c command] [-C init_command]`
pub fn fish_command(command: Option<&str>, init_command: Option<&str>) -> String {
    login_shell("fish", &[("-c", command), ("-C", init_command)])
}

/// `nu -l [-c commands] [-e execute]`
pub fn nu_command(commands: Option<&str>, execute: Option<&str>) -> String {
    login_shell("nu", &[("-c", commands), ("-e", execute)])
}

fn login_shell(shell: &str, options: &[(&str, Option<&str>)]) -> String {
    let mut argv = vec![shell, "-l"];
    for &(flag, value) in options {
        if let Some(value) = value {
            argv.push(flag);
            argv.push(value);
        }
    }
    shell_words::join(argv)
}

/// Quote a remote path for the shell, leaving a leading `~/` to expand
pub fn quote_remote(path: &str) -> String {
    if path == "~" {
        return path.to_string();
    }
    match path.strip_prefix("~/") {
        Some("") => "~/".to_string(),
        Some(rest) => format!("~/{}", shell_words::quote(rest)),
        None => shell_words::quote(path).into_owned(),
    }
}

/// Largest files under `path`, using `du`
pub fn du_command(path: Option<&str>, lines: usize) -> String {
    format!(
        "find {} -type f -exec du -hs {{}} + 2>/dev/null | sort -hr | head -n {}",
        path.map(quote_remote).as_deref().unwrap_or("~"),
        lines
    )
}

/// Largest files under `path`, using `dust`
pub fn dust_command(path: Option<&str>, lines: usize) -> String {
    format!(
        "dust -CFprsx -n {} {} 2>/dev/null",
        lines,
        path.map(quote_remote).as_deref().unwrap_or("~")
    )
}
