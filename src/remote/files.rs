use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::exec::{quote_remote, Remote};
use super::target::SshTarget;
use crate::api::in_dojo;
use crate::app::expand_home;
use crate::utils::{success, DojoError};

/// What a remote path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteKind {
    File,
    Directory,
    Other,
    Missing,
}

impl RemoteKind {
    fn parse(output: &str) -> Self {
        match output.trim() {
            "file" => Self::File,
            "dir" => Self::Directory,
            "other" => Self::Other,
            _ => Self::Missing,
        }
    }
}

/// Join a remote directory and a file name with forward slashes
pub fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

/// Parent directory of a remote path
pub fn remote_parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(index) => Some(&trimmed[..index]),
        None => None,
    }
}

fn remote_file_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

impl Remote<'_> {
    pub async fn remote_kind(&self, path: &str) -> Result<RemoteKind> {
        let quoted = quote_remote(path);
        let probe = format!(
            "if [ -d {0} ]; then echo dir; elif [ -f {0} ]; then echo file; elif [ -e {0} ]; then echo other; fi",
            quoted
        );
        let output = self.capture(&probe).await?;
        Ok(RemoteKind::parse(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Size in bytes of a remote regular file
    pub async fn remote_size(&self, path: &str) -> Result<Option<u64>> {
        let output = self
            .capture(&format!("stat -c %s {}", quote_remote(path)))
            .await?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().parse().ok())
    }

    async fn require_file(&self, path: &str) -> Result<()> {
        match self.remote_kind(path).await? {
            RemoteKind::File => Ok(()),
            RemoteKind::Directory => anyhow::bail!("{} is a directory.", path),
            _ => anyhow::bail!("{} is not an existing file.", path),
        }
    }

    /// Print a remote file's bytes to stdout
    pub async fn cat(&self, path: &str) -> Result<()> {
        self.require_file(path).await?;
        let output = self
            .capture(&format!("cat {}", quote_remote(path)))
            .await?;
        if !output.status.success() {
            anyhow::bail!("Permission to read {} denied.", path);
        }

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&output.stdout)?;
        stdout.flush()?;
        Ok(())
    }

    /// Page a remote file through `bat` on the remote side
    pub async fn bat(&self, path: &str) -> Result<()> {
        self.require_file(path).await?;
        self.run(Some(&format!("bat {}", quote_remote(path))))
            .await
    }

    async fn scp(&self, from: &str, to: &str) -> Result<()> {
        let scp = which::which("scp")
            .map_err(|_| DojoError::Ssh("Please install OpenSSH first.".to_string()))?;
        let target = SshTarget::from_config(&self.config().ssh)?;
        let status = Command::new(scp)
            .args(target.scp_args(from, to))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .context("Failed to run scp")?;
        if !status.success() {
            anyhow::bail!("scp exited with {}", status);
        }
        Ok(())
    }

    /// Copy a remote file to the local machine (default: current directory)
    pub async fn download(&self, remote_path: &str, local_path: Option<&Path>) -> Result<PathBuf> {
        if in_dojo() {
            return Err(DojoError::RunLocally.into());
        }
        self.require_challenge().await?;

        if self.remote_kind(remote_path).await? != RemoteKind::File {
            anyhow::bail!("Remote path is not a file.");
        }

        let mut local = match local_path {
            Some(path) => expand_home(path),
            None => std::env::current_dir()?,
        };
        if local.is_dir() {
            local.push(remote_file_name(remote_path));
        }

        let target = SshTarget::from_config(&self.config().ssh)?;
        self.scp(&target.remote_spec(remote_path), &local.display().to_string())
            .await?;
        success(format!("Downloaded {} to {}", remote_path, local.display()));
        Ok(local)
    }

    /// Copy a local file into the container (default: the project directory)
    pub async fn upload(&self, local_path: &Path, remote_path: Option<&str>) -> Result<String> {
        if in_dojo() {
            return Err(DojoError::RunLocally.into());
        }
        self.require_challenge().await?;

        let local = expand_home(local_path);
        if !local.is_file() {
            anyhow::bail!("Provided path is not a file.");
        }
        let file_name = local
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut remote = remote_path
            .map(str::to_string)
            .unwrap_or_else(|| self.config().ssh.project_path.clone());
        match self.remote_kind(&remote).await? {
            RemoteKind::File => {}
            RemoteKind::Directory => remote = join_remote(&remote, &file_name),
            _ => {
                if let Some(parent) = remote_parent(&remote) {
                    self.capture(&format!("mkdir -p {}", quote_remote(parent)))
                        .await?;
                }
            }
        }

        let target = SshTarget::from_config(&self.config().ssh)?;
        self.scp(&local.display().to_string(), &target.remote_spec(&remote))
            .await?;
        success(format!("Uploaded {} to {}", local.display(), remote));
        Ok(remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_remote_kind_parse() {
        assert_eq!(RemoteKind::parse("file\n"), RemoteKind::File);
        assert_eq!(RemoteKind::parse("dir\n"), RemoteKind::Directory);
        assert_eq!(RemoteKind::parse("other"), RemoteKind::Other);
        assert_eq!(RemoteKind::parse(""), RemoteKind::Missing);
    }

    #[test]
    fn test_remote_paths() {
        assert_eq!(join_remote("/home/hacker/", "a.txt"), "/home/hacker/a.txt");
        assert_eq!(remote_parent("/home/hacker/a.txt"), Some("/home/hacker"));
        assert_eq!(remote_parent("/flag"), Some("/"));
        assert_eq!(remote_parent("flag"), None);
        assert_eq!(remote_file_name("/home/hacker/a.txt"), "a.txt");
        assert_eq!(remote_file_name("notes"), "notes");
    }
}
