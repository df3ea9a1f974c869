use anyhow::Result;
use clap::CommandFactory;

use super::args::{Cli, Commands, ModeArgs, TargetArgs};
use crate::api::DojoClient;
use crate::app::{render_config, Config};
use crate::challenge::{self, Direction};
use crate::constants::DISCORD_URL;
use crate::editor;
use crate::remote::{self, Remote};
use crate::sensai::sensai;
use crate::tui::{explore_help, tree, TreeFilter};
use crate::user;
use crate::utils::{info, paint, print_markdown};

/// The command line for `exec`: one word is taken as a shell line, several are quoted
pub fn exec_line(words: &[String]) -> Option<String> {
    match words {
        [] => None,
        [line] => Some(line.clone()),
        words => Some(shell_words::join(words)),
    }
}

pub fn discord() {
    info(format!(
        "Join the pwn.college Discord server at {}",
        paint("bold underline blue", DISCORD_URL)
    ));
}

/// Print the effective configuration, or the built-in defaults
pub fn show_config(config: &Config, default: bool) -> Result<()> {
    let rendered = if default {
        render_config(&Config::default())?
    } else {
        render_config(config)?
    };
    print_markdown(&format!("```json\n{}\n```", rendered));
    Ok(())
}

async fn open_editor(config: &Config, client: &DojoClient, cli: &str) -> Result<()> {
    editor::edit(config, client, Some(cli), None).await
}

/// Run one parsed subcommand
pub async fn handle_command(command: Commands, config: &Config, client: &DojoClient) -> Result<()> {
    let remote = Remote::new(config, client);

    match command {
        Commands::Login { username, password } => {
            user::login(config, client, username.as_deref(), password.as_deref()).await
        }
        Commands::Logout => user::logout(config),
        Commands::Keygen => remote::keygen(config, client).await,
        Commands::Whoami { simple: _ } => user::whoami(config, client).await,
        Commands::Whois { username } => user::whois(client, username.as_deref()).await,
        Commands::Scoreboard {
            dojo,
            module,
            duration,
            page,
            simple: _,
        } => user::scoreboard(config, client, dojo.as_deref(), module.as_deref(), duration, page).await,
        Commands::Belts { color, page, simple: _ } => {
            user::belts(config, client, color.as_deref(), page).await
        }

        Commands::List {
            target: TargetArgs { dojo, module, challenge },
            official,
            simple: _,
        } => {
            challenge::list(
                config,
                client,
                dojo.as_deref(),
                module.as_deref(),
                challenge.as_deref(),
                official,
            )
            .await
        }
        Commands::Tree {
            target: TargetArgs { dojo, module, challenge },
            official,
        } => {
            let filter = TreeFilter {
                dojo,
                module,
                challenge,
                official,
            };
            tree(config, client, &filter).await
        }

        Commands::Start {
            target: TargetArgs { dojo, module, challenge },
            mode: ModeArgs { normal, privileged },
        } => {
            challenge::start(
                client,
                dojo.as_deref(),
                module.as_deref(),
                challenge.as_deref(),
                normal,
                privileged,
            )
            .await
        }
        Commands::Next { mode } => challenge::step(client, Direction::Next, mode.normal, mode.privileged).await,
        Commands::Previous { mode } => {
            challenge::step(client, Direction::Previous, mode.normal, mode.privileged).await
        }
        Commands::Restart { mode } => challenge::restart(client, mode.normal, mode.privileged).await,
        Commands::Stop => challenge::stop(config, client).await,
        Commands::Status => challenge::status(client).await,

        Commands::Connect => remote.run(None).await,
        Commands::Bash { command } => remote.run(Some(&remote::bash_command(command.as_deref()))).await,
        Commands::Fish { command, init_command } => {
            let line = remote::fish_command(command.as_deref(), init_command.as_deref());
            remote.run(Some(&line)).await
        }
        Commands::Nu { commands, execute } => {
            let line = remote::nu_command(commands.as_deref(), execute.as_deref());
            remote.run(Some(&line)).await
        }
        Commands::Tmux => remote.run(Some("tmux -l")).await,
        Commands::Zellij => remote.run(Some("zellij")).await,
        Commands::Zsh { command } => remote.run(Some(&remote::zsh_command(command.as_deref()))).await,
        Commands::Exec { command } => remote.run(exec_line(&command).as_deref()).await,
        Commands::Du(args) => {
            let line = remote::du_command(args.path.as_deref(), args.lines);
            remote.run(Some(&line)).await
        }
        Commands::Dust(args) => {
            let line = remote::dust_command(args.path.as_deref(), args.lines);
            remote.run(Some(&line)).await
        }
        Commands::Bat { path } => remote.bat(&path).await,
        Commands::Cat { path } => remote.cat(&path).await,
        Commands::Download { remote_path, local_path } => {
            remote.download(&remote_path, local_path.as_deref()).await.map(|_| ())
        }
        Commands::Upload { local_path, remote_path } => {
            remote.upload(&local_path, remote_path.as_deref()).await.map(|_| ())
        }

        Commands::Mount { mount_point } => editor::mount(config, client, mount_point.as_deref()).await.map(|_| ()),
        Commands::Edit { editor, mount_point } => {
            editor::edit(config, client, editor.as_deref(), mount_point.as_deref()).await
        }
        Commands::Agy => open_editor(config, client, "agy").await,
        Commands::Code => open_editor(config, client, "code").await,
        Commands::Cursor => open_editor(config, client, "cursor").await,
        Commands::Emacs => open_editor(config, client, "emacs").await,
        Commands::Hx => open_editor(config, client, "hx").await,
        Commands::Nano => open_editor(config, client, "nano").await,
        Commands::Nvim => open_editor(config, client, "nvim").await,
        Commands::Subl => open_editor(config, client, "subl").await,
        Commands::Vim => open_editor(config, client, "vim").await,
        Commands::Zed {
            install,
            language_servers,
            mount,
        } => editor::zed(config, client, install, language_servers, mount).await,

        Commands::Discord => {
            discord();
            Ok(())
        }
        Commands::Hint {
            target: TargetArgs { dojo, module, challenge },
        } => challenge::hint(config, client, dojo.as_deref(), module.as_deref(), challenge.as_deref()).await,
        Commands::Sensai => sensai(config, client).await,
        Commands::Solve {
            flag,
            target: TargetArgs { dojo, module, challenge },
        } => {
            challenge::submit(
                config,
                client,
                flag.as_deref(),
                dojo.as_deref(),
                module.as_deref(),
                challenge.as_deref(),
            )
            .await
        }

        Commands::Config { default } => show_config(config, default),
        Commands::Help => explore_help(&Cli::command()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exec_line() {
        assert_eq!(exec_line(&[]), None);
        assert_eq!(exec_line(&["ls -la | head".to_string()]), Some("ls -la | head".to_string()));
        assert_eq!(
            exec_line(&["cat".to_string(), "my file".to_string()]),
            Some("cat 'my file'".to_string())
        );
    }
}
