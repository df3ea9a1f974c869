use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::DEFAULT_DU_LINES;
use crate::user::Duration;

#[derive(Parser, Debug)]
#[command(name = "dojo")]
#[command(version)]
#[command(arg_required_else_help = true)]
#[command(disable_help_subcommand = true)]
#[command(about = "A command line interface to interact with the website and API at pwn.college")]
#[command(
    long_about = "A command line interface to interact with the website and API at pwn.college.\n\n\
                  Type -h or --help after dojo <COMMAND> to display further documentation for one of the commands.\n\n\
                  Set the DOJO_CONFIG environment variable to override the default configuration path at ~/.config/dojo-cli/config."
)]
pub struct Cli {
    /// Verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

// `-d/-m/-c` selection of a challenge
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Dojo ID
    #[arg(short, long)]
    pub dojo: Option<String>,

    /// Module ID
    #[arg(short, long)]
    pub module: Option<String>,

    /// Challenge ID
    #[arg(short, long)]
    pub challenge: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ModeArgs {
    /// Start in normal mode
    #[arg(short, long)]
    pub normal: bool,

    /// Start in privileged mode
    #[arg(short = 'p', long = "privileged", visible_alias = "practice")]
    pub privileged: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LargestFilesArgs {
    /// Path to list files from
    #[arg(short, long)]
    pub path: Option<String>,

    /// Number of files to display
    #[arg(short = 'n', long, default_value_t = DEFAULT_DU_LINES)]
    pub lines: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log into your pwn.college account and save the session cookie to the cache
    Login {
        /// Username or email
        #[arg(short, long)]
        username: Option<String>,

        /// Password
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log out of your pwn.college account by deleting the session cookie from the cache
    Logout,

    /// Generate an SSH key for the dojo and add it to user settings
    Keygen,

    /// Show information about the current user (you!)
    #[command(visible_aliases = ["me", "profile"])]
    Whoami {
        /// Disable images
        #[arg(short, long)]
        simple: bool,
    },

    /// Show global ranking for another user, or for yourself when no username is given
    #[command(visible_aliases = ["score", "rank"])]
    Whois {
        /// Username to query
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Show the scoreboard for a dojo or module, or the WeChall global scoreboard when no dojo is given
    Scoreboard {
        /// Dojo ID
        #[arg(short, long)]
        dojo: Option<String>,

        /// Module ID
        #[arg(short, long)]
        module: Option<String>,

        /// Scoreboard duration
        #[arg(short = 't', long, value_enum, default_value_t)]
        duration: Duration,

        /// Scoreboard page
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Disable images
        #[arg(short, long)]
        simple: bool,
    },

    /// Show all the users who have earned belts above white belt
    Belts {
        /// Filter by belt color
        #[arg(short = 'c', long)]
        color: Option<String>,

        /// Belt list page
        #[arg(short, long)]
        page: Option<usize>,

        /// Disable images
        #[arg(short, long)]
        simple: bool,
    },

    /// List the members of a dojo or module, or all dojos when no dojo is given
    #[command(visible_alias = "ls")]
    List {
        #[command(flatten)]
        target: TargetArgs,

        /// Filter to official dojos
        #[arg(short, long)]
        official: bool,

        /// Disable images
        #[arg(short, long)]
        simple: bool,
    },

    /// Browse dojos, modules and challenges in a tree and start a challenge from it
    Tree {
        #[command(flatten)]
        target: TargetArgs,

        /// Filter to official dojos
        #[arg(short, long)]
        official: bool,
    },

    /// Start a new challenge
    #[command(
        long_about = "Start a new challenge.\n\n\
                      A bare challenge ID uses the dojo and module of the running challenge; \
                      dojo/module/challenge names one directly. Without a challenge the running one is started again."
    )]
    Start {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Start the next challenge in the current module
    Next {
        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Start the previous challenge in the current module
    #[command(visible_alias = "prev")]
    Previous {
        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Restart the current challenge, in the current mode by default
    Restart {
        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Stop the current challenge. Only works in privileged mode for now
    Stop,

    /// Show the status of the current challenge
    #[command(visible_alias = "ps")]
    Status,

    /// Connect to the current challenge via an interactive remote shell (bash by default)
    Connect,

    /// Connect to the current challenge via a bash login shell
    Bash {
        /// Run the given command and then exit
        #[arg(short = 'c')]
        command: Option<String>,
    },

    /// Connect to the current challenge via a fish login shell
    Fish {
        /// Run the given command and then exit
        #[arg(short, long)]
        command: Option<String>,

        /// Run the given command and then enter an interactive shell
        #[arg(short = 'C', long)]
        init_command: Option<String>,
    },

    /// Connect to the current challenge via a nushell login shell
    Nu {
        /// Run the given commands and then exit
        #[arg(short, long)]
        commands: Option<String>,

        /// Run the given commands and then enter an interactive shell
        #[arg(short, long)]
        execute: Option<String>,
    },

    /// Connect to the current challenge via a tmux login shell
    Tmux,

    /// Connect to the current challenge via zellij
    Zellij,

    /// Connect to the current challenge via a zsh login shell
    Zsh {
        /// Run the given command and then exit
        #[arg(short = 'c')]
        command: Option<String>,
    },

    /// Execute a remote command, or start a shell like `connect` when none is given
    #[command(visible_aliases = ["run", "ssh"])]
    Exec {
        /// The command to run
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// List the largest files in a directory using du, helpful when clearing up space
    Du(LargestFilesArgs),

    /// List the largest files in a directory using dust, helpful when clearing up space
    Dust(LargestFilesArgs),

    /// Print the contents of a remote file to standard out using bat
    Bat {
        /// The file to print
        path: String,
    },

    /// Print the contents of a remote file to standard out
    Cat {
        /// The file to print
        path: String,
    },

    /// Download a file from remote to local
    #[command(visible_alias = "down")]
    #[command(long_about = "Download a file from remote to local.\n\n\
                            Without a local path the file lands in the current directory. \
                            A local directory receives the file under its remote name.")]
    Download {
        /// Path of the remote file
        remote_path: String,

        /// Path of the local directory or file
        local_path: Option<PathBuf>,
    },

    /// Upload a file from local to remote
    #[command(visible_alias = "up")]
    #[command(long_about = "Upload a file from local to remote.\n\n\
                            Without a remote path the file lands in the project directory. \
                            Missing parent directories are created.")]
    Upload {
        /// Path of the local file
        local_path: PathBuf,

        /// Path of the remote directory or file
        remote_path: Option<String>,
    },

    /// Mount the current challenge locally with sshfs
    Mount {
        /// Path of the mount point
        #[arg(short = 'p', long = "point")]
        mount_point: Option<PathBuf>,
    },

    /// Mount the current challenge locally and open it in the specified editor
    Edit {
        /// Name of the editor to use
        #[arg(short, long)]
        editor: Option<String>,

        /// Path of the mount point
        #[arg(short = 'p', long = "point")]
        mount_point: Option<PathBuf>,
    },

    /// Mount the current challenge locally and open it in Google Antigravity
    Agy,

    /// Mount the current challenge locally and open it in Visual Studio Code
    Code,

    /// Mount the current challenge locally and open it in Cursor
    Cursor,

    /// Mount the current challenge locally and open it in Emacs
    Emacs,

    /// Mount the current challenge locally and open it in Helix
    Hx,

    /// Mount the current challenge locally and open it in Nano
    Nano,

    /// Mount the current challenge locally and open it in Neovim
    Nvim,

    /// Mount the current challenge locally and open it in Sublime Text
    Subl,

    /// Mount the current challenge locally and open it in Vim
    #[command(visible_alias = "vi")]
    Vim,

    /// Open Zed and connect remotely to the current challenge
    Zed {
        /// Install Zed or upgrade Zed to the latest version
        #[arg(short, long)]
        install: bool,

        /// Use ruff (linter) and ty (type checker)
        #[arg(short = 'l', long = "lang-server")]
        language_servers: bool,

        /// Mount the remote directory locally
        #[arg(short, long)]
        mount: bool,
    },

    /// Show the link to the pwn.college Discord server
    Discord,

    /// Show a hint for a challenge's flag
    #[command(long_about = "Show a hint for a challenge's flag.\n\n\
                            Exact lengths are reported when the challenge is running in normal mode, \
                            estimates otherwise.")]
    Hint {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Communicate with the pwn.college SensAI assistant
    Sensai,

    /// Submit a flag for a challenge
    #[command(visible_alias = "submit")]
    #[command(long_about = "Submit a flag for a challenge.\n\n\
                            Without a challenge the running one is assumed. \
                            The flag is checked against your account and the challenge before it is sent.")]
    Solve {
        /// Flag to submit
        #[arg(short, long)]
        flag: Option<String>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show the current configuration settings
    Config {
        /// Show the default configuration instead
        #[arg(short, long)]
        default: bool,
    },

    /// Explore command documentation in a TUI. Press ctrl+q to quit
    Help,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("dojo").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_aliases() {
        assert!(matches!(parse(&["ls", "-o"]), Commands::List { official: true, .. }));
        assert!(matches!(parse(&["me"]), Commands::Whoami { .. }));
        assert!(matches!(parse(&["prev"]), Commands::Previous { .. }));
        assert!(matches!(parse(&["ps"]), Commands::Status));
        assert!(matches!(parse(&["vi"]), Commands::Vim));
        assert!(matches!(parse(&["down", "/flag"]), Commands::Download { .. }));
        assert!(matches!(parse(&["submit", "-f", "practice"]), Commands::Solve { .. }));
    }

    #[test]
    fn test_start_modes() {
        let Commands::Start { target, mode } = parse(&["start", "-d", "welcome", "-c", "hello", "--practice"]) else {
            panic!("not start");
        };
        assert_eq!(target.dojo.as_deref(), Some("welcome"));
        assert_eq!(target.module, None);
        assert_eq!(target.challenge.as_deref(), Some("hello"));
        assert!(mode.privileged);
        assert!(!mode.normal);
    }

    #[test]
    fn test_exec_keeps_trailing_words() {
        let Commands::Exec { command } = parse(&["ssh", "ls", "-la", "/challenge"]) else {
            panic!("not exec");
        };
        assert_eq!(command, vec!["ls", "-la", "/challenge"]);
    }

    #[test]
    fn test_scoreboard_defaults() {
        let Commands::Scoreboard { duration, page, .. } = parse(&["scoreboard"]) else {
            panic!("not scoreboard");
        };
        assert_eq!(duration, Duration::All);
        assert_eq!(page, 1);

        let Commands::Scoreboard { duration, .. } = parse(&["scoreboard", "-t", "week"]) else {
            panic!("not scoreboard");
        };
        assert_eq!(duration, Duration::Week);
    }

    #[test]
    fn test_du_lines_default() {
        let Commands::Du(args) = parse(&["du", "-p", "/tmp"]) else {
            panic!("not du");
        };
        assert_eq!(args.lines, 20);
        assert_eq!(args.path.as_deref(), Some("/tmp"));
    }
}
