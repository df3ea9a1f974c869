// Gateway module for the challenge container - follows the Train Station Pattern
// Everything that talks to the container goes through the system OpenSSH tools

mod exec;
mod files;
mod keygen;
mod target;

pub use exec::{
    bash_command, du_command, dust_command, fish_command, nu_command, quote_remote, zsh_command,
    Remote,
};
pub use files::{join_remote, remote_parent, RemoteKind};
pub use keygen::{append_host_entry, host_entry, keygen};
pub use target::{has_host_entry, SshTarget};
