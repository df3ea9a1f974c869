// Gateway module for accounts and rankings - follows the Train Station Pattern

mod profile;
mod ranking;
mod session;

pub use profile::{account_table, format_date, ranking_table, whoami, whois};
pub use ranking::{belts, belts_table, scoreboard, scoreboard_table, wechall_table, Duration};
pub use session::{login, logout};
