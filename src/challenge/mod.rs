// Gateway module for challenges - follows the Train Station Pattern
// Starting, stepping through, listing and solving challenges

mod flags;
mod lifecycle;
mod listing;
mod target;

pub use flags::{flag_warnings, hint, submit, FlagWarning, SolveOutcome};
pub use lifecycle::{
    choose_practice, module_challenges, neighbour, restart, start, status, step, stop, Direction,
};
pub use listing::{has_credentials, list, sort_dojos};
pub use target::{challenge_info, parse_challenge_path, resolve_target, ChallengeInfo};
