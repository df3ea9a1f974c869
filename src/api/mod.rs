// Gateway module for the dojo website - follows the Train Station Pattern
// All HTTP access to the platform goes through here

mod client;
mod scrape;
mod traits;
mod types;

pub use client::{
    decode_auth_token, delete_cookie, in_dojo, load_cookie, save_cookie, workspace_token, Body,
    DojoClient, RequestOptions,
};
pub use scrape::{challenge_numeric_id, extract_nonce, wechall_rankings};
pub use traits::DojoApi;
#[cfg(test)]
pub use traits::MockDojoApi;
pub use types::{
    image_stem, Account, ActionResult, ActiveChallenge, ActiveModule, Badge, BeltedUser, Belts,
    Challenge, ChallengePath, DockerStatus, Dojo, Module, Resource, ResourceKind, Score,
    SolveResponse, Standing, StartRequest, UnifiedItem, WeChallRow,
};
