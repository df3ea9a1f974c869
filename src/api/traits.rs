use anyhow::Result;
use async_trait::async_trait;

use super::types::{
    Account, ActionResult, ActiveModule, Belts, DockerStatus, Dojo, Module, Score, SolveResponse,
    Standing, StartRequest, WeChallRow,
};

/// Everything the commands need from the dojo website
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DojoApi: Send + Sync {
    /// State of the challenge container
    async fn docker_status(&self) -> Result<DockerStatus>;

    /// Start (or restart) a challenge container
    async fn start_challenge(&self, request: &StartRequest) -> Result<ActionResult>;

    /// Account of the authenticated user
    async fn me(&self) -> Result<Account>;

    /// Global score of any user
    async fn score(&self, username: &str) -> Result<Score>;

    async fn belts(&self) -> Result<Belts>;

    /// Scoreboard of a dojo or one of its modules over the last `days` (0 = all time)
    async fn scoreboard(
        &self,
        dojo: &str,
        module: Option<String>,
        days: u32,
        page: u32,
    ) -> Result<Vec<Standing>>;

    async fn wechall_rankings(&self, page: u32) -> Result<Vec<WeChallRow>>;

    /// Dojos visible to the user; `auth` includes private ones
    async fn dojos(&self, auth: bool) -> Result<Vec<Dojo>>;

    async fn modules(&self, dojo: &str, auth: bool) -> Result<Vec<Module>>;

    /// Active module details, `None` when the site redirects instead
    async fn active_module(&self) -> Result<Option<ActiveModule>>;

    /// Numeric id scraped from the module page, `None` when it does not exist
    async fn challenge_numeric_id(
        &self,
        dojo: &str,
        module: &str,
        challenge: &str,
    ) -> Result<Option<i64>>;

    /// Submit a flag; the raw status and body are returned for interpretation
    async fn solve(
        &self,
        dojo: &str,
        module: &str,
        challenge: &str,
        flag: &str,
    ) -> Result<SolveResponse>;

    /// Register a public key with the account
    async fn add_ssh_key(&self, public_key: &str) -> Result<ActionResult>;
}
