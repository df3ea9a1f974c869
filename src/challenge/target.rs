use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::{ChallengePath, DockerStatus, DojoApi};
use crate::utils::DojoError;

static SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-\w]+$").expect("valid slug pattern"));
static FULL_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/?([-~\w]+)/([-\w]+)/([-\w]+)").expect("valid path pattern"));

/// Turn a challenge argument into a full path
///
/// A bare slug refers to a challenge in the module that is currently running.
pub fn parse_challenge_path(id: &str, docker: &DockerStatus) -> Result<ChallengePath> {
    if SLUG.is_match(id) {
        let running = docker.path().ok_or_else(|| {
            DojoError::NoActiveChallenge(format!(
                "use dojo/module/{} or start a challenge in the same module!",
                id
            ))
        })?;
        return Ok(ChallengePath::new(&running.dojo, &running.module, id));
    }

    let caps = FULL_PATH
        .captures(id)
        .ok_or_else(|| DojoError::InvalidChallengeId(id.to_string()))?;
    Ok(ChallengePath::new(&caps[1], &caps[2], &caps[3]))
}

/// Work out which challenge a command is about, plus the current container state
pub async fn resolve_target(
    api: &dyn DojoApi,
    dojo: Option<&str>,
    module: Option<&str>,
    challenge: Option<&str>,
) -> Result<(ChallengePath, DockerStatus)> {
    let docker = api.docker_status().await?;
    let path = match (dojo, module, challenge) {
        (_, _, None) => docker.path().ok_or_else(|| {
            DojoError::NoActiveChallenge("please start a challenge or specify a challenge name!".to_string())
        })?,
        (Some(dojo), Some(module), Some(challenge)) => ChallengePath::new(dojo, module, challenge),
        (_, _, Some(challenge)) => parse_challenge_path(challenge, &docker)?,
    };
    Ok((path, docker))
}

/// Everything needed to reason about a challenge's flag
#[derive(Debug, Clone)]
pub struct ChallengeInfo {
    pub path: ChallengePath,
    pub account_id: i64,
    pub challenge_id: i64,
    pub docker: DockerStatus,
}

impl ChallengeInfo {
    /// Whether the real flag of this challenge sits in the container right now
    pub fn flag_is_mounted(&self) -> bool {
        self.docker.runs_normally(&self.path)
    }
}

/// Resolve a challenge together with the account and numeric challenge ids
pub async fn challenge_info(
    api: &dyn DojoApi,
    dojo: Option<&str>,
    module: Option<&str>,
    challenge: Option<&str>,
) -> Result<ChallengeInfo> {
    let explicit = challenge.is_some();
    let (path, docker) = resolve_target(api, dojo, module, challenge).await?;
    let account_id = api.me().await?.id;

    let active_id = if explicit {
        None
    } else {
        api.active_module()
            .await?
            .and_then(|active| active.c_current)
            .and_then(|current| current.challenge_id)
    };
    let challenge_id = match active_id {
        Some(id) => id,
        None => api
            .challenge_numeric_id(&path.dojo, &path.module, &path.challenge)
            .await?
            .ok_or(DojoError::ChallengeNotFound)?,
    };

    tracing::debug!("{} is challenge {} for account {}", path, challenge_id, account_id);
    Ok(ChallengeInfo {
        path,
        account_id,
        challenge_id,
        docker,
    })
}
