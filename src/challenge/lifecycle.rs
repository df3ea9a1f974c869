use anyhow::{anyhow, Result};

use super::target::resolve_target;
use crate::api::{Challenge, ChallengePath, DockerStatus, DojoApi, Module, StartRequest, UnifiedItem};
use crate::app::Config;
use crate::remote::Remote;
use crate::utils::{show_table, success, warn, DojoError, TableData};

/// Which neighbour of the running challenge to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

impl Direction {
    fn word(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
        }
    }
}

/// Privileged wins over normal; with neither, keep whatever mode is running
pub fn choose_practice(normal: bool, privileged: bool, docker: &DockerStatus) -> bool {
    if privileged {
        true
    } else if normal {
        false
    } else {
        docker.success && docker.practice
    }
}

/// Start a challenge, or the running one again when none is named
pub async fn start(
    api: &dyn DojoApi,
    dojo: Option<&str>,
    module: Option<&str>,
    challenge: Option<&str>,
    normal: bool,
    privileged: bool,
) -> Result<()> {
    let (path, docker) = resolve_target(api, dojo, module, challenge).await?;
    start_path(api, &path, choose_practice(normal, privileged, &docker)).await
}

async fn start_path(api: &dyn DojoApi, path: &ChallengePath, practice: bool) -> Result<()> {
    if api
        .challenge_numeric_id(&path.dojo, &path.module, &path.challenge)
        .await?
        .is_none()
    {
        return Err(DojoError::ChallengeNotFound.into());
    }

    tracing::info!(
        "Starting {} in {} mode",
        path,
        if practice { "privileged" } else { "normal" }
    );
    let request = StartRequest {
        dojo: path.dojo.clone(),
        module: path.module.clone(),
        challenge: path.challenge.clone(),
        practice,
    };
    let result = api.start_challenge(&request).await?;
    if result.success {
        success("Challenge started successfully!");
        Ok(())
    } else {
        Err(anyhow!(result
            .error
            .unwrap_or_else(|| "Failed to start challenge.".to_string())))
    }
}

/// Restart the running challenge, keeping its mode unless told otherwise
pub async fn restart(api: &dyn DojoApi, normal: bool, privileged: bool) -> Result<()> {
    start(api, None, None, None, normal, privileged).await
}

/// Challenges of a module in order, falling back to its unified items
pub fn module_challenges(module: &Module) -> Vec<&Challenge> {
    if !module.challenges.is_empty() {
        return module.challenges.iter().collect();
    }
    module
        .unified_items
        .iter()
        .filter_map(|item| match item {
            UnifiedItem::Challenge(challenge) => Some(challenge),
            _ => None,
        })
        .collect()
}

/// The challenge next to `current` in `challenges`
pub fn neighbour<'a>(challenges: &[&'a Challenge], current: &str, direction: Direction) -> Option<&'a Challenge> {
    let index = challenges.iter().position(|challenge| challenge.id == current)?;
    let target = match direction {
        Direction::Next => index.checked_add(1)?,
        Direction::Previous => index.checked_sub(1)?,
    };
    challenges.get(target).copied()
}

/// Start the challenge after or before the running one in its module
pub async fn step(api: &dyn DojoApi, direction: Direction, normal: bool, privileged: bool) -> Result<()> {
    let docker = api.docker_status().await?;
    let path = docker.path().ok_or_else(DojoError::no_challenge)?;

    let modules = api.modules(&path.dojo, true).await?;
    let module = modules
        .iter()
        .find(|module| module.id == path.module)
        .ok_or_else(|| anyhow!("Could not find module {}/{}.", path.dojo, path.module))?;

    let challenges = module_challenges(module);
    let Some(target) = neighbour(&challenges, &path.challenge, direction) else {
        warn(format!(
            "There is no {} challenge in {}/{}.",
            direction.word(),
            path.dojo,
            path.module
        ));
        return Ok(());
    };

    let target = ChallengePath::new(&path.dojo, &path.module, &target.id);
    start_path(api, &target, choose_practice(normal, privileged, &docker)).await
}

/// Kill a privileged container from the inside
pub async fn stop(config: &Config, api: &dyn DojoApi) -> Result<()> {
    let remote = Remote::new(config, api);
    let docker = remote.require_challenge().await?;
    if !docker.practice {
        anyhow::bail!("Challenge is in normal mode, cannot stop container without root privileges.");
    }

    // The connection dies with the container, so the exit status means nothing
    let output = remote.capture("sudo kill 1").await?;
    tracing::debug!("sudo kill 1 exited with {}", output.status);

    if api.docker_status().await?.success {
        warn("The challenge is still running.");
    } else {
        success("Challenge stopped successfully!");
    }
    Ok(())
}

/// Table describing the running challenge
pub fn status_table(docker: &DockerStatus) -> Option<TableData> {
    let path = docker.path()?;
    let mut table = TableData::new("Challenge Status", &["dojo", "module", "challenge", "mode"]);
    table.push(vec![
        path.dojo,
        path.module,
        path.challenge,
        docker.mode_name().to_string(),
    ]);
    Some(table)
}

pub async fn status(api: &dyn DojoApi) -> Result<()> {
    let docker = api.docker_status().await?;
    match status_table(&docker) {
        Some(table) => show_table(&table),
        None => warn("No active challenge session; start a challenge!"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ActionResult, MockDojoApi};
    use pretty_assertions::assert_eq;

    fn running(challenge: &str, practice: bool) -> DockerStatus {
        DockerStatus {
            success: true,
            dojo: Some("welcome".to_string()),
            module: Some("welcome".to_string()),
            challenge: Some(challenge.to_string()),
            practice,
            error: None,
        }
    }

    fn challenge(id: &str) -> Challenge {
        Challenge {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
        }
    }

    fn welcome_module() -> Module {
        Module {
            id: "welcome".to_string(),
            name: "Welcome".to_string(),
            description: None,
            challenges: vec![challenge("level-1"), challenge("level-2"), challenge("level-3")],
            unified_items: Vec::new(),
        }
    }

    #[test]
    fn test_mode_precedence() {
        let practice = running("level-1", true);
        assert!(choose_practice(true, true, &DockerStatus::default()));
        assert!(!choose_practice(true, false, &practice));
        assert!(choose_practice(false, false, &practice));
        assert!(!choose_practice(false, false, &DockerStatus::default()));
    }

    #[test]
    fn test_neighbours() {
        let module = welcome_module();
        let challenges = module_challenges(&module);
        assert_eq!(neighbour(&challenges, "level-2", Direction::Next).unwrap().id, "level-3");
        assert_eq!(neighbour(&challenges, "level-2", Direction::Previous).unwrap().id, "level-1");
        assert!(neighbour(&challenges, "level-3", Direction::Next).is_none());
        assert!(neighbour(&challenges, "level-1", Direction::Previous).is_none());
        assert!(neighbour(&challenges, "missing", Direction::Next).is_none());
    }

    #[test]
    fn test_module_challenges_from_unified_items() {
        let mut module = welcome_module();
        module.unified_items = module.challenges.drain(..).map(UnifiedItem::Challenge).collect();
        module.unified_items.insert(0, UnifiedItem::Unknown);
        let ids: Vec<&str> = module_challenges(&module).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["level-1", "level-2", "level-3"]);
    }

    #[test]
    fn test_status_table() {
        assert!(status_table(&DockerStatus::default()).is_none());
        let rendered = status_table(&running("level-1", true)).unwrap().render();
        assert!(rendered.contains("Challenge Status"));
        assert!(rendered.contains("privileged"));
    }

    #[tokio::test]
    async fn test_next_keeps_privileged_mode() {
        let mut api = MockDojoApi::new();
        api.expect_docker_status()
            .returning(|| Ok(running("level-1", true)));
        api.expect_modules()
            .returning(|_, _| Ok(vec![welcome_module()]));
        api.expect_challenge_numeric_id()
            .withf(|_, _, challenge| challenge.to_string() == "level-2")
            .returning(|_, _, _| Ok(Some(2)));
        api.expect_start_challenge()
            .withf(|request| request.challenge == "level-2" && request.practice)
            .times(1)
            .returning(|_| {
                Ok(ActionResult {
                    success: true,
                    error: None,
                })
            });

        step(&api, Direction::Next, false, false).await.unwrap();
    }

    #[tokio::test]
    async fn test_start_reports_api_error() {
        let mut api = MockDojoApi::new();
        api.expect_docker_status()
            .returning(|| Ok(DockerStatus::default()));
        api.expect_challenge_numeric_id()
            .returning(|_, _, _| Ok(Some(1)));
        api.expect_start_challenge()
            .withf(|request| !request.practice)
            .returning(|_| {
                Ok(ActionResult {
                    success: false,
                    error: Some("Docker failed".to_string()),
                })
            });

        let err = start(&api, Some("welcome"), Some("welcome"), Some("level-1"), false, false)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Docker failed");
    }

    #[tokio::test]
    async fn test_start_unknown_challenge() {
        let mut api = MockDojoApi::new();
        api.expect_docker_status()
            .returning(|| Ok(DockerStatus::default()));
        api.expect_challenge_numeric_id()
            .returning(|_, _, _| Ok(None));
        api.expect_start_challenge().never();

        let err = start(&api, Some("welcome"), Some("welcome"), Some("nope"), false, true)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DojoError>(),
            Some(DojoError::ChallengeNotFound)
        ));
    }

    #[tokio::test]
    async fn test_stop_refuses_normal_mode() {
        let mut api = MockDojoApi::new();
        api.expect_docker_status()
            .returning(|| Ok(running("level-1", false)));
        let config = Config::default();

        let err = stop(&config, &api).await.unwrap_err();
        assert!(err.to_string().contains("normal mode"));
    }
}
