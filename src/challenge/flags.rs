use anyhow::Result;
use serde_json::Value;

use super::target::{challenge_info, ChallengeInfo};
use crate::api::{in_dojo, DojoApi, SolveResponse};
use crate::app::Config;
use crate::constants::FLAG_PATH;
use crate::flag::{check_length, deserialize_flag, is_practice, FlagShape};
use crate::remote::Remote;
use crate::utils::{confirm, fail, info, input_required, paint, success, warn, Status};

/// Size of `/flag` in the running container, newline included
async fn flag_file_size(config: &Config, api: &dyn DojoApi) -> Result<u64> {
    if in_dojo() {
        return match std::fs::metadata(FLAG_PATH) {
            Ok(meta) => Ok(meta.len()),
            Err(_) => anyhow::bail!("Flag file does not exist."),
        };
    }

    Remote::new(config, api)
        .remote_size(FLAG_PATH)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Flag file does not exist."))
}

/// Best knowledge of the flag shape, measuring `/flag` when it is the real one
async fn flag_shape(config: &Config, api: &dyn DojoApi, target: &ChallengeInfo) -> Result<(FlagShape, bool)> {
    let shape = FlagShape::estimate(target.account_id, target.challenge_id)?;
    if target.flag_is_mounted() {
        let size = flag_file_size(config, api).await?;
        Ok((shape.measured(size), true))
    } else {
        Ok((shape, false))
    }
}

/// Print what is known about a challenge's flag without revealing it
pub async fn hint(
    config: &Config,
    api: &dyn DojoApi,
    dojo: Option<&str>,
    module: Option<&str>,
    challenge: Option<&str>,
) -> Result<()> {
    let target = challenge_info(api, dojo, module, challenge).await?;
    let (shape, measured) = flag_shape(config, api, &target).await?;

    info(format!("Hints for {}:", paint("bold", target.path.to_string())));
    info(format!("The flag starts with {}", paint("bold cyan", &shape.prefix)));
    info(format!("The flag ends with {}", paint("bold cyan", &shape.suffix)));
    info(format!(
        "The middle of the flag only uses characters from {}",
        paint("bold cyan", &shape.alphabet)
    ));

    if measured {
        warn("The following information assumes that /flag has not been tampered with:");
        info(format!(
            "The flag is {} characters long.",
            paint("bold", shape.length.to_string())
        ));
        info(format!(
            "You would only need to figure out the middle {} characters.",
            paint("bold", shape.middle.to_string())
        ));
    } else {
        warn("You are not running the correct challenge in normal mode, so the real flag size cannot be measured.");
        info(format!(
            "The flag is about {} characters long.",
            paint("bold", shape.length.to_string())
        ));
        info(format!(
            "You would only need to figure out the middle {} or so characters.",
            paint("bold", shape.middle.to_string())
        ));
    }
    Ok(())
}

/// Reasons to double check before submitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagWarning {
    OtherAccount,
    OtherChallenge,
    WrongSize(usize),
    Undecodable,
}

impl FlagWarning {
    pub fn message(&self) -> String {
        match self {
            Self::OtherAccount => {
                "This flag is from another account! Are you sure you want to submit?".to_string()
            }
            Self::OtherChallenge => {
                "This flag is from another challenge! Are you sure you want to submit?".to_string()
            }
            Self::WrongSize(length) => format!(
                "This flag is the wrong size! The real flag length is {}. Are you sure you want to submit?",
                length
            ),
            Self::Undecodable => "Could not deserialize flag. Are you sure you want to submit?".to_string(),
        }
    }
}

/// Everything suspicious about `flag` for this target
pub fn flag_warnings(flag: &str, target: &ChallengeInfo, expected_length: usize) -> Vec<FlagWarning> {
    let Some([account_id, challenge_id]) = deserialize_flag(flag) else {
        return vec![FlagWarning::Undecodable];
    };

    let mut warnings = Vec::new();
    if account_id != target.account_id {
        warnings.push(FlagWarning::OtherAccount);
    }
    if challenge_id != target.challenge_id {
        warnings.push(FlagWarning::OtherChallenge);
    }
    if !check_length(flag, expected_length) {
        warnings.push(FlagWarning::WrongSize(expected_length));
    }
    warnings
}

/// What the platform made of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Solved,
    AlreadySolved,
    Incorrect,
    NotFound,
    Failed(u16),
}

impl SolveOutcome {
    pub fn from_response(response: &SolveResponse) -> Self {
        let status_of = |body: &Value| body.get("status").and_then(Value::as_str).map(str::to_string);
        let message = response.body.get("message").and_then(Value::as_str);

        match (response.status, status_of(&response.body).as_deref(), message) {
            (200..=299, Some("solved"), _) => Self::Solved,
            (200..=299, Some("already_solved"), _) => Self::AlreadySolved,
            (400, Some("incorrect"), _) => Self::Incorrect,
            (404, _, Some("Challenge not found")) => Self::NotFound,
            (status, _, _) => Self::Failed(status),
        }
    }
}

/// Show each warning and ask to go on; false once the user backs out
fn accept_warnings(
    warnings: &[FlagWarning],
    mut ask: impl FnMut() -> Result<bool>,
    mut report: impl FnMut(Status, String),
) -> Result<bool> {
    for warning in warnings {
        report(Status::Warn, warning.message());
        if !ask()? {
            report(Status::Warn, "Aborting flag submission attempt!".to_string());
            return Ok(false);
        }
    }
    Ok(true)
}

/// Submit a flag after sanity checks against the account and challenge
pub async fn submit(
    config: &Config,
    api: &dyn DojoApi,
    flag: Option<&str>,
    dojo: Option<&str>,
    module: Option<&str>,
    challenge: Option<&str>,
) -> Result<()> {
    let flag = match flag.map(str::trim).filter(|flag| !flag.is_empty()) {
        Some(flag) => flag.to_string(),
        None => input_required("Enter the flag: ")?,
    };

    if is_practice(&flag) {
        warn("This is the practice flag!");
        info("Restart the challenge in normal mode to get the real flag.");
        info(format!("(You can do this with {})", paint("bold cyan", "dojo restart -n")));
        return Ok(());
    }

    let target = challenge_info(api, dojo, module, challenge).await?;
    let (shape, _) = flag_shape(config, api, &target).await?;
    let warnings = flag_warnings(&flag, &target, shape.length);
    if !accept_warnings(&warnings, confirm, |status, message| status.print(message))? {
        return Ok(());
    }

    info(format!("Submitting the flag: {}", paint("bold", &flag)));
    let path = &target.path;
    let response = api
        .solve(&path.dojo, &path.module, &path.challenge, &flag)
        .await?;
    tracing::debug!("Solve response {}: {}", response.status, response.body);

    match SolveOutcome::from_response(&response) {
        SolveOutcome::Solved => {
            success("The flag is correct! You have successfully solved the challenge!");
            Ok(())
        }
        SolveOutcome::AlreadySolved => {
            warn("You have already solved this challenge!");
            Ok(())
        }
        SolveOutcome::Incorrect => {
            fail("The flag is incorrect.");
            Ok(())
        }
        SolveOutcome::NotFound => anyhow::bail!("The challenge does not exist."),
        SolveOutcome::Failed(status) => anyhow::bail!("Failed to submit the flag (code: {}).", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ChallengePath, DockerStatus};
    use crate::flag::{serialize_flag, wrap};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn target(account_id: i64, challenge_id: i64) -> ChallengeInfo {
        ChallengeInfo {
            path: ChallengePath::new("welcome", "welcome", "flag"),
            account_id,
            challenge_id,
            docker: DockerStatus::default(),
        }
    }

    #[test]
    fn test_matching_flag_has_no_warnings() {
        let flag = wrap(&serialize_flag(1, 2).unwrap());
        let expected = FlagShape::estimate(1, 2).unwrap().length;
        assert_eq!(flag_warnings(&flag, &target(1, 2), expected), Vec::new());
    }

    #[test]
    fn test_declined_warning_aborts_with_a_warning() {
        let warnings = vec![FlagWarning::OtherAccount, FlagWarning::WrongSize(60)];
        let mut lines = Vec::new();
        let accepted =
            accept_warnings(&warnings, || Ok(false), |status, message| lines.push((status, message))).unwrap();

        assert!(!accepted);
        assert_eq!(
            lines,
            vec![
                (Status::Warn, FlagWarning::OtherAccount.message()),
                (Status::Warn, "Aborting flag submission attempt!".to_string()),
            ]
        );
    }

    #[test]
    fn test_confirmed_warnings_continue() {
        let warnings = vec![FlagWarning::OtherChallenge, FlagWarning::Undecodable];
        let mut asked = 0;
        let mut lines = Vec::new();
        let accepted = accept_warnings(
            &warnings,
            || {
                asked += 1;
                Ok(true)
            },
            |status, message| lines.push((status, message)),
        )
        .unwrap();

        assert!(accepted);
        assert_eq!(asked, 2);
        assert!(lines.iter().all(|(status, _)| *status == Status::Warn));
        assert!(accept_warnings(&[], || Ok(false), |_, _| {}).unwrap());
    }

    #[test]
    fn test_foreign_flag_warnings() {
        let flag = wrap(&serialize_flag(1, 2).unwrap());
        assert_eq!(
            flag_warnings(&flag, &target(5, 9), flag.len() + 3),
            vec![
                FlagWarning::OtherAccount,
                FlagWarning::OtherChallenge,
                FlagWarning::WrongSize(flag.len() + 3)
            ]
        );
        assert_eq!(
            flag_warnings("pwn.college{garbage}", &target(1, 2), 20),
            vec![FlagWarning::Undecodable]
        );
    }

    #[test]
    fn test_bare_flag_body_is_accepted() {
        let body = serialize_flag(1, 2).unwrap();
        let expected = wrap(&body).len();
        assert_eq!(flag_warnings(&body, &target(1, 2), expected), Vec::new());
    }

    #[test]
    fn test_solve_outcomes() {
        let outcome = |status: u16, body: Value| SolveOutcome::from_response(&SolveResponse { status, body });
        assert_eq!(outcome(200, json!({"success": true, "status": "solved"})), SolveOutcome::Solved);
        assert_eq!(outcome(200, json!({"status": "already_solved"})), SolveOutcome::AlreadySolved);
        assert_eq!(outcome(400, json!({"status": "incorrect"})), SolveOutcome::Incorrect);
        assert_eq!(
            outcome(404, json!({"success": false, "message": "Challenge not found"})),
            SolveOutcome::NotFound
        );
        assert_eq!(outcome(500, json!({})), SolveOutcome::Failed(500));
    }

    #[test]
    fn test_warning_messages() {
        assert_eq!(
            FlagWarning::WrongSize(57).message(),
            "This flag is the wrong size! The real flag length is 57. Are you sure you want to submit?"
        );
    }
}
