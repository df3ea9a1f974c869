use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// State of the user's challenge container as reported by `GET /docker`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockerStatus {
    /// True while a challenge container is running
    #[serde(default)]
    pub success: bool,
    pub dojo: Option<String>,
    pub module: Option<String>,
    pub challenge: Option<String>,
    /// Privileged (practice) mode
    #[serde(default)]
    pub practice: bool,
    pub error: Option<String>,
}

impl DockerStatus {
    /// `(dojo, module, challenge)` of the running challenge
    pub fn path(&self) -> Option<ChallengePath> {
        if !self.success {
            return None;
        }
        Some(ChallengePath::new(
            self.dojo.as_deref()?,
            self.module.as_deref()?,
            self.challenge.as_deref()?,
        ))
    }

    /// Whether `path` is running in normal mode, so its `/flag` is the real one
    pub fn runs_normally(&self, path: &ChallengePath) -> bool {
        !self.practice && self.path().as_ref() == Some(path)
    }

    pub fn mode_name(&self) -> &'static str {
        if self.practice {
            "privileged"
        } else {
            "normal"
        }
    }
}

/// A fully qualified challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengePath {
    pub dojo: String,
    pub module: String,
    pub challenge: String,
}

impl ChallengePath {
    pub fn new(dojo: &str, module: &str, challenge: &str) -> Self {
        Self {
            dojo: dojo.to_string(),
            module: module.to_string(),
            challenge: challenge.to_string(),
        }
    }
}

impl fmt::Display for ChallengePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.dojo, self.module, self.challenge)
    }
}

/// Body of `POST /docker`
#[derive(Debug, Clone, Serialize)]
pub struct StartRequest {
    pub dojo: String,
    pub module: String,
    pub challenge: String,
    pub practice: bool,
}

/// Generic `{success, error}` reply
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActionResult {
    #[serde(default)]
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dojo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub official: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub challenges: Vec<Challenge>,
    #[serde(default)]
    pub unified_items: Vec<UnifiedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One entry of a module's ordered content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "lowercase")]
pub enum UnifiedItem {
    Challenge(Challenge),
    Resource(Resource),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// YouTube video id
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub playlist: Option<String>,
    /// Google Slides presentation id
    #[serde(default)]
    pub slides: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Header,
    Lecture,
    Markdown,
    #[serde(other)]
    Other,
}

/// `GET /users/me`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
    /// ISO 3166 alpha-2 code
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub bracket: Option<String>,
}

/// Global ranking parsed from the `rank:solves:total:...:users` score string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub rank: u64,
    pub solves: u64,
    pub total: u64,
    pub users: u64,
}

impl Score {
    pub fn parse(raw: &str) -> Option<Self> {
        let fields = raw
            .trim()
            .trim_matches('"')
            .split(':')
            .map(|field| field.trim().parse::<u64>().ok())
            .collect::<Option<Vec<u64>>>()?;
        if fields.len() < 6 {
            return None;
        }
        Some(Self {
            rank: fields[0],
            solves: fields[1],
            total: fields[2],
            users: fields[5],
        })
    }
}

/// `GET /belts`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Belts {
    /// Belt colour -> user ids in ranking order
    #[serde(default)]
    pub ranks: HashMap<String, Vec<i64>>,
    /// User id -> belt details, in ranking order
    #[serde(default, deserialize_with = "ordered_map")]
    pub users: Vec<(String, BeltedUser)>,
}

impl Belts {
    pub fn user(&self, id: i64) -> Option<&BeltedUser> {
        let id = id.to_string();
        self.users
            .iter()
            .find(|(user_id, _)| *user_id == id)
            .map(|(_, user)| user)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BeltedUser {
    pub handle: String,
    pub color: String,
    #[serde(default)]
    pub site: Option<String>,
    /// ISO 8601 date the belt was awarded
    #[serde(default)]
    pub date: Option<String>,
}

/// Keep the server's key order; `users` is sorted by rank
fn ordered_map<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct OrderedVisitor<V>(std::marker::PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedVisitor(std::marker::PhantomData))
}

/// One row of `GET /scoreboard/...`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Standing {
    pub rank: u64,
    pub name: String,
    /// Image path such as `/belt/blue.svg`
    #[serde(default)]
    pub belt: String,
    /// Image path such as `/themes/dojo_theme/static/img/dojo/fork.svg`
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub badges: Vec<Badge>,
    #[serde(default)]
    pub solves: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Badge {
    pub emoji: String,
}

/// `GET /active-module`, only available when logged in with an active module
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActiveModule {
    #[serde(default)]
    pub c_current: Option<ActiveChallenge>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActiveChallenge {
    pub challenge_id: Option<i64>,
}

/// Raw reply of the flag submission endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// One row of the WeChall site ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeChallRow {
    pub rank: u64,
    pub country: String,
    pub username: String,
    pub score: u64,
    pub percentage: String,
}

/// File name stem of an image path: `/belt/blue.svg` -> `blue`
pub fn image_stem(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.split('.').next().unwrap_or(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_docker_status_path() {
        let status: DockerStatus = serde_json::from_value(json!({
            "success": true,
            "dojo": "welcome",
            "module": "welcome",
            "challenge": "flag",
            "practice": false
        }))
        .unwrap();
        let path = status.path().unwrap();
        assert_eq!(path.to_string(), "welcome/welcome/flag");
        assert!(status.runs_normally(&path));
        assert_eq!(status.mode_name(), "normal");
    }

    #[test]
    fn test_stopped_docker_has_no_path() {
        let status: DockerStatus =
            serde_json::from_value(json!({"success": false, "error": "No active challenge"})).unwrap();
        assert_eq!(status.path(), None);
    }

    #[test]
    fn test_unified_items() {
        let module: Module = serde_json::from_value(json!({
            "id": "hello",
            "name": "Hello",
            "unified_items": [
                {"item_type": "resource", "type": "header", "content": "Intro"},
                {"item_type": "resource", "type": "lecture", "name": "Talk", "video": "abc"},
                {"item_type": "challenge", "id": "level-1", "name": "Level 1", "description": "hi"},
                {"item_type": "resource", "type": "quiz"}
            ]
        }))
        .unwrap();
        assert_eq!(module.unified_items.len(), 4);
        assert!(matches!(
            &module.unified_items[2],
            UnifiedItem::Challenge(c) if c.id == "level-1"
        ));
        assert!(matches!(
            &module.unified_items[3],
            UnifiedItem::Resource(r) if r.kind == ResourceKind::Other
        ));
    }

    #[test]
    fn test_score_parse() {
        let score = Score::parse("\"42:17:300:0:0:1520\"").unwrap();
        assert_eq!(score, Score { rank: 42, solves: 17, total: 300, users: 1520 });
        assert_eq!(Score::parse("1:2:3"), None);
        assert_eq!(Score::parse("a:b:c:d:e:f"), None);
    }

    #[test]
    fn test_belts_keep_server_order() {
        let belts: Belts = serde_json::from_str(
            r#"{"ranks": {"blue": [9, 2]},
                "users": {"9": {"handle": "zed", "color": "blue"},
                          "2": {"handle": "amy", "color": "blue", "site": "x.io"},
                          "10": {"handle": "bob", "color": "yellow"}}}"#,
        )
        .unwrap();
        let order: Vec<&str> = belts.users.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["9", "2", "10"]);
        assert_eq!(belts.user(2).unwrap().handle, "amy");
        assert!(belts.user(3).is_none());
    }

    #[test]
    fn test_image_stem() {
        assert_eq!(image_stem("/belt/blue.svg"), "blue");
        assert_eq!(image_stem("fork.svg"), "fork");
        assert_eq!(image_stem(""), "");
    }
}
