use anyhow::Result;
use clap::ValueEnum;

use super::profile::format_date;
use crate::api::{image_stem, Belts, DojoApi, Standing, WeChallRow};
use crate::app::Config;
use crate::constants::BELTS_PAGE_SIZE;
use crate::utils::{belt_text, format_rank, format_rank_of, paint, show_table, title_case, TableData};

/// Scoreboard time window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Duration {
    Week,
    Month,
    #[default]
    All,
}

impl Duration {
    /// Days covered by the window; 0 means all time
    pub fn days(self) -> u32 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::All => 0,
        }
    }
}

fn role_name(symbol: &str) -> String {
    match image_stem(symbol) {
        "fork" => "ASU Student".to_string(),
        other => title_case(other),
    }
}

pub fn scoreboard_table(config: &Config, title: &str, standings: &[Standing]) -> TableData {
    let mut table = TableData::new(title, &["rank", "role", "handle", "belt", "badges", "solves"]);
    for row in standings {
        let belt = image_stem(&row.belt);
        let mut badges: Vec<&str> = row.badges.iter().map(|badge| badge.emoji.as_str()).collect();
        badges.sort_unstable();

        table.push(vec![
            format_rank(row.rank),
            role_name(&row.symbol),
            belt_text(config, belt, &row.name),
            belt_text(config, belt, title_case(belt)),
            badges.concat(),
            row.solves.to_string(),
        ]);
    }
    table
}

pub fn wechall_table(rows: &[WeChallRow]) -> TableData {
    let mut table = TableData::new("WeChall rankings", &["rank", "country", "username", "score", "percentage"]);
    for row in rows {
        table.push(vec![
            format_rank(row.rank),
            paint("bold", &row.country).to_string(),
            paint("bold", &row.username).to_string(),
            row.score.to_string(),
            paint("bold cyan", &row.percentage).to_string(),
        ]);
    }
    table
}

/// Dojo or module scoreboard; without a dojo the WeChall site ranking
pub async fn scoreboard(
    config: &Config,
    api: &dyn DojoApi,
    dojo: Option<&str>,
    module: Option<&str>,
    duration: Duration,
    page: u32,
) -> Result<()> {
    let Some(dojo) = dojo else {
        let rows = api.wechall_rankings(page).await?;
        show_table(&wechall_table(&rows));
        return Ok(());
    };

    let standings = api
        .scoreboard(dojo, module.map(str::to_string), duration.days(), page)
        .await?;
    let scope = match module {
        Some(module) => format!("{}/{}", dojo, module),
        None => dojo.to_string(),
    };
    let title = format!("Scoreboard for {}", paint("bold", scope));
    show_table(&scoreboard_table(config, &title, &standings));
    Ok(())
}

/// Belted hackers overall or for one colour, optionally one page of them
pub fn belts_table(config: &Config, belts: &Belts, color: Option<&str>, page: Option<usize>) -> TableData {
    let keys = ["rank", "id", "handle", "belt", "website", "date_ascended"];

    let selected: Vec<(String, &str)> = match color.and_then(|color| belts.ranks.get(color).map(|ids| (color, ids))) {
        Some((color, ids)) => ids
            .iter()
            .filter(|id| belts.user(**id).is_some())
            .map(|id| (id.to_string(), color))
            .collect(),
        None => belts
            .users
            .iter()
            .map(|(id, user)| (id.clone(), user.color.as_str()))
            .collect(),
    };

    let title = match color.filter(|color| belts.ranks.contains_key(*color)) {
        Some(color) => belt_text(config, color, "Belted Hackers"),
        None => paint("bold", "Belted Hackers").to_string(),
    };
    let mut table = TableData::new(title, &keys);

    let total = selected.len() as u64;
    let rows = selected.iter().enumerate().filter_map(|(index, (id, color))| {
        let user = belts.users.iter().find(|(user_id, _)| user_id == id).map(|(_, user)| user)?;
        Some(vec![
            format_rank_of(index as u64 + 1, total),
            id.clone(),
            belt_text(config, color, &user.handle),
            belt_text(config, color, title_case(color)),
            user.site.clone().unwrap_or_default(),
            user.date.as_deref().map(format_date).unwrap_or_default(),
        ])
    });

    let rows: Vec<Vec<String>> = match page {
        Some(page) => rows.skip(page * BELTS_PAGE_SIZE).take(BELTS_PAGE_SIZE).collect(),
        None => rows.collect(),
    };
    for row in rows {
        table.push(row);
    }
    table
}

pub async fn belts(config: &Config, api: &dyn DojoApi, color: Option<&str>, page: Option<usize>) -> Result<()> {
    let belts = api.belts().await?;
    show_table(&belts_table(config, &belts, color, page));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Badge, BeltedUser, MockDojoApi};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn belted(handle: &str, color: &str) -> BeltedUser {
        BeltedUser {
            handle: handle.to_string(),
            color: color.to_string(),
            site: None,
            date: Some("2024-01-02T03:04:05+00:00".to_string()),
        }
    }

    fn sample_belts() -> Belts {
        let mut ranks = HashMap::new();
        ranks.insert("blue".to_string(), vec![2]);
        ranks.insert("orange".to_string(), vec![1, 3]);
        Belts {
            ranks,
            users: vec![
                ("2".to_string(), belted("bluey", "blue")),
                ("1".to_string(), belted("first", "orange")),
                ("3".to_string(), belted("third", "orange")),
            ],
        }
    }

    #[test]
    fn test_durations() {
        assert_eq!(Duration::Week.days(), 7);
        assert_eq!(Duration::Month.days(), 30);
        assert_eq!(Duration::default().days(), 0);
    }

    #[test]
    fn test_roles() {
        assert_eq!(role_name("/themes/dojo_theme/static/img/dojo/fork.svg"), "ASU Student");
        assert_eq!(role_name("/img/dojo/hacker.svg"), "Hacker");
    }

    #[test]
    fn test_belts_by_color() {
        colored::control::set_override(false);
        let table = belts_table(&Config::default(), &sample_belts(), Some("orange"), None);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], "1");
        assert_eq!(table.rows[1][1], "3");
        assert_eq!(table.rows[1][5], "2024-01-02 03:04:05");
    }

    #[test]
    fn test_belts_overall_keeps_server_order() {
        let table = belts_table(&Config::default(), &sample_belts(), None, None);
        let ids: Vec<&str> = table.rows.iter().map(|row| row[1].as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);

        let unknown = belts_table(&Config::default(), &sample_belts(), Some("plaid"), None);
        assert_eq!(unknown.rows.len(), 3);
    }

    #[test]
    fn test_belts_pages() {
        let belts = Belts {
            ranks: HashMap::new(),
            users: (0..45).map(|id| (id.to_string(), belted("h", "white"))).collect(),
        };
        assert_eq!(belts_table(&Config::default(), &belts, None, Some(0)).rows.len(), 20);
        let last = belts_table(&Config::default(), &belts, None, Some(2));
        assert_eq!(last.rows.len(), 5);
        assert_eq!(last.rows[0][1], "40");
    }

    #[test]
    fn test_scoreboard_badges_sorted() {
        colored::control::set_override(false);
        let standings = vec![Standing {
            rank: 4,
            name: "hacker".to_string(),
            belt: "/belt/blue.svg".to_string(),
            symbol: "/img/dojo/fork.svg".to_string(),
            badges: vec![
                Badge { emoji: "🐉".to_string() },
                Badge { emoji: "🏆".to_string() },
                Badge { emoji: "🐉".to_string() },
            ],
            solves: 77,
        }];
        let table = scoreboard_table(&Config::default(), "Scoreboard", &standings);
        assert_eq!(table.rows[0][1], "ASU Student");
        assert_eq!(table.rows[0][3], "Blue");
        assert_eq!(table.rows[0][4], "🏆🐉🐉");
    }

    #[tokio::test]
    async fn test_scoreboard_without_dojo_uses_wechall() {
        let mut api = MockDojoApi::new();
        api.expect_scoreboard().never();
        api.expect_wechall_rankings()
            .withf(|page| *page == 2)
            .returning(|_| Ok(Vec::new()));

        scoreboard(&Config::default(), &api, None, None, Duration::All, 2)
            .await
            .unwrap();
    }
}
