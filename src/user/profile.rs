use anyhow::Result;

use crate::api::{Account, BeltedUser, DojoApi, Score};
use crate::app::Config;
use crate::utils::{belt_text, country_flag, format_rank_of, info, paint, show_table, title_case, TableData};

/// `2024-05-01T17:03:12.123456+00:00` -> `2024-05-01 17:03:12`
pub fn format_date(raw: &str) -> String {
    if let Ok(date) = chrono::DateTime::parse_from_rfc3339(raw) {
        return date.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    if let Ok(date) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return date.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    raw.to_string()
}

fn score_text(score: &Score) -> String {
    paint("bold cyan", format!("{}/{}", score.solves, score.total)).to_string()
}

pub fn account_table(config: &Config, account: &Account, score: &Score, belt: Option<&BeltedUser>) -> TableData {
    let color = belt.map(|belt| belt.color.as_str()).unwrap_or("white");
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();

    let mut table = TableData::new(
        "Account Info",
        &[
            "rank",
            "id",
            "handle",
            "belt",
            "email",
            "website",
            "affiliation",
            "country",
            "bracket",
            "date_ascended",
            "score",
        ],
    );
    table.push(vec![
        format_rank_of(score.rank, score.users),
        account.id.to_string(),
        belt_text(config, color, &account.name),
        belt_text(config, color, title_case(color)),
        optional(&account.email),
        optional(&account.website),
        optional(&account.affiliation),
        account.country.as_deref().map(country_flag).unwrap_or_default(),
        optional(&account.bracket),
        belt.and_then(|belt| belt.date.as_deref()).map(format_date).unwrap_or_default(),
        score_text(score),
    ]);
    table
}

/// Show the logged in account
pub async fn whoami(config: &Config, api: &dyn DojoApi) -> Result<()> {
    let account = api.me().await?;
    let score = api.score(&account.name).await?;
    let belts = api.belts().await?;

    info(format!("You are the epic hacker {}!", paint("bold green", &account.name)));
    show_table(&account_table(config, &account, &score, belts.user(account.id)));
    Ok(())
}

pub fn ranking_table(username: &str, score: &Score) -> TableData {
    let mut table = TableData::new("Global ranking", &["rank", "handle", "score"]);
    table.push(vec![
        format_rank_of(score.rank, score.users),
        paint("bold green", username).to_string(),
        score_text(score),
    ]);
    table
}

/// Show the global ranking of a user, by default the logged in one
pub async fn whois(api: &dyn DojoApi, username: Option<&str>) -> Result<()> {
    let username = match username {
        Some(name) => name.to_string(),
        None => api.me().await?.name,
    };
    let score = api.score(&username).await?;
    show_table(&ranking_table(&username, &score));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockDojoApi;
    use pretty_assertions::assert_eq;

    fn score() -> Score {
        Score {
            rank: 12,
            solves: 150,
            total: 900,
            users: 4000,
        }
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-05-01T17:03:12.123456+00:00"), "2024-05-01 17:03:12");
        assert_eq!(format_date("2024-05-01T17:03:12"), "2024-05-01 17:03:12");
        assert_eq!(format_date("yesterday"), "yesterday");
    }

    #[test]
    fn test_account_table_without_belt() {
        colored::control::set_override(false);
        let account = Account {
            id: 3,
            name: "hacker".to_string(),
            country: Some("US".to_string()),
            ..Account::default()
        };
        let table = account_table(&Config::default(), &account, &score(), None);
        let rendered = table.render();
        assert!(rendered.contains("White"));
        assert!(rendered.contains("🇺🇸"));
        assert!(rendered.contains("150/900"));
    }

    #[tokio::test]
    async fn test_whois_defaults_to_self() {
        let mut api = MockDojoApi::new();
        api.expect_me().times(1).returning(|| {
            Ok(Account {
                id: 1,
                name: "me".to_string(),
                ..Account::default()
            })
        });
        api.expect_score()
            .withf(|name| name.to_string() == "me")
            .returning(|_| Ok(score()));

        whois(&api, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_whois_named_user_skips_me() {
        let mut api = MockDojoApi::new();
        api.expect_me().never();
        api.expect_score().returning(|_| Ok(score()));
        whois(&api, Some("someone")).await.unwrap();
    }
}
