//! Regex based extraction from the few HTML pages that have no JSON equivalent

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::WeChallRow;

static NONCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"'csrfNonce': "(\w+)""#).expect("valid nonce pattern"));
static INPUT_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<input\b[^>]*>").expect("valid tag pattern"));
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)([\w-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid attribute pattern")
});
static TABLE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<tr\b.*?</tr>").expect("valid row pattern"));
static TABLE_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").expect("valid cell pattern"));
static IMG_ALT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<img\b[^>]*\balt\s*=\s*"([^"]*)""#).expect("valid img pattern"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern"));

const UNKNOWN_COUNTRY: &str = "__Unknown Country";

/// CSRF nonce embedded in every CTFd page's init script
pub fn extract_nonce(html: &str) -> Option<String> {
    NONCE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(tag)
        .map(|caps| {
            let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            (caps[1].to_ascii_lowercase(), unescape(value))
        })
        .collect()
}

fn input_value<'a>(inputs: &'a [Vec<(String, String)>], id: &str) -> Option<&'a str> {
    inputs.iter().find_map(|attrs| {
        let has_id = attrs.iter().any(|(name, value)| name == "id" && value == id);
        if !has_id {
            return None;
        }
        attrs
            .iter()
            .find(|(name, _)| name == "value")
            .map(|(_, value)| value.as_str())
    })
}

/// Numeric id of `challenge` on a module page
///
/// Every challenge is rendered inside a `div.challenge-init` holding hidden
/// inputs `#challenge` (the slug) and `#challenge-id` (the number).
pub fn challenge_numeric_id(html: &str, challenge: &str) -> Option<i64> {
    html.split("challenge-init").skip(1).find_map(|section| {
        let inputs: Vec<Vec<(String, String)>> = INPUT_TAG
            .find_iter(section)
            .map(|tag| attributes(tag.as_str()))
            .collect();
        if input_value(&inputs, "challenge")? != challenge {
            return None;
        }
        input_value(&inputs, "challenge-id")?.trim().parse().ok()
    })
}

/// Rows of the WeChall site ranking page; the first two rows are headers
pub fn wechall_rankings(html: &str) -> Vec<WeChallRow> {
    TABLE_ROW
        .find_iter(html)
        .skip(2)
        .filter_map(|row| {
            let cells: Vec<&str> = TABLE_CELL
                .captures_iter(row.as_str())
                .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
                .collect();
            if cells.len() < 5 {
                return None;
            }
            let alt = IMG_ALT
                .captures(cells[1])
                .and_then(|caps| caps.get(1))
                .map_or(String::new(), |m| unescape(m.as_str()));
            let country = if alt == UNKNOWN_COUNTRY {
                "Unknown".to_string()
            } else {
                alt
            };
            Some(WeChallRow {
                rank: text(cells[0]).parse().unwrap_or(0),
                country,
                username: text(cells[2]),
                score: text(cells[3]).parse().unwrap_or(0),
                percentage: text(cells[4]),
            })
        })
        .collect()
}

/// Visible text of an HTML fragment
pub fn text(fragment: &str) -> String {
    unescape(TAG.replace_all(fragment, "").trim())
}

fn unescape(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MODULE_PAGE: &str = r#"
        <div class="accordion">
          <div class="challenge-init">
            <input id="challenge" type="hidden" value="level-1">
            <input type="hidden" id="challenge-id" value="101">
          </div>
          <div class="challenge-init">
            <input type="hidden" value="level-2" id="challenge">
            <input id="challenge-id" type="hidden" value="102">
          </div>
        </div>"#;

    #[test]
    fn test_nonce() {
        let html = r#"<script>var init = {'urlRoot': "", 'csrfNonce': "a1b2c3", 'userMode': "users"}</script>"#;
        assert_eq!(extract_nonce(html), Some("a1b2c3".to_string()));
        assert_eq!(extract_nonce("<html></html>"), None);
    }

    #[test]
    fn test_challenge_numeric_id() {
        assert_eq!(challenge_numeric_id(MODULE_PAGE, "level-1"), Some(101));
        assert_eq!(challenge_numeric_id(MODULE_PAGE, "level-2"), Some(102));
        assert_eq!(challenge_numeric_id(MODULE_PAGE, "level-3"), None);
        assert_eq!(challenge_numeric_id("", "level-1"), None);
    }

    #[test]
    fn test_wechall_rankings() {
        let html = r#"
            <table>
              <tr><th colspan="5">pwn.college</th></tr>
              <tr><th>#</th><th>Country</th><th>User</th><th>Score</th><th>%</th></tr>
              <tr><td>1</td><td><img src="/img/flags/de.png" alt="Germany"></td>
                  <td><a href="/profile/kim">kim</a></td><td>9001</td><td>99.50%</td></tr>
              <tr><td>2</td><td><img src="/img/flags/0.png" alt="__Unknown Country"></td>
                  <td>lee &amp; co</td><td>42</td><td>1.00%</td></tr>
            </table>"#;
        let rows = wechall_rankings(html);
        assert_eq!(
            rows,
            vec![
                WeChallRow {
                    rank: 1,
                    country: "Germany".to_string(),
                    username: "kim".to_string(),
                    score: 9001,
                    percentage: "99.50%".to_string(),
                },
                WeChallRow {
                    rank: 2,
                    country: "Unknown".to_string(),
                    username: "lee & co".to_string(),
                    score: 42,
                    percentage: "1.00%".to_string(),
                },
            ]
        );
    }
}
