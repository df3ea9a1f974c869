use once_cell::sync::OnceCell;
use std::fmt::Display;
use tabled::{
    builder::Builder,
    settings::{Alignment, Style},
};

use super::style::paint;
use crate::app::{Config, LogStyles, TableSettings};

/// Output styles, fixed once the configuration is loaded
struct Palette {
    log: LogStyles,
    table: TableSettings,
}

static PALETTE: OnceCell<Palette> = OnceCell::new();

/// Install the configured output styles; later calls are ignored
pub fn install_palette(config: &Config) {
    let _ = PALETTE.set(Palette {
        log: config.log_styles.clone(),
        table: config.table.clone(),
    });
}

fn palette() -> &'static Palette {
    PALETTE.get_or_init(|| {
        let config = Config::default();
        Palette {
            log: config.log_styles,
            table: config.table,
        }
    })
}

fn status_line(style: &str, symbol: &str, message: impl Display) -> String {
    format!("[{}] {}", paint(style, symbol), message)
}

/// `[ERROR] message` on stderr. Callers decide whether to exit.
pub fn error(message: impl Display) {
    eprintln!("{}", status_line(&palette().log.error, "ERROR", message));
}

/// `[-] message`
pub fn fail(message: impl Display) {
    println!("{}", status_line(&palette().log.fail, "-", message));
}

/// `[*] message`
pub fn info(message: impl Display) {
    println!("{}", status_line(&palette().log.info, "*", message));
}

/// `[+] message`
pub fn success(message: impl Display) {
    println!("{}", status_line(&palette().log.success, "+", message));
}

/// `[!] message`
pub fn warn(message: impl Display) {
    println!("{}", status_line(&palette().log.warn, "!", message));
}

/// Level of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Error,
    Fail,
    Info,
    Success,
    Warn,
}

impl Status {
    pub fn print(self, message: impl Display) {
        match self {
            Self::Error => error(message),
            Self::Fail => fail(message),
            Self::Info => info(message),
            Self::Success => success(message),
            Self::Warn => warn(message),
        }
    }
}

/// Column header for a field key: `id` -> `ID`, `date_ascended` -> `Date Ascended`
pub fn column_title(key: &str) -> String {
    if key == "id" {
        return "ID".to_string();
    }
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// A table of string cells keyed by column
#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub title: Option<String>,
    pub keys: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableData {
    pub fn new(title: impl Into<String>, keys: &[&str]) -> Self {
        Self {
            title: Some(title.into()),
            keys: keys.iter().map(|key| key.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Render with the configured border and header style
    pub fn render(&self) -> String {
        let settings = &palette().table;
        let mut builder = Builder::default();
        builder.push_record(
            self.keys
                .iter()
                .map(|key| paint(&settings.header_style, column_title(key)).to_string()),
        );
        for row in &self.rows {
            builder.push_record(row.iter().cloned());
        }

        let mut table = builder.build();
        table.with(Alignment::center());
        match settings.style.to_ascii_lowercase().as_str() {
            "ascii" => table.with(Style::ascii()),
            "modern" => table.with(Style::modern()),
            "sharp" => table.with(Style::sharp()),
            "psql" => table.with(Style::psql()),
            "markdown" => table.with(Style::markdown()),
            "blank" => table.with(Style::blank()),
            "extended" => table.with(Style::extended()),
            _ => table.with(Style::rounded()),
        };

        match &self.title {
            Some(title) => format!("{}\n{}", title, table),
            None => table.to_string(),
        }
    }
}

/// Print a table to stdout
pub fn show_table(table: &TableData) {
    if table.rows.is_empty() {
        warn("Nothing to show.");
        return;
    }
    println!("{}", table.render());
}

/// Medal emoji for the podium, bold green number otherwise
pub fn format_rank(rank: u64) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => paint("bold green", n.to_string()).to_string(),
    }
}

/// Rank with its population, e.g. `🥇/1520` or `42/1520`
pub fn format_rank_of(rank: u64, total: u64) -> String {
    format!("{}/{}", format_rank(rank), paint("bold green", total.to_string()))
}

/// Belt-coloured bold text
pub fn belt_text(config: &Config, belt: &str, text: impl AsRef<str>) -> String {
    paint(&format!("bold {}", config.belt_hex(belt)), text).to_string()
}

/// Title-case a single word, e.g. `orange` -> `Orange`
pub fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Regional indicator flag for a two-letter country code
pub fn country_flag(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| {
            let offset = c.to_ascii_uppercase() as u32 - 'A' as u32;
            char::from_u32(0x1F1E6 + offset).unwrap_or(c)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_titles() {
        assert_eq!(column_title("id"), "ID");
        assert_eq!(column_title("date_ascended"), "Date Ascended");
        assert_eq!(column_title("rank"), "Rank");
    }

    #[test]
    fn test_podium_ranks_are_medals() {
        assert_eq!(format_rank(1), "🥇");
        assert_eq!(format_rank(2), "🥈");
        assert_eq!(format_rank(3), "🥉");
        assert!(format_rank(4).contains('4'));
    }

    #[test]
    fn test_country_flag() {
        assert_eq!(country_flag("US"), "🇺🇸");
        assert_eq!(country_flag("de"), "🇩🇪");
        assert_eq!(country_flag(""), "");
    }

    #[test]
    fn test_table_render_contains_cells() {
        colored::control::set_override(false);
        let mut table = TableData::new("Belts", &["rank", "handle"]);
        table.push(vec!["1".to_string(), "alice".to_string()]);
        let rendered = table.render();
        assert!(rendered.starts_with("Belts\n"));
        assert!(rendered.contains("Rank"));
        assert!(rendered.contains("alice"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("orange"), "Orange");
        assert_eq!(title_case(""), "");
    }
}
