use anyhow::Result;
use clap::Command;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::time::Duration;

use super::terminal::{with_terminal, UiTerminal};
use crate::constants::{UI_POLL_INTERVAL_MS, UI_TREE_WIDTH_PERCENT};

/// One subcommand and its rendered long help
#[derive(Debug, Clone, PartialEq)]
pub struct HelpEntry {
    pub name: String,
    pub aliases: Vec<String>,
    pub help: String,
}

impl HelpEntry {
    fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.contains(&needle) || self.aliases.iter().any(|alias| alias.contains(&needle))
    }
}

/// Every visible subcommand of `command`, in declaration order
pub fn help_entries(command: &Command) -> Vec<HelpEntry> {
    let bin = command.get_name().to_string();
    command
        .get_subcommands()
        .filter(|sub| !sub.is_hide_set())
        .map(|sub| {
            let mut sub = sub.clone().bin_name(format!("{} {}", bin, sub.get_name()));
            HelpEntry {
                name: sub.get_name().to_string(),
                aliases: sub.get_visible_aliases().map(str::to_string).collect(),
                help: sub.render_long_help().to_string(),
            }
        })
        .collect()
}

pub struct HelpExplorer {
    entries: Vec<HelpEntry>,
    pub filter: String,
    pub filtering: bool,
    pub selected: usize,
}

impl HelpExplorer {
    pub fn new(entries: Vec<HelpEntry>) -> Self {
        Self {
            entries,
            filter: String::new(),
            filtering: false,
            selected: 0,
        }
    }

    pub fn visible(&self) -> Vec<&HelpEntry> {
        self.entries.iter().filter(|entry| entry.matches(&self.filter)).collect()
    }

    pub fn current(&self) -> Option<&HelpEntry> {
        self.visible().get(self.selected).copied()
    }

    fn clamp(&mut self) {
        let count = self.visible().len();
        self.selected = self.selected.min(count.saturating_sub(1));
    }

    /// Returns false once the explorer should close
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c')) {
            return false;
        }

        if self.filtering {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => self.filtering = false,
                KeyCode::Backspace => {
                    self.filter.pop();
                }
                KeyCode::Char(c) => self.filter.push(c),
                _ => {}
            }
            self.clamp();
            return true;
        }

        match key.code {
            KeyCode::Char('q') => return false,
            KeyCode::Esc if self.filter.is_empty() => return false,
            KeyCode::Esc => self.filter.clear(),
            KeyCode::Char('/') => self.filtering = true,
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.selected += 1,
            _ => {}
        }
        self.clamp();
        true
    }
}

fn render_commands(frame: &mut Frame, area: Rect, explorer: &HelpExplorer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let items: Vec<ListItem> = explorer
        .visible()
        .into_iter()
        .map(|entry| {
            let mut spans = vec![Span::styled(entry.name.clone(), Style::default().fg(Color::Green))];
            if !entry.aliases.is_empty() {
                spans.push(Span::styled(
                    format!(" ({})", entry.aliases.join(", ")),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().title(" Commands ").borders(Borders::ALL))
        .highlight_style(Style::default().bg(Color::Rgb(50, 50, 50)).add_modifier(Modifier::BOLD));
    let mut state = ListState::default();
    state.select(Some(explorer.selected));
    frame.render_stateful_widget(list, chunks[0], &mut state);

    let (text, border) = if explorer.filtering {
        (format!("/{}█", explorer.filter), Color::Yellow)
    } else if explorer.filter.is_empty() {
        ("/: filter, ctrl+q: quit".to_string(), Color::DarkGray)
    } else {
        (format!("/{}", explorer.filter), Color::DarkGray)
    };
    let filter = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(filter, chunks[1]);
}

pub fn render_explorer(frame: &mut Frame, explorer: &HelpExplorer) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(UI_TREE_WIDTH_PERCENT),
            Constraint::Percentage(100 - UI_TREE_WIDTH_PERCENT),
        ])
        .split(frame.area());

    render_commands(frame, chunks[0], explorer);

    let (title, help) = match explorer.current() {
        Some(entry) => (format!(" dojo {} ", entry.name), entry.help.clone()),
        None => (" No matching command ".to_string(), String::new()),
    };
    let paragraph = Paragraph::new(help)
        .block(Block::default().title(title).borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, chunks[1]);
}

fn run_explorer(terminal: &mut UiTerminal, explorer: &mut HelpExplorer) -> Result<()> {
    loop {
        terminal.draw(|frame| render_explorer(frame, explorer))?;

        if event::poll(Duration::from_millis(UI_POLL_INTERVAL_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !explorer.handle_key(key) {
                    return Ok(());
                }
            }
        }
    }
}

/// Browse the help of every subcommand
pub fn explore_help(command: &Command) -> Result<()> {
    let mut explorer = HelpExplorer::new(help_entries(command));
    with_terminal(|terminal| run_explorer(terminal, &mut explorer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Arg;
    use pretty_assertions::assert_eq;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn command() -> Command {
        Command::new("dojo")
            .subcommand(Command::new("list").visible_alias("ls").about("List dojos"))
            .subcommand(
                Command::new("submit")
                    .about("Submit a flag")
                    .arg(Arg::new("flag").help("The flag to submit")),
            )
            .subcommand(Command::new("secret").hide(true))
    }

    #[test]
    fn test_help_entries() {
        let entries = help_entries(&command());
        let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["list", "submit"]);
        assert_eq!(entries[0].aliases, vec!["ls"]);
        assert!(entries[1].help.contains("Submit a flag"));
        assert!(entries[1].help.contains("dojo submit"));
    }

    #[test]
    fn test_filtering() {
        let mut explorer = HelpExplorer::new(help_entries(&command()));
        explorer.handle_key(press(KeyCode::Down));
        assert_eq!(explorer.current().unwrap().name, "submit");

        explorer.handle_key(press(KeyCode::Char('/')));
        assert!(explorer.filtering);
        explorer.handle_key(press(KeyCode::Char('l')));
        explorer.handle_key(press(KeyCode::Char('s')));
        assert_eq!(explorer.visible().len(), 1);
        assert_eq!(explorer.current().unwrap().name, "list");

        // Typing q while filtering does not quit
        assert!(explorer.handle_key(press(KeyCode::Char('q'))));
        assert!(explorer.visible().is_empty());
        explorer.handle_key(press(KeyCode::Enter));
        assert!(explorer.handle_key(press(KeyCode::Esc)));
        assert_eq!(explorer.visible().len(), 2);
        assert!(!explorer.handle_key(press(KeyCode::Esc)));
    }

    #[test]
    fn test_ctrl_q_quits() {
        let mut explorer = HelpExplorer::new(help_entries(&command()));
        explorer.handle_key(press(KeyCode::Char('/')));
        assert!(!explorer.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL)));
    }
}
