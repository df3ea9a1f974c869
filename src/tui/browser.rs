use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::time::Duration;

use super::terminal::{with_terminal, UiTerminal};
use super::tree::{load_tree, NodeKind, TreeFilter, TreeNode};
use crate::api::{ChallengePath, DojoApi};
use crate::app::Config;
use crate::challenge::{has_credentials, start};
use crate::constants::{UI_POLL_INTERVAL_MS, UI_TREE_WIDTH_PERCENT};
use crate::utils::{absolutize_links, parse_markdown};

/// Start confirmation shown over the tree
#[derive(Debug, Clone, PartialEq)]
pub struct StartPrompt {
    pub path: ChallengePath,
    pub practice: bool,
    /// Focus on the "Start Challenge" button rather than "Cancel"
    pub confirm_focused: bool,
}

impl StartPrompt {
    pub fn question(&self) -> String {
        format!(
            "Start challenge {} in {} mode?",
            self.path,
            if self.practice { "privileged" } else { "unprivileged" }
        )
    }
}

/// What a key press asks the caller to do
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserAction {
    Continue,
    Quit,
    Start { path: ChallengePath, practice: bool },
}

pub struct TreeBrowser {
    pub root: TreeNode,
    pub selected: usize,
    pub prompt: Option<StartPrompt>,
    base_url: String,
}

impl TreeBrowser {
    pub fn new(root: TreeNode, base_url: &str) -> Self {
        Self {
            root,
            selected: 0,
            prompt: None,
            base_url: base_url.to_string(),
        }
    }

    fn rows(&self) -> Vec<Vec<usize>> {
        self.root.visible()
    }

    pub fn selected_node(&self) -> Option<&TreeNode> {
        let rows = self.rows();
        rows.get(self.selected).and_then(|path| self.root.get(path))
    }

    pub fn move_down(&mut self) {
        let count = self.rows().len();
        if self.selected + 1 < count {
            self.selected += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn toggle(&mut self) {
        let rows = self.rows();
        let Some(path) = rows.get(self.selected) else {
            return;
        };
        if let Some(node) = self.root.get_mut(path) {
            if !node.children.is_empty() {
                node.expanded = !node.expanded;
            }
        }
    }

    /// Enter on a start leaf asks for confirmation, anywhere else it toggles
    pub fn select(&mut self) {
        let start = match self.selected_node().map(|node| &node.kind) {
            Some(NodeKind::Start { path, practice }) => Some(StartPrompt {
                path: path.clone(),
                practice: *practice,
                confirm_focused: true,
            }),
            _ => None,
        };
        match start {
            Some(prompt) => self.prompt = Some(prompt),
            None => self.toggle(),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> BrowserAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c')) {
            return BrowserAction::Quit;
        }

        if let Some(prompt) = &mut self.prompt {
            let close = match key.code {
                KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
                    prompt.confirm_focused = !prompt.confirm_focused;
                    false
                }
                KeyCode::Enter if prompt.confirm_focused => {
                    return BrowserAction::Start {
                        path: prompt.path.clone(),
                        practice: prompt.practice,
                    };
                }
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => true,
                _ => false,
            };
            if close {
                self.prompt = None;
            }
            return BrowserAction::Continue;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return BrowserAction::Quit,
            KeyCode::Up | KeyCode::Char('k') => self.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.move_down(),
            KeyCode::Char(' ') => self.toggle(),
            KeyCode::Enter => self.select(),
            _ => {}
        }
        BrowserAction::Continue
    }

    /// Markdown shown beside the tree for the highlighted node
    pub fn description(&self) -> String {
        let Some(node) = self.selected_node() else {
            return String::new();
        };
        let text = match &node.kind {
            NodeKind::Start { path, practice } => format!(
                "Press enter to start `{}` in {} mode.",
                path,
                if *practice { "privileged" } else { "normal" }
            ),
            _ => node.description.clone().unwrap_or_default(),
        };
        absolutize_links(&text, &self.base_url)
    }
}

fn node_line(node: &TreeNode, depth: usize) -> Line<'static> {
    let marker = if node.children.is_empty() {
        "  "
    } else if node.expanded {
        "▼ "
    } else {
        "▶ "
    };
    let style = match node.kind {
        NodeKind::Root => Style::default().fg(Color::DarkGray),
        NodeKind::Dojo => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        NodeKind::Module => Style::default().fg(Color::Blue),
        NodeKind::Header => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        NodeKind::Lecture | NodeKind::Resource => Style::default().fg(Color::Magenta),
        NodeKind::Challenge => Style::default().fg(Color::Green),
        NodeKind::Start { .. } => Style::default().fg(Color::White),
    };
    Line::from(vec![
        Span::raw("  ".repeat(depth.saturating_sub(1))),
        Span::styled(marker, Style::default().fg(Color::DarkGray)),
        Span::styled(node.label.clone(), style),
    ])
}

fn render_tree(frame: &mut Frame, area: Rect, browser: &TreeBrowser) {
    let rows = browser.rows();
    let items: Vec<ListItem> = rows
        .iter()
        .filter_map(|path| browser.root.get(path).map(|node| ListItem::new(node_line(node, path.len()))))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" pwn.college ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .highlight_style(Style::default().bg(Color::Rgb(50, 50, 50)).add_modifier(Modifier::BOLD));

    let mut state = ListState::default();
    state.select(Some(browser.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_description(frame: &mut Frame, area: Rect, browser: &TreeBrowser) {
    let title = browser
        .selected_node()
        .map(|node| format!(" {} ", node.label))
        .unwrap_or_default();
    let paragraph = Paragraph::new(parse_markdown(&browser.description()))
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_prompt(frame: &mut Frame, area: Rect, prompt: &StartPrompt) {
    let dialog = centered(area, 72, 7);
    frame.render_widget(Clear, dialog);

    let button = |label: &'static str, focused: bool| {
        let style = if focused {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        Span::styled(format!(" {} ", label), style)
    };
    let text = vec![
        Line::from(prompt.question()),
        Line::from(""),
        Line::from(vec![
            button("Cancel", !prompt.confirm_focused),
            Span::raw("   "),
            button("Start Challenge", prompt.confirm_focused),
        ]),
    ];
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(" Confirm ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .style(Style::default().bg(Color::Rgb(20, 20, 20))),
        );
    frame.render_widget(paragraph, dialog);
}

pub fn render_browser(frame: &mut Frame, browser: &TreeBrowser) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(UI_TREE_WIDTH_PERCENT),
            Constraint::Percentage(100 - UI_TREE_WIDTH_PERCENT),
        ])
        .split(frame.area());

    render_tree(frame, chunks[0], browser);
    render_description(frame, chunks[1], browser);
    if let Some(prompt) = &browser.prompt {
        render_prompt(frame, frame.area(), prompt);
    }
}

fn run_browser(terminal: &mut UiTerminal, browser: &mut TreeBrowser) -> Result<BrowserAction> {
    loop {
        terminal.draw(|frame| render_browser(frame, browser))?;

        if event::poll(Duration::from_millis(UI_POLL_INTERVAL_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match browser.handle_key(key) {
                    BrowserAction::Continue => {}
                    action => return Ok(action),
                }
            }
        }
    }
}

/// Browse dojos, modules and challenges; optionally start one
pub async fn tree(config: &Config, api: &dyn DojoApi, filter: &TreeFilter) -> Result<()> {
    let root = load_tree(api, filter, has_credentials(config)).await?;
    let mut browser = TreeBrowser::new(root, &config.base_url);

    let action = with_terminal(|terminal| run_browser(terminal, &mut browser))?;
    if let BrowserAction::Start { path, practice } = action {
        start(
            api,
            Some(path.dojo.as_str()),
            Some(path.module.as_str()),
            Some(path.challenge.as_str()),
            !practice,
            practice,
        )
        .await?;
    }
    Ok(())
}
