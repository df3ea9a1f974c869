use colored::{Color as TermColor, Colorize};
use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;

static RELATIVE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\]\((/[^)\s]*)\)").expect("valid link pattern"));

fn top(stack: &[Style]) -> Style {
    stack.last().copied().unwrap_or_default()
}

fn flush(lines: &mut Vec<Line<'static>>, spans: &mut Vec<Span<'static>>) {
    if !spans.is_empty() {
        lines.push(Line::from(std::mem::take(spans)));
    }
}

/// Parse markdown and convert to styled ratatui Lines
pub fn parse_markdown(input: &str) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(input, options);
    let mut lines = Vec::new();
    let mut spans = Vec::new();
    let mut style_stack = vec![Style::default()];
    let mut in_code_block = false;
    let mut code_block_content = String::new();
    let mut list_depth: usize = 0;
    let mut link_targets: Vec<String> = Vec::new();

    for event in parser {
        match event {
            Event::Start(tag) => {
                let new_style = match tag {
                    Tag::Heading { level, .. } => {
                        flush(&mut lines, &mut spans);
                        let (prefix, style) = match level {
                            HeadingLevel::H1 => ("# ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                            HeadingLevel::H2 => ("## ", Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)),
                            HeadingLevel::H3 => ("### ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                            _ => ("#### ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                        };
                        spans.push(Span::styled(prefix, style));
                        style
                    }
                    Tag::Emphasis => top(&style_stack).add_modifier(Modifier::ITALIC),
                    Tag::Strong => top(&style_stack).add_modifier(Modifier::BOLD),
                    Tag::Strikethrough => top(&style_stack).add_modifier(Modifier::CROSSED_OUT),
                    Tag::CodeBlock(kind) => {
                        in_code_block = true;
                        code_block_content.clear();
                        flush(&mut lines, &mut spans);
                        let lang = match kind {
                            CodeBlockKind::Fenced(lang) => lang.to_string(),
                            CodeBlockKind::Indented => String::new(),
                        };
                        let mut fence = vec![Span::styled("```", Style::default().fg(Color::DarkGray))];
                        if !lang.is_empty() {
                            fence.push(Span::styled(lang, Style::default().fg(Color::Magenta)));
                        }
                        lines.push(Line::from(fence));
                        Style::default().fg(Color::Gray)
                    }
                    Tag::List(_) => {
                        list_depth += 1;
                        flush(&mut lines, &mut spans);
                        top(&style_stack)
                    }
                    Tag::Item => {
                        let indent = "  ".repeat(list_depth.saturating_sub(1));
                        spans.push(Span::raw(indent));
                        spans.push(Span::styled("• ", Style::default().fg(Color::Yellow)));
                        top(&style_stack)
                    }
                    Tag::Link { dest_url, .. } => {
                        link_targets.push(dest_url.to_string());
                        Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED)
                    }
                    Tag::Image { dest_url, .. } => {
                        spans.push(Span::styled(
                            format!("[image: {}]", dest_url),
                            Style::default().fg(Color::DarkGray),
                        ));
                        Style::default().fg(Color::DarkGray)
                    }
                    Tag::BlockQuote(_) => {
                        flush(&mut lines, &mut spans);
                        spans.push(Span::styled("│ ", Style::default().fg(Color::DarkGray)));
                        Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC)
                    }
                    _ => top(&style_stack),
                };
                style_stack.push(new_style);
            }
            Event::End(tag) => {
                style_stack.pop();
                match tag {
                    TagEnd::Heading(_) | TagEnd::Paragraph | TagEnd::Item | TagEnd::BlockQuote(_) => {
                        flush(&mut lines, &mut spans);
                    }
                    TagEnd::CodeBlock => {
                        in_code_block = false;
                        for line in code_block_content.lines() {
                            lines.push(Line::from(Span::styled(
                                line.to_string(),
                                Style::default().fg(Color::Gray),
                            )));
                        }
                        lines.push(Line::from(Span::styled("```", Style::default().fg(Color::DarkGray))));
                        code_block_content.clear();
                    }
                    TagEnd::List(_) => {
                        list_depth = list_depth.saturating_sub(1);
                    }
                    TagEnd::Link => {
                        // Bare autolinks already show their target
                        if let Some(target) = link_targets.pop() {
                            let shown = spans.last().map(|span| span.content == target.as_str());
                            if shown != Some(true) {
                                spans.push(Span::styled(
                                    format!(" ({})", target),
                                    Style::default().fg(Color::DarkGray),
                                ));
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(text) => {
                if in_code_block {
                    code_block_content.push_str(&text);
                } else {
                    spans.push(Span::styled(text.to_string(), top(&style_stack)));
                }
            }
            Event::Code(code) => {
                let style = Style::default().fg(Color::Yellow).bg(Color::Rgb(40, 40, 40));
                spans.push(Span::styled(format!(" {} ", code), style));
            }
            Event::SoftBreak | Event::HardBreak => flush(&mut lines, &mut spans),
            Event::Rule => {
                flush(&mut lines, &mut spans);
                lines.push(Line::from(Span::styled("─".repeat(40), Style::default().fg(Color::DarkGray))));
            }
            _ => {}
        }
    }

    flush(&mut lines, &mut spans);
    lines
}

/// Make site-relative links (`](/path)`) absolute against `base_url`
pub fn absolutize_links(markdown: &str, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    RELATIVE_LINK
        .replace_all(markdown, |caps: &regex::Captures| format!("]({}{})", base, &caps[1]))
        .into_owned()
}

fn term_color(color: Color) -> Option<TermColor> {
    Some(match color {
        Color::Black => TermColor::Black,
        Color::Red => TermColor::Red,
        Color::Green => TermColor::Green,
        Color::Yellow => TermColor::Yellow,
        Color::Blue => TermColor::Blue,
        Color::Magenta => TermColor::Magenta,
        Color::Cyan => TermColor::Cyan,
        Color::Gray => TermColor::White,
        Color::DarkGray => TermColor::BrightBlack,
        Color::LightRed => TermColor::BrightRed,
        Color::LightGreen => TermColor::BrightGreen,
        Color::LightYellow => TermColor::BrightYellow,
        Color::LightBlue => TermColor::BrightBlue,
        Color::LightMagenta => TermColor::BrightMagenta,
        Color::LightCyan => TermColor::BrightCyan,
        Color::White => TermColor::BrightWhite,
        Color::Rgb(r, g, b) => TermColor::TrueColor { r, g, b },
        _ => return None,
    })
}

fn span_to_ansi(span: &Span) -> String {
    let mut text = span.content.as_ref().normal();
    let style = span.style;
    if let Some(fg) = style.fg.and_then(term_color) {
        text = text.color(fg);
    }
    if let Some(bg) = style.bg.and_then(term_color) {
        text = text.on_color(bg);
    }
    if style.add_modifier.contains(Modifier::BOLD) {
        text = text.bold();
    }
    if style.add_modifier.contains(Modifier::ITALIC) {
        text = text.italic();
    }
    if style.add_modifier.contains(Modifier::UNDERLINED) {
        text = text.underline();
    }
    if style.add_modifier.contains(Modifier::CROSSED_OUT) {
        text = text.strikethrough();
    }
    text.to_string()
}

/// Render markdown for a plain terminal
pub fn render_markdown(input: &str) -> String {
    parse_markdown(input)
        .iter()
        .map(|line| line.spans.iter().map(span_to_ansi).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_markdown(input: &str) {
    println!("{}", render_markdown(input));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_headings_and_lists() {
        let lines = parse_markdown("# Title\n\n- one\n- two\n");
        assert_eq!(plain(&lines), vec!["# Title", "• one", "• two"]);
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::Cyan));
    }

    #[test]
    fn test_code_block_is_fenced() {
        let lines = parse_markdown("```sh\nls -la\n```\n");
        assert_eq!(plain(&lines), vec!["```sh", "ls -la", "```"]);
    }

    #[test]
    fn test_link_targets_are_shown() {
        let lines = parse_markdown("See [the docs](https://pwn.college/help).");
        assert_eq!(plain(&lines), vec!["See the docs (https://pwn.college/help)."]);

        let lines = parse_markdown("<https://pwn.college>");
        assert_eq!(plain(&lines), vec!["https://pwn.college"]);
    }

    #[test]
    fn test_absolutize_links() {
        assert_eq!(
            absolutize_links("[intro](/welcome/welcome) and [x](https://a.b/c)", "https://pwn.college/"),
            "[intro](https://pwn.college/welcome/welcome) and [x](https://a.b/c)"
        );
    }

    #[test]
    fn test_render_markdown_plain_text() {
        colored::control::set_override(false);
        assert_eq!(render_markdown("hello **world**"), "hello world");
    }
}
