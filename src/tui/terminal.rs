use anyhow::{anyhow, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

pub type UiTerminal = Terminal<CrosstermBackend<io::Stdout>>;

/// Run `body` on the alternate screen, restoring the terminal whatever happens
pub fn with_terminal<T>(body: impl FnOnce(&mut UiTerminal) -> Result<T>) -> Result<T> {
    if !crossterm::tty::IsTty::is_tty(&io::stdout()) {
        return Err(anyhow!("This command requires an interactive terminal."));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = body(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
