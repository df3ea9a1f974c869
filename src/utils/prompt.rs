use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::io::{self, BufRead, Write};

/// Read one line from stdin after printing a prompt
pub fn input(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    read_answer(&mut io::stdin().lock())
}

/// Keep prompting until a non-empty, trimmed answer is given
pub fn input_required(prompt: &str) -> Result<String> {
    loop {
        let answer = input(prompt)?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
    }
}

/// Ask a `(y/N)` question; anything but an answer starting with `y` is no
pub fn confirm() -> Result<bool> {
    Ok(is_yes(&input("(y/N) > ")?))
}

fn is_yes(answer: &str) -> bool {
    answer
        .trim()
        .chars()
        .next()
        .map(|c| c.eq_ignore_ascii_case(&'y'))
        .unwrap_or(false)
}

/// Read a password without echoing it, printing `echo_char` per keystroke
pub fn password(prompt: &str, echo_char: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    if !crossterm::tty::IsTty::is_tty(&io::stdin()) {
        // Piped input: nothing to hide
        let secret = read_answer(&mut io::stdin().lock());
        println!();
        return secret;
    }

    enable_raw_mode()?;
    let result = read_hidden(echo_char);
    disable_raw_mode()?;
    println!();
    result
}

fn read_answer(reader: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    let read = reader.read_line(&mut line).context("Failed to read from stdin")?;
    if read == 0 {
        anyhow::bail!("Input closed");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_hidden(echo_char: &str) -> Result<String> {
    let mut secret = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                anyhow::bail!("Interrupted")
            }
            KeyCode::Backspace => {
                if secret.pop().is_some() && !echo_char.is_empty() {
                    print!("\x08 \x08");
                    io::stdout().flush()?;
                }
            }
            KeyCode::Char(c) => {
                secret.push(c);
                print!("{}", echo_char);
                io::stdout().flush()?;
            }
            _ => {}
        }
    }
}
