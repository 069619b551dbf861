//! Terminal helpers: prompts, activity output, message input.

use anyhow::{Context, Result};
use std::io::Read;
use textbridge::activity::{ActivityEntry, Level};
use zeroize::Zeroizing;

/// Ask a yes/no question on stderr. Empty input picks `default`.
pub fn confirm(question: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    eprint!("{question} {hint} ");
    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .context("failed to read input")?;
    Ok(parse_answer(&input, default))
}

fn parse_answer(input: &str, default: bool) -> bool {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

/// Read a credential without echo.
pub fn prompt_hidden(prompt: &str) -> Result<Zeroizing<String>> {
    let value = rpassword::prompt_password(prompt).context("failed to read input")?;
    Ok(Zeroizing::new(value))
}

/// Resolve the message argument: `-` reads all of stdin.
pub fn read_message(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read message from stdin")?;
    Ok(buf.trim_end_matches(['\n', '\r']).to_string())
}

/// Print activity entries to stderr, oldest first.
pub fn print_activity(entries: &[ActivityEntry]) {
    for entry in entries {
        eprintln!("{}", format_entry(entry));
    }
}

fn format_entry(entry: &ActivityEntry) -> String {
    let color = match entry.level {
        Level::Info => "\x1b[36m",
        Level::Success => "\x1b[32m",
        Level::Warning => "\x1b[33m",
        Level::Error => "\x1b[31m",
    };
    format!(
        "\x1b[2m[{}]\x1b[0m {color}{:<5}\x1b[0m {}",
        clock(entry.timestamp_ms),
        entry.level.to_string(),
        entry.message
    )
}

/// `HH:MM:SS` (UTC) for a Unix millisecond timestamp.
fn clock(timestamp_ms: u64) -> String {
    let secs = (timestamp_ms / 1000) % 86_400;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
