//! Terminal styling utilities for the console run log

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use console::{style, Emoji};

use crate::pipeline::error::{Notice, NoticeLevel};

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static DICE: Emoji<'_, '_> = Emoji("🎲 ", "");

static QUIET: AtomicBool = AtomicBool::new(false);

/// Silence every console helper in this module (and spinners).
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print the application banner
pub fn print_banner(version: &str) {
    if is_quiet() {
        return;
    }
    println!();
    println!(
        "    {} {}",
        style("surveyfit").cyan().bold(),
        style(format!("v{}", version)).dim()
    );
    println!(
        "    {}",
        style("Clean, profile and model passenger survey data").dim()
    );
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Settings shown on the configuration card
pub struct ConfigCard<'a> {
    pub input: &'a Path,
    pub label: &'a str,
    pub output_dir: &'a Path,
    pub test_fraction: f64,
    pub seed: u64,
    pub scaling: &'a str,
}

/// Print configuration card
pub fn print_config(card: &ConfigCard<'_>) {
    if is_quiet() {
        return;
    }
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("Configuration").cyan().bold(),
        " ".repeat(box_width - 16)
    );
    println!("    ├{}┤", line);
    println!("    │  {} Input:  {:<39}│", FOLDER, truncate_path(card.input, 38));
    println!("    │  {} Label:  {:<39}│", TARGET, truncate_string(card.label, 38));
    println!("    │  {} Output: {:<39}│", SAVE, truncate_path(card.output_dir, 38));
    println!("    ├{}┤", line);
    println!(
        "    │  {} Test fraction: {:<32}│",
        DICE,
        style(format!("{:.2}", card.test_fraction)).yellow()
    );
    println!(
        "    │  {} Seed:          {:<32}│",
        DICE,
        style(card.seed).yellow()
    );
    println!(
        "    │  {} Scaling:       {:<32}│",
        DICE,
        style(card.scaling).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    if is_quiet() {
        return;
    }
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    if is_quiet() {
        return;
    }
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    if is_quiet() {
        return;
    }
    println!("    {} {}", INFO, message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    if is_quiet() {
        return;
    }
    println!("    {} {}", WARN, style(message).yellow());
}

/// Print a recorded notice at its level
pub fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Info => print_info(&notice.message),
        NoticeLevel::Warning => print_warning(&notice.message),
    }
}

/// Print the final completion message
pub fn print_completion(output_dir: &Path) {
    if is_quiet() {
        return;
    }
    println!();
    println!(
        "    {} {} {}",
        ROCKET,
        style("Analysis complete!").green().bold(),
        style(format!("Artifacts in {}", output_dir.display())).dim()
    );
    println!();
}

// Helper functions

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string_keeps_tail() {
        assert_eq!(truncate_string("short", 10), "short");
        let long = "a/very/long/path/to/titanic.csv";
        let cut = truncate_string(long, 14);
        assert_eq!(cut, "...titanic.csv");
        assert_eq!(cut.chars().count(), 14);
        assert!(cut.starts_with("...") && cut.ends_with("titanic.csv"));
    }
}
