/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const MAGENTA: &str = "\x1b[35m";

/// Presence color: inside → green, outside → red, unknown → grey.
pub fn color_for_inside(inside: Option<bool>) -> &'static str {
    match inside {
        Some(true) => GREEN,
        Some(false) => RED,
        None => GREY,
    }
}

/// Compliance color: ≥ 90% green, ≥ 60% yellow, below red, unknown grey.
pub fn color_for_percent(p: Option<u32>) -> &'static str {
    match p {
        Some(v) if v >= 90 => GREEN,
        Some(v) if v >= 60 => YELLOW,
        Some(_) => RED,
        None => GREY,
    }
}

pub fn colorize(value: &str, color: &str) -> String {
    format!("{color}{value}{RESET}")
}
