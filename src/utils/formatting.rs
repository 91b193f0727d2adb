//! Formatting utilities used for CLI and export outputs.

/// Hours with two decimals, e.g. `7.50h`.
pub fn hours2readable(hours: f64) -> String {
    format!("{:.2}h", hours)
}

/// Tri-state presence flag: `None` means "no data", not "outside".
pub fn describe_inside(inside: Option<bool>) -> &'static str {
    match inside {
        Some(true) => "inside",
        Some(false) => "outside",
        None => "--",
    }
}

pub fn describe_percent(p: Option<u32>) -> String {
    match p {
        Some(v) => format!("{v}%"),
        None => "--".to_string(),
    }
}
