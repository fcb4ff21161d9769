//! Output formatting for CLI commands.
//!
//! Semantic color theme:
//!   - Success:   green  (healthy, low scores)
//!   - Warning:   yellow (medium scores, suggestions)
//!   - Error:     red    (critical severities, high scores)
//!   - Reference: cyan   (system ids)
//!   - Emphasis:  bold   (section headers)

use colored::Colorize;
use serde::Serialize;
use std::env;
use std::io::{self, Write};

/// Output format selected by the global `--json` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Whether text output is colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Read color preference from the environment.
    ///
    /// `NO_COLOR` (any value) disables colors, as does `FAULTLINE_COLOR`
    /// set to "0" or "false".
    pub fn from_env() -> Self {
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("FAULTLINE_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);
        Self { use_colors }
    }
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(handle, "{json}")
}

/// Bold section header.
pub fn header(text: &str, config: OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

/// System id in cyan.
pub fn system_id(text: &str, config: OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.cyan().to_string()
}

/// Yellow text for suggestions and medium-risk values.
pub fn warning(text: &str, config: OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Color a score in `[0, 1]`: red from 0.7, yellow from 0.4, green below.
pub fn score(value: f64, config: OutputConfig) -> String {
    let text = format!("{value:.3}");
    if !config.use_colors {
        return text;
    }
    if value >= 0.7 {
        text.red().bold().to_string()
    } else if value >= 0.4 {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_output_without_colors() {
        let config = OutputConfig { use_colors: false };
        assert_eq!(score(0.71234, config), "0.712");
        assert_eq!(system_id("db", config), "db");
        assert_eq!(header("Impact", config), "Impact");
    }
}
