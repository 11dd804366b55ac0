//! Shared output layer: every command prints through [`OutputMode`].
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--json` flag
//! 2. `FORMAT` env var: `"pretty"` | `"text"` | `"json"`
//! 3. `output` in the user config file
//! 4. [`OutputMode::Pretty`] if stdout is a TTY, [`OutputMode::Text`] if piped.

use orderdesk_core::error::ErrorCode;
use orderdesk_core::lock::LockError;
use orderdesk_core::OrderError;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use crate::project::ProjectError;

pub const PRETTY_RULE_WIDTH: usize = 60;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Heading followed by a rule.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Labelled sections for people at a terminal.
    Pretty,
    /// One tab-separated row per record, for pipes.
    Text,
    /// Stable JSON.
    Json,
}

impl OutputMode {
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some(Self::Pretty),
            "text" | "table" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

fn resolve_output_mode_inner(
    json_flag: bool,
    format_env: Option<&str>,
    user_output: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    if let Some(mode) = format_env.and_then(OutputMode::parse) {
        return mode;
    }
    if let Some(mode) = user_output.and_then(OutputMode::parse) {
        return mode;
    }
    if is_tty {
        OutputMode::Pretty
    } else {
        OutputMode::Text
    }
}

pub fn resolve_output_mode(json_flag: bool, user_output: Option<&str>) -> OutputMode {
    let env_val = std::env::var("FORMAT").ok();
    let is_tty = io::stdout().is_terminal();
    resolve_output_mode_inner(json_flag, env_val.as_deref(), user_output, is_tty)
}

/// A result type printable in every mode. JSON comes from `Serialize`.
pub trait Renderable: Serialize {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()>;

    /// One row, columns in [`Renderable::table_headers`] order.
    fn render_table(&self, w: &mut dyn Write) -> io::Result<()>;

    fn table_headers() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[]
    }
}

fn write_item<R: Renderable>(item: &R, mode: OutputMode, w: &mut dyn Write) -> anyhow::Result<()> {
    match mode {
        OutputMode::Pretty => item.render_human(w)?,
        OutputMode::Text => item.render_table(w)?,
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *w, item)?;
            writeln!(w)?;
        }
    }
    Ok(())
}

fn write_list<R: Renderable>(items: &[R], mode: OutputMode, w: &mut dyn Write) -> anyhow::Result<()> {
    match mode {
        OutputMode::Pretty => {
            for item in items {
                item.render_human(w)?;
            }
        }
        OutputMode::Text => {
            if !items.is_empty() && !R::table_headers().is_empty() {
                writeln!(w, "{}", R::table_headers().join("\t"))?;
            }
            for item in items {
                item.render_table(w)?;
            }
        }
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *w, items)?;
            writeln!(w)?;
        }
    }
    Ok(())
}

pub fn render_item<R: Renderable>(item: &R, mode: OutputMode) -> anyhow::Result<()> {
    write_item(item, mode, &mut io::stdout().lock())
}

pub fn render_list<R: Renderable>(items: &[R], mode: OutputMode) -> anyhow::Result<()> {
    write_list(items, mode, &mut io::stdout().lock())
}

/// Serialize in JSON mode, otherwise hand the value to `human_fn`.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if mode.is_json() {
        serde_json::to_writer_pretty(&mut out, value)?;
        writeln!(out)?;
    } else {
        human_fn(value, &mut out)?;
    }
    Ok(())
}

/// Error as printed on stderr.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    fn coded(message: String, code: ErrorCode) -> Self {
        Self {
            message,
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

impl From<&anyhow::Error> for CliError {
    fn from(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        for cause in err.chain() {
            if let Some(order) = cause.downcast_ref::<OrderError>() {
                return Self::coded(message, order.code());
            }
            if let Some(lock) = cause.downcast_ref::<LockError>() {
                return Self::coded(message, lock.code());
            }
            if let Some(project) = cause.downcast_ref::<ProjectError>() {
                return Self::coded(message, project.code());
            }
        }
        Self {
            message,
            suggestion: None,
            error_code: None,
        }
    }
}

fn write_error(mode: OutputMode, error: &CliError, w: &mut dyn Write) -> anyhow::Result<()> {
    if mode.is_json() {
        serde_json::to_writer_pretty(&mut *w, &serde_json::json!({ "error": error }))?;
        writeln!(w)?;
    } else {
        match &error.error_code {
            Some(code) => writeln!(w, "error[{code}]: {}", error.message)?,
            None => writeln!(w, "error: {}", error.message)?,
        }
        if let Some(suggestion) = &error.suggestion {
            writeln!(w, "  hint: {suggestion}")?;
        }
    }
    Ok(())
}

pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    write_error(mode, error, &mut io::stderr().lock())
}

/// Non-fatal problem, e.g. a failed best-effort push, on stderr.
pub fn render_warning(mode: OutputMode, message: &str) {
    if !mode.is_json() {
        eprintln!("warning: {message}");
    }
}

pub fn render_success(mode: OutputMode, message: &str) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if mode.is_json() {
        serde_json::to_writer_pretty(&mut out, &serde_json::json!({ "ok": true, "message": message }))?;
        writeln!(out)?;
    } else {
        writeln!(out, "✓ {message}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderdesk_core::{Collection, OrderId};

    #[derive(Serialize)]
    struct Row {
        name: &'static str,
        count: u32,
    }

    impl Renderable for Row {
        fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
            pretty_kv(w, self.name, self.count.to_string())
        }

        fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
            writeln!(w, "{}\t{}", self.name, self.count)
        }

        fn table_headers() -> &'static [&'static str] {
            &["NAME", "COUNT"]
        }
    }

    fn captured(f: impl FnOnce(&mut dyn Write) -> anyhow::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn json_flag_wins_over_everything() {
        assert_eq!(
            resolve_output_mode_inner(true, Some("text"), Some("pretty"), true),
            OutputMode::Json
        );
    }

    #[test]
    fn env_beats_user_config() {
        assert_eq!(
            resolve_output_mode_inner(false, Some("TEXT"), Some("json"), true),
            OutputMode::Text
        );
        assert_eq!(
            resolve_output_mode_inner(false, None, Some("json"), true),
            OutputMode::Json
        );
    }

    #[test]
    fn unknown_values_fall_through_to_tty() {
        assert_eq!(
            resolve_output_mode_inner(false, Some("fancy"), Some("loud"), true),
            OutputMode::Pretty
        );
        assert_eq!(
            resolve_output_mode_inner(false, None, None, false),
            OutputMode::Text
        );
    }

    #[test]
    fn list_text_mode_prints_header_once() {
        let rows = [Row { name: "a", count: 1 }, Row { name: "b", count: 2 }];
        let out = captured(|w| write_list(&rows, OutputMode::Text, w));
        assert_eq!(out, "NAME\tCOUNT\na\t1\nb\t2\n");
    }

    #[test]
    fn empty_list_text_mode_prints_nothing() {
        let rows: [Row; 0] = [];
        assert!(captured(|w| write_list(&rows, OutputMode::Text, w)).is_empty());
    }

    #[test]
    fn list_json_mode_is_an_array() {
        let rows = [Row { name: "a", count: 1 }];
        let out = captured(|w| write_list(&rows, OutputMode::Json, w));
        let value: serde_json::Value = serde_json::from_str(&out).expect("json");
        assert_eq!(value[0]["count"], 1);
    }

    #[test]
    fn item_pretty_mode_uses_labels() {
        let out = captured(|w| write_item(&Row { name: "orders", count: 3 }, OutputMode::Pretty, w));
        assert!(out.starts_with("orders:"));
        assert!(out.contains('3'));
    }

    #[test]
    fn order_errors_carry_code_and_hint() {
        let err = anyhow::Error::new(OrderError::NotFound {
            id: OrderId::from("42"),
            collection: Collection::Visible,
        })
        .context("failed to hide order");
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2002"));
        assert!(cli.suggestion.is_some());
        assert!(cli.message.contains("42"));
    }

    #[test]
    fn uncoded_errors_have_message_only() {
        let cli = CliError::from(&anyhow::anyhow!("boom"));
        assert_eq!(cli.message, "boom");
        assert!(cli.error_code.is_none());
    }

    #[test]
    fn error_rendering_matches_mode() {
        let err = CliError::coded("order 1 is not in the visible set".into(), ErrorCode::OrderNotFound);
        let human = captured(|w| write_error(OutputMode::Pretty, &err, w));
        assert!(human.starts_with("error[E2002]:"));
        assert!(human.contains("hint:"));

        let json = captured(|w| write_error(OutputMode::Json, &err, w));
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["error"]["error_code"], "E2002");
    }
}
