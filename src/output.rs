use serde::Serialize;
use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("INDEXLY_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

/// How command results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { OutputMode::Json } else { OutputMode::Human }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    ok: bool,
    command: &'a str,
    data: T,
}

/// Print a successful JSON envelope. Does nothing in human mode.
pub fn emit_success<T: Serialize>(mode: OutputMode, command: &str, data: T) -> anyhow::Result<()> {
    if mode.is_human() {
        return Ok(());
    }
    let envelope = Envelope { ok: true, command, data };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// Print a failed JSON envelope with an error message
pub fn emit_error(command: &str, message: &str) {
    let envelope = Envelope {
        ok: false,
        command,
        data: serde_json::json!({ "error": message }),
    };
    if let Ok(text) = serde_json::to_string_pretty(&envelope) {
        println!("{}", text);
    }
}
