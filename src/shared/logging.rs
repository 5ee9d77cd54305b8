use chrono::{SecondsFormat, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn session_log_path(state_root: &Path) -> PathBuf {
    state_root.join("logs/session.log")
}

pub fn append_session_log_line(state_root: &Path, line: &str) -> std::io::Result<()> {
    let path = session_log_path(state_root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    writeln!(file, "{stamp} {line}")
}

/// Best-effort variant for audit lines on hot paths. A failed log write must
/// never abort utterance processing.
pub fn append_session_log_best_effort(state_root: &Path, line: &str) {
    let _ = append_session_log_line(state_root, line);
}
