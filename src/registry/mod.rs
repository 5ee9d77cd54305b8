mod compiled;
mod error;
mod parse;

pub use compiled::{compile_to_path, load_compiled, CompiledEntry};
pub use error::RegistryError;
pub use parse::{find_forbidden_token, load_source, parse_source, FORBIDDEN_TOKENS};

use crate::shared::ids::CommandId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved for a future allow/confirm/deny policy keyed on command risk.
/// Nothing consults it yet; every entry carries `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DangerLevel {
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    /// Original right-hand side of the source line, kept verbatim for the
    /// compiled form and for display.
    pub command_line: String,
    /// Quoting-aware word split of `command_line`. Always non-empty. This is
    /// what the executor runs; the string form is never re-parsed at spawn
    /// time.
    pub argv: Vec<String>,
    pub danger_level: DangerLevel,
}

/// The validated command mapping. Immutable after load; anything absent from
/// it can never be executed, regardless of what a classifier predicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    pub(crate) entries: BTreeMap<CommandId, CommandEntry>,
}

impl Registry {
    pub fn get(&self, id: &str) -> Option<&CommandEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted identifiers, for help output and diagnostics.
    pub fn list_commands(&self) -> Vec<&str> {
        self.entries.keys().map(|id| id.as_str()).collect()
    }
}
