use super::parse::find_forbidden_token;
use super::{CommandEntry, DangerLevel, Registry, RegistryError};
use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::ids::CommandId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// On-disk form of one registry entry. Field names match the document layout
/// consumed by downstream tooling: `{"cmd": "...", "danger": "unknown"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompiledEntry {
    pub cmd: String,
    pub danger: DangerLevel,
}

pub fn compile_to_path(registry: &Registry, path: &Path) -> Result<(), RegistryError> {
    let document: BTreeMap<&str, CompiledEntry> = registry
        .entries
        .iter()
        .map(|(id, entry)| {
            (
                id.as_str(),
                CompiledEntry {
                    cmd: entry.command_line.clone(),
                    danger: entry.danger_level,
                },
            )
        })
        .collect();
    let encoded =
        serde_json::to_vec_pretty(&document).map_err(|source| RegistryError::EncodeCompiled {
            path: path.display().to_string(),
            source,
        })?;
    atomic_write_file(path, &encoded).map_err(|source| RegistryError::WriteCompiled {
        path: path.display().to_string(),
        source,
    })
}

/// Load the compiled JSON form. Every entry is re-validated exactly as the
/// declarative source would be; the compiled document is a cache, not a way
/// around the safety validator.
pub fn load_compiled(path: &Path) -> Result<Registry, RegistryError> {
    let raw = fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let document: BTreeMap<String, CompiledEntry> =
        serde_json::from_str(&raw).map_err(|source| RegistryError::ParseCompiled {
            path: path.display().to_string(),
            source,
        })?;

    let mut entries: BTreeMap<CommandId, CommandEntry> = BTreeMap::new();
    for (identifier, compiled) in document {
        let id = CommandId::parse(&identifier).map_err(|reason| RegistryError::CompiledEntry {
            identifier: identifier.clone(),
            reason,
        })?;
        let command_line = compiled.cmd.trim().to_string();
        if command_line.is_empty() {
            return Err(RegistryError::CompiledEntry {
                identifier,
                reason: "empty command".to_string(),
            });
        }
        if let Some(token) = find_forbidden_token(&command_line) {
            return Err(RegistryError::CompiledEntry {
                identifier,
                reason: format!("forbidden shell token `{token}`"),
            });
        }
        let argv = shell_words::split(&command_line).map_err(|err| RegistryError::CompiledEntry {
            identifier: identifier.clone(),
            reason: format!("not shell-tokenizable: {err}"),
        })?;
        if argv.is_empty() {
            return Err(RegistryError::CompiledEntry {
                identifier,
                reason: "empty command".to_string(),
            });
        }
        entries.insert(
            id,
            CommandEntry {
                command_line,
                argv,
                danger_level: compiled.danger,
            },
        );
    }

    if entries.is_empty() {
        return Err(RegistryError::Empty);
    }
    Ok(Registry { entries })
}
