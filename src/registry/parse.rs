use super::{CommandEntry, DangerLevel, Registry, RegistryError};
use crate::shared::ids::CommandId;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Syntactic denylist, not a shell grammar. A command line containing any of
/// these is rejected outright; everything else still goes through quoting-aware
/// word splitting before it is accepted. This does not defend against every
/// shell-escaping trick. The executor never invokes a shell, which is the
/// actual containment.
///
/// `&&` and `||` are listed before `|` so compound operators are reported as
/// themselves rather than as their substring.
pub const FORBIDDEN_TOKENS: &[&str] = &[";", "&&", "||", "|", "`", "$(", ">", "<"];

pub fn find_forbidden_token(command_line: &str) -> Option<&'static str> {
    FORBIDDEN_TOKENS
        .iter()
        .find(|token| command_line.contains(*token))
        .copied()
}

pub fn load_source(path: &Path) -> Result<Registry, RegistryError> {
    let raw = fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_source(&raw)
}

/// Parse the declarative `identifier = command-line` source. Any per-line
/// failure aborts the whole load with a line-numbered diagnostic.
pub fn parse_source(raw: &str) -> Result<Registry, RegistryError> {
    let mut entries: BTreeMap<CommandId, CommandEntry> = BTreeMap::new();

    for (index, raw_line) in raw.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((lhs, rhs)) = trimmed.split_once('=') else {
            return Err(RegistryError::MissingSeparator { line });
        };
        let identifier = lhs.trim();
        let command_line = rhs.trim();

        let id = CommandId::parse(identifier).map_err(|reason| {
            RegistryError::InvalidIdentifier {
                line,
                identifier: identifier.to_string(),
                reason,
            }
        })?;
        if entries.contains_key(&id) {
            return Err(RegistryError::DuplicateIdentifier {
                line,
                identifier: identifier.to_string(),
            });
        }
        if command_line.is_empty() {
            return Err(RegistryError::EmptyCommand {
                line,
                identifier: identifier.to_string(),
            });
        }
        if let Some(token) = find_forbidden_token(command_line) {
            return Err(RegistryError::ForbiddenToken {
                line,
                token,
                command_line: command_line.to_string(),
            });
        }
        let argv = shell_words::split(command_line).map_err(|err| RegistryError::Tokenize {
            line,
            reason: err.to_string(),
        })?;
        if argv.is_empty() {
            return Err(RegistryError::EmptyCommand {
                line,
                identifier: identifier.to_string(),
            });
        }

        entries.insert(
            id,
            CommandEntry {
                command_line: command_line.to_string(),
                argv,
                danger_level: DangerLevel::Unknown,
            },
        );
    }

    if entries.is_empty() {
        return Err(RegistryError::Empty);
    }
    Ok(Registry { entries })
}
