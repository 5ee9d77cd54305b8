#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read command source {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: missing `=` separator")]
    MissingSeparator { line: usize },
    #[error("line {line}: invalid command id `{identifier}`: {reason}")]
    InvalidIdentifier {
        line: usize,
        identifier: String,
        reason: String,
    },
    #[error("line {line}: duplicate command id `{identifier}`")]
    DuplicateIdentifier { line: usize, identifier: String },
    #[error("line {line}: empty command for `{identifier}`")]
    EmptyCommand { line: usize, identifier: String },
    #[error("line {line}: forbidden shell token `{token}` in command `{command_line}`")]
    ForbiddenToken {
        line: usize,
        token: &'static str,
        command_line: String,
    },
    #[error("line {line}: command is not shell-tokenizable: {reason}")]
    Tokenize { line: usize, reason: String },
    #[error("no command entries found in source")]
    Empty,
    #[error("failed to write compiled registry {path}: {source}")]
    WriteCompiled {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode compiled registry {path}: {source}")]
    EncodeCompiled {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid json in compiled registry {path}: {source}")]
    ParseCompiled {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("compiled registry entry `{identifier}` failed validation: {reason}")]
    CompiledEntry { identifier: String, reason: String },
}
