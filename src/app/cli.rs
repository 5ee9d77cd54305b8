#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Run,
    Interactive,
    Listen,
    Validate,
    Commands,
    Enroll,
    Verify,
    ResetSpeaker,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "run" => CliVerb::Run,
        "interactive" => CliVerb::Interactive,
        "listen" => CliVerb::Listen,
        "validate" => CliVerb::Validate,
        "commands" => CliVerb::Commands,
        "enroll" => CliVerb::Enroll,
        "verify" => CliVerb::Verify,
        "reset-speaker" => CliVerb::ResetSpeaker,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  run <text>             Process one utterance from the command line".to_string(),
        "  interactive            Read utterances from stdin until EOF".to_string(),
        "  listen                 Continuous voice mode (capture + transcribe)".to_string(),
        "  validate               Compile the command source to commands.json".to_string(),
        "  commands               List registered command identifiers".to_string(),
        "  enroll                 Record one sample of the enrolled speaker".to_string(),
        "  verify                 Check the current speaker against enrollment".to_string(),
        "  reset-speaker          Discard the speaker model and its store".to_string(),
        "  help                   Show this help".to_string(),
        String::new(),
        "Flags:".to_string(),
        "  --config <path>        Settings file (default ~/.borealis/config.yaml)".to_string(),
        "  --registry <path>      Command source (default ~/.borealis/commands.txt)".to_string(),
        "  --auto-threshold <c>   Confidence needed to execute without asking".to_string(),
        "  --confirm-threshold <c> Confidence needed to ask instead of reject".to_string(),
        "  --verify-speaker       Require speaker verification in voice mode".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}
