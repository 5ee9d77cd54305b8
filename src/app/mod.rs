pub mod cli;
pub mod handlers;

pub use cli::{cli_help_lines, parse_cli_verb, CliVerb};
pub use handlers::run_cli;
