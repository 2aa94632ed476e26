//! CLI command-name contract for logging.

use crate::cli::parse::Commands;

/// Command name string used in log records (e.g. "get", "set_batch").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Get { .. } => "get",
        Commands::Has { .. } => "has",
        Commands::List { .. } => "list",
        Commands::Set { .. } => "set",
        Commands::SetBatch { .. } => "set_batch",
        Commands::Unset { .. } => "unset",
        Commands::Lookup { .. } => "lookup",
        Commands::Property { .. } => "property",
        Commands::Check => "check",
        Commands::Config => "config",
    }
}

/// True for commands that write to the environment file.
pub fn is_mutation(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Set { .. } | Commands::SetBatch { .. } | Commands::Unset { .. }
    )
}
