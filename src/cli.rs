//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to the environment store.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, is_mutation};
pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{format_check_result, format_env, format_value, format_written};
pub use route::RunContext;
