//! Command handlers for the promptsmith CLI.

pub mod connection;
pub mod improve;
pub mod providers;
pub mod template;

pub use connection::ConnectionCommand;
pub use improve::{FrameworksCommand, ImproveCommand, RefineCommand};
pub use providers::ProvidersCommand;
pub use template::TemplateCommand;

use promptsmith_core::AppResult;
use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse a `key=value` argument.
pub(crate) fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", arg)),
    }
}
