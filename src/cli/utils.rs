use serde_json::{json, Value};

use crate::auth::{IssueError, VerifyError};
use crate::cli::OutputFormat;
use crate::config::ConfigError;
use crate::mail::MailError;
use crate::services::DispatchError;

/// Output a success message in the appropriate format. In text mode the
/// `primary` value goes to stdout on its own line so it can be piped.
pub fn output_success(
    output_format: OutputFormat,
    message: &str,
    primary: &str,
    data: Value,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Value::Object(extra)) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("✓ {}", message);
            println!("{}", primary);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: OutputFormat,
    message: &str,
    error_code: Option<&str>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Machine-readable code for the errors the CLI knows how to classify.
pub fn error_code(err: &anyhow::Error) -> Option<&'static str> {
    if err.is::<ConfigError>() {
        Some("CONFIG_ERROR")
    } else if err.is::<VerifyError>() {
        Some("INVALID_TOKEN")
    } else if let Some(issue) = err.downcast_ref::<IssueError>() {
        Some(match issue {
            IssueError::EmptyEmail => "EMPTY_EMAIL",
            _ => "TOKEN_ISSUE_FAILED",
        })
    } else if err.is::<DispatchError>() || err.is::<MailError>() {
        Some("MAIL_FAILED")
    } else {
        None
    }
}
