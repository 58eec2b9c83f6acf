use std::io::{self, BufRead, Read, Write};

use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::error::ClientError;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            match data {
                Some(Value::Object(fields)) => {
                    if let Some(object) = response.as_object_mut() {
                        object.extend(fields);
                    }
                }
                Some(other) => response["data"] = other,
                None => {}
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a raw backend payload
pub fn output_value(output_format: &OutputFormat, value: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "success": true, "data": value }))?);
        }
        OutputFormat::Text => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}

/// Report a client failure, with a login hint when the session is gone
pub fn output_client_error(output_format: &OutputFormat, error: &ClientError) -> anyhow::Result<()> {
    let redirect = error.redirect_target().map(|route| route.path());

    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": error.user_message(),
                "detail": error.to_string(),
            });

            if let Some(path) = redirect {
                response["redirect"] = json!(path);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", error.user_message());
            if let Some(path) = redirect {
                eprintln!("Log in again (portf auth login) to continue; the web app sends you to {}", path);
            }
        }
    }
    Ok(())
}

/// Prompt on stderr and read one line from stdin, without the newline
pub fn read_line(prompt: &str) -> anyhow::Result<String> {
    eprint!("{}", prompt);
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Use the provided secret or prompt for it
pub fn secret_or_prompt(provided: Option<String>, prompt: &str) -> anyhow::Result<String> {
    match provided {
        Some(secret) => Ok(secret),
        None => read_line(prompt),
    }
}

/// Read a JSON document from stdin
pub fn read_json_stdin() -> anyhow::Result<Value> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    if buffer.trim().is_empty() {
        anyhow::bail!("expected a JSON document on stdin");
    }

    serde_json::from_str(&buffer).map_err(|e| anyhow::anyhow!("invalid JSON on stdin: {}", e))
}
