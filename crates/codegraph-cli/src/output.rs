//! Render a command's serializable result to stdout in the requested format.

use serde::Serialize;

use crate::cli::OutputFormat;

/// Print `value` as pretty-printed JSON (`Json`) or as `{:#?}`-style debug
/// output (`Pretty`) — this binary has no interactive table renderer, its
/// results are consumed by scripts or read directly by an operator.
pub fn emit<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Pretty => {
            let json = serde_json::to_value(value)?;
            println!("{}", to_pretty_lines(&json, 0).join("\n"));
        }
    }
    Ok(())
}

fn to_pretty_lines(value: &serde_json::Value, indent: usize) -> Vec<String> {
    let pad = "  ".repeat(indent);
    match value {
        serde_json::Value::Object(map) => {
            let mut lines = Vec::new();
            for (key, val) in map {
                match val {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        lines.push(format!("{pad}{key}:"));
                        lines.extend(to_pretty_lines(val, indent + 1));
                    }
                    other => lines.push(format!("{pad}{key}: {}", scalar(other))),
                }
            }
            lines
        }
        serde_json::Value::Array(items) => {
            if items.is_empty() {
                return vec![format!("{pad}(none)")];
            }
            let mut lines = Vec::new();
            for (i, item) in items.iter().enumerate() {
                lines.push(format!("{pad}[{i}]"));
                lines.extend(to_pretty_lines(item, indent + 1));
            }
            lines
        }
        other => vec![format!("{pad}{}", scalar(other))],
    }
}

fn scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
