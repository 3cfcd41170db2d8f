//! Interactive and one-shot front ends over a [`ScriptHost`].

use std::io::{BufRead, Write};

use scriptdev_types::{ScriptArgs, Variant};

use crate::host::{HostError, ScriptHost};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ArgError {
    #[error("Expected NAME=VALUE, got '{0}'")]
    MissingValue(String),

    #[error("Argument name '{0}' is not a valid identifier")]
    InvalidName(String),
}

/// Parse a `NAME=VALUE` command-line argument.
pub fn parse_arg(text: &str) -> Result<(String, Variant), ArgError> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| ArgError::MissingValue(text.to_string()))?;
    let name = name.trim();

    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ArgError::InvalidName(name.to_string()));
    }

    Ok((name.to_string(), parse_value(value)))
}

/// Interpret literal text as the narrowest matching value: integer, then
/// float, then boolean, otherwise string. Surrounding quotes force a string.
pub fn parse_value(text: &str) -> Variant {
    let trimmed = text.trim();

    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return Variant::String(trimmed[1..trimmed.len() - 1].to_string());
        }
    }

    if let Ok(l) = trimmed.parse::<i64>() {
        return Variant::Long(l);
    }
    if let Ok(u) = trimmed.parse::<u64>() {
        return Variant::Unsigned(u);
    }
    if let Ok(d) = trimmed.parse::<f64>() {
        return Variant::Double(d);
    }
    match trimmed {
        "true" | "True" => Variant::Bool(true),
        "false" | "False" => Variant::Bool(false),
        _ => Variant::String(text.to_string()),
    }
}

/// Collect `NAME=VALUE` arguments into a binding map.
pub fn parse_args<'a>(items: impl IntoIterator<Item = &'a str>) -> Result<ScriptArgs, ArgError> {
    items.into_iter().map(parse_arg).collect()
}

/// Render an outcome for the terminal, as plain text or one JSON object.
pub fn format_result(result: &Result<Variant, HostError>, json: bool) -> String {
    match (result, json) {
        (Ok(value), false) => value.to_string(),
        (Err(e), false) => format!("error: {}", e),
        (Ok(value), true) => serde_json::json!({ "result": value }).to_string(),
        (Err(e), true) => serde_json::json!({ "error": e.to_string() }).to_string(),
    }
}

/// Read scripts line by line, run each through the pool, and print each
/// outcome. Blank lines and `#` comments are skipped; `exit` or `quit` ends
/// the session. Returns the number of scripts that failed.
pub fn run_shell<R, W>(host: &ScriptHost, input: R, mut output: W, json: bool) -> std::io::Result<usize>
where
    R: BufRead,
    W: Write,
{
    let mut failures = 0;

    for line in input.lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        if text == "exit" || text == "quit" {
            break;
        }

        let result = host.run(text, ScriptArgs::new());
        if result.is_err() {
            failures += 1;
        }
        writeln!(output, "{}", format_result(&result, json))?;
        output.flush()?;
    }

    tracing::debug!("[shell] Input ended with {} failures", failures);
    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScriptDevConfig;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), Variant::Long(42));
        assert_eq!(parse_value("-3"), Variant::Long(-3));
        assert_eq!(parse_value("18446744073709551615"), Variant::Unsigned(u64::MAX));
        assert_eq!(parse_value("2.5"), Variant::Double(2.5));
        assert_eq!(parse_value("true"), Variant::Bool(true));
        assert_eq!(parse_value("False"), Variant::Bool(false));
        assert_eq!(parse_value("pump"), Variant::from("pump"));
        assert_eq!(parse_value("\"42\""), Variant::from("42"));
        assert_eq!(parse_value("'x y'"), Variant::from("x y"));
    }

    #[test]
    fn test_parse_arg() {
        assert_eq!(
            parse_arg("gain=1.5"),
            Ok(("gain".to_string(), Variant::Double(1.5)))
        );
        assert_eq!(
            parse_arg("label=a=b"),
            Ok(("label".to_string(), Variant::from("a=b")))
        );
        assert_eq!(
            parse_arg("novalue"),
            Err(ArgError::MissingValue("novalue".to_string()))
        );
        assert_eq!(
            parse_arg("1x=2"),
            Err(ArgError::InvalidName("1x".to_string()))
        );
    }

    #[test]
    fn test_parse_args() {
        let args = parse_args(["a=1", "b=two"]).unwrap();
        assert_eq!(args.get("a"), Some(&Variant::Long(1)));
        assert_eq!(args.get("b"), Some(&Variant::from("two")));
        assert!(parse_args(["ok=1", "bad"]).is_err());
    }

    #[test]
    fn test_format_result() {
        assert_eq!(format_result(&Ok(Variant::Long(3)), false), "3");
        assert_eq!(
            format_result(&Ok(Variant::Long(3)), true),
            r#"{"result":{"kind":"long","value":3}}"#
        );
        assert_eq!(
            format_result(&Err(HostError::Rejected), false),
            "error: Worker pool rejected the task"
        );
    }

    #[test]
    fn test_shell_session() {
        let host = ScriptHost::start(ScriptDevConfig {
            num_threads: 2,
            poll_interval_ms: 20,
            ..Default::default()
        })
        .unwrap();

        let input = "# comment\nlet total = 10;\n\ntotal + 5\n1 +\nexit\n99\n";
        let mut output = Vec::new();
        let failures = run_shell(&host, input.as_bytes(), &mut output, false).unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(failures, 1);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "None");
        assert_eq!(lines[1], "15");
        assert!(lines[2].starts_with("error: Session error: Syntax error"));
    }
}
