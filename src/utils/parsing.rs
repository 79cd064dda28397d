//! Parsing utilities for CLI arguments.
//!
//! This module turns command-line strings into option overrides and metric
//! selections.

use serde_json::Value;

use crate::error::{GaugeError, Result};
use crate::utils::metrics::Metric;

// =============================================================================
// Option Assignment Parsing
// =============================================================================

/// Parse a `key=value` option override.
///
/// The value is read as JSON when it parses as JSON (numbers, booleans,
/// arrays, objects, `null`); anything else is taken as a plain string.
///
/// # Arguments
/// * `input` - Assignment such as `max=250` or `title=CPU`
///
/// # Returns
/// The camelCase option key and its JSON value.
///
/// # Example
/// ```
/// use svg_gauge::utils::parsing::parse_assignment;
/// use serde_json::json;
///
/// let (key, value) = parse_assignment("levelColors=[\"#000000\"]").unwrap();
/// assert_eq!(key, "levelColors");
/// assert_eq!(value, json!(["#000000"]));
///
/// let (_, value) = parse_assignment("title=CPU load").unwrap();
/// assert_eq!(value, json!("CPU load"));
/// ```
pub fn parse_assignment(input: &str) -> Result<(String, Value)> {
    let (key, raw) = input.split_once('=').ok_or_else(|| {
        GaugeError::InvalidConfig(format!("Expected key=value, got '{}'", input))
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(GaugeError::InvalidConfig(format!(
            "Missing option name in '{}'",
            input
        )));
    }

    let value = serde_json::from_str(raw.trim()).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

// =============================================================================
// Metric Parsing
// =============================================================================

/// Parse a metric name into a [`Metric`].
///
/// # Arguments
/// * `name` - "cpu", "memory"/"mem"/"ram", or "temp"/"temperature"
pub fn parse_metric(name: &str) -> Result<Metric> {
    match name.to_lowercase().as_str() {
        "cpu" => Ok(Metric::Cpu),
        "memory" | "mem" | "ram" => Ok(Metric::Memory),
        "temp" | "temperature" => Ok(Metric::Temperature),
        _ => Err(GaugeError::InvalidConfig(format!(
            "Unknown metric '{}'. Use: cpu, memory, or temp",
            name
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_assignment_numbers_and_flags() {
        assert_eq!(parse_assignment("max=250").unwrap(), ("max".into(), json!(250)));
        assert_eq!(parse_assignment("donut=true").unwrap(), ("donut".into(), json!(true)));
        assert_eq!(parse_assignment(" gaugeWidthScale = 0.5").unwrap().1, json!(0.5));
    }

    #[test]
    fn test_parse_assignment_strings() {
        assert_eq!(parse_assignment("symbol=%").unwrap().1, json!("%"));
        assert_eq!(parse_assignment("gaugeColor=#333333").unwrap().1, json!("#333333"));
        // Only the first '=' splits
        assert_eq!(parse_assignment("label=a=b").unwrap().1, json!("a=b"));
    }

    #[test]
    fn test_parse_assignment_invalid() {
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=5").is_err());
    }

    #[test]
    fn test_parse_metric() {
        assert_eq!(parse_metric("CPU").unwrap(), Metric::Cpu);
        assert_eq!(parse_metric("ram").unwrap(), Metric::Memory);
        assert_eq!(parse_metric("temperature").unwrap(), Metric::Temperature);
        assert!(parse_metric("disk").is_err());
    }
}
