//! Display text for the value, min and max labels.

use crate::config::{GaugeConfig, MAX_DECIMALS};

/// Magnitude suffixes for human-friendly numbers; the first slot is unitless.
const MAGNITUDE_SUFFIXES: [&str; 7] = ["", "K", "M", "G", "T", "P", "E"];

/// Which gauge label a piece of text is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Value,
    Min,
    Max,
}

/// Shortest plain representation of a number (`100`, `0.5`, `-12.25`).
pub fn plain_number(value: f64) -> String {
    if value == 0.0 {
        // Avoid "-0"
        return "0".to_string();
    }
    format!("{}", value)
}

/// Fixed-decimal formatting with ties rounded away from zero.
/// `decimals` is capped at [`MAX_DECIMALS`].
pub fn to_fixed(value: f64, decimals: usize) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    format!("{:.*}", decimals, rounded)
}

/// Scale a number down by powers of 1000 and tag it with a magnitude suffix.
///
/// # Example
/// ```
/// use svg_gauge::format::human_friendly;
///
/// assert_eq!(human_friendly(999.0, 0), "999");
/// assert_eq!(human_friendly(1000.0, 0), "1K");
/// assert_eq!(human_friendly(1_500_000.0, 1), "1.5M");
/// ```
pub fn human_friendly(value: f64, decimals: usize) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    let mut n = value;
    let mut magnitude = 0;
    while (n >= 1000.0 || n <= -1000.0) && magnitude + 1 < MAGNITUDE_SUFFIXES.len() {
        n /= 1000.0;
        magnitude += 1;
    }

    let factor = 10f64.powi(decimals as i32);
    let rounded = (n * factor + 0.5).floor() / factor;
    format!("{}{}", plain_number(rounded), MAGNITUDE_SUFFIXES[magnitude])
}

/// Insert thousands separators into the integer part of a formatted number.
pub fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Format a number for one of the gauge labels, ignoring the custom renderer.
pub fn format_display_text(value: f64, config: &GaugeConfig, kind: TextKind) -> String {
    let override_text = match kind {
        TextKind::Min => config.min_txt.as_deref(),
        TextKind::Max => config.max_txt.as_deref(),
        TextKind::Value => None,
    };
    if let Some(text) = override_text.filter(|t| !t.is_empty()) {
        return text.to_string();
    }

    let symbol = if kind == TextKind::Value {
        config.symbol.as_str()
    } else {
        ""
    };

    if config.human_friendly {
        format!(
            "{}{}",
            human_friendly(value, config.human_friendly_decimal),
            symbol
        )
    } else if config.format_number {
        let digits = match kind {
            TextKind::Value => to_fixed(value, config.decimals),
            _ => plain_number(value),
        };
        format!("{}{}", group_thousands(&digits), symbol)
    } else if kind == TextKind::Value && config.display_remaining {
        format!("{}{}", to_fixed(config.max - value, config.decimals), symbol)
    } else if kind == TextKind::Value {
        format!("{}{}", to_fixed(value, config.decimals), symbol)
    } else {
        plain_number(value)
    }
}

/// Format the value label, giving the custom renderer the first word.
pub fn format_value(value: f64, config: &GaugeConfig) -> String {
    if let Some(rendered) = config
        .text_renderer
        .as_ref()
        .and_then(|renderer| renderer.render(value))
    {
        return rendered;
    }
    format_display_text(value, config, TextKind::Value)
}
