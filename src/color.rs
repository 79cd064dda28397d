//! Level color selection.
//!
//! Maps a gauge value (or its fraction of the range) to a fill color, either
//! by blending between evenly spaced gradient stops or by looking the value up
//! in an explicit list of colored sectors.

use serde::{Deserialize, Serialize};

use crate::error::{GaugeError, Result};

/// Default gradient stops: green, amber, red.
pub const DEFAULT_LEVEL_COLORS: [&str; 3] = ["#a9d70b", "#f9c802", "#ff0000"];

// =============================================================================
// Rgb
// =============================================================================

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear blend towards `other`; channels are floored like the rest of the
    /// gauge's color math.
    fn blend(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 * (1.0 - t) + b as f64 * t).floor() as u8;
        Rgb::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
        )
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// Parse a hex color string into an [`Rgb`].
///
/// Accepts `#rgb`, `#rrggbb`, and the same forms without the leading `#`.
///
/// # Example
/// ```
/// use svg_gauge::color::{parse_hex_color, Rgb};
///
/// assert_eq!(parse_hex_color("#f9c802").unwrap(), Rgb::new(249, 200, 2));
/// assert_eq!(parse_hex_color("fff").unwrap(), Rgb::new(255, 255, 255));
/// ```
pub fn parse_hex_color(hex: &str) -> Result<Rgb> {
    let digits = hex.trim_start_matches('#');
    let invalid = || GaugeError::InvalidConfig(format!("Invalid color hex: {}", hex));

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    match digits.len() {
        3 => {
            let channel = |i: usize| {
                u8::from_str_radix(&digits[i..i + 1], 16)
                    .map(|v| v * 17)
                    .map_err(|_| invalid())
            };
            Ok(Rgb::new(channel(0)?, channel(1)?, channel(2)?))
        }
        6 => {
            let channel =
                |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
            Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
        }
        _ => Err(invalid()),
    }
}

/// Strict check used for color-typed options: `#` followed by 3 or 6 hex digits.
pub fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(digits) => {
            (digits.len() == 3 || digits.len() == 6)
                && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

// =============================================================================
// Sectors
// =============================================================================

/// A sub-range of the gauge domain painted with one fixed color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub lo: f64,
    pub hi: f64,
    pub color: String,
}

/// Explicit color-by-range table that overrides the gradient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomSectors {
    /// When set, `lo`/`hi` are percentages of the range instead of raw values.
    #[serde(default)]
    pub percents: bool,
    #[serde(default)]
    pub ranges: Vec<Sector>,
}

impl CustomSectors {
    pub fn is_active(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// First declared range containing `probe` (inclusive bounds).
    fn lookup(&self, probe: f64) -> Option<&Sector> {
        self.ranges.iter().find(|s| probe >= s.lo && probe <= s.hi)
    }
}

/// Build the static sector list drawn when `showSectorColors` is enabled.
///
/// Ranges are returned as fractions of `(max - min)`, already mirrored when the
/// gauge is reversed.
pub fn static_sectors(
    min: f64,
    max: f64,
    level_colors: &[String],
    custom: &CustomSectors,
    reverse: bool,
) -> Vec<Sector> {
    let span = max - min;
    let sectors: Vec<Sector> = if custom.is_active() {
        custom
            .ranges
            .iter()
            .map(|range| {
                let (lo, hi) = if custom.percents {
                    (range.lo / 100.0, range.hi / 100.0)
                } else {
                    ((range.lo - min) / span, (range.hi - min) / span)
                };
                Sector {
                    lo,
                    hi,
                    color: range.color.clone(),
                }
            })
            .collect()
    } else {
        let inc = 1.0 / level_colors.len() as f64;
        level_colors
            .iter()
            .enumerate()
            .map(|(i, color)| Sector {
                lo: i as f64 * inc,
                hi: (i + 1) as f64 * inc,
                color: color.clone(),
            })
            .collect()
    };

    if !reverse {
        return sectors;
    }

    sectors
        .into_iter()
        .map(|s| Sector {
            lo: 1.0 - s.hi,
            hi: 1.0 - s.lo,
            color: s.color,
        })
        .collect()
}

// =============================================================================
// Color Lookup
// =============================================================================

/// Pick the fill color for a value.
///
/// # Arguments
/// * `value` - Raw (clamped) value
/// * `pct` - Fraction of the range, 0.0 to 1.0
/// * `stops` - Level color stops (hex strings)
/// * `no_gradient` - Return the nearest upper stop instead of blending
/// * `custom` - Explicit sector table; a match returns its color verbatim
///
/// # Returns
/// Either a custom sector color as written, the single stop as written, or a
/// computed `rgb(r,g,b)` string.
pub fn color_for(
    value: f64,
    pct: f64,
    stops: &[String],
    no_gradient: bool,
    custom: &CustomSectors,
) -> String {
    let no_gradient = no_gradient || custom.is_active();

    if custom.is_active() {
        let probe = if custom.percents { pct * 100.0 } else { value };
        if let Some(sector) = custom.lookup(probe) {
            return sector.color.clone();
        }
    }

    match stops {
        [] => return DEFAULT_LEVEL_COLORS[0].to_string(),
        [only] => return only.clone(),
        _ => {}
    }

    let count = stops.len() as f64;
    let inc = if no_gradient {
        1.0 / count
    } else {
        1.0 / (count - 1.0)
    };

    let anchors: Vec<(f64, Rgb)> = stops
        .iter()
        .enumerate()
        .map(|(i, stop)| {
            let position = if no_gradient {
                inc * (i + 1) as f64
            } else {
                inc * i as f64
            };
            (position, parse_hex_color(stop).unwrap_or(Rgb::BLACK))
        })
        .collect();

    if pct == 0.0 {
        return anchors[0].1.to_string();
    }

    for (j, &(position, color)) in anchors.iter().enumerate() {
        if pct <= position {
            if no_gradient {
                return color.to_string();
            }
            let (lower_pos, lower) = anchors[j.saturating_sub(1)];
            let range = position - lower_pos;
            if range == 0.0 {
                return color.to_string();
            }
            let t = (pct - lower_pos) / range;
            return lower.blend(color, t).to_string();
        }
    }

    // Rounding can leave the last anchor a hair below 1.0
    anchors[anchors.len() - 1].1.to_string()
}
