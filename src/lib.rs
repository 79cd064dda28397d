//! SVG Gauge Library
//!
//! Animated radial gauges rendered as SVG, for monitoring dashboards.
//!
//! # Features
//!
//! - Semicircle, donut and differential (center-out) gauges
//! - Gradient or sector-based level colors, optional needle and target line
//! - Eased value transitions driven by an injectable clock
//! - Incremental appearance updates without a full redraw
//!
//! # Example
//!
//! ```
//! use svg_gauge::{Container, Gauge, GaugeOptions, SvgDocument};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = GaugeOptions {
//!         container: Some(Container::new("cpu")),
//!         value: Some(50.0),
//!         title: Some("CPU".into()),
//!         symbol: Some("%".into()),
//!         ..GaugeOptions::default()
//!     };
//!     let mut gauge = Gauge::new(options, SvgDocument::new())?;
//!
//!     // Jump past the start animation and export
//!     gauge.finish_animation();
//!     let svg = gauge.surface().to_svg();
//!     assert!(svg.contains("rgb(249,200,2)"));
//!
//!     // New reading; call tick() from your frame loop to animate it
//!     gauge.refresh(72.0, None, None, None)?;
//!     Ok(())
//! }
//! ```

pub mod animation;
pub mod color;
pub mod config;
pub mod error;
pub mod format;
pub mod gauge;
pub mod geometry;
pub mod surface;
pub mod utils;

// Re-exports for convenience
pub use animation::{Clock, Easing, ManualClock, SystemClock};
pub use config::{AnimationEndHook, Container, GaugeConfig, GaugeOptions, TextRenderer};
pub use error::{GaugeError, GaugeWarning, Result};
pub use gauge::Gauge;
pub use surface::{Surface, SvgDocument};
