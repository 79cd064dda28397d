//! Gauge configuration: caller options, resolution and defaults.
//!
//! Options arrive as a [`GaugeOptions`] document (usually deserialized from
//! JSON with camelCase keys). Resolution layers, highest priority first:
//!
//! 1. per-element overrides from the container's `dataset`
//! 2. fields set explicitly on the options
//! 3. the options' own `defaults` block
//! 4. the documented defaults below
//!
//! The result is a validated [`GaugeConfig`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::animation::{AnimationSpec, Easing};
use crate::color::{CustomSectors, DEFAULT_LEVEL_COLORS};
use crate::error::{GaugeError, Result};
use crate::surface::ShadowStyle;

// =============================================================================
// Config Path
// =============================================================================

const APP_NAME: &str = "svg-gauge";
const CONFIG_FILE: &str = "gauge.json";

/// Get the configuration directory path.
/// - Linux: ~/.config/svg-gauge/
/// - Windows: %APPDATA%\svg-gauge\
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(APP_NAME))
        .ok_or_else(|| GaugeError::InvalidConfig("Could not find config directory".into()))
}

/// Get the full path to the default gauge options file.
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Load gauge options from a JSON file.
pub fn load_options(path: &Path) -> Result<GaugeOptions> {
    let content = std::fs::read_to_string(path)?;
    let options = serde_json::from_str(&content)?;
    log::debug!("Loaded gauge options from {}", path.display());
    Ok(options)
}

// =============================================================================
// Documented Defaults
// =============================================================================

pub const DEFAULT_MIN: f64 = 0.0;
pub const DEFAULT_MAX: f64 = 100.0;
pub const DEFAULT_GAUGE_COLOR: &str = "#edebeb";
pub const DEFAULT_VALUE_FONT_COLOR: &str = "#010101";
pub const DEFAULT_LABEL_FONT_COLOR: &str = "#b3b3b3";
pub const DEFAULT_TITLE_FONT_COLOR: &str = "#999999";
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const DEFAULT_TARGET_LINE_COLOR: &str = "#000000";
pub const DEFAULT_TARGET_LINE_WIDTH: f64 = 1.5;
/// Animation length in milliseconds for both start and refresh.
pub const DEFAULT_ANIMATION_MS: f64 = 700.0;
pub const DEFAULT_ANIMATION_TYPE: &str = ">";
pub const DEFAULT_DONUT_START_ANGLE: f64 = 90.0;
pub const DEFAULT_WIDTH: f64 = 200.0;
pub const DEFAULT_HEIGHT: f64 = 100.0;
/// Upper bound for `decimals` and `humanFriendlyDecimal`.
pub const MAX_DECIMALS: usize = 20;

// =============================================================================
// Callbacks
// =============================================================================

/// Custom value renderer. Returning `None` means "no value": fall back to
/// the built-in formatting.
#[derive(Clone)]
pub struct TextRenderer(Rc<dyn Fn(f64) -> Option<String>>);

impl TextRenderer {
    pub fn new(f: impl Fn(f64) -> Option<String> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn render(&self, value: f64) -> Option<String> {
        (self.0)(value)
    }
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TextRenderer(..)")
    }
}

/// Hook fired once every time an animation reaches its terminal value.
#[derive(Clone)]
pub struct AnimationEndHook(Rc<dyn Fn()>);

impl AnimationEndHook {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self) {
        (self.0)()
    }
}

impl std::fmt::Debug for AnimationEndHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AnimationEndHook(..)")
    }
}

// =============================================================================
// Container
// =============================================================================

/// The host element a gauge is mounted in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    pub id: String,
    /// Laid-out width, used when the options give none.
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Per-element option overrides, keyed by camelCase option name.
    pub dataset: HashMap<String, String>,
}

impl Container {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dataset.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Option Types
// =============================================================================

/// Needle shape and paint overrides. Lengths default to fractions of the
/// widget width.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerOptions {
    #[serde(default, deserialize_with = "lenient::float")]
    pub toplength: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub bottomlength: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub bottomwidth: Option<f64>,
    pub color: Option<String>,
    pub stroke: Option<String>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub stroke_width: Option<f64>,
    pub stroke_linecap: Option<String>,
}

/// Where the title sits relative to the arc.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TitlePosition {
    #[default]
    Above,
    Below,
}

impl From<&str> for TitlePosition {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "below" => TitlePosition::Below,
            _ => TitlePosition::Above,
        }
    }
}

/// Caller-supplied gauge options. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeOptions {
    /// Container id, resolved through the drawing surface.
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    /// Container given directly; wins over `id`.
    #[serde(skip)]
    pub container: Option<Container>,
    /// Base options that explicit fields are layered over.
    #[serde(default)]
    pub defaults: Option<Box<GaugeOptions>>,

    #[serde(default, deserialize_with = "lenient::float")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub relative_gauge_size: Option<bool>,

    #[serde(default, deserialize_with = "lenient::float")]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub min: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub max: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub min_txt: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub max_txt: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub reverse: Option<bool>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimals")]
    pub decimals: Option<usize>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub counter: Option<bool>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub hide_value: Option<bool>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub hide_min_max: Option<bool>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub show_min_max: Option<bool>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub human_friendly: Option<bool>,
    #[serde(default, deserialize_with = "lenient::decimals")]
    pub human_friendly_decimal: Option<usize>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub format_number: Option<bool>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub display_remaining: Option<bool>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub value_font_color: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub value_font_family: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub value_font_weight: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub label_font_color: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub label_font_family: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub label_font_weight: Option<String>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub value_min_font_size: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub label_min_font_size: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub min_label_min_font_size: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub max_label_min_font_size: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub title_min_font_size: Option<f64>,

    #[serde(default, deserialize_with = "lenient::float")]
    pub gauge_width_scale: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub gauge_color: Option<String>,
    pub level_colors: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub no_gradient: Option<bool>,
    pub custom_sectors: Option<CustomSectors>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub show_sector_colors: Option<bool>,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub show_inner_shadow: Option<bool>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub shadow_opacity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub shadow_size: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub shadow_vertical_offset: Option<f64>,

    /// Milliseconds.
    #[serde(default, deserialize_with = "lenient::float")]
    pub start_animation_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub start_animation_type: Option<String>,
    /// Milliseconds.
    #[serde(default, deserialize_with = "lenient::float")]
    pub refresh_animation_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub refresh_animation_type: Option<String>,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub donut: Option<bool>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub donut_start_angle: Option<f64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub differential: Option<bool>,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub pointer: Option<bool>,
    pub pointer_options: Option<PointerOptions>,

    #[serde(default, deserialize_with = "lenient::float")]
    pub target_line: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub target_line_color: Option<String>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub target_line_width: Option<f64>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title_font_color: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title_font_family: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title_font_weight: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title_position: Option<String>,

    #[serde(skip)]
    pub text_renderer: Option<TextRenderer>,
    #[serde(skip)]
    pub on_animation_end: Option<AnimationEndHook>,
}

/// Resolved, validated gauge configuration.
#[derive(Debug, Clone)]
pub struct GaugeConfig {
    pub id: Option<String>,
    /// Random per-instance id used to scope filters.
    pub class_id: String,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub relative_gauge_size: bool,

    /// Raw target value; clamped only for geometry.
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub min_txt: Option<String>,
    pub max_txt: Option<String>,
    pub reverse: bool,

    pub symbol: String,
    pub decimals: usize,
    pub counter: bool,
    pub hide_value: bool,
    pub hide_min_max: bool,
    pub show_min_max: bool,
    pub human_friendly: bool,
    pub human_friendly_decimal: usize,
    pub format_number: bool,
    pub display_remaining: bool,

    pub value_font_color: String,
    pub value_font_family: String,
    pub value_font_weight: String,
    pub label_font_color: String,
    pub label_font_family: String,
    pub label_font_weight: String,
    pub value_min_font_size: f64,
    pub label_min_font_size: f64,
    pub min_label_min_font_size: f64,
    pub max_label_min_font_size: f64,
    pub title_min_font_size: f64,

    pub gauge_width_scale: f64,
    pub gauge_color: String,
    pub level_colors: Vec<String>,
    pub no_gradient: bool,
    pub custom_sectors: CustomSectors,
    pub show_sector_colors: bool,

    pub show_inner_shadow: bool,
    pub shadow: ShadowStyle,

    pub start_animation: AnimationSpec,
    pub refresh_animation: AnimationSpec,

    pub donut: bool,
    pub donut_start_angle: f64,
    pub differential: bool,

    pub pointer: bool,
    pub pointer_options: PointerOptions,

    pub target_line: Option<f64>,
    pub target_line_color: String,
    pub target_line_width: f64,

    pub label: String,
    pub title: String,
    pub title_font_color: String,
    pub title_font_family: String,
    pub title_font_weight: String,
    pub title_position: TitlePosition,

    pub text_renderer: Option<TextRenderer>,
    pub on_animation_end: Option<AnimationEndHook>,
}

impl GaugeConfig {
    /// Clamp a value into `[min, max]` for geometry and color lookups.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// Fraction of the range covered by `value` (clamped).
    pub fn fraction(&self, value: f64) -> f64 {
        (self.clamp(value) - self.min) / (self.max - self.min)
    }

    /// Mirror a value for reversed gauges.
    pub fn oriented(&self, value: f64) -> f64 {
        if self.reverse {
            self.max + self.min - value
        } else {
            value
        }
    }

    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }

    /// Value the level arc sits at before the initial animation.
    pub fn start_value(&self) -> f64 {
        if self.differential {
            (self.max + self.min) / 2.0
        } else if self.reverse {
            self.max
        } else {
            self.min
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

impl GaugeOptions {
    /// Options with every field set to its documented default.
    pub fn documented_defaults() -> Self {
        Self {
            value: Some(0.0),
            min: Some(DEFAULT_MIN),
            max: Some(DEFAULT_MAX),
            reverse: Some(false),
            relative_gauge_size: Some(false),
            symbol: Some(String::new()),
            decimals: Some(0),
            counter: Some(false),
            hide_value: Some(false),
            hide_min_max: Some(false),
            show_min_max: Some(true),
            human_friendly: Some(false),
            human_friendly_decimal: Some(0),
            format_number: Some(false),
            display_remaining: Some(false),
            value_font_color: Some(DEFAULT_VALUE_FONT_COLOR.into()),
            value_font_family: Some(DEFAULT_FONT_FAMILY.into()),
            value_font_weight: Some("bold".into()),
            label_font_color: Some(DEFAULT_LABEL_FONT_COLOR.into()),
            label_font_family: Some(DEFAULT_FONT_FAMILY.into()),
            label_font_weight: Some("normal".into()),
            value_min_font_size: Some(16.0),
            label_min_font_size: Some(10.0),
            min_label_min_font_size: Some(10.0),
            max_label_min_font_size: Some(10.0),
            title_min_font_size: Some(10.0),
            gauge_width_scale: Some(1.0),
            gauge_color: Some(DEFAULT_GAUGE_COLOR.into()),
            level_colors: Some(DEFAULT_LEVEL_COLORS.iter().map(|c| c.to_string()).collect()),
            no_gradient: Some(false),
            custom_sectors: Some(CustomSectors::default()),
            show_sector_colors: Some(false),
            show_inner_shadow: Some(false),
            shadow_opacity: Some(ShadowStyle::default().opacity),
            shadow_size: Some(ShadowStyle::default().size),
            shadow_vertical_offset: Some(ShadowStyle::default().vertical_offset),
            start_animation_time: Some(DEFAULT_ANIMATION_MS),
            start_animation_type: Some(DEFAULT_ANIMATION_TYPE.into()),
            refresh_animation_time: Some(DEFAULT_ANIMATION_MS),
            refresh_animation_type: Some(DEFAULT_ANIMATION_TYPE.into()),
            donut: Some(false),
            donut_start_angle: Some(DEFAULT_DONUT_START_ANGLE),
            differential: Some(false),
            pointer: Some(false),
            pointer_options: Some(PointerOptions::default()),
            target_line_color: Some(DEFAULT_TARGET_LINE_COLOR.into()),
            target_line_width: Some(DEFAULT_TARGET_LINE_WIDTH),
            label: Some(String::new()),
            title: Some(String::new()),
            title_font_color: Some(DEFAULT_TITLE_FONT_COLOR.into()),
            title_font_family: Some(DEFAULT_FONT_FAMILY.into()),
            title_font_weight: Some("bold".into()),
            title_position: Some("above".into()),
            ..Self::default()
        }
    }

    /// Resolve these options against the container they are mounted in.
    ///
    /// # Errors
    /// `InvalidRange` when `min >= max`; `InvalidConfig` for a NaN or infinite
    /// `value`/`min`/`max`; `Json`/`InvalidConfig` when the layered document
    /// cannot be read back as options.
    pub fn resolve(self, container: &Container) -> Result<GaugeConfig> {
        self.check_finite()?;
        let text_renderer = self.text_renderer.clone();
        let on_animation_end = self.on_animation_end.clone();

        let flat = self.flatten(&container.dataset)?;
        let mut config = flat.into_config(container);
        config.text_renderer = text_renderer;
        config.on_animation_end = on_animation_end;

        if !(config.min < config.max) {
            return Err(GaugeError::InvalidRange {
                min: config.min,
                max: config.max,
            });
        }

        log::debug!(
            "Resolved gauge '{}' [{}, {}] value={}",
            container.id,
            config.min,
            config.max,
            config.value
        );
        Ok(config)
    }

    /// Reject NaN/infinite `value`, `min` and `max`; JSON would turn them
    /// into `null` and the default would silently take over.
    fn check_finite(&self) -> Result<()> {
        for (name, number) in [("value", self.value), ("min", self.min), ("max", self.max)] {
            if let Some(number) = number.filter(|n| !n.is_finite()) {
                return Err(GaugeError::InvalidConfig(format!(
                    "{} must be a finite number, got {}",
                    name, number
                )));
            }
        }
        match &self.defaults {
            Some(base) => base.check_finite(),
            None => Ok(()),
        }
    }

    /// Collapse `defaults` and dataset overrides into a single flat document.
    fn flatten(&self, dataset: &HashMap<String, String>) -> Result<GaugeOptions> {
        let mut merged = match &self.defaults {
            Some(base) => object_of(base)?,
            None => Map::new(),
        };
        merged.remove("defaults");

        let mut explicit = object_of(self)?;
        explicit.remove("defaults");
        overlay(&mut merged, explicit);

        for (key, raw) in dataset {
            let value = dataset_value(raw);
            let mut single = Map::new();
            single.insert(key.clone(), value.clone());
            match serde_json::from_value::<GaugeOptions>(Value::Object(single)) {
                Ok(_) => {
                    merged.insert(key.clone(), value);
                }
                Err(e) => log::warn!("Ignoring dataset override {}={:?}: {}", key, raw, e),
            }
        }

        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    fn into_config(self, container: &Container) -> GaugeConfig {
        let start_type = self
            .start_animation_type
            .unwrap_or_else(|| DEFAULT_ANIMATION_TYPE.into());
        let refresh_type = self
            .refresh_animation_type
            .unwrap_or_else(|| DEFAULT_ANIMATION_TYPE.into());

        let level_colors = match self.level_colors {
            Some(colors) if !colors.is_empty() => colors,
            _ => DEFAULT_LEVEL_COLORS.iter().map(|c| c.to_string()).collect(),
        };

        let gauge_width_scale = match self.gauge_width_scale {
            Some(scale) if scale > 0.0 => scale,
            _ => 1.0,
        };

        let shadow_defaults = ShadowStyle::default();

        GaugeConfig {
            id: self.id.or_else(|| Some(container.id.clone())),
            class_id: unique_id(),
            width: self.width,
            height: self.height,
            relative_gauge_size: self.relative_gauge_size.unwrap_or(false),

            value: self.value.unwrap_or(0.0),
            min: self.min.unwrap_or(DEFAULT_MIN),
            max: self.max.unwrap_or(DEFAULT_MAX),
            min_txt: self.min_txt,
            max_txt: self.max_txt,
            reverse: self.reverse.unwrap_or(false),

            symbol: self.symbol.unwrap_or_default(),
            decimals: self.decimals.unwrap_or(0),
            counter: self.counter.unwrap_or(false),
            hide_value: self.hide_value.unwrap_or(false),
            hide_min_max: self.hide_min_max.unwrap_or(false),
            show_min_max: self.show_min_max.unwrap_or(true),
            human_friendly: self.human_friendly.unwrap_or(false),
            human_friendly_decimal: self.human_friendly_decimal.unwrap_or(0),
            format_number: self.format_number.unwrap_or(false),
            display_remaining: self.display_remaining.unwrap_or(false),

            value_font_color: self
                .value_font_color
                .unwrap_or_else(|| DEFAULT_VALUE_FONT_COLOR.into()),
            value_font_family: self
                .value_font_family
                .unwrap_or_else(|| DEFAULT_FONT_FAMILY.into()),
            value_font_weight: self.value_font_weight.unwrap_or_else(|| "bold".into()),
            label_font_color: self
                .label_font_color
                .unwrap_or_else(|| DEFAULT_LABEL_FONT_COLOR.into()),
            label_font_family: self
                .label_font_family
                .unwrap_or_else(|| DEFAULT_FONT_FAMILY.into()),
            label_font_weight: self.label_font_weight.unwrap_or_else(|| "normal".into()),
            value_min_font_size: self.value_min_font_size.unwrap_or(16.0),
            label_min_font_size: self.label_min_font_size.unwrap_or(10.0),
            min_label_min_font_size: self.min_label_min_font_size.unwrap_or(10.0),
            max_label_min_font_size: self.max_label_min_font_size.unwrap_or(10.0),
            title_min_font_size: self.title_min_font_size.unwrap_or(10.0),

            gauge_width_scale,
            gauge_color: self
                .gauge_color
                .unwrap_or_else(|| DEFAULT_GAUGE_COLOR.into()),
            level_colors,
            no_gradient: self.no_gradient.unwrap_or(false),
            custom_sectors: self.custom_sectors.unwrap_or_default(),
            show_sector_colors: self.show_sector_colors.unwrap_or(false),

            show_inner_shadow: self.show_inner_shadow.unwrap_or(false),
            shadow: ShadowStyle {
                opacity: self.shadow_opacity.unwrap_or(shadow_defaults.opacity),
                size: self.shadow_size.unwrap_or(shadow_defaults.size),
                vertical_offset: self
                    .shadow_vertical_offset
                    .unwrap_or(shadow_defaults.vertical_offset),
            },

            start_animation: AnimationSpec {
                duration: millis(self.start_animation_time.unwrap_or(DEFAULT_ANIMATION_MS)),
                easing: easing_or_linear(&start_type),
            },
            refresh_animation: AnimationSpec {
                duration: millis(
                    self.refresh_animation_time
                        .unwrap_or(DEFAULT_ANIMATION_MS),
                ),
                easing: easing_or_linear(&refresh_type),
            },

            donut: self.donut.unwrap_or(false),
            donut_start_angle: self.donut_start_angle.unwrap_or(DEFAULT_DONUT_START_ANGLE),
            differential: self.differential.unwrap_or(false),

            pointer: self.pointer.unwrap_or(false),
            pointer_options: self.pointer_options.unwrap_or_default(),

            target_line: self.target_line,
            target_line_color: self
                .target_line_color
                .unwrap_or_else(|| DEFAULT_TARGET_LINE_COLOR.into()),
            target_line_width: self
                .target_line_width
                .unwrap_or(DEFAULT_TARGET_LINE_WIDTH),

            label: self.label.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            title_font_color: self
                .title_font_color
                .unwrap_or_else(|| DEFAULT_TITLE_FONT_COLOR.into()),
            title_font_family: self
                .title_font_family
                .unwrap_or_else(|| DEFAULT_FONT_FAMILY.into()),
            title_font_weight: self.title_font_weight.unwrap_or_else(|| "bold".into()),
            title_position: self
                .title_position
                .as_deref()
                .map(TitlePosition::from)
                .unwrap_or_default(),

            text_renderer: None,
            on_animation_end: None,
        }
    }
}

fn object_of(options: &GaugeOptions) -> Result<Map<String, Value>> {
    match serde_json::to_value(options)? {
        Value::Object(map) => Ok(map),
        other => Err(GaugeError::InvalidConfig(format!(
            "options must serialize to an object, got {}",
            other
        ))),
    }
}

/// Copy every non-null entry of `top` over `base`.
fn overlay(base: &mut Map<String, Value>, top: Map<String, Value>) {
    for (key, value) in top {
        if !value.is_null() {
            base.insert(key, value);
        }
    }
}

/// Dataset values are strings; read structured ones (arrays, objects,
/// numbers, booleans) as JSON and keep everything else as text.
fn dataset_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) if !value.is_null() => value,
        _ => Value::String(raw.to_string()),
    }
}

fn millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

fn easing_or_linear(name: &str) -> Easing {
    Easing::from_name(name).unwrap_or_else(|| {
        log::warn!("Unknown animation type '{}', using linear", name);
        Easing::Linear
    })
}

/// Random v4-style identifier.
pub fn unique_id() -> String {
    use rand::Rng;

    let bits: u128 = rand::rng().random();
    let hex = format!("{:032x}", bits);
    format!(
        "{}-{}-4{}-{:x}{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[13..16],
        (u8::from_str_radix(&hex[16..17], 16).unwrap_or(0) & 0x3) | 0x8,
        &hex[17..20],
        &hex[20..32]
    )
}

// =============================================================================
// Lenient Deserializers
// =============================================================================

/// Type coercion for option fields: numbers may arrive as strings, integers
/// may arrive as floats, text may arrive as numbers.
mod lenient {
    use serde::de::{self, Deserialize, Deserializer};
    use serde_json::Value;

    pub fn float<'de, D>(d: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("expected a number, got {:?}", s))),
            Some(other) => Err(de::Error::custom(format!(
                "expected a number, got {}",
                other
            ))),
        }
    }

    /// Digit counts: negatives read as 0, anything above `MAX_DECIMALS` is rejected.
    pub fn decimals<'de, D>(d: D) -> Result<Option<usize>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match float(d)? {
            None => Ok(None),
            Some(v) if v.is_finite() && v <= super::MAX_DECIMALS as f64 => {
                Ok(Some(if v > 0.0 { v.trunc() as usize } else { 0 }))
            }
            Some(v) => Err(de::Error::custom(format!(
                "expected at most {} decimals, got {}",
                super::MAX_DECIMALS,
                v
            ))),
        }
    }

    pub fn flag<'de, D>(d: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "1" => Ok(Some(true)),
                "false" | "0" | "" => Ok(Some(false)),
                _ => Err(de::Error::custom(format!("expected a boolean, got {:?}", s))),
            },
            Some(Value::Number(n)) => Ok(Some(n.as_f64().is_some_and(|v| v != 0.0))),
            Some(other) => Err(de::Error::custom(format!(
                "expected a boolean, got {}",
                other
            ))),
        }
    }

    pub fn text<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(de::Error::custom(format!("expected text, got {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = GaugeOptions::default()
            .resolve(&Container::new("gauge"))
            .unwrap();
        assert_eq!(config.min, 0.0);
        assert_eq!(config.max, 100.0);
        assert_eq!(config.level_colors.len(), 3);
        assert_eq!(config.start_animation.duration, Duration::from_millis(700));
        assert_eq!(config.start_animation.easing, Easing::EaseOut);
        assert_eq!(config.gauge_width_scale, 1.0);
        assert_eq!(config.id.as_deref(), Some("gauge"));
        assert!(config.show_min_max);
    }

    #[test]
    fn test_invalid_range() {
        let options = GaugeOptions {
            min: Some(10.0),
            max: Some(10.0),
            ..GaugeOptions::default()
        };
        let err = options.resolve(&Container::new("gauge")).unwrap_err();
        assert!(matches!(err, GaugeError::InvalidRange { .. }));
    }

    #[test]
    fn test_json_coercion() {
        let options: GaugeOptions = serde_json::from_str(
            r##"{"value": "42.5", "max": 200, "decimals": 2.9, "donut": "true",
                "levelColors": ["#000000"], "title": 2024,
                "customSectors": {"percents": true, "ranges": [{"lo": 0, "hi": 50, "color": "#111111"}]},
                "pointerOptions": {"toplength": "8", "stroke_width": 2}}"##,
        )
        .unwrap();
        let config = options.resolve(&Container::new("gauge")).unwrap();
        assert_eq!(config.value, 42.5);
        assert_eq!(config.max, 200.0);
        assert_eq!(config.decimals, 2);
        assert!(config.donut);
        assert_eq!(config.title, "2024");
        assert!(config.custom_sectors.percents);
        assert_eq!(config.pointer_options.toplength, Some(8.0));
        assert_eq!(config.pointer_options.stroke_width, Some(2.0));
    }

    #[test]
    fn test_resolution_order() {
        let options = GaugeOptions {
            max: Some(500.0),
            label: Some("explicit".into()),
            defaults: Some(Box::new(GaugeOptions {
                max: Some(50.0),
                symbol: Some("%".into()),
                label: Some("base".into()),
                ..GaugeOptions::default()
            })),
            ..GaugeOptions::default()
        };
        let container = Container::new("gauge").with_data("label", "dataset");
        let config = options.resolve(&container).unwrap();
        assert_eq!(config.max, 500.0); // explicit beats defaults block
        assert_eq!(config.symbol, "%"); // defaults block beats documented default
        assert_eq!(config.label, "dataset"); // dataset beats explicit
    }

    #[test]
    fn test_dataset_coercion_and_bad_override() {
        let container = Container::new("gauge")
            .with_data("max", "250")
            .with_data("reverse", "true")
            .with_data("min", "not-a-number");
        let config = GaugeOptions::default().resolve(&container).unwrap();
        assert_eq!(config.max, 250.0);
        assert!(config.reverse);
        assert_eq!(config.min, 0.0);
    }

    #[test]
    fn test_empty_level_colors_fall_back() {
        let options = GaugeOptions {
            level_colors: Some(vec![]),
            ..GaugeOptions::default()
        };
        let config = options.resolve(&Container::new("g")).unwrap();
        assert_eq!(config.level_colors[0], "#a9d70b");
    }

    #[test]
    fn test_unknown_easing_is_linear() {
        let options = GaugeOptions {
            refresh_animation_type: Some("wobble".into()),
            refresh_animation_time: Some(-5.0),
            ..GaugeOptions::default()
        };
        let config = options.resolve(&Container::new("g")).unwrap();
        assert_eq!(config.refresh_animation.easing, Easing::Linear);
        assert_eq!(config.refresh_animation.duration, Duration::ZERO);
    }

    #[test]
    fn test_unique_ids_differ() {
        let a = unique_id();
        let b = unique_id();
        assert_eq!(a.len(), 36);
        assert_ne!(a, b);
    }

    #[test]
    fn test_documented_defaults_roundtrip_resolve() {
        let json = serde_json::to_string(&GaugeOptions::documented_defaults()).unwrap();
        let options: GaugeOptions = serde_json::from_str(&json).unwrap();
        let config = options.resolve(&Container::new("g")).unwrap();
        assert_eq!(config.gauge_color, DEFAULT_GAUGE_COLOR);
        assert_eq!(config.title_position, TitlePosition::Above);
    }

    #[test]
    fn test_decimals_bounded() {
        assert!(serde_json::from_str::<GaugeOptions>(r#"{"decimals": 1e12}"#).is_err());
        assert!(serde_json::from_str::<GaugeOptions>(r#"{"humanFriendlyDecimal": "21"}"#).is_err());
        let options: GaugeOptions =
            serde_json::from_str(r#"{"decimals": 20, "humanFriendlyDecimal": -3}"#).unwrap();
        assert_eq!(options.decimals, Some(MAX_DECIMALS));
        assert_eq!(options.human_friendly_decimal, Some(0));

        let options = GaugeOptions {
            decimals: Some(1_000_000_000_000),
            ..GaugeOptions::default()
        };
        let err = options.resolve(&Container::new("g")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_dataset_decimals_out_of_range_skipped() {
        let container = Container::new("g").with_data("decimals", "1000000000000");
        let options = GaugeOptions {
            decimals: Some(2),
            ..GaugeOptions::default()
        };
        let config = options.resolve(&container).unwrap();
        assert_eq!(config.decimals, 2);
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        let container = Container::new("g");
        for options in [
            GaugeOptions {
                min: Some(f64::NAN),
                ..GaugeOptions::default()
            },
            GaugeOptions {
                value: Some(f64::INFINITY),
                ..GaugeOptions::default()
            },
            GaugeOptions {
                defaults: Some(Box::new(GaugeOptions {
                    max: Some(f64::NEG_INFINITY),
                    ..GaugeOptions::default()
                })),
                ..GaugeOptions::default()
            },
        ] {
            let err = options.resolve(&container).unwrap_err();
            assert!(matches!(err, GaugeError::InvalidConfig(_)));
            assert!(err.is_configuration());
        }
    }
}
