//! Gauge controller: owns the drawn elements and runs the lifecycle.
//!
//! A [`Gauge`] is built from [`GaugeOptions`] and a [`Surface`]. It draws
//! itself once, then reacts to `refresh` (new value, animated), `update`
//! (appearance change, redrawn in place) and `destroy`. Animation frames are
//! pulled by the caller through [`Gauge::tick`].

use serde_json::{Map, Value};

use crate::animation::{AnimationSpec, Animator, Clock, Frame, Started, SystemClock};
use crate::color::{color_for, is_hex_color, static_sectors, CustomSectors, DEFAULT_LEVEL_COLORS};
use crate::config::{Container, GaugeConfig, GaugeOptions, MAX_DECIMALS};
use crate::error::{GaugeError, GaugeWarning, Result};
use crate::format::{format_display_text, format_value, TextKind};
use crate::geometry::{
    donut_rotation, gauge_path, pointer_path, target_line, ArcMode, Canvas, FontSizes,
    NeedleSize, Ring, SectorSpan, TextLayout, WidgetBox,
};
use crate::surface::{ElementId, Surface};

/// Elements currently on the surface. Empty after `destroy`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderHandles {
    pub background: Option<ElementId>,
    pub level: Option<ElementId>,
    /// Static color bands, in paint order.
    pub sectors: Vec<ElementId>,
    pub title: Option<ElementId>,
    pub value: Option<ElementId>,
    pub label: Option<ElementId>,
    pub min: Option<ElementId>,
    pub max: Option<ElementId>,
    pub pointer: Option<ElementId>,
    pub target_line: Option<ElementId>,
}

/// Everything derived from the canvas size. Computed once at construction.
#[derive(Debug, Clone)]
struct Layout {
    canvas: Canvas,
    ring: Ring,
    fonts: FontSizes,
    text: TextLayout,
    needle: NeedleSize,
}

impl Layout {
    fn new(canvas: Canvas, config: &GaugeConfig) -> Self {
        let (w, h) = canvas.view_box;
        let widget = WidgetBox::fit(w, h, config.has_title(), config.title_position, config.donut);
        let ring = Ring::new(&widget, config.donut, config.gauge_width_scale);
        let fonts = FontSizes::for_widget(&widget, config);
        let text = TextLayout::new(&widget, &fonts, config);
        let needle = NeedleSize::for_widget(
            &widget,
            config.pointer_options.toplength,
            config.pointer_options.bottomlength,
            config.pointer_options.bottomwidth,
        );
        Self {
            canvas,
            ring,
            fonts,
            text,
            needle,
        }
    }
}

/// An animated radial gauge drawn on a surface.
pub struct Gauge<S: Surface> {
    config: GaugeConfig,
    surface: S,
    layout: Layout,
    handles: RenderHandles,
    animator: Animator,
    clock: Box<dyn Clock>,
    /// Value the level arc currently shows (mid-animation values included).
    displayed_value: f64,
    shadow_id: Option<String>,
    destroyed: bool,
}

impl<S: Surface> std::fmt::Debug for Gauge<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gauge")
            .field("id", &self.config.id)
            .field("value", &self.config.value)
            .field("displayed_value", &self.displayed_value)
            .field("animating", &self.animator.is_running())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

// =============================================================================
// Construction
// =============================================================================

impl<S: Surface> Gauge<S> {
    /// Build and draw a gauge using the wall clock.
    ///
    /// # Errors
    /// Configuration errors: no container, unknown container id, or
    /// `min >= max`.
    ///
    /// # Example
    /// ```
    /// use svg_gauge::{Container, Gauge, GaugeOptions, SvgDocument};
    ///
    /// let options = GaugeOptions {
    ///     container: Some(Container::new("cpu")),
    ///     value: Some(42.0),
    ///     start_animation_time: Some(0.0),
    ///     ..GaugeOptions::default()
    /// };
    /// let gauge = Gauge::new(options, SvgDocument::new()).unwrap();
    /// assert!(gauge.surface().to_svg().contains(">42</text>"));
    /// ```
    pub fn new(options: GaugeOptions, surface: S) -> Result<Self> {
        Self::with_clock(options, surface, SystemClock)
    }

    /// Build and draw a gauge reading time from `clock`.
    pub fn with_clock(
        mut options: GaugeOptions,
        mut surface: S,
        clock: impl Clock + 'static,
    ) -> Result<Self> {
        let container = resolve_container(&mut options, &surface)?;
        let config = options.resolve(&container)?;
        let canvas = Canvas::for_config(&config, (container.width, container.height));
        let layout = Layout::new(canvas, &config);

        surface.begin(&layout.canvas);

        let mut gauge = Self {
            displayed_value: config.start_value(),
            config,
            surface,
            layout,
            handles: RenderHandles::default(),
            animator: Animator::new(),
            clock: Box::new(clock),
            shadow_id: None,
            destroyed: false,
        };

        gauge.draw();
        if gauge.config.show_inner_shadow {
            gauge.apply_inner_shadow();
        }
        log::debug!(
            "Gauge '{}' drawn in {}x{} (value {})",
            container.id,
            gauge.layout.canvas.view_box.0,
            gauge.layout.canvas.view_box.1,
            gauge.config.value
        );

        let spec = gauge.config.start_animation;
        gauge.animate_to(gauge.config.value, spec);
        Ok(gauge)
    }
}

fn resolve_container<S: Surface>(options: &mut GaugeOptions, surface: &S) -> Result<Container> {
    if let Some(container) = options.container.take() {
        return Ok(container);
    }
    match options.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => surface
            .find_container(id)
            .ok_or_else(|| GaugeError::ContainerNotFound(id.to_string())),
        None => Err(GaugeError::MissingContainer),
    }
}

// =============================================================================
// Public Operations
// =============================================================================

impl<S: Surface> Gauge<S> {
    /// Animate to a new value, optionally changing bounds and label.
    ///
    /// # Arguments
    /// * `value` - New target; must be finite
    /// * `max`, `min` - New bounds, applied immediately
    /// * `label` - New label text, applied immediately
    ///
    /// # Errors
    /// `InvalidValue` for NaN/infinite values, `InvalidRange` when the new
    /// bounds are empty, `Destroyed` after `destroy()`. State is untouched on
    /// error.
    pub fn refresh(
        &mut self,
        value: f64,
        max: Option<f64>,
        min: Option<f64>,
        label: Option<&str>,
    ) -> Result<()> {
        if self.destroyed {
            return Err(GaugeError::Destroyed);
        }
        if !value.is_finite() {
            return Err(GaugeError::InvalidValue(value.to_string()));
        }

        let min = min.filter(|v| v.is_finite());
        let max = max.filter(|v| v.is_finite());
        let new_min = min.unwrap_or(self.config.min);
        let new_max = max.unwrap_or(self.config.max);
        if new_min >= new_max {
            return Err(GaugeError::InvalidRange {
                min: new_min,
                max: new_max,
            });
        }

        if let Some(label) = label {
            self.config.label = label.to_string();
            if let Some(id) = self.handles.label {
                self.surface
                    .set_attributes(id, &[("text", self.config.label.clone())]);
            }
        }

        let bounds_changed = new_min != self.config.min || new_max != self.config.max;
        if let Some(min) = min {
            self.config.min = min;
            if let Some(id) = self.handles.min {
                let text = format_display_text(min, &self.config, TextKind::Min);
                self.surface.set_attributes(id, &[("text", text)]);
            }
        }
        if let Some(max) = max {
            self.config.max = max;
            if let Some(id) = self.handles.max {
                let text = format_display_text(max, &self.config, TextKind::Max);
                self.surface.set_attributes(id, &[("text", text)]);
            }
        }
        if bounds_changed {
            if self.config.show_sector_colors {
                self.draw_sectors();
            }
            self.draw_target_line();
        }

        self.config.value = value;
        if !self.config.counter && !self.config.hide_value {
            self.set_value_text(format_value(value, &self.config));
        }

        log::debug!(
            "Refresh {} -> {} over {:?}",
            self.displayed_value,
            value,
            self.config.refresh_animation.duration
        );
        let spec = self.config.refresh_animation;
        self.animate_to(value, spec);
        Ok(())
    }

    /// Change one appearance option in place.
    ///
    /// Returns a warning (also logged) when the key is not updatable or the
    /// value has the wrong shape; the gauge is left unchanged in that case.
    pub fn update(&mut self, key: &str, value: &Value) -> Option<GaugeWarning> {
        let warning = if self.destroyed {
            Some(GaugeWarning::Destroyed)
        } else {
            self.apply_update(key, value).err()
        };
        if let Some(warning) = &warning {
            log::warn!("{}", warning);
        }
        warning
    }

    /// Apply several updates; returns every warning raised.
    pub fn update_many(&mut self, options: &Map<String, Value>) -> Vec<GaugeWarning> {
        options
            .iter()
            .filter_map(|(key, value)| self.update(key, value))
            .collect()
    }

    /// Advance the running animation to the clock's current time.
    ///
    /// Returns the value applied, or `None` when nothing is animating.
    pub fn tick(&mut self) -> Option<f64> {
        if self.destroyed {
            return None;
        }
        let frame = self.animator.tick(self.clock.now())?;
        self.apply_frame(frame);
        Some(frame.value)
    }

    /// Skip to the end of the running animation.
    pub fn finish_animation(&mut self) -> Option<f64> {
        if self.destroyed {
            return None;
        }
        let frame = self.animator.finish()?;
        self.apply_frame(frame);
        Some(frame.value)
    }

    /// Stop animating and remove the drawing. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.animator.cancel_all();
        self.surface.detach();
        self.handles = RenderHandles::default();
        self.shadow_id = None;
        self.destroyed = true;
        log::debug!("Gauge '{}' destroyed", self.config.id.as_deref().unwrap_or_default());
    }

    /// Current target value (unclamped).
    pub fn value(&self) -> f64 {
        self.config.value
    }

    /// Copy of the live configuration.
    pub fn config(&self) -> GaugeConfig {
        self.config.clone()
    }

    /// Value the level arc shows right now, mid-animation included.
    pub fn displayed_value(&self) -> f64 {
        self.displayed_value
    }

    /// Whether a start or refresh animation is still running.
    pub fn is_animating(&self) -> bool {
        self.animator.is_running()
    }

    /// Whether `destroy()` has been called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Ids of the elements currently drawn.
    pub fn handles(&self) -> &RenderHandles {
        &self.handles
    }

    /// The surface the gauge draws on.
    pub fn surface(&self) -> &S {
        &self.surface
    }
}

// =============================================================================
// Animation
// =============================================================================

impl<S: Surface> Gauge<S> {
    fn animate_to(&mut self, to: f64, spec: AnimationSpec) {
        let from = self.displayed_value;
        match self.animator.start(from, to, spec, self.clock.now()) {
            Started::Immediate(value) => self.apply_frame(Frame { value, done: true }),
            Started::Running(token) => log::trace!("Animating {} -> {} ({:?})", from, to, token),
        }
    }

    fn apply_frame(&mut self, frame: Frame) {
        log::trace!("Frame {} (done: {})", frame.value, frame.done);
        self.displayed_value = frame.value;
        self.draw_level(frame.value);
        if self.config.pointer {
            self.draw_pointer(frame.value);
        }
        if self.config.counter && !self.config.hide_value {
            self.set_value_text(format_value(frame.value, &self.config));
        }
        if frame.done {
            if let Some(hook) = &self.config.on_animation_end {
                hook.call();
            }
        }
    }
}

// =============================================================================
// Drawing
// =============================================================================

impl<S: Surface> Gauge<S> {
    fn draw(&mut self) {
        let ring = self.layout.ring;
        let background_mode = if self.config.donut {
            ArcMode::Donut
        } else {
            ArcMode::Semicircle
        };
        let d = gauge_path(
            SectorSpan::Value(self.config.max),
            self.config.min,
            self.config.max,
            &ring,
            background_mode,
        );
        let background = self.surface.create_path(&d);
        self.surface.set_attributes(
            background,
            &[
                ("fill", self.config.gauge_color.clone()),
                ("stroke", "none".into()),
            ],
        );
        self.rotate_if_donut(background, self.config.donut_start_angle);
        self.handles.background = Some(background);

        if self.config.show_sector_colors {
            self.draw_sectors();
        } else {
            self.draw_level(self.displayed_value);
        }
        self.draw_labels();
        if self.config.pointer {
            self.draw_pointer(self.displayed_value);
        }
        self.draw_target_line();
    }

    /// Fill arc at `value`; patched in place when it already exists.
    fn draw_level(&mut self, value: f64) {
        if self.config.show_sector_colors {
            return;
        }
        let clamped = self.config.clamp(value);
        let shown = self.config.oriented(clamped);
        let color = color_for(
            clamped,
            self.config.fraction(clamped),
            &self.config.level_colors,
            self.config.no_gradient,
            &self.config.custom_sectors,
        );
        let d = gauge_path(
            SectorSpan::Value(shown),
            self.config.min,
            self.config.max,
            &self.layout.ring,
            ArcMode::for_gauge(self.config.donut, self.config.differential),
        );

        match self.handles.level {
            Some(id) => self.surface.set_attributes(id, &[("d", d), ("fill", color)]),
            None => {
                let id = self.surface.create_path(&d);
                self.surface
                    .set_attributes(id, &[("fill", color), ("stroke", "none".into())]);
                self.rotate_if_donut(id, self.config.donut_start_angle);
                if let Some(shadow) = &self.shadow_id {
                    self.surface
                        .set_attributes(id, &[("filter", format!("url(#{})", shadow))]);
                }
                if let Some(background) = self.handles.background {
                    self.surface.place_after(id, background);
                }
                self.handles.level = Some(id);
            }
        }
    }

    fn remove_level(&mut self) {
        if let Some(id) = self.handles.level.take() {
            self.surface.remove(id);
        }
    }

    /// Static color bands, painted last-to-first so earlier bands win.
    /// Bands always sit directly above the background.
    fn draw_sectors(&mut self) {
        self.remove_sectors();
        let (min, max) = (self.config.min, self.config.max);
        let sectors = static_sectors(
            min,
            max,
            &self.config.level_colors,
            &self.config.custom_sectors,
            self.config.reverse,
        );
        let mode = if self.config.donut {
            ArcMode::Donut
        } else {
            ArcMode::Semicircle
        };

        let mut anchor = self.handles.background;
        for sector in sectors.iter().rev() {
            let span = SectorSpan::Values {
                from: min + (max - min) * sector.lo,
                to: min + (max - min) * sector.hi,
            };
            let d = gauge_path(span, min, max, &self.layout.ring, mode);
            let id = self.surface.create_path(&d);
            self.surface.set_attributes(
                id,
                &[("fill", sector.color.clone()), ("stroke", "none".into())],
            );
            self.rotate_if_donut(id, self.config.donut_start_angle);
            if let Some(below) = anchor {
                self.surface.place_after(id, below);
            }
            anchor = Some(id);
            self.handles.sectors.push(id);
        }
    }

    fn remove_sectors(&mut self) {
        for id in std::mem::take(&mut self.handles.sectors) {
            self.surface.remove(id);
        }
    }

    fn draw_labels(&mut self) {
        let fonts = self.layout.fonts;
        let text = self.layout.text;

        if self.config.has_title() {
            let title = self.config.title.clone();
            self.create_title(&title);
        }

        if !self.config.hide_value {
            let shown = if self.config.counter {
                self.displayed_value
            } else {
                self.config.value
            };
            let content = format_value(shown, &self.config);
            let id = self.surface.create_text(text.value, &content);
            self.surface.set_attributes(
                id,
                &[
                    ("font-family", self.config.value_font_family.clone()),
                    ("font-size", fonts.value.to_string()),
                    ("font-weight", self.config.value_font_weight.clone()),
                    ("text-anchor", "middle".into()),
                    ("fill", self.config.value_font_color.clone()),
                ],
            );
            self.handles.value = Some(id);
        }

        if !self.config.label.is_empty() {
            let attrs = self.small_text_attrs(fonts.label);
            let id = self.surface.create_text(text.label, &self.config.label);
            self.surface.set_attributes(id, &attrs);
            self.handles.label = Some(id);
        }

        if self.config.show_min_max && !self.config.hide_min_max && !self.config.donut {
            let min_text = format_display_text(self.config.min, &self.config, TextKind::Min);
            let max_text = format_display_text(self.config.max, &self.config, TextKind::Max);
            let attrs = self.small_text_attrs(fonts.min_max);

            let min = self.surface.create_text(text.min, &min_text);
            self.surface.set_attributes(min, &attrs);
            let max = self.surface.create_text(text.max, &max_text);
            self.surface.set_attributes(max, &attrs);
            self.handles.min = Some(min);
            self.handles.max = Some(max);
        }
    }

    fn create_title(&mut self, title: &str) {
        let id = self.surface.create_text(self.layout.text.title, title);
        self.surface.set_attributes(
            id,
            &[
                ("font-family", self.config.title_font_family.clone()),
                ("font-size", self.layout.fonts.title.to_string()),
                ("font-weight", self.config.title_font_weight.clone()),
                ("text-anchor", "middle".into()),
                ("fill", self.config.title_font_color.clone()),
            ],
        );
        self.handles.title = Some(id);
    }

    fn small_text_attrs(&self, size: f64) -> Vec<(&'static str, String)> {
        vec![
            ("font-family", self.config.label_font_family.clone()),
            ("font-size", size.to_string()),
            ("font-weight", self.config.label_font_weight.clone()),
            ("text-anchor", "middle".into()),
            ("fill", self.config.label_font_color.clone()),
        ]
    }

    fn set_value_text(&mut self, content: String) {
        if let Some(id) = self.handles.value {
            self.surface.set_attributes(id, &[("text", content)]);
        }
    }

    fn draw_pointer(&mut self, value: f64) {
        let fraction = self.config.fraction(self.config.oriented(self.config.clamp(value)));
        let d = pointer_path(fraction, &self.layout.ring, &self.layout.needle);

        if let Some(id) = self.handles.pointer {
            self.surface.set_attributes(id, &[("d", d)]);
            return;
        }

        let opts = &self.config.pointer_options;
        let attrs = [
            ("fill", opts.color.clone().unwrap_or_else(|| "#000000".into())),
            ("stroke", opts.stroke.clone().unwrap_or_else(|| "none".into())),
            ("stroke-width", opts.stroke_width.unwrap_or(0.0).to_string()),
            (
                "stroke-linecap",
                opts.stroke_linecap.clone().unwrap_or_else(|| "square".into()),
            ),
        ];
        let id = self.surface.create_path(&d);
        self.surface.set_attributes(id, &attrs);
        self.rotate_if_donut(id, self.config.donut_start_angle);
        self.handles.pointer = Some(id);
    }

    /// (Re)draw the target tick; removes it when no target is set.
    fn draw_target_line(&mut self) {
        if let Some(id) = self.handles.target_line.take() {
            self.surface.remove(id);
        }
        let Some(target) = self.config.target_line else {
            return;
        };

        let oriented = self.config.oriented(target);
        let fraction = (oriented - self.config.min) / (self.config.max - self.config.min);
        let (inner, outer) = target_line(fraction, &self.layout.ring);
        let id = self.surface.create_line(inner, outer);
        self.surface.set_attributes(
            id,
            &[
                ("stroke", self.config.target_line_color.clone()),
                ("stroke-width", self.config.target_line_width.to_string()),
            ],
        );
        self.rotate_if_donut(id, self.config.donut_start_angle);
        self.handles.target_line = Some(id);
    }

    fn rotate_if_donut(&mut self, id: ElementId, angle: f64) {
        if self.config.donut {
            let transform = donut_rotation(angle, &self.layout.ring);
            self.surface.apply_transform(id, &transform);
        }
    }

    fn apply_inner_shadow(&mut self) {
        let shadow_id = format!(
            "inner-shadow-{}",
            self.config.id.as_deref().unwrap_or(&self.config.class_id)
        );
        self.surface
            .create_shadow_filter(&shadow_id, &self.config.shadow);

        let reference = format!("url(#{})", shadow_id);
        for id in [self.handles.background, self.handles.level].into_iter().flatten() {
            self.surface
                .set_attributes(id, &[("filter", reference.clone())]);
        }
        self.shadow_id = Some(shadow_id);
    }
}

// =============================================================================
// Updates
// =============================================================================

fn as_text(value: &Value) -> Option<&str> {
    value.as_str()
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

impl<S: Surface> Gauge<S> {
    fn apply_update(&mut self, key: &str, value: &Value) -> std::result::Result<(), GaugeWarning> {
        let invalid = |expected: &'static str| GaugeWarning::InvalidOptionValue {
            option: key.to_string(),
            expected,
        };
        let hex_color = |value: &Value| -> std::result::Result<String, GaugeWarning> {
            as_text(value)
                .filter(|c| is_hex_color(c))
                .map(str::to_string)
                .ok_or_else(|| GaugeWarning::InvalidColor {
                    option: key.to_string(),
                    value: value.to_string(),
                })
        };

        match key {
            "valueFontColor" | "labelFontColor" | "titleFontColor" => {
                let color = hex_color(value)?;
                let targets = match key {
                    "valueFontColor" => {
                        self.config.value_font_color = color.clone();
                        vec![self.handles.value]
                    }
                    "labelFontColor" => {
                        self.config.label_font_color = color.clone();
                        vec![self.handles.min, self.handles.max, self.handles.label]
                    }
                    _ => {
                        self.config.title_font_color = color.clone();
                        vec![self.handles.title]
                    }
                };
                for id in targets.into_iter().flatten() {
                    self.surface.set_attributes(id, &[("fill", color.clone())]);
                }
            }
            "gaugeColor" => {
                let color = hex_color(value)?;
                if let Some(id) = self.handles.background {
                    self.surface.set_attributes(id, &[("fill", color.clone())]);
                }
                self.config.gauge_color = color;
            }
            "levelColors" => {
                let colors: Vec<String> = serde_json::from_value(value.clone())
                    .map_err(|_| invalid("an array of color strings"))?;
                if let Some(bad) = colors.iter().find(|c| !is_hex_color(c)) {
                    return Err(GaugeWarning::InvalidColor {
                        option: key.to_string(),
                        value: bad.clone(),
                    });
                }
                self.config.level_colors = if colors.is_empty() {
                    DEFAULT_LEVEL_COLORS.iter().map(|c| c.to_string()).collect()
                } else {
                    colors
                };
                self.redraw_fill();
            }
            "targetLine" => {
                self.config.target_line = match value {
                    Value::Null => None,
                    other => Some(as_number(other).ok_or_else(|| invalid("a number or null"))?),
                };
                self.draw_target_line();
            }
            "targetLineColor" => {
                let color = hex_color(value)?;
                if let Some(id) = self.handles.target_line {
                    self.surface.set_attributes(id, &[("stroke", color.clone())]);
                }
                self.config.target_line_color = color;
            }
            "targetLineWidth" => {
                let width = as_number(value).ok_or_else(|| invalid("a number"))?;
                self.config.target_line_width = width;
                if let Some(id) = self.handles.target_line {
                    self.surface
                        .set_attributes(id, &[("stroke-width", width.to_string())]);
                }
            }
            "symbol" => {
                self.config.symbol = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    _ => return Err(invalid("a string")),
                };
                self.rerender_value_text();
            }
            "decimals" => {
                let decimals = as_number(value)
                    .filter(|d| (0.0..=MAX_DECIMALS as f64).contains(d))
                    .ok_or_else(|| invalid("an integer from 0 to 20"))?;
                self.config.decimals = decimals.trunc() as usize;
                self.rerender_value_text();
            }
            "title" => {
                let title = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    _ => return Err(invalid("a string")),
                };
                self.config.title = title.clone();
                match self.handles.title {
                    Some(id) => self.surface.set_attributes(id, &[("text", title)]),
                    None if !title.is_empty() => self.create_title(&title),
                    None => {}
                }
            }
            "showSectorColors" => {
                let show = as_flag(value).ok_or_else(|| invalid("a boolean"))?;
                self.config.show_sector_colors = show;
                self.redraw_fill();
            }
            "customSectors" => {
                let sectors: CustomSectors = match value {
                    Value::Null => CustomSectors::default(),
                    other => serde_json::from_value(other.clone())
                        .map_err(|_| invalid("{percents, ranges: [{lo, hi, color}]}"))?,
                };
                self.config.custom_sectors = sectors;
                self.redraw_fill();
            }
            _ => return Err(GaugeWarning::UnsupportedOption(key.to_string())),
        }

        log::debug!("Updated {} = {}", key, value);
        Ok(())
    }

    /// Repaint whichever of level arc / sector bands is active. An existing
    /// level arc is patched in place.
    fn redraw_fill(&mut self) {
        if self.config.show_sector_colors {
            self.remove_level();
            self.draw_sectors();
        } else {
            self.remove_sectors();
            self.draw_level(self.displayed_value);
        }
    }

    fn rerender_value_text(&mut self) {
        let shown = if self.config.counter {
            self.displayed_value
        } else {
            self.config.value
        };
        let content = format_value(shown, &self.config);
        self.set_value_text(content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::ManualClock;
    use crate::surface::SvgDocument;
    use serde_json::json;
    use std::time::Duration;

    fn options(value: f64) -> GaugeOptions {
        GaugeOptions {
            container: Some(Container::new("gauge")),
            value: Some(value),
            ..GaugeOptions::default()
        }
    }

    fn settled(options: GaugeOptions) -> Gauge<SvgDocument> {
        let mut gauge =
            Gauge::with_clock(options, SvgDocument::new(), ManualClock::new()).unwrap();
        gauge.finish_animation();
        gauge
    }

    #[test]
    fn test_missing_container() {
        let err = Gauge::new(GaugeOptions::default(), SvgDocument::new()).unwrap_err();
        assert!(matches!(err, GaugeError::MissingContainer));
        assert!(err.is_configuration());

        let by_id = GaugeOptions {
            id: Some("nope".into()),
            ..GaugeOptions::default()
        };
        let err = Gauge::new(by_id, SvgDocument::new()).unwrap_err();
        assert!(matches!(err, GaugeError::ContainerNotFound(ref id) if id == "nope"));
    }

    #[test]
    fn test_container_by_id() {
        let surface = SvgDocument::new().with_container(Container::new("ram").with_size(400.0, 200.0));
        let options = GaugeOptions {
            id: Some("ram".into()),
            ..GaugeOptions::default()
        };
        let gauge = Gauge::new(options, surface).unwrap();
        assert_eq!(gauge.surface().canvas().unwrap().view_box, (400.0, 200.0));
    }

    #[test]
    fn test_initial_draw_elements() {
        let gauge = settled(GaugeOptions {
            title: Some("CPU".into()),
            label: Some("percent".into()),
            pointer: Some(true),
            target_line: Some(80.0),
            ..options(30.0)
        });
        let handles = gauge.handles();
        assert!(handles.background.is_some());
        assert!(handles.level.is_some());
        assert!(handles.title.is_some());
        assert!(handles.label.is_some());
        assert!(handles.min.is_some() && handles.max.is_some());
        assert!(handles.pointer.is_some());
        assert!(handles.target_line.is_some());
        let doc = gauge.surface();
        assert_eq!(doc.text(handles.value.unwrap()), Some("30"));
        assert_eq!(doc.text(handles.min.unwrap()), Some("0"));
        assert_eq!(doc.text(handles.max.unwrap()), Some("100"));
    }

    #[test]
    fn test_donut_skips_min_max_and_rotates() {
        let gauge = settled(GaugeOptions {
            donut: Some(true),
            donut_start_angle: Some(45.0),
            ..options(10.0)
        });
        let handles = gauge.handles();
        assert!(handles.min.is_none());
        let transform = gauge
            .surface()
            .attr(handles.level.unwrap(), "transform")
            .unwrap();
        assert!(transform.starts_with("rotate(45 "));
    }

    #[test]
    fn test_zero_start_time_draws_final_state() {
        let gauge = Gauge::new(
            GaugeOptions {
                start_animation_time: Some(0.0),
                ..options(64.0)
            },
            SvgDocument::new(),
        )
        .unwrap();
        assert!(!gauge.is_animating());
        assert_eq!(gauge.displayed_value(), 64.0);
    }

    #[test]
    fn test_refresh_rejects_bad_input() {
        let mut gauge = settled(options(10.0));
        assert!(matches!(
            gauge.refresh(f64::NAN, None, None, None),
            Err(GaugeError::InvalidValue(_))
        ));
        assert!(matches!(
            gauge.refresh(5.0, Some(-1.0), None, None),
            Err(GaugeError::InvalidRange { .. })
        ));
        assert_eq!(gauge.value(), 10.0);
        assert_eq!(gauge.config().max, 100.0);
    }

    #[test]
    fn test_refresh_updates_text_immediately() {
        let clock = ManualClock::new();
        let mut gauge = Gauge::with_clock(options(10.0), SvgDocument::new(), clock.clone()).unwrap();
        gauge.finish_animation();

        gauge.refresh(150.0, Some(200.0), None, Some("rpm")).unwrap();
        let handles = gauge.handles().clone();
        let doc = gauge.surface();
        assert_eq!(doc.text(handles.value.unwrap()), Some("150"));
        assert_eq!(doc.text(handles.max.unwrap()), Some("200"));
        assert!(gauge.is_animating());

        clock.advance(Duration::from_millis(350));
        let mid = gauge.tick().unwrap();
        assert!(mid > 10.0 && mid < 150.0);
        clock.advance(Duration::from_millis(350));
        assert_eq!(gauge.tick(), Some(150.0));
        assert_eq!(gauge.tick(), None);
    }

    #[test]
    fn test_counter_text_follows_frames() {
        let clock = ManualClock::new();
        let opts = GaugeOptions {
            counter: Some(true),
            start_animation_type: Some("linear".into()),
            start_animation_time: Some(1000.0),
            ..options(100.0)
        };
        let mut gauge = Gauge::with_clock(opts, SvgDocument::new(), clock.clone()).unwrap();
        clock.advance(Duration::from_millis(500));
        gauge.tick();
        let value_id = gauge.handles().value.unwrap();
        assert_eq!(gauge.surface().text(value_id), Some("50"));
    }

    #[test]
    fn test_update_colors() {
        let mut gauge = settled(GaugeOptions {
            label: Some("load".into()),
            ..options(40.0)
        });
        assert_eq!(gauge.update("valueFontColor", &json!("#ff0000")), None);
        let value_id = gauge.handles().value.unwrap();
        assert_eq!(gauge.surface().attr(value_id, "fill"), Some("#ff0000"));

        let warning = gauge.update("labelFontColor", &json!("blue"));
        assert!(matches!(warning, Some(GaugeWarning::InvalidColor { .. })));
        assert_eq!(gauge.config().label_font_color, "#b3b3b3");

        gauge.update("gaugeColor", &json!("#222222"));
        let background = gauge.handles().background.unwrap();
        assert_eq!(gauge.surface().attr(background, "fill"), Some("#222222"));
    }

    #[test]
    fn test_update_unsupported_key() {
        let mut gauge = settled(options(40.0));
        let before = gauge.surface().to_svg();
        let warning = gauge.update("donut", &json!(true));
        assert_eq!(warning, Some(GaugeWarning::UnsupportedOption("donut".into())));
        assert_eq!(gauge.surface().to_svg(), before);
    }

    #[test]
    fn test_update_many_symbol_decimals_title() {
        let mut gauge = settled(options(12.346));
        let updates = json!({"symbol": "%", "decimals": 2, "title": "Disk", "bogus": 1});
        let warnings = gauge.update_many(updates.as_object().unwrap());
        assert_eq!(warnings.len(), 1);
        let handles = gauge.handles().clone();
        assert_eq!(gauge.surface().text(handles.value.unwrap()), Some("12.35%"));
        assert_eq!(gauge.surface().text(handles.title.unwrap()), Some("Disk"));
    }

    #[test]
    fn test_update_target_line_and_sectors() {
        let mut gauge = settled(options(40.0));
        assert!(gauge.handles().target_line.is_none());
        gauge.update("targetLine", &json!(75));
        assert!(gauge.handles().target_line.is_some());
        gauge.update("targetLine", &Value::Null);
        assert!(gauge.handles().target_line.is_none());

        gauge.update("showSectorColors", &json!(true));
        assert_eq!(gauge.handles().sectors.len(), 3);
        assert!(gauge.handles().level.is_none());

        gauge.update(
            "customSectors",
            &json!({"percents": true, "ranges": [{"lo": 0, "hi": 50, "color": "#00ff00"}, {"lo": 50, "hi": 100, "color": "#ff0000"}]}),
        );
        assert_eq!(gauge.handles().sectors.len(), 2);

        gauge.update("showSectorColors", &json!(false));
        assert!(gauge.handles().sectors.is_empty());
        let level = gauge.handles().level.unwrap();
        assert_eq!(gauge.surface().attr(level, "fill"), Some("#00ff00"));
    }

    #[test]
    fn test_inner_shadow_applied() {
        let gauge = settled(GaugeOptions {
            show_inner_shadow: Some(true),
            ..options(40.0)
        });
        let doc = gauge.surface();
        assert!(doc.filter("inner-shadow-gauge").is_some());
        let level = gauge.handles().level.unwrap();
        assert_eq!(doc.attr(level, "filter"), Some("url(#inner-shadow-gauge)"));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut gauge = settled(options(40.0));
        gauge.destroy();
        gauge.destroy();
        assert!(gauge.is_destroyed());
        assert!(gauge.surface().is_detached());
        assert!(matches!(
            gauge.refresh(1.0, None, None, None),
            Err(GaugeError::Destroyed)
        ));
        assert_eq!(gauge.update("symbol", &json!("%")), Some(GaugeWarning::Destroyed));
        assert_eq!(gauge.tick(), None);
    }

    fn assert_fill_below_overlays(gauge: &Gauge<SvgDocument>) {
        let handles = gauge.handles();
        let doc = gauge.surface();
        let background = doc.paint_index(handles.background.unwrap()).unwrap();
        let fills: Vec<usize> = handles
            .level
            .iter()
            .chain(handles.sectors.iter())
            .map(|id| doc.paint_index(*id).unwrap())
            .collect();
        assert!(!fills.is_empty());
        let overlays = [
            handles.value,
            handles.label,
            handles.min,
            handles.max,
            handles.pointer,
            handles.target_line,
        ];
        for fill in fills {
            assert!(fill > background);
            for overlay in overlays.iter().flatten() {
                assert!(fill < doc.paint_index(*overlay).unwrap());
            }
        }
    }

    #[test]
    fn test_fill_updates_keep_paint_order() {
        let mut gauge = settled(GaugeOptions {
            label: Some("load".into()),
            pointer: Some(true),
            target_line: Some(60.0),
            ..options(40.0)
        });
        let level = gauge.handles().level.unwrap();

        gauge.update("levelColors", &json!(["#00ff00", "#0000ff"]));
        assert_eq!(gauge.handles().level, Some(level));
        assert_fill_below_overlays(&gauge);

        gauge.update("showSectorColors", &json!(true));
        assert_fill_below_overlays(&gauge);

        gauge.refresh(50.0, Some(200.0), None, None).unwrap();
        assert_fill_below_overlays(&gauge);

        gauge.update(
            "customSectors",
            &json!({"percents": true, "ranges": [{"lo": 0, "hi": 100, "color": "#123456"}]}),
        );
        assert_eq!(gauge.handles().sectors.len(), 1);
        assert_fill_below_overlays(&gauge);

        gauge.update("showSectorColors", &json!(false));
        assert_fill_below_overlays(&gauge);

        let svg = gauge.surface().to_svg();
        let level = gauge.handles().level.unwrap();
        let fill = gauge.surface().attr(level, "d").unwrap();
        assert!(svg.find(fill).unwrap() < svg.find("<text").unwrap());
    }

    #[test]
    fn test_update_decimals_out_of_range() {
        let mut gauge = settled(GaugeOptions {
            decimals: Some(1),
            ..options(12.5)
        });
        for bad in [json!(1e12), json!(21), json!(-1)] {
            assert!(matches!(
                gauge.update("decimals", &bad),
                Some(GaugeWarning::InvalidOptionValue { .. })
            ));
        }
        assert_eq!(gauge.config().decimals, 1);
        let value = gauge.handles().value.unwrap();
        assert_eq!(gauge.surface().text(value), Some("12.5"));

        assert_eq!(gauge.update("decimals", &json!(20)), None);
        assert_eq!(gauge.config().decimals, 20);
    }

    #[test]
    fn test_update_rejects_malformed_colors() {
        let mut gauge = settled(GaugeOptions {
            target_line: Some(50.0),
            ..options(40.0)
        });
        let background = gauge.handles().background.unwrap();
        let level = gauge.handles().level.unwrap();
        let level_fill = gauge.surface().attr(level, "fill").unwrap().to_string();

        let warning = gauge.update("gaugeColor", &json!("not-a-color"));
        assert!(matches!(warning, Some(GaugeWarning::InvalidColor { .. })));
        assert_eq!(gauge.config().gauge_color, "#edebeb");
        assert_eq!(gauge.surface().attr(background, "fill"), Some("#edebeb"));

        let warning = gauge.update("levelColors", &json!(["zzz", "#ff0000"]));
        assert!(matches!(warning, Some(GaugeWarning::InvalidColor { ref value, .. }) if value == "zzz"));
        assert_eq!(gauge.config().level_colors.len(), 3);
        assert_eq!(gauge.surface().attr(level, "fill"), Some(level_fill.as_str()));

        let warning = gauge.update("targetLineColor", &json!("red"));
        assert!(matches!(warning, Some(GaugeWarning::InvalidColor { .. })));
        let line = gauge.handles().target_line.unwrap();
        assert_eq!(gauge.surface().attr(line, "stroke"), Some("#000000"));

        assert_eq!(gauge.update("targetLineColor", &json!("#00f")), None);
        assert_eq!(gauge.surface().attr(line, "stroke"), Some("#00f"));
    }

    #[test]
    fn test_differential_level_grows_from_midpoint() {
        let clock = ManualClock::new();
        let opts = GaugeOptions {
            differential: Some(true),
            ..options(80.0)
        };
        let mut gauge = Gauge::with_clock(opts, SvgDocument::new(), clock.clone()).unwrap();
        assert_eq!(gauge.displayed_value(), 50.0);

        clock.advance(Duration::from_millis(200));
        let mid = gauge.tick().unwrap();
        assert!(mid > 50.0 && mid < 80.0);

        gauge.finish_animation();
        let expected = gauge_path(
            SectorSpan::Value(80.0),
            0.0,
            100.0,
            &gauge.layout.ring,
            ArcMode::Differential,
        );
        let level = gauge.handles().level.unwrap();
        assert_eq!(gauge.surface().attr(level, "d"), Some(expected.as_str()));
    }
}
