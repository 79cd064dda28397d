//! Gauge geometry: widget box, annular paths, needle and text layout.
//!
//! All angles are in radians measured counter-clockwise from the positive x
//! axis, with SVG's y axis pointing down. A semicircular gauge sweeps from π
//! (left, min) to 0 (right, max); a donut sweeps a full turn starting at π and
//! is rotated into place with a transform rather than baked-in coordinates.

use std::f64::consts::PI;

use crate::config::{GaugeConfig, TitlePosition, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Angular span (in turns) at or above which a donut arc is drawn as two halves.
const FULL_TURN_THRESHOLD: f64 = 0.999;

/// Differential fills switch sweep direction at the middle of the range.
const DIFFERENTIAL_MIDPOINT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn polar(center: Point, radius: f64, alpha: f64) -> Self {
        Self::new(
            center.x + radius * alpha.cos(),
            center.y - radius * alpha.sin(),
        )
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

// =============================================================================
// Canvas
// =============================================================================

/// Outer `<svg>` sizing.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    /// `width` attribute: pixels, or `100%` for relative sizing.
    pub width: String,
    pub height: String,
    pub view_box: (f64, f64),
    pub preserve_aspect_ratio: Option<&'static str>,
}

impl Canvas {
    /// Size the canvas from the resolved config and the host container.
    ///
    /// Relative sizing uses a fixed view box so the drawing scales with the
    /// container; fixed sizing uses the configured size, then the container's
    /// laid-out size, then 200×100.
    pub fn for_config(config: &GaugeConfig, container_size: (Option<f64>, Option<f64>)) -> Self {
        if config.relative_gauge_size {
            let height = match (config.donut, config.has_title()) {
                (true, true) => 240.0,
                (true, false) => 200.0,
                (false, true) => 150.0,
                (false, false) => 100.0,
            };
            return Self {
                width: "100%".into(),
                height: "100%".into(),
                view_box: (200.0, height),
                preserve_aspect_ratio: Some("xMidYMid meet"),
            };
        }

        let pick = |explicit: Option<f64>, laid_out: Option<f64>, fallback: f64| {
            explicit
                .filter(|v| *v > 0.0)
                .or(laid_out.filter(|v| *v > 0.0))
                .unwrap_or(fallback)
        };
        let width = pick(config.width, container_size.0, DEFAULT_WIDTH);
        let height = pick(config.height, container_size.1, DEFAULT_HEIGHT);

        Self {
            width: width.to_string(),
            height: height.to_string(),
            view_box: (width, height),
            preserve_aspect_ratio: None,
        }
    }
}

// =============================================================================
// Widget Box
// =============================================================================

/// The square (donut) or 2:1-ish (semicircle) box the gauge is fitted into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetBox {
    pub width: f64,
    pub height: f64,
    pub dx: f64,
    pub dy: f64,
}

impl WidgetBox {
    /// Fit the widget into a `w × h` drawing area.
    ///
    /// # Arguments
    /// * `w`, `h` - Drawing area (the canvas view box)
    /// * `has_title` - Reserve vertical room for a title
    /// * `title_position` - Titles below shift the widget up
    /// * `donut` - Full circle instead of a semicircle
    pub fn fit(w: f64, h: f64, has_title: bool, title_position: TitlePosition, donut: bool) -> Self {
        if donut {
            let size = w.min(h);
            return Self {
                width: size,
                height: size,
                dx: (w - size) / 2.0,
                dy: (h - size) / 2.0,
            };
        }

        let (mut width, mut height);
        if w > h {
            height = h;
            width = if has_title { height * 1.25 } else { height * 2.0 };
            if width > w {
                let aspect = width / w;
                width /= aspect;
                height /= aspect;
            }
        } else if w < h {
            width = w;
            height = if has_title { width / 1.25 } else { width / 2.0 };
        } else {
            width = w;
            height = if has_title { width * 0.75 } else { width * 0.5 };
        }

        let dx = (w - width) / 2.0;
        let mut dy = (h - height) / 2.0;
        if has_title && title_position == TitlePosition::Below {
            dy -= height / 6.4;
        }

        Self {
            width,
            height,
            dx,
            dy,
        }
    }

    /// Ring thickness after scaling.
    pub fn gauge_width(&self, scale: f64) -> f64 {
        self.width * 3.0 / 20.0 * scale
    }
}

/// Center and radii of the gauge ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    pub center: Point,
    pub outer: f64,
    pub inner: f64,
    pub donut: bool,
}

impl Ring {
    pub fn new(widget: &WidgetBox, donut: bool, gauge_width_scale: f64) -> Self {
        let (cy, outer) = if donut {
            (
                widget.dy + widget.height / 2.0,
                widget.width / 2.0 - widget.width / 30.0,
            )
        } else {
            (
                widget.dy + widget.height / 1.25,
                widget.width / 2.0 - widget.width / 10.0,
            )
        };
        Self {
            center: Point::new(widget.dx + widget.width / 2.0, cy),
            outer,
            inner: outer - widget.gauge_width(gauge_width_scale),
            donut,
        }
    }

    /// Angle of a range fraction on this ring.
    pub fn angle(&self, fraction: f64) -> f64 {
        if self.donut {
            (1.0 - 2.0 * fraction) * PI
        } else {
            (1.0 - fraction) * PI
        }
    }
}

// =============================================================================
// Paths
// =============================================================================

/// How a filled arc grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcMode {
    /// Half circle, filled from the left end.
    Semicircle,
    /// Full circle, filled clockwise from the start angle.
    Donut,
    /// Half circle, filled outwards from the middle.
    Differential,
}

impl ArcMode {
    /// Donut geometry takes precedence over differential filling.
    pub fn for_gauge(donut: bool, differential: bool) -> Self {
        match (donut, differential) {
            (true, _) => ArcMode::Donut,
            (false, true) => ArcMode::Differential,
            (false, false) => ArcMode::Semicircle,
        }
    }
}

/// Portion of the gauge a path should cover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectorSpan {
    /// From `min` up to a raw value.
    Value(f64),
    /// Between two raw values.
    Values { from: f64, to: f64 },
    /// Between two relative positions: fractions when both are ≤ 1,
    /// percentages otherwise.
    Relative { from: f64, to: f64 },
}

impl SectorSpan {
    /// Normalize to `(start, end)` fractions of `(max - min)`.
    pub fn fractions(self, min: f64, max: f64) -> (f64, f64) {
        let range = max - min;
        match self {
            SectorSpan::Value(v) => (0.0, (v - min) / range),
            SectorSpan::Values { from, to } => ((from - min) / range, (to - min) / range),
            SectorSpan::Relative { from, to } if from <= 1.0 && to <= 1.0 => (from, to),
            SectorSpan::Relative { from, to } => (from / 100.0, to / 100.0),
        }
    }
}

/// Build the SVG path data for an annular sector.
///
/// # Arguments
/// * `span` - What part of the range to cover
/// * `min`, `max` - Gauge domain
/// * `ring` - Center and radii
/// * `mode` - Semicircle, donut or differential filling
///
/// # Returns
/// A closed path (`M .. Z`) with two radial edges joined by outer and inner arcs.
pub fn gauge_path(span: SectorSpan, min: f64, max: f64, ring: &Ring, mode: ArcMode) -> String {
    let (start, end) = span.fractions(min, max);
    let Ring {
        center,
        outer: ro,
        inner: ri,
        ..
    } = *ring;

    match mode {
        ArcMode::Donut => {
            let alpha = (1.0 - 2.0 * end) * PI;
            let alpha_start = (1.0 - 2.0 * start) * PI;
            let outer_end = Point::polar(center, ro, alpha);
            let inner_end = Point::polar(center, ri, alpha);
            let outer_start = Point::polar(center, ro, alpha_start);
            let inner_start = Point::polar(center, ri, alpha_start);

            let span = (end - start).abs();
            if span >= FULL_TURN_THRESHOLD {
                // A single arc with coincident endpoints draws nothing
                let outer_mid = Point::new(center.x + ro, center.y);
                let inner_mid = Point::new(center.x + ri, center.y);
                format!(
                    "M{is} L{os} A{ro},{ro} 0 0 1 {om} A{ro},{ro} 0 0 1 {os} L{is} A{ri},{ri} 0 0 0 {im} A{ri},{ri} 0 0 0 {is} Z",
                    is = inner_start,
                    os = outer_start,
                    om = outer_mid,
                    im = inner_mid,
                    ro = ro,
                    ri = ri,
                )
            } else {
                let large_arc = u8::from(span > 0.5);
                format!(
                    "M{is} L{os} A{ro},{ro} 0 {la} 1 {oe} L{ie} A{ri},{ri} 0 {la} 0 {is} Z",
                    is = inner_start,
                    os = outer_start,
                    oe = outer_end,
                    ie = inner_end,
                    la = large_arc,
                    ro = ro,
                    ri = ri,
                )
            }
        }
        ArcMode::Differential => {
            let alpha = (1.0 - end) * PI;
            let outer_end = Point::polar(center, ro, alpha);
            let inner_end = Point::polar(center, ri, alpha);
            let below_mid = end < DIFFERENTIAL_MIDPOINT;
            let sweep_outer = u8::from(!below_mid);
            let sweep_inner = u8::from(below_mid);
            let inner_top = Point::new(center.x, center.y - ri);
            let outer_top = Point::new(center.x, center.y - ro);
            format!(
                "M{it} L{ot} A{ro},{ro} 0 0 {so} {oe} L{ie} A{ri},{ri} 0 0 {si} {it} Z",
                it = inner_top,
                ot = outer_top,
                oe = outer_end,
                ie = inner_end,
                so = sweep_outer,
                si = sweep_inner,
                ro = ro,
                ri = ri,
            )
        }
        ArcMode::Semicircle => {
            let alpha = (1.0 - end) * PI;
            let alpha_start = (1.0 - start) * PI;
            let outer_end = Point::polar(center, ro, alpha);
            let inner_end = Point::polar(center, ri, alpha);
            let outer_start = Point::polar(center, ro, alpha_start);
            let inner_start = Point::polar(center, ri, alpha_start);
            format!(
                "M{is} L{os} A{ro},{ro} 0 0 1 {oe} L{ie} A{ri},{ri} 0 0 0 {is} Z",
                is = inner_start,
                os = outer_start,
                oe = outer_end,
                ie = inner_end,
                ro = ro,
                ri = ri,
            )
        }
    }
}

/// Needle dimensions in user units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeedleSize {
    /// How far the tip reaches past the outer radius.
    pub top_length: f64,
    /// How far the base sits inside the inner radius.
    pub bottom_length: f64,
    /// Half-width of the base.
    pub bottom_width: f64,
}

impl NeedleSize {
    /// Defaults scale with the widget; explicit lengths are used as-is.
    pub fn for_widget(
        widget: &WidgetBox,
        top_length: Option<f64>,
        bottom_length: Option<f64>,
        bottom_width: Option<f64>,
    ) -> Self {
        Self {
            top_length: top_length.unwrap_or(widget.width * 3.5 / 100.0),
            bottom_length: bottom_length.unwrap_or(widget.width / 15.0),
            bottom_width: bottom_width.unwrap_or(widget.width / 100.0),
        }
    }
}

/// Triangular needle pointing at `fraction` of the range.
pub fn pointer_path(fraction: f64, ring: &Ring, size: &NeedleSize) -> String {
    let alpha = ring.angle(fraction);
    let (sin, cos) = alpha.sin_cos();
    let outer = Point::polar(ring.center, ring.outer, alpha);
    let inner = Point::polar(ring.center, ring.inner, alpha);

    let tip = Point::new(outer.x + size.top_length * cos, outer.y - size.top_length * sin);
    let base = Point::new(
        inner.x - size.bottom_length * cos,
        inner.y + size.bottom_length * sin,
    );
    let side_a = Point::new(
        base.x + size.bottom_width * sin,
        base.y + size.bottom_width * cos,
    );
    let side_b = Point::new(
        base.x - size.bottom_width * sin,
        base.y - size.bottom_width * cos,
    );

    format!("M{} L{} L{} Z", side_a, side_b, tip)
}

/// Endpoints `(inner, outer)` of the radial tick across the ring at
/// `fraction` of the range.
pub fn target_line(fraction: f64, ring: &Ring) -> (Point, Point) {
    let alpha = ring.angle(fraction);
    (
        Point::polar(ring.center, ring.inner, alpha),
        Point::polar(ring.center, ring.outer, alpha),
    )
}

/// Transform rotating a donut element about the ring center.
pub fn donut_rotation(angle_deg: f64, ring: &Ring) -> String {
    format!("rotate({} {} {})", angle_deg, ring.center.x, ring.center.y)
}

// =============================================================================
// Text Layout
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizes {
    pub title: f64,
    pub value: f64,
    pub label: f64,
    pub min_max: f64,
}

impl FontSizes {
    pub fn for_widget(widget: &WidgetBox, config: &GaugeConfig) -> Self {
        let h = widget.height;
        let title = if h / 8.0 > config.title_min_font_size {
            h / 10.0
        } else {
            config.title_min_font_size
        };

        if config.donut {
            let small = (h / 16.0).max(10.0);
            return Self {
                title,
                value: if h / 6.4 > 16.0 { h / 5.4 } else { 18.0 },
                label: small,
                min_max: small,
            };
        }

        Self {
            title,
            value: (h / 6.5).max(config.value_min_font_size),
            label: (h / 16.0).max(config.label_min_font_size),
            min_max: (h / 16.0).max(config.min_label_min_font_size),
        }
    }
}

/// Anchor points (all `text-anchor: middle`) for every text element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextLayout {
    pub title: Point,
    pub value: Point,
    pub label: Point,
    /// Where the min text goes; already swapped for reversed gauges.
    pub min: Point,
    pub max: Point,
}

impl TextLayout {
    pub fn new(widget: &WidgetBox, fonts: &FontSizes, config: &GaugeConfig) -> Self {
        let WidgetBox {
            width: w,
            height: h,
            dx,
            dy,
        } = *widget;
        let cx = dx + w / 2.0;
        let below = config.title_position == TitlePosition::Below;

        let title_y = if config.donut {
            dy + if below { h + 15.0 } else { -5.0 }
        } else {
            dy + if below { h * 1.07 } else { h / 6.4 }
        };

        let value_y = match (config.donut, config.label.is_empty()) {
            (true, false) => dy + h / 1.85,
            (true, true) => dy + h / 1.7,
            (false, _) => dy + h / 1.275,
        };

        let under_value = if config.donut {
            value_y + fonts.label
        } else {
            value_y + fonts.value / 2.0 + 5.0
        };

        let half_ring = widget.gauge_width(config.gauge_width_scale) / 2.0;
        let left = Point::new(dx + w / 10.0 + half_ring, under_value);
        let right = Point::new(dx + w - w / 10.0 - half_ring, under_value);
        let (min, max) = if config.reverse {
            (right, left)
        } else {
            (left, right)
        };

        Self {
            title: Point::new(cx, title_y),
            value: Point::new(cx, value_y),
            label: Point::new(cx, under_value),
            min,
            max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Container, GaugeOptions};

    fn semicircle_ring() -> Ring {
        let widget = WidgetBox::fit(200.0, 100.0, false, TitlePosition::Above, false);
        Ring::new(&widget, false, 1.0)
    }

    fn donut_ring() -> Ring {
        let widget = WidgetBox::fit(200.0, 200.0, false, TitlePosition::Above, true);
        Ring::new(&widget, true, 1.0)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_widget_box_wide() {
        let widget = WidgetBox::fit(400.0, 100.0, false, TitlePosition::Above, false);
        assert_eq!(widget.width, 200.0);
        assert_eq!(widget.height, 100.0);
        assert_eq!(widget.dx, 100.0);
        assert_eq!(widget.dy, 0.0);
    }

    #[test]
    fn test_widget_box_scaled_to_fit() {
        // 2h would be 300 > 200, so scale down by 1.5
        let widget = WidgetBox::fit(200.0, 150.0, false, TitlePosition::Above, false);
        assert!(close(widget.width, 200.0));
        assert!(close(widget.height, 100.0));
        assert!(close(widget.dy, 25.0));
    }

    #[test]
    fn test_widget_box_tall_and_square() {
        let tall = WidgetBox::fit(100.0, 300.0, true, TitlePosition::Above, false);
        assert_eq!(tall.width, 100.0);
        assert_eq!(tall.height, 80.0);

        let square = WidgetBox::fit(100.0, 100.0, true, TitlePosition::Below, false);
        assert_eq!(square.height, 75.0);
        assert!(close(square.dy, 12.5 - 75.0 / 6.4));
    }

    #[test]
    fn test_widget_box_donut() {
        let widget = WidgetBox::fit(300.0, 200.0, false, TitlePosition::Above, true);
        assert_eq!((widget.width, widget.height), (200.0, 200.0));
        assert_eq!((widget.dx, widget.dy), (50.0, 0.0));
    }

    #[test]
    fn test_ring_radii() {
        let ring = semicircle_ring();
        assert_eq!(ring.center, Point::new(100.0, 80.0));
        assert!(close(ring.outer, 80.0));
        assert!(close(ring.inner, 50.0));

        let ring = donut_ring();
        assert_eq!(ring.center, Point::new(100.0, 100.0));
        assert!(close(ring.outer, 100.0 - 200.0 / 30.0));
    }

    #[test]
    fn test_span_normalization() {
        assert_eq!(SectorSpan::Value(25.0).fractions(0.0, 100.0), (0.0, 0.25));
        assert_eq!(
            SectorSpan::Values { from: 150.0, to: 200.0 }.fractions(100.0, 300.0),
            (0.25, 0.5)
        );
        assert_eq!(SectorSpan::Relative { from: 0.2, to: 0.6 }.fractions(0.0, 50.0), (0.2, 0.6));
        assert_eq!(SectorSpan::Relative { from: 20.0, to: 60.0 }.fractions(0.0, 50.0), (0.2, 0.6));
    }

    #[test]
    fn test_semicircle_path_shape() {
        let path = gauge_path(SectorSpan::Value(100.0), 0.0, 100.0, &semicircle_ring(), ArcMode::Semicircle);
        assert!(path.starts_with("M50,"));
        assert!(path.contains("A80,80 0 0 1"));
        assert!(path.contains("A50,50 0 0 0"));
        assert!(path.ends_with('Z'));
    }

    #[test]
    fn test_full_donut_uses_two_half_arcs() {
        let ring = donut_ring();
        let full = gauge_path(SectorSpan::Value(100.0), 0.0, 100.0, &ring, ArcMode::Donut);
        assert_eq!(full.matches('A').count(), 4);

        let partial = gauge_path(SectorSpan::Value(75.0), 0.0, 100.0, &ring, ArcMode::Donut);
        assert_eq!(partial.matches('A').count(), 2);
        assert!(partial.contains(" 0 1 1 "), "large arc expected: {}", partial);

        let small = gauge_path(SectorSpan::Value(25.0), 0.0, 100.0, &ring, ArcMode::Donut);
        assert!(small.contains(" 0 0 1 "));
    }

    #[test]
    fn test_differential_sweep_flags() {
        let ring = semicircle_ring();
        let low = gauge_path(SectorSpan::Value(25.0), 0.0, 100.0, &ring, ArcMode::Differential);
        assert!(low.starts_with("M100,30 L100,0"));
        assert!(low.contains("A80,80 0 0 0"));
        assert!(low.contains("A50,50 0 0 1"));

        let high = gauge_path(SectorSpan::Value(75.0), 0.0, 100.0, &ring, ArcMode::Differential);
        assert!(high.contains("A80,80 0 0 1"));
        assert!(high.contains("A50,50 0 0 0"));
    }

    #[test]
    fn test_arc_mode_precedence() {
        assert_eq!(ArcMode::for_gauge(true, true), ArcMode::Donut);
        assert_eq!(ArcMode::for_gauge(false, true), ArcMode::Differential);
        assert_eq!(ArcMode::for_gauge(false, false), ArcMode::Semicircle);
    }

    #[test]
    fn test_pointer_at_midpoint_points_up() {
        let ring = semicircle_ring();
        let widget = WidgetBox::fit(200.0, 100.0, false, TitlePosition::Above, false);
        let size = NeedleSize::for_widget(&widget, None, None, None);
        assert!(close(size.top_length, 7.0));
        let path = pointer_path(0.5, &ring, &size);
        // Tip sits straight above the center at Ro + toplength
        let tip = path.rsplit(" L").next().unwrap().trim_end_matches(" Z");
        let (x, y) = tip.split_once(',').unwrap();
        assert!(close(x.parse::<f64>().unwrap(), 100.0));
        assert!(close(y.parse::<f64>().unwrap(), 80.0 - 80.0 - 7.0));
    }

    #[test]
    fn test_target_line_at_max() {
        let (inner, outer) = target_line(1.0, &semicircle_ring());
        assert_eq!(inner, Point::new(150.0, 80.0));
        assert_eq!(outer, Point::new(180.0, 80.0));
    }

    #[test]
    fn test_donut_rotation() {
        assert_eq!(donut_rotation(90.0, &donut_ring()), "rotate(90 100 100)");
    }

    #[test]
    fn test_canvas_sizing() {
        let config = GaugeOptions {
            relative_gauge_size: Some(true),
            title: Some("CPU".into()),
            ..GaugeOptions::default()
        }
        .resolve(&Container::new("g"))
        .unwrap();
        let canvas = Canvas::for_config(&config, (None, None));
        assert_eq!(canvas.width, "100%");
        assert_eq!(canvas.view_box, (200.0, 150.0));

        let config = GaugeOptions::default().resolve(&Container::new("g")).unwrap();
        assert_eq!(Canvas::for_config(&config, (Some(320.0), None)).view_box, (320.0, 100.0));
    }

    #[test]
    fn test_text_layout_reverse_swaps_bounds() {
        let widget = WidgetBox::fit(200.0, 100.0, false, TitlePosition::Above, false);
        let mut config = GaugeOptions::default().resolve(&Container::new("g")).unwrap();
        let fonts = FontSizes::for_widget(&widget, &config);
        assert_eq!(fonts.value, 16.0);
        assert_eq!(fonts.min_max, 10.0);

        let normal = TextLayout::new(&widget, &fonts, &config);
        config.reverse = true;
        let reversed = TextLayout::new(&widget, &fonts, &config);
        assert_eq!(normal.min, reversed.max);
        assert_eq!(normal.max, reversed.min);
        assert!(close(normal.min.x, 20.0 + 15.0));
    }
}
