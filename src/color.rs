use crate::slider::DragDirection;

// ---------------------------------------------------------------------------
// HslColor
// ---------------------------------------------------------------------------

/// A color in the HSL (Hue, Saturation, Lightness) color space.
///
/// - `h`: hue in degrees, 0.0..360.0
/// - `s`: saturation as a percentage, 0.0..100.0
/// - `l`: lightness as a percentage, 0.0..100.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HslColor {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl HslColor {
    /// Create a new `HslColor`. Values are wrapped/clamped into their valid ranges.
    pub fn new(h: f64, s: f64, l: f64) -> Self {
        Self {
            h: h.rem_euclid(360.0),
            s: s.clamp(0.0, 100.0),
            l: l.clamp(0.0, 100.0),
        }
    }

    /// Convert to an (r, g, b) tuple with each channel in 0..255.
    pub fn to_rgb(self) -> (u8, u8, u8) {
        let h = self.h / 360.0;
        let s = self.s / 100.0;
        let l = self.l / 100.0;

        if s == 0.0 {
            let v = (l * 255.0).round() as u8;
            return (v, v, v);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
        let g = hue_to_rgb(p, q, h);
        let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

        (
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
        )
    }

    /// CSS-style descriptor, e.g. `hsl(210, 60%, 55%)`.
    pub fn to_css(self) -> String {
        format!("hsl({:.0}, {:.0}%, {:.0}%)", self.h, self.s, self.l)
    }

    pub fn to_ratatui_color(self) -> ratatui::style::Color {
        let (r, g, b) = self.to_rgb();
        ratatui::style::Color::Rgb(r, g, b)
    }
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

// ---------------------------------------------------------------------------
// Direction-aware transforms
// ---------------------------------------------------------------------------

const ENHANCE_SATURATION_BOOST: f64 = 20.0;
const ENHANCE_LIGHTNESS_BOOST: f64 = 10.0;
const ENHANCE_SATURATION_CEILING: f64 = 100.0;
const ENHANCE_LIGHTNESS_CEILING: f64 = 70.0;

const FADE_SATURATION_FLOOR: f64 = 20.0;
const FADE_LIGHTNESS_FLOOR: f64 = 40.0;
const FADE_MIN_INTENSITY: f64 = 0.3;

/// Raise saturation by up to 20 points and lightness by up to 10 points,
/// scaled by `intensity` in `[0, 1]`. Saturation stays <= 100 and
/// lightness <= 70.
pub fn enhance(base: HslColor, intensity: f64) -> HslColor {
    let intensity = unit(intensity);
    HslColor {
        h: base.h,
        s: (base.s + ENHANCE_SATURATION_BOOST * intensity).min(ENHANCE_SATURATION_CEILING),
        l: (base.l + ENHANCE_LIGHTNESS_BOOST * intensity).min(ENHANCE_LIGHTNESS_CEILING),
    }
}

/// Scale saturation and lightness by `fade_intensity` in `[0, 1]`,
/// floored at saturation >= 20 and lightness >= 40.
pub fn fade(base: HslColor, fade_intensity: f64) -> HslColor {
    let fade_intensity = unit(fade_intensity);
    HslColor {
        h: base.h,
        s: (base.s * fade_intensity).clamp(FADE_SATURATION_FLOOR, 100.0),
        l: (base.l * fade_intensity).clamp(FADE_LIGHTNESS_FLOOR, 100.0),
    }
}

/// NaN collapses to 0 so no non-finite value reaches a color channel.
fn unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Hue families
// ---------------------------------------------------------------------------

/// Which hue-mapping family a slider uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Blue at the cold end sweeping to a warm orange-red.
    Temperature,
    /// Token budget: yellow-green sweeping to a deep green.
    Capacity,
    /// Symmetric penalties: purple through magenta to orange.
    Penalty,
    Default,
}

impl ChannelKind {
    /// Base color for a value at `percentage` (0..100) of the channel range.
    pub fn base_color(self, percentage: f64) -> HslColor {
        let p = unit(percentage / 100.0);
        match self {
            ChannelKind::Temperature => HslColor::new(220.0 - 200.0 * p, 70.0, 55.0),
            ChannelKind::Capacity => HslColor::new(80.0 + 70.0 * p, 60.0, 48.0),
            ChannelKind::Penalty => HslColor::new(270.0 + 120.0 * p, 65.0, 55.0),
            ChannelKind::Default => HslColor::new(210.0, 60.0, 55.0),
        }
    }
}

// ---------------------------------------------------------------------------
// SliderPaint
// ---------------------------------------------------------------------------

/// Neutral color of the unfilled part of a track.
pub const TRACK_COLOR: HslColor = HslColor {
    h: 230.0,
    s: 15.0,
    l: 25.0,
};

/// Two-stop linear fill plus thumb accent for one slider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderPaint {
    /// Fill position of the value, 0..100.
    pub percentage: f64,
    /// Color from 0% to `percentage`.
    pub active: HslColor,
    /// Color from `percentage` to 100%.
    pub track: HslColor,
    pub thumb: HslColor,
    pub thumb_glow: HslColor,
}

impl SliderPaint {
    /// Color of a track cell whose center is at `position` (0..100).
    pub fn color_at(&self, position: f64) -> HslColor {
        if position <= self.percentage {
            self.active
        } else {
            self.track
        }
    }

    /// CSS `linear-gradient` for the fill, as written to the trace log.
    pub fn to_css_gradient(&self) -> String {
        format!(
            "linear-gradient(to right, {a} 0%, {a} {p:.1}%, {t} {p:.1}%, {t} 100%)",
            a = self.active.to_css(),
            t = self.track.to_css(),
            p = self.percentage,
        )
    }
}

/// Pick the active color for a channel at `percentage` moving in `direction`.
pub fn directional_color(kind: ChannelKind, percentage: f64, direction: DragDirection) -> HslColor {
    let base = kind.base_color(percentage);
    let p = unit(percentage / 100.0);
    match direction {
        DragDirection::Right => enhance(base, p),
        DragDirection::Left => fade(base, p.max(FADE_MIN_INTENSITY)),
        DragDirection::Static => base,
    }
}

pub fn paint(kind: ChannelKind, percentage: f64, direction: DragDirection) -> SliderPaint {
    let percentage = unit(percentage / 100.0) * 100.0;
    let active = directional_color(kind, percentage, direction);
    SliderPaint {
        percentage,
        active,
        track: TRACK_COLOR,
        thumb: enhance(active, 1.0),
        thumb_glow: HslColor::new(active.h, active.s * 0.6, active.l * 0.5),
    }
}
