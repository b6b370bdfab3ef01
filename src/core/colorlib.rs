//! Color primitives: hex encoding, RGB/HSL conversion and HSL normalization

use palette::{FromColor, Hsl, Srgb};
use serde::{Deserialize, Serialize};

type PaletteHsl = Hsl<palette::encoding::Srgb, f64>;

/// Lower lightness bound of the visible range
pub const MIN_LIGHTNESS: f64 = 0.32;
/// Upper lightness bound of the visible range
pub const MAX_LIGHTNESS: f64 = 0.62;
/// Saturation floor for normalized colors
pub const MIN_SATURATION: f64 = 0.18;

/// Share of the distance to white covered by a tint
pub const TINT_FACTOR: f64 = 0.6;
/// Scale applied to every channel for a shade
pub const SHADE_FACTOR: f64 = 0.65;

/// RGB color with floating channels in 0..=255
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn channels(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    /// Channels rounded to the nearest integer and clamped to a byte
    pub fn to_bytes(&self) -> [u8; 3] {
        [round_channel(self.r), round_channel(self.g), round_channel(self.b)]
    }

    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }

    /// max - min of the channels scaled to 0..=1
    pub fn chroma(&self) -> f64 {
        let [r, g, b] = self.channels().map(|c| c / 255.0);
        r.max(g).max(b) - r.min(g).min(b)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(value: [u8; 3]) -> Self {
        Self::new(value[0] as f64, value[1] as f64, value[2] as f64)
    }
}

/// Hue in degrees, saturation and lightness in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HslColor {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

impl HslColor {
    pub fn new(hue: f64, saturation: f64, lightness: f64) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }

    pub fn from_rgb(rgb: Rgb) -> Self {
        let srgb = Srgb::new(rgb.r / 255.0, rgb.g / 255.0, rgb.b / 255.0);
        let hsl = PaletteHsl::from_color(srgb);

        Self {
            hue: hsl.hue.into_positive_degrees(),
            saturation: hsl.saturation,
            lightness: hsl.lightness,
        }
    }

    /// Convert back to RGB, clamping every channel into range
    pub fn to_rgb(self) -> Rgb {
        let hsl = PaletteHsl::new(self.hue, self.saturation, self.lightness);
        let srgb = Srgb::from_color(hsl);

        Rgb::new(
            srgb.red.clamp(0.0, 1.0) * 255.0,
            srgb.green.clamp(0.0, 1.0) * 255.0,
            srgb.blue.clamp(0.0, 1.0) * 255.0,
        )
    }

    /// Same saturation and lightness, hue rotated modulo 360
    pub fn shift_hue(self, degrees: f64) -> Self {
        Self {
            hue: (self.hue + degrees).rem_euclid(360.0),
            ..self
        }
    }

    /// Same hue and saturation, lightness replaced
    pub fn with_lightness(self, lightness: f64) -> Self {
        Self { lightness, ..self }
    }

    /// Pull saturation and lightness into the visible mid range.
    ///
    /// An explicit `target_lightness` replaces lightness outright and skips the
    /// range compression. Out-of-range lightness is compressed, not clamped:
    /// dark values land in `[0.32, 0.4224)` and light values in `(0.4756, 0.62]`.
    pub fn normalized(self, target_lightness: Option<f64>) -> Self {
        let hue = self.hue.rem_euclid(360.0);
        let mut saturation = self.saturation.clamp(0.0, 1.0);
        let mut lightness = self.lightness.clamp(0.0, 1.0);

        match target_lightness {
            Some(target) => lightness = target.clamp(0.0, 1.0),
            None => {
                if lightness < MIN_LIGHTNESS {
                    lightness = MIN_LIGHTNESS + lightness * MIN_LIGHTNESS;
                } else if lightness > MAX_LIGHTNESS {
                    lightness = MAX_LIGHTNESS - (1.0 - lightness) * (1.0 - MAX_LIGHTNESS);
                }
            }
        }

        if saturation < MIN_SATURATION {
            saturation = MIN_SATURATION + saturation * (1.0 - MIN_SATURATION);
        }

        Self::new(hue, saturation, lightness)
    }
}

/// Color library for hex encoding and tint/shade derivation
pub struct ColorLib;

impl ColorLib {
    /// Convert RGB to a lowercase `#rrggbb` string, rounding each channel
    pub fn rgb_to_hex(rgb: Rgb) -> String {
        let [r, g, b] = rgb.to_bytes();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    /// Convert a `#rrggbb` (or `rrggbb`) string to RGB
    pub fn hex_to_rgb(hex: &str) -> Option<Rgb> {
        let hex = hex.trim().trim_start_matches('#');

        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

        Some(Rgb::from([r, g, b]))
    }

    /// Move each channel `factor` of the way toward white
    pub fn lighten(rgb: [u8; 3], factor: f64) -> [u8; 3] {
        rgb.map(|c| round_channel(c as f64 + (255.0 - c as f64) * factor))
    }

    /// Scale each channel by `factor` toward black
    pub fn darken(rgb: [u8; 3], factor: f64) -> [u8; 3] {
        rgb.map(|c| round_channel(c as f64 * factor))
    }

    /// Hex triple (tint, original, shade) for one color
    pub fn tint_shade(rgb: Rgb) -> (String, String, String) {
        let original = rgb.to_bytes();
        let tint = Self::lighten(original, TINT_FACTOR);
        let shade = Self::darken(original, SHADE_FACTOR);

        (
            Self::rgb_to_hex(Rgb::from(tint)),
            Self::rgb_to_hex(Rgb::from(original)),
            Self::rgb_to_hex(Rgb::from(shade)),
        )
    }
}

// halves go to the even neighbour
fn round_channel(value: f64) -> u8 {
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Rgb, b: Rgb, tolerance: f64) {
        for (x, y) in a.channels().iter().zip(b.channels()) {
            assert!((x - y).abs() <= tolerance, "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn test_hex_round_trip() {
        for hex in ["#000000", "#ffffff", "#336699", "#ABCDEF", "#0a0B0c"] {
            let rgb = ColorLib::hex_to_rgb(hex).unwrap();
            assert_eq!(ColorLib::rgb_to_hex(rgb), hex.to_lowercase());
        }
    }

    #[test]
    fn test_hex_rejects_malformed() {
        assert!(ColorLib::hex_to_rgb("#12345").is_none());
        assert!(ColorLib::hex_to_rgb("#gg0000").is_none());
        assert!(ColorLib::hex_to_rgb("").is_none());
        assert!(ColorLib::hex_to_rgb("#1234567").is_none());
    }

    #[test]
    fn test_hex_rounds_floating_channels() {
        assert_eq!(ColorLib::rgb_to_hex(Rgb::new(10.4, 10.5, 254.6)), "#0a0aff");
        assert_eq!(ColorLib::rgb_to_hex(Rgb::new(11.5, 0.5, 1.5)), "#0c0002");
    }

    #[test]
    fn test_hsl_round_trip() {
        let mut samples = Vec::new();
        for r in (0..=255).step_by(51) {
            for g in (0..=255).step_by(51) {
                for b in (0..=255).step_by(51) {
                    samples.push([r as u8, g as u8, b as u8]);
                }
            }
        }
        samples.push([12, 200, 77]);
        samples.push([255, 128, 1]);

        for bytes in samples {
            let rgb = Rgb::from(bytes);
            let back = HslColor::from_rgb(rgb).to_rgb();
            assert_close(back, rgb, 1.0);
        }
    }

    #[test]
    fn test_hsl_of_primaries() {
        let red = HslColor::from_rgb(Rgb::new(255.0, 0.0, 0.0));
        assert!(red.hue.abs() < 1e-9);
        assert!((red.saturation - 1.0).abs() < 1e-9);
        assert!((red.lightness - 0.5).abs() < 1e-9);

        let blue = HslColor::from_rgb(Rgb::new(0.0, 0.0, 255.0));
        assert!((blue.hue - 240.0).abs() < 1e-9);

        let gray = HslColor::from_rgb(Rgb::new(128.0, 128.0, 128.0));
        assert_eq!(gray.saturation, 0.0);
    }

    #[test]
    fn test_shift_hue_wraps() {
        let color = HslColor::new(300.0, 0.5, 0.5);
        assert_eq!(color.shift_hue(90.0).hue, 30.0);
        assert_eq!(color.shift_hue(-330.0).hue, 330.0);
        assert_eq!(HslColor::new(10.0, 0.5, 0.5).shift_hue(-30.0).hue, 340.0);
    }

    #[test]
    fn test_normalized_compresses_dark_and_light() {
        let dark = HslColor::new(0.0, 0.5, 0.1).normalized(None);
        assert!((dark.lightness - (0.32 + 0.1 * 0.32)).abs() < 1e-12);

        let light = HslColor::new(0.0, 0.5, 0.9).normalized(None);
        assert!((light.lightness - (0.62 - 0.1 * 0.38)).abs() < 1e-12);

        let pale = HslColor::new(0.0, 0.1, 0.5).normalized(None);
        assert!((pale.saturation - (0.18 + 0.1 * 0.82)).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_target_lightness_bypasses_range() {
        let color = HslColor::new(400.0, 0.05, 0.5).normalized(Some(0.75));
        assert_eq!(color.lightness, 0.75);
        assert_eq!(color.hue, 40.0);
        assert!((color.saturation - (0.18 + 0.05 * 0.82)).abs() < 1e-12);

        let clamped = HslColor::new(0.0, 0.5, 0.5).normalized(Some(1.4));
        assert_eq!(clamped.lightness, 1.0);
    }

    #[test]
    fn test_normalized_is_idempotent_inside_visible_range() {
        for &(s, l) in &[(0.18, 0.32), (0.5, 0.45), (1.0, 0.62), (0.73, 0.5)] {
            let once = HslColor::new(123.0, s, l).normalized(None);
            assert_eq!(once, HslColor::new(123.0, s, l));
            assert_eq!(once.normalized(None), once);
        }
    }

    #[test]
    fn test_tint_shade() {
        let (tint, original, shade) = ColorLib::tint_shade(Rgb::new(100.0, 0.0, 255.0));
        assert_eq!(original, "#6400ff");
        // 100 + 155 * 0.6 = 193, 0 + 255 * 0.6 = 153
        assert_eq!(tint, "#c199ff");
        // 100 * 0.65 = 65, 255 * 0.65 = 165.75
        assert_eq!(shade, "#4100a6");
    }

    #[test]
    fn test_shade_halves_round_to_even() {
        // 10 * 0.65 = 6.5, 50 * 0.65 = 32.5, 250 * 0.65 = 162.5
        let (_, _, shade) = ColorLib::tint_shade(Rgb::new(10.0, 50.0, 250.0));
        assert_eq!(shade, "#0620a2");
    }
}
