//! Harmony palettes derived from an anchor color

use crate::core::colorlib::{ColorLib, HslColor, Rgb};
use crate::models::palette::{Harmony, PaletteEntry, PaletteSet};

/// Lightness levels of the monochromatic pair
const MONOCHROMATIC_LIGHTNESS: [f64; 2] = [0.75, 0.45];

#[derive(Debug, thiserror::Error)]
pub enum PaletteError {
    #[error("anchor color {0:?} has non-finite channels")]
    NonFiniteAnchor(Rgb),
}

/// Hue rotations in degrees for every hue-based harmony
pub fn hue_shifts(harmony: Harmony) -> &'static [f64] {
    match harmony {
        Harmony::Complementary => &[180.0],
        Harmony::Analogous => &[30.0, -30.0],
        Harmony::Triadic => &[120.0, -120.0],
        Harmony::SplitComplementary => &[150.0, 210.0],
        Harmony::Tetradic => &[90.0, 180.0, 270.0],
        Harmony::Monochromatic => &[],
    }
}

fn entry(hsl: HslColor) -> PaletteEntry {
    PaletteEntry::from(ColorLib::tint_shade(hsl.to_rgb()))
}

/// Derive all six harmony groups from `anchor`
pub fn try_generate(anchor: Rgb) -> Result<PaletteSet, PaletteError> {
    if !anchor.is_finite() {
        return Err(PaletteError::NonFiniteAnchor(anchor));
    }

    let base = HslColor::from_rgb(anchor).normalized(None);
    let mut palettes = PaletteSet::new();

    for harmony in Harmony::ALL {
        let entries = match harmony {
            Harmony::Monochromatic => MONOCHROMATIC_LIGHTNESS
                .iter()
                .map(|&l| entry(base.with_lightness(l)))
                .collect(),
            _ => hue_shifts(harmony)
                .iter()
                .map(|&shift| entry(base.shift_hue(shift)))
                .collect(),
        };
        palettes.insert(harmony, entries);
    }

    Ok(palettes)
}

/// Like [`try_generate`] but degrades to an empty set on failure
pub fn generate_palettes(anchor: Rgb) -> PaletteSet {
    match try_generate(anchor) {
        Ok(palettes) => palettes,
        Err(e) => {
            tracing::warn!("Error calculating palettes: {}", e);
            PaletteSet::new()
        }
    }
}
