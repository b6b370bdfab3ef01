//! Palette models returned by color analysis

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Named hue relationship used to derive colors from an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Harmony {
    Complementary,
    Analogous,
    Triadic,
    SplitComplementary,
    Tetradic,
    Monochromatic,
}

impl Harmony {
    /// Every harmony in response order
    pub const ALL: [Harmony; 6] = [
        Harmony::Complementary,
        Harmony::Analogous,
        Harmony::Triadic,
        Harmony::SplitComplementary,
        Harmony::Tetradic,
        Harmony::Monochromatic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Harmony::Complementary => "complementary",
            Harmony::Analogous => "analogous",
            Harmony::Triadic => "triadic",
            Harmony::SplitComplementary => "split_complementary",
            Harmony::Tetradic => "tetradic",
            Harmony::Monochromatic => "monochromatic",
        }
    }
}

impl std::fmt::Display for Harmony {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tint, original and shade of one derived color
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub tint: String,
    pub original: String,
    pub shade: String,
}

impl From<(String, String, String)> for PaletteEntry {
    fn from((tint, original, shade): (String, String, String)) -> Self {
        Self {
            tint,
            original,
            shade,
        }
    }
}

/// Harmony name -> entries, kept in insertion order.
///
/// Serializes as a JSON object. An empty set is the degraded result of a
/// failed palette computation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaletteSet {
    groups: Vec<(Harmony, Vec<PaletteEntry>)>,
}

impl PaletteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, harmony: Harmony, entries: Vec<PaletteEntry>) {
        match self.groups.iter_mut().find(|(h, _)| *h == harmony) {
            Some((_, existing)) => *existing = entries,
            None => self.groups.push((harmony, entries)),
        }
    }

    pub fn get(&self, harmony: Harmony) -> Option<&[PaletteEntry]> {
        self.groups
            .iter()
            .find(|(h, _)| *h == harmony)
            .map(|(_, entries)| entries.as_slice())
    }

    pub fn harmonies(&self) -> impl Iterator<Item = Harmony> + '_ {
        self.groups.iter().map(|(h, _)| *h)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for PaletteSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (harmony, entries) in &self.groups {
            map.serialize_entry(harmony.as_str(), entries)?;
        }
        map.end()
    }
}

/// Full color analysis response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteAnalysis {
    /// Cluster centers as hex, heaviest first
    pub dominant_palette: Vec<String>,
    pub suggested_palettes: PaletteSet,
    /// Anchor the suggestions were derived from
    pub base_color: String,
}
