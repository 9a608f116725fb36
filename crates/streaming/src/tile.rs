use serde::{Deserialize, Serialize};

/// Addresses one base-map tile.
///
/// `style` distinguishes tile sets rendered from the same coordinates
/// (e.g. "streets" vs "satellite"). Styles are short identifiers, safe to
/// embed in file names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
    pub style: String,
}

impl TileKey {
    pub fn new(z: u8, x: u32, y: u32, style: impl Into<String>) -> Self {
        Self {
            z,
            x,
            y,
            style: style.into(),
        }
    }

    /// Stable storage stem, e.g. `streets_12_2044_1360`.
    pub fn stem(&self) -> String {
        format!("{}_{}_{}_{}", self.style, self.z, self.x, self.y)
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}/{}", self.style, self.z, self.x, self.y)
    }
}
