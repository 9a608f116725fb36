use crate::tile::TileKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileFetchError {
    Network(String),
    NotFound,
}

impl std::fmt::Display for TileFetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileFetchError::Network(msg) => write!(f, "tile fetch failed: {msg}"),
            TileFetchError::NotFound => write!(f, "tile does not exist"),
        }
    }
}

impl std::error::Error for TileFetchError {}

/// Network-bound raw tile fetch, supplied by the rendering engine.
///
/// The cache layer wraps this when online and never calls it offline.
pub trait TileFetcher {
    fn fetch(&mut self, key: &TileKey) -> Result<Vec<u8>, TileFetchError>;
}

impl<F> TileFetcher for F
where
    F: FnMut(&TileKey) -> Result<Vec<u8>, TileFetchError>,
{
    fn fetch(&mut self, key: &TileKey) -> Result<Vec<u8>, TileFetchError> {
        self(key)
    }
}
