use crate::geo::LngLat;

/// Geographic bounding box.
///
/// Convention: `sw` is the south-west corner and `ne` the north-east one.
/// Bounds never wrap the antimeridian; the host camera supplies normalized
/// corners.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoBounds {
    pub sw: LngLat,
    pub ne: LngLat,
}

impl GeoBounds {
    pub fn new(sw: LngLat, ne: LngLat) -> Self {
        Self { sw, ne }
    }

    /// The whole Web-Mercator world.
    pub fn world() -> Self {
        Self::new(LngLat::new(-180.0, -90.0), LngLat::new(180.0, 90.0))
    }

    pub fn contains(&self, pos: LngLat) -> bool {
        pos.lng >= self.sw.lng
            && pos.lng <= self.ne.lng
            && pos.lat >= self.sw.lat
            && pos.lat <= self.ne.lat
    }

    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.sw.lng + self.ne.lng) / 2.0,
            (self.sw.lat + self.ne.lat) / 2.0,
        )
    }
}
