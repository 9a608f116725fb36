use foundation::bounds::GeoBounds;
use foundation::geo::LngLat;

/// Current camera state as reported by the rendering engine.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub zoom: f64,
    pub bounds: GeoBounds,
    pub center: LngLat,
}

impl Viewport {
    pub fn new(zoom: f64, bounds: GeoBounds) -> Self {
        Self {
            zoom,
            bounds,
            center: bounds.center(),
        }
    }

    pub fn world(zoom: f64) -> Self {
        Self::new(zoom, GeoBounds::world())
    }

    pub fn is_visible(&self, pos: LngLat) -> bool {
        self.bounds.contains(pos)
    }
}
