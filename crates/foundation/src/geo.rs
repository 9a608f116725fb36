/// Standard Web-Mercator tile edge length in CSS pixels.
pub const TILE_SIZE_PX: f64 = 256.0;

/// Latitude limit of the Web-Mercator projection (degrees).
pub const MERCATOR_LAT_MAX_DEG: f64 = 85.051_128_779_806_59;

/// Geographic position in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Both components are finite (not NaN, not infinite).
    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }
}

/// Screen-space position in CSS pixels.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Total map edge length in pixels at `zoom`.
pub fn map_size_px(zoom: f64) -> f64 {
    TILE_SIZE_PX * 2f64.powf(zoom)
}

/// Projects a geographic position to Web-Mercator world pixels at `zoom`.
///
/// The origin is the north-west corner of the world; `x` grows east and
/// `y` grows south. Latitudes are clamped to the Mercator limit so poles
/// map to the map edge instead of infinity.
pub fn world_px(pos: LngLat, zoom: f64) -> ScreenPoint {
    let size = map_size_px(zoom);
    let lat = pos
        .lat
        .clamp(-MERCATOR_LAT_MAX_DEG, MERCATOR_LAT_MAX_DEG)
        .to_radians();

    let x = (pos.lng + 180.0) / 360.0 * size;
    let y = (0.5 - lat.sin().atanh() / (2.0 * std::f64::consts::PI)) * size;
    ScreenPoint::new(x, y)
}
