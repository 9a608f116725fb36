use foundation::geo::{LngLat, ScreenPoint, world_px};
use scene::viewport::Viewport;

/// The narrow seam to the external rendering engine. The clustering and
/// cache core depends only on these shapes, never on a concrete map
/// library's camera object or event names.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CameraEvent {
    Move(Viewport),
    Zoom(Viewport),
    Rotate(Viewport),
    Pitch(Viewport),
}

impl CameraEvent {
    pub fn viewport(&self) -> &Viewport {
        match self {
            CameraEvent::Move(v)
            | CameraEvent::Zoom(v)
            | CameraEvent::Rotate(v)
            | CameraEvent::Pitch(v) => v,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProjectError {
    /// The engine's camera is not initialized yet.
    CameraNotReady,
    InvalidCoordinate,
}

impl std::fmt::Display for ProjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectError::CameraNotReady => write!(f, "camera not ready"),
            ProjectError::InvalidCoordinate => write!(f, "coordinate is not finite"),
        }
    }
}

impl std::error::Error for ProjectError {}

/// Camera-to-screen projection supplied by the rendering engine.
pub trait Projector {
    fn project(&self, pos: LngLat) -> Result<ScreenPoint, ProjectError>;
}

impl<F> Projector for F
where
    F: Fn(LngLat) -> Result<ScreenPoint, ProjectError>,
{
    fn project(&self, pos: LngLat) -> Result<ScreenPoint, ProjectError> {
        self(pos)
    }
}

/// Reference projector for hosts and tests without a rendering engine:
/// plain Web-Mercator against a viewport's north-west corner. Real hosts
/// wrap their engine's camera instead (which also accounts for rotation
/// and pitch).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportProjector {
    viewport: Viewport,
}

impl ViewportProjector {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
}

impl Projector for ViewportProjector {
    fn project(&self, pos: LngLat) -> Result<ScreenPoint, ProjectError> {
        if !pos.is_finite() {
            return Err(ProjectError::InvalidCoordinate);
        }
        let zoom = self.viewport.zoom;
        let origin = world_px(
            LngLat::new(self.viewport.bounds.sw.lng, self.viewport.bounds.ne.lat),
            zoom,
        );
        let world = world_px(pos, zoom);
        Ok(ScreenPoint::new(world.x - origin.x, world.y - origin.y))
    }
}
