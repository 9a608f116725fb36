use std::collections::BTreeMap;

use foundation::geo::{LngLat, ScreenPoint};
use foundation::ids::PinId;
use runtime::latch::UpdateLatch;

use crate::engine::{CameraEvent, Projector};

/// Projection reconciliation tuning.
///
/// `publish_threshold_px` suppresses republishing when a pin moved by at
/// most this much on both axes, avoiding re-render storms from sub-pixel
/// jitter. The default mirrors the original tuning and is not assumed
/// optimal.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectionConfig {
    pub publish_threshold_px: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            publish_threshold_px: 5.0,
        }
    }
}

/// A newly published screen position for one pin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PositionUpdate {
    pub pin: PinId,
    pub screen: ScreenPoint,
}

/// Keeps per-pin screen positions consistent with the camera.
///
/// Camera events only arm a latch; the actual recomputation happens at
/// most once per frame in `tick`, so a burst of move/zoom/rotate/pitch
/// events within one frame costs a single projection pass reflecting the
/// final camera state. `tick` takes `&mut self`, so a recomputation can
/// never re-enter itself mid-pass.
///
/// Failure policy: a projection error keeps the pin's last-known-good
/// position (or a zero default before the first success); it is never
/// surfaced to the caller.
#[derive(Debug, Default)]
pub struct ProjectionSync {
    config: ProjectionConfig,
    pins: BTreeMap<PinId, LngLat>,
    published: BTreeMap<PinId, ScreenPoint>,
    latch: UpdateLatch,
}

impl ProjectionSync {
    pub fn new(config: ProjectionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Last published screen position for `pin`.
    pub fn position(&self, pin: PinId) -> Option<ScreenPoint> {
        self.published.get(&pin).copied()
    }

    pub fn register_pin(&mut self, pin: PinId, pos: LngLat) {
        self.pins.insert(pin, pos);
        self.latch.request();
    }

    /// Drops the pin and its published position.
    pub fn unregister_pin(&mut self, pin: PinId) {
        self.pins.remove(&pin);
        self.published.remove(&pin);
    }

    /// Swaps the whole pin set, e.g. on a contractor list refresh.
    pub fn replace_pins(&mut self, pins: impl IntoIterator<Item = (PinId, LngLat)>) {
        self.pins = pins.into_iter().collect();
        self.published.clear();
        self.latch.request();
    }

    /// Any qualifying camera event schedules one recomputation.
    pub fn on_camera_event(&mut self, _event: &CameraEvent) {
        self.latch.request();
    }

    pub fn is_pending(&self) -> bool {
        self.latch.is_requested()
    }

    /// Cancels a pending recomputation. Used on teardown.
    pub fn cancel_pending(&mut self) {
        self.latch.cancel();
    }

    /// Runs the at-most-once-per-frame recomputation, returning only the
    /// positions whose movement exceeded the publish threshold (plus
    /// first-time positions, which always publish).
    pub fn tick(&mut self, projector: &impl Projector) -> Vec<PositionUpdate> {
        if !self.latch.take() {
            return Vec::new();
        }

        let threshold = self.config.publish_threshold_px;
        let mut updates = Vec::new();

        for (pin, pos) in &self.pins {
            let projected = match projector.project(*pos) {
                Ok(screen) => screen,
                Err(err) => {
                    tracing::debug!(pin = pin.0, error = %err, "projection failed, keeping last position");
                    match self.published.get(pin) {
                        Some(last) => *last,
                        None => ScreenPoint::default(),
                    }
                }
            };

            let publish = match self.published.get(pin) {
                None => true,
                Some(last) => {
                    (projected.x - last.x).abs() > threshold
                        || (projected.y - last.y).abs() > threshold
                }
            };
            if publish {
                self.published.insert(*pin, projected);
                updates.push(PositionUpdate {
                    pin: *pin,
                    screen: projected,
                });
            }
        }

        updates
    }
}
