use foundation::geo::{LngLat, ScreenPoint, world_px};
use foundation::ids::{ClusterId, PinId};

use crate::pin::{Pin, PinDataError, PinRejection};
use crate::spatial::GridIndex;
use crate::viewport::Viewport;

/// Clustering tuning knobs.
///
/// `cell_size_px` is the screen-space grid cell edge; `min_cell_size_px`
/// is a floor guarding against degenerate configurations. Neither value
/// is assumed optimal; hosts tune them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClusterConfig {
    pub cell_size_px: f64,
    pub min_cell_size_px: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cell_size_px: 40.0,
            min_cell_size_px: 8.0,
        }
    }
}

impl ClusterConfig {
    pub fn effective_cell_px(&self) -> f64 {
        self.cell_size_px.max(self.min_cell_size_px)
    }
}

/// A single pin drawn at its own position.
#[derive(Debug, Clone, PartialEq)]
pub struct PinItem {
    pub id: PinId,
    pub position: LngLat,
    pub screen: ScreenPoint,
}

/// A merged group of >= 2 pins too close together at the current zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterItem {
    pub id: ClusterId,
    /// Arithmetic mean of member coordinates.
    pub centroid: LngLat,
    pub screen: ScreenPoint,
    /// Member pin ids, ascending.
    pub members: Vec<PinId>,
    /// Lowest-id member, used for summary display.
    pub representative: PinId,
}

/// What actually gets drawn for one grid cell.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderItem {
    Pin(PinItem),
    Cluster(ClusterItem),
}

impl RenderItem {
    pub fn screen(&self) -> ScreenPoint {
        match self {
            RenderItem::Pin(p) => p.screen,
            RenderItem::Cluster(c) => c.screen,
        }
    }
}

/// Output of one clustering pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterPass {
    /// Render items in ascending grid-cell order.
    pub items: Vec<RenderItem>,
    /// Pins excluded from the pass, with the reason.
    pub rejected: Vec<PinRejection>,
}

/// Deterministic id for a cluster membership.
///
/// Hashes the sorted member ids so the same membership yields the same id
/// regardless of pin ordering. Stable ids keep animation keys stable
/// across re-renders.
pub fn cluster_id_for_members(sorted_members: &[PinId]) -> ClusterId {
    let mut hasher = blake3::Hasher::new();
    for id in sorted_members {
        hasher.update(&id.0.to_le_bytes());
    }
    let digest = hasher.finalize();
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest.as_bytes()[..8]);
    ClusterId(u64::from_le_bytes(word))
}

/// Groups visible pins into render items for the current viewport.
///
/// Pure function of its arguments: identical `(pins, viewport, config)`
/// produce identical output, so it is safe to call on every frame.
///
/// Rules:
/// - Pins are bucketed in Web-Mercator world pixels at the viewport zoom,
///   so cluster membership does not jitter during sub-cell pans.
/// - A cell with exactly one pin emits a `Pin` item; >= 2 emit a `Cluster`.
/// - Non-finite coordinates go to `rejected`; the pass never aborts.
/// - Pins outside the viewport bounds are silently skipped.
pub fn cluster(pins: &[Pin], viewport: &Viewport, config: &ClusterConfig) -> ClusterPass {
    let zoom = viewport.zoom;
    let origin = world_px(
        LngLat::new(viewport.bounds.sw.lng, viewport.bounds.ne.lat),
        zoom,
    );
    let to_screen = |world: ScreenPoint| ScreenPoint::new(world.x - origin.x, world.y - origin.y);

    let mut pass = ClusterPass::default();
    let mut grid = GridIndex::new(config.effective_cell_px());

    for (index, pin) in pins.iter().enumerate() {
        if !pin.position.is_finite() {
            pass.rejected.push(PinRejection {
                id: pin.id,
                reason: PinDataError::NonFiniteCoordinates,
            });
            continue;
        }
        if !viewport.is_visible(pin.position) {
            continue;
        }
        grid.insert(index, world_px(pin.position, zoom));
    }

    for (_cell, indices) in grid.cells() {
        if let [only] = indices {
            let pin = &pins[*only];
            pass.items.push(RenderItem::Pin(PinItem {
                id: pin.id,
                position: pin.position,
                screen: to_screen(world_px(pin.position, zoom)),
            }));
            continue;
        }

        let mut members: Vec<PinId> = indices.iter().map(|i| pins[*i].id).collect();
        members.sort_unstable();

        let inv = 1.0 / indices.len() as f64;
        let centroid = LngLat::new(
            indices.iter().map(|i| pins[*i].position.lng).sum::<f64>() * inv,
            indices.iter().map(|i| pins[*i].position.lat).sum::<f64>() * inv,
        );

        pass.items.push(RenderItem::Cluster(ClusterItem {
            id: cluster_id_for_members(&members),
            centroid,
            screen: to_screen(world_px(centroid, zoom)),
            representative: members[0],
            members,
        }));
    }

    pass
}

#[cfg(test)]
mod tests {
    use super::{ClusterConfig, RenderItem, cluster, cluster_id_for_members};
    use crate::pin::{Pin, SubscriptionTier};
    use crate::viewport::Viewport;
    use foundation::geo::LngLat;
    use foundation::ids::PinId;
    use pretty_assertions::assert_eq;

    fn pin(id: u64, lng: f64, lat: f64) -> Pin {
        Pin {
            id: PinId(id),
            position: LngLat::new(lng, lat),
            category: "roofing".to_string(),
            verified: false,
            tier: SubscriptionTier::Basic,
        }
    }

    /// 12 pins a few meters apart near (10, 10).
    fn dense_pins() -> Vec<Pin> {
        (0..12)
            .map(|i| pin(i, 10.0 + i as f64 * 0.001, 10.0))
            .collect()
    }

    #[test]
    fn repeated_calls_are_identical() {
        let pins = dense_pins();
        let viewport = Viewport::world(4.0);
        let config = ClusterConfig::default();
        let a = cluster(&pins, &viewport, &config);
        let b = cluster(&pins, &viewport, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn dense_pins_merge_at_low_zoom_and_split_at_high_zoom() {
        let pins = dense_pins();
        let config = ClusterConfig::default();

        let low = cluster(&pins, &Viewport::world(4.0), &config);
        assert_eq!(low.items.len(), 1);
        match &low.items[0] {
            RenderItem::Cluster(c) => {
                assert_eq!(c.members.len(), 12);
                assert_eq!(c.representative, PinId(0));
            }
            other => panic!("expected a cluster, got {other:?}"),
        }

        let high = cluster(&pins, &Viewport::world(16.0), &config);
        assert!(high.items.len() >= 2, "got {} items", high.items.len());
    }

    #[test]
    fn every_cluster_has_at_least_two_members() {
        let mut pins = dense_pins();
        pins.push(pin(100, -120.0, 45.0)); // far away, must render alone
        let pass = cluster(&pins, &Viewport::world(4.0), &ClusterConfig::default());

        let mut lone_pins = 0;
        for item in &pass.items {
            match item {
                RenderItem::Cluster(c) => assert!(c.members.len() >= 2),
                RenderItem::Pin(p) => {
                    lone_pins += 1;
                    assert_eq!(p.id, PinId(100));
                }
            }
        }
        assert_eq!(lone_pins, 1);
    }

    #[test]
    fn cluster_id_ignores_member_ordering() {
        let sorted = [PinId(1), PinId(2), PinId(9)];
        assert_eq!(
            cluster_id_for_members(&sorted),
            cluster_id_for_members(&[PinId(1), PinId(2), PinId(9)]),
        );
        assert_ne!(
            cluster_id_for_members(&sorted),
            cluster_id_for_members(&[PinId(1), PinId(2)]),
        );

        // Same membership submitted in a different pin order produces the
        // same cluster id end to end.
        let forward = dense_pins();
        let mut reversed = dense_pins();
        reversed.reverse();
        let viewport = Viewport::world(4.0);
        let config = ClusterConfig::default();
        let a = cluster(&forward, &viewport, &config);
        let b = cluster(&reversed, &viewport, &config);
        match (&a.items[0], &b.items[0]) {
            (RenderItem::Cluster(ca), RenderItem::Cluster(cb)) => {
                assert_eq!(ca.id, cb.id);
                assert_eq!(ca.members, cb.members);
            }
            other => panic!("expected clusters, got {other:?}"),
        }
    }

    #[test]
    fn invalid_pins_are_reported_not_fatal() {
        let mut pins = dense_pins();
        pins.push(pin(50, f64::NAN, 10.0));
        let pass = cluster(&pins, &Viewport::world(4.0), &ClusterConfig::default());
        assert_eq!(pass.items.len(), 1);
        assert_eq!(pass.rejected.len(), 1);
        assert_eq!(pass.rejected[0].id, PinId(50));
    }

    #[test]
    fn pins_outside_the_viewport_are_skipped() {
        let pins = vec![pin(1, 10.0, 10.0), pin(2, 100.0, 10.0)];
        let viewport = Viewport::new(
            6.0,
            foundation::bounds::GeoBounds::new(LngLat::new(0.0, 0.0), LngLat::new(20.0, 20.0)),
        );
        let pass = cluster(&pins, &viewport, &ClusterConfig::default());
        assert_eq!(pass.items.len(), 1);
        match &pass.items[0] {
            RenderItem::Pin(p) => assert_eq!(p.id, PinId(1)),
            other => panic!("expected a lone pin, got {other:?}"),
        }
    }

    #[test]
    fn centroid_is_member_mean() {
        let pins = vec![pin(1, 10.0, 10.0), pin(2, 10.002, 10.002)];
        let pass = cluster(&pins, &Viewport::world(4.0), &ClusterConfig::default());
        match &pass.items[0] {
            RenderItem::Cluster(c) => {
                assert!((c.centroid.lng - 10.001).abs() < 1e-12);
                assert!((c.centroid.lat - 10.001).abs() < 1e-12);
            }
            other => panic!("expected a cluster, got {other:?}"),
        }
    }
}
