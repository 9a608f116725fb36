use foundation::ids::{ClusterId, PinId};
use foundation::time::{Clock, TimestampMs};
use runtime::frame::Frame;
use scene::animation::{AnimationCoordinator, AnimationKind, AnimationUpdate};
use scene::cluster::{ClusterConfig, RenderItem, cluster};
use scene::interaction::{InteractionEffect, InteractionService, PointerEvent};
use scene::pin::{ContractorRecord, Pin, PinRejection, pins_from_records};
use scene::viewport::Viewport;
use streaming::cache::{TileCacheConfig, TileCacheStats};
use streaming::fetch::TileFetcher;
use streaming::manager::{TileCacheManager, TileResponse};
use streaming::store::TileStore;
use streaming::tile::TileKey;

use crate::engine::{CameraEvent, Projector};
use crate::projection::{PositionUpdate, ProjectionConfig, ProjectionSync};

/// Visual feedback tuning for hover/selection transitions.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AnimationTuning {
    pub hover_duration_s: f64,
    pub select_duration_s: f64,
    /// Scale factor a selected pin grows to.
    pub select_scale: f64,
}

impl Default for AnimationTuning {
    fn default() -> Self {
        Self {
            hover_duration_s: 0.15,
            select_duration_s: 0.2,
            select_scale: 1.25,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapConfig {
    pub cluster: ClusterConfig,
    pub projection: ProjectionConfig,
    pub tiles: TileCacheConfig,
    pub animation: AnimationTuning,
    /// Minimum interval between fresh cache-stat reads; the cached
    /// snapshot is served in between.
    pub stats_refresh_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            projection: ProjectionConfig::default(),
            tiles: TileCacheConfig::default(),
            animation: AnimationTuning::default(),
            stats_refresh_ms: 30_000,
        }
    }
}

/// Host-facing notification, buffered until the host drains it.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    ContractorSelected(PinId),
    SelectionCleared(PinId),
    ClusterExpansionRequested {
        cluster: ClusterId,
        members: Vec<PinId>,
    },
    OfflineChanged(bool),
    PinsRejected(Vec<PinRejection>),
}

/// The aggregating state container for the contractor map.
///
/// Owns the pin set, viewport, projection reconciliation, interaction
/// state, animations and the tile cache, and exposes the render list plus
/// a drained event queue to the host UI. All mutation goes through the
/// methods here; nothing is shared mutably with the host.
#[derive(Debug)]
pub struct MapStore<S: TileStore, C: Clock> {
    config: MapConfig,
    pins: Vec<Pin>,
    viewport: Viewport,
    render: Vec<RenderItem>,
    cluster_dirty: bool,
    projection: ProjectionSync,
    interaction: InteractionService,
    animations: AnimationCoordinator,
    tiles: TileCacheManager<S, C>,
    events: Vec<MapEvent>,
    stats_snapshot: Option<(TimestampMs, TileCacheStats)>,
}

impl<S: TileStore, C: Clock> MapStore<S, C> {
    pub fn new(store: S, clock: C, config: MapConfig, viewport: Viewport) -> Self {
        Self {
            pins: Vec::new(),
            viewport,
            render: Vec::new(),
            cluster_dirty: true,
            projection: ProjectionSync::new(config.projection),
            interaction: InteractionService::new(),
            animations: AnimationCoordinator::new(),
            tiles: TileCacheManager::new(store, clock, config.tiles),
            events: Vec::new(),
            stats_snapshot: None,
            config,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// The current render list, as of the last `tick`.
    pub fn render_items(&self) -> &[RenderItem] {
        &self.render
    }

    pub fn hovered(&self) -> Option<PinId> {
        self.interaction.hovered()
    }

    pub fn selected(&self) -> Option<PinId> {
        self.interaction.selected()
    }

    pub fn animation_value(&self, pin: PinId, kind: AnimationKind) -> Option<f64> {
        self.animations.value(pin, kind)
    }

    /// Replaces the pin set from a fresh contractor list.
    ///
    /// Interaction and animation state for the old set is dropped;
    /// rejected records are reported through the event queue.
    pub fn set_pins(&mut self, records: &[ContractorRecord]) {
        let ingest = pins_from_records(records);
        if !ingest.rejected.is_empty() {
            self.events.push(MapEvent::PinsRejected(ingest.rejected));
        }
        self.projection
            .replace_pins(ingest.pins.iter().map(|p| (p.id, p.position)));
        self.pins = ingest.pins;
        self.interaction.reset();
        self.animations.clear();
        self.cluster_dirty = true;
    }

    /// Camera moved/zoomed/rotated/pitched: record the new viewport and
    /// schedule one recomputation for the next tick.
    pub fn on_camera_event(&mut self, event: &CameraEvent) {
        self.viewport = *event.viewport();
        self.projection.on_camera_event(event);
        self.cluster_dirty = true;
    }

    /// Per-frame update: reconcile projections, recluster if anything
    /// changed, and advance animations. Returns the animation values the
    /// host applies this frame.
    pub fn tick(&mut self, frame: Frame, projector: &impl Projector) -> Vec<AnimationUpdate> {
        let moved: Vec<PositionUpdate> = self.projection.tick(projector);

        if self.cluster_dirty || !moved.is_empty() {
            let pass = cluster(&self.pins, &self.viewport, &self.config.cluster);
            // Stable cluster ids make this diff meaningful: an unchanged
            // grouping republishes nothing.
            if pass.items != self.render {
                self.render = pass.items;
            }
            self.cluster_dirty = false;
        }

        self.animations.step(frame)
    }

    /// Routes a pointer/touch event through the interaction state machine
    /// and triggers the matching visual feedback.
    pub fn pointer(&mut self, event: PointerEvent) {
        let tuning = self.config.animation;
        for effect in self.interaction.apply(event) {
            match effect {
                InteractionEffect::HoverStarted(pin) => {
                    self.animations
                        .animate(pin, AnimationKind::Bounce, 0.0, 1.0, tuning.hover_duration_s);
                }
                InteractionEffect::HoverEnded(pin) => {
                    // A finished bounce has been dropped from the registry;
                    // animate back from the hover target explicitly.
                    if !self.animations.reverse(pin, AnimationKind::Bounce) {
                        self.animations.animate(
                            pin,
                            AnimationKind::Bounce,
                            1.0,
                            0.0,
                            tuning.hover_duration_s,
                        );
                    }
                }
                InteractionEffect::Selected(pin) => {
                    self.animations.animate(
                        pin,
                        AnimationKind::Scale,
                        1.0,
                        tuning.select_scale,
                        tuning.select_duration_s,
                    );
                    self.events.push(MapEvent::ContractorSelected(pin));
                }
                InteractionEffect::Deselected(pin) => {
                    // Same for a long-held selection whose grow animation
                    // completed long ago: shrink back from the full scale.
                    if !self.animations.reverse(pin, AnimationKind::Scale) {
                        self.animations.animate(
                            pin,
                            AnimationKind::Scale,
                            tuning.select_scale,
                            1.0,
                            tuning.select_duration_s,
                        );
                    }
                    self.events.push(MapEvent::SelectionCleared(pin));
                }
            }
        }
    }

    /// A cluster marker was activated: asks the host to expand it (zoom
    /// in or show the member list). Returns `false` for unknown ids,
    /// e.g. a click racing a recluster.
    pub fn expand_cluster(&mut self, cluster: ClusterId) -> bool {
        let members = self.render.iter().find_map(|item| match item {
            RenderItem::Cluster(c) if c.id == cluster => Some(c.members.clone()),
            _ => None,
        });
        let Some(members) = members else {
            return false;
        };
        self.events
            .push(MapEvent::ClusterExpansionRequested { cluster, members });
        true
    }

    pub fn is_offline(&self) -> bool {
        self.tiles.is_offline()
    }

    pub fn set_offline(&mut self, offline: bool) {
        if self.tiles.is_offline() == offline {
            return;
        }
        self.tiles.set_offline(offline);
        self.events.push(MapEvent::OfflineChanged(offline));
    }

    pub fn request_tile(&mut self, key: &TileKey, fetcher: &mut impl TileFetcher) -> TileResponse {
        self.tiles.request(key, fetcher)
    }

    /// Cache statistics for the offline indicator, refreshed at most once
    /// per `stats_refresh_ms`.
    pub fn cache_stats(&mut self) -> TileCacheStats {
        let now = self.tiles.clock().now_ms();
        if let Some((taken_at, stats)) = self.stats_snapshot
            && now.since(taken_at) < self.config.stats_refresh_ms
        {
            return stats;
        }
        let stats = self.tiles.stats();
        self.stats_snapshot = Some((now, stats));
        stats
    }

    pub fn cleanup_expired_tiles(&mut self) -> usize {
        let removed = self.tiles.cleanup_expired_tiles();
        if removed > 0 {
            self.stats_snapshot = None;
        }
        removed
    }

    pub fn clear_cache(&mut self) {
        self.tiles.clear_cache();
        self.stats_snapshot = None;
    }

    /// Buffered host notifications, oldest first.
    pub fn drain_events(&mut self) -> Vec<MapEvent> {
        std::mem::take(&mut self.events)
    }

    /// Component teardown: cancels the pending projection pass, all
    /// in-flight animations and interaction state. The tile cache stays
    /// intact for the next mount.
    pub fn unmount(&mut self) {
        self.projection.cancel_pending();
        self.animations.clear();
        self.interaction.reset();
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{MapConfig, MapEvent, MapStore};
    use crate::engine::{CameraEvent, ViewportProjector};
    use foundation::geo::ScreenPoint;
    use foundation::ids::PinId;
    use foundation::time::ManualClock;
    use pretty_assertions::assert_eq;
    use runtime::frame::Frame;
    use scene::animation::AnimationKind;
    use scene::cluster::RenderItem;
    use scene::interaction::PointerEvent;
    use scene::pin::ContractorRecord;
    use scene::viewport::Viewport;
    use streaming::cache::TileCacheConfig;
    use streaming::store::InMemoryTileStore;
    use streaming::tile::TileKey;

    fn record(id: u64, lng: f64, lat: f64) -> ContractorRecord {
        ContractorRecord {
            id,
            lat,
            lng,
            service_type: "electrical".to_string(),
            is_verified: true,
            subscription_tier: "basic".to_string(),
        }
    }

    fn store() -> MapStore<InMemoryTileStore, ManualClock> {
        let config = MapConfig {
            tiles: TileCacheConfig {
                capacity_bytes: 100,
                default_ttl_ms: 10_000,
            },
            ..MapConfig::default()
        };
        MapStore::new(
            InMemoryTileStore::new(),
            ManualClock::new(0),
            config,
            Viewport::world(4.0),
        )
    }

    fn frame() -> Frame {
        Frame::new(0, 1.0 / 60.0)
    }

    #[test]
    fn tick_publishes_clusters_for_dense_pins() {
        let mut map = store();
        let records: Vec<ContractorRecord> = (0..5)
            .map(|i| record(i, 10.0 + i as f64 * 0.001, 10.0))
            .collect();
        map.set_pins(&records);

        let projector = ViewportProjector::new(*map.viewport());
        map.tick(frame(), &projector);

        assert_eq!(map.render_items().len(), 1);
        match &map.render_items()[0] {
            RenderItem::Cluster(c) => assert_eq!(c.members.len(), 5),
            other => panic!("expected a cluster, got {other:?}"),
        }
    }

    #[test]
    fn camera_events_retrigger_clustering() {
        let mut map = store();
        map.set_pins(&[record(1, 10.0, 10.0), record(2, 10.001, 10.0)]);
        let projector = ViewportProjector::new(*map.viewport());
        map.tick(frame(), &projector);
        assert_eq!(map.render_items().len(), 1);

        // Zoom far in: the pair splits into individual pins.
        let zoomed = Viewport::world(16.0);
        map.on_camera_event(&CameraEvent::Zoom(zoomed));
        let projector = ViewportProjector::new(zoomed);
        map.tick(frame().next(), &projector);
        assert_eq!(map.render_items().len(), 2);
    }

    #[test]
    fn hover_then_select_another_pin_mirrors_the_pointer_flow() {
        let mut map = store();
        map.set_pins(&[record(1, 10.0, 10.0), record(2, 50.0, 20.0)]);

        map.pointer(PointerEvent::Enter {
            pin: PinId(1),
            at: ScreenPoint::new(5.0, 5.0),
        });
        map.pointer(PointerEvent::Click {
            pin: PinId(2),
            at: ScreenPoint::new(40.0, 40.0),
        });

        assert_eq!(map.hovered(), Some(PinId(1)));
        assert_eq!(map.selected(), Some(PinId(2)));
        assert!(map.animation_value(PinId(1), AnimationKind::Bounce).is_some());
        assert!(map.animation_value(PinId(2), AnimationKind::Scale).is_some());
        assert_eq!(
            map.drain_events(),
            vec![MapEvent::ContractorSelected(PinId(2))]
        );
        assert!(map.drain_events().is_empty());
    }

    #[test]
    fn switching_selection_reverses_the_previous_animation() {
        let mut map = store();
        map.set_pins(&[record(1, 10.0, 10.0), record(2, 50.0, 20.0)]);

        map.pointer(PointerEvent::Click {
            pin: PinId(1),
            at: ScreenPoint::default(),
        });
        map.pointer(PointerEvent::Click {
            pin: PinId(2),
            at: ScreenPoint::default(),
        });

        assert_eq!(
            map.drain_events(),
            vec![
                MapEvent::ContractorSelected(PinId(1)),
                MapEvent::SelectionCleared(PinId(1)),
                MapEvent::ContractorSelected(PinId(2)),
            ]
        );
        // Pin 1's scale animation now runs backwards instead of queueing.
        assert!(map.animation_value(PinId(1), AnimationKind::Scale).is_some());
    }

    #[test]
    fn deselecting_after_the_grow_animation_finished_still_shrinks_back() {
        let mut map = store();
        map.set_pins(&[record(1, 10.0, 10.0), record(2, 50.0, 20.0)]);
        let projector = ViewportProjector::new(*map.viewport());

        map.pointer(PointerEvent::Click {
            pin: PinId(1),
            at: ScreenPoint::default(),
        });

        // Hold the selection well past the 0.2s grow animation, so the
        // coordinator has dropped it as done.
        let mut f = Frame::new(0, 0.1);
        for _ in 0..10 {
            map.tick(f, &projector);
            f = f.next();
        }
        assert!(map.animation_value(PinId(1), AnimationKind::Scale).is_none());

        // Selecting another pin must still shrink pin 1 from full scale.
        map.pointer(PointerEvent::Click {
            pin: PinId(2),
            at: ScreenPoint::default(),
        });
        let v = map
            .animation_value(PinId(1), AnimationKind::Scale)
            .expect("shrink animation");
        assert!((v - 1.25).abs() < 1e-12);

        let updates = map.tick(Frame::new(11, 0.25), &projector);
        let back = updates
            .iter()
            .find(|u| u.pin == PinId(1) && u.kind == AnimationKind::Scale)
            .expect("scale update");
        assert!(back.done);
        assert!((back.value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unhovering_after_the_bounce_finished_still_animates_back() {
        let mut map = store();
        map.set_pins(&[record(1, 10.0, 10.0)]);
        let projector = ViewportProjector::new(*map.viewport());

        map.pointer(PointerEvent::Enter {
            pin: PinId(1),
            at: ScreenPoint::default(),
        });
        map.tick(Frame::new(0, 1.0), &projector);
        assert!(map.animation_value(PinId(1), AnimationKind::Bounce).is_none());

        map.pointer(PointerEvent::Leave { pin: PinId(1) });
        let v = map
            .animation_value(PinId(1), AnimationKind::Bounce)
            .expect("return animation");
        assert!((v - 1.0).abs() < 1e-12);
    }

    #[test]
    fn expand_cluster_reports_members() {
        let mut map = store();
        map.set_pins(&[record(1, 10.0, 10.0), record(2, 10.001, 10.0)]);
        let projector = ViewportProjector::new(*map.viewport());
        map.tick(frame(), &projector);

        let cluster_id = match &map.render_items()[0] {
            RenderItem::Cluster(c) => c.id,
            other => panic!("expected a cluster, got {other:?}"),
        };
        assert!(map.expand_cluster(cluster_id));
        assert_eq!(
            map.drain_events(),
            vec![MapEvent::ClusterExpansionRequested {
                cluster: cluster_id,
                members: vec![PinId(1), PinId(2)],
            }]
        );
        assert!(!map.expand_cluster(foundation::ids::ClusterId(0)));
    }

    #[test]
    fn invalid_records_surface_through_the_event_queue() {
        let mut map = store();
        map.set_pins(&[record(1, 10.0, 10.0), record(2, f64::NAN, 0.0)]);
        let events = map.drain_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            MapEvent::PinsRejected(rejected) => {
                assert_eq!(rejected.len(), 1);
                assert_eq!(rejected[0].id, PinId(2));
            }
            other => panic!("expected a rejection event, got {other:?}"),
        }
        assert_eq!(map.pins().len(), 1);
    }

    #[test]
    fn offline_toggle_emits_one_event_per_transition() {
        let mut map = store();
        map.set_offline(true);
        map.set_offline(true);
        map.set_offline(false);
        assert_eq!(
            map.drain_events(),
            vec![MapEvent::OfflineChanged(true), MapEvent::OfflineChanged(false)]
        );
    }

    #[test]
    fn offline_tile_miss_is_unavailable() {
        let mut map = store();
        map.set_offline(true);
        let mut fetcher = |_: &TileKey| -> Result<Vec<u8>, streaming::fetch::TileFetchError> {
            panic!("offline must not fetch")
        };
        let response = map.request_tile(&TileKey::new(3, 1, 1, "streets"), &mut fetcher);
        assert_eq!(response, streaming::manager::TileResponse::Unavailable);
    }

    #[test]
    fn cache_stats_are_throttled_by_the_refresh_interval() {
        let mut map = store();
        let key = TileKey::new(3, 1, 1, "streets");
        let mut fetcher = |_: &TileKey| Ok(b"tile".to_vec());
        map.request_tile(&key, &mut fetcher);

        assert_eq!(map.cache_stats().total_tiles, 1);

        // A second tile within the refresh window is not visible yet.
        map.request_tile(&TileKey::new(3, 2, 1, "streets"), &mut fetcher);
        assert_eq!(map.cache_stats().total_tiles, 1);

        map.tiles.clock().advance(30_000);
        assert_eq!(map.cache_stats().total_tiles, 2);
    }

    #[test]
    fn clear_cache_invalidates_the_stats_snapshot() {
        let mut map = store();
        let mut fetcher = |_: &TileKey| Ok(b"tile".to_vec());
        map.request_tile(&TileKey::new(3, 1, 1, "streets"), &mut fetcher);
        assert_eq!(map.cache_stats().total_tiles, 1);

        map.clear_cache();
        assert_eq!(map.cache_stats().total_tiles, 0);
    }

    #[test]
    fn unmount_cancels_pending_work_but_keeps_the_cache() {
        let mut map = store();
        map.set_pins(&[record(1, 10.0, 10.0)]);
        map.pointer(PointerEvent::Enter {
            pin: PinId(1),
            at: ScreenPoint::default(),
        });
        let mut fetcher = |_: &TileKey| Ok(b"tile".to_vec());
        map.request_tile(&TileKey::new(3, 1, 1, "streets"), &mut fetcher);

        map.unmount();
        assert_eq!(map.hovered(), None);
        assert!(map.animation_value(PinId(1), AnimationKind::Bounce).is_none());
        assert!(map.drain_events().is_empty());
        assert_eq!(map.cache_stats().total_tiles, 1);
    }
}
