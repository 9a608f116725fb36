use std::collections::BTreeMap;

use foundation::ids::PinId;
use runtime::frame::Frame;

/// Visual transition kinds a pin can run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnimationKind {
    Bounce,
    Scale,
}

/// Identifies one started animation, for cancel-on-replace checks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimationHandle(pub u64);

#[derive(Debug, Clone, PartialEq)]
struct Animation {
    handle: AnimationHandle,
    from: f64,
    target: f64,
    duration_s: f64,
    elapsed_s: f64,
}

impl Animation {
    fn progress(&self) -> f64 {
        if self.duration_s <= 0.0 {
            return 1.0;
        }
        (self.elapsed_s / self.duration_s).clamp(0.0, 1.0)
    }

    fn value(&self) -> f64 {
        let t = self.progress();
        self.from + (self.target - self.from) * t
    }

    fn is_done(&self) -> bool {
        self.progress() >= 1.0
    }
}

/// Per-step report for one advancing animation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AnimationUpdate {
    pub pin: PinId,
    pub kind: AnimationKind,
    pub value: f64,
    pub done: bool,
}

/// Registry of per-pin visual transitions.
///
/// At most one animation is active per `(pin, kind)`; starting a new one
/// for the same pair cancels and replaces the in-flight one
/// (last-write-wins), so rapid hovering cannot accumulate a queue.
///
/// Ordering contract:
/// - `step()` reports updates in ascending `(pin, kind)` order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationCoordinator {
    next_handle: u64,
    active: BTreeMap<(PinId, AnimationKind), Animation>,
}

impl AnimationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Starts (or replaces) the animation for `(pin, kind)`.
    pub fn animate(
        &mut self,
        pin: PinId,
        kind: AnimationKind,
        from: f64,
        target: f64,
        duration_s: f64,
    ) -> AnimationHandle {
        let handle = AnimationHandle(self.next_handle);
        self.next_handle += 1;
        self.active.insert(
            (pin, kind),
            Animation {
                handle,
                from,
                target,
                duration_s,
                elapsed_s: 0.0,
            },
        );
        handle
    }

    /// Reverses an in-flight animation from its current value back to its
    /// original starting value. Returns `false` if none is active.
    pub fn reverse(&mut self, pin: PinId, kind: AnimationKind) -> bool {
        let handle = AnimationHandle(self.next_handle);
        let Some(anim) = self.active.get_mut(&(pin, kind)) else {
            return false;
        };
        self.next_handle += 1;
        let current = anim.value();
        let back_to = anim.from;
        *anim = Animation {
            handle,
            from: current,
            target: back_to,
            duration_s: anim.duration_s,
            elapsed_s: 0.0,
        };
        true
    }

    pub fn is_active(&self, pin: PinId, kind: AnimationKind) -> bool {
        self.active.contains_key(&(pin, kind))
    }

    pub fn handle(&self, pin: PinId, kind: AnimationKind) -> Option<AnimationHandle> {
        self.active.get(&(pin, kind)).map(|a| a.handle)
    }

    /// Current interpolated value, if an animation is active.
    pub fn value(&self, pin: PinId, kind: AnimationKind) -> Option<f64> {
        self.active.get(&(pin, kind)).map(|a| a.value())
    }

    /// Cancels every animation for `pin`. Returns the number cancelled.
    pub fn release_pin(&mut self, pin: PinId) -> usize {
        let before = self.active.len();
        self.active.retain(|(p, _), _| *p != pin);
        before - self.active.len()
    }

    pub fn cancel(&mut self, pin: PinId, kind: AnimationKind) -> bool {
        self.active.remove(&(pin, kind)).is_some()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Advances all animations by one frame and drops the finished ones.
    pub fn step(&mut self, frame: Frame) -> Vec<AnimationUpdate> {
        let mut updates = Vec::with_capacity(self.active.len());
        for ((pin, kind), anim) in self.active.iter_mut() {
            anim.elapsed_s += frame.dt_s;
            updates.push(AnimationUpdate {
                pin: *pin,
                kind: *kind,
                value: anim.value(),
                done: anim.is_done(),
            });
        }
        self.active.retain(|_, anim| !anim.is_done());
        updates
    }
}
