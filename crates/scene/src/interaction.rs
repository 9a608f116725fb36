use foundation::geo::ScreenPoint;
use foundation::ids::PinId;

/// Pointer and touch input routed to the pin layer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointerEvent {
    Enter { pin: PinId, at: ScreenPoint },
    Leave { pin: PinId },
    Click { pin: PinId, at: ScreenPoint },
    BackgroundClick,
    TouchStart { pin: PinId, at: ScreenPoint },
    TouchEnd { pin: PinId, at: ScreenPoint },
}

/// State change produced by one input event, in emission order.
///
/// Effects are the seam to the animation layer: `Deselected` asks it to
/// reverse the selection animation, `HoverEnded` the hover one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InteractionEffect {
    HoverStarted(PinId),
    HoverEnded(PinId),
    Selected(PinId),
    Deselected(PinId),
}

/// Hover/selection state machine.
///
/// Invariants:
/// - At most one pin is hovered and at most one is selected; the two
///   roles may be held by different pins simultaneously.
/// - Stale `Leave` events (for a pin that is not the hovered one) are
///   ignored.
/// - Touch has no persistent hover: `TouchEnd` selects and clears hover
///   in the same transition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InteractionService {
    hovered: Option<PinId>,
    selected: Option<PinId>,
    last_pointer: Option<ScreenPoint>,
}

impl InteractionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> Option<PinId> {
        self.hovered
    }

    pub fn selected(&self) -> Option<PinId> {
        self.selected
    }

    /// Last event position, recorded for tooltip placement.
    pub fn last_pointer(&self) -> Option<ScreenPoint> {
        self.last_pointer
    }

    pub fn apply(&mut self, event: PointerEvent) -> Vec<InteractionEffect> {
        let mut effects = Vec::new();
        match event {
            PointerEvent::Enter { pin, at } | PointerEvent::TouchStart { pin, at } => {
                self.last_pointer = Some(at);
                self.hover(pin, &mut effects);
            }
            PointerEvent::Leave { pin } => {
                if self.hovered == Some(pin) {
                    self.hovered = None;
                    effects.push(InteractionEffect::HoverEnded(pin));
                }
            }
            PointerEvent::Click { pin, at } => {
                self.last_pointer = Some(at);
                self.select(pin, &mut effects);
            }
            PointerEvent::TouchEnd { pin, at } => {
                self.last_pointer = Some(at);
                self.select(pin, &mut effects);
                if let Some(hovered) = self.hovered.take() {
                    effects.push(InteractionEffect::HoverEnded(hovered));
                }
            }
            PointerEvent::BackgroundClick => {
                if let Some(hovered) = self.hovered.take() {
                    effects.push(InteractionEffect::HoverEnded(hovered));
                }
                if let Some(selected) = self.selected.take() {
                    effects.push(InteractionEffect::Deselected(selected));
                }
                self.last_pointer = None;
            }
        }
        effects
    }

    /// Forgets all state without emitting effects. Used on unmount, when
    /// the animation layer is being torn down anyway.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn hover(&mut self, pin: PinId, effects: &mut Vec<InteractionEffect>) {
        if self.hovered == Some(pin) {
            return;
        }
        if let Some(previous) = self.hovered.replace(pin) {
            effects.push(InteractionEffect::HoverEnded(previous));
        }
        effects.push(InteractionEffect::HoverStarted(pin));
    }

    fn select(&mut self, pin: PinId, effects: &mut Vec<InteractionEffect>) {
        if self.selected == Some(pin) {
            return;
        }
        if let Some(previous) = self.selected.replace(pin) {
            effects.push(InteractionEffect::Deselected(previous));
        }
        effects.push(InteractionEffect::Selected(pin));
    }
}
