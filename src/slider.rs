use std::time::{Duration, Instant};

use crate::color::{self, ChannelKind, SliderPaint};
use crate::settings::{SettingField, SettingsStore};
use crate::timer::{DebounceTimers, TimerPolicy};

// ---------------------------------------------------------------------------
// DragDirection / ChannelId
// ---------------------------------------------------------------------------

/// Sign of recent pointer or value movement on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragDirection {
    Left,
    Right,
    Static,
}

impl DragDirection {
    fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            DragDirection::Right
        } else if delta < 0.0 {
            DragDirection::Left
        } else {
            DragDirection::Static
        }
    }
}

/// One tunable numeric setting with an interactive slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    Temperature,
    MaxTokens,
    PresencePenalty,
    FrequencyPenalty,
    TopP,
}

impl ChannelId {
    /// All channels in panel order. The first is the primary channel.
    pub const ALL: [ChannelId; 5] = [
        ChannelId::Temperature,
        ChannelId::MaxTokens,
        ChannelId::PresencePenalty,
        ChannelId::FrequencyPenalty,
        ChannelId::TopP,
    ];

    pub fn field(self) -> SettingField {
        match self {
            ChannelId::Temperature => SettingField::Temperature,
            ChannelId::MaxTokens => SettingField::MaxTokens,
            ChannelId::PresencePenalty => SettingField::PresencePenalty,
            ChannelId::FrequencyPenalty => SettingField::FrequencyPenalty,
            ChannelId::TopP => SettingField::TopP,
        }
    }

    pub fn kind(self) -> ChannelKind {
        match self {
            ChannelId::Temperature => ChannelKind::Temperature,
            ChannelId::MaxTokens => ChannelKind::Capacity,
            ChannelId::PresencePenalty | ChannelId::FrequencyPenalty => ChannelKind::Penalty,
            ChannelId::TopP => ChannelKind::Default,
        }
    }

    pub fn is_primary(self) -> bool {
        self == ChannelId::ALL[0]
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Horizontal extent of a slider track in pointer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackBounds {
    pub left: f64,
    pub width: f64,
}

// ---------------------------------------------------------------------------
// SliderChannel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SliderChannel {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub current_value: f64,
    /// Seeded lazily by the first recompute.
    pub previous_value: Option<f64>,
    pub drag_direction: DragDirection,
    pub is_dragging: bool,
    drag_start_x: Option<f64>,
    last_pointer_x: Option<f64>,
    moved_during_drag: bool,
    released_at: Option<Instant>,
    paint: SliderPaint,
    recomputes: u64,
}

impl SliderChannel {
    fn new(id: ChannelId, value: f64) -> Self {
        let range = id
            .field()
            .range()
            .unwrap_or(crate::settings::NumericRange {
                min: 0.0,
                max: 1.0,
                step: 0.01,
            });
        Self {
            min: range.min,
            max: range.max,
            step: range.step,
            current_value: value,
            previous_value: None,
            drag_direction: DragDirection::Static,
            is_dragging: false,
            drag_start_x: None,
            last_pointer_x: None,
            moved_during_drag: false,
            released_at: None,
            paint: color::paint(id.kind(), 0.0, DragDirection::Static),
            recomputes: 0,
        }
    }

    /// Position of the current value within `[min, max]`, 0..100.
    pub fn percentage(&self) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.current_value - self.min) / span * 100.0).clamp(0.0, 100.0)
    }

    /// Map a pointer coordinate inside `bounds` to a stepped, clamped value.
    pub fn value_at(&self, x: f64, bounds: TrackBounds) -> f64 {
        let fraction = if bounds.width > 0.0 {
            ((x - bounds.left) / bounds.width).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let raw = self.min + fraction * (self.max - self.min);
        let stepped = (raw / self.step).round() * self.step;
        ((stepped * 1e6).round() / 1e6).clamp(self.min, self.max)
    }

    /// Last computed fill/thumb colors. May lag the value while a deferred
    /// recompute is pending.
    pub fn paint(&self) -> &SliderPaint {
        &self.paint
    }

    #[cfg(test)]
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    /// Value text, formatted to the step's precision.
    pub fn value_label(&self) -> String {
        let decimals = if self.step >= 1.0 {
            0
        } else if self.step >= 0.1 {
            1
        } else {
            2
        };
        format!("{:.*}", decimals, self.current_value)
    }

    fn pointer_direction(&self) -> Option<DragDirection> {
        if !self.is_dragging {
            return None;
        }
        let start = self.drag_start_x?;
        let last = self.last_pointer_x.unwrap_or(start);
        Some(DragDirection::from_delta(last - start))
    }
}

// ---------------------------------------------------------------------------
// SliderEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Coalescing delay of the primary channel's background recompute.
    pub primary_delay: Duration,
    /// Apply the deferred policy to every channel, not just the primary.
    pub debounce_all: bool,
    /// How long the "moved during drag" flag outlives a release.
    pub drag_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            primary_delay: Duration::from_millis(10),
            debounce_all: false,
            drag_grace: Duration::from_millis(50),
        }
    }
}

/// Pointer and keyboard interaction for every slider channel.
///
/// Value text updates synchronously. The background fill of the primary
/// channel is recomputed on a per-channel debounce timer; other channels
/// recompute on every input unless `debounce_all` is set.
#[derive(Debug)]
pub struct SliderEngine {
    channels: Vec<SliderChannel>,
    timers: DebounceTimers<ChannelId>,
    config: EngineConfig,
}

impl SliderEngine {
    pub fn new(config: EngineConfig, store: &SettingsStore) -> Self {
        let channels = ChannelId::ALL
            .iter()
            .map(|id| SliderChannel::new(*id, store.number(id.field()).unwrap_or_default()))
            .collect();
        let mut engine = Self {
            channels,
            timers: DebounceTimers::new(),
            config,
        };
        for id in ChannelId::ALL {
            engine.recompute(id);
        }
        engine
    }

    pub fn channel(&self, id: ChannelId) -> &SliderChannel {
        &self.channels[id.index()]
    }

    #[cfg(test)]
    pub fn channels(&self) -> &[SliderChannel] {
        &self.channels
    }

    pub fn policy(&self, id: ChannelId) -> TimerPolicy {
        if id.is_primary() || self.config.debounce_all {
            TimerPolicy::Deferred(self.config.primary_delay)
        } else {
            TimerPolicy::Immediate
        }
    }

    #[cfg(test)]
    pub fn is_recompute_pending(&self, id: ChannelId) -> bool {
        self.timers.is_pending(id)
    }

    /// Idle -> Dragging.
    pub fn pointer_down(&mut self, id: ChannelId, x: f64) {
        let ch = &mut self.channels[id.index()];
        ch.is_dragging = true;
        ch.drag_start_x = Some(x);
        ch.last_pointer_x = Some(x);
        ch.moved_during_drag = false;
        ch.released_at = None;
        tracing::trace!(channel = ?id, x, "drag start");
    }

    /// Applies the pointer value on every movement sample while dragging.
    pub fn pointer_move(
        &mut self,
        id: ChannelId,
        x: f64,
        bounds: TrackBounds,
        store: &mut SettingsStore,
        now: Instant,
    ) -> Option<f64> {
        let ch = &mut self.channels[id.index()];
        if !ch.is_dragging {
            return None;
        }
        if ch.last_pointer_x != Some(x) {
            ch.moved_during_drag = true;
        }
        ch.last_pointer_x = Some(x);
        let value = ch.value_at(x, bounds);
        self.apply(id, value, store, now)
    }

    /// Dragging -> Idle. The moved flag survives for the grace window so a
    /// trailing click is recognised as part of the drag.
    pub fn pointer_up(&mut self, id: ChannelId, now: Instant) {
        let ch = &mut self.channels[id.index()];
        if !ch.is_dragging {
            return;
        }
        ch.is_dragging = false;
        ch.drag_start_x = None;
        ch.last_pointer_x = None;
        ch.released_at = Some(now);
    }

    /// Bare click: applies the pointer value unless it trails a drag.
    pub fn click(
        &mut self,
        id: ChannelId,
        x: f64,
        bounds: TrackBounds,
        store: &mut SettingsStore,
        now: Instant,
    ) -> Option<f64> {
        let ch = &self.channels[id.index()];
        if ch.moved_during_drag {
            tracing::trace!(channel = ?id, "click after drag ignored");
            return None;
        }
        let value = ch.value_at(x, bounds);
        self.apply(id, value, store, now)
    }

    /// Keyboard adjustment by whole steps.
    pub fn step(
        &mut self,
        id: ChannelId,
        steps: i32,
        store: &mut SettingsStore,
        now: Instant,
    ) -> Option<f64> {
        let ch = &self.channels[id.index()];
        let value = ch.current_value + ch.step * steps as f64;
        self.apply(id, value, store, now)
    }

    fn apply(
        &mut self,
        id: ChannelId,
        value: f64,
        store: &mut SettingsStore,
        now: Instant,
    ) -> Option<f64> {
        let stored = store.set_number(id.field(), value)?;
        self.channels[id.index()].current_value = stored;
        match self.policy(id) {
            TimerPolicy::Immediate => self.recompute(id),
            TimerPolicy::Deferred(delay) => self.timers.schedule(id, delay, now),
        }
        Some(stored)
    }

    /// Run due deferred recomputes and expire drag grace windows. Returns the
    /// channels whose paint was recomputed.
    pub fn tick(&mut self, now: Instant) -> Vec<ChannelId> {
        let grace = self.config.drag_grace;
        for ch in &mut self.channels {
            if let Some(released) = ch.released_at {
                if !ch.is_dragging && now.saturating_duration_since(released) >= grace {
                    ch.moved_during_drag = false;
                    ch.released_at = None;
                }
            }
        }
        let due = self.timers.take_due(now);
        for id in &due {
            self.recompute(*id);
        }
        due
    }

    /// How soon the event loop should wake for the next deferred recompute.
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        self.timers.next_deadline_in(now)
    }

    /// Re-read every channel from the store (after a reset) and repaint.
    pub fn sync_from_store(&mut self, store: &SettingsStore) {
        for id in ChannelId::ALL {
            self.timers.cancel(id);
            let ch = &mut self.channels[id.index()];
            ch.current_value = store.number(id.field()).unwrap_or(ch.min);
            ch.previous_value = None;
            ch.is_dragging = false;
            ch.drag_start_x = None;
            ch.last_pointer_x = None;
            ch.moved_during_drag = false;
            ch.released_at = None;
            self.recompute(id);
        }
    }

    fn recompute(&mut self, id: ChannelId) {
        let ch = &mut self.channels[id.index()];
        let previous = *ch.previous_value.get_or_insert(ch.current_value);
        let direction = ch
            .pointer_direction()
            .unwrap_or_else(|| DragDirection::from_delta(ch.current_value - previous));
        ch.drag_direction = direction;
        ch.paint = color::paint(id.kind(), ch.percentage(), direction);
        ch.previous_value = Some(ch.current_value);
        ch.recomputes += 1;
        tracing::trace!(
            channel = ?id,
            value = ch.current_value,
            ?direction,
            recomputes = ch.recomputes,
            fill = %ch.paint.to_css_gradient(),
            "slider recompute"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);
    // 40-cell track starting at column 10.
    const BOUNDS: TrackBounds = TrackBounds {
        left: 10.0,
        width: 40.0,
    };

    fn setup() -> (SliderEngine, SettingsStore, Instant) {
        let store = SettingsStore::default();
        let engine = SliderEngine::new(EngineConfig::default(), &store);
        (engine, store, Instant::now())
    }

    /// Pointer x for a value on `BOUNDS`.
    fn x_for(ch: &SliderChannel, value: f64) -> f64 {
        BOUNDS.left + (value - ch.min) / (ch.max - ch.min) * BOUNDS.width
    }

    #[test]
    fn pointer_mapping_clamps_and_steps() {
        let (engine, _, _) = setup();
        let temp = engine.channel(ChannelId::Temperature);
        assert_eq!(temp.value_at(10.0, BOUNDS), 0.0);
        assert_eq!(temp.value_at(50.0, BOUNDS), 2.0);
        assert_eq!(temp.value_at(-100.0, BOUNDS), 0.0);
        assert_eq!(temp.value_at(900.0, BOUNDS), 2.0);
        assert_eq!(temp.value_at(30.0, BOUNDS), 1.0);
        // 0.37 of the range -> 0.74 -> 0.7
        assert_eq!(temp.value_at(24.8, BOUNDS), 0.7);

        let tokens = engine.channel(ChannelId::MaxTokens);
        let v = tokens.value_at(23.3, BOUNDS);
        assert_eq!(v % 64.0, 0.0);
        assert!((256.0..=4096.0).contains(&v));
    }

    #[test]
    fn zero_width_track_maps_to_min() {
        let (engine, _, _) = setup();
        let bounds = TrackBounds {
            left: 3.0,
            width: 0.0,
        };
        assert_eq!(engine.channel(ChannelId::TopP).value_at(7.0, bounds), 0.0);
    }

    #[test]
    fn initial_recompute_seeds_previous_value() {
        let (engine, _, _) = setup();
        for ch in engine.channels() {
            assert_eq!(ch.previous_value, Some(ch.current_value));
            assert_eq!(ch.drag_direction, DragDirection::Static);
            assert_eq!(ch.recompute_count(), 1);
        }
    }

    #[test]
    fn bare_click_applies_immediately() {
        let (mut engine, mut store, t0) = setup();
        engine.pointer_down(ChannelId::TopP, 20.0);
        engine.pointer_up(ChannelId::TopP, t0);
        let v = engine.click(ChannelId::TopP, 20.0, BOUNDS, &mut store, t0);
        assert_eq!(v, Some(0.25));
        assert_eq!(store.settings().top_p, 0.25);
        assert_eq!(engine.channel(ChannelId::TopP).current_value, 0.25);
    }

    #[test]
    fn trailing_click_after_drag_is_ignored_until_grace_expires() {
        let (mut engine, mut store, t0) = setup();
        let id = ChannelId::PresencePenalty;
        engine.pointer_down(id, 30.0);
        engine.pointer_move(id, 40.0, BOUNDS, &mut store, t0 + MS);
        engine.pointer_up(id, t0 + MS * 2);
        assert_eq!(store.settings().presence_penalty, 1.0);

        assert_eq!(engine.click(id, 10.0, BOUNDS, &mut store, t0 + MS * 2), None);
        assert_eq!(store.settings().presence_penalty, 1.0);

        engine.tick(t0 + MS * 60);
        assert_eq!(
            engine.click(id, 10.0, BOUNDS, &mut store, t0 + MS * 61),
            Some(-2.0)
        );
    }

    #[test]
    fn move_without_drag_is_ignored() {
        let (mut engine, mut store, t0) = setup();
        assert_eq!(
            engine.pointer_move(ChannelId::TopP, 12.0, BOUNDS, &mut store, t0),
            None
        );
        assert_eq!(store.settings().top_p, 1.0);
    }

    #[test]
    fn pointer_direction_takes_precedence_while_dragging() {
        let (mut engine, mut store, t0) = setup();
        let id = ChannelId::MaxTokens;
        engine.pointer_down(id, 15.0);
        engine.pointer_move(id, 40.0, BOUNDS, &mut store, t0);
        assert_eq!(engine.channel(id).drag_direction, DragDirection::Right);

        // Value drops but the pointer is still right of where the drag began.
        engine.pointer_move(id, 25.0, BOUNDS, &mut store, t0 + MS);
        assert_eq!(engine.channel(id).drag_direction, DragDirection::Right);

        engine.pointer_move(id, 11.0, BOUNDS, &mut store, t0 + MS * 2);
        assert_eq!(engine.channel(id).drag_direction, DragDirection::Left);

        engine.pointer_move(id, 15.0, BOUNDS, &mut store, t0 + MS * 3);
        assert_eq!(engine.channel(id).drag_direction, DragDirection::Static);
    }

    #[test]
    fn value_direction_when_idle() {
        let (mut engine, mut store, t0) = setup();
        let id = ChannelId::FrequencyPenalty;
        engine.step(id, 3, &mut store, t0);
        assert_eq!(engine.channel(id).drag_direction, DragDirection::Right);
        engine.step(id, -1, &mut store, t0);
        assert_eq!(engine.channel(id).drag_direction, DragDirection::Left);
        assert_eq!(store.settings().frequency_penalty, 0.2);
    }

    #[test]
    fn secondary_channels_recompute_on_every_input() {
        let (mut engine, mut store, t0) = setup();
        let id = ChannelId::MaxTokens;
        for i in 0..5 {
            engine.step(id, 1, &mut store, t0 + MS * i);
        }
        assert_eq!(engine.channel(id).recompute_count(), 6);
        assert!(!engine.is_recompute_pending(id));
        assert_eq!(store.settings().max_tokens, 2048 + 5 * 64);
    }

    #[test]
    fn primary_drag_coalesces_into_one_late_recompute() {
        let (mut engine, mut store, t0) = setup();
        let id = ChannelId::Temperature;
        let start = x_for(engine.channel(id), 0.7);
        let far = x_for(engine.channel(id), 1.4);
        let before = engine.channel(id).recompute_count();

        engine.pointer_down(id, start);
        engine.pointer_move(id, far, BOUNDS, &mut store, t0);
        assert_eq!(engine.channel(id).value_label(), "1.4");
        engine.pointer_move(id, start + 1.0, BOUNDS, &mut store, t0 + MS * 2);
        engine.pointer_move(id, start, BOUNDS, &mut store, t0 + MS * 4);
        engine.pointer_up(id, t0 + MS * 5);

        // Text tracks the value at once; the fill does not.
        assert_eq!(engine.channel(id).value_label(), "0.7");
        assert!(engine.tick(t0 + MS * 9).is_empty());
        assert_eq!(engine.channel(id).recompute_count(), before);

        assert_eq!(engine.tick(t0 + MS * 14), vec![id]);
        assert!(engine.tick(t0 + MS * 100).is_empty());
        let ch = engine.channel(id);
        assert_eq!(ch.recompute_count(), before + 1);
        assert!((ch.paint().percentage - 35.0).abs() < 1e-9);
        assert_eq!(store.settings().temperature, 0.7);
    }

    #[test]
    fn debounce_all_defers_every_channel() {
        let store = SettingsStore::default();
        let mut store2 = store.clone();
        let config = EngineConfig {
            debounce_all: true,
            ..EngineConfig::default()
        };
        let mut engine = SliderEngine::new(config, &store);
        let t0 = Instant::now();
        engine.step(ChannelId::TopP, -2, &mut store2, t0);
        engine.step(ChannelId::TopP, -2, &mut store2, t0 + MS);
        assert!(engine.is_recompute_pending(ChannelId::TopP));
        assert_eq!(engine.next_wakeup(t0 + MS), Some(MS * 10));
        assert_eq!(engine.tick(t0 + MS * 11), vec![ChannelId::TopP]);
        assert_eq!(engine.channel(ChannelId::TopP).recompute_count(), 2);
    }

    #[test]
    fn sync_after_reset_matches_defaults() {
        let (mut engine, mut store, t0) = setup();
        engine.step(ChannelId::Temperature, 8, &mut store, t0);
        engine.step(ChannelId::TopP, -4, &mut store, t0);
        store.reset();
        engine.sync_from_store(&store);
        assert!(!engine.is_recompute_pending(ChannelId::Temperature));
        assert_eq!(engine.channel(ChannelId::Temperature).current_value, 0.7);
        assert_eq!(engine.channel(ChannelId::MaxTokens).current_value, 2048.0);
        assert_eq!(engine.channel(ChannelId::PresencePenalty).current_value, 0.0);
        assert_eq!(engine.channel(ChannelId::FrequencyPenalty).current_value, 0.0);
        assert_eq!(engine.channel(ChannelId::TopP).current_value, 1.0);
        for ch in engine.channels() {
            assert_eq!(ch.drag_direction, DragDirection::Static);
        }
    }

    #[test]
    fn value_labels_follow_step_precision() {
        let (engine, _, _) = setup();
        assert_eq!(engine.channel(ChannelId::Temperature).value_label(), "0.7");
        assert_eq!(engine.channel(ChannelId::MaxTokens).value_label(), "2048");
        assert_eq!(engine.channel(ChannelId::TopP).value_label(), "1.00");
    }
}
