//! Blend state machine.
//!
//! Owns the blend weight and the single live ramp timer. The weight only
//! moves inside [`BlendController::on_timer`], and only for the handle the
//! current state carries; every transition that arms a timer cancels the
//! previous one first. Together these keep exactly one mutation path alive no
//! matter how the host interleaves ticks and timer firings.
//!
//! Transitions (input = override requested):
//!
//! | state       | true                 | false              |
//! |-------------|----------------------|--------------------|
//! | Tracked     | → RampingDown (fast) | stay               |
//! | RampingDown | stay                 | → RampingUp        |
//! | Overridden  | stay                 | → RampingUp        |
//! | RampingUp   | → RampingDown (fast) | stay               |
//!
//! Ramps continue from the current weight; a ramp that reaches its boundary
//! clamps onto it, retires its timer and pins the state. Ramp cadence comes
//! from the last tick that reported a usable `dt`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::{BlendConfig, SNAP_EPSILON};
use crate::error::BlendError;
use crate::events::BlendEvent;
use crate::scheduler::{Cadence, TimerHandle, TimerHost};
use crate::weight::BlendWeight;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendState {
    /// Weight pinned at 1.0, no timer.
    Tracked,
    /// Weight falling toward 0.0 on the fast cadence.
    RampingDown { timer: TimerHandle },
    /// Weight pinned at 0.0, no timer.
    Overridden,
    /// Weight rising toward 1.0 on the normal cadence.
    RampingUp { timer: TimerHandle },
}

impl BlendState {
    /// Handle of the timer this state owns, if it is a ramp.
    #[inline]
    pub fn timer(&self) -> Option<TimerHandle> {
        match *self {
            BlendState::RampingDown { timer } | BlendState::RampingUp { timer } => Some(timer),
            BlendState::Tracked | BlendState::Overridden => None,
        }
    }

}

impl Default for BlendState {
    fn default() -> Self {
        BlendState::Tracked
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampDirection {
    /// Toward animation (0.0).
    Down,
    /// Toward tracker pose (1.0).
    Up,
}

impl RampDirection {
    fn interval_ms(self, cadence: Cadence) -> u32 {
        match self {
            RampDirection::Down => cadence.fast_ms,
            RampDirection::Up => cadence.normal_ms,
        }
    }

    fn ramping(self, timer: TimerHandle) -> BlendState {
        match self {
            RampDirection::Down => BlendState::RampingDown { timer },
            RampDirection::Up => BlendState::RampingUp { timer },
        }
    }

    fn pinned(self) -> (BlendState, BlendWeight) {
        match self {
            RampDirection::Down => (BlendState::Overridden, BlendWeight::OVERRIDDEN),
            RampDirection::Up => (BlendState::Tracked, BlendWeight::TRACKED),
        }
    }
}

/// Point-in-time view of the controller for diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendSnapshot {
    pub state: BlendState,
    pub weight: f32,
    pub live_timer: Option<TimerHandle>,
}

#[derive(Debug)]
pub struct BlendController {
    cfg: BlendConfig,
    state: BlendState,
    weight: BlendWeight,
    cadence: Cadence,
    events: VecDeque<BlendEvent>,
}

impl Default for BlendController {
    fn default() -> Self {
        let cfg = BlendConfig::default();
        Self {
            cadence: Cadence::nominal(&cfg),
            cfg,
            state: BlendState::Tracked,
            weight: BlendWeight::TRACKED,
            events: VecDeque::new(),
        }
    }
}

impl BlendController {
    pub fn new(cfg: BlendConfig) -> Result<Self, BlendError> {
        cfg.validate()?;
        Ok(Self {
            cadence: Cadence::nominal(&cfg),
            cfg,
            ..Self::default()
        })
    }

    #[inline]
    pub fn state(&self) -> BlendState {
        self.state
    }

    #[inline]
    pub fn weight(&self) -> BlendWeight {
        self.weight
    }

    #[inline]
    pub fn live_timer(&self) -> Option<TimerHandle> {
        self.state.timer()
    }

    #[inline]
    pub fn config(&self) -> &BlendConfig {
        &self.cfg
    }

    /// Cadence the next ramp will be armed with.
    #[inline]
    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn snapshot(&self) -> BlendSnapshot {
        BlendSnapshot {
            state: self.state,
            weight: self.weight.get(),
            live_timer: self.live_timer(),
        }
    }

    /// Take all buffered events.
    pub fn drain_events(&mut self) -> Vec<BlendEvent> {
        self.events.drain(..).collect()
    }

    /// Apply one tick's override signal. A positive, finite `dt` (seconds)
    /// sets the cadence of any ramp entered on this or a later tick; other
    /// values keep the previous cadence.
    pub fn on_tick<T: TimerHost + ?Sized>(
        &mut self,
        dt: f32,
        override_requested: bool,
        timers: &mut T,
    ) {
        if let Some(cadence) = Cadence::from_dt(dt, &self.cfg) {
            self.cadence = cadence;
        }
        match (self.state, override_requested) {
            (BlendState::Tracked, true) | (BlendState::RampingUp { .. }, true) => {
                self.begin_ramp(RampDirection::Down, timers)
            }
            (BlendState::RampingDown { .. }, false) | (BlendState::Overridden, false) => {
                self.begin_ramp(RampDirection::Up, timers)
            }
            _ => {}
        }
    }

    /// Deliver one timer firing. Returns false (and changes nothing) unless
    /// `handle` is the timer the current ramp owns.
    pub fn on_timer<T: TimerHost + ?Sized>(
        &mut self,
        handle: TimerHandle,
        timers: &mut T,
    ) -> bool {
        let direction = match self.state {
            BlendState::RampingDown { timer } if timer == handle => RampDirection::Down,
            BlendState::RampingUp { timer } if timer == handle => RampDirection::Up,
            _ => {
                tracing::trace!(?handle, "stale timer firing ignored");
                self.emit(BlendEvent::StaleFiringIgnored { handle });
                return false;
            }
        };

        let w = self.weight.get();
        let reached = match direction {
            RampDirection::Down => {
                let next = w - self.cfg.step_delta;
                self.weight = BlendWeight::new(next);
                next <= SNAP_EPSILON
            }
            RampDirection::Up => {
                let next = w + self.cfg.step_delta;
                self.weight = BlendWeight::new(next);
                next >= 1.0 - SNAP_EPSILON
            }
        };

        if reached {
            let (pinned, boundary) = direction.pinned();
            self.weight = boundary;
            self.cancel_timer(handle, timers);
            self.emit(BlendEvent::RampCompleted { direction });
            self.set_state(pinned);
        }
        true
    }

    /// Cancel the live timer, if any, and return to `Tracked` at 1.0.
    pub fn shutdown<T: TimerHost + ?Sized>(&mut self, timers: &mut T) -> Option<TimerHandle> {
        let live = self.state.timer();
        if let Some(handle) = live {
            self.cancel_timer(handle, timers);
        }
        self.weight = BlendWeight::TRACKED;
        if self.state != BlendState::Tracked {
            self.set_state(BlendState::Tracked);
        }
        live
    }

    fn begin_ramp<T: TimerHost + ?Sized>(&mut self, direction: RampDirection, timers: &mut T) {
        if let Some(previous) = self.state.timer() {
            self.cancel_timer(previous, timers);
        }
        let interval_ms = direction.interval_ms(self.cadence);
        let handle = timers.arm(interval_ms);
        tracing::debug!(?handle, ?direction, interval_ms, "ramp timer armed");
        self.emit(BlendEvent::TimerArmed {
            handle,
            direction,
            interval_ms,
        });
        self.set_state(direction.ramping(handle));
    }

    fn cancel_timer<T: TimerHost + ?Sized>(&mut self, handle: TimerHandle, timers: &mut T) {
        timers.cancel(handle);
        tracing::debug!(?handle, "ramp timer cancelled");
        self.emit(BlendEvent::TimerCancelled { handle });
    }

    fn set_state(&mut self, next: BlendState) {
        let from = self.state;
        self.state = next;
        tracing::debug!(?from, to = ?next, weight = self.weight.get(), "blend state changed");
        self.emit(BlendEvent::StateChanged {
            from,
            to: next,
            weight: self.weight.get(),
        });
    }

    fn emit(&mut self, event: BlendEvent) {
        let cap = self.cfg.max_pending_events;
        if cap == 0 {
            return;
        }
        while self.events.len() >= cap {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TimerQueue;

    const DT: f32 = 0.016;

    fn controller() -> BlendController {
        BlendController::new(BlendConfig::default()).expect("default config")
    }

    /// Fire every due timer for `ms` of simulated time.
    fn run(c: &mut BlendController, q: &mut TimerQueue, ms: u64) -> usize {
        let mut delivered = 0;
        for h in q.advance(ms) {
            if c.on_timer(h, q) {
                delivered += 1;
            }
        }
        delivered
    }

    #[test]
    fn starts_tracked_without_timer() {
        let c = controller();
        assert_eq!(c.state(), BlendState::Tracked);
        assert_eq!(c.weight(), BlendWeight::TRACKED);
        assert_eq!(c.live_timer(), None);
    }

    #[test]
    fn override_enters_ramp_down_on_fast_cadence() {
        let mut c = controller();
        let mut q = TimerQueue::new();
        c.on_tick(DT, true, &mut q);
        let timer = c.live_timer().expect("ramp timer");
        assert_eq!(c.state(), BlendState::RampingDown { timer });
        assert_eq!(q.interval_of(timer), Some(8));
        assert_eq!(c.weight().get(), 1.0, "weight unchanged on entry");
    }

    #[test]
    fn sustained_override_converges_to_overridden() {
        let mut c = controller();
        let mut q = TimerQueue::new();
        c.on_tick(DT, true, &mut q);
        let steps = run(&mut c, &mut q, 8 * 100);
        assert_eq!(steps, 100);
        assert_eq!(c.state(), BlendState::Overridden);
        assert_eq!(c.weight().get(), 0.0);
        assert_eq!(q.live_count(), 0);
        c.on_tick(DT, true, &mut q);
        assert_eq!(c.state(), BlendState::Overridden);
        assert_eq!(q.live_count(), 0);
    }

    #[test]
    fn release_converges_back_to_tracked() {
        let mut c = controller();
        let mut q = TimerQueue::new();
        c.on_tick(DT, true, &mut q);
        run(&mut c, &mut q, 800);
        c.on_tick(DT, false, &mut q);
        let timer = c.live_timer().expect("ramp up timer");
        assert_eq!(c.state(), BlendState::RampingUp { timer });
        assert_eq!(q.interval_of(timer), Some(16));
        let steps = run(&mut c, &mut q, 16 * 100);
        assert_eq!(steps, 100);
        assert_eq!(c.state(), BlendState::Tracked);
        assert_eq!(c.weight().get(), 1.0);
        assert_eq!(q.live_count(), 0);
    }

    #[test]
    fn flip_mid_ramp_reverses_without_pop() {
        let mut c = controller();
        let mut q = TimerQueue::new();
        c.on_tick(DT, true, &mut q);
        let down = c.live_timer().expect("down timer");
        assert_eq!(run(&mut c, &mut q, 24), 3);
        assert!((c.weight().get() - 0.97).abs() < 1e-5);

        c.on_tick(DT, false, &mut q);
        assert!(!q.is_live(down));
        let up = c.live_timer().expect("up timer");
        assert_ne!(up, down);
        assert_eq!(c.state(), BlendState::RampingUp { timer: up });
        assert!((c.weight().get() - 0.97).abs() < 1e-5);

        assert_eq!(run(&mut c, &mut q, 16 * 3), 3);
        assert_eq!(c.state(), BlendState::Tracked);
        assert_eq!(c.weight().get(), 1.0);
    }

    #[test]
    fn stale_firing_is_a_no_op() {
        let mut c = controller();
        let mut q = TimerQueue::new();
        c.on_tick(DT, true, &mut q);
        let down = c.live_timer().expect("down timer");
        c.on_tick(DT, false, &mut q);
        let before = c.snapshot();
        assert!(!c.on_timer(down, &mut q));
        assert_eq!(c.snapshot(), before);
        assert!(!c.on_timer(TimerHandle(4242), &mut q));
        assert_eq!(c.snapshot(), before);
    }

    #[test]
    fn pinned_states_ignore_matching_signal() {
        let mut c = controller();
        let mut q = TimerQueue::new();
        c.on_tick(DT, false, &mut q);
        assert_eq!(c.state(), BlendState::Tracked);
        assert_eq!(q.live_count(), 0);
        assert!(c.drain_events().is_empty());
    }

    #[test]
    fn shutdown_cancels_live_ramp_and_restores_tracked() {
        let mut c = controller();
        let mut q = TimerQueue::new();
        c.on_tick(DT, true, &mut q);
        run(&mut c, &mut q, 40);
        let live = c.live_timer();
        assert_eq!(c.shutdown(&mut q), live);
        assert_eq!(q.live_count(), 0);
        assert_eq!(c.state(), BlendState::Tracked);
        assert_eq!(c.weight(), BlendWeight::TRACKED);
        assert_eq!(c.shutdown(&mut q), None);
    }

    #[test]
    fn events_record_cancel_before_arm() {
        let mut c = controller();
        let mut q = TimerQueue::new();
        c.on_tick(DT, true, &mut q);
        c.drain_events();
        c.on_tick(DT, false, &mut q);
        let events = c.drain_events();
        let cancel = events
            .iter()
            .position(|e| matches!(e, BlendEvent::TimerCancelled { .. }))
            .expect("cancel event");
        let arm = events
            .iter()
            .position(|e| matches!(e, BlendEvent::TimerArmed { .. }))
            .expect("arm event");
        assert!(cancel < arm);
    }

    #[test]
    fn event_buffer_is_bounded() {
        let cfg = BlendConfig {
            max_pending_events: 4,
            ..BlendConfig::default()
        };
        let mut c = BlendController::new(cfg).expect("config");
        let mut q = TimerQueue::new();
        for i in 0..10 {
            c.on_tick(DT, i % 2 == 0, &mut q);
        }
        assert_eq!(c.drain_events().len(), 4);
    }

    #[test]
    fn full_event_buffer_keeps_the_newest_events() {
        let cfg = BlendConfig {
            max_pending_events: 3,
            ..BlendConfig::default()
        };
        let mut c = BlendController::new(cfg).expect("config");
        let mut q = TimerQueue::new();
        c.on_tick(DT, true, &mut q);
        let down = c.live_timer().expect("down timer");
        c.on_tick(DT, false, &mut q);
        for _ in 0..1_000 {
            c.on_timer(down, &mut q);
        }
        let events = c.drain_events();
        assert_eq!(events.len(), 3);
        assert!(events
            .iter()
            .all(|e| *e == BlendEvent::StaleFiringIgnored { handle: down }));
        assert!(c.drain_events().is_empty());
    }

    #[test]
    fn zero_dt_before_any_frame_uses_the_nominal_cadence() {
        let mut c = controller();
        let mut q = TimerQueue::new();
        c.on_tick(0.0, true, &mut q);
        let down = c.live_timer().expect("down timer");
        assert_eq!(q.interval_of(down), Some(Cadence::nominal(c.config()).fast_ms));
    }

    #[test]
    fn degenerate_dt_keeps_the_last_usable_cadence() {
        let mut c = controller();
        let mut q = TimerQueue::new();
        // 90 Hz frame while idle, then a zero-length frame on the transition tick.
        c.on_tick(0.0111, false, &mut q);
        c.on_tick(0.0, true, &mut q);
        let down = c.live_timer().expect("down timer");
        assert_eq!(q.interval_of(down), Some(6));

        c.on_tick(f32::NAN, false, &mut q);
        let up = c.live_timer().expect("up timer");
        assert_eq!(q.interval_of(up), Some(12));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let cfg = BlendConfig {
            step_delta: -1.0,
            ..BlendConfig::default()
        };
        assert!(BlendController::new(cfg).is_err());
    }
}
