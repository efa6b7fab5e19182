//! Blend scheduler: cancellable periodic timers.
//!
//! [`TimerHost`] is the arm/cancel capability the controller is driven
//! through. [`TimerQueue`] is a general-purpose implementation on a simulated
//! millisecond clock; adapters advance it with their frame delta and deliver
//! the returned firings back to the controller.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::config::BlendConfig;

const SECS_TO_MS: f32 = 1000.0;
const CARRY_TOLERANCE_MS: f64 = 1e-3;

/// Opaque reference to one armed periodic timer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

/// Arm/cancel capability provided by the host.
pub trait TimerHost {
    /// Schedule a periodic firing every `interval_ms` until cancelled.
    fn arm(&mut self, interval_ms: u32) -> TimerHandle;
    /// Stop future firings. Unknown or already-cancelled handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
}

/// Frame delta assumed until the host reports a usable one.
pub const NOMINAL_FRAME_DT: f32 = 1.0 / 60.0;

/// Step intervals for both ramp directions, captured from one tick's `dt`.
///
/// `normal_ms` is always `fast_ms * ramp_down_speedup` rounded to whole
/// milliseconds, so the ramp-down runs at the configured multiple of the
/// ramp-up frequency whatever the frame time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    /// Ramp-up interval: roughly one tick.
    pub normal_ms: u32,
    /// Ramp-down interval: one tick divided by the speedup.
    pub fast_ms: u32,
}

impl Cadence {
    /// Cadence for a tick of `dt` seconds. `None` for a zero, negative or
    /// non-finite `dt`; callers keep their previous cadence in that case.
    pub fn from_dt(dt: f32, cfg: &BlendConfig) -> Option<Self> {
        if dt.is_finite() && dt > 0.0 {
            Some(Self::from_positive_dt(dt, cfg))
        } else {
            None
        }
    }

    /// Cadence at [`NOMINAL_FRAME_DT`].
    pub fn nominal(cfg: &BlendConfig) -> Self {
        Self::from_positive_dt(NOMINAL_FRAME_DT, cfg)
    }

    fn from_positive_dt(dt: f32, cfg: &BlendConfig) -> Self {
        let fast_ms = whole_ms(dt * SECS_TO_MS / cfg.ramp_down_speedup);
        let fast_ms = fast_ms.max(cfg.min_interval_ms);
        let normal_ms = whole_ms(fast_ms as f32 * cfg.ramp_down_speedup).max(fast_ms);
        Self { normal_ms, fast_ms }
    }
}

// `as` saturates at u32::MAX
fn whole_ms(ms: f32) -> u32 {
    ms.round() as u32
}

#[derive(Debug, Clone)]
struct TimerEntry {
    interval_ms: u64,
    next_due_ms: u64,
}

/// Simulated-clock periodic timer set.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now_ms: u64,
    carry_ms: f64,
    next_id: u64,
    timers: HashMap<TimerHandle, TimerEntry>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of timers that will still fire.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.timers.len()
    }

    #[inline]
    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    /// Interval of a live timer.
    pub fn interval_of(&self, handle: TimerHandle) -> Option<u32> {
        self.timers
            .get(&handle)
            .map(|t| u32::try_from(t.interval_ms).unwrap_or(u32::MAX))
    }

    /// Advance the clock by `elapsed_ms` and return every firing that fell due,
    /// oldest first. Simultaneous firings are ordered by arming order.
    ///
    /// A handle cancelled after being returned here is not recalled; receivers
    /// must ignore firings for handles they no longer own.
    pub fn advance(&mut self, elapsed_ms: u64) -> Vec<TimerHandle> {
        let target = self.now_ms.saturating_add(elapsed_ms);
        let mut fired = Vec::new();
        loop {
            let next = self
                .timers
                .iter()
                .filter(|(_, t)| t.next_due_ms <= target)
                .min_by_key(|(h, t)| (t.next_due_ms, **h))
                .map(|(h, _)| *h);
            let Some(handle) = next else { break };
            if let Some(entry) = self.timers.get_mut(&handle) {
                self.now_ms = entry.next_due_ms;
                entry.next_due_ms = entry.next_due_ms.saturating_add(entry.interval_ms);
            }
            fired.push(handle);
        }
        self.now_ms = target;
        fired
    }

    /// Advance by a frame delta in seconds, carrying sub-millisecond remainders
    /// into the next call.
    pub fn advance_secs(&mut self, dt: f32) -> Vec<TimerHandle> {
        if !dt.is_finite() || dt <= 0.0 {
            return Vec::new();
        }
        let total = self.carry_ms + f64::from(dt) * 1000.0;
        // f32 deltas like 0.02 land just under the whole millisecond
        let whole = (total + CARRY_TOLERANCE_MS).floor();
        self.carry_ms = (total - whole).max(0.0);
        self.advance(whole as u64)
    }

}

impl TimerHost for TimerQueue {
    fn arm(&mut self, interval_ms: u32) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let interval_ms = u64::from(interval_ms.max(1));
        self.timers.insert(
            handle,
            TimerEntry {
                interval_ms,
                next_due_ms: self.now_ms.saturating_add(interval_ms),
            },
        );
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.remove(&handle);
    }
}
