//! Recording host double.
//!
//! Wraps a [`TimerQueue`] and records every arm/cancel/subscribe call into a
//! shared log that stays readable through a [`HostProbe`] after the host has
//! been moved into (or dropped with) a session.

use std::cell::RefCell;
use std::rc::Rc;

use trackblend_core::{
    BlendSession, CallbackHost, DriveKey, DriveSnapshot, InputSource, SubscriptionId, TimerHandle,
    TimerHost, TimerQueue,
};

#[derive(Clone, Debug, PartialEq)]
pub enum HostOp {
    Arm { handle: TimerHandle, interval_ms: u32 },
    Cancel { handle: TimerHandle },
    SubscribeTick(SubscriptionId),
    UnsubscribeTick(SubscriptionId),
    RegisterParameters(SubscriptionId, Vec<String>),
    UnregisterParameters(SubscriptionId),
}

#[derive(Debug, Default)]
pub struct HostState {
    pub input: DriveSnapshot,
    pub ops: Vec<HostOp>,
    pub live_timers: usize,
    pub max_live_timers: usize,
    /// Arms issued while another timer was still live.
    pub arms_while_live: usize,
    pub tick_subscriptions: Vec<SubscriptionId>,
    pub parameter_providers: Vec<(SubscriptionId, Vec<String>)>,
    next_subscription: u64,
}

#[derive(Debug)]
pub struct RecordingHost {
    timers: TimerQueue,
    state: Rc<RefCell<HostState>>,
}

/// Test-side view into a [`RecordingHost`].
#[derive(Clone, Debug)]
pub struct HostProbe(Rc<RefCell<HostState>>);

impl RecordingHost {
    pub fn new() -> (Self, HostProbe) {
        let state = Rc::new(RefCell::new(HostState {
            input: DriveSnapshot::tracked(),
            ..HostState::default()
        }));
        (
            Self {
                timers: TimerQueue::new(),
                state: Rc::clone(&state),
            },
            HostProbe(state),
        )
    }

    pub fn advance(&mut self, ms: u64) -> Vec<TimerHandle> {
        self.timers.advance(ms)
    }

    pub fn advance_secs(&mut self, dt: f32) -> Vec<TimerHandle> {
        self.timers.advance_secs(dt)
    }

    fn next_id(&self) -> SubscriptionId {
        let mut st = self.state.borrow_mut();
        st.next_subscription += 1;
        SubscriptionId(st.next_subscription)
    }
}

impl TimerHost for RecordingHost {
    fn arm(&mut self, interval_ms: u32) -> TimerHandle {
        let was_live = self.timers.live_count();
        let handle = self.timers.arm(interval_ms);
        let mut st = self.state.borrow_mut();
        if was_live > 0 {
            st.arms_while_live += 1;
        }
        st.live_timers = self.timers.live_count();
        st.max_live_timers = st.max_live_timers.max(st.live_timers);
        st.ops.push(HostOp::Arm {
            handle,
            interval_ms,
        });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.cancel(handle);
        let mut st = self.state.borrow_mut();
        st.live_timers = self.timers.live_count();
        st.ops.push(HostOp::Cancel { handle });
    }
}

impl InputSource for RecordingHost {
    fn tracking_valid(&self) -> bool {
        self.state.borrow().input.tracking_valid
    }

    fn drive_magnitude(&self, key: DriveKey) -> f32 {
        self.state.borrow().input.drive_magnitude(key)
    }
}

impl CallbackHost for RecordingHost {
    fn subscribe_tick(&mut self) -> SubscriptionId {
        let id = self.next_id();
        let mut st = self.state.borrow_mut();
        st.tick_subscriptions.push(id);
        st.ops.push(HostOp::SubscribeTick(id));
        id
    }

    fn unsubscribe_tick(&mut self, id: SubscriptionId) {
        let mut st = self.state.borrow_mut();
        st.tick_subscriptions.retain(|s| *s != id);
        st.ops.push(HostOp::UnsubscribeTick(id));
    }

    fn register_parameter_provider(&mut self, names: &[String]) -> SubscriptionId {
        let id = self.next_id();
        let mut st = self.state.borrow_mut();
        st.parameter_providers.push((id, names.to_vec()));
        st.ops.push(HostOp::RegisterParameters(id, names.to_vec()));
        id
    }

    fn unregister_parameter_provider(&mut self, id: SubscriptionId) {
        let mut st = self.state.borrow_mut();
        st.parameter_providers.retain(|(s, _)| *s != id);
        st.ops.push(HostOp::UnregisterParameters(id));
    }
}

impl HostProbe {
    pub fn set_input(&self, input: DriveSnapshot) {
        self.0.borrow_mut().input = input;
    }

    pub fn press(&self, key: DriveKey, magnitude: f32) {
        self.0.borrow_mut().input.set(key, magnitude);
    }

    pub fn release_all(&self) {
        self.0.borrow_mut().input.release_all();
    }

    pub fn set_tracking(&self, valid: bool) {
        self.0.borrow_mut().input.tracking_valid = valid;
    }

    pub fn live_timers(&self) -> usize {
        self.0.borrow().live_timers
    }

    pub fn max_live_timers(&self) -> usize {
        self.0.borrow().max_live_timers
    }

    pub fn arms_while_live(&self) -> usize {
        self.0.borrow().arms_while_live
    }

    pub fn ops(&self) -> Vec<HostOp> {
        self.0.borrow().ops.clone()
    }

    pub fn active_tick_subscriptions(&self) -> usize {
        self.0.borrow().tick_subscriptions.len()
    }

    pub fn active_parameter_providers(&self) -> Vec<(SubscriptionId, Vec<String>)> {
        self.0.borrow().parameter_providers.clone()
    }

    pub fn count_ops(&self, pred: impl Fn(&HostOp) -> bool) -> usize {
        self.0.borrow().ops.iter().filter(|op| pred(*op)).count()
    }
}

/// Advance the session's host clock by `ms` and deliver every due firing.
/// Returns how many firings stepped the weight.
pub fn run_timers(session: &mut BlendSession<RecordingHost>, ms: u64) -> usize {
    let due = session.host_mut().advance(ms);
    due.into_iter().filter(|h| session.fire_timer(*h)).count()
}

/// One host frame: tick callback, then the frame's worth of timer firings.
pub fn run_frame(session: &mut BlendSession<RecordingHost>, dt: f32) -> usize {
    session.tick(dt);
    let due = session.host_mut().advance_secs(dt);
    due.into_iter().filter(|h| session.fire_timer(*h)).count()
}
