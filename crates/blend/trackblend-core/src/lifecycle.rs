//! Lifecycle manager: one activation of the controller against a host.
//!
//! [`BlendSession::activate`] registers the per-tick callback and the weight
//! parameter provider with the host. [`BlendSession::deactivate`] cancels any
//! live ramp timer and deregisters both, exactly once. Dropping a session
//! deactivates it, so teardown also happens on early returns, panics and hosts
//! that simply discard the session.

use serde::{Deserialize, Serialize};

use crate::config::BlendConfig;
use crate::controller::{BlendController, BlendSnapshot, BlendState};
use crate::error::BlendError;
use crate::events::BlendEvent;
use crate::publisher::{AnimParameter, WeightPublisher};
use crate::sampler::{sample_override, InputSource};
use crate::scheduler::{TimerHandle, TimerHost};
use crate::weight::BlendWeight;

/// Registration token returned by the host.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Callback registration surface of the host.
pub trait CallbackHost {
    fn subscribe_tick(&mut self) -> SubscriptionId;
    fn unsubscribe_tick(&mut self, id: SubscriptionId);
    /// Register a provider for the given animation parameter names.
    fn register_parameter_provider(&mut self, names: &[String]) -> SubscriptionId;
    fn unregister_parameter_provider(&mut self, id: SubscriptionId);
}

/// Everything a session needs from its host.
pub trait BlendHost: TimerHost + InputSource + CallbackHost {}

impl<T: TimerHost + InputSource + CallbackHost + ?Sized> BlendHost for T {}

#[derive(Debug, Clone, Copy)]
struct Registrations {
    tick: SubscriptionId,
    parameters: SubscriptionId,
}

#[derive(Debug)]
pub struct BlendSession<H: BlendHost> {
    host: H,
    controller: BlendController,
    publisher: WeightPublisher,
    registrations: Option<Registrations>,
}

impl<H: BlendHost> BlendSession<H> {
    /// Validate `cfg` and register callbacks with `host`.
    pub fn activate(mut host: H, cfg: BlendConfig) -> Result<Self, BlendError> {
        let controller = BlendController::new(cfg)?;
        let publisher = WeightPublisher::for_controller(&controller);
        let tick = host.subscribe_tick();
        let parameters = host.register_parameter_provider(&[publisher.name().to_string()]);
        tracing::info!(
            parameter = publisher.name(),
            ?tick,
            ?parameters,
            "blend controller activated"
        );
        Ok(Self {
            host,
            controller,
            publisher,
            registrations: Some(Registrations { tick, parameters }),
        })
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.registrations.is_some()
    }

    /// Per-tick callback: sample input and drive the state machine. Returns the
    /// override signal seen this tick (always false once deactivated).
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.is_active() {
            return false;
        }
        let requested = sample_override(&self.host, self.controller.config());
        self.controller.on_tick(dt, requested, &mut self.host);
        requested
    }

    /// Timer callback. Returns whether the firing stepped the weight.
    pub fn fire_timer(&mut self, handle: TimerHandle) -> bool {
        if !self.is_active() {
            return false;
        }
        self.controller.on_timer(handle, &mut self.host)
    }

    /// Parameter-provider callback.
    pub fn parameters(&self) -> AnimParameter {
        self.publisher.publish(&self.controller)
    }

    #[inline]
    pub fn weight(&self) -> BlendWeight {
        self.controller.weight()
    }

    #[inline]
    pub fn state(&self) -> BlendState {
        self.controller.state()
    }

    pub fn snapshot(&self) -> BlendSnapshot {
        self.controller.snapshot()
    }

    pub fn drain_events(&mut self) -> Vec<BlendEvent> {
        self.controller.drain_events()
    }

    #[inline]
    pub fn host(&self) -> &H {
        &self.host
    }

    #[inline]
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Cancel the live timer and deregister callbacks. Only the first call
    /// does anything; it returns true.
    pub fn deactivate(&mut self) -> bool {
        let Some(reg) = self.registrations.take() else {
            return false;
        };
        let cancelled = self.controller.shutdown(&mut self.host);
        self.host.unsubscribe_tick(reg.tick);
        self.host.unregister_parameter_provider(reg.parameters);
        tracing::info!(?cancelled, "blend controller deactivated");
        true
    }
}

impl<H: BlendHost> Drop for BlendSession<H> {
    fn drop(&mut self) {
        if self.is_active() {
            tracing::debug!("blend session dropped while active; deactivating");
            self.deactivate();
        }
    }
}
