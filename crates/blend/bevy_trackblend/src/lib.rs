//! Bevy adapter for trackblend-core.
//!
//! The plugin stands in for the host: `Time` is the tick source, the
//! [`DriveInput`] resource is the input source, [`BlendTimers`] is the timer
//! host, and [`IkOverlayAlpha`] is where the published parameter lands for the
//! animation side to read. Adding the plugin activates the controller; the
//! exclusive [`detach`] system (or app exit) deactivates it.

use bevy::prelude::*;
use trackblend_core::{BlendConfig, BlendController};

pub mod resources;
pub mod systems;

pub use resources::{
    BlendClock, BlendTimers, DriveInput, IkOverlayAlpha, TrackBlend, TrackBlendEvent,
};
pub use trackblend_core;

/// System set for the per-frame blend pipeline (sample → step timers → publish).
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackBlendSet;

#[derive(Default)]
pub struct TrackBlendPlugin {
    pub config: BlendConfig,
}

impl TrackBlendPlugin {
    pub fn with_config(config: BlendConfig) -> Self {
        Self { config }
    }
}

impl Plugin for TrackBlendPlugin {
    fn build(&self, app: &mut App) {
        let controller = match BlendController::new(self.config.clone()) {
            Ok(c) => c,
            Err(err) => {
                error!(%err, "invalid trackblend config; falling back to defaults");
                BlendController::default()
            }
        };
        let blend = TrackBlend::new(controller);
        let published = blend.publisher.publish(&blend.controller);

        app.insert_resource(blend)
            .insert_resource(IkOverlayAlpha(published))
            .init_resource::<BlendTimers>()
            .init_resource::<DriveInput>()
            .init_resource::<BlendClock>()
            .add_event::<TrackBlendEvent>()
            .add_systems(
                Update,
                (
                    systems::sample_and_step_system,
                    systems::advance_timers_system,
                    systems::publish_weight_system,
                    systems::forward_events_system,
                )
                    .chain()
                    .in_set(TrackBlendSet)
                    .run_if(resource_exists::<TrackBlend>),
            )
            .add_systems(Last, systems::shutdown_on_exit_system);
    }
}

/// Deactivate the controller: cancel any live ramp, remove [`TrackBlend`]
/// and restore the published parameter to full tracking. Safe to run more
/// than once.
pub fn detach(world: &mut World) {
    let Some(mut blend) = world.remove_resource::<TrackBlend>() else {
        return;
    };
    if let Some(mut timers) = world.get_resource_mut::<BlendTimers>() {
        let cancelled = blend.controller.shutdown(&mut timers.0);
        info!(?cancelled, "trackblend detached");
    }
    if let Some(mut out) = world.get_resource_mut::<IkOverlayAlpha>() {
        out.0.value = 1.0;
    }
}
