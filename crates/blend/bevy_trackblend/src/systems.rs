use bevy::prelude::*;
use trackblend_core::sample_override;

use crate::resources::{
    BlendClock, BlendTimers, DriveInput, IkOverlayAlpha, TrackBlend, TrackBlendEvent,
};

/// Tick callback: sample input and let the state machine decide transitions.
/// The cadence of any ramp entered here comes from this frame's delta; the
/// zero delta of the first frame keeps the controller's nominal cadence.
pub fn sample_and_step_system(
    mut blend: ResMut<TrackBlend>,
    mut timers: ResMut<BlendTimers>,
    input: Res<DriveInput>,
    time: Res<Time>,
    clock: Res<BlendClock>,
) {
    let dt = clock.frame_dt(&time);
    let requested = sample_override(&input.0, blend.controller.config());
    blend.controller.on_tick(dt, requested, &mut timers.0);
}

/// Advance the timer queue by the frame delta and deliver due firings.
/// Firings for handles cancelled earlier in the batch are ignored by the controller.
pub fn advance_timers_system(
    mut blend: ResMut<TrackBlend>,
    mut timers: ResMut<BlendTimers>,
    time: Res<Time>,
    clock: Res<BlendClock>,
) {
    let dt = clock.frame_dt(&time);
    let due = timers.0.advance_secs(dt);
    for handle in due {
        blend.controller.on_timer(handle, &mut timers.0);
    }
}

/// Pull the current weight into the published parameter resource.
pub fn publish_weight_system(blend: Res<TrackBlend>, mut out: ResMut<IkOverlayAlpha>) {
    let param = blend.publisher.publish(&blend.controller);
    if out.0 != param {
        out.0 = param;
    }
}

pub fn forward_events_system(
    mut blend: ResMut<TrackBlend>,
    mut writer: EventWriter<TrackBlendEvent>,
) {
    for ev in blend.controller.drain_events() {
        writer.send(TrackBlendEvent(ev));
    }
}

/// Cancel any live ramp when the app is exiting.
pub fn shutdown_on_exit_system(
    mut exits: EventReader<AppExit>,
    blend: Option<ResMut<TrackBlend>>,
    mut timers: ResMut<BlendTimers>,
    mut out: ResMut<IkOverlayAlpha>,
) {
    if exits.read().next().is_none() {
        return;
    }
    if let Some(mut blend) = blend {
        let cancelled = blend.controller.shutdown(&mut timers.0);
        info!(?cancelled, "trackblend shut down on exit");
    }
    out.0.value = 1.0;
}
