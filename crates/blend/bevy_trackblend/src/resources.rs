use bevy::prelude::*;
use trackblend_core::{
    AnimParameter, BlendController, BlendEvent, DriveSnapshot, TimerQueue, WeightPublisher,
};

/// The controller and its publisher. Removed by [`crate::detach`].
#[derive(Resource, Debug)]
pub struct TrackBlend {
    pub controller: BlendController,
    pub publisher: WeightPublisher,
}

impl TrackBlend {
    pub fn new(controller: BlendController) -> Self {
        let publisher = WeightPublisher::for_controller(&controller);
        Self {
            controller,
            publisher,
        }
    }
}

/// Timer host backing the ramps; advanced by the frame delta.
#[derive(Resource, Debug, Default)]
pub struct BlendTimers(pub TimerQueue);

/// Latest input readings. Gameplay/input systems write this before `Update`.
#[derive(Resource, Debug, Clone, Default)]
pub struct DriveInput(pub DriveSnapshot);

/// Published blend parameter, refreshed every frame for the animation side.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct IkOverlayAlpha(pub AnimParameter);

impl IkOverlayAlpha {
    #[inline]
    pub fn value(&self) -> f32 {
        self.0.value
    }
}

/// Optional fixed frame delta (seconds). When unset the `Time` delta is used.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct BlendClock {
    pub fixed_dt: Option<f32>,
}

impl BlendClock {
    pub fn fixed(dt: f32) -> Self {
        Self { fixed_dt: Some(dt) }
    }

    pub(crate) fn frame_dt(&self, time: &Time) -> f32 {
        self.fixed_dt.unwrap_or_else(|| time.delta_seconds())
    }
}

/// Controller events forwarded into the ECS.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct TrackBlendEvent(pub BlendEvent);
