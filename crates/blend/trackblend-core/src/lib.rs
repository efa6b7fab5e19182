//! Trackblend Core (engine-agnostic)
//!
//! Hands authority over an avatar's hand/IK pose between live tracker data and
//! locomotion animation. A per-tick sampler decides whether the user is driving
//! directional movement while full-body tracking is valid; a four-state
//! controller ramps a scalar blend weight toward the matching source on a
//! cancellable periodic timer; a publisher exposes the weight as a named
//! animation parameter. Adapters (Bevy, tests) provide the host seams.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod publisher;
pub mod sampler;
pub mod scheduler;
pub mod weight;

// Re-exports for consumers (adapters)
pub use config::{BlendConfig, SNAP_EPSILON};
pub use controller::{BlendController, BlendSnapshot, BlendState, RampDirection};
pub use error::BlendError;
pub use events::BlendEvent;
pub use lifecycle::{BlendHost, BlendSession, CallbackHost, SubscriptionId};
pub use publisher::{AnimParameter, WeightPublisher};
pub use sampler::{sample_override, sanitize_magnitude, DriveKey, DriveSnapshot, InputSource};
pub use scheduler::{Cadence, TimerHandle, TimerHost, TimerQueue, NOMINAL_FRAME_DT};
pub use weight::BlendWeight;
