//! Semantic events emitted by the controller.
//!
//! Events are buffered on the controller and drained by adapters for
//! diagnostics or transport; the controller never depends on them.

use serde::{Deserialize, Serialize};

use crate::controller::{BlendState, RampDirection};
use crate::scheduler::TimerHandle;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum BlendEvent {
    StateChanged {
        from: BlendState,
        to: BlendState,
        weight: f32,
    },
    TimerArmed {
        handle: TimerHandle,
        direction: RampDirection,
        interval_ms: u32,
    },
    TimerCancelled {
        handle: TimerHandle,
    },
    /// A ramp hit its boundary and its timer was retired.
    RampCompleted {
        direction: RampDirection,
    },
    /// A firing arrived for a handle the controller does not own.
    StaleFiringIgnored {
        handle: TimerHandle,
    },
}
