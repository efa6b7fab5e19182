//! Weight publisher: read-only view of the blend weight as a named animation
//! parameter, pulled by the host's animation evaluation.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::controller::BlendController;

/// One named scalar handed to the animation evaluator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimParameter {
    pub name: String,
    pub value: f32,
}

#[derive(Clone, Debug)]
pub struct WeightPublisher {
    name: String,
}

impl WeightPublisher {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn for_controller(controller: &BlendController) -> Self {
        Self::new(controller.config().parameter_name.clone())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn publish(&self, controller: &BlendController) -> AnimParameter {
        AnimParameter {
            name: self.name.clone(),
            value: controller.weight().get(),
        }
    }

    /// Parameter map in the shape an animation-state handler returns.
    pub fn publish_map(&self, controller: &BlendController) -> HashMap<String, f32> {
        let mut out = HashMap::with_capacity(1);
        out.insert(self.name.clone(), controller.weight().get());
        out
    }
}
