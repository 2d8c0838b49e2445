pub mod context;
pub mod error;
pub mod reconciler;
pub mod status;
pub mod validation;

pub use context::Context;
pub use error::{BackoffConfig, Error, Result};
pub use reconciler::{error_policy, reconcile};
pub use status::{derive_phase, ConditionBuilder, StatusManager};
pub use validation::{validate_spec, MAX_REPLICAS, MIN_REPLICAS};
