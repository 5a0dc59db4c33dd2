//! App description handling
//!
//! - [`app`]: the `app.yaml` data structures and loading
//! - [`inputs`]: conversion into validated planner inputs

pub mod app;
pub mod inputs;

pub use app::AppConfig;
pub use inputs::PlannerInputs;
