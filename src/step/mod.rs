//! The stage pipeline: declaration, resolution, and execution.

pub mod compose;
pub mod context;
pub mod dispatch;
pub mod handler;
pub mod pipeline;
pub mod stage;

pub use compose::{ensure_single_step, ResolvedSteps, StepDeclaration, StepsDefinition};
pub use context::{RequestHandle, RequestInfo, StepContext};
pub use dispatch::{MethodDispatcher, MethodDispatcherBuilder};
pub use handler::{step_fn, Step, StepFn, StepHandler, StepResult};
pub use pipeline::Pipeline;
pub use stage::Stage;
