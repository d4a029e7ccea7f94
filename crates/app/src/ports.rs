//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod dispatch;
pub mod executors;
pub mod storage;
pub mod variables;

pub use dispatch::ActionDispatch;
pub use executors::{
    GpioController, HttpClient, HttpRequest, LedController, PowerController, SshClient, SshOutput,
};
pub use storage::{RuleRepository, TemplateRepository};
pub use variables::VariableStore;
