// waldo-core: Types, traits, config, and errors for articulated-agent control.

pub mod config;
pub mod error;
pub mod sim;
pub mod types;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{
        ArmActionConfig, ArmControllerKind, BaseVelocityConfig, ControlConfig, EeActionConfig,
        GripControllerKind, HumanoidJointConfig,
    };
    pub use crate::error::{ConfigError, WaldoError};
    pub use crate::sim::{
        AgentParams, ArticulatedAgent, BaseType, IkSolver, NoopVisualizer, Simulator,
        TargetVisualizer, WorkspaceBox,
    };
    pub use crate::types::{
        ActionSpace, Command, Contact, ContactBody, ObjectId, Observation, StepKind,
        disallowed_collision,
    };
}
