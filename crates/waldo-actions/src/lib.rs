//! Articulated-agent action controllers and per-tick composition.
//!
//! Translates one structured, bounded command per control tick into
//! low-level actuation of a simulated agent body: joint-space arm control,
//! velocity-driven base motion with collision-gated rollback, IK-backed
//! end-effector control, humanoid pose writes, and grasp management. All
//! controllers talk to the simulator through the trait seam in
//! [`waldo_core::sim`] and never cache agent state across ticks beyond their
//! declared per-episode memory.
//!
//! # Tick pipeline
//!
//! ```text
//! Command ──► ActionComposer ──► TaskAction*  ──► Simulator::step(kind)
//!             (declaration       (arm, grip,      (exactly once per tick)
//!              order)             base, ...)
//! ```

pub mod arm;
pub mod base;
pub mod composer;
pub mod ee;
pub mod grip;
pub mod humanoid;
pub mod limits;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::arm::{
        ArmAbsPosController, ArmAbsPosKinematicController, ArmController, ArmRelPosController,
        ArmRelPosKinematicController, ArmRelPosMaskController, ArmRelPosReducedController,
    };
    pub use crate::base::BaseVelocityAction;
    pub use crate::composer::{
        ActionComposer, ActionRegistry, ArmAction, EmptyAction, StopAction, TaskAction,
        build_arm_controller, build_grip_controller,
    };
    pub use crate::ee::ArmEeAction;
    pub use crate::grip::{GripController, MagicGraspAction, SuctionGraspAction};
    pub use crate::humanoid::HumanoidJointAction;
    pub use crate::limits::{JointMask, clip_scale};
}
