//! Base velocity controller.
//!
//! Integrates a 2D `(linear, angular)` velocity command into the agent's
//! rigid base transform. Per tick the controller passes through one
//! implicit state sequence: idle, integrate, then commit or rollback.

use nalgebra::{Isometry3, Point3, Translation3, Vector3};
use tracing::debug;

use waldo_core::config::BaseVelocityConfig;
use waldo_core::error::ConfigError;
use waldo_core::sim::{BaseType, Simulator};
use waldo_core::types::{ActionSpace, Command, StepKind, disallowed_collision};

use crate::composer::TaskAction;

/// Declared bound on the raw velocity command entries; anything beyond
/// `[-1, 1]` is clipped before scaling anyway.
const COMMAND_LIMIT: f32 = 20.0;

// ---------------------------------------------------------------------------
// CapturedState
// ---------------------------------------------------------------------------

/// Pre-integration kinematic restore point.
///
/// Captured before the transform write and restored verbatim on rollback;
/// no partial update may remain observable afterwards.
#[derive(Debug, Clone)]
struct CapturedState {
    forces: Vec<f32>,
    velocities: Vec<f32>,
    positions: Vec<f32>,
    transform: Isometry3<f32>,
}

impl CapturedState {
    fn capture(sim: &dyn Simulator) -> Self {
        Self {
            forces: sim.joint_forces(),
            velocities: sim.joint_velocities(),
            positions: sim.joint_positions(),
            transform: sim.base_transform(),
        }
    }

    fn restore(&self, sim: &mut dyn Simulator) {
        sim.set_joint_forces(&self.forces);
        sim.set_joint_velocities(&self.velocities);
        sim.set_joint_positions(&self.positions);
        sim.set_base_transform(&self.transform);
    }
}

// ---------------------------------------------------------------------------
// BaseVelocityAction
// ---------------------------------------------------------------------------

/// Velocity-command base motion with navigation filtering and optional
/// collision-gated rollback.
///
/// All inputs are clamped; nothing in this controller can fail at runtime.
/// The only observable effect of an invalid or blocked command is a
/// same-as-before state.
pub struct BaseVelocityAction {
    lin_speed: f32,
    ang_speed: f32,
    allow_dyn_slide: bool,
    allow_back: bool,
    arg: String,
}

impl BaseVelocityAction {
    /// Argument name suffix this action reads from the per-tick command.
    pub const ARG: &'static str = "base_vel";

    pub fn new(config: &BaseVelocityConfig, arg_prefix: &str) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            lin_speed: config.lin_speed,
            ang_speed: config.ang_speed,
            allow_dyn_slide: config.allow_dyn_slide,
            allow_back: config.allow_back,
            arg: format!("{arg_prefix}{}", Self::ARG),
        })
    }

    fn update_base(&self, sim: &mut dyn Simulator, lin_vel: f32, ang_vel: f32) {
        let dt = 1.0 / sim.ctrl_freq();
        let before = CapturedState::capture(sim);

        let target = sim.integrate_velocity(
            dt,
            &before.transform,
            Vector3::new(lin_vel, 0.0, 0.0),
            Vector3::new(0.0, ang_vel, 0.0),
        );
        let end_pos = sim.filter_translation(
            Point3::from(before.transform.translation.vector),
            Point3::from(target.translation.vector),
        );
        let end_pos = end_pos - sim.params().base_offset;
        let target = Isometry3::from_parts(Translation3::from(end_pos.coords), target.rotation);
        sim.set_base_transform(&target);

        if !self.allow_dyn_slide {
            // Probe the new state without committing a visible step; revert
            // everything if the agent now collides with something it may not.
            sim.internal_step(-1);
            let contacts = sim.contacts();
            if disallowed_collision(&contacts, sim.grasped_object()) {
                debug!("base motion blocked by collision, rolling back");
                before.restore(sim);
            }
        }

        if sim.grasped_object().is_some() {
            sim.update_grasped_object();
        }

        if sim.base_type() == BaseType::Leg {
            let legs = sim.params().leg_init_params.clone();
            sim.set_leg_joint_positions(&legs);
        }
    }
}

impl TaskAction for BaseVelocityAction {
    fn reset(&mut self, _sim: &mut dyn Simulator) {}

    fn action_space(&self) -> ActionSpace {
        let mut spaces = std::collections::HashMap::new();
        spaces.insert(
            self.arg.clone(),
            ActionSpace::symmetric(2, COMMAND_LIMIT),
        );
        ActionSpace::Dict { spaces }
    }

    fn step(&mut self, sim: &mut dyn Simulator, cmd: &Command) {
        let Some(vel) = cmd.get(&self.arg) else {
            return;
        };
        let lin_vel = vel.first().copied().unwrap_or(0.0).clamp(-1.0, 1.0) * self.lin_speed;
        let ang_vel = vel.get(1).copied().unwrap_or(0.0).clamp(-1.0, 1.0) * self.ang_speed;
        let lin_vel = if self.allow_back {
            lin_vel
        } else {
            lin_vel.max(0.0)
        };

        // Zero-velocity ticks must be fully inert: no integration, no
        // collision probe, no writes.
        if lin_vel != 0.0 || ang_vel != 0.0 {
            self.update_base(sim, lin_vel, ang_vel);
        }
    }

    fn step_kind(&self) -> StepKind {
        StepKind::BaseVelocity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
