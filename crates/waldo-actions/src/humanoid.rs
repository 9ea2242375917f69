//! Humanoid skeletal pose controller.

use nalgebra::{Matrix4, Vector4};

use waldo_core::config::HumanoidJointConfig;
use waldo_core::error::ConfigError;
use waldo_core::sim::Simulator;
use waldo_core::types::{ActionSpace, Command, StepKind};

use crate::composer::TaskAction;

/// Entries encoding the 4x4 root transform at the tail of the command.
const TRANSFORM_DIM: usize = 16;

// ---------------------------------------------------------------------------
// HumanoidJointAction
// ---------------------------------------------------------------------------

/// Applies a full skeletal pose and root transform in one shot.
///
/// The command is one flat vector: the last sixteen entries are the root
/// transform as four column 4-vectors, the remainder are per-joint
/// rotations. No clipping and no limits; the input is assumed pre-validated
/// (replay or learned pose generator, not a freely-sampled policy action).
pub struct HumanoidJointAction {
    num_joints: usize,
    arg: String,
}

impl HumanoidJointAction {
    /// Argument name suffix this action reads from the per-tick command.
    pub const ARG: &'static str = "humanoid_joints_trans";

    pub fn new(config: &HumanoidJointConfig, arg_prefix: &str) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            num_joints: config.num_joints,
            arg: format!("{arg_prefix}{}", Self::ARG),
        })
    }

    const fn command_dim(&self) -> usize {
        4 * self.num_joints + TRANSFORM_DIM
    }
}

impl TaskAction for HumanoidJointAction {
    fn reset(&mut self, _sim: &mut dyn Simulator) {}

    fn action_space(&self) -> ActionSpace {
        let mut spaces = std::collections::HashMap::new();
        spaces.insert(self.arg.clone(), ActionSpace::symmetric(self.command_dim(), 1.0));
        ActionSpace::Dict { spaces }
    }

    fn step(&mut self, sim: &mut dyn Simulator, cmd: &Command) {
        let Some(joints_trans) = cmd.get(&self.arg) else {
            return;
        };
        if joints_trans.len() < TRANSFORM_DIM {
            return;
        }
        let split = joints_trans.len() - TRANSFORM_DIM;
        let new_joints = &joints_trans[..split];
        let new_transform = &joints_trans[split..];

        // An all-zero transform block is the coasting sentinel: retain the
        // previous pose and transform. The comparison is an exact sum, as
        // in the driving pose generators.
        if new_transform.iter().sum::<f32>() == 0.0 {
            return;
        }

        let columns: Vec<Vector4<f32>> = new_transform
            .chunks_exact(4)
            .map(Vector4::from_column_slice)
            .collect();
        let root = Matrix4::from_columns(&columns);
        sim.set_joint_transform(new_joints, &root);
    }

    fn step_kind(&self) -> StepKind {
        StepKind::HumanoidJoint
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
