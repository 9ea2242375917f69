//! End-effector position control through an external IK solver.

use nalgebra::{Point3, Vector3};

use waldo_core::config::EeActionConfig;
use waldo_core::error::ConfigError;
use waldo_core::sim::{IkSolver, Simulator, TargetVisualizer};
use waldo_core::types::{ActionSpace, Command, StepKind};

use crate::composer::TaskAction;
use crate::limits::clip_scale;

// ---------------------------------------------------------------------------
// ArmEeAction
// ---------------------------------------------------------------------------

/// Maintains a persistent end-effector target across ticks and servos the
/// arm toward it through inverse kinematics.
///
/// The target is re-seeded from forward kinematics at every episode reset,
/// then nudged by the scaled command each tick and clamped into the
/// workspace box of the active end-effector. Infeasible targets are not an
/// error; the solver's best-effort joint solution is written as-is.
pub struct ArmEeAction {
    ee_target: Option<Point3<f32>>,
    ee_index: usize,
    ctrl_lim: f32,
    ik: Box<dyn IkSolver>,
    visualizer: Option<Box<dyn TargetVisualizer>>,
    arg: String,
}

impl ArmEeAction {
    /// Argument name suffix this action reads from the per-tick command.
    pub const ARG: &'static str = "ee_action";

    pub fn new(
        config: &EeActionConfig,
        ik: Box<dyn IkSolver>,
        visualizer: Option<Box<dyn TargetVisualizer>>,
        arg_prefix: &str,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ee_target: None,
            ee_index: 0,
            ctrl_lim: config.ee_ctrl_lim,
            ik,
            visualizer: if config.render_ee_target {
                visualizer
            } else {
                None
            },
            arg: format!("{arg_prefix}{}", Self::ARG),
        })
    }

    /// Which end-effector's workspace constraint applies.
    pub const fn set_ee_index(&mut self, index: usize) {
        self.ee_index = index;
    }

    /// Current persistent target, if initialized.
    #[must_use]
    pub const fn ee_target(&self) -> Option<Point3<f32>> {
        self.ee_target
    }

    fn apply_ee_constraints(&mut self, sim: &dyn Simulator, target: Point3<f32>) -> Point3<f32> {
        match sim.params().ee_constraint.get(self.ee_index) {
            Some(workspace) => workspace.clamp(target),
            None => target,
        }
    }

    fn set_desired_ee_pos(&mut self, sim: &mut dyn Simulator, delta: Vector3<f32>) {
        // A missed reset seeds the target lazily from the current pose.
        let current = match self.ee_target {
            Some(target) => target,
            None => self.ik.calc_fk(&sim.arm_joint_positions()),
        };
        let target = self.apply_ee_constraints(sim, current + delta);
        self.ee_target = Some(target);

        let joint_pos = sim.arm_joint_positions();
        let joint_vel = vec![0.0; joint_pos.len()];
        self.ik.set_arm_state(&joint_pos, &joint_vel);
        let desired_joint_pos = self.ik.calc_ik(target);
        sim.set_arm_motor_targets(&desired_joint_pos);

        if let Some(viz) = &mut self.visualizer {
            let global = sim.base_transform() * target;
            viz.draw_target(global);
        }
    }
}

impl TaskAction for ArmEeAction {
    fn reset(&mut self, sim: &mut dyn Simulator) {
        let current = self.ik.calc_fk(&sim.arm_joint_positions());
        self.ee_target = Some(current);
    }

    fn action_space(&self) -> ActionSpace {
        let mut spaces = std::collections::HashMap::new();
        spaces.insert(self.arg.clone(), ActionSpace::symmetric(3, 1.0));
        ActionSpace::Dict { spaces }
    }

    fn step(&mut self, sim: &mut dyn Simulator, cmd: &Command) {
        let Some(ee_pos) = cmd.get(&self.arg) else {
            return;
        };
        let scaled = clip_scale(ee_pos, &[self.ctrl_lim; 3]);
        let delta = Vector3::new(
            scaled.first().copied().unwrap_or(0.0),
            scaled.get(1).copied().unwrap_or(0.0),
            scaled.get(2).copied().unwrap_or(0.0),
        );
        self.set_desired_ee_pos(sim, delta);
    }

    fn step_kind(&self) -> StepKind {
        StepKind::Arm
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
