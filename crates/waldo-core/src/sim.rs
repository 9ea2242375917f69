//! Simulator-agnostic interface contract for the action-control layer.
//!
//! Any physics backend implements [`Simulator`] (which subsumes the agent
//! state surface in [`ArticulatedAgent`]) and is passed to controllers as
//! `&mut dyn Simulator` for the duration of one control tick. Controllers
//! hold no reference across ticks.

use nalgebra::{Isometry3, Matrix4, Point3, Translation3, UnitQuaternion, Vector3};

use crate::types::{Contact, ObjectId, Observation, StepKind};

// ---------------------------------------------------------------------------
// BaseType
// ---------------------------------------------------------------------------

/// How the agent's base is modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    /// Wheeled or floating base; no leg posture to maintain.
    Mobile,
    /// Legged base; configured leg joint positions are reasserted every
    /// tick the base moves.
    Leg,
}

// ---------------------------------------------------------------------------
// WorkspaceBox
// ---------------------------------------------------------------------------

/// Static axis-aligned bounding region limiting an end-effector's
/// commandable target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkspaceBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl WorkspaceBox {
    #[must_use]
    pub const fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Clamp `point` component-wise into the box.
    #[must_use]
    pub fn clamp(&self, point: Point3<f32>) -> Point3<f32> {
        Point3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        )
    }
}

// ---------------------------------------------------------------------------
// AgentParams
// ---------------------------------------------------------------------------

/// Static per-agent parameters the controllers consult but never mutate.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentParams {
    /// Offset from the navigation-filtered ground position to the base
    /// origin.
    pub base_offset: Vector3<f32>,
    /// Leg joint positions reasserted every tick for [`BaseType::Leg`]
    /// agents.
    pub leg_init_params: Vec<f32>,
    /// Workspace constraint per end-effector, indexed by the active
    /// end-effector.
    pub ee_constraint: Vec<WorkspaceBox>,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            base_offset: Vector3::zeros(),
            leg_init_params: Vec::new(),
            ee_constraint: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ArticulatedAgent
// ---------------------------------------------------------------------------

/// Agent state surface: joint vectors, limits, motor targets, and the rigid
/// base transform. Owned by the simulator; the control layer reads and
/// writes through this trait within a single tick only.
pub trait ArticulatedAgent {
    /// Full-body joint positions.
    fn joint_positions(&self) -> Vec<f32>;
    fn set_joint_positions(&mut self, positions: &[f32]);

    /// Full-body joint velocities.
    fn joint_velocities(&self) -> Vec<f32>;
    fn set_joint_velocities(&mut self, velocities: &[f32]);

    /// Full-body joint forces.
    fn joint_forces(&self) -> Vec<f32>;
    fn set_joint_forces(&mut self, forces: &[f32]);

    /// Static `(min, max)` limit pairs for the arm joints.
    fn arm_joint_limits(&self) -> (Vec<f32>, Vec<f32>);

    /// Arm motor set-points the actuators servo toward.
    fn arm_motor_targets(&self) -> Vec<f32>;
    fn set_arm_motor_targets(&mut self, targets: &[f32]);

    /// Instantaneous arm joint positions.
    fn arm_joint_positions(&self) -> Vec<f32>;
    /// Kinematic write: set arm joint positions directly, bypassing
    /// actuator dynamics.
    fn set_arm_joint_positions(&mut self, positions: &[f32]);

    /// Pin the arm at fixed joint values so the physics step cannot drift
    /// a kinematically-written pose.
    fn set_fixed_arm_joint_values(&mut self, positions: &[f32]);

    /// Kinematic write of the leg joint positions.
    fn set_leg_joint_positions(&mut self, positions: &[f32]);

    /// Atomically apply skeletal joint rotations and a root transform.
    fn set_joint_transform(&mut self, joints: &[f32], root: &Matrix4<f32>);

    /// Rigid base transform (rotation + translation).
    fn base_transform(&self) -> Isometry3<f32>;
    fn set_base_transform(&mut self, transform: &Isometry3<f32>);

    fn base_type(&self) -> BaseType;

    fn params(&self) -> &AgentParams;
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Full simulator facade consumed by the control layer: the agent state
/// surface plus stepping, navigation filtering, collision probing, and the
/// grasp manager.
pub trait Simulator: ArticulatedAgent {
    /// Control frequency (Hz); one tick integrates `1 / ctrl_freq()`
    /// seconds.
    fn ctrl_freq(&self) -> f32;

    /// Project `transform` forward by `dt` under local-frame linear and
    /// angular velocities.
    ///
    /// The default implementation is explicit Euler: translation advances
    /// along the rotated linear velocity, rotation composes a scaled-axis
    /// increment about the local axes.
    fn integrate_velocity(
        &self,
        dt: f32,
        transform: &Isometry3<f32>,
        linear: Vector3<f32>,
        angular: Vector3<f32>,
    ) -> Isometry3<f32> {
        let rotation = transform.rotation;
        let translation = transform.translation.vector + rotation * linear * dt;
        let rotation = rotation * UnitQuaternion::from_scaled_axis(angular * dt);
        Isometry3::from_parts(Translation3::from(translation), rotation)
    }

    /// Constrain a translation from `start` to `end` against navigable
    /// surfaces. The default is unconstrained.
    fn filter_translation(&self, start: Point3<f32>, end: Point3<f32>) -> Point3<f32> {
        let _ = start;
        end
    }

    /// Advance one visible physics step of the given kind and return the
    /// resulting observation delta.
    fn step(&mut self, kind: StepKind) -> Observation;

    /// Advance the simulator's internal collision pass without committing a
    /// visible step. Negative `substeps` means "collision detection only".
    fn internal_step(&mut self, substeps: i32);

    /// Contacts from the most recent collision pass.
    fn contacts(&self) -> Vec<Contact>;

    // -- grasp manager --

    /// Object currently held by the active end-effector, if any.
    fn grasped_object(&self) -> Option<ObjectId>;

    /// Kinematically move the held object along with the agent.
    fn update_grasped_object(&mut self);

    /// Closest graspable object and its distance (m) to the end-effector.
    fn closest_graspable(&self) -> Option<(ObjectId, f32)>;

    /// Rigidly attach `object` to the end-effector.
    fn snap_to_object(&mut self, object: ObjectId);

    /// Release the held object.
    fn release_grasp(&mut self);

    /// Whether the end-effector has an active contact with `object`.
    fn contact_with(&self, object: ObjectId) -> bool;
}

// ---------------------------------------------------------------------------
// IkSolver
// ---------------------------------------------------------------------------

/// External inverse-kinematics collaborator.
///
/// Results are best-effort: an unreachable target yields the solver's
/// closest configuration, never an error.
pub trait IkSolver: Send + Sync {
    /// Seed the solver with the current arm state.
    fn set_arm_state(&mut self, positions: &[f32], velocities: &[f32]);

    /// Forward kinematics: end-effector position for the given joint
    /// positions.
    fn calc_fk(&mut self, positions: &[f32]) -> Point3<f32>;

    /// Inverse kinematics: joint positions placing the end-effector as
    /// close as possible to `target`.
    fn calc_ik(&mut self, target: Point3<f32>) -> Vec<f32>;
}

// ---------------------------------------------------------------------------
// TargetVisualizer
// ---------------------------------------------------------------------------

/// Debug-visualization capability for controller targets.
///
/// Selected by configuration; headless runs get [`NoopVisualizer`].
pub trait TargetVisualizer: Send + Sync {
    /// Mirror a world-space target position into the visualization.
    fn draw_target(&mut self, position: Point3<f32>);
}

/// Visualizer that discards every draw call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVisualizer;

impl TargetVisualizer for NoopVisualizer {
    fn draw_target(&mut self, _position: Point3<f32>) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Verify the traits are object-safe (used as `&mut dyn Simulator`).
    #[test]
    fn simulator_trait_is_object_safe() {
        fn _accepts_dyn(_: &mut dyn Simulator) {}
        fn _accepts_ik(_: Box<dyn IkSolver>) {}
        fn _accepts_viz(_: Box<dyn TargetVisualizer>) {}
    }

    #[test]
    fn workspace_box_clamps_componentwise() {
        let ws = WorkspaceBox::new(Point3::new(-1.0, 0.0, -1.0), Point3::new(1.0, 2.0, 1.0));
        let clamped = ws.clamp(Point3::new(5.0, -3.0, 0.5));
        assert_relative_eq!(clamped.x, 1.0);
        assert_relative_eq!(clamped.y, 0.0);
        assert_relative_eq!(clamped.z, 0.5);
    }

    #[test]
    fn workspace_box_inside_point_unchanged() {
        let ws = WorkspaceBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let p = Point3::new(0.3, 0.7, 0.9);
        assert_eq!(ws.clamp(p), p);
    }

    #[test]
    fn agent_params_default_empty() {
        let params = AgentParams::default();
        assert_eq!(params.base_offset, Vector3::zeros());
        assert!(params.leg_init_params.is_empty());
        assert!(params.ee_constraint.is_empty());
    }

    #[test]
    fn noop_visualizer_discards() {
        let mut viz = NoopVisualizer;
        viz.draw_target(Point3::new(1.0, 2.0, 3.0)); // no panic, no effect
    }

    // Default integrate_velocity is exercised through a minimal stand-in.
    struct FrozenSim;

    impl ArticulatedAgent for FrozenSim {
        fn joint_positions(&self) -> Vec<f32> {
            Vec::new()
        }
        fn set_joint_positions(&mut self, _: &[f32]) {}
        fn joint_velocities(&self) -> Vec<f32> {
            Vec::new()
        }
        fn set_joint_velocities(&mut self, _: &[f32]) {}
        fn joint_forces(&self) -> Vec<f32> {
            Vec::new()
        }
        fn set_joint_forces(&mut self, _: &[f32]) {}
        fn arm_joint_limits(&self) -> (Vec<f32>, Vec<f32>) {
            (Vec::new(), Vec::new())
        }
        fn arm_motor_targets(&self) -> Vec<f32> {
            Vec::new()
        }
        fn set_arm_motor_targets(&mut self, _: &[f32]) {}
        fn arm_joint_positions(&self) -> Vec<f32> {
            Vec::new()
        }
        fn set_arm_joint_positions(&mut self, _: &[f32]) {}
        fn set_fixed_arm_joint_values(&mut self, _: &[f32]) {}
        fn set_leg_joint_positions(&mut self, _: &[f32]) {}
        fn set_joint_transform(&mut self, _: &[f32], _: &Matrix4<f32>) {}
        fn base_transform(&self) -> Isometry3<f32> {
            Isometry3::identity()
        }
        fn set_base_transform(&mut self, _: &Isometry3<f32>) {}
        fn base_type(&self) -> BaseType {
            BaseType::Mobile
        }
        fn params(&self) -> &AgentParams {
            static PARAMS: std::sync::OnceLock<AgentParams> = std::sync::OnceLock::new();
            PARAMS.get_or_init(AgentParams::default)
        }
    }

    impl Simulator for FrozenSim {
        fn ctrl_freq(&self) -> f32 {
            30.0
        }
        fn step(&mut self, _: StepKind) -> Observation {
            Observation::zeros(0)
        }
        fn internal_step(&mut self, _: i32) {}
        fn contacts(&self) -> Vec<Contact> {
            Vec::new()
        }
        fn grasped_object(&self) -> Option<ObjectId> {
            None
        }
        fn update_grasped_object(&mut self) {}
        fn closest_graspable(&self) -> Option<(ObjectId, f32)> {
            None
        }
        fn snap_to_object(&mut self, _: ObjectId) {}
        fn release_grasp(&mut self) {}
        fn contact_with(&self, _: ObjectId) -> bool {
            false
        }
    }

    #[test]
    fn integrate_velocity_pure_translation() {
        let sim = FrozenSim;
        let start = Isometry3::identity();
        let end = sim.integrate_velocity(0.5, &start, Vector3::new(2.0, 0.0, 0.0), Vector3::zeros());
        assert_relative_eq!(end.translation.vector.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(end.translation.vector.y, 0.0, epsilon = 1e-6);
        assert_eq!(end.rotation, start.rotation);
    }

    #[test]
    fn integrate_velocity_translates_in_local_frame() {
        let sim = FrozenSim;
        // Base yawed 90 degrees about +Y: local +X becomes world -Z.
        let start = Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_scaled_axis(Vector3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0)),
        );
        let end = sim.integrate_velocity(1.0, &start, Vector3::new(1.0, 0.0, 0.0), Vector3::zeros());
        assert_relative_eq!(end.translation.vector.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(end.translation.vector.z, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn integrate_velocity_pure_rotation() {
        let sim = FrozenSim;
        let start = Isometry3::identity();
        let end = sim.integrate_velocity(
            1.0,
            &start,
            Vector3::zeros(),
            Vector3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0),
        );
        assert_relative_eq!(end.translation.vector.norm(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(end.rotation.angle(), std::f32::consts::FRAC_PI_2, epsilon = 1e-5);
    }

    #[test]
    fn integrate_velocity_zero_dt_is_identity() {
        let sim = FrozenSim;
        let start = Isometry3::from_parts(
            Translation3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_scaled_axis(Vector3::new(0.1, 0.2, 0.3)),
        );
        let end = sim.integrate_velocity(
            0.0,
            &start,
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(1.0, 1.0, 1.0),
        );
        assert_relative_eq!(
            (end.translation.vector - start.translation.vector).norm(),
            0.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn filter_translation_default_is_unconstrained() {
        let sim = FrozenSim;
        let end = Point3::new(3.0, 0.0, 4.0);
        assert_eq!(sim.filter_translation(Point3::origin(), end), end);
    }
}
