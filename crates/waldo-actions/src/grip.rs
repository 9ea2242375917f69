//! Grip controllers dispatched after arm motion within the composite arm
//! action.

use tracing::debug;

use waldo_core::config::ArmActionConfig;
use waldo_core::error::ConfigError;
use waldo_core::sim::Simulator;
use waldo_core::types::ActionSpace;

// ---------------------------------------------------------------------------
// GripController
// ---------------------------------------------------------------------------

/// Common interface for grip controllers.
pub trait GripController: Send + Sync {
    /// Whether the controller consumes a command vector. Passive grippers
    /// (e.g. always-on suction during replay) can opt out of the schema.
    fn requires_action(&self) -> bool {
        true
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::symmetric(1, 1.0)
    }

    fn reset(&mut self, sim: &mut dyn Simulator) {
        let _ = sim;
    }

    /// Apply one tick's grip command.
    fn step(&mut self, sim: &mut dyn Simulator, command: &[f32]);
}

// ---------------------------------------------------------------------------
// MagicGraspAction
// ---------------------------------------------------------------------------

/// Snap-based grasping without contact simulation.
///
/// A positive command grasps the closest graspable object within the
/// configured distance threshold; a negative command releases. Anything
/// else, or a snap candidate out of reach, leaves the gripper unchanged.
pub struct MagicGraspAction {
    grasp_thresh_dist: f32,
}

impl MagicGraspAction {
    pub fn new(config: &ArmActionConfig) -> Result<Self, ConfigError> {
        if config.grasp_thresh_dist <= 0.0 {
            return Err(ConfigError::invalid(
                "grasp_thresh_dist",
                "must be positive",
            ));
        }
        Ok(Self {
            grasp_thresh_dist: config.grasp_thresh_dist,
        })
    }
}

impl GripController for MagicGraspAction {
    fn step(&mut self, sim: &mut dyn Simulator, command: &[f32]) {
        let grip = command.first().copied().unwrap_or(0.0);
        if grip > 0.0 && sim.grasped_object().is_none() {
            if let Some((object, dist)) = sim.closest_graspable() {
                if dist < self.grasp_thresh_dist {
                    debug!(?object, dist, "magic grasp snapping object");
                    sim.snap_to_object(object);
                }
            }
        } else if grip < 0.0 && sim.grasped_object().is_some() {
            sim.release_grasp();
        }
    }
}

// ---------------------------------------------------------------------------
// SuctionGraspAction
// ---------------------------------------------------------------------------

/// As [`MagicGraspAction`], but snapping additionally requires an active
/// contact between the end-effector and the candidate object.
pub struct SuctionGraspAction {
    grasp_thresh_dist: f32,
}

impl SuctionGraspAction {
    pub fn new(config: &ArmActionConfig) -> Result<Self, ConfigError> {
        if config.grasp_thresh_dist <= 0.0 {
            return Err(ConfigError::invalid(
                "grasp_thresh_dist",
                "must be positive",
            ));
        }
        Ok(Self {
            grasp_thresh_dist: config.grasp_thresh_dist,
        })
    }
}

impl GripController for SuctionGraspAction {
    fn step(&mut self, sim: &mut dyn Simulator, command: &[f32]) {
        let grip = command.first().copied().unwrap_or(0.0);
        if grip > 0.0 && sim.grasped_object().is_none() {
            if let Some((object, dist)) = sim.closest_graspable() {
                if dist < self.grasp_thresh_dist && sim.contact_with(object) {
                    debug!(?object, dist, "suction grasp attaching object");
                    sim.snap_to_object(object);
                }
            }
        } else if grip < 0.0 && sim.grasped_object().is_some() {
            sim.release_grasp();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use waldo_core::config::ArmControllerKind;
    use waldo_core::types::ObjectId;
    use waldo_test_utils::KinematicTestSim;

    fn config(thresh: f32) -> ArmActionConfig {
        ArmActionConfig {
            controller: ArmControllerKind::RelPos,
            grip_controller: None,
            disable_grip: false,
            arm_joint_dimensionality: 1,
            delta_pos_limit: vec![0.1],
            arm_joint_mask: None,
            should_clip: true,
            grasp_thresh_dist: thresh,
        }
    }

    // -- MagicGraspAction --

    #[test]
    fn magic_grasp_snaps_within_threshold() {
        let mut sim = KinematicTestSim::new(1).with_graspable(ObjectId(4), 0.1);
        let mut grip = MagicGraspAction::new(&config(0.15)).unwrap();
        grip.step(&mut sim, &[1.0]);
        assert_eq!(sim.grasped_object(), Some(ObjectId(4)));
    }

    #[test]
    fn magic_grasp_ignores_object_out_of_reach() {
        let mut sim = KinematicTestSim::new(1).with_graspable(ObjectId(4), 0.5);
        let mut grip = MagicGraspAction::new(&config(0.15)).unwrap();
        grip.step(&mut sim, &[1.0]);
        assert_eq!(sim.grasped_object(), None);
    }

    #[test]
    fn magic_grasp_negative_command_releases() {
        let mut sim = KinematicTestSim::new(1);
        sim.grasp(ObjectId(2));
        let mut grip = MagicGraspAction::new(&config(0.15)).unwrap();
        grip.step(&mut sim, &[-1.0]);
        assert_eq!(sim.grasped_object(), None);
    }

    #[test]
    fn magic_grasp_zero_command_is_inert() {
        let mut sim = KinematicTestSim::new(1).with_graspable(ObjectId(4), 0.05);
        let mut grip = MagicGraspAction::new(&config(0.15)).unwrap();
        grip.step(&mut sim, &[0.0]);
        assert_eq!(sim.grasped_object(), None);
    }

    #[test]
    fn magic_grasp_does_not_regrasp_while_holding() {
        let mut sim = KinematicTestSim::new(1).with_graspable(ObjectId(4), 0.05);
        sim.grasp(ObjectId(9));
        let mut grip = MagicGraspAction::new(&config(0.15)).unwrap();
        grip.step(&mut sim, &[1.0]);
        assert_eq!(sim.grasped_object(), Some(ObjectId(9)));
    }

    #[test]
    fn magic_grasp_rejects_bad_threshold() {
        assert!(MagicGraspAction::new(&config(0.0)).is_err());
    }

    // -- SuctionGraspAction --

    #[test]
    fn suction_requires_contact() {
        let mut sim = KinematicTestSim::new(1).with_graspable(ObjectId(4), 0.05);
        let mut grip = SuctionGraspAction::new(&config(0.15)).unwrap();
        grip.step(&mut sim, &[1.0]);
        assert_eq!(sim.grasped_object(), None);

        sim.set_contact_with(ObjectId(4), true);
        grip.step(&mut sim, &[1.0]);
        assert_eq!(sim.grasped_object(), Some(ObjectId(4)));
    }

    #[test]
    fn suction_releases_on_negative_command() {
        let mut sim = KinematicTestSim::new(1);
        sim.grasp(ObjectId(2));
        let mut grip = SuctionGraspAction::new(&config(0.15)).unwrap();
        grip.step(&mut sim, &[-0.5]);
        assert_eq!(sim.grasped_object(), None);
    }

    // -- defaults --

    #[test]
    fn grip_controllers_require_action_by_default() {
        let grip = MagicGraspAction::new(&config(0.15)).unwrap();
        assert!(grip.requires_action());
        assert_eq!(grip.action_space().size(), 1);
    }
}
