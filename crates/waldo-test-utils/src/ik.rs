//! Deterministic IK stub for controller tests.

use nalgebra::Point3;

use waldo_core::sim::IkSolver;

// ---------------------------------------------------------------------------
// PrismaticIk
// ---------------------------------------------------------------------------

/// Toy solver modeling the first three joints as prismatic x/y/z offsets.
///
/// Forward kinematics reads the end-effector position straight off joints
/// 0-2; inverse kinematics writes the target back onto them, carrying any
/// remaining joints over from the last seeded arm state. Every solve is
/// exact, which makes round-trip assertions trivial.
pub struct PrismaticIk {
    dof: usize,
    positions: Vec<f32>,
}

impl PrismaticIk {
    #[must_use]
    pub fn new(dof: usize) -> Self {
        Self {
            dof,
            positions: vec![0.0; dof],
        }
    }
}

impl IkSolver for PrismaticIk {
    fn set_arm_state(&mut self, positions: &[f32], _velocities: &[f32]) {
        self.positions = positions.to_vec();
        self.positions.resize(self.dof, 0.0);
    }

    fn calc_fk(&mut self, positions: &[f32]) -> Point3<f32> {
        Point3::new(
            positions.first().copied().unwrap_or(0.0),
            positions.get(1).copied().unwrap_or(0.0),
            positions.get(2).copied().unwrap_or(0.0),
        )
    }

    fn calc_ik(&mut self, target: Point3<f32>) -> Vec<f32> {
        let mut solution = self.positions.clone();
        solution.resize(self.dof, 0.0);
        if let Some(j) = solution.first_mut() {
            *j = target.x;
        }
        if let Some(j) = solution.get_mut(1) {
            *j = target.y;
        }
        if let Some(j) = solution.get_mut(2) {
            *j = target.z;
        }
        solution
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
