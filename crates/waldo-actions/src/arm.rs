//! Joint-space arm controllers.
//!
//! Each controller interprets one compact command vector per tick and
//! writes new joint targets through the agent state surface. The variant is
//! selected by configuration once at construction
//! ([`build_arm_controller`](crate::composer::build_arm_controller)), never
//! per tick.

use waldo_core::config::ArmActionConfig;
use waldo_core::error::ConfigError;
use waldo_core::sim::Simulator;
use waldo_core::types::ActionSpace;

use crate::limits::{JointMask, clip_scale};

// ---------------------------------------------------------------------------
// ArmController
// ---------------------------------------------------------------------------

/// Common interface for joint-space arm controllers.
///
/// Commands outside the declared bounds are clipped, never rejected; the
/// simulator's hard stops remain the final authority on joint limits.
pub trait ArmController: Send + Sync {
    /// Clear per-episode controller memory. Most variants are stateless
    /// across ticks.
    fn reset(&mut self, sim: &mut dyn Simulator) {
        let _ = sim;
    }

    /// Bounds of the compact command vector.
    fn action_space(&self) -> ActionSpace;

    /// Apply one tick's command.
    fn step(&mut self, sim: &mut dyn Simulator, command: &[f32]);
}

fn delta_limits(config: &ArmActionConfig) -> Result<Vec<f32>, ConfigError> {
    if config.delta_pos_limit.is_empty() {
        return Err(ConfigError::MissingField("delta_pos_limit".into()));
    }
    if config.delta_pos_limit.len() != config.arm_joint_dimensionality {
        return Err(ConfigError::invalid(
            "delta_pos_limit",
            format!(
                "has {} entries, expected {}",
                config.delta_pos_limit.len(),
                config.arm_joint_dimensionality
            ),
        ));
    }
    Ok(config.delta_pos_limit.clone())
}

fn joint_mask(config: &ArmActionConfig) -> Result<JointMask, ConfigError> {
    let Some(mask) = &config.arm_joint_mask else {
        return Err(ConfigError::MissingField("arm_joint_mask".into()));
    };
    JointMask::new(mask.clone(), config.arm_joint_dimensionality)
}

// ---------------------------------------------------------------------------
// ArmRelPosController
// ---------------------------------------------------------------------------

/// Offsets the arm motor targets by the scaled delta command.
///
/// No clamping after the offset; the simulator enforces hard stops.
#[derive(Debug, Clone)]
pub struct ArmRelPosController {
    delta_pos_limit: Vec<f32>,
}

impl ArmRelPosController {
    pub fn new(config: &ArmActionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            delta_pos_limit: delta_limits(config)?,
        })
    }
}

impl ArmController for ArmRelPosController {
    fn action_space(&self) -> ActionSpace {
        ActionSpace::symmetric(self.delta_pos_limit.len(), 1.0)
    }

    fn step(&mut self, sim: &mut dyn Simulator, command: &[f32]) {
        let delta = clip_scale(command, &self.delta_pos_limit);
        let targets: Vec<f32> = sim
            .arm_motor_targets()
            .iter()
            .zip(delta.iter())
            .map(|(t, d)| t + d)
            .collect();
        sim.set_arm_motor_targets(&targets);
    }
}

// ---------------------------------------------------------------------------
// ArmRelPosMaskController
// ---------------------------------------------------------------------------

/// As [`ArmRelPosController`], with the command mask-expanded into the full
/// joint chain first; unmasked joints are left unchanged.
///
/// The summed targets are clamped to the static joint limits before the
/// write to keep the arm stable even though the simulator would prevent the
/// motors from exceeding them.
#[derive(Debug, Clone)]
pub struct ArmRelPosMaskController {
    delta_pos_limit: Vec<f32>,
    mask: JointMask,
}

impl ArmRelPosMaskController {
    pub fn new(config: &ArmActionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            delta_pos_limit: delta_limits(config)?,
            mask: joint_mask(config)?,
        })
    }
}

impl ArmController for ArmRelPosMaskController {
    fn action_space(&self) -> ActionSpace {
        ActionSpace::symmetric(self.mask.active_dim(), 1.0)
    }

    fn step(&mut self, sim: &mut dyn Simulator, command: &[f32]) {
        let delta = clip_scale(command, &self.delta_pos_limit);
        let expanded = self.mask.expand(&delta);

        let (min_limit, max_limit) = sim.arm_joint_limits();
        let targets: Vec<f32> = sim
            .arm_motor_targets()
            .iter()
            .zip(expanded.iter())
            .zip(min_limit.iter().zip(max_limit.iter()))
            .map(|((t, d), (lo, hi))| (t + d).clamp(*lo, *hi))
            .collect();
        sim.set_arm_motor_targets(&targets);
    }
}

// ---------------------------------------------------------------------------
// ArmRelPosKinematicController
// ---------------------------------------------------------------------------

/// Offsets the arm joint *positions* directly (kinematic write), pinning the
/// fixed joint values alongside so actuator dynamics cannot drift the pose.
#[derive(Debug, Clone)]
pub struct ArmRelPosKinematicController {
    delta_pos_limit: Vec<f32>,
    should_clip: bool,
}

impl ArmRelPosKinematicController {
    pub fn new(config: &ArmActionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            delta_pos_limit: delta_limits(config)?,
            should_clip: config.should_clip,
        })
    }
}

impl ArmController for ArmRelPosKinematicController {
    fn action_space(&self) -> ActionSpace {
        ActionSpace::uniform(self.delta_pos_limit.len(), 0.0, 1.0)
    }

    fn step(&mut self, sim: &mut dyn Simulator, command: &[f32]) {
        let delta: Vec<f32> = if self.should_clip {
            clip_scale(command, &self.delta_pos_limit)
        } else {
            command
                .iter()
                .zip(self.delta_pos_limit.iter())
                .map(|(c, l)| c * l)
                .collect()
        };
        let positions: Vec<f32> = sim
            .arm_joint_positions()
            .iter()
            .zip(delta.iter())
            .map(|(p, d)| p + d)
            .collect();
        sim.set_arm_joint_positions(&positions);
        sim.set_fixed_arm_joint_values(&positions);
    }
}

// ---------------------------------------------------------------------------
// ArmAbsPosController
// ---------------------------------------------------------------------------

/// Writes the command directly to the motor targets.
///
/// No clipping: the action IS the destination.
#[derive(Debug, Clone)]
pub struct ArmAbsPosController {
    dimensionality: usize,
}

impl ArmAbsPosController {
    pub fn new(config: &ArmActionConfig) -> Result<Self, ConfigError> {
        if config.arm_joint_dimensionality == 0 {
            return Err(ConfigError::invalid(
                "arm_joint_dimensionality",
                "must be at least 1",
            ));
        }
        Ok(Self {
            dimensionality: config.arm_joint_dimensionality,
        })
    }
}

impl ArmController for ArmAbsPosController {
    fn action_space(&self) -> ActionSpace {
        ActionSpace::uniform(self.dimensionality, 0.0, 1.0)
    }

    fn step(&mut self, sim: &mut dyn Simulator, command: &[f32]) {
        sim.set_arm_motor_targets(command);
    }
}

// ---------------------------------------------------------------------------
// ArmAbsPosKinematicController
// ---------------------------------------------------------------------------

/// Kinematically sets the arm joint positions to the command.
#[derive(Debug, Clone)]
pub struct ArmAbsPosKinematicController {
    dimensionality: usize,
}

impl ArmAbsPosKinematicController {
    pub fn new(config: &ArmActionConfig) -> Result<Self, ConfigError> {
        if config.arm_joint_dimensionality == 0 {
            return Err(ConfigError::invalid(
                "arm_joint_dimensionality",
                "must be at least 1",
            ));
        }
        Ok(Self {
            dimensionality: config.arm_joint_dimensionality,
        })
    }
}

impl ArmController for ArmAbsPosKinematicController {
    fn action_space(&self) -> ActionSpace {
        ActionSpace::uniform(self.dimensionality, 0.0, 1.0)
    }

    fn step(&mut self, sim: &mut dyn Simulator, command: &[f32]) {
        sim.set_arm_joint_positions(command);
    }
}

// ---------------------------------------------------------------------------
// ArmRelPosReducedController
// ---------------------------------------------------------------------------

/// Masked relative control for kinematically-coupled joint chains exposed
/// to the policy as a single continuous range (e.g. a telescoping lift
/// modeled as N stacked prismatic joints).
///
/// After mask expansion and delta application, motion that saturates a
/// joint rolls over to the next joint in the chain, walking joints
/// `0 → 1 → … → n-1` in the direction of motion. The cascade runs before
/// the final clamp and its order is deterministic.
#[derive(Debug, Clone)]
pub struct ArmRelPosReducedController {
    delta_pos_limit: Vec<f32>,
    mask: JointMask,
    should_clip: bool,
    last_arm_delta: Option<Vec<f32>>,
}

impl ArmRelPosReducedController {
    pub fn new(config: &ArmActionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            delta_pos_limit: delta_limits(config)?,
            mask: joint_mask(config)?,
            should_clip: config.should_clip,
            last_arm_delta: None,
        })
    }

    /// Expanded delta applied on the most recent tick, if any.
    #[must_use]
    pub fn last_arm_delta(&self) -> Option<&[f32]> {
        self.last_arm_delta.as_deref()
    }
}

impl ArmController for ArmRelPosReducedController {
    fn reset(&mut self, _sim: &mut dyn Simulator) {
        self.last_arm_delta = None;
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::symmetric(self.mask.active_dim(), 1.0)
    }

    fn step(&mut self, sim: &mut dyn Simulator, command: &[f32]) {
        let delta: Vec<f32> = if self.should_clip {
            clip_scale(command, &self.delta_pos_limit)
        } else {
            command
                .iter()
                .zip(self.delta_pos_limit.iter())
                .map(|(c, l)| c * l)
                .collect()
        };
        let expanded = self.mask.expand(&delta);

        let (min_limit, max_limit) = sim.arm_joint_limits();
        let mut targets: Vec<f32> = sim
            .arm_motor_targets()
            .iter()
            .zip(expanded.iter())
            .map(|(t, d)| t + d)
            .collect();

        // Carry saturated motion forward through the chain, in the
        // direction of the commanded lead-joint motion.
        let n = targets.len().min(max_limit.len());
        if expanded.first().copied().unwrap_or(0.0) >= 0.0 {
            for i in 0..n.saturating_sub(1) {
                if targets[i] > max_limit[i] {
                    targets[i + 1] += targets[i] - max_limit[i];
                    targets[i] = max_limit[i];
                }
            }
        } else {
            for i in 0..n.saturating_sub(1) {
                if targets[i] < min_limit[i] {
                    targets[i + 1] -= min_limit[i] - targets[i];
                    targets[i] = min_limit[i];
                }
            }
        }

        for ((t, lo), hi) in targets
            .iter_mut()
            .zip(min_limit.iter())
            .zip(max_limit.iter())
        {
            *t = t.clamp(*lo, *hi);
        }

        sim.set_arm_motor_targets(&targets);
        self.last_arm_delta = Some(expanded);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
