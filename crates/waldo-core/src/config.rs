use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}
const fn default_lin_speed() -> f32 {
    10.0
}
const fn default_ang_speed() -> f32 {
    10.0
}
const fn default_ee_ctrl_lim() -> f32 {
    0.015
}
const fn default_grasp_thresh_dist() -> f32 {
    0.15
}
const fn default_num_joints() -> usize {
    54
}

// ---------------------------------------------------------------------------
// Controller kind tags
// ---------------------------------------------------------------------------

/// Which joint-space controller variant drives the arm.
///
/// Resolved to a concrete controller once at agent construction, never per
/// tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmControllerKind {
    /// Delta commands offset the arm motor targets.
    RelPos,
    /// As `RelPos`, with a sparse joint mask and limit clamping.
    RelPosMask,
    /// Delta commands write joint positions directly (kinematic), pinning
    /// motor targets alongside.
    RelPosKinematic,
    /// Commands are absolute motor targets.
    AbsPos,
    /// Commands are absolute joint positions (kinematic).
    AbsPosKinematic,
    /// Masked relative control with limit rollover across a coupled joint
    /// chain.
    RelPosReduced,
}

/// Which grip controller accompanies the arm, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GripControllerKind {
    /// Snap the closest graspable object within a distance threshold.
    MagicGrasp,
    /// As `MagicGrasp`, but snapping requires an active contact.
    SuctionGrasp,
}

// ---------------------------------------------------------------------------
// ArmActionConfig
// ---------------------------------------------------------------------------

/// Configuration for the composite arm action (joint-space controller plus
/// optional grip controller).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmActionConfig {
    /// Joint-space controller variant.
    pub controller: ArmControllerKind,

    /// Grip controller variant, or `None` for an arm-only action.
    #[serde(default)]
    pub grip_controller: Option<GripControllerKind>,

    /// Keep the grip controller constructed but never dispatch to it.
    #[serde(default)]
    pub disable_grip: bool,

    /// Dimensionality of the arm command vector.
    pub arm_joint_dimensionality: usize,

    /// Per-dimension magnitude limit (rad) scaling the clipped command.
    /// Required by the relative controller variants.
    #[serde(default)]
    pub delta_pos_limit: Vec<f32>,

    /// Sparse activity mask over the full joint chain; `0` marks a joint the
    /// command does not control. Required by the masked variants.
    #[serde(default)]
    pub arm_joint_mask: Option<Vec<u8>>,

    /// Whether kinematic variants clip the raw command to `[-1, 1]` before
    /// scaling.
    #[serde(default = "default_true")]
    pub should_clip: bool,

    /// Maximum snap distance (m) for the magic grasp controller.
    #[serde(default = "default_grasp_thresh_dist")]
    pub grasp_thresh_dist: f32,
}

impl ArmActionConfig {
    /// Validate. Mask/limit mismatches are fatal configuration errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arm_joint_dimensionality == 0 {
            return Err(ConfigError::invalid(
                "arm_joint_dimensionality",
                "must be at least 1",
            ));
        }

        let needs_delta_limit = matches!(
            self.controller,
            ArmControllerKind::RelPos
                | ArmControllerKind::RelPosMask
                | ArmControllerKind::RelPosKinematic
                | ArmControllerKind::RelPosReduced
        );
        if needs_delta_limit {
            if self.delta_pos_limit.is_empty() {
                return Err(ConfigError::MissingField("delta_pos_limit".into()));
            }
            if self.delta_pos_limit.len() != self.arm_joint_dimensionality {
                return Err(ConfigError::invalid(
                    "delta_pos_limit",
                    format!(
                        "has {} entries, expected {}",
                        self.delta_pos_limit.len(),
                        self.arm_joint_dimensionality
                    ),
                ));
            }
            if self.delta_pos_limit.iter().any(|l| *l <= 0.0) {
                return Err(ConfigError::invalid(
                    "delta_pos_limit",
                    "entries must be positive",
                ));
            }
        }

        let needs_mask = matches!(
            self.controller,
            ArmControllerKind::RelPosMask | ArmControllerKind::RelPosReduced
        );
        if needs_mask {
            let Some(mask) = &self.arm_joint_mask else {
                return Err(ConfigError::MissingField("arm_joint_mask".into()));
            };
            let active = mask.iter().filter(|m| **m != 0).count();
            if active != self.arm_joint_dimensionality {
                return Err(ConfigError::MaskLengthMismatch {
                    active,
                    expected: self.arm_joint_dimensionality,
                });
            }
        }

        if self.grasp_thresh_dist <= 0.0 {
            return Err(ConfigError::invalid(
                "grasp_thresh_dist",
                "must be positive",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BaseVelocityConfig
// ---------------------------------------------------------------------------

/// Configuration for the base velocity controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseVelocityConfig {
    /// Maximum linear speed (m/s) at a saturated command.
    #[serde(default = "default_lin_speed")]
    pub lin_speed: f32,

    /// Maximum angular speed (rad/s) at a saturated command.
    #[serde(default = "default_ang_speed")]
    pub ang_speed: f32,

    /// Allow sliding along obstacles; when `false`, any disallowed collision
    /// after integration rolls the base back to the pre-tick transform.
    #[serde(default = "default_true")]
    pub allow_dyn_slide: bool,

    /// Allow reverse linear motion; when `false`, linear speed is floored at
    /// zero.
    #[serde(default = "default_true")]
    pub allow_back: bool,
}

impl Default for BaseVelocityConfig {
    fn default() -> Self {
        Self {
            lin_speed: default_lin_speed(),
            ang_speed: default_ang_speed(),
            allow_dyn_slide: true,
            allow_back: true,
        }
    }
}

impl BaseVelocityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lin_speed <= 0.0 {
            return Err(ConfigError::invalid("lin_speed", "must be positive"));
        }
        if self.ang_speed <= 0.0 {
            return Err(ConfigError::invalid("ang_speed", "must be positive"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EeActionConfig
// ---------------------------------------------------------------------------

/// Configuration for the end-effector IK controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EeActionConfig {
    /// Per-tick reach limit (m) scaling the clipped 3D command.
    #[serde(default = "default_ee_ctrl_lim")]
    pub ee_ctrl_lim: f32,

    /// Mirror the resolved target into the visualization capability.
    #[serde(default)]
    pub render_ee_target: bool,
}

impl Default for EeActionConfig {
    fn default() -> Self {
        Self {
            ee_ctrl_lim: default_ee_ctrl_lim(),
            render_ee_target: false,
        }
    }
}

impl EeActionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ee_ctrl_lim <= 0.0 {
            return Err(ConfigError::invalid("ee_ctrl_lim", "must be positive"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HumanoidJointConfig
// ---------------------------------------------------------------------------

/// Configuration for the humanoid pose controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanoidJointConfig {
    /// Number of skeletal joints; the command carries four rotation entries
    /// per joint plus sixteen root-transform entries.
    #[serde(default = "default_num_joints")]
    pub num_joints: usize,
}

impl Default for HumanoidJointConfig {
    fn default() -> Self {
        Self {
            num_joints: default_num_joints(),
        }
    }
}

impl HumanoidJointConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_joints == 0 {
            return Err(ConfigError::invalid("num_joints", "must be at least 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ControlConfig
// ---------------------------------------------------------------------------

/// Top-level per-agent control configuration, loadable from TOML.
///
/// Each present section configures one action the task setup binds into the
/// composer; absent sections simply leave that action unbound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default)]
    pub arm: Option<ArmActionConfig>,
    #[serde(default)]
    pub base_velocity: Option<BaseVelocityConfig>,
    #[serde(default)]
    pub ee: Option<EeActionConfig>,
    #[serde(default)]
    pub humanoid: Option<HumanoidJointConfig>,
}

impl ControlConfig {
    /// Validate every present section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(arm) = &self.arm {
            arm.validate()?;
        }
        if let Some(base) = &self.base_velocity {
            base.validate()?;
        }
        if let Some(ee) = &self.ee {
            ee.validate()?;
        }
        if let Some(humanoid) = &self.humanoid {
            humanoid.validate()?;
        }
        Ok(())
    }

    /// Load from a TOML file and validate.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
