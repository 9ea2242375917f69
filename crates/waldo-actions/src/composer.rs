//! Per-tick action composition.
//!
//! A [`TaskAction`] is one named, policy-facing action bound to an agent.
//! The [`ActionComposer`] dispatches every bound action once per tick in
//! declaration order and then requests exactly one simulator step,
//! regardless of how many sub-actions were dispatched.

use std::collections::HashMap;

use tracing::debug;

use waldo_core::config::{ArmActionConfig, ArmControllerKind, GripControllerKind};
use waldo_core::error::ConfigError;
use waldo_core::sim::Simulator;
use waldo_core::types::{ActionSpace, Command, Observation, StepKind};

use crate::arm::{
    ArmAbsPosController, ArmAbsPosKinematicController, ArmController, ArmRelPosController,
    ArmRelPosKinematicController, ArmRelPosMaskController, ArmRelPosReducedController,
};
use crate::grip::{GripController, MagicGraspAction, SuctionGraspAction};

// ---------------------------------------------------------------------------
// TaskAction
// ---------------------------------------------------------------------------

/// One policy-facing action instance: a schema, a per-episode reset, and a
/// per-tick step.
pub trait TaskAction: Send + Sync {
    /// Clear per-episode controller memory.
    fn reset(&mut self, sim: &mut dyn Simulator);

    /// Schema of this action's named arguments.
    fn action_space(&self) -> ActionSpace;

    /// Apply one tick's command. Arguments absent from `cmd` leave the
    /// action inert.
    fn step(&mut self, sim: &mut dyn Simulator, cmd: &Command);

    /// Stepping behavior the simulator should use when this action is the
    /// tick's last action.
    fn step_kind(&self) -> StepKind;

    /// Whether this action has raised episode-termination intent.
    fn wants_terminate(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for dyn TaskAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskAction").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Controller factories
// ---------------------------------------------------------------------------

/// Resolve the configured joint-space controller variant. Called once at
/// agent construction; configuration problems are fatal here.
pub fn build_arm_controller(
    config: &ArmActionConfig,
) -> Result<Box<dyn ArmController>, ConfigError> {
    Ok(match config.controller {
        ArmControllerKind::RelPos => Box::new(ArmRelPosController::new(config)?),
        ArmControllerKind::RelPosMask => Box::new(ArmRelPosMaskController::new(config)?),
        ArmControllerKind::RelPosKinematic => Box::new(ArmRelPosKinematicController::new(config)?),
        ArmControllerKind::AbsPos => Box::new(ArmAbsPosController::new(config)?),
        ArmControllerKind::AbsPosKinematic => Box::new(ArmAbsPosKinematicController::new(config)?),
        ArmControllerKind::RelPosReduced => Box::new(ArmRelPosReducedController::new(config)?),
    })
}

/// Resolve the configured grip controller variant.
pub fn build_grip_controller(
    kind: GripControllerKind,
    config: &ArmActionConfig,
) -> Result<Box<dyn GripController>, ConfigError> {
    Ok(match kind {
        GripControllerKind::MagicGrasp => Box::new(MagicGraspAction::new(config)?),
        GripControllerKind::SuctionGrasp => Box::new(SuctionGraspAction::new(config)?),
    })
}

// ---------------------------------------------------------------------------
// ArmAction
// ---------------------------------------------------------------------------

/// Composite arm-plus-grip action.
///
/// The grip controller is dispatched after the arm controller so grasp
/// decisions see the post-motion arm state.
pub struct ArmAction {
    arm: Box<dyn ArmController>,
    grip: Option<Box<dyn GripController>>,
    disable_grip: bool,
    arm_arg: String,
    grip_arg: String,
}

impl ArmAction {
    /// Argument name suffixes read from the per-tick command.
    pub const ARM_ARG: &'static str = "arm_action";
    pub const GRIP_ARG: &'static str = "grip_action";

    pub fn new(config: &ArmActionConfig, arg_prefix: &str) -> Result<Self, ConfigError> {
        config.validate()?;
        let arm = build_arm_controller(config)?;
        let grip = config
            .grip_controller
            .map(|kind| build_grip_controller(kind, config))
            .transpose()?;
        Ok(Self {
            arm,
            grip,
            disable_grip: config.disable_grip,
            arm_arg: format!("{arg_prefix}{}", Self::ARM_ARG),
            grip_arg: format!("{arg_prefix}{}", Self::GRIP_ARG),
        })
    }

    /// Wrap pre-built controllers (tests, custom setups).
    pub fn from_parts(
        arm: Box<dyn ArmController>,
        grip: Option<Box<dyn GripController>>,
        arg_prefix: &str,
    ) -> Self {
        Self {
            arm,
            grip,
            disable_grip: false,
            arm_arg: format!("{arg_prefix}{}", Self::ARM_ARG),
            grip_arg: format!("{arg_prefix}{}", Self::GRIP_ARG),
        }
    }
}

impl TaskAction for ArmAction {
    fn reset(&mut self, sim: &mut dyn Simulator) {
        self.arm.reset(sim);
        if let Some(grip) = &mut self.grip {
            grip.reset(sim);
        }
    }

    fn action_space(&self) -> ActionSpace {
        let mut spaces = HashMap::new();
        spaces.insert(self.arm_arg.clone(), self.arm.action_space());
        if let Some(grip) = &self.grip {
            if grip.requires_action() {
                spaces.insert(self.grip_arg.clone(), grip.action_space());
            }
        }
        ActionSpace::Dict { spaces }
    }

    fn step(&mut self, sim: &mut dyn Simulator, cmd: &Command) {
        if let Some(arm_cmd) = cmd.get(&self.arm_arg) {
            self.arm.step(sim, arm_cmd);
        }
        if let Some(grip) = &mut self.grip {
            if !self.disable_grip {
                if let Some(grip_cmd) = cmd.get(&self.grip_arg) {
                    grip.step(sim, grip_cmd);
                }
            }
        }
    }

    fn step_kind(&self) -> StepKind {
        StepKind::Arm
    }
}

// ---------------------------------------------------------------------------
// StopAction
// ---------------------------------------------------------------------------

/// Raises episode-termination intent for the surrounding task loop.
///
/// The intent flag is only read by the task loop; when this action is the
/// tick's last action it still triggers the final simulator step.
pub struct StopAction {
    does_want_terminate: bool,
    arg: String,
}

impl StopAction {
    /// Argument name suffix this action reads from the per-tick command.
    pub const ARG: &'static str = "stop";

    #[must_use]
    pub fn new(arg_prefix: &str) -> Self {
        Self {
            does_want_terminate: false,
            arg: format!("{arg_prefix}{}", Self::ARG),
        }
    }
}

impl TaskAction for StopAction {
    fn reset(&mut self, _sim: &mut dyn Simulator) {
        self.does_want_terminate = false;
    }

    fn action_space(&self) -> ActionSpace {
        let mut spaces = HashMap::new();
        spaces.insert(self.arg.clone(), ActionSpace::symmetric(1, 1.0));
        ActionSpace::Dict { spaces }
    }

    fn step(&mut self, _sim: &mut dyn Simulator, cmd: &Command) {
        // An omitted argument counts as a stop request: binding this action
        // at all expresses the intent to stop unless told otherwise.
        let should_stop = cmd
            .get(&self.arg)
            .and_then(|v| v.first().copied())
            .unwrap_or(1.0);
        if should_stop > 0.0 {
            debug!("stop action requesting episode stop");
            self.does_want_terminate = true;
        }
    }

    fn step_kind(&self) -> StepKind {
        StepKind::Stop
    }

    fn wants_terminate(&self) -> bool {
        self.does_want_terminate
    }
}

// ---------------------------------------------------------------------------
// EmptyAction
// ---------------------------------------------------------------------------

/// A no-op action useful for testing and for controllers that need to wait
/// before the next operation.
pub struct EmptyAction {
    arg: String,
}

impl EmptyAction {
    /// Argument name suffix declared in the schema.
    pub const ARG: &'static str = "empty_action";

    #[must_use]
    pub fn new(arg_prefix: &str) -> Self {
        Self {
            arg: format!("{arg_prefix}{}", Self::ARG),
        }
    }
}

impl TaskAction for EmptyAction {
    fn reset(&mut self, _sim: &mut dyn Simulator) {}

    fn action_space(&self) -> ActionSpace {
        let mut spaces = HashMap::new();
        spaces.insert(self.arg.clone(), ActionSpace::symmetric(1, 1.0));
        ActionSpace::Dict { spaces }
    }

    fn step(&mut self, _sim: &mut dyn Simulator, _cmd: &Command) {}

    fn step_kind(&self) -> StepKind {
        StepKind::Empty
    }
}

// ---------------------------------------------------------------------------
// ActionComposer
// ---------------------------------------------------------------------------

/// Ordered set of named actions driven by one command per tick.
///
/// Dispatch follows declaration order. The action declared last carries the
/// tick's last-action flag: its [`StepKind`] is the one passed to the
/// simulator for the single physics step of the tick.
#[derive(Default)]
pub struct ActionComposer {
    entries: Vec<(String, Box<dyn TaskAction>)>,
}

impl std::fmt::Debug for ActionComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionComposer")
            .field(
                "entries",
                &self.entries.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ActionComposer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: bind a named action at the end of the dispatch order.
    #[must_use]
    pub fn with_action(mut self, name: impl Into<String>, action: Box<dyn TaskAction>) -> Self {
        self.entries.push((name.into(), action));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, action: Box<dyn TaskAction>) {
        self.entries.push((name.into(), action));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bound action names in dispatch order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Merged schema over every bound action.
    #[must_use]
    pub fn action_space(&self) -> ActionSpace {
        let mut merged = HashMap::new();
        for (name, action) in &self.entries {
            match action.action_space() {
                ActionSpace::Dict { spaces } => merged.extend(spaces),
                space @ ActionSpace::Box { .. } => {
                    merged.insert(name.clone(), space);
                }
            }
        }
        ActionSpace::Dict { spaces: merged }
    }

    /// Reset every bound action's per-episode memory.
    pub fn reset(&mut self, sim: &mut dyn Simulator) {
        for (_, action) in &mut self.entries {
            action.reset(sim);
        }
    }

    /// Dispatch one tick.
    ///
    /// Every bound action sees `cmd`; mutations are visible to actions
    /// dispatched later in the same tick. Exactly one simulator step is
    /// requested, using the last action's step kind (an empty composer
    /// issues a pure synchronization step).
    pub fn step(&mut self, sim: &mut dyn Simulator, cmd: &Command) -> Observation {
        for (_, action) in &mut self.entries {
            action.step(sim, cmd);
        }
        let kind = self
            .entries
            .last()
            .map_or(StepKind::Empty, |(_, action)| action.step_kind());
        sim.step(kind)
    }

    /// Whether any bound action has raised episode-termination intent.
    #[must_use]
    pub fn wants_terminate(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, action)| action.wants_terminate())
    }
}

// ---------------------------------------------------------------------------
// ActionRegistry
// ---------------------------------------------------------------------------

type ActionFactory = Box<dyn Fn() -> Result<Box<dyn TaskAction>, ConfigError> + Send + Sync>;

/// Explicit factory registry mapping action names to constructors.
///
/// Owned by the surrounding task setup and passed in where composers are
/// built; there is no global mutable registry. Factories capture their own
/// configuration and collaborators, so resolution happens once per agent
/// construction.
#[derive(Default)]
pub struct ActionRegistry {
    factories: HashMap<String, ActionFactory>,
}

impl ActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous binding.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn TaskAction>, ConfigError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build one action. Unknown names are configuration errors.
    pub fn build(&self, name: &str) -> Result<Box<dyn TaskAction>, ConfigError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownAction(name.to_string()))?;
        factory()
    }

    /// Build a composer binding `names` in the given dispatch order.
    pub fn compose(&self, names: &[&str]) -> Result<ActionComposer, ConfigError> {
        let mut composer = ActionComposer::new();
        for name in names {
            composer.push(*name, self.build(name)?);
        }
        Ok(composer)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
