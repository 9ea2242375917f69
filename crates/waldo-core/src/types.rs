use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// Flat f32 vector returned by the simulator after a physics step.
///
/// The control layer never inspects observation contents; it only threads
/// them back to the surrounding task loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    data: Vec<f32>,
}

impl Observation {
    pub const fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    pub const fn len(&self) -> usize {
        self.data.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

impl From<Vec<f32>> for Observation {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One structured control command per tick: sub-action argument name mapped
/// to a numeric vector.
///
/// Produced externally (policy or scripted controller) once per control tick
/// and read-only to the control layer. Absent arguments leave the bound
/// controller inert for that tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    args: HashMap<String, Vec<f32>>,
}

impl Command {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: attach a named argument vector.
    #[must_use]
    pub fn with_arg(mut self, name: impl Into<String>, values: Vec<f32>) -> Self {
        self.args.insert(name.into(), values);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, values: Vec<f32>) {
        self.args.insert(name.into(), values);
    }

    /// Argument vector for `name`, or `None` if the command omits it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.args.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Iterator over `(name, values)` pairs, unordered.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.args.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

// ---------------------------------------------------------------------------
// ActionSpace
// ---------------------------------------------------------------------------

/// Shape and bounds of valid action vectors. Follows Gymnasium conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionSpace {
    Box {
        low: Vec<f32>,
        high: Vec<f32>,
    },
    Dict {
        spaces: HashMap<String, Self>,
    },
}

impl ActionSpace {
    /// A box with the same `[low, high]` interval on every dimension.
    #[must_use]
    pub fn uniform(dim: usize, low: f32, high: f32) -> Self {
        Self::Box {
            low: vec![low; dim],
            high: vec![high; dim],
        }
    }

    /// A box symmetric around zero: `[-limit, limit]` per dimension.
    #[must_use]
    pub fn symmetric(dim: usize, limit: f32) -> Self {
        Self::uniform(dim, -limit, limit)
    }

    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Box { low, .. } => vec![low.len()],
            Self::Dict { .. } => vec![], // composite; query children
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Box { low, .. } => low.len(),
            Self::Dict { spaces } => spaces.values().map(Self::size).sum(),
        }
    }

    /// Whether `values` lies inside this space. Dict spaces are checked per
    /// sub-space against a [`Command`] via [`contains_command`](Self::contains_command).
    #[must_use]
    pub fn contains(&self, values: &[f32]) -> bool {
        match self {
            Self::Box { low, high } => {
                values.len() == low.len()
                    && values
                        .iter()
                        .zip(low.iter().zip(high.iter()))
                        .all(|(v, (l, h))| v >= l && v <= h)
            }
            Self::Dict { .. } => false, // flat vector cannot satisfy a Dict
        }
    }

    /// Whether every argument of `cmd` matches a sub-space of this Dict and
    /// lies within its bounds. Missing arguments are allowed (inert ticks).
    #[must_use]
    pub fn contains_command(&self, cmd: &Command) -> bool {
        match self {
            Self::Box { .. } => false,
            Self::Dict { spaces } => cmd
                .iter()
                .all(|(name, values)| spaces.get(name).is_some_and(|s| s.contains(values))),
        }
    }

    /// Sample a uniform random vector. Takes `&mut impl Rng` for determinism.
    ///
    /// # Panics
    ///
    /// Panics on Dict spaces; sample each sub-space individually.
    #[must_use]
    pub fn sample(&self, rng: &mut impl rand::Rng) -> Vec<f32> {
        match self {
            Self::Box { low, high } => low
                .iter()
                .zip(high.iter())
                .map(|(l, h)| rng.gen_range(*l..=*h))
                .collect(),
            Self::Dict { .. } => {
                panic!("sample() not supported for Dict spaces; sample each sub-space individually")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// StepKind
// ---------------------------------------------------------------------------

/// Opaque action-kind identifier passed to [`Simulator::step`](crate::sim::Simulator::step).
///
/// The simulator uses it to choose its internal stepping behavior (apply
/// actuation then integrate, vs. a pure synchronization step).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Pure no-op step used for synchronization.
    Empty,
    /// Episode-stop intent was raised this tick.
    Stop,
    /// Arm (and optionally grip) actuation.
    Arm,
    /// Base velocity integration.
    BaseVelocity,
    /// Humanoid skeletal pose write.
    HumanoidJoint,
}

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// Handle to a rigid object owned by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

// ---------------------------------------------------------------------------
// Contact / ContactBody
// ---------------------------------------------------------------------------

/// One side of a contact pair reported by the collision probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactBody {
    /// A link of the articulated agent.
    AgentLink(usize),
    /// A free rigid object.
    Object(ObjectId),
    /// The static scene (floor, walls, furniture).
    Scene,
}

/// A contact pair from the simulator's pre-commit collision pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub body_a: ContactBody,
    pub body_b: ContactBody,
}

impl Contact {
    #[must_use]
    pub const fn new(body_a: ContactBody, body_b: ContactBody) -> Self {
        Self { body_a, body_b }
    }

    /// Whether either side of the pair is an agent link.
    #[must_use]
    pub const fn involves_agent(&self) -> bool {
        matches!(self.body_a, ContactBody::AgentLink(_))
            || matches!(self.body_b, ContactBody::AgentLink(_))
    }

    /// The non-agent side of the pair, if exactly one side is an agent link.
    #[must_use]
    pub const fn other_body(&self) -> Option<ContactBody> {
        match (self.body_a, self.body_b) {
            (ContactBody::AgentLink(_), ContactBody::AgentLink(_)) => None,
            (ContactBody::AgentLink(_), other) | (other, ContactBody::AgentLink(_)) => Some(other),
            _ => None,
        }
    }
}

/// Whether `contacts` holds a collision that forbids committing a base
/// motion: any contact involving the agent, except contacts with the
/// currently grasped object (a held object always touches the gripper).
///
/// Agent-agent (self) contacts are disallowed too.
#[must_use]
pub fn disallowed_collision(contacts: &[Contact], grasped: Option<ObjectId>) -> bool {
    contacts.iter().any(|c| {
        if !c.involves_agent() {
            return false;
        }
        match c.other_body() {
            Some(ContactBody::Object(id)) => Some(id) != grasped,
            _ => true,
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
