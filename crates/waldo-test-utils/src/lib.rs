//! Shared test scaffolding for the Waldo workspace: a scriptable kinematic
//! simulator, a deterministic IK stub, and seeded RNG helpers.

pub mod ik;
pub mod rng;
pub mod sim;

pub use ik::PrismaticIk;
pub use rng::{deterministic_command, deterministic_vec, seeded_rng};
pub use sim::KinematicTestSim;
