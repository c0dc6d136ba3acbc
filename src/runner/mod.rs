//! Consumers of the planner and sensors: the virtual input hub and the two decision
//! layers that drive it.

pub mod brain;
pub mod follower;
pub mod input;

pub use brain::{BrainConfig, Decision, RunnerBrain};
pub use follower::PathFollower;
pub use input::VirtualInput;
