//! runnerpath: path search and reactive sensing for an autonomous course runner
//!
//! From the surface under the runner, the planner explores walking, jumping and dropping
//! branches against a [`planner::TerrainQuery`] and emits the first control input of the
//! best path. The sensors and runner layers provide a cheaper reactive alternative and
//! the glue that feeds either one into a movement controller.

pub mod config;
pub mod course;
pub mod error;
pub mod planner;
pub mod runner;
pub mod sensors;
