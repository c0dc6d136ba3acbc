pub mod constants;
pub mod geometry;
pub mod landing;
pub mod physics;
pub mod search;
pub mod state;
pub mod terrain;
pub mod trajectory;

pub use physics::{RapierTerrain, SurfacePlacement, SurfaceShape};
pub use search::{AgentPose, Branch, HeadingFrame, PathSearchEngine, PlanOutcome, PlanStatus, SurfaceContact};
pub use state::{ControlInput, SearchState, Transition};
pub use terrain::{CountingTerrain, SurfaceId, SurfaceMask, TerrainHit, TerrainQuery};
pub use trajectory::{BallisticArc, TrajectorySimulator};
