//! Planner tuning and kinematic defaults.
//! Config structs take their serde defaults from here so TOML files and code agree.

/// Kinematic model of the runner (CMF-style movement controller)
pub mod kinematics {
    /// Gravity in units/s²
    pub const DEFAULT_GRAVITY: f32 = 30.0;

    /// Horizontal run speed in units/second
    pub const DEFAULT_MOVEMENT_SPEED: f32 = 7.0;

    /// Vertical launch speed of a jump in units/second
    pub const DEFAULT_JUMP_SPEED: f32 = 10.0;
}

/// Search engine defaults
pub mod search {
    /// Fraction of the way the heading is pulled toward forward, per unit of depth
    pub const ALIGNMENT_RATE: f32 = 0.1;

    /// Length of one walking step
    pub const STEP_SIZE: f32 = 1.0;

    /// Forward distance at which a branch is accepted outright
    pub const MAX_LOOKAHEAD_DISTANCE: f32 = 12.0;

    /// Extra seed headings on each side of straight ahead
    pub const EXTRA_PATHS: u32 = 4;

    /// Upper bound on `extra_paths`
    pub const MAX_EXTRA_PATHS: u32 = 90;

    /// Angle between neighbouring seed headings (degrees)
    pub const EXTRA_PATHS_STEP_ANGLE: f32 = 10.0;

    /// Seeds turned further than this are not explored (degrees)
    pub const MAX_VALID_START_ANGLE: f32 = 90.0;

    /// Offset along the surface normal when a state is placed on a surface
    pub const HOVER_DISTANCE: f32 = 0.1;

    /// Radius of the sphere used to find the surface under the agent
    pub const GROUND_PROBE_RADIUS: f32 = 0.075;

    /// How far below the agent ground is looked for before giving up
    pub const GROUNDING_DISTANCE: f32 = 1.0;

    /// Length of the downward probe in front of a walking state
    pub const GROUND_PROBE_DISTANCE: f32 = 1.0;

    /// Height of the forward slope probe above the current position
    pub const SLOPE_PROBE_HEIGHT: f32 = 0.25;

    /// Rise per unit of run that still counts as walkable
    pub const MAX_SLOPE_GRADE: f32 = 1.0;

    /// Height of the second ground probe used to catch hill crests
    pub const CREST_PROBE_HEIGHT: f32 = 0.5;

    /// Minimum dot(normal, up) of a surface that can be stood on
    pub const LANDABLE_NORMAL_DOT: f32 = 0.6;

    /// Horizontal gap below which two surfaces count as one step
    pub const STEPPABLE_DISTANCE: f32 = 0.1;

    /// Vertical offset below which two surfaces count as one step
    pub const MAX_STEP_HEIGHT: f32 = 0.5;

    /// Quality multiplier applied on every jump
    pub const JUMP_QUALITY_PENALTY: f32 = 0.9;

    /// Hysteresis band for replacing the best-known state
    pub const MIN_IMPROVEMENT_INCREMENT: f32 = 0.05;

    /// Hang-prevention cap on popped states
    pub const MAX_ITERATIONS: u32 = 10_000;

    /// Initial capacity of the search stack
    pub const STACK_CAPACITY: usize = 32;
}

/// Trajectory simulation defaults
pub mod trajectory {
    /// Number of integration steps per simulated arc
    pub const STEP_COUNT: u32 = 20;

    /// Integration time slice in seconds
    pub const STEP_INTERVAL: f32 = 0.1;

    /// Douglas-Peucker tolerance applied to the raw arc
    pub const SIMPLIFICATION_TOLERANCE: f32 = 0.05;
}

/// Sensor and reactive controller defaults
pub mod sensors {
    /// Lift applied to a walk sensor ground hit
    pub const GROUND_LIFT: f32 = 0.1;

    /// Extra ray length below the slope window of a walk sensor
    pub const WALK_RAY_SLACK: f32 = 0.1;

    /// Walk is chosen while the open distance exceeds this
    pub const MIN_WALK_DISTANCE: f32 = 1.0;

    /// Maximum steering change per tick (degrees)
    pub const TURN_SPEED: f32 = 4.0;
}

/// Small epsilon for float comparisons
pub const EPSILON: f32 = 1.0e-4;
