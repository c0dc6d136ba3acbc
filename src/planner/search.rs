//! Bounded forward search over walking, jumping and dropping transitions.
//!
//! The engine holds only immutable settings. Each call seeds a fresh stack of
//! [`SearchState`]s from the surface under the runner, expands them depth-first, and
//! returns the first input of the winning branch. Nothing survives between calls, so a
//! host simply re-plans every fixed tick.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::constants::search::STACK_CAPACITY;
use super::geometry::{heading_direction, lerp_angle, planar, signed_angle_about_up, up};
use super::landing::{first_hit_along, is_steppable, segments, LandingCriteria, LandingVerdict, StepTolerance};
use super::state::{ControlInput, SearchState, Transition};
use super::terrain::{SurfaceId, TerrainHit, TerrainQuery};
use super::trajectory::TrajectorySimulator;
use crate::config::{Kinematics, PlannerConfig};
use crate::error::ConfigError;

/// Where the runner stands and which way its body faces (yaw in degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentPose {
    pub position: Point3<f32>,
    pub yaw: f32,
}

impl AgentPose {
    pub fn new(position: Point3<f32>, yaw: f32) -> Self {
        Self { position, yaw }
    }
}

/// Ground found under the runner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceContact {
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    pub surface: SurfaceId,
}

impl From<TerrainHit> for SurfaceContact {
    fn from(hit: TerrainHit) -> Self {
        Self {
            point: hit.point,
            normal: hit.normal,
            surface: hit.surface,
        }
    }
}

/// Orientation the search angles are relative to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadingFrame {
    /// World yaw of the runner's base orientation (degrees)
    pub base_yaw: f32,
    /// Heading, relative to `base_yaw`, that deep branches are pulled toward
    pub forward_heading: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// No ground under the runner; nothing was searched
    NotGrounded,
    /// A branch crossed the lookahead horizon
    HorizonReached,
    /// Every branch was expanded without reaching the horizon
    Exhausted,
    /// The iteration cap stopped the search early
    IterationCapReached,
}

/// Result of one planning call.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutcome {
    pub status: PlanStatus,
    /// Input to apply this tick; `None` means reset to neutral
    pub input: Option<ControlInput>,
    /// Winning state, or the best partial one
    pub state: Option<SearchState>,
    /// Forward advance of `state` along the course axis (unweighted)
    pub progress: f32,
    pub iterations: u32,
    pub origin: Option<SurfaceContact>,
}

impl PlanOutcome {
    fn not_grounded() -> Self {
        Self {
            status: PlanStatus::NotGrounded,
            input: None,
            state: None,
            progress: 0.0,
            iterations: 0,
            origin: None,
        }
    }
}

/// A child produced by expanding one frontier state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branch {
    pub transition: Transition,
    pub state: SearchState,
}

pub struct PathSearchEngine {
    config: PlannerConfig,
    kinematics: Kinematics,
    course_axis: Vector3<f32>,
    criteria: LandingCriteria,
    step_tolerance: StepTolerance,
}

impl PathSearchEngine {
    pub fn new(config: PlannerConfig, kinematics: Kinematics) -> Result<Self, ConfigError> {
        config.validate()?;
        kinematics.validate()?;
        let course_axis = config.course_axis().ok_or(ConfigError::DegenerateCourseAxis)?;
        Ok(Self {
            criteria: LandingCriteria {
                landable_normal_dot: config.landable_normal_dot,
            },
            step_tolerance: StepTolerance {
                horizontal: config.steppable_distance,
                vertical: config.max_step_height,
            },
            course_axis,
            config,
            kinematics,
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    /// Upper bound on terrain queries issued while expanding a single state.
    pub fn max_queries_per_expansion(&self) -> u64 {
        // slope probe + (climb probe | step-up probe + two ground probes), then per arc
        // one raycast per segment plus two closest-point lookups, then one lookup to put
        // a stair step back on the walk path
        let arc = self.config.trajectory.step_count as u64 + 2;
        5 + 2 * arc
    }

    /// Sphere-casts below the runner for the surface it stands on.
    pub fn ground_contact<T: TerrainQuery + ?Sized>(
        &self,
        terrain: &T,
        position: &Point3<f32>,
    ) -> Option<SurfaceContact> {
        terrain
            .spherecast(
                position,
                self.config.ground_probe_radius,
                &(-up()),
                self.config.grounding_distance,
                self.config.surface_mask,
            )
            .map(SurfaceContact::from)
    }

    /// Frame for a runner facing `yaw`, pulling branches toward the course axis.
    pub fn heading_frame(&self, yaw: f32) -> HeadingFrame {
        HeadingFrame {
            base_yaw: yaw,
            forward_heading: signed_angle_about_up(&heading_direction(yaw), &self.course_axis),
        }
    }

    /// Grounds the runner and plans from the surface below it.
    pub fn plan<T: TerrainQuery + ?Sized>(&self, terrain: &T, pose: &AgentPose) -> PlanOutcome {
        let Some(contact) = self.ground_contact(terrain, &pose.position) else {
            debug!(
                "[Planner] not grounded at ({:.2}, {:.2}, {:.2})",
                pose.position.x, pose.position.y, pose.position.z
            );
            return PlanOutcome::not_grounded();
        };
        self.plan_from_surface(terrain, contact, self.heading_frame(pose.yaw))
    }

    /// Root states: straight ahead plus symmetric side seeds, ordered so that the
    /// straight seed is popped first and smaller deviations before larger ones.
    pub fn seed_states(&self, origin: &SurfaceContact) -> Vec<SearchState> {
        let start = origin.point + origin.normal * self.config.hover_distance;
        let mut seeds = Vec::with_capacity(2 * self.config.extra_paths as usize + 1);
        for k in (1..=self.config.extra_paths).rev() {
            let angle = k as f32 * self.config.extra_paths_step_angle;
            if angle > self.config.max_valid_start_angle {
                continue;
            }
            seeds.push(SearchState::root(start, angle, origin.surface));
            seeds.push(SearchState::root(start, -angle, origin.surface));
        }
        seeds.push(SearchState::root(start, 0.0, origin.surface));
        seeds
    }

    /// Runs the search from a known surface contact.
    pub fn plan_from_surface<T: TerrainQuery + ?Sized>(
        &self,
        terrain: &T,
        origin: SurfaceContact,
        frame: HeadingFrame,
    ) -> PlanOutcome {
        let origin_forward = self.course_axis.dot(&origin.point.coords);
        let advance_of = |p: &Point3<f32>| self.course_axis.dot(&p.coords) - origin_forward;

        let mut simulator = TrajectorySimulator::new(self.config.trajectory, self.kinematics.gravity);
        let mut stack: Vec<SearchState> = Vec::with_capacity(STACK_CAPACITY);
        stack.extend(self.seed_states(&origin));

        let mut children = Vec::with_capacity(2);
        let mut best = BestPartial::new(self.config.min_improvement_increment);
        let mut iterations = 0_u32;
        let mut status = PlanStatus::Exhausted;

        while let Some(state) = stack.pop() {
            if iterations >= self.config.max_iterations {
                warn!(
                    "[Planner] iteration cap {} reached with {} states pending, using best partial path",
                    self.config.max_iterations,
                    stack.len() + 1
                );
                status = PlanStatus::IterationCapReached;
                break;
            }
            iterations += 1;

            let advance = advance_of(&state.current_position);
            if advance > self.config.max_lookahead_distance {
                debug!(
                    "[Planner] horizon reached after {} iterations, depth {}",
                    iterations, state.step_count
                );
                return PlanOutcome {
                    status: PlanStatus::HorizonReached,
                    input: state.first_input,
                    state: Some(state),
                    progress: advance,
                    iterations,
                    origin: Some(origin),
                };
            }

            best.offer(state, advance);

            children.clear();
            self.expand_into(terrain, &state, &frame, &mut simulator, &mut children);
            stack.extend(children.iter().map(|branch| branch.state));
        }

        let best = best.state;
        let progress = best.map(|s| advance_of(&s.current_position)).unwrap_or(0.0);
        debug!(
            "[Planner] {:?} after {} iterations, best progress {:.2}",
            status, iterations, progress
        );
        PlanOutcome {
            status,
            input: best.and_then(|s| s.first_input),
            state: best,
            progress,
            iterations,
            origin: Some(origin),
        }
    }

    /// Children of `state` in push order (the last one is explored first).
    pub fn expand<T: TerrainQuery + ?Sized>(
        &self,
        terrain: &T,
        state: &SearchState,
        frame: &HeadingFrame,
    ) -> Vec<Branch> {
        let mut simulator = TrajectorySimulator::new(self.config.trajectory, self.kinematics.gravity);
        let mut children = Vec::with_capacity(2);
        self.expand_into(terrain, state, frame, &mut simulator, &mut children);
        children
    }

    fn expand_into<T: TerrainQuery + ?Sized>(
        &self,
        terrain: &T,
        state: &SearchState,
        frame: &HeadingFrame,
        simulator: &mut TrajectorySimulator,
        out: &mut Vec<Branch>,
    ) {
        let cfg = &self.config;
        let up = up();
        let down = -up;

        let alignment = (cfg.alignment_rate * state.step_count as f32).clamp(0.0, 1.0);
        let next_angle = lerp_angle(state.current_angle, frame.forward_heading, alignment);
        let heading = frame.base_yaw + state.current_angle;
        let step_dir = heading_direction(heading);
        let next_point = state.current_position + step_dir * cfg.step_size;
        let walk_input = ControlInput::new(planar(&step_dir), false);

        // Uphill: the forward probe runs into ground we can stand on
        let slope_origin = state.current_position + up * cfg.slope_probe_height;
        let slope_hit = terrain.raycast(&slope_origin, &step_dir, cfg.step_size, cfg.surface_mask);
        if let Some(hit) = slope_hit.filter(|h| self.is_walkable(h)) {
            let climb = cfg.step_size * cfg.max_slope_grade + cfg.slope_probe_height;
            let from = next_point + up * climb;
            if let Some(ground) = terrain
                .raycast(&from, &down, climb + cfg.ground_probe_distance, cfg.surface_mask)
                .filter(|g| self.is_walkable(g))
            {
                out.push(self.branch(state, Transition::Climb, &ground, next_angle, walk_input));
            } else {
                trace!("[Planner] slope at {:?} has no footing ahead", hit.point);
            }
            return;
        }
        let blocked = slope_hit.is_some();

        // Ground ahead: at foot height, then from above to catch crests and steps
        let ground_ahead = if blocked {
            let step_origin = state.current_position + up * cfg.crest_probe_height;
            let step_clear = terrain
                .raycast(&step_origin, &step_dir, cfg.step_size, cfg.surface_mask)
                .is_none();
            if step_clear {
                self.crest_probe(terrain, &next_point)
            } else {
                None
            }
        } else {
            terrain
                .raycast(&next_point, &down, cfg.ground_probe_distance, cfg.surface_mask)
                .filter(|g| self.is_walkable(g))
                .or_else(|| self.crest_probe(terrain, &next_point))
        };

        if let Some(ground) = ground_ahead {
            out.push(self.branch(state, Transition::Walk, &ground, next_angle, walk_input));
            return;
        }

        // Gap: try dropping off and jumping across
        let speed = self.kinematics.movement_speed;
        let drop_velocity = Vector3::new(0.0, 0.0, speed * cfg.drop_velocity_scale);
        let jump_velocity = Vector3::new(
            0.0,
            self.kinematics.jump_speed * cfg.jump_velocity_scale,
            speed * cfg.jump_velocity_scale,
        );

        let drop = self.find_landing(terrain, simulator, state, heading, drop_velocity);
        let jump = self.find_landing(terrain, simulator, state, heading, jump_velocity);

        // A flight onto a stair step means the foot probe fell into a crack between
        // surfaces; walk onto the step edge instead
        let step = [drop, jump].into_iter().find_map(|flight| match flight {
            Some(Flight::Step(surface)) => Some(surface),
            _ => None,
        });
        if let Some(surface) = step {
            if let Some(point) = terrain.closest_point(surface, &next_point) {
                let ground = TerrainHit {
                    point,
                    normal: up,
                    distance: 0.0,
                    surface,
                };
                out.push(self.branch(state, Transition::Walk, &ground, next_angle, walk_input));
            }
            return;
        }
        let (drop, jump) = (Flight::landed(drop), Flight::landed(jump));

        let jump_input = ControlInput::new(planar(&step_dir), true);
        match (jump, drop) {
            (Some(j), Some(d)) if j.surface == d.surface => {
                out.push(self.branch(state, Transition::Drop, &d, next_angle, walk_input));
            }
            (jump, drop) => {
                if let Some(j) = jump {
                    out.push(self.branch(state, Transition::Jump, &j, next_angle, jump_input));
                }
                if let Some(d) = drop {
                    out.push(self.branch(state, Transition::Drop, &d, next_angle, walk_input));
                }
            }
        }
    }

    fn crest_probe<T: TerrainQuery + ?Sized>(&self, terrain: &T, next_point: &Point3<f32>) -> Option<TerrainHit> {
        let cfg = &self.config;
        let from = next_point + up() * cfg.crest_probe_height;
        terrain
            .raycast(
                &from,
                &(-up()),
                cfg.crest_probe_height + cfg.ground_probe_distance,
                cfg.surface_mask,
            )
            .filter(|g| self.is_walkable(g))
    }

    /// First valid landing along a simulated flight, if any.
    fn find_landing<T: TerrainQuery + ?Sized>(
        &self,
        terrain: &T,
        simulator: &mut TrajectorySimulator,
        state: &SearchState,
        heading: f32,
        velocity: Vector3<f32>,
    ) -> Option<Flight> {
        let path = simulator.simulate(state.current_position, heading, velocity);
        let (delta, hit) = first_hit_along(terrain, segments(path), self.config.surface_mask)?;

        let verdict = self.criteria.judge(&delta, &hit, Some(state.surface));
        if verdict != LandingVerdict::Landing {
            trace!("[Planner] flight rejected at {:?}: {:?}", hit.point, verdict);
            return None;
        }

        let takeoff_height = state.current_position.y - self.config.hover_distance;
        if is_steppable(terrain, state.surface, hit.surface, &hit.point, takeoff_height, self.step_tolerance) {
            trace!("[Planner] landing on {:?} is a step, leaving it to walking", hit.surface);
            return Some(Flight::Step(hit.surface));
        }
        Some(Flight::Landing(hit))
    }

    fn is_walkable(&self, hit: &TerrainHit) -> bool {
        hit.normal.dot(&up()) > self.config.landable_normal_dot
    }

    fn branch(
        &self,
        state: &SearchState,
        transition: Transition,
        ground: &TerrainHit,
        angle: f32,
        input: ControlInput,
    ) -> Branch {
        let position = ground.point + ground.normal * self.config.hover_distance;
        let factor = if transition == Transition::Jump {
            self.config.jump_quality_penalty
        } else {
            1.0
        };
        Branch {
            transition,
            state: state.next(position, angle, ground.surface, input, factor),
        }
    }
}

/// Where a simulated flight ends up.
#[derive(Debug, Clone, Copy)]
enum Flight {
    Landing(TerrainHit),
    /// Lands on a surface that continues the takeoff surface like a stair
    Step(SurfaceId),
}

impl Flight {
    fn landed(flight: Option<Flight>) -> Option<TerrainHit> {
        match flight {
            Some(Flight::Landing(hit)) => Some(hit),
            _ => None,
        }
    }
}

/// Best partial path seen so far, scored by forward advance weighted by quality. A new
/// state replaces it only when it scores at least `min_increment` higher.
#[derive(Debug, Clone, Copy)]
struct BestPartial {
    state: Option<SearchState>,
    score: f32,
    min_increment: f32,
}

impl BestPartial {
    fn new(min_increment: f32) -> Self {
        Self {
            state: None,
            score: 0.0,
            min_increment,
        }
    }

    fn offer(&mut self, state: SearchState, advance: f32) -> bool {
        let score = advance * state.quality;
        if score > self.score && score - self.score >= self.min_increment {
            self.score = score;
            self.state = Some(state);
            return true;
        }
        false
    }
}
