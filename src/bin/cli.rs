//! runnerpath CLI - plan, probe and generate runner courses

use clap::{Parser, Subcommand};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use runnerpath::course::CourseConfig;
use runnerpath::planner::{AgentPose, ControlInput, CountingTerrain, PlanOutcome, PlanStatus, RapierTerrain};
use runnerpath::runner::{Decision, RunnerBrain, VirtualInput};
use runnerpath::sensors::Observations;

#[derive(Parser)]
#[command(name = "runnerpath")]
#[command(about = "Path search and sensors for an autonomous course runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan one tick from the course's start pose
    Plan {
        /// Path to the course TOML
        course: PathBuf,
        /// Override the start position (x, y, z)
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        position: Option<Vec<f32>>,
        /// Override the start yaw in degrees
        #[arg(long, allow_negative_numbers = true)]
        yaw: Option<f32>,
    },
    /// Plan from many jittered poses in parallel and summarize the outcomes
    Batch {
        course: PathBuf,
        /// Number of poses to plan from
        #[arg(short, long, default_value = "256")]
        samples: usize,
        /// Maximum distance a pose is moved from the start (x/z)
        #[arg(long, default_value = "2.0")]
        spread: f32,
        /// Maximum yaw jitter in degrees
        #[arg(long, default_value = "30.0")]
        yaw_spread: f32,
        #[arg(long, default_value = "0")]
        seed: u64,
        /// Print every report instead of the summary
        #[arg(long)]
        json: bool,
    },
    /// Take walk and jump sensor readings at the start pose
    Sense {
        course: PathBuf,
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        position: Option<Vec<f32>>,
        #[arg(long, allow_negative_numbers = true)]
        yaw: Option<f32>,
    },
    /// Write a random chunk course
    Generate {
        #[arg(long, default_value = "generated")]
        name: String,
        #[arg(long, default_value = "0")]
        seed: u64,
        /// Number of chunks, including the run-up
        #[arg(short, long, default_value = "10")]
        chunks: usize,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("runnerpath=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan { course, position, yaw } => plan(&course, position, yaw),
        Commands::Batch {
            course,
            samples,
            spread,
            yaw_spread,
            seed,
            json,
        } => batch(&course, samples, spread, yaw_spread, seed, json),
        Commands::Sense { course, position, yaw } => sense(&course, position, yaw),
        Commands::Generate {
            name,
            seed,
            chunks,
            output,
        } => generate(&name, seed, chunks, output),
    }
}

fn load_course(path: &Path) -> (CourseConfig, RapierTerrain) {
    let course = CourseConfig::from_file(path).unwrap_or_else(|e| fail(e));
    let terrain = course.build_terrain().unwrap_or_else(|e| fail(e));
    (course, terrain)
}

fn start_pose(course: &CourseConfig, position: Option<Vec<f32>>, yaw: Option<f32>) -> AgentPose {
    let mut pose = course.agent_pose();
    if let Some([x, y, z]) = position.as_deref().and_then(|p| <[f32; 3]>::try_from(p).ok()) {
        pose.position = Point3::new(x, y, z);
    }
    if let Some(yaw) = yaw {
        pose.yaw = yaw;
    }
    pose
}

fn fail(error: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", error);
    std::process::exit(1);
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => fail(e),
    }
}

// =============================================================================
// Plan Command
// =============================================================================

#[derive(Serialize)]
struct PlanReport {
    position: [f32; 3],
    yaw: f32,
    status: PlanStatus,
    input: Option<ControlInput>,
    progress: f32,
    quality: Option<f32>,
    depth: Option<u32>,
    end_position: Option<[f32; 3]>,
    iterations: u32,
    queries: u64,
}

impl PlanReport {
    fn new(pose: &AgentPose, outcome: &PlanOutcome, queries: u64) -> Self {
        Self {
            position: pose.position.into(),
            yaw: pose.yaw,
            status: outcome.status,
            input: outcome.input,
            progress: outcome.progress,
            quality: outcome.state.map(|s| s.quality),
            depth: outcome.state.map(|s| s.step_count),
            end_position: outcome.state.map(|s| s.current_position.into()),
            iterations: outcome.iterations,
            queries,
        }
    }
}

fn plan(path: &Path, position: Option<Vec<f32>>, yaw: Option<f32>) {
    let (course, terrain) = load_course(path);
    let engine = course.engine().unwrap_or_else(|e| fail(e));
    let pose = start_pose(&course, position, yaw);

    let counted = CountingTerrain::new(&terrain);
    let outcome = engine.plan(&counted, &pose);
    print_json(&PlanReport::new(&pose, &outcome, counted.queries()));
}

// =============================================================================
// Batch Command
// =============================================================================

#[derive(Serialize, Default)]
struct BatchSummary {
    samples: usize,
    horizon_reached: usize,
    exhausted: usize,
    iteration_cap_reached: usize,
    not_grounded: usize,
    jumping: usize,
    mean_progress: f32,
    mean_queries: f64,
}

fn batch(path: &Path, samples: usize, spread: f32, yaw_spread: f32, seed: u64, json: bool) {
    let (course, terrain) = load_course(path);
    let engine = course.engine().unwrap_or_else(|e| fail(e));
    let start = course.agent_pose();

    let mut rng = StdRng::seed_from_u64(seed);
    let poses: Vec<AgentPose> = (0..samples)
        .map(|_| {
            let dx = if spread > 0.0 { rng.gen_range(-spread..=spread) } else { 0.0 };
            let dz = if spread > 0.0 { rng.gen_range(-spread..=spread) } else { 0.0 };
            let dyaw = if yaw_spread > 0.0 {
                rng.gen_range(-yaw_spread..=yaw_spread)
            } else {
                0.0
            };
            AgentPose::new(start.position + nalgebra::Vector3::new(dx, 0.0, dz), start.yaw + dyaw)
        })
        .collect();

    let reports: Vec<PlanReport> = poses
        .par_iter()
        .map(|pose| {
            let counted = CountingTerrain::new(&terrain);
            let outcome = engine.plan(&counted, pose);
            PlanReport::new(pose, &outcome, counted.queries())
        })
        .collect();

    if json {
        print_json(&reports);
        return;
    }

    let mut summary = BatchSummary {
        samples: reports.len(),
        ..BatchSummary::default()
    };
    for report in &reports {
        match report.status {
            PlanStatus::HorizonReached => summary.horizon_reached += 1,
            PlanStatus::Exhausted => summary.exhausted += 1,
            PlanStatus::IterationCapReached => summary.iteration_cap_reached += 1,
            PlanStatus::NotGrounded => summary.not_grounded += 1,
        }
        if report.input.is_some_and(|i| i.jump) {
            summary.jumping += 1;
        }
    }
    if !reports.is_empty() {
        let n = reports.len() as f32;
        summary.mean_progress = reports.iter().map(|r| r.progress).sum::<f32>() / n;
        summary.mean_queries = reports.iter().map(|r| r.queries as f64).sum::<f64>() / reports.len() as f64;
    }
    print_json(&summary);
}

// =============================================================================
// Sense Command
// =============================================================================

#[derive(Serialize)]
struct SenseReport {
    grounded: bool,
    standing_on: Option<u64>,
    observations: Observations,
    decision: Decision,
    input: ControlInput,
}

fn sense(path: &Path, position: Option<Vec<f32>>, yaw: Option<f32>) {
    let (course, terrain) = load_course(path);
    let engine = course.engine().unwrap_or_else(|e| fail(e));
    let perception = course.perception().unwrap_or_else(|e| fail(e));
    let pose = start_pose(&course, position, yaw);

    let contact = engine.ground_contact(&terrain, &pose.position);
    let standing_on = contact.map(|c| c.surface);
    let observations = perception.observe(&terrain, &pose, standing_on);

    let mut brain = RunnerBrain::new(course.brain, pose.yaw);
    let mut input = VirtualInput::new();
    let decision = brain.tick(contact.is_some(), &observations, &mut input);

    print_json(&SenseReport {
        grounded: contact.is_some(),
        standing_on: standing_on.map(|s| s.0),
        observations,
        decision,
        input: input.current(),
    });
}

// =============================================================================
// Generate Command
// =============================================================================

fn generate(name: &str, seed: u64, chunks: usize, output: Option<PathBuf>) {
    let course = CourseConfig::generate(name, seed, chunks);
    let text = course.to_toml().unwrap_or_else(|e| fail(e));

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, text) {
                fail(format!("failed to write {}: {}", path.display(), e));
            }
            println!("Wrote {} chunks to {}", course.chunks.len(), path.display());
        }
        None => print!("{}", text),
    }
}
