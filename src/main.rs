use predictive_avoidance::files::{
    read_legacy_scenario, read_trajectory, write_animation, write_legacy_files, write_trajectory,
};
use predictive_avoidance::generator::{generate, GeneratorConfig};
use predictive_avoidance::{summarize, GoalPlacement, Sample, ScenarioConfig, SimulationError};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(about = "Predictive collision avoidance for a single agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario and write the sampled trajectory
    Run(RunArgs),
    /// Generate a random scenario file
    Generate(GenerateArgs),
    /// Print statistics of a trajectory file
    Summary {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Convert a trajectory file into XYZ animation frames
    Animate {
        /// Trajectory file written by `run`
        #[arg(short, long)]
        input: PathBuf,
        /// Scenario the trajectory came from, for radii and arena size
        #[arg(short, long)]
        scenario: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Goal {
    Centered,
    Corner,
}

impl From<Goal> for GoalPlacement {
    fn from(goal: Goal) -> Self {
        match goal {
            Goal::Centered => GoalPlacement::Centered,
            Goal::Corner => GoalPlacement::Corner,
        }
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    /// YAML scenario
    #[arg(short, long, conflicts_with_all = ["static_file", "dynamic_file"])]
    scenario: Option<PathBuf>,
    /// Legacy static file (arena, speeds, radii and masses)
    #[arg(long = "static-file", requires = "dynamic_file")]
    static_file: Option<PathBuf>,
    /// Legacy dynamic file (initial positions and velocities)
    #[arg(long = "dynamic-file", requires = "static_file")]
    dynamic_file: Option<PathBuf>,
    /// Integration step, required with legacy files
    #[arg(long)]
    dt: Option<f64>,
    /// Sampling step, required with legacy files
    #[arg(long)]
    dt2: Option<f64>,
    /// Goal placement for legacy files
    #[arg(long, value_enum, default_value = "centered")]
    goal: Goal,
    /// Trajectory output file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(short = 'W', long, default_value_t = 20.0)]
    width: f64,
    #[arg(short = 'H', long, default_value_t = 10.0)]
    height: f64,
    #[arg(short = 'p', long, default_value_t = 10)]
    obstacle_count: usize,
    #[arg(long, default_value_t = 0.25)]
    obstacle_radius: f64,
    #[arg(long, default_value_t = 1.0)]
    obstacle_speed: f64,
    #[arg(long, default_value_t = 0.5)]
    comfort_radius: f64,
    #[arg(long, default_value_t = 0.5)]
    safe_wall_distance: f64,
    #[arg(long, default_value_t = 0.25)]
    agent_radius: f64,
    #[arg(short, long, default_value_t = 70.0)]
    mass: f64,
    #[arg(long, default_value_t = 2.0)]
    border_limit: f64,
    #[arg(long, default_value_t = 1.3)]
    preferred_speed: f64,
    #[arg(long, default_value_t = 0.5)]
    relaxation_time: f64,
    #[arg(long, default_value_t = 2.0)]
    max_speed: f64,
    #[arg(long, default_value_t = 2.0)]
    anticipation_time: f64,
    #[arg(long, default_value_t = 0.01)]
    dt: f64,
    #[arg(long, default_value_t = 0.1)]
    dt2: f64,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// YAML scenario output
    #[arg(short, long, required_unless_present = "static_file")]
    output: Option<PathBuf>,
    /// Legacy static file output
    #[arg(long = "static-file", requires = "dynamic_file")]
    static_file: Option<PathBuf>,
    /// Legacy dynamic file output
    #[arg(long = "dynamic-file", requires = "static_file")]
    dynamic_file: Option<PathBuf>,
}

impl From<&GenerateArgs> for GeneratorConfig {
    fn from(args: &GenerateArgs) -> Self {
        GeneratorConfig {
            width: args.width,
            height: args.height,
            safe_wall_distance: args.safe_wall_distance,
            border_limit: args.border_limit,
            obstacle_count: args.obstacle_count,
            obstacle_radius: args.obstacle_radius,
            obstacle_speed: args.obstacle_speed,
            mass: args.mass,
            agent_radius: args.agent_radius,
            comfort_radius: args.comfort_radius,
            max_speed: args.max_speed,
            preferred_speed: args.preferred_speed,
            relaxation_time: args.relaxation_time,
            anticipation_time: args.anticipation_time,
            dt: args.dt,
            dt2: args.dt2,
            seed: args.seed,
        }
    }
}

fn load_scenario(args: &RunArgs) -> Result<ScenarioConfig> {
    if let Some(path) = &args.scenario {
        return ScenarioConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load {}", path.display()));
    }
    match (&args.static_file, &args.dynamic_file, args.dt, args.dt2) {
        (Some(static_file), Some(dynamic_file), Some(dt), Some(dt2)) => {
            let mut scenario = read_legacy_scenario(static_file, dynamic_file, dt, dt2)
                .context("failed to load the static/dynamic files")?;
            scenario.arena.goal = args.goal.into();
            Ok(scenario)
        }
        (Some(_), Some(_), _, _) => bail!("--dt and --dt2 must be given with legacy input files"),
        _ => bail!("either --scenario or --static-file and --dynamic-file must be given"),
    }
}

fn save_trajectory(path: &Path, samples: &[Sample]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_trajectory(BufWriter::new(file), samples)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}

fn run(args: &RunArgs) -> Result<()> {
    let scenario = load_scenario(args)?;
    let simulation = scenario.build()?;

    let start = Instant::now();
    let outcome = simulation.simulate();
    log::info!("simulation took {} ms", start.elapsed().as_millis());

    match outcome {
        Ok(samples) => {
            if let Some(path) = &args.output {
                save_trajectory(path, &samples)?;
            }
            if let Some(summary) = summarize(&samples) {
                println!(
                    "goal reached after {:.2} (distance travelled {:.3}, mean speed {:.3})",
                    summary.elapsed, summary.distance_travelled, summary.mean_speed
                );
            } else {
                println!("agent started on the goal");
            }
            Ok(())
        }
        Err(err @ SimulationError::TimeLimitExceeded { .. }) => {
            if let Some(path) = &args.output {
                save_trajectory(path, err.samples())?;
            }
            Err(err.into())
        }
    }
}

fn generate_scenario(args: &GenerateArgs) -> Result<()> {
    let scenario = generate(&GeneratorConfig::from(args))?;
    if let Some(path) = &args.output {
        let yaml = scenario.to_yaml_string()?;
        std::fs::write(path, yaml).with_context(|| format!("failed to write {}", path.display()))?;
        println!("wrote {} obstacles to {}", scenario.obstacles.len(), path.display());
    }
    if let (Some(static_file), Some(dynamic_file)) = (&args.static_file, &args.dynamic_file) {
        write_legacy_files(static_file, dynamic_file, &scenario).with_context(|| {
            format!("failed to write {} and {}", static_file.display(), dynamic_file.display())
        })?;
        println!(
            "wrote {} obstacles to {} and {}",
            scenario.obstacles.len(),
            static_file.display(),
            dynamic_file.display()
        );
    }
    Ok(())
}

fn print_summary(input: &Path) -> Result<()> {
    let file = File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let samples = read_trajectory(BufReader::new(file))?;
    match summarize(&samples) {
        Some(summary) => {
            println!("time taken:         {:.3}", summary.elapsed);
            println!("distance travelled: {:.3}", summary.distance_travelled);
            println!("mean speed:         {:.3}", summary.mean_speed);
            if let Some(closest) = summary.closest_approach {
                println!("closest approach:   {:.3}", closest);
            }
        }
        None => println!("empty trajectory"),
    }
    Ok(())
}

fn animate(input: &Path, scenario: &Path, output: &Path) -> Result<()> {
    let scenario = ScenarioConfig::from_yaml_file(scenario)
        .with_context(|| format!("failed to load {}", scenario.display()))?;
    let file = File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let samples = read_trajectory(BufReader::new(file))?;

    let out =
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    write_animation(
        BufWriter::new(out),
        &samples,
        &scenario.radii(),
        scenario.arena.width,
        scenario.arena.height,
    )
    .with_context(|| format!("failed to write {}", output.display()))?;
    log::info!("wrote {} frames to {}", samples.len(), output.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Run(args) => run(args),
        Command::Generate(args) => generate_scenario(args),
        Command::Summary { input } => print_summary(input),
        Command::Animate { input, scenario, output } => animate(input, scenario, output),
    }
}
