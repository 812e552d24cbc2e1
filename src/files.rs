//! Plain-text input and output files.
//!
//! Besides YAML scenarios, initial conditions can come as a pair of
//! whitespace-separated text files:
//!
//! ```text
//! static file                                  dynamic file
//! -----------                                  ------------
//! width height                                 0
//! comfort_radius safe_wall_distance            x y vx vy    <- agent
//! preferred_speed relaxation_time max_speed    x y vx vy    <- obstacle 1
//! [anticipation_time]                          ...
//! radius mass                  <- agent
//! radius mass                  <- obstacle 1
//! ...
//! ```
//!
//! Trajectories are written as a time line followed by one `x y vx vy` line
//! per particle, for every sample.
//!
//! For viewing, a trajectory can also be exported as XYZ animation frames:
//! a particle count, an empty comment line, then `radius x y r g b` per
//! particle, tab separated. Every frame ends with four tiny corner markers
//! so the viewer keeps the whole arena in frame.

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use crate::config::{
    AgentConfig, ArenaConfig, GoalPlacement, ObstacleConfig, ScenarioConfig, StepConfig,
};
use crate::engine::{ParticleState, Sample, TIME_LIMIT};
use crate::error::ParseError;
use crate::forces::AvoidanceTuning;
use crate::vector::Vector2D;

/// Agent colour in animation frames
pub const AGENT_COLOR: [f64; 3] = [199.0 / 255.0, 59.0 / 255.0, 44.0 / 255.0];
/// Obstacle colour in animation frames
pub const OBSTACLE_COLOR: [f64; 3] = [235.0 / 255.0, 192.0 / 255.0, 52.0 / 255.0];
/// Radius of the corner markers that pin the animation bounds
const MARKER_RADIUS: f64 = 1e-5;

/// Number of scalar header values before the optional anticipation time
const STATIC_HEADER_LEN: usize = 7;
/// Anticipation time assumed when the static file does not carry one
pub const DEFAULT_ANTICIPATION_TIME: f64 = 1.0;

fn parse_number(line: usize, token: &str) -> Result<f64, ParseError> {
    token.parse::<f64>().map_err(|_| ParseError::Number {
        line,
        token: token.to_string(),
    })
}

/// Every number in `source` with its 1-based line number
fn numbers(source: &str) -> Result<Vec<(usize, f64)>, ParseError> {
    let mut values = Vec::new();
    for (index, line) in source.lines().enumerate() {
        for token in line.split_whitespace() {
            values.push((index + 1, parse_number(index + 1, token)?));
        }
    }
    Ok(values)
}

/// Builds a scenario from the contents of a static and a dynamic file.
///
/// The first particle of both files is the agent; the rest are obstacles.
/// Obstacles share the agent's comfort radius.
pub fn legacy_scenario(
    static_source: &str,
    dynamic_source: &str,
    dt: f64,
    dt2: f64,
) -> Result<ScenarioConfig, ParseError> {
    let values: Vec<f64> = numbers(static_source)?.into_iter().map(|(_, v)| v).collect();
    if values.len() < STATIC_HEADER_LEN {
        return Err(ParseError::Missing {
            file: "static",
            what: "the arena and speed header",
        });
    }
    let (header, rest) = values.split_at(STATIC_HEADER_LEN);
    let (anticipation_time, bodies) = if rest.len() % 2 == 1 {
        (rest[0], &rest[1..])
    } else {
        (DEFAULT_ANTICIPATION_TIME, rest)
    };
    if bodies.is_empty() {
        return Err(ParseError::Missing {
            file: "static",
            what: "particles",
        });
    }
    let bodies: Vec<(f64, f64)> = bodies.chunks(2).map(|pair| (pair[0], pair[1])).collect();

    let states = dynamic_states(dynamic_source)?;
    if states.len() != bodies.len() {
        return Err(ParseError::ParticleCount {
            expected: bodies.len(),
            found: states.len(),
        });
    }

    let (width, height) = (header[0], header[1]);
    let (comfort_radius, safe_wall_distance) = (header[2], header[3]);
    let (preferred_speed, relaxation_time, max_speed) = (header[4], header[5], header[6]);

    let agent = AgentConfig {
        radius: bodies[0].0,
        mass: bodies[0].1,
        comfort_radius,
        max_speed,
        preferred_speed,
        relaxation_time,
        anticipation_time,
        position: states[0].0,
        velocity: states[0].1,
    };
    let obstacles = bodies
        .iter()
        .zip(states.iter())
        .skip(1)
        .map(|(&(radius, mass), &(position, velocity))| ObstacleConfig {
            radius,
            mass,
            position,
            velocity,
        })
        .collect();

    Ok(ScenarioConfig {
        simulation: StepConfig {
            dt,
            dt2,
            time_limit: TIME_LIMIT,
        },
        arena: ArenaConfig {
            width,
            height,
            safe_wall_distance,
            goal: GoalPlacement::default(),
        },
        agent,
        obstacles,
        tuning: AvoidanceTuning::default(),
    })
}

/// `(position, velocity)` per particle of a dynamic file
fn dynamic_states(source: &str) -> Result<Vec<(Vector2D, Vector2D)>, ParseError> {
    let mut lines = source
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    match lines.next() {
        Some((line, time)) => {
            parse_number(line, time)?;
        }
        None => {
            return Err(ParseError::Missing {
                file: "dynamic",
                what: "the initial time",
            })
        }
    }

    let mut states = Vec::new();
    for (line, text) in lines {
        let record = text
            .split_whitespace()
            .map(|token| parse_number(line, token))
            .collect::<Result<Vec<f64>, _>>()?;
        if record.len() != 4 {
            return Err(ParseError::Record { line, found: record.len() });
        }
        states.push((Vector2D::new(record[0], record[1]), Vector2D::new(record[2], record[3])));
    }
    Ok(states)
}

pub fn read_legacy_scenario(
    static_path: &Path,
    dynamic_path: &Path,
    dt: f64,
    dt2: f64,
) -> Result<ScenarioConfig, ParseError> {
    let static_source = std::fs::read_to_string(static_path)?;
    let dynamic_source = std::fs::read_to_string(dynamic_path)?;
    let config = legacy_scenario(&static_source, &dynamic_source, dt, dt2)?;
    log::debug!(
        "loaded {} and {} with {} obstacles",
        static_path.display(),
        dynamic_path.display(),
        config.obstacles.len()
    );
    Ok(config)
}

/// Writes `config` as a static and a dynamic file readable by [`legacy_scenario`].
///
/// The anticipation time is always written, so reading the pair back with the
/// same `dt` and `dt2` gives the same scenario up to tuning, time limit and goal
/// placement, which the text format does not carry.
pub fn write_legacy_scenario<S: Write, D: Write>(
    mut static_out: S,
    mut dynamic_out: D,
    config: &ScenarioConfig,
) -> std::io::Result<()> {
    let agent = &config.agent;
    writeln!(static_out, "{} {}", config.arena.width, config.arena.height)?;
    writeln!(static_out, "{} {}", agent.comfort_radius, config.arena.safe_wall_distance)?;
    writeln!(
        static_out,
        "{} {} {}",
        agent.preferred_speed, agent.relaxation_time, agent.max_speed
    )?;
    writeln!(static_out, "{}", agent.anticipation_time)?;
    writeln!(static_out, "{} {}", agent.radius, agent.mass)?;
    for obstacle in &config.obstacles {
        writeln!(static_out, "{} {}", obstacle.radius, obstacle.mass)?;
    }
    static_out.flush()?;

    writeln!(dynamic_out, "0")?;
    let states = std::iter::once((agent.position, agent.velocity))
        .chain(config.obstacles.iter().map(|o| (o.position, o.velocity)));
    for (position, velocity) in states {
        writeln!(dynamic_out, "{} {} {} {}", position.x, position.y, velocity.x, velocity.y)?;
    }
    dynamic_out.flush()
}

pub fn write_legacy_files(
    static_path: &Path,
    dynamic_path: &Path,
    config: &ScenarioConfig,
) -> std::io::Result<()> {
    let static_file = BufWriter::new(File::create(static_path)?);
    let dynamic_file = BufWriter::new(File::create(dynamic_path)?);
    write_legacy_scenario(static_file, dynamic_file, config)
}

pub fn write_trajectory<W: Write>(mut out: W, samples: &[Sample]) -> std::io::Result<()> {
    for sample in samples {
        writeln!(out, "{:.6}", sample.time)?;
        for p in &sample.particles {
            writeln!(out, "{} {} {} {}", p.x, p.y, p.vx, p.vy)?;
        }
    }
    out.flush()
}

pub fn read_trajectory<R: BufRead>(input: R) -> Result<Vec<Sample>, ParseError> {
    let mut samples: Vec<Sample> = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = line?;
        let values = line
            .split_whitespace()
            .map(|token| parse_number(line_number, token))
            .collect::<Result<Vec<f64>, _>>()?;

        match values.len() {
            0 => {}
            1 => samples.push(Sample {
                time: values[0],
                particles: Vec::new(),
            }),
            4 => match samples.last_mut() {
                Some(sample) => sample.particles.push(ParticleState {
                    x: values[0],
                    y: values[1],
                    vx: values[2],
                    vy: values[3],
                }),
                None => {
                    return Err(ParseError::Missing {
                        file: "trajectory",
                        what: "a time line before the first particle",
                    })
                }
            },
            found => return Err(ParseError::Record { line: line_number, found }),
        }
    }
    Ok(samples)
}

/// Writes one XYZ frame per sample.
///
/// `radii` are the body radii in id order, as given by
/// [`ScenarioConfig::radii`]. The agent (first particle) is drawn in
/// [`AGENT_COLOR`], obstacles in [`OBSTACLE_COLOR`].
pub fn write_animation<W: Write>(
    mut out: W,
    samples: &[Sample],
    radii: &[f64],
    width: f64,
    height: f64,
) -> Result<(), ParseError> {
    let corners = [(0.0, 0.0), (width, 0.0), (0.0, height), (width, height)];
    for sample in samples {
        if sample.particles.len() != radii.len() {
            return Err(ParseError::ParticleCount {
                expected: radii.len(),
                found: sample.particles.len(),
            });
        }

        writeln!(out, "{}", sample.particles.len() + corners.len())?;
        writeln!(out)?;
        for (index, (p, radius)) in sample.particles.iter().zip(radii).enumerate() {
            let [r, g, b] = if index == 0 { AGENT_COLOR } else { OBSTACLE_COLOR };
            writeln!(out, "{}\t{}\t{}\t{}\t{}\t{}", radius, p.x, p.y, r, g, b)?;
        }
        for (x, y) in corners {
            writeln!(out, "{}\t{}\t{}\t0\t0\t0", MARKER_RADIUS, x, y)?;
        }
    }
    out.flush()?;
    Ok(())
}
