//! Moto CLI - one-shot commands and telemetry monitoring for a Motoman controller
//!
//! Results are printed as JSON lines on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use moto::json_output::{
    error_event, io_event, joint_feedback_event, motion_reply_event, output_event, robot_status_event, IoPayload,
};
use moto::{Config, IoOutcome, Moto, StartConfig, ALL_GROUPS, NO_SEQUENCE};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

const STATUS_WAIT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "moto")]
#[command(about = "Yaskawa Motoman Simple Message client")]
#[command(version)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config/default_config.yaml", global = true)]
    config: String,

    /// Controller address, overriding the configuration file
    #[arg(long, global = true)]
    host: Option<String>,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Clone, Copy, ValueEnum)]
enum Action {
    Start,
    Stop,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the latest robot status and joint feedback
    Status,
    /// Power servos on or off
    Servos { state: Switch },
    /// Enter or leave trajectory streaming mode
    TrajMode { action: Action },
    /// Reset active alarms
    ResetAlarm,
    /// Stop motion and clear the trajectory queue
    StopMotion,
    /// Number of trajectory points queued for a group
    QueueCount { group: i32 },
    /// Select the active tool for a group
    SelectTool { group: i32, tool: i32 },
    /// Read a single I/O bit
    ReadBit { address: i32 },
    /// Write a single I/O bit
    WriteBit { address: i32, value: i32 },
    /// Read an 8-bit I/O group
    ReadGroup { address: i32 },
    /// Write an 8-bit I/O group
    WriteGroup { address: i32, value: i32 },
    /// Stream telemetry as JSON until Ctrl+C
    Monitor,
}

fn only(motion: bool, state: bool, io: bool) -> StartConfig {
    StartConfig {
        motion,
        state,
        io,
        realtime: false,
    }
}

/// Runs a protocol call on the blocking pool.
async fn blocking<F, R>(call: F) -> Result<R>
where
    F: FnOnce() -> moto::Result<R> + Send + 'static,
    R: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(call)
        .await
        .context("Blocking task failed")??)
}

async fn open(mut config: Config, start: StartConfig) -> Result<Arc<Moto>> {
    let host = config.robot.host.clone();
    config.robot.start = start;
    let robot = blocking(move || Moto::connect(config))
        .await
        .with_context(|| format!("Failed to connect to {}", host))?;
    Ok(Arc::new(robot))
}

async fn close(robot: Arc<Moto>) -> Result<()> {
    blocking(move || {
        robot.disconnect();
        Ok(())
    })
    .await
}

async fn motion_command<F>(config: Config, label: &'static str, call: F) -> Result<()>
where
    F: FnOnce(&Moto) -> moto::Result<moto::messages::MotoMotionReply> + Send + 'static,
{
    let robot = open(config, only(true, false, false)).await?;
    let session = Arc::clone(&robot);
    let reply = blocking(move || call(&session)).await?;
    if !reply.is_success() {
        warn!("{} was not accepted: {:?} / {:?}", label, reply.result_type(), reply.subcode_type());
    }
    output_event(&motion_reply_event(label, &reply));
    close(robot).await
}

async fn io_command<F>(config: Config, call: F) -> Result<()>
where
    F: FnOnce(&Moto) -> moto::Result<IoPayload> + Send + 'static,
{
    let robot = open(config, only(false, false, true)).await?;
    let session = Arc::clone(&robot);
    let payload = blocking(move || call(&session)).await?;
    if let Some(rejected) = &payload.rejected {
        warn!("I/O request rejected with subcode {}", rejected.subcode);
    }
    output_event(&io_event(payload));
    close(robot).await
}

fn io_payload<R>(
    operation: &'static str,
    address: i32,
    outcome: IoOutcome<R>,
    fields: fn(&R) -> (Option<i32>, i32),
) -> IoPayload {
    match outcome {
        IoOutcome::Completed(reply) => {
            let (value, result_code) = fields(&reply);
            IoPayload {
                operation,
                address,
                value,
                result_code: Some(result_code),
                rejected: None,
            }
        }
        IoOutcome::Rejected(rejected) => IoPayload {
            operation,
            address,
            value: None,
            result_code: None,
            rejected: Some(rejected),
        },
    }
}

async fn status(config: Config) -> Result<()> {
    let robot = open(config, only(false, true, false)).await?;
    let mut status = robot.state().subscribe_robot_status();
    let latest = tokio::time::timeout(STATUS_WAIT, status.wait_for(Option::is_some))
        .await
        .context("No robot status received")?
        .context("State connection closed")?
        .clone();
    if let Some(latest) = latest {
        output_event(&robot_status_event(&latest));
    }

    let mut groups: Vec<_> = robot.control_groups().values().collect();
    groups.sort_by_key(|group| group.groupno());
    for group in groups {
        match group.joint_feedback() {
            Some(feedback) => output_event(&joint_feedback_event(&feedback, group.num_joints())),
            None => warn!("No joint feedback yet for {}", group.groupid()),
        }
    }
    close(robot).await
}

async fn monitor(config: Config) -> Result<()> {
    let robot = open(config, only(false, false, false)).await?;
    let joints: Arc<HashMap<i32, usize>> = Arc::new(
        robot
            .control_groups()
            .values()
            .map(|group| (group.groupno(), group.num_joints()))
            .collect(),
    );
    let num_joints = |joints: &HashMap<i32, usize>, groupno: i32| {
        joints
            .get(&groupno)
            .copied()
            .unwrap_or(moto::messages::ROS_MAX_JOINT)
    };

    let state = robot.state();
    let per_group = Arc::clone(&joints);
    state.add_joint_feedback_msg_callback(move |feedback| {
        output_event(&joint_feedback_event(feedback, num_joints(&per_group, feedback.groupno)));
    });
    let per_group = Arc::clone(&joints);
    state.add_joint_feedback_ex_msg_callback(move |feedback_ex| {
        for feedback in &feedback_ex.joint_feedback_data {
            output_event(&joint_feedback_event(feedback, num_joints(&per_group, feedback.groupno)));
        }
    });
    state.add_robot_status_callback(|status| output_event(&robot_status_event(status)));

    let session = Arc::clone(&robot);
    blocking(move || session.state().start())
        .await
        .context("Failed to start state connection")?;
    info!("Monitoring telemetry, press Ctrl+C to stop");

    let mut poll = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = poll.tick() => {
                if !robot.state().is_running() {
                    output_event(&error_event(&format!(
                        "state connection ended ({:?})",
                        robot.state().state()
                    )));
                    break;
                }
            }
        }
    }
    close(robot).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config))?;
    if let Some(host) = args.host {
        config.robot.host = host;
    }
    info!("Using controller at {}", config.robot.host);

    match args.command {
        Commands::Status => status(config).await,
        Commands::Monitor => monitor(config).await,
        Commands::Servos { state: Switch::On } => {
            motion_command(config, "servos on", |r| r.motion().start_servos(ALL_GROUPS, NO_SEQUENCE)).await
        }
        Commands::Servos { state: Switch::Off } => {
            motion_command(config, "servos off", |r| r.motion().stop_servos(ALL_GROUPS, NO_SEQUENCE)).await
        }
        Commands::TrajMode { action: Action::Start } => {
            motion_command(config, "traj-mode start", |r| {
                r.motion().start_traj_mode(ALL_GROUPS, NO_SEQUENCE)
            })
            .await
        }
        Commands::TrajMode { action: Action::Stop } => {
            motion_command(config, "traj-mode stop", |r| {
                r.motion().stop_traj_mode(ALL_GROUPS, NO_SEQUENCE)
            })
            .await
        }
        Commands::ResetAlarm => {
            motion_command(config, "reset-alarm", |r| r.motion().reset_alarm(ALL_GROUPS, NO_SEQUENCE)).await
        }
        Commands::StopMotion => {
            motion_command(config, "stop-motion", |r| r.motion().stop_motion(ALL_GROUPS, NO_SEQUENCE)).await
        }
        Commands::QueueCount { group } => {
            motion_command(config, "queue-count", move |r| {
                r.motion().check_queue_count(group, NO_SEQUENCE)
            })
            .await
        }
        Commands::SelectTool { group, tool } => {
            motion_command(config, "select-tool", move |r| {
                r.motion().select_tool(group, tool, NO_SEQUENCE)
            })
            .await
        }
        Commands::ReadBit { address } => {
            io_command(config, move |r| {
                let outcome = r.io().read_io_bit(address)?;
                Ok(io_payload("read_bit", address, outcome, |reply| {
                    (Some(reply.value), reply.result_code)
                }))
            })
            .await
        }
        Commands::WriteBit { address, value } => {
            io_command(config, move |r| {
                let outcome = r.io().write_io_bit(address, value)?;
                Ok(io_payload("write_bit", address, outcome, |reply| (None, reply.result_code)))
            })
            .await
        }
        Commands::ReadGroup { address } => {
            io_command(config, move |r| {
                let outcome = r.io().read_io_group(address)?;
                Ok(io_payload("read_group", address, outcome, |reply| {
                    (Some(reply.value), reply.result_code)
                }))
            })
            .await
        }
        Commands::WriteGroup { address, value } => {
            io_command(config, move |r| {
                let outcome = r.io().write_io_group(address, value)?;
                Ok(io_payload("write_group", address, outcome, |reply| (None, reply.result_code)))
            })
            .await
        }
    }
}
