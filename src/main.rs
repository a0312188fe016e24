mod config;
mod debug;
mod dynamics;
mod error;
mod net;
mod physics;
mod state;
mod track;
mod vehicle;

use crate::config::ServerConfig;
use crate::debug::DebugOverlay;
use crate::dynamics::StepOutcome;
use crate::error::SimError;
use crate::net::{start_websocket_server, ServerMessage};
use crate::physics::{PhysicsWorld, CHASSIS_HALF_EXTENTS};
use crate::state::SharedSimState;

use log::{error, info};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{interval, Instant, MissedTickBehavior};

#[tokio::main]
async fn main() -> Result<(), SimError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 Starting torque-vectoring physics server...");

    let config = ServerConfig::from_env()?;
    let params = config.load_params()?;

    let mut physics = PhysicsWorld::new(config.spawn, params.mass);
    physics.set_track(config.track);

    let state = Arc::new(Mutex::new(SharedSimState::new(params, config.track)));

    // Start WebSocket server
    let server = tokio::spawn(start_websocket_server(config.bind.clone(), Arc::clone(&state)));

    tokio::select! {
        joined = server => match joined {
            Ok(result) => result,
            Err(e) => {
                error!("❌ WebSocket task stopped: {e}");
                Ok(())
            }
        },
        _ = run_ticks(&config, &mut physics, &state) => Ok(()),
        _ = tokio::signal::ctrl_c() => {
            info!("👋 Shutting down");
            Ok(())
        }
    }
}

/// Fixed-rate loop: measured frame delta (capped at `max_dt`), one dynamics
/// step, one frame broadcast.
async fn run_ticks(config: &ServerConfig, physics: &mut PhysicsWorld, state: &Arc<Mutex<SharedSimState>>) {
    let mut ticker = interval(config.tick_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    loop {
        ticker.tick().await;

        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32().min(config.max_dt);
        last = now;

        let mut guard = state.lock().await;
        let sim = &mut *guard;

        if let Some(track) = sim.pending_track.take() {
            let obstacles = physics.set_track(track);
            sim.track = track;
            sim.broadcast(&ServerMessage::Track { track, obstacles });
        }

        let frame = sim.frame(dt);
        let outcome = physics.step(&frame, &mut sim.telemetry, &mut sim.wheels);
        sim.acknowledge(&outcome);
        sim.tick += 1;

        let debug = match &outcome {
            StepOutcome::Stepped(report) => Some(DebugOverlay::from_report(report, CHASSIS_HALF_EXTENTS)),
            _ => None,
        };

        let msg = ServerMessage::Frame {
            tick: sim.tick,
            outcome: outcome.label(),
            telemetry: sim.telemetry,
            chassis: physics.chassis_pose(),
            wheels: sim.wheel_poses(),
            debug,
        };
        sim.broadcast(&msg);
    }
}
