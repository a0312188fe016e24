use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::dynamics::{Frame, StepControl, StepOutcome, TelemetrySnapshot, WheelId, WheelVisuals};
use crate::net::ServerMessage;
use crate::track::TrackType;
use crate::vehicle::{DriverInput, VehicleParams};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WheelPose {
    pub id: WheelId,
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion xyzw
}

/// Everything the websocket tasks and the tick loop share.
pub struct SharedSimState {
    pub tick: u64,
    pub clients: HashMap<Uuid, UnboundedSender<String>>,

    pub params: VehicleParams,
    pub input: DriverInput,
    pub paused: bool,
    pub reset_requested: bool,

    pub track: TrackType,
    /// Requested by a client, built by the tick loop.
    pub pending_track: Option<TrackType>,

    pub telemetry: TelemetrySnapshot,
    pub wheels: WheelVisuals,
}

impl SharedSimState {
    pub fn new(params: VehicleParams, track: TrackType) -> Self {
        Self {
            tick: 0,
            clients: HashMap::new(),
            params,
            input: DriverInput::default(),
            paused: false,
            reset_requested: false,
            track,
            pending_track: None,
            telemetry: TelemetrySnapshot::default(),
            wheels: WheelVisuals::default(),
        }
    }

    pub fn register_client(&mut self, tx: UnboundedSender<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.clients.insert(id, tx);
        id
    }

    pub fn remove_client(&mut self, id: &Uuid) {
        self.clients.remove(id);
    }

    pub fn control(&self) -> StepControl {
        StepControl {
            paused: self.paused,
            reset_requested: self.reset_requested,
        }
    }

    /// Snapshot of params, input and flags for one tick.
    pub fn frame(&self, dt: f32) -> Frame {
        Frame {
            dt,
            params: self.params,
            input: self.input,
            control: self.control(),
        }
    }

    /// A completed reset clears the request.
    pub fn acknowledge(&mut self, outcome: &StepOutcome) {
        if matches!(outcome, StepOutcome::Reset) {
            self.reset_requested = false;
        }
    }

    pub fn wheel_poses(&self) -> Vec<WheelPose> {
        WheelId::ALL
            .iter()
            .filter_map(|&id| {
                let t = self.wheels.get(id)?;
                let q = t.orientation.quaternion().coords;
                Some(WheelPose {
                    id,
                    position: [t.position.x, t.position.y, t.position.z],
                    rotation: [q.x, q.y, q.z, q.w],
                })
            })
            .collect()
    }

    /// Send to every client; closed channels are dropped.
    pub fn broadcast(&mut self, msg: &ServerMessage) {
        if self.clients.is_empty() {
            return;
        }

        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                warn!("⚠️ Failed to encode broadcast: {e}");
                return;
            }
        };

        self.clients.retain(|_, tx| tx.send(json.clone()).is_ok());
    }
}
