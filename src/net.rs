use std::sync::Arc;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::accept_async;
use tungstenite::Message;

use crate::debug::DebugOverlay;
use crate::dynamics::TelemetrySnapshot;
use crate::error::{Result, SimError};
use crate::physics::ChassisPose;
use crate::state::{SharedSimState, WheelPose};
use crate::track::{Obstacle, TrackType};
use crate::vehicle::{DriverInput, KeyState, ParamsPatch, VehicleParams};

// ============================================
// Wire messages
// ============================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Input {
        #[serde(default)]
        throttle: f32,
        #[serde(default)]
        brake: f32,
        #[serde(default)]
        steer: f32,
    },
    Keys(KeyState),
    Params { params: ParamsPatch },
    Pause { paused: bool },
    Reset,
    Track { track: TrackType },
    Ping,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Welcome {
        client_id: String,
        params: VehicleParams,
        track: TrackType,
        obstacles: Vec<Obstacle>,
    },
    Params { params: VehicleParams },
    Track { track: TrackType, obstacles: Vec<Obstacle> },
    Error { message: String },
    Pong,
    Frame {
        tick: u64,
        outcome: &'static str,
        telemetry: TelemetrySnapshot,
        chassis: Option<ChassisPose>,
        wheels: Vec<WheelPose>,
        debug: Option<DebugOverlay>,
    },
}

/// What to send back after handling one client message.
#[derive(Debug)]
pub enum Reply {
    Nothing,
    Direct(ServerMessage),
    Broadcast(ServerMessage),
}

fn rejected(err: SimError) -> Reply {
    warn!("⚠️ Rejected client message: {err}");
    Reply::Direct(ServerMessage::Error { message: err.to_string() })
}

/// Decode one text frame and apply it to the shared state.
pub fn handle_client_text(state: &mut SharedSimState, text: &str) -> Reply {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => return rejected(SimError::from(e)),
    };

    match msg {
        ClientMessage::Input { throttle, brake, steer } => {
            state.input = DriverInput::new(throttle, brake, steer);
            Reply::Nothing
        }
        ClientMessage::Keys(keys) => {
            state.input = DriverInput::from_keys(keys);
            Reply::Nothing
        }
        ClientMessage::Params { params } => match state.params.apply_patch(&params) {
            Ok(()) => {
                debug!("🔧 Params updated: {:?}", state.params);
                Reply::Broadcast(ServerMessage::Params { params: state.params })
            }
            Err(e) => rejected(e),
        },
        ClientMessage::Pause { paused } => {
            if state.paused != paused {
                info!("{} simulation", if paused { "⏸️ Pausing" } else { "▶️ Resuming" });
            }
            state.paused = paused;
            Reply::Nothing
        }
        ClientMessage::Reset => {
            state.reset_requested = true;
            Reply::Nothing
        }
        ClientMessage::Track { track } => {
            state.pending_track = Some(track);
            Reply::Nothing
        }
        ClientMessage::Ping => Reply::Direct(ServerMessage::Pong),
    }
}

fn encode(msg: &ServerMessage) -> Option<String> {
    serde_json::to_string(msg)
        .map_err(|e| warn!("⚠️ Failed to encode message: {e}"))
        .ok()
}

pub async fn start_websocket_server(bind: String, state: Arc<Mutex<SharedSimState>>) -> Result<()> {
    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|source| SimError::Bind { addr: bind.clone(), source })?;

    info!("🌐 WebSocket listening on ws://{}", bind);

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("⚠️ Accept failed: {e}");
                continue;
            }
        };

        tokio::spawn(handle_connection(raw, peer.to_string(), Arc::clone(&state)));
    }
}

async fn handle_connection(raw: TcpStream, peer: String, state: Arc<Mutex<SharedSimState>>) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("⚠️ WebSocket handshake with {peer} failed: {e}");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing channel + send loop
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // -------------------------------
    // 2) Register + welcome
    // -------------------------------
    let client_id = {
        let mut sim = state.lock().await;
        let id = sim.register_client(tx.clone());

        let welcome = ServerMessage::Welcome {
            client_id: id.to_string(),
            params: sim.params,
            track: sim.track,
            obstacles: sim.track.obstacles(),
        };
        if let Some(json) = encode(&welcome) {
            let _ = tx.send(json);
        }
        id
    };

    info!("🟢 Client connected: {} ({})", client_id, peer);

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let mut sim = state.lock().await;
        match handle_client_text(&mut sim, &text) {
            Reply::Nothing => {}
            Reply::Direct(reply) => {
                if let Some(json) = encode(&reply) {
                    let _ = tx.send(json);
                }
            }
            Reply::Broadcast(reply) => sim.broadcast(&reply),
        }
    }

    info!("🔴 Client disconnected: {}", client_id);
    state.lock().await.remove_client(&client_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SharedSimState {
        SharedSimState::new(VehicleParams::default(), TrackType::Straight)
    }

    #[test]
    fn test_input_is_clamped() {
        let mut s = state();
        let reply = handle_client_text(&mut s, r#"{"type":"input","throttle":2.5,"steer":-3}"#);

        assert!(matches!(reply, Reply::Nothing));
        assert_eq!(s.input, DriverInput::new(1.0, 0.0, -1.0));
    }

    #[test]
    fn test_keys_map_to_input() {
        let mut s = state();
        handle_client_text(&mut s, r#"{"type":"keys","forward":true,"left":true}"#);
        assert_eq!(s.input, DriverInput::new(1.0, 0.0, 1.0));

        handle_client_text(&mut s, r#"{"type":"keys","backward":true,"left":true,"right":true}"#);
        assert_eq!(s.input, DriverInput::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_params_patch_broadcasts() {
        let mut s = state();
        let reply = handle_client_text(&mut s, r#"{"type":"params","params":{"powertrain":{"tvGain":250}}}"#);

        let Reply::Broadcast(ServerMessage::Params { params }) = reply else {
            panic!("expected a params broadcast, got {reply:?}");
        };
        assert_eq!(params.powertrain.tv_gain, 250.0);
        assert_eq!(s.params.powertrain.tv_gain, 250.0);
    }

    #[test]
    fn test_bad_params_leave_store_untouched() {
        let mut s = state();
        let reply = handle_client_text(&mut s, r#"{"type":"params","params":{"mass":1500,"tires":{"frictionCoeff":9.0}}}"#);

        assert!(matches!(reply, Reply::Direct(ServerMessage::Error { .. })));
        assert_eq!(s.params, VehicleParams::default());
    }

    #[test]
    fn test_flags_and_track_requests() {
        let mut s = state();
        handle_client_text(&mut s, r#"{"type":"pause","paused":true}"#);
        handle_client_text(&mut s, r#"{"type":"reset"}"#);
        handle_client_text(&mut s, r#"{"type":"track","track":"slalom"}"#);

        assert!(s.paused);
        assert!(s.reset_requested);
        assert_eq!(s.pending_track, Some(TrackType::Slalom));
        assert_eq!(s.track, TrackType::Straight, "applied by the tick loop");
    }

    #[test]
    fn test_ping_pong() {
        let mut s = state();
        let Reply::Direct(reply) = handle_client_text(&mut s, r#"{"type":"ping"}"#) else {
            panic!("expected a direct reply");
        };
        assert_eq!(serde_json::to_string(&reply).unwrap(), r#"{"type":"pong"}"#);
    }

    #[test]
    fn test_malformed_message_errors() {
        let mut s = state();
        for text in ["not json", r#"{"type":"warp"}"#, r#"{"type":"pause"}"#] {
            let reply = handle_client_text(&mut s, text);
            assert!(matches!(reply, Reply::Direct(ServerMessage::Error { .. })), "{text}");
        }
    }

    #[test]
    fn test_welcome_shape() {
        let msg = ServerMessage::Welcome {
            client_id: "abc".into(),
            params: VehicleParams::default(),
            track: TrackType::Slalom,
            obstacles: TrackType::Slalom.obstacles(),
        };
        let value: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["type"], "welcome");
        assert_eq!(value["clientId"], "abc");
        assert_eq!(value["track"], "slalom");
        assert_eq!(value["obstacles"].as_array().unwrap().len(), 8);
        assert_eq!(value["params"]["powertrain"]["tvGain"], 100.0);
    }
}
