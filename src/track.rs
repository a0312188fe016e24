// ==============================================================================
// track.rs — TEST TRACK LAYOUTS
// ------------------------------------------------------------------------------
// straight : ground only (straight-line + braking)
// slalom   : 8 solid cones, 8 m apart along -Z, alternating x = +3 / -3
// circle   : 16 non-solid markers on a 15 m radius (steady-state cornering)
//
// Layouts are plain data; physics.rs turns them into colliders.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

pub const SLALOM_CONES: usize = 8;
pub const SLALOM_START_Z: f32 = -30.0;
pub const SLALOM_SPACING: f32 = 8.0;
pub const SLALOM_OFFSET_X: f32 = 3.0;
pub const CONE_RADIUS: f32 = 0.3;
pub const CONE_HEIGHT: f32 = 1.0;

pub const CIRCLE_MARKERS: usize = 16;
pub const CIRCLE_RADIUS: f32 = 15.0;
pub const MARKER_RADIUS: f32 = 0.2;
pub const MARKER_HEIGHT: f32 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    #[default]
    Straight,
    Circle,
    Slalom,
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Straight => write!(f, "straight"),
            Self::Circle => write!(f, "circle"),
            Self::Slalom => write!(f, "slalom"),
        }
    }
}

impl std::str::FromStr for TrackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "straight" | "" => Ok(Self::Straight),
            "circle" | "skidpad" => Ok(Self::Circle),
            "slalom" => Ok(Self::Slalom),
            _ => Err(format!("Unknown track: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    Cone,
    Marker,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub position: [f32; 3],
    pub radius: f32,
    pub height: f32,
    /// Markers are visual only; the chassis drives through them.
    pub solid: bool,
}

impl TrackType {
    pub fn obstacles(self) -> Vec<Obstacle> {
        match self {
            TrackType::Straight => Vec::new(),

            TrackType::Slalom => (0..SLALOM_CONES)
                .map(|i| {
                    let x = if i % 2 == 0 { SLALOM_OFFSET_X } else { -SLALOM_OFFSET_X };
                    Obstacle {
                        kind: ObstacleKind::Cone,
                        position: [x, CONE_HEIGHT * 0.5, SLALOM_START_Z + SLALOM_SPACING * i as f32],
                        radius: CONE_RADIUS,
                        height: CONE_HEIGHT,
                        solid: true,
                    }
                })
                .collect(),

            TrackType::Circle => (0..CIRCLE_MARKERS)
                .map(|i| {
                    let theta = TAU * i as f32 / CIRCLE_MARKERS as f32;
                    Obstacle {
                        kind: ObstacleKind::Marker,
                        position: [CIRCLE_RADIUS * theta.cos(), MARKER_HEIGHT, CIRCLE_RADIUS * theta.sin()],
                        radius: MARKER_RADIUS,
                        height: 2.0 * MARKER_HEIGHT,
                        solid: false,
                    }
                })
                .collect(),
        }
    }
}
