// ==============================================================================
// debug.rs — DEBUG OVERLAY PRIMITIVES (SERVER -> CLIENT)
// ------------------------------------------------------------------------------
// Built from the per-wheel StepReport after a processed tick:
// - DebugRay: suspension raycasts (green grounded, red airborne) and load bars
// - DebugWheel: per-wheel numbers (load, forces, slip, saturation)
// - DebugChassis: chassis box pose
//
// Pure visualization scaffolding, no physics side effects.
// ==============================================================================

use serde::Serialize;

use crate::dynamics::{StepReport, WheelId};

const GROUNDED_COLOR: [f32; 3] = [0.0, 1.0, 0.0];
const AIRBORNE_COLOR: [f32; 3] = [1.0, 0.0, 0.0];

// N mapped to a full-length bar
const LOAD_BAR_SCALE: f32 = 12_000.0;
const LOAD_BAR_MAX_LEN: f32 = 1.25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugRay {
    pub origin: [f32; 3],
    pub direction: [f32; 3],
    pub length: f32,
    pub hit: Option<[f32; 3]>,
    pub color: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugWheel {
    pub id: WheelId,
    pub grounded: bool,
    pub compression: f32,
    pub normal_force: f32,
    pub long_demand: f32,
    pub long_force: f32,
    pub lateral_force: f32,
    pub slip_angle: f32,
    pub saturated: bool,
    pub impulse_rejected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugChassis {
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion xyzw
    pub half_extents: [f32; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugOverlay {
    pub chassis: Option<DebugChassis>,
    pub suspension_rays: Vec<DebugRay>,
    pub load_bars: Vec<DebugRay>,
    pub wheels: Vec<DebugWheel>,
}

fn side_color(wheel: WheelId) -> [f32; 3] {
    if wheel.is_left() {
        [0.2, 0.6, 1.0] // left = blue
    } else {
        [1.0, 0.4, 0.2] // right = red
    }
}

impl DebugOverlay {
    pub fn from_report(report: &StepReport, half_extents: [f32; 3]) -> Self {
        let mut overlay = DebugOverlay::default();
        let chassis = &report.chassis;

        let q = chassis.rotation.quaternion().coords;
        overlay.chassis = Some(DebugChassis {
            position: [chassis.translation.x, chassis.translation.y, chassis.translation.z],
            rotation: [q.x, q.y, q.z, q.w],
            half_extents,
        });

        for w in &report.wheels {
            overlay.suspension_rays.push(DebugRay {
                origin: w.ray_origin,
                direction: w.ray_dir,
                length: w.ray_length,
                hit: w.contact,
                color: if w.grounded { GROUNDED_COLOR } else { AIRBORNE_COLOR },
            });

            if let Some([x, y, z]) = w.contact {
                let norm = (w.load / LOAD_BAR_SCALE).clamp(0.0, 1.0);
                let bar_len = norm.sqrt() * LOAD_BAR_MAX_LEN; // visual exaggeration
                let base = [x, y + 0.03, z];
                overlay.load_bars.push(DebugRay {
                    origin: base,
                    direction: [0.0, 1.0, 0.0],
                    length: bar_len,
                    hit: Some([base[0], base[1] + bar_len, base[2]]),
                    color: side_color(w.wheel),
                });
            }

            overlay.wheels.push(DebugWheel {
                id: w.wheel,
                grounded: w.grounded,
                compression: w.compression,
                normal_force: w.load,
                long_demand: w.long_demand,
                long_force: w.long_force,
                lateral_force: w.lat_force,
                slip_angle: w.slip_angle,
                saturated: w.saturated,
                impulse_rejected: w.impulse_rejected,
            });
        }

        overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{ChassisState, WheelReport};
    use approx::assert_relative_eq;
    use rapier3d::prelude::Vector;

    fn wheel(id: WheelId, contact: Option<[f32; 3]>) -> WheelReport {
        WheelReport {
            wheel: id,
            grounded: contact.is_some(),
            compression: if contact.is_some() { 0.3 } else { 0.0 },
            load: if contact.is_some() { 2943.0 } else { 0.0 },
            long_demand: 0.0,
            long_force: 0.0,
            lat_force: 0.0,
            slip_angle: 0.0,
            saturated: false,
            impulse_rejected: false,
            ray_origin: [0.0, 0.6, 0.0],
            ray_dir: [0.0, -1.0, 0.0],
            ray_length: 0.9,
            contact,
        }
    }

    #[test]
    fn test_ray_colors_follow_contact() {
        let report = StepReport {
            chassis: ChassisState::at_rest(Vector::y()),
            wheels: vec![
                wheel(WheelId::FL, Some([-0.8, 0.0, -1.2])),
                wheel(WheelId::FR, None),
            ],
        };
        let overlay = DebugOverlay::from_report(&report, [0.9, 0.4, 1.9]);

        assert_eq!(overlay.suspension_rays[0].color, GROUNDED_COLOR);
        assert_eq!(overlay.suspension_rays[1].color, AIRBORNE_COLOR);
        assert_eq!(overlay.suspension_rays[1].hit, None);
        assert_eq!(overlay.wheels.len(), 2);
    }

    #[test]
    fn test_load_bars_only_for_grounded() {
        let report = StepReport {
            chassis: ChassisState::at_rest(Vector::y()),
            wheels: vec![
                wheel(WheelId::RL, Some([-0.8, 0.0, 1.2])),
                wheel(WheelId::RR, None),
            ],
        };
        let overlay = DebugOverlay::from_report(&report, [0.9, 0.4, 1.9]);

        assert_eq!(overlay.load_bars.len(), 1);
        let bar = &overlay.load_bars[0];
        assert_relative_eq!(bar.length, (2943.0f32 / 12_000.0).sqrt() * 1.25, epsilon = 1e-5);
        assert_eq!(bar.color, side_color(WheelId::RL));
    }
}
