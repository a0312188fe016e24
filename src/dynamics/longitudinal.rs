// ==============================================================================
// longitudinal.rs — DRIVE / BRAKE / TORQUE VECTORING FORCE LAW
// ==============================================================================
// Rear in-wheel motors:
//     F_base = throttle * max_drive_force
//     M_req  = steer * speed * tv_gain
//     RL = 0.5 * F_base - M_req
//     RR = 0.5 * F_base + M_req
// Positive steer is a left turn, so the outer (right) wheel gets more drive
// and the yaw moment points into the turn.
//
// Brakes (all wheels, only while throttle is released):
//     F = -0.5 * brake * max_brake_force
//
// Throttle wins over brake on every wheel: there is never a tick where a
// motor pushes and a brake pulls at the same time.
// ===============================================================================

use rapier3d::prelude::Real;

use crate::dynamics::types::WheelId;
use crate::vehicle::{DriverInput, PowertrainParams};

/// Yaw-moment demand expressed as a force offset between RL and RR.
#[inline]
pub fn torque_vectoring_split(steer: Real, speed: Real, tv_gain: Real) -> Real {
    steer * speed * tv_gain
}

#[inline]
fn brake_force(brake: Real, powertrain: &PowertrainParams) -> Real {
    -0.5 * brake * powertrain.max_brake_force
}

/// Longitudinal force demand for one wheel, before the friction circle.
pub fn longitudinal_force(
    wheel: WheelId,
    input: &DriverInput,
    speed: Real,
    powertrain: &PowertrainParams,
) -> Real {
    let driving = input.throttle > 0.0;
    let braking = !driving && input.brake > 0.0;

    if wheel.is_rear() && driving {
        let base = input.throttle * powertrain.max_drive_force;
        let m_req = torque_vectoring_split(input.steer, speed, powertrain.tv_gain);

        return match wheel {
            WheelId::RL => 0.5 * base - m_req,
            _ => 0.5 * base + m_req,
        };
    }

    if braking {
        return brake_force(input.brake, powertrain);
    }

    0.0
}
