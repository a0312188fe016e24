// ==============================================================================
// kinematics.rs — CONTACT-POINT VELOCITY, TIRE BASIS + SLIP (WORLD SPACE)
// ------------------------------------------------------------------------------
// tire_basis(rot, steer):
// - chassis forward = rot * [0,0,-1]   (-Z is forward)
// - chassis up      = rot * [0,1,0]
// - forward is rotated about chassis up by the steer angle (front wheels only,
//   rear wheels pass 0)
// - lateral = forward × up, normalized (points to the tire's right)
//
// slip_components(v, basis) projects the contact-point velocity:
//     v_long = dot(v, forward)
//     v_lat  = dot(v, lateral)
// ==============================================================================

use rapier3d::na::{Unit, UnitQuaternion};
use rapier3d::prelude::{Real, Vector};

use crate::dynamics::types::{GRAVITY, MIN_SLIP_SPEED};

/// World-space velocity of a point rigidly attached to the chassis:
/// v(p) = v + ω × r, with r = p - chassis translation
#[inline]
pub fn point_velocity(linvel: Vector<Real>, angvel: Vector<Real>, r: Vector<Real>) -> Vector<Real> {
    linvel + angvel.cross(&r)
}

/// Static per-wheel load, equal on all four wheels. No load transfer.
#[inline]
pub fn static_wheel_load(mass: Real) -> Real {
    mass * GRAVITY / 4.0
}

#[derive(Debug, Clone, Copy)]
pub struct TireBasis {
    pub forward: Vector<Real>,
    pub lateral: Vector<Real>,
    pub up: Vector<Real>,
}

pub fn tire_basis(rot: &UnitQuaternion<Real>, steer_angle: Real) -> TireBasis {
    let chassis_forward = rot * Vector::new(0.0, 0.0, -1.0);
    let up = rot * Vector::new(0.0, 1.0, 0.0);

    let steer_rot = UnitQuaternion::from_axis_angle(&Unit::new_normalize(up), steer_angle);
    let forward = steer_rot * chassis_forward;
    let lateral = forward.cross(&up).normalize();

    TireBasis { forward, lateral, up }
}

/// (v_long, v_lat) of a point velocity in the tire basis.
#[inline]
pub fn slip_components(point_vel: Vector<Real>, basis: &TireBasis) -> (Real, Real) {
    (point_vel.dot(&basis.forward), point_vel.dot(&basis.lateral))
}

/// α = atan2(-v_lat, |v_long|). Zero near standstill, where the angle is
/// mostly noise.
#[inline]
pub fn slip_angle(v_long: Real, v_lat: Real) -> Real {
    if v_long.abs() > MIN_SLIP_SPEED {
        (-v_lat).atan2(v_long.abs())
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_point_velocity_includes_rotation() {
        // yawing left at 1 rad/s, point 1 m to the right of centre
        let v = point_velocity(Vector::zeros(), Vector::new(0.0, 1.0, 0.0), Vector::new(1.0, 0.0, 0.0));
        assert_relative_eq!(v, Vector::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_static_loads_conserve_weight() {
        let mass = 1200.0;
        let fz = static_wheel_load(mass);
        assert_relative_eq!(fz, 2943.0, epsilon = 1e-2);
        assert_relative_eq!(fz * 4.0, mass * GRAVITY, epsilon = 1e-2);
    }

    #[test]
    fn test_straight_basis() {
        let basis = tire_basis(&UnitQuaternion::identity(), 0.0);
        assert_relative_eq!(basis.forward, Vector::new(0.0, 0.0, -1.0));
        assert_relative_eq!(basis.lateral, Vector::new(1.0, 0.0, 0.0));
        assert_relative_eq!(basis.up, Vector::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_positive_steer_turns_left() {
        let basis = tire_basis(&UnitQuaternion::identity(), 0.3);
        assert!(basis.forward.x < 0.0, "left of -Z is -X");
        assert_abs_diff_eq!(basis.forward.dot(&basis.lateral), 0.0, epsilon = 1e-6);
        assert_relative_eq!(basis.lateral.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_basis_follows_chassis_yaw() {
        let rot = UnitQuaternion::from_axis_angle(&Vector::y_axis(), FRAC_PI_4);
        let steered = tire_basis(&UnitQuaternion::identity(), FRAC_PI_4);
        let yawed = tire_basis(&rot, 0.0);
        assert_relative_eq!(steered.forward, yawed.forward, epsilon = 1e-6);
    }

    #[test]
    fn test_slip_angle_opposes_lateral_slide() {
        let basis = tire_basis(&UnitQuaternion::identity(), 0.0);
        // moving forward at 10 m/s while sliding right at 1 m/s
        let (v_long, v_lat) = slip_components(Vector::new(1.0, 0.0, -10.0), &basis);
        assert_relative_eq!(v_long, 10.0);
        assert_relative_eq!(v_lat, 1.0);

        let alpha = slip_angle(v_long, v_lat);
        assert!(alpha < 0.0);
        assert_relative_eq!(alpha, (-1.0f32).atan2(10.0));
    }

    #[test]
    fn test_slip_angle_same_when_reversing() {
        assert_relative_eq!(slip_angle(-10.0, 1.0), slip_angle(10.0, 1.0));
    }

    #[test]
    fn test_slip_angle_zero_near_standstill() {
        assert_eq!(slip_angle(0.05, 3.0), 0.0);
        assert_eq!(slip_angle(-0.1, 3.0), 0.0);
    }
}
