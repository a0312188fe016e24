//! Core shared types for `dynamics` (engine-agnostic).
// dynamics/types.rs
use std::fmt;

use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::{Point, Real, Vector};
use serde::Serialize;

pub const GRAVITY: Real = 9.81;             // m/s^2
pub const RAY_START_OFFSET: Real = 0.1;     // m, keeps the ray clear of the chassis collider
pub const MAX_TIRE_IMPULSE: Real = 1000.0;  // N*s, per wheel per tick
pub const MIN_SLIP_SPEED: Real = 0.1;       // m/s, below this the slip angle is 0

// ============================================
// Wheel identification
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum WheelId { FL, FR, RL, RR }

impl WheelId {
    pub const ALL: [WheelId; 4] = [WheelId::FL, WheelId::FR, WheelId::RL, WheelId::RR];

    pub fn index(self) -> usize {
        match self {
            WheelId::FL => 0,
            WheelId::FR => 1,
            WheelId::RL => 2,
            WheelId::RR => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::FR)
    }

    pub fn is_rear(&self) -> bool {
        matches!(self, WheelId::RL | WheelId::RR)
    }

    pub fn is_left(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::RL)
    }

    /// Hardpoint in chassis space (-Z forward, +Y up, +X right).
    pub fn local_offset(self) -> Vector<Real> {
        match self {
            WheelId::FL => Vector::new(-0.8, -0.5, -1.2),
            WheelId::FR => Vector::new( 0.8, -0.5, -1.2),
            WheelId::RL => Vector::new(-0.8, -0.5,  1.2),
            WheelId::RR => Vector::new( 0.8, -0.5,  1.2),
        }
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Chassis + ground
// ============================================

/// Rigid-body state read once at the start of a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisState {
    pub translation: Vector<Real>,
    pub rotation: UnitQuaternion<Real>,
    pub linvel: Vector<Real>,
    pub angvel: Vector<Real>,
}

impl ChassisState {
    /// At rest at `translation`, upright.
    pub fn at_rest(translation: Vector<Real>) -> Self {
        Self {
            translation,
            rotation: UnitQuaternion::identity(),
            linvel: Vector::zeros(),
            angvel: Vector::zeros(),
        }
    }

    /// Pose check only; velocities are not part of the invariant.
    pub fn pose_is_finite(&self) -> bool {
        let q = self.rotation.quaternion();
        self.translation.iter().all(|c| c.is_finite())
            && q.coords.iter().all(|c| c.is_finite())
    }
}

/// Ray-cast result, world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: Real,         // along the ray from its origin
    pub point: Point<Real>,
    pub normal: Vector<Real>,
}

// ============================================
// Outputs
// ============================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelTransform {
    pub position: Point<Real>,
    pub orientation: UnitQuaternion<Real>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub speed: f32,             // m/s
    pub steer_angle: f32,       // rad
    pub yaw_rate: f32,          // rad/s
    pub throttle: f32,          // 0..1
    pub brake: f32,             // 0..1
    pub wheel_loads: [f32; 4],  // N, FL FR RL RR
    pub wheel_forces: [f32; 4], // N, longitudinal demand
}

#[inline]
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}

impl TelemetrySnapshot {
    /// Coerce every non-finite component to 0.
    pub fn sanitized(self) -> Self {
        Self {
            speed: finite_or_zero(self.speed),
            steer_angle: finite_or_zero(self.steer_angle),
            yaw_rate: finite_or_zero(self.yaw_rate),
            throttle: finite_or_zero(self.throttle),
            brake: finite_or_zero(self.brake),
            wheel_loads: self.wheel_loads.map(finite_or_zero),
            wheel_forces: self.wheel_forces.map(finite_or_zero),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_axles() {
        for id in WheelId::ALL {
            assert_ne!(id.is_front(), id.is_rear());
            assert_eq!(WheelId::ALL[id.index()], id);
        }
        assert!(WheelId::FL.local_offset().z < 0.0, "front wheels sit toward -Z");
        assert!(WheelId::RR.local_offset().x > 0.0, "right wheels sit toward +X");
    }

    #[test]
    fn test_pose_finiteness() {
        let mut state = ChassisState::at_rest(Vector::new(0.0, 1.0, 0.0));
        assert!(state.pose_is_finite());

        state.linvel = Vector::new(f32::NAN, 0.0, 0.0);
        assert!(state.pose_is_finite());

        state.translation.y = f32::INFINITY;
        assert!(!state.pose_is_finite());
    }

    #[test]
    fn test_sanitized_telemetry() {
        let snap = TelemetrySnapshot {
            speed: f32::NAN,
            yaw_rate: f32::NEG_INFINITY,
            throttle: 1.0,
            wheel_loads: [2943.0, f32::NAN, 0.0, 1.0],
            ..Default::default()
        }
        .sanitized();

        assert_eq!(snap.speed, 0.0);
        assert_eq!(snap.yaw_rate, 0.0);
        assert_eq!(snap.throttle, 1.0);
        assert_eq!(snap.wheel_loads, [2943.0, 0.0, 0.0, 1.0]);
    }
}
