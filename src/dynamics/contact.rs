// ==============================================================================
// contact.rs — RAYCAST GROUND CONTACT (ONE RAY PER WHEEL)
// ------------------------------------------------------------------------------
// For each wheel:
// - hardpoint = rot * local_offset + translation
// - ray starts RAY_START_OFFSET below the hardpoint along chassis-down so it
//   never starts inside the chassis collider
// - max distance = rest_length + radius - RAY_START_OFFSET
//
// The ray only answers "is there ground, and where". It does NOT produce a
// spring force: wheel load comes from the static weight split in kinematics.rs.
// ==============================================================================

use rapier3d::prelude::{Point, Real, Vector};

use crate::dynamics::host::RayCaster;
use crate::dynamics::types::{ChassisState, RayHit, WheelId, RAY_START_OFFSET};
use crate::vehicle::SuspensionParams;

pub struct WheelRay {
    pub hardpoint: Point<Real>,
    pub down: Vector<Real>,
    pub origin: Point<Real>,
    pub max_dist: Real,
}

pub enum WheelContact {
    /// `hit.distance` is measured from the hardpoint, not the ray origin.
    Grounded(RayHit),
    Airborne,
}

impl WheelContact {
    pub fn is_grounded(&self) -> bool {
        matches!(self, WheelContact::Grounded(_))
    }
}

pub fn build_wheel_ray(
    chassis: &ChassisState,
    wheel: WheelId,
    suspension: &SuspensionParams,
) -> WheelRay {
    let rot = chassis.rotation;
    let hardpoint = Point::from(rot * wheel.local_offset() + chassis.translation);
    let down = rot * Vector::new(0.0, -1.0, 0.0);
    let origin = hardpoint + down * RAY_START_OFFSET;
    let max_dist = (suspension.rest_length + suspension.radius - RAY_START_OFFSET).max(0.0);

    WheelRay { hardpoint, down, origin, max_dist }
}

pub fn resolve_contact<W: RayCaster>(world: &W, ray: &WheelRay) -> WheelContact {
    match world.cast_ray(ray.origin, ray.down, ray.max_dist, true) {
        Some(hit) => WheelContact::Grounded(RayHit {
            distance: hit.distance + RAY_START_OFFSET,
            point: ray.origin + ray.down * hit.distance,
            normal: hit.normal,
        }),
        None => WheelContact::Airborne,
    }
}

/// Wheel centre when the ray finds nothing: hanging at rest length.
pub fn droop_position(ray: &WheelRay, suspension: &SuspensionParams) -> Point<Real> {
    ray.hardpoint + ray.down * suspension.rest_length
}

/// How far the wheel is pushed up from full extension. Recorded for
/// diagnostics only.
pub fn compression(hit: &RayHit, suspension: &SuspensionParams) -> Real {
    (suspension.rest_length + suspension.radius - hit.distance).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::VehicleParams;
    use approx::assert_relative_eq;
    use rapier3d::na::UnitQuaternion;

    fn flat_ground(origin: Point<Real>, dir: Vector<Real>, max: Real, _solid: bool) -> Option<RayHit> {
        if dir.y >= 0.0 {
            return None;
        }
        let t = origin.y / -dir.y;
        (t >= 0.0 && t <= max).then(|| RayHit {
            distance: t,
            point: origin + dir * t,
            normal: Vector::y(),
        })
    }

    #[test]
    fn test_ray_geometry_upright() {
        let params = VehicleParams::default();
        let chassis = ChassisState::at_rest(Vector::new(0.0, 1.0, 0.0));
        let ray = build_wheel_ray(&chassis, WheelId::FL, &params.suspension);

        assert_relative_eq!(ray.hardpoint, Point::new(-0.8, 0.5, -1.2), epsilon = 1e-6);
        assert_relative_eq!(ray.origin, Point::new(-0.8, 0.4, -1.2), epsilon = 1e-6);
        assert_relative_eq!(ray.down, Vector::new(0.0, -1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(ray.max_dist, 0.7, epsilon = 1e-6);
    }

    #[test]
    fn test_ray_follows_chassis_roll() {
        let params = VehicleParams::default();
        let mut chassis = ChassisState::at_rest(Vector::new(0.0, 1.0, 0.0));
        chassis.rotation = UnitQuaternion::from_axis_angle(&Vector::z_axis(), std::f32::consts::FRAC_PI_2);
        let ray = build_wheel_ray(&chassis, WheelId::RR, &params.suspension);

        // local -Y rolled 90° about Z points along +X
        assert_relative_eq!(ray.down, Vector::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_grounded_distance_is_from_hardpoint() {
        let params = VehicleParams::default();
        let chassis = ChassisState::at_rest(Vector::new(0.0, 1.0, 0.0));
        let ray = build_wheel_ray(&chassis, WheelId::RL, &params.suspension);

        let WheelContact::Grounded(hit) = resolve_contact(&flat_ground, &ray) else {
            panic!("expected ground under the wheel");
        };

        assert_relative_eq!(hit.distance, 0.5, epsilon = 1e-6);
        assert_relative_eq!(hit.point, Point::new(-0.8, 0.0, 1.2), epsilon = 1e-6);
        assert_relative_eq!(compression(&hit, &params.suspension), 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_out_of_reach_is_airborne() {
        let params = VehicleParams::default();
        let chassis = ChassisState::at_rest(Vector::new(0.0, 3.0, 0.0));
        let ray = build_wheel_ray(&chassis, WheelId::FR, &params.suspension);

        assert!(!resolve_contact(&flat_ground, &ray).is_grounded());
        assert_relative_eq!(droop_position(&ray, &params.suspension), Point::new(0.8, 2.0, -1.2), epsilon = 1e-6);
    }
}
