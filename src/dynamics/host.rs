// ==============================================================================
// host.rs — SEAMS BETWEEN THE DYNAMICS STEP AND WHOEVER OWNS THE WORLD
// ------------------------------------------------------------------------------
// ChassisBody   : the rigid body the step reads and pushes on
// RayCaster     : ground queries (ray in, optional hit out)
// TelemetrySink : receives one snapshot per processed tick
// VisualSink    : receives per-wheel transforms
//
// BufferedChassis is an in-memory ChassisBody. The rapier host captures the
// chassis into one, runs the step, then replays the recorded ops onto the real
// body (collect impulses first, apply later).
// ==============================================================================

use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::{Point, Real, Vector};

use crate::dynamics::types::{ChassisState, RayHit, TelemetrySnapshot, WheelId, WheelTransform};

pub trait ChassisBody {
    fn translation(&self) -> Vector<Real>;
    fn rotation(&self) -> UnitQuaternion<Real>;
    fn linear_velocity(&self) -> Vector<Real>;
    fn angular_velocity(&self) -> Vector<Real>;

    fn set_translation(&mut self, translation: Vector<Real>, wake: bool);
    fn set_rotation(&mut self, rotation: UnitQuaternion<Real>, wake: bool);
    fn set_linear_velocity(&mut self, linvel: Vector<Real>, wake: bool);
    fn set_angular_velocity(&mut self, angvel: Vector<Real>, wake: bool);
    fn apply_impulse_at_point(&mut self, impulse: Vector<Real>, point: Point<Real>, wake: bool);

    /// Single consistent read of the body.
    fn state(&self) -> ChassisState {
        ChassisState {
            translation: self.translation(),
            rotation: self.rotation(),
            linvel: self.linear_velocity(),
            angvel: self.angular_velocity(),
        }
    }

    /// Hard reset to `pose`: position, orientation and both velocities.
    fn reset_to(&mut self, pose: &ChassisState) {
        self.set_translation(pose.translation, true);
        self.set_linear_velocity(pose.linvel, true);
        self.set_angular_velocity(pose.angvel, true);
        self.set_rotation(pose.rotation, true);
    }
}

pub trait RayCaster {
    fn cast_ray(
        &self,
        origin: Point<Real>,
        dir: Vector<Real>,
        max_distance: Real,
        solid: bool,
    ) -> Option<RayHit>;
}

impl<F> RayCaster for F
where
    F: Fn(Point<Real>, Vector<Real>, Real, bool) -> Option<RayHit>,
{
    fn cast_ray(&self, origin: Point<Real>, dir: Vector<Real>, max_distance: Real, solid: bool) -> Option<RayHit> {
        self(origin, dir, max_distance, solid)
    }
}

pub trait TelemetrySink {
    fn publish(&mut self, snapshot: TelemetrySnapshot);
}

/// Wholesale overwrite.
impl TelemetrySink for TelemetrySnapshot {
    fn publish(&mut self, snapshot: TelemetrySnapshot) {
        *self = snapshot;
    }
}

pub trait VisualSink {
    fn place_wheel(&mut self, wheel: WheelId, transform: WheelTransform);
}

/// Last transform written for each wheel, indexed by `WheelId::index`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelVisuals(pub [Option<WheelTransform>; 4]);

impl WheelVisuals {
    pub fn get(&self, wheel: WheelId) -> Option<&WheelTransform> {
        self.0[wheel.index()].as_ref()
    }
}

impl VisualSink for WheelVisuals {
    fn place_wheel(&mut self, wheel: WheelId, transform: WheelTransform) {
        self.0[wheel.index()] = Some(transform);
    }
}

// ============================================
// Buffered chassis
// ============================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChassisOp {
    SetTranslation(Vector<Real>),
    SetRotation(UnitQuaternion<Real>),
    SetLinvel(Vector<Real>),
    SetAngvel(Vector<Real>),
    ApplyImpulseAtPoint { impulse: Vector<Real>, point: Point<Real> },
}

#[derive(Debug, Clone)]
pub struct BufferedChassis {
    state: ChassisState,
    ops: Vec<ChassisOp>,
    wake: bool,
}

impl BufferedChassis {
    pub fn new(state: ChassisState) -> Self {
        Self { state, ops: Vec::new(), wake: false }
    }

    pub fn ops(&self) -> &[ChassisOp] {
        &self.ops
    }

    /// True if any recorded op asked to wake the body.
    pub fn wants_wake(&self) -> bool {
        self.wake
    }

    pub fn impulses(&self) -> impl Iterator<Item = (Vector<Real>, Point<Real>)> + '_ {
        self.ops.iter().filter_map(|op| match *op {
            ChassisOp::ApplyImpulseAtPoint { impulse, point } => Some((impulse, point)),
            _ => None,
        })
    }

    pub fn into_ops(self) -> Vec<ChassisOp> {
        self.ops
    }
}

impl ChassisBody for BufferedChassis {
    fn translation(&self) -> Vector<Real> { self.state.translation }
    fn rotation(&self) -> UnitQuaternion<Real> { self.state.rotation }
    fn linear_velocity(&self) -> Vector<Real> { self.state.linvel }
    fn angular_velocity(&self) -> Vector<Real> { self.state.angvel }

    fn set_translation(&mut self, translation: Vector<Real>, wake: bool) {
        self.state.translation = translation;
        self.wake |= wake;
        self.ops.push(ChassisOp::SetTranslation(translation));
    }

    fn set_rotation(&mut self, rotation: UnitQuaternion<Real>, wake: bool) {
        self.state.rotation = rotation;
        self.wake |= wake;
        self.ops.push(ChassisOp::SetRotation(rotation));
    }

    fn set_linear_velocity(&mut self, linvel: Vector<Real>, wake: bool) {
        self.state.linvel = linvel;
        self.wake |= wake;
        self.ops.push(ChassisOp::SetLinvel(linvel));
    }

    fn set_angular_velocity(&mut self, angvel: Vector<Real>, wake: bool) {
        self.state.angvel = angvel;
        self.wake |= wake;
        self.ops.push(ChassisOp::SetAngvel(angvel));
    }

    // Velocity change needs mass properties; the real body handles that on replay.
    fn apply_impulse_at_point(&mut self, impulse: Vector<Real>, point: Point<Real>, wake: bool) {
        self.wake |= wake;
        self.ops.push(ChassisOp::ApplyImpulseAtPoint { impulse, point });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_records_full_pose() {
        let mut chassis = BufferedChassis::new(ChassisState {
            translation: Vector::new(5.0, f32::NAN, 2.0),
            rotation: UnitQuaternion::from_euler_angles(0.3, 0.0, 0.0),
            linvel: Vector::new(1.0, 2.0, 3.0),
            angvel: Vector::new(0.0, 4.0, 0.0),
        });

        let spawn = ChassisState::at_rest(Vector::new(0.0, 1.0, 0.0));
        chassis.reset_to(&spawn);

        assert_eq!(chassis.state(), spawn);
        assert_eq!(chassis.ops().len(), 4);
        assert!(chassis.wants_wake());
    }

    #[test]
    fn test_impulses_do_not_touch_state() {
        let start = ChassisState::at_rest(Vector::new(0.0, 1.0, 0.0));
        let mut chassis = BufferedChassis::new(start);

        chassis.apply_impulse_at_point(Vector::new(10.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), true);

        assert_eq!(chassis.state(), start);
        let impulses: Vec<_> = chassis.impulses().collect();
        assert_eq!(impulses, vec![(Vector::new(10.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0))]);
    }

    #[test]
    fn test_closure_ray_caster() {
        let never = |_: Point<Real>, _: Vector<Real>, _: Real, _: bool| -> Option<RayHit> { None };
        assert!(never.cast_ray(Point::origin(), -Vector::y(), 1.0, true).is_none());
    }
}
