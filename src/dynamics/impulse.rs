use rapier3d::prelude::{Real, Vector};

use crate::dynamics::kinematics::TireBasis;
use crate::dynamics::tire::TireForce;
use crate::dynamics::types::MAX_TIRE_IMPULSE;

/// Tire-frame force back to world space.
#[inline]
pub fn world_force(basis: &TireBasis, force: TireForce) -> Vector<Real> {
    basis.forward * force.long + basis.lateral * force.lat
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TireImpulse {
    Apply(Vector<Real>),
    /// Nothing to push (zero force).
    Empty,
    /// Non-finite component; this wheel's impulse is dropped for the tick.
    Rejected,
}

/// Force * dt, then a hard ceiling on magnitude independent of the friction
/// circle (large dt or force spikes must not blow up the integrator).
pub fn tire_impulse(force: Vector<Real>, dt: Real) -> TireImpulse {
    let mut j = force * dt;

    if !j.iter().all(|c| c.is_finite()) {
        return TireImpulse::Rejected;
    }

    let mag_sq = j.norm_squared();
    if mag_sq <= 0.0 {
        return TireImpulse::Empty;
    }
    if mag_sq > MAX_TIRE_IMPULSE * MAX_TIRE_IMPULSE {
        j *= MAX_TIRE_IMPULSE / mag_sq.sqrt();
    }

    TireImpulse::Apply(j)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::kinematics::tire_basis;
    use approx::assert_relative_eq;
    use rapier3d::na::UnitQuaternion;

    #[test]
    fn test_world_force_uses_basis() {
        let basis = tire_basis(&UnitQuaternion::identity(), 0.0);
        let f = world_force(&basis, TireForce::new(100.0, -50.0));
        assert_relative_eq!(f, Vector::new(-50.0, 0.0, -100.0));
    }

    #[test]
    fn test_impulse_scales_with_dt() {
        let j = tire_impulse(Vector::new(0.0, 0.0, -3000.0), 1.0 / 60.0);
        let TireImpulse::Apply(j) = j else { panic!("expected an impulse") };
        assert_relative_eq!(j.z, -50.0, epsilon = 1e-3);
    }

    #[test]
    fn test_impulse_ceiling() {
        let TireImpulse::Apply(j) = tire_impulse(Vector::new(3000.0, 0.0, 4000.0), 1.0) else {
            panic!("expected an impulse");
        };
        assert_relative_eq!(j.norm(), MAX_TIRE_IMPULSE, epsilon = 1e-2);
        assert_relative_eq!(j.x / j.z, 0.75, epsilon = 1e-5);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert_eq!(tire_impulse(Vector::new(f32::NAN, 0.0, 0.0), 0.016), TireImpulse::Rejected);
        assert_eq!(tire_impulse(Vector::new(1.0, 0.0, 0.0), f32::INFINITY), TireImpulse::Rejected);
    }

    #[test]
    fn test_zero_force_is_empty() {
        assert_eq!(tire_impulse(Vector::zeros(), 0.016), TireImpulse::Empty);
    }
}
