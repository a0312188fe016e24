// ==============================================================================
// tire.rs — LATERAL FORCE + FRICTION CIRCLE
// ------------------------------------------------------------------------------
// Lateral: linear cornering stiffness, no saturation of its own
//     F_lat = C_alpha * alpha
//
// Friction circle: (F_long, F_lat) is one 2-D force. If its magnitude exceeds
//     F_max = mu * Fz
// the whole vector is rescaled to F_max, keeping its direction. Clamping each
// axis on its own would let a braking tire keep full cornering grip.
// ==============================================================================

use rapier3d::prelude::Real;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TireForce {
    pub long: Real,     // N, along tire forward
    pub lat: Real,      // N, along tire lateral (right)
}

impl TireForce {
    pub fn new(long: Real, lat: Real) -> Self {
        Self { long, lat }
    }

    #[inline]
    pub fn magnitude(&self) -> Real {
        self.long.hypot(self.lat)
    }

    /// Returns the clamped force and whether the circle was reached.
    pub fn clamp_to_circle(self, f_max: Real) -> (Self, bool) {
        let mag = self.magnitude();
        if mag > f_max && mag > 0.0 {
            let s = f_max.max(0.0) / mag;
            (Self::new(self.long * s, self.lat * s), true)
        } else {
            (self, false)
        }
    }
}

#[inline]
pub fn lateral_force(cornering_stiffness: Real, slip_angle: Real) -> Real {
    cornering_stiffness * slip_angle
}

#[inline]
pub fn friction_limit(friction_coeff: Real, load: Real) -> Real {
    friction_coeff * load
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pure_longitudinal_clamp() {
        let (f, saturated) = TireForce::new(3000.0, 0.0).clamp_to_circle(friction_limit(1.0, 2943.0));
        assert!(saturated);
        assert_relative_eq!(f.long, 2943.0, epsilon = 1e-2);
        assert_eq!(f.lat, 0.0);
    }

    #[test]
    fn test_inside_circle_untouched() {
        let f = TireForce::new(1000.0, -1500.0);
        assert_eq!(f.clamp_to_circle(2943.0), (f, false));
    }

    #[test]
    fn test_combined_clamp_keeps_direction() {
        let f = TireForce::new(-4000.0, 3000.0);
        let (c, saturated) = f.clamp_to_circle(2500.0);

        assert!(saturated);
        assert_relative_eq!(c.magnitude(), 2500.0, epsilon = 1e-2);
        assert_relative_eq!(c.long / c.lat, f.long / f.lat, epsilon = 1e-5);
    }

    #[test]
    fn test_circle_bound_holds_across_demands() {
        let f_max = friction_limit(0.8, 2943.0);
        for long in [-8000.0, -4000.0, 0.0, 2000.0, 6000.0] {
            for alpha in [-0.6, -0.1, 0.0, 0.05, 0.4] {
                let (c, _) = TireForce::new(long, lateral_force(5000.0, alpha)).clamp_to_circle(f_max);
                assert!(c.magnitude() <= f_max + 1e-2, "{long} {alpha} -> {}", c.magnitude());
            }
        }
    }

    #[test]
    fn test_lateral_is_linear() {
        assert_relative_eq!(lateral_force(5000.0, -0.1), -500.0);
        assert_eq!(lateral_force(0.0, 0.3), 0.0);
    }
}
