use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspensionParams {
    pub stiffness: f32,     // N/m (kept for tuning, not applied)
    pub damping: f32,       // N*s/m (kept for tuning, not applied)
    pub rest_length: f32,   // m
    pub radius: f32,        // m, tire radius
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TireParams {
    pub friction_coeff: f32,        // mu
    pub cornering_stiffness: f32,   // N/rad
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowertrainParams {
    pub max_drive_force: f32,   // N, both rear motors combined
    pub max_brake_force: f32,   // N, per axle pair
    pub tv_gain: f32,           // N per (m/s) of speed at full steer
}

/// Tunable vehicle parameters. Owned by the simulation state, edited by
/// clients between ticks and handed to the dynamics step as an immutable
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleParams {
    pub mass: f32,                  // kg
    pub suspension: SuspensionParams,
    pub tires: TireParams,
    pub powertrain: PowertrainParams,
    pub max_steer_angle: f32,       // rad
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            mass: 1200.0,
            suspension: SuspensionParams {
                stiffness: 20_000.0,
                damping: 4000.0,
                rest_length: 0.5,
                radius: 0.3,
            },
            tires: TireParams {
                friction_coeff: 1.0,
                cornering_stiffness: 5000.0,
            },
            powertrain: PowertrainParams {
                max_drive_force: 6000.0,
                max_brake_force: 8000.0,
                tv_gain: 100.0,
            },
            max_steer_angle: 0.5,
        }
    }
}

fn check(field: &'static str, value: f32, ok: bool, rule: &str) -> Result<()> {
    if value.is_finite() && ok {
        Ok(())
    } else {
        Err(SimError::InvalidParam {
            field,
            reason: format!("{value} must be {rule}"),
        })
    }
}

fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    check(field, value, (min..=max).contains(&value), &format!("within [{min}, {max}]"))
}

impl VehicleParams {
    /// Physical validity: the ranges the dynamics step relies on.
    pub fn validate(&self) -> Result<()> {
        check("mass", self.mass, self.mass > 0.0, "> 0")?;
        check("suspension.restLength", self.suspension.rest_length, self.suspension.rest_length > 0.0, "> 0")?;
        check("suspension.radius", self.suspension.radius, self.suspension.radius > 0.0, "> 0")?;
        check("suspension.stiffness", self.suspension.stiffness, self.suspension.stiffness >= 0.0, ">= 0")?;
        check("suspension.damping", self.suspension.damping, self.suspension.damping >= 0.0, ">= 0")?;
        check("tires.frictionCoeff", self.tires.friction_coeff, self.tires.friction_coeff > 0.0, "> 0")?;
        check("tires.corneringStiffness", self.tires.cornering_stiffness, self.tires.cornering_stiffness >= 0.0, ">= 0")?;
        check("powertrain.maxDriveForce", self.powertrain.max_drive_force, self.powertrain.max_drive_force >= 0.0, ">= 0")?;
        check("powertrain.maxBrakeForce", self.powertrain.max_brake_force, self.powertrain.max_brake_force >= 0.0, ">= 0")?;
        check("powertrain.tvGain", self.powertrain.tv_gain, self.powertrain.tv_gain >= 0.0, ">= 0")?;
        check("maxSteerAngle", self.max_steer_angle, self.max_steer_angle > 0.0, "> 0")?;
        Ok(())
    }

    /// Merge a partial update from a tuning client. The patch is checked
    /// against the tuning panel's slider bounds and applied all-or-nothing.
    pub fn apply_patch(&mut self, patch: &ParamsPatch) -> Result<()> {
        let mut next = *self;

        if let Some(mass) = patch.mass {
            check_range("mass", mass, 100.0, 5000.0)?;
            next.mass = mass;
        }
        if let Some(s) = &patch.suspension {
            if let Some(v) = s.stiffness {
                check_range("suspension.stiffness", v, 0.0, 100_000.0)?;
                next.suspension.stiffness = v;
            }
            if let Some(v) = s.damping {
                check_range("suspension.damping", v, 0.0, 10_000.0)?;
                next.suspension.damping = v;
            }
            if let Some(v) = s.rest_length {
                check_range("suspension.restLength", v, 0.1, 2.0)?;
                next.suspension.rest_length = v;
            }
            if let Some(v) = s.radius {
                check_range("suspension.radius", v, 0.1, 1.0)?;
                next.suspension.radius = v;
            }
        }
        if let Some(t) = &patch.tires {
            if let Some(v) = t.friction_coeff {
                check_range("tires.frictionCoeff", v, 0.1, 2.0)?;
                next.tires.friction_coeff = v;
            }
            if let Some(v) = t.cornering_stiffness {
                check_range("tires.corneringStiffness", v, 1000.0, 20_000.0)?;
                next.tires.cornering_stiffness = v;
            }
        }
        if let Some(p) = &patch.powertrain {
            if let Some(v) = p.max_drive_force {
                check_range("powertrain.maxDriveForce", v, 0.0, 15_000.0)?;
                next.powertrain.max_drive_force = v;
            }
            if let Some(v) = p.max_brake_force {
                check_range("powertrain.maxBrakeForce", v, 0.0, 20_000.0)?;
                next.powertrain.max_brake_force = v;
            }
            if let Some(v) = p.tv_gain {
                check_range("powertrain.tvGain", v, 0.0, 500.0)?;
                next.powertrain.tv_gain = v;
            }
        }
        if let Some(v) = patch.max_steer_angle {
            check_range("maxSteerAngle", v, 0.1, 1.0)?;
            next.max_steer_angle = v;
        }

        next.validate()?;
        *self = next;
        Ok(())
    }
}

// --------------------------------------------------
// Partial updates (tuning panel edits one slider at a time)
// --------------------------------------------------
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspensionPatch {
    pub stiffness: Option<f32>,
    pub damping: Option<f32>,
    pub rest_length: Option<f32>,
    pub radius: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TirePatch {
    pub friction_coeff: Option<f32>,
    pub cornering_stiffness: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowertrainPatch {
    pub max_drive_force: Option<f32>,
    pub max_brake_force: Option<f32>,
    pub tv_gain: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamsPatch {
    pub mass: Option<f32>,
    pub suspension: Option<SuspensionPatch>,
    pub tires: Option<TirePatch>,
    pub powertrain: Option<PowertrainPatch>,
    pub max_steer_angle: Option<f32>,
}

// --------------------------------------------------
// Driver input
// --------------------------------------------------

/// Driver commands for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriverInput {
    pub throttle: f32,  // 0..1
    pub brake: f32,     // 0..1
    pub steer: f32,     // -1 (right) .. 1 (left)
}

/// Raw keyboard state as sampled by a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct KeyState {
    #[serde(default)]
    pub forward: bool,
    #[serde(default)]
    pub backward: bool,
    #[serde(default)]
    pub brake: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
}

impl DriverInput {
    pub fn new(throttle: f32, brake: f32, steer: f32) -> Self {
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self {
            throttle: finite(throttle).clamp(0.0, 1.0),
            brake: finite(brake).clamp(0.0, 1.0),
            steer: finite(steer).clamp(-1.0, 1.0),
        }
    }

    /// Digital mapping: backward doubles as brake, steer is left minus right.
    pub fn from_keys(keys: KeyState) -> Self {
        let on = |b: bool| if b { 1.0 } else { 0.0 };
        Self::new(
            on(keys.forward),
            on(keys.backward || keys.brake),
            on(keys.left) - on(keys.right),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(VehicleParams::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_mass() {
        let params = VehicleParams { mass: 0.0, ..Default::default() };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, SimError::InvalidParam { field: "mass", .. }));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut params = VehicleParams::default();
        params.tires.friction_coeff = f32::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_patch_merges_partial_fields() {
        let mut params = VehicleParams::default();
        let patch: ParamsPatch =
            serde_json::from_str(r#"{"powertrain":{"tvGain":250},"maxSteerAngle":0.7}"#).unwrap();

        params.apply_patch(&patch).unwrap();

        assert_eq!(params.powertrain.tv_gain, 250.0);
        assert_eq!(params.powertrain.max_drive_force, 6000.0);
        assert_eq!(params.max_steer_angle, 0.7);
    }

    #[test]
    fn test_patch_is_all_or_nothing() {
        let mut params = VehicleParams::default();
        let patch: ParamsPatch =
            serde_json::from_str(r#"{"mass":1500,"tires":{"frictionCoeff":9.0}}"#).unwrap();

        assert!(params.apply_patch(&patch).is_err());
        assert_eq!(params, VehicleParams::default());
    }

    #[test]
    fn test_keys_map_to_input() {
        let input = DriverInput::from_keys(KeyState {
            forward: true,
            left: true,
            ..Default::default()
        });
        assert_eq!(input, DriverInput { throttle: 1.0, brake: 0.0, steer: 1.0 });

        let input = DriverInput::from_keys(KeyState {
            backward: true,
            left: true,
            right: true,
            ..Default::default()
        });
        assert_eq!(input, DriverInput { throttle: 0.0, brake: 1.0, steer: 0.0 });
    }

    #[test]
    fn test_analog_input_is_clamped() {
        let input = DriverInput::new(3.0, -1.0, f32::NAN);
        assert_eq!(input, DriverInput { throttle: 1.0, brake: 0.0, steer: 0.0 });
    }
}
