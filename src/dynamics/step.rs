// ==============================================================================
// step.rs — ONE VEHICLE DYNAMICS TICK
// ==============================================================================
// Priority at tick start:
//     dt <= 0          -> skipped, nothing touched
//     reset requested  -> spawn pose, compression memory cleared, done
//     paused           -> no-op (no contacts, telemetry or visuals)
//     non-finite pose  -> same reset as above, logged, done
//     otherwise        -> per-wheel contact + tire solve
//
// Per grounded wheel:
//     V_point = v + ω × r
//     Fz      = m g / 4
//     α       = atan2(-v_lat, |v_long|)
//     F_long  = drive / brake / torque-vectoring law
//     F_lat   = C_alpha * α
//     (F_long, F_lat) clamped to mu * Fz, back to world, * dt,
//     clamped to MAX_TIRE_IMPULSE, applied at the hardpoint.
//
// Every input (chassis state, params, driver input) is read once up front and
// used for the whole tick. Impulses are collected and applied after the wheel
// loop.
// ==============================================================================

use log::{debug, warn};
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::{Point, Real, Vector};
use serde::Serialize;

use crate::dynamics::contact::{build_wheel_ray, compression, droop_position, resolve_contact, WheelContact};
use crate::dynamics::host::{ChassisBody, RayCaster, TelemetrySink, VisualSink};
use crate::dynamics::impulse::{tire_impulse, world_force, TireImpulse};
use crate::dynamics::kinematics::{point_velocity, slip_angle, slip_components, static_wheel_load, tire_basis};
use crate::dynamics::longitudinal::longitudinal_force;
use crate::dynamics::tire::{friction_limit, lateral_force, TireForce};
use crate::dynamics::types::{ChassisState, TelemetrySnapshot, WheelId, WheelTransform};
use crate::vehicle::{DriverInput, VehicleParams};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepControl {
    pub paused: bool,
    pub reset_requested: bool,
}

/// Everything the step reads besides the chassis, captured once per tick.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub dt: Real,
    pub params: VehicleParams,
    pub input: DriverInput,
    pub control: StepControl,
}

#[inline] fn v3(v: Vector<Real>) -> [f32; 3] { [v.x, v.y, v.z] }
#[inline] fn p3(p: Point<Real>)  -> [f32; 3] { [p.x, p.y, p.z] }

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelReport {
    pub wheel: WheelId,
    pub grounded: bool,
    pub compression: f32,       // m
    pub load: f32,              // N
    pub long_demand: f32,       // N, before the friction circle
    pub long_force: f32,        // N, after
    pub lat_force: f32,         // N, after
    pub slip_angle: f32,        // rad
    pub saturated: bool,        // friction circle reached
    pub impulse_rejected: bool,

    pub ray_origin: [f32; 3],
    pub ray_dir: [f32; 3],
    pub ray_length: f32,
    pub contact: Option<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// Chassis as the wheels saw it, before integration.
    #[serde(skip)]
    pub chassis: ChassisState,
    pub wheels: Vec<WheelReport>,
}

impl StepReport {
    pub fn grounded(&self) -> usize {
        self.wheels.iter().filter(|w| w.grounded).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// dt <= 0 (or not a number)
    DegenerateTick,
    Paused,
    Reset,
    /// Non-finite chassis pose was found and reset.
    FaultRecovered,
    Stepped(StepReport),
}

impl StepOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            StepOutcome::DegenerateTick => "skipped",
            StepOutcome::Paused => "paused",
            StepOutcome::Reset => "reset",
            StepOutcome::FaultRecovered => "recovered",
            StepOutcome::Stepped(_) => "stepped",
        }
    }

    /// Whether the integrator should advance after this tick.
    pub fn advances_world(&self) -> bool {
        !matches!(self, StepOutcome::DegenerateTick | StepOutcome::Paused)
    }
}

pub struct VehicleDynamics {
    spawn: ChassisState,
    compression: [Real; 4],     // previous tick, per wheel
}

impl VehicleDynamics {
    pub fn new(spawn_translation: Vector<Real>) -> Self {
        Self {
            spawn: ChassisState::at_rest(spawn_translation),
            compression: [0.0; 4],
        }
    }

    pub fn spawn(&self) -> &ChassisState {
        &self.spawn
    }

    pub fn compressions(&self) -> [Real; 4] {
        self.compression
    }

    fn reset<B: ChassisBody>(&mut self, chassis: &mut B) {
        chassis.reset_to(&self.spawn);
        self.compression = [0.0; 4];
    }

    pub fn step<B, W, T, V>(
        &mut self,
        frame: &Frame,
        chassis: &mut B,
        world: &W,
        telemetry: &mut T,
        visuals: &mut V,
    ) -> StepOutcome
    where
        B: ChassisBody,
        W: RayCaster,
        T: TelemetrySink,
        V: VisualSink,
    {
        // Frame jitter; not worth a log line.
        if !(frame.dt > 0.0) {
            return StepOutcome::DegenerateTick;
        }

        if frame.control.reset_requested {
            self.reset(chassis);
            return StepOutcome::Reset;
        }

        if frame.control.paused {
            return StepOutcome::Paused;
        }

        let state = chassis.state();
        if !state.pose_is_finite() {
            warn!(
                "⚠️ Non-finite chassis pose (t={:?}, q={:?}); resetting to spawn",
                state.translation,
                state.rotation.quaternion().coords
            );
            self.reset(chassis);
            return StepOutcome::FaultRecovered;
        }

        let params = &frame.params;
        let input = frame.input;
        let dt = frame.dt;

        let speed = state.linvel.norm();
        let steer_angle = input.steer * params.max_steer_angle;
        let fz = static_wheel_load(params.mass);
        let f_max = friction_limit(params.tires.friction_coeff, fz);
        let centre = Point::from(state.translation);

        let mut wheel_loads = [0.0; 4];
        let mut wheel_forces = [0.0; 4];
        let mut reports = Vec::with_capacity(WheelId::ALL.len());

        // collect impulses here, apply later
        let mut impulses: Vec<(Vector<Real>, Point<Real>)> = Vec::with_capacity(WheelId::ALL.len());

        for wheel in WheelId::ALL {
            let i = wheel.index();
            let ray = build_wheel_ray(&state, wheel, &params.suspension);
            let wheel_steer = if wheel.is_front() { steer_angle } else { 0.0 };
            let orientation = state.rotation * UnitQuaternion::from_axis_angle(&Vector::y_axis(), wheel_steer);

            let mut report = WheelReport {
                wheel,
                grounded: false,
                compression: 0.0,
                load: 0.0,
                long_demand: 0.0,
                long_force: 0.0,
                lat_force: 0.0,
                slip_angle: 0.0,
                saturated: false,
                impulse_rejected: false,
                ray_origin: p3(ray.origin),
                ray_dir: v3(ray.down),
                ray_length: ray.max_dist,
                contact: None,
            };

            let hit = match resolve_contact(world, &ray) {
                WheelContact::Grounded(hit) => hit,
                WheelContact::Airborne => {
                    self.compression[i] = 0.0;
                    place_wheel(visuals, wheel, droop_position(&ray, &params.suspension), orientation);
                    reports.push(report);
                    continue;
                }
            };

            self.compression[i] = compression(&hit, &params.suspension);

            // --- contact-point kinematics ---
            let r = ray.hardpoint - centre;
            let point_vel = point_velocity(state.linvel, state.angvel, r);
            let basis = tire_basis(&state.rotation, wheel_steer);
            let (v_long, v_lat) = slip_components(point_vel, &basis);
            let alpha = slip_angle(v_long, v_lat);

            // --- force demand + friction circle ---
            let long_demand = longitudinal_force(wheel, &input, speed, &params.powertrain);
            let lat_demand = lateral_force(params.tires.cornering_stiffness, alpha);
            let (force, saturated) = TireForce::new(long_demand, lat_demand).clamp_to_circle(f_max);

            match tire_impulse(world_force(&basis, force), dt) {
                TireImpulse::Apply(j) => impulses.push((j, ray.hardpoint)),
                TireImpulse::Empty => {}
                TireImpulse::Rejected => {
                    debug!("{wheel}: non-finite tire impulse dropped (F_long={}, F_lat={})", force.long, force.lat);
                    report.impulse_rejected = true;
                }
            }

            wheel_loads[i] = fz;
            wheel_forces[i] = long_demand;

            report.grounded = true;
            report.compression = self.compression[i];
            report.load = fz;
            report.long_demand = long_demand;
            report.long_force = force.long;
            report.lat_force = force.lat;
            report.slip_angle = alpha;
            report.saturated = saturated;
            report.contact = Some(p3(hit.point));
            reports.push(report);

            place_wheel(visuals, wheel, hit.point + hit.normal * params.suspension.radius, orientation);
        }

        for (impulse, point) in impulses {
            chassis.apply_impulse_at_point(impulse, point, true);
        }

        telemetry.publish(
            TelemetrySnapshot {
                speed,
                steer_angle,
                yaw_rate: state.angvel.y,
                throttle: input.throttle,
                brake: input.brake,
                wheel_loads,
                wheel_forces,
            }
            .sanitized(),
        );

        StepOutcome::Stepped(StepReport { chassis: state, wheels: reports })
    }
}

/// Visuals never receive NaN: a non-finite transform is simply not written.
fn place_wheel<V: VisualSink>(
    visuals: &mut V,
    wheel: WheelId,
    position: Point<Real>,
    orientation: UnitQuaternion<Real>,
) {
    let finite = position.coords.iter().all(|c| c.is_finite())
        && orientation.quaternion().coords.iter().all(|c| c.is_finite());
    if finite {
        visuals.place_wheel(wheel, WheelTransform { position, orientation });
    }
}
