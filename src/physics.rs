// src/physics.rs
// ==============================================================================
// physics.rs — RAPIER HOST FOR THE VEHICLE DYNAMICS STEP
// ------------------------------------------------------------------------------
// Owns the rapier world (ground, chassis, track obstacles) and adapts it to the
// dynamics seams:
// - RapierRayCaster : wheel rays against the world, chassis + sensors excluded
// - capture/commit  : the step runs on a BufferedChassis copy of the chassis,
//                     recorded ops are replayed onto the rapier body afterwards
// - step()          : dynamics tick, then integration unless skipped or paused
// ==============================================================================

use log::{info, warn};
use rapier3d::prelude::*;
use serde::Serialize;

use crate::dynamics::{
    BufferedChassis, ChassisOp, ChassisState, Frame, RayCaster, RayHit, StepOutcome, TelemetrySink,
    VehicleDynamics, VisualSink, GRAVITY,
};
use crate::track::{Obstacle, ObstacleKind, TrackType};

const GROUP_GROUND: Group   = Group::GROUP_1;
const GROUP_CHASSIS: Group  = Group::GROUP_2;
const GROUP_OBSTACLE: Group = Group::GROUP_3;

pub const CHASSIS_HALF_EXTENTS: [f32; 3] = [0.9, 0.4, 1.9];     // m
const CHASSIS_DAMPING: f32 = 0.5;
const GROUND_HALF_EXTENTS: [f32; 3] = [50.0, 1.0, 50.0];        // 100 m x 100 m, top at y = 0

fn chassis_volume() -> f32 {
    let [hx, hy, hz] = CHASSIS_HALF_EXTENTS;
    8.0 * hx * hy * hz
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChassisPose {
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion xyzw
}

/// Wheel rays against the rapier world.
pub struct RapierRayCaster<'a> {
    pub bodies: &'a RigidBodySet,
    pub colliders: &'a ColliderSet,
    pub query_pipeline: &'a QueryPipeline,
    pub exclude: RigidBodyHandle,
}

impl RayCaster for RapierRayCaster<'_> {
    fn cast_ray(&self, origin: Point<Real>, dir: Vector<Real>, max_distance: Real, solid: bool) -> Option<RayHit> {
        let ray = Ray::new(origin, dir);
        let filter = QueryFilter::default()
            .exclude_sensors()
            .exclude_rigid_body(self.exclude);

        self.query_pipeline
            .cast_ray_and_get_normal(self.bodies, self.colliders, &ray, max_distance, solid, filter)
            .map(|(_, hit)| RayHit {
                distance: hit.time_of_impact,
                point: ray.point_at(hit.time_of_impact),
                normal: hit.normal,
            })
    }
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>, // gravity vector
    pub pipeline: PhysicsPipeline, // physics pipeline
    pub island_manager: IslandManager, // manages islands of bodies
    pub broad_phase: DefaultBroadPhase, // broad-phase collision detection
    pub narrow_phase: NarrowPhase, // collision detection
    pub bodies: RigidBodySet, // for rigid bodies
    pub colliders: ColliderSet, // for collision shapes
    pub joints: ImpulseJointSet, // for constraints
    pub multibody_joints: MultibodyJointSet,// for articulated bodies
    pub ccd: CCDSolver, // continuous collision detection
    pub query_pipeline: QueryPipeline, // for raycasting

    pub chassis: RigidBodyHandle,
    chassis_collider: ColliderHandle,
    chassis_mass: f32,              // kg, what the collider density was built from

    track: TrackType,
    obstacles: Vec<RigidBodyHandle>,

    dynamics: VehicleDynamics,
}

impl PhysicsWorld {
    pub fn new(spawn: [f32; 3], mass: f32) -> Self {
        let gravity = vector![0.0, -GRAVITY, 0.0];

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // === Ground: static box, top surface exactly at y = 0 ===
        let [gx, gy, gz] = GROUND_HALF_EXTENTS;
        let ground_handle = bodies.insert(RigidBodyBuilder::fixed().translation(vector![0.0, -gy, 0.0]).build());
        let ground_collider = ColliderBuilder::cuboid(gx, gy, gz)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.0)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        // === Chassis ===
        let [sx, sy, sz] = spawn;
        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![sx, sy, sz])
            .linear_damping(CHASSIS_DAMPING)
            .angular_damping(CHASSIS_DAMPING)
            .ccd_enabled(true)
            .build();
        let chassis = bodies.insert(rb);

        // Tire forces do the driving; the box itself slides frictionless.
        let [hx, hy, hz] = CHASSIS_HALF_EXTENTS;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND | GROUP_OBSTACLE))
            .density(mass / chassis_volume()) // ρ = m / V
            .friction(0.0)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .restitution(0.0)
            .build();
        let chassis_collider = colliders.insert_with_parent(collider, chassis, &mut bodies);

        info!("🌎 World ready: ground + chassis at {:?} ({} kg)", spawn, mass);

        let mut world = Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            chassis,
            chassis_collider,
            chassis_mass: mass,
            track: TrackType::Straight,
            obstacles: Vec::new(),
            dynamics: VehicleDynamics::new(vector![sx, sy, sz]),
        };
        world.query_pipeline.update(&world.colliders);
        world
    }

    pub fn track(&self) -> TrackType {
        self.track
    }

    /// Remove the current obstacles and build `track`'s. Returns the layout.
    pub fn set_track(&mut self, track: TrackType) -> Vec<Obstacle> {
        for handle in self.obstacles.drain(..) {
            self.bodies.remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.joints,
                &mut self.multibody_joints,
                true,
            );
        }

        let layout = track.obstacles();
        for obstacle in &layout {
            let [x, y, z] = obstacle.position;
            let handle = self.bodies.insert(RigidBodyBuilder::fixed().translation(vector![x, y, z]).build());

            let half_height = obstacle.height * 0.5;
            let shape = match obstacle.kind {
                ObstacleKind::Cone => ColliderBuilder::cone(half_height, obstacle.radius),
                ObstacleKind::Marker => ColliderBuilder::cylinder(half_height, obstacle.radius),
            };
            let collider = shape
                .collision_groups(InteractionGroups::new(GROUP_OBSTACLE, GROUP_CHASSIS))
                .sensor(!obstacle.solid)
                .build();
            self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
            self.obstacles.push(handle);
        }

        self.track = track;
        self.query_pipeline.update(&self.colliders);
        info!("🏁 Track set to {} ({} obstacles)", track, layout.len());
        layout
    }

    fn sync_mass(&mut self, mass: f32) {
        if mass == self.chassis_mass {
            return;
        }
        if let Some(collider) = self.colliders.get_mut(self.chassis_collider) {
            collider.set_density(mass / chassis_volume());
            self.chassis_mass = mass;
        }
    }

    fn capture(&self) -> Option<ChassisState> {
        let body = self.bodies.get(self.chassis)?;
        Some(ChassisState {
            translation: *body.translation(),
            rotation: *body.rotation(),
            linvel: *body.linvel(),
            angvel: *body.angvel(),
        })
    }

    /// Replay the step's recorded mutations onto the rapier body.
    fn commit(&mut self, chassis: BufferedChassis) {
        let wake = chassis.wants_wake();
        let Some(body) = self.bodies.get_mut(self.chassis) else {
            return;
        };

        for op in chassis.into_ops() {
            match op {
                ChassisOp::SetTranslation(t) => body.set_translation(t, wake),
                ChassisOp::SetRotation(q) => body.set_rotation(q, wake),
                ChassisOp::SetLinvel(v) => body.set_linvel(v, wake),
                ChassisOp::SetAngvel(w) => body.set_angvel(w, wake),
                ChassisOp::ApplyImpulseAtPoint { impulse, point } => {
                    body.apply_impulse_at_point(impulse, point, wake)
                }
            }
        }
    }

    fn integrate(&mut self, dt: Real) {
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    pub fn step<T, V>(&mut self, frame: &Frame, telemetry: &mut T, visuals: &mut V) -> StepOutcome
    where
        T: TelemetrySink,
        V: VisualSink,
    {
        if !(frame.dt > 0.0) {
            return StepOutcome::DegenerateTick;
        }

        let Some(state) = self.capture() else {
            warn!("⚠️ Chassis body missing from the world; tick skipped");
            return StepOutcome::DegenerateTick;
        };

        // 1) Dynamics against a buffered copy of the chassis
        let mut chassis = BufferedChassis::new(state);
        let outcome = {
            let caster = RapierRayCaster {
                bodies: &self.bodies,
                colliders: &self.colliders,
                query_pipeline: &self.query_pipeline,
                exclude: self.chassis,
            };
            self.dynamics.step(frame, &mut chassis, &caster, telemetry, visuals)
        };

        // 2) Apply collected mutations
        self.commit(chassis);

        // 3) Integrate, picking up mass edits first
        if outcome.advances_world() {
            self.sync_mass(frame.params.mass);
            self.integrate(frame.dt);
        }

        outcome
    }

    pub fn chassis_pose(&self) -> Option<ChassisPose> {
        let body = self.bodies.get(self.chassis)?;
        let t = body.translation();
        let q = body.rotation().quaternion().coords;
        Some(ChassisPose {
            position: [t.x, t.y, t.z],
            rotation: [q.x, q.y, q.z, q.w],
        })
    }
}
