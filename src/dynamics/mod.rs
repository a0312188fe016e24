//! dynamics - engine-agnostic vehicle step (pure math + host seams)

pub mod types;
pub mod host;
pub mod contact;
pub mod kinematics;
pub mod longitudinal;
pub mod tire;
pub mod impulse;
pub mod step;

pub use types::*;
pub use host::{BufferedChassis, ChassisBody, ChassisOp, RayCaster, TelemetrySink, VisualSink, WheelVisuals};
pub use step::{Frame, StepControl, StepOutcome, StepReport, VehicleDynamics, WheelReport};
