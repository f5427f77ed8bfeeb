pub mod angles;
pub mod com;
pub mod grip;
pub mod pole;
pub mod stride;

pub use angles::{AngleCalculator, AngleSet, TrunkLeanConvention};
pub use com::{ComSample, ComTracker};
pub use grip::{ArmGripState, CoordinationState, GripStatus, GripTracker, SwingPhase};
pub use pole::{ground_line_y, GripPoint, PoleEstimator, PoleGeometry, PoleModel};
pub use stride::StrideEstimator;
