pub mod landmark;

pub use landmark::{Frame, Landmark, LandmarkIndex, Side, NOMINAL_FPS, VISIBILITY_THRESHOLD};
