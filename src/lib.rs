pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod pose;
pub mod protocol;
pub mod runner;
pub mod session;
pub mod stats;
pub mod tracker;
pub mod view;

pub use config::Config;
pub use error::GaitError;
pub use pose::{Frame, Landmark, LandmarkIndex};
pub use session::{FrameReport, Session, SessionSnapshot};
pub use view::View;
