pub mod kalman;
pub mod validity;

pub use kalman::{PositionSmoother, ScalarKalman};
pub use validity::{Rejection, RejectionCounts, ValidityFilter};
