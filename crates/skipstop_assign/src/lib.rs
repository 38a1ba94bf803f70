mod congested;
mod error;
mod line;
mod linear;
mod matrix;

pub use congested::congested_assign;
pub use error::AssignError;
pub use line::{Line, trip_time};
pub use linear::{Assignment, linear_assign};
pub use matrix::OdMatrix;
