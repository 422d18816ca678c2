//! Pure aggregation operations over filtered transaction rows.
//!
//! Every operation here is deterministic given identical input and has no
//! side effects beyond its return value; presentation decides what to do
//! with the results.

pub mod aggregate;
pub mod types;
pub mod utility;
