//! Identifier and date helpers.

mod ids;
mod time;

pub use ids::{compute_id, new_run_id};
pub use time::{current_date, current_date_str, iso_timestamp};
