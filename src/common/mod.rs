pub mod hash;
pub mod labels;
pub mod time;

pub use hash::hash_labels;
pub use labels::LabelSet;
pub use time::{current_time_millis, Timestamp};
