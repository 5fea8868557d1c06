pub mod alertmanager;
pub mod fakes;
pub mod prom;
pub mod types;

pub use alertmanager::{is_silenced, AlertmanagerClient, SilenceSource};
pub use prom::{PromClient, Querier};
pub use types::InstantSample;
