pub mod aggregator;
pub mod merge;
pub mod news;
pub mod policy;
pub mod random;

pub use aggregator::{Aggregator, RefreshOutcome, RefreshReport};
pub use policy::RefreshPolicy;
pub use random::Randomness;
