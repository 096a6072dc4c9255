pub mod partitioner;
pub mod query;

pub use partitioner::{Partition, QueryPartitioner};
pub use query::{strip_lower_bound, Query};
