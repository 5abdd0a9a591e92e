pub mod accessor;
pub mod cache;
pub mod partition;
pub mod resolver;

pub use accessor::KeyAccessor;
pub use cache::{AccessorCache, global};
pub use partition::PartitionKey;
pub use resolver::KeyResolver;
