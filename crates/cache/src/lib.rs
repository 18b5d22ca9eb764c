pub mod fingerprint;
pub mod layer;
pub mod l1;
#[cfg(feature = "l2-redis")]
pub mod l2_redis;
#[cfg(feature = "l3-disk")]
pub mod l3_disk;
pub mod multi;

pub use fingerprint::fingerprint;
pub use layer::CacheLayer;
pub use l1::{L1Cache, L1Config};
pub use multi::{Layers, MultiLevelCache};
