pub mod init;
pub mod metrics;
pub mod progress;
pub mod sink;
pub mod timing;

pub use init::{init_metrics, init_tracing, ObservabilityError};
pub use progress::cumulative_fraction;
pub use sink::{build_sink, LmCallTrace, NoopSink, TracingSink};
pub use timing::TimingTree;
