pub mod convert;
pub mod formatter;
pub mod handler;
pub mod keywords;

pub use formatter::format_report;
pub use handler::{run_fast_handler, HandlerDeps, HandlerKind};
