pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use rate_limit::governor_layer;
pub use request_id::{request_id_middleware, RequestId};
pub use security_headers::security_headers_middleware;
