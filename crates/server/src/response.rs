use serde::Serialize;

/// Envelope every JSON route returns, mirroring the teacher's
/// `ApiResponse<T>::success(data)` convention used throughout its route
/// modules (e.g. `symbol_routes.rs`).
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}
