use axum::Router;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;

/// Per-peer-IP rate limit. Not a spec component directly, but carried as
/// ambient stack the way the teacher's `api-server` declares
/// `tower_governor` as a dependency; applied here rather than returned so
/// callers never need to name the layer's generic key-extractor type.
pub fn governor_layer(router: Router) -> Router {
    let governor_conf = Box::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(20)
            .finish()
            .expect("static governor config is always valid"),
    );

    router.layer(GovernorLayer { config: Box::leak(governor_conf) })
}
