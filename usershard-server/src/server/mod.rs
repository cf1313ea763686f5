pub mod extractor;
pub mod handlers;
pub mod metrics_handler;
pub mod router;

pub use handlers::AppState;
pub use metrics_handler::init_metrics;
pub use router::create_router;
