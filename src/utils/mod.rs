pub mod metrics;
pub mod parsing;

// Re-export commonly used items
pub use metrics::{Metric, SystemMetrics};
