//! Host load samples for live gauges.
//!
//! A thin wrapper around `sysinfo` that turns CPU usage, memory usage and
//! CPU temperature into plain numbers a gauge can be refreshed with.

use sysinfo::{Components, System};

// =============================================================================
// Metric
// =============================================================================

/// A host metric the monitor can sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Global CPU usage, percent.
    Cpu,
    /// Used memory, percent of total.
    Memory,
    /// CPU package/core temperature, Celsius.
    Temperature,
}

impl Metric {
    /// Gauge title for this metric.
    pub fn title(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU",
            Metric::Memory => "Memory",
            Metric::Temperature => "CPU Temp",
        }
    }

    /// Unit symbol appended to the value text.
    pub fn symbol(self) -> &'static str {
        match self {
            Metric::Cpu | Metric::Memory => "%",
            Metric::Temperature => "°C",
        }
    }

    /// Sensible gauge maximum.
    pub fn max(self) -> f64 {
        match self {
            Metric::Cpu | Metric::Memory => 100.0,
            Metric::Temperature => 110.0,
        }
    }
}

// =============================================================================
// System Metrics
// =============================================================================

/// Cached handle on the host's counters.
pub struct SystemMetrics {
    system: System,
    components: Components,
}

impl SystemMetrics {
    /// Create a new sampler. CPU usage needs two refreshes spaced by
    /// `sysinfo::MINIMUM_CPU_UPDATE_INTERVAL` before it is meaningful.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            system,
            components: Components::new_with_refreshed_list(),
        }
    }

    /// Refresh the counters backing `metric`.
    pub fn refresh(&mut self, metric: Metric) {
        match metric {
            Metric::Cpu => self.system.refresh_cpu_usage(),
            Metric::Memory => self.system.refresh_memory(),
            Metric::Temperature => self.components.refresh(true),
        }
    }

    /// Latest sample, or `None` when the host does not expose it.
    pub fn sample(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Cpu => Some(self.system.global_cpu_usage() as f64),
            Metric::Memory => {
                let total = self.system.total_memory();
                if total == 0 {
                    return None;
                }
                Some(self.system.used_memory() as f64 / total as f64 * 100.0)
            }
            Metric::Temperature => self.find_cpu_temp().map(f64::from),
        }
    }

    /// Find CPU temperature using common sensor label patterns.
    fn find_cpu_temp(&self) -> Option<f32> {
        self.components
            .iter()
            .find(|c| {
                let label = c.label().to_lowercase();
                label.contains("cpu")
                    || label.contains("package")
                    || label.contains("core")
                    || label.contains("tdie")
            })
            .and_then(|c| c.temperature())
    }
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_presentation() {
        assert_eq!(Metric::Cpu.symbol(), "%");
        assert_eq!(Metric::Temperature.max(), 110.0);
        assert_eq!(Metric::Memory.title(), "Memory");
    }

    #[test]
    fn test_memory_sample_in_range() {
        let mut metrics = SystemMetrics::new();
        metrics.refresh(Metric::Memory);
        if let Some(used) = metrics.sample(Metric::Memory) {
            assert!((0.0..=100.0).contains(&used));
        }
    }
}
