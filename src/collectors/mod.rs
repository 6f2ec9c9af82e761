pub mod gpu;
pub mod system;

use crate::config::GpuConfig;
use gpu::GpuProbe;
use serde::Serialize;
use sysinfo::{System, SystemExt};
use thiserror::Error;
use tracing::debug;

/// One sampling tick worth of utilisation figures, all in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub disk_percent: f64,
    /// `None` when no GPU source could be queried.
    pub gpu_percent: Option<f64>,
}

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("{0} unavailable")]
    Unavailable(&'static str),
    #[error("{tool} exited with {status}")]
    ToolFailed {
        tool: String,
        status: std::process::ExitStatus,
    },
    #[error("cannot read {0:?} as a percentage")]
    Parse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "nvml")]
    #[error(transparent)]
    Nvml(#[from] nvml_wrapper::error::NvmlError),
}

pub struct Collector {
    system: System,
    gpu: Vec<Box<dyn GpuProbe>>,
}

impl Collector {
    pub fn new(cfg: &GpuConfig) -> Self {
        let mut system = System::new();
        // CPU usage is a delta between refreshes; prime it so the first tick
        // is not a guaranteed zero.
        system.refresh_cpu();
        Self {
            system,
            gpu: gpu::default_probes(cfg),
        }
    }

    pub fn collect(&mut self) -> SystemSnapshot {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.system.refresh_disks_list();
        self.system.refresh_disks();

        let snapshot = SystemSnapshot {
            cpu_percent: system::cpu_percent(&self.system),
            ram_percent: system::ram_percent(&self.system),
            disk_percent: system::disk_percent(&self.system),
            gpu_percent: gpu::first_reading(&mut self.gpu),
        };
        debug!(?snapshot, "collected snapshot");
        snapshot
    }
}

/// Turns one tier's result into a usable percentage, logging why it fell
/// through otherwise.
pub(crate) fn settle(
    metric: &'static str,
    tier: &str,
    result: Result<f64, MetricError>,
) -> Option<f64> {
    match result {
        Ok(value) if value.is_finite() => Some(value.clamp(0.0, 100.0)),
        Ok(value) => {
            debug!(metric, tier, value, "tier returned a non-finite value");
            None
        }
        Err(err) => {
            debug!(metric, tier, error = %err, "tier failed, falling through");
            None
        }
    }
}

pub(crate) fn usage_percent(total: u64, used: u64) -> Result<f64, MetricError> {
    if total == 0 {
        return Err(MetricError::Unavailable("size of a zero-byte volume"));
    }
    Ok(used.min(total) as f64 / total as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_clamps_and_rejects() {
        assert_eq!(settle("cpu", "t", Ok(42.5)), Some(42.5));
        assert_eq!(settle("cpu", "t", Ok(130.0)), Some(100.0));
        assert_eq!(settle("cpu", "t", Ok(-1.0)), Some(0.0));
        assert_eq!(settle("cpu", "t", Ok(f64::NAN)), None);
        assert_eq!(
            settle("cpu", "t", Err(MetricError::Unavailable("thing"))),
            None
        );
    }

    #[test]
    fn usage_of_empty_volume_is_an_error() {
        assert!(usage_percent(0, 0).is_err());
        assert_eq!(usage_percent(200, 50).unwrap(), 25.0);
        assert_eq!(usage_percent(100, 150).unwrap(), 100.0);
    }

    #[test]
    fn collector_never_panics_without_gpu_tools() {
        let cfg = GpuConfig {
            nvml: false,
            smi_command: "/nonexistent/statlay-test/nvidia-smi".to_string(),
        };
        let mut collector = Collector::new(&cfg);
        let snapshot = collector.collect();

        assert_eq!(snapshot.gpu_percent, None);
        for value in [
            snapshot.cpu_percent,
            snapshot.ram_percent,
            snapshot.disk_percent,
        ] {
            assert!((0.0..=100.0).contains(&value), "out of range: {value}");
        }
    }
}
