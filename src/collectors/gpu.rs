use crate::collectors::{settle, MetricError};
use crate::config::GpuConfig;
use std::process::Command;
#[cfg(feature = "nvml")]
use tracing::debug;

const SMI_ARGS: [&str; 2] = [
    "--query-gpu=utilization.gpu",
    "--format=csv,noheader,nounits",
];

/// One GPU utilisation tier.
pub trait GpuProbe {
    fn name(&self) -> &'static str;
    fn load_percent(&mut self) -> Result<f64, MetricError>;
}

/// Probes in fallback order: the NVML library, then the `nvidia-smi` tool.
pub fn default_probes(cfg: &GpuConfig) -> Vec<Box<dyn GpuProbe>> {
    let mut probes: Vec<Box<dyn GpuProbe>> = Vec::with_capacity(2);
    #[cfg(feature = "nvml")]
    {
        if cfg.nvml {
            probes.push(Box::new(NvmlProbe::init()));
        }
    }
    probes.push(Box::new(SmiProbe::new(cfg.smi_command.clone())));
    probes
}

/// First tier that yields a value wins; `None` means the GPU is unmeasurable,
/// which is different from a measured 0%.
pub fn first_reading(probes: &mut [Box<dyn GpuProbe>]) -> Option<f64> {
    probes
        .iter_mut()
        .find_map(|probe| settle("gpu", probe.name(), probe.load_percent()))
}

#[cfg(feature = "nvml")]
pub struct NvmlProbe {
    nvml: Option<nvml_wrapper::Nvml>,
}

#[cfg(feature = "nvml")]
impl NvmlProbe {
    /// NVML is initialised once; a missing driver makes every later query
    /// fall through immediately.
    pub fn init() -> Self {
        let nvml = match nvml_wrapper::Nvml::init() {
            Ok(nvml) => Some(nvml),
            Err(err) => {
                debug!(error = %err, "NVML not available");
                None
            }
        };
        Self { nvml }
    }
}

#[cfg(feature = "nvml")]
impl GpuProbe for NvmlProbe {
    fn name(&self) -> &'static str {
        "nvml"
    }

    fn load_percent(&mut self) -> Result<f64, MetricError> {
        let nvml = self
            .nvml
            .as_ref()
            .ok_or(MetricError::Unavailable("NVML library"))?;
        let device = nvml.device_by_index(0)?;
        let utilization = device.utilization_rates()?;
        Ok(utilization.gpu as f64)
    }
}

pub struct SmiProbe {
    command: String,
}

impl SmiProbe {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

impl GpuProbe for SmiProbe {
    fn name(&self) -> &'static str {
        "nvidia-smi"
    }

    fn load_percent(&mut self) -> Result<f64, MetricError> {
        let output = Command::new(&self.command).args(SMI_ARGS).output()?;
        if !output.status.success() {
            return Err(MetricError::ToolFailed {
                tool: self.command.clone(),
                status: output.status,
            });
        }
        parse_smi_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Reads the first device's line of `nvidia-smi` CSV output.
pub fn parse_smi_output(text: &str) -> Result<f64, MetricError> {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or(MetricError::Unavailable("nvidia-smi output"))?;
    parse_f64_loose(line).ok_or_else(|| MetricError::Parse(line.to_string()))
}

/// Accepts `,` as the decimal separator and ignores units such as `%`.
fn parse_f64_loose(input: &str) -> Option<f64> {
    let normalized = input.trim().replace(',', ".");
    normalized.parse::<f64>().ok().or_else(|| {
        normalized
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
            .collect::<String>()
            .parse::<f64>()
            .ok()
    })
}
