use crate::collectors::{settle, usage_percent, MetricError};
use std::path::Path;
use sysinfo::{CpuExt, Disk, DiskExt, System, SystemExt};
#[cfg(unix)]
use tracing::debug;

#[cfg(target_os = "windows")]
pub const ROOT_PATH: &str = "C:\\";
#[cfg(not(target_os = "windows"))]
pub const ROOT_PATH: &str = "/";

/// `total_bytes` excludes space reserved for root, so `total - available`
/// is what `df` reports as used.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub fs_type: String,
    pub removable: bool,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl Partition {
    fn usage_percent(&self) -> Result<f64, MetricError> {
        usage_percent(
            self.total_bytes,
            self.total_bytes.saturating_sub(self.available_bytes),
        )
    }
}

/// Where disk figures come from. `System` is the real source; tests use
/// fixed partition tables.
pub trait DiskSource {
    fn partitions(&self) -> Vec<Partition>;
    fn path_usage(&self, path: &Path) -> Result<f64, MetricError>;
}

impl DiskSource for System {
    fn partitions(&self) -> Vec<Partition> {
        self.disks()
            .iter()
            .map(|d| {
                let (total_bytes, available_bytes) = disk_space(d);
                Partition {
                    fs_type: String::from_utf8_lossy(d.file_system()).to_string(),
                    removable: d.is_removable(),
                    total_bytes,
                    available_bytes,
                }
            })
            .collect()
    }

    fn path_usage(&self, path: &Path) -> Result<f64, MetricError> {
        path_usage_percent(path)
    }
}

pub fn cpu_percent(system: &System) -> f64 {
    if system.cpus().is_empty() {
        return 0.0;
    }
    let sum: f32 = system.cpus().iter().map(|c| c.cpu_usage()).sum();
    let avg = (sum / system.cpus().len() as f32) as f64;
    settle("cpu", "sysinfo", Ok(avg)).unwrap_or(0.0)
}

pub fn ram_percent(system: &System) -> f64 {
    let result = usage_percent(system.total_memory(), system.used_memory());
    settle("ram", "sysinfo", result).unwrap_or(0.0)
}

/// Disk usage with three fallbacks; 0 when every tier fails.
pub fn disk_percent(source: &impl DiskSource) -> f64 {
    let partitions = source.partitions();

    settle("disk", "first_partition", first_partition(&partitions))
        .or_else(|| settle("disk", "fixed_partition", fixed_partition(&partitions)))
        .or_else(|| settle("disk", "root_path", source.path_usage(Path::new(ROOT_PATH))))
        .unwrap_or(0.0)
}

fn first_partition(partitions: &[Partition]) -> Result<f64, MetricError> {
    partitions
        .first()
        .ok_or(MetricError::Unavailable("partition list"))?
        .usage_percent()
}

fn fixed_partition(partitions: &[Partition]) -> Result<f64, MetricError> {
    partitions
        .iter()
        .find(|p| !p.removable || !p.fs_type.is_empty())
        .ok_or(MetricError::Unavailable("fixed partition"))?
        .usage_percent()
}

/// sysinfo counts root-reserved blocks as used; re-query the mount point so
/// every disk tier agrees with the root-path tier.
#[cfg(unix)]
fn disk_space(disk: &Disk) -> (u64, u64) {
    match volume_space(disk.mount_point()) {
        Ok(space) => space,
        Err(err) => {
            debug!(mount = %disk.mount_point().display(), error = %err, "statvfs failed");
            (0, 0)
        }
    }
}

#[cfg(not(unix))]
fn disk_space(disk: &Disk) -> (u64, u64) {
    (disk.total_space(), disk.available_space())
}

/// `(total, available)` in bytes with the `df` denominator: blocks reserved
/// for root are left out of the total.
#[cfg(unix)]
fn volume_space(path: &Path) -> Result<(u64, u64), MetricError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| MetricError::Parse(path.display().to_string()))?;

    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    let frsize = stat.f_frsize as u64;
    let used = (stat.f_blocks as u64).saturating_sub(stat.f_bfree as u64) * frsize;
    let avail = stat.f_bavail as u64 * frsize;
    Ok((used + avail, avail))
}

#[cfg(unix)]
fn path_usage_percent(path: &Path) -> Result<f64, MetricError> {
    let (total, available) = volume_space(path)?;
    usage_percent(total, total - available)
}

#[cfg(windows)]
fn path_usage_percent(path: &Path) -> Result<f64, MetricError> {
    use std::os::windows::ffi::OsStrExt;

    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    let mut free_available: u64 = 0;
    let mut total_bytes: u64 = 0;
    let mut free_bytes: u64 = 0;

    let ok = unsafe {
        extern "system" {
            fn GetDiskFreeSpaceExW(
                lpDirectoryName: *const u16,
                lpFreeBytesAvailableToCaller: *mut u64,
                lpTotalNumberOfBytes: *mut u64,
                lpTotalNumberOfFreeBytes: *mut u64,
            ) -> i32;
        }

        GetDiskFreeSpaceExW(
            wide.as_ptr(),
            &mut free_available,
            &mut total_bytes,
            &mut free_bytes,
        )
    };
    if ok == 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    usage_percent(total_bytes, total_bytes.saturating_sub(free_bytes))
}
