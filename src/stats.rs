//! Host statistics for the info screen.
//!
//! Each figure is looked up independently; any of them may be missing on a
//! given board (no thermal zone, no network yet). The info screen shows a
//! placeholder for whatever is unavailable instead of failing the render.

use core::cell::Cell;
use std::fs;
use std::process::Command;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use log::debug;

use crate::error::{Error, Result};
use crate::ui::display::{line, Lines};

/// Shown in place of a statistic that could not be read.
pub const UNAVAILABLE: &str = "--";

const HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";
const PROC_STAT_PATH: &str = "/proc/stat";
const MEMINFO_PATH: &str = "/proc/meminfo";
const THERMAL_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// The System-Stats collaborator.
pub trait StatsSource {
    fn hostname(&self) -> Result<String>;

    /// First address reported for the host.
    fn primary_ip(&self) -> Result<String>;

    /// CPU utilisation since the previous call.
    fn cpu_percent(&self) -> Result<f32>;

    fn memory_percent(&self) -> Result<f32>;

    /// SoC temperature in whole degrees Celsius.
    fn temperature_c(&self) -> Result<i32>;
}

/// Aggregate CPU jiffies from the first line of `/proc/stat`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

/// Parse the aggregate `cpu` line of `/proc/stat`.
pub fn parse_cpu_times(proc_stat: &str) -> Option<CpuTimes> {
    let mut fields = proc_stat.lines().next()?.split_whitespace();
    if fields.next()? != "cpu" {
        return None;
    }
    // user nice system idle iowait irq softirq steal; guest time is already
    // counted in user.
    let values: Vec<u64> = fields.take(8).map(|f| f.parse().ok()).collect::<Option<_>>()?;
    if values.len() < 4 {
        return None;
    }
    let total: u64 = values.iter().sum();
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        busy: total - idle,
        total,
    })
}

/// Utilisation between two samples, in percent.
pub fn cpu_percent_between(previous: CpuTimes, current: CpuTimes) -> f32 {
    let total = current.total.saturating_sub(previous.total);
    if total == 0 {
        return 0.0;
    }
    let busy = current.busy.saturating_sub(previous.busy);
    busy as f32 * 100.0 / total as f32
}

/// Used memory in percent, from `MemTotal` and `MemAvailable`.
pub fn parse_meminfo(meminfo: &str) -> Option<f32> {
    let field = |name: &str| {
        meminfo
            .lines()
            .find_map(|l| l.strip_prefix(name))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|v| v.parse::<u64>().ok())
    };
    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    if total == 0 {
        return None;
    }
    Some(total.saturating_sub(available) as f32 * 100.0 / total as f32)
}

/// Whole degrees from a thermal-zone reading in millidegrees.
pub fn parse_millidegrees(raw: &str) -> Option<i32> {
    let milli: f64 = raw.trim().parse().ok()?;
    Some((milli / 1000.0) as i32)
}

/// First address in `hostname -I` output.
pub fn first_address(output: &str) -> Option<String> {
    output.split_whitespace().next().map(str::to_string)
}

/// Statistics read from procfs/sysfs on a Linux host.
pub struct SystemStats {
    previous_cpu: Mutex<CriticalSectionRawMutex, Cell<Option<CpuTimes>>>,
}

impl SystemStats {
    pub fn new() -> Self {
        Self {
            previous_cpu: Mutex::new(Cell::new(None)),
        }
    }
}

impl Default for SystemStats {
    fn default() -> Self {
        Self::new()
    }
}

fn read(path: &'static str, stat: &'static str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        debug!("Stats: {} from {}: {}", stat, path, e);
        Error::StatUnavailable(stat)
    })
}

impl StatsSource for SystemStats {
    fn hostname(&self) -> Result<String> {
        let name = read(HOSTNAME_PATH, "hostname")?.trim().to_string();
        if name.is_empty() {
            return Err(Error::StatUnavailable("hostname"));
        }
        Ok(name)
    }

    fn primary_ip(&self) -> Result<String> {
        let output = Command::new("hostname")
            .arg("-I")
            .output()
            .map_err(|_| Error::StatUnavailable("ip address"))?;
        first_address(&String::from_utf8_lossy(&output.stdout))
            .ok_or(Error::StatUnavailable("ip address"))
    }

    fn cpu_percent(&self) -> Result<f32> {
        let current =
            parse_cpu_times(&read(PROC_STAT_PATH, "cpu")?).ok_or(Error::StatUnavailable("cpu"))?;
        let previous = self.previous_cpu.lock(|p| p.replace(Some(current)));
        // First call has no baseline yet.
        Ok(previous.map_or(0.0, |prev| cpu_percent_between(prev, current)))
    }

    fn memory_percent(&self) -> Result<f32> {
        parse_meminfo(&read(MEMINFO_PATH, "memory")?).ok_or(Error::StatUnavailable("memory"))
    }

    fn temperature_c(&self) -> Result<i32> {
        parse_millidegrees(&read(THERMAL_PATH, "temperature")?)
            .ok_or(Error::StatUnavailable("temperature"))
    }
}

fn or_placeholder<T>(value: Result<T>, show: impl FnOnce(T) -> String) -> String {
    match value {
        Ok(v) => show(v),
        Err(e) => {
            debug!("Stats: {}", e);
            UNAVAILABLE.to_string()
        }
    }
}

/// Lines of the info (home) screen.
pub fn info_lines<S: StatsSource + ?Sized>(stats: &S) -> Lines {
    let host = or_placeholder(stats.hostname(), |h| h);
    let ip = or_placeholder(stats.primary_ip(), |ip| ip);
    let cpu = or_placeholder(stats.cpu_percent(), |c| format!("{c:.0}"));
    let mem = or_placeholder(stats.memory_percent(), |m| format!("{m:2.0}"));
    let temp = or_placeholder(stats.temperature_c(), |t| t.to_string());

    [
        format!("NAME: {host}"),
        format!("IP  : {ip}"),
        format!("C:{cpu}% | M:{mem}% | T:{temp}°"),
    ]
    .iter()
    .map(|text| line(text))
    .collect()
}
