//! Linux-specific process counters using procfs.
//!
//! `/proc/self/stat` gives exact user+system CPU time and the live thread
//! count, which sysinfo only approximates.

use procfs::process::Process;
use std::time::Duration;
use tracing::debug;

/// Counters read from `/proc/self/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcStat {
    /// User plus system CPU time consumed since process start.
    pub cpu_time: Duration,
    /// Number of OS threads in the process.
    pub threads: u64,
}

/// Read `/proc/self/stat`, or `None` if procfs is unavailable.
pub fn read_self_stat() -> Option<ProcStat> {
    let stat = match Process::myself().and_then(|p| p.stat()) {
        Ok(stat) => stat,
        Err(e) => {
            debug!(error = %e, "Failed to read /proc/self/stat");
            return None;
        }
    };

    let ticks = procfs::ticks_per_second();
    Some(ProcStat {
        cpu_time: ticks_to_duration(stat.utime + stat.stime, ticks),
        threads: stat.num_threads.max(0) as u64,
    })
}

fn ticks_to_duration(ticks: u64, ticks_per_second: u64) -> Duration {
    if ticks_per_second == 0 {
        return Duration::ZERO;
    }
    let secs = ticks / ticks_per_second;
    let rem = ticks % ticks_per_second;
    Duration::from_secs(secs) + Duration::from_nanos(rem * 1_000_000_000 / ticks_per_second)
}
