//! Process runtime sampling.
//!
//! Each call to [`RuntimeSampler::sample`] reads in-process counters and
//! returns one [`FieldSet`]. Field names follow a dotted `group.metric`
//! layout:
//!
//! ```text
//! cpu.count  cpu.threads  cpu.time  cpu.usage  cpu.tasks  cpu.workers
//! mem.sys  mem.virtual  mem.alloc  mem.total  mem.heap.objects  mem.mallocs
//! mem.gc.count  mem.gc.freed  mem.gc.last
//! ```
//!
//! Values the platform cannot provide are left out rather than zeroed.

use crate::alloc;
use crate::config::Config;
use crate::fields::FieldSet;
use std::collections::BTreeMap;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, warn};

/// Metric groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Cpu,
    Memory,
    Gc,
}

impl Group {
    /// Every field name the group can emit.
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            Group::Cpu => &[
                "cpu.count",
                "cpu.threads",
                "cpu.time",
                "cpu.usage",
                "cpu.tasks",
                "cpu.workers",
            ],
            Group::Memory => &[
                "mem.sys",
                "mem.virtual",
                "mem.alloc",
                "mem.total",
                "mem.heap.objects",
                "mem.mallocs",
            ],
            Group::Gc => &["mem.gc.count", "mem.gc.freed", "mem.gc.last"],
        }
    }

    /// Group a field name belongs to.
    pub fn of(field: &str) -> Option<Group> {
        [Group::Cpu, Group::Memory, Group::Gc]
            .into_iter()
            .find(|g| g.field_names().contains(&field))
    }
}

/// Which groups are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Groups {
    pub cpu: bool,
    pub mem: bool,
    pub gc: bool,
}

impl Groups {
    pub fn all() -> Self {
        Self {
            cpu: true,
            mem: true,
            gc: true,
        }
    }

    pub fn none() -> Self {
        Self {
            cpu: false,
            mem: false,
            gc: false,
        }
    }

    /// Effective groups for a configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            cpu: config.cpu_enabled(),
            mem: config.mem_enabled(),
            gc: config.gc_enabled(),
        }
    }

    /// Whether fields of `group` are emitted. GC needs memory.
    pub fn contains(&self, group: Group) -> bool {
        match group {
            Group::Cpu => self.cpu,
            Group::Memory => self.mem,
            Group::Gc => self.mem && self.gc,
        }
    }
}

impl Default for Groups {
    fn default() -> Self {
        Self::all()
    }
}

/// Samples the current process.
pub struct RuntimeSampler {
    groups: Groups,
    tags: BTreeMap<String, String>,
    system: System,
    pid: Option<Pid>,
    /// CPU nanoseconds at the previous sample
    prev_cpu_nanos: Option<u64>,
    /// Freed bytes at the previous sample
    prev_freed: Option<u64>,
}

impl RuntimeSampler {
    /// Create a sampler for the current process.
    pub fn new(groups: Groups) -> Self {
        let mut system = System::new();
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!("Failed to get current PID: {}", e);
                None
            }
        };

        if let Some(pid) = pid {
            system.refresh_processes(ProcessesToUpdate::Some(&[pid]), false);
        }

        let tags = identity_tags(&system, pid);

        Self {
            groups,
            tags,
            system,
            pid,
            prev_cpu_nanos: None,
            prev_freed: None,
        }
    }

    pub fn groups(&self) -> Groups {
        self.groups
    }

    /// Identity tags attached to every field set.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Take one sample.
    pub fn sample(&mut self) -> FieldSet {
        let mut fields = FieldSet::new(self.tags.clone());

        if self.groups.contains(Group::Cpu) || self.groups.contains(Group::Memory) {
            self.refresh_process();
        }

        if self.groups.contains(Group::Cpu) {
            self.collect_cpu(&mut fields);
        }

        if self.groups.contains(Group::Memory) {
            self.collect_memory(&mut fields);
        }

        if self.groups.contains(Group::Gc) {
            self.collect_gc(&mut fields);
        }

        debug!("Sampled {} runtime fields", fields.len());
        fields
    }

    fn refresh_process(&mut self) {
        if let Some(pid) = self.pid {
            self.system
                .refresh_processes(ProcessesToUpdate::Some(&[pid]), false);
        }
    }

    /// Collect CPU fields.
    fn collect_cpu(&mut self, fields: &mut FieldSet) {
        if let Ok(n) = std::thread::available_parallelism() {
            fields.insert("cpu.count", n.get());
        }

        #[cfg(target_os = "linux")]
        {
            if let Some(stat) = crate::linux::read_self_stat() {
                let nanos = stat.cpu_time.as_nanos() as u64;
                fields.insert("cpu.threads", stat.threads);
                fields.insert("cpu.time", since_last(&mut self.prev_cpu_nanos, nanos));
            }
        }

        if let Some(process) = self.pid.and_then(|pid| self.system.process(pid)) {
            fields.insert("cpu.usage", process.cpu_usage());

            #[cfg(not(target_os = "linux"))]
            {
                if let Some(tasks) = process.tasks() {
                    fields.insert("cpu.threads", tasks.len());
                }
                // Milliseconds, coarser than procfs ticks
                let nanos = process.accumulated_cpu_time().saturating_mul(1_000_000);
                fields.insert("cpu.time", since_last(&mut self.prev_cpu_nanos, nanos));
            }
        }

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let metrics = handle.metrics();
            fields.insert("cpu.workers", metrics.num_workers());
            fields.insert("cpu.tasks", metrics.num_alive_tasks());
        }
    }

    /// Collect memory fields.
    fn collect_memory(&mut self, fields: &mut FieldSet) {
        if let Some(process) = self.pid.and_then(|pid| self.system.process(pid)) {
            fields.insert("mem.sys", process.memory());
            fields.insert("mem.virtual", process.virtual_memory());
        }

        if let Some(stats) = alloc::stats() {
            fields.insert("mem.alloc", stats.live_bytes());
            fields.insert("mem.total", stats.allocated_bytes);
            fields.insert("mem.heap.objects", stats.live_objects());
            fields.insert("mem.mallocs", stats.allocations);
        }
    }

    /// Collect reclamation fields.
    fn collect_gc(&mut self, fields: &mut FieldSet) {
        let Some(stats) = alloc::stats() else {
            return;
        };

        fields.insert("mem.gc.count", stats.deallocations);
        fields.insert("mem.gc.freed", stats.freed_bytes);
        fields.insert(
            "mem.gc.last",
            since_last(&mut self.prev_freed, stats.freed_bytes),
        );
    }
}

/// Advance a cumulative counter and return the growth since the previous
/// reading. The first reading returns the full value.
fn since_last(prev: &mut Option<u64>, now: u64) -> u64 {
    let delta = match *prev {
        Some(p) => now.saturating_sub(p),
        None => now,
    };
    *prev = Some(now);
    delta
}

/// Build the fixed identity tag set.
fn identity_tags(system: &System, pid: Option<Pid>) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();

    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    tags.insert("host".to_string(), host);

    if let Some(pid) = pid {
        tags.insert("pid".to_string(), pid.to_string());

        if let Some(process) = system.process(pid) {
            tags.insert(
                "process".to_string(),
                process.name().to_string_lossy().to_string(),
            );
        }
    }

    tags.insert("os".to_string(), std::env::consts::OS.to_string());
    tags.insert("arch".to_string(), std::env::consts::ARCH.to_string());

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_flag_combinations() -> Vec<Groups> {
        let mut out = Vec::new();
        for bits in 0..8u8 {
            out.push(Groups {
                cpu: bits & 1 != 0,
                mem: bits & 2 != 0,
                gc: bits & 4 != 0,
            });
        }
        out
    }

    #[test]
    fn test_group_of() {
        assert_eq!(Group::of("cpu.time"), Some(Group::Cpu));
        assert_eq!(Group::of("mem.alloc"), Some(Group::Memory));
        assert_eq!(Group::of("mem.gc.count"), Some(Group::Gc));
        assert_eq!(Group::of("disk.used"), None);
    }

    #[test]
    fn test_groups_from_config() {
        let config = Config {
            disable_mem: true,
            ..Default::default()
        };
        let groups = Groups::from_config(&config);
        assert!(groups.cpu);
        assert!(!groups.mem);
        assert!(!groups.gc);

        // GC is masked by memory even when set directly
        let groups = Groups {
            cpu: false,
            mem: false,
            gc: true,
        };
        assert!(!groups.contains(Group::Gc));
    }

    #[test]
    fn test_fields_belong_to_enabled_groups() {
        for groups in all_flag_combinations() {
            let mut sampler = RuntimeSampler::new(groups);

            for _ in 0..2 {
                let fields = sampler.sample();
                for name in fields.values().keys() {
                    let group = Group::of(name)
                        .unwrap_or_else(|| panic!("unexpected field '{}'", name));
                    assert!(
                        groups.contains(group),
                        "field '{}' emitted with {:?}",
                        name,
                        groups
                    );
                }
            }
        }
    }

    #[test]
    fn test_all_disabled_still_samples() {
        let mut sampler = RuntimeSampler::new(Groups::none());
        let fields = sampler.sample();

        assert!(fields.is_empty());
        assert!(fields.tags().contains_key("host"));
        assert!(fields.tags().contains_key("os"));
        assert!(fields.tags().contains_key("arch"));
    }

    #[test]
    fn test_cpu_fields() {
        let mut sampler = RuntimeSampler::new(Groups {
            cpu: true,
            mem: false,
            gc: false,
        });
        let fields = sampler.sample();

        assert!(fields.get("cpu.count").map(|v| v.as_f64()).unwrap_or(0.0) >= 1.0);
        // procfs on Linux, sysinfo's accumulated time elsewhere
        assert!(fields.get("cpu.time").is_some());
        // Outside a tokio runtime there are no task fields
        assert!(fields.get("cpu.tasks").is_none());
        assert!(fields.get("cpu.workers").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cpu_fields_inside_runtime() {
        let mut sampler = RuntimeSampler::new(Groups::all());
        let fields = sampler.sample();

        assert_eq!(fields.get("cpu.workers").map(|v| v.as_f64()), Some(2.0));
        assert!(fields.get("cpu.tasks").is_some());
    }

    #[test]
    fn test_since_last() {
        let mut prev = None;
        assert_eq!(since_last(&mut prev, 100), 100);
        assert_eq!(since_last(&mut prev, 150), 50);
        assert_eq!(since_last(&mut prev, 150), 0);
        // Counter reset never goes negative
        assert_eq!(since_last(&mut prev, 10), 0);
        assert_eq!(prev, Some(10));
    }
}
