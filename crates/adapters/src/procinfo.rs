// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process cpu/memory sampling for the Admin API.
//!
//! Linux reads `/proc/{pid}`; other hosts report no sample. Values are
//! advisory status-page numbers, not metrics.

/// A point-in-time resource sample for one process.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcSample {
    /// Cpu time over process lifetime, percent of one core.
    pub cpu_percent: Option<f64>,
    /// Resident set size in bytes.
    pub memory_bytes: Option<u64>,
}

/// Sample a process, best-effort.
pub fn sample(pid: u32) -> ProcSample {
    imp::sample(pid)
}

#[cfg(target_os = "linux")]
mod imp {
    use super::ProcSample;

    // Kernel clock tick rate; the common configuration on every distro
    // this worker targets.
    const CLK_TCK: f64 = 100.0;
    const PAGE_SIZE: u64 = 4096;

    pub(super) fn sample(pid: u32) -> ProcSample {
        ProcSample {
            cpu_percent: cpu_percent(pid),
            memory_bytes: resident_bytes(pid),
        }
    }

    fn cpu_percent(pid: u32) -> Option<f64> {
        let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
        // Fields after the parenthesized comm; comm may contain spaces.
        let rest = stat.rsplit_once(')')?.1;
        let fields: Vec<&str> = rest.split_whitespace().collect();
        // utime, stime are fields 14, 15 of stat; 11, 12 of `rest`
        // (state is rest[0]). starttime is field 22 -> rest[19].
        let utime: f64 = fields.get(11)?.parse().ok()?;
        let stime: f64 = fields.get(12)?.parse().ok()?;
        let starttime: f64 = fields.get(19)?.parse().ok()?;

        let uptime: f64 = std::fs::read_to_string("/proc/uptime")
            .ok()?
            .split_whitespace()
            .next()?
            .parse()
            .ok()?;

        let elapsed = uptime - starttime / CLK_TCK;
        if elapsed <= 0.0 {
            return None;
        }
        Some(100.0 * ((utime + stime) / CLK_TCK) / elapsed)
    }

    fn resident_bytes(pid: u32) -> Option<u64> {
        let statm = std::fs::read_to_string(format!("/proc/{}/statm", pid)).ok()?;
        let resident: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        Some(resident * PAGE_SIZE)
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use super::ProcSample;

    pub(super) fn sample(_pid: u32) -> ProcSample {
        ProcSample::default()
    }
}

#[cfg(test)]
#[path = "procinfo_tests.rs"]
mod tests;
