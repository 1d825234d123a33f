// PERFPREP CORE TOPOLOGY
// LOGICAL CPU ENUMERATION, P/E-CORE CLASSIFICATION, HOTPLUG.
// NEVER CACHED: EVERY BULK ACTION RESCANS, BECAUSE OFFLINING CHANGES THE PICTURE.

use std::fmt;
use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

use crate::error::{Error, Result};
use crate::host::Host;
use crate::privilege::ElevatedHandle;
use crate::toggle::{self, Outcome};
use crate::tunables::{self, CPU_SYSFS_DIR};

// THE KERNEL ALWAYS NEEDS ONE EXECUTION UNIT. CPU 0 STAYS.
pub const BOOT_CPU: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Performance,
    Efficiency,
    // NO (OR ZERO) base_frequency. NEVER TARGETED BY EFFICIENCY-ONLY ACTIONS.
    Unclassified,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::Performance => "P-CORE",
            Self::Efficiency => "E-CORE",
            Self::Unclassified => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreUnit {
    pub id: u32,
    pub base_freq_khz: Option<u64>,
    pub online: bool,
    pub role: Role,
}

pub fn classify(base_freq_khz: Option<u64>, threshold_khz: u64) -> Role {
    match base_freq_khz {
        None | Some(0) => Role::Unclassified,
        Some(f) if f < threshold_khz => Role::Efficiency,
        Some(_) => Role::Performance,
    }
}

fn cpu_dir_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^cpu(\d+)$").expect("static regex"))
}

fn read_online<H: Host + ?Sized>(host: &H, id: u32) -> bool {
    let path = tunables::cpu_online_path(id);
    // NO online FILE: THE UNIT CANNOT BE HOTPLUGGED, SO IT IS ONLINE
    if !host.exists(&path) {
        return true;
    }
    host.read(&path).map(|v| v.trim() == "1").unwrap_or(true)
}

fn read_base_freq<H: Host + ?Sized>(host: &H, id: u32) -> Option<u64> {
    host.read(&tunables::cpu_base_freq_path(id))
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
}

pub fn enumerate<H: Host + ?Sized>(host: &H, threshold_khz: u64) -> Result<Vec<CoreUnit>> {
    let names = host.list_dir(CPU_SYSFS_DIR).map_err(|source| Error::Io {
        path: CPU_SYSFS_DIR.to_string(),
        source,
    })?;

    let mut units: Vec<CoreUnit> = names
        .iter()
        .filter_map(|n| cpu_dir_re().captures(n))
        .filter_map(|c| c[1].parse::<u32>().ok())
        .map(|id| {
            let base_freq_khz = read_base_freq(host, id);
            CoreUnit {
                id,
                base_freq_khz,
                online: read_online(host, id),
                role: classify(base_freq_khz, threshold_khz),
            }
        })
        .collect();

    units.sort_by_key(|u| u.id);
    debug!("enumerated {} cpus", units.len());
    Ok(units)
}

pub fn set_online<H: Host + ?Sized>(
    host: &H,
    unit: &CoreUnit,
    online: bool,
    handle: &ElevatedHandle,
) -> Outcome {
    if unit.id == BOOT_CPU && !online {
        return Outcome::Refused { reason: "cpu0 must stay online".to_string() };
    }

    let path = tunables::cpu_online_path(unit.id);
    if !host.exists(&path) {
        // A UNIT WITHOUT A HOTPLUG FILE IS PERMANENTLY ONLINE
        if online {
            return Outcome::AlreadySatisfied;
        }
        return Outcome::Unsupported { reason: format!("cpu{} is not hotpluggable", unit.id) };
    }

    let current = read_online(host, unit.id);
    if current == online {
        return Outcome::AlreadySatisfied;
    }

    match host.write(&path, if online { "1" } else { "0" }, handle) {
        Ok(()) => Outcome::Applied { previous: if current { "1" } else { "0" }.to_string() },
        Err(e) => {
            warn!(
                "cpu{}: failed to set {}: {}",
                unit.id,
                if online { "online" } else { "offline" },
                e
            );
            Outcome::WriteFailed { reason: e.to_string() }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkAction {
    OfflineEfficiency,
    OfflineAllButBoot,
    OnlineAll,
    // SET scaling_governor ON EVERY ONLINE UNIT
    Governor(String),
}

impl BulkAction {
    pub fn label(&self) -> String {
        match self {
            Self::OfflineEfficiency => "offline efficiency cores".to_string(),
            Self::OfflineAllButBoot => "offline all but cpu0".to_string(),
            Self::OnlineAll => "online all cores".to_string(),
            Self::Governor(g) => format!("governor {}", g),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub changed: usize,
    pub unchanged: usize,
    // PER-UNIT FAILURES, IN CPU ORDER
    pub failures: Vec<(u32, Outcome)>,
    // ENUMERATION ITSELF FAILED: NOTHING WAS ATTEMPTED
    pub error: Option<String>,
}

impl BulkReport {
    pub fn is_failure(&self) -> bool {
        self.error.is_some() || !self.failures.is_empty()
    }

    fn record(&mut self, id: u32, outcome: Outcome) {
        match outcome {
            Outcome::Applied { .. } => self.changed += 1,
            Outcome::AlreadySatisfied => self.unchanged += 1,
            other => self.failures.push((id, other)),
        }
    }
}

impl fmt::Display for BulkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(e) = &self.error {
            return write!(f, "FAILED ({})", e);
        }
        write!(f, "{} CHANGED, {} ALREADY SET", self.changed, self.unchanged)?;
        if !self.failures.is_empty() {
            write!(f, ", {} FAILED", self.failures.len())?;
        }
        Ok(())
    }
}

// SEQUENTIAL FOLD OVER A FRESH ENUMERATION
pub fn run_bulk<H: Host + ?Sized>(
    host: &H,
    action: &BulkAction,
    threshold_khz: u64,
    default_governor: &str,
    handle: &ElevatedHandle,
) -> BulkReport {
    let mut report = BulkReport::default();

    let units = match enumerate(host, threshold_khz) {
        Ok(u) => u,
        Err(e) => {
            warn!("{}: {}", action.label(), e);
            report.error = Some(e.to_string());
            return report;
        }
    };

    for unit in &units {
        let outcome = match action {
            BulkAction::OfflineEfficiency => {
                if unit.id == BOOT_CPU || unit.role != Role::Efficiency {
                    continue;
                }
                set_online(host, unit, false, handle)
            }
            BulkAction::OfflineAllButBoot => {
                if unit.id == BOOT_CPU {
                    continue;
                }
                set_online(host, unit, false, handle)
            }
            BulkAction::OnlineAll => set_online(host, unit, true, handle),
            BulkAction::Governor(g) => {
                if !unit.online {
                    continue;
                }
                let t = tunables::governor(unit.id, g, default_governor);
                toggle::apply(host, &t, g, handle)
            }
        };
        report.record(unit.id, outcome);
    }

    debug!("{}: {}", action.label(), report);
    report
}
