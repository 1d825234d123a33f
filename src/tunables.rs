// PERFPREP TUNABLE REGISTRY
// PURE DATA: EVERY KERNEL KNOB PERFPREP TOUCHES, WITH ITS ARMED AND DEFAULT VALUE.
// ARMED = PROFILING-FRIENDLY. DEFAULT = SECURE / DISTRO STOCK.

use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    // COMPARED AS i64, NO TOLERANCE
    Integer,
    // COMPARED BY EXACT STRING MATCH. A CURRENT VALUE OUTSIDE THE
    // VOCABULARY MEANS THE KERNEL CANNOT BE TOLD WHAT TO DO (forceoff, notsupported)
    Token(&'static [&'static str]),
}

pub const SMT_TOKENS: &[&str] = &["on", "off"];

pub const GOVERNOR_TOKENS: &[&str] = &[
    "performance",
    "powersave",
    "schedutil",
    "ondemand",
    "conservative",
    "userspace",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tunable {
    pub name: Cow<'static, str>,
    pub location: Cow<'static, str>,
    pub kind: ValueKind,
    pub armed: Cow<'static, str>,
    pub default: Cow<'static, str>,
}

impl Tunable {
    pub const fn new_static(
        name: &'static str,
        location: &'static str,
        kind: ValueKind,
        armed: &'static str,
        default: &'static str,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            location: Cow::Borrowed(location),
            kind,
            armed: Cow::Borrowed(armed),
            default: Cow::Borrowed(default),
        }
    }

    pub fn value_for(&self, target: Target) -> &str {
        match target {
            Target::Armed => &self.armed,
            Target::Default => &self.default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Armed,
    Default,
}

impl Target {
    pub fn label(self) -> &'static str {
        match self {
            Self::Armed => "ARMED",
            Self::Default => "DEFAULT",
        }
    }
}

// TRACING ACCESS

pub const PERF_EVENT_PARANOID: Tunable = Tunable::new_static(
    "perf_event_paranoid",
    "/proc/sys/kernel/perf_event_paranoid",
    ValueKind::Integer,
    "-1",
    "2",
);

pub const KPTR_RESTRICT: Tunable = Tunable::new_static(
    "kptr_restrict",
    "/proc/sys/kernel/kptr_restrict",
    ValueKind::Integer,
    "0",
    "1",
);

pub const PTRACE_SCOPE: Tunable = Tunable::new_static(
    "ptrace_scope",
    "/proc/sys/kernel/yama/ptrace_scope",
    ValueKind::Integer,
    "0",
    "1",
);

// 2 = RDPMC ALLOWED FROM ANY PROCESS, 1 = ONLY WHILE A PERF EVENT IS MMAPPED
pub const RDPMC: Tunable = Tunable::new_static(
    "rdpmc",
    "/sys/bus/event_source/devices/cpu/rdpmc",
    ValueKind::Integer,
    "2",
    "1",
);

// ADDRESS SPACE LAYOUT RANDOMIZATION

pub const RANDOMIZE_VA_SPACE: Tunable = Tunable::new_static(
    "randomize_va_space",
    "/proc/sys/kernel/randomize_va_space",
    ValueKind::Integer,
    "0",
    "2",
);

// SIMULTANEOUS MULTITHREADING

pub const SMT_CONTROL: Tunable = Tunable::new_static(
    "smt_control",
    "/sys/devices/system/cpu/smt/control",
    ValueKind::Token(SMT_TOKENS),
    "off",
    "on",
);

// FREQUENCY SCALING
// ONLY ONE OF THE TWO TURBO KNOBS EXISTS ON A GIVEN HOST. THE OTHER REPORTS UNSUPPORTED.

pub const INTEL_NO_TURBO: Tunable = Tunable::new_static(
    "intel_no_turbo",
    "/sys/devices/system/cpu/intel_pstate/no_turbo",
    ValueKind::Integer,
    "1",
    "0",
);

pub const CPUFREQ_BOOST: Tunable = Tunable::new_static(
    "cpufreq_boost",
    "/sys/devices/system/cpu/cpufreq/boost",
    ValueKind::Integer,
    "0",
    "1",
);

pub const CPU_SYSFS_DIR: &str = "/sys/devices/system/cpu";

pub fn cpu_online_path(id: u32) -> String {
    format!("{}/cpu{}/online", CPU_SYSFS_DIR, id)
}

pub fn cpu_base_freq_path(id: u32) -> String {
    format!("{}/cpu{}/cpufreq/base_frequency", CPU_SYSFS_DIR, id)
}

pub fn cpu_governor_path(id: u32) -> String {
    format!("{}/cpu{}/cpufreq/scaling_governor", CPU_SYSFS_DIR, id)
}

// PER-CPU GOVERNOR DESCRIPTOR. BUILT AT RUNTIME FOR EACH ENUMERATED UNIT.
pub fn governor(id: u32, armed: &str, default: &str) -> Tunable {
    Tunable {
        name: Cow::Owned(format!("cpu{}_governor", id)),
        location: Cow::Owned(cpu_governor_path(id)),
        kind: ValueKind::Token(GOVERNOR_TOKENS),
        armed: Cow::Owned(armed.to_string()),
        default: Cow::Owned(default.to_string()),
    }
}

// TOGGLE GROUPS: THE FOUR INDEPENDENTLY SWITCHABLE UNITS OF THE CLI

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    TracingAccess,
    Aslr,
    Smt,
    FrequencyScaling,
}

impl Group {
    pub const ALL: &'static [Group] = &[
        Group::TracingAccess,
        Group::Aslr,
        Group::Smt,
        Group::FrequencyScaling,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::TracingAccess => "tracing-access",
            Self::Aslr => "aslr",
            Self::Smt => "smt",
            Self::FrequencyScaling => "frequency-scaling",
        }
    }

    // STATIC TUNABLES OF THE GROUP. FREQUENCY SCALING ALSO HAS THE
    // PER-CPU GOVERNOR FOLD, WHICH LIVES IN profile.rs.
    pub fn tunables(self) -> &'static [Tunable] {
        match self {
            Self::TracingAccess => TRACING_ACCESS,
            Self::Aslr => ASLR,
            Self::Smt => SMT,
            Self::FrequencyScaling => FREQUENCY_SCALING,
        }
    }
}

const TRACING_ACCESS: &[Tunable] = &[PERF_EVENT_PARANOID, KPTR_RESTRICT, PTRACE_SCOPE, RDPMC];
const ASLR: &[Tunable] = &[RANDOMIZE_VA_SPACE];
const SMT: &[Tunable] = &[SMT_CONTROL];
const FREQUENCY_SCALING: &[Tunable] = &[INTEL_NO_TURBO, CPUFREQ_BOOST];

// EVERY STATIC TUNABLE, IN REPORTING ORDER
pub fn all() -> impl Iterator<Item = &'static Tunable> {
    Group::ALL.iter().flat_map(|g| g.tunables().iter())
}
