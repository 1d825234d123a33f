// PERFPREP PROFILES
// A PROFILE IS AN ORDERED LIST OF STEPS. RUNNING ONE:
//   1. ELEVATE ONCE. FAILURE ABORTS WITH ZERO STEPS RUN (THE ONLY FAIL-FAST PATH).
//   2. RUN EVERY STEP IN ORDER. FAILED STEPS ARE RECORDED, NEVER UNWOUND.

use log::info;

use crate::config::{Config, ARMED_GOVERNOR};
use crate::error::{ElevationFailed, Error, Result};
use crate::host::Host;
use crate::privilege::{ElevatedHandle, PrivilegeContext};
use crate::toggle::{self, Outcome};
use crate::topology::{self, BulkAction, BulkReport};
use crate::tunables::{Group, Target, Tunable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Toggle { tunable: Tunable, target: Target },
    Bulk(BulkAction),
}

impl Step {
    pub fn label(&self) -> String {
        match self {
            Self::Toggle { tunable, .. } => tunable.name.to_string(),
            Self::Bulk(action) => action.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub steps: Vec<Step>,
    // EFFICIENCY-CORE CUTOFF AND RESTORE GOVERNOR, CARRIED FROM Config
    pub threshold_khz: u64,
    pub default_governor: String,
}

// NAME, ONE-LINE DESCRIPTION
pub const REGISTRY: &[(&str, &str)] = &[
    ("profiling-mode", "relax tracing restrictions, pin frequency, SMT off, ASLR off"),
    ("restore-defaults", "put every knob back to its secure default, all cores online"),
    ("disable-ecores", "offline efficiency cores"),
    ("enable-ecores", "bring every core back online"),
    ("single-core", "offline every core except cpu0"),
    ("all-cores", "bring every core back online"),
];

impl Profile {
    pub fn new(name: impl Into<String>, cfg: &Config) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            threshold_khz: cfg.ecore_threshold_khz,
            default_governor: cfg.default_governor.clone(),
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    fn group_steps(mut self, group: Group, target: Target) -> Self {
        for t in group.tunables() {
            self.steps.push(Step::Toggle { tunable: t.clone(), target });
        }
        if group == Group::FrequencyScaling {
            let g = match target {
                Target::Armed => ARMED_GOVERNOR.to_string(),
                Target::Default => self.default_governor.clone(),
            };
            self.steps.push(Step::Bulk(BulkAction::Governor(g)));
        }
        self
    }

    // ONE TOGGLE GROUP, ONE DIRECTION
    pub fn group(group: Group, target: Target, cfg: &Config) -> Self {
        let name = format!(
            "{}-{}",
            group.label(),
            match target {
                Target::Armed => "armed",
                Target::Default => "default",
            }
        );
        Self::new(name, cfg).group_steps(group, target)
    }

    pub fn profiling_mode(cfg: &Config) -> Self {
        Self::new("profiling-mode", cfg)
            .group_steps(Group::TracingAccess, Target::Armed)
            .group_steps(Group::FrequencyScaling, Target::Armed)
            .group_steps(Group::Smt, Target::Armed)
            .group_steps(Group::Aslr, Target::Armed)
    }

    // SMT BEFORE HOTPLUG: smt/control=on BRINGS SIBLINGS BACK ITSELF.
    // GOVERNOR LAST SO FRESHLY ONLINED UNITS ARE COVERED.
    pub fn restore_defaults(cfg: &Config) -> Self {
        Self::new("restore-defaults", cfg)
            .group_steps(Group::TracingAccess, Target::Default)
            .group_steps(Group::Aslr, Target::Default)
            .group_steps(Group::Smt, Target::Default)
            .step(Step::Bulk(BulkAction::OnlineAll))
            .group_steps(Group::FrequencyScaling, Target::Default)
    }

    pub fn by_name(name: &str, cfg: &Config) -> Result<Self> {
        let p = match name {
            "profiling-mode" => Self::profiling_mode(cfg),
            "restore-defaults" => Self::restore_defaults(cfg),
            "disable-ecores" => Self::new(name, cfg).step(Step::Bulk(BulkAction::OfflineEfficiency)),
            "enable-ecores" => Self::new(name, cfg).step(Step::Bulk(BulkAction::OnlineAll)),
            "single-core" => Self::new(name, cfg).step(Step::Bulk(BulkAction::OfflineAllButBoot)),
            "all-cores" => Self::new(name, cfg).step(Step::Bulk(BulkAction::OnlineAll)),
            _ => return Err(Error::UnknownProfile(name.to_string())),
        };
        Ok(p)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Toggle(Outcome),
    Bulk(BulkReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub label: String,
    pub result: StepResult,
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        match &self.result {
            StepResult::Toggle(o) => o.is_failure(),
            StepResult::Bulk(r) => r.is_failure(),
        }
    }

    // UNITS OF STATE ACTUALLY MUTATED BY THIS STEP
    pub fn changed(&self) -> usize {
        match &self.result {
            StepResult::Toggle(o) => o.changed() as usize,
            StepResult::Bulk(r) => r.changed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileResult {
    pub profile: String,
    pub steps: Vec<StepOutcome>,
    pub aborted: Option<ElevationFailed>,
}

impl ProfileResult {
    pub fn aborted(&self) -> bool {
        self.aborted.is_some()
    }

    pub fn changed(&self) -> usize {
        self.steps.iter().map(StepOutcome::changed).sum()
    }

    pub fn failed(&self) -> usize {
        self.steps.iter().filter(|s| s.is_failure()).count()
    }
}

pub fn run_step<H: Host + ?Sized>(
    host: &H,
    profile: &Profile,
    step: &Step,
    handle: &ElevatedHandle,
) -> StepOutcome {
    let result = match step {
        Step::Toggle { tunable, target } => {
            StepResult::Toggle(toggle::apply(host, tunable, tunable.value_for(*target), handle))
        }
        Step::Bulk(action) => StepResult::Bulk(topology::run_bulk(
            host,
            action,
            profile.threshold_khz,
            &profile.default_governor,
            handle,
        )),
    };
    StepOutcome { label: step.label(), result }
}

// on_step FIRES AFTER EACH STEP, IN ORDER, BEFORE THE NEXT ONE STARTS
pub fn run_with<H, F>(
    profile: &Profile,
    host: &H,
    ctx: &mut PrivilegeContext<'_>,
    mut on_step: F,
) -> ProfileResult
where
    H: Host + ?Sized,
    F: FnMut(&StepOutcome),
{
    let mut result = ProfileResult {
        profile: profile.name.clone(),
        steps: Vec::with_capacity(profile.steps.len()),
        aborted: None,
    };

    if profile.steps.is_empty() {
        return result;
    }

    let handle = match ctx.ensure() {
        Ok(h) => h,
        Err(e) => {
            result.aborted = Some(e);
            return result;
        }
    };

    info!("running {} ({} steps)", profile.name, profile.steps.len());
    for step in &profile.steps {
        let outcome = run_step(host, profile, step, &handle);
        on_step(&outcome);
        result.steps.push(outcome);
    }

    result
}

pub fn run<H: Host + ?Sized>(
    profile: &Profile,
    host: &H,
    ctx: &mut PrivilegeContext<'_>,
) -> ProfileResult {
    run_with(profile, host, ctx, |_| {})
}
