// PERFPREP PROFILE TESTS
// FAIL-FAST ON ELEVATION, PARTIAL-FAILURE TOLERANCE, END-TO-END ROUND TRIPS.

mod common;

use common::{FakeElevator, FakeHost};
use perfprep::config::Config;
use perfprep::privilege::PrivilegeContext;
use perfprep::profile::{run, run_with, Profile, Step, StepResult};
use perfprep::toggle::Outcome;
use perfprep::topology::BulkAction;
use perfprep::tunables::{
    Target, KPTR_RESTRICT, PERF_EVENT_PARANOID, PTRACE_SCOPE, RANDOMIZE_VA_SPACE,
};

const PARANOID: &str = "/proc/sys/kernel/perf_event_paranoid";
const KPTR: &str = "/proc/sys/kernel/kptr_restrict";
const PTRACE: &str = "/proc/sys/kernel/yama/ptrace_scope";
const ASLR: &str = "/proc/sys/kernel/randomize_va_space";
const SMT: &str = "/sys/devices/system/cpu/smt/control";
const NO_TURBO: &str = "/sys/devices/system/cpu/intel_pstate/no_turbo";

// A TYPICAL INTEL LAPTOP AT DISTRO DEFAULTS. NO rdpmc, NO cpufreq/boost.
fn stock_host() -> FakeHost {
    let host = FakeHost::new()
        .with(PARANOID, "2")
        .with(KPTR, "1")
        .with(PTRACE, "1")
        .with(ASLR, "2")
        .with(SMT, "on")
        .with(NO_TURBO, "0");
    host.add_cpu(0, Some(3_600_000), true);
    host.add_cpu(1, Some(3_600_000), true);
    host.add_cpu(2, Some(2_000_000), true);
    host
}

fn outcome_of<'a>(steps: &'a [perfprep::profile::StepOutcome], label: &str) -> &'a StepResult {
    &steps.iter().find(|s| s.label == label).unwrap().result
}

// === FAIL-FAST ON ELEVATION ===

#[test]
fn elevation_failure_aborts_with_no_steps_and_no_writes() {
    let host = stock_host();
    let elevator = FakeElevator::sudo(false);
    let mut ctx = PrivilegeContext::new(&elevator);

    let result = run(&Profile::profiling_mode(&Config::default()), &host, &mut ctx);

    assert!(result.aborted());
    assert!(result.steps.is_empty());
    assert_eq!(host.write_count(), 0);
    assert_eq!(elevator.attempts.get(), 1);
}

#[test]
fn elevation_requested_once_per_profile() {
    let host = stock_host();
    let elevator = FakeElevator::sudo(true);
    let mut ctx = PrivilegeContext::new(&elevator);

    let result = run(&Profile::profiling_mode(&Config::default()), &host, &mut ctx);

    assert!(!result.aborted());
    assert_eq!(elevator.attempts.get(), 1);
}

#[test]
fn privileged_caller_never_prompts() {
    let host = stock_host();
    let elevator = FakeElevator::root();
    let mut ctx = PrivilegeContext::new(&elevator);
    run(&Profile::restore_defaults(&Config::default()), &host, &mut ctx);
    assert_eq!(elevator.attempts.get(), 0);
}

// === PARTIAL-FAILURE TOLERANCE ===

#[test]
fn restore_continues_after_failed_step() {
    let host = FakeHost::new()
        .with(PARANOID, "-1")
        .with(KPTR, "0")
        .with(PTRACE, "0")
        .with(ASLR, "0");
    host.fail_writes(KPTR);

    let cfg = Config::default();
    let profile = Profile::new("restore-four", &cfg)
        .step(Step::Toggle { tunable: PERF_EVENT_PARANOID, target: Target::Default })
        .step(Step::Toggle { tunable: KPTR_RESTRICT, target: Target::Default })
        .step(Step::Toggle { tunable: PTRACE_SCOPE, target: Target::Default })
        .step(Step::Toggle { tunable: RANDOMIZE_VA_SPACE, target: Target::Default });

    let elevator = FakeElevator::root();
    let mut ctx = PrivilegeContext::new(&elevator);
    let result = run(&profile, &host, &mut ctx);

    assert!(!result.aborted());
    assert_eq!(result.steps.len(), 4);
    assert!(matches!(result.steps[1].result, StepResult::Toggle(Outcome::WriteFailed { .. })));
    assert!(!result.steps[2].is_failure());
    assert!(!result.steps[3].is_failure());
    assert_eq!(host.get(PTRACE).as_deref(), Some("1"));
    assert_eq!(host.get(ASLR).as_deref(), Some("2"));
    assert_eq!(result.failed(), 1);
    assert_eq!(result.changed(), 3);
}

#[test]
fn unsupported_knobs_do_not_stop_profiling_mode() {
    let host = stock_host();
    let elevator = FakeElevator::root();
    let mut ctx = PrivilegeContext::new(&elevator);

    let result = run(&Profile::profiling_mode(&Config::default()), &host, &mut ctx);

    assert_eq!(result.steps.len(), 9);
    assert!(matches!(
        outcome_of(&result.steps, "rdpmc"),
        StepResult::Toggle(Outcome::Unsupported { .. })
    ));
    assert!(matches!(
        outcome_of(&result.steps, "cpufreq_boost"),
        StepResult::Toggle(Outcome::Unsupported { .. })
    ));
    // LAST STEP STILL RAN
    assert_eq!(host.get(ASLR).as_deref(), Some("0"));
}

// === END-TO-END ===

#[test]
fn paranoid_round_trip() {
    let host = stock_host();
    let elevator = FakeElevator::root();
    let cfg = Config::default();

    let mut ctx = PrivilegeContext::new(&elevator);
    let first = run(&Profile::profiling_mode(&cfg), &host, &mut ctx);
    assert_eq!(
        outcome_of(&first.steps, "perf_event_paranoid"),
        &StepResult::Toggle(Outcome::Applied { previous: "2".into() })
    );
    assert_eq!(host.writes_to(PARANOID), vec!["-1"]);

    let mut ctx = PrivilegeContext::new(&elevator);
    let second = run(&Profile::profiling_mode(&cfg), &host, &mut ctx);
    assert_eq!(
        outcome_of(&second.steps, "perf_event_paranoid"),
        &StepResult::Toggle(Outcome::AlreadySatisfied)
    );
    assert_eq!(second.changed(), 0);
    assert_eq!(host.writes_to(PARANOID), vec!["-1"]);

    let mut ctx = PrivilegeContext::new(&elevator);
    let restore = run(&Profile::restore_defaults(&cfg), &host, &mut ctx);
    assert_eq!(
        outcome_of(&restore.steps, "perf_event_paranoid"),
        &StepResult::Toggle(Outcome::Applied { previous: "-1".into() })
    );
    assert_eq!(host.writes_to(PARANOID), vec!["-1", "2"]);
}

#[test]
fn profiling_mode_then_restore_returns_to_stock() {
    let host = stock_host();
    let elevator = FakeElevator::root();
    let cfg = Config::default();

    let mut ctx = PrivilegeContext::new(&elevator);
    run(&Profile::profiling_mode(&cfg), &host, &mut ctx);
    assert_eq!(host.get(SMT).as_deref(), Some("off"));
    assert_eq!(host.get(NO_TURBO).as_deref(), Some("1"));
    assert_eq!(
        host.get("/sys/devices/system/cpu/cpu2/cpufreq/scaling_governor").as_deref(),
        Some("performance")
    );

    let mut ctx = PrivilegeContext::new(&elevator);
    run(&Profile::restore_defaults(&cfg), &host, &mut ctx);
    let stock = stock_host();
    for path in [PARANOID, KPTR, PTRACE, ASLR, SMT, NO_TURBO] {
        assert_eq!(host.get(path), stock.get(path), "{} not restored", path);
    }
    assert_eq!(
        host.get("/sys/devices/system/cpu/cpu2/cpufreq/scaling_governor").as_deref(),
        Some("powersave")
    );
}

#[test]
fn disable_ecores_profile_reports_two_changed() {
    let host = FakeHost::new();
    host.add_cpu(0, Some(3_600_000), true);
    host.add_cpu(1, Some(2_000_000), true);
    host.add_cpu(2, Some(1_800_000), true);

    let elevator = FakeElevator::root();
    let mut ctx = PrivilegeContext::new(&elevator);
    let profile = Profile::by_name("disable-ecores", &Config::default()).unwrap();
    let result = run(&profile, &host, &mut ctx);

    assert_eq!(result.steps.len(), 1);
    match &result.steps[0].result {
        StepResult::Bulk(r) => assert_eq!(r.changed, 2),
        other => panic!("expected bulk result, got {:?}", other),
    }
    assert!(host.is_online(0));
    assert!(!host.is_online(1));
    assert!(!host.is_online(2));
}

#[test]
fn restore_brings_cores_back() {
    let host = stock_host();
    let elevator = FakeElevator::root();
    let cfg = Config::default();

    let mut ctx = PrivilegeContext::new(&elevator);
    run(&Profile::by_name("single-core", &cfg).unwrap(), &host, &mut ctx);
    assert!(!host.is_online(1) && !host.is_online(2));

    let mut ctx = PrivilegeContext::new(&elevator);
    let result = run(&Profile::restore_defaults(&cfg), &host, &mut ctx);
    assert!(host.is_online(1) && host.is_online(2));
    assert!(result
        .steps
        .iter()
        .any(|s| s.label == BulkAction::OnlineAll.label() && s.changed() == 2));
}

#[test]
fn run_with_reports_each_step_in_order() {
    let host = stock_host();
    let elevator = FakeElevator::root();
    let mut ctx = PrivilegeContext::new(&elevator);
    let profile = Profile::restore_defaults(&Config::default());

    let mut seen = Vec::new();
    let result = run_with(&profile, &host, &mut ctx, |s| seen.push(s.label.clone()));

    let expected: Vec<String> = profile.steps.iter().map(Step::label).collect();
    assert_eq!(seen, expected);
    assert_eq!(result.steps.len(), expected.len());
}

#[test]
fn empty_profile_never_elevates() {
    let host = stock_host();
    let elevator = FakeElevator::sudo(false);
    let mut ctx = PrivilegeContext::new(&elevator);
    let result = run(&Profile::new("nothing", &Config::default()), &host, &mut ctx);
    assert!(!result.aborted());
    assert_eq!(elevator.attempts.get(), 0);
}
