// PERFPREP CLI PLUMBING
// PROFILE EXECUTION WITH DEFERRED CTRL+C, EXIT CODES

pub mod check;
pub mod status;

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use perfprep::host::Host;
use perfprep::privilege::PrivilegeContext;
use perfprep::profile::{self, Profile, ProfileResult};
use perfprep::report;

pub const EXIT_ELEVATION_FAILED: i32 = 2;
pub const EXIT_INTERRUPTED: i32 = 130;

// SET WHILE WRITES ARE IN FLIGHT. CTRL+C IS THEN RECORDED AND HONOURED
// ONLY AFTER THE LAST STEP HAS RUN.
static IN_PROFILE: AtomicBool = AtomicBool::new(false);
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

pub fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(move || {
        if IN_PROFILE.load(Ordering::SeqCst) {
            if !INTERRUPTED.swap(true, Ordering::SeqCst) {
                eprintln!("INTERRUPT DEFERRED UNTIL THE CURRENT PROFILE COMPLETES");
            }
        } else {
            std::process::exit(EXIT_INTERRUPTED);
        }
    })?;
    Ok(())
}

pub fn run_profile<H: Host + ?Sized>(
    profile: &Profile,
    host: &H,
    ctx: &mut PrivilegeContext<'_>,
) -> ProfileResult {
    println!("PERFPREP: {}", profile.name.to_uppercase());
    println!();

    IN_PROFILE.store(true, Ordering::SeqCst);
    let result = profile::run_with(profile, host, ctx, report::print_step);
    IN_PROFILE.store(false, Ordering::SeqCst);

    report::print_summary(&result);
    result
}

// 0 EVEN WITH RECORDED STEP FAILURES: ONLY ELEVATION FAILURE IS A RUN FAILURE
pub fn exit_code(result: &ProfileResult) -> i32 {
    if result.aborted() {
        EXIT_ELEVATION_FAILED
    } else if INTERRUPTED.load(Ordering::SeqCst) {
        EXIT_INTERRUPTED
    } else {
        0
    }
}
