use std::io::Read;
use std::process::Command;

use anyhow::Result;

use perfprep::host::{Host, SysfsHost};
use perfprep::tunables::{self, CPU_SYSFS_DIR};

const KERNEL_OPTIONS: &[&str] = &[
    "CONFIG_PERF_EVENTS",
    "CONFIG_HOTPLUG_CPU",
    "CONFIG_SCHED_SMT",
    "CONFIG_CPU_FREQ",
    "CONFIG_SECURITY_YAMA",
];

fn check_tool(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// MISSING OR UNREADABLE config.gz IS SKIPPED, NOT FAILED
fn check_kernel_config(host: &SysfsHost) -> bool {
    let file = match std::fs::File::open(host.resolve("/proc/config.gz")) {
        Ok(f) => f,
        Err(_) => {
            println!("  /proc/config.gz         NOT FOUND (SKIPPED)");
            return true;
        }
    };
    let mut decoder = flate2::read::GzDecoder::new(file);
    let mut config = String::new();
    if decoder.read_to_string(&mut config).is_err() {
        println!("  /proc/config.gz         UNREADABLE (SKIPPED)");
        return true;
    }

    let mut ok = true;
    for opt in KERNEL_OPTIONS {
        let set = config.lines().any(|l| l == format!("{}=y", opt));
        if set {
            println!("  {:<24}OK", opt);
        } else {
            println!("  {:<24}NOT SET", opt);
            ok = false;
        }
    }
    ok
}

pub fn run_check(host: &SysfsHost) -> Result<bool> {
    println!("PERFPREP DEPENDENCY CHECK");
    println!();

    let mut ok = true;
    for tool in ["sudo"] {
        if check_tool(tool) {
            println!("  {:<24}OK", tool);
        } else if unsafe { libc::geteuid() } == 0 {
            println!("  {:<24}MISSING (RUNNING AS ROOT, NOT NEEDED)", tool);
        } else {
            println!("  {:<24}MISSING", tool);
            ok = false;
        }
    }
    println!();

    println!("KERNEL CONFIG:");
    if !check_kernel_config(host) {
        ok = false;
    }
    println!();

    // ABSENT KNOBS ARE REPORTED, NOT FAILED: PROFILES SKIP THEM AS UNSUPPORTED
    println!("TUNABLES:");
    for t in tunables::all() {
        let state = if host.exists(&t.location) { "AVAILABLE" } else { "NOT PRESENT" };
        println!("  {:<24}{:<12}{}", t.name, state, t.location);
    }
    let cpu_dir_ok = host.exists(CPU_SYSFS_DIR);
    println!(
        "  {:<24}{}",
        "cpu hotplug",
        if cpu_dir_ok { "AVAILABLE" } else { "NOT PRESENT" }
    );
    if !cpu_dir_ok {
        ok = false;
    }
    println!();

    if ok {
        println!("ALL CHECKS PASSED");
    } else {
        println!("SOME CHECKS FAILED");
        if !check_tool("sudo") {
            println!("  Install sudo or run perfprep as root");
        }
    }

    Ok(ok)
}
