// READ-ONLY SNAPSHOT OF EVERY KNOB PERFPREP MANAGES. NEVER ELEVATES.

use anyhow::Result;

use perfprep::config::Config;
use perfprep::host::{parse_cpu_range, Host};
use perfprep::toggle::{self, Position};
use perfprep::topology;
use perfprep::tunables::{self, Group};

fn position_label(p: &Position) -> String {
    match p {
        Position::Armed => "ARMED".to_string(),
        Position::Default => "DEFAULT".to_string(),
        Position::Other(v) => format!("OTHER ({})", v),
        Position::Missing => "NOT PRESENT".to_string(),
        Position::Unreadable(e) => format!("UNREADABLE ({})", e),
    }
}

pub fn run_status<H: Host + ?Sized>(host: &H, cfg: &Config) -> Result<()> {
    println!("PERFPREP STATUS");
    println!();

    for group in Group::ALL {
        println!("{}:", group.label().to_uppercase());
        for t in group.tunables() {
            let current = host
                .read(&t.location)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| "-".to_string());
            println!(
                "  {:<24}{:<14}{}",
                t.name,
                current,
                position_label(&toggle::position(host, t))
            );
        }
    }
    println!();

    let online = host
        .read(&format!("{}/online", tunables::CPU_SYSFS_DIR))
        .map(|raw| parse_cpu_range(&raw))
        .unwrap_or(0);
    let units = topology::enumerate(host, cfg.ecore_threshold_khz)?;

    println!(
        "CPUS: {} ONLINE / {} PRESENT (E-CORE THRESHOLD {} kHz)",
        online,
        units.len(),
        cfg.ecore_threshold_khz
    );
    println!("  {:<6}{:<8}{:<12}{:<8}{}", "CPU", "ONLINE", "BASE kHz", "ROLE", "GOVERNOR");
    println!("  {}", "-".repeat(46));
    for u in &units {
        let freq = u.base_freq_khz.map(|f| f.to_string()).unwrap_or_else(|| "-".to_string());
        let governor = host
            .read(&tunables::cpu_governor_path(u.id))
            .map(|g| g.trim().to_string())
            .unwrap_or_else(|_| "-".to_string());
        println!(
            "  {:<6}{:<8}{:<12}{:<8}{}",
            u.id,
            if u.online { "yes" } else { "no" },
            freq,
            u.role.label(),
            governor
        );
    }

    Ok(())
}
