// PERFPREP -- PROFILING HOST PREPARATION FOR LINUX
// FLIPS THE KERNEL KNOBS THAT STAND BETWEEN A PROFILER AND CLEAN NUMBERS,
// AND PUTS THEM BACK AFTERWARDS.
//
// EVERY WRITE IS IDEMPOTENT: A KNOB ALREADY IN PLACE IS NEVER TOUCHED.

mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use log::debug;

use perfprep::config::{Config, DEFAULT_ECORE_THRESHOLD_KHZ, DEFAULT_GOVERNOR};
use perfprep::host::SysfsHost;
use perfprep::privilege::{PrivilegeContext, SudoElevator};
use perfprep::profile::{Profile, REGISTRY};
use perfprep::tunables::{Group, Target};

#[derive(Parser)]
#[command(name = "perfprep")]
#[command(about = "PERFPREP -- PREPARE A LINUX HOST FOR LOW-LEVEL PROFILING")]
struct Cli {
    // PREFIX FOR EVERY KERNEL PATH (POINT AT A FAKE TREE TO DRY-RUN)
    #[arg(long, global = true, default_value = "/")]
    root: PathBuf,

    // CPUS WITH base_frequency BELOW THIS (kHz) ARE EFFICIENCY CORES
    #[arg(long, global = true, default_value_t = DEFAULT_ECORE_THRESHOLD_KHZ)]
    ecore_threshold_khz: u64,

    // GOVERNOR RESTORED WHEN FREQUENCY SCALING IS RE-ENABLED
    #[arg(long, global = true, default_value = DEFAULT_GOVERNOR)]
    default_governor: String,

    // FAIL INSTEAD OF PROMPTING FOR A SUDO PASSWORD
    #[arg(long, global = true)]
    non_interactive: bool,

    // DEBUG LOGGING ON STDERR
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    Enable,
    Disable,
}

#[derive(Subcommand)]
enum Command {
    /// Run a named profile (see `list`)
    Profile { name: String },
    /// Relax (enable) or restore (disable) perf/ptrace/kptr/rdpmc access
    Tracing { switch: Switch },
    /// Address space layout randomization
    Aslr { switch: Switch },
    /// Simultaneous multithreading
    Smt { switch: Switch },
    /// Dynamic frequency scaling: turbo boost and cpufreq governor
    FreqScaling { switch: Switch },
    /// Efficiency cores (disable offlines them, enable brings all cores back)
    Ecores { switch: Switch },
    /// Single-core mode (enable offlines all but cpu0, disable brings all cores back)
    SingleCore { switch: Switch },
    /// Show current value of every managed knob and the core table
    Status,
    /// Check dependencies, kernel config and knob availability
    Check,
    /// List named profiles
    List,
}

// WHICH SWITCH POSITION IS THE PROFILING-FRIENDLY ONE
fn group_target(group: Group, switch: Switch) -> Target {
    let armed_on_enable = group == Group::TracingAccess;
    match (switch, armed_on_enable) {
        (Switch::Enable, true) | (Switch::Disable, false) => Target::Armed,
        _ => Target::Default,
    }
}

fn resolve_profile(command: &Command, cfg: &Config) -> Result<Option<Profile>> {
    let profile = match command {
        Command::Profile { name } => Profile::by_name(name, cfg)?,
        Command::Tracing { switch } => {
            Profile::group(Group::TracingAccess, group_target(Group::TracingAccess, *switch), cfg)
        }
        Command::Aslr { switch } => Profile::group(Group::Aslr, group_target(Group::Aslr, *switch), cfg),
        Command::Smt { switch } => Profile::group(Group::Smt, group_target(Group::Smt, *switch), cfg),
        Command::FreqScaling { switch } => Profile::group(
            Group::FrequencyScaling,
            group_target(Group::FrequencyScaling, *switch),
            cfg,
        ),
        Command::Ecores { switch } => match switch {
            Switch::Disable => Profile::by_name("disable-ecores", cfg)?,
            Switch::Enable => Profile::by_name("enable-ecores", cfg)?,
        },
        Command::SingleCore { switch } => match switch {
            Switch::Enable => Profile::by_name("single-core", cfg)?,
            Switch::Disable => Profile::by_name("all-cores", cfg)?,
        },
        Command::Status | Command::Check | Command::List => return Ok(None),
    };
    Ok(Some(profile))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loglevel = if cli.verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let mut lcfg = simplelog::ConfigBuilder::new();
    lcfg.set_time_level(simplelog::LevelFilter::Error)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);
    simplelog::TermLogger::init(
        loglevel,
        lcfg.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let cfg = Config {
        root: cli.root.clone(),
        ecore_threshold_khz: cli.ecore_threshold_khz,
        default_governor: cli.default_governor.clone(),
        non_interactive: cli.non_interactive,
    };
    cfg.validate()?;
    debug!("{:?}", cfg);

    let host = SysfsHost::new(&cfg.root);

    match &cli.command {
        Command::Status => return cli::status::run_status(&host, &cfg),
        Command::Check => {
            if !cli::check::run_check(&host)? {
                std::process::exit(1);
            }
            return Ok(());
        }
        Command::List => {
            for (name, about) in REGISTRY {
                println!("  {:<20}{}", name, about);
            }
            return Ok(());
        }
        _ => {}
    }

    let profile = match resolve_profile(&cli.command, &cfg)? {
        Some(p) => p,
        None => return Ok(()),
    };

    cli::install_interrupt_handler()?;

    // ONE CONTEXT, ONE PROFILE, AT MOST ONE PASSWORD PROMPT
    let elevator = SudoElevator::new(cfg.non_interactive);
    let mut ctx = PrivilegeContext::new(&elevator);
    let result = cli::run_profile(&profile, &host, &mut ctx);

    let code = cli::exit_code(&result);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
