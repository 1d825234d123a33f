// PERFPREP PRIVILEGE CONTEXT
// ELEVATION IS REQUESTED AT MOST ONCE PER RUN. THE RESULT (EITHER WAY) IS CACHED.
// AN ElevatedHandle IS THE ONLY PROOF OF RIGHTS AND ONLY THIS MODULE CAN MINT ONE.

use std::process::{Command, Stdio};

use log::{debug, info, warn};

use crate::error::ElevationFailed;

// HOW PRIVILEGED WRITES REACH THE KERNEL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    // ALREADY ROOT: PLAIN WRITES
    Direct,
    // CREDENTIALS CACHED BY sudo -v: WRITES GO THROUGH sudo -n tee
    Sudo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElevatedHandle {
    via: Via,
}

impl ElevatedHandle {
    pub fn via(&self) -> Via {
        self.via
    }
}

// HOST-SUPPLIED ELEVATION CAPABILITY
pub trait Elevator {
    // DOES THE CALLER ALREADY HOLD THE RIGHTS?
    fn is_privileged(&self) -> bool;

    // ONE INTERACTIVE ATTEMPT. NEVER RETRIED BY THE CALLER.
    fn elevate(&self) -> Result<(), ElevationFailed>;
}

pub struct PrivilegeContext<'e> {
    elevator: &'e dyn Elevator,
    state: Option<Result<ElevatedHandle, ElevationFailed>>,
}

impl<'e> PrivilegeContext<'e> {
    pub fn new(elevator: &'e dyn Elevator) -> Self {
        Self { elevator, state: None }
    }

    pub fn ensure(&mut self) -> Result<ElevatedHandle, ElevationFailed> {
        if let Some(state) = &self.state {
            return state.clone();
        }

        let state = if self.elevator.is_privileged() {
            debug!("already privileged, writing directly");
            Ok(ElevatedHandle { via: Via::Direct })
        } else {
            info!("requesting privilege elevation");
            match self.elevator.elevate() {
                Ok(()) => Ok(ElevatedHandle { via: Via::Sudo }),
                Err(e) => {
                    warn!("{}", e);
                    Err(e)
                }
            }
        };

        self.state = Some(state.clone());
        state
    }

    pub fn elevated(&self) -> bool {
        matches!(self.state, Some(Ok(_)))
    }
}

// REAL HOST: ROOT CHECK VIA geteuid, ELSE sudo -v
pub struct SudoElevator {
    pub non_interactive: bool,
}

impl SudoElevator {
    pub fn new(non_interactive: bool) -> Self {
        Self { non_interactive }
    }
}

impl Elevator for SudoElevator {
    fn is_privileged(&self) -> bool {
        unsafe { libc::geteuid() == 0 }
    }

    fn elevate(&self) -> Result<(), ElevationFailed> {
        let mut cmd = Command::new("sudo");
        if self.non_interactive {
            cmd.arg("-n");
        }
        cmd.arg("-v").stdin(Stdio::inherit()).stdout(Stdio::null());

        match cmd.status() {
            Ok(s) if s.success() => Ok(()),
            Ok(s) => Err(ElevationFailed::new(match s.code() {
                Some(code) => format!("sudo -v exited with status {}", code),
                None => "sudo -v was terminated by a signal".to_string(),
            })),
            Err(e) => Err(ElevationFailed::new(format!("cannot run sudo: {}", e))),
        }
    }
}
