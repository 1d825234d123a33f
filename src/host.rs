// PERFPREP HOST BOUNDARY
// EVERYTHING PERFPREP KNOWS ABOUT THE MACHINE GOES THROUGH THIS TRAIT.
// PATHS ARE ALWAYS THE ABSOLUTE KERNEL PATHS (/proc/sys/..., /sys/...).

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;

use crate::privilege::{ElevatedHandle, Via};

pub trait Host {
    fn exists(&self, path: &str) -> bool;

    // UNPRIVILEGED READ (status, check, topology scan)
    fn read(&self, path: &str) -> io::Result<String>;

    // READ UNDER ELEVATED RIGHTS FOR FILES ONLY ROOT MAY READ
    fn read_privileged(&self, path: &str, _handle: &ElevatedHandle) -> io::Result<String> {
        self.read(path)
    }

    fn write(&self, path: &str, value: &str, handle: &ElevatedHandle) -> io::Result<()>;

    // ENTRY NAMES OF A DIRECTORY, UNSORTED
    fn list_dir(&self, path: &str) -> io::Result<Vec<String>>;
}

// REAL PSEUDO-FILE TREE, OPTIONALLY RELOCATED UNDER A PREFIX
pub struct SysfsHost {
    root: PathBuf,
}

impl SysfsHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn sudo_tee(target: &Path, value: &str) -> io::Result<()> {
        let mut child = Command::new("sudo")
            .args(["-n", "tee"])
            .arg(target)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(value.as_bytes())?;
        }

        let out = child.wait_with_output()?;
        if out.status.success() {
            Ok(())
        } else {
            let msg = String::from_utf8_lossy(&out.stderr);
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                msg.trim().trim_start_matches("tee: ").to_string(),
            ))
        }
    }

    fn sudo_cat(target: &Path) -> io::Result<String> {
        let out = Command::new("sudo").args(["-n", "cat"]).arg(target).output()?;
        if out.status.success() {
            Ok(String::from_utf8_lossy(&out.stdout).into_owned())
        } else {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                String::from_utf8_lossy(&out.stderr).trim().to_string(),
            ))
        }
    }
}

impl Host for SysfsHost {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn read(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.resolve(path))
    }

    fn read_privileged(&self, path: &str, handle: &ElevatedHandle) -> io::Result<String> {
        let target = self.resolve(path);
        match std::fs::read_to_string(&target) {
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied && handle.via() == Via::Sudo => {
                debug!("read {} denied, retrying through sudo", target.display());
                Self::sudo_cat(&target)
            }
            r => r,
        }
    }

    fn write(&self, path: &str, value: &str, handle: &ElevatedHandle) -> io::Result<()> {
        let target = self.resolve(path);
        debug!("write {} <- {} ({:?})", target.display(), value, handle.via());
        match handle.via() {
            Via::Direct => std::fs::write(&target, value),
            Via::Sudo => Self::sudo_tee(&target, value),
        }
    }

    fn list_dir(&self, path: &str) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.resolve(path))? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

// PARSE A KERNEL CPU LIST ("0-3,5,7-8") INTO A COUNT OF UNITS
pub fn parse_cpu_range(raw: &str) -> u32 {
    let mut count = 0u32;
    for range in raw.trim().split(',') {
        let parts: Vec<&str> = range.split('-').collect();
        match parts.len() {
            1 => {
                if parts[0].parse::<u32>().is_ok() {
                    count += 1;
                }
            }
            2 => {
                if let (Ok(lo), Ok(hi)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>()) {
                    if hi >= lo {
                        count += hi - lo + 1;
                    }
                }
            }
            _ => {}
        }
    }
    count
}
