// IN-MEMORY HOST FOR INTEGRATION TESTS
// EVERY WRITE IS LOGGED SO TESTS CAN ASSERT EXACTLY WHAT (AND HOW OFTEN) WAS WRITTEN.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::io;

use perfprep::error::ElevationFailed;
use perfprep::host::Host;
use perfprep::privilege::{ElevatedHandle, Elevator};
use perfprep::tunables::{cpu_base_freq_path, cpu_governor_path, cpu_online_path};

#[derive(Default)]
pub struct FakeHost {
    files: RefCell<BTreeMap<String, String>>,
    failing: RefCell<BTreeSet<String>>,
    pub writes: RefCell<Vec<(String, String)>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: &str, value: &str) -> Self {
        self.set(path, value);
        self
    }

    pub fn set(&self, path: &str, value: &str) {
        self.files.borrow_mut().insert(path.to_string(), format!("{}\n", value));
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).map(|v| v.trim().to_string())
    }

    // WRITES TO path RETURN EACCES FROM NOW ON
    pub fn fail_writes(&self, path: &str) {
        self.failing.borrow_mut().insert(path.to_string());
    }

    pub fn write_count(&self) -> usize {
        self.writes.borrow().len()
    }

    pub fn writes_to(&self, path: &str) -> Vec<String> {
        self.writes
            .borrow()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, v)| v.clone())
            .collect()
    }

    // ADD A CPU. cpu0 GETS NO online FILE, LIKE MOST REAL KERNELS.
    pub fn add_cpu(&self, id: u32, base_freq_khz: Option<u64>, online: bool) {
        if id != 0 {
            self.set(&cpu_online_path(id), if online { "1" } else { "0" });
        }
        if let Some(f) = base_freq_khz {
            self.set(&cpu_base_freq_path(id), &f.to_string());
        }
        self.set(&cpu_governor_path(id), "powersave");
    }

    pub fn is_online(&self, id: u32) -> bool {
        self.get(&cpu_online_path(id)).map(|v| v == "1").unwrap_or(true)
    }
}

impl Host for FakeHost {
    fn exists(&self, path: &str) -> bool {
        let files = self.files.borrow();
        let dir = format!("{}/", path);
        files.contains_key(path) || files.keys().any(|k| k.starts_with(&dir))
    }

    fn read(&self, path: &str) -> io::Result<String> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn write(&self, path: &str, value: &str, _handle: &ElevatedHandle) -> io::Result<()> {
        self.writes.borrow_mut().push((path.to_string(), value.to_string()));
        if self.failing.borrow().contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.set(path, value);
        Ok(())
    }

    fn list_dir(&self, path: &str) -> io::Result<Vec<String>> {
        let prefix = format!("{}/", path);
        let names: BTreeSet<String> = self
            .files
            .borrow()
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        Ok(names.into_iter().collect())
    }
}

pub struct FakeElevator {
    pub privileged: bool,
    pub grant: bool,
    pub attempts: Cell<u32>,
}

impl FakeElevator {
    pub fn root() -> Self {
        Self { privileged: true, grant: true, attempts: Cell::new(0) }
    }

    pub fn sudo(grant: bool) -> Self {
        Self { privileged: false, grant, attempts: Cell::new(0) }
    }
}

impl Elevator for FakeElevator {
    fn is_privileged(&self) -> bool {
        self.privileged
    }

    fn elevate(&self) -> Result<(), ElevationFailed> {
        self.attempts.set(self.attempts.get() + 1);
        if self.grant {
            Ok(())
        } else {
            Err(ElevationFailed::new("authentication failure"))
        }
    }
}
