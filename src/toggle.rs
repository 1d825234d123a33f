// PERFPREP TOGGLE PRIMITIVE
// READ, COMPARE, WRITE ONLY ON MISMATCH. A KNOB ALREADY AT ITS TARGET IS NEVER WRITTEN.
// EXACTLY ONE WRITE ATTEMPT PER CALL. NO RETRIES.

use std::fmt;

use log::{debug, warn};

use crate::host::Host;
use crate::privilege::ElevatedHandle;
use crate::tunables::{Tunable, ValueKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    // WRITTEN. CARRIES THE VALUE THAT WAS REPLACED.
    Applied { previous: String },
    AlreadySatisfied,
    // THE KNOB DOES NOT EXIST (OR CANNOT BE STEERED) ON THIS KERNEL/HARDWARE
    Unsupported { reason: String },
    WriteFailed { reason: String },
    // POLICY REFUSAL, NOTHING ATTEMPTED (CPU 0 OFFLINE)
    Refused { reason: String },
}

impl Outcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Unsupported { .. } | Self::WriteFailed { .. } | Self::Refused { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "CHANGED",
            Self::AlreadySatisfied => "ALREADY SET",
            Self::Unsupported { .. } => "UNSUPPORTED",
            Self::WriteFailed { .. } => "FAILED",
            Self::Refused { .. } => "REFUSED",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied { previous } => write!(f, "{} (was {})", self.label(), previous),
            Self::AlreadySatisfied => write!(f, "{}", self.label()),
            Self::Unsupported { reason }
            | Self::WriteFailed { reason }
            | Self::Refused { reason } => write!(f, "{} ({})", self.label(), reason),
        }
    }
}

// HOW THE CURRENT VALUE RELATES TO THE TARGET
#[derive(Debug, PartialEq, Eq)]
enum Compare {
    Equal,
    Differ,
    // CURRENT TOKEN OUTSIDE THE VOCABULARY
    Foreign,
    // CURRENT VALUE IS NOT AN INTEGER
    Malformed,
}

fn compare(kind: ValueKind, current: &str, target: &str) -> Compare {
    match kind {
        ValueKind::Integer => match (current.parse::<i64>(), target.parse::<i64>()) {
            (Ok(c), Ok(t)) if c == t => Compare::Equal,
            (Ok(_), Ok(_)) => Compare::Differ,
            _ => Compare::Malformed,
        },
        ValueKind::Token(vocab) => {
            if !vocab.contains(&current) {
                Compare::Foreign
            } else if current == target {
                Compare::Equal
            } else {
                Compare::Differ
            }
        }
    }
}

pub fn apply<H: Host + ?Sized>(
    host: &H,
    tunable: &Tunable,
    target: &str,
    handle: &ElevatedHandle,
) -> Outcome {
    let location: &str = &tunable.location;

    if !host.exists(location) {
        debug!("{}: {} missing", tunable.name, location);
        return Outcome::Unsupported { reason: format!("{} not present", location) };
    }

    let current = match host.read_privileged(location, handle) {
        Ok(raw) => raw.trim().to_string(),
        Err(e) => {
            warn!("{}: read {} failed: {}", tunable.name, location, e);
            return Outcome::WriteFailed { reason: format!("read: {}", e) };
        }
    };

    match compare(tunable.kind, &current, target) {
        Compare::Equal => {
            debug!("{}: already {}", tunable.name, current);
            return Outcome::AlreadySatisfied;
        }
        Compare::Foreign => {
            return Outcome::Unsupported { reason: format!("kernel reports '{}'", current) };
        }
        Compare::Malformed => {
            warn!("{}: cannot compare '{}' with '{}'", tunable.name, current, target);
            return Outcome::WriteFailed {
                reason: format!("unparseable value '{}'", current),
            };
        }
        Compare::Differ => {}
    }

    match host.write(location, target, handle) {
        Ok(()) => {
            debug!("{}: {} -> {}", tunable.name, current, target);
            Outcome::Applied { previous: current }
        }
        Err(e) => {
            warn!("{}: write {} failed: {}", tunable.name, location, e);
            Outcome::WriteFailed { reason: e.to_string() }
        }
    }
}

// READ-ONLY PROBE FOR status: WHICH SIDE OF THE SWITCH IS THE KNOB ON?
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Armed,
    Default,
    Other(String),
    Missing,
    Unreadable(String),
}

pub fn position<H: Host + ?Sized>(host: &H, tunable: &Tunable) -> Position {
    let location: &str = &tunable.location;
    if !host.exists(location) {
        return Position::Missing;
    }
    let current = match host.read(location) {
        Ok(raw) => raw.trim().to_string(),
        Err(e) => return Position::Unreadable(e.to_string()),
    };
    if compare(tunable.kind, &current, &tunable.armed) == Compare::Equal {
        Position::Armed
    } else if compare(tunable.kind, &current, &tunable.default) == Compare::Equal {
        Position::Default
    } else {
        Position::Other(current)
    }
}
