//! # Phase Oracle
//!
//! The facade never decides on its own which store to talk to. For every call it asks a
//! [`PhaseOracle`] six yes/no questions. In production this is a feature-flag service;
//! this module ships the trait, a plain [`PhaseFlags`] value, the canonical
//! [`MigrationPhase`] presets, and a runtime-switchable [`SwitchableOracle`].
//!
//! ## Phases
//!
//! | Phase | read src | read dst | check reads | write src | write dst | check writes |
//! |-------|:-:|:-:|:-:|:-:|:-:|:-:|
//! | `Initial` | ✓ | | | ✓ | | |
//! | `DualWrite` | ✓ | | | ✓ | ✓ | ✓ |
//! | `DualRead` | ✓ | ✓ | ✓ | ✓ | ✓ | ✓ |
//! | `DestinationProxy` | | ✓ | | | ✓ | |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;
use tracing::info;

/// Per-call routing decisions.
pub trait PhaseOracle: Send + Sync {
    fn should_read_source(&self) -> bool;
    fn should_read_destination(&self) -> bool;
    fn should_check_read_consistency(&self) -> bool;
    fn should_write_source(&self) -> bool;
    fn should_write_destination(&self) -> bool;
    fn should_check_write_consistency(&self) -> bool;
}

/// A fixed answer to all six oracle questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseFlags {
    pub read_source: bool,
    pub read_destination: bool,
    pub check_read_consistency: bool,
    pub write_source: bool,
    pub write_destination: bool,
    pub check_write_consistency: bool,
}

impl PhaseOracle for PhaseFlags {
    fn should_read_source(&self) -> bool {
        self.read_source
    }
    fn should_read_destination(&self) -> bool {
        self.read_destination
    }
    fn should_check_read_consistency(&self) -> bool {
        self.check_read_consistency
    }
    fn should_write_source(&self) -> bool {
        self.write_source
    }
    fn should_write_destination(&self) -> bool {
        self.write_destination
    }
    fn should_check_write_consistency(&self) -> bool {
        self.check_write_consistency
    }
}

/// The well-known stages of a cutover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationPhase {
    /// Only the legacy store is used.
    Initial,
    /// Writes go to both stores and are compared; reads still come from the legacy store.
    DualWrite,
    /// Reads and writes go to both stores and are compared.
    DualRead,
    /// The replacement store serves everything.
    DestinationProxy,
}

impl MigrationPhase {
    pub fn flags(self) -> PhaseFlags {
        match self {
            MigrationPhase::Initial => PhaseFlags {
                read_source: true,
                write_source: true,
                ..PhaseFlags::default()
            },
            MigrationPhase::DualWrite => PhaseFlags {
                read_source: true,
                write_source: true,
                write_destination: true,
                check_write_consistency: true,
                ..PhaseFlags::default()
            },
            MigrationPhase::DualRead => PhaseFlags {
                read_source: true,
                read_destination: true,
                check_read_consistency: true,
                write_source: true,
                write_destination: true,
                check_write_consistency: true,
            },
            MigrationPhase::DestinationProxy => PhaseFlags {
                read_destination: true,
                write_destination: true,
                ..PhaseFlags::default()
            },
        }
    }
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationPhase::Initial => "initial",
            MigrationPhase::DualWrite => "dual-write",
            MigrationPhase::DualRead => "dual-read",
            MigrationPhase::DestinationProxy => "destination-proxy",
        };
        f.write_str(name)
    }
}

impl PhaseOracle for MigrationPhase {
    fn should_read_source(&self) -> bool {
        self.flags().read_source
    }
    fn should_read_destination(&self) -> bool {
        self.flags().read_destination
    }
    fn should_check_read_consistency(&self) -> bool {
        self.flags().check_read_consistency
    }
    fn should_write_source(&self) -> bool {
        self.flags().write_source
    }
    fn should_write_destination(&self) -> bool {
        self.flags().write_destination
    }
    fn should_check_write_consistency(&self) -> bool {
        self.flags().check_write_consistency
    }
}

/// Shared oracle whose flags can be flipped while the facade is running.
#[derive(Debug, Default)]
pub struct SwitchableOracle {
    flags: RwLock<PhaseFlags>,
}

impl SwitchableOracle {
    pub fn new(phase: MigrationPhase) -> Self {
        Self::from_flags(phase.flags())
    }

    pub fn from_flags(flags: PhaseFlags) -> Self {
        Self {
            flags: RwLock::new(flags),
        }
    }

    pub fn set_phase(&self, phase: MigrationPhase) {
        info!(%phase, "Switching migration phase");
        self.set_flags(phase.flags());
    }

    pub fn set_flags(&self, flags: PhaseFlags) {
        // A poisoned lock still holds a valid PhaseFlags; keep serving it.
        let mut current = self.flags.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = flags;
    }

    pub fn flags(&self) -> PhaseFlags {
        *self.flags.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PhaseOracle for SwitchableOracle {
    fn should_read_source(&self) -> bool {
        self.flags().read_source
    }
    fn should_read_destination(&self) -> bool {
        self.flags().read_destination
    }
    fn should_check_read_consistency(&self) -> bool {
        self.flags().check_read_consistency
    }
    fn should_write_source(&self) -> bool {
        self.flags().write_source
    }
    fn should_write_destination(&self) -> bool {
        self.flags().write_destination
    }
    fn should_check_write_consistency(&self) -> bool {
        self.flags().check_write_consistency
    }
}
