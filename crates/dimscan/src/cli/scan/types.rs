//! CLI enum types for the scan command.

use clap::ValueEnum;
use dimscan_core::MatchMode;

/// Match mode for the target dimension.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Mode {
    /// Either side less than or equal to the target
    Lte,
    /// Either side exactly the target
    Exact,
}

impl From<Mode> for MatchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Lte => MatchMode::Lte,
            Mode::Exact => MatchMode::Exact,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", MatchMode::from(*self))
    }
}
