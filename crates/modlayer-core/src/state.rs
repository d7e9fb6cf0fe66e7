//! Lifecycle state of a mod, derived from what is on disk and what is recorded.

use std::fmt;

use modlayer_schema::ModRecord;

use crate::paths::Layout;

/// Where a mod stands, in classification order: the first matching state
/// wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModState {
    /// No file on disk.
    NotInstalled,
    /// A file exists but its recorded tag is not in the release list.
    UnknownVersion,
    /// The file is outside the active location.
    Disabled,
    /// The installed tag is behind the latest release on its channel.
    HasUpdate,
    /// Active and current.
    Enabled,
}

impl ModState {
    /// States that `update` acts on.
    pub fn needs_update(self) -> bool {
        matches!(self, Self::HasUpdate | Self::UnknownVersion)
    }

    /// Short lowercase label for listings.
    pub fn label(self) -> &'static str {
        match self {
            Self::NotInstalled => "not installed",
            Self::UnknownVersion => "unknown version",
            Self::Disabled => "disabled",
            Self::HasUpdate => "has an update",
            Self::Enabled => "up to date",
        }
    }
}

impl fmt::Display for ModState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a mod. The checks form a strict priority chain: file presence,
/// then version bookkeeping, then placement, then freshness.
pub fn classify(layout: &Layout, m: &ModRecord) -> ModState {
    let Some(file) = m.existing_file() else {
        return ModState::NotInstalled;
    };
    let Some(current) = m.current() else {
        return ModState::UnknownVersion;
    };
    if !layout.is_active(file) {
        return ModState::Disabled;
    }
    match m.latest(current.prerelease) {
        Some(latest) if latest.tag != current.tag => ModState::HasUpdate,
        _ => ModState::Enabled,
    }
}

/// Whether the mod's file exists in the active location, regardless of
/// version bookkeeping. Used for local mods, which have no releases.
pub fn is_enabled(layout: &Layout, m: &ModRecord) -> bool {
    m.existing_file().is_some_and(|f| layout.is_active(f))
}
