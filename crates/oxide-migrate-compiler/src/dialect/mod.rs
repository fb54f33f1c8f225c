//! Database dialect implementations.
//!
//! A dialect declares which `ALTER TABLE` variants it supports from which
//! version on. The planner only ever sees the resolved
//! [`DialectCapabilities`], so adding an engine means adding a
//! [`MigrationDialect`] impl and listing it in [`registered_dialects`].

mod sqlite;

pub use sqlite::SqliteDialect;

use std::fmt;

/// An `ALTER TABLE` variant that may be unavailable on older engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `ALTER TABLE .. DROP COLUMN`.
    DropColumn,
    /// `ALTER TABLE .. RENAME COLUMN`.
    RenameColumn,
    /// `ALTER TABLE .. RENAME TO`.
    RenameTable,
}

/// A `major.minor.patch` engine version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DialectVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl DialectVersion {
    /// Creates a version.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a version string. Missing or non-numeric segments read as 0.
    #[must_use]
    pub fn parse(version: &str) -> Self {
        let mut segments = version
            .trim()
            .split('.')
            .map(|s| s.trim().parse::<u32>().unwrap_or(0));
        Self {
            major: segments.next().unwrap_or(0),
            minor: segments.next().unwrap_or(0),
            patch: segments.next().unwrap_or(0),
        }
    }
}

impl fmt::Display for DialectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// What the target engine can alter without rebuilding a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialectCapabilities {
    /// `DROP COLUMN` is available.
    pub can_drop_column: bool,
    /// `RENAME COLUMN` is available.
    pub can_rename_column: bool,
    /// `RENAME TO` is available.
    pub can_rename_table: bool,
}

impl DialectCapabilities {
    /// Capabilities of an engine that supports nothing; every change rebuilds.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            can_drop_column: false,
            can_rename_column: false,
            can_rename_table: false,
        }
    }

    /// Returns whether the given capability is present.
    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::DropColumn => self.can_drop_column,
            Capability::RenameColumn => self.can_rename_column,
            Capability::RenameTable => self.can_rename_table,
        }
    }

    fn grant(&mut self, capability: Capability) {
        match capability {
            Capability::DropColumn => self.can_drop_column = true,
            Capability::RenameColumn => self.can_rename_column = true,
            Capability::RenameTable => self.can_rename_table = true,
        }
    }
}

/// Trait for database engines the compiler can target.
pub trait MigrationDialect: Send + Sync {
    /// Returns the dialect identifier used in configuration.
    fn name(&self) -> &'static str;

    /// Minimum engine version for each capability the dialect can offer.
    fn capability_thresholds(&self) -> &'static [(Capability, DialectVersion)];

    /// Resolves the capabilities available at `version`.
    fn capabilities(&self, version: DialectVersion) -> DialectCapabilities {
        let mut capabilities = DialectCapabilities::none();
        for (capability, min_version) in self.capability_thresholds() {
            if version >= *min_version {
                capabilities.grant(*capability);
            }
        }
        capabilities
    }

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

static DIALECTS: [&dyn MigrationDialect; 1] = [&SqliteDialect];

/// Dialects known to the resolver.
#[must_use]
pub fn registered_dialects() -> &'static [&'static dyn MigrationDialect] {
    &DIALECTS
}

/// Resolves capabilities for a dialect identifier and version string.
///
/// Unknown dialects get [`DialectCapabilities::none`].
#[must_use]
pub fn resolve_capabilities(dialect: &str, version: &str) -> DialectCapabilities {
    let version = DialectVersion::parse(version);
    registered_dialects()
        .iter()
        .find(|d| d.name() == dialect)
        .map_or_else(DialectCapabilities::none, |d| d.capabilities(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        assert_eq!(DialectVersion::parse("3.35.1"), DialectVersion::new(3, 35, 1));
        assert_eq!(DialectVersion::parse("3.25"), DialectVersion::new(3, 25, 0));
        assert_eq!(DialectVersion::parse("3.x.7"), DialectVersion::new(3, 0, 7));
        assert_eq!(DialectVersion::parse(""), DialectVersion::new(0, 0, 0));
        assert_eq!(DialectVersion::parse("3.35.0-beta"), DialectVersion::new(3, 35, 0));
    }

    #[test]
    fn test_sqlite_thresholds() {
        assert_eq!(
            resolve_capabilities("sqlite", "3.0.0"),
            DialectCapabilities::none()
        );

        let caps = resolve_capabilities("sqlite", "3.25.0");
        assert!(caps.can_rename_column);
        assert!(caps.can_rename_table);
        assert!(!caps.can_drop_column);

        let caps = resolve_capabilities("sqlite", "3.34.9");
        assert!(!caps.can_drop_column);

        let caps = resolve_capabilities("sqlite", "3.35.0");
        assert!(caps.supports(Capability::DropColumn));
        assert!(caps.supports(Capability::RenameColumn));

        let caps = resolve_capabilities("sqlite", "4");
        assert!(caps.can_drop_column);
    }

    #[test]
    fn test_unknown_dialect() {
        assert_eq!(
            resolve_capabilities("postgres", "16.0.0"),
            DialectCapabilities::none()
        );
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(SqliteDialect.quote_identifier("users"), "\"users\"");
        assert_eq!(SqliteDialect.quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
