//! Dotted numeric version parsing and comparison.
//!
//! Versions are compared component by component with missing trailing
//! components treated as `0`, so `1.2` equals `1.2.0`. The comparison also
//! reports the index of the first differing component, which the update
//! policy uses to tell patch releases apart from minor and major ones.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Index of the patch component (`1.2.3` -> `3`)
pub const PATCH_INDEX: usize = 2;

/// A version component could not be read as a non-negative integer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed version '{input}': component '{component}' is not a number")]
pub struct MalformedVersionError {
    pub input: String,
    pub component: String,
}

/// An ordered sequence of numeric components (e.g. "1.2.3" -> [1, 2, 3])
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    components: Vec<u64>,
}

/// Outcome of comparing the running version against the store version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    /// How the current version orders relative to the latest one
    pub ordering: Ordering,
    /// Index of the first differing component, `None` when equal
    pub first_diff: Option<usize>,
}

impl Comparison {
    /// The running version is older than the store version
    pub fn is_outdated(&self) -> bool {
        self.ordering == Ordering::Less
    }

    /// First difference is in the patch component
    pub fn is_patch_only(&self) -> bool {
        self.first_diff == Some(PATCH_INDEX)
    }
}

impl Version {
    /// Parse a dot-separated version string.
    ///
    /// Surrounding whitespace is ignored. Every component must be a
    /// non-negative integer; empty components (`"1..2"`) are rejected.
    pub fn parse(input: &str) -> Result<Self, MalformedVersionError> {
        let trimmed = input.trim();
        let components = trimmed
            .split('.')
            .map(|part| {
                part.parse::<u64>().map_err(|_| MalformedVersionError {
                    input: input.to_string(),
                    component: part.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { components })
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Component at `index`, padding with zero past the end
    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl FromStr for Version {
    type Err = MalformedVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Compare `current` against `latest`, left to right, stopping at the first
/// unequal component.
pub fn compare(current: &Version, latest: &Version) -> Comparison {
    let len = current.components.len().max(latest.components.len());

    for index in 0..len {
        match current.component(index).cmp(&latest.component(index)) {
            Ordering::Equal => continue,
            ordering => {
                return Comparison {
                    ordering,
                    first_diff: Some(index),
                };
            }
        }
    }

    Comparison {
        ordering: Ordering::Equal,
        first_diff: None,
    }
}
