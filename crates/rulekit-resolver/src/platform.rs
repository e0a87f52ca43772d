//! Platform identifiers
use crate::error::{ResolveError, ResolveResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition key used when no platform entry matches
pub const DEFAULT_CONDITION: &str = "//conditions:default";

/// Label marking a condition as incompatible
pub const INCOMPATIBLE: &str = "@platforms//:incompatible";

/// Triples that ship host tools (Tier 1, and Tier 2 with host tools)
const TRIPLES_WITH_HOST_TOOLS: [&str; 26] = [
    // Tier 1
    "aarch64-apple-darwin",
    "aarch64-unknown-linux-gnu",
    "i686-pc-windows-gnu",
    "i686-pc-windows-msvc",
    "i686-unknown-linux-gnu",
    "x86_64-apple-darwin",
    "x86_64-pc-windows-gnu",
    "x86_64-pc-windows-msvc",
    "x86_64-unknown-linux-gnu",
    // Tier 2
    "aarch64-pc-windows-msvc",
    "aarch64-unknown-linux-musl",
    "arm-unknown-linux-gnueabi",
    "arm-unknown-linux-gnueabihf",
    "armv7-unknown-linux-gnueabihf",
    "loongarch64-unknown-linux-gnu",
    "loongarch64-unknown-linux-musl",
    "powerpc-unknown-linux-gnu",
    "powerpc64-unknown-linux-gnu",
    "powerpc64le-unknown-linux-gnu",
    "riscv64gc-unknown-linux-gnu",
    "riscv64gc-unknown-linux-musl",
    "s390x-unknown-linux-gnu",
    "x86_64-unknown-freebsd",
    "x86_64-unknown-illumos",
    "x86_64-unknown-linux-musl",
    "x86_64-unknown-netbsd",
];

/// An opaque platform identifier, usually a target triple
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Platform(String);

impl Platform {
    /// Create a platform from an identifier; the identifier must be non-empty
    pub fn new(id: impl Into<String>) -> ResolveResult<Self> {
        let id = id.into();
        if id.trim().is_empty() || id.chars().any(char::is_whitespace) {
            return Err(ResolveError::InvalidPlatform(id));
        }
        Ok(Self(id))
    }

    /// Create a platform from a condition key
    ///
    /// Accepts a bare identifier or a platform label such as
    /// `@rules_rust//rust/platform:x86_64-unknown-linux-gnu`, which
    /// normalizes to the part after the final `:`.
    pub fn from_label(label: &str) -> ResolveResult<Self> {
        if label.contains("//") {
            return match label.rsplit_once(':') {
                Some((_, name)) if !name.is_empty() => Self::new(name),
                _ => Err(ResolveError::InvalidPlatform(label.to_string())),
            };
        }
        Self::new(label)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Architecture component of the triple
    pub fn arch(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// Whether compilers and build tools can run on this platform
    pub fn has_host_tools(&self) -> bool {
        TRIPLES_WITH_HOST_TOOLS.contains(&self.0.as_str())
    }

    /// Platforms known to ship host tools
    pub fn host_tool_platforms() -> impl Iterator<Item = Platform> {
        TRIPLES_WITH_HOST_TOOLS
            .iter()
            .map(|triple| Platform(triple.to_string()))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Platform {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}
