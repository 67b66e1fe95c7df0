//! Subsystem selection for `-e modules=` expressions and the `modules` config key
//!
//! Supports:
//! - Individual subsystems: -e modules=fs,require
//! - Long names: -e modules=storage,module-load
//! - Classes: -e modules=network (plain + secure), -e modules=all

use crate::error::{Result, VigiaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A group of watched operations that is enabled or disabled as a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subsystem {
    /// File and directory primitives
    #[serde(rename = "fs", alias = "storage")]
    Storage,
    /// Outbound requests over plain transport
    #[serde(rename = "http", alias = "network-plain")]
    NetworkPlain,
    /// Outbound requests over secure transport
    #[serde(rename = "https", alias = "network-secure")]
    NetworkSecure,
    /// Spawning and executing child processes
    #[serde(rename = "child_process", alias = "process-spawn")]
    ProcessSpawn,
    /// Module/unit loading
    #[serde(rename = "require", alias = "module-load")]
    ModuleLoad,
}

impl Subsystem {
    pub const ALL: [Subsystem; 5] = [
        Subsystem::Storage,
        Subsystem::NetworkPlain,
        Subsystem::NetworkSecure,
        Subsystem::ProcessSpawn,
        Subsystem::ModuleLoad,
    ];

    /// Short key used in summaries and qualified operation names
    pub fn key(self) -> &'static str {
        match self {
            Subsystem::Storage => "fs",
            Subsystem::NetworkPlain => "http",
            Subsystem::NetworkSecure => "https",
            Subsystem::ProcessSpawn => "child_process",
            Subsystem::ModuleLoad => "require",
        }
    }

    /// Whether records of this subsystem are keyed by operation name.
    /// Module loads form a single flat sequence.
    pub fn has_operations(self) -> bool {
        !matches!(self, Subsystem::ModuleLoad)
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Subsystem {
    type Err = VigiaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "fs" | "storage" => Ok(Subsystem::Storage),
            "http" | "network-plain" => Ok(Subsystem::NetworkPlain),
            "https" | "network-secure" => Ok(Subsystem::NetworkSecure),
            "child_process" | "process-spawn" => Ok(Subsystem::ProcessSpawn),
            "require" | "module-load" => Ok(Subsystem::ModuleLoad),
            other => Err(VigiaError::Config(format!("Unknown module '{}'", other))),
        }
    }
}

/// Set of subsystems whose operations get wrapped and recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemFilter {
    enabled: BTreeSet<Subsystem>,
}

impl Default for SubsystemFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl SubsystemFilter {
    /// Create a filter that watches every subsystem
    pub fn all() -> Self {
        Self {
            enabled: Subsystem::ALL.iter().copied().collect(),
        }
    }

    /// Create a filter that watches nothing
    pub fn none() -> Self {
        Self {
            enabled: BTreeSet::new(),
        }
    }

    /// Parse a filter expression like "modules=fs,require" or "modules=network"
    pub fn from_expr(expr: &str) -> Result<Self> {
        match expr.strip_prefix("modules=") {
            Some(spec) => Self::from_names(spec.split(',')),
            None => Err(VigiaError::Config(format!(
                "Invalid filter expression: {}. Expected format: modules=SPEC",
                expr
            ))),
        }
    }

    /// Build a filter from a list of subsystem or class names
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut enabled = BTreeSet::new();

        for name in names {
            let name = name.as_ref().trim();
            match name {
                "" => {}
                "all" => enabled.extend(Subsystem::ALL),
                "network" => {
                    enabled.insert(Subsystem::NetworkPlain);
                    enabled.insert(Subsystem::NetworkSecure);
                }
                _ => {
                    enabled.insert(name.parse::<Subsystem>()?);
                }
            }
        }

        Ok(Self { enabled })
    }

    /// Check if a subsystem should be watched
    pub fn should_watch(&self, subsystem: Subsystem) -> bool {
        self.enabled.contains(&subsystem)
    }

    pub fn iter(&self) -> impl Iterator<Item = Subsystem> + '_ {
        self.enabled.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

impl Serialize for SubsystemFilter {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.enabled.iter())
    }
}
