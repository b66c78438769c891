//! Device filtering and the set of tracked devices.
//!
//! Patterns are regular expressions anchored at the start of the device name
//! only, so `sd[a-z]` matches `sda` and `sda1` while `^sd[a-z]$` matches `sda`
//! alone. Both the pattern list and the tracked set only ever grow.

use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

/// A filter pattern that failed to compile.
#[derive(Debug, Clone, Error)]
#[error("Invalid disk filter pattern '{pattern}': {message}")]
pub struct FilterCompileError {
    pub pattern: String,
    pub message: String,
}

/// A pattern compiled once at registration time.
#[derive(Debug)]
struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl CompiledPattern {
    fn compile(pattern: &str) -> Result<Self, FilterCompileError> {
        let regex = Regex::new(&format!("^(?:{})", pattern)).map_err(|e| FilterCompileError {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }
}

/// Registry of filter patterns plus the devices they have admitted so far.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    patterns: Vec<CompiledPattern>,
    tracked: HashSet<String>,
}

impl DeviceRegistry {
    /// Create an empty registry. Nothing matches until a pattern is added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from configured pattern strings, in order.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, FilterCompileError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for pattern in patterns {
            registry.add_pattern(pattern.as_ref())?;
        }
        Ok(registry)
    }

    /// Register a pattern.
    ///
    /// Returns `Ok(false)` if the same pattern string is already registered.
    pub fn add_pattern(&mut self, pattern: &str) -> Result<bool, FilterCompileError> {
        if self.patterns.iter().any(|p| p.source == pattern) {
            return Ok(false);
        }

        self.patterns.push(CompiledPattern::compile(pattern)?);
        Ok(true)
    }

    /// True if any registered pattern matches `device`.
    pub fn matches(&self, device: &str) -> bool {
        self.patterns.iter().any(|p| p.regex.is_match(device))
    }

    /// Track `device` if it matches and is not tracked yet.
    ///
    /// Returns `true` only when the device was newly added.
    pub fn observe(&mut self, device: &str) -> bool {
        if self.tracked.contains(device) || !self.matches(device) {
            return false;
        }
        self.tracked.insert(device.to_string())
    }

    /// Whether `device` is being tracked.
    pub fn is_tracked(&self, device: &str) -> bool {
        self.tracked.contains(device)
    }

    /// Tracked device names, sorted.
    pub fn tracked(&self) -> Vec<&str> {
        let mut devices: Vec<&str> = self.tracked.iter().map(String::as_str).collect();
        devices.sort_unstable();
        devices
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Registered pattern strings, in registration order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.source.as_str())
    }

    /// True if no pattern has been registered.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
