//! Runtime configuration for weaver.
//!
//! Options are read from `WEAVER_*` environment variables. Tests and
//! embedding tools can pin the `warn_unmatched` flag for the whole process
//! with [`set_warn_unmatched`], which takes precedence over the environment.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::WeaveError;

const OVERRIDE_UNSET: u8 = 0;
const OVERRIDE_FALSE: u8 = 1;
const OVERRIDE_TRUE: u8 = 2;

static WARN_UNMATCHED_OVERRIDE: AtomicU8 = AtomicU8::new(OVERRIDE_UNSET);

/// Environment variable enabling warnings for pointcuts that select nothing.
pub const WARN_UNMATCHED_VAR: &str = "WEAVER_WARN_UNMATCHED";
/// Environment variable disabling table memoisation.
pub const MEMOIZE_TABLES_VAR: &str = "WEAVER_MEMOIZE_TABLES";

/// Behavioural switches for an [`AspectRegistry`](crate::AspectRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaverOptions {
    /// Log unmatched pointcuts at `warn` instead of `debug`.
    pub warn_unmatched: bool,
    /// Reuse the table built for a compilation unit until new advice arrives.
    pub memoize_tables: bool,
}

impl Default for WeaverOptions {
    fn default() -> Self {
        Self {
            warn_unmatched: false,
            memoize_tables: true,
        }
    }
}

impl WeaverOptions {
    /// Load options from the process environment.
    ///
    /// # Errors
    /// Returns [`WeaveError::InvalidOption`] when a variable is set to a
    /// value that is not a recognised boolean.
    pub fn from_env() -> Result<Self, WeaveError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load options through `lookup`, which maps variable names to values.
    ///
    /// # Errors
    /// Returns [`WeaveError::InvalidOption`] for values that are not booleans.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WeaveError> {
        let defaults = Self::default();
        let read = |name: &'static str, default: bool| {
            lookup(name).map_or(Ok(default), |value| {
                parse_env_bool(&value).ok_or(WeaveError::InvalidOption { name, value })
            })
        };
        let options = Self {
            warn_unmatched: read(WARN_UNMATCHED_VAR, defaults.warn_unmatched)?,
            memoize_tables: read(MEMOIZE_TABLES_VAR, defaults.memoize_tables)?,
        };
        Ok(options.apply_overrides())
    }

    /// Apply process-wide overrides set through [`set_warn_unmatched`].
    #[must_use]
    pub fn apply_overrides(mut self) -> Self {
        if let Some(enabled) = override_state() {
            self.warn_unmatched = enabled;
        }
        self
    }

    /// Set the `warn_unmatched` flag.
    #[must_use]
    pub const fn with_warn_unmatched(mut self, enabled: bool) -> Self {
        self.warn_unmatched = enabled;
        self
    }

    /// Set the `memoize_tables` flag.
    #[must_use]
    pub const fn with_memoize_tables(mut self, enabled: bool) -> Self {
        self.memoize_tables = enabled;
        self
    }
}

fn parse_env_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "True" | "yes" | "YES" | "Yes" | "on" | "ON" | "On" => Some(true),
        "0" | "false" | "FALSE" | "False" | "no" | "NO" | "No" | "off" | "OFF" | "Off" => {
            Some(false)
        }
        _ => None,
    }
}

fn override_state() -> Option<bool> {
    match WARN_UNMATCHED_OVERRIDE.load(Ordering::Relaxed) {
        OVERRIDE_FALSE => Some(false),
        OVERRIDE_TRUE => Some(true),
        _ => None,
    }
}

/// Force the `warn_unmatched` flag for every registry created afterwards.
pub fn set_warn_unmatched(enabled: bool) {
    let value = if enabled {
        OVERRIDE_TRUE
    } else {
        OVERRIDE_FALSE
    };
    WARN_UNMATCHED_OVERRIDE.store(value, Ordering::Relaxed);
}

/// Remove any override set by [`set_warn_unmatched`].
pub fn clear_warn_unmatched_override() {
    WARN_UNMATCHED_OVERRIDE.store(OVERRIDE_UNSET, Ordering::Relaxed);
}
