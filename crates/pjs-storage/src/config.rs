//! Configuration for arena growth and the reference parser
//!
//! Both structs deserialize from any serde format, so applications can keep
//! them next to the rest of their PJS settings:
//!
//! ```
//! # use pjson_rs_storage::ArenaConfig;
//! let config: ArenaConfig =
//!     serde_json::from_str(r#"{"initial_block_size": 4096}"#).unwrap();
//! assert_eq!(config.initial_block_size, 4096);
//! assert_eq!(config.growth_factor, 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default size of the first upstream block of a monotonic arena (1 KiB)
pub const DEFAULT_INITIAL_BLOCK_SIZE: usize = 1024;

/// Default multiplier applied to the block size after each upstream request
pub const DEFAULT_GROWTH_FACTOR: usize = 2;

/// Default ceiling for block growth (1 MiB). Requests larger than this still
/// get a block of their own size.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 1024 * 1024;

/// Default maximum nesting depth accepted by the parser
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Block-size policy of a [`MonotonicResource`](crate::MonotonicResource)
///
/// The policy sequence never decreases: each block is `growth_factor` times
/// the previous policy size, capped at `max_block_size`. A request larger
/// than the current policy size gets a block of its own size, and the
/// sequence continues from the policy size rather than from that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Size of the first block requested from upstream
    pub initial_block_size: usize,
    /// Multiplier applied after each block
    pub growth_factor: usize,
    /// Growth stops once blocks reach this size
    pub max_block_size: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_block_size: DEFAULT_INITIAL_BLOCK_SIZE,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
        }
    }
}

impl ArenaConfig {
    /// Set the size of the first upstream block
    #[must_use]
    pub fn with_initial_block_size(mut self, size: usize) -> Self {
        self.initial_block_size = size;
        self
    }

    /// Set the growth multiplier
    #[must_use]
    pub fn with_growth_factor(mut self, factor: usize) -> Self {
        self.growth_factor = factor;
        self
    }

    /// Set the growth ceiling
    #[must_use]
    pub fn with_max_block_size(mut self, size: usize) -> Self {
        self.max_block_size = size;
        self
    }

    /// Check the policy for values that would stall or shrink growth
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for zero sizes, a zero growth factor,
    /// or a ceiling below the initial size.
    pub fn validate(&self) -> Result<()> {
        if self.initial_block_size == 0 {
            return Err(Error::invalid_config("initial_block_size must be non-zero"));
        }
        if self.growth_factor == 0 {
            return Err(Error::invalid_config("growth_factor must be at least 1"));
        }
        if self.max_block_size < self.initial_block_size {
            return Err(Error::invalid_config(format!(
                "max_block_size {} is below initial_block_size {}",
                self.max_block_size, self.initial_block_size
            )));
        }
        Ok(())
    }

    /// Block size to request after a block of `current` bytes, given that the
    /// next block must hold at least `needed` bytes.
    pub fn next_block_size(&self, current: usize, needed: usize) -> usize {
        let grown = current
            .saturating_mul(self.growth_factor)
            .min(self.max_block_size)
            .max(current);
        grown.max(needed)
    }
}

/// Options of the reference [`Parser`](crate::Parser)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum nesting of arrays and objects
    pub max_depth: usize,
    /// Accept a comma before a closing bracket or brace
    pub allow_trailing_commas: bool,
    /// Accept `//` and `/* */` comments wherever whitespace is allowed
    pub allow_comments: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            allow_trailing_commas: false,
            allow_comments: false,
        }
    }
}

impl ParserConfig {
    /// Set the maximum nesting depth
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Accept or reject trailing commas
    #[must_use]
    pub fn with_trailing_commas(mut self, allow: bool) -> Self {
        self.allow_trailing_commas = allow;
        self
    }

    /// Accept or reject comments
    #[must_use]
    pub fn with_comments(mut self, allow: bool) -> Self {
        self.allow_comments = allow;
        self
    }
}
