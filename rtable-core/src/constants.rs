//! Table constants for rtable.
//!
//! Field limits mirror the fixed-width buffers routing daemons traditionally
//! use for textual addresses and interface names.

// ═══════════════════════════════════════════════════════════════════════════════
// FIELD LIMITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum length of a textual IPv4 address ("255.255.255.255").
pub const MAX_ADDR_LEN: usize = 15;

/// Maximum length of an outgoing-interface label.
pub const MAX_OIF_LEN: usize = 31;

/// Largest valid IPv4 prefix length.
pub const MAX_MASK_LEN: u8 = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// EXPIRATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Default time-to-live of a route entry, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 30;

/// Default upper bound on live entries per table.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Environment variable overriding the default TTL.
pub const ENV_TTL_SECS: &str = "RTABLE_TTL_SECS";

/// Environment variable overriding the table capacity.
pub const ENV_MAX_ENTRIES: &str = "RTABLE_MAX_ENTRIES";
