use crate::model::Ms;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_CONTACT_LEN: usize = 256;
pub const MAX_LOCATION_LEN: usize = 128;

/// Earliest accepted gig timestamp (Unix epoch).
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;
/// Latest accepted gig timestamp (2100-01-01T00:00:00Z).
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;
/// A single gig may not run longer than a week.
pub const MAX_GIG_DURATION_MS: Ms = 7 * 24 * 3_600_000;
/// Widest window accepted by availability queries (one year).
pub const MAX_QUERY_WINDOW_MS: Ms = 366 * 24 * 3_600_000;

pub const MAX_REQUIRED_INSTRUMENTS: usize = 64;
pub const MAX_STYLES_PER_ENTITY: usize = 64;
pub const MAX_INSTRUMENTS_PER_MUSICIAN: usize = 64;
pub const MAX_ROSTER_SIZE: usize = 1024;
pub const MAX_BOOKINGS_PER_BAND: usize = 100_000;

/// Largest encoded event the WAL accepts. A larger length prefix is corruption.
pub const MAX_WAL_ENTRY_BYTES: usize = 1 << 20;
