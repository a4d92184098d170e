//! Persisted record encoding and validation
//!
//! The record carries wall-clock times only. On read, the elapsed wall time
//! since the recorded start is checked against the session duration and,
//! if acceptable, converted back into a start on the monotonic clock.

use std::fmt;
use std::time::Duration;
use tenure_api::{PersistedRecord, RECORD_SCHEMA_VERSION};
use tenure_util::{duration_secs, MonotonicInstant, WallTime};

/// A record that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedRecord {
    pub start_wall: WallTime,
    /// Wall-clock seconds since `start_wall`, in `[0, duration)`
    pub elapsed: i64,
}

impl DecodedRecord {
    /// Place the recorded start on the monotonic clock
    pub fn start_mono(&self, now_mono: MonotonicInstant) -> MonotonicInstant {
        MonotonicInstant::from_secs(now_mono.as_secs().saturating_sub(self.elapsed))
    }
}

/// Why a record was not accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Missing,
    UnsupportedVersion(u32),
    MissingStart,
    /// The wall clock reads earlier than the recorded start
    ClockSkew { elapsed: i64 },
    Expired { elapsed: i64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Missing => write!(f, "no record"),
            Rejection::UnsupportedVersion(v) => write!(f, "unsupported schema version {}", v),
            Rejection::MissingStart => write!(f, "record has no start time"),
            Rejection::ClockSkew { elapsed } => {
                write!(f, "clock moved backward ({}s before recorded start)", -elapsed)
            }
            Rejection::Expired { elapsed } => write!(f, "expired ({}s elapsed)", elapsed),
        }
    }
}

/// Build the durable record for an active session, or `None` when there is
/// no session to save.
pub fn serialize(start_wall: Option<WallTime>, now: WallTime) -> Option<PersistedRecord> {
    start_wall.map(|start| PersistedRecord::new(start, now))
}

/// Validate a record, reporting why it was rejected.
pub fn decode(
    record: Option<&PersistedRecord>,
    now: WallTime,
    duration: Duration,
) -> Result<DecodedRecord, Rejection> {
    let record = record.ok_or(Rejection::Missing)?;

    if record.schema_version != RECORD_SCHEMA_VERSION {
        return Err(Rejection::UnsupportedVersion(record.schema_version));
    }

    let start_wall = record.start_wall_clock.ok_or(Rejection::MissingStart)?;
    let elapsed = now.secs_since(start_wall);

    if elapsed < 0 {
        return Err(Rejection::ClockSkew { elapsed });
    }
    if elapsed >= duration_secs(duration) {
        return Err(Rejection::Expired { elapsed });
    }

    Ok(DecodedRecord {
        start_wall,
        elapsed,
    })
}

/// Validate a record; any rejection reads as "no saved state".
pub fn deserialize(
    record: Option<&PersistedRecord>,
    now: WallTime,
    duration: Duration,
) -> Option<DecodedRecord> {
    decode(record, now, duration).ok()
}
