use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::EngineError;
use super::availability::NON_BLOCKING;
use super::store::BookingStore;

/// Validate a gig window and turn it into a `Span`. `end <= start` is a bad request.
pub(crate) fn validate_window(start: Ms, end: Ms) -> Result<Span, EngineError> {
    if end <= start {
        return Err(EngineError::InvalidTimeRange { start, end });
    }
    if start < MIN_VALID_TIMESTAMP_MS || end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    Ok(Span::new(start, end))
}

pub(crate) fn validate_gig(start: Ms, end: Ms) -> Result<Span, EngineError> {
    let span = validate_window(start, end)?;
    if span.duration_ms() > MAX_GIG_DURATION_MS {
        return Err(EngineError::LimitExceeded("gig too long"));
    }
    Ok(span)
}

pub(crate) fn validate_query(start: Ms, end: Ms) -> Result<Span, EngineError> {
    let span = validate_window(start, end)?;
    if span.duration_ms() > MAX_QUERY_WINDOW_MS {
        return Err(EngineError::LimitExceeded("query window too wide"));
    }
    Ok(span)
}

pub(crate) fn validate_text(value: &str, max: usize, what: &'static str) -> Result<(), EngineError> {
    if value.len() > max {
        return Err(EngineError::LimitExceeded(what));
    }
    Ok(())
}

/// Fail with the first non-cancelled booking of the band overlapping `span`.
pub(crate) fn check_band_free<S: BookingStore + ?Sized>(
    store: &S,
    band_id: &Ulid,
    span: &Span,
) -> Result<(), EngineError> {
    match store.overlapping_band_bookings(band_id, span, NON_BLOCKING).first() {
        Some(existing) => Err(EngineError::BandUnavailable {
            band_id: *band_id,
            conflicting: existing.id,
        }),
        None => Ok(()),
    }
}
