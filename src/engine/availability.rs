use ulid::Ulid;

use crate::model::*;

use super::store::BookingStore;

/// Statuses that never occupy a gig window.
pub const NON_BLOCKING: &[BookingStatus] = &[BookingStatus::Cancelled];

// ── Availability Checker ──────────────────────────────────────────

/// True iff no non-cancelled booking of the band overlaps `span`.
pub fn is_band_available<S: BookingStore + ?Sized>(store: &S, band_id: &Ulid, span: &Span) -> bool {
    store
        .overlapping_band_bookings(band_id, span, NON_BLOCKING)
        .is_empty()
}

pub fn is_musician_available<S: BookingStore + ?Sized>(
    store: &S,
    musician_id: &Ulid,
    span: &Span,
) -> bool {
    store
        .overlapping_musician_bookings(musician_id, span, NON_BLOCKING)
        .is_empty()
}

/// Roster members of `band` with no overlapping non-cancelled booking,
/// in roster order. An empty roster yields an empty pool.
pub fn available_musicians<S: BookingStore + ?Sized>(
    store: &S,
    band: &Band,
    span: &Span,
) -> Vec<Musician> {
    store
        .find_musicians(&band.members)
        .into_iter()
        .filter(|m| is_musician_available(store, &m.id, span))
        .collect()
}

/// Sub-windows of `query` in which the band has no blocking booking.
pub fn free_windows<S: BookingStore + ?Sized>(store: &S, band_id: &Ulid, query: &Span) -> Vec<Span> {
    let mut busy: Vec<Span> = store
        .overlapping_band_bookings(band_id, query, NON_BLOCKING)
        .iter()
        .map(|b| Span::new(b.span.start.max(query.start), b.span.end.min(query.end)))
        .collect();
    busy.sort_by_key(|s| s.start);
    let busy = merge_overlapping(&busy);
    subtract_intervals(&[*query], &busy)
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end
        {
            last.end = last.end.max(span.end);
            continue;
        }
        merged.push(span);
    }
    merged
}

/// `base` minus `to_remove`. Both inputs sorted by start; `to_remove` disjoint.
pub fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut cursor = b.start;

        while ri < to_remove.len() && to_remove[ri].end <= cursor {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < b.end {
            let r = &to_remove[j];
            if r.start > cursor {
                result.push(Span::new(cursor, r.start));
            }
            cursor = cursor.max(r.end);
            j += 1;
        }

        if cursor < b.end {
            result.push(Span::new(cursor, b.end));
        }
    }

    result
}
