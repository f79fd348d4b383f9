use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. The only time type.
pub type Ms = i64;

/// Strict interior overlap of `[a_start, a_end)` and `[b_start, b_end)`.
/// Intervals that only touch at an endpoint do not overlap.
pub fn overlaps(a_start: Ms, a_end: Ms, b_start: Ms, b_end: Ms) -> bool {
    a_start < b_end && b_start < a_end
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }
}

// ── Reference data ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: Ulid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicStyle {
    pub id: Ulid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Musician {
    pub id: Ulid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Instruments this musician can cover.
    pub instruments: BTreeSet<Ulid>,
    pub styles: BTreeSet<Ulid>,
}

impl Musician {
    pub fn plays(&self, instrument_id: &Ulid) -> bool {
        self.instruments.contains(instrument_id)
    }

    /// Number of styles shared with `styles` (style affinity).
    pub fn shared_styles(&self, styles: &BTreeSet<Ulid>) -> usize {
        self.styles.intersection(styles).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub id: Ulid,
    pub name: String,
    /// Assignment walks this list in order. An instrument listed twice
    /// needs two different musicians.
    pub required_instruments: Vec<Ulid>,
    pub styles: BTreeSet<Ulid>,
    /// Roster. Order is the tie-break order during assignment.
    pub members: Vec<Ulid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Ulid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// ── Bookings ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Completed and Cancelled bookings accept no further lifecycle changes.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Whether a booking in this status occupies its gig window.
    pub fn blocks_availability(self) -> bool {
        self != BookingStatus::Cancelled
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
}

/// One covered instrument in a lineup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineupSlot {
    pub instrument_id: Ulid,
    pub musician_id: Ulid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub band_id: Ulid,
    pub client_id: Ulid,
    pub span: Span,
    pub location: Location,
    /// Snapshot taken at assignment time; empty until then.
    pub lineup: Vec<LineupSlot>,
    pub status: BookingStatus,
}

impl Booking {
    pub fn musician_ids(&self) -> impl Iterator<Item = Ulid> + '_ {
        self.lineup.iter().map(|slot| slot.musician_id)
    }

    pub fn has_musician(&self, musician_id: &Ulid) -> bool {
        self.lineup.iter().any(|slot| slot.musician_id == *musician_id)
    }
}

/// Booking ids on one band or musician, sorted by `span.start`.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Vec<(Span, Ulid)>,
}

impl Timeline {
    /// Insert maintaining sort order by span.start.
    pub fn insert(&mut self, span: Span, booking_id: Ulid) {
        let pos = self
            .entries
            .binary_search_by_key(&span.start, |(s, _)| s.start)
            .unwrap_or_else(|e| e);
        self.entries.insert(pos, (span, booking_id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = Ulid> + '_ {
        self.entries.iter().map(|(_, id)| *id)
    }

    /// Ids of bookings whose span overlaps the query window.
    /// Entries starting at or after `query.end` are skipped by binary search.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = Ulid> + '_ {
        let right_bound = self.entries.partition_point(|(s, _)| s.start < query.end);
        let query = *query;
        self.entries[..right_bound]
            .iter()
            .filter(move |(s, _)| s.overlaps(&query))
            .map(|(_, id)| *id)
    }
}

/// WAL record format. Flat, no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    InstrumentRegistered {
        id: Ulid,
        name: String,
    },
    StyleRegistered {
        id: Ulid,
        name: String,
    },
    MusicianRegistered {
        id: Ulid,
        name: String,
        email: Option<String>,
        phone: Option<String>,
        instruments: BTreeSet<Ulid>,
        styles: BTreeSet<Ulid>,
    },
    BandRegistered {
        id: Ulid,
        name: String,
        required_instruments: Vec<Ulid>,
        styles: BTreeSet<Ulid>,
        members: Vec<Ulid>,
    },
    ClientRegistered {
        id: Ulid,
        name: String,
        email: Option<String>,
        phone: Option<String>,
    },
    BookingCreated {
        id: Ulid,
        band_id: Ulid,
        client_id: Ulid,
        span: Span,
        city: String,
        state: String,
    },
    /// Lineup written and status moved Pending → Confirmed in one record.
    MusiciansAssigned {
        id: Ulid,
        band_id: Ulid,
        lineup: Vec<LineupSlot>,
    },
    BookingStatusChanged {
        id: Ulid,
        band_id: Ulid,
        from: BookingStatus,
        to: BookingStatus,
    },
}

impl Event {
    /// Band a booking event belongs to; `None` for reference data.
    pub fn band_id(&self) -> Option<Ulid> {
        match self {
            Event::BookingCreated { band_id, .. }
            | Event::MusiciansAssigned { band_id, .. }
            | Event::BookingStatusChanged { band_id, .. } => Some(*band_id),
            Event::InstrumentRegistered { .. }
            | Event::StyleRegistered { .. }
            | Event::MusicianRegistered { .. }
            | Event::BandRegistered { .. }
            | Event::ClientRegistered { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: Ms = 3_600_000;

    #[test]
    fn span_overlap() {
        let a = Span::new(19 * H, 21 * H);
        let b = Span::new(20 * H, 22 * H);
        let c = Span::new(21 * H, 23 * H);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // touching, not overlapping
    }

    #[test]
    fn overlap_is_symmetric() {
        let spans = [
            Span::new(0, 10),
            Span::new(5, 15),
            Span::new(10, 20),
            Span::new(0, 30),
            Span::new(12, 13),
            Span::new(29, 40),
        ];
        for a in &spans {
            for b in &spans {
                assert_eq!(a.overlaps(b), b.overlaps(a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn overlap_free_fn_matches_span() {
        assert!(overlaps(100, 200, 199, 300));
        assert!(!overlaps(100, 200, 200, 300));
        assert!(!overlaps(200, 300, 100, 200));
        assert!(overlaps(100, 400, 200, 300)); // containment
    }

    #[test]
    fn status_flags() {
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());

        assert!(BookingStatus::Completed.blocks_availability());
        assert!(!BookingStatus::Cancelled.blocks_availability());
    }

    #[test]
    fn musician_affinity() {
        let rock = Ulid::new();
        let jazz = Ulid::new();
        let funk = Ulid::new();
        let m = Musician {
            id: Ulid::new(),
            name: "Ana".into(),
            email: None,
            phone: None,
            instruments: BTreeSet::new(),
            styles: [rock, jazz].into_iter().collect(),
        };
        let band_styles: BTreeSet<Ulid> = [jazz, funk].into_iter().collect();
        assert_eq!(m.shared_styles(&band_styles), 1);
        assert_eq!(m.shared_styles(&BTreeSet::new()), 0);
    }

    #[test]
    fn timeline_keeps_start_order() {
        let mut tl = Timeline::default();
        let late = Ulid::new();
        let early = Ulid::new();
        let mid = Ulid::new();
        tl.insert(Span::new(300, 400), late);
        tl.insert(Span::new(100, 200), early);
        tl.insert(Span::new(200, 300), mid);
        let ids: Vec<_> = tl.ids().collect();
        assert_eq!(ids, vec![early, mid, late]);
        assert_eq!(tl.len(), 3);
    }

    #[test]
    fn timeline_overlapping_skips_past_and_future() {
        let mut tl = Timeline::default();
        let past = Ulid::new();
        let hit = Ulid::new();
        let future = Ulid::new();
        tl.insert(Span::new(100, 200), past);
        tl.insert(Span::new(450, 600), hit);
        tl.insert(Span::new(1000, 1100), future);

        let hits: Vec<_> = tl.overlapping(&Span::new(500, 800)).collect();
        assert_eq!(hits, vec![hit]);
    }

    #[test]
    fn timeline_adjacent_not_included() {
        let mut tl = Timeline::default();
        tl.insert(Span::new(100, 200), Ulid::new());
        assert!(tl.overlapping(&Span::new(200, 300)).next().is_none());
        assert!(tl.overlapping(&Span::new(0, 100)).next().is_none());
    }

    #[test]
    fn timeline_long_booking_spans_query() {
        let mut tl = Timeline::default();
        let id = Ulid::new();
        tl.insert(Span::new(0, 10_000), id);
        let hits: Vec<_> = tl.overlapping(&Span::new(500, 600)).collect();
        assert_eq!(hits, vec![id]);
    }

    #[test]
    fn timeline_single_ms_overlap() {
        let mut tl = Timeline::default();
        tl.insert(Span::new(100, 201), Ulid::new());
        assert_eq!(tl.overlapping(&Span::new(200, 300)).count(), 1);
    }

    #[test]
    fn event_band_id() {
        let band_id = Ulid::new();
        let created = Event::BookingCreated {
            id: Ulid::new(),
            band_id,
            client_id: Ulid::new(),
            span: Span::new(0, 10),
            city: "Austin".into(),
            state: "TX".into(),
        };
        assert_eq!(created.band_id(), Some(band_id));
        let reference = Event::InstrumentRegistered { id: Ulid::new(), name: "Guitar".into() };
        assert_eq!(reference.band_id(), None);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::MusiciansAssigned {
            id: Ulid::new(),
            band_id: Ulid::new(),
            lineup: vec![LineupSlot { instrument_id: Ulid::new(), musician_id: Ulid::new() }],
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
