use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

/// Read side of the booking persistence contract. Writes go through the
/// engine's event log and land here via [`InMemoryStore::apply_event`].
pub trait BookingStore {
    fn find_band(&self, id: &Ulid) -> Option<Band>;
    fn find_client(&self, id: &Ulid) -> Option<Client>;
    fn find_instrument(&self, id: &Ulid) -> Option<Instrument>;
    /// Musicians for `ids`, in `ids` order. Unknown ids are skipped.
    fn find_musicians(&self, ids: &[Ulid]) -> Vec<Musician>;
    fn find_booking(&self, id: &Ulid) -> Option<Booking>;
    fn overlapping_band_bookings(
        &self,
        band_id: &Ulid,
        span: &Span,
        exclude: &[BookingStatus],
    ) -> Vec<Booking>;
    /// Bookings whose lineup contains the musician.
    fn overlapping_musician_bookings(
        &self,
        musician_id: &Ulid,
        span: &Span,
        exclude: &[BookingStatus],
    ) -> Vec<Booking>;
}

/// Arena of entities keyed by id. Relations are id sets on the entities;
/// two timelines index bookings by band and by assigned musician.
pub struct InMemoryStore {
    instruments: DashMap<Ulid, Instrument>,
    styles: DashMap<Ulid, MusicStyle>,
    musicians: DashMap<Ulid, Musician>,
    bands: DashMap<Ulid, Band>,
    clients: DashMap<Ulid, Client>,
    bookings: DashMap<Ulid, Booking>,
    band_timelines: DashMap<Ulid, Timeline>,
    musician_timelines: DashMap<Ulid, Timeline>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            instruments: DashMap::new(),
            styles: DashMap::new(),
            musicians: DashMap::new(),
            bands: DashMap::new(),
            clients: DashMap::new(),
            bookings: DashMap::new(),
            band_timelines: DashMap::new(),
            musician_timelines: DashMap::new(),
        }
    }

    // ── Existence checks ─────────────────────────────────────

    pub fn contains_instrument(&self, id: &Ulid) -> bool {
        self.instruments.contains_key(id)
    }

    pub fn contains_style(&self, id: &Ulid) -> bool {
        self.styles.contains_key(id)
    }

    pub fn contains_musician(&self, id: &Ulid) -> bool {
        self.musicians.contains_key(id)
    }

    pub fn contains_band(&self, id: &Ulid) -> bool {
        self.bands.contains_key(id)
    }

    pub fn contains_client(&self, id: &Ulid) -> bool {
        self.clients.contains_key(id)
    }

    pub fn band_booking_count(&self, band_id: &Ulid) -> usize {
        self.band_timelines.get(band_id).map_or(0, |tl| tl.len())
    }

    // ── Listings ─────────────────────────────────────────────

    pub fn find_musician(&self, id: &Ulid) -> Option<Musician> {
        self.musicians.get(id).map(|e| e.value().clone())
    }

    pub fn instruments(&self) -> Vec<Instrument> {
        self.instruments.iter().map(|e| e.value().clone()).collect()
    }

    pub fn styles(&self) -> Vec<MusicStyle> {
        self.styles.iter().map(|e| e.value().clone()).collect()
    }

    pub fn musicians(&self) -> Vec<Musician> {
        self.musicians.iter().map(|e| e.value().clone()).collect()
    }

    pub fn bands(&self) -> Vec<Band> {
        self.bands.iter().map(|e| e.value().clone()).collect()
    }

    pub fn clients(&self) -> Vec<Client> {
        self.clients.iter().map(|e| e.value().clone()).collect()
    }

    /// Every booking, ordered by gig start.
    pub fn all_bookings(&self) -> Vec<Booking> {
        let mut all: Vec<Booking> = self.bookings.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|b| (b.span.start, b.id));
        all
    }

    pub fn band_bookings(&self, band_id: &Ulid) -> Vec<Booking> {
        self.timeline_bookings(&self.band_timelines, band_id)
    }

    pub fn musician_bookings(&self, musician_id: &Ulid) -> Vec<Booking> {
        self.timeline_bookings(&self.musician_timelines, musician_id)
    }

    pub fn client_bookings(&self, client_id: &Ulid) -> Vec<Booking> {
        let mut found: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|e| e.value().client_id == *client_id)
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|b| (b.span.start, b.id));
        found
    }

    fn timeline_bookings(&self, index: &DashMap<Ulid, Timeline>, owner: &Ulid) -> Vec<Booking> {
        let ids: Vec<Ulid> = match index.get(owner) {
            Some(tl) => tl.ids().collect(),
            None => return Vec::new(),
        };
        self.resolve(&ids, &[])
    }

    fn overlapping_in(
        &self,
        index: &DashMap<Ulid, Timeline>,
        owner: &Ulid,
        span: &Span,
        exclude: &[BookingStatus],
    ) -> Vec<Booking> {
        let ids: Vec<Ulid> = match index.get(owner) {
            Some(tl) => tl.overlapping(span).collect(),
            None => return Vec::new(),
        };
        self.resolve(&ids, exclude)
    }

    fn resolve(&self, ids: &[Ulid], exclude: &[BookingStatus]) -> Vec<Booking> {
        ids.iter()
            .filter_map(|id| self.bookings.get(id).map(|e| e.value().clone()))
            .filter(|b| !exclude.contains(&b.status))
            .collect()
    }

    // ── Event application ────────────────────────────────────

    pub fn apply_event(&self, event: &Event) {
        match event {
            Event::InstrumentRegistered { id, name } => {
                self.instruments.insert(*id, Instrument { id: *id, name: name.clone() });
            }
            Event::StyleRegistered { id, name } => {
                self.styles.insert(*id, MusicStyle { id: *id, name: name.clone() });
            }
            Event::MusicianRegistered {
                id,
                name,
                email,
                phone,
                instruments,
                styles,
            } => {
                self.musicians.insert(
                    *id,
                    Musician {
                        id: *id,
                        name: name.clone(),
                        email: email.clone(),
                        phone: phone.clone(),
                        instruments: instruments.clone(),
                        styles: styles.clone(),
                    },
                );
            }
            Event::BandRegistered {
                id,
                name,
                required_instruments,
                styles,
                members,
            } => {
                self.bands.insert(
                    *id,
                    Band {
                        id: *id,
                        name: name.clone(),
                        required_instruments: required_instruments.clone(),
                        styles: styles.clone(),
                        members: members.clone(),
                    },
                );
            }
            Event::ClientRegistered { id, name, email, phone } => {
                self.clients.insert(
                    *id,
                    Client {
                        id: *id,
                        name: name.clone(),
                        email: email.clone(),
                        phone: phone.clone(),
                    },
                );
            }
            Event::BookingCreated {
                id,
                band_id,
                client_id,
                span,
                city,
                state,
            } => {
                self.bookings.insert(
                    *id,
                    Booking {
                        id: *id,
                        band_id: *band_id,
                        client_id: *client_id,
                        span: *span,
                        location: Location {
                            city: city.clone(),
                            state: state.clone(),
                        },
                        lineup: Vec::new(),
                        status: BookingStatus::Pending,
                    },
                );
                self.band_timelines.entry(*band_id).or_default().insert(*span, *id);
            }
            Event::MusiciansAssigned { id, lineup, .. } => {
                let span = match self.bookings.get_mut(id) {
                    Some(mut booking) => {
                        booking.lineup = lineup.clone();
                        booking.status = BookingStatus::Confirmed;
                        booking.span
                    }
                    None => return,
                };
                for slot in lineup {
                    self.musician_timelines
                        .entry(slot.musician_id)
                        .or_default()
                        .insert(span, *id);
                }
            }
            Event::BookingStatusChanged { id, to, .. } => {
                if let Some(mut booking) = self.bookings.get_mut(id) {
                    booking.status = *to;
                }
            }
        }
    }
}

impl BookingStore for InMemoryStore {
    fn find_band(&self, id: &Ulid) -> Option<Band> {
        self.bands.get(id).map(|e| e.value().clone())
    }

    fn find_client(&self, id: &Ulid) -> Option<Client> {
        self.clients.get(id).map(|e| e.value().clone())
    }

    fn find_instrument(&self, id: &Ulid) -> Option<Instrument> {
        self.instruments.get(id).map(|e| e.value().clone())
    }

    fn find_musicians(&self, ids: &[Ulid]) -> Vec<Musician> {
        ids.iter().filter_map(|id| self.find_musician(id)).collect()
    }

    fn find_booking(&self, id: &Ulid) -> Option<Booking> {
        self.bookings.get(id).map(|e| e.value().clone())
    }

    fn overlapping_band_bookings(
        &self,
        band_id: &Ulid,
        span: &Span,
        exclude: &[BookingStatus],
    ) -> Vec<Booking> {
        self.overlapping_in(&self.band_timelines, band_id, span, exclude)
    }

    fn overlapping_musician_bookings(
        &self,
        musician_id: &Ulid,
        span: &Span,
        exclude: &[BookingStatus],
    ) -> Vec<Booking> {
        self.overlapping_in(&self.musician_timelines, musician_id, span, exclude)
    }
}
