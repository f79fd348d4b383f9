use std::collections::HashSet;
use std::time::Instant;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability::{self, ASSIGNMENT_DURATION_SECONDS, LINEUP_SIZE, WAL_COMPACTIONS_TOTAL};

use super::availability::available_musicians;
use super::conflict::{check_band_free, validate_gig, validate_text};
use super::lifecycle::{check_assignable, check_cancellable, check_status_update};
use super::lineup::assign_lineup;
use super::store::BookingStore;
use super::{Engine, EngineError, Entity, WalCommand};

fn validate_contact(email: &Option<String>, phone: &Option<String>) -> Result<(), EngineError> {
    if let Some(e) = email {
        validate_text(e, MAX_CONTACT_LEN, "email too long")?;
    }
    if let Some(p) = phone {
        validate_text(p, MAX_CONTACT_LEN, "phone too long")?;
    }
    Ok(())
}

impl Engine {
    // ── Reference data ───────────────────────────────────────

    pub async fn register_instrument(&self, id: Ulid, name: String) -> Result<(), EngineError> {
        validate_text(&name, MAX_NAME_LEN, "instrument name too long")?;
        let _guard = self.lock_all(vec![id]).await;
        if self.store.contains_instrument(&id) {
            return Err(EngineError::AlreadyExists(Entity::Instrument, id));
        }
        self.persist_and_apply(&Event::InstrumentRegistered { id, name })
            .await
    }

    pub async fn register_style(&self, id: Ulid, name: String) -> Result<(), EngineError> {
        validate_text(&name, MAX_NAME_LEN, "style name too long")?;
        let _guard = self.lock_all(vec![id]).await;
        if self.store.contains_style(&id) {
            return Err(EngineError::AlreadyExists(Entity::MusicStyle, id));
        }
        self.persist_and_apply(&Event::StyleRegistered { id, name }).await
    }

    pub async fn register_musician(&self, musician: Musician) -> Result<(), EngineError> {
        let Musician {
            id,
            name,
            email,
            phone,
            instruments,
            styles,
        } = musician;
        validate_text(&name, MAX_NAME_LEN, "musician name too long")?;
        validate_contact(&email, &phone)?;
        if instruments.len() > MAX_INSTRUMENTS_PER_MUSICIAN {
            return Err(EngineError::LimitExceeded("too many instruments"));
        }
        if styles.len() > MAX_STYLES_PER_ENTITY {
            return Err(EngineError::LimitExceeded("too many styles"));
        }
        self.check_references(&instruments, &styles)?;

        let _guard = self.lock_all(vec![id]).await;
        if self.store.contains_musician(&id) {
            return Err(EngineError::AlreadyExists(Entity::Musician, id));
        }
        let event = Event::MusicianRegistered {
            id,
            name,
            email,
            phone,
            instruments,
            styles,
        };
        self.persist_and_apply(&event).await
    }

    /// Register a band. The roster is deduplicated keeping first occurrence,
    /// since roster order is the assignment tie-break.
    pub async fn register_band(&self, band: Band) -> Result<(), EngineError> {
        let Band {
            id,
            name,
            required_instruments,
            styles,
            members,
        } = band;
        validate_text(&name, MAX_NAME_LEN, "band name too long")?;
        if required_instruments.len() > MAX_REQUIRED_INSTRUMENTS {
            return Err(EngineError::LimitExceeded("too many required instruments"));
        }
        if styles.len() > MAX_STYLES_PER_ENTITY {
            return Err(EngineError::LimitExceeded("too many styles"));
        }
        if members.len() > MAX_ROSTER_SIZE {
            return Err(EngineError::LimitExceeded("roster too large"));
        }
        self.check_references(&required_instruments, &styles)?;
        if let Some(missing) = members.iter().find(|m| !self.store.contains_musician(m)) {
            return Err(EngineError::NotFound(Entity::Musician, *missing));
        }
        let mut seen = HashSet::new();
        let members: Vec<Ulid> = members.into_iter().filter(|m| seen.insert(*m)).collect();

        let _guard = self.lock_all(vec![id]).await;
        if self.store.contains_band(&id) {
            return Err(EngineError::AlreadyExists(Entity::Band, id));
        }
        let event = Event::BandRegistered {
            id,
            name,
            required_instruments,
            styles,
            members,
        };
        self.persist_and_apply(&event).await
    }

    pub async fn register_client(&self, client: Client) -> Result<(), EngineError> {
        let Client {
            id,
            name,
            email,
            phone,
        } = client;
        validate_text(&name, MAX_NAME_LEN, "client name too long")?;
        validate_contact(&email, &phone)?;

        let _guard = self.lock_all(vec![id]).await;
        if self.store.contains_client(&id) {
            return Err(EngineError::AlreadyExists(Entity::Client, id));
        }
        let event = Event::ClientRegistered {
            id,
            name,
            email,
            phone,
        };
        self.persist_and_apply(&event).await
    }

    fn check_references<'a>(
        &self,
        instruments: impl IntoIterator<Item = &'a Ulid>,
        styles: impl IntoIterator<Item = &'a Ulid>,
    ) -> Result<(), EngineError> {
        for id in instruments {
            if !self.store.contains_instrument(id) {
                return Err(EngineError::NotFound(Entity::Instrument, *id));
            }
        }
        for id in styles {
            if !self.store.contains_style(id) {
                return Err(EngineError::NotFound(Entity::MusicStyle, *id));
            }
        }
        Ok(())
    }

    // ── Booking lifecycle ────────────────────────────────────

    /// Create a Pending booking for `band_id` over `[start, end)`.
    ///
    /// The availability check and the write happen under the band's lock, so
    /// two overlapping requests for the same band cannot both succeed.
    pub async fn create_booking(
        &self,
        client_id: Ulid,
        band_id: Ulid,
        start: Ms,
        end: Ms,
        city: String,
        state: String,
    ) -> Result<Booking, EngineError> {
        let result = self
            .create_booking_locked(client_id, band_id, start, end, city, state)
            .await;
        observability::record("create_booking", &result);
        result
    }

    async fn create_booking_locked(
        &self,
        client_id: Ulid,
        band_id: Ulid,
        start: Ms,
        end: Ms,
        city: String,
        state: String,
    ) -> Result<Booking, EngineError> {
        let span = validate_gig(start, end)?;
        validate_text(&city, MAX_LOCATION_LEN, "city too long")?;
        validate_text(&state, MAX_LOCATION_LEN, "state too long")?;
        if !self.store.contains_client(&client_id) {
            return Err(EngineError::NotFound(Entity::Client, client_id));
        }
        if !self.store.contains_band(&band_id) {
            return Err(EngineError::NotFound(Entity::Band, band_id));
        }

        let _guard = self.lock_all(vec![band_id]).await;
        if self.store.band_booking_count(&band_id) >= MAX_BOOKINGS_PER_BAND {
            return Err(EngineError::LimitExceeded("too many bookings for band"));
        }
        check_band_free(&self.store, &band_id, &span)?;

        let id = Ulid::new();
        let event = Event::BookingCreated {
            id,
            band_id,
            client_id,
            span,
            city,
            state,
        };
        self.persist_and_apply(&event).await?;
        info!(booking = %id, band = %band_id, client = %client_id, "booking created");

        self.store
            .find_booking(&id)
            .ok_or(EngineError::NotFound(Entity::Booking, id))
    }

    /// Fill every required instrument of the band and confirm the booking.
    ///
    /// Holds the band lock plus one lock per roster musician for the whole
    /// read-pool / pick / persist sequence. Nothing is written unless every
    /// instrument is covered.
    pub async fn assign_musicians(&self, booking_id: Ulid) -> Result<Booking, EngineError> {
        let started = Instant::now();
        let result = self.assign_musicians_locked(booking_id).await;
        observability::record("assign_musicians", &result);
        match &result {
            Ok(booking) => {
                metrics::histogram!(ASSIGNMENT_DURATION_SECONDS)
                    .record(started.elapsed().as_secs_f64());
                metrics::histogram!(LINEUP_SIZE).record(booking.lineup.len() as f64);
            }
            Err(e) => warn!(booking = %booking_id, "assignment rejected: {e}"),
        }
        result
    }

    async fn assign_musicians_locked(&self, booking_id: Ulid) -> Result<Booking, EngineError> {
        let booking = self
            .store
            .find_booking(&booking_id)
            .ok_or(EngineError::NotFound(Entity::Booking, booking_id))?;
        let band = self
            .store
            .find_band(&booking.band_id)
            .ok_or(EngineError::NotFound(Entity::Band, booking.band_id))?;

        let mut lock_ids = band.members.clone();
        lock_ids.push(band.id);
        let _guards = self.lock_all(lock_ids).await;

        // Re-read under the locks: a concurrent call may have moved it on.
        let booking = self
            .store
            .find_booking(&booking_id)
            .ok_or(EngineError::NotFound(Entity::Booking, booking_id))?;
        check_assignable(&booking)?;
        if band.required_instruments.is_empty() {
            return Err(EngineError::InstrumentsNotDefined(band.id));
        }

        let required = band
            .required_instruments
            .iter()
            .map(|id| {
                self.store
                    .find_instrument(id)
                    .ok_or(EngineError::NotFound(Entity::Instrument, *id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let pool = available_musicians(&self.store, &band, &booking.span);
        debug!(booking = %booking_id, pool = pool.len(), required = required.len(), "assigning lineup");
        let lineup = assign_lineup(pool, &required, &band.styles)?;

        let event = Event::MusiciansAssigned {
            id: booking_id,
            band_id: band.id,
            lineup,
        };
        self.persist_and_apply(&event).await?;
        info!(booking = %booking_id, band = %band.id, "lineup assigned, booking confirmed");

        self.store
            .find_booking(&booking_id)
            .ok_or(EngineError::NotFound(Entity::Booking, booking_id))
    }

    /// Status update outside assignment and cancellation. Only
    /// Confirmed → Completed is accepted. Administrative corrections such as
    /// Cancelled → Pending are not supported; book a new gig instead.
    pub async fn update_status(
        &self,
        booking_id: Ulid,
        status: BookingStatus,
    ) -> Result<Booking, EngineError> {
        let result = self
            .transition(booking_id, status, |b| check_status_update(b, status))
            .await;
        observability::record("update_status", &result);
        result
    }

    /// Cancel a Pending or Confirmed booking. Frees the band and the lineup
    /// for the gig window.
    pub async fn cancel_booking(&self, booking_id: Ulid) -> Result<Booking, EngineError> {
        let result = self
            .transition(booking_id, BookingStatus::Cancelled, check_cancellable)
            .await;
        observability::record("cancel_booking", &result);
        result
    }

    async fn transition(
        &self,
        booking_id: Ulid,
        to: BookingStatus,
        guard: impl Fn(&Booking) -> Result<(), EngineError>,
    ) -> Result<Booking, EngineError> {
        let band_id = self
            .store
            .find_booking(&booking_id)
            .ok_or(EngineError::NotFound(Entity::Booking, booking_id))?
            .band_id;
        let _lock = self.lock_all(vec![band_id]).await;

        let booking = self
            .store
            .find_booking(&booking_id)
            .ok_or(EngineError::NotFound(Entity::Booking, booking_id))?;
        guard(&booking)?;

        let from = booking.status;
        let event = Event::BookingStatusChanged {
            id: booking_id,
            band_id,
            from,
            to,
        };
        self.persist_and_apply(&event).await?;
        info!(booking = %booking_id, %from, %to, "booking status changed");

        self.store
            .find_booking(&booking_id)
            .ok_or(EngineError::NotFound(Entity::Booking, booking_id))
    }

    // ── Log maintenance ──────────────────────────────────────

    /// Rewrite the WAL with only the events needed to recreate the current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _gate = self.commit_gate.write().await;
        let events = self.snapshot_events();
        let count = events.len();

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))?;

        metrics::counter!(WAL_COMPACTIONS_TOTAL).increment(1);
        debug!(events = count, "WAL compacted");
        Ok(())
    }

    /// Reference data first (bands after the musicians and instruments they
    /// reference), then each booking as created → assigned → final status.
    fn snapshot_events(&self) -> Vec<Event> {
        let mut events = Vec::new();

        for i in self.store.instruments() {
            events.push(Event::InstrumentRegistered { id: i.id, name: i.name });
        }
        for s in self.store.styles() {
            events.push(Event::StyleRegistered { id: s.id, name: s.name });
        }
        for m in self.store.musicians() {
            events.push(Event::MusicianRegistered {
                id: m.id,
                name: m.name,
                email: m.email,
                phone: m.phone,
                instruments: m.instruments,
                styles: m.styles,
            });
        }
        for b in self.store.bands() {
            events.push(Event::BandRegistered {
                id: b.id,
                name: b.name,
                required_instruments: b.required_instruments,
                styles: b.styles,
                members: b.members,
            });
        }
        for c in self.store.clients() {
            events.push(Event::ClientRegistered {
                id: c.id,
                name: c.name,
                email: c.email,
                phone: c.phone,
            });
        }

        for booking in self.store.all_bookings() {
            events.push(Event::BookingCreated {
                id: booking.id,
                band_id: booking.band_id,
                client_id: booking.client_id,
                span: booking.span,
                city: booking.location.city,
                state: booking.location.state,
            });
            let replayed = if booking.lineup.is_empty() {
                BookingStatus::Pending
            } else {
                events.push(Event::MusiciansAssigned {
                    id: booking.id,
                    band_id: booking.band_id,
                    lineup: booking.lineup,
                });
                BookingStatus::Confirmed
            };
            if booking.status != replayed {
                events.push(Event::BookingStatusChanged {
                    id: booking.id,
                    band_id: booking.band_id,
                    from: replayed,
                    to: booking.status,
                });
            }
        }

        events
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
