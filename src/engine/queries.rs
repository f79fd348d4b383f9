use ulid::Ulid;

use crate::model::*;

use super::availability;
use super::conflict::validate_query;
use super::store::BookingStore;
use super::{Engine, EngineError, Entity};

impl Engine {
    pub fn get_booking(&self, id: &Ulid) -> Result<Booking, EngineError> {
        self.store
            .find_booking(id)
            .ok_or(EngineError::NotFound(Entity::Booking, *id))
    }

    /// Every booking, ordered by start then id.
    pub fn list_bookings(&self) -> Vec<Booking> {
        self.store.all_bookings()
    }

    pub fn get_band(&self, id: &Ulid) -> Result<Band, EngineError> {
        self.store
            .find_band(id)
            .ok_or(EngineError::NotFound(Entity::Band, *id))
    }

    pub fn get_musician(&self, id: &Ulid) -> Result<Musician, EngineError> {
        self.store
            .find_musician(id)
            .ok_or(EngineError::NotFound(Entity::Musician, *id))
    }

    pub fn get_client(&self, id: &Ulid) -> Result<Client, EngineError> {
        self.store
            .find_client(id)
            .ok_or(EngineError::NotFound(Entity::Client, *id))
    }

    pub fn bookings_for_band(&self, band_id: &Ulid) -> Result<Vec<Booking>, EngineError> {
        if !self.store.contains_band(band_id) {
            return Err(EngineError::NotFound(Entity::Band, *band_id));
        }
        Ok(self.store.band_bookings(band_id))
    }

    /// Bookings where the musician is in the lineup.
    pub fn bookings_for_musician(&self, musician_id: &Ulid) -> Result<Vec<Booking>, EngineError> {
        if !self.store.contains_musician(musician_id) {
            return Err(EngineError::NotFound(Entity::Musician, *musician_id));
        }
        Ok(self.store.musician_bookings(musician_id))
    }

    pub fn bookings_for_client(&self, client_id: &Ulid) -> Result<Vec<Booking>, EngineError> {
        if !self.store.contains_client(client_id) {
            return Err(EngineError::NotFound(Entity::Client, *client_id));
        }
        Ok(self.store.client_bookings(client_id))
    }

    // ── Availability ─────────────────────────────────────────

    /// Whether the band could take a gig over `[start, end)`. Advisory only:
    /// `create_booking` re-checks under the band lock.
    pub fn is_band_available(&self, band_id: &Ulid, start: Ms, end: Ms) -> Result<bool, EngineError> {
        let span = validate_query(start, end)?;
        if !self.store.contains_band(band_id) {
            return Err(EngineError::NotFound(Entity::Band, *band_id));
        }
        Ok(availability::is_band_available(&self.store, band_id, &span))
    }

    /// Roster members free over `[start, end)`, in roster order.
    pub fn find_available_musicians(
        &self,
        band_id: &Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<Vec<Musician>, EngineError> {
        let span = validate_query(start, end)?;
        let band = self.get_band(band_id)?;
        Ok(availability::available_musicians(&self.store, &band, &span))
    }

    /// Gaps in the band's calendar within `[start, end)`.
    pub fn free_windows(&self, band_id: &Ulid, start: Ms, end: Ms) -> Result<Vec<Span>, EngineError> {
        let query = validate_query(start, end)?;
        if !self.store.contains_band(band_id) {
            return Err(EngineError::NotFound(Entity::Band, *band_id));
        }
        Ok(availability::free_windows(&self.store, band_id, &query))
    }
}
