use std::fmt;

use ulid::Ulid;

use crate::model::{BookingStatus, Ms};

/// Entity kinds named in lookup errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Band,
    Musician,
    Client,
    Instrument,
    MusicStyle,
    Booking,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Entity::Band => "band",
            Entity::Musician => "musician",
            Entity::Client => "client",
            Entity::Instrument => "instrument",
            Entity::MusicStyle => "music style",
            Entity::Booking => "booking",
        };
        f.write_str(s)
    }
}

/// Coarse class of an error, for callers mapping onto a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Conflict,
    Internal,
}

#[derive(Debug)]
pub enum EngineError {
    NotFound(Entity, Ulid),
    AlreadyExists(Entity, Ulid),
    InvalidTimeRange { start: Ms, end: Ms },
    BandUnavailable { band_id: Ulid, conflicting: Ulid },
    AlreadyAssigned(Ulid),
    InstrumentsNotDefined(Ulid),
    NoMusicianForInstrument { instrument_id: Ulid, instrument: String },
    AlreadyCompleted(Ulid),
    AlreadyCancelled(Ulid),
    IllegalTransition { id: Ulid, from: BookingStatus, to: BookingStatus },
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound(..) => ErrorKind::NotFound,
            EngineError::AlreadyExists(..) => ErrorKind::Conflict,
            EngineError::WalError(_) => ErrorKind::Internal,
            EngineError::InvalidTimeRange { .. }
            | EngineError::BandUnavailable { .. }
            | EngineError::AlreadyAssigned(_)
            | EngineError::InstrumentsNotDefined(_)
            | EngineError::NoMusicianForInstrument { .. }
            | EngineError::AlreadyCompleted(_)
            | EngineError::AlreadyCancelled(_)
            | EngineError::IllegalTransition { .. }
            | EngineError::LimitExceeded(_) => ErrorKind::BadRequest,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotFound(entity, id) => write!(f, "{entity} not found: {id}"),
            EngineError::AlreadyExists(entity, id) => write!(f, "{entity} already exists: {id}"),
            EngineError::InvalidTimeRange { start, end } => {
                write!(f, "invalid booking time range [{start}, {end})")
            }
            EngineError::BandUnavailable { band_id, conflicting } => {
                write!(f, "band {band_id} is not available: conflicts with booking {conflicting}")
            }
            EngineError::AlreadyAssigned(id) => {
                write!(f, "musicians already assigned for booking {id}")
            }
            EngineError::InstrumentsNotDefined(band_id) => {
                write!(f, "required instruments not defined for band {band_id}")
            }
            EngineError::NoMusicianForInstrument { instrument, .. } => {
                write!(f, "no musician available for required instrument: {instrument}")
            }
            EngineError::AlreadyCompleted(id) => {
                write!(f, "booking {id} cannot be cancelled: already completed")
            }
            EngineError::AlreadyCancelled(id) => write!(f, "booking {id} already cancelled"),
            EngineError::IllegalTransition { id, from, to } => {
                write!(f, "booking {id}: illegal status transition {from} -> {to}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
