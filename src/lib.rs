//! Band booking scheduler: gig windows, availability, greedy lineup
//! assignment and the booking lifecycle, persisted through an event WAL.

pub mod compactor;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod wal;
