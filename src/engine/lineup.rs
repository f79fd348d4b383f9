use std::cmp::Reverse;
use std::collections::BTreeSet;

use ulid::Ulid;

use crate::model::{Instrument, LineupSlot, Musician};

use super::EngineError;
use super::candidates::filter_for_instrument;

/// Greedy lineup assignment.
///
/// Walks `required` in order. For each instrument the candidates are ranked by
/// descending style affinity with the band (stable, so ties go to the earlier
/// pool entry); the winner is taken out of the pool so nobody fills two slots.
/// The choice is local: a musician used for an early instrument is gone for
/// later ones even if a different split would have covered everything.
///
/// Fails on the first instrument nobody can cover. The caller has not written
/// anything at that point.
pub fn assign_lineup(
    mut pool: Vec<Musician>,
    required: &[Instrument],
    band_styles: &BTreeSet<Ulid>,
) -> Result<Vec<LineupSlot>, EngineError> {
    let mut lineup = Vec::with_capacity(required.len());

    for instrument in required {
        let mut candidates = filter_for_instrument(&pool, &instrument.id, band_styles);
        candidates.sort_by_key(|m| Reverse(m.shared_styles(band_styles)));

        let chosen = match candidates.first() {
            Some(m) => m.id,
            None => {
                return Err(EngineError::NoMusicianForInstrument {
                    instrument_id: instrument.id,
                    instrument: instrument.name.clone(),
                });
            }
        };

        lineup.push(LineupSlot {
            instrument_id: instrument.id,
            musician_id: chosen,
        });
        pool.retain(|m| m.id != chosen);
    }

    Ok(lineup)
}
