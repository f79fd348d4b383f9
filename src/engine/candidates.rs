use std::collections::BTreeSet;

use ulid::Ulid;

use crate::model::Musician;

/// Musicians in `pool` who play `instrument` and share at least one style
/// with the band. Pool order is preserved.
pub fn filter_for_instrument<'a>(
    pool: &'a [Musician],
    instrument: &Ulid,
    band_styles: &BTreeSet<Ulid>,
) -> Vec<&'a Musician> {
    pool.iter()
        .filter(|m| m.plays(instrument))
        .filter(|m| m.shared_styles(band_styles) > 0)
        .collect()
}
