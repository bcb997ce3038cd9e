use crate::{
    core::{Iso3, Year},
    error::{RaceError, RaceResult},
    index::{CountryMeta, RaceIndex},
};

pub trait Lerp: Sized {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

/// One ranked entry of an interpolated snapshot, borrowing the country's
/// cached metadata from the index.
#[derive(Clone, Copy, Debug, serde::Serialize)]
pub struct RankEntry<'a> {
    pub iso3: Iso3,
    pub meta: &'a CountryMeta,
    pub value: f64,
}

/// Produces the ranked top-N snapshot for a decimal year.
///
/// Values are linearly interpolated between the floor year and the next year.
/// A missing floor-year value counts as 0; a missing next-year value holds the
/// floor value, so the dataset's edges are never extrapolated. Countries whose
/// interpolated value is not positive are dropped. Ties sort by ascending
/// `Iso3` so the ordering is deterministic.
///
/// Pure function of `(decimal_year, index)`.
#[tracing::instrument(skip(index))]
pub fn ranked_snapshot(
    index: &RaceIndex,
    decimal_year: f64,
    top_n: usize,
) -> RaceResult<Vec<RankEntry<'_>>> {
    if !decimal_year.is_finite() {
        return Err(RaceError::animation("decimal year must be finite"));
    }
    let (min, max) = (index.min_year(), index.max_year());
    if decimal_year < min.as_f64() || decimal_year > max.as_f64() {
        return Err(RaceError::animation(format!(
            "decimal year {decimal_year} outside dataset range {min}..={max}"
        )));
    }

    let year = Year::floor_of(decimal_year);
    let fraction = decimal_year - year.as_f64();
    let next = year.next().min(max);

    let mut entries: Vec<RankEntry<'_>> = Vec::new();
    for (&iso3, series) in index.countries() {
        let v1 = series.value_at(year).unwrap_or(0.0);
        let v2 = series.value_at(next).unwrap_or(v1);
        let value = f64::lerp(&v1, &v2, fraction);
        if value > 0.0 {
            entries.push(RankEntry {
                iso3,
                meta: &series.meta,
                value,
            });
        }
    }

    entries.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.iso3.cmp(&b.iso3)));
    entries.truncate(top_n);

    // The index cannot yield duplicate identifiers; kept as a cheap check.
    debug_assert!(
        {
            let mut seen = std::collections::HashSet::new();
            entries.iter().all(|e| seen.insert(e.iso3))
        },
        "ranked snapshot produced duplicate countries"
    );

    Ok(entries)
}
