use std::collections::{BTreeMap, BTreeSet};

use crate::{
    core::{Iso3, Lang, Year},
    dataset::Dataset,
    error::{RaceError, RaceResult},
};

/// Static per-country display metadata, cached from the first record seen for
/// that country. Stable for the lifetime of the session.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CountryMeta {
    pub iso3: Iso3,
    pub name: String,
    pub name_cn: String,
    pub color: String,
    pub flag: String,
}

impl CountryMeta {
    /// Primary label in the given language.
    pub fn display_name(&self, lang: Lang) -> &str {
        match lang {
            Lang::En => &self.name,
            Lang::Zh => &self.name_cn,
        }
    }

    /// Secondary label: the other language, shown under the primary one.
    pub fn alt_name(&self, lang: Lang) -> &str {
        match lang {
            Lang::En => &self.name_cn,
            Lang::Zh => &self.name,
        }
    }
}

/// One country's metadata plus its year → value series.
#[derive(Clone, Debug)]
pub struct CountrySeries {
    pub meta: CountryMeta,
    values: BTreeMap<Year, f64>,
}

impl CountrySeries {
    pub fn value_at(&self, year: Year) -> Option<f64> {
        self.values.get(&year).copied()
    }

    pub fn year_span(&self) -> Option<(Year, Year)> {
        let first = *self.values.keys().next()?;
        let last = *self.values.keys().next_back()?;
        Some((first, last))
    }
}

/// Read-only lookup structure the animation runs against. Built once from a
/// validated dataset; countries iterate in stable `Iso3` order.
#[derive(Clone, Debug)]
pub struct RaceIndex {
    countries: BTreeMap<Iso3, CountrySeries>,
    min_year: Year,
    max_year: Year,
    year_count: usize,
}

impl RaceIndex {
    pub fn build(dataset: &Dataset) -> RaceResult<Self> {
        let mut countries: BTreeMap<Iso3, CountrySeries> = BTreeMap::new();
        let mut years: BTreeSet<Year> = BTreeSet::new();

        for r in dataset.records() {
            years.insert(r.year);
            let series = countries.entry(r.iso3).or_insert_with(|| CountrySeries {
                meta: CountryMeta {
                    iso3: r.iso3,
                    name: r.name.clone(),
                    name_cn: r.name_cn.clone(),
                    color: r.color.clone(),
                    flag: r.flag.clone(),
                },
                values: BTreeMap::new(),
            });
            // Dataset validation already rejects duplicate (iso3, year) pairs.
            series.values.insert(r.year, r.value);
        }

        let (Some(&min_year), Some(&max_year)) = (years.first(), years.last()) else {
            return Err(RaceError::validation("cannot index an empty dataset"));
        };

        tracing::debug!(
            countries = countries.len(),
            years = years.len(),
            %min_year,
            %max_year,
            "built race index"
        );

        Ok(Self {
            countries,
            min_year,
            max_year,
            year_count: years.len(),
        })
    }

    pub fn countries(&self) -> impl Iterator<Item = (&Iso3, &CountrySeries)> {
        self.countries.iter()
    }

    pub fn country_count(&self) -> usize {
        self.countries.len()
    }

    pub fn meta(&self, iso3: Iso3) -> Option<&CountryMeta> {
        self.countries.get(&iso3).map(|s| &s.meta)
    }

    pub fn value_at(&self, iso3: Iso3, year: Year) -> Option<f64> {
        self.countries.get(&iso3)?.value_at(year)
    }

    pub fn min_year(&self) -> Year {
        self.min_year
    }

    pub fn max_year(&self) -> Year {
        self.max_year
    }

    /// Number of distinct years present in the dataset. Drives the total
    /// animation duration, so a sparse dataset plays faster than a dense one
    /// spanning the same range.
    pub fn year_count(&self) -> usize {
        self.year_count
    }
}
