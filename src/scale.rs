use std::collections::HashMap;

use crate::core::Iso3;

/// Linear domain → range mapping for bar widths and axis ticks.
#[derive(Clone, Copy, Debug)]
pub struct LinearScale {
    d0: f64,
    d1: f64,
    r0: f64,
    r1: f64,
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            d0: domain.0,
            d1: domain.1,
            r0: range.0,
            r1: range.1,
        }
    }

    pub fn set_domain(&mut self, d0: f64, d1: f64) {
        self.d0 = d0;
        self.d1 = d1;
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.d0, self.d1)
    }

    pub fn scale(&self, v: f64) -> f64 {
        if self.d1 == self.d0 {
            return self.r0;
        }
        self.r0 + (v - self.d0) / (self.d1 - self.d0) * (self.r1 - self.r0)
    }

    /// Round-stepped tick values covering the domain, d3-style: steps are
    /// 1, 2 or 5 times a power of ten, chosen to yield about `count` ticks.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (start, stop) = (self.d0.min(self.d1), self.d0.max(self.d1));
        if !(stop - start).is_finite() || stop <= start || count == 0 {
            return Vec::new();
        }

        let step = tick_step(start, stop, count);
        if step <= 0.0 {
            return Vec::new();
        }

        let first = (start / step).ceil();
        let last = (stop / step).floor();
        let n = (last - first) as usize + 1;
        (0..n).map(|i| (first + i as f64) * step).collect()
    }
}

fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let raw = (stop - start) / count.max(1) as f64;
    let power = raw.log10().floor();
    let magnitude = 10f64.powf(power);
    let err = raw / magnitude;

    // Thresholds are sqrt(50), sqrt(10), sqrt(2).
    let factor = if err >= 7.071 {
        10.0
    } else if err >= 3.162 {
        5.0
    } else if err >= 1.414 {
        2.0
    } else {
        1.0
    };
    factor * magnitude
}

/// Ordinal band scale mapping the ranked country order to vertical positions,
/// with d3's band semantics (inner/outer padding, centered alignment).
#[derive(Clone, Debug)]
pub struct BandScale {
    domain: Vec<Iso3>,
    index: HashMap<Iso3, usize>,
    r0: f64,
    r1: f64,
    padding_inner: f64,
    padding_outer: f64,
    step: f64,
    bandwidth: f64,
    start: f64,
}

impl BandScale {
    pub fn new(range: (f64, f64), padding_inner: f64, padding_outer: f64) -> Self {
        let mut scale = Self {
            domain: Vec::new(),
            index: HashMap::new(),
            r0: range.0,
            r1: range.1,
            padding_inner: padding_inner.clamp(0.0, 1.0),
            padding_outer: padding_outer.max(0.0),
            step: 0.0,
            bandwidth: 0.0,
            start: range.0,
        };
        scale.rescale();
        scale
    }

    pub fn set_domain(&mut self, domain: Vec<Iso3>) {
        self.index.clear();
        for (i, &iso3) in domain.iter().enumerate() {
            self.index.entry(iso3).or_insert(i);
        }
        self.domain = domain;
        self.rescale();
    }

    pub fn set_range(&mut self, range: (f64, f64)) {
        self.r0 = range.0;
        self.r1 = range.1;
        self.rescale();
    }

    fn rescale(&mut self) {
        const ALIGN: f64 = 0.5;
        let n = self.domain.len() as f64;
        self.step = (self.r1 - self.r0)
            / (n - self.padding_inner + self.padding_outer * 2.0).max(1.0);
        self.bandwidth = self.step * (1.0 - self.padding_inner);
        self.start =
            self.r0 + (self.r1 - self.r0 - self.step * (n - self.padding_inner)) * ALIGN;
    }

    /// Top edge of the band for this identifier, if it is in the domain.
    pub fn position(&self, iso3: Iso3) -> Option<f64> {
        let i = *self.index.get(&iso3)?;
        Some(self.start + self.step * i as f64)
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn step(&self) -> f64 {
        self.step
    }
}
