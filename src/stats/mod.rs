//! Passport stats projection — pure derivation of display statistics from
//! (catalog × visited set). Recomputed on every mirror change, never stored.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::Catalog;
use crate::types::{Continent, CountryCode};

/// Visited/total counts for one continent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinentStats {
    pub visited: usize,
    pub total: usize,
}

/// Aggregate passport statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassportStats {
    /// Visited codes that exist in the catalog (unknown codes are ignored).
    pub total_visited: usize,
    pub catalog_size: usize,
    /// All six continents are present, zero rows included.
    pub by_continent: BTreeMap<Continent, ContinentStats>,
}

impl PassportStats {
    /// Project stats for `visited` against `catalog`.
    pub fn project(catalog: &Catalog, visited: &BTreeSet<CountryCode>) -> Self {
        let mut by_continent: BTreeMap<Continent, ContinentStats> = Continent::ALL
            .iter()
            .map(|&c| (c, ContinentStats::default()))
            .collect();

        let mut total_visited = 0;
        for country in catalog.iter() {
            let entry = by_continent.entry(country.continent).or_default();
            entry.total += 1;
            if visited.contains(&country.code) {
                entry.visited += 1;
                total_visited += 1;
            }
        }

        Self {
            total_visited,
            catalog_size: catalog.len(),
            by_continent,
        }
    }

    /// Fraction visited in 0.0..=1.0; 0.0 for an empty catalog.
    pub fn progress(&self) -> f64 {
        if self.catalog_size == 0 {
            0.0
        } else {
            self.total_visited as f64 / self.catalog_size as f64
        }
    }

    /// Rounded percentage, clamped to 0..=100.
    pub fn progress_percent(&self) -> u8 {
        (self.progress() * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// Continents with at least one visited country.
    pub fn continents_unlocked(&self) -> usize {
        self.by_continent.values().filter(|s| s.visited > 0).count()
    }

    /// Stats for one continent (always present).
    pub fn continent(&self, continent: Continent) -> ContinentStats {
        self.by_continent.get(&continent).copied().unwrap_or_default()
    }
}
