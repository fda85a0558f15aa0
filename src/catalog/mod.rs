//! The static country catalog — the immutable list of known countries.
//!
//! Loaded once at startup; everything else (mirror, stats) is interpreted
//! against it. Codes not present in the catalog are tolerated by readers and
//! simply ignored.

use std::collections::HashMap;

use crate::types::{Continent, Country, CountryCode};

/// Ordered, deduplicated list of known countries with a code index.
#[derive(Debug, Clone)]
pub struct Catalog {
    countries: Vec<Country>,
    by_code: HashMap<CountryCode, usize>,
}

impl Catalog {
    /// Build a catalog from entries, keeping the first occurrence of each code.
    pub fn new(entries: impl IntoIterator<Item = Country>) -> Self {
        let mut countries = Vec::new();
        let mut by_code = HashMap::new();
        for country in entries {
            if by_code.contains_key(&country.code) {
                continue;
            }
            by_code.insert(country.code.clone(), countries.len());
            countries.push(country);
        }
        Self { countries, by_code }
    }

    /// The product's shipping catalog.
    pub fn builtin() -> Self {
        const ENTRIES: &[(&str, &str, Continent)] = &[
            ("RO", "Romania", Continent::Europe),
            ("AT", "Austria", Continent::Europe),
            ("FR", "France", Continent::Europe),
            ("DE", "Germany", Continent::Europe),
            ("IT", "Italy", Continent::Europe),
            ("ES", "Spain", Continent::Europe),
            ("GB", "United Kingdom", Continent::Europe),
            ("US", "United States", Continent::NorthAmerica),
            ("CA", "Canada", Continent::NorthAmerica),
            ("JP", "Japan", Continent::Asia),
        ];
        Self::new(ENTRIES.iter().filter_map(|&(code, name, continent)| {
            // Literals above are known-good; a bad one is silently skipped
            // rather than panicking at startup.
            CountryCode::parse(code).ok().map(|code| Country {
                code,
                name: name.to_string(),
                continent,
            })
        }))
    }

    pub fn get(&self, code: &CountryCode) -> Option<&Country> {
        self.by_code.get(code).map(|&i| &self.countries[i])
    }

    pub fn contains(&self, code: &CountryCode) -> bool {
        self.by_code.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// All countries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Country> {
        self.countries.iter()
    }

    /// Countries of one continent, in catalog order.
    pub fn by_continent(&self, continent: Continent) -> impl Iterator<Item = &Country> {
        self.countries
            .iter()
            .filter(move |c| c.continent == continent)
    }
}
