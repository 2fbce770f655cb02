use crate::config::CityEntry;
use std::collections::HashMap;

/// Built-in city table: canonical name, listing slug, aliases
const BUILTIN_CITIES: &[(&str, &str, &[&str])] = &[
    ("new delhi", "delhi", &["delhi", "ncr", "delhi ncr"]),
    ("san francisco", "sf", &["sf", "bay area", "sfbay"]),
    ("new york", "nyc", &["nyc", "new york city", "ny"]),
    ("london", "london", &[]),
    ("mumbai", "mumbai", &["bombay"]),
    ("bengaluru", "bengaluru", &["bangalore", "blr"]),
    ("singapore", "singapore", &[]),
    ("berlin", "berlin", &[]),
    ("paris", "paris", &[]),
    ("tokyo", "tokyo", &[]),
    ("dubai", "dubai", &[]),
    ("toronto", "toronto", &[]),
    ("los angeles", "la", &["la"]),
    ("seattle", "seattle", &[]),
    ("austin", "austin", &[]),
    ("hyderabad", "hyderabad", &[]),
    ("pune", "pune", &[]),
    ("chennai", "chennai", &["madras"]),
];

/// Case-insensitive, whitespace-normalized mapping from city names to slugs
#[derive(Debug, Clone)]
pub struct CityTable {
    slugs: HashMap<String, String>,
}

impl CityTable {
    /// Builds the table from the built-in entries plus configured overrides
    ///
    /// Configured entries are applied last, so they replace built-in names
    /// and aliases they collide with.
    pub fn new(overrides: &[CityEntry]) -> Self {
        let mut slugs = HashMap::new();

        for (name, slug, aliases) in BUILTIN_CITIES {
            insert_entry(&mut slugs, name, slug, aliases.iter().copied());
        }

        for entry in overrides {
            insert_entry(
                &mut slugs,
                &entry.name,
                &entry.slug,
                entry.aliases.iter().map(String::as_str),
            );
        }

        Self { slugs }
    }

    /// Looks up the listing slug for a city name
    pub fn slug_for(&self, city: &str) -> Option<&str> {
        self.slugs.get(&normalize_city(city)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }
}

impl Default for CityTable {
    fn default() -> Self {
        Self::new(&[])
    }
}

fn insert_entry<'a>(
    slugs: &mut HashMap<String, String>,
    name: &str,
    slug: &str,
    aliases: impl Iterator<Item = &'a str>,
) {
    slugs.insert(normalize_city(name), slug.to_string());
    slugs.insert(normalize_city(slug), slug.to_string());
    for alias in aliases {
        slugs.insert(normalize_city(alias), slug.to_string());
    }
}

/// Lowercases and joins words with single hyphens
///
/// `"  New   Delhi "`, `"new_delhi"` and `"NEW-DELHI"` all become `"new-delhi"`.
pub fn normalize_city(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}
