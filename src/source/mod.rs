//! Source Resolver
//!
//! Maps a [`SourceDescriptor`] to the concrete pages to fetch and the shape
//! each page is expected to have. Resolution is pure: the same descriptor and
//! city table always yield the same targets.

mod city;
mod normalize;

pub use city::{normalize_city, CityTable};
pub use normalize::{normalize_url, resolve_href};

use crate::config::{is_valid_slug, SourceConfig};
use crate::event::{PageShape, SourceDescriptor};
use crate::{ConfigError, ResolveError};
use url::Url;

/// One page to fetch, with the shape the extractor should expect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: Url,
    pub shape: PageShape,
}

impl FetchTarget {
    pub fn new(url: Url, shape: PageShape) -> Self {
        Self { url, shape }
    }
}

/// Resolves descriptors against a base URL and a city table
#[derive(Debug, Clone)]
pub struct SourceResolver {
    base_url: Url,
    explore_path: String,
    cities: CityTable,
}

impl SourceResolver {
    /// Creates a resolver from the `[source]` configuration section
    pub fn from_config(config: &SourceConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(format!(
                "base-url '{}' cannot be a base",
                config.base_url
            )));
        }

        Ok(Self {
            base_url,
            explore_path: config.explore_path.clone(),
            cities: CityTable::new(&config.cities),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Expands a descriptor into fetch targets
    ///
    /// # Returns
    ///
    /// * `Ok(targets)` - One or more pages, in fetch order
    /// * `Err(ResolveError::InvalidDescriptor)` - Bad slug or unusable URL
    /// * `Err(ResolveError::UnknownCity)` - The city is not in the table
    pub fn resolve(&self, descriptor: &SourceDescriptor) -> Result<Vec<FetchTarget>, ResolveError> {
        let target = match descriptor {
            SourceDescriptor::Explore { .. } => {
                FetchTarget::new(self.explore_url(), PageShape::Listing)
            }
            SourceDescriptor::CustomSlug { slug, .. } => {
                let slug = slug.trim();
                if !is_valid_slug(slug) {
                    return Err(ResolveError::InvalidDescriptor(format!(
                        "slug '{}' is empty or contains characters outside [A-Za-z0-9_-]",
                        slug
                    )));
                }
                FetchTarget::new(self.page_url(slug)?, PageShape::Single)
            }
            SourceDescriptor::City { city, .. } => {
                let slug = self
                    .cities
                    .slug_for(city)
                    .ok_or_else(|| ResolveError::UnknownCity(city.clone()))?;
                FetchTarget::new(self.page_url(slug)?, PageShape::Listing)
            }
            SourceDescriptor::Generic { url, shape } => {
                let url = normalize_url(url).map_err(|e| {
                    ResolveError::InvalidDescriptor(format!("url '{}': {}", url, e))
                })?;
                FetchTarget::new(url, *shape)
            }
        };

        tracing::debug!("Resolved {} to {} ({:?})", descriptor, target.url, target.shape);
        Ok(vec![target])
    }

    fn explore_url(&self) -> Url {
        let mut url = self.base_url.clone();
        let path = format!(
            "{}{}",
            self.base_url.path().trim_end_matches('/'),
            self.explore_path
        );
        url.set_path(&path);
        url
    }

    fn page_url(&self, slug: &str) -> Result<Url, ResolveError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ResolveError::InvalidDescriptor(format!(
                    "base URL {} cannot take a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push(slug);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CityEntry;

    fn resolver() -> SourceResolver {
        SourceResolver::from_config(&SourceConfig::default()).unwrap()
    }

    fn single(resolver: &SourceResolver, descriptor: &SourceDescriptor) -> FetchTarget {
        let mut targets = resolver.resolve(descriptor).unwrap();
        assert_eq!(targets.len(), 1);
        targets.remove(0)
    }

    #[test]
    fn test_explore_resolves_to_listing() {
        let target = single(&resolver(), &SourceDescriptor::explore(vec!["tech".into()]));
        assert_eq!(target.url.as_str(), "https://lu.ma/explore");
        assert_eq!(target.shape, PageShape::Listing);
    }

    #[test]
    fn test_slug_resolves_to_single() {
        let target = single(&resolver(), &SourceDescriptor::custom_slug("abc123"));
        assert_eq!(target.url.as_str(), "https://lu.ma/abc123");
        assert_eq!(target.shape, PageShape::Single);
    }

    #[test]
    fn test_invalid_slugs() {
        let resolver = resolver();
        for slug in ["", "   ", "a/b", "../etc", "has space", "emoji🎉"] {
            let result = resolver.resolve(&SourceDescriptor::custom_slug(slug));
            assert!(
                matches!(result, Err(ResolveError::InvalidDescriptor(_))),
                "slug {:?} should be rejected",
                slug
            );
        }
    }

    #[test]
    fn test_city_resolution_is_normalized() {
        let resolver = resolver();
        let a = single(&resolver, &SourceDescriptor::city("New Delhi"));
        let b = single(&resolver, &SourceDescriptor::city("  new   DELHI "));
        assert_eq!(a, b);
        assert_eq!(a.url.as_str(), "https://lu.ma/delhi");
        assert_eq!(a.shape, PageShape::Listing);
    }

    #[test]
    fn test_unknown_city() {
        let result = resolver().resolve(&SourceDescriptor::city("unknownplace"));
        assert_eq!(
            result,
            Err(ResolveError::UnknownCity("unknownplace".to_string()))
        );
    }

    #[test]
    fn test_generic_bypasses_resolution() {
        let descriptor = SourceDescriptor::generic("https://lu.ma/xyz/?utm_source=a", PageShape::Listing);
        let target = single(&resolver(), &descriptor);
        assert_eq!(target.url.as_str(), "https://lu.ma/xyz");
        assert_eq!(target.shape, PageShape::Listing);
    }

    #[test]
    fn test_generic_rejects_non_http() {
        let result = resolver().resolve(&SourceDescriptor::generic("ftp://lu.ma/x", PageShape::Single));
        assert!(matches!(result, Err(ResolveError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = resolver();
        let descriptors = [
            SourceDescriptor::explore(vec![]),
            SourceDescriptor::custom_slug("web3-night"),
            SourceDescriptor::city("Bangalore"),
        ];
        for descriptor in &descriptors {
            assert_eq!(resolver.resolve(descriptor), resolver.resolve(descriptor));
        }
    }

    #[test]
    fn test_custom_base_and_cities() {
        let config = SourceConfig {
            base_url: "http://127.0.0.1:9000/".to_string(),
            explore_path: "/discover".to_string(),
            cities: vec![CityEntry {
                name: "Goa".to_string(),
                slug: "goa".to_string(),
                aliases: vec![],
            }],
        };
        let resolver = SourceResolver::from_config(&config).unwrap();

        let explore = single(&resolver, &SourceDescriptor::explore(vec![]));
        assert_eq!(explore.url.as_str(), "http://127.0.0.1:9000/discover");

        let city = single(&resolver, &SourceDescriptor::city("goa"));
        assert_eq!(city.url.as_str(), "http://127.0.0.1:9000/goa");
    }
}
