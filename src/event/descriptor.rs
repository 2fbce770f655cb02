use crate::event::Origin;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a fetched page holds one event or a collection of events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageShape {
    Listing,
    Single,
}

impl Default for PageShape {
    fn default() -> Self {
        Self::Single
    }
}

/// Caller intent naming which listing or event to fetch
///
/// Serialized as `{"type": ..., "params": {...}}`, the shape batch requests use:
///
/// ```
/// use luma_events::SourceDescriptor;
///
/// let json = r#"{"type": "city", "params": {"city": "New Delhi", "keywords": ["ai"]}}"#;
/// let descriptor: SourceDescriptor = serde_json::from_str(json).unwrap();
/// assert_eq!(descriptor, SourceDescriptor::city("New Delhi").with_keywords(vec!["ai".into()]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum SourceDescriptor {
    /// The curated explore feed, optionally filtered by keywords
    Explore {
        #[serde(default)]
        keywords: Vec<String>,
    },

    /// A single named event
    #[serde(rename = "custom", alias = "custom_slug")]
    CustomSlug {
        slug: String,
        #[serde(default)]
        keywords: Vec<String>,
    },

    /// A city listing page
    City {
        city: String,
        #[serde(default)]
        keywords: Vec<String>,
    },

    /// An already-resolved URL with an explicit page shape
    #[serde(rename = "url", alias = "generic")]
    Generic {
        url: String,
        #[serde(default)]
        shape: PageShape,
    },
}

impl SourceDescriptor {
    pub fn explore(keywords: Vec<String>) -> Self {
        Self::Explore { keywords }
    }

    pub fn custom_slug(slug: impl Into<String>) -> Self {
        Self::CustomSlug {
            slug: slug.into(),
            keywords: Vec::new(),
        }
    }

    pub fn city(city: impl Into<String>) -> Self {
        Self::City {
            city: city.into(),
            keywords: Vec::new(),
        }
    }

    pub fn generic(url: impl Into<String>, shape: PageShape) -> Self {
        Self::Generic {
            url: url.into(),
            shape,
        }
    }

    /// Replaces the keyword filter; generic targets carry no filter
    pub fn with_keywords(mut self, new_keywords: Vec<String>) -> Self {
        match &mut self {
            Self::Explore { keywords }
            | Self::CustomSlug { keywords, .. }
            | Self::City { keywords, .. } => *keywords = new_keywords,
            Self::Generic { .. } => {}
        }
        self
    }

    /// Keyword filter applied after extraction (empty means keep everything)
    pub fn keywords(&self) -> &[String] {
        match self {
            Self::Explore { keywords }
            | Self::CustomSlug { keywords, .. }
            | Self::City { keywords, .. } => keywords,
            Self::Generic { .. } => &[],
        }
    }

    /// The origin tag stamped on records this descriptor produces
    pub fn origin(&self) -> Origin {
        match self {
            Self::Explore { .. } => Origin::Explore,
            Self::CustomSlug { .. } => Origin::CustomSlug,
            Self::City { .. } => Origin::City,
            Self::Generic { .. } => Origin::BatchItem,
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explore { .. } => write!(f, "explore"),
            Self::CustomSlug { slug, .. } => write!(f, "slug '{}'", slug),
            Self::City { city, .. } => write!(f, "city '{}'", city),
            Self::Generic { url, shape } => write!(f, "{:?} page {}", shape, url),
        }
    }
}

/// A batch of descriptors as submitted by a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub sources: Vec<SourceDescriptor>,

    /// Keywords applied to every source that has none of its own
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl BatchRequest {
    pub fn into_descriptors(self) -> Vec<SourceDescriptor> {
        let global = self.keywords;
        self.sources
            .into_iter()
            .map(|descriptor| {
                if descriptor.keywords().is_empty() && !global.is_empty() {
                    descriptor.with_keywords(global.clone())
                } else {
                    descriptor
                }
            })
            .collect()
    }
}
