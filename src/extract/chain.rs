//! Ordered fallback chains
//!
//! A [`FieldChain`] is a priority list of [`Strategy`] values for one field.
//! Strategies are tried in order; each yields raw candidates, the chain's
//! cleaner filters them, and the first surviving value wins.

use crate::extract::clean::clean_social_url;
use crate::source::resolve_href;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde_json::Value;
use url::Url;

/// Upper bound on candidates a single strategy offers
const MAX_CANDIDATES: usize = 16;

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Post-processing applied to every candidate before it is accepted
pub type Cleaner = fn(&str) -> Option<String>;

/// The part of a page a chain is evaluated against
pub struct Scope<'a> {
    pub element: ElementRef<'a>,

    /// Visible text, one line per text node
    pub text: String,

    /// JSON-LD `Event` object describing this scope, if any
    pub structured: Option<&'a Value>,

    pub base_url: &'a Url,
}

impl<'a> Scope<'a> {
    pub fn new(element: ElementRef<'a>, structured: Option<&'a Value>, base_url: &'a Url) -> Self {
        Self {
            element,
            text: visible_text(element),
            structured,
            base_url,
        }
    }
}

/// One way of finding a field value
pub enum Strategy {
    /// Text of matching elements
    Text(Selector),
    /// An attribute of matching elements
    Attr(Selector, &'static str),
    /// `href` of matching elements, resolved against the page URL
    Link(Selector),
    /// `href` of matching elements that point at a social host
    SocialLink(Selector),
    /// A path into the JSON-LD object; arrays are flattened along the way
    JsonLd(&'static [&'static str]),
    /// Full regex matches over the scope text
    Pattern(&'static Lazy<Regex>),
    /// First capture group of regex matches over the scope text
    Capture(&'static Lazy<Regex>),
    Custom(fn(&Scope) -> Option<String>),
}

impl Strategy {
    fn candidates(&self, scope: &Scope) -> Vec<String> {
        match self {
            Self::Text(selector) => scope
                .element
                .select(selector)
                .map(element_text)
                .filter(|text| !text.is_empty())
                .take(MAX_CANDIDATES)
                .collect(),
            Self::Attr(selector, attr) => scope
                .element
                .select(selector)
                .filter_map(|el| el.value().attr(attr))
                .map(str::to_string)
                .take(MAX_CANDIDATES)
                .collect(),
            Self::Link(selector) => links(scope.element, scope.base_url, selector)
                .take(MAX_CANDIDATES)
                .collect(),
            Self::SocialLink(selector) => links(scope.element, scope.base_url, selector)
                .filter(|href| clean_social_url(href).is_some())
                .take(MAX_CANDIDATES)
                .collect(),
            Self::JsonLd(path) => scope
                .structured
                .map(|value| json_candidates(value, path))
                .unwrap_or_default(),
            Self::Pattern(regex) => regex
                .find_iter(&scope.text)
                .map(|m| m.as_str().to_string())
                .take(MAX_CANDIDATES)
                .collect(),
            Self::Capture(regex) => regex
                .captures_iter(&scope.text)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .take(MAX_CANDIDATES)
                .collect(),
            Self::Custom(f) => f(scope).into_iter().collect(),
        }
    }
}

/// Priority list of strategies for one field
pub struct FieldChain {
    field: &'static str,
    strategies: Vec<Strategy>,
    cleaner: Cleaner,
}

impl FieldChain {
    pub fn new(field: &'static str, cleaner: Cleaner) -> Self {
        Self {
            field,
            strategies: Vec::new(),
            cleaner,
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn text(self, css: &str) -> Self {
        self.with_selector(css, Strategy::Text)
    }

    pub fn attr(self, css: &str, attr: &'static str) -> Self {
        self.with_selector(css, |selector| Strategy::Attr(selector, attr))
    }

    pub fn link(self, css: &str) -> Self {
        self.with_selector(css, Strategy::Link)
    }

    pub fn social_link(self, css: &str) -> Self {
        self.with_selector(css, Strategy::SocialLink)
    }

    pub fn json_ld(mut self, path: &'static [&'static str]) -> Self {
        self.strategies.push(Strategy::JsonLd(path));
        self
    }

    pub fn pattern(mut self, regex: &'static Lazy<Regex>) -> Self {
        self.strategies.push(Strategy::Pattern(regex));
        self
    }

    pub fn capture(mut self, regex: &'static Lazy<Regex>) -> Self {
        self.strategies.push(Strategy::Capture(regex));
        self
    }

    pub fn custom(mut self, f: fn(&Scope) -> Option<String>) -> Self {
        self.strategies.push(Strategy::Custom(f));
        self
    }

    /// Invalid selectors are logged and left out of the chain
    fn with_selector(mut self, css: &str, make: impl FnOnce(Selector) -> Strategy) -> Self {
        match Selector::parse(css) {
            Ok(selector) => self.strategies.push(make(selector)),
            Err(e) => tracing::error!("Invalid selector '{}' for {}: {:?}", css, self.field, e),
        }
        self
    }

    /// Returns the first cleaned candidate, trying strategies in order
    pub fn evaluate(&self, scope: &Scope) -> Option<String> {
        for (position, strategy) in self.strategies.iter().enumerate() {
            let found = strategy
                .candidates(scope)
                .iter()
                .find_map(|raw| (self.cleaner)(raw.as_str()));

            if let Some(value) = found {
                tracing::trace!("{} found by strategy {}", self.field, position);
                return Some(value);
            }
        }

        tracing::debug!(
            "Fallback chain for {} exhausted on {}",
            self.field,
            scope.base_url
        );
        None
    }
}

/// Text of an element with inner whitespace collapsed
pub fn element_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text under `element`, one line per text node
pub fn visible_text(element: ElementRef) -> String {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map_or(false, |el| HIDDEN_TAGS.contains(&el.name()))
            });
            let text = text.trim();
            (!hidden && !text.is_empty()).then(|| text.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn links<'s>(
    element: ElementRef<'s>,
    base_url: &'s Url,
    selector: &'s Selector,
) -> impl Iterator<Item = String> + 's {
    element
        .select(selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(move |href| resolve_href(base_url, href).ok())
        .map(|url| url.to_string())
}

fn json_candidates(value: &Value, path: &[&str]) -> Vec<String> {
    match (value, path.split_first()) {
        (Value::Array(items), _) => items
            .iter()
            .flat_map(|item| json_candidates(item, path))
            .collect(),
        (Value::String(s), None) => vec![s.clone()],
        (Value::Number(n), None) => vec![n.to_string()],
        (Value::Object(map), Some((key, rest))) => map
            .get(*key)
            .map(|child| json_candidates(child, rest))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
