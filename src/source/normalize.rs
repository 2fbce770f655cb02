use crate::UrlError;
use url::Url;

/// Query parameters that never identify an event
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source", "tk"];

/// Canonical form of an event or listing URL, used as the dedup key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject anything but http/https
/// 2. Lowercase the host and strip a leading `www.`
/// 3. Collapse empty and dot segments, drop the trailing slash (root stays `/`)
/// 4. Drop the fragment
/// 5. Drop tracking parameters (`utm_*` and a fixed list), sort the rest
///
/// # Examples
///
/// ```
/// use luma_events::source::normalize_url;
///
/// let url = normalize_url("https://WWW.LU.MA/abc123/?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://lu.ma/abc123");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)?;
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort();

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Resolves `href` against `base` and normalizes the result
pub fn resolve_href(base: &Url, href: &str) -> Result<Url, UrlError> {
    let joined = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_url(joined.as_str())
}

fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_scheme() {
        let result = normalize_url("http://127.0.0.1:8080/event").unwrap();
        assert_eq!(result.as_str(), "http://127.0.0.1:8080/event");
    }

    #[test]
    fn test_remove_www_and_lowercase_host() {
        let result = normalize_url("https://WWW.Lu.Ma/Event-Slug").unwrap();
        assert_eq!(result.as_str(), "https://lu.ma/Event-Slug");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://lu.ma/delhi/").unwrap();
        assert_eq!(result.as_str(), "https://lu.ma/delhi");
    }

    #[test]
    fn test_root_path() {
        let result = normalize_url("https://lu.ma").unwrap();
        assert_eq!(result.as_str(), "https://lu.ma/");
    }

    #[test]
    fn test_remove_fragment_and_tracking() {
        let result =
            normalize_url("https://lu.ma/abc?utm_campaign=x&tk=123&b=2&a=1#details").unwrap();
        assert_eq!(result.as_str(), "https://lu.ma/abc?a=1&b=2");
    }

    #[test]
    fn test_empty_query_removed() {
        let result = normalize_url("https://lu.ma/abc?utm_source=feed").unwrap();
        assert_eq!(result.as_str(), "https://lu.ma/abc");
    }

    #[test]
    fn test_collapse_duplicate_slashes() {
        let result = normalize_url("https://lu.ma//a//b").unwrap();
        assert_eq!(result.as_str(), "https://lu.ma/a/b");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            normalize_url("mailto:host@lu.ma"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(normalize_url("not a url"), Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_resolve_relative_href() {
        let base = Url::parse("https://lu.ma/explore").unwrap();
        let result = resolve_href(&base, "/abc123?utm_medium=card").unwrap();
        assert_eq!(result.as_str(), "https://lu.ma/abc123");
    }
}
