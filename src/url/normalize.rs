use crate::url::NormalizedUrl;
use crate::UrlError;
use url::Url;

/// Scheme prefixed onto submissions that carry none
const DEFAULT_SCHEME_PREFIX: &str = "https://";

/// Normalizes a raw URL submission into its canonical crawl-target form
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Prefix `https://` unless an `http://` or `https://` scheme is present
/// 3. Collapse runs of repeated `/` that follow a non-colon character
/// 4. Append a trailing `/` unless the path already ends with one, the last
///    path segment looks like a file (`.html`, `.pdf`, ...) or a query string
///    is present
/// 5. Parse the result; reject it if there is no usable host
/// 6. Insert `www.` when the host is a bare two-label domain
///
/// The function is pure and idempotent: normalizing an already normalized URL
/// returns it unchanged.
///
/// # Arguments
///
/// * `raw` - The submitted URL string
///
/// # Returns
///
/// * `Ok(NormalizedUrl)` - Normalized URL
/// * `Err(UrlError)` - The input cannot be turned into a URL with a host
///
/// # Examples
///
/// ```
/// use polite_crawl::url::normalize;
///
/// let url = normalize("example.com").unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/");
/// ```
pub fn normalize(raw: &str) -> Result<NormalizedUrl, UrlError> {
    // Step 1: Trim
    let trimmed = raw.trim();

    // Step 2: Default scheme
    let with_scheme = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME_PREFIX, trimmed)
    };

    // Step 3: Collapse duplicated separators
    let collapsed = collapse_slashes(&with_scheme);

    // Step 4: Trailing separator
    let candidate = with_trailing_slash(collapsed);

    // Step 5: Parse
    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse {
        input: raw.to_string(),
        message: e.to_string(),
    })?;

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| UrlError::MissingHost(raw.to_string()))?
        .to_string();

    // Step 6: www. for bare domains
    if is_bare_domain(&host) {
        url.set_host(Some(&format!("www.{}", host)))
            .map_err(|e| UrlError::Parse {
                input: raw.to_string(),
                message: e.to_string(),
            })?;
    }

    Ok(NormalizedUrl(url.to_string()))
}

/// Checks for an explicit `http://` or `https://` prefix, ignoring case
fn has_http_scheme(url: &str) -> bool {
    let starts_with = |prefix: &str| {
        url.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    starts_with("http://") || starts_with("https://")
}

/// Collapses repeated `/` into one
///
/// A run that follows `:` (the scheme separator) or starts the string keeps two
/// slashes so `https://` survives.
fn collapse_slashes(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut prev: Option<char> = None;
    let mut run_len = 0usize;
    let mut run_limit = 1usize;

    for c in url.chars() {
        if c == '/' {
            if prev == Some('/') {
                run_len += 1;
            } else {
                run_len = 1;
                run_limit = match prev {
                    None | Some(':') => 2,
                    Some(_) => 1,
                };
            }
            if run_len > run_limit {
                continue;
            }
        }
        out.push(c);
        prev = Some(c);
    }

    out
}

/// Appends `/` to the path when it has no trailing separator, no file-like
/// last segment and the URL has no query string
fn with_trailing_slash(url: String) -> String {
    let split_at = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    if url[split_at..].starts_with('?') {
        return url;
    }

    let (head, fragment) = url.split_at(split_at);
    if head.ends_with('/') {
        return url;
    }

    // Skip past the scheme so the authority is not mistaken for a path
    let after_scheme = head.find("://").map(|i| i + 3).unwrap_or(0);
    let last_segment = match head[after_scheme..].find('/') {
        Some(path_start) => head[after_scheme + path_start..]
            .rsplit('/')
            .next()
            .unwrap_or(""),
        None => "",
    };

    if has_extension(last_segment) {
        return url;
    }

    format!("{}/{}", head, fragment)
}

/// Checks if a path segment ends with a 2-4 letter extension
fn has_extension(segment: &str) -> bool {
    match segment.rsplit_once('.') {
        Some((_, ext)) => {
            (2..=4).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

/// Checks if a host is a two-label domain without a `www.` prefix
fn is_bare_domain(host: &str) -> bool {
    !host.starts_with("www.") && host.matches('.').count() == 1
}
