//! Origin extraction and allow-list matching.

use url::Url;

/// Origin of a URL: `scheme://host[:port]` lower-cased, with default ports
/// omitted. Non-hierarchical URLs (`data:`, `blob:`) yield their scheme
/// source (`data:`).
pub fn origin_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if url.cannot_be_a_base() {
        return Some(format!("{}:", url.scheme()));
    }
    let host = url.host_str()?.to_ascii_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}

/// Canonical form of an allow-list entry for equality checks.
pub fn normalize_entry(entry: &str) -> String {
    let trimmed = entry.trim();
    if trimmed.starts_with('\'') {
        // Keywords such as 'self' are case-insensitive and never carry paths.
        return trimmed.to_ascii_lowercase();
    }
    trimmed.trim_end_matches('/').to_ascii_lowercase()
}

/// One parsed allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    /// `'self'`, `'none'`, ... Never matches a foreign origin.
    Keyword,
    /// `data:`, `https:`.
    Scheme(String),
    /// `https://cdn.example.com`, `https://*.cdn.example.com`, `cdn.example.com`.
    Host {
        scheme: Option<String>,
        host: String,
        wildcard: bool,
        port: Option<String>,
    },
}

fn parse_source(entry: &str) -> Option<Source> {
    let entry = normalize_entry(entry);
    if entry.starts_with('\'') {
        return Some(Source::Keyword);
    }
    if let Some(scheme) = entry.strip_suffix(':') {
        if !scheme.is_empty() && !scheme.contains(['/', '.']) {
            return Some(Source::Scheme(scheme.to_string()));
        }
    }

    let (scheme, rest) = match entry.split_once("://") {
        Some((s, r)) => (Some(s.to_string()), r),
        None => (None, entry.as_str()),
    };
    let authority = rest.split('/').next().unwrap_or_default();
    let (host, port) = match split_port(authority) {
        (h, Some(p)) if p.chars().all(|c| c.is_ascii_digit() || c == '*') => {
            (h, Some(p.to_string()))
        }
        _ => (authority, None),
    };
    let (host, wildcard) = match host.strip_prefix("*.") {
        Some(base) => (base, true),
        None => (host, false),
    };
    if host.is_empty() {
        return None;
    }
    Some(Source::Host {
        scheme,
        host: host.to_string(),
        wildcard,
        port,
    })
}

/// Split `host[:port]`. A bracketed IPv6 host keeps its colons; only a
/// colon after the closing `]` starts the port.
fn split_port(authority: &str) -> (&str, Option<&str>) {
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => {
                let (host, tail) = authority.split_at(end + 1);
                (host, tail.strip_prefix(':'))
            }
            None => (authority, None),
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    }
}

/// Split an origin into `(scheme, host, port)`.
fn split_origin(origin: &str) -> Option<(&str, &str, Option<&str>)> {
    let (scheme, authority) = origin.split_once("://")?;
    let (host, port) = split_port(authority);
    Some((scheme, host, port))
}

impl Source {
    fn matches(&self, origin: &str) -> bool {
        match self {
            Source::Keyword => false,
            Source::Scheme(scheme) => origin
                .split_once(':')
                .is_some_and(|(s, _)| s == scheme),
            Source::Host {
                scheme,
                host,
                wildcard,
                port,
            } => {
                let Some((o_scheme, o_host, o_port)) = split_origin(origin) else {
                    return false;
                };
                let scheme_ok = match scheme {
                    Some(s) => s == o_scheme,
                    None => matches!(o_scheme, "http" | "https"),
                };
                let port_ok = match (port.as_deref(), o_port) {
                    (Some("*"), _) => true,
                    (Some(p), Some(op)) => p == op,
                    (Some(_), None) | (None, Some(_)) => false,
                    (None, None) => true,
                };
                let host_ok = if *wildcard {
                    // Exactly one extra label: img.cdn.example.com, not a.b.cdn.example.com.
                    o_host
                        .strip_suffix(host.as_str())
                        .and_then(|prefix| prefix.strip_suffix('.'))
                        .is_some_and(|label| !label.is_empty() && !label.contains('.'))
                } else {
                    o_host == host
                };
                scheme_ok && port_ok && host_ok
            }
        }
    }
}

// ---------------------------------------------------------------------------
// AllowList
// ---------------------------------------------------------------------------

/// The `img-src` allow-list as read from the policy store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: Vec<String>,
}

impl AllowList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Raw entries in store order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `origin` is permitted by an exact, wildcard, or scheme entry.
    pub fn allows(&self, origin: &str) -> bool {
        let origin = origin.to_ascii_lowercase();
        self.entries
            .iter()
            .filter_map(|e| parse_source(e))
            .any(|s| s.matches(&origin))
    }

    /// Whether `entry` is literally present (after normalization).
    pub fn contains_entry(&self, entry: &str) -> bool {
        let wanted = normalize_entry(entry);
        self.entries.iter().any(|e| normalize_entry(e) == wanted)
    }
}
