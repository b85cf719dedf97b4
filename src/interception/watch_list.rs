// src/interception/watch_list.rs
//! Monitored host patterns
//!
//! Decides which requests are candidates for redirect evaluation. Only
//! plain `http` and `https` URLs whose host matches a watched pattern are
//! handed to the engine; everything else passes through untouched.

use url::Url;

/// Watched host patterns
pub struct WatchList {
    /// Host patterns, exact (`reddit.com`) or wildcard (`*.reddit.com`)
    patterns: Vec<String>,
}

impl WatchList {
    /// Create a watch list from host patterns
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Watch list covering the Reddit hostnames
    pub fn with_defaults() -> Self {
        Self::new(vec![
            "reddit.com".to_string(),
            "*.reddit.com".to_string(),
            "redd.it".to_string(),
        ])
    }

    /// True when `url` is a candidate for redirect evaluation
    pub fn matches(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }
        match url.host_str() {
            Some(host) => self.matches_host(host),
            None => false,
        }
    }

    /// True when `host` matches any watched pattern. A wildcard pattern
    /// matches the bare suffix and any subdomain of it, anchored at a dot
    /// so `notreddit.com` never matches `*.reddit.com`.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.patterns.iter().any(|pattern| {
            if let Some(suffix) = pattern.strip_prefix("*.") {
                host == suffix || host.ends_with(&format!(".{}", suffix))
            } else {
                host == *pattern
            }
        })
    }
}

impl Default for WatchList {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_cover_reddit_hosts() {
        let list = WatchList::with_defaults();

        assert!(list.matches_host("reddit.com"));
        assert!(list.matches_host("www.reddit.com"));
        assert!(list.matches_host("old.reddit.com"));
        assert!(list.matches_host("redd.it"));
    }

    #[test]
    fn test_lookalike_hosts_do_not_match() {
        let list = WatchList::with_defaults();

        assert!(!list.matches_host("notreddit.com"));
        assert!(!list.matches_host("reddit.com.evil.example"));
        assert!(!list.matches_host("redlib.perennialte.ch"));
        // Only the bare short-link host is watched, not its subdomains.
        assert!(!list.matches_host("i.redd.it"));
    }

    #[test]
    fn test_host_match_ignores_case() {
        let list = WatchList::with_defaults();
        assert!(list.matches_host("WWW.Reddit.COM"));
    }

    #[test]
    fn test_matches_requires_http_scheme() {
        let list = WatchList::with_defaults();

        let https = Url::parse("https://www.reddit.com/r/rust").unwrap();
        let http = Url::parse("http://reddit.com/").unwrap();
        let ftp = Url::parse("ftp://reddit.com/").unwrap();

        assert!(list.matches(&https));
        assert!(list.matches(&http));
        assert!(!list.matches(&ftp));
    }

    #[test]
    fn test_wildcard_matches_bare_suffix() {
        let list = WatchList::new(vec!["*.example.com".to_string()]);

        assert!(list.matches_host("example.com"));
        assert!(list.matches_host("api.example.com"));
        assert!(!list.matches_host("badexample.com"));
    }
}
