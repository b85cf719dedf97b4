// src/engine/policy.rs
//! Redirect decision policy
//!
//! `decide` is a pure function from a settings snapshot and a candidate URL
//! to a verdict. It holds no state and never returns an error: anything
//! malformed or ambiguous yields `NoAction`, so the worst failure mode is a
//! request passing through untouched. Multi-hop loop prevention lives in
//! the loop guard; the policy only refuses the single-hop case of
//! rewriting traffic already addressed to the destination.

use url::Url;

use crate::settings::{RedirectMode, Settings};

/// Outcome of a redirect decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Rewrite the request to `target`
    Redirect { target: String },

    /// Leave the request alone
    NoAction,
}

impl Verdict {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Verdict::Redirect { .. })
    }
}

/// Decide what to do with `url` under `settings`.
///
/// Fail-safe by construction: disabled settings, a URL that does not
/// parse, a base URL without a host, an unrecognized mode, or a candidate
/// already on the destination host all yield [`Verdict::NoAction`].
pub fn decide(settings: &Settings, url: &str) -> Verdict {
    if !settings.enabled {
        return Verdict::NoAction;
    }

    let request = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return Verdict::NoAction,
    };
    let request_host = match request.host_str() {
        Some(host) => host,
        None => return Verdict::NoAction,
    };

    let base = match Url::parse(settings.base_url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return Verdict::NoAction,
    };
    let base_host = match base.host_str() {
        Some(host) => host,
        None => return Verdict::NoAction,
    };

    // Self-redirect guard. The parser lowercases registered domains, so
    // this comparison is case-insensitive.
    if request_host == base_host {
        return Verdict::NoAction;
    }

    match settings.mode {
        RedirectMode::PathPreserve => {
            let target = path_preserve_target(&base, &request);
            // The target is assembled by concatenation; refuse to issue a
            // redirect to anything that does not survive a re-parse.
            if Url::parse(&target).is_err() {
                return Verdict::NoAction;
            }
            Verdict::Redirect { target }
        }
        RedirectMode::PassUrl => Verdict::Redirect {
            target: pass_url_target(&base, url),
        },
        RedirectMode::Unrecognized => Verdict::NoAction,
    }
}

/// Graft the request's path, query, and fragment onto the base URL.
/// The base contributes its origin plus its own path with at most one
/// trailing slash removed, so a base configured with or without the
/// slash produces the same target.
fn path_preserve_target(base: &Url, request: &Url) -> String {
    let origin = base.origin().ascii_serialization();
    let base_path = base.path().strip_suffix('/').unwrap_or(base.path());

    let mut target = format!("{}{}{}", origin, base_path, request.path());
    if let Some(query) = request.query() {
        if !query.is_empty() {
            target.push('?');
            target.push_str(query);
        }
    }
    if let Some(fragment) = request.fragment() {
        if !fragment.is_empty() {
            target.push('#');
            target.push_str(fragment);
        }
    }
    target
}

/// Set the base URL's `url` query parameter to the full original URL,
/// overwriting any prior value in place and leaving other parameters
/// untouched.
fn pass_url_target(base: &Url, original: &str) -> String {
    let mut target = base.clone();
    let pairs: Vec<(String, String)> = target
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut editor = target.query_pairs_mut();
        editor.clear();
        let mut replaced = false;
        for (key, value) in &pairs {
            if key == "url" {
                if !replaced {
                    editor.append_pair("url", original);
                    replaced = true;
                }
            } else {
                editor.append_pair(key, value);
            }
        }
        if !replaced {
            editor.append_pair("url", original);
        }
    }

    target.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn settings_with(base_url: &str, mode: RedirectMode) -> Settings {
        Settings {
            enabled: true,
            base_url: base_url.to_string(),
            mode,
        }
    }

    #[test]
    fn test_disabled_never_redirects() {
        let settings = Settings {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(
            decide(&settings, "https://www.reddit.com/r/rust"),
            Verdict::NoAction
        );
    }

    #[test]
    fn test_self_host_never_redirects() {
        for mode in [RedirectMode::PathPreserve, RedirectMode::PassUrl] {
            let settings = settings_with("https://redlib.example", mode);
            assert_eq!(
                decide(&settings, "https://redlib.example/r/rust"),
                Verdict::NoAction
            );
        }
    }

    #[test]
    fn test_self_host_comparison_ignores_case() {
        let settings = settings_with("https://redlib.example", RedirectMode::PathPreserve);
        assert_eq!(
            decide(&settings, "https://REDLIB.EXAMPLE/r/rust"),
            Verdict::NoAction
        );
    }

    #[test]
    fn test_path_preserve_target() {
        let settings = settings_with("https://redlib.example/", RedirectMode::PathPreserve);
        assert_eq!(
            decide(&settings, "https://reddit.com/r/test?x=1#frag"),
            Verdict::Redirect {
                target: "https://redlib.example/r/test?x=1#frag".to_string()
            }
        );
    }

    #[test]
    fn test_path_preserve_trailing_slash_is_idempotent() {
        let url = "https://www.reddit.com/r/rust/comments/abc?sort=top#c1";
        let with_slash = settings_with("https://redlib.example/", RedirectMode::PathPreserve);
        let without_slash = settings_with("https://redlib.example", RedirectMode::PathPreserve);
        assert_eq!(decide(&with_slash, url), decide(&without_slash, url));
    }

    #[test]
    fn test_path_preserve_keeps_base_subpath() {
        let settings = settings_with("https://farside.link/redlib/", RedirectMode::PathPreserve);
        assert_eq!(
            decide(&settings, "https://reddit.com/r/test"),
            Verdict::Redirect {
                target: "https://farside.link/redlib/r/test".to_string()
            }
        );
    }

    #[test]
    fn test_path_preserve_bare_origin_candidate() {
        let settings = settings_with("https://redlib.example", RedirectMode::PathPreserve);
        assert_eq!(
            decide(&settings, "https://reddit.com"),
            Verdict::Redirect {
                target: "https://redlib.example/".to_string()
            }
        );
    }

    #[test]
    fn test_pass_url_carries_exact_original() {
        let original = "https://reddit.com/r/test?x=1#frag";
        let settings = settings_with("https://redlib.example/", RedirectMode::PassUrl);
        let verdict = decide(&settings, original);

        let target = match verdict {
            Verdict::Redirect { target } => target,
            Verdict::NoAction => panic!("expected a redirect"),
        };
        let parsed = Url::parse(&target).unwrap();
        assert_eq!(parsed.host_str(), Some("redlib.example"));

        let carried: Vec<String> = parsed
            .query_pairs()
            .filter(|(key, _)| key == "url")
            .map(|(_, value)| value.into_owned())
            .collect();
        assert_eq!(carried, vec![original.to_string()]);
    }

    #[test]
    fn test_pass_url_overwrites_prior_value_in_place() {
        let settings = settings_with(
            "https://redlib.example/?url=stale&theme=dark",
            RedirectMode::PassUrl,
        );
        let verdict = decide(&settings, "https://reddit.com/r/test");

        let target = match verdict {
            Verdict::Redirect { target } => target,
            Verdict::NoAction => panic!("expected a redirect"),
        };
        let parsed = Url::parse(&target).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("url".to_string(), "https://reddit.com/r/test".to_string()),
                ("theme".to_string(), "dark".to_string()),
            ]
        );
    }

    #[test]
    fn test_unrecognized_mode_fails_safe() {
        let settings = settings_with("https://redlib.example", RedirectMode::Unrecognized);
        assert_eq!(
            decide(&settings, "https://reddit.com/r/test"),
            Verdict::NoAction
        );
    }

    #[test]
    fn test_malformed_candidate_is_no_action() {
        let settings = Settings::default();
        assert_eq!(decide(&settings, "not a url"), Verdict::NoAction);
        assert_eq!(decide(&settings, ""), Verdict::NoAction);
    }

    #[test]
    fn test_malformed_base_is_no_action() {
        for base in ["", "   ", "not a url", "/relative/path"] {
            let settings = settings_with(base, RedirectMode::PathPreserve);
            assert_eq!(
                decide(&settings, "https://reddit.com/r/test"),
                Verdict::NoAction,
                "base {:?} should fail safe",
                base
            );
        }
    }

    #[test]
    fn test_hostless_candidate_is_no_action() {
        let settings = Settings::default();
        assert_eq!(
            decide(&settings, "data:text/plain,hello"),
            Verdict::NoAction
        );
    }

    proptest! {
        #[test]
        fn prop_disabled_is_always_no_action(path in "[a-z0-9/]{0,40}") {
            let settings = Settings {
                enabled: false,
                ..Default::default()
            };
            let url = format!("https://www.reddit.com/{}", path);
            prop_assert_eq!(decide(&settings, &url), Verdict::NoAction);
        }

        #[test]
        fn prop_redirect_lands_on_base_host(sub in "[a-z]{1,12}") {
            let settings = Settings::default();
            let url = format!("https://www.reddit.com/r/{}", sub);
            match decide(&settings, &url) {
                Verdict::Redirect { target } => {
                    let parsed = Url::parse(&target).unwrap();
                    prop_assert_eq!(parsed.host_str(), Some("redlib.perennialte.ch"));
                }
                Verdict::NoAction => prop_assert!(false, "expected a redirect for {}", url),
            }
        }

        #[test]
        fn prop_pass_url_round_trips_original(sub in "[a-z]{1,12}", q in "[a-z]{1,8}") {
            let settings = Settings {
                mode: RedirectMode::PassUrl,
                ..Default::default()
            };
            let url = format!("https://old.reddit.com/r/{}?q={}", sub, q);
            match decide(&settings, &url) {
                Verdict::Redirect { target } => {
                    let parsed = Url::parse(&target).unwrap();
                    let carried = parsed
                        .query_pairs()
                        .find(|(key, _)| key == "url")
                        .map(|(_, value)| value.into_owned());
                    prop_assert_eq!(carried, Some(url));
                }
                Verdict::NoAction => prop_assert!(false, "expected a redirect"),
            }
        }
    }
}
