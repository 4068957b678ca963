//! Default security-policy headers.
//!
//! The dispatcher attaches a `content-security-policy` header to HTML-typed
//! responses that do not carry one, keyed by the request URL. Embedders
//! pick the policy per server; the built-in default keeps local development
//! permissive and everything else locked to `'self'`.

use std::fmt;
use std::sync::Arc;

use url::{Host, Url};

type PolicyFn = Arc<dyn Fn(&Url) -> Option<String> + Send + Sync>;

/// The content-security-policy applied by a dispatcher.
#[derive(Clone, Default)]
pub enum CspPolicy {
    /// Never attach the header.
    Disabled,
    /// The built-in policy: relaxed for loopback hosts, `'self'` otherwise.
    #[default]
    Default,
    /// A custom policy function; `None` skips the header for that URL.
    Custom(PolicyFn),
}

impl CspPolicy {
    /// A custom policy from a closure over the request URL.
    pub fn custom(policy: impl Fn(&Url) -> Option<String> + Send + Sync + 'static) -> Self {
        CspPolicy::Custom(Arc::new(policy))
    }

    pub(crate) fn policy_for(&self, url: &Url) -> Option<String> {
        match self {
            CspPolicy::Disabled => None,
            CspPolicy::Default => Some(default_policy(url)),
            CspPolicy::Custom(policy) => policy(url),
        }
    }
}

impl fmt::Debug for CspPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CspPolicy::Disabled => f.write_str("Disabled"),
            CspPolicy::Default => f.write_str("Default"),
            CspPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// The built-in policy for `url`.
///
/// Loopback hosts get a relaxed policy scoped to their own origin so local
/// development tools (eval-based bundlers, inline scripts) keep working;
/// every other host gets `default-src 'self'`.
#[must_use]
pub fn default_policy(url: &Url) -> String {
    if is_loopback(url) {
        let origin = url.origin().ascii_serialization();
        format!("default-src {origin} 'unsafe-eval' 'unsafe-inline'; form-action {origin}")
    } else {
        "default-src 'self'".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn loopback_hosts_get_the_relaxed_policy() {
        for target in [
            "http://localhost:8080/page",
            "http://127.0.0.1/",
            "http://[::1]/app",
        ] {
            let policy = default_policy(&url(target));
            assert!(policy.contains("'unsafe-eval'"), "{target}: {policy}");
            assert!(policy.contains("form-action"), "{target}: {policy}");
        }
        assert!(
            default_policy(&url("http://localhost:8080/"))
                .contains("http://localhost:8080")
        );
    }

    #[test]
    fn public_hosts_get_self() {
        assert_eq!(
            default_policy(&url("https://example.com/")),
            "default-src 'self'"
        );
        assert_eq!(
            default_policy(&url("http://10.0.0.1/")),
            "default-src 'self'"
        );
    }

    #[test]
    fn policy_modes() {
        let target = url("http://localhost/");
        assert!(CspPolicy::Disabled.policy_for(&target).is_none());
        assert!(CspPolicy::Default.policy_for(&target).is_some());

        let custom = CspPolicy::custom(|url| {
            (url.path() != "/open").then(|| "default-src 'none'".to_string())
        });
        assert_eq!(
            custom.policy_for(&target).as_deref(),
            Some("default-src 'none'")
        );
        assert!(custom.policy_for(&url("http://localhost/open")).is_none());
    }
}
