//! Routing state: the matched and unmatched parts of a request path.

use thiserror::Error;
use url::Url;

/// Captured path parameters, shared structurally between route copies.
pub type Params = im::HashMap<String, String>;

/// Errors raised by [`Route::capture`].
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RouteError {
    /// The prefix was empty after trimming trailing slashes.
    #[error("captured prefix must not be empty")]
    EmptyPrefix,

    /// The current path does not start with the prefix.
    #[error("path {path:?} does not start with prefix {prefix:?}")]
    PrefixMismatch {
        /// The route's current path.
        path: String,
        /// The prefix that failed to match.
        prefix: String,
    },

    /// The prefix ends in the middle of a path segment.
    #[error("prefix {prefix:?} does not end on a segment boundary of {path:?}")]
    SplitSegment {
        /// The route's current path.
        path: String,
        /// The offending prefix.
        prefix: String,
    },
}

/// One capture step: the prefix that was consumed and the parameters that
/// step contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    /// The consumed prefix, with its leading slash.
    pub path: String,
    /// Parameters captured by this step only.
    pub params: Params,
}

/// The portion of a request path not yet matched, plus everything already
/// captured.
///
/// `base_path() + path()` always reconstructs the path the route was
/// created with. Trailing slashes are normalized away at construction, so
/// `/users/1/` and `/users/1` describe the same route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    path: String,
    base_path: String,
    params: Params,
    captured: im::Vector<Captured>,
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

impl Route {
    /// A fresh route for `path`, nothing captured yet.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: normalize(&path.into()),
            base_path: String::new(),
            params: Params::new(),
            captured: im::Vector::new(),
        }
    }

    /// A fresh route for a request URL's path.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        Self::new(url.path())
    }

    /// The not-yet-matched remainder of the path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The already-matched prefix.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// All parameters captured so far.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// One parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Every capture step, in order.
    #[must_use]
    pub fn captured(&self) -> &im::Vector<Captured> {
        &self.captured
    }

    /// The full path the route was created with.
    #[must_use]
    pub fn full_path(&self) -> String {
        format!("{}{}", self.base_path, self.path)
    }

    /// Consume `prefix` from the front of the path, returning the extended
    /// copy.
    ///
    /// The prefix is normalized first: trailing slashes are trimmed and a
    /// leading slash added if missing. It must then be non-empty, the
    /// current path must start with it, and it must end on a segment
    /// boundary.
    pub fn capture(&self, prefix: &str, params: Params) -> Result<Route, RouteError> {
        let trimmed = prefix.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(RouteError::EmptyPrefix);
        }
        let prefix = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        if !self.path.starts_with(&prefix) {
            return Err(RouteError::PrefixMismatch {
                path: self.path.clone(),
                prefix,
            });
        }
        if self.path.len() > prefix.len() && self.path.as_bytes()[prefix.len()] != b'/' {
            return Err(RouteError::SplitSegment {
                path: self.path.clone(),
                prefix,
            });
        }
        Ok(self.advance(&prefix, params))
    }

    /// Consume a prefix the pattern matcher has already validated; unlike
    /// [`capture`](Self::capture) it accepts the bare-root prefix.
    pub(crate) fn advance(&self, prefix: &str, step: Params) -> Route {
        let mut params = self.params.clone();
        params.extend(step.clone());
        let mut captured = self.captured.clone();
        captured.push_back(Captured {
            path: prefix.to_string(),
            params: step,
        });
        Route {
            path: self.path[prefix.len()..].to_string(),
            base_path: format!("{}{}", self.base_path, prefix),
            params,
            captured,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn capture_moves_prefix_to_base() {
        let route = Route::new("/users/42/posts");
        let captured = route.capture("/users/42", step(&[("id", "42")])).unwrap();
        assert_eq!(captured.path(), "/posts");
        assert_eq!(captured.base_path(), "/users/42");
        assert_eq!(captured.param("id"), Some("42"));
        assert_eq!(captured.full_path(), "/users/42/posts");
        // The original is untouched.
        assert_eq!(route.path(), "/users/42/posts");
        assert!(route.params().is_empty());
    }

    #[test]
    fn capture_to_the_end_leaves_empty_path() {
        let route = Route::new("/health");
        let captured = route.capture("/health", Params::new()).unwrap();
        assert_eq!(captured.path(), "");
        assert_eq!(captured.full_path(), "/health");
    }

    #[test]
    fn capture_normalizes_prefix() {
        let route = Route::new("/a/b");
        let captured = route.capture("a/", Params::new()).unwrap();
        assert_eq!(captured.base_path(), "/a");
        assert_eq!(captured.path(), "/b");
    }

    #[test]
    fn capture_rejects_empty_prefix() {
        let route = Route::new("/a");
        assert_eq!(
            route.capture("///", Params::new()),
            Err(RouteError::EmptyPrefix)
        );
    }

    #[test]
    fn capture_rejects_mismatch_and_split_segments() {
        let route = Route::new("/users/42");
        assert!(matches!(
            route.capture("/posts", Params::new()),
            Err(RouteError::PrefixMismatch { .. })
        ));
        assert!(matches!(
            route.capture("/use", Params::new()),
            Err(RouteError::SplitSegment { .. })
        ));
    }

    #[test]
    fn chained_captures_accumulate() {
        let route = Route::new("/api/users/7/profile");
        let second = route
            .capture("/api", Params::new())
            .unwrap()
            .capture("/users/7", step(&[("id", "7")]))
            .unwrap();
        assert_eq!(second.base_path(), "/api/users/7");
        assert_eq!(second.path(), "/profile");
        assert_eq!(second.param("id"), Some("7"));
        assert_eq!(second.captured().len(), 2);
        assert_eq!(second.captured()[0].path, "/api");
        assert!(second.captured()[0].params.is_empty());
        assert_eq!(second.captured()[1].params, step(&[("id", "7")]));
    }

    #[test]
    fn trailing_slashes_normalized_at_construction() {
        assert_eq!(Route::new("/users/1/").path(), "/users/1");
        assert_eq!(Route::new("/").path(), "/");
        assert_eq!(Route::new("").path(), "");
    }
}
