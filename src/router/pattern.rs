//! Path pattern compilation and matching.

use crate::route::{Params, Route};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path pattern: literal and `:name` segments, optionally
/// followed by a trailing `/*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pattern {
    segments: Vec<Segment>,
    wildcard: bool,
}

impl Pattern {
    /// Compile an exact pattern. Trailing slashes never count; a trailing
    /// `*` segment turns the pattern into a prefix match.
    pub(crate) fn parse(pattern: &str) -> Self {
        let mut segments = Vec::new();
        let mut wildcard = false;
        for part in pattern.split('/').filter(|part| !part.is_empty()) {
            if part == "*" {
                wildcard = true;
                break;
            }
            segments.push(match part.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(part.to_string()),
            });
        }
        Self { segments, wildcard }
    }

    /// Compile a subroute pattern: whatever the registration says, the
    /// trailing slashes-or-nothing are rewritten to `/*`.
    pub(crate) fn subroute(pattern: &str) -> Self {
        let mut compiled = Self::parse(pattern);
        compiled.wildcard = true;
        compiled
    }

    /// Match against the route's unmatched path.
    ///
    /// On a hit, returns the route advanced past the matched prefix with
    /// this pattern's parameters folded in; exact patterns consume the
    /// whole path, wildcard patterns leave the remainder for nested
    /// routers. A miss returns `None` without side effects.
    pub(crate) fn match_route(&self, route: &Route) -> Option<Route> {
        let path = route.path();
        let mut cursor = 0;
        let mut step = Params::new();
        for segment in &self.segments {
            let rest = path[cursor..].strip_prefix('/')?;
            let end = rest.find('/').unwrap_or(rest.len());
            let value = &rest[..end];
            match segment {
                Segment::Literal(literal) => {
                    if value != literal {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if value.is_empty() {
                        return None;
                    }
                    step.insert(name.clone(), value.to_string());
                }
            }
            cursor += 1 + end;
        }
        let remainder = &path[cursor..];
        if self.wildcard {
            // The remainder must start at a segment boundary.
            if !remainder.is_empty() && !remainder.starts_with('/') {
                return None;
            }
            Some(advance(route, &path[..cursor], step))
        } else {
            match remainder {
                "" => Some(advance(route, &path[..cursor], step)),
                // A fully-consumed remainder and a bare "/" describe the
                // same route.
                "/" => Some(advance(route, path, step)),
                _ => None,
            }
        }
    }
}

fn advance(route: &Route, prefix: &str, step: Params) -> Route {
    if prefix.is_empty() && step.is_empty() {
        route.clone()
    } else {
        route.advance(prefix, step)
    }
}
