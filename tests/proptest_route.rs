//! Property-based tests for route capture.
//!
//! Verifies the reconstruction invariant across random paths and split
//! points: after any chain of captures, `base_path + path` equals the
//! original path, `base_path` is exactly the consumed prefix, and capture
//! never panics on well-formed segments.

use proptest::prelude::*;
use trellis::{Params, Route};

/// A path segment: no slashes, no colons, non-empty.
fn segment_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9_.-]{1,8}").expect("valid regex")
}

/// A path of 2..=6 segments plus two capture split points.
fn path_with_splits() -> impl Strategy<Value = (Vec<String>, usize, usize)> {
    prop::collection::vec(segment_strategy(), 2..=6).prop_flat_map(|segments| {
        let len = segments.len();
        (Just(segments), 1..len).prop_flat_map(move |(segments, first)| {
            (Just(segments), Just(first), first..=len)
        })
    })
}

fn join(segments: &[String]) -> String {
    segments
        .iter()
        .map(|segment| format!("/{segment}"))
        .collect()
}

proptest! {
    #[test]
    fn double_capture_round_trips((segments, first, second) in path_with_splits()) {
        let full = join(&segments);
        let p1 = join(&segments[..first]);
        let route = Route::new(&full);

        let once = route.capture(&p1, Params::new()).unwrap();
        prop_assert_eq!(once.base_path(), p1.as_str());
        prop_assert_eq!(once.full_path(), full.clone());

        if second > first {
            let p2 = join(&segments[first..second]);
            let twice = once.capture(&p2, Params::new()).unwrap();
            let consumed = join(&segments[..second]);
            prop_assert_eq!(twice.base_path(), consumed.as_str());
            prop_assert_eq!(twice.path(), &full[consumed.len()..]);
            prop_assert_eq!(twice.full_path(), full);
            prop_assert_eq!(twice.captured().len(), 2);
        }
    }

    #[test]
    fn trailing_slashes_never_change_the_route(segments in prop::collection::vec(segment_strategy(), 1..=5)) {
        let bare = join(&segments);
        let slashed = format!("{bare}/");
        prop_assert_eq!(Route::new(&bare), Route::new(&slashed));
    }

    #[test]
    fn capture_of_a_non_prefix_fails_cleanly(
        (segments, first, _) in path_with_splits(),
        other in segment_strategy(),
    ) {
        let route = Route::new(&join(&segments));
        let mut wrong = segments[..first].to_vec();
        let last = wrong.last_mut().expect("at least one segment");
        if *last == other {
            return Ok(());
        }
        *last = other;
        prop_assert!(route.capture(&join(&wrong), Params::new()).is_err());
    }
}
