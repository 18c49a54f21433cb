use std::path::PathBuf;

use proptest::prelude::*;

use seamcut_common::error::SeamcutError;
use seamcut_edit_model::segment::Segment;
use seamcut_processing_core::keyframes::KeyframeIndex;
use seamcut_processing_core::split::SplitPointResolver;

proptest! {
    #[test]
    fn resolved_splits_respect_fade_margins_or_fail(
        keyframes in prop::collection::vec(0.0f64..300.0, 1..80),
        start in 0.0f64..250.0,
        len in 0.0f64..120.0,
        fade in 0.1f64..3.0,
    ) {
        let index = KeyframeIndex::new(keyframes);
        let segment = Segment {
            index: 1,
            video: PathBuf::from("/media/a.mkv"),
            audio: PathBuf::from("/media/a.mkv"),
            start,
            end: start + len,
        };

        match SplitPointResolver::new(fade).resolve(&segment, &index) {
            Ok(resolved) => {
                prop_assert!(resolved.start_split() - start >= fade - 1e-9);
                prop_assert!(segment.end - resolved.end_split() >= fade - 1e-9);
                prop_assert!(resolved.start_split() < resolved.end_split());
                prop_assert!(index.timestamps().contains(&resolved.start_split()));
                prop_assert!(index.timestamps().contains(&resolved.end_split()));
            }
            Err(err) => {
                let is_length_error =
                    matches!(err, SeamcutError::InsufficientSegmentLength { .. });
                prop_assert!(is_length_error);
            }
        }
    }

    #[test]
    fn lookups_agree_with_linear_scan(
        keyframes in prop::collection::vec(0.0f64..100.0, 0..50),
        t in -5.0f64..105.0,
    ) {
        let index = KeyframeIndex::new(keyframes);
        let after = index.timestamps().iter().copied().find(|&k| k > t);
        let before = index.timestamps().iter().rev().copied().find(|&k| k < t);
        prop_assert_eq!(index.first_after(t), after);
        prop_assert_eq!(index.last_before(t), before);
    }
}
