//! Integration tests for the reduction engine's search and acceptance rules
//!
//! Scripted providers pin the similarity of every candidate so the trailing
//! acceptance trace can be checked exactly.

mod common;

use std::sync::Arc;

use common::assertions::{assert_dimensions, assert_quality, assert_same_pixels};
use common::mock_providers::{
    CountingProvider, FailingProvider, GrowingProvider, PER_LEVEL, ScriptedProvider,
};
use common::test_textures::{checkerboard, gradient, noise, solid};
use texture_shrink::embedding::{EmbeddingProvider, ThumbnailProvider};
use texture_shrink::engine::{
    BLEND_STEPS, EVALUATIONS_PER_LEVEL, ReductionBounds, ReductionEngine, reduce,
};
use texture_shrink::error::ShrinkError;

fn thumbnail() -> Arc<dyn EmbeddingProvider> {
    Arc::new(ThumbnailProvider::new(8).unwrap())
}

#[test]
fn test_trailing_acceptance_trace() {
    let provider = Arc::new(ScriptedProvider::per_level(&[0.90, 0.75, 0.55, 0.30]));
    let original = noise(256, 256, 7);

    let result = reduce(provider.clone(), &original, 16, 16, 0.5).unwrap();

    assert_dimensions(&result.buffer, (32, 32));
    assert_eq!((result.data.width, result.data.height), (32, 32));
    assert_quality(result.data.quality, 0.55);
    assert!(result.is_reduced(&original));

    let sizes: Vec<_> = result.levels.iter().map(|l| (l.width, l.height)).collect();
    assert_eq!(sizes, vec![(128, 128), (64, 64), (32, 32), (16, 16)]);
    let committed: Vec<_> = result.levels.iter().map(|l| l.committed).collect();
    assert_eq!(committed, vec![true, true, true, false]);
    assert_quality(result.levels[3].quality, 0.30);

    // one reference embedding plus seven per generated level
    assert_eq!(provider.calls(), 1 + 4 * PER_LEVEL);
}

#[test]
fn test_candidates_are_scored_at_original_resolution() {
    let provider = Arc::new(ScriptedProvider::per_level(&[0.9, 0.1]));
    let original = noise(40, 24, 3);

    reduce(provider.clone(), &original, 2, 2, 0.5).unwrap();

    let sizes = provider.embedded_sizes();
    assert_eq!(sizes.len(), 1 + 2 * PER_LEVEL);
    assert!(sizes.iter().all(|&s| s == (40, 24)));
}

#[test]
fn test_quality_one_does_no_work() {
    let counting = Arc::new(CountingProvider::new(thumbnail()));
    let original = checkerboard(64, 64, 4);

    let result = reduce(counting.clone(), &original, 1, 1, 1.0).unwrap();

    assert!(result.buffer.ptr_eq(&original));
    assert!(!result.is_reduced(&original));
    assert_eq!(result.data.quality, 1.0);
    assert!(result.levels.is_empty());
    assert_eq!(counting.calls(), 0);
}

#[test]
fn test_already_at_minimum_returns_original() {
    let counting = Arc::new(CountingProvider::new(thumbnail()));
    let original = gradient(32, 64);

    let result = reduce(counting.clone(), &original, 32, 1, 0.0).unwrap();

    assert!(result.buffer.ptr_eq(&original));
    assert_eq!(counting.calls(), 0);
}

#[test]
fn test_first_candidate_below_threshold_keeps_original() {
    let provider = Arc::new(ScriptedProvider::per_level(&[0.4]));
    let original = noise(64, 64, 11);

    let result = reduce(provider.clone(), &original, 8, 8, 0.5).unwrap();

    assert!(result.buffer.ptr_eq(&original));
    assert_eq!(result.data.quality, 1.0);
    assert_eq!(result.levels.len(), 1);
    assert!(!result.levels[0].committed);
    assert_eq!(provider.calls(), 1 + PER_LEVEL);
}

#[test]
fn test_min_dimension_is_exclusive() {
    // 64 -> 32 at min 32: the 32x32 candidate is never committed
    let provider = Arc::new(ScriptedProvider::per_level(&[0.99, 0.99]));
    let original = noise(64, 64, 5);

    let result = reduce(provider, &original, 32, 32, 0.0).unwrap();

    assert!(result.buffer.ptr_eq(&original));
    assert_eq!(result.levels.len(), 1);
}

#[test]
fn test_seven_evaluations_per_level() {
    assert_eq!(EVALUATIONS_PER_LEVEL, 1 + BLEND_STEPS.len());
    assert_eq!(EVALUATIONS_PER_LEVEL, PER_LEVEL);

    let counting = Arc::new(CountingProvider::new(thumbnail()));
    let original = gradient(64, 64);

    let result = reduce(counting.clone(), &original, 4, 4, 0.0).unwrap();

    assert!(!result.levels.is_empty());
    assert_eq!(counting.calls(), 1 + result.candidate_evaluations());
}

#[test]
fn test_levels_halve_with_floor() {
    let provider = Arc::new(ScriptedProvider::per_level(&[0.9; 8]));
    let original = noise(33, 17, 9);

    let result = reduce(provider, &original, 1, 1, 0.5).unwrap();

    let mut expected = (33u32, 17u32);
    for level in &result.levels {
        expected = (expected.0 / 2, expected.1 / 2);
        assert_eq!((level.width, level.height), expected);
    }
    // 16x8, 8x4, 4x2, 2x1: the 2x1 level fails the height bound
    assert_eq!(result.levels.len(), 4);
    assert_dimensions(&result.buffer, (4, 2));
}

#[test]
fn test_monotonic_shrink_with_local_provider() {
    let original = checkerboard(64, 48, 8);
    let result = reduce(thumbnail(), &original, 1, 1, 0.0).unwrap();

    assert!(result.is_reduced(&original));
    assert!(result.buffer.width() < original.width());
    assert!(result.buffer.height() < original.height());
    assert!(result.data.quality > 0.0 && result.data.quality <= 1.0);
    for pair in result.levels.windows(2) {
        assert!(pair[1].width < pair[0].width);
    }
}

#[test]
fn test_tie_break_keeps_earlier_ratio() {
    // base 0.6, blends 0.1..1.0 score 0.8, 0.8, 0.8, 0.7, 0.8, 0.8
    let mut scores = vec![0.6, 0.8, 0.8, 0.8, 0.7, 0.8, 0.8];
    scores.extend([0.0; PER_LEVEL]);
    let provider = Arc::new(ScriptedProvider::from_scores(scores));
    let original = noise(32, 32, 21);

    let result = reduce(provider, &original, 4, 4, 0.5).unwrap();

    assert_eq!(result.levels[0].blend, Some(BLEND_STEPS[0]));
    assert_quality(result.data.quality, 0.8);

    let base = original.sharpen_filter(1).unwrap().resize(16, 16).unwrap();
    let expected = base.blend(&base.detail_filter(1).unwrap(), 0.1).unwrap();
    assert_same_pixels(&result.buffer, &expected);
}

#[test]
fn test_unblended_base_wins_ties() {
    let provider = Arc::new(ScriptedProvider::per_level(&[0.9, 0.0]));
    let original = noise(32, 32, 2);

    let result = reduce(provider, &original, 4, 4, 0.5).unwrap();

    assert_eq!(result.levels[0].blend, None);
    let expected = original.sharpen_filter(1).unwrap().resize(16, 16).unwrap();
    assert_same_pixels(&result.buffer, &expected);
}

#[test]
fn test_flat_texture_reduces_to_minimum() {
    let original = solid(128, 128, [40, 80, 160, 255]);
    let result = reduce(thumbnail(), &original, 16, 16, 0.99).unwrap();

    assert_dimensions(&result.buffer, (32, 32));
    assert_eq!(result.data.quality, 1.0);
    assert!(result.buffer.pixels().chunks_exact(4).all(|p| p == [40, 80, 160, 255]));
}

#[test]
fn test_embedding_failure_aborts_reduction() {
    let original = noise(64, 64, 4);

    match reduce(Arc::new(FailingProvider::always()), &original, 8, 8, 0.1) {
        Err(ShrinkError::EmbeddingFailure { provider, .. }) => assert_eq!(provider, "failing"),
        other => panic!("expected EmbeddingFailure, got {:?}", other.map(|r| r.data)),
    }

    // a failure after several successful levels is not masked by a partial result
    let late = FailingProvider::new(1 + 2 * PER_LEVEL + 3);
    assert!(reduce(Arc::new(late), &original, 1, 1, 0.0).is_err());
}

#[test]
fn test_changing_embedding_length_is_rejected() {
    let original = noise(32, 32, 8);
    match reduce(Arc::new(GrowingProvider::new()), &original, 4, 4, 0.1) {
        Err(ShrinkError::EmbeddingFailure { reason, .. }) => {
            assert!(reason.contains("length"), "{}", reason)
        }
        other => panic!("expected EmbeddingFailure, got {:?}", other.map(|r| r.data)),
    }
}

#[test]
fn test_invalid_bounds_rejected_before_embedding() {
    let counting = Arc::new(CountingProvider::new(thumbnail()));
    let engine = ReductionEngine::new(counting.clone());
    let original = gradient(16, 16);

    assert!(matches!(
        engine.reduce(&original, ReductionBounds::new(4, 4, 1.5)),
        Err(ShrinkError::Validation { .. })
    ));
    assert!(matches!(
        engine.reduce(&original, ReductionBounds::new(0, 4, 0.5)),
        Err(ShrinkError::Validation { .. })
    ));
    assert_eq!(counting.calls(), 0);
}

#[test]
fn test_original_embedding_is_memoized_on_the_buffer() {
    let counting = Arc::new(CountingProvider::new(thumbnail()));
    let engine = ReductionEngine::new(counting.clone());
    let original = gradient(32, 32);
    let bounds = ReductionBounds::square(8, 0.0);

    let first = engine.reduce(&original, bounds).unwrap();
    let after_first = counting.calls();
    assert!(original.cached_embedding().is_some());

    let second = engine.reduce(&original, bounds).unwrap();
    assert_eq!(first.data, second.data);
    // second call reuses the original's embedding
    assert_eq!(counting.calls() - after_first, second.candidate_evaluations());
}
