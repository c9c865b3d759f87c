//! Property and persistence tests for the vector index.

use kodeks_rag::document::Chunk;
use kodeks_rag::error::RagError;
use kodeks_rag::index::VectorIndex;
use proptest::prelude::*;

const DIM: usize = 16;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

/// Generate a chunk with a normalized embedding.
fn arb_chunk(dim: usize) -> impl Strategy<Value = Chunk> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim))
        .prop_map(|(id, text, embedding)| Chunk { id, text, embedding })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// For any set of embedded chunks, search returns results ordered by
    /// descending cosine similarity, bounded by the fan-out and the index
    /// size.
    #[test]
    fn results_ordered_descending_and_bounded_by_fan_out(
        chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
        query in arb_normalized_embedding(DIM),
        fan_out in 1usize..25,
    ) {
        let chunk_count = chunks.len();
        let index = VectorIndex::build(chunks, DIM, "test-model").unwrap();

        let results = index.search(&query, fan_out);

        prop_assert!(results.len() <= fan_out);
        prop_assert!(results.len() <= chunk_count);

        for window in results.windows(2) {
            prop_assert!(
                window[0].score >= window[1].score,
                "results not in descending order: {} < {}",
                window[0].score,
                window[1].score,
            );
        }
    }

    /// Saving and reloading the artifact preserves search rankings exactly.
    #[test]
    fn artifact_roundtrip_preserves_rankings(
        chunks in proptest::collection::vec(arb_chunk(DIM), 1..10),
        query in arb_normalized_embedding(DIM),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let index = VectorIndex::build(chunks, DIM, "test-model").unwrap();
        index.save(&path).unwrap();
        let reloaded = VectorIndex::load(&path).unwrap();

        let before: Vec<String> =
            index.search(&query, 5).into_iter().map(|r| r.chunk.id).collect();
        let after: Vec<String> =
            reloaded.search(&query, 5).into_iter().map(|r| r.chunk.id).collect();

        prop_assert_eq!(before, after);
    }
}

fn sample_chunks() -> Vec<Chunk> {
    vec![
        Chunk { id: "chunk_0".to_string(), text: "первый".to_string(), embedding: vec![1.0, 0.0] },
        Chunk { id: "chunk_1".to_string(), text: "второй".to_string(), embedding: vec![0.0, 1.0] },
    ]
}

#[test]
fn rebuilding_over_the_same_path_overwrites_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vectordb").join("index.json");

    let first = VectorIndex::build(sample_chunks(), 2, "test-model").unwrap();
    first.save(&path).unwrap();
    let second = VectorIndex::build(sample_chunks(), 2, "test-model").unwrap();
    second.save(&path).unwrap();

    let reloaded = VectorIndex::load(&path).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.embedding_model(), "test-model");

    let probe = [1.0, 0.0];
    let first_ranking: Vec<String> =
        first.search(&probe, 2).into_iter().map(|r| r.chunk.id).collect();
    let reloaded_ranking: Vec<String> =
        reloaded.search(&probe, 2).into_iter().map(|r| r.chunk.id).collect();
    assert_eq!(first_ranking, reloaded_ranking);
}

#[test]
fn artifact_records_model_and_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    VectorIndex::build(sample_chunks(), 2, "paraphrase-multilingual").unwrap().save(&path).unwrap();

    let reloaded = VectorIndex::load(&path).unwrap();
    assert_eq!(reloaded.embedding_model(), "paraphrase-multilingual");
    assert_eq!(reloaded.dimensions(), 2);
}

#[test]
fn corrupt_artifact_fails_with_index_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    std::fs::write(&path, "не json").unwrap();

    let err = VectorIndex::load(&path).unwrap_err();
    assert!(matches!(err, RagError::IndexLoad(_)));
}

#[test]
fn inconsistent_artifact_dimensions_fail_with_index_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    // Handcraft an artifact whose recorded dimensionality does not match
    // its embeddings.
    let artifact = serde_json::json!({
        "embedding_model": "test-model",
        "dimensions": 3,
        "chunks": [{"id": "chunk_0", "text": "текст", "embedding": [1.0, 0.0]}],
    });
    std::fs::write(&path, artifact.to_string()).unwrap();

    let err = VectorIndex::load(&path).unwrap_err();
    assert!(matches!(err, RagError::IndexLoad(_)));
}
