use policyqa_core::config::EmbeddingSettings;
use policyqa_core::traits::Embedder;
use policyqa_embed::{load_embedder, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = HashEmbedder::new(384);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_many(&texts).expect("embed_many");
    let (v1, v2) = (&embs[0], &embs[1]);

    assert_eq!(v1.len(), 384);
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn shared_words_score_higher_than_unrelated_text() {
    let embedder = HashEmbedder::new(512);
    let query = embedder.embed_one("How many PTO days do employees get?").unwrap();
    let related = embedder.embed_one("Employees get 20 PTO days per year.").unwrap();
    let unrelated = embedder.embed_one("Badges must be visible inside the building.").unwrap();

    assert!(cosine(&query, &related) > cosine(&query, &unrelated));
}

#[test]
fn embed_many_keeps_input_order_and_length() {
    let embedder = HashEmbedder::new(64);
    let texts: Vec<String> = ["alpha", "beta", "gamma"].iter().map(|s| s.to_string()).collect();
    let all = embedder.embed_many(&texts).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1], embedder.embed_one("beta").unwrap());
    assert!(embedder.embed_many(&[]).unwrap().is_empty());
}

#[test]
fn settings_select_hash_embedder_without_model_files() {
    let settings = EmbeddingSettings { use_fake: true, fake_dim: 96, ..EmbeddingSettings::default() };
    let embedder = load_embedder(&settings, None).expect("embedder");
    assert_eq!(embedder.dim(), 96);
    assert_eq!(embedder.embed_one("remote work").unwrap().len(), 96);
}
