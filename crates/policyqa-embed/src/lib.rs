//! Sentence embedders.
//!
//! [`BertEmbedder`] runs a local BERT-family sentence model (e.g.
//! all-MiniLM-L6-v2) with candle: mean pooling over unmasked tokens, then L2
//! normalisation. [`HashEmbedder`] is a deterministic stand-in for tests and
//! offline runs.

mod device;
mod pool;
mod tokenize;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use policyqa_core::config::{fake_embeddings_from_env, EmbeddingSettings};
use policyqa_core::error::{Error, Result};
use policyqa_core::traits::Embedder;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::{tokenize_batch, EncodedBatch};

pub const DEFAULT_MODEL_DIR: &str = "models/all-MiniLM-L6-v2";

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl BertEmbedder {
    /// Load `config.json`, `tokenizer.json` and `model.safetensors` (or
    /// `pytorch_model.bin`) from `model_dir`.
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        Self::load_inner(model_dir, max_len).map_err(Error::embedding)
    }

    fn load_inner(model_dir: &Path, max_len: usize) -> anyhow::Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw)?
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        info!(dim, max_len, "embedding model ready");

        Ok(Self { model, tokenizer, device, dim, max_len, pad_id })
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let batch = tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let hidden = self
            .model
            .forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &batch.attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        debug!(n = texts.len(), ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(vectors)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> anyhow::Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let tensors = candle_core::pickle::read_all(&pickle)?;
        return tensors
            .into_iter()
            .map(|(name, t)| Ok((name, t.to_device(device)?)))
            .collect();
    }
    Err(anyhow!("no model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

impl Embedder for BertEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_batch(texts).map_err(Error::embedding)
    }
}

/// Bag-of-words feature hashing into a unit vector.
///
/// Texts sharing words land near each other, which is enough to exercise
/// retrieval without model weights.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        let tokens = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|t| !t.is_empty());
        for (i, token) in tokens.enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Model directory: explicit setting, then `APP_MODEL_DIR` / `MODEL_DIR`, then
/// [`DEFAULT_MODEL_DIR`].
fn resolve_model_dir(configured: Option<PathBuf>) -> Result<PathBuf> {
    let candidates = configured
        .into_iter()
        .chain(["APP_MODEL_DIR", "MODEL_DIR"].iter().filter_map(|k| std::env::var(k).ok().map(PathBuf::from)))
        .chain(std::iter::once(PathBuf::from(DEFAULT_MODEL_DIR)));
    let mut tried = Vec::new();
    for dir in candidates {
        if dir.is_dir() {
            return Ok(dir);
        }
        tried.push(dir.display().to_string());
    }
    Err(Error::Embedding(format!("no embedding model directory found (tried {})", tried.join(", "))))
}

/// Build the embedder selected by `settings`. `model_dir` is the configured
/// directory already resolved against the config base, if any.
pub fn load_embedder(settings: &EmbeddingSettings, model_dir: Option<PathBuf>) -> Result<Box<dyn Embedder>> {
    if settings.use_fake || fake_embeddings_from_env() {
        warn!(dim = settings.fake_dim, "using hash embeddings; retrieval quality is not representative");
        return Ok(Box::new(HashEmbedder::new(settings.fake_dim)));
    }
    let dir = resolve_model_dir(model_dir)?;
    Ok(Box::new(BertEmbedder::load(&dir, settings.max_len)?))
}
