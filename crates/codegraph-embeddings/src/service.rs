//! The dual-embedding service, grounded on
//! `api/services/dual_embedding_service.py`'s `DualEmbeddingService` and
//! `zen-embeddings`'s fastembed spike for the loading/encoding idiom.

use std::sync::{mpsc, Mutex};
use std::time::Duration;

use codegraph_core::enums::EmbeddingDomain;
use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use tracing::{error, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::error::EmbeddingError;
use crate::mock::mock_embedding;

/// Expected dimensionality of both domains, per the data-model invariant.
pub const DIMENSION: usize = 768;

/// RAM cap (resident set size) beyond which the code model refuses to
/// load.
const RAM_CAP_MB: f64 = 2500.0;

/// One embedding call's result: one or both domains, depending on what was
/// requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingResult {
    pub text: Option<Vec<f32>>,
    pub code: Option<Vec<f32>>,
}

/// Configuration for [`EmbeddingService::new`].
#[derive(Debug, Clone)]
pub struct EmbeddingServiceConfig {
    pub text_model: EmbeddingModel,
    pub code_model: EmbeddingModel,
    pub mock_mode: bool,
    pub single_timeout: Duration,
    pub batch_timeout: Duration,
    pub cache_dir: std::path::PathBuf,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            text_model: EmbeddingModel::NomicEmbedTextV15,
            code_model: EmbeddingModel::JinaEmbeddingsV2BaseCode,
            mock_mode: false,
            single_timeout: Duration::from_secs(10),
            batch_timeout: Duration::from_secs(60),
            cache_dir: dirs::home_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("."))
                .join(".codegraph")
                .join("cache")
                .join("fastembed"),
        }
    }
}

impl EmbeddingServiceConfig {
    /// Build a config from `codegraph-config::EmbeddingsConfig`'s plain
    /// model-name strings, keeping `fastembed`'s model enum out of callers
    /// that only carry configuration, not an embedding service.
    ///
    /// # Errors
    /// Returns [`EmbeddingError::InitFailed`] if either name doesn't match
    /// a known model.
    pub fn from_names(
        text_model: &str,
        code_model: &str,
        mock_mode: bool,
        cache_dir: std::path::PathBuf,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            text_model: model_by_name(text_model)?,
            code_model: model_by_name(code_model)?,
            mock_mode,
            cache_dir,
            ..Self::default()
        })
    }
}

fn model_by_name(name: &str) -> Result<EmbeddingModel, EmbeddingError> {
    match name {
        "NomicEmbedTextV15" => Ok(EmbeddingModel::NomicEmbedTextV15),
        "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "JinaEmbeddingsV2BaseCode" => Ok(EmbeddingModel::JinaEmbeddingsV2BaseCode),
        other => Err(EmbeddingError::InitFailed(format!("unknown embedding model name: {other}"))),
    }
}

/// Loads the text-domain and code-domain models lazily (double-checked
/// locking), serves single/batch requests under a shared circuit breaker,
/// and supports a deterministic mock mode for tests and CI.
pub struct EmbeddingService {
    config: EmbeddingServiceConfig,
    text_model: Mutex<Option<TextEmbedding>>,
    code_model: Mutex<Option<TextEmbedding>>,
    breaker: CircuitBreaker,
}

impl EmbeddingService {
    #[must_use]
    pub fn new(config: EmbeddingServiceConfig) -> Self {
        if config.mock_mode {
            warn!("embedding service running in MOCK MODE — no model will be loaded");
        }
        Self {
            config,
            text_model: Mutex::new(None),
            code_model: Mutex::new(None),
            breaker: CircuitBreaker::default_config(),
        }
    }

    #[must_use]
    pub fn mock() -> Self {
        Self::new(EmbeddingServiceConfig {
            mock_mode: true,
            ..EmbeddingServiceConfig::default()
        })
    }

    fn ensure_text_model(&self) -> Result<(), EmbeddingError> {
        if self.config.mock_mode {
            return Ok(());
        }
        let mut guard = self.text_model.lock().expect("text model mutex poisoned");
        if guard.is_some() {
            return Ok(());
        }
        if !self.breaker.can_execute() {
            return Err(EmbeddingError::CircuitOpen(self.breaker.state_str()));
        }
        info!(model = ?self.config.text_model, "loading text-domain embedding model");
        let opts = TextInitOptions::new(self.config.text_model.clone())
            .with_cache_dir(self.config.cache_dir.clone())
            .with_show_download_progress(false);
        match TextEmbedding::try_new(opts) {
            Ok(model) => {
                self.breaker.record_success();
                *guard = Some(model);
                Ok(())
            }
            Err(e) => {
                self.breaker.record_failure();
                error!(error = %e, "failed to load text-domain model");
                Err(EmbeddingError::InitFailed(e.to_string()))
            }
        }
    }

    fn ensure_code_model(&self) -> Result<(), EmbeddingError> {
        if self.config.mock_mode {
            return Ok(());
        }
        let mut guard = self.code_model.lock().expect("code model mutex poisoned");
        if guard.is_some() {
            return Ok(());
        }
        if !self.breaker.can_execute() {
            return Err(EmbeddingError::CircuitOpen(self.breaker.state_str()));
        }

        let used_mb = resident_set_size_mb();
        if used_mb > RAM_CAP_MB {
            warn!(used_mb, cap_mb = RAM_CAP_MB, "refusing to load code model, RAM budget exceeded");
            return Err(EmbeddingError::RamBudgetExceeded { used_mb, cap_mb: RAM_CAP_MB });
        }

        info!(model = ?self.config.code_model, "loading code-domain embedding model");
        let opts = TextInitOptions::new(self.config.code_model.clone())
            .with_cache_dir(self.config.cache_dir.clone())
            .with_show_download_progress(false);
        match TextEmbedding::try_new(opts) {
            Ok(model) => {
                self.breaker.record_success();
                *guard = Some(model);
                Ok(())
            }
            Err(e) => {
                self.breaker.record_failure();
                error!(error = %e, "failed to load code-domain model");
                Err(EmbeddingError::InitFailed(e.to_string()))
            }
        }
    }

    /// Load both models up front so the first indexing request doesn't pay
    /// the cold-start cost on the first indexing request.
    pub fn preload_models(&self) -> Result<(), EmbeddingError> {
        if self.config.mock_mode {
            info!("skipping model preload — mock mode");
            return Ok(());
        }
        self.ensure_text_model()?;
        self.ensure_code_model()
    }

    /// Runs the text-domain model over `text`, bounded by
    /// `config.single_timeout`. Checks out the model from its mutex for
    /// the duration of the call so a timed-out encode can't be left
    /// racing a later call against the same model.
    fn encode_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if !self.breaker.can_execute() {
            return Err(EmbeddingError::CircuitOpen(self.breaker.state_str()));
        }
        let model = self.text_model.lock().expect("text model mutex poisoned").take().expect("model just ensured loaded");
        match encode_one(model, text.to_string(), self.config.single_timeout) {
            Ok((model, vector)) => {
                *self.text_model.lock().expect("text model mutex poisoned") = Some(model);
                self.breaker.record_success();
                Ok(vector)
            }
            Err(err) => {
                self.breaker.record_failure();
                error!(error = %err, "text-domain encode failed");
                Err(err)
            }
        }
    }

    /// As [`Self::encode_text`], for the code-domain model.
    fn encode_code(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if !self.breaker.can_execute() {
            return Err(EmbeddingError::CircuitOpen(self.breaker.state_str()));
        }
        let model = self.code_model.lock().expect("code model mutex poisoned").take().expect("model just ensured loaded");
        match encode_one(model, text.to_string(), self.config.single_timeout) {
            Ok((model, vector)) => {
                *self.code_model.lock().expect("code model mutex poisoned") = Some(model);
                self.breaker.record_success();
                Ok(vector)
            }
            Err(err) => {
                self.breaker.record_failure();
                error!(error = %err, "code-domain encode failed");
                Err(err)
            }
        }
    }

    /// As [`Self::encode_text`], batched and bounded by
    /// `config.batch_timeout`.
    fn encode_text_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if !self.breaker.can_execute() {
            return Err(EmbeddingError::CircuitOpen(self.breaker.state_str()));
        }
        let model = self.text_model.lock().expect("text model mutex poisoned").take().expect("model just ensured loaded");
        let owned: Vec<String> = texts.iter().map(|t| (*t).to_string()).collect();
        match encode_batch(model, owned, self.config.batch_timeout) {
            Ok((model, vectors)) => {
                *self.text_model.lock().expect("text model mutex poisoned") = Some(model);
                self.breaker.record_success();
                Ok(vectors)
            }
            Err(err) => {
                self.breaker.record_failure();
                error!(error = %err, "text-domain batch encode failed");
                Err(err)
            }
        }
    }

    /// As [`Self::encode_text_batch`], for the code-domain model.
    fn encode_code_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if !self.breaker.can_execute() {
            return Err(EmbeddingError::CircuitOpen(self.breaker.state_str()));
        }
        let model = self.code_model.lock().expect("code model mutex poisoned").take().expect("model just ensured loaded");
        let owned: Vec<String> = texts.iter().map(|t| (*t).to_string()).collect();
        match encode_batch(model, owned, self.config.batch_timeout) {
            Ok((model, vectors)) => {
                *self.code_model.lock().expect("code model mutex poisoned") = Some(model);
                self.breaker.record_success();
                Ok(vectors)
            }
            Err(err) => {
                self.breaker.record_failure();
                error!(error = %err, "code-domain batch encode failed");
                Err(err)
            }
        }
    }

    /// Generate embedding(s) for `text` in the requested domain. Empty
    /// input yields zero-vectors for every domain requested rather than
    /// invoking a model.
    pub fn generate_embedding(&self, text: &str, domain: EmbeddingDomain) -> Result<EmbeddingResult, EmbeddingError> {
        if text.trim().is_empty() {
            let zero = vec![0.0_f32; DIMENSION];
            return Ok(EmbeddingResult {
                text: matches!(domain, EmbeddingDomain::Text | EmbeddingDomain::Hybrid).then(|| zero.clone()),
                code: matches!(domain, EmbeddingDomain::Code | EmbeddingDomain::Hybrid).then_some(zero),
            });
        }

        if self.config.mock_mode {
            return Ok(EmbeddingResult {
                text: matches!(domain, EmbeddingDomain::Text | EmbeddingDomain::Hybrid)
                    .then(|| mock_embedding(&format!("{text}_text"))),
                code: matches!(domain, EmbeddingDomain::Code | EmbeddingDomain::Hybrid)
                    .then(|| mock_embedding(&format!("{text}_code"))),
            });
        }

        let mut result = EmbeddingResult::default();
        if matches!(domain, EmbeddingDomain::Text | EmbeddingDomain::Hybrid) {
            self.ensure_text_model()?;
            result.text = Some(self.encode_text(text)?);
        }
        if matches!(domain, EmbeddingDomain::Code | EmbeddingDomain::Hybrid) {
            self.ensure_code_model()?;
            result.code = Some(self.encode_code(text)?);
        }
        Ok(result)
    }

    /// Legacy single-domain entry point retained for backward compat with
    /// callers that only want the text-domain vector.
    pub fn generate_embedding_legacy(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self
            .generate_embedding(text, EmbeddingDomain::Text)?
            .text
            .unwrap_or_else(|| vec![0.0; DIMENSION]))
    }

    /// Batch-encode `texts` in one forward pass per domain. Empty entries
    /// keep their position but get a zero-vector rather than being dropped
    /// from (and so misaligning) the result.
    pub fn generate_embeddings_batch(
        &self,
        texts: &[&str],
        domain: EmbeddingDomain,
    ) -> Result<Vec<EmbeddingResult>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let non_empty: Vec<(usize, &str)> =
            texts.iter().enumerate().filter(|(_, t)| !t.trim().is_empty()).map(|(i, t)| (i, *t)).collect();

        let mut results = vec![EmbeddingResult::default(); texts.len()];
        let zero = || vec![0.0_f32; DIMENSION];
        for (i, _) in texts.iter().enumerate().filter(|(_, t)| t.trim().is_empty()) {
            if matches!(domain, EmbeddingDomain::Text | EmbeddingDomain::Hybrid) {
                results[i].text = Some(zero());
            }
            if matches!(domain, EmbeddingDomain::Code | EmbeddingDomain::Hybrid) {
                results[i].code = Some(zero());
            }
        }

        if non_empty.is_empty() {
            return Ok(results);
        }

        if self.config.mock_mode {
            for (i, t) in &non_empty {
                if matches!(domain, EmbeddingDomain::Text | EmbeddingDomain::Hybrid) {
                    results[*i].text = Some(mock_embedding(&format!("{t}_text")));
                }
                if matches!(domain, EmbeddingDomain::Code | EmbeddingDomain::Hybrid) {
                    results[*i].code = Some(mock_embedding(&format!("{t}_code")));
                }
            }
            return Ok(results);
        }

        let batch_texts: Vec<&str> = non_empty.iter().map(|(_, t)| *t).collect();

        if matches!(domain, EmbeddingDomain::Text | EmbeddingDomain::Hybrid) {
            self.ensure_text_model()?;
            let vectors = self.encode_text_batch(&batch_texts)?;
            for ((i, _), vector) in non_empty.iter().zip(vectors) {
                results[*i].text = Some(vector);
            }
        }
        if matches!(domain, EmbeddingDomain::Code | EmbeddingDomain::Hybrid) {
            self.ensure_code_model()?;
            let vectors = self.encode_code_batch(&batch_texts)?;
            for ((i, _), vector) in non_empty.iter().zip(vectors) {
                results[*i].code = Some(vector);
            }
        }

        Ok(results)
    }

    /// Cosine similarity clipped to `[0, 1]`.
    #[must_use]
    pub fn compute_similarity(v1: &[f32], v2: &[f32]) -> f32 {
        if v1.len() != v2.len() || v1.is_empty() {
            return 0.0;
        }
        let dot: f32 = v1.iter().zip(v2).map(|(a, b)| a * b).sum();
        let norm1: f32 = v1.iter().map(|v| v * v).sum::<f32>().sqrt();
        let norm2: f32 = v2.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm1 == 0.0 || norm2 == 0.0 {
            return 0.0;
        }
        (dot / (norm1 * norm2)).clamp(0.0, 1.0)
    }

    /// Runs a best-effort memory cleanup pass. fastembed's ONNX runtime has
    /// no GPU cache to clear on CPU; this exists as the hook
    /// `force_memory_cleanup()` names, kept for parity with a runtime that
    /// does carry GPU state.
    pub fn force_memory_cleanup(&self) {
        tracing::debug!("force_memory_cleanup: no-op on CPU-only inference");
    }
}

/// Runs `f` on a dedicated OS thread and waits up to `timeout` for its
/// result. `f` keeps running past the deadline if it misses it — there is
/// no way to preempt CPU-bound ONNX inference — but the caller gets back
/// control at `timeout` rather than blocking on it indefinitely.
fn run_timeout<T: Send + 'static>(timeout: Duration, f: impl FnOnce() -> T + Send + 'static) -> Result<T, EmbeddingError> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(timeout).map_err(|_| EmbeddingError::Timeout(timeout))
}

/// Single-text encode bounded by `timeout`. Takes and returns the model by
/// value so it can cross the worker thread without borrowing from the
/// caller's mutex guard.
fn encode_one(model: TextEmbedding, text: String, timeout: Duration) -> Result<(TextEmbedding, Vec<f32>), EmbeddingError> {
    let (model, result) = run_timeout(timeout, move || {
        let mut model = model;
        let result = model
            .embed(vec![text.as_str()], None)
            .map_err(|e| e.to_string())
            .and_then(|mut out| out.pop().ok_or_else(|| "model returned no embeddings".to_string()));
        (model, result)
    })?;
    let vector = result.map_err(EmbeddingError::EmbedFailed)?;
    Ok((model, vector))
}

/// Batch encode bounded by `timeout`.
fn encode_batch(model: TextEmbedding, texts: Vec<String>, timeout: Duration) -> Result<(TextEmbedding, Vec<Vec<f32>>), EmbeddingError> {
    let (model, result) = run_timeout(timeout, move || {
        let mut model = model;
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let result = model.embed(refs, None).map_err(|e| e.to_string());
        (model, result)
    })?;
    let vectors = result.map_err(EmbeddingError::EmbedFailed)?;
    Ok((model, vectors))
}

/// Resident set size of the current process, in megabytes. Used only to
/// gate code-model loading against `RAM_CAP_MB`; never a hard OS limit.
fn resident_set_size_mb() -> f64 {
    use sysinfo::{Pid, System};
    let pid = Pid::from_u32(std::process::id());
    let mut system = System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).map_or(0.0, |p| p.memory() as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_zero_vectors() {
        let service = EmbeddingService::mock();
        let result = service.generate_embedding("   ", EmbeddingDomain::Hybrid).unwrap();
        assert_eq!(result.text.unwrap().len(), DIMENSION);
        assert_eq!(result.code.unwrap().len(), DIMENSION);
    }

    #[test]
    fn mock_mode_hybrid_returns_both_domains() {
        let service = EmbeddingService::mock();
        let result = service.generate_embedding("def foo(): pass", EmbeddingDomain::Hybrid).unwrap();
        assert!(result.text.is_some());
        assert!(result.code.is_some());
        assert_ne!(result.text, result.code, "text and code domains seed different hashes");
    }

    #[test]
    fn mock_mode_text_only_leaves_code_none() {
        let service = EmbeddingService::mock();
        let result = service.generate_embedding("hello", EmbeddingDomain::Text).unwrap();
        assert!(result.text.is_some());
        assert!(result.code.is_none());
    }

    #[test]
    fn batch_preserves_position_for_empty_entries() {
        let service = EmbeddingService::mock();
        let texts = ["alpha", "", "beta"];
        let results = service.generate_embeddings_batch(&texts, EmbeddingDomain::Text).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[1].text.as_ref().unwrap(), &vec![0.0_f32; DIMENSION]);
        assert_ne!(results[0].text, results[2].text);
    }

    #[test]
    fn similarity_is_clamped_and_symmetric() {
        let a = vec![1.0_f32, 0.0, 0.0];
        let b = vec![1.0_f32, 0.0, 0.0];
        assert!((EmbeddingService::compute_similarity(&a, &b) - 1.0).abs() < 1e-6);
        let c = vec![0.0_f32, 1.0, 0.0];
        assert!((EmbeddingService::compute_similarity(&a, &c)).abs() < 1e-6);
    }

    #[test]
    fn legacy_entry_point_returns_text_domain_only() {
        let service = EmbeddingService::mock();
        let v = service.generate_embedding_legacy("hello").unwrap();
        assert_eq!(v.len(), DIMENSION);
    }

    #[test]
    fn from_names_accepts_known_models() {
        let config =
            EmbeddingServiceConfig::from_names("NomicEmbedTextV15", "JinaEmbeddingsV2BaseCode", true, "/tmp/cache".into())
                .unwrap();
        assert!(config.mock_mode);
    }

    #[test]
    fn from_names_rejects_unknown_model() {
        let err = EmbeddingServiceConfig::from_names("not-a-real-model", "JinaEmbeddingsV2BaseCode", true, "/tmp".into())
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::InitFailed(_)));
    }
}
