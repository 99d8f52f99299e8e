use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use crate::data::model::Record;
use crate::error::ModelUnavailable;
use crate::predict::artifact::{ModelArtifact, Prediction};

// ---------------------------------------------------------------------------
// Initialization state machine
// ---------------------------------------------------------------------------

/// Lifecycle of the model artifact. Loading happens inside the state write
/// lock, so concurrent first callers serialize through a single load; a
/// failed load sticks until an explicit [`PredictionService::reload`].
#[derive(Debug)]
enum ModelState {
    Uninitialized,
    Ready(Arc<ModelArtifact>),
    Failed(String),
}

// ---------------------------------------------------------------------------
// Prediction service
// ---------------------------------------------------------------------------

/// Serves predictions for validated records.
///
/// The artifact is loaded once, on first use. Each prediction is keyed by
/// the record's feature signature and cached for the process lifetime; the
/// cache is bounded by the number of distinct signatures in the dataset, so
/// there is no eviction, but `reload` swaps it out wholesale. Reads share
/// the lock; only a cache miss takes the write lock, briefly.
pub struct PredictionService {
    model_path: PathBuf,
    state: RwLock<ModelState>,
    cache: RwLock<HashMap<String, Prediction>>,
}

impl PredictionService {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            state: RwLock::new(ModelState::Uninitialized),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Build a service around an already-loaded artifact.
    pub fn with_artifact(artifact: ModelArtifact) -> Self {
        Self {
            model_path: PathBuf::new(),
            state: RwLock::new(ModelState::Ready(Arc::new(artifact))),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Predict the risk class for one record.
    ///
    /// Fails closed: if the artifact could not be loaded, every call returns
    /// [`ModelUnavailable`] until a successful [`reload`](Self::reload),
    /// never a default label.
    pub fn predict(&self, record: &Record) -> Result<Prediction, ModelUnavailable> {
        let artifact = self.artifact()?;
        let signature = artifact.signature(record)?;

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(&signature) {
                return Ok(hit.clone());
            }
        }

        let prediction = artifact.score(record)?;
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // A concurrent miss may have inserted the same signature; the score
        // is deterministic, so either copy is fine.
        cache.entry(signature).or_insert_with(|| prediction.clone());
        Ok(prediction)
    }

    /// Drop the current artifact and cache and load the artifact again.
    pub fn reload(&self) -> Result<(), ModelUnavailable> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = ModelState::Uninitialized;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Self::load_locked(&mut state, &self.model_path).map(|_| ())
    }

    /// Number of distinct feature signatures scored so far.
    pub fn cached_signatures(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Get the loaded artifact, loading it on first use.
    fn artifact(&self) -> Result<Arc<ModelArtifact>, ModelUnavailable> {
        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            match &*state {
                ModelState::Ready(artifact) => return Ok(Arc::clone(artifact)),
                ModelState::Failed(reason) => return Err(ModelUnavailable::new(reason.clone())),
                ModelState::Uninitialized => {}
            }
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        // Someone may have initialized while we waited for the write lock.
        match &*state {
            ModelState::Ready(artifact) => Ok(Arc::clone(artifact)),
            ModelState::Failed(reason) => Err(ModelUnavailable::new(reason.clone())),
            ModelState::Uninitialized => Self::load_locked(&mut state, &self.model_path),
        }
    }

    fn load_locked(
        state: &mut ModelState,
        path: &std::path::Path,
    ) -> Result<Arc<ModelArtifact>, ModelUnavailable> {
        match ModelArtifact::from_path(path) {
            Ok(artifact) => {
                log::info!(
                    "loaded model artifact '{}' ({} features) from {}",
                    artifact.version,
                    artifact.features.len(),
                    path.display()
                );
                let artifact = Arc::new(artifact);
                *state = ModelState::Ready(Arc::clone(&artifact));
                Ok(artifact)
            }
            Err(err) => {
                log::error!("model artifact load failed: {err}");
                *state = ModelState::Failed(err.reason.clone());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::FieldValue;
    use std::collections::BTreeMap;
    use std::io::Write;

    const ARTIFACT_JSON: &str = r#"{
        "version": "test-lr1",
        "classes": { "negative": "NO", "positive": "YES" },
        "intercept": -1.0,
        "features": [
            { "field": "AGE", "weight": 0.5,
              "encoding": { "kind": "numeric", "center": 60.0, "scale": 10.0 } },
            { "field": "SMOKING", "weight": 2.0, "encoding": { "kind": "binary" } }
        ]
    }"#;

    fn record(row_id: usize, age: i64, smoking: bool) -> Record {
        let mut values = BTreeMap::new();
        values.insert("AGE".into(), FieldValue::Integer(age));
        values.insert("SMOKING".into(), FieldValue::Bool(smoking));
        Record::new(row_id, values)
    }

    fn service() -> PredictionService {
        PredictionService::with_artifact(ModelArtifact::from_json(ARTIFACT_JSON).unwrap())
    }

    #[test]
    fn identical_features_share_one_cached_prediction() {
        let svc = service();
        let a = svc.predict(&record(0, 70, true)).unwrap();
        let b = svc.predict(&record(99, 70, true)).unwrap();
        assert_eq!(a, b);
        assert_eq!(svc.cached_signatures(), 1);

        svc.predict(&record(1, 50, false)).unwrap();
        assert_eq!(svc.cached_signatures(), 2);
    }

    #[test]
    fn missing_artifact_fails_closed_until_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let svc = PredictionService::new(&path);

        // Every call fails while the artifact is absent; nothing defaults.
        assert!(svc.predict(&record(0, 70, true)).is_err());
        assert!(svc.predict(&record(0, 70, true)).is_err());
        assert_eq!(svc.cached_signatures(), 0);

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(ARTIFACT_JSON.as_bytes()).unwrap();

        // Still failed: the failure sticks until an explicit reload.
        assert!(svc.predict(&record(0, 70, true)).is_err());
        svc.reload().unwrap();
        assert_eq!(svc.predict(&record(0, 70, true)).unwrap().label, "YES");
    }

    #[test]
    fn reload_clears_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, ARTIFACT_JSON).unwrap();

        let svc = PredictionService::new(&path);
        svc.predict(&record(0, 70, true)).unwrap();
        assert_eq!(svc.cached_signatures(), 1);

        svc.reload().unwrap();
        assert_eq!(svc.cached_signatures(), 0);
    }
}
