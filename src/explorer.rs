use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::ExplorerConfig;
use crate::data::filter::{filtered_indices, FilterSpec};
use crate::data::loader;
use crate::data::model::{Dataset, FieldValue, Record};
use crate::error::QueryError;
use crate::predict::artifact::Prediction;
use crate::predict::service::PredictionService;

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// One display-ready result row: the record and its predicted risk class.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    pub record: Arc<Record>,
    pub prediction: Prediction,
}

// ---------------------------------------------------------------------------
// Dataset lifecycle
// ---------------------------------------------------------------------------

/// Same init-once shape as the model state: loading happens inside the write
/// lock, a failure sticks until an explicit reload.
#[derive(Debug)]
enum DatasetState {
    Uninitialized,
    Ready(Arc<Dataset>),
    Failed(String),
}

// ---------------------------------------------------------------------------
// Explorer – the query facade
// ---------------------------------------------------------------------------

/// The single entry point for the presentation layer.
///
/// All state (the loaded dataset, the model artifact, the prediction
/// cache) lives here and is process-scoped; from the caller's side every
/// operation is stateless. The first `query` triggers the dataset load;
/// concurrent first callers serialize through the state write lock, and
/// once both loads have happened reads proceed without contention.
pub struct Explorer {
    config: ExplorerConfig,
    dataset: RwLock<DatasetState>,
    predictor: PredictionService,
}

impl Explorer {
    pub fn new(config: ExplorerConfig) -> Self {
        let predictor = PredictionService::new(&config.model_path);
        Self {
            config,
            dataset: RwLock::new(DatasetState::Uninitialized),
            predictor,
        }
    }

    /// Run one query: filter the dataset, then attach a prediction to every
    /// matching record, preserving source row order.
    pub fn query(&self, spec: &FilterSpec) -> Result<Vec<QueryRow>, QueryError> {
        let dataset = self.dataset()?;
        let indices = filtered_indices(&dataset, spec)?;
        let mut rows = Vec::with_capacity(indices.len());
        for i in indices {
            let record = Arc::clone(&dataset.records()[i]);
            let prediction = self.predictor.predict(&record)?;
            rows.push(QueryRow { record, prediction });
        }
        Ok(rows)
    }

    /// Filter without predictions, so the presentation layer can still show
    /// record data while the model is unavailable.
    pub fn filter(&self, spec: &FilterSpec) -> Result<Vec<Arc<Record>>, QueryError> {
        let dataset = self.dataset()?;
        let indices = filtered_indices(&dataset, spec)?;
        Ok(indices
            .into_iter()
            .map(|i| Arc::clone(&dataset.records()[i]))
            .collect())
    }

    /// Distribution of `field` over the rows matching `spec`, the numbers
    /// behind the explorer's charts.
    pub fn value_counts(
        &self,
        field: &str,
        spec: &FilterSpec,
    ) -> Result<BTreeMap<FieldValue, usize>, QueryError> {
        let dataset = self.dataset()?;
        let indices = filtered_indices(&dataset, spec)?;
        Ok(dataset.value_counts(field, &indices))
    }

    /// The loaded dataset, loading it on first use.
    pub fn dataset(&self) -> Result<Arc<Dataset>, QueryError> {
        {
            let state = self.dataset.read().unwrap_or_else(PoisonError::into_inner);
            match &*state {
                DatasetState::Ready(ds) => return Ok(Arc::clone(ds)),
                DatasetState::Failed(reason) => {
                    return Err(QueryError::DatasetUnavailable(reason.clone()))
                }
                DatasetState::Uninitialized => {}
            }
        }

        let mut state = self.dataset.write().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            DatasetState::Ready(ds) => Ok(Arc::clone(ds)),
            DatasetState::Failed(reason) => Err(QueryError::DatasetUnavailable(reason.clone())),
            DatasetState::Uninitialized => Self::load_locked(&mut state, &self.config),
        }
    }

    /// Drop all cached state and load the dataset and the model again.
    pub fn reload(&self) -> Result<(), QueryError> {
        {
            let mut state = self.dataset.write().unwrap_or_else(PoisonError::into_inner);
            *state = DatasetState::Uninitialized;
            Self::load_locked(&mut state, &self.config)?;
        }
        self.predictor.reload()?;
        Ok(())
    }

    fn load_locked(
        state: &mut DatasetState,
        config: &ExplorerConfig,
    ) -> Result<Arc<Dataset>, QueryError> {
        match loader::load_path(
            &config.source_path,
            &crate::data::schema::Schema::lung_cancer_survey(),
            config.load_policy(),
        ) {
            Ok(dataset) => {
                let dataset = Arc::new(dataset);
                *state = DatasetState::Ready(Arc::clone(&dataset));
                Ok(dataset)
            }
            Err(err) => {
                *state = DatasetState::Failed(err.to_string());
                Err(err.into())
            }
        }
    }
}
