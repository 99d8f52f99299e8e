//! lungscope – filtering and prediction core for a lung-cancer survey
//! explorer.
//!
//! The crate loads the survey source into a validated, immutable
//! [`Dataset`], evaluates declarative [`FilterSpec`]s against it, and
//! attaches a risk [`Prediction`] from a trained model artifact to each
//! matching record. The presentation layer talks to exactly one type:
//!
//! ```text
//!  ExplorerConfig ──▶ Explorer::query(&FilterSpec)
//!                         │
//!                         ├─ data::loader   (csv → Schema::validate → Dataset)
//!                         ├─ data::filter   (FilterSpec → ordered indices)
//!                         └─ predict        (artifact → cached Prediction)
//! ```
//!
//! Training the model is out of scope; the artifact is consumed as-is.

pub mod config;
pub mod data;
pub mod error;
pub mod explorer;
pub mod predict;

pub use config::ExplorerConfig;
pub use data::filter::{FilterSpec, Predicate};
pub use data::loader::LoadPolicy;
pub use data::model::{Dataset, FieldValue, Record};
pub use data::schema::{FieldDef, FieldKind, Schema};
pub use error::{FilterError, LoadError, ModelUnavailable, QueryError, SchemaViolation};
pub use explorer::{Explorer, QueryRow};
pub use predict::artifact::{ModelArtifact, Prediction};
pub use predict::service::PredictionService;
