/// Prediction layer: the trained model artifact and the service that scores
/// records against it, with a per-signature cache.
pub mod artifact;
pub mod service;
