/// Success-cache persistence errors.
///
/// A corrupt cache file is deliberately NOT an error; the cache resets
/// itself and logs a warning. These cover failures writing state back.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to persist cache to {path}: {reason}")]
    PersistFailed { path: String, reason: String },

    #[error("failed to persist learned examples to {path}: {reason}")]
    ExamplesPersistFailed { path: String, reason: String },
}
