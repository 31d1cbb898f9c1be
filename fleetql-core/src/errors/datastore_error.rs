/// Datastore-layer errors. A failed plan call for a bad candidate query is
/// NOT one of these; that comes back as a verdict. These mean the store
/// itself is broken or unreachable, which is fatal to the request.
#[derive(Debug, thiserror::Error)]
pub enum DatastoreError {
    #[error("database unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("SQL error: {message}")]
    SqlError { message: String },

    #[error("schema introspection failed: {reason}")]
    IntrospectionFailed { reason: String },

    #[error("document store corrupt: {details}")]
    CorruptDocument { details: String },
}
