use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Non-2xx reply from the store; the body text is kept verbatim so the
    /// caller can surface it unparsed.
    #[error("store replied {status}: {body}")]
    Transport { status: u16, body: String },

    /// Network-level failure, including request timeout.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Insert/patch with `Prefer: return=representation` came back without a row.
    #[error("empty reply from store")]
    EmptyReply,

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    /// A cascade delete stopped partway; `deleted` child rows are gone and
    /// will not be restored.
    #[error("cascade aborted after deleting {deleted} rows: {source}")]
    CascadeAborted {
        deleted: usize,
        #[source]
        source: Box<Error>,
    },

    /// A CSV import stopped partway; the first `imported` rows are committed.
    #[error("import aborted after {imported} rows: {source}")]
    ImportAborted {
        imported: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid csv row {row}: {reason}")]
    CsvRow { row: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
