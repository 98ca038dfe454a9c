#[derive(Debug, thiserror::Error)]
pub enum GraphqlError {
    #[error("graphql request failed: {0}")]
    Http(String),

    #[error("graphql endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("graphql response is not valid json: {0}")]
    Decode(String),

    /// The API answered with an `errors` payload.
    #[error("an error in GraphQL occurred, see the following for more info: {payload}")]
    Api { payload: String },

    #[error("graphql response has no data: {0}")]
    MissingData(String),

    #[error("graphql support is not configured for this session")]
    NotConfigured,

    #[error("unexpected graphql response shape: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GraphqlError>;
