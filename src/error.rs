use thiserror::Error;

/// Failures talking to the external news API.
#[derive(Debug, Error)]
pub enum NewsApiError {
    #[error("invalid news API url: {0}")]
    Url(#[from] url::ParseError),

    #[error("news API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("news API responded with HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("news API error ({code}): {message}")]
    Api { code: String, message: String },

    #[error("could not decode news API response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("ERROR: database failure: {0}")]
    Database(#[from] sqlx::Error),

    #[error("ERROR: {0}")]
    NewsApi(#[from] NewsApiError),

    #[error("ERROR: category {0} not found")]
    CategoryNotFound(String),

    #[error("ERROR: category '{0}' is still used by articles and cannot be deleted")]
    CategoryInUse(String),

    #[error("ERROR: category '{0}' already exists")]
    DuplicateCategory(String),

    #[error("ERROR: {0} is required")]
    MissingInput(&'static str),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_user_facing() {
        let err = ServiceError::CategoryInUse("Sports".to_string());
        assert_eq!(
            err.to_string(),
            "ERROR: category 'Sports' is still used by articles and cannot be deleted"
        );

        let err = ServiceError::MissingInput("category name");
        assert_eq!(err.to_string(), "ERROR: category name is required");
    }

    #[test]
    fn test_api_error_is_wrapped() {
        let err: ServiceError = NewsApiError::Api {
            code: "apiKeyInvalid".to_string(),
            message: "Your API key is invalid".to_string(),
        }
        .into();

        assert_eq!(
            err.to_string(),
            "ERROR: news API error (apiKeyInvalid): Your API key is invalid"
        );
    }
}
