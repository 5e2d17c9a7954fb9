use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("feature gate request failed: {0}")]
    FeatureGate(String),
    #[error("tenant tier request failed: {0}")]
    TenantTier(String),
    #[error("governance connector request failed: {0}")]
    Governance(String),
    #[error("route filtering failed: {0}")]
    Routes(String),
    #[error("failed to initialize i18n: {0}")]
    I18nInit(String),
    #[error("failed to change language to {language}: {message}")]
    LanguageChange { language: String, message: String },
    #[error("storage is unavailable")]
    StorageUnavailable,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("console session closed")]
    Cancelled,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
