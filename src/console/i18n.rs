//! Localization bootstrap.
//!
//! After authentication the console fetches the language metadata file,
//! initializes the localizer with it and falls back to the default language
//! when the detected one is not supported.

use crate::console::{
    config::{remove_slashes, ConsoleConfig},
    error::{Error, Result},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, instrument};

const META_FILE_STEM: &str = "meta";
const META_FILE_EXTENSION: &str = "json";

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LanguageInfo {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub flag: String,
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
}

/// Supported languages keyed by language code.
pub type LanguageMeta = BTreeMap<String, LanguageInfo>;

/// Path of the metadata file, served from the app base without the tenant
/// segment, e.g. `/console/resources/i18n/meta.3f2a.json`.
pub fn meta_path(config: &ConsoleConfig) -> String {
    let file = match config.i18n.meta_hash.as_deref().map(str::trim) {
        Some(hash) if !hash.is_empty() => {
            format!("{META_FILE_STEM}.{hash}.{META_FILE_EXTENSION}")
        }
        _ => format!("{META_FILE_STEM}.{META_FILE_EXTENSION}"),
    };

    let base = config.deployment.app_base_name_without_tenant();
    let resource = remove_slashes(&config.i18n.resource_path);
    if resource.is_empty() {
        format!("{base}/{file}")
    } else {
        format!("{base}/{resource}/{file}")
    }
}

#[async_trait]
pub trait LocaleSource: Send + Sync {
    async fn fetch_meta(&self, path: &str) -> Result<LanguageMeta>;
}

/// The internationalization engine.
pub trait Localizer: Send + Sync {
    /// # Errors
    /// Returns an error if the engine cannot be initialized with `meta`.
    fn init(&self, meta: &LanguageMeta) -> Result<()>;

    fn language(&self) -> String;

    /// # Errors
    /// Returns an error if the language cannot be activated.
    fn change_language(&self, language: &str) -> Result<()>;
}

/// Fetches the metadata and prepares the localizer.
///
/// # Errors
/// Returns [`Error::I18nInit`] when the metadata cannot be loaded or the
/// localizer rejects it, and [`Error::LanguageChange`] when switching to the
/// fallback language fails.
#[instrument(skip_all)]
pub async fn initialize(
    config: &ConsoleConfig,
    source: &dyn LocaleSource,
    localizer: &dyn Localizer,
) -> Result<LanguageMeta> {
    let path = meta_path(config);
    debug!(path, "loading language metadata");

    let meta = source
        .fetch_meta(&path)
        .await
        .map_err(|err| Error::I18nInit(err.to_string()))?;

    localizer.init(&meta).map_err(|err| match err {
        Error::I18nInit(_) => err,
        other => Error::I18nInit(other.to_string()),
    })?;

    let language = localizer.language();
    if !meta.contains_key(&language) {
        let fallback = &config.i18n.fallback_language;
        info!(language, fallback, "unsupported language, switching to fallback");
        localizer
            .change_language(fallback)
            .map_err(|err| Error::LanguageChange {
                language: fallback.clone(),
                message: err.to_string(),
            })?;
    }

    Ok(meta)
}

/// Localizer that only tracks the active language.
#[derive(Debug)]
pub struct StaticLocalizer {
    language: Mutex<String>,
    supported: Mutex<Vec<String>>,
}

impl StaticLocalizer {
    pub fn new(language: &str) -> Self {
        Self {
            language: Mutex::new(language.to_string()),
            supported: Mutex::default(),
        }
    }
}

impl Localizer for StaticLocalizer {
    fn init(&self, meta: &LanguageMeta) -> Result<()> {
        if meta.is_empty() {
            return Err(Error::I18nInit("no languages available".to_string()));
        }
        *self.supported.lock().unwrap_or_else(PoisonError::into_inner) =
            meta.keys().cloned().collect();
        Ok(())
    }

    fn language(&self) -> String {
        self.language
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn change_language(&self, language: &str) -> Result<()> {
        let supported = self.supported.lock().unwrap_or_else(PoisonError::into_inner);
        if !supported.iter().any(|code| code == language) {
            return Err(Error::LanguageChange {
                language: language.to_string(),
                message: "language is not supported".to_string(),
            });
        }
        *self.language.lock().unwrap_or_else(PoisonError::into_inner) = language.to_string();
        Ok(())
    }
}
