//! Picks the text backend for each request mode.
//!
//! `[models] default` serves everything unless `[models.roles]` names a
//! different spec for the `post` or `calendar` role. Specs have the form
//! `<provider>/<model>`, e.g. `anthropic/claude-sonnet-4-5`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::{ImagesConfig, ModelsConfig};
use crate::credentials::{ApiKey, Credentials, ANTHROPIC_API_KEY, OPENAI_API_KEY};

use super::anthropic::AnthropicProvider;
use super::images::OpenAiImageProvider;
use super::openai::OpenAiProvider;
use super::{ImageProvider, LlmProvider};

/// Role name for single-post drafts.
pub const ROLE_POST: &str = "post";
/// Role name for calendar plans.
pub const ROLE_CALENDAR: &str = "calendar";

/// Routing and backend construction errors.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Spec without a provider or model half.
    #[error("invalid model spec '{spec}', expected '<provider>/<model>'")]
    InvalidModelSpec {
        /// The spec as written.
        spec: String,
    },
    /// The default backend could not be built.
    #[error("default model '{spec}' is unavailable: {reason}")]
    DefaultUnavailable {
        /// Default spec.
        spec: String,
        /// Why it could not be built.
        reason: String,
    },
    /// Provider prefix other than `anthropic` or `openai`.
    #[error("unsupported provider '{provider}'")]
    UnsupportedProvider {
        /// The prefix as written.
        provider: String,
    },
    /// The provider's API key is not set.
    #[error("missing credential for provider '{provider}': {key}")]
    MissingCredential {
        /// Provider prefix.
        provider: String,
        /// Expected variable name.
        key: String,
    },
}

/// Role-aware text backend lookup.
#[derive(Clone)]
pub struct ModelRouter {
    backends: HashMap<String, Arc<dyn LlmProvider>>,
    default: String,
    roles: HashMap<String, String>,
}

impl ModelRouter {
    /// Build every backend the config names.
    ///
    /// A role whose backend cannot be built is logged and served by the
    /// default instead.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::DefaultUnavailable`] if the default backend
    /// cannot be built.
    pub fn from_config(models: &ModelsConfig, credentials: &Credentials) -> Result<Self, RouterError> {
        let default = build_backend(&models.default, credentials).map_err(|e| {
            RouterError::DefaultUnavailable {
                spec: models.default.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut backends = HashMap::from([(models.default.clone(), default)]);
        let mut roles = HashMap::new();
        for (role, spec) in &models.roles {
            if !backends.contains_key(spec) {
                match build_backend(spec, credentials) {
                    Ok(backend) => {
                        backends.insert(spec.clone(), backend);
                    }
                    Err(e) => {
                        tracing::warn!(role = %role, spec = %spec, error = %e, "role falls back to default model");
                        continue;
                    }
                }
            }
            roles.insert(role.clone(), spec.clone());
        }

        Ok(Self {
            backends,
            default: models.default.clone(),
            roles,
        })
    }

    /// Router with one backend serving every role.
    #[doc(hidden)]
    pub fn for_testing(default_spec: String, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            backends: HashMap::from([(default_spec.clone(), provider)]),
            default: default_spec,
            roles: HashMap::new(),
        }
    }

    /// Route `role` to a separate backend.
    #[doc(hidden)]
    #[must_use]
    pub fn with_role_for_testing(
        mut self,
        role: &str,
        spec: String,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        self.backends.insert(spec.clone(), provider);
        self.roles.insert(role.to_owned(), spec);
        self
    }

    /// Spec that serves `role`.
    pub fn resolve_spec(&self, role: &str) -> &str {
        self.roles.get(role).unwrap_or(&self.default)
    }

    /// Backend that serves `role`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::DefaultUnavailable`] if nothing is registered
    /// for the resolved spec.
    pub fn resolve(&self, role: &str) -> Result<Arc<dyn LlmProvider>, RouterError> {
        let spec = self.resolve_spec(role);
        self.backends
            .get(spec)
            .cloned()
            .ok_or_else(|| RouterError::DefaultUnavailable {
                spec: spec.to_owned(),
                reason: "no backend registered".to_owned(),
            })
    }

    /// Role to spec table, for the startup log.
    pub fn routes(&self) -> BTreeMap<&str, &str> {
        [ROLE_POST, ROLE_CALENDAR]
            .into_iter()
            .map(|role| (role, self.resolve_spec(role)))
            .collect()
    }
}

/// Build the image backend described by `[images]`, if enabled.
///
/// # Errors
///
/// Returns an error when images are enabled but the spec is malformed, names
/// an unsupported provider, or lacks a credential.
pub fn image_provider_from_config(
    images: &ImagesConfig,
    credentials: &Credentials,
) -> Result<Option<Arc<dyn ImageProvider>>, RouterError> {
    if !images.enabled {
        return Ok(None);
    }
    let (provider, model) = split_spec(&images.model)?;
    if provider != "openai" {
        return Err(RouterError::UnsupportedProvider {
            provider: provider.to_owned(),
        });
    }
    let key = require_key(credentials, provider, OPENAI_API_KEY)?;
    Ok(Some(Arc::new(OpenAiImageProvider::new(
        images.model.clone(),
        model.to_owned(),
        images.quality.clone(),
        key,
    ))))
}

fn split_spec(spec: &str) -> Result<(&str, &str), RouterError> {
    match spec.split_once('/') {
        Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
            Ok((provider, model))
        }
        _ => Err(RouterError::InvalidModelSpec {
            spec: spec.to_owned(),
        }),
    }
}

fn require_key(
    credentials: &Credentials,
    provider: &str,
    key: &str,
) -> Result<ApiKey, RouterError> {
    credentials
        .api_key(key)
        .ok_or_else(|| RouterError::MissingCredential {
            provider: provider.to_owned(),
            key: key.to_owned(),
        })
}

fn build_backend(spec: &str, credentials: &Credentials) -> Result<Arc<dyn LlmProvider>, RouterError> {
    let (provider, model) = split_spec(spec)?;
    let backend: Arc<dyn LlmProvider> = match provider {
        "anthropic" => Arc::new(AnthropicProvider::new(
            spec.to_owned(),
            model.to_owned(),
            require_key(credentials, provider, ANTHROPIC_API_KEY)?,
        )),
        "openai" => Arc::new(OpenAiProvider::new(
            spec.to_owned(),
            model.to_owned(),
            require_key(credentials, provider, OPENAI_API_KEY)?,
        )),
        other => {
            return Err(RouterError::UnsupportedProvider {
                provider: other.to_owned(),
            })
        }
    };
    Ok(backend)
}
