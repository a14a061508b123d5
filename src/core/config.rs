use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::collaborators::{
    BeanExtractor, BeanValidator, Binder, DisplayFormatter, TokenAuthority, ValueFormatter,
};
use crate::core::errors::FormError;
use crate::core::security::HmacTokenAuthority;

/// Plain settings of a configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Trim submitted strings before binding.
    pub input_trimmed: bool,
    /// Length of the generated one-time secret.
    pub secret_length: usize,
    /// Most rows a list mapping binds; a higher submitted index is refused.
    pub max_list_rows: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_trimmed: true,
            secret_length: 20,
            max_list_rows: 1000,
        }
    }
}

impl Settings {
    /// Reads settings from TOON text; keys left out keep their defaults.
    pub fn from_toon(text: &str) -> Result<Self, FormError> {
        let settings: Settings =
            toon_format::decode_default(text).map_err(|e| FormError::Settings(e.to_string()))?;
        if settings.secret_length == 0 {
            return Err(FormError::Settings("secret_length must be positive".into()));
        }
        Ok(settings)
    }
}

/// Collaborators and settings governing a mapping and, unless they define
/// their own, all of its descendants.
#[derive(Clone)]
pub struct Config {
    validator: Arc<dyn BeanValidator>,
    binder: Arc<dyn Binder>,
    extractor: Arc<dyn BeanExtractor>,
    token_authority: Arc<dyn TokenAuthority>,
    formatter: Arc<dyn ValueFormatter>,
    settings: Settings,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn validator(&self) -> &dyn BeanValidator {
        self.validator.as_ref()
    }

    pub fn binder(&self) -> &dyn Binder {
        self.binder.as_ref()
    }

    pub fn extractor(&self) -> &dyn BeanExtractor {
        self.extractor.as_ref()
    }

    pub fn token_authority(&self) -> &dyn TokenAuthority {
        self.token_authority.as_ref()
    }

    pub fn formatter(&self) -> &dyn ValueFormatter {
        self.formatter.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Copy with other settings and the same collaborators.
    pub fn with_settings(&self, settings: Settings) -> Config {
        Config {
            settings,
            ..self.clone()
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config").field("settings", &self.settings).finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ConfigBuilder {
    validator: Option<Arc<dyn BeanValidator>>,
    binder: Option<Arc<dyn Binder>>,
    extractor: Option<Arc<dyn BeanExtractor>>,
    token_authority: Option<Arc<dyn TokenAuthority>>,
    formatter: Option<Arc<dyn ValueFormatter>>,
    settings: Settings,
}

impl ConfigBuilder {
    pub fn validator(mut self, validator: Arc<dyn BeanValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn binder(mut self, binder: Arc<dyn Binder>) -> Self {
        self.binder = Some(binder);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn BeanExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn token_authority(mut self, authority: Arc<dyn TokenAuthority>) -> Self {
        self.token_authority = Some(authority);
        self
    }

    pub fn formatter(mut self, formatter: Arc<dyn ValueFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn input_trimmed(mut self, trimmed: bool) -> Self {
        self.settings.input_trimmed = trimmed;
        self
    }

    pub fn build(self) -> Result<Config, FormError> {
        let validator = self
            .validator
            .ok_or(FormError::IncompleteConfig { missing: "validator" })?;
        let binder = self.binder.ok_or(FormError::IncompleteConfig { missing: "binder" })?;
        let extractor = self
            .extractor
            .ok_or(FormError::IncompleteConfig { missing: "extractor" })?;
        Ok(Config {
            validator,
            binder,
            extractor,
            token_authority: self
                .token_authority
                .unwrap_or_else(|| Arc::new(HmacTokenAuthority::with_random_key())),
            formatter: self.formatter.unwrap_or_else(|| Arc::new(DisplayFormatter)),
            settings: self.settings,
        })
    }
}
