//! Contracts of the collaborators a mapping tree drives.
//!
//! The tree never renders, validates, constructs or reads instances itself;
//! it only decides which collaborator is called with what, and in which order.

use std::any::Any;

use indexmap::{IndexMap, IndexSet};

use crate::core::errors::{FormError, TokenRejected};
use crate::core::types::{DataType, Locale, ValidationGroup};
use crate::core::validation::{ParseError, RequestProcessingError, ValidationReport};
use crate::core::value::{BoundValues, Construction, Instance, PropertyValue, Scalar, UploadedFile};

/// Source of submitted values, keyed by full field path.
pub trait RequestParams {
    fn param_names(&self) -> Vec<String>;

    fn param_values(&self, name: &str) -> Option<Vec<String>>;

    fn param_value(&self, name: &str) -> Option<String> {
        self.param_values(name).and_then(|v| v.into_iter().next())
    }

    fn uploaded_files(&self, name: &str) -> Option<Vec<UploadedFile>>;

    fn request_error(&self) -> Option<RequestProcessingError>;
}

pub trait BeanValidator: Send + Sync {
    /// Validates a freshly bound instance. Messages for its properties are
    /// keyed by `path_prefix` joined with the property name.
    fn validate(
        &self,
        instance: &(dyn Any + Send + Sync),
        path_prefix: &str,
        request_errors: &[RequestProcessingError],
        parse_errors: &[ParseError],
        locale: &Locale,
        groups: &[ValidationGroup],
    ) -> ValidationReport;

    fn is_required(&self, data_type: &DataType, property: &str) -> bool;
}

/// Instance populated by a binder plus the conversion failures it met.
#[derive(Debug)]
pub struct FilledData {
    pub instance: Instance,
    pub parse_errors: IndexMap<String, Vec<ParseError>>,
}

impl FilledData {
    pub fn new(instance: Instance) -> Self {
        Self {
            instance,
            parse_errors: IndexMap::new(),
        }
    }
}

pub trait Binder: Send + Sync {
    /// Builds (or reuses) an instance and assigns every property it knows.
    /// A value that does not convert is recorded in `parse_errors` and the
    /// rest of the properties are still assigned.
    fn bind_to_instance(
        &self,
        data_type: &DataType,
        construction: Construction,
        values: IndexMap<String, BoundValues>,
    ) -> Result<FilledData, FormError>;
}

pub trait BeanExtractor: Send + Sync {
    /// Reads only the `allowed` properties of the instance.
    fn extract_properties(
        &self,
        instance: &(dyn Any + Send + Sync),
        allowed: &IndexSet<String>,
    ) -> IndexMap<String, PropertyValue>;
}

pub trait TokenAuthority: Send + Sync {
    fn generate_token(&self, secret: &str) -> String;

    fn validate_token(&self, token: &str, secret: &str) -> Result<(), TokenRejected>;
}

/// Session or request scoped key/value storage for one-time secrets.
pub trait UserStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    fn delete(&self, key: &str);
}

pub trait RequestContext {
    fn user_storage(&self) -> &dyn UserStorage;

    /// Secret bound to the current user, derived from the generated one.
    fn request_secret(&self, generated: &str) -> String;
}

pub trait ValueFormatter: Send + Sync {
    fn format(&self, value: &Scalar, pattern: Option<&str>, locale: &Locale) -> String;
}

/// Formats values with their `Display` impl, ignoring pattern and locale.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisplayFormatter;

impl ValueFormatter for DisplayFormatter {
    fn format(&self, value: &Scalar, _pattern: Option<&str>, _locale: &Locale) -> String {
        value.to_string()
    }
}
