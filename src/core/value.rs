// tagged value model passed between the tree and its collaborators
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::collaborators::ValueFormatter;
use crate::core::types::Locale;

pub type Instance = Box<dyn Any + Send + Sync>;

// shared by filled copies
pub type SharedInstance = Arc<dyn Any + Send + Sync>;

/// Metadata of an uploaded file. Storage of the content is left to the
/// parameter source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            size,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Bool(bool),
    File(UploadedFile),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Decimal(d) => write!(f, "{d}"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::File(file) => f.write_str(&file.file_name),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Integer(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Value of one property as read out of an instance by the bean extractor.
#[derive(Debug)]
pub enum PropertyValue {
    Absent,
    Scalar(Scalar),
    Scalars(Vec<Scalar>),
    Nested(Instance),
    NestedList(Vec<Instance>),
}

impl PropertyValue {
    /// Scalars to show in a field; nested values have none.
    pub fn into_scalars(self) -> Vec<Scalar> {
        match self {
            PropertyValue::Scalar(s) => vec![s],
            PropertyValue::Scalars(v) => v,
            PropertyValue::Absent | PropertyValue::Nested(_) | PropertyValue::NestedList(_) => {
                Vec::new()
            }
        }
    }
}

/// Raw material for one property handed to the binder.
#[derive(Debug)]
pub enum BoundPayload {
    Strings(Vec<String>),
    Files(Vec<UploadedFile>),
    Nested(Instance),
    NestedList(Vec<Instance>),
}

/// Payload of one property together with what the binder needs to convert it.
pub struct BoundValues {
    pub payload: BoundPayload,
    pub pattern: Option<String>,
    pub formatter: Option<Arc<dyn ValueFormatter>>,
    pub locale: Locale,
}

impl BoundValues {
    pub fn new(payload: BoundPayload, locale: Locale) -> Self {
        Self {
            payload,
            pattern: None,
            formatter: None,
            locale,
        }
    }

    pub fn first_string(&self) -> Option<&str> {
        match &self.payload {
            BoundPayload::Strings(v) => v.first().map(String::as_str),
            _ => None,
        }
    }
}

impl fmt::Debug for BoundValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundValues")
            .field("payload", &self.payload)
            .field("pattern", &self.pattern)
            .field("formatter", &self.formatter.is_some())
            .field("locale", &self.locale)
            .finish()
    }
}

/// How a mapping obtains a fresh instance.
#[derive(Clone, Default)]
pub enum Instantiator {
    /// The binder constructs the instance from the data type.
    #[default]
    Delegated,
    Factory(Arc<dyn Fn() -> Instance + Send + Sync>),
}

impl Instantiator {
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn() -> Instance + Send + Sync + 'static,
    {
        Instantiator::Factory(Arc::new(f))
    }

    pub fn default_of<T: Default + Any + Send + Sync>() -> Self {
        Self::factory(|| Box::new(T::default()))
    }

    /// New instance from the factory; `None` when construction is delegated.
    pub fn instantiate(&self) -> Option<Instance> {
        match self {
            Instantiator::Delegated => None,
            Instantiator::Factory(f) => Some(f()),
        }
    }
}

impl fmt::Debug for Instantiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instantiator::Delegated => f.write_str("Delegated"),
            Instantiator::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// Construction strategy of a single bind call.
#[derive(Debug)]
pub enum Construction {
    New(Instantiator),
    /// Populate an instance supplied by the caller.
    Existing(Instance),
}

impl Construction {
    pub fn into_instance(self) -> Option<Instance> {
        match self {
            Construction::New(instantiator) => instantiator.instantiate(),
            Construction::Existing(instance) => Some(instance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_value_scalars() {
        assert_eq!(PropertyValue::Scalar(Scalar::from("x")).into_scalars(), vec![Scalar::from("x")]);
        assert!(PropertyValue::Absent.into_scalars().is_empty());
        assert!(PropertyValue::NestedList(Vec::new()).into_scalars().is_empty());
    }

    #[test]
    fn factory_instantiator_builds_instances() {
        let inst = Instantiator::default_of::<String>().instantiate().unwrap();
        assert!(inst.downcast_ref::<String>().is_some());
        assert!(Instantiator::Delegated.instantiate().is_none());
    }

    #[test]
    fn scalar_display() {
        assert_eq!(Scalar::Integer(42).to_string(), "42");
        assert_eq!(Scalar::File(UploadedFile::new("cv.pdf", "application/pdf", 10)).to_string(), "cv.pdf");
    }
}
