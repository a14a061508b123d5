//! Form mapping trees: bind submitted name/value pairs into typed object
//! graphs, fill object graphs back into field values, and guard root forms
//! with one-time anti-forgery tokens.
//!
//! A definition is built once with [`MappingBuilder`] and never mutated.
//! Every shape change (prefixing, indexing, reconfiguring, filling) returns a
//! new tree, so one definition can serve many concurrent requests.

pub mod core;
pub mod mapping;

pub use crate::core::collaborators::{
    BeanExtractor, BeanValidator, Binder, DisplayFormatter, FilledData, RequestContext,
    RequestParams, TokenAuthority, UserStorage, ValueFormatter,
};
pub use crate::core::config::{Config, ConfigBuilder, Settings};
pub use crate::core::errors::{FormError, TokenRejected};
pub use crate::core::field::{FieldKind, FieldSpec, FormField};
pub use crate::core::form::{FormData, FormMapping, ListFormMapping};
pub use crate::core::mapping::{MappingBuilder, MappingKind, MappingNode};
pub use crate::core::memory::{InMemoryStorage, MapParams, SessionContext};
pub use crate::core::security::HmacTokenAuthority;
pub use crate::core::types::{
    AUTH_TOKEN_FIELD_NAME, DataType, Locale, PATH_SEP, SECRET_KEY_PREFIX, ValidationGroup,
};
pub use crate::core::validation::{
    ConstraintViolationMessage, ParseError, RequestErrorKind, RequestProcessingError, Severity,
    ValidationReport,
};
pub use crate::core::value::{
    BoundPayload, BoundValues, Construction, Instance, Instantiator, PropertyValue, Scalar,
    SharedInstance, UploadedFile,
};
pub use crate::mapping::outline::{FieldOutline, MappingOutline};
