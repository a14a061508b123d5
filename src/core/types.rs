use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Separator between property names in a structural path.
pub const PATH_SEP: &str = "-";

/// Property name of the hidden field carrying the anti-forgery token.
pub const AUTH_TOKEN_FIELD_NAME: &str = "formAuthToken";

/// Key prefix of the one-time secret held in user storage, followed by the
/// root mapping path.
pub const SECRET_KEY_PREFIX: &str = "formbind_secret_";

/// Identity of the type a mapping produces.
///
/// Equality and hashing go through the `TypeId`; the name is only for
/// messages and outlines.
#[derive(Clone, Copy, Debug)]
pub struct DataType {
    id: TypeId,
    name: &'static str,
}

impl DataType {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    // without module path
    pub fn short_name(&self) -> &'static str {
        match self.name.rfind("::") {
            Some(i) => &self.name[i + 2..],
            None => self.name,
        }
    }

    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DataType {}

impl Hash for DataType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Locale tag threaded explicitly through every bind and fill call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: impl Into<String>) -> Self {
        Locale(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validation group passed through to the validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValidationGroup(pub &'static str);

impl ValidationGroup {
    pub const DEFAULT: ValidationGroup = ValidationGroup("default");
}
