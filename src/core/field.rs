use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::collaborators::ValueFormatter;
use crate::core::errors::FormError;
use crate::core::path;
use crate::core::types::AUTH_TOKEN_FIELD_NAME;
use crate::core::value::Scalar;

/// Kind of input control a field is rendered as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    TextArea,
    Password,
    Hidden,
    CheckBox,
    MultipleCheckBox,
    RadioChoice,
    DropDownChoice,
    DatePicker,
    FileUpload,
    Color,
    Date,
    DateTime,
    DateTimeLocal,
    Time,
    Email,
    Month,
    Number,
    Range,
    Search,
    Tel,
    Url,
    Week,
}

impl FieldKind {
    pub const ALL: [FieldKind; 23] = [
        FieldKind::Text,
        FieldKind::TextArea,
        FieldKind::Password,
        FieldKind::Hidden,
        FieldKind::CheckBox,
        FieldKind::MultipleCheckBox,
        FieldKind::RadioChoice,
        FieldKind::DropDownChoice,
        FieldKind::DatePicker,
        FieldKind::FileUpload,
        FieldKind::Color,
        FieldKind::Date,
        FieldKind::DateTime,
        FieldKind::DateTimeLocal,
        FieldKind::Time,
        FieldKind::Email,
        FieldKind::Month,
        FieldKind::Number,
        FieldKind::Range,
        FieldKind::Search,
        FieldKind::Tel,
        FieldKind::Url,
        FieldKind::Week,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::TextArea => "textarea",
            FieldKind::Password => "password",
            FieldKind::Hidden => "hidden",
            FieldKind::CheckBox => "checkbox",
            FieldKind::MultipleCheckBox => "checkbox-multiple",
            FieldKind::RadioChoice => "radio",
            FieldKind::DropDownChoice => "select",
            FieldKind::DatePicker => "date-picker",
            FieldKind::FileUpload => "file",
            FieldKind::Color => "color",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime",
            FieldKind::DateTimeLocal => "datetime-local",
            FieldKind::Time => "time",
            FieldKind::Email => "email",
            FieldKind::Month => "month",
            FieldKind::Number => "number",
            FieldKind::Range => "range",
            FieldKind::Search => "search",
            FieldKind::Tel => "tel",
            FieldKind::Url => "url",
            FieldKind::Week => "week",
        }
    }

    /// Value of the `type` attribute of an `<input>`; empty for controls
    /// that are not inputs.
    pub fn input_type(self) -> &'static str {
        match self {
            FieldKind::TextArea | FieldKind::DropDownChoice => "",
            FieldKind::MultipleCheckBox => "checkbox",
            FieldKind::DatePicker => "text",
            other => other.type_name(),
        }
    }

    pub fn is_choice(self) -> bool {
        matches!(
            self,
            FieldKind::MultipleCheckBox | FieldKind::RadioChoice | FieldKind::DropDownChoice
        )
    }

    pub fn find_by_type(type_name: &str) -> Option<FieldKind> {
        Self::ALL.into_iter().find(|k| k.type_name() == type_name)
    }
}

/// Declaration of a field handed to the mapping builder.
#[derive(Clone)]
pub struct FieldSpec {
    pub(crate) property: String,
    pub(crate) kind: FieldKind,
    pub(crate) pattern: Option<String>,
    pub(crate) formatter: Option<Arc<dyn ValueFormatter>>,
}

impl FieldSpec {
    pub fn new(property: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            property: property.into(),
            kind,
            pattern: None,
            formatter: None,
        }
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn formatter(mut self, formatter: Arc<dyn ValueFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }
}

/// Leaf field of a mapping.
#[derive(Clone)]
pub struct FormField {
    name: String,
    kind: FieldKind,
    pattern: Option<String>,
    formatter: Option<Arc<dyn ValueFormatter>>,
    required: bool,
    filled: Vec<Scalar>,
    display: Vec<String>,
}

impl FormField {
    pub(crate) fn from_spec(name: String, spec: FieldSpec) -> Self {
        Self {
            name,
            kind: spec.kind,
            pattern: spec.pattern,
            formatter: spec.formatter,
            required: false,
            filled: Vec::new(),
            display: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_name(&self) -> &str {
        path::last_property_name(&self.name)
    }

    pub fn label_key(&self) -> String {
        path::label_key(&self.name)
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn formatter(&self) -> Option<&Arc<dyn ValueFormatter>> {
        self.formatter.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn filled_values(&self) -> &[Scalar] {
        &self.filled
    }

    pub fn filled_value(&self) -> Option<&Scalar> {
        self.filled.first()
    }

    // display strings
    pub fn values(&self) -> &[String] {
        &self.display
    }

    pub fn value(&self) -> Option<&str> {
        self.display.first().map(String::as_str)
    }

    pub fn is_auth_token(&self) -> bool {
        self.property_name() == AUTH_TOKEN_FIELD_NAME
    }

    /// Display strings safe to print; a token value is masked.
    pub(crate) fn printable_values(&self) -> Vec<&str> {
        if self.is_auth_token() {
            self.display.iter().map(|_| "<redacted>").collect()
        } else {
            self.display.iter().map(String::as_str).collect()
        }
    }

    pub(crate) fn with_path_prefix(&self, prefix: &str) -> FormField {
        FormField {
            name: path::compose_child(prefix, &self.name),
            ..self.clone()
        }
    }

    pub(crate) fn with_index_after_prefix(&self, index: usize, prefix: &str) -> Result<FormField, FormError> {
        Ok(FormField {
            name: path::with_index_after_prefix(&self.name, index, prefix)?,
            ..self.clone()
        })
    }

    pub(crate) fn with_required(&self, required: bool) -> FormField {
        FormField {
            required,
            ..self.clone()
        }
    }

    pub(crate) fn filled(&self, values: Vec<Scalar>, display: Vec<String>) -> FormField {
        FormField {
            filled: values,
            display,
            ..self.clone()
        }
    }
}

impl fmt::Debug for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormField")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("pattern", &self.pattern)
            .field("required", &self.required)
            .field("values", &self.printable_values())
            .finish()
    }
}
