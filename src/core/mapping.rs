// mapping tree node, its builder and shape-changing copies
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::config::Config;
use crate::core::errors::FormError;
use crate::core::field::{FieldKind, FieldSpec, FormField};
use crate::core::form::{FormMapping, ListFormMapping};
use crate::core::path;
use crate::core::types::{AUTH_TOKEN_FIELD_NAME, DataType, PATH_SEP, SECRET_KEY_PREFIX};
use crate::core::validation::ValidationReport;
use crate::core::value::{Instantiator, SharedInstance};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    Single,
    List,
}

/// Form-level view of one value (or one list of values) of a data type.
///
/// Nodes are never modified after construction. Prefixing, indexing,
/// reconfiguring and filling all return new trees.
#[derive(Clone)]
pub struct MappingNode {
    pub(crate) path: String,
    pub(crate) data_type: DataType,
    pub(crate) kind: MappingKind,
    pub(crate) instantiator: Instantiator,
    pub(crate) config: Option<Config>,
    pub(crate) user_defined_config: bool,
    // keyed by property name
    pub(crate) fields: IndexMap<String, FormField>,
    /// Keyed by simple property name, which is also the last segment of the
    /// nested mapping's path.
    pub(crate) nested: IndexMap<String, MappingNode>,
    // filled list mappings only
    pub(crate) list: Vec<MappingNode>,
    pub(crate) secured: bool,
    pub(crate) required: bool,
    pub(crate) filled_value: Option<SharedInstance>,
    pub(crate) validation: ValidationReport,
}

impl MappingNode {
    // same as path()
    pub fn name(&self) -> &str {
        &self.path
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn label_key(&self) -> String {
        path::label_key(&self.path)
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn kind(&self) -> MappingKind {
        self.kind
    }

    pub fn instantiator(&self) -> &Instantiator {
        &self.instantiator
    }

    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    pub fn is_user_defined_config(&self) -> bool {
        self.user_defined_config
    }

    pub fn fields(&self) -> &IndexMap<String, FormField> {
        &self.fields
    }

    pub fn field(&self, property: &str) -> Option<&FormField> {
        self.fields.get(property)
    }

    pub fn nested(&self) -> &IndexMap<String, MappingNode> {
        &self.nested
    }

    // filled list mappings only
    pub fn list(&self) -> &[MappingNode] {
        &self.list
    }

    pub fn is_secured(&self) -> bool {
        self.secured
    }

    pub fn is_root(&self) -> bool {
        path::is_root_path(&self.path)
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn filled_value(&self) -> Option<&SharedInstance> {
        self.filled_value.as_ref()
    }

    pub fn filled_value_as<T: Any>(&self) -> Option<&T> {
        self.filled_value.as_deref().and_then(|v| v.downcast_ref::<T>())
    }

    pub fn validation(&self) -> &ValidationReport {
        &self.validation
    }

    pub fn root_path(&self) -> &str {
        path::root_path(&self.path)
    }

    // key of the root's one-time secret
    pub fn root_secret_key(&self) -> String {
        format!("{SECRET_KEY_PREFIX}{}", self.root_path())
    }

    pub fn get_nested_by_property(&self, data_type: &DataType, property: &str) -> Option<&MappingNode> {
        self.nested
            .get(property)
            .filter(|nested| nested.data_type == *data_type)
    }

    pub(crate) fn require_config(&self) -> Result<&Config, FormError> {
        self.config.as_ref().ok_or_else(|| FormError::MissingConfig {
            path: self.path.clone(),
        })
    }

    // new shape, everything else cloned
    fn reshaped(
        &self,
        path: String,
        fields: IndexMap<String, FormField>,
        nested: IndexMap<String, MappingNode>,
        list: Vec<MappingNode>,
    ) -> MappingNode {
        MappingNode {
            path,
            data_type: self.data_type,
            kind: self.kind,
            instantiator: self.instantiator.clone(),
            config: self.config.clone(),
            user_defined_config: self.user_defined_config,
            fields,
            nested,
            list,
            secured: self.secured,
            required: self.required,
            filled_value: self.filled_value.clone(),
            validation: self.validation.clone(),
        }
    }

    /// Copy with `prefix` prepended to every path of the tree.
    pub fn with_path_prefix(&self, prefix: &str) -> Result<MappingNode, FormError> {
        let new_path = path::compose_child(prefix, &self.path);
        let field_prefix = format!("{new_path}{PATH_SEP}");
        let mut fields = IndexMap::with_capacity(self.fields.len());
        for (property, field) in &self.fields {
            let field = field.with_path_prefix(prefix);
            if !field.name().starts_with(&field_prefix) {
                return Err(FormError::FieldOutsideMapping {
                    field: field.name().to_string(),
                    mapping: new_path,
                });
            }
            fields.insert(property.clone(), field);
        }
        let nested = self
            .nested
            .iter()
            .map(|(property, n)| Ok((property.clone(), n.with_path_prefix(prefix)?)))
            .collect::<Result<IndexMap<_, _>, FormError>>()?;
        let list = self
            .list
            .iter()
            .map(|element| element.with_path_prefix(prefix))
            .collect::<Result<Vec<_>, FormError>>()?;
        Ok(self.reshaped(new_path, fields, nested, list))
    }

    /// Copy with `[index]` inserted right after `prefix` in every path of
    /// the tree. The path of this node must start with `prefix`.
    pub fn with_index_after_path_prefix(&self, index: usize, prefix: &str) -> Result<MappingNode, FormError> {
        let new_path = path::with_index_after_prefix(&self.path, index, prefix)?;
        let fields = self
            .fields
            .iter()
            .map(|(property, f)| Ok((property.clone(), f.with_index_after_prefix(index, prefix)?)))
            .collect::<Result<IndexMap<_, _>, FormError>>()?;
        let nested = self
            .nested
            .iter()
            .map(|(property, n)| Ok((property.clone(), n.with_index_after_path_prefix(index, prefix)?)))
            .collect::<Result<IndexMap<_, _>, FormError>>()?;
        let list = self
            .list
            .iter()
            .map(|element| element.with_index_after_path_prefix(index, prefix))
            .collect::<Result<Vec<_>, FormError>>()?;
        Ok(self.reshaped(new_path, fields, nested, list))
    }

    /// Copy with an explicitly assigned configuration. Required flags of the
    /// fields are recomputed and the configuration flows down to every
    /// descendant that has none of its own.
    pub fn with_config(&self, config: Config, required: bool) -> MappingNode {
        self.reconfigured(config, required, true)
    }

    /// Element `index` of a list mapping: a single mapping with indexed paths.
    pub(crate) fn list_element(&self, index: usize) -> Result<MappingNode, FormError> {
        let mut element = self.with_index_after_path_prefix(index, &self.path)?;
        element.kind = MappingKind::Single;
        element.list = Vec::new();
        Ok(element)
    }

    pub fn describe(&self, indent: &str) -> String {
        let mut out = format!(
            "{indent}{} : {} ({:?}{}{})\n",
            self.path,
            self.data_type.short_name(),
            self.kind,
            if self.secured { ", secured" } else { "" },
            if self.required { ", required" } else { "" },
        );
        let inner = format!("{indent}  ");
        for field in self.fields.values() {
            out.push_str(&format!("{inner}{} : {}", field.name(), field.kind().type_name()));
            if !field.values().is_empty() {
                out.push_str(&format!(" = {:?}", field.printable_values()));
            }
            out.push('\n');
        }
        for nested in self.nested.values() {
            out.push_str(&nested.describe(&inner));
        }
        for element in &self.list {
            out.push_str(&element.describe(&inner));
        }
        out
    }
}

impl fmt::Debug for MappingNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingNode")
            .field("path", &self.path)
            .field("data_type", &self.data_type.name())
            .field("kind", &self.kind)
            .field("secured", &self.secured)
            .field("required", &self.required)
            .field("user_defined_config", &self.user_defined_config)
            .field("fields", &self.fields)
            .field("nested", &self.nested)
            .field("list", &self.list)
            .finish()
    }
}

impl fmt::Display for MappingNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(""))
    }
}

/// Builds a mapping definition for values of type `T`.
pub struct MappingBuilder<T> {
    name: String,
    instantiator: Instantiator,
    config: Option<Config>,
    secured: bool,
    fields: Vec<FieldSpec>,
    nested: Vec<MappingNode>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> MappingBuilder<T> {
    /// `name` is the root path of a form, or the property name when the
    /// mapping gets nested into another one.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instantiator: Instantiator::Delegated,
            config: None,
            secured: false,
            fields: Vec::new(),
            nested: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn field(self, property: impl Into<String>, kind: FieldKind) -> Self {
        self.field_spec(FieldSpec::new(property, kind))
    }

    pub fn field_spec(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Nests a single mapping under the property named like the mapping.
    pub fn nested<U: Any + Send + Sync>(mut self, mapping: FormMapping<U>) -> Self {
        self.nested.push(mapping.into_node());
        self
    }

    pub fn nested_list<U: Any + Send + Sync>(mut self, mapping: ListFormMapping<U>) -> Self {
        self.nested.push(mapping.into_node());
        self
    }

    pub fn instantiator(mut self, instantiator: Instantiator) -> Self {
        self.instantiator = instantiator;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Secured mappings require a valid anti-forgery token on bind.
    pub fn secured(mut self, secured: bool) -> Self {
        self.secured = secured;
        self
    }

    pub fn build(self) -> Result<FormMapping<T>, FormError> {
        Ok(FormMapping::from_node(self.build_node(MappingKind::Single)?))
    }

    pub fn build_list(self) -> Result<ListFormMapping<T>, FormError> {
        Ok(ListFormMapping::from_node(self.build_node(MappingKind::List)?))
    }

    fn build_node(self, kind: MappingKind) -> Result<MappingNode, FormError> {
        let mut fields = IndexMap::with_capacity(self.fields.len() + 1);
        for spec in self.fields {
            let name = path::compose_child(&self.name, &spec.property);
            fields.insert(spec.property.clone(), FormField::from_spec(name, spec));
        }
        if self.secured {
            let name = path::compose_child(&self.name, AUTH_TOKEN_FIELD_NAME);
            fields.insert(
                AUTH_TOKEN_FIELD_NAME.to_string(),
                FormField::from_spec(name, FieldSpec::new(AUTH_TOKEN_FIELD_NAME, FieldKind::Hidden)),
            );
        }
        let mut nested = IndexMap::with_capacity(self.nested.len());
        for node in self.nested {
            let property = node.path.clone();
            nested.insert(property, node.with_path_prefix(&self.name)?);
        }
        let node = MappingNode {
            path: self.name,
            data_type: DataType::of::<T>(),
            kind,
            instantiator: self.instantiator,
            config: None,
            user_defined_config: false,
            fields,
            nested,
            list: Vec::new(),
            secured: self.secured,
            required: false,
            filled_value: None,
            validation: ValidationReport::empty(),
        };
        Ok(match self.config {
            Some(config) => node.reconfigured(config, false, true),
            None => node,
        })
    }
}
