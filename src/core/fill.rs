// fill: instance -> copy of the tree carrying display values
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::core::collaborators::RequestContext;
use crate::core::config::Config;
use crate::core::errors::FormError;
use crate::core::field::FormField;
use crate::core::mapping::{MappingKind, MappingNode};
use crate::core::types::{AUTH_TOKEN_FIELD_NAME, Locale};
use crate::core::validation::ValidationReport;
use crate::core::value::{PropertyValue, Scalar, SharedInstance};

#[derive(Clone, Copy)]
pub(crate) struct FillScope<'a> {
    pub(crate) locale: &'a Locale,
    pub(crate) ctx: Option<&'a dyn RequestContext>,
}

impl<'a> FillScope<'a> {
    pub(crate) fn new(locale: &'a Locale, ctx: Option<&'a dyn RequestContext>) -> Self {
        Self { locale, ctx }
    }
}

impl MappingNode {
    /// Copy of this mapping filled with `value`. A missing value fills every
    /// field with nothing.
    pub(crate) fn fill_single(
        &self,
        value: Option<SharedInstance>,
        validation: &ValidationReport,
        scope: FillScope<'_>,
    ) -> Result<MappingNode, FormError> {
        let config = self.require_config()?;
        debug!(path = %self.path, present = value.is_some(), "filling mapping");

        let mut nested_values = match &value {
            Some(instance) if !self.nested.is_empty() => {
                let allowed: IndexSet<String> = self.nested.keys().cloned().collect();
                config.extractor().extract_properties(instance.as_ref(), &allowed)
            }
            _ => IndexMap::new(),
        };
        let mut nested = IndexMap::with_capacity(self.nested.len());
        for (property, child) in &self.nested {
            let filled = match child.kind {
                MappingKind::Single => {
                    let child_value = match nested_values.shift_remove(property) {
                        Some(PropertyValue::Nested(instance)) => Some(SharedInstance::from(instance)),
                        _ => None,
                    };
                    child.fill_single(child_value, validation, scope)?
                }
                MappingKind::List => {
                    let items = match nested_values.shift_remove(property) {
                        Some(PropertyValue::NestedList(items)) => {
                            items.into_iter().map(SharedInstance::from).collect()
                        }
                        _ => Vec::new(),
                    };
                    child.fill_list(items, validation, scope)?
                }
            };
            nested.insert(property.clone(), filled);
        }

        // the token field is never read from the instance
        let allowed: IndexSet<String> = self
            .fields
            .keys()
            .filter(|property| property.as_str() != AUTH_TOKEN_FIELD_NAME)
            .cloned()
            .collect();
        let mut local = match &value {
            Some(instance) if !allowed.is_empty() => {
                config.extractor().extract_properties(instance.as_ref(), &allowed)
            }
            _ => IndexMap::new(),
        };
        self.put_auth_token_if_secured(&mut local, scope.ctx)?;

        let fields = self
            .fields
            .iter()
            .map(|(property, field)| {
                let scalars = local
                    .shift_remove(property)
                    .map(PropertyValue::into_scalars)
                    .unwrap_or_default();
                let shown = display_strings(field, &scalars, config, scope.locale);
                // count only, values may hold the token
                trace!(field = field.name(), values = shown.len(), "filled field");
                (property.clone(), field.filled(scalars, shown))
            })
            .collect();

        Ok(MappingNode {
            path: self.path.clone(),
            data_type: self.data_type,
            kind: self.kind,
            instantiator: self.instantiator.clone(),
            config: self.config.clone(),
            user_defined_config: self.user_defined_config,
            fields,
            nested,
            list: Vec::new(),
            secured: self.secured,
            required: self.required,
            filled_value: value,
            validation: validation.clone(),
        })
    }

    /// Copy of this list mapping with one indexed element per item.
    pub(crate) fn fill_list(
        &self,
        items: Vec<SharedInstance>,
        validation: &ValidationReport,
        scope: FillScope<'_>,
    ) -> Result<MappingNode, FormError> {
        if self.secured && self.is_root() {
            return Err(FormError::SecuredRootList {
                path: self.path.clone(),
            });
        }
        debug!(path = %self.path, items = items.len(), "filling list mapping");
        let list = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.list_element(index)?
                    .fill_single(Some(Arc::clone(item)), validation, scope)
            })
            .collect::<Result<Vec<_>, FormError>>()?;
        let filled_value: SharedInstance = Arc::new(items);
        Ok(MappingNode {
            list,
            filled_value: Some(filled_value),
            validation: validation.clone(),
            ..self.clone()
        })
    }

    /// Filled display values of the whole tree keyed by field path; fields
    /// without a value are left out.
    pub fn filled_params(&self) -> IndexMap<String, Vec<String>> {
        let mut out = IndexMap::new();
        self.collect_filled(&mut out);
        out
    }

    fn collect_filled(&self, out: &mut IndexMap<String, Vec<String>>) {
        for field in self.fields.values() {
            if !field.values().is_empty() {
                out.insert(field.name().to_string(), field.values().to_vec());
            }
        }
        for nested in self.nested.values() {
            nested.collect_filled(out);
        }
        for element in &self.list {
            element.collect_filled(out);
        }
    }
}

fn display_strings(field: &FormField, scalars: &[Scalar], config: &Config, locale: &Locale) -> Vec<String> {
    scalars
        .iter()
        .map(|scalar| match field.formatter() {
            Some(formatter) => formatter.format(scalar, field.pattern(), locale),
            None => config.formatter().format(scalar, field.pattern(), locale),
        })
        .collect()
}
