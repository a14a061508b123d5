// bind: submitted values -> populated and validated instances
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace, warn};

use crate::core::collaborators::{RequestContext, RequestParams};
use crate::core::config::Config;
use crate::core::errors::FormError;
use crate::core::form::FormData;
use crate::core::mapping::{MappingKind, MappingNode};
use crate::core::path;
use crate::core::types::{AUTH_TOKEN_FIELD_NAME, Locale, PATH_SEP, ValidationGroup};
use crate::core::validation::{ParseError, ValidationReport};
use crate::core::value::{BoundPayload, BoundValues, Construction, Instance, PropertyValue};

/// Inputs shared by every node of one bind traversal.
#[derive(Clone, Copy)]
pub(crate) struct BindScope<'a> {
    pub(crate) params: &'a dyn RequestParams,
    pub(crate) locale: &'a Locale,
    pub(crate) ctx: Option<&'a dyn RequestContext>,
    pub(crate) groups: &'a [ValidationGroup],
}

impl<'a> BindScope<'a> {
    pub(crate) fn new(
        params: &'a dyn RequestParams,
        locale: &'a Locale,
        ctx: Option<&'a dyn RequestContext>,
        groups: &'a [ValidationGroup],
    ) -> Self {
        Self {
            params,
            locale,
            ctx,
            groups,
        }
    }
}

impl MappingNode {
    /// Binds this mapping as one instance.
    ///
    /// Order matters: nested mappings are bound first, the token is verified
    /// only after them, then the local instance is built from the local values
    /// plus the nested results and validated. `in_list` marks an element of a
    /// list mapping.
    pub(crate) fn bind_single(
        &self,
        scope: BindScope<'_>,
        instance: Option<Instance>,
        in_list: bool,
    ) -> Result<FormData<Instance>, FormError> {
        let config = self.require_config()?;
        debug!(path = %self.path, existing = instance.is_some(), "binding mapping");

        let request_error = scope.params.request_error();
        let mut values = self.read_local_fields(config, scope)?;

        let mut existing_nested = self.existing_nested_values(config, instance.as_deref());
        let mut nested_reports = Vec::with_capacity(self.nested.len());
        for (property, nested) in &self.nested {
            let existing = existing_nested.shift_remove(property);
            let payload = match nested.kind {
                MappingKind::Single => {
                    let existing = match existing {
                        Some(PropertyValue::Nested(inst)) => Some(inst),
                        _ => None,
                    };
                    let bound = nested.bind_single(scope, existing, false)?;
                    nested_reports.push(bound.validation);
                    BoundPayload::Nested(bound.data)
                }
                MappingKind::List => {
                    let existing = match existing {
                        Some(PropertyValue::NestedList(items)) => items,
                        _ => Vec::new(),
                    };
                    let bound = nested.bind_list(scope, existing)?;
                    nested_reports.push(bound.validation);
                    BoundPayload::NestedList(bound.data)
                }
            };
            values.insert(property.clone(), BoundValues::new(payload, scope.locale.clone()));
        }

        // must follow the nested mappings
        self.verify_auth_token_if_secured(scope.params, scope.ctx, in_list)?;

        let construction = match instance {
            Some(inst) => Construction::Existing(inst),
            None => Construction::New(self.instantiator.clone()),
        };
        let filled = config
            .binder()
            .bind_to_instance(&self.data_type, construction, values)?;

        let request_errors: Vec<_> = request_error.into_iter().collect();
        let parse_errors: Vec<ParseError> = filled.parse_errors.into_values().flatten().collect();
        let mut report = config.validator().validate(
            &*filled.instance,
            &self.path,
            &request_errors,
            &parse_errors,
            scope.locale,
            scope.groups,
        );
        for nested_report in nested_reports {
            report.merge(nested_report);
        }
        Ok(FormData::new(filled.instance, report))
    }

    /// Binds every submitted row of this list mapping.
    ///
    /// Rows are discovered from parameter names `path[n]...`; rows `0..=max`
    /// are bound in order, a gap binds as an empty row.
    pub(crate) fn bind_list(
        &self,
        scope: BindScope<'_>,
        existing: Vec<Instance>,
    ) -> Result<FormData<Vec<Instance>>, FormError> {
        if self.secured && self.is_root() {
            return Err(FormError::SecuredRootList {
                path: self.path.clone(),
            });
        }
        let names = scope.params.param_names();
        let max_index = path::find_max_index(names.iter().map(String::as_str), &self.path);
        trace!(path = %self.path, ?max_index, "list rows submitted");
        let limit = self.require_config()?.settings().max_list_rows;
        if let Some(index) = max_index.filter(|index| *index >= limit) {
            warn!(path = %self.path, index, limit, "too many list rows submitted");
            return Err(FormError::TooManyListRows {
                path: self.path.clone(),
                index,
                limit,
            });
        }

        let mut existing = existing.into_iter();
        let mut items = Vec::new();
        let mut report = ValidationReport::empty();
        if let Some(max_index) = max_index {
            for index in 0..=max_index {
                let element = self.list_element(index)?;
                let bound = element.bind_single(scope, existing.next(), true)?;
                items.push(bound.data);
                report.merge(bound.validation);
            }
        }
        Ok(FormData::new(items, report))
    }

    fn read_local_fields(
        &self,
        config: &Config,
        scope: BindScope<'_>,
    ) -> Result<IndexMap<String, BoundValues>, FormError> {
        let prefix = format!("{}{PATH_SEP}", self.path);
        let mut values = IndexMap::with_capacity(self.fields.len() + self.nested.len());
        for (property, field) in &self.fields {
            if property == AUTH_TOKEN_FIELD_NAME {
                continue;
            }
            if !field.name().starts_with(&prefix) {
                return Err(FormError::FieldOutsideMapping {
                    field: field.name().to_string(),
                    mapping: self.path.clone(),
                });
            }
            let payload = read_payload(scope.params, field.name(), config.settings().input_trimmed);
            trace!(field = field.name(), ?payload, "read field");
            values.insert(
                property.clone(),
                BoundValues {
                    payload,
                    pattern: field.pattern().map(str::to_string),
                    formatter: field.formatter().cloned(),
                    locale: scope.locale.clone(),
                },
            );
        }
        Ok(values)
    }

    /// Nested values of a caller-supplied instance, to be reused by the
    /// nested mappings.
    fn existing_nested_values(
        &self,
        config: &Config,
        instance: Option<&(dyn std::any::Any + Send + Sync)>,
    ) -> IndexMap<String, PropertyValue> {
        match instance {
            Some(inst) if !self.nested.is_empty() => {
                let allowed: IndexSet<String> = self.nested.keys().cloned().collect();
                config.extractor().extract_properties(inst, &allowed)
            }
            _ => IndexMap::new(),
        }
    }
}

/// Uploaded files win over strings; both are looked up under the name and
/// then under `name[]`.
fn read_payload(params: &dyn RequestParams, name: &str, trim: bool) -> BoundPayload {
    let array_name = format!("{name}[]");
    let files = params
        .uploaded_files(name)
        .filter(|files| !files.is_empty())
        .or_else(|| params.uploaded_files(&array_name));
    if let Some(files) = files.filter(|files| !files.is_empty()) {
        return BoundPayload::Files(files);
    }
    let strings = params
        .param_values(name)
        .filter(|values| !values.is_empty())
        .or_else(|| params.param_values(&array_name))
        .unwrap_or_default();
    if trim {
        BoundPayload::Strings(strings.into_iter().map(|s| s.trim().to_string()).collect())
    } else {
        BoundPayload::Strings(strings)
    }
}
