//! Typed handles over mapping trees.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::bind::BindScope;
use crate::core::collaborators::{RequestContext, RequestParams};
use crate::core::config::Config;
use crate::core::errors::FormError;
use crate::core::fill::FillScope;
use crate::core::mapping::MappingNode;
use crate::core::types::{DataType, Locale, ValidationGroup};
use crate::core::validation::ValidationReport;
use crate::core::value::{Instance, SharedInstance};

/// A value together with the validation report that belongs to it.
#[derive(Debug)]
pub struct FormData<T> {
    pub data: T,
    pub validation: ValidationReport,
}

impl<T> FormData<T> {
    pub fn new(data: T, validation: ValidationReport) -> Self {
        Self { data, validation }
    }

    pub fn unvalidated(data: T) -> Self {
        Self::new(data, ValidationReport::empty())
    }

    pub fn is_valid(&self) -> bool {
        self.validation.is_success()
    }
}

/// Mapping of a single value of type `T`.
pub struct FormMapping<T> {
    node: MappingNode,
    _marker: PhantomData<fn() -> T>,
}

/// Mapping of a list of values of type `T`.
pub struct ListFormMapping<T> {
    node: MappingNode,
    _marker: PhantomData<fn() -> T>,
}

fn downcast<T: Any>(instance: Instance, path: &str) -> Result<T, FormError> {
    instance
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| FormError::TypeMismatch {
            path: path.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

impl<T: Any + Send + Sync> FormMapping<T> {
    pub(crate) fn from_node(node: MappingNode) -> Self {
        Self {
            node,
            _marker: PhantomData,
        }
    }

    pub fn node(&self) -> &MappingNode {
        &self.node
    }

    pub fn into_node(self) -> MappingNode {
        self.node
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn with_path_prefix(&self, prefix: &str) -> Result<Self, FormError> {
        Ok(Self::from_node(self.node.with_path_prefix(prefix)?))
    }

    pub fn with_index_after_path_prefix(&self, index: usize, prefix: &str) -> Result<Self, FormError> {
        Ok(Self::from_node(self.node.with_index_after_path_prefix(index, prefix)?))
    }

    pub fn with_config(&self, config: Config, required: bool) -> Self {
        Self::from_node(self.node.with_config(config, required))
    }

    pub fn nested_by_property<U: Any + Send + Sync>(&self, property: &str) -> Option<FormMapping<U>> {
        self.node
            .get_nested_by_property(&DataType::of::<U>(), property)
            .filter(|n| n.kind() == crate::core::mapping::MappingKind::Single)
            .map(|n| FormMapping::from_node(n.clone()))
    }

    pub fn nested_list_by_property<U: Any + Send + Sync>(&self, property: &str) -> Option<ListFormMapping<U>> {
        self.node
            .get_nested_by_property(&DataType::of::<U>(), property)
            .filter(|n| n.kind() == crate::core::mapping::MappingKind::List)
            .map(|n| ListFormMapping::from_node(n.clone()))
    }

    pub fn bind(
        &self,
        params: &dyn RequestParams,
        locale: &Locale,
        ctx: Option<&dyn RequestContext>,
        groups: &[ValidationGroup],
    ) -> Result<FormData<T>, FormError> {
        self.bind_with(params, locale, None, ctx, groups)
    }

    // reuses the caller's instance and its nested values
    pub fn bind_into(
        &self,
        params: &dyn RequestParams,
        locale: &Locale,
        instance: T,
        ctx: Option<&dyn RequestContext>,
        groups: &[ValidationGroup],
    ) -> Result<FormData<T>, FormError> {
        self.bind_with(params, locale, Some(Box::new(instance)), ctx, groups)
    }

    fn bind_with(
        &self,
        params: &dyn RequestParams,
        locale: &Locale,
        instance: Option<Instance>,
        ctx: Option<&dyn RequestContext>,
        groups: &[ValidationGroup],
    ) -> Result<FormData<T>, FormError> {
        let scope = BindScope::new(params, locale, ctx, groups);
        let bound = self.node.bind_single(scope, instance, false)?;
        Ok(FormData::new(downcast::<T>(bound.data, self.name())?, bound.validation))
    }

    pub fn fill(
        &self,
        data: FormData<T>,
        locale: &Locale,
        ctx: Option<&dyn RequestContext>,
    ) -> Result<FormMapping<T>, FormError> {
        let scope = FillScope::new(locale, ctx);
        let value: SharedInstance = Arc::new(data.data);
        Ok(Self::from_node(self.node.fill_single(Some(value), &data.validation, scope)?))
    }

    pub fn filled_data(&self) -> Option<&T> {
        self.node.filled_value_as::<T>()
    }
}

impl<T: Any + Send + Sync> ListFormMapping<T> {
    pub(crate) fn from_node(node: MappingNode) -> Self {
        Self {
            node,
            _marker: PhantomData,
        }
    }

    pub fn node(&self) -> &MappingNode {
        &self.node
    }

    pub fn into_node(self) -> MappingNode {
        self.node
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn with_config(&self, config: Config, required: bool) -> Self {
        Self::from_node(self.node.with_config(config, required))
    }

    pub fn elements(&self) -> Vec<FormMapping<T>> {
        self.node
            .list()
            .iter()
            .map(|element| FormMapping::from_node(element.clone()))
            .collect()
    }

    pub fn bind(
        &self,
        params: &dyn RequestParams,
        locale: &Locale,
        ctx: Option<&dyn RequestContext>,
        groups: &[ValidationGroup],
    ) -> Result<FormData<Vec<T>>, FormError> {
        let scope = BindScope::new(params, locale, ctx, groups);
        let bound = self.node.bind_list(scope, Vec::new())?;
        let items = bound
            .data
            .into_iter()
            .map(|item| downcast::<T>(item, self.name()))
            .collect::<Result<Vec<_>, FormError>>()?;
        Ok(FormData::new(items, bound.validation))
    }

    pub fn fill(
        &self,
        data: FormData<Vec<T>>,
        locale: &Locale,
        ctx: Option<&dyn RequestContext>,
    ) -> Result<ListFormMapping<T>, FormError> {
        let scope = FillScope::new(locale, ctx);
        let items: Vec<SharedInstance> = data
            .data
            .into_iter()
            .map(|item| Arc::new(item) as SharedInstance)
            .collect();
        Ok(Self::from_node(self.node.fill_list(items, &data.validation, scope)?))
    }
}

impl<T> Clone for FormMapping<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for ListFormMapping<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for FormMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FormMapping").field(&self.node).finish()
    }
}

impl<T> fmt::Debug for ListFormMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListFormMapping").field(&self.node).finish()
    }
}
