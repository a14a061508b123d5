use indexmap::IndexMap;

use crate::core::config::Config;
use crate::core::field::FormField;
use crate::core::mapping::MappingNode;
use crate::core::types::DataType;

/// Configuration governing `child` when its parent is governed by `outer`.
///
/// An explicitly assigned configuration wins; anything else inherits.
pub fn resolve(child: &MappingNode, outer: &Config) -> Config {
    match (&child.config, child.user_defined_config) {
        (Some(own), true) => own.clone(),
        _ => outer.clone(),
    }
}

impl MappingNode {
    /// Copy governed by `config`.
    ///
    /// Field required flags are recomputed against the new validator and each
    /// nested mapping is re-resolved against `config`, recursively, so no
    /// descendant keeps a flag computed under a previous configuration.
    pub(crate) fn reconfigured(&self, config: Config, required: bool, user_defined: bool) -> MappingNode {
        let fields = configured_fields(&self.fields, &config, &self.data_type);
        let nested = self
            .nested
            .iter()
            .map(|(property, child)| {
                (
                    property.clone(),
                    child.resolved_under(&self.data_type, property, &config),
                )
            })
            .collect();
        let list = self
            .list
            .iter()
            .map(|element| element.reconfigured(config.clone(), required, user_defined))
            .collect();
        MappingNode {
            path: self.path.clone(),
            data_type: self.data_type,
            kind: self.kind,
            instantiator: self.instantiator.clone(),
            config: Some(config),
            user_defined_config: user_defined,
            fields,
            nested,
            list,
            secured: self.secured,
            required,
            filled_value: self.filled_value.clone(),
            validation: self.validation.clone(),
        }
    }

    /// This node as the `property` of a `parent_type` governed by `outer`.
    fn resolved_under(&self, parent_type: &DataType, property: &str, outer: &Config) -> MappingNode {
        let effective = resolve(self, outer);
        let required = effective.validator().is_required(parent_type, property);
        self.reconfigured(effective, required, self.user_defined_config)
    }
}

fn configured_fields(
    fields: &IndexMap<String, FormField>,
    config: &Config,
    data_type: &DataType,
) -> IndexMap<String, FormField> {
    fields
        .iter()
        .map(|(property, field)| {
            let required = config.validator().is_required(data_type, property);
            (property.clone(), field.with_required(required))
        })
        .collect()
}
