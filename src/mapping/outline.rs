/*
Input:

    a mapping tree, defined or filled

Output:

    MappingOutline, a plain serde tree of paths, kinds, flags and shown values

    outline.toon text of the same tree

Used for snapshots of a form definition and for handing the form structure to
renderers that live outside the process.
*/

use serde::{Deserialize, Serialize};

use crate::core::errors::FormError;
use crate::core::field::{FieldKind, FormField};
use crate::core::mapping::{MappingKind, MappingNode};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOutline {
    pub name: String,
    pub property: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingOutline {
    pub path: String,
    pub label_key: String,
    pub data_type: String,
    pub kind: MappingKind,
    pub secured: bool,
    pub required: bool,
    #[serde(default)]
    pub fields: Vec<FieldOutline>,
    #[serde(default)]
    pub nested: Vec<MappingOutline>,
    /// Element mappings of a filled list.
    #[serde(default)]
    pub items: Vec<MappingOutline>,
}

impl FieldOutline {
    pub fn of(field: &FormField) -> Self {
        Self {
            name: field.name().to_string(),
            property: field.property_name().to_string(),
            kind: field.kind(),
            required: field.is_required(),
            pattern: field.pattern().map(str::to_string),
            values: field.values().to_vec(),
        }
    }
}

impl MappingOutline {
    pub fn of(node: &MappingNode) -> Self {
        Self {
            path: node.path().to_string(),
            label_key: node.label_key(),
            data_type: node.data_type().short_name().to_string(),
            kind: node.kind(),
            secured: node.is_secured(),
            required: node.is_required(),
            fields: node.fields().values().map(FieldOutline::of).collect(),
            nested: node.nested().values().map(MappingOutline::of).collect(),
            items: node.list().iter().map(MappingOutline::of).collect(),
        }
    }

    pub fn to_toon(&self) -> Result<String, FormError> {
        toon_format::encode_default(self).map_err(|e| FormError::Outline(e.to_string()))
    }

    pub fn from_toon(text: &str) -> Result<Self, FormError> {
        toon_format::decode_default(text).map_err(|e| FormError::Outline(e.to_string()))
    }

    /// Outline of the mapping at `path`, searching nested mappings and list
    /// items.
    pub fn find(&self, path: &str) -> Option<&MappingOutline> {
        if self.path == path {
            return Some(self);
        }
        self.nested
            .iter()
            .chain(self.items.iter())
            .find_map(|child| child.find(path))
    }

    /// Every field of the tree, depth first.
    pub fn all_fields(&self) -> Vec<&FieldOutline> {
        let mut out: Vec<&FieldOutline> = self.fields.iter().collect();
        for child in self.nested.iter().chain(self.items.iter()) {
            out.extend(child.all_fields());
        }
        out
    }
}

impl MappingNode {
    pub fn outline(&self) -> MappingOutline {
        MappingOutline::of(self)
    }
}
