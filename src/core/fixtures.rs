// small domain plus fake collaborators shared by the unit tests
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::core::collaborators::{BeanExtractor, BeanValidator, Binder, FilledData};
use crate::core::config::Config;
use crate::core::errors::FormError;
use crate::core::field::FieldKind;
use crate::core::form::{FormMapping, ListFormMapping};
use crate::core::mapping::MappingBuilder;
use crate::core::path;
use crate::core::security::HmacTokenAuthority;
use crate::core::types::{DataType, Locale, ValidationGroup};
use crate::core::validation::{ConstraintViolationMessage, ParseError, RequestProcessingError, ValidationReport};
use crate::core::value::{BoundPayload, BoundValues, Construction, Instance, PropertyValue, Scalar, UploadedFile};

pub const NOT_EMPTY: &str = "constraints.NotEmpty.message";
pub const PARSE: &str = "constraints.Parse.message";
pub const REQUEST: &str = "constraints.Request.message";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: Option<i64>,
    pub address: Address,
    pub nicknames: Vec<String>,
    pub cv: Option<UploadedFile>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Engine {
    pub cylinders: i64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Car {
    pub engine: Engine,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Line {
    pub product: String,
    pub quantity: i64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Order {
    pub number: String,
    pub lines: Vec<Line>,
}

/// Validator with "must not be empty" rules per type and property.
#[derive(Clone, Debug, Default)]
pub struct RuleValidator {
    required: HashMap<TypeId, Vec<&'static str>>,
}

impl RuleValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require<T: Any>(mut self, property: &'static str) -> Self {
        self.required.entry(TypeId::of::<T>()).or_default().push(property);
        self
    }

    /// Person.name, Person.address and Address.city.
    pub fn standard() -> Self {
        Self::new()
            .require::<Person>("name")
            .require::<Person>("address")
            .require::<Address>("city")
    }
}

impl BeanValidator for RuleValidator {
    fn validate(
        &self,
        instance: &(dyn Any + Send + Sync),
        path_prefix: &str,
        request_errors: &[RequestProcessingError],
        parse_errors: &[ParseError],
        _locale: &Locale,
        groups: &[ValidationGroup],
    ) -> ValidationReport {
        let mut report = ValidationReport::empty();
        for err in request_errors {
            report.add_global_message(ConstraintViolationMessage::error(err.message.clone(), REQUEST));
        }
        for err in parse_errors {
            report.add_field_message(
                path::compose_child(path_prefix, &err.property),
                ConstraintViolationMessage::error(err.message.clone(), PARSE).with_arg("value", err.value.clone()),
            );
        }
        let default_group = groups.is_empty() || groups.contains(&ValidationGroup::DEFAULT);
        let rules = self.required.get(&(*instance).type_id());
        if let (true, Some(rules)) = (default_group, rules) {
            for property in rules {
                if is_empty(property_of(instance, property)) {
                    report.add_field_message(
                        path::compose_child(path_prefix, property),
                        ConstraintViolationMessage::error(format!("{property} must not be empty"), NOT_EMPTY),
                    );
                }
            }
        }
        report
    }

    fn is_required(&self, data_type: &DataType, property: &str) -> bool {
        self.required
            .get(&data_type.id())
            .is_some_and(|rules| rules.contains(&property))
    }
}

fn is_empty(value: PropertyValue) -> bool {
    match value {
        PropertyValue::Absent => true,
        PropertyValue::Scalar(Scalar::Text(s)) => s.is_empty(),
        PropertyValue::Scalars(v) => v.is_empty(),
        PropertyValue::NestedList(v) => v.is_empty(),
        PropertyValue::Scalar(_) | PropertyValue::Nested(_) => false,
    }
}

fn text(s: &str) -> PropertyValue {
    PropertyValue::Scalar(Scalar::from(s))
}

fn property_of(instance: &(dyn Any + Send + Sync), property: &str) -> PropertyValue {
    if let Some(p) = instance.downcast_ref::<Person>() {
        match property {
            "name" => text(&p.name),
            "age" => p.age.map_or(PropertyValue::Absent, |a| PropertyValue::Scalar(Scalar::Integer(a))),
            "address" => PropertyValue::Nested(Box::new(p.address.clone())),
            "nicknames" => PropertyValue::Scalars(p.nicknames.iter().map(|n| Scalar::from(n.as_str())).collect()),
            "cv" => p.cv.clone().map_or(PropertyValue::Absent, |f| PropertyValue::Scalar(Scalar::File(f))),
            _ => PropertyValue::Absent,
        }
    } else if let Some(a) = instance.downcast_ref::<Address>() {
        match property {
            "street" => text(&a.street),
            "city" => text(&a.city),
            _ => PropertyValue::Absent,
        }
    } else if let Some(c) = instance.downcast_ref::<Car>() {
        match property {
            "engine" => PropertyValue::Nested(Box::new(c.engine.clone())),
            _ => PropertyValue::Absent,
        }
    } else if let Some(e) = instance.downcast_ref::<Engine>() {
        match property {
            "cylinders" => PropertyValue::Scalar(Scalar::Integer(e.cylinders)),
            _ => PropertyValue::Absent,
        }
    } else if let Some(o) = instance.downcast_ref::<Order>() {
        match property {
            "number" => text(&o.number),
            "lines" => PropertyValue::NestedList(
                o.lines.iter().map(|l| Box::new(l.clone()) as Instance).collect(),
            ),
            _ => PropertyValue::Absent,
        }
    } else if let Some(l) = instance.downcast_ref::<Line>() {
        match property {
            "product" => text(&l.product),
            "quantity" => PropertyValue::Scalar(Scalar::Integer(l.quantity)),
            _ => PropertyValue::Absent,
        }
    } else {
        PropertyValue::Absent
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FixtureExtractor;

impl BeanExtractor for FixtureExtractor {
    fn extract_properties(
        &self,
        instance: &(dyn Any + Send + Sync),
        allowed: &IndexSet<String>,
    ) -> IndexMap<String, PropertyValue> {
        allowed
            .iter()
            .map(|property| (property.clone(), property_of(instance, property)))
            .collect()
    }
}

/// Values of one bind call, consumed property by property.
struct Props {
    values: IndexMap<String, BoundValues>,
    errors: IndexMap<String, Vec<ParseError>>,
}

impl Props {
    fn strings(&mut self, property: &str) -> Option<Vec<String>> {
        match self.values.shift_remove(property).map(|v| v.payload) {
            Some(BoundPayload::Strings(v)) if !v.is_empty() => Some(v),
            _ => None,
        }
    }

    fn text(&mut self, property: &str, target: &mut String) {
        if let Some(v) = self.strings(property).and_then(|v| v.into_iter().next()) {
            *target = v;
        }
    }

    fn integer(&mut self, property: &str) -> Option<i64> {
        let raw = self.strings(property)?.into_iter().next()?;
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<i64>() {
            Ok(n) => Some(n),
            Err(e) => {
                self.errors
                    .entry(property.to_string())
                    .or_default()
                    .push(ParseError::new(property, raw, "i64", e.to_string()));
                None
            }
        }
    }

    fn file(&mut self, property: &str) -> Option<UploadedFile> {
        match self.values.shift_remove(property).map(|v| v.payload) {
            Some(BoundPayload::Files(files)) => files.into_iter().next(),
            _ => None,
        }
    }

    fn nested<T: Any>(&mut self, property: &str) -> Option<T> {
        match self.values.shift_remove(property).map(|v| v.payload) {
            Some(BoundPayload::Nested(inst)) => inst.downcast::<T>().ok().map(|b| *b),
            _ => None,
        }
    }

    fn nested_list<T: Any>(&mut self, property: &str) -> Option<Vec<T>> {
        match self.values.shift_remove(property).map(|v| v.payload) {
            Some(BoundPayload::NestedList(items)) => Some(
                items
                    .into_iter()
                    .filter_map(|inst| inst.downcast::<T>().ok().map(|b| *b))
                    .collect(),
            ),
            _ => None,
        }
    }
}

fn new_instance(data_type: &DataType) -> Option<Instance> {
    let id = data_type.id();
    if id == TypeId::of::<Person>() {
        Some(Box::new(Person::default()))
    } else if id == TypeId::of::<Address>() {
        Some(Box::new(Address::default()))
    } else if id == TypeId::of::<Car>() {
        Some(Box::new(Car::default()))
    } else if id == TypeId::of::<Engine>() {
        Some(Box::new(Engine::default()))
    } else if id == TypeId::of::<Order>() {
        Some(Box::new(Order::default()))
    } else if id == TypeId::of::<Line>() {
        Some(Box::new(Line::default()))
    } else {
        None
    }
}

/// Binder for the fixture types; strings that do not convert become parse
/// errors and leave the property untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixtureBinder;

impl Binder for FixtureBinder {
    fn bind_to_instance(
        &self,
        data_type: &DataType,
        construction: Construction,
        values: IndexMap<String, BoundValues>,
    ) -> Result<FilledData, FormError> {
        let unsupported = || FormError::Binder {
            path: data_type.name().to_string(),
            reason: "unsupported type".into(),
        };
        let mut instance = match construction.into_instance() {
            Some(inst) => inst,
            None => new_instance(data_type).ok_or_else(unsupported)?,
        };
        let mut props = Props {
            values,
            errors: IndexMap::new(),
        };
        if let Some(p) = instance.downcast_mut::<Person>() {
            props.text("name", &mut p.name);
            if let Some(age) = props.integer("age") {
                p.age = Some(age);
            }
            if let Some(address) = props.nested("address") {
                p.address = address;
            }
            if let Some(nicknames) = props.strings("nicknames") {
                p.nicknames = nicknames;
            }
            if let Some(cv) = props.file("cv") {
                p.cv = Some(cv);
            }
        } else if let Some(a) = instance.downcast_mut::<Address>() {
            props.text("street", &mut a.street);
            props.text("city", &mut a.city);
        } else if let Some(c) = instance.downcast_mut::<Car>() {
            if let Some(engine) = props.nested("engine") {
                c.engine = engine;
            }
        } else if let Some(e) = instance.downcast_mut::<Engine>() {
            if let Some(n) = props.integer("cylinders") {
                e.cylinders = n;
            }
        } else if let Some(o) = instance.downcast_mut::<Order>() {
            props.text("number", &mut o.number);
            if let Some(lines) = props.nested_list("lines") {
                o.lines = lines;
            }
        } else if let Some(l) = instance.downcast_mut::<Line>() {
            props.text("product", &mut l.product);
            if let Some(n) = props.integer("quantity") {
                l.quantity = n;
            }
        } else {
            return Err(unsupported());
        }
        Ok(FilledData {
            instance,
            parse_errors: props.errors,
        })
    }
}

pub fn config_with(validator: RuleValidator) -> Config {
    Config::builder()
        .validator(Arc::new(validator))
        .binder(Arc::new(FixtureBinder))
        .extractor(Arc::new(FixtureExtractor))
        .token_authority(Arc::new(HmacTokenAuthority::new(b"fixture key")))
        .build()
        .unwrap()
}

pub fn config() -> Config {
    config_with(RuleValidator::standard())
}

fn address_form() -> FormMapping<Address> {
    MappingBuilder::<Address>::new("address")
        .field("street", FieldKind::Text)
        .field("city", FieldKind::Text)
        .build()
        .unwrap()
}

fn person_builder() -> MappingBuilder<Person> {
    MappingBuilder::<Person>::new("person")
        .field("name", FieldKind::Text)
        .field("age", FieldKind::Number)
        .field("nicknames", FieldKind::MultipleCheckBox)
        .field("cv", FieldKind::FileUpload)
        .nested(address_form())
        .config(config())
}

pub fn person_form() -> FormMapping<Person> {
    person_builder().build().unwrap()
}

pub fn secured_person_form() -> FormMapping<Person> {
    person_builder().secured(true).build().unwrap()
}

pub fn car_form() -> FormMapping<Car> {
    let engine = MappingBuilder::<Engine>::new("engine")
        .field("cylinders", FieldKind::Number)
        .build()
        .unwrap();
    MappingBuilder::<Car>::new("carForm")
        .nested(engine)
        .config(config())
        .build()
        .unwrap()
}

fn line_list() -> ListFormMapping<Line> {
    MappingBuilder::<Line>::new("lines")
        .field("product", FieldKind::Text)
        .field("quantity", FieldKind::Number)
        .build_list()
        .unwrap()
}

/// Root list mapping of order lines.
pub fn lines_form() -> ListFormMapping<Line> {
    line_list().with_config(config(), false)
}

pub fn order_form() -> FormMapping<Order> {
    MappingBuilder::<Order>::new("order")
        .field("number", FieldKind::Text)
        .nested_list(line_list())
        .config(config())
        .build()
        .unwrap()
}
