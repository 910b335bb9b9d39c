//! Schema definitions and the registry that owns them.
//!
//! A schema is a named, typed view of one collection/table within one
//! connection. Registration is two-phase: a [`SchemaBuilder`] must receive
//! its connection/collection binding via [`bind`](SchemaBuilder::bind) before
//! the field structure is supplied via [`structure`](SchemaBuilder::structure);
//! only then is the definition recorded. A definition is immutable once
//! registered - there are no in-place field edits, only re-registration under
//! the same name overwrites.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DataError, DataResult};

/// The declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Int,
}

/// A single declared field of a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            editable: false,
            auto_increment: false,
            nullable: false,
            default_value: None,
        }
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// A finalized schema: collection binding, declared fields and the
/// undefined-field policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    pub name: String,
    pub connection_name: String,
    pub collection_name: String,
    pub fields: Vec<Field>,
    /// When true, writes may include keys beyond the declared fields.
    #[serde(default)]
    pub allow_undefined_fields: bool,
}

impl SchemaDefinition {
    /// The declared field names, in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

/// Field-structure input for schema registration.
///
/// Accepts either an explicit ordered [`Field`] list or compact per-field
/// descriptor strings parsed token-by-token (e.g. `"string editable"`,
/// `"int auto_increment"`). In descriptor form the sentinel key `"?field"` is
/// not itself a field; it toggles `allow_undefined_fields` for the schema.
#[derive(Debug, Clone)]
pub enum Structure {
    Fields(Vec<Field>),
    Descriptors(Vec<(String, String)>),
}

impl Structure {
    /// Resolves the input into the declared field list plus the
    /// undefined-field policy.
    fn resolve(self) -> (Vec<Field>, bool) {
        match self {
            Structure::Fields(fields) => (fields, false),
            Structure::Descriptors(pairs) => {
                let mut allow_undefined_fields = false;
                let mut fields = Vec::with_capacity(pairs.len());
                for (name, descriptor) in pairs {
                    if name == "?field" {
                        allow_undefined_fields = true;
                        continue;
                    }
                    fields.push(parse_descriptor(&name, &descriptor));
                }
                (fields, allow_undefined_fields)
            }
        }
    }
}

/// Parses one compact field descriptor such as `"int auto_increment"`.
///
/// Recognized tokens are the non-string type names (`number`, `boolean`,
/// `date`, `int`), `editable` and `auto_increment`/`autoincrement`; anything
/// else is ignored and the type defaults to string.
fn parse_descriptor(name: &str, descriptor: &str) -> Field {
    let tokens: Vec<String> = descriptor
        .split_whitespace()
        .map(|t| t.to_ascii_lowercase())
        .collect();

    let field_type = tokens
        .iter()
        .find_map(|t| match t.as_str() {
            "string" => Some(FieldType::String),
            "number" => Some(FieldType::Number),
            "boolean" => Some(FieldType::Boolean),
            "date" => Some(FieldType::Date),
            "int" => Some(FieldType::Int),
            _ => None,
        })
        .unwrap_or(FieldType::String);

    let mut field = Field::new(name, field_type);
    field.editable = tokens.iter().any(|t| t == "editable");
    field.auto_increment = tokens
        .iter()
        .any(|t| t == "auto_increment" || t == "autoincrement");
    field
}

impl From<Vec<Field>> for Structure {
    fn from(fields: Vec<Field>) -> Self {
        Structure::Fields(fields)
    }
}

impl From<&[(&str, &str)]> for Structure {
    fn from(pairs: &[(&str, &str)]) -> Self {
        Structure::Descriptors(
            pairs
                .iter()
                .map(|(name, descriptor)| (name.to_string(), descriptor.to_string()))
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Structure {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Structure::from(&pairs[..])
    }
}

/// Registry of finalized schema definitions.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, SchemaDefinition>,
    /// Registration order, for `list()`.
    order: Vec<String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins two-phase registration of a new schema.
    ///
    /// Fails with [`DataError::DuplicateName`] when the name is taken.
    pub fn create(&mut self, name: impl Into<String>) -> DataResult<SchemaBuilder<'_>> {
        let name = name.into();
        if self.schemas.contains_key(&name) {
            return Err(DataError::DuplicateName(name));
        }
        Ok(SchemaBuilder {
            registry: self,
            name,
            binding: None,
        })
    }

    /// Records a finalized definition, overwriting any prior one under the
    /// same name (re-registration is the only way to change a schema).
    pub fn register(&mut self, definition: SchemaDefinition) {
        debug!(schema = %definition.name, collection = %definition.collection_name, "registered schema");
        if !self.schemas.contains_key(&definition.name) {
            self.order.push(definition.name.clone());
        }
        self.schemas.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&SchemaDefinition> {
        self.schemas.get(name)
    }

    /// All registered definitions in insertion order.
    pub fn list(&self) -> impl Iterator<Item = &SchemaDefinition> {
        self.order.iter().filter_map(|name| self.schemas.get(name))
    }
}

/// Two-phase builder for a schema definition.
///
/// [`bind`](Self::bind) supplies the connection/collection binding;
/// [`structure`](Self::structure) supplies the fields and finalizes the
/// registration. Finalizing without a binding fails with
/// [`DataError::IncompleteSchema`].
#[derive(Debug)]
pub struct SchemaBuilder<'a> {
    registry: &'a mut SchemaRegistry,
    name: String,
    binding: Option<(String, String)>,
}

impl<'a> SchemaBuilder<'a> {
    /// Binds the schema to a connection and a collection/table within it.
    pub fn bind(mut self, connection: impl Into<String>, collection: impl Into<String>) -> Self {
        self.binding = Some((connection.into(), collection.into()));
        self
    }

    /// Supplies the field structure and finalizes the registration.
    pub fn structure(self, structure: impl Into<Structure>) -> DataResult<()> {
        let Some((connection_name, collection_name)) = self.binding else {
            return Err(DataError::IncompleteSchema(self.name));
        };
        let (fields, allow_undefined_fields) = structure.into().resolve();
        self.registry.register(SchemaDefinition {
            name: self.name,
            connection_name,
            collection_name,
            fields,
            allow_undefined_fields,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_phase_registration_requires_binding_first() {
        let mut registry = SchemaRegistry::new();

        let err = registry
            .create("users")
            .unwrap()
            .structure([("name", "string")])
            .unwrap_err();
        assert!(matches!(err, DataError::IncompleteSchema(n) if n == "users"));
        // The failed finalization must not have recorded anything.
        assert!(registry.get("users").is_none());

        registry
            .create("users")
            .unwrap()
            .bind("c1", "users")
            .structure([("name", "string editable")])
            .unwrap();

        let definition = registry.get("users").unwrap();
        assert_eq!(definition.connection_name, "c1");
        assert_eq!(definition.collection_name, "users");
        assert!(registry.list().any(|s| s.name == "users"));
    }

    #[test]
    fn create_rejects_duplicate_names() {
        let mut registry = SchemaRegistry::new();
        registry
            .create("users")
            .unwrap()
            .bind("c1", "users")
            .structure(Vec::<Field>::new())
            .unwrap();

        let err = registry.create("users").unwrap_err();
        assert!(matches!(err, DataError::DuplicateName(n) if n == "users"));
    }

    #[test]
    fn reregistration_overwrites_in_place() {
        let mut registry = SchemaRegistry::new();
        registry.register(SchemaDefinition {
            name: "users".into(),
            connection_name: "c1".into(),
            collection_name: "users".into(),
            fields: vec![],
            allow_undefined_fields: false,
        });
        registry.register(SchemaDefinition {
            name: "users".into(),
            connection_name: "c2".into(),
            collection_name: "accounts".into(),
            fields: vec![],
            allow_undefined_fields: true,
        });

        let definition = registry.get("users").unwrap();
        assert_eq!(definition.connection_name, "c2");
        assert_eq!(registry.list().count(), 1);
    }

    #[test]
    fn descriptor_strings_parse_token_by_token() {
        let (fields, allow) = Structure::from([
            ("id", "int auto_increment"),
            ("name", "string editable"),
            ("score", "NUMBER"),
            ("created", "date"),
            ("misc", "editable bogus_token"),
        ])
        .resolve();

        assert!(!allow);
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0].field_type, FieldType::Int);
        assert!(fields[0].auto_increment);
        assert!(!fields[0].editable);
        assert_eq!(fields[1].field_type, FieldType::String);
        assert!(fields[1].editable);
        assert_eq!(fields[2].field_type, FieldType::Number);
        assert_eq!(fields[3].field_type, FieldType::Date);
        // Unknown tokens are ignored and the type defaults to string.
        assert_eq!(fields[4].field_type, FieldType::String);
        assert!(fields[4].editable);
    }

    #[test]
    fn question_field_sentinel_toggles_undefined_field_policy() {
        let (fields, allow) = Structure::from([
            ("name", "string"),
            ("?field", ""),
        ])
        .resolve();

        assert!(allow);
        // The sentinel is not a field.
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "name");
    }

    #[test]
    fn explicit_field_lists_default_to_strict_policy() {
        let (fields, allow) = Structure::from(vec![
            Field::new("id", FieldType::Int).auto_increment(),
            Field::new("name", FieldType::String).editable(),
        ])
        .resolve();

        assert!(!allow);
        assert_eq!(fields.len(), 2);
    }
}
