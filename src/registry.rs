use crate::internals::Internals;
use crate::schema::{Schema, SchemaId};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Descriptive metadata attached to a schema.
///
/// ```
/// use vetted::Meta;
/// use serde_json::json;
///
/// assert_eq!(
///     Meta { title: Some("User".to_owned()), ..Default::default() },
///     serde_json::from_value::<Meta>(json!({ "title": "User" })).unwrap()
/// )
/// ```
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug)]
struct Entry {
    owner: Weak<Internals>,
    meta: Meta,
}

impl Entry {
    fn belongs_to(&self, schema: &Schema) -> bool {
        self.owner
            .upgrade()
            .map_or(false, |owner| Arc::ptr_eq(&owner, schema.internals_arc()))
    }
}

/// Schema metadata keyed by schema identity. Nothing here is consulted
/// while parsing.
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<HashMap<SchemaId, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `meta` to `schema`, replacing what was there.
    pub fn add(&self, schema: &Schema, meta: Meta) {
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.owner.strong_count() > 0);
        debug!(id = ?schema.id(), kind = %schema.type_tag(), "registering schema metadata");
        entries.insert(
            schema.id(),
            Entry {
                owner: Arc::downgrade(schema.internals_arc()),
                meta,
            },
        );
    }

    /// Copies any metadata held for `from` onto `to`.
    pub(crate) fn inherit(&self, from: &Schema, to: &Schema) {
        if let Some(meta) = self.get(from) {
            self.add(to, meta);
        }
    }

    pub fn get(&self, schema: &Schema) -> Option<Meta> {
        self.entries
            .read()
            .get(&schema.id())
            .filter(|entry| entry.belongs_to(schema))
            .map(|entry| entry.meta.clone())
    }

    pub fn has(&self, schema: &Schema) -> bool {
        self.entries
            .read()
            .get(&schema.id())
            .map_or(false, |entry| entry.belongs_to(schema))
    }

    pub fn remove(&self, schema: &Schema) -> Option<Meta> {
        let mut entries = self.entries.write();
        match entries.get(&schema.id()) {
            Some(entry) if entry.belongs_to(schema) => {
                debug!(id = ?schema.id(), "removing schema metadata");
                entries.remove(&schema.id()).map(|entry| entry.meta)
            }
            _ => None,
        }
    }

    /// The number of entries whose schema is still alive.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|entry| entry.owner.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// The process-wide registry used by [`Schema::meta`] and
/// [`Schema::describe`].
pub fn global() -> &'static Registry {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::string;
    use serde_json::json;

    #[test]
    fn add_get_remove() {
        let registry = Registry::new();
        let schema = string();
        let meta = Meta {
            title: Some("Name".to_owned()),
            ..Default::default()
        };

        assert!(!registry.has(&schema));
        registry.add(&schema, meta.clone());
        assert!(registry.has(&schema));
        assert_eq!(Some(meta.clone()), registry.get(&schema));
        assert_eq!(Some(meta.clone()), registry.get(&schema.clone()));
        assert_eq!(None, registry.get(&schema.optional()));

        assert_eq!(Some(meta), registry.remove(&schema));
        assert!(registry.is_empty());
    }

    #[test]
    fn dropped_schemas_are_forgotten() {
        let registry = Registry::new();
        registry.add(&string(), Meta::default());
        assert_eq!(0, registry.len());

        let kept = string();
        registry.add(&kept, Meta::default());
        assert_eq!(1, registry.len());
    }

    #[test]
    fn describe_registers_globally() {
        let base = string();
        let described = base.describe("A name");
        assert_eq!(Some("A name".to_owned()), described.description());
        assert_eq!(None, base.description());
        assert!(global().has(&described));
    }

    #[test]
    fn derived_schemas_inherit_global_metadata() {
        let described = string().describe("A name");
        assert_eq!(Some("A name".to_owned()), described.min(1).description());
        assert_eq!(Some("A name".to_owned()), described.optional().description());
        assert_eq!(None, string().min(1).description());
    }

    #[test]
    fn meta_serializes_in_camel_case() {
        let mut meta = Meta {
            description: Some("d".to_owned()),
            deprecated: Some(true),
            ..Default::default()
        };
        meta.extra.insert("xLabel".to_owned(), json!("x"));
        assert_eq!(
            json!({"description": "d", "deprecated": true, "xLabel": "x"}),
            serde_json::to_value(&meta).unwrap()
        );
    }
}
