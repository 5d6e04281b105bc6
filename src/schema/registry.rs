//! # Type Registry
//!
//! The codec does not own class definitions. It asks a [`TypeRegistry`] two
//! questions: "what is property `name` of class `C`?" when encoding, and
//! "which property has id `n`?" when decoding a slot written by id.
//!
//! ## Global Property Ids
//!
//! Property ids live in one namespace shared by all classes, like a global
//! property table: a property with the same name and type declared on two
//! classes gets the same id. That lets a decoder resolve a slot from its id
//! alone, without knowing which class wrote it.
//!
//! ## In-Memory Registry
//!
//! [`SchemaRegistry`] is the implementation used by embedders without a
//! catalog and by the tests. Classes may extend one superclass; property
//! lookup walks the superclass chain.
//!
//! ```ignore
//! let mut schema = SchemaRegistry::new();
//! schema.create_class("Person")?;
//! let id = schema.create_property("Person", "name", FieldType::String)?;
//! schema.set_collate(id, "ci")?;
//! ```

use std::fmt::Debug;

use eyre::{bail, ensure, eyre, Result};
use hashbrown::HashMap;

use crate::records::Record;
use crate::types::{FieldType, RecordId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub id: i32,
    pub name: String,
    pub field_type: FieldType,
    pub linked_type: Option<FieldType>,
    pub collate: Option<String>,
}

impl PropertyDef {
    /// True when the property fixes the type of the values stored in it.
    pub fn has_fixed_type(&self) -> bool {
        self.field_type != FieldType::Any
    }
}

pub trait TypeRegistry: Debug + Send + Sync {
    fn property(&self, class_name: &str, name: &str) -> Option<&PropertyDef>;

    fn property_by_id(&self, id: i32) -> Option<&PropertyDef>;
}

/// Loads records referenced by a link.
pub trait RecordResolver {
    fn resolve(&self, rid: RecordId) -> Option<Record>;
}

impl RecordResolver for HashMap<RecordId, Record> {
    fn resolve(&self, rid: RecordId) -> Option<Record> {
        self.get(&rid).cloned()
    }
}

#[derive(Debug, Clone, Default)]
struct ClassDef {
    superclass: Option<String>,
    properties: HashMap<String, i32>,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    classes: HashMap<String, ClassDef>,
    properties: Vec<PropertyDef>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_class(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        ensure!(
            !self.classes.contains_key(&name),
            "class '{}' already exists",
            name
        );
        self.classes.insert(name, ClassDef::default());
        Ok(())
    }

    pub fn create_class_extending(
        &mut self,
        name: impl Into<String>,
        superclass: &str,
    ) -> Result<()> {
        ensure!(
            self.classes.contains_key(superclass),
            "superclass '{}' not found",
            superclass
        );
        let name = name.into();
        self.create_class(name.clone())?;
        if let Some(class) = self.classes.get_mut(&name) {
            class.superclass = Some(superclass.to_string());
        }
        Ok(())
    }

    pub fn class_exists(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Declares a property on `class_name` and returns its global id.
    pub fn create_property(
        &mut self,
        class_name: &str,
        name: impl Into<String>,
        field_type: FieldType,
    ) -> Result<i32> {
        let name = name.into();
        ensure!(
            field_type != FieldType::Null,
            "property '{}' cannot be declared NULL",
            name
        );
        let Some(class) = self.classes.get(class_name) else {
            bail!("class '{}' not found", class_name);
        };
        ensure!(
            !class.properties.contains_key(&name),
            "property '{}.{}' already exists",
            class_name,
            name
        );

        let id = match self
            .properties
            .iter()
            .find(|p| p.name == name && p.field_type == field_type)
        {
            Some(existing) => existing.id,
            None => {
                let id = i32::try_from(self.properties.len())?;
                self.properties.push(PropertyDef {
                    id,
                    name: name.clone(),
                    field_type,
                    linked_type: None,
                    collate: None,
                });
                id
            }
        };

        if let Some(class) = self.classes.get_mut(class_name) {
            class.properties.insert(name, id);
        }
        Ok(id)
    }

    fn property_mut(&mut self, id: i32) -> Result<&mut PropertyDef> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.properties.get_mut(idx))
            .ok_or_else(|| eyre!("property id {} not found", id))
    }

    pub fn set_collate(&mut self, id: i32, collate: impl Into<String>) -> Result<()> {
        self.property_mut(id)?.collate = Some(collate.into());
        Ok(())
    }

    pub fn set_linked_type(&mut self, id: i32, linked_type: FieldType) -> Result<()> {
        self.property_mut(id)?.linked_type = Some(linked_type);
        Ok(())
    }
}

impl TypeRegistry for SchemaRegistry {
    fn property(&self, class_name: &str, name: &str) -> Option<&PropertyDef> {
        let mut current = Some(class_name);
        // Bounded by the class count so a superclass cycle cannot hang.
        for _ in 0..=self.classes.len() {
            let class = self.classes.get(current?)?;
            if let Some(&id) = class.properties.get(name) {
                return self.property_by_id(id);
            }
            current = class.superclass.as_deref();
        }
        None
    }

    fn property_by_id(&self, id: i32) -> Option<&PropertyDef> {
        usize::try_from(id).ok().and_then(|idx| self.properties.get(idx))
    }
}
