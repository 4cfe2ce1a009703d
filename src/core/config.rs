//! Declarative resource layouts
//!
//! A [`Layout`] lists the resources a store should carry, with optional
//! names and initial values, so a process can describe its table in a TOML
//! or JSON file instead of a sequence of registration calls:
//!
//! ```toml
//! [[resource]]
//! id = 0
//! name = "temperature"
//! type = "float"
//! instances = 4
//! initial = [21.5, 21.5]
//!
//! [[resource]]
//! id = 1
//! name = "ssid"
//! type = "string"
//! instances = 1
//! width = 33
//! ```

use crate::core::datastore::Datastore;
use crate::core::error::DatastoreError;
use crate::core::types::{ResourceId, ResourceType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid layout: {0}")]
    Invalid(String),

    #[error("Datastore error: {0}")]
    Store(#[from] DatastoreError),
}

/// Initial value of one instance, written through [`Datastore::set_from_string`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitialValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for InitialValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialValue::Bool(v) => write!(f, "{}", v),
            InitialValue::Integer(v) => write!(f, "{}", v),
            InitialValue::Float(v) => write!(f, "{}", v),
            InitialValue::Text(v) => f.write_str(v),
        }
    }
}

/// One resource of a [`Layout`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub id: ResourceId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub resource_type: ResourceType,

    pub instances: u32,

    /// Slot width of a string resource, terminator included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,

    /// Values for the first instances, in instance order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial: Vec<InitialValue>,
}

impl ResourceSpec {
    pub fn new(id: ResourceId, resource_type: ResourceType, instances: u32) -> Self {
        ResourceSpec {
            id,
            name: None,
            resource_type,
            instances,
            width: None,
            initial: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_initial(mut self, value: InitialValue) -> Self {
        self.initial.push(value);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.id < 0 {
            return Err(ConfigError::Invalid(format!("resource ID {} is negative", self.id)));
        }
        if self.instances == 0 {
            return Err(ConfigError::Invalid(format!(
                "resource {} has no instances",
                self.id
            )));
        }
        match (self.resource_type, self.width) {
            (ResourceType::String, None) | (ResourceType::String, Some(0)) => {
                return Err(ConfigError::Invalid(format!(
                    "string resource {} needs a non-zero width",
                    self.id
                )));
            }
            (ResourceType::String, Some(_)) | (_, None) => {}
            (ty, Some(_)) => {
                return Err(ConfigError::Invalid(format!(
                    "{} resource {} cannot set a width",
                    ty, self.id
                )));
            }
        }
        if self.initial.len() > self.instances as usize {
            return Err(ConfigError::Invalid(format!(
                "resource {} has {} initial values for {} instances",
                self.id,
                self.initial.len(),
                self.instances
            )));
        }
        Ok(())
    }
}

/// Resources to register on a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(rename = "resource", default)]
    pub resources: Vec<ResourceSpec>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, resource: ResourceSpec) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let layout: Layout = toml::from_str(text)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let layout: Layout = serde_json::from_str(text)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a layout file, picking the format from its extension (`.toml` or `.json`)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("loading layout from {}", path.display());
        let text = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(ConfigError::Invalid(format!(
                "{}: unknown layout format",
                path.display()
            ))),
        }
    }

    /// Check every entry and that no id is declared twice
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for resource in &self.resources {
            resource.validate()?;
            if !seen.insert(resource.id) {
                return Err(ConfigError::Invalid(format!(
                    "resource ID {} is declared twice",
                    resource.id
                )));
            }
        }
        Ok(())
    }

    /// Register every resource on `store`, then name it and write its initial values
    ///
    /// Stops at the first failure; resources registered before it stay registered.
    pub fn apply(&self, store: &Datastore<'_>) -> Result<(), ConfigError> {
        self.validate()?;
        for resource in &self.resources {
            match resource.width {
                Some(width) => {
                    store.add_string_resource(resource.id, resource.instances, width)?
                }
                None => store.add_fixed_length_resource(
                    resource.id,
                    resource.resource_type,
                    resource.instances,
                )?,
            }
            if let Some(name) = &resource.name {
                store.set_name(resource.id, Some(name.as_str()))?;
            }
            for (instance, value) in (0..).zip(&resource.initial) {
                store.set_from_string(resource.id, instance, &value.to_string())?;
            }
        }
        info!("applied layout with {} resources", self.resources.len());
        Ok(())
    }
}
