//! Item templates and the factory that instantiates them.
//!
//! Templates are authored as JSON and keyed by item name. Every instance the
//! factory hands out carries a fresh [`RuntimeId`], including the partial
//! stacks created when a stack is split.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::{GridSize, Item, RuntimeId, ShapeMask};

/// Errors emitted while loading or instantiating templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Wrap IO errors when reading template files.
    #[error("failed to read item templates: {0}")]
    Io(#[from] std::io::Error),
    /// Wrap serde parsing issues.
    #[error("failed to parse item templates: {0}")]
    Parse(#[from] serde_json::Error),
    /// Template declares a non-positive extent.
    #[error("template '{name}' has invalid size {width}x{height}")]
    InvalidSize {
        /// Offending template.
        name: String,
        /// Declared width.
        width: i32,
        /// Declared height.
        height: i32,
    },
    /// Mask rows disagree with the declared size or occupy nothing.
    #[error("template '{0}' has an invalid shape mask")]
    InvalidShape(String),
    /// Two templates share a name.
    #[error("duplicate template '{0}'")]
    Duplicate(String),
    /// No template with this name.
    #[error("unknown item template '{0}'")]
    Unknown(String),
}

/// Authoring description of an item kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemTemplate {
    /// Stacking identity key.
    pub name: String,
    /// Authoring width in cells.
    pub width: i32,
    /// Authoring height in cells.
    pub height: i32,
    /// Optional irregular footprint, top row first.
    #[serde(default)]
    pub shape: Option<Vec<String>>,
    /// Whether instances merge with each other.
    #[serde(default)]
    pub stackable: bool,
    /// Stack capacity (ignored unless stackable).
    #[serde(default = "default_max_quantity")]
    pub max_quantity: u32,
    /// Whether instances may be dropped into the world.
    #[serde(default = "default_can_drop")]
    pub can_drop: bool,
}

fn default_max_quantity() -> u32 {
    1
}

fn default_can_drop() -> bool {
    true
}

impl ItemTemplate {
    /// A plain rectangular template.
    pub fn rect(name: impl Into<String>, width: i32, height: i32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            shape: None,
            stackable: false,
            max_quantity: 1,
            can_drop: true,
        }
    }

    /// Make the template stackable up to `max_quantity`.
    pub fn stacking(mut self, max_quantity: u32) -> Self {
        self.stackable = true;
        self.max_quantity = max_quantity;
        self
    }

    fn validate(&self) -> Result<(), TemplateError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(TemplateError::InvalidSize {
                name: self.name.clone(),
                width: self.width,
                height: self.height,
            });
        }
        if self.shape.is_some() && self.mask()?.size() != GridSize::new(self.width, self.height) {
            return Err(TemplateError::InvalidShape(self.name.clone()));
        }
        Ok(())
    }

    fn mask(&self) -> Result<ShapeMask, TemplateError> {
        match &self.shape {
            None => Ok(ShapeMask::full(GridSize::new(self.width, self.height))),
            Some(rows) => ShapeMask::from_rows(rows)
                .ok_or_else(|| TemplateError::InvalidShape(self.name.clone())),
        }
    }
}

/// Clones templates into items with unique runtime IDs.
#[derive(Debug, Clone, Default)]
pub struct ItemFactory {
    templates: BTreeMap<String, ItemTemplate>,
    next_id: u64,
}

impl ItemFactory {
    /// Create a factory from validated templates.
    pub fn new(templates: Vec<ItemTemplate>) -> Result<Self, TemplateError> {
        let mut map = BTreeMap::new();
        for template in templates {
            template.validate()?;
            if map.contains_key(&template.name) {
                return Err(TemplateError::Duplicate(template.name));
            }
            map.insert(template.name.clone(), template);
        }
        Ok(Self {
            templates: map,
            next_id: 1,
        })
    }

    /// Load templates from the provided JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let data = fs::read_to_string(path)?;
        data.parse()
    }

    /// Look up a template by item name.
    pub fn template(&self, name: &str) -> Option<&ItemTemplate> {
        self.templates.get(name)
    }

    /// Template names in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Reserve a fresh runtime ID.
    pub fn allocate_id(&mut self) -> RuntimeId {
        let id = RuntimeId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        id
    }

    /// Instantiate `name` with `quantity` units (clamped to the template capacity).
    pub fn spawn(&mut self, name: &str, quantity: u32) -> Result<Item, TemplateError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::Unknown(name.to_string()))?;
        let mask = template.mask()?;
        let stackable = template.stackable;
        let max_quantity = template.max_quantity;
        let can_drop = template.can_drop;
        let item_name = template.name.clone();

        let id = self.allocate_id();
        let mut item = Item::new(id, item_name, mask.size())
            .with_shape(mask)
            .with_can_drop(can_drop);
        if stackable {
            item = item.with_stack(quantity.max(1), max_quantity);
        }
        Ok(item)
    }
}

impl FromStr for ItemFactory {
    type Err = TemplateError;

    /// Load templates from an in-memory JSON array.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let templates: Vec<ItemTemplate> = serde_json::from_str(input)?;
        Self::new(templates)
    }
}
