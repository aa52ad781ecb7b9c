use anyhow::{Context, Result};
use gridstash_core::{ItemFactory, ItemTemplate};
use gridstash_inventory::{
    CellLayout, Container, ContainerId, GridPoint, GridSize, InventoryContext, MemoryStore,
    RenderMode, StorePolicy,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/gridstash.toml";
const DEFAULT_TEMPLATES_PATH: &str = "config/items.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    pub containers: Vec<ContainerConfig>,
    /// JSON array of item templates.
    pub templates_path: PathBuf,
    /// Pointer travel in pixels before a press becomes a drag.
    pub drag_threshold_px: f32,
    pub layout: CellLayout,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContainerConfig {
    pub name: String,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub render_mode: RenderMode,
    /// Maximum stored item count (`None` means unbounded).
    #[serde(default)]
    pub capacity: Option<usize>,
    #[serde(default = "default_true")]
    pub allow_remove: bool,
    #[serde(default = "default_true")]
    pub allow_drop: bool,
    #[serde(default)]
    pub items: Vec<SeedItem>,
}

/// An item spawned into a container at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedItem {
    pub template: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Anchor; both coordinates must be set, otherwise the item goes to the first free spot.
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    #[serde(default)]
    pub rotated: bool,
}

fn default_true() -> bool {
    true
}

fn default_quantity() -> u32 {
    1
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            containers: vec![
                ContainerConfig::grid("backpack", 6, 4),
                ContainerConfig::grid("stash", 8, 6),
                ContainerConfig {
                    render_mode: RenderMode::Single,
                    ..ContainerConfig::grid("head", 2, 2)
                },
            ],
            templates_path: PathBuf::from(DEFAULT_TEMPLATES_PATH),
            drag_threshold_px: 6.0,
            layout: CellLayout::default(),
        }
    }
}

impl ContainerConfig {
    fn grid(name: &str, width: i32, height: i32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            render_mode: RenderMode::Grid,
            capacity: None,
            allow_remove: true,
            allow_drop: true,
            items: Vec::new(),
        }
    }

    fn store(&self) -> MemoryStore {
        let mut store = MemoryStore::new(self.render_mode).with_policy(StorePolicy {
            allow_remove: self.allow_remove,
            allow_drop: self.allow_drop,
            ..StorePolicy::default()
        });
        if let Some(capacity) = self.capacity {
            store = store.with_capacity(capacity);
        }
        store
    }
}

impl DemoConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<DemoConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    DemoConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH) || err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!("Config not found at {}. Using defaults", path.display());
                }
                DemoConfig::default()
            }
        }
    }
}

/// Load item templates, falling back to the built-in set if the file is unusable.
pub fn load_item_factory(path: &Path) -> ItemFactory {
    match ItemFactory::from_file(path) {
        Ok(factory) => factory,
        Err(err) => {
            warn!("Failed to load item templates {}: {err}. Using defaults", path.display());
            default_item_factory()
        }
    }
}

fn default_item_factory() -> ItemFactory {
    let mut boomerang = ItemTemplate::rect("Boomerang", 2, 2);
    boomerang.shape = Some(vec!["##".to_string(), "#.".to_string()]);
    let mut keycard = ItemTemplate::rect("Keycard", 1, 1);
    keycard.can_drop = false;

    let templates = vec![
        ItemTemplate::rect("Ammo", 1, 1).stacking(30),
        ItemTemplate::rect("Rifle", 1, 4),
        ItemTemplate::rect("Medkit", 2, 2),
        ItemTemplate::rect("Helmet", 2, 2),
        boomerang,
        keycard,
    ];
    ItemFactory::new(templates).unwrap_or_default()
}

/// Build every configured container and spawn its seed items.
///
/// Seeds that cannot be placed are skipped with a warning.
pub fn build_context(config: &DemoConfig, factory: &mut ItemFactory) -> Result<InventoryContext> {
    let mut ctx = InventoryContext::new();
    for entry in &config.containers {
        if entry.width <= 0 || entry.height <= 0 {
            anyhow::bail!(
                "container '{}' has invalid size {}x{}",
                entry.name,
                entry.width,
                entry.height
            );
        }
        let container = Container::new(
            entry.name.clone(),
            GridSize::new(entry.width, entry.height),
            entry.store(),
        );
        let id = ctx.add_container(container);
        for seed in &entry.items {
            seed_item(&mut ctx, id, seed, factory)
                .with_context(|| format!("failed to seed container '{}'", entry.name))?;
        }
        debug!(container = %entry.name, %id, "container ready");
    }
    // Seeding is setup, not interaction.
    ctx.drain_events();
    Ok(ctx)
}

fn seed_item(
    ctx: &mut InventoryContext,
    id: ContainerId,
    seed: &SeedItem,
    factory: &mut ItemFactory,
) -> Result<()> {
    let mut item = factory
        .spawn(&seed.template, seed.quantity)
        .with_context(|| format!("unknown seed template '{}'", seed.template))?;
    if seed.rotated {
        item.rotate();
    }
    let Some(container) = ctx.container_mut(id) else {
        anyhow::bail!("container {id} vanished while seeding");
    };
    let result = match (seed.x, seed.y) {
        (Some(x), Some(y)) => container.try_add_at(item, GridPoint::new(x, y)).map(|_| ()),
        _ => container.try_add(item).map(|_| ()),
    };
    if let Err(rejected) = result {
        warn!(
            container = %container.name(),
            template = %seed.template,
            reason = %rejected.reason,
            "seed item skipped"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("gridstash_{name}_{timestamp}"))
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = DemoConfig::load_from_path(&temp_path("missing.toml"));
        assert_eq!(config.containers.len(), 3);
        assert_eq!(config.containers[2].render_mode, RenderMode::Single);
        assert_eq!(config.drag_threshold_px, 6.0);
    }

    #[test]
    fn toml_overrides_containers_and_layout() {
        let path = temp_path("config.toml");
        fs::write(
            &path,
            r#"
drag_threshold_px = 3.0
templates_path = "items.json"

[layout]
cell_width_px = 32.0
cell_height_px = 48.0

[[containers]]
name = "belt"
width = 4
height = 1
allow_drop = false

[[containers.items]]
template = "Ammo"
quantity = 12
x = 0
y = 0
"#,
        )
        .expect("write config");

        let config = DemoConfig::load_from_path(&path);
        assert_eq!(config.drag_threshold_px, 3.0);
        assert_eq!(config.layout.cell_height_px, 48.0);
        assert_eq!(config.containers.len(), 1);
        let belt = &config.containers[0];
        assert!(!belt.allow_drop);
        assert!(belt.allow_remove);
        assert_eq!(belt.render_mode, RenderMode::Grid);
        assert_eq!(belt.items[0].quantity, 12);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn invalid_toml_falls_back_to_defaults() {
        let path = temp_path("broken.toml");
        fs::write(&path, "containers = 7").expect("write config");
        let config = DemoConfig::load_from_path(&path);
        assert_eq!(config.containers.len(), 3);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn builtin_templates_cover_demo_items() {
        let factory = load_item_factory(&temp_path("missing.json"));
        let names: Vec<_> = factory.names().collect();
        assert!(names.contains(&"Ammo"));
        assert!(names.contains(&"Boomerang"));
        assert!(!factory.template("Keycard").expect("keycard").can_drop);
    }

    #[test]
    fn seeds_are_placed_and_overflow_is_skipped() {
        let mut config = DemoConfig::default();
        config.containers = vec![ContainerConfig::grid("belt", 2, 1)];
        config.containers[0].items = vec![
            SeedItem {
                template: "Medkit".to_string(),
                quantity: 1,
                x: None,
                y: None,
                rotated: false,
            },
            SeedItem {
                template: "Ammo".to_string(),
                quantity: 40,
                x: Some(1),
                y: Some(0),
                rotated: false,
            },
        ];
        let mut factory = default_item_factory();
        let mut ctx = build_context(&config, &mut factory).expect("context builds");
        let belt = ctx.find_container("belt").expect("belt registered");
        let container = ctx.container(belt).expect("belt present");
        assert_eq!(container.items().len(), 1);
        assert_eq!(container.total_quantity("Ammo"), 30);
        assert!(ctx.drain_events().is_empty());
    }

    #[test]
    fn unknown_seed_template_is_an_error() {
        let mut config = DemoConfig::default();
        config.containers[0].items.push(SeedItem {
            template: "Nope".to_string(),
            quantity: 1,
            x: None,
            y: None,
            rotated: false,
        });
        let mut factory = default_item_factory();
        assert!(build_context(&config, &mut factory).is_err());
    }
}
