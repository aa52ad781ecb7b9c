use gridstash_inventory::{
    Container, GridPoint, GridSize, Hover, InventoryContext, Item, MemoryStore,
    RenderMode, RuntimeId,
};
use gridstash_testkit::{assert_grid_invariants, EventRecord, JsonlSink};
use std::fs;
use std::path::PathBuf;

#[test]
fn drained_events_can_be_written_as_jsonl() {
    let path = std::env::temp_dir().join("gridstash_smoke_events.jsonl");
    let mut sink = JsonlSink::create(&path).expect("can create temp log");

    let mut ctx = InventoryContext::new();
    let bag = ctx.add_container(Container::new(
        "bag",
        GridSize::new(3, 3),
        MemoryStore::new(RenderMode::Grid),
    ));
    ctx.container_mut(bag)
        .unwrap()
        .try_add(Item::new(RuntimeId(1), "Pebble", GridSize::new(1, 1)))
        .expect("first fit");
    ctx.begin_drag(bag, GridPoint::new(0, 2)).expect("drag starts");
    ctx.end_drag(Some(Hover::new(bag, GridPoint::new(2, 0))))
        .expect("drop resolves");

    let events = ctx.drain_events();
    assert!(!events.is_empty());
    for (step, (_, event)) in events.iter().enumerate() {
        sink.write(&EventRecord {
            step: step as u64,
            kind: event.kind(),
            payload: event,
        })
        .expect("can write event");
    }
    assert_eq!(sink.written(), events.len());
    drop(sink);

    let contents = fs::read_to_string(&path).expect("log readable");
    assert!(contents.lines().any(|line| line.contains("\"kind\":\"ItemAdded\"")));
    let bag = ctx.container(bag).unwrap();
    assert_eq!(bag.items()[0].position, GridPoint::new(2, 0));
    assert_grid_invariants(bag.items(), bag.size()).expect("grid stays valid");
}

#[test]
fn shipped_config_and_templates_parse() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let config = fs::read_to_string(root.join("config/gridstash.toml")).expect("config present");
    let value: toml::Value = toml::from_str(&config).expect("config is valid toml");
    let containers = value
        .get("containers")
        .and_then(|c| c.as_array())
        .expect("containers table");
    assert!(containers.len() >= 3);

    let factory = gridstash_core::ItemFactory::from_file(&root.join("config/items.json"))
        .expect("templates load");
    assert!(factory.template("Ammo").is_some_and(|t| t.stackable));

    let script = fs::read_to_string(root.join("demos/drag_demo.json")).expect("demo present");
    let parsed: serde_json::Value = serde_json::from_str(&script).expect("demo is json");
    assert!(parsed["steps"].as_array().is_some_and(|steps| !steps.is_empty()));
}
