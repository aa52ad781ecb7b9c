use anyhow::{Context, Result};
use gridstash_core::{GridPoint, ItemFactory};
use gridstash_inventory::{
    exceeds_drag_threshold, CellLayout, ContainerEvent, ContainerId, DragError, DragOutcome,
    Hover, InventoryContext, Item,
};
use gridstash_testkit::{EventRecord, JsonlSink};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct DragScriptFile {
    steps: Vec<DragStep>,
}

/// One scripted interaction.
///
/// Cell steps (`begin`, `hover`) address grid cells directly. Pointer steps
/// (`press`, `move`) use centre-relative pixel coordinates and go through
/// the cell layout and drag threshold. `release` drops at the last hover.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DragStep {
    Begin {
        container: String,
        x: i32,
        y: i32,
    },
    Hover {
        #[serde(default)]
        container: Option<String>,
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
    },
    Press {
        container: String,
        px: f32,
        py: f32,
    },
    Move {
        #[serde(default)]
        container: Option<String>,
        px: f32,
        py: f32,
    },
    Rotate,
    Release,
    Cancel,
    Spawn {
        container: String,
        template: String,
        #[serde(default = "one")]
        quantity: u32,
    },
    Split {
        container: String,
        x: i32,
        y: i32,
        amount: u32,
    },
    Consume {
        container: String,
        x: i32,
        y: i32,
        amount: u32,
    },
}

fn one() -> u32 {
    1
}

/// Parsed list of drag steps.
#[derive(Debug, Clone)]
pub struct DragScript {
    steps: Vec<DragStep>,
}

impl DragScript {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self> {
        let file: DragScriptFile = serde_json::from_str(contents)?;
        if file.steps.is_empty() {
            anyhow::bail!("drag script contains no steps");
        }
        Ok(Self { steps: file.steps })
    }

    pub fn steps(&self) -> &[DragStep] {
        &self.steps
    }
}

#[derive(Debug, Serialize)]
struct LoggedEvent<'a> {
    container: &'a str,
    event: &'a ContainerEvent,
}

/// Totals collected while replaying a script.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub steps: u64,
    pub outcomes: Vec<&'static str>,
    pub dropped: Vec<Item>,
    pub stranded: Vec<Item>,
    pub events: usize,
}

struct PendingPress {
    container: ContainerId,
    origin_px: (f32, f32),
}

/// Replays drag scripts against an [`InventoryContext`].
pub struct DragScriptRunner {
    ctx: InventoryContext,
    factory: ItemFactory,
    layout: CellLayout,
    threshold_px: f32,
    press: Option<PendingPress>,
}

impl DragScriptRunner {
    pub fn new(
        ctx: InventoryContext,
        factory: ItemFactory,
        layout: CellLayout,
        threshold_px: f32,
    ) -> Self {
        Self {
            ctx,
            factory,
            layout,
            threshold_px,
            press: None,
        }
    }

    pub fn context(&self) -> &InventoryContext {
        &self.ctx
    }

    /// Run every step, writing drained container events to `sink`.
    pub fn run(&mut self, script: &DragScript, mut sink: Option<&mut JsonlSink>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for (index, step) in script.steps().iter().enumerate() {
            let step_no = index as u64 + 1;
            summary.steps = step_no;
            match self.apply(step) {
                Ok(Some(outcome)) => {
                    info!(step = step_no, outcome = outcome.kind(), "drag resolved");
                    summary.outcomes.push(outcome.kind());
                    if let DragOutcome::Dropped { item } = outcome {
                        summary.dropped.push(item);
                    }
                }
                Ok(None) => {}
                Err(StepError::Drag(DragError::Stranded(item))) => {
                    warn!(step = step_no, item = %item.item_name, "item stranded outside every container");
                    summary.stranded.push(*item);
                }
                Err(StepError::Drag(err)) => {
                    warn!(step = step_no, %err, "drag step ignored");
                }
                Err(StepError::Other(err)) => {
                    warn!(step = step_no, "step failed: {err:#}");
                }
            }

            for (id, event) in self.ctx.drain_events() {
                summary.events += 1;
                if let Some(sink) = sink.as_deref_mut() {
                    let container = self
                        .ctx
                        .container(id)
                        .map(|c| c.name().to_string())
                        .unwrap_or_else(|| id.to_string());
                    let payload = LoggedEvent {
                        container: &container,
                        event: &event,
                    };
                    sink.write(&EventRecord {
                        step: step_no,
                        kind: event.kind(),
                        payload: &payload,
                    })
                    .context("failed to write event record")?;
                }
            }
        }
        Ok(summary)
    }

    fn apply(&mut self, step: &DragStep) -> Result<Option<DragOutcome>, StepError> {
        match step {
            DragStep::Begin { container, x, y } => {
                let id = self.lookup(container)?;
                self.ctx.begin_drag(id, GridPoint::new(*x, *y))?;
                Ok(None)
            }
            DragStep::Hover { container, x, y } => {
                let hover = match container {
                    Some(name) => Some(Hover::new(self.lookup(name)?, GridPoint::new(*x, *y))),
                    None => None,
                };
                self.ctx.update_drag(hover)?;
                Ok(None)
            }
            DragStep::Press { container, px, py } => {
                let id = self.lookup(container)?;
                self.press = Some(PendingPress {
                    container: id,
                    origin_px: (*px, *py),
                });
                Ok(None)
            }
            DragStep::Move { container, px, py } => {
                self.pointer_moved(container.as_deref(), (*px, *py))?;
                Ok(None)
            }
            DragStep::Rotate => {
                self.ctx.rotate_held()?;
                Ok(None)
            }
            DragStep::Release => {
                self.press = None;
                let hover = self.ctx.session().and_then(|session| session.hover());
                Ok(Some(self.ctx.end_drag(hover)?))
            }
            DragStep::Cancel => {
                self.press = None;
                Ok(Some(self.ctx.cancel_drag()?))
            }
            DragStep::Spawn {
                container,
                template,
                quantity,
            } => {
                let id = self.lookup(container)?;
                let item = self.factory.spawn(template, *quantity).map_err(anyhow::Error::from)?;
                let target = self.container_mut(id)?;
                if let Err(rejected) = target.try_add(item) {
                    return Err(StepError::Other(anyhow::Error::from(rejected)));
                }
                Ok(None)
            }
            DragStep::Split {
                container,
                x,
                y,
                amount,
            } => {
                let id = self.lookup(container)?;
                let point = GridPoint::new(*x, *y);
                let Some(container) = self.ctx.container_mut(id) else {
                    return Err(StepError::Drag(DragError::UnknownContainer(id)));
                };
                let stack = container
                    .get_at_point(point)
                    .map(|item| item.runtime_id)
                    .ok_or(DragError::NothingAtPoint { container: id, point })?;
                container
                    .split_stack(stack, *amount, &mut self.factory)
                    .map_err(anyhow::Error::from)?;
                Ok(None)
            }
            DragStep::Consume {
                container,
                x,
                y,
                amount,
            } => {
                let id = self.lookup(container)?;
                let point = GridPoint::new(*x, *y);
                let target = self.container_mut(id)?;
                let stack = target
                    .get_at_point(point)
                    .map(|item| item.runtime_id)
                    .ok_or(DragError::NothingAtPoint { container: id, point })?;
                let left = target.consume(stack, *amount).map_err(anyhow::Error::from)?;
                info!(container = %target.name(), %stack, left, "stack consumed");
                Ok(None)
            }
        }
    }

    fn pointer_moved(&mut self, container: Option<&str>, px: (f32, f32)) -> Result<(), StepError> {
        if !self.ctx.is_dragging() {
            let Some(press) = self.press.as_ref() else {
                return Ok(());
            };
            if !exceeds_drag_threshold(press.origin_px, px, self.threshold_px) {
                return Ok(());
            }
            let origin = press.container;
            let origin_px = press.origin_px;
            let grid = self.container_mut(origin)?.size();
            let Some(cell) = self.layout.cell_in_grid(grid, origin_px.0, origin_px.1) else {
                self.press = None;
                return Ok(());
            };
            self.press = None;
            self.ctx.begin_drag(origin, cell)?;
        }

        let hover = match container {
            Some(name) => {
                let id = self.lookup(name)?;
                let grid = self.container_mut(id)?.size();
                self.layout
                    .cell_in_grid(grid, px.0, px.1)
                    .map(|cell| Hover::new(id, cell))
            }
            None => None,
        };
        self.ctx.update_drag(hover)?;
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<ContainerId, StepError> {
        self.ctx
            .find_container(name)
            .ok_or_else(|| StepError::Other(anyhow::anyhow!("no container named '{name}'")))
    }

    fn container_mut(
        &mut self,
        id: ContainerId,
    ) -> Result<&mut gridstash_inventory::Container, StepError> {
        self.ctx
            .container_mut(id)
            .ok_or(StepError::Drag(DragError::UnknownContainer(id)))
    }
}

enum StepError {
    Drag(DragError),
    Other(anyhow::Error),
}

impl From<DragError> for StepError {
    fn from(err: DragError) -> Self {
        StepError::Drag(err)
    }
}

impl From<anyhow::Error> for StepError {
    fn from(err: anyhow::Error) -> Self {
        StepError::Other(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{build_context, load_item_factory, DemoConfig};
    use std::path::PathBuf;

    fn runner() -> DragScriptRunner {
        let config = DemoConfig::default();
        let mut factory = load_item_factory(&PathBuf::from("does/not/exist.json"));
        let ctx = build_context(&config, &mut factory).expect("context");
        DragScriptRunner::new(ctx, factory, CellLayout::square(10.0), 4.0)
    }

    fn run(script: &str) -> (DragScriptRunner, RunSummary) {
        let mut runner = runner();
        let script = DragScript::from_str(script).expect("script parses");
        let summary = runner.run(&script, None).expect("run succeeds");
        (runner, summary)
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(DragScript::from_str(r#"{"steps":[]}"#).is_err());
    }

    #[test]
    fn cell_steps_move_item_between_containers() {
        let (runner, summary) = run(
            r#"{"steps":[
                {"action":"spawn","container":"backpack","template":"Medkit"},
                {"action":"begin","container":"backpack","x":0,"y":2},
                {"action":"hover","container":"stash","x":3,"y":1},
                {"action":"release"}
            ]}"#,
        );
        assert_eq!(summary.outcomes, vec!["Added"]);
        let ctx = runner.context();
        let stash = ctx.find_container("stash").unwrap();
        let medkit = &ctx.container(stash).unwrap().items()[0];
        assert_eq!(medkit.position, GridPoint::new(3, 1));
        assert!(summary.events > 0);
    }

    #[test]
    fn pointer_steps_respect_threshold() {
        // Backpack is 6x4 with 10px cells: (-25, 15) is cell (0, 3).
        let (runner, summary) = run(
            r#"{"steps":[
                {"action":"spawn","container":"backpack","template":"Ammo","quantity":9},
                {"action":"press","container":"backpack","px":-25.0,"py":15.0},
                {"action":"move","container":"backpack","px":-24.0,"py":15.0},
                {"action":"move","container":"backpack","px":5.0,"py":5.0},
                {"action":"release"}
            ]}"#,
        );
        assert_eq!(summary.outcomes, vec!["Added"]);
        let ctx = runner.context();
        let backpack = ctx.find_container("backpack").unwrap();
        let ammo = &ctx.container(backpack).unwrap().items()[0];
        assert_eq!(ammo.position, GridPoint::new(3, 2));
    }

    #[test]
    fn release_outside_drops_and_undroppable_returns() {
        let (_runner, summary) = run(
            r#"{"steps":[
                {"action":"spawn","container":"backpack","template":"Keycard"},
                {"action":"spawn","container":"backpack","template":"Ammo","quantity":3},
                {"action":"begin","container":"backpack","x":1,"y":3},
                {"action":"hover"},
                {"action":"release"},
                {"action":"begin","container":"backpack","x":0,"y":3},
                {"action":"release"}
            ]}"#,
        );
        assert_eq!(summary.outcomes, vec!["Dropped", "Returned"]);
        assert_eq!(summary.dropped.len(), 1);
        assert_eq!(summary.dropped[0].item_name, "Ammo");
    }

    #[test]
    fn bad_steps_are_skipped() {
        let (_runner, summary) = run(
            r#"{"steps":[
                {"action":"release"},
                {"action":"begin","container":"nowhere","x":0,"y":0},
                {"action":"split","container":"stash","x":0,"y":0,"amount":2}
            ]}"#,
        );
        assert_eq!(summary.steps, 3);
        assert!(summary.outcomes.is_empty());
    }

    #[test]
    fn split_and_consume_adjust_stacks() {
        let (runner, _summary) = run(
            r#"{"steps":[
                {"action":"spawn","container":"stash","template":"Ammo","quantity":20},
                {"action":"split","container":"stash","x":0,"y":5,"amount":5},
                {"action":"consume","container":"stash","x":0,"y":5,"amount":4}
            ]}"#,
        );
        let ctx = runner.context();
        let stash = ctx.container(ctx.find_container("stash").unwrap()).unwrap();
        assert_eq!(stash.items().len(), 2);
        assert_eq!(stash.total_quantity("Ammo"), 16);
    }
}
