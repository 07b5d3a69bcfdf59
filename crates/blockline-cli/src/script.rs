//! Scripted host sessions.
//!
//! A script is a TOML file with an `outline` (nested Markdown bullets) and an
//! ordered list of `[[events]]` as a host would emit them. Blocks are
//! addressed by their position in the outline at the time the event runs,
//! counting text blocks in document order from zero.

use anyhow::{Context, Result, anyhow};
use blockline_engine::{
    BlockId, BlockRole, BlockStore, Document, FlatPoint, FlatRange, HostCall, MemoryHost,
    PreEdit, SyncController, SyncOptions, Translator, TreeSelection, parse_outline,
};
use serde::Deserialize;
use std::fmt::Write;

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub outline: String,
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
}

impl Script {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid replay script")
    }
}

/// A point in the outline: text block number plus char offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Position {
    pub block: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptEvent {
    /// Another subsystem sets the internal selection; no anchor clears it
    Select {
        anchor: Option<Position>,
        focus: Option<Position>,
    },
    /// The user moves the native selection; no anchor drops it
    NativeSelect {
        anchor: Option<Position>,
        focus: Option<Position>,
    },
    PreEdit {
        data: Option<String>,
        #[serde(default)]
        composing: bool,
        anchor: Option<Position>,
        focus: Option<Position>,
    },
    CompositionStart,
    CompositionEnd {
        #[serde(default)]
        data: String,
    },
    /// The host finished a render pass
    Render,
}

/// A document, host and controller driven by script events
pub struct Replay {
    doc: Document,
    host: MemoryHost,
    sync: SyncController,
    outcomes: Vec<String>,
}

impl Replay {
    pub fn new(outline: &str, options: SyncOptions) -> Result<Self> {
        let doc = parse_outline(outline)?;
        let host = MemoryHost::mounted(&doc);
        Ok(Self {
            doc,
            host,
            sync: SyncController::new(options),
            outcomes: Vec::new(),
        })
    }

    pub fn run(script: &Script, options: SyncOptions) -> Result<Self> {
        let mut replay = Self::new(&script.outline, options)?;
        for (number, event) in script.events.iter().enumerate() {
            replay
                .apply(event)
                .with_context(|| format!("Event {} ({event:?}) failed", number + 1))?;
        }
        Ok(replay)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn controller(&self) -> &SyncController {
        &self.sync
    }

    pub fn host(&self) -> &MemoryHost {
        &self.host
    }

    pub fn apply(&mut self, event: &ScriptEvent) -> Result<()> {
        // Blocks created or removed by earlier events get their containers
        self.host.mount(&self.doc);

        let outcome = match event {
            ScriptEvent::Select { anchor, focus } => {
                let selection = match anchor {
                    Some(anchor) => Some(self.tree_selection(*anchor, focus.unwrap_or(*anchor))?),
                    None => None,
                };
                self.sync.set_selection(selection, &self.doc, &mut self.host);
                "select".to_string()
            }
            ScriptEvent::NativeSelect { anchor, focus } => {
                match anchor {
                    Some(anchor) => {
                        let anchor = self.flat_point(*anchor)?;
                        let focus = match focus {
                            Some(focus) => self.flat_point(*focus)?,
                            None => anchor,
                        };
                        self.host.select(anchor, focus);
                    }
                    None => self.host.deselect(),
                }
                self.sync.on_native_selection_changed(&self.doc, &mut self.host);
                "native_select".to_string()
            }
            ScriptEvent::PreEdit {
                data,
                composing,
                anchor,
                focus,
            } => {
                let mut edit = PreEdit {
                    data: data.clone(),
                    is_composing: *composing,
                    target: None,
                };
                if let Some(anchor) = anchor {
                    let start = self.flat_point(*anchor)?;
                    let end = match focus {
                        Some(focus) => self.flat_point(*focus)?,
                        None => start,
                    };
                    edit = edit.with_target(FlatRange::from_anchor_focus(start, end));
                }
                let outcome = self.sync.on_pre_edit(&edit, &mut self.doc, &mut self.host);
                format!("pre_edit: {outcome:?}")
            }
            ScriptEvent::CompositionStart => {
                let started = self.sync.on_composition_start(&self.doc);
                format!("composition_start: {}", if started { "session" } else { "no selection" })
            }
            ScriptEvent::CompositionEnd { data } => {
                let outcome = self
                    .sync
                    .on_composition_end(data, &mut self.doc, &mut self.host);
                format!("composition_end: {outcome:?}")
            }
            ScriptEvent::Render => {
                self.sync.on_render_complete(&self.doc, &mut self.host);
                "render".to_string()
            }
        };

        log::info!("{outcome}");
        self.outcomes.push(outcome);
        Ok(())
    }

    /// Final outline, selection and host call log
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "outline:");
        for line in self.doc.to_outline().lines() {
            let _ = writeln!(out, "  {line}");
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "selection: {}",
            describe_selection(&self.doc, self.sync.current_selection())
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "events:");
        for outcome in &self.outcomes {
            let _ = writeln!(out, "  {outcome}");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "host calls:");
        for call in self.host.calls() {
            let _ = writeln!(out, "  {}", describe_call(&self.doc, call));
        }
        out
    }

    fn block(&self, position: usize) -> Result<BlockId> {
        self.doc
            .text_blocks()
            .get(position)
            .copied()
            .ok_or_else(|| anyhow!("No text block at position {position}"))
    }

    fn flat_point(&self, position: Position) -> Result<FlatPoint> {
        let block = self.block(position.block)?;
        let container = self
            .host
            .container_of(block)
            .ok_or_else(|| anyhow!("Block {} is not mounted", position.block))?;
        Ok(FlatPoint::new(container, position.offset))
    }

    fn tree_selection(&self, anchor: Position, focus: Position) -> Result<TreeSelection> {
        let translator = Translator::new(&self.doc, &self.host);
        let (anchor, focus) = (self.flat_point(anchor)?, self.flat_point(focus)?);
        translator
            .range_from_anchor_focus(anchor, focus)
            .and_then(|range| translator.to_tree_selection(&range))
            .ok_or_else(|| anyhow!("Selection does not resolve to text"))
    }
}

fn position_of(doc: &Document, block: BlockId) -> Option<usize> {
    doc.text_blocks().iter().position(|id| *id == block)
}

fn describe_block(doc: &Document, block: BlockId) -> String {
    match (doc.role(block), position_of(doc, block)) {
        (_, Some(position)) => format!("block {position}"),
        (Some(BlockRole::Hub), None) => {
            let hubs = doc.children(doc.root());
            let index = hubs.iter().position(|id| *id == block).unwrap_or_default();
            format!("hub {index}")
        }
        (Some(BlockRole::Root), None) => "root".to_string(),
        _ => format!("block {block}"),
    }
}

fn describe_selection(doc: &Document, selection: Option<&TreeSelection>) -> String {
    let Some(selection) = selection else {
        return "none".to_string();
    };
    let endpoint = |path: &blockline_engine::Path| match doc.resolve(path) {
        Some(block) => describe_block(doc, block),
        None => format!("unresolved {path}"),
    };

    let from = &selection.from;
    let mut text = format!("{} [{}..{})", endpoint(&from.path), from.index, from.end());
    if let Some(to) = &selection.to {
        let _ = write!(text, " -> {} [{}..{})", endpoint(&to.path), to.index, to.end());
    }
    if selection.reversed {
        text.push_str(" reversed");
    }
    text
}

fn describe_call(doc: &Document, call: &HostCall) -> String {
    match call {
        HostCall::RequestRefresh(block) => format!("request_refresh {}", describe_block(doc, *block)),
        other => other.to_string(),
    }
}
