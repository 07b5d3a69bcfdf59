use std::collections::VecDeque;
use std::fmt;

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::editing::{Composition, CompositionSession, MergeError, SyncError, merge_blocks};
use crate::host::{ContainerMap, HostSurface, Notice};
use crate::models::{BlockId, BlockStore};
use crate::selection::{FlatRange, Translator, TreeSelection};

/// Behaviour switches for [`SyncController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Queue both sync directions until the host reports its render pass
    /// finished. Hosts without an asynchronous render pass turn this off.
    pub defer_until_render: bool,
    /// Tell the host when a multi-block edit had to be rolled back
    pub notify_on_failed_edit: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            defer_until_render: true,
            notify_on_failed_edit: true,
        }
    }
}

/// An edit the host is about to apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreEdit {
    /// Text the edit inserts, if any
    pub data: Option<String>,
    /// Part of a composition; such edits are never intercepted
    pub is_composing: bool,
    /// Host range the edit replaces; falls back to the current selection
    pub target: Option<FlatRange>,
}

impl PreEdit {
    pub fn insert(text: impl Into<String>) -> Self {
        Self {
            data: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn delete() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: FlatRange) -> Self {
        self.target = Some(target);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreEditOutcome {
    /// Let the host apply its default edit
    Proceed,
    /// The engine applied the edit; the host must cancel its default
    Handled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionOutcome {
    /// No session was active
    Ignored,
    /// The composed text was merged across blocks
    Merged,
    /// Single-block session; the selection is re-read from the host
    Resynced,
    /// Captured blocks were gone or the selection no longer fit; nothing changed
    Discarded,
    /// The merge transaction failed and was rolled back
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(Option<&TreeSelection>)>;

/// Work waiting for the host's render pass
#[derive(Debug, Clone, PartialEq, Eq)]
enum Deferred {
    PushToHost(Option<TreeSelection>),
    ReadFromHost,
}

/// Keeps the host's flat selection and the internal tree selection in step.
///
/// The controller is the only writer of the internal selection. Both
/// directions meet in `last_observed`: whatever was last written to, or read
/// from, the host. A value equal to it is never sent the other way again,
/// which is what stops the two observers from echoing each other.
///
/// The store and host are borrowed per call; the controller owns only its
/// own state.
pub struct SyncController {
    options: SyncOptions,
    selection: Option<TreeSelection>,
    last_observed: Option<TreeSelection>,
    composition: Composition,
    pending: VecDeque<Deferred>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl SyncController {
    pub fn new(options: SyncOptions) -> Self {
        Self {
            options,
            selection: None,
            last_observed: None,
            composition: Composition::Idle,
            pending: VecDeque::new(),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    pub fn current_selection(&self) -> Option<&TreeSelection> {
        self.selection.as_ref()
    }

    pub fn is_composing(&self) -> bool {
        self.composition.is_composing()
    }

    pub fn composition(&self) -> Option<&CompositionSession> {
        self.composition.session()
    }

    /// Whether work is queued for the next render pass
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Observe every published selection
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(Option<&TreeSelection>) + 'static,
    ) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Replace the internal selection and mirror it into the host
    pub fn set_selection<S, H>(&mut self, selection: Option<TreeSelection>, store: &S, host: &mut H)
    where
        S: BlockStore,
        H: HostSurface,
    {
        self.publish(selection, store, host);
    }

    /// The host's native selection moved
    pub fn on_native_selection_changed<S, H>(&mut self, store: &S, host: &mut H)
    where
        S: BlockStore,
        H: HostSurface,
    {
        if self.composition.is_composing() {
            debug!("native selection change ignored while composing");
            return;
        }
        self.schedule(Deferred::ReadFromHost, store, host);
    }

    /// The host finished a render pass; run everything that waited for it
    pub fn on_render_complete<S, H>(&mut self, store: &S, host: &mut H)
    where
        S: BlockStore,
        H: HostSurface,
    {
        while let Some(task) = self.pending.pop_front() {
            self.run(task, store, host);
        }
    }

    /// Intercept an edit before the host applies it.
    ///
    /// Edits inside one block pass through. Edits spanning several blocks are
    /// applied here as one transactional merge and the host is told to cancel
    /// its own. The merge has fully committed (or rolled back) by the time
    /// this returns.
    pub fn on_pre_edit<S, H>(&mut self, edit: &PreEdit, store: &mut S, host: &mut H) -> PreEditOutcome
    where
        S: BlockStore,
        H: HostSurface,
    {
        if edit.is_composing {
            return PreEditOutcome::Proceed;
        }

        let selection = match &edit.target {
            Some(range) => {
                let translator = Translator::new(&*store, &*host);
                let start = translator.block_at(&range.start);
                let end = translator.block_at(&range.end);
                if start.is_none() || end.is_none() || start == end {
                    return PreEditOutcome::Proceed;
                }
                match translator.to_tree_selection(range) {
                    Some(selection) => selection,
                    None => {
                        warn!("{}", SyncError::CrossBlockWithoutSelection);
                        return PreEditOutcome::Proceed;
                    }
                }
            }
            None => match &self.selection {
                Some(selection) => selection.clone(),
                None => return PreEditOutcome::Proceed,
            },
        };
        if !selection.is_multi_block() {
            return PreEditOutcome::Proceed;
        }

        let text = edit.data.as_deref().unwrap_or_default();
        match merge_blocks(store, &selection, text) {
            Ok(outcome) => {
                self.discard_stale_reads();
                self.publish(Some(outcome.selection), &*store, host);
                PreEditOutcome::Handled
            }
            Err(err) if err.is_staging() => {
                warn!("multi-block edit left to the host: {err}");
                PreEditOutcome::Proceed
            }
            Err(err) => {
                self.report_failure(err, host);
                PreEditOutcome::Handled
            }
        }
    }

    /// Composed input started: capture the selection and stop reading the
    /// host until the composition ends. Returns whether a session started.
    pub fn on_composition_start<S: BlockStore>(&mut self, store: &S) -> bool {
        if let Some(stale) = self.composition.finish() {
            warn!(
                "{}: discarding session over {} blocks",
                SyncError::CompositionProtocolViolation,
                stale.blocks().len()
            );
        }

        let Some(selection) = self.selection.clone() else {
            debug!("composition started without a text selection");
            return false;
        };
        match CompositionSession::begin(store, selection) {
            Ok(session) => {
                self.composition.start(session);
                true
            }
            Err(err) => {
                warn!("composition session not started: {err}");
                false
            }
        }
    }

    /// Composed input finished with `data` as the committed text
    pub fn on_composition_end<S, H>(&mut self, data: &str, store: &mut S, host: &mut H) -> CompositionOutcome
    where
        S: BlockStore,
        H: HostSurface,
    {
        let Some(session) = self.composition.finish() else {
            return CompositionOutcome::Ignored;
        };

        if !session.is_multi_block() {
            // The host's own editing context commits inside a single block
            self.schedule(Deferred::ReadFromHost, &*store, host);
            return CompositionOutcome::Resynced;
        }
        if let Some(block) = session.missing_block(&*store) {
            warn!("block {block} was removed during composition; composed text dropped");
            return CompositionOutcome::Discarded;
        }

        let refresh = session.refresh_targets(&*store);
        match session.commit(store, data) {
            Ok(outcome) => {
                self.discard_stale_reads();
                for block in refresh {
                    if store.contains(block) {
                        host.request_refresh(block);
                    }
                }
                self.publish(Some(outcome.selection), &*store, host);
                CompositionOutcome::Merged
            }
            Err(err) if err.is_staging() => {
                warn!("composition merge skipped: {err}");
                CompositionOutcome::Discarded
            }
            Err(err) => {
                self.report_failure(err, host);
                CompositionOutcome::Failed
            }
        }
    }

    fn publish<S, H>(&mut self, selection: Option<TreeSelection>, store: &S, host: &mut H)
    where
        S: BlockStore,
        H: HostSurface,
    {
        self.selection = selection.clone();
        for (_, listener) in self.listeners.iter_mut() {
            listener(self.selection.as_ref());
        }
        self.schedule(Deferred::PushToHost(selection), store, host);
    }

    fn schedule<S, H>(&mut self, task: Deferred, store: &S, host: &mut H)
    where
        S: BlockStore,
        H: HostSurface,
    {
        if self.options.defer_until_render {
            self.pending.push_back(task);
        } else {
            self.run(task, store, host);
        }
    }

    fn run<S, H>(&mut self, task: Deferred, store: &S, host: &mut H)
    where
        S: BlockStore,
        H: HostSurface,
    {
        match task {
            Deferred::PushToHost(selection) => self.push_to_host(selection, store, host),
            Deferred::ReadFromHost => self.read_from_host(store, host),
        }
    }

    fn push_to_host<S, H>(&mut self, selection: Option<TreeSelection>, store: &S, host: &mut H)
    where
        S: BlockStore,
        H: HostSurface,
    {
        if selection == self.last_observed {
            debug!("selection unchanged, native range left alone");
            return;
        }

        let Some(selection) = selection else {
            host.clear_native_selection();
            self.last_observed = None;
            return;
        };
        let range = Translator::new(store, &*host).to_flat_range(&selection);
        match range {
            Some(range) => {
                host.set_native_range(&range);
                self.last_observed = Some(selection);
            }
            None => {
                let path = if store.resolve(&selection.from.path).is_none() {
                    selection.from.path
                } else {
                    selection.last_path().clone()
                };
                warn!("{}", SyncError::UnresolvedPath(path));
            }
        }
    }

    fn read_from_host<S, H>(&mut self, store: &S, host: &mut H)
    where
        S: BlockStore,
        H: HostSurface,
    {
        if self.composition.is_composing() {
            debug!("native selection read skipped while composing");
            return;
        }

        let selection = match host.native_range() {
            Some(range) => {
                if host.is_composing_at(range.start.container)
                    || host.is_composing_at(range.end.container)
                {
                    debug!("editing context is composing, native selection ignored");
                    return;
                }
                if let Some(block) = removed_block_under(&range, store, &*host) {
                    warn!("native selection points into removed block {block}, left unchanged");
                    return;
                }
                let selection = Translator::new(store, &*host).to_tree_selection(&range);
                if selection.is_none() {
                    debug!("native range is outside editable text, clearing selection");
                }
                selection
            }
            None => None,
        };

        if selection == self.last_observed {
            debug!("native selection matches the last published one");
            return;
        }
        self.last_observed = selection.clone();
        self.publish(selection, store, host);
    }

    /// Host reads queued before a merge would see pre-merge geometry
    fn discard_stale_reads(&mut self) {
        let before = self.pending.len();
        self.pending.retain(|task| *task != Deferred::ReadFromHost);
        let dropped = before - self.pending.len();
        if dropped > 0 {
            debug!("dropped {dropped} native selection reads queued before the merge");
        }
    }

    fn report_failure<H: HostSurface>(&mut self, err: MergeError, host: &mut H) {
        let err = SyncError::TransactionFailure(err);
        error!("{err}");
        if self.options.notify_on_failed_edit {
            host.notify(Notice::EditFailed(err.to_string()));
        }
    }
}

/// A block the host still renders under `range` but the store has dropped
fn removed_block_under<S, M>(range: &FlatRange, store: &S, map: &M) -> Option<BlockId>
where
    S: BlockStore,
    M: ContainerMap + ?Sized,
{
    [range.start, range.end].into_iter().find_map(|point| {
        map.resolve_container(point.container)
            .map(|span| span.block)
            .filter(|block| !store.contains(*block))
    })
}

impl Default for SyncController {
    fn default() -> Self {
        Self::new(SyncOptions::default())
    }
}

impl fmt::Debug for SyncController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncController")
            .field("options", &self.options)
            .field("selection", &self.selection)
            .field("last_observed", &self.last_observed)
            .field("composition", &self.composition)
            .field("pending", &self.pending)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
