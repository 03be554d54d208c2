//! Element store for the active room.

use std::collections::BTreeSet;

use crate::element::{Element, ElementId, IdAllocator};
use crate::history::{Change, DEFAULT_MAX_ENTRIES, History};
use crate::selection::Selection;
use crate::sync::DrawAction;
use crate::tools::ToolKind;

/// How a local edit enters the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    /// Append a new undoable entry.
    Commit,
    /// Replace the current entry in place.
    Overwrite,
}

/// One history entry.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub elements: Vec<Element>,
    /// Ids the local edit that produced this entry changed.
    pub touched: BTreeSet<ElementId>,
}

/// Ordered element list backed by the history, plus active tool and selection.
///
/// Local edits go through [`ElementStore::apply_local`] and become
/// undoable. Edits from other participants go through
/// [`ElementStore::apply_remote`], which merges them into the current
/// entry without adding one.
///
/// Undo and redo only move the elements the stepped-over entry touched.
/// Everything else keeps its live state, so remote elements merged since
/// that entry survive.
#[derive(Debug, Clone)]
pub struct ElementStore {
    history: History<Snapshot>,
    ids: IdAllocator,
    tool: ToolKind,
    selection: Option<Selection>,
}

impl Default for ElementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementStore {
    pub fn new() -> Self {
        Self::with_ids(IdAllocator::new(), DEFAULT_MAX_ENTRIES)
    }

    pub fn with_ids(ids: IdAllocator, max_history: usize) -> Self {
        Self {
            history: History::with_capacity(Snapshot::default(), max_history),
            ids,
            tool: ToolKind::default(),
            selection: None,
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.history.current().elements
    }

    pub fn len(&self) -> usize {
        self.elements().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements().is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements().iter().find(|e| e.id == id)
    }

    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements().iter().position(|e| e.id == id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn next_id(&mut self) -> ElementId {
        self.ids.next_id()
    }

    /// Site id of the elements this store mints.
    pub fn site(&self) -> u64 {
        self.ids.site()
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    /// Switch tools. Any selection is dropped.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool != self.tool {
            log::debug!("Tool changed: {} -> {}", self.tool.name(), tool.name());
        }
        self.tool = tool;
        self.selection = None;
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn select(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// The selected element as currently stored, if it still exists.
    pub fn selected_element(&self) -> Option<&Element> {
        self.selection.as_ref().and_then(|s| self.get(s.id))
    }

    /// Apply a local edit to the element list.
    pub fn apply_local(&mut self, record: Record, edit: impl FnOnce(&mut Vec<Element>)) {
        let overwrite = record == Record::Overwrite;
        self.history.record(
            Change::map(move |current: &Snapshot| {
                let mut elements = current.elements.clone();
                edit(&mut elements);
                // An overwritten entry still answers for what its commit touched.
                let mut touched = if overwrite {
                    current.touched.clone()
                } else {
                    BTreeSet::new()
                };
                touched.extend(diff(&current.elements, &elements).iter().filter_map(action_id));
                Snapshot { elements, touched }
            }),
            overwrite,
        );
        self.refresh_descriptors();
    }

    /// Replace the element with the same id. Returns `false` if it is gone.
    pub fn replace_element(&mut self, element: Element, record: Record) -> bool {
        if !self.contains(element.id) {
            return false;
        }
        self.apply_local(record, move |elements| {
            if let Some(slot) = elements.iter_mut().find(|e| e.id == element.id) {
                *slot = element;
            }
        });
        true
    }

    /// Merge an edit from another participant into the current entry.
    ///
    /// Never advances the cursor and never discards redo entries.
    pub fn apply_remote(&mut self, action: &DrawAction) -> bool {
        if !action.apply_to(&mut self.history.current_mut().elements) {
            return false;
        }
        self.refresh_descriptors();
        true
    }

    /// Step back one entry. Returns the edits peers need to follow, or
    /// `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<Vec<DrawAction>> {
        let Snapshot { elements: live, touched } = self.history.current().clone();
        if !self.history.undo() {
            return None;
        }
        Some(self.settle(&live, &touched))
    }

    /// Step forward one entry. Returns the edits peers need to follow, or
    /// `None` at the newest entry.
    pub fn redo(&mut self) -> Option<Vec<DrawAction>> {
        let live = self.history.current().elements.clone();
        if !self.history.redo() {
            return None;
        }
        let touched = self.history.current().touched.clone();
        Some(self.settle(&live, &touched))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &History<Snapshot> {
        &self.history
    }

    /// Rewrite the entry the cursor just reached: `touched` ids take the
    /// entry's state and every other id keeps its `live` state.
    fn settle(&mut self, live: &[Element], touched: &BTreeSet<ElementId>) -> Vec<DrawAction> {
        let target = &self.history.current().elements;
        let mut next: Vec<Element> = live
            .iter()
            .filter_map(|e| {
                if touched.contains(&e.id) {
                    target.iter().find(|t| t.id == e.id).cloned()
                } else {
                    Some(e.clone())
                }
            })
            .collect();
        for (index, element) in target.iter().enumerate() {
            if touched.contains(&element.id) && !next.iter().any(|e| e.id == element.id) {
                next.insert(index.min(next.len()), element.clone());
            }
        }

        let actions = diff(live, &next);
        if !actions.is_empty() {
            log::debug!("History step changed {} element(s)", actions.len());
        }
        self.history.current_mut().elements = next;
        self.refresh_descriptors();
        actions
    }

    fn refresh_descriptors(&self) {
        for element in self.elements() {
            element.refresh_descriptor();
        }
    }
}

/// Per-element actions turning `before` into `after`. Deletes come first.
fn diff(before: &[Element], after: &[Element]) -> Vec<DrawAction> {
    let mut actions: Vec<DrawAction> = before
        .iter()
        .filter(|b| !after.iter().any(|a| a.id == b.id))
        .map(|b| DrawAction::Delete { element_id: b.id })
        .collect();
    for element in after {
        match before.iter().find(|b| b.id == element.id) {
            None => actions.push(DrawAction::Add { element: element.clone() }),
            Some(old) if old != element => actions.push(DrawAction::Update { element: element.clone() }),
            Some(_) => {}
        }
    }
    actions
}

fn action_id(action: &DrawAction) -> Option<ElementId> {
    match action {
        DrawAction::Add { element } | DrawAction::Update { element } => Some(element.id),
        DrawAction::Delete { element_id } => Some(*element_id),
        DrawAction::Batch { .. } => None,
    }
}
