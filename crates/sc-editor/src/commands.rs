//! Undo/Redo command stack.
//!
//! Every recorded edit stores a MessagePack snapshot of the scene before
//! and after it. Undo and redo replace the whole scene in one step, so
//! there is no per-mutation inverse to keep in sync with the controller.
//!
//! Drag gestures use **batching**: the snapshot is taken when the gesture
//! starts and closed when it ends, so the gesture undoes as a single step.
//!
//! Decoded bitmaps are not part of a snapshot. The stack keeps the handles
//! it has seen and reattaches them on restore.
//!
//! Theme switches are not edits, so each snapshot records the theme its
//! colours were themed for. The caller reconciles a restored scene with
//! the theme in force now.

use crate::error::{EditorError, EditorResult};
use image::RgbaImage;
use sc_core::model::ObjectKind;
use sc_core::{BackgroundOrigin, Layout, ObjectId, SceneResult, SceneStore, Theme};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Serialize, Deserialize)]
struct SceneSnapshot {
    layout: Layout,
    origin: BackgroundOrigin,
    theme: Theme,
}

/// What an undo or redo put back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub description: String,
    /// Theme the restored colours were captured under.
    pub theme: Theme,
}

/// One undoable step: encoded scene before and after.
#[derive(Debug, Clone)]
pub struct Command {
    before: Vec<u8>,
    after: Vec<u8>,
    pub description: String,
}

/// Manages undo/redo stacks with batch grouping for drag gestures.
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Snapshot captured at the start of a batch.
    batch_snapshot: Option<Vec<u8>>,
    bitmaps: HashMap<ObjectId, Arc<RgbaImage>>,
    /// Theme stamped on new snapshots.
    theme: Theme,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(64)),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            batch_depth: 0,
            batch_snapshot: None,
            bitmaps: HashMap::new(),
            theme: Theme::Light,
        }
    }

    /// The theme the live scene is currently themed for.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Run `edit` against the store and record it if the scene changed.
    /// Inside a batch the edit is applied live and folded into the batch.
    pub fn execute<R>(
        &mut self,
        store: &mut SceneStore,
        description: &str,
        edit: impl FnOnce(&mut SceneStore) -> SceneResult<R>,
    ) -> EditorResult<R> {
        if self.batch_depth > 0 {
            return Ok(edit(store)?);
        }
        let before = self.capture(store)?;
        let result = edit(store)?;
        let after = self.capture(store)?;
        self.push(before, after, description);
        Ok(result)
    }

    /// Start a batch group. Nested batches fold into the outermost one.
    pub fn begin_batch(&mut self, store: &SceneStore) -> EditorResult<()> {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(self.capture(store)?);
        }
        self.batch_depth += 1;
        Ok(())
    }

    /// End a batch group. When the outermost batch closes and the scene
    /// changed, one command covering the whole batch is pushed.
    pub fn end_batch(&mut self, store: &SceneStore, description: &str) -> EditorResult<()> {
        if self.batch_depth == 0 {
            return Ok(());
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0
            && let Some(before) = self.batch_snapshot.take()
        {
            let after = self.capture(store)?;
            self.push(before, after, description);
        }
        Ok(())
    }

    /// Undo the last command.
    pub fn undo(&mut self, store: &mut SceneStore) -> EditorResult<Option<Restored>> {
        let Some(cmd) = self.undo_stack.pop() else {
            return Ok(None);
        };
        let theme = self.restore(store, &cmd.before)?;
        let description = cmd.description.clone();
        self.redo_stack.push(cmd);
        log::debug!("undo: {description}");
        Ok(Some(Restored { description, theme }))
    }

    /// Redo the last undone command.
    pub fn redo(&mut self, store: &mut SceneStore) -> EditorResult<Option<Restored>> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(None);
        };
        let theme = self.restore(store, &cmd.after)?;
        let description = cmd.description.clone();
        self.undo_stack.push(cmd);
        log::debug!("redo: {description}");
        Ok(Some(Restored { description, theme }))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    fn push(&mut self, before: Vec<u8>, after: Vec<u8>, description: &str) {
        // Selection-only and rejected edits leave the snapshot unchanged.
        if before == after {
            return;
        }
        self.undo_stack.push(Command {
            before,
            after,
            description: description.to_string(),
        });
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    fn capture(&mut self, store: &SceneStore) -> EditorResult<Vec<u8>> {
        for obj in store.objects() {
            if let ObjectKind::Image { source, .. } = &obj.kind
                && let Some(bitmap) = &source.bitmap
            {
                self.bitmaps.insert(obj.id, Arc::clone(bitmap));
            }
        }
        let snapshot = SceneSnapshot {
            layout: store.to_layout(),
            origin: store.background_origin(),
            theme: self.theme,
        };
        rmp_serde::to_vec_named(&snapshot).map_err(|e| EditorError::Snapshot(e.to_string()))
    }

    fn restore(&self, store: &mut SceneStore, bytes: &[u8]) -> EditorResult<Theme> {
        let SceneSnapshot {
            mut layout,
            origin,
            theme,
        } =
            rmp_serde::from_slice(bytes).map_err(|e| EditorError::Snapshot(e.to_string()))?;
        for obj in &mut layout.objects {
            if let ObjectKind::Image { source, .. } = &mut obj.kind
                && source.bitmap.is_none()
            {
                source.bitmap = self.bitmaps.get(&obj.id).cloned();
            }
        }
        store.restore_layout(layout, origin)?;
        Ok(theme)
    }
}
