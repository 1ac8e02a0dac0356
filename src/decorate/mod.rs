// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Decoration engine.
//!
//! Three visual modes: idle (nothing), preview (hovered block, low emphasis) and focus (focused
//! block highlighted, every other block dimmed). Handles are created lazily per block identity
//! and mode and then reused; applying a mode only swaps the ranges a handle covers.

use std::collections::HashMap;

use crate::identity::BlockColor;
use crate::model::{BlockId, NormalizedBlock, RenderRange};
use crate::surface::{DecorationHandle, DecorationStyle, RenderSurface, SurfaceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DecorationMode {
    Preview,
    Focus,
    Dim,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    handle: DecorationHandle,
    style: DecorationStyle,
}

#[derive(Debug, Clone)]
pub struct DecorationEngine {
    slots: HashMap<(BlockId, DecorationMode), Slot>,
    preview: Option<BlockId>,
    focus: Option<BlockId>,
    dimmed: Vec<BlockId>,
    dim_opacity_pct: u8,
}

impl DecorationEngine {
    pub fn new(dim_opacity_pct: u8) -> Self {
        Self {
            slots: HashMap::new(),
            preview: None,
            focus: None,
            dimmed: Vec::new(),
            dim_opacity_pct,
        }
    }

    pub fn previewed_block_id(&self) -> Option<&BlockId> {
        self.preview.as_ref()
    }

    pub fn focused_block_id(&self) -> Option<&BlockId> {
        self.focus.as_ref()
    }

    pub fn dimmed_block_ids(&self) -> &[BlockId] {
        &self.dimmed
    }

    /// Number of live handles held in the registry.
    pub fn handle_count(&self) -> usize {
        self.slots.len()
    }

    /// Highlight `block` with low emphasis, replacing any current preview.
    ///
    /// Returns `Ok(false)` without touching the surface while focus is active.
    pub fn preview_block(
        &mut self,
        surface: &mut dyn RenderSurface,
        block: &NormalizedBlock,
        color: BlockColor,
    ) -> Result<bool, SurfaceError> {
        if let Some(focused) = &self.focus {
            tracing::debug!(block = %block.block_id(), focused = %focused, "preview ignored while focused");
            return Ok(false);
        }

        self.clear_preview(surface);
        let style = DecorationStyle::Preview { fill: color.fill };
        self.apply(surface, block.block_id(), DecorationMode::Preview, style, &block.render_ranges())?;
        self.preview = Some(block.block_id().clone());
        Ok(true)
    }

    pub fn clear_preview(&mut self, surface: &mut dyn RenderSurface) {
        if let Some(block_id) = self.preview.take() {
            self.clear_slot(surface, &block_id, DecorationMode::Preview);
        }
    }

    /// Highlight `block` and dim every other block in `all_blocks`.
    ///
    /// Re-entering focus on the already focused block is a no-op. On a surface failure every
    /// range applied by this call is cleared again and the engine ends up idle.
    pub fn enter_focus(
        &mut self,
        surface: &mut dyn RenderSurface,
        block: &NormalizedBlock,
        all_blocks: &[NormalizedBlock],
        color: BlockColor,
    ) -> Result<(), SurfaceError> {
        if self.focus.as_ref() == Some(block.block_id()) {
            return Ok(());
        }

        self.clear_preview(surface);
        self.exit_focus(surface);

        let style = DecorationStyle::Focus {
            fill: color.fill,
            marker: color.marker,
        };
        if let Err(err) = self.apply(
            surface,
            block.block_id(),
            DecorationMode::Focus,
            style,
            &block.render_ranges(),
        ) {
            tracing::warn!(block = %block.block_id(), error = %err, "focus highlight rejected");
            return Err(err);
        }
        self.focus = Some(block.block_id().clone());

        let dim = DecorationStyle::Dim {
            opacity_pct: self.dim_opacity_pct,
        };
        for other in all_blocks.iter().filter(|b| b.block_id() != block.block_id()) {
            if let Err(err) = self.apply(
                surface,
                other.block_id(),
                DecorationMode::Dim,
                dim,
                &other.render_ranges(),
            ) {
                tracing::warn!(block = %other.block_id(), error = %err, "dimming rejected; rolling back focus");
                self.exit_focus(surface);
                return Err(err);
            }
            self.dimmed.push(other.block_id().clone());
        }

        tracing::debug!(block = %block.block_id(), dimmed = self.dimmed.len(), "focus entered");
        Ok(())
    }

    /// Remove focus and dimming highlights. Returns `false` when nothing was focused.
    pub fn exit_focus(&mut self, surface: &mut dyn RenderSurface) -> bool {
        let Some(block_id) = self.focus.take() else {
            return false;
        };
        self.clear_slot(surface, &block_id, DecorationMode::Focus);
        for dimmed in std::mem::take(&mut self.dimmed) {
            self.clear_slot(surface, &dimmed, DecorationMode::Dim);
        }
        tracing::debug!(block = %block_id, "focus exited");
        true
    }

    /// Remove every highlight in every mode. Handles stay cached for reuse.
    pub fn clear_all(&mut self, surface: &mut dyn RenderSurface) {
        self.preview = None;
        self.focus = None;
        self.dimmed.clear();
        let keys: Vec<(BlockId, DecorationMode)> = self.slots.keys().cloned().collect();
        for (block_id, mode) in keys {
            self.clear_slot(surface, &block_id, mode);
        }
    }

    /// Release the handles of every block not in `keep`, clearing their highlights first.
    /// Returns the number of handles released.
    pub fn retain_blocks(&mut self, surface: &mut dyn RenderSurface, keep: &[BlockId]) -> usize {
        let kept = |block_id: &BlockId| keep.contains(block_id);
        if self.preview.as_ref().is_some_and(|id| !kept(id)) {
            self.clear_preview(surface);
        }
        if self.focus.as_ref().is_some_and(|id| !kept(id)) {
            self.exit_focus(surface);
        }
        self.dimmed.retain(|id| kept(id));

        let stale: Vec<(BlockId, DecorationMode)> = self
            .slots
            .keys()
            .filter(|(block_id, _)| !kept(block_id))
            .cloned()
            .collect();
        for key in &stale {
            if let Some(slot) = self.slots.remove(key) {
                let _ = surface.set_decoration_ranges(slot.handle, &[]);
                surface.release_decoration(slot.handle);
            }
        }
        if !stale.is_empty() {
            tracing::debug!(released = stale.len(), kept = self.slots.len(), "stale decoration handles released");
        }
        stale.len()
    }

    /// Clear everything, then release every cached handle.
    pub fn dispose(&mut self, surface: &mut dyn RenderSurface) {
        self.clear_all(surface);
        let released = self.slots.len();
        for (_, slot) in self.slots.drain() {
            surface.release_decoration(slot.handle);
        }
        tracing::debug!(released, "decoration handles released");
    }

    fn apply(
        &mut self,
        surface: &mut dyn RenderSurface,
        block_id: &BlockId,
        mode: DecorationMode,
        style: DecorationStyle,
        ranges: &[RenderRange],
    ) -> Result<(), SurfaceError> {
        let handle = self.slot(surface, block_id, mode, style)?;
        if let Err(err) = surface.set_decoration_ranges(handle, ranges) {
            self.clear_slot(surface, block_id, mode);
            return Err(err);
        }
        Ok(())
    }

    fn slot(
        &mut self,
        surface: &mut dyn RenderSurface,
        block_id: &BlockId,
        mode: DecorationMode,
        style: DecorationStyle,
    ) -> Result<DecorationHandle, SurfaceError> {
        let key = (block_id.clone(), mode);
        if let Some(slot) = self.slots.get(&key) {
            if slot.style == style {
                return Ok(slot.handle);
            }
            surface.release_decoration(slot.handle);
            self.slots.remove(&key);
        }
        let handle = surface.create_decoration(style)?;
        self.slots.insert(key, Slot { handle, style });
        Ok(handle)
    }

    /// Empty the ranges of one slot. A surface that refuses loses the handle instead, so a
    /// failed clear never leaves a tracked handle behind.
    fn clear_slot(&mut self, surface: &mut dyn RenderSurface, block_id: &BlockId, mode: DecorationMode) {
        let key = (block_id.clone(), mode);
        let Some(slot) = self.slots.get(&key).copied() else {
            return;
        };
        if let Err(err) = surface.set_decoration_ranges(slot.handle, &[]) {
            tracing::warn!(block = %block_id, ?mode, error = %err, "clearing decoration failed; releasing handle");
            surface.release_decoration(slot.handle);
            self.slots.remove(&key);
        }
    }
}
