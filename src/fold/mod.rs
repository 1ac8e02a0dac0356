// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Gap folding for focused blocks.
//!
//! A block's ranges may be scattered; the lines between two of its ranges are a gap. Folding a
//! gap asks the surface to collapse it and records it in the session's fold state, so the
//! highlight and the fold always agree on 0-based addressing.

use std::fmt;

use crate::model::{BlockId, LineRange, NormalizedBlock, RenderRange, Session, TransitionError};
use crate::surface::{RenderSurface, SurfaceError};

/// 0-based inclusive gaps between consecutive ranges, after sorting by start.
///
/// For 1-based ranges `a` then `b`, the gap is `[a.end, b.start - 2]` in render addressing,
/// present only when `a.end + 1 < b.start`.
pub fn detect_gaps(ranges: &[LineRange]) -> Vec<RenderRange> {
    if ranges.len() < 2 {
        return Vec::new();
    }
    let mut sorted = ranges.to_vec();
    sorted.sort();

    sorted
        .windows(2)
        .filter(|pair| pair[0].end() + 1 < pair[1].start())
        .filter_map(|pair| RenderRange::new(pair[0].end(), pair[1].start() - 2).ok())
        .collect()
}

/// What activating a block's fold toggle should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldDecision {
    Fold(Vec<RenderRange>),
    /// Block is focused and already folded: unfold and leave focus.
    Unfold,
    /// Nothing to fold (contiguous or single-range block).
    Noop,
}

pub fn decide_fold(session: &Session, block: &NormalizedBlock) -> FoldDecision {
    let block_id = block.block_id();
    if session.focused_block_id() == Some(block_id) && session.folded_block_id() == Some(block_id)
    {
        return FoldDecision::Unfold;
    }
    let gaps = detect_gaps(block.ranges());
    if gaps.is_empty() {
        FoldDecision::Noop
    } else {
        FoldDecision::Fold(gaps)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GapFolder;

impl GapFolder {
    /// Collapse exactly `gaps` on behalf of the focused `block_id`, replacing any fold the
    /// session currently records.
    pub fn apply_folds(
        &self,
        surface: &mut dyn RenderSurface,
        session: &mut Session,
        block_id: &BlockId,
        gaps: Vec<RenderRange>,
    ) -> Result<(), FoldError> {
        if session.focused_block_id() != Some(block_id) {
            return Err(FoldError::Transition(TransitionError::FoldWithoutFocus {
                block_id: block_id.clone(),
            }));
        }
        self.remove_folds(surface, session);
        if gaps.is_empty() {
            return Ok(());
        }

        surface.fold(&gaps).map_err(FoldError::Surface)?;
        if let Err(err) = session.set_fold(block_id, gaps.clone()) {
            if let Err(unfold_err) = surface.unfold(&gaps) {
                tracing::warn!(block = %block_id, error = %unfold_err, "rollback unfold failed");
            }
            return Err(FoldError::Transition(err));
        }
        tracing::debug!(block = %block_id, gaps = gaps.len(), "gaps folded");
        Ok(())
    }

    /// Re-expand whatever the session records as folded. Returns `false` if nothing was.
    pub fn remove_folds(&self, surface: &mut dyn RenderSurface, session: &mut Session) -> bool {
        if !session.is_fold_active() {
            return false;
        }
        if let Err(err) = surface.unfold(session.folded_ranges()) {
            tracing::warn!(error = %err, "unfold rejected; dropping fold state");
        }
        session.clear_fold();
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldError {
    Surface(SurfaceError),
    Transition(TransitionError),
}

impl fmt::Display for FoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface(err) => write!(f, "fold rejected by surface: {err}"),
            Self::Transition(err) => write!(f, "fold not allowed: {err}"),
        }
    }
}

impl std::error::Error for FoldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Surface(err) => Some(err),
            Self::Transition(err) => Some(err),
        }
    }
}
