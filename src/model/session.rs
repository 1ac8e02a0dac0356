// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;

use super::analysis::{AnalysisResult, SourceVersion};
use super::block::NormalizedBlock;
use super::ids::BlockId;
use super::range::RenderRange;
use crate::events::{Listeners, Subscription};

/// Lifecycle phase of a document's analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Empty,
    Pending,
    Ready,
    Outdated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "empty",
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Outdated => "outdated",
        })
    }
}

/// Identifies one started analysis; completions must present the ticket of the analysis that
/// is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnalysisTicket(u64);

impl AnalysisTicket {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnalysisTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out [`AnalysisTicket`]s. Sessions sharing one source never see the same ticket twice,
/// so a completion addressed to a closed session cannot match the ticket of its successor.
#[derive(Debug, Clone, Default)]
pub struct TicketSource {
    last: Rc<Cell<u64>>,
}

impl TicketSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> AnalysisTicket {
        let next = self.last.get().wrapping_add(1);
        self.last.set(next);
        AnalysisTicket(next)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusState {
    active_block_id: Option<BlockId>,
}

impl FocusState {
    pub fn active_block_id(&self) -> Option<&BlockId> {
        self.active_block_id.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldState {
    folded_block_id: Option<BlockId>,
    folded_ranges: Vec<RenderRange>,
}

impl FoldState {
    pub fn folded_block_id(&self) -> Option<&BlockId> {
        self.folded_block_id.as_ref()
    }

    pub fn folded_ranges(&self) -> &[RenderRange] {
        &self.folded_ranges
    }

    pub fn is_empty(&self) -> bool {
        self.folded_block_id.is_none()
    }
}

/// Per-document analysis session: the single source of truth for phase, result, focus and
/// fold.
///
/// Transitions emit a phase-only notification; listeners read payloads back through the
/// selectors.
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    result: Option<Arc<AnalysisResult>>,
    source_version: Option<SourceVersion>,
    in_flight: Option<AnalysisTicket>,
    tickets: TicketSource,
    focus: FocusState,
    fold: FoldState,
    listeners: Listeners<Phase>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Empty,
            result: None,
            source_version: None,
            in_flight: None,
            tickets: TicketSource::new(),
            focus: FocusState::default(),
            fold: FoldState::default(),
            listeners: Listeners::new(),
        }
    }

    /// Draw tickets from `tickets` instead of the session's own counter.
    pub fn use_tickets(&mut self, tickets: TicketSource) {
        self.tickets = tickets;
    }

    pub fn subscribe(&self, callback: impl FnMut(&Phase) + 'static) -> Subscription {
        self.listeners.subscribe(callback)
    }

    pub fn start_analysis(
        &mut self,
        source_version: SourceVersion,
    ) -> Result<AnalysisTicket, TransitionError> {
        if self.phase == Phase::Pending {
            tracing::warn!(%source_version, "analysis already in flight; start rejected");
            return Err(TransitionError::AlreadyPending);
        }

        let ticket = self.tickets.issue();
        self.in_flight = Some(ticket);
        self.source_version = Some(source_version);
        self.result = None;
        self.clear_interaction();
        self.transition(Phase::Pending);
        Ok(ticket)
    }

    pub fn complete_analysis(
        &mut self,
        ticket: AnalysisTicket,
        result: AnalysisResult,
    ) -> Result<(), TransitionError> {
        if self.phase != Phase::Pending {
            tracing::warn!(%ticket, phase = %self.phase, "completion outside pending; discarded");
            return Err(TransitionError::NotPending { phase: self.phase });
        }
        if self.in_flight != Some(ticket) {
            tracing::warn!(%ticket, "completion for an abandoned analysis; discarded");
            return Err(TransitionError::StaleTicket { ticket });
        }

        self.in_flight = None;
        self.source_version = Some(result.source_version());
        self.result = Some(Arc::new(result));
        self.transition(Phase::Ready);
        Ok(())
    }

    /// Any state → `Empty`. Callers tear down every visual.
    pub fn fail(&mut self, reason: &str) {
        tracing::warn!(phase = %self.phase, reason, "analysis session failed");
        self.clear_all_state();
        self.transition(Phase::Empty);
    }

    /// `Ready` → `Outdated`; returns `false` (and does nothing) from any other phase.
    pub fn mark_outdated(&mut self) -> bool {
        if self.phase != Phase::Ready {
            return false;
        }
        self.clear_interaction();
        self.transition(Phase::Outdated);
        true
    }

    pub fn reset(&mut self) {
        self.clear_all_state();
        self.transition(Phase::Empty);
    }

    pub fn set_focus(&mut self, block_id: &BlockId) -> Result<(), TransitionError> {
        if self.phase != Phase::Ready {
            return Err(TransitionError::NotReady { phase: self.phase });
        }
        if !self.result.as_ref().is_some_and(|result| result.contains_block(block_id)) {
            return Err(TransitionError::UnknownBlock {
                block_id: block_id.clone(),
            });
        }
        if self.fold.folded_block_id.as_ref().is_some_and(|folded| folded != block_id) {
            self.fold = FoldState::default();
        }
        self.focus.active_block_id = Some(block_id.clone());
        Ok(())
    }

    pub fn clear_focus(&mut self) {
        self.focus = FocusState::default();
        self.fold = FoldState::default();
    }

    pub fn set_fold(
        &mut self,
        block_id: &BlockId,
        ranges: Vec<RenderRange>,
    ) -> Result<(), TransitionError> {
        if self.focus.active_block_id.as_ref() != Some(block_id) {
            return Err(TransitionError::FoldWithoutFocus {
                block_id: block_id.clone(),
            });
        }
        self.fold = FoldState {
            folded_block_id: Some(block_id.clone()),
            folded_ranges: ranges,
        };
        Ok(())
    }

    pub fn clear_fold(&mut self) {
        self.fold = FoldState::default();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn result(&self) -> Option<&Arc<AnalysisResult>> {
        self.result.as_ref()
    }

    pub fn intent(&self) -> Option<&str> {
        self.result.as_deref().map(AnalysisResult::intent)
    }

    pub fn blocks(&self) -> &[NormalizedBlock] {
        self.result.as_deref().map(AnalysisResult::blocks).unwrap_or(&[])
    }

    pub fn find_block(&self, block_id: &BlockId) -> Option<&NormalizedBlock> {
        self.result.as_deref().and_then(|result| result.find_block(block_id))
    }

    pub fn source_version(&self) -> Option<SourceVersion> {
        self.source_version
    }

    pub fn in_flight(&self) -> Option<AnalysisTicket> {
        self.in_flight
    }

    pub fn focus(&self) -> &FocusState {
        &self.focus
    }

    pub fn fold(&self) -> &FoldState {
        &self.fold
    }

    pub fn is_focus_active(&self) -> bool {
        self.focus.active_block_id.is_some()
    }

    pub fn focused_block_id(&self) -> Option<&BlockId> {
        self.focus.active_block_id()
    }

    pub fn is_fold_active(&self) -> bool {
        !self.fold.is_empty()
    }

    pub fn folded_block_id(&self) -> Option<&BlockId> {
        self.fold.folded_block_id()
    }

    pub fn folded_ranges(&self) -> &[RenderRange] {
        self.fold.folded_ranges()
    }

    fn clear_interaction(&mut self) {
        self.focus = FocusState::default();
        self.fold = FoldState::default();
    }

    fn clear_all_state(&mut self) {
        self.result = None;
        self.source_version = None;
        self.in_flight = None;
        self.clear_interaction();
    }

    fn transition(&mut self, to: Phase) {
        tracing::debug!(from = %self.phase, to = %to, "session transition");
        self.phase = to;
        self.listeners.emit(&to);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    AlreadyPending,
    NotPending { phase: Phase },
    StaleTicket { ticket: AnalysisTicket },
    NotReady { phase: Phase },
    UnknownBlock { block_id: BlockId },
    FoldWithoutFocus { block_id: BlockId },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyPending => f.write_str("an analysis is already in progress"),
            Self::NotPending { phase } => {
                write!(f, "no analysis in flight (phase={phase})")
            }
            Self::StaleTicket { ticket } => {
                write!(f, "analysis {ticket} is no longer the one in flight")
            }
            Self::NotReady { phase } => write!(f, "session is not ready (phase={phase})"),
            Self::UnknownBlock { block_id } => {
                write!(f, "block {block_id} is not part of the current analysis")
            }
            Self::FoldWithoutFocus { block_id } => {
                write!(f, "cannot fold block {block_id} while it is not focused")
            }
        }
    }
}

impl std::error::Error for TransitionError {}
