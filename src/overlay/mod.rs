// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! One document's overlay.
//!
//! [`DocumentOverlay`] composes the session, colour assignment, decorations, gap folding and
//! click disambiguation around a single render surface. Every method runs to completion; the
//! host feeds it analysis completions, interaction events and document edits in order.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::OverlayConfig;
use crate::decorate::DecorationEngine;
use crate::events::{Listeners, Subscription};
use crate::fold::{decide_fold, FoldDecision, GapFolder};
use crate::identity::{BlockColor, ColorAssigner, Tone};
use crate::interaction::{ClickOutcome, ClickTracker, Clock, SystemClock};
use crate::model::{
    AnalysisResult, AnalysisTicket, BlockId, DocumentId, Phase, Session, SourceVersion,
    TicketSource, TransitionError,
};
use crate::protocol::{decode_result, AnalyzerError, ProtocolError};
use crate::surface::RenderSurface;

/// Events originating from the block list/panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "block_id", rename_all = "snake_case")]
pub enum UserInteractionEvent {
    /// The panel (re)attached and wants the current analysis.
    Ready,
    HoverBlock(BlockId),
    ClickBlock(BlockId),
    DoubleClickBlock(BlockId),
    ClearHover,
    ClearFocus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Unchanged,
    /// The event referenced a block or state that is no longer current.
    Stale,
    /// The render surface refused; nothing was kept.
    Rejected,
}

pub struct DocumentOverlay<S: RenderSurface> {
    document: DocumentId,
    session: Session,
    colors: ColorAssigner,
    decorations: DecorationEngine,
    folder: GapFolder,
    clicks: ClickTracker,
    clock: Box<dyn Clock>,
    surface: S,
    tone: Tone,
    document_version: SourceVersion,
    analysis_listeners: Listeners<Arc<AnalysisResult>>,
    disposed: bool,
}

impl<S: RenderSurface> fmt::Debug for DocumentOverlay<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentOverlay")
            .field("document", &self.document)
            .field("phase", &self.session.phase())
            .field("document_version", &self.document_version)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl<S: RenderSurface> DocumentOverlay<S> {
    pub fn new(document: DocumentId, surface: S, config: &OverlayConfig) -> Self {
        Self {
            document,
            session: Session::new(),
            colors: ColorAssigner::new(config.colors.clone()),
            decorations: DecorationEngine::new(config.dim_opacity_pct),
            folder: GapFolder,
            clicks: ClickTracker::new(config.double_click_window()),
            clock: Box::new(SystemClock::new()),
            surface,
            tone: config.tone,
            document_version: SourceVersion::default(),
            analysis_listeners: Listeners::new(),
            disposed: false,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Share a ticket counter with other overlays of the same host.
    pub fn with_tickets(mut self, tickets: TicketSource) -> Self {
        self.session.use_tickets(tickets);
        self
    }

    pub fn with_document_version(mut self, version: SourceVersion) -> Self {
        self.document_version = version;
        self
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn decorations(&self) -> &DecorationEngine {
        &self.decorations
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn document_version(&self) -> SourceVersion {
        self.document_version
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn color_for(&mut self, block_id: &BlockId) -> BlockColor {
        self.colors.color_for(block_id, self.tone)
    }

    /// Phase-only notifications.
    pub fn subscribe_state(&self, callback: impl FnMut(&Phase) + 'static) -> Subscription {
        self.session.subscribe(callback)
    }

    /// Normalized results, once per adoption. A late subscriber immediately receives the
    /// current result, if there is one.
    pub fn subscribe_analysis(
        &self,
        callback: impl FnMut(&Arc<AnalysisResult>) + 'static,
    ) -> Subscription {
        let mut callback = callback;
        if let Some(result) = self.session.result() {
            callback(result);
        }
        self.analysis_listeners.subscribe(callback)
    }

    /// Start an analysis of the current document version.
    pub fn begin_analysis(&mut self) -> Result<AnalysisTicket, OverlayError> {
        if self.disposed {
            return Err(OverlayError::Disposed);
        }
        if self.session.phase() == Phase::Pending {
            tracing::warn!(document = %self.document, "analysis already in progress");
            return Err(OverlayError::DuplicateTrigger);
        }
        self.clear_visuals();
        let ticket = self
            .session
            .start_analysis(self.document_version)
            .map_err(|err| match err {
                TransitionError::AlreadyPending => OverlayError::DuplicateTrigger,
                other => OverlayError::Stale(other),
            })?;
        tracing::debug!(document = %self.document, %ticket, version = %self.document_version, "analysis started");
        Ok(ticket)
    }

    /// Feed the outcome of the analysis identified by `ticket`.
    ///
    /// Completions for an analysis that is no longer in flight are discarded without touching
    /// the session. A malformed response or an analyzer failure fails the session to `Empty`.
    pub fn complete_analysis(
        &mut self,
        ticket: AnalysisTicket,
        outcome: Result<String, AnalyzerError>,
    ) -> Result<(), OverlayError> {
        if self.session.phase() != Phase::Pending {
            tracing::warn!(document = %self.document, %ticket, phase = %self.session.phase(), "late analysis response discarded");
            return Err(OverlayError::Stale(TransitionError::NotPending {
                phase: self.session.phase(),
            }));
        }
        if self.session.in_flight() != Some(ticket) {
            tracing::warn!(document = %self.document, %ticket, "response for an abandoned analysis discarded");
            return Err(OverlayError::Stale(TransitionError::StaleTicket { ticket }));
        }

        let json = match outcome {
            Ok(json) => json,
            Err(err) => {
                self.fail(&err.to_string());
                return Err(OverlayError::Analyzer(err));
            }
        };

        let analyzed_version = self.session.source_version().unwrap_or(self.document_version);
        let result = match decode_result(
            &json,
            Some(self.surface.line_count()),
            analyzed_version,
            now_ms(),
        ) {
            Ok(result) => result,
            Err(err) => {
                self.fail(&err.to_string());
                return Err(OverlayError::Protocol(err));
            }
        };

        self.session
            .complete_analysis(ticket, result)
            .map_err(OverlayError::Stale)?;
        self.release_stale_handles();
        tracing::info!(
            document = %self.document,
            blocks = self.session.blocks().len(),
            version = %analyzed_version,
            "analysis adopted"
        );
        self.publish_analysis();

        if analyzed_version < self.document_version {
            tracing::info!(document = %self.document, analyzed = %analyzed_version, current = %self.document_version, "document changed during analysis");
            self.session.mark_outdated();
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: UserInteractionEvent) -> EventOutcome {
        if self.disposed {
            return EventOutcome::Stale;
        }
        match event {
            UserInteractionEvent::Ready => {
                if self.publish_analysis() {
                    EventOutcome::Applied
                } else {
                    EventOutcome::Unchanged
                }
            }
            UserInteractionEvent::HoverBlock(block_id) => self.hover(&block_id),
            UserInteractionEvent::ClickBlock(block_id) => self.click(&block_id),
            UserInteractionEvent::DoubleClickBlock(block_id) => self.double_click(&block_id),
            UserInteractionEvent::ClearHover => {
                if self.decorations.previewed_block_id().is_none() {
                    return EventOutcome::Unchanged;
                }
                self.decorations.clear_preview(&mut self.surface);
                EventOutcome::Applied
            }
            UserInteractionEvent::ClearFocus => {
                if self.exit_focus() {
                    EventOutcome::Applied
                } else {
                    EventOutcome::Unchanged
                }
            }
        }
    }

    /// Raw pointer click on a block; single clicks wait for the double-click window.
    pub fn pointer_click(&mut self, block_id: &BlockId) -> Option<EventOutcome> {
        let now = self.clock.now_ms();
        match self.clicks.click(block_id, now) {
            ClickOutcome::Pending { flushed } => {
                flushed.map(|id| self.handle_event(UserInteractionEvent::ClickBlock(id)))
            }
            ClickOutcome::Double(id) => {
                Some(self.handle_event(UserInteractionEvent::DoubleClickBlock(id)))
            }
        }
    }

    /// Deliver a pending single click whose window has elapsed.
    pub fn tick(&mut self) -> Option<EventOutcome> {
        let now = self.clock.now_ms();
        let block_id = self.clicks.expire(now)?;
        Some(self.handle_event(UserInteractionEvent::ClickBlock(block_id)))
    }

    /// Clock time (ms) at which [`Self::tick`] has a click to deliver.
    pub fn next_click_deadline(&self) -> Option<u64> {
        self.clicks.deadline()
    }

    /// Any edit of the tracked document. Returns whether a ready result became outdated.
    pub fn on_document_changed(&mut self, version: SourceVersion) -> bool {
        if version > self.document_version {
            self.document_version = version;
        }
        self.clear_visuals();
        let outdated = self.session.mark_outdated();
        if outdated {
            tracing::debug!(document = %self.document, %version, "analysis outdated by edit");
        }
        outdated
    }

    /// Drop everything back to `Empty`.
    pub fn reset(&mut self) {
        self.clear_visuals();
        self.session.reset();
        self.release_stale_handles();
    }

    /// Clear every highlight and fold and release every surface handle.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.clear_visuals();
        self.decorations.dispose(&mut self.surface);
        self.colors.clear();
        self.session.reset();
        self.analysis_listeners.clear();
        self.disposed = true;
        tracing::debug!(document = %self.document, "overlay disposed");
    }

    fn fail(&mut self, reason: &str) {
        self.clear_visuals();
        self.session.fail(reason);
        self.release_stale_handles();
    }

    /// Release decoration handles and cached colours of blocks the session no longer holds.
    fn release_stale_handles(&mut self) {
        let keep: Vec<BlockId> = self
            .session
            .blocks()
            .iter()
            .map(|block| block.block_id().clone())
            .collect();
        self.decorations.retain_blocks(&mut self.surface, &keep);
        self.colors.retain(&keep);
    }

    fn publish_analysis(&self) -> bool {
        match self.session.result() {
            Some(result) => {
                self.analysis_listeners.emit(result);
                true
            }
            None => false,
        }
    }

    fn hover(&mut self, block_id: &BlockId) -> EventOutcome {
        let Some(result) = self.ready_result(block_id, "hover") else {
            return EventOutcome::Stale;
        };
        let Some(block) = result.find_block(block_id) else {
            return EventOutcome::Stale;
        };
        let color = self.colors.color_for(block_id, self.tone);
        match self.decorations.preview_block(&mut self.surface, block, color) {
            Ok(true) => EventOutcome::Applied,
            Ok(false) => EventOutcome::Unchanged,
            Err(err) => {
                tracing::warn!(document = %self.document, block = %block_id, error = %err, "preview rejected");
                EventOutcome::Rejected
            }
        }
    }

    fn click(&mut self, block_id: &BlockId) -> EventOutcome {
        if self.ready_result(block_id, "click").is_none() {
            return EventOutcome::Stale;
        }
        if self.session.focused_block_id() == Some(block_id) {
            self.exit_focus();
            return EventOutcome::Applied;
        }
        self.focus(block_id)
    }

    fn double_click(&mut self, block_id: &BlockId) -> EventOutcome {
        let Some(result) = self.ready_result(block_id, "double click") else {
            return EventOutcome::Stale;
        };
        let Some(block) = result.find_block(block_id) else {
            return EventOutcome::Stale;
        };

        let newly_focused = self.session.focused_block_id() != Some(block_id);
        if newly_focused {
            match self.focus(block_id) {
                EventOutcome::Applied => {}
                other => return other,
            }
        }

        match decide_fold(&self.session, block) {
            FoldDecision::Unfold => {
                self.exit_focus();
                EventOutcome::Applied
            }
            FoldDecision::Noop if newly_focused => EventOutcome::Applied,
            FoldDecision::Noop => EventOutcome::Unchanged,
            FoldDecision::Fold(gaps) => {
                match self
                    .folder
                    .apply_folds(&mut self.surface, &mut self.session, block_id, gaps)
                {
                    Ok(()) => EventOutcome::Applied,
                    Err(err) => {
                        tracing::warn!(document = %self.document, block = %block_id, error = %err, "fold rejected");
                        EventOutcome::Rejected
                    }
                }
            }
        }
    }

    fn focus(&mut self, block_id: &BlockId) -> EventOutcome {
        let Some(result) = self.session.result().cloned() else {
            return EventOutcome::Stale;
        };
        let Some(block) = result.find_block(block_id) else {
            return EventOutcome::Stale;
        };

        let previous = self.session.focused_block_id().cloned();
        let color = self.colors.color_for(block_id, self.tone);
        if let Err(err) =
            self.decorations
                .enter_focus(&mut self.surface, block, result.blocks(), color)
        {
            tracing::warn!(document = %self.document, block = %block_id, error = %err, "focus rejected");
            self.restore_focus(previous.as_ref(), &result);
            return EventOutcome::Rejected;
        }
        if self.session.folded_block_id().is_some_and(|folded| folded != block_id) {
            self.folder.remove_folds(&mut self.surface, &mut self.session);
        }
        if let Err(err) = self.session.set_focus(block_id) {
            tracing::warn!(document = %self.document, block = %block_id, error = %err, "focus not recorded");
            self.decorations.exit_focus(&mut self.surface);
            return EventOutcome::Stale;
        }

        if let Err(err) = self.surface.reveal_line(block.first_render_line()) {
            tracing::warn!(document = %self.document, block = %block_id, error = %err, "reveal rejected");
        }
        EventOutcome::Applied
    }

    /// Re-apply the highlights of `previous` after a rejected focus switch; its folds were
    /// never touched. Ends idle when there is nothing to restore or the surface refuses again.
    fn restore_focus(&mut self, previous: Option<&BlockId>, result: &AnalysisResult) {
        let restored = match previous.and_then(|id| result.find_block(id)) {
            Some(block) => {
                let color = self.colors.color_for(block.block_id(), self.tone);
                self.decorations
                    .enter_focus(&mut self.surface, block, result.blocks(), color)
                    .is_ok()
            }
            None => false,
        };
        if restored {
            tracing::debug!(document = %self.document, block = ?previous, "previous focus restored");
            return;
        }
        self.folder.remove_folds(&mut self.surface, &mut self.session);
        self.session.clear_focus();
    }

    fn exit_focus(&mut self) -> bool {
        let folded = self.folder.remove_folds(&mut self.surface, &mut self.session);
        let focused = self.decorations.exit_focus(&mut self.surface);
        let recorded = self.session.is_focus_active();
        self.session.clear_focus();
        folded || focused || recorded
    }

    /// Current result when `block_id` is actionable; logs the stale reference otherwise.
    fn ready_result(&self, block_id: &BlockId, action: &'static str) -> Option<Arc<AnalysisResult>> {
        let phase = self.session.phase();
        if phase != Phase::Ready {
            tracing::warn!(document = %self.document, block = %block_id, %phase, action, "interaction outside ready phase ignored");
            return None;
        }
        let result = self.session.result()?;
        if !result.contains_block(block_id) {
            tracing::warn!(document = %self.document, block = %block_id, action, "unknown block ignored");
            return None;
        }
        Some(Arc::clone(result))
    }

    fn clear_visuals(&mut self) {
        self.clicks.cancel();
        self.folder.remove_folds(&mut self.surface, &mut self.session);
        self.decorations.clear_all(&mut self.surface);
        self.session.clear_focus();
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    DuplicateTrigger,
    Stale(TransitionError),
    Protocol(ProtocolError),
    Analyzer(AnalyzerError),
    Disposed,
}

impl OverlayError {
    /// Message for the user, for the failures that reach them.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::DuplicateTrigger => Some("Analysis already in progress".to_owned()),
            Self::Protocol(err) => Some(format!("Analysis failed: {err}")),
            Self::Analyzer(err) => Some(format!("Analysis failed: {err}")),
            Self::Stale(_) | Self::Disposed => None,
        }
    }
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateTrigger => f.write_str("analysis already in progress"),
            Self::Stale(err) => write!(f, "stale analysis response: {err}"),
            Self::Protocol(err) => write!(f, "{err}"),
            Self::Analyzer(err) => write!(f, "{err}"),
            Self::Disposed => f.write_str("overlay has been disposed"),
        }
    }
}

impl std::error::Error for OverlayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Stale(err) => Some(err),
            Self::Protocol(err) => Some(err),
            Self::Analyzer(err) => Some(err),
            Self::DuplicateTrigger | Self::Disposed => None,
        }
    }
}

#[cfg(test)]
mod tests;
