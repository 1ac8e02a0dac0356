// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Event loop wiring overlays to an editor, a panel and an analysis service.
//!
//! The driver runs on a current-thread runtime inside a [`tokio::task::LocalSet`]: overlays are
//! single-threaded and analyzer futures are spawned locally. Editor signals always win the
//! select, so an edit is applied before any UI event, completion or click timer queued behind
//! it.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use super::OverlayRegistry;
use crate::config::OverlayConfig;
use crate::events::Subscription;
use crate::interaction::Clock;
use crate::model::{AnalysisResult, AnalysisTicket, BlockId, DocumentId, Phase, SourceVersion};
use crate::overlay::{DocumentOverlay, UserInteractionEvent};
use crate::protocol::{AnalyzeRequest, Analyzer, AnalyzerError};
use crate::surface::RenderSurface;

/// [`Clock`] on tokio's time source, so paused test runtimes drive the click window.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn instant_at(&self, ms: u64) -> Instant {
        self.origin + Duration::from_millis(ms)
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Synchronous signals from the editor.
pub enum EditorSignal<S> {
    Opened {
        document: DocumentId,
        surface: S,
        text: String,
        version: SourceVersion,
    },
    Edited {
        document: DocumentId,
        text: String,
        version: SourceVersion,
    },
    Activated {
        document: Option<DocumentId>,
    },
    Closed {
        document: DocumentId,
    },
}

/// Requests from the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Analyze {
        document: DocumentId,
    },
    Interaction {
        document: DocumentId,
        event: UserInteractionEvent,
    },
    /// A raw click, disambiguated against the double-click window.
    PointerClick {
        document: DocumentId,
        block_id: BlockId,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiNotification {
    Phase {
        document: DocumentId,
        phase: Phase,
    },
    AnalysisData {
        document: DocumentId,
        result: Arc<AnalysisResult>,
    },
    Notice {
        document: DocumentId,
        message: String,
    },
}

struct Completion {
    document: DocumentId,
    ticket: AnalysisTicket,
    outcome: Result<String, AnalyzerError>,
}

pub struct DriverHandles<S> {
    pub editor: mpsc::UnboundedSender<EditorSignal<S>>,
    pub ui: mpsc::UnboundedSender<UiCommand>,
    pub notifications: mpsc::UnboundedReceiver<UiNotification>,
}

pub struct OverlayDriver<S: RenderSurface, A: Analyzer> {
    registry: OverlayRegistry<S>,
    analyzer: Rc<A>,
    clock: TokioClock,
    sources: BTreeMap<DocumentId, String>,
    subscriptions: BTreeMap<DocumentId, Vec<Subscription>>,
    editor_rx: mpsc::UnboundedReceiver<EditorSignal<S>>,
    ui_rx: mpsc::UnboundedReceiver<UiCommand>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    notify_tx: mpsc::UnboundedSender<UiNotification>,
}

impl<S: RenderSurface + 'static, A: Analyzer + 'static> OverlayDriver<S, A> {
    /// Create inside the runtime that will run the driver; the click clock reads its time.
    pub fn new(analyzer: A, config: OverlayConfig) -> (Self, DriverHandles<S>) {
        let (editor_tx, editor_rx) = mpsc::unbounded_channel();
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        let driver = Self {
            registry: OverlayRegistry::new(config),
            analyzer: Rc::new(analyzer),
            clock: TokioClock::new(),
            sources: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            editor_rx,
            ui_rx,
            completion_tx,
            completion_rx,
            notify_tx,
        };
        let handles = DriverHandles {
            editor: editor_tx,
            ui: ui_tx,
            notifications: notify_rx,
        };
        (driver, handles)
    }

    /// Process events until [`UiCommand::Shutdown`] or the UI channel closes, then dispose
    /// every overlay. Must run inside a [`tokio::task::LocalSet`].
    pub async fn run(mut self) {
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                biased;
                Some(signal) = self.editor_rx.recv() => self.on_editor_signal(signal),
                Some(completion) = self.completion_rx.recv() => self.on_completion(completion),
                command = self.ui_rx.recv() => match command {
                    Some(UiCommand::Shutdown) | None => break,
                    Some(command) => self.on_ui_command(command),
                },
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_timer();
                }
            }
        }

        for (_, subscriptions) in std::mem::take(&mut self.subscriptions) {
            subscriptions.into_iter().for_each(Subscription::unsubscribe);
        }
        self.registry.dispose_all();
        tracing::debug!("overlay driver stopped");
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.registry
            .overlays()
            .filter_map(DocumentOverlay::next_click_deadline)
            .min()
            .map(|ms| self.clock.instant_at(ms))
    }

    fn on_editor_signal(&mut self, signal: EditorSignal<S>) {
        match signal {
            EditorSignal::Opened {
                document,
                surface,
                text,
                version,
            } => self.open(document, surface, text, version),
            EditorSignal::Edited {
                document,
                text,
                version,
            } => {
                let Some(overlay) = self.registry.get_mut(&document) else {
                    tracing::debug!(%document, "edit for untracked document");
                    return;
                };
                overlay.on_document_changed(version);
                overlay.surface_mut().sync_text(&text);
                self.sources.insert(document, text);
            }
            EditorSignal::Activated { document } => self.registry.set_active_document(document),
            EditorSignal::Closed { document } => self.close(&document),
        }
    }

    fn open(&mut self, document: DocumentId, surface: S, text: String, version: SourceVersion) {
        self.close(&document);
        let overlay = DocumentOverlay::new(document.clone(), surface, self.registry.config())
            .with_clock(self.clock)
            .with_document_version(version);
        let overlay = self.registry.insert(overlay);

        let phase_tx = self.notify_tx.clone();
        let phase_doc = document.clone();
        let phase = overlay.subscribe_state(move |phase| {
            let _ = phase_tx.send(UiNotification::Phase {
                document: phase_doc.clone(),
                phase: *phase,
            });
        });
        let data_tx = self.notify_tx.clone();
        let data_doc = document.clone();
        let data = overlay.subscribe_analysis(move |result| {
            let _ = data_tx.send(UiNotification::AnalysisData {
                document: data_doc.clone(),
                result: Arc::clone(result),
            });
        });

        self.subscriptions.insert(document.clone(), vec![phase, data]);
        self.sources.insert(document, text);
    }

    fn close(&mut self, document: &DocumentId) {
        if let Some(subscriptions) = self.subscriptions.remove(document) {
            subscriptions.into_iter().for_each(Subscription::unsubscribe);
        }
        self.sources.remove(document);
        self.registry.close(document);
    }

    fn on_ui_command(&mut self, command: UiCommand) {
        match command {
            UiCommand::Analyze { document } => self.analyze(document),
            UiCommand::Interaction { document, event } => {
                match self.registry.get_mut(&document) {
                    Some(overlay) => {
                        let outcome = overlay.handle_event(event);
                        tracing::trace!(%document, ?outcome, "interaction handled");
                    }
                    None => tracing::warn!(%document, "interaction for closed document ignored"),
                }
            }
            UiCommand::PointerClick { document, block_id } => {
                match self.registry.get_mut(&document) {
                    Some(overlay) => {
                        overlay.pointer_click(&block_id);
                    }
                    None => tracing::warn!(%document, "click for closed document ignored"),
                }
            }
            UiCommand::Shutdown => {}
        }
    }

    fn analyze(&mut self, document: DocumentId) {
        let Some(overlay) = self.registry.get_mut(&document) else {
            tracing::warn!(%document, "analysis requested for closed document");
            return;
        };
        let ticket = match overlay.begin_analysis() {
            Ok(ticket) => ticket,
            Err(err) => {
                if let Some(message) = err.user_message() {
                    self.notify(&document, message);
                }
                return;
            }
        };

        let source = self.sources.get(&document).cloned().unwrap_or_default();
        let request = AnalyzeRequest::new(&document, source, overlay.document_version());
        let analyzer = Rc::clone(&self.analyzer);
        let completion_tx = self.completion_tx.clone();
        tokio::task::spawn_local(async move {
            let outcome = analyzer.analyze(request).await;
            let _ = completion_tx.send(Completion {
                document,
                ticket,
                outcome,
            });
        });
    }

    fn on_completion(&mut self, completion: Completion) {
        let Completion {
            document,
            ticket,
            outcome,
        } = completion;
        let Some(overlay) = self.registry.get_mut(&document) else {
            tracing::debug!(%document, %ticket, "completion for closed document discarded");
            return;
        };
        if let Err(err) = overlay.complete_analysis(ticket, outcome) {
            if let Some(message) = err.user_message() {
                self.notify(&document, message);
            }
        }
    }

    fn on_timer(&mut self) {
        for overlay in self.registry.overlays_mut() {
            overlay.tick();
        }
    }

    fn notify(&self, document: &DocumentId, message: String) {
        let _ = self.notify_tx.send(UiNotification::Notice {
            document: document.clone(),
            message,
        });
    }
}
