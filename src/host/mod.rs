// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Host-side ownership of overlays.
//!
//! One [`DocumentOverlay`] per open document, created on open and disposed on close. Nothing
//! is shared between documents.

pub mod runtime;

use std::collections::BTreeMap;

use crate::config::OverlayConfig;
use crate::model::{DocumentId, TicketSource};
use crate::overlay::{DocumentOverlay, UserInteractionEvent};
use crate::surface::RenderSurface;

pub use runtime::{
    DriverHandles, EditorSignal, OverlayDriver, TokioClock, UiCommand, UiNotification,
};

#[derive(Debug)]
pub struct OverlayRegistry<S: RenderSurface> {
    config: OverlayConfig,
    overlays: BTreeMap<DocumentId, DocumentOverlay<S>>,
    active: Option<DocumentId>,
    tickets: TicketSource,
}

impl<S: RenderSurface> OverlayRegistry<S> {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            overlays: BTreeMap::new(),
            active: None,
            tickets: TicketSource::new(),
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Create the overlay for `document`. An overlay already registered for it is disposed
    /// first.
    pub fn open(&mut self, document: DocumentId, surface: S) -> &mut DocumentOverlay<S> {
        let overlay = DocumentOverlay::new(document, surface, &self.config);
        self.insert(overlay)
    }

    /// Register `overlay`, which draws its analysis tickets from the registry from now on.
    pub fn insert(&mut self, overlay: DocumentOverlay<S>) -> &mut DocumentOverlay<S> {
        let overlay = overlay.with_tickets(self.tickets.clone());
        let document = overlay.document().clone();
        if let Some(mut previous) = self.overlays.remove(&document) {
            tracing::debug!(%document, "document reopened; disposing previous overlay");
            previous.dispose();
        }
        tracing::debug!(%document, "overlay opened");
        self.overlays.entry(document).or_insert(overlay)
    }

    /// Dispose and drop the overlay of `document`. Returns `false` if none was open.
    pub fn close(&mut self, document: &DocumentId) -> bool {
        let Some(mut overlay) = self.overlays.remove(document) else {
            return false;
        };
        overlay.dispose();
        if self.active.as_ref() == Some(document) {
            self.active = None;
        }
        tracing::debug!(%document, "overlay closed");
        true
    }

    pub fn get(&self, document: &DocumentId) -> Option<&DocumentOverlay<S>> {
        self.overlays.get(document)
    }

    pub fn get_mut(&mut self, document: &DocumentId) -> Option<&mut DocumentOverlay<S>> {
        self.overlays.get_mut(document)
    }

    pub fn contains(&self, document: &DocumentId) -> bool {
        self.overlays.contains_key(document)
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &DocumentId> {
        self.overlays.keys()
    }

    pub fn overlays(&self) -> impl Iterator<Item = &DocumentOverlay<S>> {
        self.overlays.values()
    }

    pub fn overlays_mut(&mut self) -> impl Iterator<Item = &mut DocumentOverlay<S>> {
        self.overlays.values_mut()
    }

    pub fn active_document(&self) -> Option<&DocumentId> {
        self.active.as_ref()
    }

    pub fn active_overlay_mut(&mut self) -> Option<&mut DocumentOverlay<S>> {
        let document = self.active.as_ref()?;
        self.overlays.get_mut(document)
    }

    /// Switch editor focus. The document losing focus drops its hover preview.
    pub fn set_active_document(&mut self, document: Option<DocumentId>) {
        if self.active == document {
            return;
        }
        if let Some(previous) = self.active.take() {
            if let Some(overlay) = self.overlays.get_mut(&previous) {
                overlay.handle_event(UserInteractionEvent::ClearHover);
            }
        }
        self.active = document.filter(|document| self.overlays.contains_key(document));
    }

    /// Dispose every overlay. Used when the host shuts down.
    pub fn dispose_all(&mut self) {
        for (_, mut overlay) in std::mem::take(&mut self.overlays) {
            overlay.dispose();
        }
        self.active = None;
    }
}

impl<S: RenderSurface> Drop for OverlayRegistry<S> {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
