// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Tessera: a code-reading overlay engine.
//!
//! An external analysis splits a source file into responsibility blocks (possibly
//! non-contiguous). Tessera gives each block a stable identity and color, paints hover
//! previews and focus/dim decorations onto a [`surface::RenderSurface`], and folds the
//! unrelated code between the ranges of a focused block.
//!
//! The entry point per document is [`overlay::DocumentOverlay`]; [`host`] owns one overlay per
//! open document and drives them from editor and panel channels.

pub mod config;
pub mod decorate;
pub mod events;
pub mod fold;
pub mod host;
pub mod identity;
pub mod interaction;
pub mod model;
pub mod overlay;
pub mod protocol;
pub mod surface;
