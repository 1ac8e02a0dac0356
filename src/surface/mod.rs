// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Render-surface adapter.
//!
//! The overlay never touches document text. Everything it shows goes through
//! [`RenderSurface`]: decoration handles carrying a style, the 0-based line ranges each handle
//! currently covers, fold/unfold requests and a reveal request. Hosts implement the trait for
//! their editor; [`BufferSurface`] is the in-memory/terminal implementation.

pub mod buffer;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::identity::{Rgb, Rgba};
use crate::model::RenderRange;

pub use buffer::BufferSurface;

/// Opaque key of one decoration created on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecorationHandle(pub u64);

impl fmt::Display for DecorationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deco#{}", self.0)
    }
}

/// Visual treatment of a decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationStyle {
    /// Low-emphasis hover highlight.
    Preview { fill: Rgba },
    /// High-emphasis highlight of the focused block, with an opaque gutter marker.
    Focus { fill: Rgba, marker: Rgb },
    /// Overlay on lines of blocks other than the focused one.
    Dim { opacity_pct: u8 },
}

impl DecorationStyle {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Preview { .. } => "preview",
            Self::Focus { .. } => "focus",
            Self::Dim { .. } => "dim",
        }
    }
}

pub trait RenderSurface {
    fn create_decoration(
        &mut self,
        style: DecorationStyle,
    ) -> Result<DecorationHandle, SurfaceError>;

    /// Replace the ranges covered by `handle`; an empty slice clears it.
    fn set_decoration_ranges(
        &mut self,
        handle: DecorationHandle,
        ranges: &[RenderRange],
    ) -> Result<(), SurfaceError>;

    /// Dispose of the handle. Releasing an unknown handle is not an error.
    fn release_decoration(&mut self, handle: DecorationHandle);

    fn fold(&mut self, ranges: &[RenderRange]) -> Result<(), SurfaceError>;

    fn unfold(&mut self, ranges: &[RenderRange]) -> Result<(), SurfaceError>;

    fn reveal_line(&mut self, line: u32) -> Result<(), SurfaceError>;

    fn line_count(&self) -> u32;

    /// Called after the host edited the document. Surfaces that mirror the text refresh it;
    /// editor-backed surfaces usually have nothing to do.
    fn sync_text(&mut self, _text: &str) {}
}

impl<T: RenderSurface + ?Sized> RenderSurface for Rc<RefCell<T>> {
    fn create_decoration(
        &mut self,
        style: DecorationStyle,
    ) -> Result<DecorationHandle, SurfaceError> {
        self.borrow_mut().create_decoration(style)
    }

    fn set_decoration_ranges(
        &mut self,
        handle: DecorationHandle,
        ranges: &[RenderRange],
    ) -> Result<(), SurfaceError> {
        self.borrow_mut().set_decoration_ranges(handle, ranges)
    }

    fn release_decoration(&mut self, handle: DecorationHandle) {
        self.borrow_mut().release_decoration(handle);
    }

    fn fold(&mut self, ranges: &[RenderRange]) -> Result<(), SurfaceError> {
        self.borrow_mut().fold(ranges)
    }

    fn unfold(&mut self, ranges: &[RenderRange]) -> Result<(), SurfaceError> {
        self.borrow_mut().unfold(ranges)
    }

    fn reveal_line(&mut self, line: u32) -> Result<(), SurfaceError> {
        self.borrow_mut().reveal_line(line)
    }

    fn line_count(&self) -> u32 {
        self.borrow().line_count()
    }

    fn sync_text(&mut self, text: &str) {
        self.borrow_mut().sync_text(text);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The document behind the surface is gone (closed mid-operation).
    Closed,
    UnknownHandle { handle: DecorationHandle },
    OutOfBounds { range: RenderRange, line_count: u32 },
    Rejected { reason: String },
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("render surface is closed"),
            Self::UnknownHandle { handle } => write!(f, "unknown decoration handle {handle}"),
            Self::OutOfBounds { range, line_count } => {
                write!(f, "range {range} outside document of {line_count} lines")
            }
            Self::Rejected { reason } => write!(f, "render surface rejected request: {reason}"),
        }
    }
}

impl std::error::Error for SurfaceError {}
