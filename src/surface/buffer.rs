// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, BTreeSet};

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Widget;

use super::{DecorationHandle, DecorationStyle, RenderSurface, SurfaceError};
use crate::identity::Rgb;
use crate::model::RenderRange;

const GUTTER_WIDTH: u16 = 7;

#[derive(Debug, Clone)]
struct Decoration {
    style: DecorationStyle,
    ranges: Vec<RenderRange>,
}

/// A visible row of a [`BufferSurface`] after folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Line(u32),
    Folded(RenderRange),
}

/// In-memory render surface over a snapshot of document lines.
///
/// Tracks decorations and folds exactly as a host editor would, renders into a `ratatui`
/// [`Buffer`] (or annotated plain text), and can be closed to make every request fail the way
/// a host does when its document disappears mid-operation.
#[derive(Debug, Clone)]
pub struct BufferSurface {
    lines: Vec<String>,
    background: Rgb,
    next_handle: u64,
    decorations: BTreeMap<DecorationHandle, Decoration>,
    folds: BTreeSet<RenderRange>,
    revealed_line: Option<u32>,
    closed: bool,
}

impl BufferSurface {
    pub fn new(lines: Vec<String>, background: Rgb) -> Self {
        Self {
            lines,
            background,
            next_handle: 1,
            decorations: BTreeMap::new(),
            folds: BTreeSet::new(),
            revealed_line: None,
            closed: false,
        }
    }

    pub fn from_text(text: &str, background: Rgb) -> Self {
        Self::new(text.lines().map(ToOwned::to_owned).collect(), background)
    }

    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn live_handles(&self) -> usize {
        self.decorations.len()
    }

    pub fn revealed_line(&self) -> Option<u32> {
        self.revealed_line
    }

    pub fn folded_ranges(&self) -> Vec<RenderRange> {
        self.folds.iter().copied().collect()
    }

    pub fn is_hidden(&self, line: u32) -> bool {
        self.folds.iter().any(|fold| fold.contains(line))
    }

    /// Styles applied to `line`, in handle creation order.
    pub fn styles_at(&self, line: u32) -> Vec<DecorationStyle> {
        self.decorations
            .values()
            .filter(|deco| deco.ranges.iter().any(|range| range.contains(line)))
            .map(|deco| deco.style)
            .collect()
    }

    pub fn preview_lines(&self) -> Vec<u32> {
        self.lines_matching(|style| matches!(style, DecorationStyle::Preview { .. }))
    }

    pub fn focus_lines(&self) -> Vec<u32> {
        self.lines_matching(|style| matches!(style, DecorationStyle::Focus { .. }))
    }

    pub fn dim_lines(&self) -> Vec<u32> {
        self.lines_matching(|style| matches!(style, DecorationStyle::Dim { .. }))
    }

    /// Every line carrying any decoration.
    pub fn decorated_lines(&self) -> Vec<u32> {
        self.lines_matching(|_| true)
    }

    fn lines_matching(&self, pred: impl Fn(&DecorationStyle) -> bool) -> Vec<u32> {
        let lines: BTreeSet<u32> = self
            .decorations
            .values()
            .filter(|deco| pred(&deco.style))
            .flat_map(|deco| deco.ranges.iter().flat_map(RenderRange::lines))
            .collect();
        lines.into_iter().collect()
    }

    pub fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::with_capacity(self.lines.len());
        let mut line = 0u32;
        while line < self.line_count() {
            if let Some(fold) = self.folds.iter().find(|fold| fold.start() == line) {
                rows.push(Row::Folded(*fold));
                line = fold.end() + 1;
                continue;
            }
            rows.push(Row::Line(line));
            line += 1;
        }
        rows
    }

    /// Plain-text rendering: a gutter mark (`▌` focus, `░` preview, `·` dimmed), the 1-based
    /// line number and the line text; folded spans collapse to a single `⋯` row.
    pub fn render_annotated(&self) -> String {
        let mut out = String::new();
        for row in self.rows() {
            match row {
                Row::Line(line) => {
                    let text = self.lines.get(line as usize).map(String::as_str).unwrap_or("");
                    out.push_str(&format!("{}{:>5} {}", self.gutter_mark(line), line + 1, text));
                }
                Row::Folded(range) => {
                    out.push_str(&format!("      ⋯ {} lines folded", range.line_count()));
                }
            }
            out.push('\n');
        }
        out
    }

    fn gutter_mark(&self, line: u32) -> char {
        let styles = self.styles_at(line);
        if styles.iter().any(|s| matches!(s, DecorationStyle::Focus { .. })) {
            '▌'
        } else if styles.iter().any(|s| matches!(s, DecorationStyle::Preview { .. })) {
            '░'
        } else if styles.iter().any(|s| matches!(s, DecorationStyle::Dim { .. })) {
            '·'
        } else {
            ' '
        }
    }

    /// Terminal style for a line: fills composite over the surface background, dimming maps to
    /// [`Modifier::DIM`].
    pub fn line_style(&self, line: u32) -> Style {
        let mut style = Style::default().bg(self.background.into());
        for deco in self.styles_at(line) {
            style = match deco {
                DecorationStyle::Preview { fill } => style.bg(fill.over(self.background).into()),
                DecorationStyle::Focus { fill, .. } => style
                    .bg(fill.over(self.background).into())
                    .add_modifier(Modifier::BOLD),
                DecorationStyle::Dim { .. } => style.add_modifier(Modifier::DIM),
            };
        }
        style
    }

    fn marker_style(&self, line: u32) -> Style {
        self.styles_at(line)
            .into_iter()
            .find_map(|style| match style {
                DecorationStyle::Focus { marker, .. } => Some(Style::default().fg(marker.into())),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn ensure_open(&self) -> Result<(), SurfaceError> {
        if self.closed {
            return Err(SurfaceError::Closed);
        }
        Ok(())
    }

    fn check_bounds(&self, ranges: &[RenderRange]) -> Result<(), SurfaceError> {
        let line_count = self.line_count();
        if let Some(range) = ranges.iter().find(|range| range.end() >= line_count) {
            return Err(SurfaceError::OutOfBounds {
                range: *range,
                line_count,
            });
        }
        Ok(())
    }
}

impl RenderSurface for BufferSurface {
    fn create_decoration(
        &mut self,
        style: DecorationStyle,
    ) -> Result<DecorationHandle, SurfaceError> {
        self.ensure_open()?;
        let handle = DecorationHandle(self.next_handle);
        self.next_handle += 1;
        self.decorations.insert(
            handle,
            Decoration {
                style,
                ranges: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn set_decoration_ranges(
        &mut self,
        handle: DecorationHandle,
        ranges: &[RenderRange],
    ) -> Result<(), SurfaceError> {
        self.ensure_open()?;
        self.check_bounds(ranges)?;
        let deco = self
            .decorations
            .get_mut(&handle)
            .ok_or(SurfaceError::UnknownHandle { handle })?;
        deco.ranges = ranges.to_vec();
        Ok(())
    }

    fn release_decoration(&mut self, handle: DecorationHandle) {
        self.decorations.remove(&handle);
    }

    fn fold(&mut self, ranges: &[RenderRange]) -> Result<(), SurfaceError> {
        self.ensure_open()?;
        self.check_bounds(ranges)?;
        self.folds.extend(ranges.iter().copied());
        Ok(())
    }

    fn unfold(&mut self, ranges: &[RenderRange]) -> Result<(), SurfaceError> {
        self.ensure_open()?;
        for range in ranges {
            self.folds.remove(range);
        }
        Ok(())
    }

    fn reveal_line(&mut self, line: u32) -> Result<(), SurfaceError> {
        self.ensure_open()?;
        if line >= self.line_count() {
            return Err(SurfaceError::OutOfBounds {
                range: RenderRange::single(line),
                line_count: self.line_count(),
            });
        }
        self.revealed_line = Some(line);
        Ok(())
    }

    fn line_count(&self) -> u32 {
        u32::try_from(self.lines.len()).unwrap_or(u32::MAX)
    }

    fn sync_text(&mut self, text: &str) {
        self.lines = text.lines().map(ToOwned::to_owned).collect();
        let line_count = self.line_count();
        self.folds.retain(|fold| fold.end() < line_count);
        for deco in self.decorations.values_mut() {
            deco.ranges.retain(|range| range.end() < line_count);
        }
        if self.revealed_line.is_some_and(|line| line >= line_count) {
            self.revealed_line = None;
        }
    }
}

impl Widget for &BufferSurface {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows = self.rows();
        let start = self
            .revealed_line
            .and_then(|line| {
                rows.iter()
                    .position(|row| matches!(row, Row::Line(l) if *l == line))
            })
            .unwrap_or(0);

        for (offset, row) in rows.iter().skip(start).take(area.height as usize).enumerate() {
            let y = area.y + offset as u16;
            match row {
                Row::Line(line) => {
                    let style = self.line_style(*line);
                    buf.set_style(Rect::new(area.x, y, area.width, 1), style);
                    let mark = self.gutter_mark(*line);
                    buf.set_string(area.x, y, mark.to_string(), self.marker_style(*line));
                    buf.set_string(area.x + 1, y, format!("{:>5} ", line + 1), style);
                    if area.width > GUTTER_WIDTH {
                        let text = self.lines.get(*line as usize).map(String::as_str).unwrap_or("");
                        buf.set_stringn(
                            area.x + GUTTER_WIDTH,
                            y,
                            text,
                            (area.width - GUTTER_WIDTH) as usize,
                            style,
                        );
                    }
                }
                Row::Folded(range) => {
                    let label = format!("      ⋯ {} lines folded", range.line_count());
                    buf.set_stringn(
                        area.x,
                        y,
                        label,
                        area.width as usize,
                        Style::default().add_modifier(Modifier::ITALIC),
                    );
                }
            }
        }
    }
}
