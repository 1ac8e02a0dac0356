// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use smallvec::SmallVec;

use super::ids::BlockId;
use super::range::{LineRange, RenderRange};

/// Most blocks cover one to four scattered ranges.
pub type Ranges = SmallVec<[LineRange; 4]>;

/// One reason-to-change unit of a file: a label, a description and the (possibly
/// non-contiguous) line ranges that implement it.
///
/// Immutable once built; [`ResponsibilityBlock::new`] enforces that the block has at least one
/// range and that no two of its ranges overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsibilityBlock {
    label: String,
    description: String,
    ranges: Ranges,
}

impl ResponsibilityBlock {
    pub fn new(
        label: impl Into<String>,
        description: impl Into<String>,
        ranges: impl IntoIterator<Item = LineRange>,
    ) -> Result<Self, BlockError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(BlockError::EmptyLabel);
        }

        let ranges: Ranges = ranges.into_iter().collect();
        if ranges.is_empty() {
            return Err(BlockError::NoRanges { label });
        }

        for (idx, range) in ranges.iter().enumerate() {
            if let Some(other) = ranges[idx + 1..].iter().find(|other| range.overlaps(other)) {
                return Err(BlockError::OverlappingRanges {
                    label,
                    first: *range,
                    second: *other,
                });
            }
        }

        Ok(Self {
            label,
            description: description.into(),
            ranges,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Ranges in the order the analysis produced them.
    pub fn ranges(&self) -> &[LineRange] {
        &self.ranges
    }

    pub(crate) fn with_text(self, label: String, description: String) -> Self {
        Self {
            label,
            description,
            ranges: self.ranges,
        }
    }

    pub fn last_line(&self) -> u32 {
        self.ranges.iter().map(LineRange::end).max().unwrap_or(0)
    }
}

/// A [`ResponsibilityBlock`] stamped with its content-derived [`BlockId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBlock {
    block_id: BlockId,
    block: ResponsibilityBlock,
}

impl NormalizedBlock {
    pub(crate) fn new(block_id: BlockId, block: ResponsibilityBlock) -> Self {
        Self { block_id, block }
    }

    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    pub fn block(&self) -> &ResponsibilityBlock {
        &self.block
    }

    pub fn label(&self) -> &str {
        self.block.label()
    }

    pub fn description(&self) -> &str {
        self.block.description()
    }

    pub fn ranges(&self) -> &[LineRange] {
        self.block.ranges()
    }

    /// Ranges converted to render addressing, sorted by start line.
    pub fn render_ranges(&self) -> Vec<RenderRange> {
        let mut out: Vec<RenderRange> = self.ranges().iter().map(|r| r.to_render()).collect();
        out.sort();
        out
    }

    /// First render line of the block (the line revealed when the block gains focus).
    pub fn first_render_line(&self) -> u32 {
        self.ranges()
            .iter()
            .map(|r| r.to_render().start())
            .min()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    EmptyLabel,
    NoRanges {
        label: String,
    },
    OverlappingRanges {
        label: String,
        first: LineRange,
        second: LineRange,
    },
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyLabel => f.write_str("block label must not be empty"),
            Self::NoRanges { label } => write!(f, "block '{label}' has no line ranges"),
            Self::OverlappingRanges {
                label,
                first,
                second,
            } => write!(f, "block '{label}' has overlapping ranges {first} and {second}"),
        }
    }
}

impl std::error::Error for BlockError {}
