// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Line addressing.
//!
//! The analysis protocol speaks 1-based inclusive line numbers ([`LineRange`]); render
//! surfaces speak 0-based inclusive line indices ([`RenderRange`]). Every conversion between
//! the two goes through this module so highlights and folds can never disagree by one line.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 1-based inclusive line range as produced by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "(u32, u32)", into = "(u32, u32)")]
pub struct LineRange {
    start: u32,
    end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Result<Self, RangeError> {
        if start == 0 {
            return Err(RangeError::ZeroLine);
        }
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn line_count(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn contains(&self, line: u32) -> bool {
        (self.start..=self.end).contains(&line)
    }

    pub fn overlaps(&self, other: &LineRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// `render = api - 1` on both endpoints.
    pub fn to_render(self) -> RenderRange {
        RenderRange {
            start: self.start - 1,
            end: self.end - 1,
        }
    }
}

impl TryFrom<(u32, u32)> for LineRange {
    type Error = RangeError;

    fn try_from((start, end): (u32, u32)) -> Result<Self, Self::Error> {
        Self::new(start, end)
    }
}

impl From<LineRange> for (u32, u32) {
    fn from(range: LineRange) -> Self {
        (range.start, range.end)
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// 0-based inclusive line range in render-surface addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RenderRange {
    start: u32,
    end: u32,
}

impl RenderRange {
    pub fn new(start: u32, end: u32) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(line: u32) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn line_count(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn contains(&self, line: u32) -> bool {
        (self.start..=self.end).contains(&line)
    }

    pub fn lines(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }

    /// Inverse of [`LineRange::to_render`].
    pub fn to_api(self) -> LineRange {
        LineRange {
            start: self.start + 1,
            end: self.end + 1,
        }
    }
}

impl fmt::Display for RenderRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..={}]", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    ZeroLine,
    Inverted { start: u32, end: u32 },
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroLine => f.write_str("line numbers are 1-based; got 0"),
            Self::Inverted { start, end } => {
                write!(f, "inverted range (start={start}, end={end})")
            }
        }
    }
}

impl std::error::Error for RangeError {}
