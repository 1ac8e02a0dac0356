// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Analysis request/response boundary.
//!
//! The analysis service is a black box that turns source text into JSON. Everything it returns
//! is validated here, before anything reaches a session: a response is either adopted whole or
//! rejected with a [`ProtocolError`].

pub mod types;

use std::fmt;
use std::future::Future;

use crate::identity::normalize;
use crate::model::{
    AnalysisResult, BlockError, DocumentId, LineRange, NormalizedBlock, RangeError,
    ResponsibilityBlock, SourceVersion,
};

pub use types::{AnalyzeRequest, AnalyzeResponse, WireBlock};

impl AnalyzeRequest {
    pub fn new(document: &DocumentId, source: impl Into<String>, version: SourceVersion) -> Self {
        Self {
            document: document.to_string(),
            source: source.into(),
            source_version: version.0,
            language_hint: None,
        }
    }

    pub fn with_language_hint(mut self, hint: impl Into<String>) -> Self {
        self.language_hint = Some(hint.into());
        self
    }
}

/// Anything that can answer an [`AnalyzeRequest`] with the raw JSON of an
/// [`AnalyzeResponse`].
pub trait Analyzer {
    fn analyze(
        &self,
        request: AnalyzeRequest,
    ) -> impl Future<Output = Result<String, AnalyzerError>>;
}

pub fn parse_response(json: &str) -> Result<AnalyzeResponse, ProtocolError> {
    serde_json::from_str(json).map_err(|err| ProtocolError::Json {
        message: err.to_string(),
    })
}

/// Validate `response` and stamp every block with its identity.
///
/// `line_count` bounds the ranges when the caller knows the document length.
pub fn into_result(
    response: AnalyzeResponse,
    line_count: Option<u32>,
    source_version: SourceVersion,
    timestamp_ms: u64,
) -> Result<AnalysisResult, ProtocolError> {
    let mut blocks: Vec<NormalizedBlock> = Vec::with_capacity(response.blocks.len());
    for (block_index, wire) in response.blocks.into_iter().enumerate() {
        let ranges = wire
            .ranges
            .iter()
            .enumerate()
            .map(|(range_index, pair)| decode_range(block_index, range_index, pair))
            .collect::<Result<Vec<LineRange>, ProtocolError>>()?;

        if let Some(line_count) = line_count {
            if let Some(range) = ranges.iter().find(|range| range.end() > line_count) {
                return Err(ProtocolError::RangePastEnd {
                    block_index,
                    range: *range,
                    line_count,
                });
            }
        }

        let block = ResponsibilityBlock::new(wire.label, wire.description, ranges)
            .map_err(|source| ProtocolError::InvalidBlock { block_index, source })?;
        let block = normalize(block);
        if blocks.iter().any(|seen| seen.block_id() == block.block_id()) {
            return Err(ProtocolError::DuplicateBlock {
                block_index,
                label: block.label().to_owned(),
            });
        }
        blocks.push(block);
    }

    Ok(AnalysisResult::new(
        response.intent,
        response.metadata,
        blocks,
        source_version,
        timestamp_ms,
    ))
}

/// [`parse_response`] followed by [`into_result`].
pub fn decode_result(
    json: &str,
    line_count: Option<u32>,
    source_version: SourceVersion,
    timestamp_ms: u64,
) -> Result<AnalysisResult, ProtocolError> {
    into_result(parse_response(json)?, line_count, source_version, timestamp_ms)
}

/// JSON schema of [`AnalyzeResponse`].
pub fn response_schema() -> schemars::Schema {
    schemars::schema_for!(AnalyzeResponse)
}

fn decode_range(
    block_index: usize,
    range_index: usize,
    pair: &[i64],
) -> Result<LineRange, ProtocolError> {
    let invalid = |reason: String| ProtocolError::InvalidRange {
        block_index,
        range_index,
        reason,
    };
    let [start, end] = pair else {
        return Err(invalid(format!("expected [start, end], got {} values", pair.len())));
    };
    let start = u32::try_from(*start).map_err(|_| invalid(format!("start {start} out of range")))?;
    let end = u32::try_from(*end).map_err(|_| invalid(format!("end {end} out of range")))?;
    LineRange::new(start, end).map_err(|err: RangeError| invalid(err.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Not JSON, wrong types or missing fields.
    Json {
        message: String,
    },
    InvalidRange {
        block_index: usize,
        range_index: usize,
        reason: String,
    },
    RangePastEnd {
        block_index: usize,
        range: LineRange,
        line_count: u32,
    },
    InvalidBlock {
        block_index: usize,
        source: BlockError,
    },
    DuplicateBlock {
        block_index: usize,
        label: String,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json { message } => write!(f, "malformed analysis response: {message}"),
            Self::InvalidRange {
                block_index,
                range_index,
                reason,
            } => write!(f, "block {block_index} range {range_index}: {reason}"),
            Self::RangePastEnd {
                block_index,
                range,
                line_count,
            } => write!(
                f,
                "block {block_index} range {range} ends past the document ({line_count} lines)"
            ),
            Self::InvalidBlock {
                block_index,
                source,
            } => write!(f, "block {block_index}: {source}"),
            Self::DuplicateBlock { block_index, label } => {
                write!(f, "block {block_index} ('{label}') duplicates an earlier block")
            }
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidBlock { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    Transport { message: String },
    Timeout { after_ms: u64 },
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { message } => write!(f, "analysis service unavailable: {message}"),
            Self::Timeout { after_ms } => write!(f, "analysis timed out after {after_ms}ms"),
        }
    }
}

impl std::error::Error for AnalyzerError {}
