// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::block::NormalizedBlock;
use super::ids::BlockId;

/// Free-form metadata attached by the analysis service (model name, language, timings...).
pub type AnalysisMetadata = serde_json::Map<String, serde_json::Value>;

/// Version token of the document text an analysis was computed against.
///
/// Hosts usually pass the editor's document version; any monotonically increasing counter
/// works.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SourceVersion(pub u64);

impl SourceVersion {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The adopted outcome of one analysis: intent plus normalized blocks.
///
/// Owned by the session (behind an `Arc`) and read-only for everybody else.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    intent: String,
    metadata: AnalysisMetadata,
    blocks: Vec<NormalizedBlock>,
    source_version: SourceVersion,
    timestamp_ms: u64,
}

impl AnalysisResult {
    pub fn new(
        intent: impl Into<String>,
        metadata: AnalysisMetadata,
        blocks: Vec<NormalizedBlock>,
        source_version: SourceVersion,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            intent: intent.into(),
            metadata,
            blocks,
            source_version,
            timestamp_ms,
        }
    }

    pub fn intent(&self) -> &str {
        &self.intent
    }

    pub fn metadata(&self) -> &AnalysisMetadata {
        &self.metadata
    }

    pub fn blocks(&self) -> &[NormalizedBlock] {
        &self.blocks
    }

    pub fn source_version(&self) -> SourceVersion {
        self.source_version
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn find_block(&self, block_id: &BlockId) -> Option<&NormalizedBlock> {
        self.blocks.iter().find(|block| block.block_id() == block_id)
    }

    pub fn find_block_by_label(&self, label: &str) -> Option<&NormalizedBlock> {
        self.blocks.iter().find(|block| block.label() == label)
    }

    pub fn contains_block(&self, block_id: &BlockId) -> bool {
        self.find_block(block_id).is_some()
    }
}
