// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::AnalysisMetadata;

/// Sent to the analysis service for one document snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeRequest {
    pub document: String,
    pub source: String,
    pub source_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_hint: Option<String>,
}

/// Raw analysis response. Blocks carry no identity; ranges are 1-based inclusive
/// `[start, end]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeResponse {
    pub intent: String,
    pub blocks: Vec<WireBlock>,
    #[serde(default)]
    pub metadata: AnalysisMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WireBlock {
    pub label: String,
    pub description: String,
    pub ranges: Vec<Vec<i64>>,
}
