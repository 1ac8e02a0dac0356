// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::analysis::{AnalysisMetadata, AnalysisResult, SourceVersion};
use super::block::{NormalizedBlock, ResponsibilityBlock};
use super::range::LineRange;
use crate::identity::normalize;

fn range(start: u32, end: u32) -> LineRange {
    LineRange::new(start, end).expect("range")
}

/// `Setup:[[1,5]]`, `Core:[[10,12],[20,22]]`.
pub(crate) fn setup_core_blocks() -> Vec<NormalizedBlock> {
    let setup = ResponsibilityBlock::new("Setup", "Imports and wiring", [range(1, 5)])
        .expect("setup block");
    let core = ResponsibilityBlock::new(
        "Core",
        "Request handling",
        [range(10, 12), range(20, 22)],
    )
    .expect("core block");
    vec![normalize(setup), normalize(core)]
}

/// Three blocks, one of them spread over three ranges.
pub(crate) fn three_blocks() -> Vec<NormalizedBlock> {
    let parse = ResponsibilityBlock::new("Parse", "Input parsing", [range(1, 4), range(30, 31)])
        .expect("parse block");
    let validate = ResponsibilityBlock::new(
        "Validate",
        "Checks",
        [range(6, 8), range(15, 16), range(25, 27)],
    )
    .expect("validate block");
    let emit = ResponsibilityBlock::new("Emit", "Output", [range(40, 44)]).expect("emit block");
    vec![normalize(parse), normalize(validate), normalize(emit)]
}

pub(crate) fn result_with(blocks: Vec<NormalizedBlock>, version: u64) -> AnalysisResult {
    AnalysisResult::new(
        "Serves requests",
        AnalysisMetadata::new(),
        blocks,
        SourceVersion(version),
        1_700_000_000_000,
    )
}

/// `line_count` numbered lines of filler source.
pub(crate) fn source_lines(line_count: usize) -> Vec<String> {
    (1..=line_count).map(|n| format!("line {n}")).collect()
}

pub(crate) const SETUP_CORE_RESPONSE: &str = r#"{
  "intent": "Serves requests",
  "blocks": [
    { "label": "Setup", "description": "Imports and wiring", "ranges": [[1, 5]] },
    { "label": "Core", "description": "Request handling", "ranges": [[10, 12], [20, 22]] }
  ],
  "metadata": { "model": "fixture" }
}"#;
