// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

#[derive(Debug, Clone, Copy)]
pub enum Case {
    /// A handful of contiguous blocks.
    Small,
    /// Many blocks, each split into several interleaved ranges.
    MediumScattered,
    /// A long file with long labels and descriptions.
    LargeLongLabels,
}

struct Shape {
    blocks: u32,
    ranges_per_block: u32,
    range_len: u32,
    label_len: usize,
}

fn shape(case: Case) -> Shape {
    match case {
        Case::Small => Shape {
            blocks: 4,
            ranges_per_block: 1,
            range_len: 10,
            label_len: 8,
        },
        Case::MediumScattered => Shape {
            blocks: 24,
            ranges_per_block: 6,
            range_len: 4,
            label_len: 16,
        },
        Case::LargeLongLabels => Shape {
            blocks: 64,
            ranges_per_block: 4,
            range_len: 12,
            label_len: 96,
        },
    }
}

fn text_of_len(prefix: &str, target_len: usize) -> String {
    let mut out = prefix.to_owned();
    while out.len() < target_len {
        out.push_str(" words");
    }
    out.truncate(target_len.max(prefix.len()));
    out
}

/// Line count of the document the fixture's ranges live in.
pub fn line_count(case: Case) -> u32 {
    let shape = shape(case);
    // One blank separator line after every range.
    shape.blocks * shape.ranges_per_block * (shape.range_len + 1) + 1
}

/// Source text with `line_count(case)` lines.
pub fn source(case: Case) -> String {
    (1..=line_count(case)).map(|n| format!("let v{n} = {n};\n")).collect()
}

/// Number of blocks in the fixture's response.
pub fn block_count(case: Case) -> u32 {
    shape(case).blocks
}

/// Analysis response JSON. Ranges are interleaved round-robin, so every block of a scattered
/// case owns gaps filled by the other blocks.
pub fn response(case: Case) -> String {
    let shape = shape(case);
    let mut blocks = Vec::with_capacity(shape.blocks as usize);
    for block in 0..shape.blocks {
        let ranges: Vec<[u32; 2]> = (0..shape.ranges_per_block)
            .map(|round| {
                let slot = round * shape.blocks + block;
                let start = slot * (shape.range_len + 1) + 1;
                [start, start + shape.range_len - 1]
            })
            .collect();
        blocks.push(serde_json::json!({
            "label": text_of_len(&format!("Block {block}"), shape.label_len),
            "description": text_of_len(&format!("Responsibility {block}"), shape.label_len * 2),
            "ranges": ranges,
        }));
    }
    serde_json::json!({ "intent": "Benchmark fixture", "blocks": blocks }).to_string()
}
