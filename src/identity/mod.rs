// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Block identity and colour.
//!
//! Identities are content-derived: the same label, description and ranges always produce the
//! same [`BlockId`], which lets a host recognise "the same" block across re-analyses. Colours
//! are derived from the identity alone (see [`color`]).

pub mod color;

use sha2::{Digest, Sha256};
use smol_str::SmolStr;

use crate::model::{BlockId, LineRange, NormalizedBlock, ResponsibilityBlock};

pub use color::{derive_color, BlockColor, ColorAssigner, Rgb, Rgba, Tone};

pub const BLOCK_ID_NAMESPACE: &str = "blk:";
/// Number of hex characters of the digest kept in a block id.
pub const BLOCK_ID_HEX_LEN: usize = 16;

const FIELD_SEPARATOR: u8 = 0x1f;

/// Stamp a block with its identity, whitespace-normalizing its label and description.
pub fn normalize(block: ResponsibilityBlock) -> NormalizedBlock {
    let label = normalize_text(block.label());
    let description = normalize_text(block.description());
    let ranges = canonical_ranges(block.ranges());
    let block_id = identity_from_parts(&label, &description, &ranges);
    NormalizedBlock::new(block_id, block.with_text(label, description))
}

/// Identity of a block without taking ownership of it.
pub fn block_identity(block: &ResponsibilityBlock) -> BlockId {
    identity_from_parts(
        &normalize_text(block.label()),
        &normalize_text(block.description()),
        &canonical_ranges(block.ranges()),
    )
}

/// Collapse whitespace runs to a single space and trim both ends.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// `start-end` pairs sorted by start and joined by `,` (e.g. `10-12,20-22`).
pub fn canonical_ranges(ranges: &[LineRange]) -> String {
    let mut sorted = ranges.to_vec();
    sorted.sort();

    let mut out = String::with_capacity(sorted.len() * 8);
    let mut buf = itoa::Buffer::new();
    for (idx, range) in sorted.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(buf.format(range.start()));
        out.push('-');
        out.push_str(buf.format(range.end()));
    }
    out
}

fn identity_from_parts(label: &str, description: &str, ranges: &str) -> BlockId {
    let mut hasher = Sha256::new();
    hasher.update(label.as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(description.as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(ranges.as_bytes());
    let digest = hasher.finalize();

    let hex = hex::encode(&digest[..BLOCK_ID_HEX_LEN / 2]);
    BlockId::from_validated(SmolStr::new(format!("{BLOCK_ID_NAMESPACE}{hex}")))
}
