// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A document's [`Session`] owns at most one [`AnalysisResult`]: an intent plus normalized
//! responsibility blocks whose line ranges may be scattered across the file.

pub mod analysis;
pub mod block;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod ids;
pub mod range;
pub mod session;

pub use analysis::{AnalysisMetadata, AnalysisResult, SourceVersion};
pub use block::{BlockError, NormalizedBlock, Ranges, ResponsibilityBlock};
pub use ids::{BlockId, DocumentId, Id, IdError};
pub use range::{LineRange, RangeError, RenderRange};
pub use session::{
    AnalysisTicket, FocusState, FoldState, Phase, Session, TicketSource, TransitionError,
};
