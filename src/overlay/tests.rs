// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use rstest::{fixture, rstest};

use super::{DocumentOverlay, EventOutcome, OverlayError, UserInteractionEvent as Ev};
use crate::config::OverlayConfig;
use crate::identity::Rgb;
use crate::interaction::ManualClock;
use crate::model::fixtures::{source_lines, SETUP_CORE_RESPONSE};
use crate::model::{BlockId, DocumentId, Phase, RenderRange, SourceVersion, TransitionError};
use crate::protocol::AnalyzerError;
use crate::surface::{BufferSurface, DecorationHandle, DecorationStyle, RenderSurface, SurfaceError};

fn rr(start: u32, end: u32) -> RenderRange {
    RenderRange::new(start, end).unwrap()
}

fn new_overlay(clock: &ManualClock) -> DocumentOverlay<BufferSurface> {
    let surface = BufferSurface::new(source_lines(30), Rgb::new(0x1e, 0x1e, 0x1e));
    DocumentOverlay::new(
        DocumentId::new("src/server.rs").unwrap(),
        surface,
        &OverlayConfig::default(),
    )
    .with_clock(clock.clone())
    .with_document_version(SourceVersion(1))
}

struct OverlayTestCtx {
    overlay: DocumentOverlay<BufferSurface>,
    clock: ManualClock,
    setup: BlockId,
    core: BlockId,
}

impl OverlayTestCtx {
    fn ready() -> Self {
        let clock = ManualClock::new(0);
        let mut overlay = new_overlay(&clock);
        let ticket = overlay.begin_analysis().unwrap();
        overlay
            .complete_analysis(ticket, Ok(SETUP_CORE_RESPONSE.to_owned()))
            .unwrap();

        let result = overlay.session().result().unwrap().clone();
        let setup = result.find_block_by_label("Setup").unwrap().block_id().clone();
        let core = result.find_block_by_label("Core").unwrap().block_id().clone();
        Self {
            overlay,
            clock,
            setup,
            core,
        }
    }

    fn surface(&self) -> &BufferSurface {
        self.overlay.surface()
    }
}

#[fixture]
fn ctx() -> OverlayTestCtx {
    OverlayTestCtx::ready()
}

#[rstest]
fn click_core_focuses_dims_and_reveals(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    assert_eq!(ctx.overlay.handle_event(Ev::ClickBlock(core.clone())), EventOutcome::Applied);

    assert_eq!(ctx.surface().revealed_line(), Some(9));
    assert_eq!(ctx.surface().focus_lines(), vec![9, 10, 11, 19, 20, 21]);
    assert_eq!(ctx.surface().dim_lines(), vec![0, 1, 2, 3, 4]);
    assert!(ctx.surface().folded_ranges().is_empty());
    assert_eq!(ctx.overlay.session().focused_block_id(), Some(&core));
}

#[rstest]
fn double_click_core_also_folds_the_gap(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    assert_eq!(
        ctx.overlay.handle_event(Ev::DoubleClickBlock(core.clone())),
        EventOutcome::Applied
    );

    assert_eq!(ctx.surface().focus_lines(), vec![9, 10, 11, 19, 20, 21]);
    assert_eq!(ctx.surface().folded_ranges(), vec![rr(12, 18)]);
    assert_eq!(ctx.overlay.session().folded_ranges(), &[rr(12, 18)]);
    assert_eq!(ctx.overlay.session().folded_block_id(), Some(&core));
}

#[rstest]
fn double_click_toggles_fold_and_focus_off(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    ctx.overlay.handle_event(Ev::DoubleClickBlock(core.clone()));
    assert_eq!(
        ctx.overlay.handle_event(Ev::DoubleClickBlock(core)),
        EventOutcome::Applied
    );

    assert!(ctx.surface().folded_ranges().is_empty());
    assert!(ctx.surface().decorated_lines().is_empty());
    assert!(!ctx.overlay.session().is_focus_active());
    assert!(!ctx.overlay.session().is_fold_active());
}

#[rstest]
fn click_on_focused_block_exits_and_unfolds(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    ctx.overlay.handle_event(Ev::DoubleClickBlock(core.clone()));
    ctx.overlay.handle_event(Ev::ClickBlock(core));

    assert!(ctx.surface().folded_ranges().is_empty());
    assert!(ctx.surface().decorated_lines().is_empty());
    assert!(!ctx.overlay.session().is_focus_active());
}

#[rstest]
fn focusing_another_block_drops_the_fold(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    let setup = ctx.setup.clone();
    ctx.overlay.handle_event(Ev::DoubleClickBlock(core));
    ctx.overlay.handle_event(Ev::ClickBlock(setup.clone()));

    assert!(ctx.surface().folded_ranges().is_empty());
    assert!(!ctx.overlay.session().is_fold_active());
    assert_eq!(ctx.overlay.session().focused_block_id(), Some(&setup));
    assert_eq!(ctx.surface().focus_lines(), vec![0, 1, 2, 3, 4]);
    assert_eq!(ctx.surface().dim_lines(), vec![9, 10, 11, 19, 20, 21]);
}

#[rstest]
fn double_click_on_single_range_block_only_focuses(mut ctx: OverlayTestCtx) {
    let setup = ctx.setup.clone();
    assert_eq!(
        ctx.overlay.handle_event(Ev::DoubleClickBlock(setup.clone())),
        EventOutcome::Applied
    );
    assert!(ctx.surface().folded_ranges().is_empty());
    assert_eq!(
        ctx.overlay.handle_event(Ev::DoubleClickBlock(setup)),
        EventOutcome::Unchanged
    );
}

#[rstest]
fn hover_previews_until_focus(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    let setup = ctx.setup.clone();
    assert_eq!(ctx.overlay.handle_event(Ev::HoverBlock(core.clone())), EventOutcome::Applied);
    assert_eq!(ctx.surface().preview_lines(), vec![9, 10, 11, 19, 20, 21]);

    ctx.overlay.handle_event(Ev::ClickBlock(core));
    assert!(ctx.surface().preview_lines().is_empty());
    assert_eq!(ctx.overlay.handle_event(Ev::HoverBlock(setup)), EventOutcome::Unchanged);
    assert!(ctx.surface().preview_lines().is_empty());
}

#[rstest]
fn clear_hover_and_clear_focus_are_idempotent(mut ctx: OverlayTestCtx) {
    assert_eq!(ctx.overlay.handle_event(Ev::ClearHover), EventOutcome::Unchanged);
    assert_eq!(ctx.overlay.handle_event(Ev::ClearFocus), EventOutcome::Unchanged);

    let core = ctx.core.clone();
    ctx.overlay.handle_event(Ev::HoverBlock(core.clone()));
    assert_eq!(ctx.overlay.handle_event(Ev::ClearHover), EventOutcome::Applied);
    ctx.overlay.handle_event(Ev::ClickBlock(core));
    assert_eq!(ctx.overlay.handle_event(Ev::ClearFocus), EventOutcome::Applied);
    assert_eq!(ctx.overlay.handle_event(Ev::ClearFocus), EventOutcome::Unchanged);
    assert!(ctx.surface().decorated_lines().is_empty());
}

#[rstest]
fn unknown_block_is_a_stale_no_op(mut ctx: OverlayTestCtx) {
    let ghost = BlockId::new("blk:0000000000000000").unwrap();
    for event in [
        Ev::HoverBlock(ghost.clone()),
        Ev::ClickBlock(ghost.clone()),
        Ev::DoubleClickBlock(ghost),
    ] {
        assert_eq!(ctx.overlay.handle_event(event), EventOutcome::Stale);
    }
    assert!(ctx.surface().decorated_lines().is_empty());
    assert_eq!(ctx.overlay.session().phase(), Phase::Ready);
}

#[rstest]
fn edit_outdates_and_clears_everything(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    ctx.overlay.handle_event(Ev::DoubleClickBlock(core.clone()));

    assert!(ctx.overlay.on_document_changed(SourceVersion(2)));
    assert_eq!(ctx.overlay.session().phase(), Phase::Outdated);
    assert!(ctx.surface().decorated_lines().is_empty());
    assert!(ctx.surface().folded_ranges().is_empty());
    assert!(!ctx.overlay.session().is_focus_active());

    // Interactions against an outdated result are stale.
    assert_eq!(ctx.overlay.handle_event(Ev::ClickBlock(core)), EventOutcome::Stale);
    // A second edit is a no-op on the session.
    assert!(!ctx.overlay.on_document_changed(SourceVersion(3)));
}

#[rstest]
fn reanalysis_after_outdated_keeps_identities(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    ctx.overlay.on_document_changed(SourceVersion(2));
    let ticket = ctx.overlay.begin_analysis().unwrap();
    ctx.overlay
        .complete_analysis(ticket, Ok(SETUP_CORE_RESPONSE.to_owned()))
        .unwrap();

    assert_eq!(ctx.overlay.session().phase(), Phase::Ready);
    assert_eq!(ctx.overlay.session().source_version(), Some(SourceVersion(2)));
    assert!(ctx.overlay.session().find_block(&core).is_some());
}

fn response_for_round(round: u32) -> String {
    format!(
        r#"{{"intent":"Round {round}","blocks":[
            {{"label":"Setup","description":"Wiring v{round}","ranges":[[1,5]]}},
            {{"label":"Core","description":"Handling v{round}","ranges":[[10,12],[20,22]]}}
        ]}}"#
    )
}

#[rstest]
fn repeated_analyses_keep_handle_count_bounded(mut ctx: OverlayTestCtx) {
    for round in 0..20u32 {
        let version = SourceVersion(u64::from(round) + 2);
        ctx.overlay.on_document_changed(version);
        let ticket = ctx.overlay.begin_analysis().unwrap();
        ctx.overlay
            .complete_analysis(ticket, Ok(response_for_round(round)))
            .unwrap();

        let result = ctx.overlay.session().result().unwrap().clone();
        let setup = result.find_block_by_label("Setup").unwrap().block_id().clone();
        let core = result.find_block_by_label("Core").unwrap().block_id().clone();
        assert_eq!(ctx.overlay.handle_event(Ev::HoverBlock(setup)), EventOutcome::Applied);
        assert_eq!(ctx.overlay.handle_event(Ev::ClickBlock(core)), EventOutcome::Applied);

        assert!(ctx.overlay.decorations().handle_count() <= 3);
        assert_eq!(
            ctx.surface().live_handles(),
            ctx.overlay.decorations().handle_count()
        );
    }
}

#[rstest]
fn failed_analysis_releases_handles(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    ctx.overlay.handle_event(Ev::ClickBlock(core));
    assert!(ctx.surface().live_handles() > 0);

    ctx.overlay.on_document_changed(SourceVersion(2));
    let ticket = ctx.overlay.begin_analysis().unwrap();
    assert!(ctx
        .overlay
        .complete_analysis(ticket, Ok("{not json".to_owned()))
        .is_err());
    assert_eq!(ctx.overlay.decorations().handle_count(), 0);
    assert_eq!(ctx.surface().live_handles(), 0);
}

#[rstest]
fn pointer_clicks_are_disambiguated(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();

    assert_eq!(ctx.overlay.pointer_click(&core), None);
    assert_eq!(ctx.overlay.next_click_deadline(), Some(300));
    ctx.clock.advance(Duration::from_millis(120));
    assert_eq!(ctx.overlay.pointer_click(&core), Some(EventOutcome::Applied));
    assert_eq!(ctx.surface().folded_ranges(), vec![rr(12, 18)]);

    // Nothing left to deliver.
    ctx.clock.advance(Duration::from_millis(1_000));
    assert_eq!(ctx.overlay.tick(), None);
}

#[rstest]
fn single_pointer_click_fires_after_window(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    ctx.overlay.pointer_click(&core);
    ctx.clock.advance(Duration::from_millis(299));
    assert_eq!(ctx.overlay.tick(), None);
    assert!(!ctx.overlay.session().is_focus_active());

    ctx.clock.advance(Duration::from_millis(1));
    assert_eq!(ctx.overlay.tick(), Some(EventOutcome::Applied));
    assert_eq!(ctx.overlay.session().focused_block_id(), Some(&core));
    assert!(ctx.surface().folded_ranges().is_empty());
}

#[rstest]
fn edit_cancels_pending_click(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    ctx.overlay.pointer_click(&core);
    ctx.overlay.on_document_changed(SourceVersion(2));
    ctx.clock.advance(Duration::from_millis(500));
    assert_eq!(ctx.overlay.tick(), None);
}

#[rstest]
fn rejected_focus_persists_nothing(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    ctx.overlay.surface_mut().set_closed(true);
    assert_eq!(ctx.overlay.handle_event(Ev::DoubleClickBlock(core.clone())), EventOutcome::Rejected);
    assert!(!ctx.overlay.session().is_focus_active());
    assert!(!ctx.overlay.session().is_fold_active());

    ctx.overlay.surface_mut().set_closed(false);
    assert_eq!(ctx.overlay.handle_event(Ev::ClickBlock(core)), EventOutcome::Applied);
    assert_eq!(ctx.surface().focus_lines(), vec![9, 10, 11, 19, 20, 21]);
}

#[rstest]
fn late_subscriber_receives_current_result(ctx: OverlayTestCtx) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _subscription = ctx
        .overlay
        .subscribe_analysis(move |result| sink.borrow_mut().push(result.blocks().len()));
    assert_eq!(*seen.borrow(), vec![2]);
}

#[rstest]
fn ready_event_republishes(mut ctx: OverlayTestCtx) {
    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    let subscription = ctx
        .overlay
        .subscribe_analysis(move |_| *sink.borrow_mut() += 1);
    assert_eq!(ctx.overlay.handle_event(Ev::Ready), EventOutcome::Applied);
    assert_eq!(*count.borrow(), 2);

    subscription.unsubscribe();
    ctx.overlay.handle_event(Ev::Ready);
    assert_eq!(*count.borrow(), 2);
}

#[rstest]
fn dispose_releases_everything(mut ctx: OverlayTestCtx) {
    let core = ctx.core.clone();
    let setup = ctx.setup.clone();
    ctx.overlay.handle_event(Ev::HoverBlock(setup));
    ctx.overlay.handle_event(Ev::DoubleClickBlock(core.clone()));

    ctx.overlay.dispose();
    assert_eq!(ctx.surface().live_handles(), 0);
    assert!(ctx.surface().folded_ranges().is_empty());
    assert_eq!(ctx.overlay.session().phase(), Phase::Empty);
    assert_eq!(ctx.overlay.handle_event(Ev::ClickBlock(core)), EventOutcome::Stale);
    assert_eq!(ctx.overlay.begin_analysis(), Err(OverlayError::Disposed));
    ctx.overlay.dispose();
}

#[test]
fn duplicate_trigger_is_rejected_with_notice() {
    let clock = ManualClock::new(0);
    let mut overlay = new_overlay(&clock);
    overlay.begin_analysis().unwrap();

    let err = overlay.begin_analysis().unwrap_err();
    assert_eq!(err, OverlayError::DuplicateTrigger);
    assert_eq!(err.user_message().as_deref(), Some("Analysis already in progress"));
    assert_eq!(overlay.session().phase(), Phase::Pending);
}

#[test]
fn malformed_response_fails_to_empty() {
    let clock = ManualClock::new(0);
    let mut overlay = new_overlay(&clock);
    let phases = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&phases);
    let _subscription = overlay.subscribe_state(move |phase| sink.borrow_mut().push(*phase));

    let ticket = overlay.begin_analysis().unwrap();
    let err = overlay
        .complete_analysis(ticket, Ok(r#"{ "intent": "x", "blocks": [ { "label": "a" } ] }"#.to_owned()))
        .unwrap_err();
    assert!(matches!(err, OverlayError::Protocol(_)), "{err:?}");
    assert!(err.user_message().is_some());
    assert_eq!(overlay.session().phase(), Phase::Empty);
    assert!(overlay.session().result().is_none());
    assert_eq!(*phases.borrow(), vec![Phase::Pending, Phase::Empty]);
}

#[test]
fn range_past_document_end_is_rejected() {
    let clock = ManualClock::new(0);
    let mut overlay = new_overlay(&clock);
    let ticket = overlay.begin_analysis().unwrap();
    let json = r#"{ "intent": "x", "blocks": [ { "label": "a", "description": "d", "ranges": [[25, 40]] } ] }"#;
    assert!(matches!(
        overlay.complete_analysis(ticket, Ok(json.to_owned())),
        Err(OverlayError::Protocol(_))
    ));
    assert_eq!(overlay.session().phase(), Phase::Empty);
}

#[test]
fn analyzer_failure_fails_to_empty() {
    let clock = ManualClock::new(0);
    let mut overlay = new_overlay(&clock);
    let ticket = overlay.begin_analysis().unwrap();
    let err = overlay
        .complete_analysis(ticket, Err(AnalyzerError::Timeout { after_ms: 5_000 }))
        .unwrap_err();
    assert_eq!(err, OverlayError::Analyzer(AnalyzerError::Timeout { after_ms: 5_000 }));
    assert_eq!(overlay.session().phase(), Phase::Empty);
}

#[test]
fn stale_completion_is_discarded() {
    let clock = ManualClock::new(0);
    let mut overlay = new_overlay(&clock);
    let first = overlay.begin_analysis().unwrap();
    overlay.reset();
    let second = overlay.begin_analysis().unwrap();

    let err = overlay
        .complete_analysis(first, Ok("garbage".to_owned()))
        .unwrap_err();
    assert_eq!(err, OverlayError::Stale(TransitionError::StaleTicket { ticket: first }));
    assert_eq!(err.user_message(), None);
    assert_eq!(overlay.session().phase(), Phase::Pending);

    overlay
        .complete_analysis(second, Ok(SETUP_CORE_RESPONSE.to_owned()))
        .unwrap();
    assert_eq!(overlay.session().phase(), Phase::Ready);

    // Once ready, even the right ticket is late.
    assert!(matches!(
        overlay.complete_analysis(second, Ok(SETUP_CORE_RESPONSE.to_owned())),
        Err(OverlayError::Stale(TransitionError::NotPending { phase: Phase::Ready }))
    ));
}

#[test]
fn edit_during_analysis_adopts_result_as_outdated() {
    let clock = ManualClock::new(0);
    let mut overlay = new_overlay(&clock);
    let phases = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&phases);
    let _subscription = overlay.subscribe_state(move |phase| sink.borrow_mut().push(*phase));

    let ticket = overlay.begin_analysis().unwrap();
    assert!(!overlay.on_document_changed(SourceVersion(2)));
    overlay
        .complete_analysis(ticket, Ok(SETUP_CORE_RESPONSE.to_owned()))
        .unwrap();

    assert_eq!(overlay.session().phase(), Phase::Outdated);
    assert_eq!(overlay.session().source_version(), Some(SourceVersion(1)));
    assert_eq!(*phases.borrow(), vec![Phase::Pending, Phase::Ready, Phase::Outdated]);
    assert!(overlay.surface().decorated_lines().is_empty());
}

#[test]
fn user_interaction_events_use_tagged_json() {
    let event: Ev =
        serde_json::from_str(r#"{ "type": "click_block", "block_id": "blk:0123456789abcdef" }"#)
            .unwrap();
    assert_eq!(event, Ev::ClickBlock(BlockId::new("blk:0123456789abcdef").unwrap()));

    let ready: Ev = serde_json::from_str(r#"{ "type": "ready" }"#).unwrap();
    assert_eq!(ready, Ev::Ready);
}

/// Buffer surface that refuses focus highlights covering one line.
struct FocusVetoSurface {
    inner: BufferSurface,
    focus_handles: Vec<DecorationHandle>,
    veto_line: Option<u32>,
}

impl RenderSurface for FocusVetoSurface {
    fn create_decoration(&mut self, style: DecorationStyle) -> Result<DecorationHandle, SurfaceError> {
        let handle = self.inner.create_decoration(style)?;
        if matches!(style, DecorationStyle::Focus { .. }) {
            self.focus_handles.push(handle);
        }
        Ok(handle)
    }

    fn set_decoration_ranges(
        &mut self,
        handle: DecorationHandle,
        ranges: &[RenderRange],
    ) -> Result<(), SurfaceError> {
        if let Some(line) = self.veto_line {
            if self.focus_handles.contains(&handle) && ranges.iter().any(|r| r.contains(line)) {
                return Err(SurfaceError::Rejected {
                    reason: format!("line {line} is read-only"),
                });
            }
        }
        self.inner.set_decoration_ranges(handle, ranges)
    }

    fn release_decoration(&mut self, handle: DecorationHandle) {
        self.focus_handles.retain(|h| *h != handle);
        self.inner.release_decoration(handle);
    }

    fn fold(&mut self, ranges: &[RenderRange]) -> Result<(), SurfaceError> {
        self.inner.fold(ranges)
    }

    fn unfold(&mut self, ranges: &[RenderRange]) -> Result<(), SurfaceError> {
        self.inner.unfold(ranges)
    }

    fn reveal_line(&mut self, line: u32) -> Result<(), SurfaceError> {
        self.inner.reveal_line(line)
    }

    fn line_count(&self) -> u32 {
        self.inner.line_count()
    }
}

#[test]
fn rejected_focus_switch_keeps_previous_focus_and_fold() {
    let surface = FocusVetoSurface {
        inner: BufferSurface::new(source_lines(30), Rgb::BLACK),
        focus_handles: Vec::new(),
        veto_line: None,
    };
    let mut overlay = DocumentOverlay::new(
        DocumentId::new("src/server.rs").unwrap(),
        surface,
        &OverlayConfig::default(),
    );
    let ticket = overlay.begin_analysis().unwrap();
    overlay
        .complete_analysis(ticket, Ok(SETUP_CORE_RESPONSE.to_owned()))
        .unwrap();
    let result = overlay.session().result().unwrap().clone();
    let setup = result.find_block_by_label("Setup").unwrap().block_id().clone();
    let core = result.find_block_by_label("Core").unwrap().block_id().clone();

    assert_eq!(overlay.handle_event(Ev::DoubleClickBlock(core.clone())), EventOutcome::Applied);
    overlay.surface_mut().veto_line = Some(0);

    assert_eq!(overlay.handle_event(Ev::ClickBlock(setup)), EventOutcome::Rejected);
    assert_eq!(overlay.session().focused_block_id(), Some(&core));
    assert_eq!(overlay.session().folded_block_id(), Some(&core));
    assert_eq!(overlay.decorations().focused_block_id(), Some(&core));
    let inner = &overlay.surface().inner;
    assert_eq!(inner.focus_lines(), vec![9, 10, 11, 19, 20, 21]);
    assert_eq!(inner.dim_lines(), vec![0, 1, 2, 3, 4]);
    assert_eq!(inner.folded_ranges(), vec![rr(12, 18)]);
}
