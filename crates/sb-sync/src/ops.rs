//! Ops (v2) executor: explicit per-list operations, in payload order.
//!
//! Each operation is tried against every Known Spells section, then once
//! more against the whole manager. Outcomes land in a bucket per target
//! list; a failure in one list never touches another list's counts.

use serde_json::json;

use sb_core::{ListOutcome, OpKind, OpsPayload, OpsResult, OpsTotals, SpellOp};

use crate::dom::Dom;
use crate::error::SyncError;
use crate::host::Host;
use crate::interact::{click_element, set_input_value};
use crate::locate::{collect_known_spells_sections, find_action_button, find_spell_row, SectionDescriptor, SpellAction, SEARCH_INPUT};
use crate::precondition::{ensure_filter_panel_visible, ensure_section_expanded, preconfigure_known_spells_filters, prepare_manager};
use crate::session::SyncSession;

/// Result of asking the page for one action on one spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Clicked,
    /// The row already shows the requested state; nothing was clicked.
    AlreadyInState,
}

#[derive(Debug, Clone, PartialEq)]
enum OpOutcome {
    Done(OpKind),
    Failed {
        not_found: String,
        error: String,
        aborted: bool,
    },
}

/// What one scope made of an operation.
enum ScopeAttempt {
    Done,
    /// The row here already shows the requested state. Another scope may
    /// still hold a row that needs the click.
    AlreadyInState,
    /// Not satisfiable here; try the next scope.
    Missing(String),
    /// A replace whose remove half ran but whose add half did not.
    Broken { error: String, aborted: bool },
}

/// Find the row for `spell` under `scope` and click its `action` button.
///
/// From the second attempt on the section's search box is used to narrow
/// the list, and cleared again afterwards.
pub async fn find_and_click<D: Dom, H: Host>(
    s: &SyncSession<'_, D, H>,
    scope: &D::Node,
    spell: &str,
    action: SpellAction,
) -> Result<ActionOutcome, SyncError> {
    let label = format!("{} {spell}", action.as_str());
    s.retry(&label, s.options.lookup_retries, s.backoff(), |attempt| async move {
        let search = if attempt >= 2 {
            s.dom.query_first(scope, SEARCH_INPUT).filter(|input| set_input_value(s, input, spell))
        } else {
            None
        };

        let outcome = match find_spell_row(s.dom, scope, spell) {
            None => Err(SyncError::Lookup(spell.to_string())),
            Some(found) => {
                if let Some(button) = find_action_button(s.dom, &found.row, action) {
                    let verb = match action {
                        SpellAction::Prepare => "Prepared",
                        SpellAction::Unprepare => "Unprepared",
                    };
                    click_element(s, &button, &format!("{verb} {}", found.name), s.options.emit_progress).await;
                    Ok(ActionOutcome::Clicked)
                } else if find_action_button(s.dom, &found.row, action.opposite()).is_some() {
                    s.trace(&format!("{} already {}d", found.name, action.as_str().to_lowercase()), None);
                    Ok(ActionOutcome::AlreadyInState)
                } else {
                    Err(SyncError::Lookup(spell.to_string()))
                }
            }
        };

        if let Some(input) = search {
            set_input_value(s, &input, "");
        }
        outcome
    })
    .await
}

fn single_action(outcome: Result<ActionOutcome, SyncError>) -> ScopeAttempt {
    match outcome {
        Ok(ActionOutcome::Clicked) => ScopeAttempt::Done,
        Ok(ActionOutcome::AlreadyInState) => ScopeAttempt::AlreadyInState,
        Err(err) => ScopeAttempt::Missing(err.to_string()),
    }
}

async fn try_in_scope<D: Dom, H: Host>(s: &SyncSession<'_, D, H>, scope: &D::Node, op: &SpellOp) -> ScopeAttempt {
    match op {
        SpellOp::Prepare { spell, .. } => single_action(find_and_click(s, scope, spell, SpellAction::Prepare).await),
        SpellOp::Unprepare { spell, .. } => single_action(find_and_click(s, scope, spell, SpellAction::Unprepare).await),
        SpellOp::Replace { remove, add, .. } => {
            match find_and_click(s, scope, remove, SpellAction::Unprepare).await {
                Ok(ActionOutcome::Clicked) => {}
                // The add half only runs where the remove half did.
                Ok(ActionOutcome::AlreadyInState) => return ScopeAttempt::AlreadyInState,
                Err(err) => return ScopeAttempt::Missing(err.to_string()),
            }
            match find_and_click(s, scope, add, SpellAction::Prepare).await {
                Ok(_) => ScopeAttempt::Done,
                Err(err) => ScopeAttempt::Broken {
                    error: err.to_string(),
                    aborted: true,
                },
            }
        }
    }
}

/// Settle an operation whose rows were all already in state somewhere.
///
/// For a replace the remove half is satisfied in `scope`, so only the add
/// half is left to run there.
async fn settle_in_state<D: Dom, H: Host>(s: &SyncSession<'_, D, H>, scope: &D::Node, op: &SpellOp) -> Result<(), String> {
    match op {
        SpellOp::Replace { add, .. } => find_and_click(s, scope, add, SpellAction::Prepare)
            .await
            .map(|_| ())
            .map_err(|err| err.to_string()),
        _ => Ok(()),
    }
}

fn push_distinct(errors: &mut Vec<String>, err: String) {
    if !errors.contains(&err) {
        errors.push(err);
    }
}

async fn execute_operation<D: Dom, H: Host>(
    s: &SyncSession<'_, D, H>,
    root: &D::Node,
    sections: &[SectionDescriptor<D::Node>],
    op: &SpellOp,
) -> OpOutcome {
    let mut errors: Vec<String> = Vec::new();

    let failed = |errors: &[String], error: Option<String>, aborted: bool| {
        let mut all = errors.to_vec();
        if let Some(error) = error {
            push_distinct(&mut all, error);
        }
        OpOutcome::Failed {
            not_found: op.target_spell().to_string(),
            error: all.join("; "),
            aborted,
        }
    };

    // First scope whose row already showed the requested state.
    let mut in_state: Option<D::Node> = None;

    for (index, section) in sections.iter().enumerate() {
        if let Err(err) = ensure_section_expanded(s, section).await {
            push_distinct(&mut errors, err.to_string());
            s.progress(&format!("Known Spells section {} did not open, continuing in best-effort mode", index + 1));
            continue;
        }
        if let Err(err) = ensure_filter_panel_visible(s, &section.scope).await {
            log::warn!("section {}: {err}", index + 1);
        }
        match try_in_scope(s, &section.scope, op).await {
            ScopeAttempt::Done => return OpOutcome::Done(op.kind()),
            ScopeAttempt::AlreadyInState => {
                in_state.get_or_insert_with(|| section.scope.clone());
            }
            ScopeAttempt::Missing(err) => push_distinct(&mut errors, err),
            ScopeAttempt::Broken { error, aborted } => return failed(&errors, Some(error), aborted),
        }
    }

    s.trace("falling back to the whole manager", Some(json!({ "op": op.kind().as_str(), "spell": op.target_spell() })));
    let last_error = match try_in_scope(s, root, op).await {
        ScopeAttempt::Done => return OpOutcome::Done(op.kind()),
        ScopeAttempt::AlreadyInState => {
            in_state.get_or_insert_with(|| root.clone());
            None
        }
        ScopeAttempt::Missing(err) => Some(err),
        ScopeAttempt::Broken { error, aborted } => return failed(&errors, Some(error), aborted),
    };

    match in_state {
        Some(scope) => {
            s.trace(&format!("{} already in state, nothing left to click", op.target_spell()), None);
            match settle_in_state(s, &scope, op).await {
                Ok(()) => OpOutcome::Done(op.kind()),
                Err(err) => failed(&errors, Some(err), false),
            }
        }
        None => failed(&errors, last_error, false),
    }
}

fn record(bucket: &mut ListOutcome, outcome: OpOutcome) {
    match outcome {
        OpOutcome::Done(OpKind::Replace) => bucket.replaced += 1,
        OpOutcome::Done(OpKind::Prepare) => bucket.prepared += 1,
        OpOutcome::Done(OpKind::Unprepare) => bucket.unprepared += 1,
        OpOutcome::Failed {
            not_found,
            error,
            aborted,
        } => {
            bucket.failed += 1;
            bucket.not_found.push(not_found);
            bucket.aborted |= aborted;
            bucket.error = Some(match bucket.error.take() {
                Some(previous) if previous.split("; ").any(|e| e == error) => previous,
                Some(previous) => format!("{previous}; {error}"),
                None => error,
            });
        }
    }
}

fn bucket_for<'b>(buckets: &'b mut Vec<ListOutcome>, list: &str) -> &'b mut ListOutcome {
    let idx = match buckets.iter().position(|b| b.list == list) {
        Some(idx) => idx,
        None => {
            buckets.push(ListOutcome::new(list));
            buckets.len() - 1
        }
    };
    &mut buckets[idx]
}

pub async fn sync_ops<D: Dom, H: Host>(s: &SyncSession<'_, D, H>, payload: &OpsPayload) -> Result<OpsResult, SyncError> {
    let count = payload.operations.len();
    if count > s.options.max_actions {
        return Err(SyncError::TooManyActions {
            count,
            limit: s.options.max_actions,
        });
    }
    s.trace(
        "ops sync started",
        Some(json!({ "operations": count, "unresolved": payload.unresolved.len() })),
    );

    let mut per_list: Vec<ListOutcome> = Vec::new();
    if count > 0 {
        let root = prepare_manager(s).await?;
        let sections = collect_known_spells_sections(s.dom, &root);
        if sections.is_empty() {
            return Err(SyncError::structural("Known Spells section"));
        }
        s.trace(&format!("{} Known Spells sections", sections.len()), None);
        preconfigure_known_spells_filters(s, &sections).await;

        for (index, op) in payload.operations.iter().enumerate() {
            let outcome = execute_operation(s, &root, &sections, op).await;
            s.trace(&format!("operation {index}"), Some(json!({ "op": op, "outcome": format!("{outcome:?}") })));
            record(bucket_for(&mut per_list, op.list()), outcome);
        }
    }

    let totals = OpsTotals::from_lists(&per_list);
    s.trace("ops sync finished", Some(json!(totals)));
    Ok(OpsResult {
        totals,
        per_list,
        skipped_from_payload: payload.unresolved.clone(),
        skipped_count: payload.unresolved.len() as u32,
        already_correct: count == 0,
        duration_ms: s.elapsed_ms(),
        debug_log: s.debug_snapshot(),
    })
}
