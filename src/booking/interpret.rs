//! Per-phase interpretation of an accumulated transcript.
//!
//! Each step is one linear async function: classify the transcript, run the
//! remote call it implies, and return a `StepOutcome` describing the next
//! phase and the data to apply. Steps never touch session state themselves;
//! the session driver applies outcomes, which keeps these functions
//! testable against a mock gateway.

use tracing::warn;

use super::phase::Phase;
use super::types::{ParkingSpaceDetail, ParkingSpaceListItem, ReservationResult};
use crate::gateway::BookingGateway;
use crate::nlu::{parse_ordinal, split_utterance};

/// What the driver should do with the recognizer after applying a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listen {
    /// Keep the current listening segment running (no restart, no re-arm).
    Continue,
    /// Stop, settle, start a fresh listening segment for the next phase.
    Restart,
    /// Stop listening entirely (terminal phase).
    Stop,
}

/// Result of one interpretation step. `None` fields leave the session's
/// current value unchanged.
#[derive(Debug)]
pub struct StepOutcome {
    pub next_phase: Phase,
    pub listen: Listen,
    /// User-facing status line (errors, re-prompts, confirmations).
    pub status: Option<String>,
    pub items: Option<Vec<ParkingSpaceListItem>>,
    pub detail: Option<ParkingSpaceDetail>,
    pub time_hint: Option<String>,
    /// Whether the hint came from the user's own words. Silence confirms a
    /// spoken hint; a defaulted or edited one needs speech or an explicit
    /// confirm.
    pub time_hint_spoken: Option<bool>,
    pub reservation: Option<ReservationResult>,
}

impl StepOutcome {
    fn stay(next_phase: Phase, listen: Listen) -> Self {
        Self {
            next_phase,
            listen,
            status: None,
            items: None,
            detail: None,
            time_hint: None,
            time_hint_spoken: None,
            reservation: None,
        }
    }

    fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Inputs one step needs from the session.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    pub user_id: i64,
    /// Accumulated transcript (finalized + interim), trimmed.
    pub transcript: &'a str,
    /// Current reservation-time hint; empty when unset.
    pub time_hint: &'a str,
    /// The hint came from the user's own utterance, so silence may confirm
    /// it without further speech.
    pub time_hint_spoken: bool,
    /// Selected space, once the Time phase has been reached.
    pub selected_space_id: Option<i64>,
}

/// Dispatch the silence-fired interpretation for the current phase.
pub async fn interpret(
    gateway: &dyn BookingGateway,
    phase: Phase,
    input: StepInput<'_>,
) -> StepOutcome {
    match phase {
        Phase::Address => interpret_address(gateway, input).await,
        Phase::Choice => interpret_choice(gateway, input).await,
        Phase::Time => interpret_time(gateway, input).await,
        Phase::Idle => StepOutcome::stay(Phase::Idle, Listen::Stop),
    }
}

/// Address phase: split the utterance, list nearby spaces, and either move
/// to Choice or, when an ordinal was embedded inline, resolve the selection
/// immediately and land in Time.
pub async fn interpret_address(
    gateway: &dyn BookingGateway,
    input: StepInput<'_>,
) -> StepOutcome {
    if input.transcript.is_empty() {
        // Nothing to interpret; keep the current segment open and wait for
        // speech or a manual action.
        return StepOutcome::stay(Phase::Address, Listen::Continue);
    }

    let parts = split_utterance(input.transcript);

    let items = match gateway.list_nearby(input.user_id, &parts.address).await {
        Ok(items) => items,
        Err(e) => {
            warn!("list_nearby failed: {}", e);
            return StepOutcome::stay(Phase::Address, Listen::Restart)
                .with_status("주변 주차 공간을 불러오지 못했어요. 다시 말씀해 주세요.");
        }
    };

    if items.is_empty() {
        let mut outcome = StepOutcome::stay(Phase::Address, Listen::Restart).with_status(
            format!("{} 근처에서 주차 공간을 찾지 못했어요. 다시 말씀해 주세요.", parts.address),
        );
        outcome.items = Some(items);
        return outcome;
    }

    if let Some(ordinal) = parts.ordinal {
        // Inline selection: skip Choice-phase listening entirely.
        let mut outcome =
            resolve_selection(gateway, input.user_id, ordinal, parts.time_text.as_deref()).await;
        outcome.items = Some(items);
        if parts.time_text.is_some() {
            outcome.time_hint = parts.time_text;
            outcome.time_hint_spoken = Some(true);
        }
        return outcome;
    }

    let mut outcome = StepOutcome::stay(Phase::Choice, Listen::Restart);
    outcome.items = Some(items);
    if parts.time_text.is_some() {
        outcome.time_hint = parts.time_text;
        outcome.time_hint_spoken = Some(true);
    }
    outcome
}

/// Choice phase: the transcript must resolve to an ordinal.
pub async fn interpret_choice(
    gateway: &dyn BookingGateway,
    input: StepInput<'_>,
) -> StepOutcome {
    let Some(ordinal) = parse_ordinal(input.transcript) else {
        return StepOutcome::stay(Phase::Choice, Listen::Restart)
            .with_status("몇 번째 공간인지 다시 말씀해 주세요.");
    };

    let hint = (!input.time_hint.is_empty()).then_some(input.time_hint);
    resolve_selection(gateway, input.user_id, ordinal, hint).await
}

/// Time phase: reserve with the spoken text. Silence with an empty
/// transcript confirms the hint only when the user spoke it themselves
/// (inline in the first utterance, or an explicit confirm action).
pub async fn interpret_time(gateway: &dyn BookingGateway, input: StepInput<'_>) -> StepOutcome {
    let time_text = if !input.transcript.is_empty() {
        input.transcript
    } else if input.time_hint_spoken {
        input.time_hint
    } else {
        ""
    };

    if time_text.is_empty() {
        return StepOutcome::stay(Phase::Time, Listen::Restart)
            .with_status("예약 시간을 말씀해 주세요.");
    }

    let Some(space_id) = input.selected_space_id else {
        return StepOutcome::stay(Phase::Choice, Listen::Restart)
            .with_status("선택된 주차 공간이 없어요. 번호를 말씀해 주세요.");
    };

    match gateway.reserve(input.user_id, space_id, time_text).await {
        Ok(reservation) => {
            let mut outcome = StepOutcome::stay(Phase::Idle, Listen::Stop)
                .with_status("예약이 완료되었습니다.");
            outcome.time_hint = Some(time_text.to_string());
            outcome.reservation = Some(reservation);
            outcome
        }
        Err(e) => {
            warn!("reserve failed: {}", e);
            // Keep the attempted text for the user to edit, but never
            // auto-retry it on the next silence.
            let mut outcome = StepOutcome::stay(Phase::Time, Listen::Restart)
                .with_status("예약에 실패했어요. 시간을 다시 말씀해 주세요.");
            outcome.time_hint = Some(time_text.to_string());
            outcome.time_hint_spoken = Some(false);
            outcome
        }
    }
}

/// Resolve an ordinal selection via the detail call. Shared by the Choice
/// interpretation, the inline-ordinal path of the Address interpretation,
/// and manual list taps (ordinal = index + 1).
pub async fn resolve_selection(
    gateway: &dyn BookingGateway,
    user_id: i64,
    ordinal: u32,
    existing_hint: Option<&str>,
) -> StepOutcome {
    match gateway.fetch_detail(user_id, &format!("{}번째", ordinal)).await {
        Ok(detail) => {
            let mut outcome = StepOutcome::stay(Phase::Time, Listen::Restart);
            if existing_hint.is_none() {
                // Prefill from the first recommended slot; editable, and
                // never auto-confirmed by silence.
                outcome.time_hint = detail.default_time_hint();
                outcome.time_hint_spoken = Some(false);
            }
            outcome.detail = Some(detail);
            outcome
        }
        Err(e) => {
            warn!("fetch_detail failed for {}번째: {}", ordinal, e);
            StepOutcome::stay(Phase::Choice, Listen::Restart)
                .with_status("상세 정보를 불러오지 못했어요. 다른 번호를 말씀해 주세요.")
        }
    }
}
