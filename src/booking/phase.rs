use serde::Serialize;

/// Conversational phase: governs how an accumulated transcript is
/// interpreted when silence fires.
///
/// Forward transitions are linear (Address → Choice → Time → Idle, with
/// Choice skipped when the first utterance already carries an ordinal);
/// backward jumps happen only on failure-triggered retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Address,
    Choice,
    Time,
    Idle,
}

impl Phase {
    /// What the user should say in this phase.
    pub fn prompt(self) -> &'static str {
        match self {
            Phase::Address => "목적지를 말씀해 주세요.",
            Phase::Choice => "몇 번째 공간인지 말씀해 주세요.",
            Phase::Time => "예약 시간을 말씀해 주세요.",
            Phase::Idle => "음성 예약을 마쳤어요.",
        }
    }
}
