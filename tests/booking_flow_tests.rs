// Integration tests for the voice-booking state machine
//
// Sessions are driven end-to-end with a scripted recognizer and an
// in-memory gateway, on a paused tokio clock: the silence watchdog,
// settle delays, and scripted speech all run on virtual time.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parkvoice::booking::{
    BookingSession, ParkingSpaceDetail, ParkingSpaceListItem, Phase, ReservationResult,
    SessionSnapshot, TimeSlot,
};
use parkvoice::config::VoiceConfig;
use parkvoice::gateway::{BookingGateway, GatewayError};
use parkvoice::stt::{
    ScriptedRecognizer, ScriptedUtterance, SpeechEvent, SpeechRecognizer, UnsupportedRecognizer,
};
use parkvoice::tts::TracingSpeaker;
use tokio::sync::mpsc;

// ============================================================================
// In-memory gateway
// ============================================================================

#[derive(Default)]
struct MockGateway {
    items: Vec<ParkingSpaceListItem>,
    slots: Vec<TimeSlot>,
    list_fails: bool,
    detail_fails: bool,
    reserve_fails: bool,
    calls: Mutex<Vec<String>>,
}

impl MockGateway {
    fn with_items(count: usize) -> Self {
        let items = (0..count)
            .map(|i| ParkingSpaceListItem {
                id: 100 + i as i64,
                address: format!("대구 북구 대학로 {}", 10 + i),
                latitude: 35.89,
                longitude: 128.61,
                available_start_time: "2025-11-02T09:00:00".to_string(),
                available_end_time: "2025-11-02T18:00:00".to_string(),
                price: 1500,
                status: true,
                available_count: 2,
            })
            .collect();
        Self {
            items,
            slots: vec![
                TimeSlot {
                    start_time: "2025-11-02T09:00:00".to_string(),
                    end_time: "2025-11-02T11:00:00".to_string(),
                },
                TimeSlot {
                    start_time: "2025-11-02T14:00:00".to_string(),
                    end_time: "2025-11-02T16:00:00".to_string(),
                },
            ],
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl BookingGateway for MockGateway {
    async fn list_nearby(
        &self,
        _user_id: i64,
        address: &str,
    ) -> Result<Vec<ParkingSpaceListItem>, GatewayError> {
        self.record(format!("list:{}", address));
        if self.list_fails {
            return Err(GatewayError::Rejected("list failed".to_string()));
        }
        Ok(self.items.clone())
    }

    async fn fetch_detail(
        &self,
        _user_id: i64,
        selection_text: &str,
    ) -> Result<ParkingSpaceDetail, GatewayError> {
        self.record(format!("detail:{}", selection_text));
        if self.detail_fails {
            return Err(GatewayError::Rejected("detail failed".to_string()));
        }

        let ordinal: usize = selection_text
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .map_err(|_| GatewayError::Rejected("bad ordinal".to_string()))?;
        let item = self
            .items
            .get(ordinal - 1)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected("ordinal out of range".to_string()))?;

        Ok(ParkingSpaceDetail {
            parking_space: item,
            available_time_slots: self.slots.clone(),
        })
    }

    async fn reserve(
        &self,
        user_id: i64,
        parking_space_id: i64,
        time_text: &str,
    ) -> Result<ReservationResult, GatewayError> {
        self.record(format!("reserve:{}:{}", parking_space_id, time_text));
        if self.reserve_fails {
            return Err(GatewayError::Rejected("time not available".to_string()));
        }
        Ok(ReservationResult {
            id: 900,
            user_id,
            parking_space_id,
            start_time: "2025-11-02T13:00:00".to_string(),
            end_time: "2025-11-02T15:00:00".to_string(),
            status: "RESERVED".to_string(),
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn voice_config() -> VoiceConfig {
    // Small windows keep virtual-time tests tight
    VoiceConfig {
        silence_window_ms: 500,
        restart_settle_ms: 50,
    }
}

fn open_session(script: Vec<ScriptedUtterance>, gateway: Arc<MockGateway>) -> BookingSession {
    BookingSession::open(
        "test-session".to_string(),
        1,
        voice_config(),
        Box::new(ScriptedRecognizer::new(script)),
        gateway,
        Arc::new(TracingSpeaker),
    )
}

async fn wait_for(
    session: &BookingSession,
    what: &str,
    pred: impl Fn(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            let snapshot = session.snapshot().await;
            if pred(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for: {}", what))
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_single_utterance_books_without_choice_phase() {
    // "North gate lot, 3rd one, 1pm to 3pm" in one breath: the inline
    // ordinal skips Choice listening entirely and silence in the Time
    // phase confirms the spoken hint.
    let gateway = Arc::new(MockGateway::with_items(3));
    let session = open_session(
        vec![ScriptedUtterance::spoken(
            "경북대 북문 근처 주차장, 3번째, 오후 1시부터 3시까지",
        )],
        Arc::clone(&gateway),
    );

    let snapshot = wait_for(&session, "reservation", |s| s.reservation.is_some()).await;

    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(!snapshot.listening, "terminal phase stops listening");
    assert_eq!(snapshot.reservation.as_ref().unwrap().status, "RESERVED");
    assert_eq!(snapshot.time_hint, "오후 1시부터 3시까지");

    assert_eq!(
        gateway.calls(),
        vec![
            "list:경북대 북문 근처 주차장".to_string(),
            "detail:3번째".to_string(),
            "reserve:102:오후 1시부터 3시까지".to_string(),
        ]
    );

    session.cancel().await;
}

#[tokio::test(start_paused = true)]
async fn test_stepwise_flow_through_choice() {
    // Destination only, then an ordinal in a second utterance; the Time
    // phase hint defaults to the first recommended slot.
    let gateway = Arc::new(MockGateway::with_items(2));
    let session = open_session(
        vec![
            ScriptedUtterance::spoken("북문 근처 주차장"),
            ScriptedUtterance::spoken("첫번째"),
        ],
        Arc::clone(&gateway),
    );

    let choice = wait_for(&session, "choice phase", |s| s.phase == Phase::Choice).await;
    assert_eq!(choice.items.len(), 2);

    let time = wait_for(&session, "time phase", |s| s.phase == Phase::Time).await;
    assert_eq!(
        time.time_hint, "09:00부터 11:00까지",
        "hint defaults to the first recommended slot"
    );
    assert!(
        !time.time_hint_spoken,
        "a defaulted hint is not confirmed by silence"
    );
    assert_eq!(time.detail.as_ref().unwrap().parking_space.id, 100);

    assert_eq!(
        gateway.calls(),
        vec!["list:북문 근처 주차장".to_string(), "detail:1번째".to_string()]
    );

    session.cancel().await;
}

#[tokio::test(start_paused = true)]
async fn test_zero_results_reprompts_in_address_phase() {
    let gateway = Arc::new(MockGateway::with_items(0));
    let session = open_session(
        vec![ScriptedUtterance::spoken("화성 제1기지 주차장")],
        Arc::clone(&gateway),
    );

    let snapshot = wait_for(&session, "no-results status", |s| {
        s.status.as_deref().is_some_and(|m| m.contains("찾지 못했어요"))
    })
    .await;

    assert_eq!(snapshot.phase, Phase::Address);
    assert!(snapshot.listening, "listening restarts for another try");
    assert_eq!(gateway.calls(), vec!["list:화성 제1기지 주차장".to_string()]);

    session.cancel().await;
}

#[tokio::test(start_paused = true)]
async fn test_list_failure_reprompts_in_address_phase() {
    let gateway = Arc::new(MockGateway {
        list_fails: true,
        ..MockGateway::with_items(2)
    });
    let session = open_session(
        vec![ScriptedUtterance::spoken("북문 근처 주차장")],
        Arc::clone(&gateway),
    );

    let snapshot = wait_for(&session, "list error status", |s| {
        s.status.as_deref().is_some_and(|m| m.contains("불러오지 못했어요"))
    })
    .await;

    assert_eq!(snapshot.phase, Phase::Address);
    assert!(snapshot.listening);

    session.cancel().await;
}

#[tokio::test(start_paused = true)]
async fn test_unparsable_ordinal_stays_in_choice() {
    let gateway = Arc::new(MockGateway::with_items(2));
    let session = open_session(
        vec![
            ScriptedUtterance::spoken("북문 근처 주차장"),
            ScriptedUtterance::spoken("흠 잘 모르겠어요"),
            ScriptedUtterance::spoken("두번째"),
        ],
        Arc::clone(&gateway),
    );

    let reprompt = wait_for(&session, "ordinal reprompt", |s| {
        s.status.as_deref().is_some_and(|m| m.contains("다시 말씀해"))
    })
    .await;
    assert_eq!(reprompt.phase, Phase::Choice);
    assert!(reprompt.listening);

    // The third utterance resolves the selection
    let time = wait_for(&session, "time phase", |s| s.phase == Phase::Time).await;
    assert_eq!(time.detail.as_ref().unwrap().parking_space.id, 101);
    assert!(gateway.calls().contains(&"detail:2번째".to_string()));

    session.cancel().await;
}

#[tokio::test(start_paused = true)]
async fn test_reserve_failure_returns_to_time_and_keeps_hint() {
    let gateway = Arc::new(MockGateway {
        reserve_fails: true,
        ..MockGateway::with_items(3)
    });
    let session = open_session(
        vec![ScriptedUtterance::spoken(
            "북문 근처 주차장, 1번째, 오후 1시부터 3시까지",
        )],
        Arc::clone(&gateway),
    );

    let snapshot = wait_for(&session, "reserve failure status", |s| {
        s.status.as_deref().is_some_and(|m| m.contains("예약에 실패했어요"))
    })
    .await;

    assert_eq!(snapshot.phase, Phase::Time);
    assert!(snapshot.listening, "listening restarts for a corrected time");
    assert_eq!(
        snapshot.time_hint, "오후 1시부터 3시까지",
        "failed attempt stays editable"
    );
    assert!(snapshot.reservation.is_none());

    // The failed text must not be auto-retried by later silence
    tokio::time::sleep(Duration::from_secs(5)).await;
    let reserves = gateway
        .calls()
        .iter()
        .filter(|c| c.starts_with("reserve:"))
        .count();
    assert_eq!(reserves, 1, "no automatic retry of a failed reservation");

    session.cancel().await;
}

// ============================================================================
// Manual fallbacks
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_manual_tap_is_equivalent_to_choice_ordinal() {
    let gateway = Arc::new(MockGateway::with_items(2));
    let session = open_session(
        vec![ScriptedUtterance::spoken("북문 근처 주차장")],
        Arc::clone(&gateway),
    );

    wait_for(&session, "choice phase", |s| s.phase == Phase::Choice).await;

    // Tap the second list item
    session.select(1).await.unwrap();

    let time = wait_for(&session, "time phase", |s| s.phase == Phase::Time).await;
    assert_eq!(time.detail.as_ref().unwrap().parking_space.id, 101);
    assert!(gateway.calls().contains(&"detail:2번째".to_string()));

    session.cancel().await;
}

#[tokio::test(start_paused = true)]
async fn test_typed_time_and_explicit_confirm() {
    let gateway = Arc::new(MockGateway::with_items(1));
    let session = open_session(
        vec![ScriptedUtterance::spoken("북문 근처 주차장, 첫번째")],
        Arc::clone(&gateway),
    );

    wait_for(&session, "time phase", |s| s.phase == Phase::Time).await;

    session
        .set_time_text("10시부터 12시까지".to_string())
        .await
        .unwrap();
    session.reserve().await.unwrap();

    let done = wait_for(&session, "reservation", |s| s.reservation.is_some()).await;
    assert_eq!(done.phase, Phase::Idle);
    assert!(gateway
        .calls()
        .contains(&"reserve:100:10시부터 12시까지".to_string()));

    session.cancel().await;
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_tap_is_rejected() {
    let gateway = Arc::new(MockGateway::with_items(1));
    let session = open_session(
        vec![ScriptedUtterance::spoken("북문 근처 주차장")],
        Arc::clone(&gateway),
    );

    wait_for(&session, "choice phase", |s| s.phase == Phase::Choice).await;
    session.select(5).await.unwrap();

    let snapshot = wait_for(&session, "rejection status", |s| {
        s.status.as_deref().is_some_and(|m| m.contains("해당 번호"))
    })
    .await;
    assert_eq!(snapshot.phase, Phase::Choice, "phase is unchanged");
    assert!(!gateway.calls().iter().any(|c| c.starts_with("detail:")));

    session.cancel().await;
}

#[tokio::test(start_paused = true)]
async fn test_book_again_reopens_the_flow() {
    let gateway = Arc::new(MockGateway::with_items(2));
    let session = open_session(
        vec![ScriptedUtterance::spoken(
            "북문 근처 주차장, 1번째, 오후 1시부터 3시까지",
        )],
        Arc::clone(&gateway),
    );

    wait_for(&session, "reservation", |s| s.reservation.is_some()).await;

    session.book_again().await.unwrap();

    let reopened = wait_for(&session, "choice phase again", |s| s.phase == Phase::Choice).await;
    assert!(reopened.reservation.is_none());
    assert!(reopened.detail.is_none());
    assert!(reopened.time_hint.is_empty());
    assert_eq!(reopened.items.len(), 2, "the list survives for re-selection");
    assert!(reopened.listening);

    session.cancel().await;
}

// ============================================================================
// Lifecycle and resource discipline
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_listening_and_closes_the_session() {
    let gateway = Arc::new(MockGateway::with_items(2));
    let session = open_session(
        vec![ScriptedUtterance::spoken("북문 근처 주차장")],
        Arc::clone(&gateway),
    );

    wait_for(&session, "listening", |s| s.listening).await;
    session.cancel().await;

    let snapshot = session.snapshot().await;
    assert!(!snapshot.active);
    assert!(!snapshot.listening);

    // Commands after close are rejected
    assert!(session.select(0).await.is_err());
    assert!(session.reserve().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_recognizer_is_recoverable() {
    let gateway = Arc::new(MockGateway::with_items(1));
    let session = BookingSession::open(
        "test-session".to_string(),
        1,
        voice_config(),
        Box::new(UnsupportedRecognizer),
        Arc::clone(&gateway) as Arc<dyn BookingGateway>,
        Arc::new(TracingSpeaker),
    );

    let snapshot = wait_for(&session, "unavailable status", |s| s.status.is_some()).await;
    assert!(!snapshot.listening);
    assert!(snapshot.active, "session stays open for manual actions");
    assert_eq!(snapshot.phase, Phase::Address);

    session.cancel().await;
}

/// Recognizer wrapper that records start/stop ordering violations.
struct GuardedRecognizer {
    inner: ScriptedRecognizer,
    live: Arc<AtomicBool>,
    starts: Arc<AtomicUsize>,
    violations: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl SpeechRecognizer for GuardedRecognizer {
    async fn start(&mut self) -> anyhow::Result<mpsc::Receiver<SpeechEvent>> {
        if self.live.swap(true, Ordering::SeqCst) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.inner.start().await
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.live.store(false, Ordering::SeqCst);
        self.inner.stop().await
    }

    fn is_listening(&self) -> bool {
        self.inner.is_listening()
    }

    fn name(&self) -> &str {
        "guarded"
    }
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_recognizer_instance_is_live() {
    let gateway = Arc::new(MockGateway::with_items(2));
    let starts = Arc::new(AtomicUsize::new(0));
    let violations = Arc::new(AtomicUsize::new(0));

    let recognizer = GuardedRecognizer {
        inner: ScriptedRecognizer::new(vec![
            ScriptedUtterance::spoken("북문 근처 주차장"),
            ScriptedUtterance::spoken("첫번째"),
        ]),
        live: Arc::new(AtomicBool::new(false)),
        starts: Arc::clone(&starts),
        violations: Arc::clone(&violations),
    };

    let session = BookingSession::open(
        "test-session".to_string(),
        1,
        voice_config(),
        Box::new(recognizer),
        Arc::clone(&gateway) as Arc<dyn BookingGateway>,
        Arc::new(TracingSpeaker),
    );

    wait_for(&session, "time phase", |s| s.phase == Phase::Time).await;
    session.cancel().await;

    assert!(
        starts.load(Ordering::SeqCst) >= 3,
        "each phase gets its own listening segment"
    );
    assert_eq!(
        violations.load(Ordering::SeqCst),
        0,
        "a new start must never precede the previous stop"
    );
}

#[tokio::test(start_paused = true)]
async fn test_phases_advance_monotonically_on_success() {
    let gateway = Arc::new(MockGateway::with_items(2));
    let session = open_session(
        vec![
            ScriptedUtterance::spoken("북문 근처 주차장"),
            ScriptedUtterance::spoken("첫번째"),
            ScriptedUtterance::spoken("오후 1시부터 3시까지"),
        ],
        Arc::clone(&gateway),
    );

    let order = [Phase::Address, Phase::Choice, Phase::Time, Phase::Idle];
    let mut last = 0usize;

    let _ = tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            let snapshot = session.snapshot().await;
            let pos = order.iter().position(|p| *p == snapshot.phase).unwrap();
            assert!(
                pos >= last,
                "phase moved backward: {:?} after {:?}",
                snapshot.phase,
                order[last]
            );
            last = pos;
            if snapshot.phase == Phase::Idle {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("flow should reach Idle");

    assert!(session.snapshot().await.reservation.is_some());
    session.cancel().await;
}
