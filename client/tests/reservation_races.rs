//! Ordering guarantees for overlapping reservation and confirm calls.
//!
//! The username service here is a gated fake: each call announces itself and
//! then waits until the test releases it, so responses can be delivered in any
//! order relative to newer calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use client::domain::ports::{
    FixtureSessionState, NoOpNotificationSink, ReserveUsernameError, ReserveUsernameRequest,
    UsernameService, UsernameServiceError,
};
use client::domain::{
    ConfirmOutcome, NicknameLimits, Reservation, ReservationDraft, ReservationHash,
    ReservationStatus, ReserveOutcome, Username, UsernameReservationCoordinator,
    UsernameReservationPorts,
};
use rstest::{fixture, rstest};
use tokio::sync::{mpsc, oneshot};

type ReserveReply = Result<Reservation, ReserveUsernameError>;
type ServiceReply = Result<(), UsernameServiceError>;

const CONFIRM_CALL: &str = "<confirm>";

#[derive(Default)]
struct Gates {
    reserve: HashMap<String, oneshot::Sender<ReserveReply>>,
    confirm: VecDeque<oneshot::Sender<ServiceReply>>,
}

struct GatedUsernameService {
    started: mpsc::UnboundedSender<String>,
    gates: Mutex<Gates>,
    reserve_calls: Mutex<Vec<String>>,
}

impl GatedUsernameService {
    fn reserve_calls(&self) -> Vec<String> {
        self.reserve_calls.lock().expect("calls lock").clone()
    }

    fn release_reserve(&self, nickname: &str, reply: ReserveReply) {
        let gate = self
            .gates
            .lock()
            .expect("gates lock")
            .reserve
            .remove(nickname)
            .expect("reserve call should be pending");
        assert!(gate.send(reply).is_ok(), "reserve call should be waiting");
    }

    /// Deliver `reply` to the oldest pending confirm call.
    fn release_confirm(&self, reply: ServiceReply) {
        let gate = self
            .gates
            .lock()
            .expect("gates lock")
            .confirm
            .pop_front()
            .expect("confirm call should be pending");
        assert!(gate.send(reply).is_ok(), "confirm call should be waiting");
    }
}

#[async_trait]
impl UsernameService for GatedUsernameService {
    async fn reserve_username(&self, request: ReserveUsernameRequest) -> ReserveReply {
        let nickname = request.nickname.as_ref().to_owned();
        let (gate_tx, gate_rx) = oneshot::channel();
        self.gates
            .lock()
            .expect("gates lock")
            .reserve
            .insert(nickname.clone(), gate_tx);
        self.reserve_calls
            .lock()
            .expect("calls lock")
            .push(nickname.clone());
        self.started.send(nickname).expect("test should be listening");
        gate_rx.await.expect("test should release the call")
    }

    async fn confirm_username(&self, _reservation: &Reservation) -> ServiceReply {
        let (gate_tx, gate_rx) = oneshot::channel();
        self.gates
            .lock()
            .expect("gates lock")
            .confirm
            .push_back(gate_tx);
        self.started
            .send(CONFIRM_CALL.to_owned())
            .expect("test should be listening");
        gate_rx.await.expect("test should release the call")
    }

    async fn delete_username(&self, _username: &Username) -> ServiceReply {
        Ok(())
    }
}

struct Harness {
    service: Arc<GatedUsernameService>,
    started: mpsc::UnboundedReceiver<String>,
    coordinator: Arc<UsernameReservationCoordinator>,
}

impl Harness {
    async fn next_call(&mut self) -> String {
        self.started.recv().await.expect("service call announcement")
    }

    fn spawn_reserve(
        &self,
        nickname: &'static str,
        debounce: Duration,
    ) -> tokio::task::JoinHandle<ReserveOutcome> {
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move { coordinator.reserve(nickname, debounce).await })
    }

    fn spawn_confirm(&self) -> tokio::task::JoinHandle<ConfirmOutcome> {
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move { coordinator.confirm().await })
    }

    async fn wait_for_status(&self, status: ReservationStatus) {
        while self.coordinator.snapshot().status != status {
            tokio::task::yield_now().await;
        }
    }
}

#[fixture]
fn harness() -> Harness {
    let (started_tx, started) = mpsc::unbounded_channel();
    let service = Arc::new(GatedUsernameService {
        started: started_tx,
        gates: Mutex::new(Gates::default()),
        reserve_calls: Mutex::new(Vec::new()),
    });
    let coordinator = Arc::new(UsernameReservationCoordinator::new(
        UsernameReservationPorts::new(
            service.clone(),
            Arc::new(FixtureSessionState::without_username()),
            Arc::new(NoOpNotificationSink),
        ),
        NicknameLimits::default(),
    ));
    coordinator.open();
    Harness {
        service,
        started,
        coordinator,
    }
}

fn granted(nickname: &str) -> ReserveReply {
    Ok(Reservation::new(ReservationDraft {
        username: Username::parse(format!("{nickname}.42")).expect("username"),
        previous_username: None,
        hash: ReservationHash::new(nickname.as_bytes().to_vec()),
        expires_at: DateTime::<Utc>::MAX_UTC,
    }))
}

fn held_nickname(coordinator: &UsernameReservationCoordinator) -> Option<String> {
    coordinator
        .snapshot()
        .reservation
        .map(|reservation| reservation.nickname().to_owned())
}

#[rstest]
#[tokio::test]
async fn late_response_from_superseded_attempt_is_dropped(mut harness: Harness) {
    let first = harness.spawn_reserve("first_name", Duration::ZERO);
    assert_eq!(harness.next_call().await, "first_name");
    let second = harness.spawn_reserve("second_name", Duration::ZERO);
    assert_eq!(harness.next_call().await, "second_name");

    harness.service.release_reserve("second_name", granted("second_name"));
    let second_outcome = second.await.expect("second reserve task");
    assert!(matches!(second_outcome, ReserveOutcome::Reserved(_)));

    harness.service.release_reserve("first_name", granted("first_name"));
    let first_outcome = first.await.expect("first reserve task");

    assert_eq!(first_outcome, ReserveOutcome::Superseded);
    assert_eq!(
        held_nickname(&harness.coordinator).as_deref(),
        Some("second_name")
    );
}

#[rstest]
#[tokio::test]
async fn early_response_from_superseded_attempt_leaves_newer_attempt_pending(
    mut harness: Harness,
) {
    let first = harness.spawn_reserve("first_name", Duration::ZERO);
    assert_eq!(harness.next_call().await, "first_name");
    let second = harness.spawn_reserve("second_name", Duration::ZERO);
    assert_eq!(harness.next_call().await, "second_name");

    harness.service.release_reserve(
        "first_name",
        Err(ReserveUsernameError::conflict("taken")),
    );
    assert_eq!(
        first.await.expect("first reserve task"),
        ReserveOutcome::Superseded
    );
    let pending = harness.coordinator.snapshot();
    assert_eq!(pending.status, ReservationStatus::Reserving);
    assert_eq!(pending.error, None);

    harness.service.release_reserve("second_name", granted("second_name"));
    assert!(matches!(
        second.await.expect("second reserve task"),
        ReserveOutcome::Reserved(_)
    ));
    assert_eq!(
        held_nickname(&harness.coordinator).as_deref(),
        Some("second_name")
    );
}

#[rstest]
#[tokio::test]
async fn superseded_attempt_never_leaves_debounce(mut harness: Harness) {
    let first = harness.spawn_reserve("first_name", Duration::from_secs(3600));
    harness.wait_for_status(ReservationStatus::Reserving).await;

    let second = harness.spawn_reserve("second_name", Duration::ZERO);
    assert_eq!(harness.next_call().await, "second_name");
    assert_eq!(
        first.await.expect("first reserve task"),
        ReserveOutcome::Superseded
    );

    harness.service.release_reserve("second_name", granted("second_name"));
    second.await.expect("second reserve task");

    assert_eq!(harness.service.reserve_calls(), vec!["second_name".to_owned()]);
}

#[rstest]
#[tokio::test]
async fn close_drops_in_flight_reservation(mut harness: Harness) {
    let attempt = harness.spawn_reserve("valid_name", Duration::ZERO);
    assert_eq!(harness.next_call().await, "valid_name");

    harness.coordinator.close();
    harness.service.release_reserve("valid_name", granted("valid_name"));

    assert_eq!(
        attempt.await.expect("reserve task"),
        ReserveOutcome::Superseded
    );
    let snapshot = harness.coordinator.snapshot();
    assert_eq!(snapshot.status, ReservationStatus::Closed);
    assert_eq!(snapshot.reservation, None);
}

#[rstest]
#[tokio::test]
async fn reserve_is_ignored_while_confirm_is_in_flight(mut harness: Harness) {
    let attempt = harness.spawn_reserve("valid_name", Duration::ZERO);
    assert_eq!(harness.next_call().await, "valid_name");
    harness.service.release_reserve("valid_name", granted("valid_name"));
    attempt.await.expect("reserve task");

    let confirm = harness.spawn_confirm();
    assert_eq!(harness.next_call().await, CONFIRM_CALL);
    assert_eq!(
        harness.coordinator.reserve("other_name", Duration::ZERO).await,
        ReserveOutcome::Ignored
    );
    assert_eq!(
        harness.coordinator.snapshot().status,
        ReservationStatus::Confirming
    );

    harness.service.release_confirm(Ok(()));
    assert_eq!(
        confirm.await.expect("confirm task"),
        ConfirmOutcome::Confirmed
    );
    assert_eq!(harness.service.reserve_calls(), vec!["valid_name".to_owned()]);
}

#[rstest]
#[tokio::test]
async fn confirm_response_after_close_is_discarded(mut harness: Harness) {
    let attempt = harness.spawn_reserve("valid_name", Duration::ZERO);
    assert_eq!(harness.next_call().await, "valid_name");
    harness.service.release_reserve("valid_name", granted("valid_name"));
    attempt.await.expect("reserve task");

    let confirm = harness.spawn_confirm();
    assert_eq!(harness.next_call().await, CONFIRM_CALL);
    harness.coordinator.close();
    harness
        .service
        .release_confirm(Err(UsernameServiceError::rejected("late")));

    assert_eq!(
        confirm.await.expect("confirm task"),
        ConfirmOutcome::Discarded
    );
    let snapshot = harness.coordinator.snapshot();
    assert_eq!(snapshot.status, ReservationStatus::Closed);
    assert_eq!(snapshot.error, None);
}

#[rstest]
#[tokio::test]
async fn late_response_from_earlier_confirm_is_dropped(mut harness: Harness) {
    let attempt = harness.spawn_reserve("valid_name", Duration::ZERO);
    assert_eq!(harness.next_call().await, "valid_name");
    harness.service.release_reserve("valid_name", granted("valid_name"));
    attempt.await.expect("reserve task");
    let first_confirm = harness.spawn_confirm();
    assert_eq!(harness.next_call().await, CONFIRM_CALL);

    harness.coordinator.close();
    harness.coordinator.open();
    let attempt = harness.spawn_reserve("other_name", Duration::ZERO);
    assert_eq!(harness.next_call().await, "other_name");
    harness.service.release_reserve("other_name", granted("other_name"));
    attempt.await.expect("reserve task");
    let second_confirm = harness.spawn_confirm();
    assert_eq!(harness.next_call().await, CONFIRM_CALL);

    harness
        .service
        .release_confirm(Err(UsernameServiceError::rejected("hold released")));
    assert_eq!(
        first_confirm.await.expect("first confirm task"),
        ConfirmOutcome::Discarded
    );
    let pending = harness.coordinator.snapshot();
    assert_eq!(pending.status, ReservationStatus::Confirming);
    assert_eq!(pending.error, None);

    harness.service.release_confirm(Ok(()));
    assert_eq!(
        second_confirm.await.expect("second confirm task"),
        ConfirmOutcome::Confirmed
    );
    assert_eq!(
        harness.coordinator.snapshot().status,
        ReservationStatus::Closed
    );
}
