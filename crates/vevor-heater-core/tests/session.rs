use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use vevor_heater_core::config::SessionConfig;
use vevor_heater_core::heater::{HeaterStatus, OperationalMode, PowerStatus};
use vevor_heater_core::protocol::{
    Command, HeaterSession, NotificationHandler, RawStatusFrame, RequestType, SessionError,
    Transport, TransportError,
};

const ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

type Responder = Box<dyn Fn(&[u8]) -> Vec<Vec<u8>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    /// Command frame written, with its request type
    Write(u8),
    /// Notification delivered, with its request type
    Notify(u8),
}

/// Mock characteristic that answers writes with scripted notifications
struct ScriptedTransport {
    address: String,
    handler: Arc<Mutex<Option<NotificationHandler>>>,
    events: Arc<Mutex<Vec<Event>>>,
    responder: Responder,
    reply_delay: Duration,
    fail_writes: bool,
    stall_writes: bool,
    drop_handler_on_write: bool,
    fail_subscribe: bool,
    fail_unsubscribe: bool,
}

impl ScriptedTransport {
    fn new(responder: Responder) -> Self {
        Self {
            address: ADDRESS.to_string(),
            handler: Arc::new(Mutex::new(None)),
            events: Arc::new(Mutex::new(Vec::new())),
            responder,
            reply_delay: Duration::from_millis(10),
            fail_writes: false,
            stall_writes: false,
            drop_handler_on_write: false,
            fail_subscribe: false,
            fail_unsubscribe: false,
        }
    }

    /// Answers every command with a valid frame echoing its request type
    fn echoing() -> Self {
        Self::new(Box::new(|frame: &[u8]| vec![running_frame(frame[4])]))
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn is_subscribed(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }
}

impl Transport for ScriptedTransport {
    fn address(&self) -> &str {
        &self.address
    }

    async fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        if self.fail_writes {
            return Err(TransportError::Write("link lost".to_string()));
        }
        if self.stall_writes {
            // Write-with-response whose acknowledgement never arrives
            std::future::pending::<()>().await;
        }
        self.events.lock().unwrap().push(Event::Write(frame[4]));

        if self.drop_handler_on_write {
            *self.handler.lock().unwrap() = None;
            return Ok(());
        }

        let replies = (self.responder)(frame);
        let handler = self.handler.clone();
        let events = self.events.clone();
        let delay = self.reply_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            for data in replies {
                if let Some(handler) = handler.lock().unwrap().as_ref() {
                    let tag = data.get(2).copied().unwrap_or(0);
                    events.lock().unwrap().push(Event::Notify(tag));
                    handler(&data);
                }
            }
        });
        Ok(())
    }

    async fn subscribe(&self, handler: NotificationHandler) -> Result<(), TransportError> {
        if self.fail_subscribe {
            return Err(TransportError::Subscribe("notify not permitted".to_string()));
        }
        *self.handler.lock().unwrap() = Some(handler);
        Ok(())
    }

    async fn unsubscribe(&self) -> Result<(), TransportError> {
        if self.fail_unsubscribe {
            return Err(TransportError::Unsubscribe("link busy".to_string()));
        }
        *self.handler.lock().unwrap() = None;
        Ok(())
    }
}

fn running_frame(request_type: u8) -> Vec<u8> {
    RawStatusFrame {
        request_type,
        power_status: 1,
        operational_status: 3,
        elevation: 90,
        operational_mode: 1,
        target_temperature_or_level: 4,
        input_voltage_decivolts: 126,
        combustion_temperature: 140,
        room_temperature: 18,
        ..Default::default()
    }
    .sealed()
    .to_bytes()
    .to_vec()
}

fn thermostat_frame(request_type: u8, target: u8) -> Vec<u8> {
    RawStatusFrame {
        request_type,
        power_status: 1,
        operational_status: 3,
        operational_mode: 2,
        target_temperature_or_level: target,
        current_power_level: 5,
        input_voltage_decivolts: 126,
        ..Default::default()
    }
    .sealed()
    .to_bytes()
    .to_vec()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn session(transport: ScriptedTransport) -> HeaterSession<ScriptedTransport> {
    init_tracing();
    HeaterSession::new(transport, SessionConfig::for_address(ADDRESS).with_timeout_ms(1000))
}

#[tokio::test]
async fn test_refresh_status_updates_latest() {
    let session = session(ScriptedTransport::echoing());
    assert_eq!(session.latest_status(), None);
    assert_eq!(session.last_updated(), None);

    let status = session.refresh_status().await.unwrap();
    assert_eq!(status.power_status, PowerStatus::Running);
    assert_eq!(status.target_power_level, Some(4));

    assert_eq!(session.latest_status(), Some(status));
    assert!(session.last_updated().is_some());
    assert!(!session.transport().is_subscribed());
    assert_eq!(
        session.transport().events(),
        vec![Event::Write(1), Event::Notify(1)]
    );
}

#[tokio::test]
async fn test_turn_on_and_off_use_same_request_type() {
    let session = session(ScriptedTransport::echoing());
    session.turn_on().await.unwrap();
    session.turn_off().await.unwrap();
    assert_eq!(
        session.transport().events(),
        vec![
            Event::Write(3),
            Event::Notify(3),
            Event::Write(3),
            Event::Notify(3)
        ]
    );
}

#[tokio::test]
async fn test_off_sentinel_is_returned() {
    let transport = ScriptedTransport::new(Box::new(|frame: &[u8]| {
        vec![RawStatusFrame {
            request_type: frame[4],
            operational_mode: 9,
            ..Default::default()
        }
        .sealed()
        .to_bytes()
        .to_vec()]
    }));
    let session = session(transport);

    let status = session.turn_off().await.unwrap();
    assert_eq!(status, HeaterStatus::off());
}

#[tokio::test]
async fn test_mismatched_response_is_skipped() {
    let transport = ScriptedTransport::new(Box::new(|frame: &[u8]| {
        vec![running_frame(3), running_frame(frame[4])]
    }));
    let session = session(transport);

    let status = session.refresh_status().await.unwrap();
    assert_eq!(status.power_status, PowerStatus::Running);
    assert_eq!(
        session.transport().events(),
        vec![Event::Write(1), Event::Notify(3), Event::Notify(1)]
    );
}

#[tokio::test]
async fn test_invalid_frames_are_skipped() {
    let transport = ScriptedTransport::new(Box::new(|frame: &[u8]| {
        let mut bad_checksum = running_frame(frame[4]);
        bad_checksum[19] ^= 0xFF;
        let mut out_of_range = RawStatusFrame::from_bytes(&running_frame(frame[4])).unwrap();
        out_of_range.operational_status = 9;

        vec![
            vec![0xAA, 0x55, 0x01],
            bad_checksum,
            out_of_range.sealed().to_bytes().to_vec(),
            running_frame(frame[4]),
        ]
    }));
    let session = session(transport);

    assert!(session.refresh_status().await.is_ok());
    assert_eq!(session.transport().events().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_only_mismatched_responses_times_out() {
    let transport = ScriptedTransport::new(Box::new(|_: &[u8]| vec![running_frame(4)]));
    let session = session(transport);

    let result = session.refresh_status().await;
    assert_eq!(result, Err(SessionError::Timeout(RequestType::ReadStatus)));
    assert_eq!(session.latest_status(), None);
    assert!(!session.transport().is_subscribed());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_releases_session() {
    let transport = ScriptedTransport::new(Box::new(|frame: &[u8]| {
        // Heater ignores status queries but answers everything else
        if frame[4] == 1 {
            Vec::new()
        } else {
            vec![running_frame(frame[4])]
        }
    }));
    let session = session(transport);

    assert_eq!(
        session.refresh_status().await,
        Err(SessionError::Timeout(RequestType::ReadStatus))
    );
    assert!(session.turn_on().await.is_ok());
}

#[tokio::test]
async fn test_write_failure() {
    let mut transport = ScriptedTransport::echoing();
    transport.fail_writes = true;
    let session = session(transport);

    let result = session.refresh_status().await;
    assert_eq!(
        result,
        Err(SessionError::TransportFailure(TransportError::Write(
            "link lost".to_string()
        )))
    );
    assert!(!session.transport().is_subscribed());
    assert_eq!(session.latest_status(), None);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_write_times_out_and_releases_session() {
    let mut transport = ScriptedTransport::echoing();
    transport.stall_writes = true;
    init_tracing();
    let session = HeaterSession::new(
        transport,
        SessionConfig::for_address(ADDRESS).with_timeout_ms(100),
    );

    let result = tokio::time::timeout(Duration::from_secs(3600), session.refresh_status())
        .await
        .expect("send must return once the response timeout elapses");
    assert_eq!(result, Err(SessionError::Timeout(RequestType::ReadStatus)));
    assert!(!session.transport().is_subscribed());

    // The guard was released, so the next caller gets its own timeout
    let next = tokio::time::timeout(Duration::from_secs(3600), session.turn_on())
        .await
        .expect("guard must not be held after a stalled write");
    assert_eq!(next, Err(SessionError::Timeout(RequestType::TurnOnOff)));
}

#[tokio::test]
async fn test_subscribe_failure_writes_nothing() {
    let mut transport = ScriptedTransport::echoing();
    transport.fail_subscribe = true;
    let session = session(transport);

    assert_eq!(
        session.refresh_status().await,
        Err(SessionError::TransportFailure(TransportError::Subscribe(
            "notify not permitted".to_string()
        )))
    );
    assert!(session.transport().events().is_empty());
    assert_eq!(session.latest_status(), None);
}

#[tokio::test]
async fn test_unsubscribe_failure_still_returns_status() {
    let mut transport = ScriptedTransport::echoing();
    transport.fail_unsubscribe = true;
    let session = session(transport);

    let status = session.refresh_status().await.unwrap();
    assert_eq!(status.power_status, PowerStatus::Running);
    assert_eq!(session.latest_status(), Some(status));
    assert!(session.last_updated().is_some());
}

#[tokio::test]
async fn test_lost_notification_stream() {
    let mut transport = ScriptedTransport::echoing();
    transport.drop_handler_on_write = true;
    let session = session(transport);

    assert_eq!(
        session.refresh_status().await,
        Err(SessionError::TransportFailure(TransportError::Disconnected))
    );
}

#[tokio::test]
async fn test_address_mismatch() {
    init_tracing();
    let session = HeaterSession::new(
        ScriptedTransport::echoing(),
        SessionConfig::for_address("11:22:33:44:55:66"),
    );

    assert_eq!(
        session.refresh_status().await,
        Err(SessionError::AddressMismatch {
            expected: "11:22:33:44:55:66".to_string(),
            actual: ADDRESS.to_string(),
        })
    );
    assert!(session.transport().events().is_empty());
}

#[tokio::test]
async fn test_address_adopted_from_transport() {
    let session = HeaterSession::new(ScriptedTransport::echoing(), SessionConfig::default());
    assert_eq!(session.address(), ADDRESS);
    assert!(session.refresh_status().await.is_ok());
}

#[tokio::test]
async fn test_concurrent_sends_do_not_interleave() {
    let session = session(ScriptedTransport::echoing());

    let (first, second) = tokio::join!(
        session.send(Command::ReadStatus),
        session.send(Command::SetTarget(6))
    );
    assert!(first.is_ok());
    assert!(second.is_ok());

    assert_eq!(
        session.transport().events(),
        vec![
            Event::Write(1),
            Event::Notify(1),
            Event::Write(4),
            Event::Notify(4)
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_sends_are_serialized() {
    let session = Arc::new(session(ScriptedTransport::echoing()));
    let commands = [
        Command::ReadStatus,
        Command::TurnOn,
        Command::SetOperationalMode(OperationalMode::PowerLevel),
        Command::SetTarget(3),
        Command::TurnOff,
        Command::ReadStatus,
    ];

    let tasks: Vec<_> = commands
        .into_iter()
        .map(|command| {
            let session = session.clone();
            tokio::spawn(async move { session.send(command).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    let events = session.transport().events();
    assert_eq!(events.len(), commands.len() * 2);
    for pair in events.chunks(2) {
        match pair {
            [Event::Write(sent), Event::Notify(answered)] => assert_eq!(sent, answered),
            other => panic!("interleaved exchange: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_set_target_temperature() {
    let transport = ScriptedTransport::new(Box::new(|frame: &[u8]| match frame[4] {
        2 => vec![thermostat_frame(2, 20)],
        _ => vec![thermostat_frame(frame[4], frame[5])],
    }));
    let session = session(transport);

    let status = session.set_target_temperature(23).await.unwrap();
    assert_eq!(status.operational_mode, Some(OperationalMode::TargetTemperature));
    assert_eq!(status.target_temperature, Some(23));
    assert_eq!(status.current_power_level, Some(6));
    assert_eq!(
        session.transport().events(),
        vec![
            Event::Write(2),
            Event::Notify(2),
            Event::Write(4),
            Event::Notify(4)
        ]
    );
}

#[tokio::test]
async fn test_set_target_power_level() {
    let session = session(ScriptedTransport::echoing());
    session.set_target_power_level(4).await.unwrap();
    assert_eq!(
        session.transport().events(),
        vec![
            Event::Write(2),
            Event::Notify(2),
            Event::Write(4),
            Event::Notify(4)
        ]
    );
}

#[tokio::test]
async fn test_out_of_range_targets_are_not_sent() {
    let session = session(ScriptedTransport::echoing());

    assert_eq!(
        session.set_target_temperature(37).await,
        Err(SessionError::InvalidTarget {
            value: 37,
            min: 8,
            max: 36
        })
    );
    assert_eq!(
        session.set_target_power_level(0).await,
        Err(SessionError::InvalidTarget {
            value: 0,
            min: 1,
            max: 10
        })
    );
    assert!(session.transport().events().is_empty());
}
