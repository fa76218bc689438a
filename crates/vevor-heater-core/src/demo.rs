//! Demo Mode - Simulated heater for testing
//!
//! [`DemoHeater`] implements [`Transport`] by answering every command frame
//! with a checksummed status notification, the way the real heater does.
//! The heater walks through its start-up phases (warmup, self test,
//! ignition, heating) one status exchange at a time, and slowly warms the
//! room while it runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::heater::{OperationalMode, OperationalStatus};
use crate::protocol::{
    Command, NotificationHandler, OutgoingFrame, RawStatusFrame, RequestType, Transport,
    TransportError,
};

/// Address reported by [`DemoHeater::new`]
pub const DEMO_ADDRESS: &str = "DE:M0:00:00:00:01";

/// Exchanges spent in shutdown before the heater reports off
const SHUTDOWN_EXCHANGES: u8 = 2;

/// In-process heater that speaks the BLE protocol
pub struct DemoHeater {
    address: String,
    connected: AtomicBool,
    state: Mutex<HeaterState>,
    handler: Mutex<Option<NotificationHandler>>,
}

impl Default for DemoHeater {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoHeater {
    /// Create a demo heater with a random noise source
    pub fn new() -> Self {
        Self::with_rng(DEMO_ADDRESS, StdRng::from_entropy())
    }

    /// Create a demo heater whose readings are reproducible
    pub fn with_seed(address: impl Into<String>, seed: u64) -> Self {
        Self::with_rng(address, StdRng::seed_from_u64(seed))
    }

    fn with_rng(address: impl Into<String>, rng: StdRng) -> Self {
        Self {
            address: address.into(),
            connected: AtomicBool::new(true),
            state: Mutex::new(HeaterState::new(rng)),
            handler: Mutex::new(None),
        }
    }

    /// Simulate losing (or regaining) the BLE link
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
        if !connected {
            *lock(&self.handler) = None;
        }
    }

    /// Whether the simulated link is up
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Deliver an arbitrary notification to the current subscriber
    pub fn inject_notification(&self, data: &[u8]) {
        if let Some(handler) = lock(&self.handler).as_ref() {
            handler(data);
        }
    }

    /// Number of command frames the heater has answered
    pub fn exchanges(&self) -> u64 {
        lock(&self.state).exchanges
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

impl Transport for DemoHeater {
    fn address(&self) -> &str {
        &self.address
    }

    async fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        self.ensure_connected()?;
        let command =
            OutgoingFrame::parse(frame).map_err(|e| TransportError::Write(e.to_string()))?;

        let reply = {
            let mut state = lock(&self.state);
            state.apply(command);
            state.status_frame(command.request_type())
        };
        self.inject_notification(&reply.to_bytes());
        Ok(())
    }

    async fn subscribe(&self, handler: NotificationHandler) -> Result<(), TransportError> {
        self.ensure_connected()?;
        *lock(&self.handler) = Some(handler);
        Ok(())
    }

    async fn unsubscribe(&self) -> Result<(), TransportError> {
        *lock(&self.handler) = None;
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Off,
    Running(OperationalStatus),
    ShuttingDown { remaining: u8 },
}

struct HeaterState {
    phase: Phase,
    mode: OperationalMode,
    power_level: u8,
    target_temperature: u8,
    /// °C
    room_temperature: f64,
    /// °C
    combustion_temperature: f64,
    elevation: u16,
    exchanges: u64,
    rng: StdRng,
}

impl HeaterState {
    fn new(rng: StdRng) -> Self {
        Self {
            phase: Phase::Off,
            mode: OperationalMode::PowerLevel,
            power_level: 5,
            target_temperature: 20,
            room_temperature: 15.0,
            combustion_temperature: 15.0,
            elevation: 120,
            exchanges: 0,
            rng,
        }
    }

    fn apply(&mut self, command: Command) {
        self.exchanges += 1;

        match command {
            Command::ReadStatus => {}
            Command::TurnOn => {
                if !matches!(self.phase, Phase::Running(_)) {
                    info!("Demo heater starting");
                    self.phase = Phase::Running(OperationalStatus::Warmup);
                }
            }
            Command::TurnOff => {
                if matches!(self.phase, Phase::Running(_)) {
                    info!("Demo heater shutting down");
                    self.phase = Phase::ShuttingDown {
                        remaining: SHUTDOWN_EXCHANGES,
                    };
                }
            }
            Command::SetOperationalMode(mode) => self.mode = mode,
            Command::SetTarget(value) => {
                let range = self.mode.target_range();
                let value = value.clamp(*range.start(), *range.end());
                match self.mode {
                    OperationalMode::PowerLevel => self.power_level = value,
                    OperationalMode::TargetTemperature => self.target_temperature = value,
                }
            }
        }

        self.step();
    }

    /// Advance the simulation by one exchange
    fn step(&mut self) {
        self.phase = match self.phase {
            Phase::Running(OperationalStatus::Warmup) => {
                Phase::Running(OperationalStatus::SelfTestRunning)
            }
            Phase::Running(OperationalStatus::SelfTestRunning) => {
                Phase::Running(OperationalStatus::Ignition)
            }
            Phase::Running(OperationalStatus::Ignition) => {
                Phase::Running(OperationalStatus::Heating)
            }
            Phase::ShuttingDown { remaining: 0 } => {
                info!("Demo heater off");
                Phase::Off
            }
            Phase::ShuttingDown { remaining } => Phase::ShuttingDown {
                remaining: remaining - 1,
            },
            phase => phase,
        };

        let heating = self.phase == Phase::Running(OperationalStatus::Heating);
        let burner_target = if heating {
            80.0 + 15.0 * self.current_level() as f64
        } else {
            self.room_temperature
        };
        self.combustion_temperature += (burner_target - self.combustion_temperature) * 0.3;

        if heating {
            self.room_temperature += 0.05 * (self.current_level() + 1) as f64;
        } else {
            self.room_temperature -= 0.02;
        }
        self.room_temperature = self.room_temperature.clamp(-20.0, 40.0)
            + self.rng.gen_range(-0.1f64..0.1);
    }

    /// 0-based output level, 0-9
    fn current_level(&self) -> u8 {
        match self.mode {
            OperationalMode::PowerLevel => self.power_level.saturating_sub(1),
            OperationalMode::TargetTemperature => {
                let deficit = self.target_temperature as f64 - self.room_temperature;
                (deficit * 1.5).clamp(0.0, 9.0) as u8
            }
        }
    }

    fn status_frame(&mut self, request_type: RequestType) -> RawStatusFrame {
        let input_voltage_decivolts: u16 = self.rng.gen_range(120..=128);
        let mut raw = RawStatusFrame {
            request_type: request_type.as_raw(),
            elevation: self.elevation,
            operational_mode: self.mode.as_raw(),
            target_temperature_or_level: match self.mode {
                OperationalMode::PowerLevel => self.power_level,
                OperationalMode::TargetTemperature => self.target_temperature,
            },
            input_voltage_decivolts,
            combustion_temperature: self.combustion_temperature.max(0.0).round() as u16,
            room_temperature: self.room_temperature.max(0.0).round() as u16,
            ..Default::default()
        };

        match self.phase {
            Phase::Off => {
                // Stale payload; only the power byte is meaningful
                raw.power_status = 0;
                raw.operational_status = OperationalStatus::ShuttingDown.as_raw();
            }
            Phase::Running(status) => {
                raw.power_status = 1;
                raw.operational_status = status.as_raw();
            }
            Phase::ShuttingDown { .. } => {
                raw.power_status = 1;
                raw.operational_status = OperationalStatus::ShuttingDown.as_raw();
            }
        }
        raw.current_power_level = self.current_level();

        raw.sealed()
    }
}
