//! Unit tests for the lifecycle state machine.
//!
//! The pure transition function is checked edge by edge; the controller
//! tests run it against minimal fakes on the host.

use super::*;
use crate::ble::{AddressKind, IdentityAddress};
use crate::error::{DriverError, StackError, TimerError};
use crate::power::{BatteryType, TimerState};
use crate::sensors::registry::Driver;
use crate::sensors::{Sensor, SensorKind, SensorState};

fn boot_info() -> BootInfo {
    BootInfo {
        major: 3,
        minor: 2,
        patch: 4,
        build: 168,
        hash: 0x1234_ABCD,
        address: IdentityAddress([0xFF, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA]),
        address_kind: AddressKind::Public,
    }
}

fn boot() -> Input {
    Input::Stack(StackEvent::BootComplete(boot_info()))
}

const OPENED: Input = Input::Stack(StackEvent::ConnectionOpened);
const CLOSED: Input = Input::Stack(StackEvent::ConnectionClosed);

// ═══════════════════════════════════════════════════════════════════════════
// Transition Table Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn boot_complete_starts_advertising_then_arms() {
    let (next, acts) = transition(LifecycleState::Booting, boot());
    assert_eq!(next, LifecycleState::Advertising);
    assert_eq!(
        acts.as_slice(),
        &[
            Action::LogBoot(boot_info()),
            Action::InitializeAdvertiser(0xDDEEFF),
            Action::ArmShutdownTimer,
        ]
    );
}

#[test]
fn connection_opened_disarms_before_sensor_init() {
    let (next, acts) = transition(LifecycleState::Advertising, OPENED);
    assert_eq!(next, LifecycleState::Connected);
    assert_eq!(
        acts.as_slice(),
        &[
            Action::StopAdvertising,
            Action::DisarmShutdownTimer,
            Action::InitSensors,
        ]
    );
}

#[test]
fn connection_closed_arms_before_sensor_deinit() {
    let (next, acts) = transition(LifecycleState::Connected, CLOSED);
    assert_eq!(next, LifecycleState::Advertising);
    assert_eq!(
        acts.as_slice(),
        &[
            Action::ArmShutdownTimer,
            Action::DeinitSensors,
            Action::StartAdvertising,
        ]
    );
}

#[test]
fn timeout_stops_advertising_before_em4() {
    for from in [LifecycleState::Booting, LifecycleState::Advertising] {
        let (next, acts) = transition(from, Input::ShutdownTimeout);
        assert_eq!(next, LifecycleState::Shutdown);
        assert_eq!(acts.as_slice(), &[Action::StopAdvertising, Action::EnterEm4]);
    }
}

#[test]
fn unknown_events_are_ignored_everywhere() {
    for from in [
        LifecycleState::Booting,
        LifecycleState::Advertising,
        LifecycleState::Connected,
        LifecycleState::Shutdown,
    ] {
        let (next, acts) = transition(from, Input::Stack(StackEvent::Other(0x20)));
        assert_eq!(next, from);
        assert!(acts.is_empty());
    }
}

#[test]
fn out_of_place_events_are_ignored() {
    let cases = [
        (LifecycleState::Booting, OPENED),
        (LifecycleState::Booting, CLOSED),
        (LifecycleState::Advertising, boot()),
        (LifecycleState::Advertising, CLOSED),
        (LifecycleState::Connected, OPENED),
        (LifecycleState::Connected, boot()),
        (LifecycleState::Connected, Input::ShutdownTimeout),
        (LifecycleState::Shutdown, boot()),
        (LifecycleState::Shutdown, Input::ShutdownTimeout),
    ];
    for (from, input) in cases {
        let (next, acts) = transition(from, input);
        assert_eq!(next, from, "{:?} on {:?}", input, from);
        assert!(acts.is_empty());
    }
}

#[test]
fn stack_event_converts_into_input() {
    let input: Input = StackEvent::ConnectionOpened.into();
    assert_eq!(input, OPENED);
}

// ═══════════════════════════════════════════════════════════════════════════
// Controller Tests
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct Radio {
    advertising: bool,
}

impl RadioStack for Radio {
    fn set_advertising_data(&mut self, _data: &[u8]) -> Result<(), StackError> {
        Ok(())
    }

    fn start_advertising(&mut self) -> Result<(), StackError> {
        self.advertising = true;
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), StackError> {
        self.advertising = false;
        Ok(())
    }
}

#[derive(Default)]
struct Timer {
    starts: u32,
    cancels: u32,
}

impl OneShotTimer for Timer {
    fn start(&mut self, _timeout_ms: u32) -> Result<(), TimerError> {
        self.starts += 1;
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), TimerError> {
        self.cancels += 1;
        Ok(())
    }
}

#[derive(Default)]
struct Sleep {
    entered: bool,
}

impl DeepSleep for Sleep {
    fn enter_em4(&mut self) {
        self.entered = true;
    }
}

struct Supply(bool);

impl PowerSupply for Supply {
    fn is_low_power(&self) -> bool {
        self.0
    }

    fn battery_level(&mut self) -> u8 {
        50
    }

    fn battery_type(&self) -> BatteryType {
        BatteryType::CoinCell
    }
}

#[derive(Default)]
struct Mic {
    steps: u32,
}

impl Sensor for Mic {
    type Reading = f32;

    fn init(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn deinit(&mut self) {}

    fn read(&mut self) -> Result<f32, DriverError> {
        Ok(42.0)
    }

    fn step(&mut self) {
        self.steps += 1;
    }
}

#[test]
fn startup_arms_once_on_low_power() {
    let mut ctl = Controller::new(
        Radio::default(),
        Timer::default(),
        Registry::builder().build(),
        Sleep::default(),
        Supply(true),
    );
    ctl.startup();
    assert_eq!(ctl.shutdown_timer().state(), TimerState::Armed);

    ctl.handle(boot());
    assert_eq!(ctl.state(), LifecycleState::Advertising);
    assert_eq!(ctl.shutdown_timer().timer().starts, 1);
    assert!(ctl.advertiser().radio().advertising);
    assert_eq!(ctl.advertiser().unique_id(), Some(0xDDEEFF));
}

#[test]
fn timeout_enters_em4_and_stops_radio() {
    let mut ctl = Controller::new(
        Radio::default(),
        Timer::default(),
        Registry::builder().build(),
        Sleep::default(),
        Supply(true),
    );
    ctl.startup();
    ctl.handle(boot());
    ctl.handle(Input::ShutdownTimeout);

    assert_eq!(ctl.state(), LifecycleState::Shutdown);
    assert!(!ctl.advertiser().is_advertising());
    assert!(ctl.sleep().entered);
    assert_eq!(ctl.shutdown_timer().state(), TimerState::Idle);
}

#[test]
fn unarmed_controller_ignores_timeout() {
    let mut ctl = Controller::new(
        Radio::default(),
        Timer::default(),
        Registry::builder().build(),
        Sleep::default(),
        Supply(false),
    );
    ctl.startup();
    ctl.handle(boot());
    ctl.handle(Input::ShutdownTimeout);

    assert_eq!(ctl.state(), LifecycleState::Advertising);
    assert!(ctl.advertiser().is_advertising());
    assert!(!ctl.sleep().entered);
}

#[test]
fn connected_controller_ignores_stale_timeout() {
    let mut ctl = Controller::new(
        Radio::default(),
        Timer::default(),
        Registry::builder().build(),
        Sleep::default(),
        Supply(true),
    );
    ctl.startup();
    ctl.handle(boot());
    ctl.handle(OPENED);
    ctl.handle(Input::ShutdownTimeout);

    assert_eq!(ctl.state(), LifecycleState::Connected);
    assert!(!ctl.sleep().entered);
    assert_eq!(ctl.shutdown_timer().timer().cancels, 1);
}

#[test]
fn process_action_steps_only_while_connected() {
    let mut mic = Mic::default();
    {
        let registry = Registry::builder().with(Driver::Sound(&mut mic)).build();
        let mut ctl = Controller::new(
            Radio::default(),
            Timer::default(),
            registry,
            Sleep::default(),
            Supply(false),
        );
        ctl.startup();
        ctl.handle(boot());
        ctl.process_action();

        ctl.handle(OPENED);
        assert_eq!(
            ctl.registry().state(SensorKind::Sound),
            Some(SensorState::Ready)
        );
        ctl.process_action();
        ctl.process_action();

        ctl.handle(CLOSED);
        ctl.process_action();
    }
    assert_eq!(mic.steps, 2);
}

#[test]
fn hooks_read_through_the_registry() {
    let mut mic = Mic::default();
    let registry = Registry::builder().with(Driver::Sound(&mut mic)).build();
    let mut ctl = Controller::new(
        Radio::default(),
        Timer::default(),
        registry,
        Sleep::default(),
        Supply(false),
    );
    ctl.startup();
    ctl.handle(boot());
    assert_eq!(
        crate::gatt::AttributeHooks::sound_level(&mut ctl.hooks()),
        Err(crate::error::SensorError::NotInitialized)
    );
    ctl.handle(OPENED);
    assert_eq!(
        crate::gatt::AttributeHooks::sound_level(&mut ctl.hooks()),
        Ok(42.0)
    );
}
