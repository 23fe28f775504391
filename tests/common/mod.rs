//! Recording fakes shared by the integration tests.
//!
//! Every fake appends to one shared call journal so tests can assert on the
//! relative order of side effects across collaborators.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use thunderboard::ble::{AddressKind, BootInfo, IdentityAddress, RadioStack};
use thunderboard::error::{DriverError, StackError, TimerError};
use thunderboard::power::{BatteryType, DeepSleep, OneShotTimer, PowerSupply};
use thunderboard::sensors::{
    DigitalInputs, Imu, ImuSample, RgbCommand, RgbLeds, Sensor, SensorKind,
};

// ═══════════════════════════════════════════════════════════════════════════
// Call Journal
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    SetAdvertisingData(Vec<u8>),
    StartAdvertising,
    StopAdvertising,
    TimerStart(u32),
    TimerCancel,
    EnterEm4,
    Init(SensorKind),
    Deinit(SensorKind),
    Read(SensorKind),
    Step(SensorKind),
    ImuEnable(bool),
    ImuCalibrate,
    ButtonChange,
    Rgb(RgbCommand),
}

pub type Journal = Rc<RefCell<Vec<Call>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

/// Journal contents, leaving the journal empty.
pub fn take(journal: &Journal) -> Vec<Call> {
    journal.borrow_mut().drain(..).collect()
}

pub fn count(journal: &Journal, call: &Call) -> usize {
    journal.borrow().iter().filter(|c| *c == call).count()
}

/// Index of the first `call` in `calls`; panics when absent.
pub fn position(calls: &[Call], call: &Call) -> usize {
    calls
        .iter()
        .position(|c| c == call)
        .unwrap_or_else(|| panic!("{:?} not in {:?}", call, calls))
}

// ═══════════════════════════════════════════════════════════════════════════
// Platform Fakes
// ═══════════════════════════════════════════════════════════════════════════

pub struct FakeRadio {
    pub journal: Journal,
}

impl RadioStack for FakeRadio {
    fn set_advertising_data(&mut self, data: &[u8]) -> Result<(), StackError> {
        self.journal
            .borrow_mut()
            .push(Call::SetAdvertisingData(data.to_vec()));
        Ok(())
    }

    fn start_advertising(&mut self) -> Result<(), StackError> {
        self.journal.borrow_mut().push(Call::StartAdvertising);
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), StackError> {
        self.journal.borrow_mut().push(Call::StopAdvertising);
        Ok(())
    }
}

pub struct FakeTimer {
    pub journal: Journal,
}

impl OneShotTimer for FakeTimer {
    fn start(&mut self, timeout_ms: u32) -> Result<(), TimerError> {
        self.journal.borrow_mut().push(Call::TimerStart(timeout_ms));
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), TimerError> {
        self.journal.borrow_mut().push(Call::TimerCancel);
        Ok(())
    }
}

pub struct FakeSleep {
    pub journal: Journal,
}

impl DeepSleep for FakeSleep {
    fn enter_em4(&mut self) {
        self.journal.borrow_mut().push(Call::EnterEm4);
    }
}

pub struct FakeSupply {
    pub low_power: bool,
    pub level: u8,
}

impl FakeSupply {
    pub fn coin_cell() -> Self {
        Self {
            low_power: true,
            level: 91,
        }
    }

    pub fn usb() -> Self {
        Self {
            low_power: false,
            level: 100,
        }
    }
}

impl PowerSupply for FakeSupply {
    fn is_low_power(&self) -> bool {
        self.low_power
    }

    fn battery_level(&mut self) -> u8 {
        self.level
    }

    fn battery_type(&self) -> BatteryType {
        if self.low_power {
            BatteryType::CoinCell
        } else {
            BatteryType::External
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Sensor Fakes
// ═══════════════════════════════════════════════════════════════════════════

pub struct FakeSensor<R> {
    pub kind: SensorKind,
    pub journal: Journal,
    pub init_result: Result<(), DriverError>,
    pub reading: Result<R, DriverError>,
}

impl<R: Copy> FakeSensor<R> {
    pub fn new(kind: SensorKind, journal: &Journal, reading: R) -> Self {
        Self {
            kind,
            journal: journal.clone(),
            init_result: Ok(()),
            reading: Ok(reading),
        }
    }

    pub fn failing_init(mut self, code: u32) -> Self {
        self.init_result = Err(DriverError::new(code));
        self
    }
}

impl<R: Copy> Sensor for FakeSensor<R> {
    type Reading = R;

    fn init(&mut self) -> Result<(), DriverError> {
        self.journal.borrow_mut().push(Call::Init(self.kind));
        self.init_result
    }

    fn deinit(&mut self) {
        self.journal.borrow_mut().push(Call::Deinit(self.kind));
    }

    fn read(&mut self) -> Result<R, DriverError> {
        self.journal.borrow_mut().push(Call::Read(self.kind));
        self.reading
    }

    fn step(&mut self) {
        self.journal.borrow_mut().push(Call::Step(self.kind));
    }
}

pub struct FakeImu {
    pub inner: FakeSensor<ImuSample>,
}

impl Sensor for FakeImu {
    type Reading = ImuSample;

    fn init(&mut self) -> Result<(), DriverError> {
        self.inner.init()
    }

    fn deinit(&mut self) {
        self.inner.deinit()
    }

    fn read(&mut self) -> Result<ImuSample, DriverError> {
        self.inner.read()
    }
}

impl Imu for FakeImu {
    fn enable(&mut self, enable: bool) -> Result<(), DriverError> {
        self.inner.journal.borrow_mut().push(Call::ImuEnable(enable));
        Ok(())
    }

    fn calibrate(&mut self) -> Result<(), DriverError> {
        self.inner.journal.borrow_mut().push(Call::ImuCalibrate);
        Ok(())
    }
}

/// Two buttons; `pressed` is latched on every edge notification.
pub struct FakeButtons {
    pub inner: FakeSensor<u8>,
    pub pressed: u8,
}

impl Sensor for FakeButtons {
    type Reading = u8;

    fn init(&mut self) -> Result<(), DriverError> {
        self.inner.init()
    }

    fn deinit(&mut self) {
        self.inner.deinit()
    }

    fn read(&mut self) -> Result<u8, DriverError> {
        self.inner.read()
    }
}

impl DigitalInputs for FakeButtons {
    fn on_button_change(&mut self) {
        self.inner.journal.borrow_mut().push(Call::ButtonChange);
        self.inner.reading = Ok(self.pressed);
    }
}

pub struct FakeLeds {
    pub journal: Journal,
}

impl RgbLeds for FakeLeds {
    fn led_count(&self) -> u8 {
        4
    }

    fn set(&mut self, command: RgbCommand) {
        self.journal.borrow_mut().push(Call::Rgb(command));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Stack Events
// ═══════════════════════════════════════════════════════════════════════════

/// Boot info for `AA:BB:CC:DD:EE:FF`, public address.
pub fn boot_info() -> BootInfo {
    BootInfo {
        major: 7,
        minor: 1,
        patch: 0,
        build: 273,
        hash: 0x5A5A_0001,
        address: IdentityAddress([0xFF, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA]),
        address_kind: AddressKind::Public,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Log Capture
// ═══════════════════════════════════════════════════════════════════════════

thread_local! {
    static RECORDS: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        RECORDS.with(|r| {
            r.borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Installs the capture logger (once per process) and clears this thread's
/// records. The test harness runs each test on its own thread.
pub fn capture_logs() {
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
    });
    RECORDS.with(|r| r.borrow_mut().clear());
}

/// Records logged on this thread since [`capture_logs`].
pub fn logs() -> Vec<(log::Level, String)> {
    RECORDS.with(|r| r.borrow().clone())
}

pub fn logged(level: log::Level, line: &str) -> bool {
    logs().iter().any(|(l, m)| *l == level && m == line)
}
