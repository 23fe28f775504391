//! Thunderboard firmware - nRF52840-DK port.
//!
//! Task layout (single-threaded embassy executor, all tasks cooperative):
//!
//! ```text
//!   softdevice_task   SoftDevice event pump
//!   bluetooth_task    advertise ⇄ connection, GATT server, value refresh
//!   timer_task        one-shot shutdown timer
//!   ticker_task       Controller::process_action every ACTION_TICK_MS
//!   buttons_task      DK buttons → AIO hook
//! ```
//!
//! The lifecycle controller lives in a `RefCell` shared by `&'static`
//! reference. It is only ever borrowed synchronously, never across an
//! `.await`, so the tasks cannot observe each other half-way.

#![no_std]
#![no_main]

mod board;

use core::cell::RefCell;
use core::mem;

use defmt::{error, info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_futures::select::{select, select3, Either, Either3};
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::interrupt::Priority;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker, Timer};
use heapless::Vec;
use nrf_softdevice::ble::{gatt_server, peripheral, AddressType, Connection};
use nrf_softdevice::{raw, Softdevice};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use board::{DieTemperature, DkButtons, DkLeds, DkSupply, SystemOff};
use thunderboard::ble::adv_payload::MAX_ADV_LEN;
use thunderboard::ble::{AddressKind, BootInfo, IdentityAddress, RadioStack, StackEvent};
use thunderboard::config;
use thunderboard::error::{StackError, TimerError};
use thunderboard::gatt::{self, Characteristic, Value};
use thunderboard::lifecycle::{Controller, Input as LifecycleInput};
use thunderboard::power::OneShotTimer;
use thunderboard::sensors::registry::Driver;
use thunderboard::sensors::Registry;

type App = Controller<'static, SdRadio, SdTimer, SystemOff, DkSupply>;

// ═══════════════════════════════════════════════════════════════════════════
// GATT Server
// ═══════════════════════════════════════════════════════════════════════════

#[nrf_softdevice::gatt_service(uuid = "180f")]
struct BatteryService {
    #[characteristic(uuid = "2a19", read)]
    battery_level: Value,
}

#[nrf_softdevice::gatt_service(uuid = "181a")]
struct EnvironmentService {
    #[characteristic(uuid = "2a6e", read)]
    temperature: Value,
    #[characteristic(uuid = "2a6f", read)]
    humidity: Value,
}

#[nrf_softdevice::gatt_service(uuid = "1815")]
struct AutomationIoService {
    #[characteristic(uuid = "2a56", read, notify)]
    digital_inputs: Value,
    #[characteristic(uuid = "fcb89c40-c603-59f3-7dc3-5ece444a401b", read, write)]
    rgb_leds: Value,
}

#[nrf_softdevice::gatt_server]
struct Server {
    bas: BatteryService,
    env: EnvironmentService,
    aio: AutomationIoService,
}

// ═══════════════════════════════════════════════════════════════════════════
// Platform Seams
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy)]
enum AdvCommand {
    Start,
    Stop,
}

#[derive(Clone, Copy)]
enum TimerCommand {
    Start(u32),
    Cancel,
}

static ADV_DATA: Mutex<CriticalSectionRawMutex, RefCell<Vec<u8, MAX_ADV_LEN>>> =
    Mutex::new(RefCell::new(Vec::new()));
static ADV_SIGNAL: Signal<CriticalSectionRawMutex, AdvCommand> = Signal::new();
static TIMER_SIGNAL: Signal<CriticalSectionRawMutex, TimerCommand> = Signal::new();
static INPUTS_CHANGED: Signal<CriticalSectionRawMutex, u8> = Signal::new();

/// Advertising control. The SoftDevice advertises from `bluetooth_task`;
/// this side only stores the payload and posts commands.
struct SdRadio;

impl RadioStack for SdRadio {
    fn set_advertising_data(&mut self, data: &[u8]) -> Result<(), StackError> {
        ADV_DATA.lock(|d| {
            let mut d = d.borrow_mut();
            d.clear();
            d.extend_from_slice(data)
                .map_err(|_| StackError { code: raw::NRF_ERROR_INVALID_LENGTH })
        })
    }

    fn start_advertising(&mut self) -> Result<(), StackError> {
        ADV_SIGNAL.signal(AdvCommand::Start);
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), StackError> {
        ADV_SIGNAL.signal(AdvCommand::Stop);
        Ok(())
    }
}

/// One-shot timer backed by `timer_task`.
struct SdTimer;

impl OneShotTimer for SdTimer {
    fn start(&mut self, timeout_ms: u32) -> Result<(), TimerError> {
        TIMER_SIGNAL.signal(TimerCommand::Start(timeout_ms));
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), TimerError> {
        TIMER_SIGNAL.signal(TimerCommand::Cancel);
        Ok(())
    }
}

fn dispatch(app: &RefCell<App>, input: LifecycleInput) {
    app.borrow_mut().handle(input);
}

// ═══════════════════════════════════════════════════════════════════════════
// Tasks
// ═══════════════════════════════════════════════════════════════════════════

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn timer_task(app: &'static RefCell<App>) -> ! {
    let mut next = TIMER_SIGNAL.wait().await;
    loop {
        next = match next {
            TimerCommand::Cancel => TIMER_SIGNAL.wait().await,
            TimerCommand::Start(ms) => {
                let expiry = Timer::after(Duration::from_millis(ms.into()));
                match select(expiry, TIMER_SIGNAL.wait()).await {
                    Either::First(()) => {
                        dispatch(app, LifecycleInput::ShutdownTimeout);
                        TIMER_SIGNAL.wait().await
                    }
                    Either::Second(cmd) => cmd,
                }
            }
        };
    }
}

#[embassy_executor::task]
async fn ticker_task(app: &'static RefCell<App>) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(config::ACTION_TICK_MS));
    loop {
        ticker.next().await;
        app.borrow_mut().process_action();
    }
}

#[embassy_executor::task]
async fn buttons_task(buttons: [Input<'static>; 4], app: &'static RefCell<App>) -> ! {
    board::button_task(buttons, || {
        if let Ok(inputs) = gatt::AttributeHooks::aio_button_changed(&mut app.borrow_mut().hooks()) {
            INPUTS_CHANGED.signal(inputs);
        }
    })
    .await
}

#[embassy_executor::task]
async fn bluetooth_task(sd: &'static Softdevice, server: &'static Server, app: &'static RefCell<App>) -> ! {
    loop {
        if let AdvCommand::Stop = ADV_SIGNAL.wait().await {
            continue;
        }

        let adv_data = ADV_DATA.lock(|d| d.borrow().clone());
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &adv_data,
            scan_data: &[],
        };
        let adv_config = peripheral::Config {
            interval: config::ADV_INTERVAL,
            ..Default::default()
        };

        let conn = match select(peripheral::advertise_connectable(sd, adv, &adv_config), ADV_SIGNAL.wait()).await {
            Either::First(Ok(conn)) => conn,
            Either::First(Err(e)) => {
                error!("Advertising failed: {:?}", e);
                Timer::after(Duration::from_secs(1)).await;
                ADV_SIGNAL.signal(AdvCommand::Start);
                continue;
            }
            // Stop (or a redundant Start): the advertise future is dropped.
            Either::Second(AdvCommand::Stop) => continue,
            Either::Second(AdvCommand::Start) => {
                ADV_SIGNAL.signal(AdvCommand::Start);
                continue;
            }
        };

        dispatch(app, StackEvent::ConnectionOpened.into());
        refresh_values(server, app);

        let reason = select3(
            gatt_server::run(&conn, server, |e| on_server_event(app, e)),
            refresh_loop(server, &conn, app),
            // Keep the advertising signal from piling up while connected.
            drain_adv_stop(),
        )
        .await;
        if let Either3::First(e) = reason {
            info!("Disconnected: {:?}", e);
        }

        dispatch(app, StackEvent::ConnectionClosed.into());
    }
}

async fn drain_adv_stop() -> ! {
    loop {
        if let AdvCommand::Start = ADV_SIGNAL.wait().await {
            warn!("Advertising start requested while connected");
        }
    }
}

fn on_server_event(app: &RefCell<App>, event: ServerEvent) {
    match event {
        ServerEvent::Aio(AutomationIoServiceEvent::RgbLedsWrite(value)) => {
            let mut app = app.borrow_mut();
            if let Err(e) = gatt::write_characteristic(&mut app.hooks(), Characteristic::RgbLeds, &value) {
                warn!("RGB write rejected: ATT 0x{:02x}", e.att_code());
            }
        }
        ServerEvent::Aio(AutomationIoServiceEvent::DigitalInputsCccdWrite { notifications }) => {
            info!("Digital inputs notifications: {}", notifications)
        }
        _ => {}
    }
}

/// Copies every readable characteristic from the hooks into the attribute
/// table. Failed reads keep the previous value.
fn refresh_values(server: &Server, app: &RefCell<App>) {
    let mut app = app.borrow_mut();
    let mut hooks = app.hooks();
    let mut read = |c| gatt::read_characteristic(&mut hooks, c);

    let results = [
        (Characteristic::BatteryLevel, read(Characteristic::BatteryLevel)),
        (Characteristic::Temperature, read(Characteristic::Temperature)),
        (Characteristic::Humidity, read(Characteristic::Humidity)),
        (Characteristic::DigitalInputs, read(Characteristic::DigitalInputs)),
    ];
    for (characteristic, result) in results {
        let Ok(value) = result else { continue };
        let set = match characteristic {
            Characteristic::BatteryLevel => server.bas.battery_level_set(&value),
            Characteristic::Temperature => server.env.temperature_set(&value),
            Characteristic::Humidity => server.env.humidity_set(&value),
            _ => server.aio.digital_inputs_set(&value),
        };
        if let Err(e) = set {
            warn!("Failed to update {}: {:?}", characteristic, e);
        }
    }
}

async fn refresh_loop(server: &Server, conn: &Connection, app: &RefCell<App>) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(config::GATT_REFRESH_MS));
    loop {
        match select(ticker.next(), INPUTS_CHANGED.wait()).await {
            Either::First(()) => refresh_values(server, app),
            Either::Second(inputs) => {
                let value: Value = unwrap!(Vec::from_slice(&[inputs]));
                if let Err(e) = server.aio.digital_inputs_notify(conn, &value) {
                    warn!("Digital inputs notify failed: {:?}", e);
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Boot
// ═══════════════════════════════════════════════════════════════════════════

fn boot_info(sd: &Softdevice) -> BootInfo {
    let mut version: raw::ble_version_t = unsafe { mem::zeroed() };
    let ret = unsafe { raw::sd_ble_version_get(&mut version) };
    if ret != raw::NRF_SUCCESS {
        warn!("sd_ble_version_get failed: {}", ret);
    }

    let address = nrf_softdevice::ble::get_address(sd);
    BootInfo {
        major: version.version_number.into(),
        minor: 0,
        patch: 0,
        build: version.subversion_number,
        // The SoftDevice does not expose a build hash.
        hash: 0,
        address: IdentityAddress(address.bytes()),
        address_kind: match address.address_type() {
            AddressType::Public => AddressKind::Public,
            _ => AddressKind::StaticRandom,
        },
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Thunderboard (nRF52840-DK) starting");

    // SoftDevice reserves priorities 0, 1 and 4.
    let mut ecfg = embassy_nrf::config::Config::default();
    ecfg.gpiote_interrupt_priority = Priority::P2;
    ecfg.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(ecfg);

    let sd_config = nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: b"Thunderboard" as *const u8 as _,
            current_len: 12,
            max_len: 12,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(raw::BLE_GATTS_VLOC_STACK as u8),
        }),
        ..Default::default()
    };

    let sd = Softdevice::enable(&sd_config);
    static SERVER: StaticCell<Server> = StaticCell::new();
    let server: &'static Server = SERVER.init(unwrap!(Server::new(sd)));
    let sd: &'static Softdevice = sd;
    unwrap!(spawner.spawn(softdevice_task(sd)));

    // Drivers
    static DIE_TEMP: StaticCell<DieTemperature> = StaticCell::new();
    static BUTTONS: StaticCell<DkButtons> = StaticCell::new();
    static LEDS: StaticCell<DkLeds<Output<'static>>> = StaticCell::new();

    let leds = LEDS.init(DkLeds::new([
        Output::new(p.P0_13, Level::High, OutputDrive::Standard),
        Output::new(p.P0_14, Level::High, OutputDrive::Standard),
        Output::new(p.P0_15, Level::High, OutputDrive::Standard),
        Output::new(p.P0_16, Level::High, OutputDrive::Standard),
    ]));
    let buttons = [
        Input::new(p.P0_11, Pull::Up),
        Input::new(p.P0_12, Pull::Up),
        Input::new(p.P0_24, Pull::Up),
        Input::new(p.P0_25, Pull::Up),
    ];

    let registry = Registry::builder()
        .with(Driver::Rht(DIE_TEMP.init(DieTemperature)))
        .with(Driver::Aio(BUTTONS.init(DkButtons::new())))
        .with_rgb(leds)
        .build();

    static APP: StaticCell<RefCell<App>> = StaticCell::new();
    let app: &'static RefCell<App> = APP.init(RefCell::new(Controller::new(
        SdRadio,
        SdTimer,
        registry,
        SystemOff,
        DkSupply,
    )));

    app.borrow_mut().startup();

    unwrap!(spawner.spawn(timer_task(app)));
    unwrap!(spawner.spawn(ticker_task(app)));
    unwrap!(spawner.spawn(buttons_task(buttons, app)));
    unwrap!(spawner.spawn(bluetooth_task(sd, server, app)));

    // The SoftDevice is up and has an identity address: report boot.
    dispatch(app, StackEvent::BootComplete(boot_info(sd)).into());
}
