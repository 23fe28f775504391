//! Connection-driven lifecycle.
//!
//! The state machine is split in two:
//!
//! - [`transition`] is pure: `(state, input) -> (next state, actions)`. The
//!   action list fixes the order of side effects for every edge.
//! - [`Controller`] owns the collaborators (advertiser, shutdown timer,
//!   registry, deep-sleep primitive, supply probe) and executes the actions
//!   in order.
//!
//! ```text
//!             BootComplete                 ConnectionOpened
//!   Booting ──────────────▶ Advertising ──────────────────▶ Connected
//!      │                     │     ▲                           │
//!      │ timeout             │     └───── ConnectionClosed ────┘
//!      ▼                     │ timeout
//!   Shutdown ◀───────────────┘
//! ```
//!
//! Inputs that have no edge out of the current state are ignored.

#[cfg(test)]
mod tests;

use heapless::Vec;

use crate::ble::{Advertiser, BootInfo, RadioStack, StackEvent};
use crate::config;
use crate::gatt::format::Hex32;
use crate::gatt::SensorAdapter;
use crate::power::{DeepSleep, OneShotTimer, PowerSupply, ShutdownTimer};
use crate::sensors::Registry;

/// Upper bound on the side effects of a single transition.
pub const MAX_ACTIONS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LifecycleState {
    /// Stack has not reported boot yet.
    Booting,
    /// Advertising, no peer. The shutdown timer may be armed.
    Advertising,
    /// One peer connected; sensors initialised, shutdown timer idle.
    Connected,
    /// EM4 entered. Terminal.
    Shutdown,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Booting => "booting",
            LifecycleState::Advertising => "advertising",
            LifecycleState::Connected => "connected",
            LifecycleState::Shutdown => "shutdown",
        }
    }
}

/// Everything the controller reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Input {
    Stack(StackEvent),
    /// The one-shot shutdown timer fired.
    ShutdownTimeout,
}

impl From<StackEvent> for Input {
    fn from(event: StackEvent) -> Self {
        Input::Stack(event)
    }
}

/// Side effect requested by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    LogBoot(BootInfo),
    /// Install the payload for this 24-bit id and start advertising.
    InitializeAdvertiser(u32),
    StartAdvertising,
    StopAdvertising,
    ArmShutdownTimer,
    DisarmShutdownTimer,
    InitSensors,
    DeinitSensors,
    EnterEm4,
}

pub type Actions = Vec<Action, MAX_ACTIONS>;

fn actions(list: &[Action]) -> Actions {
    // Every edge below lists at most MAX_ACTIONS actions.
    Vec::from_slice(list).unwrap_or_default()
}

/// Computes the next state and the ordered side effects for `input`.
pub fn transition(state: LifecycleState, input: Input) -> (LifecycleState, Actions) {
    use Action::*;
    use LifecycleState::*;

    match (state, input) {
        (Booting, Input::Stack(StackEvent::BootComplete(info))) => (
            Advertising,
            actions(&[
                LogBoot(info),
                InitializeAdvertiser(info.address.unique_id()),
                ArmShutdownTimer,
            ]),
        ),
        // Disarm before init so a slow init cannot race the timeout.
        (Advertising, Input::Stack(StackEvent::ConnectionOpened)) => (
            Connected,
            actions(&[StopAdvertising, DisarmShutdownTimer, InitSensors]),
        ),
        // Arm before deinit so a reconnect cannot race a lingering sensor.
        (Connected, Input::Stack(StackEvent::ConnectionClosed)) => (
            Advertising,
            actions(&[ArmShutdownTimer, DeinitSensors, StartAdvertising]),
        ),
        (Booting | Advertising, Input::ShutdownTimeout) => {
            (Shutdown, actions(&[StopAdvertising, EnterEm4]))
        }
        (state, _) => (state, Actions::new()),
    }
}

/// Executes [`transition`] against the real collaborators.
pub struct Controller<'d, R, T, S, P>
where
    R: RadioStack,
    T: OneShotTimer,
    S: DeepSleep,
    P: PowerSupply,
{
    state: LifecycleState,
    advertiser: Advertiser<R>,
    shutdown: ShutdownTimer<T>,
    registry: Registry<'d>,
    sleep: S,
    supply: P,
}

impl<'d, R, T, S, P> Controller<'d, R, T, S, P>
where
    R: RadioStack,
    T: OneShotTimer,
    S: DeepSleep,
    P: PowerSupply,
{
    pub fn new(radio: R, timer: T, registry: Registry<'d>, sleep: S, supply: P) -> Self {
        Self {
            state: LifecycleState::Booting,
            advertiser: Advertiser::new(radio),
            shutdown: ShutdownTimer::new(timer),
            registry,
            sleep,
            supply,
        }
    }

    /// Power-on hook, called once before the stack delivers any event.
    pub fn startup(&mut self) {
        info!(
            "Thunderboard starting, {} sensors registered",
            self.registry.len()
        );
        if config::ARM_SHUTDOWN_BEFORE_BOOT {
            self.shutdown.maybe_arm(&self.supply);
        }
    }

    /// Feeds one input through the state machine.
    pub fn handle(&mut self, input: Input) {
        self.shutdown.recheck(&self.supply);
        // A late expiry after disarm (or on external power) is stale.
        if input == Input::ShutdownTimeout && !self.shutdown.is_armed() {
            trace!("Ignored stale shutdown timeout");
            return;
        }
        let (next, actions) = transition(self.state, input);
        if actions.is_empty() && next == self.state {
            trace!("Ignored input in state {}", self.state.as_str());
            return;
        }
        if input == Input::ShutdownTimeout {
            self.shutdown.expired();
        }
        info!("Lifecycle: {} -> {}", self.state.as_str(), next.as_str());
        self.state = next;
        for action in actions {
            self.execute(action);
        }
    }

    /// Main-loop tick: gives every initialised sensor one bounded step.
    pub fn process_action(&mut self) {
        self.shutdown.recheck(&self.supply);
        self.registry.step_all();
    }

    /// Hook table for the attribute server.
    pub fn hooks(&mut self) -> SensorAdapter<'_, 'd, P> {
        SensorAdapter::new(&mut self.registry, &mut self.supply)
    }

    fn execute(&mut self, action: Action) {
        match action {
            Action::LogBoot(info) => log_boot(&info),
            Action::InitializeAdvertiser(unique_id) => self.advertiser.initialize(unique_id),
            Action::StartAdvertising => self.advertiser.start(),
            Action::StopAdvertising => self.advertiser.stop(),
            Action::ArmShutdownTimer => self.shutdown.maybe_arm(&self.supply),
            Action::DisarmShutdownTimer => self.shutdown.disarm(),
            Action::InitSensors => self.registry.init_all(),
            Action::DeinitSensors => self.registry.deinit_all(),
            Action::EnterEm4 => {
                info!("No connection, entering EM4");
                self.sleep.enter_em4();
            }
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn advertiser(&self) -> &Advertiser<R> {
        &self.advertiser
    }

    pub fn shutdown_timer(&self) -> &ShutdownTimer<T> {
        &self.shutdown
    }

    pub fn registry(&self) -> &Registry<'d> {
        &self.registry
    }

    pub fn sleep(&self) -> &S {
        &self.sleep
    }

    pub fn supply(&self) -> &P {
        &self.supply
    }

    pub fn supply_mut(&mut self) -> &mut P {
        &mut self.supply
    }
}

fn log_boot(info: &BootInfo) {
    info!(
        "Stack version: {}.{}.{}-{}",
        info.major, info.minor, info.patch, info.build
    );
    info!("Build hash: {}", Hex32(info.hash));
    info!(
        "Bluetooth {} address: {}",
        info.address_kind.as_str(),
        info.address
    );
}
