//! Service event loop

use anyhow::{Context, Result};
use std::sync::Arc;
use tenure_api::{AppEvent, PowerEvent};
use tenure_core::{CoreEvent, RenewalEngine, TimerPurpose};
use tenure_host_api::{HostAdapter, HostEvent, StatusSink};
use tenure_util::{MonotonicInstant, WallTime};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::RenewalTimer;

/// Requests from outside the event loop (signals, tests)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Renew now
    ManualRenewal,
    /// Save state and leave the loop
    Shutdown,
}

enum Step {
    Control(Option<Control>),
    Timer(TimerPurpose),
    Host(Option<HostEvent>),
}

/// Owns the engine and the renewal timer; nothing else touches either.
pub struct Service {
    engine: RenewalEngine,
    host: Arc<dyn HostAdapter>,
    sink: Arc<dyn StatusSink>,
    timer: RenewalTimer,
}

impl Service {
    pub fn new(engine: RenewalEngine, host: Arc<dyn HostAdapter>, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            engine,
            host,
            sink,
            timer: RenewalTimer::new(),
        }
    }

    /// Run until a shutdown request, then save the session once more.
    pub async fn run(mut self, mut control: mpsc::UnboundedReceiver<Control>) -> Result<()> {
        let mut host_events = self
            .host
            .subscribe()
            .context("Failed to subscribe to host events")?;

        let events = self
            .engine
            .restore_from_store(MonotonicInstant::now(), WallTime::now());
        self.apply(events).await;
        self.sink
            .show_status(&self.engine.status(MonotonicInstant::now()));

        info!("Service running");

        loop {
            let step = tokio::select! {
                request = control.recv() => Step::Control(request),
                purpose = self.timer.fired() => Step::Timer(purpose),
                event = host_events.recv() => Step::Host(event),
            };

            let now_wall = WallTime::now();
            let events = match step {
                Step::Control(Some(Control::ManualRenewal)) => {
                    self.engine.on_manual_request(MonotonicInstant::now(), now_wall)
                }
                Step::Control(Some(Control::Shutdown)) => break,
                Step::Control(None) => {
                    debug!("Control channel closed");
                    break;
                }
                Step::Timer(purpose) => {
                    self.engine
                        .on_timer_fired(purpose, MonotonicInstant::now(), now_wall)
                }
                Step::Host(Some(event)) => self.handle_host_event(event, now_wall),
                Step::Host(None) => {
                    warn!("Host event stream closed");
                    break;
                }
            };

            self.apply(events).await;
        }

        info!("Shutting down renewal service");
        let events = self
            .engine
            .shutdown(MonotonicInstant::now(), WallTime::now());
        self.apply(events).await;

        Ok(())
    }

    fn handle_host_event(&mut self, event: HostEvent, now_wall: WallTime) -> Vec<CoreEvent> {
        debug!(?event, "Host event");
        match event {
            HostEvent::App(AppEvent::Started) => {
                self.engine.on_app_started(MonotonicInstant::now(), now_wall)
            }
            HostEvent::App(AppEvent::Stopped) => {
                self.engine.on_app_stopped(MonotonicInstant::now(), now_wall)
            }
            HostEvent::Power(PowerEvent::SleepBegan { at }) => self.engine.on_sleep(at, now_wall),
            HostEvent::Power(PowerEvent::WokeUp { at }) => self.engine.on_wake(at, now_wall),
        }
    }

    /// Carry out engine output. A requested toggle runs after the rest of
    /// its batch, and its result is fed straight back into the engine.
    async fn apply(&mut self, mut events: Vec<CoreEvent>) {
        loop {
            let mut toggle = None;

            for event in events.drain(..) {
                match event {
                    CoreEvent::ToggleRequested { trigger } => toggle = Some(trigger),
                    CoreEvent::TimerScheduled { purpose, delay } => self.timer.arm(purpose, delay),
                    CoreEvent::TimerCancelled => self.timer.cancel(),
                    CoreEvent::StatusChanged(status) => self.sink.show_status(&status),
                    CoreEvent::Notify(notification) => self.sink.notify(&notification),
                }
            }

            let Some(trigger) = toggle else {
                return;
            };

            let outcome = self.host.toggle().await;
            info!(%trigger, ?outcome, "Toggle finished");

            events = self
                .engine
                .on_toggle_result(outcome, MonotonicInstant::now(), WallTime::now());
        }
    }
}
