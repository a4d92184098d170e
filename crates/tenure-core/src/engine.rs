//! Renewal engine

use std::sync::Arc;
use std::time::Duration;
use tenure_api::{Notification, SessionStatus, StatusUpdate, ToggleOutcome, Trigger};
use tenure_config::{RenewalPolicy, RetryPolicy};
use tenure_store::{AuditEvent, AuditEventType, AuditLog, StateStore};
use tenure_util::{format_remaining, MonotonicInstant, SessionId, WallTime};
use tracing::{debug, error, info, warn};

use crate::{
    decode, is_restored_state_usable, is_short_sleep, refresh_delay_for_restored_state,
    sleep_duration, CoreEvent, DebounceContext, DecodedRecord, Phase, RefreshDelay, Rejection,
    SessionState, SleepInterval, TimerPurpose,
};

/// Owns the session and decides when the toggle action runs.
///
/// The engine never blocks and never reads a clock; every handler is given
/// the current monotonic and wall time and answers with a list of
/// [`CoreEvent`]s for the service to carry out.
pub struct RenewalEngine {
    policy: RenewalPolicy,
    retry: RetryPolicy,
    state_store: Arc<dyn StateStore>,
    audit: Arc<dyn AuditLog>,

    session: Option<SessionState>,
    phase: Phase,
    debounce: DebounceContext,
    sleep: SleepInterval,
    app_running: bool,

    /// Trigger behind the toggle currently in flight
    pending_trigger: Option<Trigger>,
    not_ready_attempts: u32,
    /// Last failure shown to the user, cleared on success
    last_failure: Option<String>,
}

impl RenewalEngine {
    pub fn new(
        policy: RenewalPolicy,
        retry: RetryPolicy,
        state_store: Arc<dyn StateStore>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        info!(
            session_secs = policy.session_duration.as_secs(),
            renew_before_secs = policy.renew_before_expiry.as_secs(),
            debounce_secs = policy.debounce_interval.as_secs(),
            "Renewal engine initialized"
        );

        Self {
            policy,
            retry,
            state_store,
            audit,
            session: None,
            phase: Phase::Inactive,
            debounce: DebounceContext::new(),
            sleep: SleepInterval::new(),
            app_running: false,
            pending_trigger: None,
            not_ready_attempts: 0,
            last_failure: None,
        }
    }

    pub fn policy(&self) -> &RenewalPolicy {
        &self.policy
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn is_app_running(&self) -> bool {
        self.app_running
    }

    /// Current status for presentation
    pub fn status(&self, now_mono: MonotonicInstant) -> StatusUpdate {
        let status = match self.phase {
            Phase::Inactive => SessionStatus::Inactive,
            Phase::AwaitingAction => SessionStatus::Enabling,
            Phase::Active => SessionStatus::Active,
            Phase::Stale if self.last_failure.is_some() => SessionStatus::Failed,
            Phase::Stale if self.not_ready_attempts > 0 => SessionStatus::Retrying,
            Phase::Stale => SessionStatus::Verifying,
        };

        let remaining = self
            .session
            .as_ref()
            .map(|s| format_remaining(Some(s.remaining(now_mono, self.policy.session_duration))));

        StatusUpdate::new(status, remaining)
    }

    /// Pick up a saved session at service start.
    ///
    /// A usable record becomes the in-memory session (unconfirmed) and a
    /// renewal is scheduled for it. Nothing is toggled here; the lifecycle
    /// watcher reports whether the application is running right after.
    pub fn restore_from_store(
        &mut self,
        now_mono: MonotonicInstant,
        now_wall: WallTime,
    ) -> Vec<CoreEvent> {
        let mut events = Vec::new();

        match self.decode_saved_record(now_wall) {
            Ok(decoded) if is_restored_state_usable(Some(decoded.elapsed), &self.policy) => {
                let delay = self.adopt_restored(decoded, now_mono);
                self.phase = Phase::Stale;
                events.push(CoreEvent::TimerScheduled {
                    purpose: TimerPurpose::Renewal,
                    delay,
                });
            }
            Ok(decoded) => {
                info!(
                    elapsed_secs = decoded.elapsed,
                    "Saved session is too close to expiry to trust, will re-verify"
                );
            }
            Err(Rejection::Missing) => {
                debug!("No saved session");
            }
            Err(rejection) => self.discard_record(&rejection),
        }

        self.finish(events, now_mono)
    }

    /// The external application was observed running
    pub fn on_app_started(
        &mut self,
        now_mono: MonotonicInstant,
        _now_wall: WallTime,
    ) -> Vec<CoreEvent> {
        if !self.app_running {
            info!("Application started");
        }
        self.app_running = true;
        let events = self.evaluate(Trigger::AppStarted, now_mono);
        self.finish(events, now_mono)
    }

    /// The external application went away: the session ends with it.
    pub fn on_app_stopped(
        &mut self,
        now_mono: MonotonicInstant,
        _now_wall: WallTime,
    ) -> Vec<CoreEvent> {
        let was_running = std::mem::replace(&mut self.app_running, false);
        if !was_running && self.session.is_none() && self.phase == Phase::Inactive {
            return Vec::new();
        }

        info!("Application stopped");

        self.clear_session("application stopped");
        if let Err(e) = self.state_store.clear_record() {
            warn!(error = %e, "Failed to remove saved session");
        }

        self.phase = Phase::Inactive;
        self.pending_trigger = None;
        self.not_ready_attempts = 0;
        self.last_failure = None;
        // A quick relaunch must be evaluated, not swallowed by the gate
        self.debounce.reset();

        self.finish(vec![CoreEvent::TimerCancelled], now_mono)
    }

    /// The renewal timer fired
    pub fn on_timer_fired(
        &mut self,
        purpose: TimerPurpose,
        now_mono: MonotonicInstant,
        _now_wall: WallTime,
    ) -> Vec<CoreEvent> {
        let trigger = purpose.trigger();
        debug!(%purpose, "Timer fired");

        if !self.app_running {
            debug!(%trigger, "Application not running, nothing to renew");
            return Vec::new();
        }
        if self.phase == Phase::AwaitingAction {
            debug!(%trigger, "Toggle already in flight");
            return Vec::new();
        }

        self.debounce.record(now_mono);
        let events = self.request_toggle(trigger);
        self.finish(events, now_mono)
    }

    /// The user asked for a renewal right now
    pub fn on_manual_request(
        &mut self,
        now_mono: MonotonicInstant,
        _now_wall: WallTime,
    ) -> Vec<CoreEvent> {
        info!("Manual renewal requested");
        let events = self.evaluate(Trigger::Manual, now_mono);
        self.finish(events, now_mono)
    }

    /// The system is going to sleep (or was last seen awake at `now_mono`)
    pub fn on_sleep(&mut self, now_mono: MonotonicInstant, now_wall: WallTime) -> Vec<CoreEvent> {
        info!(at = now_mono.as_secs(), "System sleep observed");
        self.sleep.begin(now_mono);
        self.save_session(now_wall);
        Vec::new()
    }

    /// The system woke up. The pending timer is stale and is replaced.
    pub fn on_wake(&mut self, now_mono: MonotonicInstant, now_wall: WallTime) -> Vec<CoreEvent> {
        let sleep_start = self.sleep.take_on_wake();
        let slept = sleep_duration(sleep_start, now_mono);
        let short = is_short_sleep(sleep_start, now_mono, self.policy.short_sleep_threshold);

        info!(slept_secs = ?slept, short, "System woke");
        let _ = self
            .audit
            .append_audit(AuditEvent::new(AuditEventType::SleepObserved {
                slept_secs: slept,
                short,
            }));

        if !self.app_running {
            return Vec::new();
        }
        if self.phase == Phase::AwaitingAction {
            debug!("Toggle in flight, wake handled by its result");
            return Vec::new();
        }
        if !self.debounce.admit(now_mono, self.policy.debounce_interval) {
            debug!(trigger = %Trigger::Wake, "Trigger debounced, replacing stale timer");
            let events = vec![CoreEvent::TimerCancelled, self.debounced_wake_timer(now_mono)];
            return self.finish(events, now_mono);
        }

        let mut events = vec![CoreEvent::TimerCancelled];

        let valid_in_memory = self
            .session
            .as_ref()
            .is_some_and(|s| s.is_valid(now_mono, self.policy.session_duration));
        if short && valid_in_memory {
            debug!("Short sleep, rescheduling from memory");
            events.extend(self.schedule_renewal(now_mono, Trigger::Wake));
            return self.finish(events, now_mono);
        }

        self.phase = Phase::Stale;
        events.extend(self.after_wake_policy(now_mono, now_wall));
        self.finish(events, now_mono)
    }

    /// Apply the outcome of a toggle the engine asked for
    pub fn on_toggle_result(
        &mut self,
        outcome: ToggleOutcome,
        now_mono: MonotonicInstant,
        now_wall: WallTime,
    ) -> Vec<CoreEvent> {
        let Some(trigger) = self.pending_trigger.take() else {
            warn!(?outcome, "Toggle result without a pending request, ignoring");
            return Vec::new();
        };

        if !self.app_running {
            debug!(?outcome, "Application stopped while toggling, ignoring result");
            return Vec::new();
        }

        let events = match outcome {
            ToggleOutcome::Enabled => self.on_toggle_success(trigger, false, now_mono, now_wall),
            ToggleOutcome::AlreadyEnabled => {
                self.on_toggle_success(trigger, true, now_mono, now_wall)
            }
            ToggleOutcome::NotReady => self.on_not_ready(trigger),
            ToggleOutcome::Failed { reason } => self.on_toggle_failure(trigger, reason),
        };

        self.finish(events, now_mono)
    }

    /// Stop scheduling and save the session one last time
    pub fn shutdown(&mut self, _now_mono: MonotonicInstant, now_wall: WallTime) -> Vec<CoreEvent> {
        info!(phase = %self.phase, "Renewal engine shutting down");
        self.save_session(now_wall);
        vec![CoreEvent::TimerCancelled]
    }

    /// Trigger evaluation shared by application start, manual request and
    /// wake.
    fn evaluate(&mut self, trigger: Trigger, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        if !self.app_running {
            debug!(%trigger, "Application not running, ignoring trigger");
            return Vec::new();
        }
        if self.phase == Phase::AwaitingAction {
            debug!(%trigger, "Toggle already in flight");
            return Vec::new();
        }
        if !self.debounce.admit(now_mono, self.policy.debounce_interval) {
            debug!(%trigger, "Trigger debounced");
            return Vec::new();
        }

        if trigger != Trigger::Manual {
            let refresh = self
                .session
                .as_ref()
                .map(|s| s.refresh_delay(now_mono, &self.policy));
            if let Some(RefreshDelay::After(delay)) = refresh {
                if !delay.is_zero() {
                    debug!(
                        %trigger,
                        renew_in_secs = delay.as_secs(),
                        "Session still valid, no toggle needed"
                    );
                    self.phase = Phase::Active;
                    return vec![CoreEvent::TimerScheduled {
                        purpose: TimerPurpose::Renewal,
                        delay,
                    }];
                }
            }
        }

        self.request_toggle(trigger)
    }

    fn request_toggle(&mut self, trigger: Trigger) -> Vec<CoreEvent> {
        info!(%trigger, "Requesting toggle");
        self.phase = Phase::AwaitingAction;
        self.pending_trigger = Some(trigger);
        vec![CoreEvent::ToggleRequested { trigger }]
    }

    /// Schedule the next renewal for the in-memory session, or toggle if it
    /// has already lapsed.
    fn schedule_renewal(&mut self, now_mono: MonotonicInstant, trigger: Trigger) -> Vec<CoreEvent> {
        let refresh = self
            .session
            .as_ref()
            .map(|s| s.refresh_delay(now_mono, &self.policy));

        match refresh {
            Some(RefreshDelay::After(delay)) => {
                self.phase = Phase::Active;
                vec![CoreEvent::TimerScheduled {
                    purpose: TimerPurpose::Renewal,
                    delay,
                }]
            }
            Some(RefreshDelay::Expired) | None => self.request_toggle(trigger),
        }
    }

    /// After a long or unobserved sleep, the saved record decides.
    fn after_wake_policy(&mut self, now_mono: MonotonicInstant, now_wall: WallTime) -> Vec<CoreEvent> {
        match self.decode_saved_record(now_wall) {
            Ok(decoded) if is_restored_state_usable(Some(decoded.elapsed), &self.policy) => {
                let delay = self.adopt_restored(decoded, now_mono);
                self.phase = Phase::Active;
                vec![CoreEvent::TimerScheduled {
                    purpose: TimerPurpose::Renewal,
                    delay,
                }]
            }
            Ok(decoded) => {
                info!(
                    elapsed_secs = decoded.elapsed,
                    "Saved session near expiry after wake, renewing"
                );
                self.request_toggle(Trigger::Wake)
            }
            Err(Rejection::Missing) => self.verify_from_memory(now_mono),
            Err(rejection) => {
                self.discard_record(&rejection);
                self.clear_session(&rejection.to_string());
                self.request_toggle(Trigger::Wake)
            }
        }
    }

    /// No record to consult after a wake: the in-memory session decides.
    /// Verification never waits past the session's own renewal point.
    fn verify_from_memory(&mut self, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        let refresh = self
            .session
            .as_ref()
            .map(|s| s.refresh_delay(now_mono, &self.policy));

        match refresh {
            Some(RefreshDelay::After(until_renewal)) if !until_renewal.is_zero() => {
                let delay = until_renewal.min(self.policy.wake_verification_delay);
                info!(
                    verify_in_secs = delay.as_secs(),
                    "No saved session after wake, scheduling verification"
                );
                vec![CoreEvent::TimerScheduled {
                    purpose: TimerPurpose::WakeVerification,
                    delay,
                }]
            }
            Some(RefreshDelay::After(_)) => {
                info!("No saved session after wake and renewal is due, renewing");
                self.request_toggle(Trigger::Wake)
            }
            Some(RefreshDelay::Expired) => {
                self.clear_session("expired during sleep");
                self.request_toggle(Trigger::Wake)
            }
            None => self.request_toggle(Trigger::Wake),
        }
    }

    /// Timer that replaces the pre-sleep one when the wake itself was
    /// debounced. A lapsed or missing session is looked at again once the
    /// debounce window has passed.
    fn debounced_wake_timer(&self, now_mono: MonotonicInstant) -> CoreEvent {
        let refresh = self
            .session
            .as_ref()
            .map(|s| s.refresh_delay(now_mono, &self.policy));

        match refresh {
            Some(RefreshDelay::After(delay)) => CoreEvent::TimerScheduled {
                purpose: TimerPurpose::Renewal,
                delay,
            },
            Some(RefreshDelay::Expired) | None => CoreEvent::TimerScheduled {
                purpose: TimerPurpose::WakeVerification,
                delay: self.policy.debounce_interval,
            },
        }
    }

    fn on_toggle_success(
        &mut self,
        trigger: Trigger,
        already_enabled: bool,
        now_mono: MonotonicInstant,
        now_wall: WallTime,
    ) -> Vec<CoreEvent> {
        let mut events = Vec::new();

        self.not_ready_attempts = 0;
        if self.last_failure.take().is_some() {
            events.push(CoreEvent::Notify(Notification::info(
                "Private mode restored",
                "The permission is active again.",
            )));
        }

        let renewed = self.session.is_some();
        let session_id = self
            .session
            .take()
            .map(|s| s.session_id)
            .unwrap_or_default();

        let audit_event = if renewed {
            AuditEventType::SessionRenewed {
                session_id: session_id.clone(),
                trigger,
            }
        } else {
            AuditEventType::SessionEnabled {
                session_id: session_id.clone(),
                trigger,
                already_enabled,
            }
        };
        let _ = self.audit.append_audit(AuditEvent::new(audit_event));

        info!(
            session_id = %session_id,
            %trigger,
            already_enabled,
            renewed,
            "Private mode asserted"
        );

        self.session = Some(SessionState::new(session_id, now_mono, now_wall));
        self.save_session(now_wall);

        events.extend(self.schedule_renewal(now_mono, trigger));
        events
    }

    fn on_not_ready(&mut self, trigger: Trigger) -> Vec<CoreEvent> {
        self.not_ready_attempts += 1;
        let attempt = self.not_ready_attempts;

        let _ = self
            .audit
            .append_audit(AuditEvent::new(AuditEventType::ToggleNotReady { trigger, attempt }));

        if attempt >= self.retry.max_not_ready_attempts {
            self.not_ready_attempts = 0;
            return self.on_toggle_failure(
                trigger,
                format!("application not ready after {} attempts", attempt),
            );
        }

        let delay = self.retry.not_ready_backoff;
        info!(
            %trigger,
            attempt,
            retry_in_secs = delay.as_secs(),
            "Application not ready, will retry"
        );

        self.phase = Phase::Stale;
        vec![CoreEvent::TimerScheduled {
            purpose: TimerPurpose::Retry,
            delay,
        }]
    }

    fn on_toggle_failure(&mut self, trigger: Trigger, reason: String) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        let delay = self.retry.failure_backoff;

        error!(%trigger, %reason, retry_in_secs = delay.as_secs(), "Toggle failed");
        let _ = self.audit.append_audit(AuditEvent::new(AuditEventType::ToggleFailed {
            trigger,
            reason: reason.clone(),
        }));

        if self.last_failure.as_deref() != Some(reason.as_str()) {
            events.push(CoreEvent::Notify(Notification::error(
                "Could not enable private mode",
                reason.clone(),
            )));
            self.last_failure = Some(reason);
        }

        self.phase = Phase::Stale;
        events.push(CoreEvent::TimerScheduled {
            purpose: TimerPurpose::Retry,
            delay,
        });
        events
    }

    fn decode_saved_record(&self, now_wall: WallTime) -> Result<DecodedRecord, Rejection> {
        let record = match self.state_store.load_record() {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to read saved session");
                None
            }
        };
        decode(record.as_ref(), now_wall, self.policy.session_duration)
    }

    /// Take over a validated record as the in-memory session and return
    /// the renewal delay for it.
    fn adopt_restored(&mut self, decoded: DecodedRecord, now_mono: MonotonicInstant) -> Duration {
        let session_id = self
            .session
            .take()
            .map(|s| s.session_id)
            .unwrap_or_else(SessionId::new);
        let delay = refresh_delay_for_restored_state(decoded.elapsed, &self.policy);

        info!(
            session_id = %session_id,
            started = %decoded.start_wall,
            elapsed_secs = decoded.elapsed,
            renew_in_secs = delay.as_secs(),
            "Restored saved session"
        );
        let _ = self
            .audit
            .append_audit(AuditEvent::new(AuditEventType::SessionRestored {
                session_id: session_id.clone(),
                elapsed_secs: decoded.elapsed,
            }));

        self.session = Some(SessionState::new(
            session_id,
            decoded.start_mono(now_mono),
            decoded.start_wall,
        ));
        delay
    }

    fn discard_record(&self, rejection: &Rejection) {
        match rejection {
            Rejection::Expired { .. } => info!(%rejection, "Discarding saved session"),
            _ => warn!(%rejection, "Discarding saved session"),
        }

        let _ = self
            .audit
            .append_audit(AuditEvent::new(AuditEventType::RecordRejected {
                reason: rejection.to_string(),
            }));

        if let Err(e) = self.state_store.clear_record() {
            warn!(error = %e, "Failed to remove rejected session record");
        }
    }

    fn clear_session(&mut self, reason: &str) {
        if let Some(session) = self.session.take() {
            info!(session_id = %session.session_id, reason, "Session cleared");
            let _ = self
                .audit
                .append_audit(AuditEvent::new(AuditEventType::SessionCleared {
                    session_id: session.session_id,
                    reason: reason.to_string(),
                }));
        }
    }

    /// Persist the in-memory session. Failures are logged; memory stays
    /// authoritative.
    fn save_session(&self, now_wall: WallTime) {
        let Some(record) = self.session.as_ref().and_then(|s| s.to_record(now_wall)) else {
            return;
        };
        if let Err(e) = self.state_store.save_record(&record) {
            warn!(error = %e, "Failed to persist session state");
        }
    }

    /// Append the resulting status to a non-empty event list
    fn finish(&self, mut events: Vec<CoreEvent>, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        if !events.is_empty() {
            events.push(CoreEvent::StatusChanged(self.status(now_mono)));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenure_api::PersistedRecord;
    use tenure_store::{MemoryAuditLog, MemoryStateStore};

    const W: i64 = 1_700_000_000;

    fn mono(secs: i64) -> MonotonicInstant {
        MonotonicInstant::from_secs(secs)
    }

    fn wall(secs: i64) -> WallTime {
        WallTime::from_epoch_secs(secs)
    }

    fn make_engine(store: Arc<MemoryStateStore>) -> (RenewalEngine, Arc<MemoryAuditLog>) {
        let audit = Arc::new(MemoryAuditLog::new());
        let engine = RenewalEngine::new(
            RenewalPolicy::default(),
            RetryPolicy::default(),
            store,
            audit.clone(),
        );
        (engine, audit)
    }

    fn toggles(events: &[CoreEvent]) -> Vec<Trigger> {
        events
            .iter()
            .filter_map(|e| match e {
                CoreEvent::ToggleRequested { trigger } => Some(*trigger),
                _ => None,
            })
            .collect()
    }

    fn timer(events: &[CoreEvent]) -> Option<(TimerPurpose, Duration)> {
        events.iter().find_map(|e| match e {
            CoreEvent::TimerScheduled { purpose, delay } => Some((*purpose, *delay)),
            _ => None,
        })
    }

    fn notifications(events: &[CoreEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, CoreEvent::Notify(_)))
            .count()
    }

    /// App starts at mono 1000 / wall W and the toggle succeeds
    fn enabled_engine(store: Arc<MemoryStateStore>) -> RenewalEngine {
        let (mut engine, _) = make_engine(store);
        let events = engine.on_app_started(mono(1000), wall(W));
        assert_eq!(toggles(&events), vec![Trigger::AppStarted]);
        engine.on_toggle_result(ToggleOutcome::Enabled, mono(1001), wall(W + 1));
        engine
    }

    #[test]
    fn test_app_start_without_session_toggles() {
        let store = Arc::new(MemoryStateStore::new());
        let (mut engine, _) = make_engine(store.clone());

        let events = engine.on_app_started(mono(1000), wall(W));
        assert_eq!(toggles(&events), vec![Trigger::AppStarted]);
        assert_eq!(engine.phase(), Phase::AwaitingAction);
        assert!(matches!(
            events.last(),
            Some(CoreEvent::StatusChanged(StatusUpdate {
                status: SessionStatus::Enabling,
                ..
            }))
        ));

        let events = engine.on_toggle_result(ToggleOutcome::Enabled, mono(1000), wall(W));
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::Renewal, Duration::from_secs(19800)))
        );
        assert_eq!(engine.phase(), Phase::Active);

        let record = store.snapshot().unwrap();
        assert_eq!(record.start_wall_clock, Some(wall(W)));
    }

    #[test]
    fn test_restored_usable_record_schedules_without_toggle() {
        let store = Arc::new(MemoryStateStore::with_record(PersistedRecord::new(
            wall(W),
            wall(W),
        )));
        let (mut engine, _) = make_engine(store.clone());

        let events = engine.restore_from_store(mono(5000), wall(W + 3600));
        assert!(toggles(&events).is_empty());
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::Renewal, Duration::from_secs(16200)))
        );
        assert_eq!(engine.phase(), Phase::Stale);
        assert_eq!(engine.session().unwrap().start_mono, mono(1400));

        // Application reported running: still nothing to toggle
        let events = engine.on_app_started(mono(5010), wall(W + 3610));
        assert!(toggles(&events).is_empty());
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::Renewal, Duration::from_secs(16190)))
        );
        assert_eq!(engine.phase(), Phase::Active);
        assert!(store.snapshot().is_some());
    }

    #[test]
    fn test_restored_expired_record_is_deleted() {
        let store = Arc::new(MemoryStateStore::with_record(PersistedRecord::new(
            wall(W),
            wall(W),
        )));
        let (mut engine, audit) = make_engine(store.clone());

        let events = engine.restore_from_store(mono(5000), wall(W + 25200));
        assert!(events.is_empty());
        assert!(engine.session().is_none());
        assert!(store.snapshot().is_none());

        let audits = audit.get_recent_audits(10).unwrap();
        assert!(matches!(
            audits[0].event,
            AuditEventType::RecordRejected { .. }
        ));
    }

    #[test]
    fn test_restored_record_from_the_future_is_deleted() {
        let store = Arc::new(MemoryStateStore::with_record(PersistedRecord::new(
            wall(W + 600),
            wall(W + 600),
        )));
        let (mut engine, _) = make_engine(store.clone());

        engine.restore_from_store(mono(5000), wall(W));
        assert!(engine.session().is_none());
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_restored_record_near_expiry_toggles_on_start() {
        let store = Arc::new(MemoryStateStore::with_record(PersistedRecord::new(
            wall(W),
            wall(W),
        )));
        let (mut engine, _) = make_engine(store.clone());

        let events = engine.restore_from_store(mono(5000), wall(W + 20700));
        assert!(events.is_empty());
        // Kept on disk; not expired
        assert!(store.snapshot().is_some());

        let events = engine.on_app_started(mono(5001), wall(W + 20701));
        assert_eq!(toggles(&events), vec![Trigger::AppStarted]);
    }

    #[test]
    fn test_debounced_trigger_produces_no_events() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store);

        let events = engine.on_manual_request(mono(1003), wall(W + 3));
        assert!(events.is_empty());

        // At the boundary the trigger goes through
        let events = engine.on_manual_request(mono(1005), wall(W + 5));
        assert_eq!(toggles(&events), vec![Trigger::Manual]);
    }

    #[test]
    fn test_manual_request_forces_toggle_with_valid_session() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store);
        let first_id = engine.session().unwrap().session_id.clone();

        let events = engine.on_manual_request(mono(2000), wall(W + 1000));
        assert_eq!(toggles(&events), vec![Trigger::Manual]);

        let events = engine.on_toggle_result(ToggleOutcome::AlreadyEnabled, mono(2000), wall(W + 1000));
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::Renewal, Duration::from_secs(19800)))
        );

        let session = engine.session().unwrap();
        assert_eq!(session.session_id, first_id);
        assert_eq!(session.start_mono, mono(2000));
        assert_eq!(session.start_wall, wall(W + 1000));
    }

    #[test]
    fn test_app_start_with_valid_session_only_reschedules() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store);

        // Duplicate start report from the watcher
        let events = engine.on_app_started(mono(1100), wall(W + 100));
        assert!(toggles(&events).is_empty());
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::Renewal, Duration::from_secs(19701)))
        );
    }

    #[test]
    fn test_renewal_timer_toggles_without_debounce() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store);

        let events = engine.on_timer_fired(TimerPurpose::Renewal, mono(1002), wall(W + 2));
        assert_eq!(toggles(&events), vec![Trigger::RenewalDue]);
    }

    #[test]
    fn test_timer_ignored_when_app_not_running() {
        let store = Arc::new(MemoryStateStore::new());
        let (mut engine, _) = make_engine(store);

        let events = engine.on_timer_fired(TimerPurpose::Renewal, mono(1000), wall(W));
        assert!(events.is_empty());
    }

    #[test]
    fn test_app_stop_clears_state_file() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store.clone());
        assert!(store.snapshot().is_some());

        let events = engine.on_app_stopped(mono(1500), wall(W + 500));
        assert!(events.contains(&CoreEvent::TimerCancelled));
        assert!(events.contains(&CoreEvent::StatusChanged(StatusUpdate::inactive())));
        assert!(store.snapshot().is_none());
        assert!(engine.session().is_none());
        assert_eq!(engine.phase(), Phase::Inactive);

        // Quick relaunch is not debounced
        let events = engine.on_app_started(mono(1501), wall(W + 501));
        assert_eq!(toggles(&events), vec![Trigger::AppStarted]);
    }

    #[test]
    fn test_repeated_identical_failures_notify_once() {
        let store = Arc::new(MemoryStateStore::new());
        let (mut engine, _) = make_engine(store);

        engine.on_app_started(mono(1000), wall(W));
        let events = engine.on_toggle_result(ToggleOutcome::failed("no window"), mono(1000), wall(W));
        assert_eq!(notifications(&events), 1);
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::Retry, Duration::from_secs(300)))
        );
        assert_eq!(engine.status(mono(1000)).status, SessionStatus::Failed);

        engine.on_timer_fired(TimerPurpose::Retry, mono(1300), wall(W + 300));
        let events = engine.on_toggle_result(ToggleOutcome::failed("no window"), mono(1300), wall(W + 300));
        assert_eq!(notifications(&events), 0);

        engine.on_timer_fired(TimerPurpose::Retry, mono(1600), wall(W + 600));
        let events = engine.on_toggle_result(ToggleOutcome::failed("denied"), mono(1600), wall(W + 600));
        assert_eq!(notifications(&events), 1);

        // Recovery is announced
        engine.on_timer_fired(TimerPurpose::Retry, mono(1900), wall(W + 900));
        let events = engine.on_toggle_result(ToggleOutcome::Enabled, mono(1900), wall(W + 900));
        assert_eq!(notifications(&events), 1);
        assert_eq!(engine.status(mono(1900)).status, SessionStatus::Active);
    }

    #[test]
    fn test_not_ready_retries_then_fails() {
        let store = Arc::new(MemoryStateStore::new());
        let (mut engine, _) = make_engine(store);

        engine.on_app_started(mono(1000), wall(W));
        let mut now = 1000;
        for attempt in 1..6 {
            let events = engine.on_toggle_result(ToggleOutcome::NotReady, mono(now), wall(W));
            assert_eq!(
                timer(&events),
                Some((TimerPurpose::Retry, Duration::from_secs(10))),
                "attempt {}",
                attempt
            );
            assert_eq!(notifications(&events), 0);
            assert_eq!(engine.status(mono(now)).status, SessionStatus::Retrying);

            now += 10;
            engine.on_timer_fired(TimerPurpose::Retry, mono(now), wall(W));
        }

        let events = engine.on_toggle_result(ToggleOutcome::NotReady, mono(now), wall(W));
        assert_eq!(notifications(&events), 1);
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::Retry, Duration::from_secs(300)))
        );
    }

    #[test]
    fn test_persistence_failure_is_not_fatal() {
        let store = Arc::new(MemoryStateStore::new());
        store.set_fail_writes(true);
        let (mut engine, _) = make_engine(store.clone());

        engine.on_app_started(mono(1000), wall(W));
        let events = engine.on_toggle_result(ToggleOutcome::Enabled, mono(1000), wall(W));
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::Renewal, Duration::from_secs(19800)))
        );
        assert!(engine.session().is_some());
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_short_sleep_reschedules_from_memory() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store);

        engine.on_sleep(mono(2000), wall(W + 1000));
        let events = engine.on_wake(mono(2060), wall(W + 1060));

        assert_eq!(events.first(), Some(&CoreEvent::TimerCancelled));
        assert!(toggles(&events).is_empty());
        // 21600 - 1059 remaining, minus the lead
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::Renewal, Duration::from_secs(18741)))
        );
    }

    #[test]
    fn test_long_sleep_restores_from_record() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store.clone());
        let id = engine.session().unwrap().session_id.clone();

        engine.on_sleep(mono(2000), wall(W + 1000));
        assert_eq!(
            store.snapshot().unwrap().saved_at_wall_clock,
            Some(wall(W + 1000))
        );

        let events = engine.on_wake(mono(9201), wall(W + 8201));
        assert!(toggles(&events).is_empty());
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::Renewal, Duration::from_secs(11600)))
        );
        assert_eq!(engine.phase(), Phase::Active);
        assert_eq!(engine.status(mono(9201)).status, SessionStatus::Active);

        let session = engine.session().unwrap();
        assert_eq!(session.session_id, id);
        assert_eq!(session.start_mono, mono(1001));
    }

    #[test]
    fn test_long_sleep_without_record_schedules_verification() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store.clone());

        store.clear_record().unwrap();
        store.set_fail_writes(true);

        engine.on_sleep(mono(2000), wall(W + 1000));
        let events = engine.on_wake(mono(9200), wall(W + 8200));

        assert!(toggles(&events).is_empty());
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::WakeVerification, Duration::from_secs(1800)))
        );

        let events = engine.on_timer_fired(TimerPurpose::WakeVerification, mono(11000), wall(W + 10000));
        assert_eq!(toggles(&events), vec![Trigger::WakeVerification]);
    }

    #[test]
    fn test_wake_with_expired_record_toggles() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store.clone());

        engine.on_sleep(mono(2000), wall(W + 1000));
        let events = engine.on_wake(mono(32000), wall(W + 31000));

        assert_eq!(events.first(), Some(&CoreEvent::TimerCancelled));
        assert_eq!(toggles(&events), vec![Trigger::Wake]);
        assert!(engine.session().is_none());
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_restored_session_cleared_when_app_absent_at_start() {
        let store = Arc::new(MemoryStateStore::with_record(PersistedRecord::new(
            wall(W),
            wall(W),
        )));
        let (mut engine, _) = make_engine(store.clone());

        engine.restore_from_store(mono(5000), wall(W + 3600));
        assert!(engine.session().is_some());

        // First process scan finds nothing running
        let events = engine.on_app_stopped(mono(5001), wall(W + 3601));
        assert!(events.contains(&CoreEvent::TimerCancelled));
        assert!(engine.session().is_none());
        assert!(store.snapshot().is_none());
        assert_eq!(engine.phase(), Phase::Inactive);

        let events = engine.on_app_started(mono(6000), wall(W + 4600));
        assert_eq!(toggles(&events), vec![Trigger::AppStarted]);
    }

    #[test]
    fn test_wake_with_lapsed_session_and_no_record_toggles() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store.clone());

        store.clear_record().unwrap();
        store.set_fail_writes(true);

        engine.on_sleep(mono(2000), wall(W + 1000));
        let events = engine.on_wake(mono(40000), wall(W + 39000));

        assert_eq!(events.first(), Some(&CoreEvent::TimerCancelled));
        assert_eq!(toggles(&events), vec![Trigger::Wake]);
        assert_eq!(timer(&events), None);
        assert!(engine.session().is_none());
    }

    #[test]
    fn test_wake_inside_lead_window_without_record_renews() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store.clone());
        let id = engine.session().unwrap().session_id.clone();

        store.clear_record().unwrap();
        store.set_fail_writes(true);

        engine.on_sleep(mono(2000), wall(W + 1000));
        // 1600s left, inside the 1800s lead
        let events = engine.on_wake(mono(21001), wall(W + 20000));

        assert_eq!(toggles(&events), vec![Trigger::Wake]);
        assert_eq!(engine.session().unwrap().session_id, id);
    }

    #[test]
    fn test_wake_verification_never_passes_renewal_point() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store.clone());

        store.clear_record().unwrap();
        store.set_fail_writes(true);

        engine.on_sleep(mono(2000), wall(W + 1000));
        // 2600s left: renewal due in 800s, sooner than the 1800s verification
        let events = engine.on_wake(mono(20001), wall(W + 19000));

        assert!(toggles(&events).is_empty());
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::WakeVerification, Duration::from_secs(800)))
        );
    }

    #[test]
    fn test_debounced_wake_replaces_timer_from_memory() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store);

        engine.on_sleep(mono(1001), wall(W + 1));
        let events = engine.on_wake(mono(1003), wall(W + 3));

        assert_eq!(events.first(), Some(&CoreEvent::TimerCancelled));
        assert!(toggles(&events).is_empty());
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::Renewal, Duration::from_secs(19798)))
        );
    }

    #[test]
    fn test_debounced_wake_without_session_rechecks_after_window() {
        let store = Arc::new(MemoryStateStore::new());
        let (mut engine, _) = make_engine(store);

        engine.on_app_started(mono(1000), wall(W));
        engine.on_toggle_result(ToggleOutcome::NotReady, mono(1001), wall(W + 1));

        engine.on_sleep(mono(1002), wall(W + 2));
        let events = engine.on_wake(mono(1003), wall(W + 3));

        assert_eq!(events.first(), Some(&CoreEvent::TimerCancelled));
        assert_eq!(
            timer(&events),
            Some((TimerPurpose::WakeVerification, Duration::from_secs(5)))
        );

        let events = engine.on_timer_fired(TimerPurpose::WakeVerification, mono(1008), wall(W + 8));
        assert_eq!(toggles(&events), vec![Trigger::WakeVerification]);
    }

    #[test]
    fn test_wake_without_app_does_nothing() {
        let store = Arc::new(MemoryStateStore::new());
        let (mut engine, _) = make_engine(store);

        engine.on_sleep(mono(2000), wall(W));
        assert!(engine.on_wake(mono(9000), wall(W + 7000)).is_empty());
    }

    #[test]
    fn test_shutdown_saves_session() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = enabled_engine(store.clone());

        let events = engine.shutdown(mono(3000), wall(W + 2000));
        assert_eq!(events, vec![CoreEvent::TimerCancelled]);

        let record = store.snapshot().unwrap();
        assert_eq!(record.start_wall_clock, Some(wall(W + 1)));
        assert_eq!(record.saved_at_wall_clock, Some(wall(W + 2000)));
    }

    #[test]
    fn test_status_remaining() {
        let store = Arc::new(MemoryStateStore::new());
        let engine = enabled_engine(store);

        let status = engine.status(mono(1001 + 12600));
        assert_eq!(status.status, SessionStatus::Active);
        assert_eq!(status.remaining.as_deref(), Some("2h 30m"));
    }
}
