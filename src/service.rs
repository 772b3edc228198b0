//! Offline Service
//!
//! Composes the connectivity monitor, durable cache, pending action queue
//! and resilience policies into the one object front-ends talk to.
//! Constructed explicitly at startup and shared by `Arc`.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, DurableCache};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::connectivity::{
    ConnectivityMonitor, ConnectivityState, LinkTypeStrategy, NetworkQuality, QualityStrategy,
    Transition,
};
use crate::error::{OfflineError, Result};
use crate::queue::{
    drain_queue, ActionIntent, ActionType, Dispatcher, DrainReport, PendingAction, PendingQueue,
};
use crate::resilience::{
    alternatives_cache_key, builtin_alternatives, initiate_voice_booking, redirect_message,
    retry_with_backoff, select_alternative, Alternative, Delivery, DoctorProfile, InAppChannel,
    NotificationChannel, Notifier, RetryPolicy, SimulatedSmsGateway, SpeechRecognizer,
    VoiceBooking, DEFAULT_VOICE_LANGUAGE, DOCTORS_CACHE_KEY,
};
use crate::storage::Storage;

/// Result of redirecting a patient away from an unavailable doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    pub new_doctor_id: String,
    pub action_id: String,
    pub delivery: Delivery,
}

// == Offline Service ==
pub struct OfflineService {
    cache: RwLock<DurableCache>,
    queue: Mutex<PendingQueue>,
    monitor: Arc<ConnectivityMonitor>,
    dispatcher: Dispatcher,
    notifier: Notifier,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    retry: RetryPolicy,
    action_timeout: Duration,
    helpline: String,
    /// Serialises drains
    drain_lock: Mutex<()>,
    /// Generation and token of the most recently started drain
    active_drain: StdMutex<Option<(u64, CancellationToken)>>,
    drain_seq: AtomicU64,
    shutdown: CancellationToken,
}

impl OfflineService {
    pub fn builder(storage: Arc<dyn Storage>) -> OfflineServiceBuilder {
        OfflineServiceBuilder::new(storage)
    }

    // == Durable Cache ==
    /// Caches `payload` under `key`. An `Err` means the value is served for
    /// this process only and will not survive a restart.
    pub async fn cache_data<T: Serialize + ?Sized>(&self, key: &str, payload: &T) -> Result<()> {
        self.cache.write().await.cache_data(key, payload)
    }

    /// Cached value for `key`, or `None` if missing, unreadable or older
    /// than the TTL.
    pub async fn get_cached_data<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        // Write lock: reads update stats and may load from storage
        self.cache.write().await.get_cached_data(key)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.read().await.stats()
    }

    pub async fn purge_expired_cache(&self) -> usize {
        self.cache.write().await.purge_expired()
    }

    // == Pending Action Queue ==
    /// Accepts an intent for later execution. Returns as soon as the action
    /// is queued; execution happens on a later drain.
    ///
    /// `OfflineError::NotDurable` means the action is queued for this
    /// process but may be lost on restart.
    pub async fn queue_action(&self, intent: ActionIntent) -> Result<PendingAction> {
        self.queue.lock().await.enqueue(intent)
    }

    pub async fn pending_actions(&self) -> Vec<PendingAction> {
        self.queue.lock().await.pending()
    }

    pub async fn dead_letters(&self) -> Vec<PendingAction> {
        self.queue.lock().await.dead_letters().to_vec()
    }

    pub async fn pending_count(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Drains the queue if online.
    ///
    /// Starting a drain cancels the previous one; that drain hands its
    /// unattempted actions back before this one takes its snapshot, so
    /// drains never overlap.
    pub async fn sync_pending(&self) -> DrainReport {
        let token = self.shutdown.child_token();
        let generation = self.drain_seq.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut active) = self.active_drain.lock() {
            if let Some((_, previous)) = active.replace((generation, token.clone())) {
                previous.cancel();
            }
        }

        let _running = self.drain_lock.lock().await;
        if token.is_cancelled() || !self.is_connected() {
            debug!("Skipping drain (cancelled or offline)");
            return DrainReport::default();
        }

        let report = drain_queue(&self.queue, &self.dispatcher, self.action_timeout, &token).await;

        if let Ok(mut active) = self.active_drain.lock() {
            if active.as_ref().is_some_and(|(g, _)| *g == generation) {
                *active = None;
            }
        }
        report
    }

    /// Cancels the drain in progress, if any.
    pub fn cancel_sync(&self) {
        if let Ok(mut active) = self.active_drain.lock() {
            if let Some((_, token)) = active.take() {
                token.cancel();
            }
        }
    }

    // == Connectivity ==
    pub fn is_connected(&self) -> bool {
        self.monitor.is_connected()
    }

    pub fn network_quality(&self) -> NetworkQuality {
        self.monitor.network_quality()
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.monitor.state()
    }

    /// Host online/offline signal. Going offline cancels a running drain;
    /// coming online is picked up by the sync task.
    pub fn set_online(&self, online: bool) -> Transition {
        let transition = self.monitor.set_online(online);
        if transition == Transition::WentOffline {
            self.cancel_sync();
        }
        transition
    }

    pub fn set_link_hint(&self, hint: Option<String>) {
        self.monitor.set_link_hint(hint);
    }

    pub fn record_latency(&self, rtt: Duration) {
        self.monitor.record_latency(rtt);
    }

    pub fn subscribe_connectivity(&self) -> watch::Receiver<bool> {
        self.monitor.subscribe()
    }

    // == Resilience Policies ==
    /// Retries `operation` with the configured backoff policy.
    pub async fn retry_with_backoff<T, E, F, Fut>(&self, operation: F) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        retry_with_backoff(&self.retry, operation).await
    }

    pub async fn send_sms_fallback(&self, phone: &str, message: &str) -> bool {
        self.notifier.send_sms_fallback(phone, message).await
    }

    /// Moves a patient to the first available alternative doctor.
    ///
    /// Queues a `redirect_patient` action and notifies the patient. Returns
    /// `None`, without queueing anything, when no alternative exists.
    pub async fn handle_doctor_unavailable(
        &self,
        doctor_id: &str,
        patient_id: &str,
        patient_phone: Option<&str>,
    ) -> Option<Redirect> {
        let doctors: Vec<DoctorProfile> = self
            .get_cached_data(DOCTORS_CACHE_KEY)
            .await
            .unwrap_or_default();

        let Some(alternative) = select_alternative(&doctors, doctor_id) else {
            info!("No alternative doctor for {} (patient {})", doctor_id, patient_id);
            return None;
        };

        let intent = ActionIntent::new(
            ActionType::RedirectPatient,
            json!({
                "patientId": patient_id,
                "newDoctorId": alternative.id,
                "previousDoctorId": doctor_id,
            }),
        );
        let action_id = match self.queue_action(intent).await {
            Ok(action) => action.id,
            Err(OfflineError::NotDurable { id, reason }) => {
                warn!("Redirect {} queued without persistence: {}", id, reason);
                id
            }
            Err(e) => {
                warn!("Could not queue redirect for patient {}: {}", patient_id, e);
                return None;
            }
        };

        let delivery = self
            .notifier
            .notify(patient_id, patient_phone, &redirect_message(alternative))
            .await;

        info!(
            "Patient {} redirected from {} to {} (notified via {:?})",
            patient_id, doctor_id, alternative.id, delivery
        );
        Some(Redirect {
            new_doctor_id: alternative.id.clone(),
            action_id,
            delivery,
        })
    }

    /// Cached alternatives for `medicine`, else the built-in substitutes,
    /// else an empty list.
    pub async fn suggest_alternatives(&self, medicine: &str) -> Vec<Alternative> {
        let cached: Vec<Alternative> = self
            .get_cached_data(&alternatives_cache_key(medicine))
            .await
            .unwrap_or_default();

        if cached.is_empty() {
            builtin_alternatives(medicine)
        } else {
            cached
        }
    }

    pub async fn initiate_voice_booking(&self) -> VoiceBooking {
        initiate_voice_booking(
            self.recognizer.as_deref(),
            DEFAULT_VOICE_LANGUAGE,
            &self.helpline,
        )
        .await
    }

    pub fn helpline_instruction(&self) -> String {
        self.notifier.helpline_instruction()
    }

    // == Lifecycle ==
    /// Cancels background work tied to this service.
    pub fn shutdown(&self) {
        info!("Offline service shutting down");
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

impl std::fmt::Debug for OfflineService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineService")
            .field("monitor", &self.monitor)
            .field("dispatcher", &self.dispatcher)
            .field("notifier", &self.notifier)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

// == Builder ==
pub struct OfflineServiceBuilder {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    config: Config,
    dispatcher: Dispatcher,
    quality: Box<dyn QualityStrategy>,
    primary: Option<Arc<dyn NotificationChannel>>,
    sms: Arc<dyn NotificationChannel>,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
}

impl OfflineServiceBuilder {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            clock: Arc::new(SystemClock),
            config: Config::default(),
            dispatcher: Dispatcher::new(),
            quality: Box::new(LinkTypeStrategy),
            primary: None,
            sms: Arc::new(SimulatedSmsGateway::default()),
            recognizer: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn quality_strategy(mut self, strategy: Box<dyn QualityStrategy>) -> Self {
        self.quality = strategy;
        self
    }

    /// Overrides the in-app channel, which by default follows connectivity.
    pub fn primary_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.primary = Some(channel);
        self
    }

    pub fn sms_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.sms = channel;
        self
    }

    pub fn speech_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn build(self) -> OfflineService {
        let config = self.config;
        let monitor = Arc::new(ConnectivityMonitor::with_strategy(
            config.start_online,
            self.quality,
        ));
        let primary = self
            .primary
            .unwrap_or_else(|| Arc::new(InAppChannel::new(monitor.clone())));

        let cache = DurableCache::new(
            self.storage.clone(),
            self.clock.clone(),
            config.cache_ttl_duration(),
        );
        let queue = PendingQueue::load(self.storage, self.clock, config.action_max_attempts);

        OfflineService {
            cache: RwLock::new(cache),
            queue: Mutex::new(queue),
            monitor,
            dispatcher: self.dispatcher,
            notifier: Notifier::new(primary, self.sms, config.helpline_number.clone()),
            recognizer: self.recognizer,
            retry: RetryPolicy::new(config.retry_max, config.retry_base_delay()),
            action_timeout: config.action_timeout_duration(),
            helpline: config.helpline_number,
            drain_lock: Mutex::new(()),
            active_drain: StdMutex::new(None),
            drain_seq: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::queue::{ActionHandler, ExecutionError};
    use crate::resilience::Availability;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        seen: StdMutex<Vec<PendingAction>>,
    }

    impl Recorder {
        fn seen(&self) -> Vec<PendingAction> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ActionHandler for Recorder {
        async fn execute(&self, action: &PendingAction) -> std::result::Result<(), ExecutionError> {
            self.seen.lock().unwrap().push(action.clone());
            Ok(())
        }
    }

    struct Harness {
        service: OfflineService,
        clock: Arc<ManualClock>,
        recorder: Arc<Recorder>,
        storage: Arc<MemoryStorage>,
    }

    fn harness(start_online: bool) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let recorder = Arc::new(Recorder::default());
        let mut dispatcher = Dispatcher::new();
        for action_type in ActionType::known() {
            dispatcher.register(action_type, recorder.clone());
        }
        let config = Config {
            start_online,
            ..Config::default()
        };
        let service = OfflineService::builder(storage.clone())
            .config(config)
            .clock(clock.clone())
            .dispatcher(dispatcher)
            .sms_channel(Arc::new(SimulatedSmsGateway {
                latency: Duration::ZERO,
            }))
            .build();
        Harness {
            service,
            clock,
            recorder,
            storage,
        }
    }

    fn doctor(id: &str, available: bool) -> DoctorProfile {
        DoctorProfile {
            id: id.to_string(),
            name: format!("Doc {}", id),
            specialization: "general".to_string(),
            availability: Availability {
                is_available: available,
                emergency_leave: false,
            },
            next_available: Some("10:30".to_string()),
        }
    }

    #[tokio::test]
    async fn test_cache_expires_after_ttl() {
        let h = harness(true);
        h.service.cache_data("doctors_list", &vec!["d1"]).await.unwrap();

        h.clock.advance(Duration::from_secs(23 * 3600));
        let fresh: Option<Vec<String>> = h.service.get_cached_data("doctors_list").await;
        assert_eq!(fresh, Some(vec!["d1".to_string()]));

        h.clock.advance(Duration::from_secs(3600));
        let stale: Option<Vec<String>> = h.service.get_cached_data("doctors_list").await;
        assert_eq!(stale, None);
    }

    #[tokio::test]
    async fn test_queue_action_while_offline_does_not_execute() {
        let h = harness(false);
        h.service
            .queue_action(ActionIntent::new("book_appointment", json!({"slot": 1})))
            .await
            .unwrap();

        let report = h.service.sync_pending().await;
        assert_eq!(report, DrainReport::default());
        assert_eq!(h.service.pending_count().await, 1);
        assert!(h.recorder.seen().is_empty());
    }

    #[tokio::test]
    async fn test_sync_replays_in_enqueue_order() {
        let h = harness(false);
        for n in 1..=3 {
            h.service
                .queue_action(ActionIntent::new(ActionType::UpdateInventory, json!({ "n": n })))
                .await
                .unwrap();
            h.clock.advance(Duration::from_millis(5));
        }

        assert_eq!(h.service.set_online(true), Transition::WentOnline);
        let report = h.service.sync_pending().await;

        assert_eq!(report.executed, 3);
        let order: Vec<u64> = h
            .recorder
            .seen()
            .iter()
            .map(|a| a.payload["n"].as_u64().unwrap())
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(h.service.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_queue_survives_restart() {
        let h = harness(false);
        h.service
            .queue_action(ActionIntent::new("send_prescription", json!({"rx": "r1"})))
            .await
            .unwrap();

        let restarted = OfflineService::builder(h.storage.clone())
            .clock(h.clock.clone())
            .build();
        let pending = restarted.pending_actions().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].action_type, ActionType::SendPrescription);
    }

    #[tokio::test]
    async fn test_doctor_unavailable_redirects_and_queues() {
        let h = harness(true);
        h.service
            .cache_data(DOCTORS_CACHE_KEY, &vec![doctor("d1", false), doctor("d2", true)])
            .await
            .unwrap();

        let redirect = h
            .service
            .handle_doctor_unavailable("d1", "p1", None)
            .await
            .unwrap();
        assert_eq!(redirect.new_doctor_id, "d2");
        assert_eq!(redirect.delivery, Delivery::Primary);

        let pending = h.service.pending_actions().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].action_type, ActionType::RedirectPatient);
        assert_eq!(pending[0].payload["newDoctorId"], "d2");
        assert_eq!(pending[0].payload["previousDoctorId"], "d1");
    }

    #[tokio::test]
    async fn test_doctor_unavailable_offline_falls_back_to_sms() {
        let h = harness(false);
        h.service
            .cache_data(DOCTORS_CACHE_KEY, &vec![doctor("d2", true)])
            .await
            .unwrap();

        let redirect = h
            .service
            .handle_doctor_unavailable("d1", "p1", Some("+919800000000"))
            .await
            .unwrap();
        assert_eq!(redirect.delivery, Delivery::Sms);
    }

    #[tokio::test]
    async fn test_doctor_unavailable_without_alternative() {
        let h = harness(true);
        h.service
            .cache_data(DOCTORS_CACHE_KEY, &vec![doctor("d1", false)])
            .await
            .unwrap();

        assert!(h
            .service
            .handle_doctor_unavailable("d1", "p1", None)
            .await
            .is_none());
        assert_eq!(h.service.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_cached_alternatives_take_precedence() {
        let h = harness(true);
        let stocked = vec![Alternative {
            name: "Crocin".to_string(),
            reason: "Same molecule".to_string(),
        }];
        h.service
            .cache_data(&alternatives_cache_key("paracetamol"), &stocked)
            .await
            .unwrap();

        assert_eq!(h.service.suggest_alternatives("paracetamol").await, stocked);
        assert_eq!(h.service.suggest_alternatives("azithromycin").await.len(), 2);
        assert!(h.service.suggest_alternatives("unknown-drug").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_backoff_uses_configured_policy() {
        let h = harness(true);
        let calls = std::sync::atomic::AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: std::result::Result<u32, String> = h
            .service
            .retry_with_backoff(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(format!("attempt {} failed", n))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_voice_booking_without_recognizer() {
        let h = harness(true);
        assert!(matches!(
            h.service.initiate_voice_booking().await,
            VoiceBooking::PhoneFallback { .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_action_type_is_dead_lettered() {
        let h = harness(true);
        h.service
            .queue_action(ActionIntent::new("renew_license", json!({})))
            .await
            .unwrap();

        let report = h.service.sync_pending().await;
        assert_eq!(report.dead_lettered, 1);
        assert_eq!(h.service.dead_letters().await.len(), 1);
        assert_eq!(h.service.pending_count().await, 0);
    }
}
