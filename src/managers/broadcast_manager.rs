// BroadcastChannelManager: Centralized tokio broadcast channel management
// Single Responsibility: Broadcast channel lifecycle and subscription

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::detection::ShakeEvent;
use crate::sensor::SensorSample;

/// Manages the tokio broadcast channels feeding engine subscribers
///
/// Single Responsibility: Broadcast channel lifecycle and subscription
///
/// This manager centralizes broadcast channel creation, storage, and
/// subscription handling. It provides a clean interface for:
/// - Initializing broadcast channels with appropriate buffer sizes
/// - Subscribing to broadcast channels for multiple consumers
/// - Retaining senders across stop/start so subscriptions survive a
///   monitoring restart
///
/// # Channel Types
/// - Readings: Every sensor sample popped by the detection worker, in
///   arrival order
/// - Shake: Shake events (magnitude above threshold) from the classifier
///
/// Telemetry metrics are not duplicated here; subscribers go through the
/// global [`crate::telemetry::TelemetryHub`] instead.
pub struct BroadcastChannelManager {
    readings: Arc<Mutex<Option<broadcast::Sender<SensorSample>>>>,
    shake: Arc<Mutex<Option<broadcast::Sender<ShakeEvent>>>>,
}

impl BroadcastChannelManager {
    /// Create a new BroadcastChannelManager with all channels uninitialized
    ///
    /// Channels must be explicitly initialized via init_* methods before use.
    pub fn new() -> Self {
        Self {
            readings: Arc::new(Mutex::new(None)),
            shake: Arc::new(Mutex::new(None)),
        }
    }

    // ========================================================================
    // READINGS CHANNEL
    // ========================================================================

    /// Initialize the readings broadcast channel
    ///
    /// Returns the sender the detection worker publishes every sample to.
    /// Idempotent: when a sender already exists it is returned as-is so
    /// receivers subscribed before a restart keep working.
    ///
    /// # Notes
    /// - Buffer size: 100 messages (several seconds at the default 5 Hz rate)
    /// - Old messages dropped if buffer fills (lagged subscribers)
    pub fn init_readings(&self) -> broadcast::Sender<SensorSample> {
        let mut slot = self.readings.lock().unwrap();
        if let Some(tx) = slot.as_ref() {
            return tx.clone();
        }
        let (tx, _) = broadcast::channel(100);
        *slot = Some(tx.clone());
        tx
    }

    /// Subscribe to sensor readings
    ///
    /// Each subscriber receives independent copies of all messages via the
    /// broadcast channel.
    ///
    /// # Returns
    /// `Option<broadcast::Receiver<SensorSample>>` - Receiver or None if not initialized
    pub fn subscribe_readings(&self) -> Option<broadcast::Receiver<SensorSample>> {
        self.readings.lock().unwrap().as_ref().map(|tx| tx.subscribe())
    }

    // ========================================================================
    // SHAKE CHANNEL
    // ========================================================================

    /// Initialize the shake event broadcast channel
    ///
    /// Returns the sender the detection worker publishes shake events to.
    /// Idempotent like [`Self::init_readings`].
    ///
    /// # Notes
    /// - Buffer size: 50 messages (shake bursts are short; repeat-fire on a
    ///   sustained shake stays well under this at sensor rates)
    pub fn init_shake(&self) -> broadcast::Sender<ShakeEvent> {
        let mut slot = self.shake.lock().unwrap();
        if let Some(tx) = slot.as_ref() {
            return tx.clone();
        }
        let (tx, _) = broadcast::channel(50);
        *slot = Some(tx.clone());
        tx
    }

    /// Subscribe to shake events
    ///
    /// # Returns
    /// `Option<broadcast::Receiver<ShakeEvent>>` - Receiver or None if not initialized
    pub fn subscribe_shake(&self) -> Option<broadcast::Receiver<ShakeEvent>> {
        self.shake.lock().unwrap().as_ref().map(|tx| tx.subscribe())
    }
}

impl Default for BroadcastChannelManager {
    fn default() -> Self {
        Self::new()
    }
}
