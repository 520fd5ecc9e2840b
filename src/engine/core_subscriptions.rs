use std::sync::atomic::Ordering;

use futures::Stream;
use tokio::runtime::Builder;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::config::AppConfig;
use crate::detection::ShakeEvent;
use crate::sensor::SensorSample;
use crate::telemetry::{self, MetricEvent};

use super::{EngineHandle, ParamPatch};

impl EngineHandle {
    // ========================================================================
    // STREAM SUBSCRIPTIONS
    // ========================================================================
    //
    // The mpsc-forwarded variants run a forwarding thread with its own
    // current-thread runtime so slow consumers see an unbounded queue
    // instead of broadcast lag, and so subscribers without a runtime
    // (JNI callers, plain threads) can still receive.

    pub fn subscribe_readings(&self) -> mpsc::UnboundedReceiver<SensorSample> {
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(mut broadcast_rx) = self.broadcasts.subscribe_readings() {
            std::thread::spawn(move || {
                let rt = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("Failed to create Tokio runtime");
                rt.block_on(async move {
                    while let Ok(sample) = broadcast_rx.recv().await {
                        if tx.send(sample).is_err() {
                            break;
                        }
                    }
                });
            });
        }

        rx
    }

    pub fn subscribe_shake(&self) -> mpsc::UnboundedReceiver<ShakeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(mut broadcast_rx) = self.broadcasts.subscribe_shake() {
            std::thread::spawn(move || {
                let rt = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("Failed to create Tokio runtime");
                rt.block_on(async move {
                    while let Ok(event) = broadcast_rx.recv().await {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                });
            });
        }

        rx
    }

    pub fn subscribe_telemetry(&self) -> mpsc::UnboundedReceiver<MetricEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut broadcast_rx = telemetry::hub().collector().subscribe();

        std::thread::spawn(move || {
            let rt = Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create Tokio runtime");
            rt.block_on(async move {
                while let Ok(event) = broadcast_rx.recv().await {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            });
        });

        rx
    }

    /// Raw broadcast receiver for readings; None before the first start.
    pub fn readings_receiver(&self) -> Option<broadcast::Receiver<SensorSample>> {
        self.broadcasts.subscribe_readings()
    }

    /// Raw broadcast receiver for shake events; None before the first start.
    pub fn shake_receiver(&self) -> Option<broadcast::Receiver<ShakeEvent>> {
        self.broadcasts.subscribe_shake()
    }

    // ========================================================================
    // ASYNC STREAM ADAPTERS
    // ========================================================================

    pub async fn readings_stream(&self) -> impl Stream<Item = SensorSample> + Unpin {
        UnboundedReceiverStream::new(self.subscribe_readings())
    }

    pub async fn shake_stream(&self) -> impl Stream<Item = ShakeEvent> + Unpin {
        UnboundedReceiverStream::new(self.subscribe_shake())
    }

    pub async fn telemetry_stream(&self) -> impl Stream<Item = MetricEvent> + Unpin {
        UnboundedReceiverStream::new(self.subscribe_telemetry())
    }

    // ========================================================================
    // PARAM PATCH COMMANDS
    // ========================================================================

    /// Get a clone of the sender for ParamPatch commands.
    pub fn command_sender(&self) -> mpsc::Sender<ParamPatch> {
        self.command_tx.clone()
    }

    /// Check whether monitoring is running (best effort).
    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::SeqCst)
    }

    /// Milliseconds elapsed since the handle was created.
    pub fn uptime_ms(&self) -> u64 {
        self.time_source
            .now()
            .saturating_duration_since(self.start_instant)
            .as_millis() as u64
    }

    /// Snapshot the current app configuration (tooling helper).
    pub fn config_snapshot(&self) -> AppConfig {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .unwrap_or_else(|err| err.into_inner().clone())
    }
}
