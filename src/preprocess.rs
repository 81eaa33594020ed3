//! Data preprocessing worker.
//!
//! Sits between the exchange-side channel and the market channel the
//! strategy consumes: a single thread that receives upstream messages and
//! republishes them downstream. The downstream channel is bounded at one
//! element with Block overflow, so an unconsumed tick backpressures the
//! whole pipeline.

use crate::channel::{Channel, OverflowPolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

pub struct Preprocessor<T: Send + 'static> {
    upstream: Arc<Channel<T>>,
    market_channel: Arc<Channel<T>>,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Preprocessor<T> {
    pub fn new(upstream: Arc<Channel<T>>) -> Self {
        Self {
            upstream,
            market_channel: Arc::new(Channel::bounded(1, OverflowPolicy::Block)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Downstream handle for consumers.
    pub fn market_channel(&self) -> Arc<Channel<T>> {
        Arc::clone(&self.market_channel)
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawn the forwarding thread. Calling again while running is a no-op.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            warn!("preprocessor already running");
            return;
        }
        info!("preprocessor starting");

        let upstream = Arc::clone(&self.upstream);
        let downstream = Arc::clone(&self.market_channel);
        let stop_flag = Arc::clone(&self.stop_flag);

        self.worker = Some(std::thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                if upstream.is_closed() && upstream.is_empty() {
                    debug!("upstream drained and closed, preprocessor exiting");
                    break;
                }
                match upstream.recv() {
                    Some(message) => {
                        if !downstream.send(message) {
                            debug!("downstream closed, preprocessor exiting");
                            break;
                        }
                    }
                    None => break,
                }
            }
            // End of stream for consumers; `stop` closing it again is a no-op.
            downstream.close();
        }));
    }

    /// Signal the worker, wake it out of any blocked channel call, join it,
    /// and close the downstream channel. Idempotent.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        info!("preprocessor stopping");
        self.stop_flag.store(true, Ordering::SeqCst);
        // Close both ends before joining: the worker may be parked in
        // upstream.recv or in the bounded downstream send.
        self.upstream.close();
        self.market_channel.close();
        let _ = worker.join();
    }
}

impl<T: Send + 'static> Drop for Preprocessor<T> {
    fn drop(&mut self) {
        self.stop();
    }
}
