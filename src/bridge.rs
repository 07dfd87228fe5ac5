//! Running actor work from threads which are not part of the Tokio runtime.
//!
//! Code living outside the runtime (a blocking callback, a plain thread, a
//! synchronous API) can't `.await`. These functions hand a future to a
//! runtime and park the calling thread until it produced its value or the
//! deadline passed.
//!
//! Never call them from one of the runtime's own worker threads: the thread
//! would be blocked waiting for work it might itself have to run.

use std::{
    future::Future,
    sync::mpsc::{self, RecvTimeoutError},
    time::Duration,
};
use thiserror::Error;
use tokio::runtime::Handle;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bridged work did not finish in time")]
    Timeout,
    #[error("bridged work ended without producing a value")]
    Idle,
    #[error("bridged work failed: {0}")]
    Failed(anyhow::Error),
}

/// Runs `work` on `runtime` and blocks until its output is available.
///
/// The work is aborted when the deadline passes. If it ends without an
/// output (it panicked or the runtime shut down) [BridgeError::Idle] is
/// returned.
pub fn block_on<T, F>(runtime: &Handle, deadline: Duration, work: F) -> Result<T, BridgeError>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let (output_sender, output_receiver) = mpsc::sync_channel(1);
    let task = runtime.spawn(async move {
        let output = work.await;
        if output_sender.send(output).is_err() {
            log::debug!("Bridged work finished after its caller gave up");
        }
    });
    match output_receiver.recv_timeout(deadline) {
        Ok(output) => Ok(output),
        Err(RecvTimeoutError::Timeout) => {
            task.abort();
            log::warn!("Bridged work did not finish within {:?}", deadline);
            Err(BridgeError::Timeout)
        }
        Err(RecvTimeoutError::Disconnected) => Err(BridgeError::Idle),
    }
}

/// Like [block_on], for work which can fail.
pub fn try_block_on<T, F>(runtime: &Handle, deadline: Duration, work: F) -> Result<T, BridgeError>
where
    T: Send + 'static,
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    block_on(runtime, deadline, work)?.map_err(BridgeError::Failed)
}
