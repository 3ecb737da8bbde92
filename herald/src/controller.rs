use std::{path::Path, sync::LazyLock};

use herald_common::{Signal, internal, logging, tracing};
use herald_dispatch::{BatchReport, DispatchEvent, Dispatcher, JobSpec};
use herald_ledger::Recorder;
use herald_tracing::traced;
use tokio::sync::broadcast;

use crate::config::{Herald, ron_options};

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

/// Wait for Ctrl+C or SIGTERM, then tell everything listening to stop
#[traced(instrument(level = tracing::Level::TRACE))]
async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = WARN, "CTRL+C entered, stopping after the current send");
        }
        _ = terminate.recv() => {
            internal!(level = WARN, "Terminate signal received, stopping after the current send");
        }
    };

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    Ok(())
}

/// Narrate a running batch at INFO
async fn report_progress(mut events: broadcast::Receiver<DispatchEvent>) {
    loop {
        match events.recv().await {
            Ok(DispatchEvent::Attempted { index, outcome }) => internal!(
                level = INFO,
                "[{}] {} via {}: {:?}",
                index + 1,
                outcome.recipient,
                outcome.account,
                outcome.status
            ),
            Ok(DispatchEvent::AutoPause {
                before_index,
                duration,
            }) => internal!(
                level = INFO,
                "Pausing {}s before recipient {}",
                duration.as_secs(),
                before_index + 1
            ),
            Ok(DispatchEvent::Finished { .. }) | Err(broadcast::error::RecvError::Closed) => break,
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::debug!("Progress reporter missed {missed} event(s)");
            }
        }
    }
}

/// Read a job file
///
/// # Errors
/// If the file cannot be read or is not a job
pub fn load_job(path: &Path) -> anyhow::Result<JobSpec> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read job from {}: {e}", path.display()))?;

    ron_options()
        .from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid job in {}: {e}", path.display()))
}

impl Herald {
    /// Build the dispatcher this configuration describes
    ///
    /// # Errors
    /// If the ledger cannot be opened
    pub async fn dispatcher(&self) -> anyhow::Result<Dispatcher> {
        let store = self.ledger.clone().into_store().await?;
        let sender = self.sender.clone().into_capability();

        Ok(Dispatcher::new(sender, Recorder::new(store)))
    }

    /// Run one batch job until it finishes or a shutdown signal arrives
    ///
    /// # Errors
    /// If the ledger cannot be opened or the job is invalid
    #[traced(instrument(level = tracing::Level::TRACE, skip_all, err), timing(precision = "s"))]
    pub async fn run_job(self, job: JobSpec) -> anyhow::Result<BatchReport> {
        logging::init();

        let dispatcher = self.dispatcher().await?;
        let job = job.with_session_root(&self.accounts.root);

        let progress = tokio::spawn(report_progress(dispatcher.subscribe()));
        let cancel = SHUTDOWN_BROADCAST.subscribe();
        let listener = tokio::spawn(shutdown());

        let result = dispatcher.run_batch(job, cancel).await;

        listener.abort();
        drop(dispatcher);
        let _ = progress.await;

        let result = result?;
        internal!(
            level = INFO,
            "Batch {} {:?}: {}/{} sent",
            result.batch,
            result.completion,
            result.total_succeeded,
            result.total_recipients
        );

        Ok(result.report())
    }
}
