//! Batch dispatch state machine

use std::{sync::Arc, time::Duration};

use herald_common::{Account, Outcome, Recipient, Signal, internal, outbound};
use herald_ledger::Recorder;
use herald_tracing::traced;
use parking_lot::Mutex;
use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

use crate::{
    error::DispatchError,
    event::DispatchEvent,
    job::{Assignment, BatchJob},
    result::{BatchResult, Completion},
    rotator::AccountRotator,
    send::{SendCapability, SendRequest},
    sleeper::{Sleeper, TokioSleeper},
};

const EVENT_CAPACITY: usize = 256;

/// Drives batch jobs to completion
///
/// Recipients are processed strictly one after another:
/// 1. pick the account round-robin
/// 2. rest first if an auto-pause boundary was reached
/// 3. send, turning any failure into a failed outcome
/// 4. record the outcome
/// 5. wait out the inter-send delay, unless this was the last recipient
///
/// A failed send never stops the batch. A shutdown signal does, at the next
/// recipient or in the middle of a wait, and the run returns what it has.
#[derive(Debug)]
pub struct Dispatcher {
    sender: Arc<dyn SendCapability>,
    recorder: Recorder,
    sleeper: Arc<dyn Sleeper>,
    rng: Mutex<StdRng>,
    events: broadcast::Sender<DispatchEvent>,
}

impl Dispatcher {
    /// A dispatcher waiting on the real clock with an OS-seeded rng
    pub fn new(sender: Arc<dyn SendCapability>, recorder: Recorder) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            sender,
            recorder,
            sleeper: Arc::new(TokioSleeper),
            rng: Mutex::new(StdRng::from_os_rng()),
            events,
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Make randomised delays reproducible
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    #[must_use]
    pub const fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: DispatchEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    /// Run one batch to completion or cancellation
    ///
    /// Accepts an already validated [`BatchJob`] or anything that validates
    /// into one, such as a [`crate::JobSpec`].
    ///
    /// # Errors
    /// If the job fails validation; nothing is sent in that case
    #[traced(instrument(level = tracing::Level::DEBUG, skip_all), timing(precision = "s"))]
    pub async fn run_batch<J>(
        &self,
        job: J,
        shutdown: broadcast::Receiver<Signal>,
    ) -> Result<BatchResult, DispatchError>
    where
        J: TryInto<BatchJob> + Send,
        DispatchError: From<J::Error>,
    {
        let job: BatchJob = job.try_into()?;
        let mut cancellation = Cancellation::new(shutdown);

        let batch = job.id();
        let total = job.recipients().len();
        let pacing = job.pacing();
        let rotator = AccountRotator::new(job.assignments());

        internal!(
            level = INFO,
            "Batch {batch}: dispatching to {total} recipients across {} accounts",
            job.assignments().len()
        );
        self.emit(DispatchEvent::Started { batch, total });

        let mut outcomes = Vec::with_capacity(total);
        let mut completion = Completion::Completed;

        for (index, recipient) in job.recipients().iter().enumerate() {
            if cancellation.is_cancelled() {
                completion = Completion::Cancelled;
                break;
            }

            let Some((account, assignment)) = rotator.select(index) else {
                break;
            };

            if let Some(pause) = pacing.pause_before(index) {
                internal!(
                    level = INFO,
                    "Batch {batch}: {index} recipients processed, auto-pausing for {} minutes",
                    pause.as_secs() / 60
                );
                self.emit(DispatchEvent::AutoPause {
                    before_index: index,
                    duration: pause,
                });

                if self.wait(pause, &mut cancellation).await {
                    completion = Completion::Cancelled;
                    break;
                }
            }

            let outcome = self.attempt(account, recipient, assignment).await;
            self.recorder.record(outcome.clone()).await;
            self.emit(DispatchEvent::Attempted {
                index,
                outcome: outcome.clone(),
            });
            outcomes.push(outcome);

            let delay = {
                let mut rng = self.rng.lock();
                pacing.delay_after(index, total, &mut *rng)
            };

            if let Some(delay) = delay {
                internal!(
                    level = DEBUG,
                    "Batch {batch}: waiting {}s before the next send",
                    delay.as_secs()
                );
                self.emit(DispatchEvent::Waiting { duration: delay });

                if self.wait(delay, &mut cancellation).await {
                    completion = Completion::Cancelled;
                    break;
                }
            }
        }

        let unpersisted = self.recorder.flush().await;
        if unpersisted > 0 {
            internal!(
                level = WARN,
                "Batch {batch}: {unpersisted} outcomes are held in memory until the outcome store recovers"
            );
        }

        let result = BatchResult::new(batch, outcomes, total, completion, unpersisted);

        internal!(
            level = INFO,
            "Batch {batch} {completion:?}: {} of {} attempted sends succeeded ({total} recipients)",
            result.total_succeeded,
            result.total_attempted
        );
        self.emit(DispatchEvent::Finished {
            batch,
            attempted: result.total_attempted,
            succeeded: result.total_succeeded,
            completion,
        });

        Ok(result)
    }

    /// Send to one recipient, folding any failure into the outcome
    async fn attempt(
        &self,
        account: &Account,
        recipient: &Recipient,
        assignment: &Assignment,
    ) -> Outcome {
        let request = SendRequest {
            account,
            recipient,
            text: recipient.text_or(&assignment.text),
            image: assignment.image.as_ref(),
            audio: assignment.audio.as_ref(),
        };

        match self.sender.send_one(request).await {
            Ok(()) => {
                outbound!(level = INFO, "Sent to {recipient} as {}", account.id);
                Outcome::success(account.id.clone(), recipient.address.clone())
            }
            Err(err) if err.is_system() => {
                outbound!(
                    level = ERROR,
                    "Send to {recipient} as {} failed on our side: {err}",
                    account.id
                );
                Outcome::failure(account.id.clone(), recipient.address.clone(), err.kind())
            }
            Err(err) => {
                outbound!(
                    level = WARN,
                    "Send to {recipient} as {} failed: {err}",
                    account.id
                );
                Outcome::failure(account.id.clone(), recipient.address.clone(), err.kind())
            }
        }
    }

    /// Wait out a pacing interval, returning `true` if cancelled meanwhile
    async fn wait(&self, duration: Duration, cancellation: &mut Cancellation) -> bool {
        tokio::select! {
            biased;
            () = cancellation.signalled() => true,
            () = self.sleeper.sleep(duration) => false,
        }
    }
}

/// Shutdown listener for one batch run
///
/// Any signal, or missing signals through lag, cancels. A closed channel
/// means nobody can cancel any more.
struct Cancellation {
    shutdown: Option<broadcast::Receiver<Signal>>,
    cancelled: bool,
}

impl Cancellation {
    const fn new(shutdown: broadcast::Receiver<Signal>) -> Self {
        Self {
            shutdown: Some(shutdown),
            cancelled: false,
        }
    }

    fn is_cancelled(&mut self) -> bool {
        if self.cancelled {
            return true;
        }

        let Some(shutdown) = &mut self.shutdown else {
            return false;
        };

        match shutdown.try_recv() {
            Ok(signal) => {
                internal!(level = INFO, "Received {signal:?}, cancelling batch");
                self.cancelled = true;
            }
            Err(TryRecvError::Lagged(_)) => self.cancelled = true,
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => self.shutdown = None,
        }

        self.cancelled
    }

    /// Resolves once a cancelling signal arrives, never if none can
    async fn signalled(&mut self) {
        loop {
            if self.cancelled {
                return;
            }

            let Some(shutdown) = &mut self.shutdown else {
                return std::future::pending().await;
            };

            match shutdown.recv().await {
                Ok(signal) => {
                    internal!(level = INFO, "Received {signal:?} while waiting, cancelling batch");
                    self.cancelled = true;
                }
                Err(RecvError::Lagged(_)) => self.cancelled = true,
                Err(RecvError::Closed) => self.shutdown = None,
            }
        }
    }
}
