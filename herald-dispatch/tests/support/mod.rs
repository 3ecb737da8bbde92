//! Shared fixtures for dispatch integration tests
#![allow(dead_code, clippy::expect_used)] // Not every test file uses every helper

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use herald_common::{Account, Signal};
use herald_dispatch::{
    Assignment, Assignments, BatchJob, PacingPolicy, PermanentError, SendCapability, SendError,
    SendRequest, Sleeper, SystemError, TemporaryError,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// A send the scripted capability was asked to make
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub account: String,
    pub recipient: String,
    pub text: String,
    pub image: Option<PathBuf>,
    pub audio: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    NotFound,
    Timeout,
    Fatal,
}

impl Failure {
    fn error(self, recipient: &str) -> SendError {
        match self {
            Self::NotFound => PermanentError::RecipientNotFound(recipient.to_string()).into(),
            Self::Timeout => TemporaryError::Timeout(format!("{recipient} took too long")).into(),
            Self::Fatal => SystemError::Internal("driver crashed".to_string()).into(),
        }
    }
}

/// Send capability stub: succeeds unless told otherwise, remembers every call,
/// and can raise a shutdown after a given number of calls
#[derive(Debug, Clone, Default)]
pub struct ScriptedSender {
    calls: Arc<Mutex<Vec<Call>>>,
    failures: Arc<Mutex<HashMap<String, Failure>>>,
    shutdown_after: Arc<Mutex<Option<(usize, broadcast::Sender<Signal>)>>>,
}

impl ScriptedSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(self, recipient: &str, failure: Failure) -> Self {
        self.failures.lock().insert(recipient.to_string(), failure);
        self
    }

    /// Broadcast `Signal::Shutdown` once `calls` sends have been made
    pub fn shutdown_after(self, calls: usize, shutdown: broadcast::Sender<Signal>) -> Self {
        *self.shutdown_after.lock() = Some((calls, shutdown));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn accounts_used(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.account).collect()
    }
}

#[async_trait]
impl SendCapability for ScriptedSender {
    async fn send_one(&self, request: SendRequest<'_>) -> Result<(), SendError> {
        let made = {
            let mut calls = self.calls.lock();
            calls.push(Call {
                account: request.account.id.to_string(),
                recipient: request.recipient.address.clone(),
                text: request.text.to_string(),
                image: request.image.map(|m| m.path().to_path_buf()),
                audio: request.audio.map(|m| m.path().to_path_buf()),
            });
            calls.len()
        };

        if let Some((after, shutdown)) = &*self.shutdown_after.lock()
            && made == *after
        {
            let _ = shutdown.send(Signal::Shutdown);
        }

        match self.failures.lock().get(&request.recipient.address) {
            Some(failure) => Err(failure.error(&request.recipient.address)),
            None => Ok(()),
        }
    }
}

/// Never finishes a wait, so only cancellation can end it
#[derive(Debug, Clone, Copy, Default)]
pub struct StalledSleeper;

#[async_trait]
impl Sleeper for StalledSleeper {
    async fn sleep(&self, _duration: Duration) {
        std::future::pending::<()>().await;
    }
}

pub fn assignments(accounts: &[(&str, &str)]) -> Assignments {
    let mut assignments = Assignments::new();
    for (name, text) in accounts {
        assignments
            .insert(
                Account::new(*name, format!("/profiles/{name}")),
                Assignment::text(*text),
            )
            .expect("unique account");
    }
    assignments
}

pub fn recipients(count: usize) -> Vec<herald_common::Recipient> {
    (1..=count).map(|i| format!("p{i}").as_str().into()).collect()
}

pub fn job(accounts: &[(&str, &str)], recipients: Vec<herald_common::Recipient>, pacing: PacingPolicy) -> BatchJob {
    BatchJob::new(recipients, assignments(accounts), pacing).expect("valid job")
}
