//! Send capabilities backed by the outside world
//!
//! [`CommandSender`] hands each message to an external automation program,
//! one process per send. The program's contract:
//!
//! ```text
//! <program> [args..] <account> <session_dir> <phone> <text> [--image PATH] [--audio PATH]
//! <program> [args..] <account> <session_dir> <phone> --check
//! ```
//!
//! The second form only checks whether `phone` is registered with the
//! messaging service.
//!
//! | exit | meaning                                     |
//! |------|---------------------------------------------|
//! | 0    | delivered / registered                      |
//! | 3    | recipient not found / not registered        |
//! | 4    | account unavailable                         |
//! | *    | temporary failure                           |

use std::{path::PathBuf, process::Stdio, sync::Arc, time::Duration};

use async_trait::async_trait;
use herald_common::{Account, MediaRef, internal, outbound};
use herald_dispatch::{PermanentError, SendCapability, SendError, SendRequest, TemporaryError};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::accounts::touch_last_used;

pub const EXIT_RECIPIENT_NOT_FOUND: i32 = 3;
pub const EXIT_ACCOUNT_UNAVAILABLE: i32 = 4;

#[derive(Debug, Clone, Default, Deserialize)]
pub enum SenderConfig {
    Command(CommandSenderConfig),
    /// Log every send and report success without contacting anything
    #[default]
    DryRun,
}

impl SenderConfig {
    #[must_use]
    pub fn into_capability(self) -> Arc<dyn SendCapability> {
        match self {
            Self::Command(config) => Arc::new(CommandSender::new(config)),
            Self::DryRun => Arc::new(DryRunSender),
        }
    }

    #[must_use]
    pub fn into_checker(self) -> Arc<dyn NumberCheck> {
        match self {
            Self::Command(config) => Arc::new(CommandSender::new(config)),
            Self::DryRun => Arc::new(DryRunSender),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandSenderConfig {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "defaults::timeout_secs")]
    pub timeout_secs: u64,
}

mod defaults {
    pub const fn timeout_secs() -> u64 {
        120
    }
}

/// Asks the messaging service whether a number can be reached
#[async_trait]
pub trait NumberCheck: Send + Sync + std::fmt::Debug {
    /// `true` when `phone` is registered, `false` when it is not
    ///
    /// # Errors
    /// When the answer could not be obtained
    async fn check_one(&self, account: &Account, phone: &str) -> Result<bool, SendError>;
}

/// Numbers sorted by whether the service knows them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub registered: Vec<String>,
    pub unregistered: Vec<String>,
}

/// Check every number in order as `account`
///
/// A number whose check fails is counted as unregistered. A permanent
/// failure, such as the account's session being unusable, stops the run.
///
/// # Errors
/// The first permanent failure
pub async fn check_numbers(
    checker: &dyn NumberCheck,
    account: &Account,
    numbers: &[String],
) -> Result<CheckReport, SendError> {
    let mut report = CheckReport::default();

    for phone in numbers {
        match checker.check_one(account, phone).await {
            Ok(true) => report.registered.push(phone.clone()),
            Ok(false) => report.unregistered.push(phone.clone()),
            Err(err) if err.is_permanent() => return Err(err),
            Err(err) => {
                outbound!(
                    level = WARN,
                    "Unable to check {phone} as {}, counting it unregistered: {err}",
                    account.id
                );
                report.unregistered.push(phone.clone());
            }
        }
    }

    internal!(
        level = INFO,
        "Checked {} number(s) as {}: {} registered, {} unregistered",
        numbers.len(),
        account.id,
        report.registered.len(),
        report.unregistered.len()
    );
    Ok(report)
}

#[derive(Debug)]
pub struct CommandSender {
    config: CommandSenderConfig,
}

/// How a finished program run ended
enum Exit {
    Success,
    NotFound,
}

impl CommandSender {
    #[must_use]
    pub const fn new(config: CommandSenderConfig) -> Self {
        Self { config }
    }

    const fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Program invocation for `account` and `phone`, before any
    /// operation-specific arguments
    fn command(&self, account: &Account, phone: &str) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg(account.id.as_str())
            .arg(account.session_dir())
            .arg(phone)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        command
    }

    /// Run the program to completion within the timeout and classify its exit
    async fn run(&self, account: &Account, mut command: Command) -> Result<Exit, SendError> {
        let session_dir = account.session_dir();
        if !session_dir.is_dir() {
            return Err(PermanentError::AccountUnavailable(format!(
                "Profile not found: {}",
                session_dir.display()
            ))
            .into());
        }

        let output = match tokio::time::timeout(self.timeout(), command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(TemporaryError::AutomationFailed(format!(
                    "Unable to run {}: {err}",
                    self.config.program.display()
                ))
                .into());
            }
            Err(_) => {
                return Err(TemporaryError::Timeout(format!(
                    "No result after {}s",
                    self.config.timeout_secs
                ))
                .into());
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        match output.status.code() {
            Some(0) => Ok(Exit::Success),
            Some(EXIT_RECIPIENT_NOT_FOUND) => Ok(Exit::NotFound),
            Some(EXIT_ACCOUNT_UNAVAILABLE) => {
                Err(PermanentError::AccountUnavailable(stderr).into())
            }
            Some(code) => Err(TemporaryError::AutomationFailed(format!(
                "exit code {code}: {stderr}"
            ))
            .into()),
            None => Err(TemporaryError::AutomationFailed(format!(
                "terminated by signal: {stderr}"
            ))
            .into()),
        }
    }
}

/// Media that still exists on disk; anything missing is dropped from the send
fn present<'a>(media: Option<&'a MediaRef>, kind: &str) -> Option<&'a MediaRef> {
    media.filter(|media| {
        let exists = media.path().is_file();
        if !exists {
            internal!(
                level = WARN,
                "{kind} file {media} is missing, sending without it"
            );
        }
        exists
    })
}

#[async_trait]
impl SendCapability for CommandSender {
    async fn send_one(&self, request: SendRequest<'_>) -> Result<(), SendError> {
        let mut command = self.command(request.account, &request.recipient.address);
        command.arg(request.text);
        if let Some(image) = present(request.image, "image") {
            command.arg("--image").arg(image.path());
        }
        if let Some(audio) = present(request.audio, "audio") {
            command.arg("--audio").arg(audio.path());
        }

        match self.run(request.account, command).await? {
            Exit::Success => {
                touch_last_used(request.account.session_dir()).await;
                Ok(())
            }
            Exit::NotFound => Err(PermanentError::RecipientNotFound(
                request.recipient.address.clone(),
            )
            .into()),
        }
    }
}

#[async_trait]
impl NumberCheck for CommandSender {
    async fn check_one(&self, account: &Account, phone: &str) -> Result<bool, SendError> {
        let mut command = self.command(account, phone);
        command.arg("--check");

        Ok(matches!(self.run(account, command).await?, Exit::Success))
    }
}

/// Sends nothing
#[derive(Debug, Default)]
pub struct DryRunSender;

#[async_trait]
impl SendCapability for DryRunSender {
    async fn send_one(&self, request: SendRequest<'_>) -> Result<(), SendError> {
        outbound!(
            level = INFO,
            account = %request.account.id,
            recipient = %request.recipient,
            image = request.image.is_some(),
            audio = request.audio.is_some(),
            "[dry run] {}",
            request.text
        );

        Ok(())
    }
}

#[async_trait]
impl NumberCheck for DryRunSender {
    async fn check_one(&self, account: &Account, phone: &str) -> Result<bool, SendError> {
        outbound!(level = INFO, "[dry run] check {phone} as {}", account.id);
        Ok(true)
    }
}
