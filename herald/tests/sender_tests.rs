#![allow(clippy::unwrap_used)]
#![cfg(unix)]

use std::{os::unix::fs::PermissionsExt, path::Path};

use herald::{
    CheckReport, CommandSender, CommandSenderConfig, NumberCheck, accounts::PROFILE_INFO_FILE,
    check_numbers,
};
use herald_common::{Account, FailureKind, MediaRef, Recipient};
use herald_dispatch::{SendCapability, SendError, SendRequest};
use pretty_assertions::assert_eq;

/// Write an executable shell script that records its arguments and exits
fn script(dir: &Path, body: &str) -> CommandSenderConfig {
    let program = dir.join("send.sh");
    std::fs::write(
        &program,
        format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > \"{}\"\n{body}\n",
            dir.join("args.txt").display()
        ),
    )
    .unwrap();
    std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

    CommandSenderConfig {
        program,
        args: Vec::new(),
        timeout_secs: 5,
    }
}

fn recorded_args(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("args.txt"))
        .unwrap()
        .lines()
        .map(ToString::to_string)
        .collect()
}

struct Fixture {
    dir: tempfile::TempDir,
    account: Account,
    recipient: Recipient,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("profiles").join("work");
        std::fs::create_dir_all(&session).unwrap();

        Self {
            account: Account::new("work", session),
            recipient: Recipient::new("+15550100"),
            dir,
        }
    }

    fn request<'a>(
        &'a self,
        image: Option<&'a MediaRef>,
        audio: Option<&'a MediaRef>,
    ) -> SendRequest<'a> {
        SendRequest {
            account: &self.account,
            recipient: &self.recipient,
            text: "hello there",
            image,
            audio,
        }
    }

    async fn send_with(&self, body: &str) -> Result<(), SendError> {
        let sender = CommandSender::new(script(self.dir.path(), body));
        sender.send_one(self.request(None, None)).await
    }
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_success_passes_arguments_in_order() {
    let fixture = Fixture::new();
    fixture.send_with("exit 0").await.unwrap();

    assert_eq!(
        recorded_args(fixture.dir.path()),
        vec![
            "work".to_string(),
            fixture.account.session_dir().display().to_string(),
            "+15550100".to_string(),
            "hello there".to_string(),
        ]
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_exit_codes_are_classified() {
    let fixture = Fixture::new();

    let not_found = fixture.send_with("exit 3").await.unwrap_err();
    assert_eq!(not_found.kind(), FailureKind::NotFound);

    let unavailable = fixture.send_with("echo logged out >&2; exit 4").await.unwrap_err();
    assert_eq!(unavailable.kind(), FailureKind::Rejected);
    assert!(unavailable.to_string().contains("logged out"));

    let flaky = fixture.send_with("exit 1").await.unwrap_err();
    assert_eq!(flaky.kind(), FailureKind::Transient);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_timeout_is_temporary() {
    let fixture = Fixture::new();
    let mut config = script(fixture.dir.path(), "sleep 5");
    config.timeout_secs = 1;

    let err = CommandSender::new(config)
        .send_one(fixture.request(None, None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Transient);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_missing_program_is_temporary() {
    let fixture = Fixture::new();
    let sender = CommandSender::new(CommandSenderConfig {
        program: fixture.dir.path().join("does-not-exist"),
        args: Vec::new(),
        timeout_secs: 5,
    });

    let err = sender.send_one(fixture.request(None, None)).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Transient);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_missing_profile_is_rejected_without_running() {
    let fixture = Fixture::new();
    let ghost = Account::new("ghost", fixture.dir.path().join("profiles").join("ghost"));
    let sender = CommandSender::new(script(fixture.dir.path(), "exit 0"));

    let err = sender
        .send_one(SendRequest {
            account: &ghost,
            ..fixture.request(None, None)
        })
        .await
        .unwrap_err();

    assert!(err.is_permanent());
    assert!(err.to_string().contains("Profile not found"));
    assert!(!fixture.dir.path().join("args.txt").exists());
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_missing_media_is_dropped() {
    let fixture = Fixture::new();
    let image_path = fixture.dir.path().join("promo.png");
    std::fs::write(&image_path, b"png").unwrap();
    let image = MediaRef::new(&image_path);
    let audio = MediaRef::new(fixture.dir.path().join("gone.ogg"));

    let sender = CommandSender::new(script(fixture.dir.path(), "exit 0"));
    sender
        .send_one(fixture.request(Some(&image), Some(&audio)))
        .await
        .unwrap();

    let args = recorded_args(fixture.dir.path());
    assert_eq!(args.len(), 6);
    assert_eq!(args[4], "--image");
    assert_eq!(args[5], image_path.display().to_string());
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_success_stamps_last_used() {
    let fixture = Fixture::new();
    let info = fixture.account.session_dir().join(PROFILE_INFO_FILE);
    std::fs::write(&info, r#"{"name": "work", "last_used": "Never"}"#).unwrap();

    fixture.send_with("exit 0").await.unwrap();
    let updated: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&info).unwrap()).unwrap();
    assert_ne!(updated["last_used"], "Never");

    std::fs::write(&info, r#"{"name": "work", "last_used": "Never"}"#).unwrap();
    let _ = fixture.send_with("exit 1").await;
    let untouched: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&info).unwrap()).unwrap();
    assert_eq!(untouched["last_used"], "Never");
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_check_passes_flag_instead_of_text() {
    let fixture = Fixture::new();
    let sender = CommandSender::new(script(fixture.dir.path(), "exit 0"));

    assert!(sender.check_one(&fixture.account, "+15550100").await.unwrap());
    assert_eq!(
        recorded_args(fixture.dir.path()),
        vec![
            "work".to_string(),
            fixture.account.session_dir().display().to_string(),
            "+15550100".to_string(),
            "--check".to_string(),
        ]
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_check_sorts_by_exit_code() {
    let fixture = Fixture::new();
    let sender = CommandSender::new(script(
        fixture.dir.path(),
        r#"case "$3" in
  +1555*) exit 0 ;;
  +1666*) exit 1 ;;
  *) exit 3 ;;
esac"#,
    ));

    let numbers: Vec<String> = ["+15550100", "+19990000", "+16660000", "+15550101"]
        .iter()
        .map(ToString::to_string)
        .collect();
    let report = check_numbers(&sender, &fixture.account, &numbers)
        .await
        .unwrap();

    assert_eq!(
        report,
        CheckReport {
            registered: vec!["+15550100".to_string(), "+15550101".to_string()],
            unregistered: vec!["+19990000".to_string(), "+16660000".to_string()],
        }
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_check_with_missing_profile_fails() {
    let fixture = Fixture::new();
    let ghost = Account::new("ghost", fixture.dir.path().join("profiles").join("ghost"));
    let sender = CommandSender::new(script(fixture.dir.path(), "exit 0"));

    let err = check_numbers(&sender, &ghost, &["+15550100".to_string()])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Profile not found"));
    assert!(!fixture.dir.path().join("args.txt").exists());
}
