mod common;

use std::cell::RefCell;

use common::{spawn_server, Script};
use smtplemail::{
    config::ConfigLayer,
    message::FromOverrides,
    send::{Envelope, SendMessage},
    submit, Config, SmtpSender, Submission,
};

/// Sender keeping messages in memory.
#[derive(Default)]
struct MemorySender {
    sent: RefCell<Vec<(Envelope, Vec<u8>)>>,
}

impl SendMessage for MemorySender {
    fn send_message(&self, envelope: &Envelope, msg: &[u8]) -> smtplemail::Result<()> {
        self.sent.borrow_mut().push((envelope.clone(), msg.to_vec()));
        Ok(())
    }
}

fn config(send_from: Option<&str>) -> Config {
    Config::compose(ConfigLayer {
        smtp_host: Some("localhost".into()),
        send_from: send_from.map(ToOwned::to_owned),
        ..Default::default()
    })
    .unwrap()
}

fn submission(rcpts: &[&str]) -> Submission {
    Submission {
        recipients: rcpts.iter().map(ToString::to_string).collect(),
        ..Default::default()
    }
}

const MSG: &[u8] = b"From: Old <old@localhost>\r\nTo: a@x, b@x\r\nCc: c@x\r\nSubject: Hi\r\n\r\nHello!\r\n";

#[test_log::test]
fn test_submit_without_recipient() {
    let sender = MemorySender::default();

    let err = submit(&config(None), &submission(&[]), MSG, &sender).unwrap_err();
    assert!(err.is_config_error());
    assert_eq!(err.exit_code(), 78);
    assert!(sender.sent.borrow().is_empty());

    let err = submit(&config(None), &submission(&[" "]), MSG, &sender).unwrap_err();
    assert!(err.is_config_error());
    assert!(sender.sent.borrow().is_empty());
}

#[test_log::test]
fn test_submit_to_recipient_with_line_break() {
    let sender = MemorySender::default();
    let rcpt = "bob@localhost>\r\nRCPT TO:<evil@attacker.example";

    let err = submit(&config(None), &submission(&[rcpt]), MSG, &sender).unwrap_err();
    assert!(!err.is_config_error());
    assert_eq!(err.exit_code(), 65);
    assert!(err.to_string().contains("invalid recipient"));
    assert!(sender.sent.borrow().is_empty());
}

#[test_log::test]
fn test_submit_to_arguments() {
    let sender = MemorySender::default();

    let envelope = submit(&config(None), &submission(&["z@x"]), MSG, &sender).unwrap();
    assert_eq!(envelope.from, "old@localhost");
    assert_eq!(envelope.to, ["z@x"]);

    let sent = sender.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, envelope);
    assert!(sent[0].1.starts_with(b"From: Old <old@localhost>\r\nTo: a@x, b@x\r\n"));
}

#[test_log::test]
fn test_submit_extracts_recipients() {
    let sender = MemorySender::default();
    let submission = Submission {
        extract_recipients: true,
        ..submission(&["ignored@x"])
    };

    let envelope = submit(&config(None), &submission, MSG, &sender).unwrap();
    assert_eq!(envelope.to, ["a@x", "b@x", "c@x"]);
}

#[test_log::test]
fn test_submit_overrides_sender() {
    let sender = MemorySender::default();
    let submission = Submission {
        overrides: FromOverrides::new(Some("A@x"), Some("N")),
        ..submission(&["z@x"])
    };

    let envelope = submit(&config(Some("cfg@localhost")), &submission, MSG, &sender).unwrap();
    assert_eq!(envelope.from, "A@x");

    let sent = sender.sent.borrow();
    assert!(sent[0].1.starts_with(b"From: N <A@x>\r\n"));
}

#[test_log::test]
fn test_submit_without_sender() {
    let sender = MemorySender::default();

    let err = submit(
        &config(None),
        &submission(&["z@x"]),
        b"Subject: Hi\r\n\r\nHello!\r\n",
        &sender,
    )
    .unwrap_err();

    assert!(err.is_config_error());
    assert!(sender.sent.borrow().is_empty());
}

#[test_log::test]
fn test_submit_malformed_message() {
    let sender = MemorySender::default();

    let err = submit(
        &config(None),
        &submission(&["z@x"]),
        b"not a header\r\n\r\nHello!\r\n",
        &sender,
    )
    .unwrap_err();

    assert!(!err.is_config_error());
    assert_eq!(err.exit_code(), 65);
    assert!(sender.sent.borrow().is_empty());
}

#[test_log::test]
fn test_submit_via_smtp() {
    let (port, server) = spawn_server(Script::default());

    let mut config = config(Some("Relay <relay@localhost>"));
    config.smtp = common::smtp_config(port, config.smtp.security);
    let sender = SmtpSender::new(config.smtp.clone());

    let envelope = submit(&config, &submission(&["bob@localhost"]), MSG, &sender).unwrap();
    assert_eq!(envelope.from, "relay@localhost");

    let session = server.join().unwrap();
    assert!(session.has_command("MAIL FROM:<relay@localhost>"));
    assert!(session.has_command("RCPT TO:<bob@localhost>"));
    assert!(session
        .data
        .starts_with(b"From: Relay <relay@localhost>\r\nTo: a@x, b@x\r\n"));
}
