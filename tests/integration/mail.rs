//! Booking confirmation email against a mock deployment and capture file

use super::helpers::{booking, captured_mail, site_for};
use mockito::Server;
use rajdhani::checks::{validate, BookingConfirmationEmail, Status};
use rajdhani::mail::{MailCapture, MailWait};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn short_wait() -> MailWait {
    MailWait {
        timeout: Duration::from_secs(3),
        interval: Duration::from_millis(20),
    }
}

/// Booking endpoint whose mail sink writes `mail` to `path` after `delay`.
fn mock_booking_with_mail(server: &mut Server, path: PathBuf, mail: String, delay: Duration) {
    server
        .mock("POST", "/book-ticket")
        .with_body_from_request(move |_| {
            let path = path.clone();
            let mail = mail.clone();
            thread::spawn(move || {
                thread::sleep(delay);
                std::fs::write(path, mail).unwrap();
            });
            b"booked".to_vec()
        })
        .create();
}

#[test]
fn test_email_arrives_after_delay() {
    let temp = TempDir::new().unwrap();
    let mail_file = temp.path().join("rajdhani.mail");
    let mut server = Server::new();
    mock_booking_with_mail(
        &mut server,
        mail_file.clone(),
        captured_mail("alice@example.com"),
        Duration::from_millis(200),
    );

    let check = BookingConfirmationEmail::new(
        booking("12028", "2022-10-01", "Alice", "alice@example.com"),
        MailCapture::new(&mail_file),
        short_wait(),
    );
    let status = validate(&check, &site_for(&server));
    assert_eq!(status.status, Status::Pass, "{}", status.message);
}

#[test]
fn test_stale_mail_is_not_accepted() {
    let temp = TempDir::new().unwrap();
    let mail_file = temp.path().join("rajdhani.mail");
    // An earlier booking's confirmation is already in the capture file.
    std::fs::write(&mail_file, captured_mail("alice@example.com")).unwrap();

    let mut server = Server::new();
    server.mock("POST", "/book-ticket").with_body("booked").create();

    let check = BookingConfirmationEmail::new(
        booking("12028", "2022-10-01", "Alice", "alice@example.com"),
        MailCapture::new(&mail_file),
        MailWait {
            timeout: Duration::from_millis(300),
            interval: Duration::from_millis(20),
        },
    );
    let status = validate(&check, &site_for(&server));
    assert_eq!(status.status, Status::Fail);
    assert!(status.message.contains("No confirmation email was received"));
}

#[test]
fn test_email_to_wrong_recipient_fails() {
    let temp = TempDir::new().unwrap();
    let mail_file = temp.path().join("rajdhani.mail");
    let mut server = Server::new();
    mock_booking_with_mail(
        &mut server,
        mail_file.clone(),
        captured_mail("admin@example.com"),
        Duration::from_millis(50),
    );

    let check = BookingConfirmationEmail::new(
        booking("12028", "2022-10-01", "Alice", "alice@example.com"),
        MailCapture::new(&mail_file),
        short_wait(),
    );
    let status = validate(&check, &site_for(&server));
    assert_eq!(status.status, Status::Fail);
    assert!(status.message.contains("admin@example.com"));
}

#[test]
fn test_failed_booking_is_not_a_pass() {
    let temp = TempDir::new().unwrap();
    let mut server = Server::new();
    server.mock("POST", "/book-ticket").with_status(500).create();

    let check = BookingConfirmationEmail::new(
        booking("12028", "2022-10-01", "Alice", "alice@example.com"),
        MailCapture::new(temp.path().join("rajdhani.mail")),
        short_wait(),
    );
    let status = validate(&check, &site_for(&server));
    assert_ne!(status.status, Status::Pass);
    assert!(status.message.contains("Could not make booking"));
}

#[test]
fn test_unreachable_site_is_error() {
    let temp = TempDir::new().unwrap();
    let site = rajdhani::site::Site::new(
        "gone",
        "http://127.0.0.1:9",
        rajdhani::site::SiteOptions::default(),
    )
    .unwrap();

    let check = BookingConfirmationEmail::new(
        booking("12028", "2022-10-01", "Alice", "alice@example.com"),
        MailCapture::new(temp.path().join("rajdhani.mail")),
        short_wait(),
    );
    assert_eq!(validate(&check, &site).status, Status::Error);
}
