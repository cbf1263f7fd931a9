use showings_monitor::config::PushoverConfig;
use showings_monitor::notify::pushover::{build_message, build_title};
use showings_monitor::notify::{Notifier, PushoverNotifier};
use showings_monitor::showing::ShowingRow;

fn rows(n: usize) -> Vec<ShowingRow> {
    (1..=n)
        .map(|i| ShowingRow::new(format!("Guest {i}"), format!("May {i}"), "", "Zillow"))
        .collect()
}

fn config(token: &str, user: &str) -> PushoverConfig {
    PushoverConfig {
        enabled: true,
        token: token.to_string(),
        user: user.to_string(),
        device: None,
        sound: None,
    }
}

#[test]
fn seven_rows_are_truncated_to_five() {
    let message = build_message(&rows(7));
    let lines: Vec<&str> = message.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "Guest 1 | May 1 | Zillow");
    assert_eq!(lines[4], "Guest 5 | May 5 | Zillow");
    assert!(lines[5].ends_with("+2 more"));
    assert!(!message.contains("Guest 6"));
    assert_eq!(build_title(7), "New 7 showing(s)");
}

#[tokio::test]
async fn blank_credentials_are_a_quiet_no_op() {
    // Would fail to connect if it tried to send.
    let notifier =
        PushoverNotifier::new(config("  ", "usr"), "").with_endpoint("http://127.0.0.1:1/");
    assert!(notifier.notify_new_showings(&rows(1)).await.is_ok());
}

#[tokio::test]
async fn transport_errors_are_swallowed() {
    let notifier = PushoverNotifier::new(config("tok", "usr"), "https://example.com")
        .with_endpoint("http://127.0.0.1:1/1/messages.json");
    assert!(notifier.notify_new_showings(&rows(3)).await.is_ok());
    assert_eq!(notifier.name(), "pushover");
}
