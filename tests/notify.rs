use std::time::Duration;

use complaint_hub::notify::{NotificationChannel, Severity, AUTO_HIDE_AFTER};
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn message_hides_itself_after_the_delay() {
    let channel = NotificationChannel::new();
    channel.success("Complaint submitted successfully!");
    let shown = channel.current();
    assert!(shown.visible);
    assert_eq!(shown.severity, Severity::Success);

    sleep(AUTO_HIDE_AFTER - Duration::from_millis(1)).await;
    assert!(channel.current().visible);

    sleep(Duration::from_millis(2)).await;
    let hidden = channel.current();
    assert!(!hidden.visible);
    assert_eq!(hidden.message, "Complaint submitted successfully!");
}

#[tokio::test(start_paused = true)]
async fn newer_message_is_not_hidden_by_an_older_timer() {
    let channel = NotificationChannel::new();
    channel.success("first");
    sleep(Duration::from_secs(2)).await;
    channel.error("second");

    // the first timer fires here but the second message stays up
    sleep(Duration::from_millis(1500)).await;
    let current = channel.current();
    assert!(current.visible);
    assert_eq!(current.message, "second");
    assert_eq!(current.severity, Severity::Error);

    sleep(Duration::from_secs(2)).await;
    assert!(!channel.current().visible);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_show_and_hide() {
    let channel = NotificationChannel::with_ttl(Duration::from_secs(1));
    let mut rx = channel.subscribe();
    channel.show("1 complaint is due today.", Severity::Info);
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().message, "1 complaint is due today.");

    rx.changed().await.unwrap();
    assert!(!rx.borrow_and_update().visible);
}

#[test]
fn manual_hide_without_a_runtime() {
    let channel = NotificationChannel::default();
    channel.success("Profile updated successfully!");
    assert!(channel.current().visible);
    channel.hide();
    channel.hide();
    assert!(!channel.current().visible);
}
