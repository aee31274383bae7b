use std::time::Duration;

use super::support::{Harness, SHEET_A, record, row, wait_until};
use crate::core::monitor::{
    MonitorController, MonitorTiming, Notice, PollState, StartOutcome, StopOutcome,
};

/// Submitted, then picked up by a reviewer, then graded: one notice per
/// transition, then reminders every interval until the user stops them.
#[tokio::test(start_paused = true)]
async fn submission_lifecycle_end_to_end() {
    let tracked = record();
    let h = Harness::new(vec![tracked.clone()], &[SHEET_A]);
    h.source.rows(SHEET_A, vec![row(&tracked, "", "")]);
    h.source.rows(SHEET_A, vec![row(&tracked, "Reviewer", "")]);
    h.source.rows(SHEET_A, vec![row(&tracked, "Reviewer", "5")]);

    let controller = MonitorController::new(
        h.ctx.clone(),
        MonitorTiming {
            poll_interval: Duration::from_secs(10),
            reminder_interval: Duration::from_secs(30),
        },
    );
    assert_eq!(
        controller.start(h.notifier.clone()).await,
        StartOutcome::Started
    );

    // Poll 1 (t=0): exists, nothing sent.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.notifier.notices().is_empty());
    assert_eq!(controller.status().await.state, PollState::Polling);

    // Poll 2 (t=10): on review, exactly one notice.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.notifier.notices(), vec![Notice::OnReview(tracked.clone())]);

    // Poll 3 (t=20): graded, polling stops and reminders begin.
    wait_until(|| h.notifier.count("reminder") >= 4).await;
    let notices = h.notifier.notices();
    assert_eq!(notices[0], Notice::OnReview(tracked.clone()));
    assert_eq!(notices[1], Notice::Checked(tracked.clone()));
    assert!(
        notices[2..]
            .iter()
            .all(|n| *n == Notice::Reminder(tracked.clone()))
    );

    let status = controller.status().await;
    assert_eq!(status.state, PollState::Stopped);
    assert!(!status.polling);
    assert!(status.reminding);
    assert_eq!(h.source.calls(), 3);
    assert_eq!(h.celebration.fired(), 2);

    assert_eq!(controller.stop().await, StopOutcome::Stopped);
    let total = h.notifier.notices().len();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.notifier.notices().len(), total);
    assert_eq!(controller.stop().await, StopOutcome::NotRunning);
}
