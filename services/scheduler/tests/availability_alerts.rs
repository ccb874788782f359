//! Availability aggregation and operator alerting, driven end to end
//! through the change feed with a manual clock.

mod support;

use rstest::rstest;
use support::{harness, roster_guide, shift_date, Harness, OPERATOR_EMAIL};

use tourdesk_scheduler::actions;
use tourdesk_scheduler::clock::Clock;
use tourdesk_scheduler::store::AlertStore;
use tourdesk_types::{AlertKind, GuideId, ShiftDate, Slot, SlotGroup};

async fn block(h: &Harness, guide: GuideId, date: ShiftDate, slot: Slot, blocked: bool) {
    actions::set_availability(&h.state, guide, date, slot, blocked)
        .await
        .unwrap();
    h.worker.drain().await.unwrap();
}

async fn roster(h: &Harness, count: usize) -> Vec<GuideId> {
    let mut guides = Vec::new();
    for i in 0..count {
        guides.push(roster_guide(h, &format!("guide{i}@example.com")).await);
    }
    guides
}

#[tokio::test]
async fn blocking_every_guide_raises_one_blocked_alert() {
    let h = harness();
    let date = shift_date("2025-12-01");
    let guides = roster(&h, 5).await;

    for &guide in &guides {
        block(&h, guide, date, Slot::Morning, true).await;
    }

    let subjects = h.mailer.sent_subjects();
    assert_eq!(subjects.len(), 1);
    assert!(subjects[0].contains("All guides blocked"));

    let sent = h.mailer.sent.lock().unwrap().clone();
    assert_eq!(sent[0].0, OPERATOR_EMAIL);

    let since = h.clock.now() - chrono::Duration::hours(24);
    let audit = h
        .stores
        .alerts
        .latest_for(date, SlotGroup::Morning, since)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(audit.kind, AlertKind::Blocked);
}

#[tokio::test]
async fn recovery_within_the_window_raises_one_available_alert() {
    let h = harness();
    let date = shift_date("2025-12-01");
    let guides = roster(&h, 5).await;

    for &guide in &guides {
        block(&h, guide, date, Slot::Morning, true).await;
    }
    h.clock.advance(chrono::Duration::hours(1));

    block(&h, guides[0], date, Slot::Morning, false).await;

    let subjects = h.mailer.sent_subjects();
    assert_eq!(subjects.len(), 2);
    assert!(subjects[1].contains("availability restored"));

    // A further unblock changes nothing material and stays silent.
    block(&h, guides[1], date, Slot::Morning, false).await;
    assert_eq!(h.mailer.sent_subjects().len(), 2);
}

#[tokio::test]
async fn recovery_outside_the_window_is_silent() {
    let h = harness();
    let date = shift_date("2025-12-01");
    let guides = roster(&h, 3).await;

    for &guide in &guides {
        block(&h, guide, date, Slot::Morning, true).await;
    }
    assert_eq!(h.mailer.sent_subjects().len(), 1);

    h.clock.advance(chrono::Duration::hours(25));
    block(&h, guides[0], date, Slot::Morning, false).await;

    // The blocked alert aged out of the dedup window; no recovery mail.
    assert_eq!(h.mailer.sent_subjects().len(), 1);
}

#[rstest]
#[case::morning(SlotGroup::Morning)]
#[case::afternoon(SlotGroup::Afternoon)]
#[tokio::test]
async fn group_alert_requires_every_slot_of_the_group(#[case] group: SlotGroup) {
    let h = harness();
    let date = shift_date("2025-12-01");
    let guide = roster_guide(&h, "solo@example.com").await;

    let slots = group.slots();
    for &slot in &slots[..slots.len() - 1] {
        block(&h, guide, date, slot, true).await;
    }
    assert!(h.mailer.sent_subjects().is_empty());

    block(&h, guide, date, slots[slots.len() - 1], true).await;
    let subjects = h.mailer.sent_subjects();
    assert_eq!(subjects.len(), 1);
    assert!(subjects[0].contains(group.as_str()));
}

#[tokio::test]
async fn blocking_one_group_does_not_alert_the_other() {
    let h = harness();
    let date = shift_date("2025-12-01");
    let guide = roster_guide(&h, "solo@example.com").await;

    block(&h, guide, date, Slot::Morning, true).await;

    let since = h.clock.now() - chrono::Duration::hours(24);
    assert!(h
        .stores
        .alerts
        .latest_for(date, SlotGroup::Afternoon, since)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn failed_send_withholds_the_audit_record() {
    let h = harness();
    let date = shift_date("2025-12-01");
    let guides = roster(&h, 2).await;

    h.mailer.set_failing(true);
    for &guide in &guides {
        block(&h, guide, date, Slot::Morning, true).await;
    }

    assert!(h.mailer.sent_subjects().is_empty());
    let since = h.clock.now() - chrono::Duration::hours(24);
    assert!(h
        .stores
        .alerts
        .latest_for(date, SlotGroup::Morning, since)
        .await
        .unwrap()
        .is_none());

    // No stale audit record suppresses the alert once delivery recovers:
    // the next evaluation of a fully blocked group sends it.
    h.mailer.set_failing(false);
    block(&h, guides[0], date, Slot::Morning, false).await;
    block(&h, guides[0], date, Slot::Morning, true).await;

    let subjects = h.mailer.sent_subjects();
    assert_eq!(subjects.len(), 1);
    assert!(subjects[0].contains("All guides blocked"));
}

#[tokio::test]
async fn writing_the_same_availability_state_is_not_dispatched() {
    let h = harness();
    let date = shift_date("2025-12-01");
    let guide = roster_guide(&h, "solo@example.com").await;

    block(&h, guide, date, Slot::Morning, true).await;
    let first = h.mailer.sent_subjects().len();

    // Same state again: no change on the feed, no re-evaluation.
    actions::set_availability(&h.state, guide, date, Slot::Morning, true)
        .await
        .unwrap();
    assert_eq!(h.worker.drain().await.unwrap(), 0);
    assert_eq!(h.mailer.sent_subjects().len(), first);
}
