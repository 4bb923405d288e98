// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Msg {
    code: String,
}

fn msg(code: &str) -> Msg {
    Msg {
        code: code.to_string(),
    }
}

fn queue(dir: &std::path::Path) -> DurableQueue<Msg> {
    DurableQueue::open(dir.join("queue")).unwrap()
}

#[test]
fn push_then_dequeue_returns_payload() {
    let dir = tempdir().unwrap();
    let q = queue(dir.path());

    q.push(&msg("A1"), 1_000).unwrap();
    let leased = q.dequeue(1_000).unwrap().unwrap();
    assert_eq!(leased.payload, msg("A1"));
    assert_eq!(leased.tries, 1);
}

#[test]
fn empty_queue_dequeues_none() {
    let dir = tempdir().unwrap();
    let q = queue(dir.path());
    assert!(q.dequeue(1_000).unwrap().is_none());
}

#[test]
fn leased_message_is_invisible_until_window_lapses() {
    let dir = tempdir().unwrap();
    let q = DurableQueue::with_visibility(
        dir.path().join("queue"),
        std::time::Duration::from_secs(1_800),
    )
    .unwrap();

    q.push(&msg("A1"), 1_000).unwrap();
    let leased = q.dequeue(1_000).unwrap().unwrap();

    // Hidden within the window...
    assert!(q.dequeue(1_000 + 1_799_000).unwrap().is_none());
    // ...redelivered after it, with tries bumped.
    let redelivered = q.dequeue(1_000 + 1_800_000).unwrap().unwrap();
    assert_eq!(redelivered.id, leased.id);
    assert_eq!(redelivered.tries, 2);
}

#[test]
fn dequeue_returns_oldest_first() {
    let dir = tempdir().unwrap();
    let q = queue(dir.path());

    q.push(&msg("older"), 1_000).unwrap();
    q.push(&msg("newer"), 2_000).unwrap();

    assert_eq!(q.dequeue(5_000).unwrap().unwrap().payload, msg("older"));
    assert_eq!(q.dequeue(5_000).unwrap().unwrap().payload, msg("newer"));
}

#[test]
fn ack_removes_permanently() {
    let dir = tempdir().unwrap();
    let q = queue(dir.path());

    q.push(&msg("A1"), 1_000).unwrap();
    let leased = q.dequeue(1_000).unwrap().unwrap();
    q.ack(&leased.id).unwrap();

    assert!(q.is_empty().unwrap());
    // Even far past the visibility window, nothing comes back.
    assert!(q.dequeue(10_000_000).unwrap().is_none());
}

#[test]
fn ack_unknown_message_errors() {
    let dir = tempdir().unwrap();
    let q = queue(dir.path());
    assert!(matches!(
        q.ack("nope"),
        Err(QueueError::UnknownMessage(_))
    ));
}

#[test]
fn ping_extends_the_lease() {
    let dir = tempdir().unwrap();
    let q = DurableQueue::with_visibility(
        dir.path().join("queue"),
        std::time::Duration::from_secs(100),
    )
    .unwrap();

    q.push(&msg("A1"), 0).unwrap();
    let leased = q.dequeue(0).unwrap().unwrap();

    // At t=90s the consumer pings; the message stays hidden past the
    // original deadline.
    q.ping(&leased.id, 90_000).unwrap();
    assert!(q.dequeue(150_000).unwrap().is_none());
    assert!(q.dequeue(190_000).unwrap().is_some());
}

#[test]
fn tries_accumulate_across_redeliveries() {
    let dir = tempdir().unwrap();
    let q =
        DurableQueue::with_visibility(dir.path().join("queue"), std::time::Duration::ZERO).unwrap();

    q.push(&msg("A1"), 0).unwrap();
    for expected in 1..=21 {
        let leased = q.dequeue(expected).unwrap().unwrap();
        assert_eq!(leased.tries, expected as u32);
    }
}

#[test]
fn queue_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let q = queue(dir.path());
        q.push(&msg("A1"), 1_000).unwrap();
    }
    let q = queue(dir.path());
    assert_eq!(q.len().unwrap(), 1);
    assert_eq!(q.dequeue(1_000).unwrap().unwrap().payload, msg("A1"));
}

#[test]
fn corrupt_envelopes_are_quarantined() {
    let dir = tempdir().unwrap();
    let q = queue(dir.path());
    q.push(&msg("good"), 1_000).unwrap();
    std::fs::write(dir.path().join("queue").join("zz-bad.json"), b"{nope").unwrap();

    let leased = q.dequeue(1_000).unwrap().unwrap();
    assert_eq!(leased.payload, msg("good"));
    // The bad file no longer counts as a message.
    assert_eq!(q.len().unwrap(), 1);
    assert!(dir.path().join("queue").join("zz-bad.corrupt").exists());
}
