use crate::control::queue::{Priority, TaskQueue};

#[test]
fn test_pop_returns_highest_priority() {
    let mut queue = TaskQueue::new();
    queue.insert(Priority::FrameLatency, "latency");
    queue.insert(Priority::SetPoseAndSpeed, "pose");
    queue.insert(Priority::EnableServos, "enable");

    assert_eq!(queue.pop(), Some((Priority::SetPoseAndSpeed, "pose")));
    assert_eq!(queue.pop(), Some((Priority::EnableServos, "enable")));
    assert_eq!(queue.pop(), Some((Priority::FrameLatency, "latency")));
    assert_eq!(queue.pop(), None);
}

#[test]
fn test_insert_replaces_same_priority() {
    let mut queue = TaskQueue::new();
    assert!(!queue.insert(Priority::SetPoseAndSpeed, "first"));
    assert!(queue.insert(Priority::SetPoseAndSpeed, "second"));
    assert!(queue.insert(Priority::SetPoseAndSpeed, "third"));

    assert_eq!(queue.len(), 1);
    assert_eq!(queue.pop(), Some((Priority::SetPoseAndSpeed, "third")));
    assert!(queue.is_empty());
}

#[test]
fn test_at_most_one_task_per_level() {
    let mut queue = TaskQueue::new();
    queue.insert(Priority::SetMode, 1);
    queue.insert(Priority::ResetErrors, 2);
    queue.insert(Priority::SetMode, 3);
    queue.insert(Priority::ResetErrors, 4);

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.pop(), Some((Priority::ResetErrors, 4)));
    assert_eq!(queue.pop(), Some((Priority::SetMode, 3)));
}

#[test]
fn test_contains_tracks_slots() {
    let mut queue = TaskQueue::new();
    assert!(!queue.contains(Priority::EnableServos));
    queue.insert(Priority::EnableServos, ());
    assert!(queue.contains(Priority::EnableServos));
    queue.pop();
    assert!(!queue.contains(Priority::EnableServos));
}

#[test]
fn test_empty_queue() {
    let mut queue: TaskQueue<u8> = TaskQueue::new();
    assert!(queue.is_empty());
    assert_eq!(queue.len(), 0);
    assert_eq!(queue.pop(), None);
}
