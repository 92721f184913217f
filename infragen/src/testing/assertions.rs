//! Assertions over recorded progress events.

use crate::core::{ProgressEvent, ProgressPhase};

/// Asserts that `stages` each reported a start followed by exactly one
/// terminal event, in order, with no stage overlapping the next.
pub fn assert_lifecycle_order(events: &[ProgressEvent], stages: &[&str]) {
    let lifecycle: Vec<&ProgressEvent> = events.iter().filter(|e| e.phase.is_some()).collect();

    assert_eq!(
        lifecycle.len(),
        stages.len() * 2,
        "Expected {} lifecycle events, got {:?}",
        stages.len() * 2,
        lifecycle
    );

    for (i, stage) in stages.iter().enumerate() {
        let start = lifecycle[i * 2];
        let end = lifecycle[i * 2 + 1];
        assert_eq!(
            (start.stage.as_str(), start.phase),
            (*stage, Some(ProgressPhase::Started)),
            "Expected stage '{stage}' to start at position {}",
            i * 2
        );
        assert_eq!(end.stage, *stage, "Expected terminal event for '{stage}'");
        assert!(end.is_terminal(), "Expected '{stage}' to end with a terminal event");
    }
}

/// Asserts that no stage reported a start.
pub fn assert_no_stage_started(events: &[ProgressEvent]) {
    let started: Vec<&str> = events
        .iter()
        .filter(|e| e.phase == Some(ProgressPhase::Started))
        .map(|e| e.stage.as_str())
        .collect();
    assert!(started.is_empty(), "Expected no stage to start, got {started:?}");
}

/// Asserts that every stage reported at most one terminal event.
pub fn assert_single_terminal(events: &[ProgressEvent]) {
    let mut seen: Vec<&str> = Vec::new();
    for event in events.iter().filter(|e| e.is_terminal()) {
        assert!(
            !seen.contains(&event.stage.as_str()),
            "Stage '{}' reported more than one terminal event",
            event.stage
        );
        seen.push(&event.stage);
    }
}
