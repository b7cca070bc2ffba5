use super::*;
use serde_json::json;

fn plan_and_spec() -> BTreeSet<String> {
    expecting([PLAN_GENERATED, SPEC_GENERATED])
}

#[test]
fn single_marker_found() {
    let event = parse("Plan ready. [PLAN_GENERATED]", &plan_and_spec());
    assert_eq!(
        event,
        ParsedEvent::MarkerFound {
            marker: PLAN_GENERATED.to_string(),
            payload: None,
        }
    );
}

#[test]
fn marker_in_the_middle_of_prose() {
    let event = parse(
        "Here is the outline...\n[PLAN_GENERATED]\nLet me know what you think.",
        &plan_and_spec(),
    );
    assert_eq!(event.marker(), Some(PLAN_GENERATED));
}

#[test]
fn no_marker() {
    let event = parse("Still thinking about the approach.", &plan_and_spec());
    assert_eq!(event, ParsedEvent::NoMarker);
}

#[test]
fn unexpected_marker_is_ignored() {
    // TASK_COMPLETE is a real marker, but not expected in this state.
    let event = parse("[TASK_COMPLETE]", &plan_and_spec());
    assert_eq!(event, ParsedEvent::NoMarker);
}

#[test]
fn markdown_brackets_do_not_match() {
    let event = parse(
        "- [x] done\nSee [the docs](https://example.com).",
        &plan_and_spec(),
    );
    assert_eq!(event, ParsedEvent::NoMarker);
}

#[test]
fn whitespace_inside_brackets_tolerated() {
    let event = parse("[ PLAN_GENERATED ]", &plan_and_spec());
    assert_eq!(event.marker(), Some(PLAN_GENERATED));
}

#[test]
fn case_insensitive_name_reported_canonically() {
    let event = parse("[plan_generated]", &plan_and_spec());
    assert_eq!(event.marker(), Some(PLAN_GENERATED));
}

#[test]
fn exact_name_required() {
    let event = parse("[PLAN_GENERATED_V2] [PLANGENERATED]", &plan_and_spec());
    assert_eq!(event, ParsedEvent::NoMarker);
}

#[test]
fn last_of_two_distinct_markers_wins() {
    let text = "First [PLAN_GENERATED] and later [SPEC_GENERATED].";
    let event = parse(text, &plan_and_spec());
    match event {
        ParsedEvent::AmbiguousMarkers { markers, winner, .. } => {
            assert_eq!(markers, vec![PLAN_GENERATED, SPEC_GENERATED]);
            assert_eq!(winner, SPEC_GENERATED);
        }
        other => panic!("expected AmbiguousMarkers, got {:?}", other),
    }
}

#[test]
fn ambiguity_winner_is_positional_not_declaration_order() {
    let text = "[SPEC_GENERATED] ... restating: [PLAN_GENERATED]";
    let event = parse(text, &plan_and_spec());
    assert_eq!(event.marker(), Some(PLAN_GENERATED));
}

#[test]
fn repeated_same_marker_is_not_ambiguous() {
    let text = "[PLAN_GENERATED] as I said, [PLAN_GENERATED]";
    let event = parse(text, &plan_and_spec());
    assert!(matches!(event, ParsedEvent::MarkerFound { .. }));
    assert_eq!(event.marker(), Some(PLAN_GENERATED));
}

#[test]
fn json_payload_after_marker() {
    let text = "Done.\n[PLAN_GENERATED]\n```json\n{\"tasks\": [{\"id\": \"1\"}]}\n```\n";
    let event = parse(text, &plan_and_spec());
    let payload = event.payload().expect("payload");
    assert_eq!(
        payload.as_json().unwrap(),
        &json!({"tasks": [{"id": "1"}]})
    );
}

#[test]
fn untagged_fence_accepted() {
    let text = "[PLAN_GENERATED]\n```\n{\"tasks\": []}\n```";
    let event = parse(text, &plan_and_spec());
    assert_eq!(event.payload().unwrap().as_json().unwrap(), &json!({"tasks": []}));
}

#[test]
fn invalid_json_degrades_to_raw() {
    let text = "[PLAN_GENERATED]\n```json\n{not json at all\n```";
    let event = parse(text, &plan_and_spec());
    match event.payload() {
        Some(Payload::Raw(raw)) => assert_eq!(raw, "{not json at all"),
        other => panic!("expected raw payload, got {:?}", other),
    }
}

#[test]
fn payload_must_immediately_follow_marker() {
    let text = "[PLAN_GENERATED]\nSome narration first.\n```json\n{\"a\": 1}\n```";
    let event = parse(text, &plan_and_spec());
    assert!(event.payload().is_none());
}

#[test]
fn unterminated_fence_is_no_payload() {
    let text = "[PLAN_GENERATED]\n```json\n{\"a\": 1}";
    let event = parse(text, &plan_and_spec());
    assert!(event.payload().is_none());
}

#[test]
fn payload_attaches_to_last_occurrence() {
    let text = concat!(
        "[PLAN_GENERATED]\n```json\n{\"version\": 1}\n```\n",
        "Revised:\n[PLAN_GENERATED]\n```json\n{\"version\": 2}\n```\n",
    );
    let event = parse(text, &plan_and_spec());
    assert_eq!(
        event.payload().unwrap().as_json().unwrap(),
        &json!({"version": 2})
    );
}

#[test]
fn ambiguous_markers_carry_winner_payload() {
    let text = "[PLAN_GENERATED]\n[SPEC_GENERATED]\n```json\n{\"tasks\": [1]}\n```";
    let event = parse(text, &plan_and_spec());
    match event {
        ParsedEvent::AmbiguousMarkers { winner, payload, .. } => {
            assert_eq!(winner, SPEC_GENERATED);
            assert_eq!(payload.unwrap().as_json().unwrap(), &json!({"tasks": [1]}));
        }
        other => panic!("expected AmbiguousMarkers, got {:?}", other),
    }
}

#[test]
fn empty_expected_set_never_matches() {
    let event = parse("[PLAN_GENERATED]", &BTreeSet::new());
    assert_eq!(event, ParsedEvent::NoMarker);
}

#[test]
fn event_serde_round_trip() {
    let event = ParsedEvent::MarkerFound {
        marker: TASK_COMPLETE.to_string(),
        payload: Some(Payload::Json(json!({"ok": true}))),
    };
    let line = serde_json::to_string(&event).unwrap();
    assert!(line.contains("\"type\":\"marker_found\""));
    let back: ParsedEvent = serde_json::from_str(&line).unwrap();
    assert_eq!(back, event);

    let line = serde_json::to_string(&ParsedEvent::NoMarker).unwrap();
    assert!(line.contains("\"type\":\"no_marker\""));
}
