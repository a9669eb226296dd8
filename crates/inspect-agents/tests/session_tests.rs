//! Generator and reviewer sessions driven by a scripted model.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{memory_service, ScriptedLlm};
use inspect_agents::{AgentError, InspectionSession, ReviewSession, Role, MAX_TOOL_ROUNDS};
use inspect_core::{Status, Zone};
use inspect_store::FailureKind;
use serde_json::json;

fn reply(value: serde_json::Value) -> String {
    value.to_string()
}

// =============================================================================
// Generator
// =============================================================================

#[tokio::test]
async fn test_updates_merge_into_draft() {
    let llm = Arc::new(ScriptedLlm::new([reply(json!({
        "message": "Serial 1234 noted. How are the tires?",
        "updates": {
            "header": { "serial_number": "1234", "inspector": "Dana" },
            "sections": { "GROUND": { "fuel_tank": { "status": "YELLOW", "comments": "seeping at cap" } } },
            "confidence": 0.8
        }
    }))]));
    let mut session = InspectionSession::new(llm.clone(), memory_service());

    let turn = session.handle("serial one two three four, inspector Dana").await.unwrap();
    assert_eq!(turn.message, "Serial 1234 noted. How are the tires?");
    assert!(turn.saved.is_none());

    let draft = session.draft();
    assert_eq!(draft["header"]["serial_number"], json!("1234"));
    assert_eq!(draft["sections"]["GROUND"]["fuel_tank"]["status"], json!("YELLOW"));
    assert_eq!(draft["sections"]["GROUND"]["air_tank"]["status"], json!("GREEN"));
    assert!(draft.get("confidence").is_none());

    // The draft is what the model sees on the next turn.
    assert!(llm.last_system().contains("tires_wheels_stem_caps_lug_nuts"));
}

#[tokio::test]
async fn test_later_turns_keep_earlier_fields() {
    let llm = Arc::new(ScriptedLlm::new([
        reply(json!({ "message": "ok", "updates": { "header": { "serial_number": "1234" } } })),
        reply(json!({ "message": "ok", "updates": { "sections": { "ENGINE": { "radiator": { "status": "RED", "comments": "cracked" } } } } })),
    ]));
    let mut session = InspectionSession::new(llm, memory_service());

    session.handle("serial 1234").await.unwrap();
    session.handle("radiator is cracked").await.unwrap();

    assert_eq!(session.draft()["header"]["serial_number"], json!("1234"));
    assert_eq!(session.draft()["sections"]["ENGINE"]["radiator"]["status"], json!("RED"));
}

#[tokio::test]
async fn test_save_report_tool_persists_and_resets() {
    let llm = Arc::new(ScriptedLlm::new([
        reply(json!({
            "message": "Saving the inspection.",
            "updates": {
                "header": { "serial_number": "1234" },
                "sections": { "GROUND": { "tires_wheels_stem_caps_lug_nuts": { "status": "RED", "comments": "cut sidewall" } } },
                "general_comments": "ok",
                "primary_status": "RED"
            },
            "tool": { "name": "save_report" }
        })),
        reply(json!({ "message": "Inspection saved. Ready for the next machine." })),
    ]));
    let reports = memory_service();
    let mut session = InspectionSession::new(llm.clone(), reports.clone());

    let turn = session.handle("done").await.unwrap();
    assert_eq!(turn.message, "Inspection saved. Ready for the next machine.");
    let receipt = turn.saved.unwrap().into_result().unwrap();
    assert_eq!(receipt.serial_number, "1234");

    // The model saw the tool result before answering.
    let second = llm.last_request();
    let last = second.last().unwrap();
    assert_eq!(last.role, Role::User);
    assert!(last.text.starts_with("TOOL_RESULT save_report"));
    assert!(last.text.contains(&receipt.report_id));

    let stored = reports.latest("1234").into_result().unwrap().report;
    assert_eq!(stored.primary_status, Status::Red);
    assert_eq!(
        stored.component(Zone::Ground, "tires_wheels_stem_caps_lug_nuts").unwrap().status,
        Status::Red
    );

    assert_eq!(session.completed(), 1);
    assert!(session.history().is_empty());
    assert!(session.draft()["header"]["serial_number"].is_null());
}

#[tokio::test]
async fn test_save_survives_model_failure_afterwards() {
    // Only the save reply is scripted; the follow-up call fails.
    let llm = Arc::new(ScriptedLlm::new([reply(json!({
        "message": "Saving.",
        "updates": {
            "header": { "serial_number": "1234" },
            "general_comments": "ok",
            "primary_status": "GREEN"
        },
        "tool": { "name": "save_report" }
    }))]));
    let reports = memory_service();
    let mut session = InspectionSession::new(llm.clone(), reports.clone());

    let turn = session.handle("save it").await.unwrap();
    assert_eq!(turn.message, "Inspection report saved.");
    let receipt = turn.saved.unwrap().into_result().unwrap();
    assert_eq!(session.completed(), 1);
    assert!(session.history().is_empty());
    assert!(session.draft()["header"]["serial_number"].is_null());

    let history = reports.history("1234").into_result().unwrap();
    assert_eq!(history.reports.len(), 1);
    let updates = BTreeMap::from([("general_comments".to_string(), json!("patched"))]);
    assert!(reports.update("1234", &receipt.timestamp, &updates).is_success());
}

#[tokio::test]
async fn test_spoken_status_phrases_are_normalized() {
    let llm = Arc::new(ScriptedLlm::new([reply(json!({
        "message": "Noted.",
        "updates": {
            "sections": { "ENGINE": { "radiator": { "status": "Leaking", "comments": "bottom seam" } } },
            "primary_status": "monitor"
        }
    }))]));
    let mut session = InspectionSession::new(llm, memory_service());

    session.handle("radiator is leaking at the bottom seam").await.unwrap();
    assert_eq!(session.draft()["sections"]["ENGINE"]["radiator"]["status"], json!("RED"));
    assert_eq!(session.draft()["primary_status"], json!("YELLOW"));
}

#[tokio::test]
async fn test_failed_save_keeps_draft_and_reports_reason() {
    let llm = Arc::new(ScriptedLlm::new([
        reply(json!({
            "message": "Saving.",
            "updates": { "header": { "serial_number": "1234" }, "general_comments": "ok" },
            "tool": { "name": "save_report" }
        })),
        reply(json!({ "message": "What is the overall status?" })),
    ]));
    let mut session = InspectionSession::new(llm.clone(), memory_service());

    let turn = session.handle("finished").await.unwrap();
    let saved = turn.saved.unwrap();
    assert_eq!(saved.kind(), Some(FailureKind::Validation));
    assert!(saved.error().unwrap().contains("primary_status"));
    assert_eq!(turn.message, "What is the overall status?");

    assert!(llm.last_request().last().unwrap().text.contains("primary_status"));
    assert_eq!(session.completed(), 0);
    assert_eq!(session.draft()["header"]["serial_number"], json!("1234"));
}

#[tokio::test]
async fn test_tool_rounds_are_capped() {
    let looping = reply(json!({ "message": "again", "tool": { "name": "save_report" } }));
    let llm = Arc::new(ScriptedLlm::new(vec![looping; MAX_TOOL_ROUNDS + 3]));
    let mut session = InspectionSession::new(llm.clone(), memory_service());

    let turn = session.handle("done").await.unwrap();
    assert_eq!(turn.message, "again");
    assert_eq!(llm.calls(), MAX_TOOL_ROUNDS + 1);
}

#[tokio::test]
async fn test_generator_refuses_reviewer_tools() {
    let llm = Arc::new(ScriptedLlm::new([
        reply(json!({ "message": "", "tool": { "name": "fetch_history", "serial_number": "1234" } })),
        reply(json!({ "message": "I can only record the current inspection." })),
    ]));
    let mut session = InspectionSession::new(llm.clone(), memory_service());

    let turn = session.handle("what did the last inspection say?").await.unwrap();
    assert_eq!(turn.message, "I can only record the current inspection.");
    assert!(llm.last_request().last().unwrap().text.contains("not available"));
}

#[tokio::test]
async fn test_plain_text_reply_is_passed_through() {
    let llm = Arc::new(ScriptedLlm::new(["What is the serial number?"]));
    let mut session = InspectionSession::new(llm, memory_service());

    let turn = session.handle("hello").await.unwrap();
    assert_eq!(turn.message, "What is the serial number?");
    assert!(session.draft()["header"]["serial_number"].is_null());
}

#[tokio::test]
async fn test_llm_failure_propagates() {
    let llm = Arc::new(ScriptedLlm::new(Vec::<String>::new()));
    let mut session = InspectionSession::new(llm, memory_service());

    let err = session.handle("hello").await.unwrap_err();
    assert!(matches!(err, AgentError::EmptyResponse));
}

// =============================================================================
// Reviewer
// =============================================================================

fn seed(reports: &inspect_store::ReportService) -> String {
    let mut doc = inspect_core::report_template();
    doc["header"]["serial_number"] = json!("1234");
    doc["sections"]["GROUND"]["tires_wheels_stem_caps_lug_nuts"] =
        json!({ "status": "YELLOW", "comments": "tread worn" });
    doc["primary_status"] = json!("YELLOW");
    doc["general_comments"] = json!("monitor tires");
    reports.save(&doc).into_result().unwrap().timestamp
}

#[tokio::test]
async fn test_reviewer_fetches_history() {
    let reports = memory_service();
    seed(&reports);
    let llm = Arc::new(ScriptedLlm::new([
        reply(json!({ "message": "", "tool": { "name": "fetch_history", "serial_number": "1234" } })),
        reply(json!({ "message": "The tires were YELLOW on the last inspection." })),
    ]));
    let mut session = ReviewSession::new(llm.clone(), reports);

    let turn = session.handle("how are the tires on 1234 trending?").await.unwrap();
    assert_eq!(turn.analysis, "The tires were YELLOW on the last inspection.");
    assert_eq!(turn.tools_used, vec!["fetch_history"]);

    let fed_back = llm.last_request().last().unwrap().text.clone();
    assert!(fed_back.starts_with("TOOL_RESULT fetch_history"));
    assert!(fed_back.contains("tread worn"));
}

#[tokio::test]
async fn test_reviewer_updates_report() {
    let reports = memory_service();
    let timestamp = seed(&reports);
    let llm = Arc::new(ScriptedLlm::new([
        reply(json!({ "message": "", "tool": {
            "name": "update_report",
            "serial_number": "1234",
            "timestamp": timestamp,
            "updates": {
                "sections.GROUND.tires_wheels_stem_caps_lug_nuts.status": "GREEN",
                "sections.GROUND.tires_wheels_stem_caps_lug_nuts.comments": "tires replaced"
            }
        } })),
        reply(json!({ "message": "Updated the tire status to GREEN." })),
    ]));
    let mut session = ReviewSession::new(llm, reports.clone());

    let turn = session.handle("tires were replaced, mark them green").await.unwrap();
    assert_eq!(turn.tools_used, vec!["update_report"]);

    let stored = reports.latest("1234").into_result().unwrap().report;
    let tires = stored.component(Zone::Ground, "tires_wheels_stem_caps_lug_nuts").unwrap();
    assert_eq!(tires.status, Status::Green);
    assert_eq!(tires.comments, "tires replaced");
}

#[tokio::test]
async fn test_reviewer_update_not_found_is_fed_back() {
    let llm = Arc::new(ScriptedLlm::new([
        reply(json!({ "message": "", "tool": {
            "name": "update_report",
            "serial_number": "9999",
            "timestamp": "2026-01-01T00:00:00.000000Z",
            "updates": { "general_comments": "x" }
        } })),
        reply(json!({ "message": "I couldn't find that report." })),
    ]));
    let mut session = ReviewSession::new(llm.clone(), memory_service());

    let turn = session.handle("fix report 9999").await.unwrap();
    assert_eq!(turn.analysis, "I couldn't find that report.");
    assert!(llm.last_request().last().unwrap().text.contains("\"kind\":\"not_found\""));
}
