mod support;

use std::sync::Arc;

use serde_json::json;
use support::StubHost;
use ticketing_plugin::rpc::{TicketBoardTool, TicketLinkTool, TicketSearchTool, TicketTool};
use ticketing_plugin::RpcTool;

#[tokio::test]
async fn unknown_actions_are_rejected_before_any_connection_is_opened() {
    let tool = TicketTool::new(Arc::new(StubHost::accepting()));
    let value = tool
        .call(json!({"action": "obliterate", "ticket_id": 1}))
        .await;
    assert_eq!(value["error"], "ValidationError");
    assert!(value["message"].as_str().is_some_and(|m| m.contains("obliterate")));
}

#[tokio::test]
async fn failing_project_checks_short_circuit() {
    let tool = TicketTool::new(Arc::new(StubHost::rejecting("project 'ghost' does not exist")));
    let value = tool.call(json!({"action": "get", "ticket_id": 1, "project": "ghost"})).await;
    assert_eq!(value["error"], "ValidationError");
    assert_eq!(
        value["message"],
        "validation error: project 'ghost' does not exist"
    );
}

#[tokio::test]
async fn update_refuses_status_and_type_keys() {
    let tool = TicketTool::new(Arc::new(StubHost::accepting()));

    let value = tool
        .call(json!({"action": "update", "ticket_id": 3, "status": "done"}))
        .await;
    assert_eq!(value["error"], "ValidationError");
    assert!(value["message"].as_str().is_some_and(|m| m.contains("move")));

    let value = tool
        .call(json!({"action": "update", "ticket_id": 3, "type": "bug"}))
        .await;
    assert_eq!(value["error"], "ValidationError");
}

#[tokio::test]
async fn missing_required_fields_are_validation_errors() {
    let tool = TicketTool::new(Arc::new(StubHost::accepting()));
    let value = tool.call(json!({"action": "create", "type": "task"})).await;
    assert_eq!(value["error"], "ValidationError");

    let search = TicketSearchTool::new(Arc::new(StubHost::accepting()));
    let value = search.call(json!({"type": "bug"})).await;
    assert_eq!(value["error"], "ValidationError");

    let link = TicketLinkTool::new(Arc::new(StubHost::accepting()));
    let value = link.call(json!({"action": "remove"})).await;
    assert_eq!(value["error"], "ValidationError");
}

#[tokio::test]
async fn well_formed_calls_reach_the_host_connection() {
    // The stub has no database, so a structurally valid call must surface
    // the acquire failure as an internal error envelope.
    let tool = TicketTool::new(Arc::new(StubHost::accepting()));
    let value = tool.call(json!({"action": "get", "ticket_id": 1})).await;
    assert_eq!(value["error"], "InternalError");
    assert!(value["message"]
        .as_str()
        .is_some_and(|m| m.contains("no database behind the stub host")));

    let board = TicketBoardTool::new(Arc::new(StubHost::accepting()));
    let value = board.call(json!({"view": "summary"})).await;
    assert_eq!(value["error"], "InternalError");
}

#[tokio::test]
async fn malformed_parameter_shapes_fail_to_parse() {
    let board = TicketBoardTool::new(Arc::new(StubHost::accepting()));
    let value = board.call(json!({"view": "calendar"})).await;
    assert_eq!(value["error"], "ValidationError");

    let link = TicketLinkTool::new(Arc::new(StubHost::accepting()));
    let value = link
        .call(json!({"action": "add", "ticket_id": "one", "target_id": 2}))
        .await;
    assert_eq!(value["error"], "ValidationError");
}

#[tokio::test]
async fn tool_names_are_canonical() {
    let host: Arc<StubHost> = Arc::new(StubHost::accepting());
    assert_eq!(TicketTool::new(host.clone()).name(), "ticket");
    assert_eq!(TicketBoardTool::new(host.clone()).name(), "ticket_board");
    assert_eq!(TicketSearchTool::new(host.clone()).name(), "ticket_search");
    assert_eq!(TicketLinkTool::new(host).name(), "ticket_link");
}
