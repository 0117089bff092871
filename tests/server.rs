use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use timetable_solver::server::router;

async fn post_solve(body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/schedule/solve")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router(1).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn one_section(duration: u32) -> Value {
    json!({
        "sections": [
            { "id": "MATH-1", "durationMinutes": duration, "frequency": 1, "semester": "full",
              "instructor": "noether", "preferences": { "S1": 2.0, "S2": 1.0 } }
        ],
        "classrooms": [ { "id": "R1" } ],
        "timeslots": [ { "id": "S1", "time": "08:00" }, { "id": "S2", "time": "10:00" } ]
    })
}

#[tokio::test]
async fn solves_a_valid_request() {
    let (status, body) = post_solve(one_section(90)).await;
    assert_eq!(status, StatusCode::OK);

    let output: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(output["status"], "optimal");
    assert_eq!(output["objective"], 2.0);
    assert_eq!(output["placements"][0]["sectionId"], "MATH-1");
    assert_eq!(output["placements"][0]["slotId"], "S1");
    assert_eq!(output["timetable"]["columns"][0]["classroom"], "R1");
    assert_eq!(output["timetable"]["rows"][0]["time"], "08:00");
}

#[tokio::test]
async fn rejects_invalid_duration() {
    let (status, body) = post_solve(one_section(45)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body).unwrap().contains("duration 45 minutes"));
}

#[tokio::test]
async fn reports_infeasible_catalog() {
    let mut body = one_section(90);
    body["classrooms"] = json!([]);
    let (status, text) = post_solve(body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(String::from_utf8(text).unwrap().contains("infeasible"));
}

#[tokio::test]
async fn accepts_solver_options() {
    let mut body = one_section(90);
    body["options"] = json!({ "allowUnscheduled": true, "timeLimitSecs": 30.0 });
    let (status, _) = post_solve(body).await;
    assert_eq!(status, StatusCode::OK);
}
