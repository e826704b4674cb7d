use axum::http::StatusCode;
use serde_json::json;
use startdev_api::models::role::Role;

mod common;

const SUBMIT: &str = "/api/practicant/topics/t1/exercises/ex1/submit";

async fn practicant_app() -> (common::TestApp, String) {
    let app = common::create_test_app().await;
    app.backend.seed(
        "topics",
        common::topic_with_exercises(
            "t1",
            json!([
                {"id": 11, "documentId": "ex1", "name_exercise": "Hola", "expected_output": "Hola Mundo"},
                {"id": 12, "documentId": "ex2", "name_exercise": "Suma", "expected_output": "3"}
            ]),
        ),
    );
    let token = app
        .sign_in(Role::Practicant, 5, "p5", "eva@startdev.io")
        .await;
    (app, token)
}

fn seed_progress(app: &common::TestApp, value: u8) {
    app.backend.seed(
        "progresses",
        json!({
            "id": 50,
            "documentId": "prog1",
            "progress": value,
            "practicant": {"documentId": "p5"},
            "topic": {"documentId": "t1"}
        }),
    );
}

#[tokio::test]
async fn test_empty_code_is_rejected_before_running() {
    let (app, token) = practicant_app().await;

    let (status, body) = app
        .call("POST", SUBMIT, Some(&token), Some(json!({"code": "   \n"})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please write your code before submitting");
    assert_eq!(app.runner.calls(), 0);
    assert!(app.backend.requests_to("POST", "exercise-practs").is_empty());
}

#[tokio::test]
async fn test_correct_submission_records_attempt_and_caps_progress() {
    let (app, token) = practicant_app().await;
    seed_progress(&app, 90);
    app.runner.push_stdout("Hola Mundo\n");

    let (status, body) = app
        .call(
            "POST",
            SUBMIT,
            Some(&token),
            Some(json!({"code": "print('Hola Mundo')"})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "correct");
    assert_eq!(body["message"], "Excellent! Your solution is correct.");
    assert_eq!(body["attempt_recorded"], true);
    assert_eq!(body["progress_updated"], true);
    assert_eq!(body["progress"], json!({"previous": 90, "current": 100}));

    let sources = app.runner.sources.lock().unwrap().clone();
    assert_eq!(sources, vec!["print('Hola Mundo')".to_string()]);

    let attempts = app.backend.requests_to("POST", "exercise-practs");
    assert_eq!(attempts.len(), 1);
    let data = &attempts[0].body["data"];
    assert_eq!(data["isCorrectExercise"], true);
    assert_eq!(data["Status_Exercise"], "Completado");
    assert_eq!(data["attemps"], 1);
    assert_eq!(data["practicant"], json!({"connect": [{"documentId": "p5"}]}));
    assert_eq!(data["exercise"], json!({"connect": [{"documentId": "ex1"}]}));

    assert_eq!(app.backend.records("progresses")[0]["progress"], 100);
}

#[tokio::test]
async fn test_wrong_output_is_incorrect_without_progress() {
    let (app, token) = practicant_app().await;
    seed_progress(&app, 40);
    app.runner.push_stdout("hola mundo");

    let (status, body) = app
        .call("POST", SUBMIT, Some(&token), Some(json!({"code": "print('hola mundo')"})))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "incorrect");
    assert_eq!(
        body["message"],
        "The output does not match the expected one. Review your code."
    );
    assert_eq!(body["progress_updated"], false);
    assert!(app.backend.requests_to("PUT", "progresses").is_empty());
    assert_eq!(app.backend.records("progresses")[0]["progress"], 40);
}

#[tokio::test]
async fn test_runtime_error_records_failed_attempt() {
    let (app, token) = practicant_app().await;
    app.runner
        .push_stderr("Traceback (most recent call last):\nNameError: name 'x' is not defined");

    let (status, body) = app
        .call("POST", SUBMIT, Some(&token), Some(json!({"code": "print(x)"})))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "errored");
    assert_eq!(body["error_kind"], "runtime");
    assert_eq!(body["message"], "Error during execution");
    assert!(body["output"].as_str().unwrap().starts_with("Error:\n"));
    assert_eq!(body["attempt_recorded"], true);

    let attempts = app.backend.requests_to("POST", "exercise-practs");
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].body["data"]["isCorrectExercise"], false);
    assert_eq!(attempts[0].body["data"]["Status_Exercise"], "Pendiente");
}

#[tokio::test]
async fn test_runner_failure_records_nothing() {
    let (app, token) = practicant_app().await;
    app.runner.push_failure();

    let (status, body) = app
        .call("POST", SUBMIT, Some(&token), Some(json!({"code": "print(1)"})))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "errored");
    assert_eq!(body["error_kind"], "transport");
    assert_eq!(body["attempt_recorded"], false);
    assert!(body["output"]
        .as_str()
        .unwrap()
        .contains("Check your connection to the code runner"));
    assert!(app.backend.requests_to("POST", "exercise-practs").is_empty());
    assert!(app.backend.requests_to("PUT", "progresses").is_empty());
}

#[tokio::test]
async fn test_failed_increment_is_applied_on_next_bootstrap() {
    let (app, token) = practicant_app().await;
    seed_progress(&app, 0);
    app.backend.fail("PUT", "progresses");
    app.runner.push_stdout("Hola Mundo");

    let (status, body) = app
        .call("POST", SUBMIT, Some(&token), Some(json!({"code": "print('Hola Mundo')"})))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "correct");
    assert_eq!(body["attempt_recorded"], true);
    assert_eq!(body["progress_updated"], false);

    let (_, pending) = app
        .call("GET", "/api/practicant/topics/t1/progress", Some(&token), None)
        .await;
    assert_eq!(pending["progress"], 0);
    assert_eq!(pending["pending_increments"], 1);

    app.backend.heal("PUT", "progresses");
    let (status, applied) = app
        .call("GET", "/api/practicant/topics/t1/progress", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(applied["progress"], 20);
    assert_eq!(applied["pending_increments"], 0);
    assert_eq!(app.backend.records("progresses")[0]["progress"], 20);
}

#[tokio::test]
async fn test_exercise_state_follows_submissions() {
    let (app, token) = practicant_app().await;

    let (status, idle) = app
        .call("GET", "/api/practicant/exercises/ex1/state", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(idle["state"], "idle");

    app.runner.push_stdout("Hola");
    app.call("POST", SUBMIT, Some(&token), Some(json!({"code": "print('Hola')"})))
        .await;

    let (_, after) = app
        .call("GET", "/api/practicant/exercises/ex1/state", Some(&token), None)
        .await;
    assert_eq!(after["state"], "incorrect");
    assert_eq!(after["output"], "Hola");
}

#[tokio::test]
async fn test_state_is_shared_between_numeric_id_and_document_id() {
    let (app, token) = practicant_app().await;
    app.backend.seed(
        "exercises",
        json!({"id": 12, "documentId": "ex2", "name_exercise": "Suma", "expected_output": "3"}),
    );
    app.runner.push_stdout("3\n");

    let (status, body) = app
        .call(
            "POST",
            "/api/practicant/topics/t1/exercises/12/submit",
            Some(&token),
            Some(json!({"code": "print(1 + 2)"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "correct");

    let (_, by_document) = app
        .call("GET", "/api/practicant/exercises/ex2/state", Some(&token), None)
        .await;
    assert_eq!(by_document["state"], "correct");
    assert_eq!(by_document["exercise_id"], "ex2");

    let (status, by_number) = app
        .call("GET", "/api/practicant/exercises/12/state", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_number["state"], "correct");
    assert_eq!(by_number["exercise_id"], "ex2");
}

#[tokio::test]
async fn test_unknown_exercise_and_topic_are_not_found() {
    let (app, token) = practicant_app().await;

    let (status, _) = app
        .call(
            "POST",
            "/api/practicant/topics/t1/exercises/missing/submit",
            Some(&token),
            Some(json!({"code": "print(1)"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            "POST",
            "/api/practicant/topics/nope/exercises/ex1/submit",
            Some(&token),
            Some(json!({"code": "print(1)"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.runner.calls(), 0);
}

#[tokio::test]
async fn test_exercise_can_be_addressed_by_numeric_id() {
    let (app, token) = practicant_app().await;
    app.runner.push_stdout("3");

    let (status, body) = app
        .call(
            "POST",
            "/api/practicant/topics/t1/exercises/12/submit",
            Some(&token),
            Some(json!({"code": "print(1 + 2)"})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "correct");
    let attempts = app.backend.requests_to("POST", "exercise-practs");
    assert_eq!(
        attempts[0].body["data"]["exercise"],
        json!({"connect": [{"documentId": "ex2"}]})
    );
}

#[tokio::test]
async fn test_topic_detail_reflects_attempts() {
    let (app, token) = practicant_app().await;
    seed_progress(&app, 0);
    app.runner.push_stdout("Hola Mundo");
    app.call("POST", SUBMIT, Some(&token), Some(json!({"code": "print('Hola Mundo')"})))
        .await;

    let (status, detail) = app
        .call("GET", "/api/practicant/topics/t1", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["total_exercises"], 2);
    assert_eq!(detail["completed_exercises"], 1);
    assert_eq!(detail["progress"], 20);
    let cards = detail["exercises"].as_array().unwrap();
    assert_eq!(cards[0]["state"], "correct");
    assert_eq!(cards[0]["completed"], true);
    assert_eq!(cards[1]["state"], "idle");
}

#[tokio::test]
async fn test_practicant_routes_reject_administrators() {
    let app = common::create_test_app().await;
    let token = app
        .sign_in(Role::Administrator, 1, "a1", "admin@startdev.io")
        .await;

    let (status, _) = app
        .call("POST", SUBMIT, Some(&token), Some(json!({"code": "print(1)"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.runner.calls(), 0);
}
