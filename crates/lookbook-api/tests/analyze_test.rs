//! Analysis endpoint integration tests.
//!
//! Run with: `cargo test -p lookbook-api --test analyze_test`
//! External collaborators are trait doubles; nothing leaves the process.

mod helpers;

use std::sync::atomic::Ordering;

use axum_test::multipart::{MultipartForm, Part};
use serde_json::Value;

use helpers::doubles::RecordingWardrobe;
use helpers::fixtures;
use helpers::{setup_test_app, TestApp, TestAppOptions};

fn png_part() -> Part {
    Part::bytes(fixtures::create_test_png())
        .file_name("tee.png")
        .mime_type("image/png")
}

fn analyze_form(user_id: Option<&str>) -> MultipartForm {
    let form = MultipartForm::new().add_part("image", png_part());
    match user_id {
        Some(user_id) => form.add_text("userId", user_id),
        None => form,
    }
}

fn external_call_count(app: &TestApp) -> usize {
    app.image_host.uploads.load(Ordering::SeqCst)
        + app
            .background_remover
            .as_ref()
            .map(|r| r.calls.load(Ordering::SeqCst))
            .unwrap_or(0)
        + app.vision.calls.load(Ordering::SeqCst)
        + app.wardrobe.records.lock().unwrap().len()
}

#[tokio::test]
async fn test_analyze_persists_detected_garment() {
    let app = setup_test_app(TestAppOptions::default());

    let response = app.client().post("/analyze").multipart(analyze_form(Some("user-1"))).await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["clothes"].as_array().unwrap().len(), 1);
    assert_eq!(body["clothes"][0]["type"], "t-shirt");
    assert_eq!(body["clothes"][0]["color"], "noir");
    // Season absent in the model reply is persisted as "all"
    assert_eq!(body["clothes"][0]["season"], "all");
    assert_eq!(body["failed"].as_array().unwrap().len(), 0);

    let records = app.wardrobe.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, "user-1");
    assert_eq!(records[0].season, "all");
    assert_eq!(records[0].suggested_brands, "nike,adidas,puma");
    // The persisted image URL is the re-hosted cleaned version
    assert_eq!(records[0].image_url, "https://img.test/1.jpg");
}

#[tokio::test]
async fn test_analyze_replaces_hosted_image_after_background_removal() {
    let app = setup_test_app(TestAppOptions::default());

    let response = app.client().post("/analyze").multipart(analyze_form(Some("user-1"))).await;
    assert_eq!(response.status_code(), 201);

    // Original upload + cleaned re-upload
    assert_eq!(app.image_host.uploads.load(Ordering::SeqCst), 2);
    // Superseded hosted image deleted exactly once
    let deletes = app.image_host.deletes.lock().unwrap();
    assert_eq!(deletes.as_slice(), ["img-0"]);
    assert_eq!(
        app.background_remover.as_ref().unwrap().calls.load(Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn test_analyze_without_background_removal_uploads_once() {
    let app = setup_test_app(TestAppOptions {
        with_background_remover: false,
        ..TestAppOptions::default()
    });

    let response = app.client().post("/analyze").multipart(analyze_form(Some("user-1"))).await;
    assert_eq!(response.status_code(), 201);

    assert_eq!(app.image_host.uploads.load(Ordering::SeqCst), 1);
    assert!(app.image_host.deletes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_analyze_rejects_missing_user_id_before_external_calls() {
    let app = setup_test_app(TestAppOptions::default());

    let response = app.client().post("/analyze").multipart(analyze_form(None)).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(external_call_count(&app), 0);
}

#[tokio::test]
async fn test_analyze_rejects_disallowed_extension_before_external_calls() {
    let app = setup_test_app(TestAppOptions::default());

    let form = MultipartForm::new()
        .add_text("userId", "user-1")
        .add_part(
            "image",
            Part::bytes(fixtures::create_test_png())
                .file_name("tee.gif")
                .mime_type("image/gif"),
        );
    let response = app.client().post("/analyze").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    assert_eq!(external_call_count(&app), 0);
    assert_eq!(app.temp_file_count(), 0);
}

#[tokio::test]
async fn test_analyze_rejects_empty_file() {
    let app = setup_test_app(TestAppOptions::default());

    let form = MultipartForm::new()
        .add_text("userId", "user-1")
        .add_part(
            "image",
            Part::bytes(Vec::<u8>::new())
                .file_name("tee.png")
                .mime_type("image/png"),
        );
    let response = app.client().post("/analyze").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    assert_eq!(external_call_count(&app), 0);
}

#[tokio::test]
async fn test_analyze_extracts_array_wrapped_in_prose() {
    let app = setup_test_app(TestAppOptions {
        vision_reply: format!("Here you go:\n{}\nThanks", fixtures::SINGLE_GARMENT_REPLY),
        ..TestAppOptions::default()
    });

    let response = app.client().post("/analyze").multipart(analyze_form(Some("user-1"))).await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["clothes"][0]["type"], "t-shirt");
}

#[tokio::test]
async fn test_analyze_fails_with_parse_error_on_prose_reply() {
    let app = setup_test_app(TestAppOptions {
        vision_reply: "I could not detect any clothing in this photo.".to_string(),
        ..TestAppOptions::default()
    });

    let response = app.client().post("/analyze").multipart(analyze_form(Some("user-1"))).await;

    assert_eq!(response.status_code(), 500);
    let body: Value = response.json();
    assert_eq!(body["code"], "PARSE_ERROR");
    // Nothing was persisted
    assert!(app.wardrobe.records.lock().unwrap().is_empty());
    // Temp file removed on the failure path too
    assert_eq!(app.temp_file_count(), 0);
}

#[tokio::test]
async fn test_analyze_skips_non_conforming_entries() {
    let reply = r#"[
      {"type":"t-shirt","color":"white","style":"casual"},
      {"note":"not a garment"},
      {"type":"jeans","color":"blue","style":"streetwear"}
    ]"#;
    let app = setup_test_app(TestAppOptions {
        vision_reply: reply.to_string(),
        ..TestAppOptions::default()
    });

    let response = app.client().post("/analyze").multipart(analyze_form(Some("user-1"))).await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["clothes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_analyze_reports_partial_persistence() {
    let app = setup_test_app(TestAppOptions {
        vision_reply: fixtures::THREE_GARMENT_REPLY.to_string(),
        wardrobe: RecordingWardrobe::failing_on("jeans"),
        ..TestAppOptions::default()
    });

    let response = app.client().post("/analyze").multipart(analyze_form(Some("user-1"))).await;

    // Per-item persistence failure never fails the request
    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let clothes = body["clothes"].as_array().unwrap();
    assert_eq!(clothes.len(), 2);
    assert_eq!(clothes[0]["type"], "t-shirt");
    assert_eq!(clothes[1]["type"], "sneakers");
    let failed = body["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["type"], "jeans");
}

#[tokio::test]
async fn test_analyze_surfaces_timeout_when_removal_polls_run_out() {
    let app = setup_test_app(TestAppOptions {
        background_removal_times_out: true,
        ..TestAppOptions::default()
    });

    let response = app.client().post("/analyze").multipart(analyze_form(Some("user-1"))).await;

    assert_eq!(response.status_code(), 504);
    let body: Value = response.json();
    assert_eq!(body["code"], "ANALYSIS_TIMEOUT");
    assert_eq!(app.vision.calls.load(Ordering::SeqCst), 0);
    assert_eq!(app.temp_file_count(), 0);
}

#[tokio::test]
async fn test_analyze_temp_file_removed_after_success() {
    let app = setup_test_app(TestAppOptions::default());

    let response = app.client().post("/analyze").multipart(analyze_form(Some("user-1"))).await;

    assert_eq!(response.status_code(), 201);
    assert_eq!(app.temp_file_count(), 0);
}

#[tokio::test]
async fn test_analyze_resubmission_creates_independent_records() {
    let app = setup_test_app(TestAppOptions::default());

    for _ in 0..2 {
        let response = app.client().post("/analyze").multipart(analyze_form(Some("user-1"))).await;
        assert_eq!(response.status_code(), 201);
    }

    // No deduplication: identical submissions each persist a fresh record
    assert_eq!(app.wardrobe.records.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_test_app(TestAppOptions::default());

    let response = app.client().get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}
