//! Analysis pipeline tests
//!
//! Drive `AnalysisOrchestrator::submit` against scripted endpoint replies and
//! check the persisted record, emitted events and image handling.

mod helpers;

use borderline_ai::db::{analyses, configurations};
use borderline_ai::models::{
    AnalysisConfiguration, AnalysisStatus, ConfigurationDraft, MANUAL_REVIEW_REQUIRED,
};
use borderline_ai::services::{ChatRole, InferenceError, PipelineError};
use borderline_common::events::BorderlineEvent;
use helpers::*;

async fn activate(harness: &TestHarness, draft: serde_json::Value) -> AnalysisConfiguration {
    let draft: ConfigurationDraft = serde_json::from_value(draft).unwrap();
    let config = AnalysisConfiguration::from_draft(draft, Some("admin".to_string()));
    configurations::insert_configuration(&harness.db, &config).await.unwrap();
    configurations::set_active_configuration(&harness.db, config.id)
        .await
        .unwrap();
    config
}

#[tokio::test]
async fn test_structured_reply_completes_record() {
    let harness = TestHarness::new(ScriptedInference::replying(LED_STRIP_REPLY)).await;

    let submission = harness
        .orchestrator
        .submit("user-1", led_strip_request())
        .await
        .unwrap();

    assert!(submission.image_warning.is_none());
    let record = analyses::load_analysis(&harness.db, submission.record.id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.status, AnalysisStatus::Completed);
    assert!(record.completed_at.is_some());
    let result = record.result.unwrap();
    assert_eq!(result.hs_code, "8539.50");
    assert_eq!(result.tariff_rate, 6.5);
    assert_eq!(result.confidence, 0.82);
    assert_eq!(result.requirements.len(), 2);
    assert!(result.restrictions.is_empty());
    assert_eq!(result.documentation[1], "Canada Customs Invoice");
    assert_eq!(result.estimated_processing_time, "3-5 business days");
    assert_eq!(result.analysis_text, "LED light sources fall under heading 8539.");
}

#[tokio::test]
async fn test_prose_reply_completes_with_manual_review() {
    let harness = TestHarness::new(ScriptedInference::replying(
        "This product likely needs a closer look by a licensed broker.",
    ))
    .await;

    let submission = harness
        .orchestrator
        .submit("user-1", led_strip_request())
        .await
        .unwrap();

    assert_eq!(submission.record.status, AnalysisStatus::Completed);
    let record = analyses::load_analysis(&harness.db, submission.record.id)
        .await
        .unwrap()
        .unwrap();
    let result = record.result.unwrap();
    assert_eq!(result.hs_code, "Unknown");
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.requirements, vec![MANUAL_REVIEW_REQUIRED]);
}

#[tokio::test]
async fn test_network_error_marks_record_failed() {
    let harness = TestHarness::new(ScriptedInference::new(vec![
        Err(InferenceError::Network("connection refused".to_string())),
        Ok(LED_STRIP_REPLY.to_string()),
    ]))
    .await;

    let err = harness
        .orchestrator
        .submit("user-1", led_strip_request())
        .await
        .unwrap_err();

    let analysis_id = match err {
        PipelineError::Inference { analysis_id, message } => {
            assert!(message.contains("connection refused"));
            analysis_id
        }
        other => panic!("unexpected error: {other}"),
    };

    assert_eq!(harness.inference.requests().len(), 1);
    let record = analyses::load_analysis(&harness.db, analysis_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, AnalysisStatus::Failed);
    assert!(record.result.is_none());
    assert!(record.diagnostic.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_non_success_status_marks_record_failed() {
    let harness = TestHarness::new(ScriptedInference::failing(InferenceError::Api(
        401,
        "invalid api key".to_string(),
    )))
    .await;

    let err = harness
        .orchestrator
        .submit("user-1", led_strip_request())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Inference { ref message, .. } if message.contains("401")));
}

#[tokio::test]
async fn test_default_configuration_sends_single_user_message() {
    let harness = TestHarness::new(ScriptedInference::replying(LED_STRIP_REPLY)).await;
    harness
        .orchestrator
        .submit("user-1", led_strip_request())
        .await
        .unwrap();

    let requests = harness.inference.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "test-model");
    assert_eq!(requests[0].temperature, 0.3);
    assert_eq!(requests[0].max_tokens, 2000);
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].messages[0].role, ChatRole::User);
}

#[tokio::test]
async fn test_active_configuration_drives_request() {
    let harness = TestHarness::new(ScriptedInference::replying(LED_STRIP_REPLY)).await;
    activate(
        &harness,
        serde_json::json!({
            "name": "Canada electronics",
            "system_role": "You are a licensed Canadian customs broker.",
            "temperature": 0.1,
            "max_tokens": 1200,
            "category_instructions": { "Electronics": "Check CSA certification." }
        }),
    )
    .await;

    harness
        .orchestrator
        .submit("user-1", led_strip_request())
        .await
        .unwrap();

    let request = &harness.inference.requests()[0];
    assert_eq!(request.temperature, 0.1);
    assert_eq!(request.max_tokens, 1200);
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, ChatRole::System);
    assert!(request.messages[1]
        .content
        .starts_with("You are a licensed Canadian customs broker."));
    assert!(request.messages[1].content.contains("Check CSA certification."));
}

#[tokio::test]
async fn test_fallback_behavior_is_not_executed() {
    for fallback in ["retry", "simplify", "error"] {
        let harness = TestHarness::new(ScriptedInference::new(vec![
            Err(InferenceError::Api(503, "overloaded".to_string())),
            Ok(LED_STRIP_REPLY.to_string()),
        ]))
        .await;
        activate(
            &harness,
            serde_json::json!({ "name": fallback, "fallback_behavior": fallback }),
        )
        .await;

        let result = harness.orchestrator.submit("user-1", led_strip_request()).await;

        let Err(PipelineError::Inference { analysis_id, .. }) = result else {
            panic!("{fallback}: expected inference failure, got {result:?}");
        };
        assert_eq!(harness.inference.requests().len(), 1, "{fallback}");
        let record = analyses::load_analysis(&harness.db, analysis_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, AnalysisStatus::Failed, "{fallback}");
    }
}

#[tokio::test]
async fn test_image_is_uploaded_and_linked() {
    let harness = TestHarness::new(ScriptedInference::replying(LED_STRIP_REPLY)).await;
    let mut request = led_strip_request();
    request.image = Some(png_image(1024));

    let submission = harness.orchestrator.submit("user-1", request).await.unwrap();

    let image = submission.record.image.clone().unwrap();
    let id = submission.record.id;
    assert!(image.path.starts_with(&format!("user-1/{id}/{id}-")));
    assert!(image.path.ends_with(".png"));
    assert!(harness.store.contains(BUCKET, &image.path));

    let stored = analyses::load_analysis(&harness.db, id).await.unwrap().unwrap();
    assert_eq!(stored.image, Some(image));

    let prompt = &harness.inference.requests()[0].messages[0].content;
    assert!(prompt.contains("visual content cannot be interpreted"));
}

#[tokio::test]
async fn test_invalid_image_is_rejected_but_analysis_completes() {
    let harness = TestHarness::new(ScriptedInference::replying(LED_STRIP_REPLY)).await;
    let mut request = led_strip_request();
    request.image = Some(borderline_ai::models::ProductImage {
        file_name: Some("anim.gif".to_string()),
        content_type: "image/gif".to_string(),
        bytes: vec![1, 2, 3],
    });

    let submission = harness.orchestrator.submit("user-1", request).await.unwrap();

    assert_eq!(submission.record.status, AnalysisStatus::Completed);
    assert!(submission.image_warning.unwrap().contains("image/gif"));
    assert!(submission.record.image.is_none());
    assert!(harness.store.keys().is_empty());
}

#[tokio::test]
async fn test_upload_failure_is_not_fatal() {
    let harness = TestHarness::with_store(
        ScriptedInference::replying(LED_STRIP_REPLY),
        MemoryObjectStore::failing(),
    )
    .await;
    let mut request = led_strip_request();
    request.image = Some(png_image(64));

    let submission = harness.orchestrator.submit("user-1", request).await.unwrap();

    assert_eq!(submission.record.status, AnalysisStatus::Completed);
    assert!(submission.record.image.is_none());
    assert!(submission.image_warning.unwrap().contains("bucket unavailable"));
}

#[tokio::test]
async fn test_processing_write_failure_is_not_fatal() {
    let harness = TestHarness::new(ScriptedInference::replying(LED_STRIP_REPLY)).await;
    fail_updates_where(&harness.db, "reject_processing", "NEW.status = 'processing'").await;
    let mut rx = harness.event_bus.subscribe();

    let submission = harness
        .orchestrator
        .submit("user-1", led_strip_request())
        .await
        .unwrap();

    let record = analyses::load_analysis(&harness.db, submission.record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, AnalysisStatus::Completed);
    assert_eq!(record.result.unwrap().hs_code, "8539.50");

    let mut transitions = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let BorderlineEvent::AnalysisStatusChanged { old_status, new_status, .. } = event {
            transitions.push((old_status, new_status));
        }
    }
    assert_eq!(
        transitions,
        vec![(AnalysisStatus::Pending, AnalysisStatus::Completed)]
    );
}

#[tokio::test]
async fn test_image_link_failure_removes_upload_and_warns() {
    let harness = TestHarness::new(ScriptedInference::replying(LED_STRIP_REPLY)).await;
    fail_updates_where(
        &harness.db,
        "reject_image_link",
        "NEW.product_image_path IS NOT NULL AND OLD.product_image_path IS NULL",
    )
    .await;
    let mut request = led_strip_request();
    request.image = Some(png_image(256));

    let submission = harness.orchestrator.submit("user-1", request).await.unwrap();

    assert_eq!(submission.record.status, AnalysisStatus::Completed);
    assert!(submission.record.image.is_none());
    assert!(submission.image_warning.unwrap().contains("could not be linked"));
    assert!(harness.store.keys().is_empty());

    let record = analyses::load_analysis(&harness.db, submission.record.id)
        .await
        .unwrap()
        .unwrap();
    assert!(record.image.is_none());
    assert_eq!(record.status, AnalysisStatus::Completed);
}

#[tokio::test]
async fn test_result_write_failure_marks_record_failed() {
    let harness = TestHarness::new(ScriptedInference::replying(LED_STRIP_REPLY)).await;
    fail_updates_where(&harness.db, "reject_completion", "NEW.status = 'completed'").await;

    let result = harness.orchestrator.submit("user-1", led_strip_request()).await;

    assert!(matches!(result, Err(PipelineError::Persistence(_))));
    let records = harness.orchestrator.list_for_user("user-1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AnalysisStatus::Failed);
    assert!(records[0].result.is_none());
    assert!(records[0]
        .diagnostic
        .as_deref()
        .unwrap()
        .contains("Failed to store analysis result"));
}

#[tokio::test]
async fn test_insert_failure_is_fatal() {
    let harness = TestHarness::new(ScriptedInference::replying(LED_STRIP_REPLY)).await;
    harness.db.close().await;

    let result = harness.orchestrator.submit("user-1", led_strip_request()).await;

    assert!(matches!(result, Err(PipelineError::Persistence(_))));
    assert!(harness.inference.requests().is_empty());
}

#[tokio::test]
async fn test_events_follow_state_machine() {
    let harness = TestHarness::new(ScriptedInference::replying(LED_STRIP_REPLY)).await;
    let mut rx = harness.event_bus.subscribe();

    harness
        .orchestrator
        .submit("user-1", led_strip_request())
        .await
        .unwrap();

    let mut types = Vec::new();
    let mut transitions = Vec::new();
    while let Ok(event) = rx.try_recv() {
        types.push(event.event_type());
        if let BorderlineEvent::AnalysisStatusChanged { old_status, new_status, .. } = event {
            transitions.push((old_status, new_status));
        }
    }

    assert_eq!(
        types,
        vec![
            "AnalysisSubmitted",
            "AnalysisStatusChanged",
            "AnalysisStatusChanged",
            "AnalysisCompleted"
        ]
    );
    assert_eq!(
        transitions,
        vec![
            (AnalysisStatus::Pending, AnalysisStatus::Processing),
            (AnalysisStatus::Processing, AnalysisStatus::Completed),
        ]
    );
}

#[tokio::test]
async fn test_delete_removes_record_and_image() {
    let harness = TestHarness::new(ScriptedInference::replying(LED_STRIP_REPLY)).await;
    let mut request = led_strip_request();
    request.image = Some(png_image(16));
    let submission = harness.orchestrator.submit("user-1", request).await.unwrap();
    let id = submission.record.id;
    let path = submission.record.image.unwrap().path;

    let not_owner = harness.orchestrator.delete_analysis("user-2", id).await;
    assert!(matches!(not_owner, Err(borderline_common::Error::NotFound(_))));
    assert!(harness.store.contains(BUCKET, &path));

    harness.orchestrator.delete_analysis("user-1", id).await.unwrap();
    assert!(!harness.store.contains(BUCKET, &path));
    assert!(analyses::load_analysis(&harness.db, id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_submissions_are_independent() {
    let harness = TestHarness::new(ScriptedInference::new(vec![
        Ok(LED_STRIP_REPLY.to_string()),
        Ok(LED_STRIP_REPLY.to_string()),
        Ok(LED_STRIP_REPLY.to_string()),
    ]))
    .await;

    let (a, b, c) = tokio::join!(
        harness.orchestrator.submit("user-1", led_strip_request()),
        harness.orchestrator.submit("user-2", led_strip_request()),
        harness.orchestrator.submit("user-1", led_strip_request()),
    );

    for submission in [a, b, c] {
        assert_eq!(submission.unwrap().record.status, AnalysisStatus::Completed);
    }
    assert_eq!(harness.orchestrator.list_for_user("user-1").await.unwrap().len(), 2);
    assert_eq!(harness.orchestrator.list_for_user("user-2").await.unwrap().len(), 1);
}
