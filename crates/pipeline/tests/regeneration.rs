mod common;

use assert_matches::assert_matches;
use serde_json::{json, Value};

use mosaico_core::edit::SlotEditState;
use mosaico_core::error::CoreError;
use mosaico_core::ComponentType::{Body, Cta, Image};
use mosaico_gateway::messages::RefineOperation;
use mosaico_pipeline::WorkflowError;

use common::{one_section, open, project};

fn components() -> Value {
    json!([
        {"component_type": "body", "component_index": 1, "generated_content": "Old body one",
         "translations": {"it": "Vecchio corpo"}},
        {"component_type": "body", "component_index": 2, "generated_content": "Body two stays"},
        {"component_type": "cta", "component_index": 1, "generated_content": "SHOP NOW"}
    ])
}

fn structure() -> Value {
    one_section(&["body", "body", "cta"])
}

#[tokio::test]
async fn single_regenerate_is_isolated_and_cascades() {
    let (backend, workflow, ws) = open(project(structure(), components(), &["it"])).await;
    backend.push_variations(vec![
        &[("body", "old body one!")],
        &[("body", "A brand new first body")],
        &[("body", "Another option")],
    ]);

    let outcome = workflow.regenerate_single(&ws, Body, 1).await.unwrap();
    let update = outcome.data.unwrap();
    assert_eq!(update.content, "A brand new first body");
    assert!(update.cascaded);
    assert_eq!(update.translations["it"], "it:A brand new first body");

    let request = &backend.generate_calls()[0];
    assert_eq!(request.count, 3);
    assert!(!request.use_few_shot);
    assert!(request.text.contains("Old body one"));
    assert!(request.text.contains("Body two stays"));
    // Short content: base 0.7 + 0.2 + 0.1, clamped to 1.0.
    assert!((request.temperature - 1.0).abs() < 1e-9);

    let snap = ws.snapshot().await;
    assert_eq!(snap.registry.get(Body, 2).unwrap().generated_content, "Body two stays");
    assert!(snap.registry.get(Body, 2).unwrap().translations.is_empty());
    assert_eq!(snap.registry.get(Cta, 1).unwrap().generated_content, "SHOP NOW");
    assert_eq!(backend.translated_texts(), vec!["A brand new first body".to_string()]);
}

#[tokio::test]
async fn regenerating_middle_body_leaves_siblings_byte_identical() {
    let components = json!([
        {"component_type": "body", "component_index": 1, "generated_content": "First body",
         "translations": {"it": "Primo corpo", "fr": "Premier corps"}},
        {"component_type": "body", "component_index": 2, "generated_content": "Second body",
         "translations": {"it": "Secondo corpo", "fr": "Deuxième corps"}},
        {"component_type": "body", "component_index": 3, "generated_content": "Third body",
         "translations": {"it": "Terzo corpo", "fr": "Troisième corps"}}
    ]);
    let (backend, workflow, ws) = open(project(
        one_section(&["body", "body", "body"]),
        components,
        &["it", "fr"],
    ))
    .await;
    let before = ws.snapshot().await;
    backend.push_variations(vec![&[("body", "A rewritten middle body")]]);

    let update = workflow.regenerate_single(&ws, Body, 2).await.unwrap().data.unwrap();
    assert_eq!(update.content, "A rewritten middle body");
    assert_eq!(update.translations["it"], "it:A rewritten middle body");
    assert_eq!(update.translations["fr"], "fr:A rewritten middle body");

    let after = ws.snapshot().await;
    for index in [1, 3] {
        assert_eq!(
            after.registry.get(Body, index),
            before.registry.get(Body, index),
            "body {index} changed"
        );
    }
    assert_eq!(after.registry.get(Body, 1).unwrap().translations["fr"], "Premier corps");
    assert_eq!(after.registry.get(Body, 3).unwrap().translations["it"], "Terzo corpo");
    let mut sent = backend.translated_texts();
    sent.dedup();
    assert_eq!(sent, vec!["A rewritten middle body".to_string()]);
}

#[tokio::test]
async fn no_variation_leaves_record_unchanged() {
    let (backend, workflow, ws) = open(project(structure(), components(), &["it"])).await;
    backend.push_variations(vec![
        &[("body", "old body one")],
        &[("body", "OLD BODY ONE!")],
        &[("body", "Old   body, one.")],
    ]);
    let before = ws.snapshot().await;

    let result = workflow.regenerate_single(&ws, Body, 1).await;
    assert_matches!(
        result,
        Err(WorkflowError::Core(CoreError::NoVariation { index: 1, attempts: 3, .. }))
    );

    let after = ws.snapshot().await;
    assert_eq!(after.version, before.version);
    assert_eq!(after.registry, before.registry);
    assert_eq!(backend.translate_calls(), 0);
    assert!(ws.flush().await);
    assert_eq!(backend.save_count(), 0);
}

#[tokio::test]
async fn regeneration_waits_for_open_edit() {
    let (backend, workflow, ws) = open(project(structure(), components(), &[])).await;

    workflow.begin_edit(&ws, Body, 2).await.unwrap();
    let result = workflow.regenerate_single(&ws, Body, 2).await;
    assert_matches!(result, Err(WorkflowError::Core(CoreError::Conflict(_))));
    assert!(backend.generate_calls().is_empty());

    let cancelled = workflow.cancel_edit(&ws, Body, 2).await.unwrap().data.unwrap();
    assert_eq!(cancelled.state, SlotEditState::Viewing);

    backend.push_variation(&[("body", "Body two, rewritten")]);
    let outcome = workflow.regenerate_single(&ws, Body, 2).await.unwrap();
    let update = outcome.data.unwrap();
    assert_eq!(update.content, "Body two, rewritten");
    assert!(!update.cascaded);
}

#[tokio::test]
async fn draft_edit_saves_through_normalization() {
    let (backend, workflow, ws) = open(project(structure(), components(), &[])).await;

    let begun = workflow.begin_edit(&ws, Cta, 1).await.unwrap().data.unwrap();
    assert_eq!(begun.state, SlotEditState::Editing("SHOP NOW".into()));

    workflow.update_draft(&ws, Cta, 1, "buy today").await.unwrap();
    let saved = workflow.save_draft(&ws, Cta, 1).await.unwrap().data.unwrap();
    assert_eq!(saved.content, "BUY TODAY");
    assert!(!saved.cascaded);

    let snap = ws.snapshot().await;
    assert_eq!(snap.edit_state(Cta, 1), SlotEditState::Viewing);
    assert_eq!(backend.translate_calls(), 0);

    assert!(ws.flush().await);
    let saved = backend.last_save().unwrap();
    let cta = saved
        .components
        .iter()
        .find(|c| c.component_type == Cta)
        .unwrap();
    assert_eq!(cta.generated_content, "BUY TODAY");
}

#[tokio::test]
async fn saving_without_open_draft_is_a_conflict() {
    let (_backend, workflow, ws) = open(project(structure(), components(), &[])).await;

    assert_matches!(
        workflow.save_draft(&ws, Body, 1).await,
        Err(WorkflowError::Core(CoreError::Conflict(_)))
    );
    assert_matches!(
        workflow.update_draft(&ws, Body, 1, "text").await,
        Err(WorkflowError::Core(CoreError::Conflict(_)))
    );
}

#[tokio::test]
async fn direct_save_cascades_translation() {
    let (backend, workflow, ws) = open(project(structure(), components(), &["it"])).await;

    let update = workflow
        .save_edit(&ws, Body, 1, "Hand written copy")
        .await
        .unwrap()
        .data
        .unwrap();
    assert!(update.cascaded);
    assert_eq!(update.translations["it"], "it:Hand written copy");
    assert_eq!(backend.translate_calls(), 1);
}

#[tokio::test]
async fn failed_cascade_is_a_warning() {
    let (backend, workflow, ws) = open(project(structure(), components(), &["it"])).await;
    backend.fail_language("it");

    let outcome = workflow.save_edit(&ws, Body, 1, "New words").await.unwrap();
    assert!(outcome.success);
    let update = outcome.data.unwrap();
    assert_eq!(update.content, "New words");
    // The failed pair keeps the previous translation.
    assert_eq!(update.translations["it"], "Vecchio corpo");
    assert!(!outcome.warnings.is_empty());
}

#[tokio::test]
async fn image_slots_cannot_be_edited() {
    let (_backend, workflow, ws) = open(project(one_section(&["image"]), json!([]), &[])).await;

    assert_matches!(
        workflow.save_edit(&ws, Image, 1, "hero").await,
        Err(WorkflowError::Core(CoreError::Validation(_)))
    );
    assert_matches!(
        workflow.regenerate_single(&ws, Image, 1).await,
        Err(WorkflowError::Core(CoreError::Validation(_)))
    );
}

#[tokio::test]
async fn refine_writes_through_the_edit_path() {
    let (backend, workflow, ws) = open(project(structure(), components(), &[])).await;

    let update = workflow
        .refine(&ws, Cta, 1, RefineOperation::MakeCasual)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(update.content, "SHOP NOW (REFINED)");

    let requests = backend.refine_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].operation, RefineOperation::MakeCasual);
    assert_eq!(requests[0].text, "SHOP NOW");
}
