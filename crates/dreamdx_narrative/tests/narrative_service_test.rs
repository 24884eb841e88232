//! Behaviour of the narrative service against a scripted generator.

mod test_utils;

use dreamdx_core::{DreamCommand, DreamReply, DreamRequest, NarrativeKey, RequestContext};
use dreamdx_error::{DreamErrorKind, GenerationErrorKind, NarrativeErrorKind};
use dreamdx_interface::NarrativeStore;
use dreamdx_narrative::{
    CONTINUATION_PROMPT_TEMPLATE, DeleteMode, GenerationSettings, NarrativeService,
};
use dreamdx_storage::InMemoryNarrativeStore;
use std::sync::Arc;
use test_utils::ScriptedDriver;

fn service_with(driver: ScriptedDriver) -> (NarrativeService, Arc<ScriptedDriver>, InMemoryNarrativeStore) {
    let driver = Arc::new(driver);
    let store = InMemoryNarrativeStore::new();
    let service = NarrativeService::new(driver.clone(), Arc::new(store.clone()));
    (service, driver, store)
}

fn narrative_kind(err: &dreamdx_error::DreamError) -> Option<&NarrativeErrorKind> {
    match err.kind() {
        DreamErrorKind::Narrative(e) => Some(&e.kind),
        _ => None,
    }
}

#[tokio::test]
async fn test_start_then_continue_grows_story() {
    let (service, driver, _) = service_with(
        ScriptedDriver::new()
            .reply("  Tall pines sway around you.  ")
            .reply("A river blocks the path."),
    );
    let ctx = RequestContext::anonymous();
    let key = NarrativeKey::new("alice", "dream1");

    let started = service.start(&ctx, &key, "a forest").await.unwrap();
    assert_eq!(
        started.descriptions(),
        vec!["You open your eyes, this is the first thing that you see...\n\nTall pines sway around you.\n"]
    );
    assert!(started.actions().is_empty());
    assert!(driver.prompts()[0].contains("narrative:\na forest\n"));

    let continued = service
        .continue_narrative(&ctx, &key, "walk north")
        .await
        .unwrap();
    assert_eq!(continued.descriptions().len(), 2);
    assert_eq!(continued.actions(), vec!["walk north"]);
    assert_eq!(continued.latest_description(), "A river blocks the path.");

    let second_prompt = &driver.prompts()[1];
    assert!(second_prompt.starts_with("You open your eyes"));
    assert!(second_prompt.contains("\nUser action: walk north\n\n"));
    assert!(second_prompt.ends_with(CONTINUATION_PROMPT_TEMPLATE));
    assert_eq!(continued.prompt(), second_prompt);
}

#[tokio::test]
async fn test_duplicate_start_is_rejected_without_generation() {
    let (service, driver, store) = service_with(ScriptedDriver::new());
    let ctx = RequestContext::anonymous();
    let key = NarrativeKey::new("alice", "dream1");

    service.start(&ctx, &key, "a forest").await.unwrap();

    for _ in 0..2 {
        let err = service.start(&ctx, &key, "a desert").await.unwrap_err();
        assert!(matches!(
            narrative_kind(&err),
            Some(NarrativeErrorKind::DuplicateSession { .. })
        ));
    }

    assert_eq!(driver.calls(), 1);
    assert_eq!(store.len().await, 1);
    let kept = store.get(&key).await.unwrap().unwrap();
    assert!(kept.descriptions()[0].contains("Scene 1"));
}

#[tokio::test]
async fn test_continue_unknown_session_is_not_found() {
    let (service, driver, _) = service_with(ScriptedDriver::new());
    let err = service
        .continue_narrative(
            &RequestContext::anonymous(),
            &NarrativeKey::new("alice", "nowhere"),
            "look around",
        )
        .await
        .unwrap_err();

    assert!(matches!(
        narrative_kind(&err),
        Some(NarrativeErrorKind::SessionNotFound { .. })
    ));
    assert_eq!(err.public_message(), "Session not found.");
    assert_eq!(driver.calls(), 0);
}

#[tokio::test]
async fn test_actions_and_entries_follow_call_order() {
    let (service, _, _) = service_with(ScriptedDriver::new());
    let ctx = RequestContext::anonymous();
    let key = NarrativeKey::new("alice", "dream1");
    service.start(&ctx, &key, "a city").await.unwrap();

    let actions = ["open the door", "climb stairs", "look outside", "jump"];
    let mut record = None;
    for action in actions {
        record = Some(service.continue_narrative(&ctx, &key, action).await.unwrap());
    }
    let record = record.unwrap();

    assert_eq!(record.actions(), actions.to_vec());
    assert_eq!(record.entries().len(), 1 + 2 * actions.len());
    let sequences: Vec<u64> = record.entries().iter().map(|e| *e.sequence()).collect();
    assert_eq!(sequences, (0..9).collect::<Vec<u64>>());
    assert_eq!(record.latest_description(), "Scene 5");
}

#[tokio::test]
async fn test_generation_failure_leaves_store_untouched() {
    let (service, _, store) = service_with(
        ScriptedDriver::new().reply("Opening").fail(GenerationErrorKind::Api {
            status: 500,
            message: "overloaded".to_string(),
        }),
    );
    let ctx = RequestContext::anonymous();
    let key = NarrativeKey::new("alice", "dream1");
    service.start(&ctx, &key, "a forest").await.unwrap();

    let err = service
        .continue_narrative(&ctx, &key, "run")
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), DreamErrorKind::Generation(_)));

    let stored = store.get(&key).await.unwrap().unwrap();
    assert!(stored.actions().is_empty());
}

#[tokio::test]
async fn test_blank_generation_is_a_failure() {
    let (service, _, store) = service_with(ScriptedDriver::new().reply("   \n"));
    let err = service
        .start(
            &RequestContext::anonymous(),
            &NarrativeKey::new("alice", "dream1"),
            "a forest",
        )
        .await
        .unwrap_err();

    match err.kind() {
        DreamErrorKind::Generation(e) => assert_eq!(e.kind, GenerationErrorKind::EmptyResponse),
        other => panic!("unexpected error: {}", other),
    }
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_blank_inputs_are_malformed() {
    let (service, driver, _) = service_with(ScriptedDriver::new());
    let ctx = RequestContext::anonymous();

    let blank_seed = service
        .start(&ctx, &NarrativeKey::new("alice", "dream1"), "  ")
        .await
        .unwrap_err();
    let blank_user = service.list(&ctx, "").await.unwrap_err();
    let blank_action = service
        .continue_narrative(&ctx, &NarrativeKey::new("alice", "dream1"), "")
        .await
        .unwrap_err();

    for err in [blank_seed, blank_user, blank_action] {
        assert!(matches!(
            narrative_kind(&err),
            Some(NarrativeErrorKind::MalformedRequest(_))
        ));
    }
    assert_eq!(driver.calls(), 0);
}

#[tokio::test]
async fn test_list_is_sorted_and_scoped_to_user() {
    let (service, _, _) = service_with(ScriptedDriver::new());
    let ctx = RequestContext::anonymous();
    for (user, session) in [("alice", "zeta"), ("bob", "beta"), ("alice", "alpha")] {
        service
            .start(&ctx, &NarrativeKey::new(user, session), "seed")
            .await
            .unwrap();
    }

    let sessions: Vec<String> = service
        .list(&ctx, "alice")
        .await
        .unwrap()
        .iter()
        .map(|r| r.session_id().clone())
        .collect();
    assert_eq!(sessions, vec!["alpha".to_string(), "zeta".to_string()]);
}

#[tokio::test]
async fn test_hard_delete_removes_from_list() {
    let (service, _, store) = service_with(ScriptedDriver::new());
    let ctx = RequestContext::anonymous();
    let key = NarrativeKey::new("alice", "dream1");
    service.start(&ctx, &key, "a forest").await.unwrap();

    let ack = service.delete(&ctx, &key).await.unwrap();
    assert_eq!(
        ack.message,
        "Successfully deleted narrative session dream1 for user alice"
    );
    assert!(service.list(&ctx, "alice").await.unwrap().is_empty());
    assert!(store.is_empty().await);

    let again = service.delete(&ctx, &key).await.unwrap_err();
    assert!(matches!(
        narrative_kind(&again),
        Some(NarrativeErrorKind::SessionNotFound { .. })
    ));
}

#[tokio::test]
async fn test_soft_delete_hides_record_and_frees_session() {
    let (service, _, store) = service_with(ScriptedDriver::new());
    let service = service.with_delete_mode(DeleteMode::Soft);
    let ctx = RequestContext::anonymous();
    let key = NarrativeKey::new("alice", "dream1");
    service.start(&ctx, &key, "a forest").await.unwrap();

    service.delete(&ctx, &key).await.unwrap();
    assert!(store.get(&key).await.unwrap().unwrap().is_deleted());
    assert!(service.list(&ctx, "alice").await.unwrap().is_empty());
    assert!(service.get(&ctx, &key).await.is_err());
    assert!(service.delete(&ctx, &key).await.is_err());

    let restarted = service.start(&ctx, &key, "a desert").await.unwrap();
    assert!(restarted.is_active());
    assert_eq!(restarted.descriptions().len(), 1);
}

#[tokio::test]
async fn test_dispatch_shapes_replies() {
    let (service, _, _) = service_with(ScriptedDriver::new());
    let service = service.with_settings(GenerationSettings::default().with_max_tokens(150));

    let start = DreamRequest::start("alice", "dream1", "a forest")
        .into_command()
        .unwrap();
    let ctx = RequestContext::for_command(&start);
    match service.dispatch(&ctx, start).await.unwrap() {
        DreamReply::Narrative(doc) => {
            assert_eq!(doc.user_id, "alice");
            assert_eq!(doc.descriptions.len(), 1);
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    let listed = service
        .dispatch(&ctx, DreamCommand::List { user_id: "alice".to_string() })
        .await
        .unwrap();
    assert!(matches!(listed, DreamReply::Narratives(ref docs) if docs.len() == 1));

    let woke = service.dispatch(&ctx, DreamCommand::WakeUp).await.unwrap();
    assert_eq!(
        serde_json::to_value(&woke).unwrap(),
        serde_json::json!({ "message": "You woke up." })
    );
}
