use super::*;
use chrono::{Duration, Utc};
use sosie_core::config::MemoryConfig;
use sosie_core::runtime::{RuntimeFlags, TemporaryContext};

async fn test_store(dir: &tempfile::TempDir) -> Store {
    let config = MemoryConfig {
        db_path: dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .into_owned(),
        history_window: 10,
        log_cap_per_chat: 5,
    };
    Store::new(&config).await.unwrap()
}

#[tokio::test]
async fn test_profile_lookup_matches_country_code_variants() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;

    store
        .add_contact(&NewContact {
            name: "Marion".into(),
            phone_number: "+33612345678".into(),
            relationship: "girlfriend".into(),
        })
        .await
        .unwrap();

    // Incoming JID with country code.
    match store.find_profile("33612345678@c.us").await.unwrap() {
        ProfileLookup::Found(p) => assert_eq!(p.name, "Marion"),
        ProfileLookup::NoProfile => panic!("profile should resolve with country code"),
    }

    // Same number without the country code.
    match store.find_profile("612345678@c.us").await.unwrap() {
        ProfileLookup::Found(p) => assert_eq!(p.name, "Marion"),
        ProfileLookup::NoProfile => panic!("profile should resolve without country code"),
    }
}

#[tokio::test]
async fn test_profile_lookup_unknown_number() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;

    assert!(matches!(
        store.find_profile("4915112345678@c.us").await.unwrap(),
        ProfileLookup::NoProfile
    ));
}

#[tokio::test]
async fn test_contact_patch_preserves_unset_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;

    let contact = store
        .add_contact(&NewContact {
            name: "Vincent".into(),
            phone_number: "+33698765432".into(),
            relationship: "friend".into(),
        })
        .await
        .unwrap();
    assert!(!contact.enabled);

    let updated = store
        .update_contact(
            contact.id,
            &ContactPatch {
                enabled: Some(true),
                auto_correct: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert!(updated.enabled);
    assert!(updated.auto_correct);
    assert_eq!(updated.name, "Vincent");
    assert_eq!(updated.relationship, "friend");
}

#[tokio::test]
async fn test_update_missing_contact_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;
    let result = store
        .update_contact(999, &ContactPatch::default())
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_flags_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;

    // First load seeds defaults.
    let flags = store.load_flags().await.unwrap();
    assert!(!flags.paused);
    assert!(flags.autocorrect_enabled);

    let flags = RuntimeFlags {
        paused: true,
        autocorrect_enabled: false,
        temporary_context: Some(TemporaryContext::new(
            "je conduis",
            Duration::minutes(30),
        )),
    };
    store.save_flags(&flags).await.unwrap();

    let loaded = store.load_flags().await.unwrap();
    assert!(loaded.paused);
    assert!(!loaded.autocorrect_enabled);
    assert_eq!(
        loaded.temporary_context.unwrap().description,
        "je conduis"
    );
}

#[tokio::test]
async fn test_master_switch_defaults_on_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;

    assert!(store.master_switch().await.unwrap());
    store.set_master_switch(false).await.unwrap();
    assert!(!store.master_switch().await.unwrap());
}

#[tokio::test]
async fn test_saving_flags_preserves_master_switch() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;

    store.set_master_switch(false).await.unwrap();
    store
        .save_flags(&RuntimeFlags {
            paused: true,
            autocorrect_enabled: true,
            temporary_context: None,
        })
        .await
        .unwrap();
    assert!(!store.master_switch().await.unwrap());
}

#[tokio::test]
async fn test_history_is_chronological_and_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;
    let base = Utc::now();

    for i in 0..4 {
        store
            .record_exchange(
                "33612345678@c.us",
                i % 2 == 1,
                &format!("msg{i}"),
                None,
                base + Duration::seconds(i),
            )
            .await
            .unwrap();
    }

    let history = store
        .recent_history("33612345678@c.us", 3, base + Duration::seconds(10))
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].text, "msg1");
    assert_eq!(history[2].text, "msg3");
    assert!(history[0].from_me);
    assert!(!history[1].from_me);
}

#[tokio::test]
async fn test_history_excludes_current_and_later_messages() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;
    let base = Utc::now();

    store
        .record_exchange("33612345678@c.us", false, "before", None, base)
        .await
        .unwrap();
    store
        .record_exchange(
            "33612345678@c.us",
            false,
            "current",
            None,
            base + Duration::seconds(5),
        )
        .await
        .unwrap();

    let history = store
        .recent_history("33612345678@c.us", 10, base + Duration::seconds(5))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].text, "before");
}

#[tokio::test]
async fn test_log_pruned_to_cap() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await; // cap = 5
    let base = Utc::now();

    for i in 0..12 {
        store
            .record_exchange(
                "33612345678@c.us",
                false,
                &format!("msg{i}"),
                None,
                base + Duration::seconds(i),
            )
            .await
            .unwrap();
    }

    assert_eq!(store.log_len("33612345678@c.us").await.unwrap(), 5);
    let history = store
        .recent_history("33612345678@c.us", 10, base + Duration::seconds(100))
        .await
        .unwrap();
    assert_eq!(history.first().unwrap().text, "msg7");
    assert_eq!(history.last().unwrap().text, "msg11");
}

#[tokio::test]
async fn test_log_keys_are_normalized_across_formats() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;
    let base = Utc::now();

    store
        .record_exchange("33612345678@c.us", false, "salut", None, base)
        .await
        .unwrap();

    // Same chat, different raw format.
    let history = store
        .recent_history("+33 6 12 34 56 78", 10, base + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}
