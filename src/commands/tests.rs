use super::*;
use sosie_core::config::{CommandConfig, MemoryConfig};

fn cfg() -> CommandConfig {
    CommandConfig::default()
}

fn parse_self(text: &str) -> Option<Command> {
    Command::parse(text, Direction::Outbound, true, &cfg())
}

#[test]
fn test_assistant_trigger_any_direction() {
    assert_eq!(
        Command::parse("paf quelle heure est-il", Direction::Inbound, false, &cfg()),
        Some(Command::Assistant("quelle heure est-il".into()))
    );
    assert_eq!(
        Command::parse("Paf météo demain", Direction::Outbound, false, &cfg()),
        Some(Command::Assistant("météo demain".into()))
    );
}

#[test]
fn test_assistant_trigger_needs_a_question() {
    assert_eq!(Command::parse("paf ", Direction::Inbound, false, &cfg()), None);
    assert_eq!(Command::parse("paf", Direction::Inbound, false, &cfg()), None);
}

#[test]
fn test_word_starting_with_prefix_is_not_a_trigger() {
    assert_eq!(
        Command::parse("pafff n'importe quoi", Direction::Inbound, false, &cfg()),
        None
    );
}

#[test]
fn test_admin_verbs_in_self_chat() {
    assert_eq!(parse_self("bot pause"), Some(Command::Admin(AdminCommand::Pause)));
    assert_eq!(parse_self("bot stop"), Some(Command::Admin(AdminCommand::Pause)));
    assert_eq!(parse_self("bot resume"), Some(Command::Admin(AdminCommand::Resume)));
    assert_eq!(parse_self("bot start"), Some(Command::Admin(AdminCommand::Resume)));
    assert_eq!(parse_self("bot status"), Some(Command::Admin(AdminCommand::Status)));
    assert_eq!(parse_self("bot help"), Some(Command::Admin(AdminCommand::Help)));
}

#[test]
fn test_admin_verbs_case_insensitive() {
    assert_eq!(parse_self("Bot Pause"), Some(Command::Admin(AdminCommand::Pause)));
}

#[test]
fn test_context_set_preserves_case() {
    assert_eq!(
        parse_self("bot context Je suis au bar avec Vincent"),
        Some(Command::Admin(AdminCommand::ContextSet(
            "Je suis au bar avec Vincent".into()
        )))
    );
}

#[test]
fn test_context_clear() {
    assert_eq!(
        parse_self("bot context clear"),
        Some(Command::Admin(AdminCommand::ContextClear))
    );
}

#[test]
fn test_legacy_prefixed_assistant_alias() {
    assert_eq!(
        parse_self("bot paf combien font 2+2"),
        Some(Command::Assistant("combien font 2+2".into()))
    );
}

#[test]
fn test_unknown_self_chat_text_falls_through() {
    // Plain notes-to-self are not command errors.
    assert_eq!(parse_self("penser à acheter du pain"), None);
    assert_eq!(parse_self("bot dansmaquette"), None);
}

#[test]
fn test_admin_channel_requires_outgoing() {
    assert_eq!(
        Command::parse("bot pause", Direction::Inbound, false, &cfg()),
        None
    );
}

#[test]
fn test_prefixed_admin_works_outside_self_chat() {
    assert_eq!(
        Command::parse("bot pause", Direction::Outbound, false, &cfg()),
        Some(Command::Admin(AdminCommand::Pause))
    );
}

#[test]
fn test_bare_verbs_work_in_self_chat_only() {
    assert_eq!(parse_self("pause"), Some(Command::Admin(AdminCommand::Pause)));
    assert_eq!(parse_self("status"), Some(Command::Admin(AdminCommand::Status)));
    // Outside the self chat a bare verb is just conversation.
    assert_eq!(
        Command::parse("pause", Direction::Outbound, false, &cfg()),
        None
    );
}

async fn test_ctx_store() -> (sosie_memory::Store, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = MemoryConfig {
        db_path: dir.path().join("cmd.db").to_string_lossy().into_owned(),
        ..Default::default()
    };
    (sosie_memory::Store::new(&config).await.unwrap(), dir)
}

#[tokio::test]
async fn test_pause_resume_round_trip_persists() {
    let (store, _dir) = test_ctx_store().await;
    let runtime = RuntimeState::default();
    let uptime = Instant::now();
    let ctx = CommandContext {
        runtime: &runtime,
        store: &store,
        uptime: &uptime,
        provider_name: "openai",
        context_ttl_minutes: 30,
    };

    let ack = handle(AdminCommand::Pause, &ctx).await.unwrap();
    assert!(ack.contains("pause"));
    assert!(runtime.is_paused());
    assert!(store.load_flags().await.unwrap().paused);

    let ack = handle(AdminCommand::Resume, &ctx).await.unwrap();
    assert!(ack.contains("réactivé"));
    assert!(!runtime.is_paused());
    assert!(!store.load_flags().await.unwrap().paused);
}

#[tokio::test]
async fn test_context_set_and_clear() {
    let (store, _dir) = test_ctx_store().await;
    let runtime = RuntimeState::default();
    let uptime = Instant::now();
    let ctx = CommandContext {
        runtime: &runtime,
        store: &store,
        uptime: &uptime,
        provider_name: "openai",
        context_ttl_minutes: 30,
    };

    let ack = handle(AdminCommand::ContextSet("je conduis".into()), &ctx)
        .await
        .unwrap();
    assert!(ack.contains("je conduis"));
    assert_eq!(
        runtime.active_context().await.unwrap().description,
        "je conduis"
    );
    // Persisted alongside the flags.
    assert!(store
        .load_flags()
        .await
        .unwrap()
        .temporary_context
        .is_some());

    handle(AdminCommand::ContextClear, &ctx).await.unwrap();
    assert!(runtime.active_context().await.is_none());
}

#[tokio::test]
async fn test_status_reflects_state() {
    let (store, _dir) = test_ctx_store().await;
    let runtime = RuntimeState::default();
    runtime.set_paused(true);
    let uptime = Instant::now();
    let ctx = CommandContext {
        runtime: &runtime,
        store: &store,
        uptime: &uptime,
        provider_name: "openai",
        context_ttl_minutes: 30,
    };

    let status = handle(AdminCommand::Status, &ctx).await.unwrap();
    assert!(status.contains("En pause"));
    assert!(status.contains("openai"));
}
