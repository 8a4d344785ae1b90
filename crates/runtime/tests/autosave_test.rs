//! Debounced autosave behaviour, driven with a paused tokio clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use sheet_content::CatalogLoader;
use sheet_core::{CharacterId, CharacterState, Confirmation, SheetConfig, TraitCategory};
use sheet_runtime::{
    CharacterRepository, Event, InMemoryCharacterRepo, PersistenceEvent, RepositoryError,
    RuntimeConfig, SheetRuntime, Topic,
};
use tokio::sync::broadcast;

/// Store that counts writes and can be told to fail them.
#[derive(Default)]
struct FlakyRepo {
    inner: InMemoryCharacterRepo,
    saves: AtomicUsize,
    failing: AtomicBool,
}

impl CharacterRepository for FlakyRepo {
    fn load(&self, id: &CharacterId) -> sheet_runtime::repository::Result<Option<CharacterState>> {
        self.inner.load(id)
    }

    fn save(&self, state: &CharacterState) -> sheet_runtime::repository::Result<CharacterId> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Io(std::io::Error::other("disk full")));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(state)
    }

    fn delete(&self, id: &CharacterId) -> sheet_runtime::repository::Result<()> {
        self.inner.delete(id)
    }

    fn list_ids(&self) -> sheet_runtime::repository::Result<Vec<CharacterId>> {
        self.inner.list_ids()
    }
}

async fn runtime(repo: Arc<FlakyRepo>) -> SheetRuntime {
    let catalog = CatalogLoader::builtin()
        .expect("bundled catalog should load")
        .catalog;

    SheetRuntime::builder()
        .config(RuntimeConfig::default().with_autosave_debounce(Duration::from_millis(1000)))
        .catalog(catalog)
        .sheet_config(SheetConfig::default())
        .repository(repo)
        .build()
        .await
        .expect("runtime should build")
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<PersistenceEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let Event::Persistence(event) = event {
            events.push(event);
        }
    }
    events
}

#[tokio::test(start_paused = true)]
async fn burst_of_changes_is_written_once() {
    let repo = Arc::new(FlakyRepo::default());
    let runtime = runtime(repo.clone()).await;
    let mut saves = runtime.subscribe(Topic::Persistence);

    let session = runtime.create_character("Smiling Jack", Some("brujah")).unwrap();
    let created = repo.saves.load(Ordering::SeqCst);

    session.award_xp(50).await.unwrap();
    session
        .spend(TraitCategory::Skill, "brawl", 1, Confirmation::NotGiven)
        .await
        .unwrap();
    session
        .spend(TraitCategory::Skill, "brawl", 2, Confirmation::NotGiven)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(drain(&mut saves).is_empty(), "debounce window still open");
    assert_eq!(repo.saves.load(Ordering::SeqCst), created);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    let events = drain(&mut saves);
    assert_eq!(events.len(), 1, "three changes coalesce into one write");
    assert!(matches!(&events[0], PersistenceEvent::Saved { character, .. } if character == session.id()));
    assert_eq!(repo.saves.load(Ordering::SeqCst), created + 1);

    let stored = repo.load(session.id()).unwrap().unwrap();
    assert_eq!(stored.level(TraitCategory::Skill, "brawl"), 2);
    assert_eq!(stored.xp().spent(), 9);
}

#[tokio::test(start_paused = true)]
async fn new_snapshot_restarts_the_timer() {
    let repo = Arc::new(FlakyRepo::default());
    let runtime = runtime(repo.clone()).await;
    let mut saves = runtime.subscribe(Topic::Persistence);
    let session = runtime.create_character("Rosa", None).unwrap();

    session.award_xp(5).await.unwrap();
    tokio::time::sleep(Duration::from_millis(800)).await;
    session.award_xp(5).await.unwrap();
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(drain(&mut saves).is_empty());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(drain(&mut saves).len(), 1);
    assert_eq!(repo.load(session.id()).unwrap().unwrap().xp().total(), 10);
}

#[tokio::test(start_paused = true)]
async fn flush_forces_write_and_skips_unchanged() {
    let repo = Arc::new(FlakyRepo::default());
    let runtime = runtime(repo.clone()).await;
    let session = runtime.create_character("Anarch", None).unwrap();

    session.award_xp(10).await.unwrap();
    assert_eq!(runtime.flush().await.unwrap(), 1);
    assert_eq!(repo.load(session.id()).unwrap().unwrap().xp().total(), 10);

    // Nothing pending
    assert_eq!(runtime.flush().await.unwrap(), 0);

    // Same content as the last write
    session.award_xp(0).await.unwrap();
    assert_eq!(runtime.flush().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_save_is_published_and_state_kept() {
    let repo = Arc::new(FlakyRepo::default());
    let runtime = runtime(repo.clone()).await;
    let mut saves = runtime.subscribe(Topic::Persistence);
    let session = runtime.create_character("Unlucky", None).unwrap();

    repo.failing.store(true, Ordering::SeqCst);
    session.award_xp(20).await.unwrap();
    session
        .spend(TraitCategory::Attribute, "strength", 2, Confirmation::NotGiven)
        .await
        .expect("saving must not gate purchases");

    assert_eq!(runtime.flush().await.unwrap(), 0);
    let events = drain(&mut saves);
    assert!(matches!(
        events.as_slice(),
        [PersistenceEvent::SaveFailed { error, .. }] if error.contains("disk full")
    ));

    let state = session.snapshot().await;
    assert_eq!(state.level(TraitCategory::Attribute, "strength"), 2);
    assert_eq!(state.xp().spent(), 10);

    repo.failing.store(false, Ordering::SeqCst);
    session.award_xp(1).await.unwrap();
    assert_eq!(runtime.flush().await.unwrap(), 1);
    assert_eq!(
        repo.load(session.id())
            .unwrap()
            .unwrap()
            .level(TraitCategory::Attribute, "strength"),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_writes_pending_snapshots() {
    let repo = Arc::new(FlakyRepo::default());
    let runtime = runtime(repo.clone()).await;
    let session = runtime.create_character("Last Call", None).unwrap();
    let id = session.id().clone();

    session.award_xp(7).await.unwrap();
    runtime.shutdown().await.unwrap();

    assert_eq!(repo.load(&id).unwrap().unwrap().xp().total(), 7);
    assert!(matches!(
        session.save_now().await,
        Err(sheet_runtime::RuntimeError::CommandChannelClosed)
    ));
}

#[tokio::test(start_paused = true)]
async fn deleted_character_is_not_written_back() {
    let repo = Arc::new(FlakyRepo::default());
    let runtime = runtime(repo.clone()).await;
    let session = runtime.create_character("Gone", None).unwrap();
    let id = session.id().clone();

    session.award_xp(10).await.unwrap();
    runtime.delete(&id).await.unwrap();

    assert_eq!(runtime.flush().await.unwrap(), 0);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    runtime.shutdown().await.unwrap();

    assert!(repo.load(&id).unwrap().is_none());
    assert!(repo.list_ids().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn recreated_character_is_written_after_delete() {
    let repo = Arc::new(FlakyRepo::default());
    let runtime = runtime(repo.clone()).await;
    let session = runtime.create_character("Phoenix", None).unwrap();
    let id = session.id().clone();

    session.award_xp(3).await.unwrap();
    assert_eq!(runtime.flush().await.unwrap(), 1);
    runtime.delete(&id).await.unwrap();

    // Same content as the last write before the delete
    session.award_xp(0).await.unwrap();
    assert_eq!(runtime.flush().await.unwrap(), 1);
    assert_eq!(repo.load(&id).unwrap().unwrap().xp().total(), 3);
}
