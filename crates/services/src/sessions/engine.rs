use std::collections::HashSet;
use std::sync::Arc;

use prep_core::model::{Item, ItemId, ItemQuery, ItemSet, SessionConfig, SessionId, SessionKind};
use prep_core::{Clock, CodeGrader, Session, UngradedCode};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use storage::repository::{HistoryRepository, Storage};
use tracing::{info, warn};

use crate::config::EngineSettings;
use crate::error::SessionError;
use crate::item_bank::{FallbackGenerator, ItemBankProvider, PracticeFallback, RepositoryItemBank};
use crate::ticks::TickSource;

use super::controller::SessionController;

/// Builds session controllers: resolves items, starts the state machine, and
/// wires the archive and grader every controller needs.
#[derive(Clone)]
pub struct SessionEngine {
    clock: Clock,
    provider: Arc<dyn ItemBankProvider>,
    fallback: Arc<dyn FallbackGenerator>,
    history: Arc<dyn HistoryRepository>,
    grader: Arc<dyn CodeGrader>,
    settings: EngineSettings,
}

impl SessionEngine {
    #[must_use]
    pub fn new(
        clock: Clock,
        provider: Arc<dyn ItemBankProvider>,
        history: Arc<dyn HistoryRepository>,
    ) -> Self {
        Self {
            clock,
            provider,
            fallback: Arc::new(PracticeFallback),
            history,
            grader: Arc::new(UngradedCode),
            settings: EngineSettings::default(),
        }
    }

    /// Engine over a `Storage` bundle: the stored item bank plus its history.
    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::new(RepositoryItemBank::new(Arc::clone(&storage.items))),
            Arc::clone(&storage.history),
        )
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackGenerator>) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn with_grader(mut self, grader: Arc<dyn CodeGrader>) -> Self {
        self.grader = grader;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Fetch items and top them up to `query.limit`.
    ///
    /// # Errors
    ///
    /// `SessionError::BankUnavailable` when the provider fails and fallback is
    /// disabled, `SessionError::Empty` when nothing could be gathered,
    /// `SessionError::LimitTooLarge` above `SessionConfig::MAX_ITEMS`.
    pub async fn resolve_items(
        &self,
        kind: SessionKind,
        query: &ItemQuery,
    ) -> Result<ItemSet, SessionError> {
        let items = self.gather(kind, query).await?;
        Ok(ItemSet::new(kind, items)?)
    }

    /// Resolve items for `kind`, then start a session over them.
    ///
    /// The config's shuffle seed, when present, fixes the item order.
    ///
    /// # Errors
    ///
    /// See `resolve_items`; also `SessionError::ItemSet` for inconsistent items.
    pub async fn start(
        &self,
        kind: SessionKind,
        query: &ItemQuery,
        config: SessionConfig,
        ticks: impl TickSource + 'static,
    ) -> Result<SessionController, SessionError> {
        let mut items = self.gather(kind, query).await?;
        if let Some(seed) = config.shuffle_seed() {
            let mut rng = StdRng::seed_from_u64(seed);
            items.shuffle(&mut rng);
        }
        let items = ItemSet::new(kind, items)?;
        self.start_with_items(items, config, ticks)
    }

    /// Start a session over an already resolved item set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transition` if the session cannot start.
    pub fn start_with_items(
        &self,
        items: ItemSet,
        config: SessionConfig,
        ticks: impl TickSource + 'static,
    ) -> Result<SessionController, SessionError> {
        let mut session = Session::new(SessionId::generate(), items, config);
        session.start(self.clock.now())?;

        let mut ticks: Box<dyn TickSource> = Box::new(ticks);
        ticks.arm();

        info!(
            session_id = %session.id(),
            kind = %session.kind(),
            items = session.items().len(),
            duration_secs = session.config().total_duration_secs(),
            "session started"
        );

        Ok(SessionController::new(
            session,
            ticks,
            self.clock.clone(),
            Arc::clone(&self.history),
            Arc::clone(&self.grader),
        ))
    }

    /// A fresh attempt over the same items and config as `previous`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transition` if the session cannot start.
    pub fn replay(
        &self,
        previous: &SessionController,
        ticks: impl TickSource + 'static,
    ) -> Result<SessionController, SessionError> {
        let session = previous.session();
        self.start_with_items(session.items().clone(), session.config().clone(), ticks)
    }

    async fn gather(&self, kind: SessionKind, query: &ItemQuery) -> Result<Vec<Item>, SessionError> {
        if query.limit == 0 {
            return Err(SessionError::Empty);
        }
        if query.limit > SessionConfig::MAX_ITEMS {
            return Err(SessionError::LimitTooLarge {
                got: query.limit,
                max: SessionConfig::MAX_ITEMS,
            });
        }
        let wanted = query.limit as usize;

        let mut items = match self.provider.fetch_items(kind, query).await {
            Ok(mut items) => {
                items.truncate(wanted);
                items
            }
            Err(err) if self.settings.fallback_on_unavailable() => {
                warn!(%kind, error = %err, "item bank unavailable; using practice items");
                Vec::new()
            }
            Err(err) => {
                warn!(%kind, error = %err, "item bank unavailable");
                return Err(SessionError::BankUnavailable(err));
            }
        };

        if items.len() < wanted && self.settings.fallback_on_unavailable() {
            let taken: HashSet<ItemId> = items.iter().map(Item::id).collect();
            let needed = wanted - items.len();
            let extra = self.fallback.generate(kind, query, needed, &taken);
            warn!(
                %kind,
                fetched = items.len(),
                generated = extra.len(),
                "topping up session with practice items"
            );
            items.extend(extra);
        }

        if items.is_empty() {
            return Err(SessionError::Empty);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ItemBankError;
    use crate::ticks::{IntervalTicks, ManualTicks};
    use async_trait::async_trait;
    use prep_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    struct Offline;

    #[async_trait]
    impl ItemBankProvider for Offline {
        async fn fetch_items(
            &self,
            _kind: SessionKind,
            _query: &ItemQuery,
        ) -> Result<Vec<Item>, ItemBankError> {
            Err(ItemBankError::Unavailable("offline".into()))
        }
    }

    fn engine(provider: Arc<dyn ItemBankProvider>) -> SessionEngine {
        SessionEngine::new(fixed_clock(), provider, Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_practice_items() {
        let engine = engine(Arc::new(Offline));
        let set = engine
            .resolve_items(SessionKind::Interview, &ItemQuery::with_limit(3))
            .await
            .unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.kind(), SessionKind::Interview);
    }

    #[tokio::test]
    async fn provider_failure_without_fallback_is_reported() {
        let engine =
            engine(Arc::new(Offline)).with_settings(EngineSettings::default().with_fallback(false));
        let err = engine
            .resolve_items(SessionKind::Mcq, &ItemQuery::with_limit(3))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::BankUnavailable(_)));
    }

    #[tokio::test]
    async fn short_bank_is_topped_up_to_the_limit() {
        let repo = InMemoryRepository::new();
        let seeded = PracticeFallback.generate(
            SessionKind::Mcq,
            &ItemQuery::default(),
            2,
            &HashSet::new(),
        );
        for item in &seeded {
            storage::repository::ItemRepository::upsert_item(&repo, item)
                .await
                .unwrap();
        }
        let engine = engine(Arc::new(RepositoryItemBank::new(Arc::new(repo))));

        let set = engine
            .resolve_items(SessionKind::Mcq, &ItemQuery::with_limit(5))
            .await
            .unwrap();
        assert_eq!(set.len(), 5);
        assert_eq!(set.items()[..2], seeded[..]);
    }

    #[tokio::test]
    async fn empty_bank_without_fallback_is_empty() {
        let engine = engine(Arc::new(RepositoryItemBank::new(Arc::new(
            InMemoryRepository::new(),
        ))))
        .with_settings(EngineSettings::default().with_fallback(false));
        let err = engine
            .resolve_items(SessionKind::Coding, &ItemQuery::with_limit(2))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Empty));

        let zero = engine
            .resolve_items(SessionKind::Coding, &ItemQuery::with_limit(0))
            .await
            .unwrap_err();
        assert!(matches!(zero, SessionError::Empty));
    }

    #[tokio::test]
    async fn oversized_limit_is_rejected_before_fetching() {
        let engine = engine(Arc::new(RepositoryItemBank::new(Arc::new(
            InMemoryRepository::new(),
        ))));
        let err = engine
            .resolve_items(SessionKind::Mcq, &ItemQuery::with_limit(u32::MAX))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::LimitTooLarge {
                got: u32::MAX,
                max: SessionConfig::MAX_ITEMS
            }
        ));

        let at_cap = engine
            .resolve_items(
                SessionKind::Mcq,
                &ItemQuery::with_limit(SessionConfig::MAX_ITEMS),
            )
            .await
            .unwrap();
        assert_eq!(at_cap.len(), SessionConfig::MAX_ITEMS as usize);
    }

    #[test]
    fn interval_ticks_start_without_a_runtime() {
        let engine = engine(Arc::new(Offline));
        let generated = PracticeFallback.generate(
            SessionKind::Mcq,
            &ItemQuery::default(),
            2,
            &HashSet::new(),
        );
        let items = ItemSet::new(SessionKind::Mcq, generated).unwrap();
        let controller = engine
            .start_with_items(
                items,
                SessionConfig::default_for(SessionKind::Mcq),
                IntervalTicks::default(),
            )
            .unwrap();
        assert!(controller.is_ticking());

        let replayed = engine.replay(&controller, IntervalTicks::default()).unwrap();
        assert!(replayed.is_ticking());
    }

    #[tokio::test]
    async fn seeded_shuffle_is_reproducible() {
        let engine = engine(Arc::new(Offline));
        let config = SessionConfig::default_for(SessionKind::Mcq).with_shuffle_seed(7);
        let query = ItemQuery::with_limit(6);

        let (ticks_a, _) = ManualTicks::new();
        let a = engine
            .start(SessionKind::Mcq, &query, config.clone(), ticks_a)
            .await
            .unwrap();
        let (ticks_b, _) = ManualTicks::new();
        let b = engine
            .start(SessionKind::Mcq, &query, config, ticks_b)
            .await
            .unwrap();

        let ids = |c: &SessionController| -> Vec<ItemId> {
            c.session().items().iter().map(Item::id).collect()
        };
        assert_eq!(ids(&a), ids(&b));
        assert_ne!(a.session().id(), b.session().id());
    }
}
