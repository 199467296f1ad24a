use async_trait::async_trait;
use migration_framework::mock::MockScript;
use migration_framework::{
    BackendError, CallerContext, CorrelatedCreate, CorrelationSlot, CorrelationStore, EntityId,
    EntityTypeKey, Facade, FacadeConfig, FacadeError, MigrationPhase, Operation, PhaseFlags,
    StoreAdapter, StoreSide, SwitchableOracle,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// =============================================================================
// TEST DOUBLES
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Country {
    id: Option<u64>,
    iso2_code: String,
    name: String,
}

impl Country {
    fn new(id: Option<u64>, iso2_code: &str, name: &str) -> Self {
        Self {
            id,
            iso2_code: iso2_code.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Get(String),
    Update(Country),
    Create(Country),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("store failure: {0}")]
struct StoreFailure(String);

#[async_trait]
trait CountryStore: StoreAdapter {
    async fn get(&self, iso2_code: &str) -> Result<Country, StoreFailure>;
    async fn update(&self, country: Country) -> Result<Country, StoreFailure>;
    async fn create(&self, country: Country) -> Result<Country, StoreFailure>;
}

#[derive(Default)]
struct MockStore {
    script: MockScript<Call, Result<Country, StoreFailure>>,
    correlation: Option<CorrelationSlot>,
    consume_ids: bool,
    lookups: AtomicUsize,
    binds: AtomicUsize,
    popped: Mutex<Vec<EntityId>>,
    delay: Option<Duration>,
    spans: Mutex<Vec<(Instant, Instant)>>,
}

impl MockStore {
    fn plain() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn correlated() -> Arc<Self> {
        Arc::new(Self {
            correlation: Some(CorrelationSlot::new()),
            consume_ids: true,
            ..Self::default()
        })
    }

    fn correlated_without_consuming() -> Arc<Self> {
        Arc::new(Self {
            correlation: Some(CorrelationSlot::new()),
            ..Self::default()
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            let started = Instant::now();
            tokio::time::sleep(delay).await;
            self.spans.lock().unwrap().push((started, Instant::now()));
        }
    }
}

impl StoreAdapter for MockStore {
    fn correlated_create(&self) -> Option<&dyn CorrelatedCreate> {
        self.correlation.as_ref().map(|_| self as &dyn CorrelatedCreate)
    }
}

impl CorrelatedCreate for MockStore {
    fn correlation_store(&self) -> Option<Arc<CorrelationStore>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.correlation.as_ref().and_then(|slot| slot.get())
    }

    fn set_correlation_store(&self, store: Arc<CorrelationStore>) {
        self.binds.fetch_add(1, Ordering::SeqCst);
        if let Some(slot) = &self.correlation {
            slot.set(store);
        }
    }
}

#[async_trait]
impl CountryStore for MockStore {
    async fn get(&self, iso2_code: &str) -> Result<Country, StoreFailure> {
        self.pause().await;
        self.script.respond(Call::Get(iso2_code.to_string()))
    }

    async fn update(&self, country: Country) -> Result<Country, StoreFailure> {
        self.pause().await;
        self.script.respond(Call::Update(country))
    }

    async fn create(&self, country: Country) -> Result<Country, StoreFailure> {
        if let (Some(slot), true) = (&self.correlation, self.consume_ids) {
            match slot.pop(&EntityTypeKey::new("Country")) {
                Ok(Some(id)) => self.popped.lock().unwrap().push(id),
                Ok(None) => {}
                Err(err) => return Err(StoreFailure(err.to_string())),
            }
        }
        self.script.respond(Call::Create(country))
    }
}

/// Answers creates by country code: the source assigns a fixed id per code, the
/// destination waits a per-code delay, then takes whatever id was relayed to it.
#[derive(Default)]
struct KeyedStore {
    ids: HashMap<String, u64>,
    delays: HashMap<String, Duration>,
    correlation: Option<CorrelationSlot>,
    seen: Mutex<Vec<(String, Option<EntityId>)>>,
}

impl KeyedStore {
    fn source(ids: &[(&str, u64)]) -> Arc<Self> {
        Arc::new(Self {
            ids: ids.iter().map(|(code, id)| (code.to_string(), *id)).collect(),
            ..Self::default()
        })
    }

    fn destination(delays: &[(&str, Duration)]) -> Arc<Self> {
        Arc::new(Self {
            delays: delays.iter().map(|(code, d)| (code.to_string(), *d)).collect(),
            correlation: Some(CorrelationSlot::new()),
            ..Self::default()
        })
    }
}

impl StoreAdapter for KeyedStore {
    fn correlated_create(&self) -> Option<&dyn CorrelatedCreate> {
        self.correlation.as_ref().map(|_| self as &dyn CorrelatedCreate)
    }
}

impl CorrelatedCreate for KeyedStore {
    fn correlation_store(&self) -> Option<Arc<CorrelationStore>> {
        self.correlation.as_ref().and_then(|slot| slot.get())
    }

    fn set_correlation_store(&self, store: Arc<CorrelationStore>) {
        if let Some(slot) = &self.correlation {
            slot.set(store);
        }
    }
}

#[async_trait]
impl CountryStore for KeyedStore {
    async fn get(&self, iso2_code: &str) -> Result<Country, StoreFailure> {
        Err(StoreFailure(format!("no get for {iso2_code}")))
    }

    async fn update(&self, country: Country) -> Result<Country, StoreFailure> {
        Err(StoreFailure(format!("no update for {}", country.iso2_code)))
    }

    async fn create(&self, mut country: Country) -> Result<Country, StoreFailure> {
        match self.delays.get(&country.iso2_code) {
            Some(delay) => tokio::time::sleep(*delay).await,
            None => tokio::task::yield_now().await,
        }
        country.id = match &self.correlation {
            Some(slot) => {
                let relayed = slot
                    .pop(&EntityTypeKey::new("Country"))
                    .map_err(|err| StoreFailure(err.to_string()))?;
                self.seen
                    .lock()
                    .unwrap()
                    .push((country.iso2_code.clone(), relayed.clone()));
                relayed.and_then(|id| id.as_u64())
            }
            None => self.ids.get(&country.iso2_code).copied(),
        };
        Ok(country)
    }
}

struct Ops {
    get: Operation<dyn CountryStore, (String,), Country>,
    update: Operation<dyn CountryStore, (Country,), Country>,
    create: Operation<dyn CountryStore, (Country,), Country>,
}

fn ops() -> Ops {
    Ops {
        get: Operation::builder("get_country")
            .read()
            .handler(|store: Arc<dyn CountryStore>, (code,): (String,)| async move {
                store.get(&code).await
            }),
        update: Operation::builder("update_country")
            .update()
            .handler(|store: Arc<dyn CountryStore>, (country,): (Country,)| async move {
                store.update(country).await
            }),
        create: Operation::builder("create_country")
            .create(|country: &Country| country.id.map(EntityId::from))
            .handler(|store: Arc<dyn CountryStore>, (country,): (Country,)| async move {
                store.create(country).await
            }),
    }
}

fn facade(
    source: &Arc<MockStore>,
    destination: &Arc<MockStore>,
    oracle: Arc<SwitchableOracle>,
    correlation: Option<Arc<CorrelationStore>>,
    ops: &Ops,
) -> Facade<dyn CountryStore> {
    let mut builder = Facade::<dyn CountryStore>::builder()
        .source(source.clone())
        .destination(destination.clone())
        .oracle(oracle)
        .register(&ops.get)
        .register(&ops.update)
        .register(&ops.create);
    if let Some(store) = correlation {
        builder = builder.correlation_store(store);
    }
    builder.build().unwrap()
}

fn phase(phase: MigrationPhase) -> Arc<SwitchableOracle> {
    Arc::new(SwitchableOracle::new(phase))
}

fn pl(id: Option<u64>) -> Country {
    Country::new(id, "PL", "Poland")
}

// =============================================================================
// READ FLOW
// =============================================================================

#[tokio::test]
async fn test_read_passes_through_when_destination_disabled() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    source.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    let facade = facade(&source, &destination, phase(MigrationPhase::Initial), None, &ops);

    let ctx = CallerContext::new("reader");
    let country = facade.call(&ctx, &ops.get, ("PL".into(),)).await.unwrap();

    assert_eq!(country, pl(Some(1)));
    assert_eq!(source.script.calls(), vec![Call::Get("PL".into())]);
    assert_eq!(destination.script.call_count(), 0);
    source.script.verify();
}

#[tokio::test]
async fn test_read_prefers_destination_on_agreement() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    source.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    destination.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    let facade = facade(&source, &destination, phase(MigrationPhase::DualRead), None, &ops);

    let country = facade
        .call(&CallerContext::generate(), &ops.get, ("PL".into(),))
        .await
        .unwrap();

    assert_eq!(country, pl(Some(1)));
    source.script.verify();
    destination.script.verify();
    assert_eq!(facade.stats().inconsistencies, 0);
    assert_eq!(facade.stats().calls, 1);
}

#[tokio::test]
async fn test_read_returns_source_on_disagreement() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    source.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    destination
        .script
        .expect(Call::Get("PL".into()))
        .return_ok(Country::new(Some(1), "PL", "Polska"));
    let facade = facade(&source, &destination, phase(MigrationPhase::DualRead), None, &ops);

    let country = facade
        .call(&CallerContext::generate(), &ops.get, ("PL".into(),))
        .await
        .unwrap();

    assert_eq!(country, pl(Some(1)));
    assert_eq!(source.script.call_count(), 1);
    assert_eq!(destination.script.call_count(), 1);
    assert_eq!(facade.stats().inconsistencies, 1);
}

#[tokio::test]
async fn test_destination_leg_overlaps_the_source_leg() {
    let ops = ops();
    let delay = Duration::from_millis(50);
    let (source, destination) = (MockStore::slow(delay), MockStore::slow(delay));
    source.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    destination.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    let facade = facade(&source, &destination, phase(MigrationPhase::DualRead), None, &ops);

    let started = Instant::now();
    let country = facade
        .call(&CallerContext::generate(), &ops.get, ("PL".into(),))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(country, pl(Some(1)));
    assert!(elapsed < delay * 2 - Duration::from_millis(10), "legs ran back to back: {elapsed:?}");

    let (source_start, source_end) = source.spans.lock().unwrap()[0];
    let (destination_start, destination_end) = destination.spans.lock().unwrap()[0];
    assert!(destination_start < source_end);
    assert!(source_start < destination_end);
}

#[tokio::test]
async fn test_destination_only_phase_never_calls_source() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    destination
        .script
        .expect(Call::Get("PL".into()))
        .return_ok(Country::new(Some(1), "PL", "Polska"));
    let facade = facade(
        &source,
        &destination,
        phase(MigrationPhase::DestinationProxy),
        None,
        &ops,
    );

    let country = facade
        .call(&CallerContext::generate(), &ops.get, ("PL".into(),))
        .await
        .unwrap();

    assert_eq!(country.name, "Polska");
    assert_eq!(source.script.call_count(), 0);
    destination.script.verify();
}

#[tokio::test]
async fn test_check_without_destination_leg_reports_and_returns_source() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    source.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    let oracle = Arc::new(SwitchableOracle::from_flags(PhaseFlags {
        read_source: true,
        check_read_consistency: true,
        ..PhaseFlags::default()
    }));
    let facade = facade(&source, &destination, oracle, None, &ops);

    let country = facade
        .call(&CallerContext::generate(), &ops.get, ("PL".into(),))
        .await
        .unwrap();

    assert_eq!(country, pl(Some(1)));
    assert_eq!(facade.stats().inconsistencies, 1);
    assert_eq!(destination.script.call_count(), 0);
}

#[tokio::test]
async fn test_no_leg_enabled_is_a_dispatcher_error() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    let oracle = Arc::new(SwitchableOracle::from_flags(PhaseFlags::default()));
    let facade = facade(&source, &destination, oracle, None, &ops);

    let err = facade
        .call(&CallerContext::generate(), &ops.get, ("PL".into(),))
        .await
        .unwrap_err();
    assert!(matches!(err, FacadeError::NoResult { operation } if operation == "get_country"));
}

#[tokio::test]
async fn test_source_failure_propagates_unchanged() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    source
        .script
        .expect(Call::Get("PL".into()))
        .return_err(StoreFailure("legacy down".into()));
    destination.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    let facade = facade(&source, &destination, phase(MigrationPhase::DualRead), None, &ops);

    let err = facade
        .call(&CallerContext::generate(), &ops.get, ("PL".into(),))
        .await
        .unwrap_err();

    match err {
        FacadeError::Backend(BackendError::Invocation { side, source, .. }) => {
            assert_eq!(side, StoreSide::Source);
            assert_eq!(
                source.downcast_ref::<StoreFailure>(),
                Some(&StoreFailure("legacy down".into()))
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_destination_failure_surfaces_at_join() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    source.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    destination
        .script
        .expect(Call::Get("PL".into()))
        .return_err(StoreFailure("replacement down".into()));
    let facade = facade(&source, &destination, phase(MigrationPhase::DualRead), None, &ops);

    let err = facade
        .call(&CallerContext::generate(), &ops.get, ("PL".into(),))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FacadeError::Backend(BackendError::Invocation { side: StoreSide::Destination, .. })
    ));
    let original = err.into_adapter_error().unwrap();
    assert_eq!(original.to_string(), "store failure: replacement down");
}

#[tokio::test]
async fn test_join_timeout_is_a_backend_error() {
    let ops = ops();
    let source = MockStore::plain();
    let destination = MockStore::slow(Duration::from_secs(5));
    source.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    destination.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));

    let facade = Facade::<dyn CountryStore>::builder()
        .source(source.clone())
        .destination(destination.clone())
        .oracle(phase(MigrationPhase::DualRead))
        .config(FacadeConfig::default().with_join_timeout(Duration::from_millis(20)))
        .register(&ops.get)
        .build()
        .unwrap();

    let err = facade
        .call(&CallerContext::generate(), &ops.get, ("PL".into(),))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FacadeError::Backend(BackendError::Timeout { side: StoreSide::Destination, .. })
    ));
}

// =============================================================================
// UPDATE FLOW
// =============================================================================

#[tokio::test]
async fn test_update_writes_both_and_prefers_destination() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    let renamed = Country::new(Some(1), "PL", "Republic of Poland");
    source.script.expect(Call::Update(renamed.clone())).return_ok(renamed.clone());
    destination.script.expect(Call::Update(renamed.clone())).return_ok(renamed.clone());
    let facade = facade(&source, &destination, phase(MigrationPhase::DualWrite), None, &ops);

    let updated = facade
        .call(&CallerContext::generate(), &ops.update, (renamed.clone(),))
        .await
        .unwrap();

    assert_eq!(updated, renamed);
    source.script.verify();
    destination.script.verify();
    assert_eq!(facade.stats().inconsistencies, 0);
}

#[tokio::test]
async fn test_update_in_initial_phase_touches_source_only() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    source.script.expect(Call::Update(pl(Some(1)))).return_ok(pl(Some(1)));
    let facade = facade(&source, &destination, phase(MigrationPhase::Initial), None, &ops);

    facade
        .call(&CallerContext::generate(), &ops.update, (pl(Some(1)),))
        .await
        .unwrap();
    assert_eq!(destination.script.call_count(), 0);
}

// =============================================================================
// CREATE FLOW
// =============================================================================

#[tokio::test]
async fn test_create_relays_source_id_to_destination() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::correlated());
    let store = Arc::new(CorrelationStore::new());
    let facade = facade(
        &source,
        &destination,
        phase(MigrationPhase::DualWrite),
        Some(store.clone()),
        &ops,
    );

    for id in [101u64, 102, 103] {
        source.script.expect(Call::Create(pl(None))).return_ok(pl(Some(id)));
        destination.script.expect(Call::Create(pl(None))).return_ok(pl(Some(id)));
    }

    let ctx = CallerContext::new("creator");
    for id in [101u64, 102, 103] {
        let created = facade.call(&ctx, &ops.create, (pl(None),)).await.unwrap();
        assert_eq!(created, pl(Some(id)));
    }

    assert_eq!(
        *destination.popped.lock().unwrap(),
        vec![EntityId::Numeric(101), EntityId::Numeric(102), EntityId::Numeric(103)]
    );
    assert_eq!(destination.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(destination.binds.load(Ordering::SeqCst), 1);
    assert!(store.is_empty());
    assert_eq!(facade.stats().inconsistencies, 0);
}

#[tokio::test]
async fn test_create_skips_binding_when_adapter_already_has_the_store() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::correlated());
    let store = Arc::new(CorrelationStore::new());
    destination.correlation.as_ref().unwrap().set(store.clone());
    source.script.expect(Call::Create(pl(None))).return_ok(pl(Some(7)));
    destination.script.expect(Call::Create(pl(None))).return_ok(pl(Some(7)));
    let facade = facade(
        &source,
        &destination,
        phase(MigrationPhase::DualWrite),
        Some(store),
        &ops,
    );

    facade
        .call(&CallerContext::generate(), &ops.create, (pl(None),))
        .await
        .unwrap();
    assert_eq!(destination.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(destination.binds.load(Ordering::SeqCst), 0);
    assert_eq!(*destination.popped.lock().unwrap(), vec![EntityId::Numeric(7)]);
}

#[tokio::test]
async fn test_create_without_correlation_store_lets_destination_pick_its_id() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::correlated());
    source.script.expect(Call::Create(pl(None))).return_ok(pl(Some(101)));
    destination.script.expect(Call::Create(pl(None))).return_ok(pl(Some(1)));
    let facade = facade(&source, &destination, phase(MigrationPhase::DualWrite), None, &ops);

    let created = facade
        .call(&CallerContext::generate(), &ops.create, (pl(None),))
        .await
        .unwrap();

    assert_eq!(created, pl(Some(101)));
    assert!(destination.popped.lock().unwrap().is_empty());
    assert_eq!(destination.binds.load(Ordering::SeqCst), 0);
    assert_eq!(facade.stats().inconsistencies, 1);
}

#[tokio::test]
async fn test_failed_destination_create_discards_relayed_id() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::correlated_without_consuming());
    let store = Arc::new(CorrelationStore::new());
    source.script.expect(Call::Create(pl(None))).return_ok(pl(Some(55)));
    destination
        .script
        .expect(Call::Create(pl(None)))
        .return_err(StoreFailure("constraint violated".into()));
    let facade = facade(
        &source,
        &destination,
        phase(MigrationPhase::DualWrite),
        Some(store.clone()),
        &ops,
    );

    let ctx = CallerContext::new("unlucky");
    let err = facade.call(&ctx, &ops.create, (pl(None),)).await.unwrap_err();

    assert!(err.is_backend());
    assert_eq!(store.pending(&ctx, &EntityTypeKey::new("Country")), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_create_in_proxy_phase_binds_but_pushes_nothing() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::correlated());
    let store = Arc::new(CorrelationStore::new());
    destination.script.expect(Call::Create(pl(None))).return_ok(pl(Some(9)));
    let facade = facade(
        &source,
        &destination,
        phase(MigrationPhase::DestinationProxy),
        Some(store.clone()),
        &ops,
    );

    // Nothing was pushed, so the destination's pop fails the call.
    let err = facade
        .call(&CallerContext::generate(), &ops.create, (pl(None),))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No ids found for Country"));
    assert_eq!(source.script.call_count(), 0);
    assert_eq!(destination.binds.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn test_unscoped_concurrent_creates_keep_their_own_ids() {
    let ops = ops();
    let source = KeyedStore::source(&[("SL", 1), ("FA", 2)]);
    let destination = KeyedStore::destination(&[("SL", Duration::from_millis(30))]);
    let facade = Facade::<dyn CountryStore>::builder()
        .source(source)
        .destination(destination.clone())
        .oracle(phase(MigrationPhase::DualWrite))
        .correlation_store(Arc::new(CorrelationStore::new()))
        .register(&ops.create)
        .build()
        .unwrap();

    // Both calls run on one task and one thread.
    let (slow, fast) = tokio::join!(
        facade.call_current(&ops.create, (Country::new(None, "SL", "Slowland"),)),
        facade.call_current(&ops.create, (Country::new(None, "FA", "Fastland"),)),
    );

    assert_eq!(slow.unwrap().id, Some(1));
    assert_eq!(fast.unwrap().id, Some(2));
    let mut seen = destination.seen.lock().unwrap().clone();
    seen.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        seen,
        vec![
            ("FA".to_string(), Some(EntityId::Numeric(2))),
            ("SL".to_string(), Some(EntityId::Numeric(1))),
        ]
    );
    assert_eq!(facade.stats().inconsistencies, 0);
}

// =============================================================================
// WIRING
// =============================================================================

#[tokio::test]
async fn test_operation_without_kind_fails_at_build() {
    let untagged = Operation::<dyn CountryStore, (String,), Country>::builder("get_country")
        .handler(|store: Arc<dyn CountryStore>, (code,): (String,)| async move {
            store.get(&code).await
        });

    let result = Facade::<dyn CountryStore>::builder()
        .source(MockStore::plain())
        .destination(MockStore::plain())
        .oracle(phase(MigrationPhase::Initial))
        .register(&untagged)
        .build();

    assert!(matches!(
        result,
        Err(FacadeError::Configuration(msg)) if msg.contains("exactly one of Read/Update/Create")
    ));
}

#[tokio::test]
async fn test_missing_adapter_fails_at_build() {
    let result = Facade::<dyn CountryStore>::builder()
        .source(MockStore::plain())
        .oracle(phase(MigrationPhase::Initial))
        .build();
    assert!(matches!(result, Err(FacadeError::Configuration(_))));
}

#[tokio::test]
async fn test_unregistered_operation_fails_at_call() {
    let ops = ops();
    let facade = Facade::<dyn CountryStore>::builder()
        .source(MockStore::plain())
        .destination(MockStore::plain())
        .oracle(phase(MigrationPhase::Initial))
        .register(&ops.get)
        .build()
        .unwrap();

    let err = facade
        .call(&CallerContext::generate(), &ops.update, (pl(Some(1)),))
        .await
        .unwrap_err();
    assert!(matches!(err, FacadeError::Configuration(msg) if msg.contains("not registered")));
    assert_eq!(facade.stats().calls, 0);
}

#[tokio::test]
async fn test_routing_markers_do_not_bypass_dual_dispatch() {
    let marked = Operation::<dyn CountryStore, (String,), Country>::builder("get_country")
        .read()
        .source_only()
        .handler(|store: Arc<dyn CountryStore>, (code,): (String,)| async move {
            store.get(&code).await
        });
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    source.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    destination.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));

    let facade = Facade::<dyn CountryStore>::builder()
        .source(source.clone())
        .destination(destination.clone())
        .oracle(phase(MigrationPhase::DualRead))
        .register(&marked)
        .build()
        .unwrap();

    facade
        .call(&CallerContext::generate(), &marked, ("PL".into(),))
        .await
        .unwrap();
    source.script.verify();
    destination.script.verify();
}

#[tokio::test]
async fn test_phase_switch_applies_to_next_call() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    let oracle = phase(MigrationPhase::Initial);
    let facade = facade(&source, &destination, oracle.clone(), None, &ops);

    source.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    facade
        .call(&CallerContext::generate(), &ops.get, ("PL".into(),))
        .await
        .unwrap();
    assert_eq!(destination.script.call_count(), 0);

    oracle.set_phase(MigrationPhase::DestinationProxy);
    destination.script.expect(Call::Get("PL".into())).return_ok(pl(Some(1)));
    facade
        .call(&CallerContext::generate(), &ops.get, ("PL".into(),))
        .await
        .unwrap();
    assert_eq!(source.script.call_count(), 1);
    assert_eq!(destination.script.call_count(), 1);
}

#[tokio::test]
async fn test_shutdown_closes_the_pool() {
    let ops = ops();
    let (source, destination) = (MockStore::plain(), MockStore::plain());
    let facade = facade(&source, &destination, phase(MigrationPhase::DualRead), None, &ops);
    facade.shutdown().await;

    let err = facade
        .call(&CallerContext::generate(), &ops.get, ("PL".into(),))
        .await
        .unwrap_err();
    assert!(matches!(err, FacadeError::Backend(BackendError::PoolClosed)));
    assert_eq!(source.script.call_count(), 0);
}
