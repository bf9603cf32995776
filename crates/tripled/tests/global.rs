//! The process-wide engine.
//!
//! All tests here share one global instance, so they take a lock first.

use parking_lot::Mutex;
use tripled::{bootstrap, is_initialized, teardown, with_engine, BindingConfig, Engine, Error};

static SERIAL: Mutex<()> = Mutex::new(());

const PAGE: &str = r#"<div><h1 td-model="header"><span td-property="title">Shop</span></h1><ul td-collection="items"><li td-model="a"><span td-property="title">A</span></li></ul></div>"#;

#[test]
fn bootstrap_installs_once() {
    let _serial = SERIAL.lock();
    teardown();

    assert!(!is_initialized());
    bootstrap(PAGE, BindingConfig::default()).unwrap();
    assert!(is_initialized());
    assert!(matches!(
        bootstrap(PAGE, BindingConfig::default()),
        Err(Error::AlreadyInitialized)
    ));

    let collections = with_engine(|engine| engine.collections().len()).unwrap();
    assert_eq!(collections, 1);
    teardown();
}

#[test]
fn with_engine_requires_bootstrap() {
    let _serial = SERIAL.lock();
    teardown();

    assert!(matches!(with_engine(|_| ()), Err(Error::NotInitialized)));
}

#[test]
fn teardown_resets_graph_and_context() {
    let _serial = SERIAL.lock();
    teardown();

    bootstrap(PAGE, BindingConfig::default()).unwrap();
    with_engine(|engine| {
        engine.collection("items");
        assert!(!engine.query_context().is_empty());
    })
    .unwrap();

    let engine = teardown().unwrap();
    assert_eq!(engine.models().len(), 1);
    assert!(!is_initialized());
    assert!(teardown().is_none());

    bootstrap("<p/>", BindingConfig::default()).unwrap();
    with_engine(|engine| {
        assert!(engine.models().is_empty());
        assert!(engine.collections().is_empty());
        assert!(engine.query_context().is_empty());
    })
    .unwrap();
    teardown();
}

#[test]
fn install_prebuilt_engine() {
    let _serial = SERIAL.lock();
    teardown();

    let engine = Engine::from_markup(PAGE, BindingConfig::default()).unwrap();
    tripled::install(engine).unwrap();
    let updated = with_engine(|engine| engine.update_at("items.a", ("title", "B"))).unwrap();
    assert!(updated);
    teardown();
}

#[test]
fn bootstrap_reports_bad_markup() {
    let _serial = SERIAL.lock();
    teardown();

    assert!(matches!(
        bootstrap("<div><p></div>", BindingConfig::default()),
        Err(Error::Dom(_))
    ));
    assert!(!is_initialized());
}
