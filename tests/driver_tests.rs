//! Driver Tests
//!
//! Auto-toggle debouncing and event serialization through the panel driver,
//! run on a paused clock.

use std::rc::Rc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::sleep;

use retouch_panel::config::PanelConfig;
use retouch_panel::host::{DocumentId, MemoryHost, WhiteBalance};
use retouch_panel::panel::{
    channel, HostNotification, Mode, NoticeLevel, PanelDriver, PanelEvent, WhiteBalanceSync,
};
use retouch_panel::state::TransactionManager;

fn setup(config: PanelConfig) -> (Rc<MemoryHost>, PanelDriver<MemoryHost>, DocumentId) {
    let host = Rc::new(MemoryHost::new());
    let doc = host.open_document("portrait", &["Background"]);
    let tx = Rc::new(TransactionManager::new(host.clone()));
    let driver = PanelDriver::new(WhiteBalanceSync::new(tx, config));
    (host, driver, doc)
}

fn toggle(checked: bool) -> PanelEvent {
    PanelEvent::AutoToggled { checked }
}

#[tokio::test(start_paused = true)]
async fn test_rapid_toggles_run_one_transaction_for_last_state() {
    let (host, driver, doc) = setup(PanelConfig::default());
    let (handle, rx) = channel();

    let (result, ()) = tokio::join!(driver.run(rx), async {
        for checked in [true, false, true, false, true] {
            assert!(handle.send(toggle(checked)));
            sleep(Duration::from_millis(50)).await;
        }
        sleep(Duration::from_millis(500)).await;
        drop(handle);
    });
    let sync = result.unwrap();

    assert_eq!(host.suspension_counts(), (1, 1));
    assert_eq!(host.history(doc), vec!["Open", "Auto White Balance"]);
    assert_eq!(sync.state().mode, Mode::Auto);
    assert!(sync.is_settled());
}

#[tokio::test(start_paused = true)]
async fn test_toggle_on_then_off_within_window_is_noop() {
    let (host, driver, _doc) = setup(PanelConfig::default());
    let (handle, rx) = channel();

    let (result, ()) = tokio::join!(driver.run(rx), async {
        handle.send(toggle(true));
        sleep(Duration::from_millis(100)).await;
        handle.send(toggle(false));
        sleep(Duration::from_millis(500)).await;
        drop(handle);
    });
    let sync = result.unwrap();

    assert!(host.calls().is_empty());
    assert_eq!(sync.state().mode, Mode::Manual);
    assert!(!sync.state().auto_checked);
}

#[tokio::test(start_paused = true)]
async fn test_spaced_toggles_each_run() {
    let (host, driver, doc) = setup(PanelConfig::default());
    let (handle, rx) = channel();

    let (result, ()) = tokio::join!(driver.run(rx), async {
        handle.send(toggle(true));
        sleep(Duration::from_millis(400)).await;
        handle.send(toggle(false));
        sleep(Duration::from_millis(400)).await;
        drop(handle);
    });
    let sync = result.unwrap();

    assert_eq!(host.suspension_counts(), (2, 2));
    assert_eq!(
        host.history(doc),
        vec!["Open", "Auto White Balance", "Manual White Balance"]
    );
    assert_eq!(sync.state().mode, Mode::Manual);
    assert_eq!((sync.state().temperature, sync.state().tint), (0.0, 0.0));
}

#[tokio::test(start_paused = true)]
async fn test_debounce_window_is_configurable() {
    let config = PanelConfig {
        debounce_ms: 1000,
        ..PanelConfig::default()
    };
    let (host, driver, _doc) = setup(config);
    let (handle, rx) = channel();

    let (result, ()) = tokio::join!(driver.run(rx), async {
        handle.send(toggle(true));
        sleep(Duration::from_millis(600)).await;
        assert_eq!(host.suspension_counts(), (0, 0));
        sleep(Duration::from_millis(600)).await;
        assert_eq!(host.suspension_counts(), (1, 1));
        drop(handle);
    });
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_slider_release_is_not_debounced() {
    let (host, driver, doc) = setup(PanelConfig::default());
    let (handle, rx) = channel();

    let (result, ()) = tokio::join!(driver.run(rx), async {
        handle.send(PanelEvent::TemperatureReleased { value: 15.0 });
        handle.drained().await;
        assert_eq!(
            host.white_balance_of(doc, "White Balance"),
            Some(WhiteBalance::custom(15.0, 0.0))
        );
        drop(handle);
    });
    let sync = result.unwrap();
    assert_eq!(sync.state().temperature, 15.0);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_preview_is_immediate() {
    let (_host, driver, _doc) = setup(PanelConfig::default());
    let (handle, rx) = channel();

    let mut driver = driver;
    driver.dispatch(toggle(true)).await.unwrap();
    assert!(driver.sync().state().auto_checked);
    assert_eq!(driver.sync().state().mode, Mode::Manual);
    assert!(driver.has_pending_toggle());

    drop(handle);
    let sync = driver.run(rx).await.unwrap();
    assert_eq!(sync.state().mode, Mode::Auto);
}

#[tokio::test(start_paused = true)]
async fn test_events_are_handled_in_order() {
    let (host, driver, doc) = setup(PanelConfig::default());
    let (handle, rx) = channel();

    handle.send(PanelEvent::TemperatureReleased { value: 10.0 });
    handle.send(PanelEvent::TintReleased { value: 20.0 });
    handle.send(HostNotification::SelectionChanged.into());
    handle.send(PanelEvent::ResetClicked);
    handle.send(PanelEvent::TemperatureReleased { value: 30.0 });
    drop(handle);
    let sync = driver.run(rx).await.unwrap();

    assert_eq!(
        host.history(doc),
        vec![
            "Open",
            "Adjust Temperature",
            "Adjust Tint",
            "Reset White Balance",
            "Adjust Temperature"
        ]
    );
    assert_eq!((sync.state().temperature, sync.state().tint), (30.0, 0.0));
}

#[tokio::test(start_paused = true)]
async fn test_state_is_visible_while_session_runs() {
    let (host, mut driver, doc) = setup(PanelConfig::default());
    let mut state = driver.subscribe();
    let mut notices = driver.notices();
    let (handle, rx) = channel();

    let (result, ()) = tokio::join!(driver.run(rx), async {
        handle.send(PanelEvent::TintReleased { value: -20.0 });
        state.changed().await.unwrap();
        assert_eq!(state.borrow_and_update().tint, -20.0);

        handle.send(toggle(true));
        state.changed().await.unwrap();
        {
            let shown = state.borrow_and_update();
            assert!(shown.auto_checked);
            assert_eq!(shown.mode, Mode::Manual);
        }
        sleep(Duration::from_millis(400)).await;
        assert_eq!(state.borrow().mode, Mode::Auto);

        host.close_document(doc);
        handle.send(HostNotification::DocumentClosed.into());
        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Info);
        assert_eq!(state.borrow().mode, Mode::Manual);
        drop(handle);
    });

    let sync = result.unwrap();
    assert!(sync.notices().is_empty());
}
