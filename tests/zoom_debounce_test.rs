use listing_map_engine::{
    EngineConfig, EngineInput, HeadlessMap, LatLng, Listing, MapEngine, MapEvent, MarkerKey,
};
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn engine_with_listings() -> MapEngine<HeadlessMap> {
    let map = HeadlessMap::new(LatLng::new(25.0330, 121.5654), 16, 1024, 768);
    let mut engine = MapEngine::new(map, EngineConfig::default()).unwrap();
    engine.ingest(&[
        Listing::new("a", Some("p1"), 800.0, LatLng::new(25.0330, 121.5654)),
        Listing::new("b", Some("p1"), 450.0, LatLng::new(25.0360, 121.5654)),
    ]);
    engine
}

#[tokio::test(start_paused = true)]
async fn test_zoom_burst_refreshes_once_after_quiescence() {
    let mut engine = engine_with_listings();
    let baseline = engine.stats().refresh_passes;
    let sender = engine.sender();

    let driver = async move {
        for _ in 0..5 {
            sender.send(EngineInput::Map(MapEvent::ZoomChanged)).unwrap();
            sleep(Duration::from_millis(10)).await;
        }
        // the last event lands 10ms after the fifth send started its sleep
        let last_event = Instant::now() - Duration::from_millis(10);
        sleep(Duration::from_millis(400)).await;
        sender.send(EngineInput::Shutdown).unwrap();
        last_event
    };

    let ((), last_event) = tokio::join!(engine.run(), driver);

    assert_eq!(engine.stats().refresh_passes, baseline + 1);
    assert!(!engine.state().is_zooming);
    let settled_after = engine.last_refresh_at().unwrap() - last_event;
    assert!(
        settled_after >= Duration::from_millis(250) && settled_after <= Duration::from_millis(260),
        "settled {:?} after the last zoom event",
        settled_after
    );
}

#[tokio::test(start_paused = true)]
async fn test_separate_bursts_refresh_separately() {
    let mut engine = engine_with_listings();
    let baseline = engine.stats().refresh_passes;
    let sender = engine.sender();

    let driver = async move {
        for _ in 0..3 {
            sender.send(EngineInput::Map(MapEvent::ZoomChanged)).unwrap();
            sleep(Duration::from_millis(50)).await;
        }
        sleep(Duration::from_millis(500)).await;
        for _ in 0..3 {
            sender.send(EngineInput::Map(MapEvent::ZoomChanged)).unwrap();
            sleep(Duration::from_millis(50)).await;
        }
        sleep(Duration::from_millis(500)).await;
        sender.send(EngineInput::Shutdown).unwrap();
    };

    tokio::join!(engine.run(), driver);
    assert_eq!(engine.stats().refresh_passes, baseline + 2);
}

#[tokio::test(start_paused = true)]
async fn test_hover_is_suppressed_while_zooming() {
    let mut engine = engine_with_listings();
    let handle = engine
        .marker_handle(&MarkerKey::Feature("a".to_string()))
        .unwrap();
    let sender = engine.sender();

    let driver = async move {
        sender.send(EngineInput::Map(MapEvent::ZoomChanged)).unwrap();
        sender.send(EngineInput::Map(MapEvent::MouseOver(handle))).unwrap();
        sleep(Duration::from_millis(100)).await;
        sender.send(EngineInput::Shutdown).unwrap();
    };

    tokio::join!(engine.run(), driver);
    assert!(engine.state().is_zooming);
    assert!(engine.state().hovered_feature_id.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_idle_during_zoom_does_not_refresh() {
    let mut engine = engine_with_listings();
    let baseline = engine.stats().refresh_passes;
    let sender = engine.sender();

    let driver = async move {
        sender.send(EngineInput::Map(MapEvent::ZoomChanged)).unwrap();
        sender.send(EngineInput::Map(MapEvent::Idle)).unwrap();
        sleep(Duration::from_millis(100)).await;
        sender.send(EngineInput::Shutdown).unwrap();
    };

    tokio::join!(engine.run(), driver);
    assert_eq!(engine.stats().refresh_passes, baseline);
}
