//! End-to-end behaviour through the public API

use std::sync::{Arc, Mutex};
use std::time::Duration;

use config_broker::topics::{standard_topics, RgbLedConfig};
use config_broker::{
    typed, BrokerBuilder, BrokerConfig, BrokerError, ConfigBroker, ConfigHandler, Direction,
    ErrorKind, HandlerError, SnapshotHandle, Token, TopicSpec,
};

const RGB: &str = r#"{"led0":{"red":0,"green":86,"blue":164},"led1":{"red":255,"green":200,"blue":200}}"#;
const RGB_286: &str = r#"{"led0":{"red":0,"green":286,"blue":400},"led1":{"red":255,"green":200,"blue":200}}"#;

struct Wiring {
    broker: Arc<ConfigBroker>,
    rgb_writer: Token,
    rgb_reader: Token,
    user_writer: Token,
    user_reader: Token,
    raw_writer: Token,
    raw_reader: Token,
}

fn wiring(min_interval: Duration) -> Wiring {
    let mut topics = standard_topics();
    topics.push(TopicSpec::new("raw"));

    let mut builder =
        BrokerBuilder::new(BrokerConfig::default().default_min_interval(min_interval), topics)
            .unwrap();

    Wiring {
        rgb_writer: builder.grant_write("rgb_led").unwrap(),
        rgb_reader: builder.grant_read("rgb_led").unwrap(),
        user_writer: builder.grant_write("user_led").unwrap(),
        user_reader: builder.grant_read("user_led").unwrap(),
        raw_writer: builder.grant_write("raw").unwrap(),
        raw_reader: builder.grant_read("raw").unwrap(),
        broker: builder.build(),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn test_versions_strictly_increase() {
    let w = wiring(Duration::ZERO);
    let mut last = 0;

    for i in 0..20u8 {
        let version = w.broker.update(&w.raw_writer, "raw", vec![i]).await.unwrap();
        assert!(version > last);
        last = version;
    }

    assert_eq!(w.broker.read(&w.raw_reader).await.unwrap().1, 20);
}

#[tokio::test]
async fn test_access_isolation() {
    let w = wiring(Duration::ZERO);

    let err = w
        .broker
        .update(&w.rgb_writer, "user_led", RGB)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BrokerError::AccessDenied {
            topic: "user_led".into(),
            direction: Direction::Write
        }
    );

    assert_eq!(w.broker.read(&w.user_reader).await.unwrap().1, 0);
    assert_eq!(w.broker.read(&w.rgb_reader).await.unwrap().1, 0);
    assert!(w.broker.read(&w.user_writer).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_update_leaves_state() {
    init_tracing();
    let w = wiring(Duration::from_millis(500));

    assert_eq!(w.broker.update(&w.rgb_writer, "rgb_led", RGB).await.unwrap(), 1);

    tokio::time::advance(Duration::from_millis(100)).await;
    let err = w.broker.update(&w.rgb_writer, "rgb_led", RGB).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);
    assert!(err.is_transient());

    let (current, version) = w.broker.read(&w.rgb_reader).await.unwrap();
    assert_eq!(version, 1);
    assert_eq!(current.unwrap().version(), 1);
}

#[tokio::test]
async fn test_out_of_range_not_committed() {
    let w = wiring(Duration::ZERO);
    w.broker.update(&w.rgb_writer, "rgb_led", RGB).await.unwrap();
    let before = w.broker.acquire_current(&w.rgb_reader).await.unwrap().unwrap();

    let err = w
        .broker
        .update(&w.rgb_writer, "rgb_led", RGB_286)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);

    let after = w.broker.acquire_current(&w.rgb_reader).await.unwrap().unwrap();
    assert!(after.ptr_eq(&before));
}

#[tokio::test]
async fn test_truncated_payload_malformed() {
    let w = wiring(Duration::ZERO);

    let err = w
        .broker
        .update(&w.rgb_writer, "rgb_led", r#"{"x":"#)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_rapid_updates_single_dispatch() {
    init_tracing();
    let w = wiring(Duration::ZERO);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let rgb_seen = Arc::clone(&seen);
    let rgb: Box<dyn ConfigHandler> = Box::new(typed::<RgbLedConfig, _>(move |config| {
        rgb_seen.lock().unwrap().push(config.led0.red);
        Ok(())
    }));
    let user: Box<dyn ConfigHandler> =
        Box::new(|_: &SnapshotHandle| -> Result<(), HandlerError> { Ok(()) });

    let mut sub = w
        .broker
        .subscribe(vec![(w.rgb_reader, rgb), (w.user_reader, user)])
        .await
        .unwrap();

    let first = r#"{"led0":{"red":1,"green":0,"blue":0},"led1":{"red":0,"green":0,"blue":0}}"#;
    let last = r#"{"led0":{"red":2,"green":0,"blue":0},"led1":{"red":0,"green":0,"blue":0}}"#;
    w.broker.update(&w.rgb_writer, "rgb_led", first).await.unwrap();
    w.broker.update(&w.rgb_writer, "rgb_led", last).await.unwrap();

    let report = sub.next_batch(Some(Duration::from_secs(1))).await;
    assert_eq!(report.deliveries.len(), 1);
    assert_eq!(report.deliveries[0].previous_version, 0);
    assert_eq!(report.deliveries[0].version, 2);
    assert_eq!(*seen.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn test_acquired_snapshot_survives_two_commits() {
    let w = wiring(Duration::ZERO);

    w.broker.update(&w.raw_writer, "raw", &b"first"[..]).await.unwrap();
    let (reference, _) = w.broker.read(&w.raw_reader).await.unwrap();
    let held = reference.unwrap().acquire().unwrap();

    w.broker.update(&w.raw_writer, "raw", &b"second"[..]).await.unwrap();
    w.broker.update(&w.raw_writer, "raw", &b"third"[..]).await.unwrap();

    assert_eq!(held.payload().as_ref(), b"first");
    assert_eq!(held.version(), 1);
    assert_eq!(w.broker.stats("raw").await.unwrap().retired_live, 1);

    let weak = held.downgrade();
    held.release();
    assert!(!weak.is_live());

    let err = weak.acquire().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AcquireOnDestroyed);
    assert_eq!(w.broker.memory_in_use(), b"third".len());
}

#[tokio::test]
async fn test_identity_round_trip() {
    let w = wiring(Duration::ZERO);
    let raw: Vec<u8> = (0..=255).collect();

    w.broker.update(&w.raw_writer, "raw", raw.clone()).await.unwrap();

    let (current, _) = w.broker.read(&w.raw_reader).await.unwrap();
    let handle = current.unwrap().acquire().unwrap();
    assert_eq!(handle.payload().as_ref(), raw.as_slice());
}

#[tokio::test]
async fn test_reader_sees_only_granted_topic() {
    let w = wiring(Duration::ZERO);
    w.broker.update(&w.rgb_writer, "rgb_led", RGB).await.unwrap();
    w.broker.update(&w.raw_writer, "raw", &b"secret"[..]).await.unwrap();

    // A user_led reader gets user_led state and nothing else
    let (current, version) = w.broker.read(&w.user_reader).await.unwrap();
    assert!(current.is_none());
    assert_eq!(version, 0);
    assert!(w.broker.acquire_current(&w.user_reader).await.unwrap().is_none());

    // Write tokens do not read
    for token in [&w.rgb_writer, &w.raw_writer] {
        let err = w.broker.acquire_current(token).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    let other = wiring(Duration::ZERO);
    let err = w.broker.read(&other.rgb_reader).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_on_shared_topic() {
    const WRITERS: usize = 4;
    const UPDATES: usize = 50;

    let mut builder = BrokerBuilder::new(
        BrokerConfig::default().default_min_interval(Duration::ZERO),
        vec![TopicSpec::new("shared").multi_writer()],
    )
    .unwrap();
    let writers: Vec<Token> = (0..WRITERS)
        .map(|_| builder.grant_write("shared").unwrap())
        .collect();
    let reader = builder.grant_read("shared").unwrap();
    let broker = builder.build();

    let tasks: Vec<_> = writers
        .into_iter()
        .enumerate()
        .map(|(n, token)| {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move {
                let mut versions = Vec::with_capacity(UPDATES);
                for i in 0..UPDATES {
                    let version = broker
                        .update(&token, "shared", vec![n as u8, i as u8])
                        .await
                        .unwrap();
                    versions.push(version);
                }
                versions
            })
        })
        .collect();

    let mut versions = Vec::new();
    for task in tasks {
        versions.extend(task.await.unwrap());
    }
    versions.sort_unstable();

    let expected: Vec<u64> = (1..=(WRITERS * UPDATES) as u64).collect();
    assert_eq!(versions, expected);
    assert_eq!(broker.read(&reader).await.unwrap().1, (WRITERS * UPDATES) as u64);
}

#[tokio::test]
async fn test_concurrent_writers_on_different_topics() {
    let w = Arc::new(wiring(Duration::ZERO));

    let raw = {
        let w = Arc::clone(&w);
        tokio::spawn(async move {
            for i in 0..10u8 {
                w.broker.update(&w.raw_writer, "raw", vec![i]).await.unwrap();
            }
        })
    };
    let rgb = {
        let w = Arc::clone(&w);
        tokio::spawn(async move {
            for _ in 0..10 {
                w.broker.update(&w.rgb_writer, "rgb_led", RGB).await.unwrap();
            }
        })
    };

    raw.await.unwrap();
    rgb.await.unwrap();

    assert_eq!(w.broker.read(&w.raw_reader).await.unwrap().1, 10);
    assert_eq!(w.broker.read(&w.rgb_reader).await.unwrap().1, 10);
}
