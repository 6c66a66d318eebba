//! Configuration broker simulator
//!
//! Run with: cargo run --example simulator
//!
//! Wires the standard topics to a simulated board:
//!
//! - A fake remote feed pushes `logger`, `rgbled` and `userled` messages,
//!   some of them invalid, then two updates in quick succession to show rate
//!   limiting
//! - A switch-bank producer publishes the `system` topic
//! - Two consumers print what they are given
//! - A status publisher signs a report after every `system` change
//!
//! Set `RUST_LOG=config_broker=debug` to see every commit and dispatch.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use config_broker::ingest::{InboundMessage, RemoteIngest};
use config_broker::producer::{SwitchSensor, SystemProducer};
use config_broker::status::{StatusPublisher, StatusSigner};
use config_broker::topics::system::SWITCH_COUNT;
use config_broker::topics::{
    standard_topics, LoggerConfig, RgbLedConfig, SystemConfig, UserLedConfig,
};
use config_broker::{
    typed, BrokerBuilder, BrokerConfig, ConfigHandler, ErrorKind, HandlerError, SnapshotHandle,
};
use tokio::sync::mpsc;

/// Pause between remote messages so the consumers get a chance to run
const STEP: Duration = Duration::from_millis(500);

struct Message {
    description: &'static str,
    expected: Option<ErrorKind>,
    topic: &'static str,
    json: &'static str,
}

const MESSAGES: &[Message] = &[
    Message {
        description: "Valid RGB LED config",
        expected: None,
        topic: "rgbled",
        json: r#"{"led0":{"red":0,"green":86,"blue":164},"led1":{"red":255,"green":200,"blue":200}}"#,
    },
    Message {
        description: "Valid User LED config",
        expected: None,
        topic: "userled",
        json: r#"{"led0":"on","led1":"off","led2":"ON","led3":"OFF","led4":"On","led5":"Off","led6":"on","led7":"off"}"#,
    },
    Message {
        description: "Invalid RGB LED config (bad JSON)",
        expected: Some(ErrorKind::Malformed),
        topic: "rgbled",
        json: r#"{"x":"#,
    },
    Message {
        description: "Valid User LED config",
        expected: None,
        topic: "userled",
        json: r#"{"led0":"OFF","led1":"ON","led2":"off","led3":"on","led4":"Off","led5":"On","led6":"off","led7":"on"}"#,
    },
    Message {
        description: "Valid RGB LED config (keys reordered)",
        expected: None,
        topic: "rgbled",
        json: r#"{"led1":{"red":0,"green":86,"blue":164},"led0":{"red":255,"green":200,"blue":200}}"#,
    },
    Message {
        description: "Invalid RGB LED config (out of range)",
        expected: Some(ErrorKind::OutOfRange),
        topic: "rgbled",
        json: r#"{"led0":{"red":0,"green":286,"blue":400},"led1":{"red":255,"green":200,"blue":200}}"#,
    },
];

/// Switch bank that walks through a fixed pattern
struct WalkingSwitches {
    step: u8,
}

impl SwitchSensor for WalkingSwitches {
    fn read_switches(&mut self) -> [bool; SWITCH_COUNT] {
        self.step = self.step.wrapping_add(1);
        let bits = self.step / 4;

        let mut switches = [false; SWITCH_COUNT];
        for (i, switch) in switches.iter_mut().enumerate() {
            *switch = bits & (1 << i) != 0;
        }
        switches
    }
}

/// Stand-in for the device signing service
struct DemoSigner;

impl StatusSigner for DemoSigner {
    fn sign(&self, context: &str, message: &[u8]) -> Result<Bytes, HandlerError> {
        let checksum = message.iter().fold(0u32, |acc, b| acc.rotate_left(5) ^ u32::from(*b));
        let mut signed = message.to_vec();
        signed.extend_from_slice(format!(" sig[{}:{:08x}]", context, checksum).as_bytes());
        Ok(Bytes::from(signed))
    }
}

fn log_logger(config: &LoggerConfig) -> Result<(), HandlerError> {
    println!(
        "[consumer1] logger -> {}:{} level {}",
        config.address, config.port, config.level
    );
    Ok(())
}

fn log_rgb(config: &RgbLedConfig) -> Result<(), HandlerError> {
    println!(
        "[consumer1] rgb_led -> led0 ({}, {}, {}) led1 ({}, {}, {})",
        config.led0.red,
        config.led0.green,
        config.led0.blue,
        config.led1.red,
        config.led1.green,
        config.led1.blue
    );
    Ok(())
}

fn log_user(config: &UserLedConfig) -> Result<(), HandlerError> {
    println!("[consumer2] user_led -> {:08b}", config.bits());
    Ok(())
}

fn log_system(config: &SystemConfig) -> Result<(), HandlerError> {
    println!(
        "[consumer2] system -> id {} switches {:08b}",
        config.id,
        config.switch_bits()
    );
    Ok(())
}

fn boxed(handler: impl ConfigHandler + 'static) -> Box<dyn ConfigHandler> {
    Box::new(handler)
}

fn logger_json(address: &str, port: i64, level: &str) -> Bytes {
    let value = serde_json::json!({
        "host": { "address": address, "port": port },
        "level": level,
    });
    Bytes::from(value.to_string())
}

fn check(description: &str, result: config_broker::Result<u64>, expected: Option<ErrorKind>) {
    let actual = result.as_ref().err().map(|e| e.kind());
    match &result {
        Ok(version) => println!("  -> committed v{}", version),
        Err(err) => println!("  -> rejected: {}", err),
    }
    if actual != expected {
        eprintln!(
            "  !! {}: expected {:?}, got {:?}",
            description, expected, actual
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("config_broker=info".parse()?),
        )
        .init();

    // Static wiring: every token is minted here and handed to its owner
    let mut builder = BrokerBuilder::new(
        BrokerConfig::default().wait_timeout(Duration::from_secs(5)),
        standard_topics(),
    )?;

    let logger_writer = builder.grant_write("logger")?;
    let rgb_writer = builder.grant_write("rgb_led")?;
    let user_writer = builder.grant_write("user_led")?;
    let system_writer = builder.grant_write("system")?;

    let consumer1 = vec![
        (builder.grant_read("logger")?, boxed(typed(log_logger))),
        (builder.grant_read("rgb_led")?, boxed(typed(log_rgb))),
    ];
    let consumer2 = vec![
        (builder.grant_read("user_led")?, boxed(typed(log_user))),
        (builder.grant_read("system")?, boxed(typed(log_system))),
    ];
    let status_reader = builder.grant_read("system")?;
    let status_trigger = builder.grant_read("system")?;

    let broker = builder.build();

    // Consumers
    let (stop_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let mut tasks = Vec::new();
    for items in [consumer1, consumer2] {
        let subscription = broker.subscribe(items).await?;
        let mut stop = stop_tx.subscribe();
        tasks.push(tokio::spawn(subscription.run_until(async move {
            let _ = stop.recv().await;
        })));
    }

    // Status publisher, triggered by system changes
    let publisher = Arc::new(StatusPublisher::new(Arc::clone(&broker), status_reader, DemoSigner));
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let trigger = move |snapshot: &SnapshotHandle| -> Result<(), HandlerError> {
        status_tx.send(snapshot.version())?;
        Ok(())
    };
    let status_subscription = broker.subscribe(vec![(status_trigger, boxed(trigger))]).await?;
    let mut stop = stop_tx.subscribe();
    tasks.push(tokio::spawn(status_subscription.run_until(async move {
        let _ = stop.recv().await;
    })));

    let status_publisher = Arc::clone(&publisher);
    let status_task = tokio::spawn(async move {
        while status_rx.recv().await.is_some() {
            match status_publisher.publish().await {
                Ok(Some(signed)) => println!(
                    "[status] v{} {}",
                    signed.version,
                    String::from_utf8_lossy(&signed.message)
                ),
                Ok(None) => {}
                Err(err) => eprintln!("[status] {}", err),
            }
        }
    });

    // Local sensor producer
    let producer = SystemProducer::new(
        Arc::clone(&broker),
        system_writer,
        "Sonata",
        WalkingSwitches { step: 0 },
    )
    .poll_interval(Duration::from_millis(250));
    let mut stop = stop_tx.subscribe();
    let producer_task = tokio::spawn(producer.run_until(async move {
        let _ = stop.recv().await;
    }));

    // Logger is written directly by the provider
    println!("-------- Logger (Warn) --------");
    let result = broker
        .update(&logger_writer, "logger", logger_json("100.101.102.103", 666, "warn"))
        .await;
    check("Logger (Warn)", result, None);
    tokio::time::sleep(STEP).await;

    println!("-------- Logger (Debug) --------");
    let result = broker
        .update(&logger_writer, "logger", logger_json("100.101.102.103", 666, "debug"))
        .await;
    check("Logger (Debug)", result, None);
    tokio::time::sleep(STEP).await;

    println!("-------- Logger (Invalid address and port) --------");
    let result = broker
        .update(&logger_writer, "logger", logger_json("invalidAddress", 0, "debug"))
        .await;
    check("Logger (Invalid)", result, Some(ErrorKind::OutOfRange));

    // Remote feed
    let ingest = RemoteIngest::new(Arc::clone(&broker))
        .route("rgbled", rgb_writer)
        .route("userled", user_writer);

    for message in MESSAGES {
        println!("-------- {} --------", message.description);
        let result = ingest.handle(message.topic, message.json).await;
        check(message.description, result, message.expected);
        tokio::time::sleep(STEP).await;
    }

    println!("-------- Rate limiting --------");
    let (tx, rx) = mpsc::channel(4);
    tx.send(InboundMessage::new("userled", MESSAGES[1].json)).await?;
    tx.send(InboundMessage::new("userled", MESSAGES[3].json)).await?;
    drop(tx);
    let stats = ingest.run(rx).await;
    println!(
        "  -> accepted {} rejected {} unrouted {}",
        stats.accepted, stats.rejected, stats.unrouted
    );
    tokio::time::sleep(STEP).await;

    // Shut down
    let _ = stop_tx.send(());
    for task in tasks {
        task.await?;
    }
    producer_task.await?;
    status_task.await?;

    println!("-------- Topic stats --------");
    for name in broker.topic_names() {
        if let Some(stats) = broker.stats(name).await {
            println!(
                "{:<10} v{:<3} accepted {:<3} rejected {:<3} live retired {}",
                stats.name,
                stats.version,
                stats.updates.accepted,
                stats.updates.rejected(),
                stats.retired_live
            );
        }
    }
    println!("memory in use: {} bytes", broker.memory_in_use());
    println!(
        "status clear message: {} bytes",
        publisher.clear().len()
    );

    Ok(())
}
