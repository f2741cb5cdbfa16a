//! Publishes a sample product event every few seconds.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use rand::seq::SliceRandom;
use tracing::info;
use uninats::{PublishOptions, StreamConfig};
use uninats_cli::{ConnectArgs, Error, init_tracing, shutdown_token};
use uninats_proto::v1::{Event, ProductCreated};
use uuid::Uuid;

const FRUITS: [&str; 10] = [
    "Apple", "Banana", "Orange", "Mango", "Grape", "Peach", "Plum", "Cherry", "Lemon", "Lime",
];

const SUBJECTS: [&str; 2] = ["sample.created", "sample.updated"];

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Seconds between events
    #[arg(long, default_value_t = 3, env = "UNINATS_INTERVAL_SECS")]
    interval_secs: u64,

    /// Stream to create before publishing
    #[arg(long, default_value = "product_stream", env = "UNINATS_STREAM")]
    stream: String,
}

fn sample_event() -> (&'static str, Event) {
    let mut rng = rand::thread_rng();
    let subject = SUBJECTS.choose(&mut rng).copied().unwrap_or(SUBJECTS[0]);
    let name = FRUITS.choose(&mut rng).copied().unwrap_or(FRUITS[0]);

    let event = Event {
        name: subject.to_string(),
        product: Some(ProductCreated {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            supplier_id: Uuid::new_v4().to_string(),
            created_at: Utc::now().timestamp_millis(),
        }),
    };

    (subject, event)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    init_tracing(args.connect.debug);

    let shutdown = shutdown_token();
    let client = args.connect.connect().await?;

    client
        .create_stream(
            StreamConfig::new(args.stream.clone())
                .description("Sample events")
                .subjects(["sample.>"])
                .max_bytes(1024 * 1024 * 1024),
        )
        .await?;

    let interval = Duration::from_secs(args.interval_secs);

    loop {
        let (subject, event) = sample_event();

        match client
            .publish_with_cancel(subject, &event, &PublishOptions::default(), &shutdown)
            .await
        {
            Ok(ack) => info!(subject, sequence = ack.sequence, "event published"),
            Err(uninats::Error::Cancelled) => break,
            Err(e) => {
                let _ = client.close().await;
                return Err(e.into());
            }
        }

        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }

    client.close().await?;

    Ok(())
}
