//! Answers `SayHelloRequest`s until interrupted.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::convert::Infallible;

use clap::Parser;
use tracing::{info, warn};
use uninats::{RequestContext, reply_fn};
use uninats_cli::{ConnectArgs, Error, init_tracing, shutdown_token};
use uninats_proto::v1::{SayHelloRequest, SayHelloResponse};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Subject to serve
    #[arg(long, default_value = "example.say.hello", env = "UNINATS_SUBJECT")]
    subject: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    init_tracing(args.connect.debug);

    let shutdown = shutdown_token();
    let client = args.connect.connect().await?;

    let mut faults = client.faults();
    tokio::spawn(async move {
        while let Ok(fault) = faults.recv().await {
            warn!(subject = fault.subject(), "request failed: {fault}");
        }
    });

    client
        .reply(
            &args.subject,
            reply_fn(|_context: RequestContext, request: SayHelloRequest| async move {
                Ok::<_, Infallible>(SayHelloResponse {
                    message: format!("Hello Reply {}", request.name),
                })
            }),
        )
        .await?;

    info!(subject = %args.subject, "serving requests");

    client.run(shutdown).await?;

    Ok(())
}
