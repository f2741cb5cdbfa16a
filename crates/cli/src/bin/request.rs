//! Sends one `SayHelloRequest` and prints the response.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use clap::Parser;
use uninats_cli::{ConnectArgs, Error, init_tracing};
use uninats_proto::v1::{SayHelloRequest, SayHelloResponse};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Subject to send the request to
    #[arg(long, default_value = "example.say.hello", env = "UNINATS_SUBJECT")]
    subject: String,

    /// Name to greet
    #[arg(default_value = "world")]
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    init_tracing(args.connect.debug);

    let client = args.connect.connect().await?;

    let result = client
        .request::<_, SayHelloResponse>(
            &args.subject,
            &SayHelloRequest {
                name: args.name.clone(),
            },
        )
        .await;
    client.close().await?;

    println!("{}", result?.message);

    Ok(())
}
