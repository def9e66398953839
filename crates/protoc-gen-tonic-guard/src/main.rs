use std::io::{self, Read, Write};

use anyhow::Context;
use prost::Message;
use tracing_subscriber::EnvFilter;

use protoc_gen_tonic_guard::Generator;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("protoc-gen-tonic-guard: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut request = Vec::new();
    io::stdin()
        .read_to_end(&mut request)
        .context("failed to read request from stdin")?;

    let generator = Generator::new()?;
    let response = generator.generate(&request)?;

    let mut output = Vec::with_capacity(response.encoded_len());
    response
        .encode(&mut output)
        .context("failed to encode response")?;
    io::stdout()
        .write_all(&output)
        .context("failed to write response to stdout")?;
    Ok(())
}
