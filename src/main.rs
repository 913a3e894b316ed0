// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use std::{env, error::Error, path::Path, process::exit, sync::Arc, time::Instant};

use fetch_ponyfill::{host::HyperHost, minimal_tracer::MinimalTracer, vm::Vm, VERSION};
use tracing::trace;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    MinimalTracer::register()?;
    trace!("Started runtime");

    let now = Instant::now();

    let vm = Vm::new(Arc::new(HyperHost::from_env())).await?;
    trace!("Initialized VM in {}ms", now.elapsed().as_millis());

    start_cli(&vm).await;

    vm.idle().await?;

    Ok(())
}

fn print_version() {
    println!("fetch-ponyfill {}", VERSION);
}

fn usage() {
    print_version();
    println!(
        r#"

Usage:
  fetch-ponyfill <filename>
  fetch-ponyfill -v | --version
  fetch-ponyfill -h | --help
  fetch-ponyfill -e | --eval <source>

Options:
  -v, --version     Print version information
  -h, --help        Print this help message
  -e, --eval        Evaluate the provided source code as a module

fetch, Request, Response, Headers, URL, URLSearchParams, AbortController,
AbortSignal and AbortError are available as globals and as exports of the
"fetch-ponyfill" module.

Environment:
  FETCH_PONYFILL_LOG            tracing filter, e.g. "trace" or "fetch_ponyfill::http=trace"
  FETCH_PONYFILL_HTTP_TIMEOUT   request timeout in seconds (default 30)
  FETCH_PONYFILL_USER_AGENT     user-agent sent with every request
"#
    );
}

async fn start_cli(vm: &Vm) {
    let args: Vec<String> = env::args().collect();

    let Some(arg) = args.get(1) else {
        usage();
        return;
    };

    match arg.as_str() {
        "-v" | "--version" => print_version(),
        "-h" | "--help" => usage(),
        "-e" | "--eval" => {
            if let Some(source) = args.get(2) {
                vm.run_source(source.clone()).await;
            } else {
                eprintln!("eval: source is required.");
                exit(1);
            }
        },
        _ => {
            let filename = Path::new(arg);
            if filename.exists() {
                vm.run_file(filename).await;
            } else {
                eprintln!("No such file: {}", arg);
                exit(1);
            }
        },
    }
}
