// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Demonstrates how to use [`xp::XenTraceParser`] to decode the events of a
//! XenTrace binary file.
//!
//! Set `RUST_LOG=debug` to see parser diagnostics.

use std::env;
use std::process;
use std::vec;

use xentrace_parser as xp;

fn main() -> process::ExitCode {
    env_logger::init();

    let mut result = process::ExitCode::SUCCESS;

    let mut filenames = vec::Vec::new();
    let mut event_order = xp::XenTraceEventOrder::Time;
    let mut byte_reader = xp::XenByteReader::KEEP_ENDIAN;

    for arg in env::args().skip(1) {
        if arg == "--file-order" {
            event_order = xp::XenTraceEventOrder::File;
        } else if arg == "--swap-endian" {
            byte_reader = xp::XenByteReader::SWAP_ENDIAN;
        } else if arg.starts_with('-') {
            eprintln!("Unknown option: {}", arg);
            return usage();
        } else {
            filenames.push(arg);
        }
    }

    if filenames.is_empty() {
        eprintln!("No input files specified.");
        return usage();
    }

    let options = xp::XenTraceParserOptions {
        byte_reader,
        event_order,
    };

    for filename in &filenames {
        println!("Processing: {}", filename);

        let mut parser = match xp::XenTraceParser::with_options(filename, options) {
            Ok(parser) => parser,
            Err(e) => {
                eprintln!("Error {} creating parser for {}", e, filename);
                result = process::ExitCode::FAILURE;
                continue;
            }
        };

        match parser.try_execute() {
            Err(e) => {
                eprintln!("Error {} reading {}", e, filename);
                result = process::ExitCode::FAILURE;
                continue;
            }
            Ok(count) => {
                println!("  {} events on {} host cpus", count, parser.cpu_count());
            }
        }

        if let Some(xp::XenTraceStopReason::Truncated { offset }) = parser.stop_reason() {
            eprintln!("  Warning: trace truncated at offset {}", offset);
        }

        while let Some(event) = parser.next_event() {
            println!("  {}", event);
        }
    }

    result
}

fn usage() -> process::ExitCode {
    eprintln!("Usage: decode_xentrace [--file-order] [--swap-endian] <trace1.bin> [<trace2.bin> ...]");
    process::ExitCode::FAILURE
}
