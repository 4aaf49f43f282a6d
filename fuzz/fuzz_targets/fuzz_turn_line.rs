#![no_main]

//! Raw request line fuzzer.
//!
//! Feeds arbitrary bytes through the protocol driver as a single input line.
//! The driver must either answer with exactly one output line or stop with a
//! protocol error, and must never panic.

use std::io::Cursor;

use gridbot::protocol::{self, Message};
use gridbot::script::Returned;
use gridbot::{HarnessConfig, NativeProgram, TurnRunner};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let line = text.replace('\n', " ");

    let program = NativeProgram::new(|_, _, _| Ok(Returned::Nothing));
    let mut runner = TurnRunner::new(program, HarnessConfig::default());
    let mut out = Vec::new();

    match protocol::serve(&mut runner, Cursor::new(line), &mut out) {
        Ok(turns) => {
            let written = String::from_utf8(out).expect("output is UTF-8");
            assert_eq!(written.lines().count(), turns);
            for answer in written.lines() {
                assert!(matches!(protocol::parse_line(answer), Ok(Message::Output(_))));
            }
        }
        Err(_) => assert!(out.is_empty(), "no answer may be written for a bad line"),
    }
});
