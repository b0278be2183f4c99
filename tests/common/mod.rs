#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

use rust_i2l::device::Devices;
use rust_i2l::fault::Fault;
use rust_i2l::interp;
use rust_i2l::loader;
use rust_i2l::machine::Machine;

/// Shared in-memory sink standing in for the console, so tests can read
/// back what a program printed.
#[derive(Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A machine wired to an in-memory console, with the given object stream
/// already loaded.
pub fn machine_with_program(stream: &str, input: &str) -> (Machine, Capture) {
    let capture = Capture::default();
    let mut m = Machine::new();
    m.devices = Devices::with_streams(
        Box::new(Cursor::new(input.as_bytes().to_vec())),
        Box::new(capture.clone()),
    );
    loader::load(&mut m, stream.as_bytes()).expect("object stream failed to load");
    (m, capture)
}

/// Load and run an object stream to completion, returning the machine,
/// whatever it wrote to the console, and the run result.
pub fn run_program(stream: &str) -> (Machine, String, Result<(), Fault>) {
    run_program_with_input(stream, "")
}

pub fn run_program_with_input(
    stream: &str,
    input: &str,
) -> (Machine, String, Result<(), Fault>) {
    let (mut m, capture) = machine_with_program(stream, input);
    let result = m.reset().and_then(|()| interp::run(&mut m, &mut None));
    let output = capture.contents();
    (m, output, result)
}

/// A bare machine with an in-memory console and a heap placed clear of
/// the stack, for tests that poke at the primitives directly.
pub fn bare_machine() -> (Machine, Capture) {
    bare_machine_with_input("")
}

pub fn bare_machine_with_input(input: &str) -> (Machine, Capture) {
    let capture = Capture::default();
    let mut m = Machine::new();
    m.devices = Devices::with_streams(
        Box::new(Cursor::new(input.as_bytes().to_vec())),
        Box::new(capture.clone()),
    );
    m.heap_start = 0x2000;
    m.hp = 0x2000;
    (m, capture)
}
