//! Execution tracing seam.

use std::cell::RefCell;
use std::rc::Rc;

use crate::isa::EncodedBytes;

/// Events emitted while the machine steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// An instruction was fetched and is about to execute.
    Fetch {
        address: u16,
        bytes: EncodedBytes,
        text: String,
    },
    /// The machine halted at `address`.
    Halt { address: u16 },
}

pub trait ExecutionTracer {
    fn record(&mut self, event: &TraceEvent);
}

/// Prints one line per event to stderr, keeping stdout free for the
/// emulated program's own output.
#[derive(Debug, Default)]
pub struct TracePrinter;

impl ExecutionTracer for TracePrinter {
    fn record(&mut self, event: &TraceEvent) {
        match event {
            TraceEvent::Fetch { address, bytes, text } => {
                let raw = bytes
                    .iter()
                    .map(|byte| format!("{byte:02X}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                eprintln!("0x{address:04X}: {raw:<8} {text}");
            }
            TraceEvent::Halt { address } => {
                eprintln!("0x{address:04X}: halted");
            }
        }
    }
}

/// Collects events for inspection in tests. Clones share the same buffer, so
/// a handle kept outside the machine still sees everything recorded after
/// the tracer is boxed into it.
#[derive(Debug, Default, Clone)]
pub struct RecordingTracer {
    events: Rc<RefCell<Vec<TraceEvent>>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }
}

impl ExecutionTracer for RecordingTracer {
    fn record(&mut self, event: &TraceEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
