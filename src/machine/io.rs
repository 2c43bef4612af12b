//! Port-mapped I/O seam for the IN and OUT instructions.

/// Backend for the 256 I/O ports. The machine delegates every IN/OUT here so
/// hosts can decide what the ports are wired to.
pub trait PortBus {
    fn port_in(&mut self, port: u8) -> u8;
    fn port_out(&mut self, port: u8, value: u8);
}

/// Console wiring: every OUT byte is appended to a captured output buffer,
/// IN always reads zero.
#[derive(Debug, Default)]
pub struct ConsoleBus {
    output: Vec<u8>,
}

impl ConsoleBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl PortBus for ConsoleBus {
    fn port_in(&mut self, _port: u8) -> u8 {
        0
    }

    fn port_out(&mut self, _port: u8, value: u8) {
        self.output.push(value);
    }
}

/// Disconnected bus: reads return zero, writes are dropped.
#[derive(Debug, Default)]
pub struct NullBus;

impl PortBus for NullBus {
    fn port_in(&mut self, _port: u8) -> u8 {
        0
    }

    fn port_out(&mut self, _port: u8, _value: u8) {}
}
