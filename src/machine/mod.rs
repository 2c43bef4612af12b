//! The Leben-80 execution core: registers, memory, and the
//! fetch/decode/execute loop.

pub mod io;
pub mod memory;
pub mod trace;

use std::fmt;

use crate::isa::error::DecodeError;
use crate::isa::flags::ConditionFlags;
use crate::isa::instruction::Instruction;
use crate::isa::register::{Condition, Register, RegisterPair, StackPair};
use crate::isa::{self};

pub use io::{ConsoleBus, NullBus, PortBus};
pub use memory::Memory;
pub use trace::{ExecutionTracer, TraceEvent, TracePrinter};

/// Program-visible 8-bit registers plus the stack pointer. `M` is not stored
/// here; it resolves through memory at HL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RegisterFile {
    a: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    h: u8,
    l: u8,
    sp: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Running,
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepError {
    /// The byte stream at PC did not decode.
    Decode { address: u16, source: DecodeError },
}

pub type StepResult<T> = Result<T, StepError>;

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::Decode { address, source } => {
                write!(f, "decode failed at 0x{address:04X}: {source}")
            }
        }
    }
}

impl std::error::Error for StepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StepError::Decode { source, .. } => Some(source),
        }
    }
}

/// A complete machine instance: memory, register file, flags, halt state, and
/// the port-I/O backend it was wired with.
pub struct Machine<P: PortBus = ConsoleBus> {
    memory: Memory,
    regs: RegisterFile,
    pc: u16,
    flags: ConditionFlags,
    interrupts_enabled: bool,
    state: MachineState,
    ports: P,
    tracer: Option<Box<dyn ExecutionTracer>>,
}

impl Machine<ConsoleBus> {
    /// Machine with console-captured port output.
    pub fn with_console() -> Self {
        Machine::new(ConsoleBus::new())
    }
}

impl<P: PortBus> Machine<P> {
    pub fn new(ports: P) -> Self {
        Machine {
            memory: Memory::new(),
            regs: RegisterFile::default(),
            pc: 0,
            flags: ConditionFlags::empty(),
            interrupts_enabled: false,
            state: MachineState::Running,
            ports,
            tracer: None,
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn sp(&self) -> u16 {
        self.regs.sp
    }

    pub fn flags(&self) -> ConditionFlags {
        self.flags
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut P {
        &mut self.ports
    }

    pub fn set_tracer(&mut self, tracer: Option<Box<dyn ExecutionTracer>>) {
        self.tracer = tracer;
    }

    /// Reads an 8-bit register; `M` resolves through memory at HL.
    pub fn register(&self, register: Register) -> u8 {
        match register {
            Register::B => self.regs.b,
            Register::C => self.regs.c,
            Register::D => self.regs.d,
            Register::E => self.regs.e,
            Register::H => self.regs.h,
            Register::L => self.regs.l,
            Register::M => self.memory.read_u8(self.pair(RegisterPair::Hl)),
            Register::A => self.regs.a,
        }
    }

    pub fn set_register(&mut self, register: Register, value: u8) {
        match register {
            Register::B => self.regs.b = value,
            Register::C => self.regs.c = value,
            Register::D => self.regs.d = value,
            Register::E => self.regs.e = value,
            Register::H => self.regs.h = value,
            Register::L => self.regs.l = value,
            Register::M => {
                let address = self.pair(RegisterPair::Hl);
                self.memory.write_u8(address, value);
            }
            Register::A => self.regs.a = value,
        }
    }

    pub fn pair(&self, pair: RegisterPair) -> u16 {
        match pair {
            RegisterPair::Bc => u16::from_le_bytes([self.regs.c, self.regs.b]),
            RegisterPair::De => u16::from_le_bytes([self.regs.e, self.regs.d]),
            RegisterPair::Hl => u16::from_le_bytes([self.regs.l, self.regs.h]),
            RegisterPair::Sp => self.regs.sp,
        }
    }

    pub fn set_pair(&mut self, pair: RegisterPair, value: u16) {
        let [low, high] = value.to_le_bytes();
        match pair {
            RegisterPair::Bc => {
                self.regs.b = high;
                self.regs.c = low;
            }
            RegisterPair::De => {
                self.regs.d = high;
                self.regs.e = low;
            }
            RegisterPair::Hl => {
                self.regs.h = high;
                self.regs.l = low;
            }
            RegisterPair::Sp => self.regs.sp = value,
        }
    }

    /// Copies a program image into memory, points PC at it, and puts the
    /// machine in the running state.
    pub fn load_image(&mut self, origin: u16, image: &[u8]) {
        self.memory.load(origin, image);
        self.pc = origin;
        self.state = MachineState::Running;
    }

    /// Executes one instruction. A halted machine stays halted and returns
    /// `None`.
    pub fn step(&mut self) -> StepResult<Option<Instruction>> {
        if self.state == MachineState::Halted {
            return Ok(None);
        }
        let address = self.pc;
        let window = [
            self.memory.read_u8(address),
            self.memory.read_u8(address.wrapping_add(1)),
            self.memory.read_u8(address.wrapping_add(2)),
        ];
        let (instruction, len) =
            isa::decode(&window).map_err(|source| StepError::Decode { address, source })?;

        if self.tracer.is_some() {
            let event = TraceEvent::Fetch {
                address,
                bytes: instruction.encode(),
                text: instruction.to_string(),
            };
            if let Some(tracer) = self.tracer.as_mut() {
                tracer.record(&event);
            }
        }

        self.pc = address.wrapping_add(len as u16);
        self.execute(instruction, address);
        Ok(Some(instruction))
    }

    /// Steps until HLT or until `max_steps` instructions have run. Returns
    /// the number of instructions executed.
    pub fn run(&mut self, max_steps: u64) -> StepResult<u64> {
        let mut steps = 0;
        while steps < max_steps && self.state == MachineState::Running {
            if self.step()?.is_none() {
                break;
            }
            steps += 1;
        }
        Ok(steps)
    }

    fn execute(&mut self, instruction: Instruction, address: u16) {
        match instruction {
            Instruction::Nop => {}
            Instruction::Lxi(rp, data) => self.set_pair(rp, data),
            Instruction::Stax(rp) => {
                let target = self.pair(rp.widen());
                self.memory.write_u8(target, self.regs.a);
            }
            Instruction::Ldax(rp) => {
                let source = self.pair(rp.widen());
                self.regs.a = self.memory.read_u8(source);
            }
            Instruction::Inx(rp) => {
                let value = self.pair(rp).wrapping_add(1);
                self.set_pair(rp, value);
            }
            Instruction::Dcx(rp) => {
                let value = self.pair(rp).wrapping_sub(1);
                self.set_pair(rp, value);
            }
            Instruction::Inr(r) => {
                let value = self.register(r);
                let result = value.wrapping_add(1);
                self.flags
                    .set(ConditionFlags::AUX_CARRY, (value & 0x0F) + 1 > 0x0F);
                self.flags.set_zsp(result);
                self.set_register(r, result);
            }
            Instruction::Dcr(r) => {
                let value = self.register(r);
                let result = value.wrapping_sub(1);
                self.flags.set(ConditionFlags::AUX_CARRY, value & 0x0F != 0);
                self.flags.set_zsp(result);
                self.set_register(r, result);
            }
            Instruction::Mvi(r, data) => self.set_register(r, data),
            Instruction::Dad(rp) => {
                let hl = self.pair(RegisterPair::Hl);
                let (sum, carry) = hl.overflowing_add(self.pair(rp));
                self.flags.set(ConditionFlags::CARRY, carry);
                self.set_pair(RegisterPair::Hl, sum);
            }
            Instruction::Rlc => {
                let a = self.regs.a;
                self.flags.set(ConditionFlags::CARRY, a & 0x80 != 0);
                self.regs.a = a.rotate_left(1);
            }
            Instruction::Rrc => {
                let a = self.regs.a;
                self.flags.set(ConditionFlags::CARRY, a & 0x01 != 0);
                self.regs.a = a.rotate_right(1);
            }
            Instruction::Ral => {
                let a = self.regs.a;
                let carry_in = self.flags.contains(ConditionFlags::CARRY) as u8;
                self.flags.set(ConditionFlags::CARRY, a & 0x80 != 0);
                self.regs.a = a << 1 | carry_in;
            }
            Instruction::Rar => {
                let a = self.regs.a;
                let carry_in = self.flags.contains(ConditionFlags::CARRY) as u8;
                self.flags.set(ConditionFlags::CARRY, a & 0x01 != 0);
                self.regs.a = a >> 1 | carry_in << 7;
            }
            Instruction::Shld(addr) => {
                let hl = self.pair(RegisterPair::Hl);
                self.memory.write_u16(addr, hl);
            }
            Instruction::Lhld(addr) => {
                let value = self.memory.read_u16(addr);
                self.set_pair(RegisterPair::Hl, value);
            }
            Instruction::Daa => self.decimal_adjust(),
            Instruction::Cma => self.regs.a = !self.regs.a,
            Instruction::Sta(addr) => self.memory.write_u8(addr, self.regs.a),
            Instruction::Lda(addr) => self.regs.a = self.memory.read_u8(addr),
            Instruction::Stc => self.flags.insert(ConditionFlags::CARRY),
            Instruction::Cmc => self.flags.toggle(ConditionFlags::CARRY),
            Instruction::Mov(dst, src) => {
                let value = self.register(src);
                self.set_register(dst, value);
            }
            Instruction::Hlt => {
                self.state = MachineState::Halted;
                if self.tracer.is_some() {
                    let event = TraceEvent::Halt { address };
                    if let Some(tracer) = self.tracer.as_mut() {
                        tracer.record(&event);
                    }
                }
            }
            Instruction::Add(r) => {
                let value = self.register(r);
                self.add_to_accumulator(value, false);
            }
            Instruction::Adc(r) => {
                let value = self.register(r);
                let carry = self.flags.contains(ConditionFlags::CARRY);
                self.add_to_accumulator(value, carry);
            }
            Instruction::Sub(r) => {
                let value = self.register(r);
                self.regs.a = self.subtract_from_accumulator(value, false);
            }
            Instruction::Sbb(r) => {
                let value = self.register(r);
                let borrow = self.flags.contains(ConditionFlags::CARRY);
                self.regs.a = self.subtract_from_accumulator(value, borrow);
            }
            Instruction::Ana(r) => {
                let value = self.register(r);
                self.and_accumulator(value);
            }
            Instruction::Xra(r) => {
                let value = self.register(r);
                self.xor_accumulator(value);
            }
            Instruction::Ora(r) => {
                let value = self.register(r);
                self.or_accumulator(value);
            }
            Instruction::Cmp(r) => {
                let value = self.register(r);
                self.subtract_from_accumulator(value, false);
            }
            Instruction::Adi(data) => self.add_to_accumulator(data, false),
            Instruction::Aci(data) => {
                let carry = self.flags.contains(ConditionFlags::CARRY);
                self.add_to_accumulator(data, carry);
            }
            Instruction::Sui(data) => {
                self.regs.a = self.subtract_from_accumulator(data, false);
            }
            Instruction::Sbi(data) => {
                let borrow = self.flags.contains(ConditionFlags::CARRY);
                self.regs.a = self.subtract_from_accumulator(data, borrow);
            }
            Instruction::Ani(data) => self.and_accumulator(data),
            Instruction::Xri(data) => self.xor_accumulator(data),
            Instruction::Ori(data) => self.or_accumulator(data),
            Instruction::Cpi(data) => {
                self.subtract_from_accumulator(data, false);
            }
            Instruction::Rcond(cc) => {
                if self.condition_met(cc) {
                    self.pc = self.pop16();
                }
            }
            Instruction::Ret => self.pc = self.pop16(),
            Instruction::Jcond(cc, addr) => {
                if self.condition_met(cc) {
                    self.pc = addr;
                }
            }
            Instruction::Jmp(addr) => self.pc = addr,
            Instruction::Ccond(cc, addr) => {
                if self.condition_met(cc) {
                    let ret = self.pc;
                    self.push16(ret);
                    self.pc = addr;
                }
            }
            Instruction::Call(addr) => {
                let ret = self.pc;
                self.push16(ret);
                self.pc = addr;
            }
            Instruction::Rst(n) => {
                let ret = self.pc;
                self.push16(ret);
                self.pc = n.target();
            }
            Instruction::Push(rp) => {
                let value = self.stack_pair(rp);
                self.push16(value);
            }
            Instruction::Pop(rp) => {
                let value = self.pop16();
                self.set_stack_pair(rp, value);
            }
            Instruction::Xthl => {
                let hl = self.pair(RegisterPair::Hl);
                let stacked = self.memory.read_u16(self.regs.sp);
                self.memory.write_u16(self.regs.sp, hl);
                self.set_pair(RegisterPair::Hl, stacked);
            }
            Instruction::Pchl => self.pc = self.pair(RegisterPair::Hl),
            Instruction::Sphl => self.regs.sp = self.pair(RegisterPair::Hl),
            Instruction::Xchg => {
                let de = self.pair(RegisterPair::De);
                let hl = self.pair(RegisterPair::Hl);
                self.set_pair(RegisterPair::De, hl);
                self.set_pair(RegisterPair::Hl, de);
            }
            Instruction::Out(port) => self.ports.port_out(port, self.regs.a),
            Instruction::In(port) => self.regs.a = self.ports.port_in(port),
            Instruction::Di => self.interrupts_enabled = false,
            Instruction::Ei => self.interrupts_enabled = true,
        }
    }

    fn condition_met(&self, cc: Condition) -> bool {
        let flags = self.flags;
        match cc {
            Condition::NonZero => !flags.contains(ConditionFlags::ZERO),
            Condition::Zero => flags.contains(ConditionFlags::ZERO),
            Condition::NoCarry => !flags.contains(ConditionFlags::CARRY),
            Condition::Carry => flags.contains(ConditionFlags::CARRY),
            Condition::ParityOdd => !flags.contains(ConditionFlags::PARITY),
            Condition::ParityEven => flags.contains(ConditionFlags::PARITY),
            Condition::Plus => !flags.contains(ConditionFlags::SIGN),
            Condition::Minus => flags.contains(ConditionFlags::SIGN),
        }
    }

    fn add_to_accumulator(&mut self, value: u8, carry_in: bool) {
        let a = self.regs.a;
        let carry = carry_in as u8;
        let sum = u16::from(a) + u16::from(value) + u16::from(carry);
        let result = sum as u8;
        self.flags.set(ConditionFlags::CARRY, sum > 0xFF);
        self.flags.set(
            ConditionFlags::AUX_CARRY,
            (a & 0x0F) + (value & 0x0F) + carry > 0x0F,
        );
        self.flags.set_zsp(result);
        self.regs.a = result;
    }

    /// Subtracts and returns the result without storing it, so CMP/CPI share
    /// the flag computation with SUB/SBB.
    fn subtract_from_accumulator(&mut self, value: u8, borrow_in: bool) -> u8 {
        let a = self.regs.a;
        let borrow = borrow_in as u8;
        let result = a.wrapping_sub(value).wrapping_sub(borrow);
        self.flags.set(
            ConditionFlags::CARRY,
            u16::from(value) + u16::from(borrow) > u16::from(a),
        );
        // Carry out of bit 3 of the internal complement addition.
        let low_nibble = (a & 0x0F) + (!value & 0x0F) + (1 - borrow);
        self.flags.set(ConditionFlags::AUX_CARRY, low_nibble > 0x0F);
        self.flags.set_zsp(result);
        result
    }

    fn and_accumulator(&mut self, value: u8) {
        let a = self.regs.a;
        let result = a & value;
        self.flags.set(ConditionFlags::CARRY, false);
        // AND ops set aux carry from the OR of bit 3 of the operands.
        self.flags
            .set(ConditionFlags::AUX_CARRY, (a | value) & 0x08 != 0);
        self.flags.set_zsp(result);
        self.regs.a = result;
    }

    fn xor_accumulator(&mut self, value: u8) {
        let result = self.regs.a ^ value;
        self.flags.set(ConditionFlags::CARRY, false);
        self.flags.set(ConditionFlags::AUX_CARRY, false);
        self.flags.set_zsp(result);
        self.regs.a = result;
    }

    fn or_accumulator(&mut self, value: u8) {
        let result = self.regs.a | value;
        self.flags.set(ConditionFlags::CARRY, false);
        self.flags.set(ConditionFlags::AUX_CARRY, false);
        self.flags.set_zsp(result);
        self.regs.a = result;
    }

    fn decimal_adjust(&mut self) {
        let a = self.regs.a;
        let mut correction = 0u8;
        let mut carry = self.flags.contains(ConditionFlags::CARRY);
        if a & 0x0F > 9 || self.flags.contains(ConditionFlags::AUX_CARRY) {
            correction |= 0x06;
        }
        if a > 0x99 || carry {
            correction |= 0x60;
            carry = true;
        }
        self.add_to_accumulator(correction, false);
        self.flags.set(ConditionFlags::CARRY, carry);
    }

    fn stack_pair(&self, rp: StackPair) -> u16 {
        match rp {
            StackPair::Bc => self.pair(RegisterPair::Bc),
            StackPair::De => self.pair(RegisterPair::De),
            StackPair::Hl => self.pair(RegisterPair::Hl),
            StackPair::Psw => {
                u16::from_le_bytes([self.flags.to_psw_byte(), self.regs.a])
            }
        }
    }

    fn set_stack_pair(&mut self, rp: StackPair, value: u16) {
        let [low, high] = value.to_le_bytes();
        match rp {
            StackPair::Bc => self.set_pair(RegisterPair::Bc, value),
            StackPair::De => self.set_pair(RegisterPair::De, value),
            StackPair::Hl => self.set_pair(RegisterPair::Hl, value),
            StackPair::Psw => {
                self.flags = ConditionFlags::from_psw_byte(low);
                self.regs.a = high;
            }
        }
    }

    fn push16(&mut self, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        self.memory.write_u16(self.regs.sp, value);
    }

    fn pop16(&mut self) -> u16 {
        let value = self.memory.read_u16(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::register::RestartIndex;

    fn machine() -> Machine<NullBus> {
        Machine::new(NullBus)
    }

    fn exec(m: &mut Machine<NullBus>, instructions: &[Instruction]) {
        for instruction in instructions {
            m.execute(*instruction, 0);
        }
    }

    #[test]
    fn add_sets_carry_and_aux_carry() {
        let mut m = machine();
        exec(&mut m, &[Instruction::Mvi(Register::A, 0x3C), Instruction::Adi(0x3C)]);
        assert_eq!(m.register(Register::A), 0x78);
        assert!(!m.flags().contains(ConditionFlags::CARRY));
        assert!(m.flags().contains(ConditionFlags::AUX_CARRY));
        assert!(m.flags().contains(ConditionFlags::PARITY), "0x78 has even parity");

        exec(&mut m, &[Instruction::Adi(0x89)]);
        assert_eq!(m.register(Register::A), 0x01);
        assert!(m.flags().contains(ConditionFlags::CARRY));
        assert!(!m.flags().contains(ConditionFlags::ZERO));
    }

    #[test]
    fn subtract_borrow_semantics() {
        let mut m = machine();
        exec(&mut m, &[Instruction::Mvi(Register::A, 0x3E), Instruction::Sui(0x3E)]);
        assert_eq!(m.register(Register::A), 0);
        assert!(m.flags().contains(ConditionFlags::ZERO));
        assert!(!m.flags().contains(ConditionFlags::CARRY));
        assert!(m.flags().contains(ConditionFlags::AUX_CARRY), "no borrow out of bit 3");

        exec(&mut m, &[Instruction::Sui(0x01)]);
        assert_eq!(m.register(Register::A), 0xFF);
        assert!(m.flags().contains(ConditionFlags::CARRY), "borrow sets carry");
        assert!(m.flags().contains(ConditionFlags::SIGN));
    }

    #[test]
    fn compare_leaves_accumulator_untouched() {
        let mut m = machine();
        exec(&mut m, &[Instruction::Mvi(Register::A, 0x0A), Instruction::Cpi(0x0A)]);
        assert_eq!(m.register(Register::A), 0x0A);
        assert!(m.flags().contains(ConditionFlags::ZERO));
    }

    #[test]
    fn inr_dcr_do_not_touch_carry() {
        let mut m = machine();
        exec(&mut m, &[Instruction::Stc, Instruction::Mvi(Register::B, 0xFF)]);
        exec(&mut m, &[Instruction::Inr(Register::B)]);
        assert_eq!(m.register(Register::B), 0x00);
        assert!(m.flags().contains(ConditionFlags::ZERO));
        assert!(m.flags().contains(ConditionFlags::CARRY), "carry preserved");

        exec(&mut m, &[Instruction::Dcr(Register::B)]);
        assert_eq!(m.register(Register::B), 0xFF);
        assert!(m.flags().contains(ConditionFlags::CARRY));
        assert!(!m.flags().contains(ConditionFlags::AUX_CARRY), "borrow from low nibble");
    }

    #[test]
    fn dad_only_touches_carry() {
        let mut m = machine();
        m.set_pair(RegisterPair::Hl, 0xFFFF);
        m.set_pair(RegisterPair::Bc, 0x0001);
        exec(&mut m, &[Instruction::Dad(RegisterPair::Bc)]);
        assert_eq!(m.pair(RegisterPair::Hl), 0x0000);
        assert!(m.flags().contains(ConditionFlags::CARRY));
        assert!(!m.flags().contains(ConditionFlags::ZERO), "zero flag untouched");
    }

    #[test]
    fn rotate_instructions() {
        let mut m = machine();
        exec(&mut m, &[Instruction::Mvi(Register::A, 0b1000_0001), Instruction::Rlc]);
        assert_eq!(m.register(Register::A), 0b0000_0011);
        assert!(m.flags().contains(ConditionFlags::CARRY));

        exec(&mut m, &[Instruction::Mvi(Register::A, 0b0000_0010), Instruction::Rar]);
        assert_eq!(m.register(Register::A), 0b1000_0001, "carry rotates into bit 7");
        assert!(!m.flags().contains(ConditionFlags::CARRY));
    }

    #[test]
    fn daa_adjusts_packed_bcd() {
        let mut m = machine();
        // 0x19 + 0x28 = 0x41 binary; decimal adjust yields 0x47.
        exec(&mut m, &[Instruction::Mvi(Register::A, 0x19), Instruction::Adi(0x28)]);
        exec(&mut m, &[Instruction::Daa]);
        assert_eq!(m.register(Register::A), 0x47);
        assert!(!m.flags().contains(ConditionFlags::CARRY));
    }

    #[test]
    fn logic_group_clears_carry() {
        let mut m = machine();
        exec(&mut m, &[
            Instruction::Stc,
            Instruction::Mvi(Register::A, 0xF0),
            Instruction::Ani(0x0F),
        ]);
        assert_eq!(m.register(Register::A), 0x00);
        assert!(m.flags().contains(ConditionFlags::ZERO));
        assert!(!m.flags().contains(ConditionFlags::CARRY));
    }

    #[test]
    fn memory_operand_reads_and_writes_through_hl() {
        let mut m = machine();
        m.set_pair(RegisterPair::Hl, 0x2000);
        exec(&mut m, &[Instruction::Mvi(Register::M, 0x42)]);
        assert_eq!(m.memory().read_u8(0x2000), 0x42);
        exec(&mut m, &[Instruction::Mov(Register::A, Register::M)]);
        assert_eq!(m.register(Register::A), 0x42);
    }

    #[test]
    fn push_pop_psw_round_trips_flags() {
        let mut m = machine();
        m.set_pair(RegisterPair::Sp, 0x2400);
        exec(&mut m, &[
            Instruction::Mvi(Register::A, 0x55),
            Instruction::Adi(0xAB), // produces zero + carry + aux carry
            Instruction::Mvi(Register::A, 0x99),
            Instruction::Push(StackPair::Psw),
            Instruction::Mvi(Register::A, 0x00),
            Instruction::Stc,
            Instruction::Cmc, // clear carry
            Instruction::Pop(StackPair::Psw),
        ]);
        assert_eq!(m.register(Register::A), 0x99);
        assert!(m.flags().contains(ConditionFlags::ZERO));
        assert!(m.flags().contains(ConditionFlags::CARRY));
        assert_eq!(m.sp(), 0x2400);
    }

    #[test]
    fn call_and_ret_use_the_stack() {
        let mut m = machine();
        m.set_pair(RegisterPair::Sp, 0x2400);
        // CALL at pc=0x0100 returns to 0x0103.
        m.set_pc(0x0103);
        m.execute(Instruction::Call(0x0200), 0x0100);
        assert_eq!(m.pc(), 0x0200);
        assert_eq!(m.sp(), 0x23FE);
        assert_eq!(m.memory().read_u16(0x23FE), 0x0103);

        m.execute(Instruction::Ret, 0x0200);
        assert_eq!(m.pc(), 0x0103);
        assert_eq!(m.sp(), 0x2400);
    }

    #[test]
    fn rst_calls_fixed_vector() {
        let mut m = machine();
        m.set_pair(RegisterPair::Sp, 0x2400);
        m.set_pc(0x0101);
        m.execute(Instruction::Rst(RestartIndex::from_code(3)), 0x0100);
        assert_eq!(m.pc(), 0x0018);
        assert_eq!(m.memory().read_u16(0x23FE), 0x0101);
    }

    #[test]
    fn conditional_jump_follows_flags() {
        let mut m = machine();
        exec(&mut m, &[Instruction::Mvi(Register::A, 1), Instruction::Dcr(Register::A)]);
        m.set_pc(0x0000);
        m.execute(Instruction::Jcond(Condition::Zero, 0x1234), 0x0000);
        assert_eq!(m.pc(), 0x1234);
        m.execute(Instruction::Jcond(Condition::NonZero, 0x4321), 0x1234);
        assert_eq!(m.pc(), 0x1234, "untaken jump leaves pc alone");
    }

    #[test]
    fn exchange_and_stack_transfer_ops() {
        let mut m = machine();
        m.set_pair(RegisterPair::De, 0x1111);
        m.set_pair(RegisterPair::Hl, 0x2222);
        exec(&mut m, &[Instruction::Xchg]);
        assert_eq!(m.pair(RegisterPair::De), 0x2222);
        assert_eq!(m.pair(RegisterPair::Hl), 0x1111);

        m.set_pair(RegisterPair::Sp, 0x2400);
        m.memory_mut().write_u16(0x2400, 0xABCD);
        exec(&mut m, &[Instruction::Xthl]);
        assert_eq!(m.pair(RegisterPair::Hl), 0xABCD);
        assert_eq!(m.memory().read_u16(0x2400), 0x1111);

        exec(&mut m, &[Instruction::Sphl]);
        assert_eq!(m.sp(), 0xABCD);
    }

    #[test]
    fn halted_machine_stays_halted() {
        let mut m = Machine::with_console();
        m.load_image(0, &[0x76]); // HLT
        assert_eq!(m.step().expect("step"), Some(Instruction::Hlt));
        assert_eq!(m.state(), MachineState::Halted);
        assert_eq!(m.step().expect("step"), None);
    }

    #[test]
    fn out_bytes_are_captured_by_console() {
        let mut m = Machine::with_console();
        // MVI A,'H' / OUT 0 / MVI A,'I' / OUT 0 / HLT
        m.load_image(0, &[0x3E, b'H', 0xD3, 0x00, 0x3E, b'I', 0xD3, 0x00, 0x76]);
        m.run(16).expect("run");
        assert_eq!(m.ports().output(), b"HI");
    }

    #[test]
    fn in_reads_accumulator_from_port_bus() {
        struct AddressedBus;
        impl PortBus for AddressedBus {
            fn port_in(&mut self, port: u8) -> u8 {
                port | 0x80
            }
            fn port_out(&mut self, _port: u8, _value: u8) {}
        }

        let mut m = Machine::new(AddressedBus);
        m.execute(Instruction::In(0x21), 0);
        assert_eq!(m.register(Register::A), 0xA1, "port value lands in A");
        m.execute(Instruction::In(0x00), 0);
        assert_eq!(m.register(Register::A), 0x80);
    }

    #[test]
    fn ei_di_toggle_interrupt_enable() {
        let mut m = machine();
        assert!(!m.interrupts_enabled(), "machine resets with interrupts off");
        exec(&mut m, &[Instruction::Ei]);
        assert!(m.interrupts_enabled());
        exec(&mut m, &[Instruction::Di]);
        assert!(!m.interrupts_enabled());
    }

    #[test]
    fn step_reports_decode_failure_address() {
        let mut m = machine();
        m.load_image(0x0100, &[0x08]);
        let err = m.step().expect_err("unassigned opcode");
        assert_eq!(
            err,
            StepError::Decode {
                address: 0x0100,
                source: DecodeError::UnknownOpcode { opcode: 0x08 },
            }
        );
    }

    #[test]
    fn run_stops_at_step_budget() {
        let mut m = machine();
        m.load_image(0, &[0xC3, 0x00, 0x00]); // JMP 0: infinite loop
        let steps = m.run(10).expect("run");
        assert_eq!(steps, 10);
        assert_eq!(m.state(), MachineState::Running);
    }
}
