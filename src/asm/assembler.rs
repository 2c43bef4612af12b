//! Two-pass assembler: pass one sizes statements and collects symbols, pass
//! two resolves every reference and emits the image.

use ahash::AHashMap;

use crate::asm::error::{AsmError, AsmResult};
use crate::asm::lexer::Token;
use crate::asm::parser::{LineBody, Operand, OperandKind, SourceLine, parse_source};
use crate::isa::{
    Condition, IndirectPair, Instruction, Register, RegisterPair, RestartIndex, StackPair,
};

/// Only the first five characters of a symbol are significant; comparison is
/// case-insensitive.
const SIGNIFICANT_CHARS: usize = 5;

/// Assembled output: a contiguous byte image and the address it loads at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub origin: u16,
    pub bytes: Vec<u8>,
}

/// Label and EQU definitions keyed by their normalized names.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: AHashMap<String, u16>,
}

impl SymbolTable {
    fn normalize(name: &str) -> String {
        name.chars()
            .take(SIGNIFICANT_CHARS)
            .map(|ch| ch.to_ascii_uppercase())
            .collect()
    }

    /// Returns false when the normalized name is already taken.
    pub fn define(&mut self, name: &str, value: u16) -> bool {
        self.entries.insert(Self::normalize(name), value).is_none()
    }

    pub fn lookup(&self, name: &str) -> Option<u16> {
        self.entries.get(&Self::normalize(name)).copied()
    }
}

/// Assembles source text into a loadable image.
pub fn assemble(source: &str) -> AsmResult<Image> {
    let lines = parse_source(source)?;
    let mut asm = Assembler {
        symbols: SymbolTable::default(),
    };
    asm.collect_symbols(&lines)?;
    asm.emit(&lines)
}

struct Assembler {
    symbols: SymbolTable,
}

impl Assembler {
    /// Pass one: walk the statements tracking the location counter and define
    /// every label and EQU. Instruction widths depend only on the mnemonic,
    /// so unresolved references do not disturb the layout.
    fn collect_symbols(&mut self, lines: &[SourceLine]) -> AsmResult<()> {
        let mut counter = Counter::new();
        for line in lines {
            if let Some(label) = &line.label {
                if !self.symbols.define(&label.lexeme, counter.address()) {
                    return Err(AsmError::new(
                        label.line,
                        label.column,
                        format!(
                            "duplicate symbol '{}' (first {} characters must be unique)",
                            label.lexeme, SIGNIFICANT_CHARS
                        ),
                    ));
                }
            }
            match &line.body {
                None => {}
                Some(LineBody::Equate { name, value }) => {
                    let value = self.resolve(value, true)?;
                    if !self.symbols.define(&name.lexeme, value) {
                        return Err(AsmError::new(
                            name.line,
                            name.column,
                            format!("duplicate symbol '{}'", name.lexeme),
                        ));
                    }
                }
                Some(LineBody::Statement { mnemonic, operands }) => {
                    match self.statement_action(mnemonic, operands, false)? {
                        Action::Advance(size) => counter.advance(size.len(), mnemonic)?,
                        Action::SetOrigin(address) => counter.jump(address),
                        Action::Stop => break,
                    }
                }
            }
        }
        Ok(())
    }

    /// Pass two: every reference must resolve; bytes are appended to the
    /// image, with forward ORG gaps zero-filled.
    fn emit(&self, lines: &[SourceLine]) -> AsmResult<Image> {
        let mut counter = Counter::new();
        let mut origin: Option<u16> = None;
        let mut bytes: Vec<u8> = Vec::new();
        for line in lines {
            let Some(LineBody::Statement { mnemonic, operands }) = &line.body else {
                continue;
            };
            match self.statement_action(mnemonic, operands, true)? {
                Action::Advance(emitted) => {
                    if origin.is_none() {
                        origin = Some(counter.address());
                    }
                    counter.advance(emitted.len(), mnemonic)?;
                    bytes.extend_from_slice(&emitted);
                }
                Action::SetOrigin(address) => {
                    match origin {
                        None => counter.jump(address),
                        Some(_) => {
                            let current = counter.address();
                            if address < current {
                                return Err(AsmError::new(
                                    mnemonic.line,
                                    mnemonic.column,
                                    format!(
                                        "ORG 0x{address:04X} moves backwards over emitted \
                                         code at 0x{current:04X}"
                                    ),
                                ));
                            }
                            bytes.resize(bytes.len() + usize::from(address - current), 0);
                            counter.jump(address);
                        }
                    }
                }
                Action::Stop => break,
            }
        }
        Ok(Image {
            origin: origin.unwrap_or(0),
            bytes,
        })
    }

    /// Interprets one statement. In sizing mode (`strict == false`) the
    /// returned byte vectors only carry their length; unresolved symbols
    /// stand in as zero.
    fn statement_action(
        &self,
        mnemonic: &Token,
        operands: &[Operand],
        strict: bool,
    ) -> AsmResult<Action> {
        let upper = mnemonic.lexeme.to_ascii_uppercase();
        match upper.as_str() {
            "ORG" => {
                let target = expect_one(mnemonic, operands)?;
                // The origin shapes the layout, so it must resolve in both
                // passes.
                Ok(Action::SetOrigin(self.resolve(target, true)?))
            }
            "END" => {
                expect_operands::<0>(mnemonic, operands)?;
                Ok(Action::Stop)
            }
            "DB" => {
                if operands.is_empty() {
                    return Err(missing_operands(mnemonic));
                }
                let mut emitted = Vec::with_capacity(operands.len());
                for operand in operands {
                    emitted.push(self.resolve_byte(operand, strict)?);
                }
                Ok(Action::Advance(emitted))
            }
            "DW" => {
                if operands.is_empty() {
                    return Err(missing_operands(mnemonic));
                }
                let mut emitted = Vec::with_capacity(operands.len() * 2);
                for operand in operands {
                    let value = self.resolve(operand, strict)?;
                    emitted.extend_from_slice(&value.to_le_bytes());
                }
                Ok(Action::Advance(emitted))
            }
            _ => {
                let instruction = self.encode_instruction(mnemonic, &upper, operands, strict)?;
                Ok(Action::Advance(instruction.encode().to_vec()))
            }
        }
    }

    fn encode_instruction(
        &self,
        mnemonic: &Token,
        upper: &str,
        operands: &[Operand],
        strict: bool,
    ) -> AsmResult<Instruction> {
        use Instruction as I;
        let inst = match upper {
            "NOP" => nullary(mnemonic, operands, I::Nop)?,
            "RLC" => nullary(mnemonic, operands, I::Rlc)?,
            "RRC" => nullary(mnemonic, operands, I::Rrc)?,
            "RAL" => nullary(mnemonic, operands, I::Ral)?,
            "RAR" => nullary(mnemonic, operands, I::Rar)?,
            "DAA" => nullary(mnemonic, operands, I::Daa)?,
            "CMA" => nullary(mnemonic, operands, I::Cma)?,
            "STC" => nullary(mnemonic, operands, I::Stc)?,
            "CMC" => nullary(mnemonic, operands, I::Cmc)?,
            "HLT" => nullary(mnemonic, operands, I::Hlt)?,
            "RET" => nullary(mnemonic, operands, I::Ret)?,
            "XTHL" => nullary(mnemonic, operands, I::Xthl)?,
            "PCHL" => nullary(mnemonic, operands, I::Pchl)?,
            "XCHG" => nullary(mnemonic, operands, I::Xchg)?,
            "SPHL" => nullary(mnemonic, operands, I::Sphl)?,
            "EI" => nullary(mnemonic, operands, I::Ei)?,
            "DI" => nullary(mnemonic, operands, I::Di)?,
            "MOV" => {
                let (dst, src) = expect_two(mnemonic, operands)?;
                I::Mov(register(dst)?, register(src)?)
            }
            "MVI" => {
                let (dst, data) = expect_two(mnemonic, operands)?;
                I::Mvi(register(dst)?, self.resolve_byte(data, strict)?)
            }
            "LXI" => {
                let (pair, data) = expect_two(mnemonic, operands)?;
                I::Lxi(register_pair(pair)?, self.resolve(data, strict)?)
            }
            "INR" => I::Inr(register(expect_one(mnemonic, operands)?)?),
            "DCR" => I::Dcr(register(expect_one(mnemonic, operands)?)?),
            "ADD" => I::Add(register(expect_one(mnemonic, operands)?)?),
            "ADC" => I::Adc(register(expect_one(mnemonic, operands)?)?),
            "SUB" => I::Sub(register(expect_one(mnemonic, operands)?)?),
            "SBB" => I::Sbb(register(expect_one(mnemonic, operands)?)?),
            "ANA" => I::Ana(register(expect_one(mnemonic, operands)?)?),
            "XRA" => I::Xra(register(expect_one(mnemonic, operands)?)?),
            "ORA" => I::Ora(register(expect_one(mnemonic, operands)?)?),
            "CMP" => I::Cmp(register(expect_one(mnemonic, operands)?)?),
            "INX" => I::Inx(register_pair(expect_one(mnemonic, operands)?)?),
            "DCX" => I::Dcx(register_pair(expect_one(mnemonic, operands)?)?),
            "DAD" => I::Dad(register_pair(expect_one(mnemonic, operands)?)?),
            "STAX" => I::Stax(indirect_pair(expect_one(mnemonic, operands)?)?),
            "LDAX" => I::Ldax(indirect_pair(expect_one(mnemonic, operands)?)?),
            "PUSH" => I::Push(stack_pair(expect_one(mnemonic, operands)?)?),
            "POP" => I::Pop(stack_pair(expect_one(mnemonic, operands)?)?),
            "ADI" => I::Adi(self.resolve_byte(expect_one(mnemonic, operands)?, strict)?),
            "ACI" => I::Aci(self.resolve_byte(expect_one(mnemonic, operands)?, strict)?),
            "SUI" => I::Sui(self.resolve_byte(expect_one(mnemonic, operands)?, strict)?),
            "SBI" => I::Sbi(self.resolve_byte(expect_one(mnemonic, operands)?, strict)?),
            "ANI" => I::Ani(self.resolve_byte(expect_one(mnemonic, operands)?, strict)?),
            "XRI" => I::Xri(self.resolve_byte(expect_one(mnemonic, operands)?, strict)?),
            "ORI" => I::Ori(self.resolve_byte(expect_one(mnemonic, operands)?, strict)?),
            "CPI" => I::Cpi(self.resolve_byte(expect_one(mnemonic, operands)?, strict)?),
            "IN" => I::In(self.resolve_byte(expect_one(mnemonic, operands)?, strict)?),
            "OUT" => I::Out(self.resolve_byte(expect_one(mnemonic, operands)?, strict)?),
            "STA" => I::Sta(self.resolve(expect_one(mnemonic, operands)?, strict)?),
            "LDA" => I::Lda(self.resolve(expect_one(mnemonic, operands)?, strict)?),
            "SHLD" => I::Shld(self.resolve(expect_one(mnemonic, operands)?, strict)?),
            "LHLD" => I::Lhld(self.resolve(expect_one(mnemonic, operands)?, strict)?),
            "JMP" => I::Jmp(self.resolve(expect_one(mnemonic, operands)?, strict)?),
            "CALL" => I::Call(self.resolve(expect_one(mnemonic, operands)?, strict)?),
            "RST" => {
                let operand = expect_one(mnemonic, operands)?;
                let value = self.resolve(operand, strict)?;
                let index = u8::try_from(value)
                    .ok()
                    .and_then(RestartIndex::new)
                    .ok_or_else(|| {
                        AsmError::new(
                            operand.line,
                            operand.column,
                            format!("restart vector {value} is out of range 0..=7"),
                        )
                    })?;
                I::Rst(index)
            }
            _ => {
                if let Some(cond) = condition_mnemonic(upper, 'R') {
                    nullary(mnemonic, operands, I::Rcond(cond))?
                } else if let Some(cond) = condition_mnemonic(upper, 'J') {
                    I::Jcond(cond, self.resolve(expect_one(mnemonic, operands)?, strict)?)
                } else if let Some(cond) = condition_mnemonic(upper, 'C') {
                    I::Ccond(cond, self.resolve(expect_one(mnemonic, operands)?, strict)?)
                } else {
                    return Err(AsmError::new(
                        mnemonic.line,
                        mnemonic.column,
                        format!("unknown mnemonic '{}'", mnemonic.lexeme),
                    ));
                }
            }
        };
        Ok(inst)
    }

    fn resolve(&self, operand: &Operand, strict: bool) -> AsmResult<u16> {
        match &operand.kind {
            OperandKind::Number(value) => Ok(*value),
            OperandKind::Symbol(name) => match self.symbols.lookup(name) {
                Some(value) => Ok(value),
                None if !strict => Ok(0),
                None => Err(AsmError::new(
                    operand.line,
                    operand.column,
                    format!("undefined symbol '{name}'"),
                )),
            },
        }
    }

    fn resolve_byte(&self, operand: &Operand, strict: bool) -> AsmResult<u8> {
        let value = self.resolve(operand, strict)?;
        u8::try_from(value).map_err(|_| {
            AsmError::new(
                operand.line,
                operand.column,
                format!("value 0x{value:04X} does not fit in one byte"),
            )
        })
    }
}

enum Action {
    Advance(Vec<u8>),
    SetOrigin(u16),
    Stop,
}

/// Location counter with a 64 KiB ceiling.
struct Counter {
    next: u32,
}

impl Counter {
    fn new() -> Counter {
        Counter { next: 0 }
    }

    fn address(&self) -> u16 {
        self.next as u16
    }

    fn jump(&mut self, address: u16) {
        self.next = u32::from(address);
    }

    fn advance(&mut self, size: usize, at: &Token) -> AsmResult<()> {
        self.next += size as u32;
        if self.next > 1 << 16 {
            return Err(AsmError::new(
                at.line,
                at.column,
                "program extends past the end of memory",
            ));
        }
        Ok(())
    }
}

fn condition_mnemonic(upper: &str, stem: char) -> Option<Condition> {
    let suffix = upper.strip_prefix(stem)?;
    let cond = match suffix {
        "NZ" => Condition::NonZero,
        "Z" => Condition::Zero,
        "NC" => Condition::NoCarry,
        "C" => Condition::Carry,
        "PO" => Condition::ParityOdd,
        "PE" => Condition::ParityEven,
        "P" => Condition::Plus,
        "M" => Condition::Minus,
        _ => return None,
    };
    Some(cond)
}

fn nullary(mnemonic: &Token, operands: &[Operand], inst: Instruction) -> AsmResult<Instruction> {
    if operands.is_empty() {
        Ok(inst)
    } else {
        Err(arity_error(mnemonic, 0, operands.len()))
    }
}

fn expect_operands<const N: usize>(mnemonic: &Token, operands: &[Operand]) -> AsmResult<()> {
    if operands.len() == N {
        Ok(())
    } else {
        Err(arity_error(mnemonic, N, operands.len()))
    }
}

fn expect_one<'a>(mnemonic: &Token, operands: &'a [Operand]) -> AsmResult<&'a Operand> {
    match operands {
        [operand] => Ok(operand),
        _ => Err(arity_error(mnemonic, 1, operands.len())),
    }
}

fn expect_two<'a>(
    mnemonic: &Token,
    operands: &'a [Operand],
) -> AsmResult<(&'a Operand, &'a Operand)> {
    match operands {
        [first, second] => Ok((first, second)),
        _ => Err(arity_error(mnemonic, 2, operands.len())),
    }
}

fn arity_error(mnemonic: &Token, wanted: usize, found: usize) -> AsmError {
    AsmError::new(
        mnemonic.line,
        mnemonic.column,
        format!(
            "{} takes {wanted} operand(s), found {found}",
            mnemonic.lexeme.to_ascii_uppercase()
        ),
    )
}

fn missing_operands(mnemonic: &Token) -> AsmError {
    AsmError::new(
        mnemonic.line,
        mnemonic.column,
        format!(
            "{} needs at least one operand",
            mnemonic.lexeme.to_ascii_uppercase()
        ),
    )
}

fn symbol_name(operand: &Operand) -> AsmResult<&str> {
    match &operand.kind {
        OperandKind::Symbol(name) => Ok(name),
        OperandKind::Number(value) => Err(AsmError::new(
            operand.line,
            operand.column,
            format!("expected a register name, found {value}"),
        )),
    }
}

fn register(operand: &Operand) -> AsmResult<Register> {
    let name = symbol_name(operand)?;
    let reg = match name.to_ascii_uppercase().as_str() {
        "B" => Register::B,
        "C" => Register::C,
        "D" => Register::D,
        "E" => Register::E,
        "H" => Register::H,
        "L" => Register::L,
        "M" => Register::M,
        "A" => Register::A,
        _ => {
            return Err(AsmError::new(
                operand.line,
                operand.column,
                format!("'{name}' is not a register"),
            ));
        }
    };
    Ok(reg)
}

// Pair operands accept both the classic single-letter spelling (LXI B) and
// the two-letter one the disassembler prints (LXI BC).
fn register_pair(operand: &Operand) -> AsmResult<RegisterPair> {
    let name = symbol_name(operand)?;
    let pair = match name.to_ascii_uppercase().as_str() {
        "B" | "BC" => RegisterPair::Bc,
        "D" | "DE" => RegisterPair::De,
        "H" | "HL" => RegisterPair::Hl,
        "SP" => RegisterPair::Sp,
        _ => {
            return Err(AsmError::new(
                operand.line,
                operand.column,
                format!("'{name}' is not a register pair"),
            ));
        }
    };
    Ok(pair)
}

fn indirect_pair(operand: &Operand) -> AsmResult<IndirectPair> {
    let name = symbol_name(operand)?;
    let pair = match name.to_ascii_uppercase().as_str() {
        "B" | "BC" => IndirectPair::Bc,
        "D" | "DE" => IndirectPair::De,
        _ => {
            return Err(AsmError::new(
                operand.line,
                operand.column,
                format!("'{name}' cannot address memory indirectly (use BC or DE)"),
            ));
        }
    };
    Ok(pair)
}

fn stack_pair(operand: &Operand) -> AsmResult<StackPair> {
    let name = symbol_name(operand)?;
    let pair = match name.to_ascii_uppercase().as_str() {
        "B" | "BC" => StackPair::Bc,
        "D" | "DE" => StackPair::De,
        "H" | "HL" => StackPair::Hl,
        "PSW" => StackPair::Psw,
        _ => {
            return Err(AsmError::new(
                operand.line,
                operand.column,
                format!("'{name}' is not a stack pair"),
            ));
        }
    };
    Ok(pair)
}
