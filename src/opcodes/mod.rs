pub mod control;
pub mod logic;
pub mod math;
pub mod transfer;

use crate::fault::OpResult;
use crate::machine::Machine;

/// Operand layout of an opcode. Only used to know how many instruction
/// bytes to render in the trace; handlers fetch their own operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    NoOperand,    // 1 byte
    OneByte,      // 2 bytes: 8-bit operand
    TwoByte,      // 3 bytes: 16-bit value
    Address,      // 3 bytes: 16-bit address
    LevelOffset,  // 3 bytes: 8-bit level, 8-bit offset
    LevelAddress, // 4 bytes: 8-bit level, 16-bit address
}

impl OpClass {
    pub fn bytes(self) -> usize {
        match self {
            OpClass::NoOperand => 1,
            OpClass::OneByte => 2,
            OpClass::TwoByte | OpClass::Address | OpClass::LevelOffset => 3,
            OpClass::LevelAddress => 4,
        }
    }
}

pub type Handler = fn(&mut Machine) -> OpResult;

pub struct OpInfo {
    pub name: &'static str,
    pub class: OpClass,
    pub exec: Handler,
}

macro_rules! op {
    ($name:literal, $class:ident, $exec:path) => {
        OpInfo { name: $name, class: OpClass::$class, exec: $exec }
    };
}

// The integer-profile opcode set, indexed by opcode byte. The range
// 0x2a..=0x3b holds the floating-point operations, which this build leaves
// unregistered; they decode as bad opcodes.
static OPS: [OpInfo; 0x2a] = [
    op!("exi", NoOperand, control::exit),          // 0x00
    op!("lod", LevelOffset, transfer::lod),        // 0x01
    op!("ldx", LevelOffset, transfer::ldx),        // 0x02
    op!("sto", LevelOffset, transfer::sto),        // 0x03
    op!("stx", LevelOffset, transfer::stx),        // 0x04
    op!("cal", LevelAddress, control::cal),        // 0x05
    op!("ret", NoOperand, control::ret),           // 0x06
    op!("jmp", Address, control::jmp),             // 0x07
    op!("jpc", Address, control::jpc),             // 0x08
    op!("hpi", OneByte, control::hpi),             // 0x09
    op!("arg", OneByte, control::arg),             // 0x0a
    op!("imm", Address, transfer::imm),            // 0x0b
    op!("cml", OneByte, control::cml),             // 0x0c
    op!("add", NoOperand, math::add),              // 0x0d
    op!("sub", NoOperand, math::sub),              // 0x0e
    op!("muy", NoOperand, math::muy),              // 0x0f
    op!("div", NoOperand, math::div),              // 0x10
    op!("neg", NoOperand, math::neg),              // 0x11
    op!("eq", NoOperand, logic::eq),               // 0x12
    op!("ne", NoOperand, logic::ne),               // 0x13
    op!("ge", NoOperand, logic::ge),               // 0x14
    op!("gt", NoOperand, logic::gt),               // 0x15
    op!("le", NoOperand, logic::le),               // 0x16
    op!("lt", NoOperand, logic::lt),               // 0x17
    op!("for", Address, control::for_loop),        // 0x18
    op!("inc", LevelOffset, transfer::inc),        // 0x19
    op!("or", NoOperand, logic::or),               // 0x1a
    op!("and", NoOperand, logic::and),             // 0x1b
    op!("not", NoOperand, logic::not),             // 0x1c
    op!("dupcat", NoOperand, transfer::dupcat),    // 0x1d
    op!("dba", NoOperand, transfer::dba),          // 0x1e
    op!("std", NoOperand, transfer::std_indirect), // 0x1f
    op!("dbi", NoOperand, transfer::dbi),          // 0x20
    op!("adr", LevelOffset, transfer::adr),        // 0x21
    op!("ldi", NoOperand, transfer::ldi),          // 0x22
    op!("lda", Address, transfer::lda),            // 0x23
    op!("ims", OneByte, transfer::ims),            // 0x24
    op!("cjp", Address, control::cjp),             // 0x25
    op!("jsr", Address, control::jsr),             // 0x26
    op!("rts", NoOperand, control::rts),           // 0x27
    op!("drp", NoOperand, transfer::drp),          // 0x28
    op!("ecl", TwoByte, control::ecl),             // 0x29
];

pub fn lookup(opcode: u8) -> Option<&'static OpInfo> {
    OPS.get(usize::from(opcode))
}
