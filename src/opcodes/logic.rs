use crate::fault::OpResult;
use crate::machine::Machine;

// Comparisons push 0xffff for true, 0x0000 for false. EQ and NE compare
// bit patterns; the orderings are signed.

const TRUE: u16 = 0xffff;
const FALSE: u16 = 0x0000;

fn compare(m: &mut Machine, test: impl Fn(i16, i16) -> bool) -> OpResult {
    let op2 = m.pop16()? as i16;
    let op1 = m.pop16()? as i16;
    m.push16(if test(op1, op2) { TRUE } else { FALSE })
}

// opcode 0x12: EQ
pub fn eq(m: &mut Machine) -> OpResult {
    let op2 = m.pop16()?;
    let op1 = m.pop16()?;
    m.push16(if op1 == op2 { TRUE } else { FALSE })
}

// opcode 0x13: NE
pub fn ne(m: &mut Machine) -> OpResult {
    let op2 = m.pop16()?;
    let op1 = m.pop16()?;
    m.push16(if op1 != op2 { TRUE } else { FALSE })
}

// opcode 0x14: GE
pub fn ge(m: &mut Machine) -> OpResult {
    compare(m, |a, b| a >= b)
}

// opcode 0x15: GT
pub fn gt(m: &mut Machine) -> OpResult {
    compare(m, |a, b| a > b)
}

// opcode 0x16: LE
pub fn le(m: &mut Machine) -> OpResult {
    compare(m, |a, b| a <= b)
}

// opcode 0x17: LT
pub fn lt(m: &mut Machine) -> OpResult {
    compare(m, |a, b| a < b)
}

// opcode 0x1a: OR bitwise or
pub fn or(m: &mut Machine) -> OpResult {
    let op2 = m.pop16()?;
    let op1 = m.pop16()?;
    m.push16(op1 | op2)
}

// opcode 0x1b: AND bitwise and
pub fn and(m: &mut Machine) -> OpResult {
    let op2 = m.pop16()?;
    let op1 = m.pop16()?;
    m.push16(op1 & op2)
}

// opcode 0x1c: NOT bitwise complement
pub fn not(m: &mut Machine) -> OpResult {
    let op1 = m.pop16()?;
    m.push16(!op1)
}
