use crate::fault::{Fault, OpResult};
use crate::intrinsics;
use crate::machine::{Machine, MachineFlags};

// opcode 0x00: EXI exit interpreter
pub fn exit(m: &mut Machine) -> OpResult {
    m.set_flag(MachineFlags::RUN, false);
    Ok(())
}

// opcode 0x05: CAL call an I2L procedure
pub fn cal(m: &mut Machine) -> OpResult {
    let new_level = m.fetch_level()?;
    let target = m.fetch16();
    m.call(new_level, target)
}

// opcode 0x06: RET return from I2L procedure
pub fn ret(m: &mut Machine) -> OpResult {
    m.ret()
}

// opcode 0x07: JMP
pub fn jmp(m: &mut Machine) -> OpResult {
    m.pc = m.fetch16();
    Ok(())
}

// opcode 0x08: JPC jump if false
pub fn jpc(m: &mut Machine) -> OpResult {
    let target = m.fetch16();
    let value = m.pop16()?;
    if value == 0 {
        m.pc = target;
    }
    Ok(())
}

// opcode 0x09: HPI increment HP by operand, unchecked
pub fn hpi(m: &mut Machine) -> OpResult {
    let n = u16::from(m.fetch8());
    m.hp = m.hp.wrapping_add(n);
    Ok(())
}

// opcode 0x0a: ARG position procedure arguments
//
// Reverse-copies count+1 stack bytes to just past the save area of the
// frame about to be built, so they become the callee's first locals.
// A count byte of zero still moves one byte.
pub fn arg(m: &mut Machine) -> OpResult {
    let count = u16::from(m.fetch8());
    for i in 0..=count {
        let value = m.pop8()?;
        let addr = m.hp.wrapping_add(6 + (count - i));
        m.mem[addr as usize] = value;
    }
    Ok(())
}

// opcode 0x0c: CML call a machine-language function (intrinsic)
pub fn cml(m: &mut Machine) -> OpResult {
    let number = m.fetch8();
    intrinsics::dispatch(m, number)
}

// opcode 0x18: FOR loop control
//
// TOS holds the loop limit, the popped value is the counter. When the
// counter has reached the limit the limit is dropped and control leaves
// the loop.
pub fn for_loop(m: &mut Machine) -> OpResult {
    let target = m.fetch16();
    let value = m.pop16()? as i16;
    let limit = m.peek_tos16() as i16;
    if i32::from(limit) - i32::from(value) <= 0 {
        m.pop16()?;
        m.pc = target;
    }
    Ok(())
}

// opcode 0x25: CJP case jump; the comparand below TOS stays on the stack
pub fn cjp(m: &mut Machine) -> OpResult {
    let tos = m.pop16()?;
    let nos = m.peek_tos16();
    let target = m.fetch16();
    if tos == nos {
        m.pc = target;
    }
    Ok(())
}

// opcode 0x26: JSR short call; the return address lives on the value stack
pub fn jsr(m: &mut Machine) -> OpResult {
    let target = m.fetch16();
    m.push16(m.pc)?;
    m.pc = target;
    Ok(())
}

// opcode 0x27: RTS short return
pub fn rts(m: &mut Machine) -> OpResult {
    m.pc = m.pop16()?;
    Ok(())
}

// opcode 0x29: ECL call external procedure
pub fn ecl(_m: &mut Machine) -> OpResult {
    Err(Fault::UnimplementedOpcode)
}
