use crate::fault::{Fault, OpResult};
use crate::machine::{Machine, MachineFlags};
use crate::opcodes;
use crate::trace::{self, Tracer};

/// Fetch and execute instructions until the run flag clears or a fault
/// propagates out of a handler.
pub fn run(m: &mut Machine, tracer: &mut Option<Tracer>) -> OpResult {
    while m.flag(MachineFlags::RUN) {
        step(m, tracer)?;
    }
    Ok(())
}

/// One fetch/dispatch cycle. Opcodes at or above 0x80 are the short form
/// of LOD: a one-byte push of global word `opcode & 0x7f`. Everything else
/// goes through the opcode table; its handlers consume their own operand
/// bytes.
pub fn step(m: &mut Machine, tracer: &mut Option<Tracer>) -> OpResult {
    let old_pc = m.pc;
    let opcode = m.fetch8();
    let info = opcodes::lookup(opcode);

    if let Some(t) = tracer {
        let record = trace::format_record(m, old_pc, opcode, info);
        t.write(&record);
    }

    if opcode >= 0x80 {
        let offset = u16::from(opcode & 0x7f) << 1;
        let value = m.read16(m.display[0].wrapping_add(offset));
        m.push16(value)?;
        return Ok(());
    }

    let info = info.ok_or(Fault::BadOpcode { opcode, pc: old_pc })?;
    (info.exec)(m)
}
