use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::Local;

use crate::intrinsics::{self, INTRINSIC_OFFSET};
use crate::machine::{Machine, MAX_LEVEL};
use crate::opcodes::OpInfo;

/// Append-only execution trace. One record per instruction, flushed
/// immediately so the tail survives a crash.
pub struct Tracer {
    out: BufWriter<File>,
}

impl Tracer {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        let _ = writeln!(out, "trace started {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = out.flush();
        Ok(Self { out })
    }

    pub fn write(&mut self, record: &str) {
        let _ = self.out.write_all(record.as_bytes());
        let _ = self.out.flush();
    }
}

/// Render one pre-execution trace record: the value stack and heap tops,
/// the display vector with the active level starred, the current frame's
/// save area and first eight locals, then the instruction bytes and
/// mnemonic.
pub fn format_record(m: &Machine, old_pc: u16, opcode: u8, info: Option<&OpInfo>) -> String {
    let mut s = String::new();

    let _ = writeln!(
        s,
        "  sp: {:04x}  tos: {:04x}  nos: {:04x}",
        m.sp,
        m.peek_tos16(),
        m.peek_nos16()
    );
    let _ = writeln!(s, "  hp: {:04x}", m.hp);

    let _ = write!(s, "  level: {}  display: [", m.level);
    for (i, d) in m.display.iter().enumerate() {
        if i == m.level {
            let _ = write!(s, "*");
        }
        let _ = write!(s, "{d:04x} ");
    }
    let _ = writeln!(s, "]");

    let frame = m.display[m.level];
    let _ = writeln!(
        s,
        "  prev_level: {}  prev_display: {:04x}  prev_pc: {:04x}",
        m.mem[frame.wrapping_sub(6) as usize] >> 1,
        m.read16(frame.wrapping_sub(5)),
        m.read16(frame.wrapping_sub(3))
    );

    for i in 0..MAX_LEVEL as u16 {
        let _ = write!(s, "  var({:02x})={:04x}", i * 2, m.read16(frame.wrapping_add(i * 2)));
    }
    let _ = writeln!(s);

    // Instruction bytes, padded to four columns; operand counts come from
    // the opcode class. Short global loads are one byte and print as lod.
    let bytes = if opcode >= 0x80 {
        1
    } else {
        info.map_or(1, |i| i.class.bytes())
    };
    let _ = write!(s, "{old_pc:04x}: ");
    for i in 0..4 {
        if i < bytes {
            let _ = write!(s, "{:02x} ", m.mem[old_pc.wrapping_add(i as u16) as usize]);
        } else {
            let _ = write!(s, "   ");
        }
    }
    if opcode >= 0x80 {
        let _ = write!(s, "lod");
    } else {
        let _ = write!(s, "{}", info.map_or("???", |i| i.name));
    }
    if opcode == 0x0c {
        let number = m.mem[old_pc.wrapping_add(1) as usize];
        let index = i32::from(number) - i32::from(INTRINSIC_OFFSET);
        match intrinsics::lookup(index) {
            Some(i) => {
                let _ = write!(s, " {}", i.name);
            }
            None => {
                let _ = write!(s, " unknown");
            }
        }
    }
    let _ = writeln!(s);

    s
}
