use crate::fault::{Fault, OpResult};
use crate::machine::{Machine, CODE_START};

// I2L object format, one item at a time:
//   <hex byte>  store byte at current address
//   ;<addr>     new load address (relative to base)
//   ^<addr>     fixup: store current absolute address at base+addr
//   *<addr>     relative address: store base+addr at current address
//   $           end
// CR and LF are skipped; anything else is a load error.

/// Translate a textual object stream into the memory image. Tracks the
/// highest address written so `heap_start` ends up just past the code.
pub fn load(m: &mut Machine, source: &[u8]) -> OpResult {
    Loader::new(source).run(m)
}

struct Loader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Loader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn next(&mut self) -> Result<u8, Fault> {
        let c = self.bytes.get(self.pos).copied().ok_or(Fault::LoaderUnexpectedEof)?;
        self.pos += 1;
        Ok(c)
    }

    /// Read a fixed-width hex field; a non-hex character inside it is fatal.
    fn read_hex(&mut self, digits: usize) -> Result<u16, Fault> {
        let mut value: u16 = 0;
        for _ in 0..digits {
            let c = self.next()?;
            let digit = (c as char).to_digit(16).ok_or(Fault::LoaderUnexpectedChar)?;
            value = (value << 4) | digit as u16;
        }
        Ok(value)
    }

    /// Try to read a two-digit hex data byte. A non-hex first character is
    /// left unconsumed for the directive dispatch; a non-hex second digit
    /// is fatal.
    fn try_read_data_byte(&mut self) -> Result<Option<u8>, Fault> {
        match self.bytes.get(self.pos) {
            None => Err(Fault::LoaderUnexpectedEof),
            Some(c) if !c.is_ascii_hexdigit() => Ok(None),
            Some(_) => Ok(Some(self.read_hex(2)? as u8)),
        }
    }

    fn run(&mut self, m: &mut Machine) -> OpResult {
        let base = CODE_START;
        let mut offset: u16 = 0;

        loop {
            if let Some(value) = self.try_read_data_byte()? {
                m.mem[base.wrapping_add(offset) as usize] = value;
                offset = offset.wrapping_add(1);
                if base.wrapping_add(offset) > m.heap_start {
                    m.heap_start = base.wrapping_add(offset);
                }
                continue;
            }

            match self.next()? {
                b'\r' | b'\n' => {}
                b';' => {
                    // new load address
                    offset = self.read_hex(4)?;
                }
                b'^' => {
                    // fixup: patch an earlier placeholder with the cursor
                    let addr = self.read_hex(4)?;
                    m.write16(base.wrapping_add(addr), base.wrapping_add(offset));
                }
                b'*' => {
                    // relative address, emitted in place
                    let addr = self.read_hex(4)?;
                    m.write16(base.wrapping_add(offset), base.wrapping_add(addr));
                    offset = offset.wrapping_add(2);
                    if base.wrapping_add(offset) > m.heap_start {
                        m.heap_start = base.wrapping_add(offset);
                    }
                }
                b'$' => return Ok(()),
                _ => return Err(Fault::LoaderUnexpectedChar),
            }
        }
    }
}
