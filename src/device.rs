use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

// I2L device numbers, as used by the I/O intrinsics.
pub const DEV_CONSOLE: u16 = 0;
pub const DEV_DISK: u16 = 3;
pub const DEV_NULL: u16 = 7;

// Byte returned by the null device and by XPL0 programs to mean end of file.
pub const XPL0_EOF: u8 = 0x1a;

/// The character devices visible to guest code. The console defaults to the
/// host stdin/stdout but can be swapped for in-memory streams, which is how
/// the integration tests capture program output. The disk device is backed
/// by the `-i`/`-o` file paths and stays closed until the guest opens it.
pub struct Devices {
    console_in: Box<dyn BufRead>,
    console_out: Box<dyn Write>,
    pub disk_in_path: Option<PathBuf>,
    pub disk_out_path: Option<PathBuf>,
    disk_in: Option<BufReader<File>>,
    disk_out: Option<BufWriter<File>>,
}

impl Devices {
    pub fn new() -> Self {
        Self::with_streams(
            Box::new(BufReader::new(io::stdin())),
            Box::new(io::stdout()),
        )
    }

    pub fn with_streams(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self {
            console_in: input,
            console_out: output,
            disk_in_path: None,
            disk_out_path: None,
            disk_in: None,
            disk_out: None,
        }
    }

    // ====================================================================
    // Console
    // ====================================================================

    /// Read one byte from the console; `None` means end of input.
    pub fn console_getc(&mut self) -> io::Result<Option<u8>> {
        getc(&mut self.console_in)
    }

    /// Look at the next console byte without consuming it.
    pub fn console_peek(&mut self) -> io::Result<Option<u8>> {
        let buf = self.console_in.fill_buf()?;
        Ok(buf.first().copied())
    }

    /// Consume the byte last returned by `console_peek`.
    pub fn console_skip(&mut self) {
        self.console_in.consume(1);
    }

    pub fn console_putc(&mut self, c: u8) -> io::Result<()> {
        self.console_out.write_all(&[c])
    }

    pub fn console_write(&mut self, s: &str) -> io::Result<()> {
        self.console_out.write_all(s.as_bytes())
    }

    // ====================================================================
    // Disk
    // ====================================================================

    /// (Re)open the disk input file. Returns false when no `-i` path was
    /// configured or the host open failed.
    pub fn open_disk_in(&mut self) -> bool {
        self.disk_in = None;
        let Some(path) = &self.disk_in_path else {
            return false;
        };
        match File::open(path) {
            Ok(f) => {
                self.disk_in = Some(BufReader::new(f));
                true
            }
            Err(_) => false,
        }
    }

    /// (Re)open the disk output file, truncating it. Returns false when no
    /// `-o` path was configured or the host open failed.
    pub fn open_disk_out(&mut self) -> bool {
        self.disk_out = None;
        let Some(path) = &self.disk_out_path else {
            return false;
        };
        match File::create(path) {
            Ok(f) => {
                self.disk_out = Some(BufWriter::new(f));
                true
            }
            Err(_) => false,
        }
    }

    pub fn disk_in_open(&self) -> bool {
        self.disk_in.is_some()
    }

    pub fn disk_out_open(&self) -> bool {
        self.disk_out.is_some()
    }

    /// Read one byte from the disk input file, which must be open.
    pub fn disk_getc(&mut self) -> io::Result<Option<u8>> {
        match &mut self.disk_in {
            Some(f) => getc(f),
            None => Ok(None),
        }
    }

    /// Write one byte to the disk output file, which must be open.
    pub fn disk_putc(&mut self, c: u8) -> io::Result<()> {
        match &mut self.disk_out {
            Some(f) => f.write_all(&[c]),
            None => Ok(()),
        }
    }

    /// Close both disk handles. Dropping the output writer flushes it.
    pub fn close_disk(&mut self) {
        self.disk_in = None;
        self.disk_out = None;
    }

    /// Flush everything that buffers. Called on program termination so
    /// output survives a `process::exit`.
    pub fn flush(&mut self) {
        let _ = self.console_out.flush();
        if let Some(f) = &mut self.disk_out {
            let _ = f.flush();
        }
    }
}

impl Default for Devices {
    fn default() -> Self {
        Self::new()
    }
}

fn getc(r: &mut impl BufRead) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    match r.read(&mut byte)? {
        0 => Ok(None),
        _ => Ok(Some(byte[0])),
    }
}
