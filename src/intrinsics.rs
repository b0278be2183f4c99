use rand::Rng;

use crate::device::{Devices, DEV_CONSOLE, DEV_DISK, DEV_NULL, XPL0_EOF};
use crate::fault::{Fault, OpResult};
use crate::machine::{Machine, MachineFlags};

// Intrinsic numbers carry a bias of 0x40 on the wire (XPL V4D convention).
pub const INTRINSIC_OFFSET: u8 = 0x40;
pub const INTRINSIC_MAX: usize = 128;

pub type Handler = fn(&mut Machine) -> OpResult;

pub struct IntrinsicInfo {
    pub name: &'static str,
    pub exec: Handler,
}

macro_rules! intrinsic {
    ($name:literal, $exec:path) => {
        Some(IntrinsicInfo { name: $name, exec: $exec })
    };
}

// The integer-profile intrinsic table. Index 0x18 is a platform-specific
// slot (SCAN/FSET) left unregistered here, as is everything past HEXOUT.
static INTRINSICS: [Option<IntrinsicInfo>; 0x1c] = [
    intrinsic!("abs", abs),         // 0x00
    intrinsic!("ran", ran),         // 0x01
    intrinsic!("rem", rem),         // 0x02
    intrinsic!("reserve", reserve), // 0x03
    intrinsic!("swap", swap),       // 0x04
    intrinsic!("extend", extend),   // 0x05
    intrinsic!("restart", restart), // 0x06
    intrinsic!("chin", chin),       // 0x07
    intrinsic!("chout", chout),     // 0x08
    intrinsic!("crlf", crlf),       // 0x09
    intrinsic!("numin", numin),     // 0x0a
    intrinsic!("numout", numout),   // 0x0b
    intrinsic!("text", text),       // 0x0c
    intrinsic!("openi", openi),     // 0x0d
    intrinsic!("openo", openo),     // 0x0e
    intrinsic!("close", close),     // 0x0f
    intrinsic!("abort", abort),     // 0x10
    intrinsic!("trap", trap),       // 0x11
    intrinsic!("space", space),     // 0x12
    intrinsic!("rerun", rerun),     // 0x13
    intrinsic!("gethp", gethp),     // 0x14
    intrinsic!("sethp", sethp),     // 0x15
    intrinsic!("errflg", errflg),   // 0x16
    intrinsic!("cursor", cursor),   // 0x17
    None,                           // 0x18
    intrinsic!("setrun", setrun),   // 0x19
    intrinsic!("hexin", hexin),     // 0x1a
    intrinsic!("hexout", hexout),   // 0x1b
];

/// Look up an intrinsic by its unbiased index, for dispatch and for the
/// trace formatter.
pub fn lookup(index: i32) -> Option<&'static IntrinsicInfo> {
    if !(0..INTRINSIC_MAX as i32).contains(&index) {
        return None;
    }
    INTRINSICS.get(index as usize).and_then(Option::as_ref)
}

/// Dispatch a CML operand byte to its intrinsic handler.
pub fn dispatch(m: &mut Machine, number: u8) -> OpResult {
    let index = i32::from(number) - i32::from(INTRINSIC_OFFSET);
    let info = lookup(index).ok_or(Fault::BadIntrinsic)?;
    (info.exec)(m)
}

// ========================================================================
// Arithmetic services
// ========================================================================

// intrinsic 0x00: ABS absolute value
fn abs(m: &mut Machine) -> OpResult {
    let value = m.pop16()? as i16;
    m.push16(value.wrapping_abs() as u16)
}

// intrinsic 0x01: RAN random number in [0, range)
fn ran(m: &mut Machine) -> OpResult {
    let range = m.pop16()? as i16;
    let r = m.rng().gen_range(0..0x7fff_i32);
    let value = if range == 0 { 0 } else { r % i32::from(range) };
    m.push16(value as u16)
}

// intrinsic 0x02: REM remainder of the most recent divide
fn rem(m: &mut Machine) -> OpResult {
    m.pop16()?;
    m.push16(m.div_remainder as u16)
}

// intrinsic 0x04: SWAP exchange the bytes of TOS
fn swap(m: &mut Machine) -> OpResult {
    let value = m.pop16()?;
    m.push16(value.rotate_left(8))
}

// intrinsic 0x05: EXTEND sign-extend the low byte of TOS
fn extend(m: &mut Machine) -> OpResult {
    let mut value = m.pop16()? & 0xff;
    if value & 0x80 != 0 {
        value |= 0xff00;
    }
    m.push16(value)
}

// ========================================================================
// Heap services
// ========================================================================

// intrinsic 0x03: RESERVE allocate from the heap
fn reserve(m: &mut Machine) -> OpResult {
    let base = m.hp;
    let size = m.pop16()?;
    if u32::from(m.hp) + u32::from(size) > u32::from(m.heap_limit) {
        return Err(Fault::HeapOverflow);
    }
    m.hp = m.hp.wrapping_add(size);
    m.push16(base)
}

// intrinsic 0x12: SPACE bytes left on the heap
fn space(m: &mut Machine) -> OpResult {
    m.push16(m.heap_limit - m.hp)
}

// intrinsic 0x14: GETHP
fn gethp(m: &mut Machine) -> OpResult {
    m.push16(m.hp)
}

// intrinsic 0x15: SETHP  // dangerous!
fn sethp(m: &mut Machine) -> OpResult {
    m.hp = m.pop16()?;
    Ok(())
}

// ========================================================================
// Run control
// ========================================================================

// intrinsic 0x06: RESTART stop this run and have the driver start over
fn restart(m: &mut Machine) -> OpResult {
    m.pop16()?;
    m.set_flag(MachineFlags::RUN, false);
    m.set_flag(MachineFlags::RERUN, true);
    Ok(())
}

// intrinsic 0x10: ABORT
fn abort(_m: &mut Machine) -> OpResult {
    Err(Fault::Abort)
}

// intrinsic 0x11: TRAP set I/O error trapping mode
fn trap(m: &mut Machine) -> OpResult {
    let value = m.pop16()?;
    m.set_flag(MachineFlags::TRAP, value != 0);
    Ok(())
}

// intrinsic 0x13: RERUN is this a restarted run?
fn rerun(m: &mut Machine) -> OpResult {
    let flagged = m.flag(MachineFlags::RERUN);
    m.push16(if flagged { 0xffff } else { 0x0000 })
}

// intrinsic 0x16: ERRFLG poll and clear the latched error
fn errflg(m: &mut Machine) -> OpResult {
    let flagged = m.err != 0;
    m.push16(if flagged { 0xffff } else { 0x0000 })?;
    m.err = 0;
    Ok(())
}

// intrinsic 0x17: CURSOR position the console cursor
fn cursor(m: &mut Machine) -> OpResult {
    let _y = m.pop16()?;
    let _x = m.pop16()?;
    Err(Fault::UnimplementedIntrinsic("cursor"))
}

// intrinsic 0x19: SETRUN set the rerun flag directly
fn setrun(m: &mut Machine) -> OpResult {
    let value = m.pop16()?;
    m.set_flag(MachineFlags::RERUN, value != 0);
    Ok(())
}

// ========================================================================
// Character I/O
// ========================================================================

// intrinsic 0x07: CHIN read one character from a device
fn chin(m: &mut Machine) -> OpResult {
    let dev = m.pop16()?;
    match dev {
        DEV_CONSOLE => match m.devices.console_getc() {
            Ok(Some(c)) => {
                let c = if c == b'\n' { b'\r' } else { c };
                m.push16(u16::from(c))
            }
            Ok(None) | Err(_) => {
                m.io_error("end of file".into())?;
                m.push16(0xffff)
            }
        },
        DEV_DISK if m.devices.disk_in_open() => match m.devices.disk_getc() {
            Ok(Some(c)) => {
                let c = if c == b'\n' { b'\r' } else { c };
                m.push16(u16::from(c))
            }
            Ok(None) | Err(_) => {
                m.io_error("end of file".into())?;
                m.push16(0xffff)
            }
        },
        DEV_NULL => m.push16(u16::from(XPL0_EOF)),
        _ => m.io_error(format!("can't read from device {dev}")),
    }
}

// intrinsic 0x08: CHOUT write one character to a device
fn chout(m: &mut Machine) -> OpResult {
    let c = m.pop16()?;
    let dev = m.pop16()?;
    match dev {
        DEV_CONSOLE => {
            if m.devices.console_putc(c as u8).is_err() {
                m.io_error("end of file".into())?;
            }
            Ok(())
        }
        DEV_DISK if m.devices.disk_out_open() => {
            if m.devices.disk_putc(c as u8).is_err() {
                m.io_error("end of file".into())?;
            }
            Ok(())
        }
        DEV_NULL => Ok(()), // writes to the null device disappear
        _ => m.io_error(format!("unimplemented device {dev}")),
    }
}

// intrinsic 0x09: CRLF newline on the console
fn crlf(m: &mut Machine) -> OpResult {
    let dev = m.pop16()?;
    if dev != DEV_CONSOLE {
        m.io_error(format!("unimplemented device {dev}"))?;
    }
    let _ = m.devices.console_write("\n");
    Ok(())
}

// intrinsic 0x0c: TEXT print a high-bit-terminated string from memory
fn text(m: &mut Machine) -> OpResult {
    let mut si = m.pop16()?;
    let dev = m.pop16()?;
    if dev != DEV_CONSOLE {
        m.io_error(format!("unimplemented device {dev}"))?;
    }
    let mut out = Vec::new();
    loop {
        let c = m.mem[si as usize];
        si = si.wrapping_add(1);
        out.push(c & 0x7f);
        if c & 0x80 != 0 {
            break;
        }
    }
    for c in out {
        if m.devices.console_putc(c).is_err() {
            m.io_error("end of file".into())?;
        }
    }
    Ok(())
}

// ========================================================================
// Numeric I/O
// ========================================================================

// intrinsic 0x0a: NUMIN scan a signed decimal number from the console
fn numin(m: &mut Machine) -> OpResult {
    let dev = m.pop16()?;
    if dev != DEV_CONSOLE {
        m.io_error(format!("unimplemented device {dev}"))?;
    }
    match scan_decimal(&mut m.devices) {
        Some(num) => m.push16(num as u16),
        None => {
            m.io_error("bad number".into())?;
            m.push16(0)
        }
    }
}

// intrinsic 0x0b: NUMOUT print TOS as signed decimal
fn numout(m: &mut Machine) -> OpResult {
    let num = m.pop16()? as i16;
    let dev = m.pop16()?;
    if dev != DEV_CONSOLE {
        m.io_error(format!("unimplemented device {dev}"))?;
    }
    let _ = m.devices.console_write(&num.to_string());
    Ok(())
}

// intrinsic 0x1a: HEXIN scan a hex number from the console
fn hexin(m: &mut Machine) -> OpResult {
    let dev = m.pop16()?;
    if dev != DEV_CONSOLE {
        m.io_error(format!("unimplemented device {dev}"))?;
    }
    match scan_hex(&mut m.devices) {
        Some(num) => m.push16(num),
        None => {
            m.io_error("bad number".into())?;
            m.push16(0)
        }
    }
}

// intrinsic 0x1b: HEXOUT print TOS in hex
fn hexout(m: &mut Machine) -> OpResult {
    let num = m.pop16()?;
    let dev = m.pop16()?;
    if dev != DEV_CONSOLE {
        m.io_error(format!("unimplemented device {dev}"))?;
    }
    let _ = m.devices.console_write(&format!("{num:x}"));
    Ok(())
}

// Scan helpers mirror scanf: skip whitespace, read digits, stop at (and
// leave unread) the first character that doesn't fit. Accumulation wraps
// at 16 bits.

fn skip_whitespace(dev: &mut Devices) {
    while let Ok(Some(c)) = dev.console_peek() {
        if !c.is_ascii_whitespace() {
            break;
        }
        dev.console_skip();
    }
}

fn scan_decimal(dev: &mut Devices) -> Option<i16> {
    skip_whitespace(dev);
    let mut negative = false;
    if let Ok(Some(c @ (b'+' | b'-'))) = dev.console_peek() {
        negative = c == b'-';
        dev.console_skip();
    }
    let mut value: i32 = 0;
    let mut any = false;
    while let Ok(Some(c)) = dev.console_peek() {
        if !c.is_ascii_digit() {
            break;
        }
        value = value.wrapping_mul(10).wrapping_add(i32::from(c - b'0'));
        any = true;
        dev.console_skip();
    }
    if !any {
        return None;
    }
    let value = if negative { value.wrapping_neg() } else { value };
    Some(value as i16)
}

fn scan_hex(dev: &mut Devices) -> Option<u16> {
    skip_whitespace(dev);
    let mut value: u32 = 0;
    let mut any = false;
    while let Ok(Some(c)) = dev.console_peek() {
        let Some(digit) = (c as char).to_digit(16) else {
            break;
        };
        value = value.wrapping_mul(16).wrapping_add(digit);
        any = true;
        dev.console_skip();
    }
    if any {
        Some(value as u16)
    } else {
        None
    }
}

// ========================================================================
// Device open/close
// ========================================================================

// intrinsic 0x0d: OPENI open a device for input
fn openi(m: &mut Machine) -> OpResult {
    let dev = m.pop16()?;
    match dev {
        DEV_CONSOLE | DEV_NULL => Ok(()),
        DEV_DISK if m.devices.open_disk_in() => Ok(()),
        _ => m.io_error(format!("can't open input device {dev}")),
    }
}

// intrinsic 0x0e: OPENO open a device for output
fn openo(m: &mut Machine) -> OpResult {
    let dev = m.pop16()?;
    match dev {
        DEV_CONSOLE | DEV_NULL => Ok(()),
        DEV_DISK if m.devices.open_disk_out() => Ok(()),
        _ => m.io_error(format!("can't open output device {dev}")),
    }
}

// intrinsic 0x0f: CLOSE
fn close(m: &mut Machine) -> OpResult {
    let dev = m.pop16()?;
    match dev {
        DEV_CONSOLE | DEV_NULL => Ok(()),
        DEV_DISK => {
            m.devices.close_disk();
            Ok(())
        }
        _ => m.io_error(format!("can't close device {dev}")),
    }
}
