use bitflags::bitflags;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::device::Devices;
use crate::fault::{Fault, OpResult, ERR_IO_ERROR};

pub const MAX_MEM: usize = 0x10000;
pub const MAX_LEVEL: usize = 8;

pub const STACK_MIN: u16 = 0x0100;
pub const INITIAL_STACK: u16 = 0x01ff;

pub const CODE_START: u16 = 0x1700;
pub const HEAP_LIMIT: u16 = 0x5fff;

bitflags! {
    /// Execution status bits. RUN keeps the dispatcher going, RERUN makes
    /// the driver reinitialize and re-enter after the current run ends,
    /// TRAP makes I/O errors fatal instead of latching into `err`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MachineFlags: u8 {
        const RUN   = 0x01;
        const RERUN = 0x02;
        const TRAP  = 0x04;
    }
}

/// The whole interpreter state. Stack, heap and loaded code share the one
/// 64 KiB byte array so the guest's absolute-address opcodes see a single
/// coherent address space.
pub struct Machine {
    pub mem: Vec<u8>,
    pub pc: u16,
    pub sp: u16,
    pub hp: u16,
    pub level: usize,
    pub display: [u16; MAX_LEVEL],
    pub heap_start: u16,
    pub heap_limit: u16,
    pub err: i32,
    pub div_remainder: i16,
    pub devices: Devices,
    flags: MachineFlags,
    rng: StdRng,
}

impl Machine {
    pub fn new() -> Self {
        Self {
            mem: vec![0; MAX_MEM],
            pc: 0,
            sp: INITIAL_STACK,
            hp: 0,
            level: 0,
            display: [0; MAX_LEVEL],
            heap_start: 0, // set by the loader
            heap_limit: HEAP_LIMIT,
            err: 0,
            div_remainder: 0,
            devices: Devices::new(),
            flags: MachineFlags::empty(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Reseed the PRNG behind the `ran` intrinsic, for reproducible runs.
    pub fn seed_random(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn flag(&self, mask: MachineFlags) -> bool {
        self.flags.contains(mask)
    }

    pub fn set_flag(&mut self, mask: MachineFlags, value: bool) {
        if value {
            self.flags.insert(mask);
        } else {
            self.flags.remove(mask);
        }
    }

    // ====================================================================
    // Memory
    // ====================================================================

    // 16-bit values in memory are little endian. Addresses wrap at 16 bits.

    pub fn read16(&self, addr: u16) -> u16 {
        let low = self.mem[addr as usize] as u16;
        let high = self.mem[addr.wrapping_add(1) as usize] as u16;
        (high << 8) | low
    }

    pub fn write16(&mut self, addr: u16, value: u16) {
        self.mem[addr as usize] = (value & 0xff) as u8;
        self.mem[addr.wrapping_add(1) as usize] = (value >> 8) as u8;
    }

    // ====================================================================
    // Stack
    // ====================================================================

    // The stack grows downward through 0x0100..=0x01ff and stores the low
    // byte of each 16-bit cell at the higher address, so pops read the high
    // byte first.

    pub fn peek_tos16(&self) -> u16 {
        let high = (self.mem[self.sp.wrapping_add(1) as usize] as u16) << 8;
        let low = self.mem[self.sp.wrapping_add(2) as usize] as u16;
        high | low
    }

    pub fn peek_nos16(&self) -> u16 {
        let high = (self.mem[self.sp.wrapping_add(3) as usize] as u16) << 8;
        let low = self.mem[self.sp.wrapping_add(4) as usize] as u16;
        high | low
    }

    pub fn pop8(&mut self) -> Result<u8, Fault> {
        if self.sp >= INITIAL_STACK {
            return Err(Fault::StackUnderflow);
        }
        self.sp += 1;
        Ok(self.mem[self.sp as usize])
    }

    pub fn pop16(&mut self) -> Result<u16, Fault> {
        if self.sp >= INITIAL_STACK - 1 {
            return Err(Fault::StackUnderflow);
        }
        self.sp += 1;
        let high = (self.mem[self.sp as usize] as u16) << 8;
        self.sp += 1;
        Ok(high | self.mem[self.sp as usize] as u16)
    }

    pub fn push8(&mut self, value: u8) -> OpResult {
        if self.sp < STACK_MIN + 1 {
            return Err(Fault::StackOverflow);
        }
        self.mem[self.sp as usize] = value;
        self.sp -= 1;
        Ok(())
    }

    pub fn push16(&mut self, value: u16) -> OpResult {
        if self.sp < STACK_MIN + 2 {
            return Err(Fault::StackOverflow);
        }
        self.mem[self.sp as usize] = (value & 0xff) as u8;
        self.sp -= 1;
        self.mem[self.sp as usize] = (value >> 8) as u8;
        self.sp -= 1;
        Ok(())
    }

    // ====================================================================
    // Heap
    // ====================================================================

    // The heap grows upward from heap_start and holds activation records
    // and reserve()'d blocks.

    pub fn heap_pop_8(&mut self) -> Result<u8, Fault> {
        if u32::from(self.hp) < u32::from(self.heap_start) + 1 {
            return Err(Fault::HeapUnderflow);
        }
        self.hp -= 1;
        Ok(self.mem[self.hp as usize])
    }

    pub fn heap_pop_16(&mut self) -> Result<u16, Fault> {
        if u32::from(self.hp) < u32::from(self.heap_start) + 2 {
            return Err(Fault::HeapUnderflow);
        }
        self.hp -= 2;
        Ok(self.read16(self.hp))
    }

    pub fn heap_push_8(&mut self, value: u8) -> OpResult {
        if u32::from(self.hp) + 1 > u32::from(self.heap_limit) {
            return Err(Fault::HeapOverflow);
        }
        self.mem[self.hp as usize] = value;
        self.hp += 1;
        Ok(())
    }

    pub fn heap_push_16(&mut self, value: u16) -> OpResult {
        if u32::from(self.hp) + 2 > u32::from(self.heap_limit) {
            return Err(Fault::HeapOverflow);
        }
        self.write16(self.hp, value);
        self.hp += 2;
        Ok(())
    }

    // ====================================================================
    // Instruction fetch
    // ====================================================================

    pub fn fetch8(&mut self) -> u8 {
        let value = self.mem[self.pc as usize];
        self.pc = self.pc.wrapping_add(1);
        value
    }

    pub fn fetch16(&mut self) -> u16 {
        let low = self.fetch8() as u16;
        let high = (self.fetch8() as u16) << 8;
        high | low
    }

    /// Level bytes on the wire are `level * 2`; an odd byte or a decoded
    /// level outside 0..7 is a BAD_LEVEL fault.
    pub fn fetch_level(&mut self) -> Result<usize, Fault> {
        let byte = self.fetch8();
        if byte & 1 != 0 {
            return Err(Fault::BadLevel);
        }
        let level = usize::from(byte >> 1);
        if level >= MAX_LEVEL {
            return Err(Fault::BadLevel);
        }
        Ok(level)
    }

    // ====================================================================
    // Activation records
    // ====================================================================

    /// Build a new activation record on the heap and transfer control.
    /// The record saves the caller's level, the previous display entry of
    /// the callee level, the return pc and one reserved byte; the display
    /// entry then points just past the save area, where the locals start.
    pub fn call(&mut self, new_level: usize, target: u16) -> OpResult {
        self.heap_push_8((self.level as u8) << 1)?;
        self.level = new_level;
        self.heap_push_16(self.display[self.level])?;
        self.heap_push_16(self.pc)?;
        self.heap_push_8(0x00)?;
        self.display[self.level] = self.hp;
        self.pc = target;
        Ok(())
    }

    /// Tear down the current activation record, discarding anything
    /// reserve()'d in this frame, and restore the caller's state.
    pub fn ret(&mut self) -> OpResult {
        self.hp = self.display[self.level];
        let _ = self.heap_pop_8()?; // reserved byte, not used
        self.pc = self.heap_pop_16()?;
        let old_display = self.heap_pop_16()?;
        let old_level = usize::from(self.heap_pop_8()? >> 1);
        if old_level >= MAX_LEVEL {
            // The save area was clobbered; there is no frame to go back to.
            return Err(Fault::BadLevel);
        }
        self.display[self.level] = old_display;
        self.level = old_level;
        Ok(())
    }

    /// Prepare for a (re)run: empty stack, heap at the top of loaded code,
    /// and a synthetic level-0 call into the program entry whose return
    /// address holds an EXIT opcode. `err` deliberately survives so a
    /// latched error can still surface as the exit code.
    pub fn reset(&mut self) -> OpResult {
        self.sp = INITIAL_STACK;
        self.hp = self.heap_start;
        self.level = 0;

        self.mem[0xffff] = 0x00; // EXIT backs the main program's return
        self.pc = 0xffff;

        self.call(0, CODE_START)?;

        self.flags = MachineFlags::RUN | MachineFlags::TRAP;
        Ok(())
    }

    /// Raise an I/O error, honoring trap mode: fatal when trapping,
    /// otherwise latched into `err` for later polling via `errflg`.
    pub fn io_error(&mut self, msg: String) -> OpResult {
        if self.flag(MachineFlags::TRAP) {
            Err(Fault::Io(msg))
        } else {
            self.err = ERR_IO_ERROR;
            Ok(())
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}
