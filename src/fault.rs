use thiserror::Error;

// Standard I2L error numbers. The loader failures all share code 10,
// everything past that is specific to this interpreter.
pub const ERR_NONE: i32 = 0;
pub const ERR_DIVISION_BY_ZERO: i32 = 1;
pub const ERR_HEAP_OVERFLOW: i32 = 2;
pub const ERR_IO_ERROR: i32 = 3;
pub const ERR_BAD_OPCODE: i32 = 4;
pub const ERR_BAD_INTRINSIC: i32 = 5;
pub const ERR_LOADER_FAILURE: i32 = 10;
pub const ERR_NO_I2L_FILE: i32 = 10;
pub const ERR_BAD_CMD_LINE: i32 = 11;
pub const ERR_ABORT: i32 = 12;
pub const ERR_UNIMPLEMENTED_OPCODE: i32 = 13;
pub const ERR_UNIMPLEMENTED_INTRINSIC: i32 = 14;
pub const ERR_BAD_LEVEL: i32 = 15;
pub const ERR_STACK_UNDERFLOW: i32 = 16;
pub const ERR_STACK_OVERFLOW: i32 = 17;
pub const ERR_HEAP_UNDERFLOW: i32 = 18;
pub const ERR_INTERNAL_ERROR: i32 = 19;

/// A fatal (or, for `Io`, trappable) machine condition. Raised by any
/// primitive or handler and propagated up to the driver, which turns it
/// into a diagnostic line and the process exit code.
#[derive(Debug, Error)]
pub enum Fault {
    #[error("division by zero")]
    DivisionByZero,

    #[error("heap overflow")]
    HeapOverflow,

    #[error("{0}")]
    Io(String),

    #[error("bad opcode {opcode:02x} at {pc:04x}")]
    BadOpcode { opcode: u8, pc: u16 },

    #[error("bad intrinsic")]
    BadIntrinsic,

    #[error("no I2L file")]
    NoObjectFile,

    #[error("unexpected end of file in I2L stream")]
    LoaderUnexpectedEof,

    #[error("unexpected character in I2L stream")]
    LoaderUnexpectedChar,

    #[error("bad command line")]
    BadCmdLine,

    #[error("abort")]
    Abort,

    #[error("unimplemented opcode")]
    UnimplementedOpcode,

    #[error("unimplemented intrinsic {0}")]
    UnimplementedIntrinsic(&'static str),

    #[error("bad level byte")]
    BadLevel,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("stack overflow")]
    StackOverflow,

    #[error("heap underflow")]
    HeapUnderflow,

    #[error("internal error")]
    InternalError,
}

impl Fault {
    /// The stable I2L error number for this fault, used as the process
    /// exit code and as the value latched into `Machine::err`.
    pub fn code(&self) -> i32 {
        match self {
            Fault::DivisionByZero => ERR_DIVISION_BY_ZERO,
            Fault::HeapOverflow => ERR_HEAP_OVERFLOW,
            Fault::Io(_) => ERR_IO_ERROR,
            Fault::BadOpcode { .. } => ERR_BAD_OPCODE,
            Fault::BadIntrinsic => ERR_BAD_INTRINSIC,
            Fault::NoObjectFile => ERR_NO_I2L_FILE,
            Fault::LoaderUnexpectedEof => ERR_LOADER_FAILURE,
            Fault::LoaderUnexpectedChar => ERR_LOADER_FAILURE,
            Fault::BadCmdLine => ERR_BAD_CMD_LINE,
            Fault::Abort => ERR_ABORT,
            Fault::UnimplementedOpcode => ERR_UNIMPLEMENTED_OPCODE,
            Fault::UnimplementedIntrinsic(_) => ERR_UNIMPLEMENTED_INTRINSIC,
            Fault::BadLevel => ERR_BAD_LEVEL,
            Fault::StackUnderflow => ERR_STACK_UNDERFLOW,
            Fault::StackOverflow => ERR_STACK_OVERFLOW,
            Fault::HeapUnderflow => ERR_HEAP_UNDERFLOW,
            Fault::InternalError => ERR_INTERNAL_ERROR,
        }
    }
}

/// Result type returned by every opcode and intrinsic handler.
pub type OpResult = Result<(), Fault>;
