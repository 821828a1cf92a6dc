//! Memory contract between the interpreter and its host.
//!
//! The host owns all memory and devices. Every access carries the function
//! code the CPU would drive on FC0-FC2 and returns a [`BusResult`] with the
//! data, any wait cycles (charged to the running timeslice) and a bus-error
//! flag. Long accesses are a single callback; the host decides how to split
//! them across its data bus. 64-bit operands are two long accesses, high half
//! first.

/// Function code values from the FC0-FC2 pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionCode {
    /// User data access (FC=1).
    UserData = 1,
    /// User program access (FC=2).
    UserProgram = 2,
    /// Supervisor data access (FC=5).
    #[default]
    SupervisorData = 5,
    /// Supervisor program access (FC=6).
    SupervisorProgram = 6,
    /// CPU space: interrupt acknowledge, coprocessor, breakpoint (FC=7).
    CpuSpace = 7,
}

impl FunctionCode {
    /// Build a function code from supervisor flag and program/data flag.
    #[must_use]
    pub const fn from_flags(supervisor: bool, program: bool) -> Self {
        match (supervisor, program) {
            (false, false) => Self::UserData,
            (false, true) => Self::UserProgram,
            (true, false) => Self::SupervisorData,
            (true, true) => Self::SupervisorProgram,
        }
    }

    /// Decode the 3-bit pin value. Reserved encodings (0, 3, 4) yield `None`.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Self::UserData),
            2 => Some(Self::UserProgram),
            5 => Some(Self::SupervisorData),
            6 => Some(Self::SupervisorProgram),
            7 => Some(Self::CpuSpace),
            _ => None,
        }
    }

    /// Returns the 3-bit value for the function code.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn is_program(self) -> bool {
        matches!(self, Self::UserProgram | Self::SupervisorProgram)
    }
}

/// Result of a bus access: data read, wait cycles, and bus error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusResult {
    /// Data read from the bus, right-aligned. For writes, this is 0.
    pub data: u32,
    /// Extra wait cycles inserted by the bus (DMA contention, slow memory, etc.).
    pub wait_cycles: u8,
    /// True if this access caused a bus error (no DTACK response).
    /// The CPU aborts the instruction and takes vector 2.
    pub bus_error: bool,
}

impl BusResult {
    /// Create a result with data and no wait cycles.
    #[must_use]
    pub const fn new(data: u32) -> Self {
        Self {
            data,
            wait_cycles: 0,
            bus_error: false,
        }
    }

    /// Create a result with data and wait cycles.
    #[must_use]
    pub const fn with_wait(data: u32, wait_cycles: u8) -> Self {
        Self {
            data,
            wait_cycles,
            bus_error: false,
        }
    }

    /// Create a write result (no data returned).
    #[must_use]
    pub const fn write_ok() -> Self {
        Self::new(0)
    }

    /// Create a write result with wait cycles.
    #[must_use]
    pub const fn write_wait(wait_cycles: u8) -> Self {
        Self::with_wait(0, wait_cycles)
    }

    /// Create a bus error result (DTACK timeout).
    #[must_use]
    pub const fn error() -> Self {
        Self {
            data: 0,
            wait_cycles: 0,
            bus_error: true,
        }
    }
}

/// Host memory for a 680x0.
///
/// Addresses arrive already translated by the PMMU (when enabled) and masked
/// to the model's address width.
pub trait M68kBus {
    fn read_byte(&mut self, addr: u32, fc: FunctionCode) -> BusResult;
    fn read_word(&mut self, addr: u32, fc: FunctionCode) -> BusResult;
    fn read_long(&mut self, addr: u32, fc: FunctionCode) -> BusResult;

    fn write_byte(&mut self, addr: u32, value: u8, fc: FunctionCode) -> BusResult;
    fn write_word(&mut self, addr: u32, value: u16, fc: FunctionCode) -> BusResult;
    fn write_long(&mut self, addr: u32, value: u32, fc: FunctionCode) -> BusResult;

    /// Program-space word read (opcodes, extension words).
    ///
    /// Hosts that keep code in a separate fast path override this; the
    /// default goes through [`read_word`](Self::read_word).
    fn read_immediate_word(&mut self, addr: u32, fc: FunctionCode) -> BusResult {
        self.read_word(addr, fc)
    }

    /// Program-space long read, used to fill the prefetch.
    fn read_immediate_long(&mut self, addr: u32, fc: FunctionCode) -> BusResult {
        self.read_long(addr, fc)
    }
}

#[cfg(test)]
mod tests {
    use super::FunctionCode;

    #[test]
    fn function_code_bits_round_trip() {
        for bits in 0..8 {
            match FunctionCode::from_bits(bits) {
                Some(fc) => assert_eq!(fc.bits(), bits),
                None => assert!(matches!(bits, 0 | 3 | 4)),
            }
        }
    }

    #[test]
    fn program_space_follows_supervisor_flag() {
        assert_eq!(
            FunctionCode::from_flags(true, true),
            FunctionCode::SupervisorProgram
        );
        assert_eq!(FunctionCode::from_flags(false, false), FunctionCode::UserData);
        assert!(FunctionCode::from_flags(false, true).is_program());
    }
}
