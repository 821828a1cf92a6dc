//! Register file.
//!
//! `a[7]` is always the live stack pointer. The inactive ones wait in shadow
//! slots; which of USP, ISP and MSP is live follows the S and M flags.

/// One of the three architectural stack pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPointer {
    User,
    Interrupt,
    Master,
}

impl StackPointer {
    /// Which stack pointer S and M select.
    #[must_use]
    pub const fn select(supervisor: bool, master: bool) -> Self {
        match (supervisor, master) {
            (false, _) => Self::User,
            (true, false) => Self::Interrupt,
            (true, true) => Self::Master,
        }
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub d: [u32; 8],
    /// `a[7]` is the live stack pointer.
    pub a: [u32; 8],
    shadow: [u32; 3],
    pub pc: u32,
    /// PC of the instruction currently (or last) executing.
    pub ppc: u32,
    pub ir: u16,
    pub vbr: u32,
    pub sfc: u32,
    pub dfc: u32,
    pub cacr: u32,
    pub caar: u32,
    /// Long-aligned address held in the prefetch latch.
    pub pref_addr: u32,
    pub pref_data: u32,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            d: [0; 8],
            a: [0; 8],
            shadow: [0; 3],
            pc: 0,
            ppc: 0,
            ir: 0,
            vbr: 0,
            sfc: 0,
            dfc: 0,
            cacr: 0,
            caar: 0,
            pref_addr: crate::cpu::PREFETCH_EMPTY,
            pref_data: 0,
        }
    }

    /// D0-D7 then A0-A7, as encoded in index extension words.
    #[must_use]
    pub const fn da(&self, n: usize) -> u32 {
        if n < 8 { self.d[n] } else { self.a[n - 8] }
    }

    /// Value of `which`, reading `a[7]` if it is the live one.
    #[must_use]
    pub const fn stack_pointer(&self, which: StackPointer, live: StackPointer) -> u32 {
        if which as usize == live as usize {
            self.a[7]
        } else {
            self.shadow[which.slot()]
        }
    }

    pub fn set_stack_pointer(&mut self, which: StackPointer, live: StackPointer, value: u32) {
        if which == live {
            self.a[7] = value;
        } else {
            self.shadow[which.slot()] = value;
        }
    }

    /// Park the live stack pointer in its shadow, then load the incoming one.
    pub fn switch_stack(&mut self, from: StackPointer, to: StackPointer) {
        self.shadow[from.slot()] = self.a[7];
        self.a[7] = self.shadow[to.slot()];
    }

    /// Shadow slot contents, stale if `which` is currently live.
    #[must_use]
    pub const fn shadow(&self, which: StackPointer) -> u32 {
        self.shadow[which.slot()]
    }

    pub fn set_shadow(&mut self, which: StackPointer, value: u32) {
        self.shadow[which.slot()] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_register_numbering_covers_data_then_address() {
        let mut regs = Registers::new();
        regs.d[3] = 0x33;
        regs.a[3] = 0xa3;
        assert_eq!(regs.da(3), 0x33);
        assert_eq!(regs.da(11), 0xa3);
    }

    #[test]
    fn switching_stacks_preserves_both_values() {
        let mut regs = Registers::new();
        regs.a[7] = 0x1000;
        regs.set_shadow(StackPointer::Interrupt, 0x8000);

        regs.switch_stack(StackPointer::User, StackPointer::Interrupt);
        assert_eq!(regs.a[7], 0x8000);
        assert_eq!(regs.shadow(StackPointer::User), 0x1000);

        regs.a[7] = 0x7ffa;
        regs.switch_stack(StackPointer::Interrupt, StackPointer::User);
        assert_eq!(regs.a[7], 0x1000);
        assert_eq!(regs.shadow(StackPointer::Interrupt), 0x7ffa);
    }

    #[test]
    fn live_pointer_reads_through_a7() {
        let mut regs = Registers::new();
        regs.a[7] = 0x400;
        regs.set_shadow(StackPointer::Master, 0x900);
        let live = StackPointer::select(true, false);
        assert_eq!(regs.stack_pointer(StackPointer::Interrupt, live), 0x400);
        assert_eq!(regs.stack_pointer(StackPointer::Master, live), 0x900);

        regs.set_stack_pointer(StackPointer::Interrupt, live, 0x500);
        assert_eq!(regs.a[7], 0x500);
    }
}
