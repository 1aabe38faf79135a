pub mod cpu;
pub mod isa;
pub mod machine;

pub use cpu::{Bus, Cpu, CpuState, Flag};
pub use machine::VComputer;

/// Number of general-purpose registers.
pub const NUM_REGS: usize = 16;

/// `r11`: high half of multiply results and division remainders.
pub const REG_Y: usize = 11;
/// `r12`: base pointer (by convention only; no opcode treats it specially).
pub const REG_BP: usize = 12;
/// `r13`: stack pointer, always addressing the last pushed byte.
pub const REG_SP: usize = 13;
/// `r14`: base address of the interrupt vector table.
pub const REG_IA: usize = 14;
/// `r15`: the FLAGS register.
pub const REG_FLAGS: usize = 15;

/// Address of the first instruction executed after reset.
pub const RESET_VECTOR: u32 = 0x0010_0000;

/// Number of 32-bit entries in the interrupt vector table based at IA.
pub const IVT_ENTRIES: usize = 256;

/// Default CPU clock rate in Hz. Pacing only; semantics never depend on it.
pub const DEFAULT_CLOCK_HZ: u32 = 1_000_000;
