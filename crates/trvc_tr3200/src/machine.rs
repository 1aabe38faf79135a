//! The virtual computer: a TR3200 wired to its memory map.
//!
//! Keeps the machine deliberately small — RAM at the bottom of the address
//! space, ROM at the reset vector, nothing else on the bus. Peripherals
//! would attach here if the machine grew device slots.

#[cfg(test)]
mod tests;

use crate::cpu::{Bus, Cpu};
use crate::{DEFAULT_CLOCK_HZ, RESET_VECTOR};

/// Bytes of RAM mapped at address 0.
pub const RAM_SIZE: usize = 128 * 1024;
/// Base address of the ROM window; the reset vector points at its first word.
pub const ROM_BASE: u32 = RESET_VECTOR;
/// Bytes of ROM mapped at [`ROM_BASE`].
pub const ROM_SIZE: usize = 64 * 1024;
/// Host frame rate assumed by [`VComputer::step_frame`].
pub const FRAME_RATE_HZ: u32 = 60;

/// Memory map of the virtual computer.
///
/// Reads outside RAM and ROM return 0 (open bus); writes land in RAM only.
struct MemoryMap {
    ram: Vec<u8>,
    rom: Vec<u8>,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self {
            ram: vec![0; RAM_SIZE],
            rom: vec![0; ROM_SIZE],
        }
    }
}

impl Bus for MemoryMap {
    fn read_b(&mut self, addr: u32) -> u8 {
        if (addr as usize) < RAM_SIZE {
            self.ram[addr as usize]
        } else if addr >= ROM_BASE && ((addr - ROM_BASE) as usize) < ROM_SIZE {
            self.rom[(addr - ROM_BASE) as usize]
        } else {
            0
        }
    }

    fn write_b(&mut self, addr: u32, value: u8) {
        // ROM and unmapped space swallow writes.
        if (addr as usize) < RAM_SIZE {
            self.ram[addr as usize] = value;
        }
    }
}

/// The virtual computer.
pub struct VComputer {
    cpu: Cpu,
    mem: MemoryMap,
}

impl Default for VComputer {
    fn default() -> Self {
        Self::new(DEFAULT_CLOCK_HZ)
    }
}

impl VComputer {
    pub fn new(clock_hz: u32) -> Self {
        Self {
            cpu: Cpu::new(clock_hz),
            mem: MemoryMap::default(),
        }
    }

    /// Copy a ROM image into the ROM window, truncating at [`ROM_SIZE`].
    pub fn load_rom(&mut self, image: &[u8]) {
        if image.len() > ROM_SIZE {
            log::warn!(
                "ROM image is {} bytes, truncating to {} bytes",
                image.len(),
                ROM_SIZE
            );
        }
        let len = image.len().min(ROM_SIZE);
        self.mem.rom[..len].copy_from_slice(&image[..len]);
    }

    /// Reset the CPU; ROM and RAM keep their contents.
    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    /// Execute one instruction and return its cycle cost.
    pub fn step(&mut self) -> u32 {
        self.cpu.step(&mut self.mem)
    }

    /// Advance the machine by exactly `n` CPU cycles.
    pub fn tick(&mut self, n: u32) {
        self.cpu.tick(&mut self.mem, n);
    }

    /// Advance one host frame worth of CPU cycles at the configured clock.
    pub fn step_frame(&mut self) {
        let cycles = self.cpu.clock_hz() / FRAME_RATE_HZ;
        self.tick(cycles);
    }

    /// Request an interrupt; refused while the CPU has interrupts disabled.
    pub fn send_interrupt(&mut self, msg: u8) -> bool {
        self.cpu.send_interrupt(msg)
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// Debug peek at a 32-bit word, for monitors and stack dumps.
    pub fn read_d(&mut self, addr: u32) -> u32 {
        self.mem.read_d(addr)
    }

    /// Debug poke of a 32-bit word. Follows bus rules: only RAM is writable.
    pub fn write_d(&mut self, addr: u32, value: u32) {
        self.mem.write_d(addr, value);
    }
}
