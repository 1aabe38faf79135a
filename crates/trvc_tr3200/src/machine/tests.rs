use once_cell::sync::OnceCell;

use super::*;
use crate::isa::{np, p1, p2, p3, LITERAL_FLAG};
use crate::{Flag, REG_IA, REG_SP};

fn p3_imm(op: u32, rd: usize, rs: usize, imm: u32) -> u32 {
    0x4000_0000 | op << 24 | LITERAL_FLAG | (imm & 0x1FFF) << 10 | (rs as u32) << 5 | rd as u32
}

fn p2_imm(op: u32, rd: usize, imm: u32) -> u32 {
    0x8000_0000 | op << 24 | LITERAL_FLAG | (imm & 0x3_FFFF) << 5 | rd as u32
}

fn p1_imm(op: u32, imm: u32) -> u32 {
    0x2000_0000 | op << 24 | LITERAL_FLAG | (imm & 0x7F_FFFF)
}

fn rom_image(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

static COUNT_LOOP_ROM: OnceCell<Vec<u8>> = OnceCell::new();

/// `r0 += 1` forever; one iteration costs 6 cycles.
fn count_loop_rom() -> &'static [u8] {
    COUNT_LOOP_ROM.get_or_init(|| {
        rom_image(&[
            p3_imm(p3::ADD, 0, 0, 1),
            p1_imm(p1::RJMP, (-8i32) as u32),
        ])
    })
}

#[test]
fn executes_from_the_reset_vector() {
    let mut vc = VComputer::default();
    vc.load_rom(&rom_image(&[p2_imm(p2::MOV, 0, 42), np::SLEEP]));

    vc.step();
    assert_eq!(vc.cpu().r[0], 42);
    assert_eq!(vc.cpu().pc, ROM_BASE + 4);
}

#[test]
fn programs_read_and_write_ram() {
    let mut vc = VComputer::default();
    vc.load_rom(&rom_image(&[
        p2_imm(p2::MOV, 0, 0x1234),
        p2_imm(p2::STORE2, 0, 0x80),
        p2_imm(p2::LOAD2, 2, 0x80),
    ]));

    for _ in 0..3 {
        vc.step();
    }
    assert_eq!(vc.cpu().r[2], 0x1234);
    assert_eq!(vc.read_d(0x80), 0x1234);
}

#[test]
fn rom_ignores_writes() {
    let program = rom_image(&[
        p2_imm(p2::MOV, 0, 0x7777),
        p2_imm(p2::STORE2, 0, 0x2_0000),
        0x0010_0000,
    ]);
    let first_word = u32::from_le_bytes(program[0..4].try_into().unwrap());

    let mut vc = VComputer::default();
    vc.load_rom(&program);

    // STORE2 with an escaped literal targeting the ROM base.
    vc.step();
    vc.step();
    assert_eq!(vc.read_d(ROM_BASE), first_word);
}

#[test]
fn unmapped_addresses_read_as_zero() {
    let mut vc = VComputer::default();
    vc.load_rom(&rom_image(&[
        p2_imm(p2::LOAD2, 1, 0x2_0000),
        0x0050_0000,
    ]));
    vc.cpu_mut().r[1] = 0xFFFF_FFFF;

    vc.step();
    assert_eq!(vc.cpu().r[1], 0);
    assert_eq!(vc.read_d(0x00F0_0000), 0);
}

#[test]
fn load_rom_truncates_oversized_images() {
    let mut image = vec![0u8; ROM_SIZE + 16];
    image[0] = 0xAB;
    image[ROM_SIZE - 1] = 0xCD;

    let mut vc = VComputer::default();
    vc.load_rom(&image);

    assert_eq!(vc.read_d(ROM_BASE) & 0xFF, 0xAB);
    assert_eq!(vc.read_d(ROM_BASE + ROM_SIZE as u32 - 4) >> 24, 0xCD);
}

#[test]
fn step_frame_runs_one_frame_of_cycles() {
    // 36 kHz clock -> 600 cycles per frame -> exactly 100 loop iterations.
    let mut vc = VComputer::new(36_000);
    vc.load_rom(count_loop_rom());

    vc.step_frame();
    assert_eq!(vc.cpu().r[0], 100);
}

#[test]
fn reset_preserves_memory_contents() {
    let mut vc = VComputer::default();
    vc.load_rom(count_loop_rom());

    for _ in 0..5 {
        vc.step();
    }
    vc.write_d(0x140, 0xCAFE_F00D);
    assert_ne!(vc.cpu().r[0], 0);

    vc.reset();
    assert_eq!(vc.cpu().pc, ROM_BASE);
    assert_eq!(vc.cpu().r[0], 0);
    assert_eq!(vc.read_d(0x140), 0xCAFE_F00D);
    let first_word = u32::from_le_bytes(count_loop_rom()[0..4].try_into().unwrap());
    assert_eq!(vc.read_d(ROM_BASE), first_word);
}

#[test]
fn an_interrupt_wakes_the_sleeping_machine() {
    let mut vc = VComputer::default();
    vc.load_rom(&rom_image(&[
        p2_imm(p2::MOV, crate::REG_FLAGS, 0x100),
        np::SLEEP,
        p2_imm(p2::MOV, 2, 0x63),
    ]));
    vc.cpu_mut().r[REG_SP] = 0x1000;
    vc.cpu_mut().r[REG_IA] = 0x200;
    vc.write_d(0x200 + 5 * 4, ROM_BASE + 8);

    vc.step();
    vc.step();
    assert!(vc.cpu().is_sleeping());

    assert!(vc.send_interrupt(5));
    vc.step();
    assert!(!vc.cpu().is_sleeping());
    assert!(vc.cpu().flag(Flag::IF));

    vc.step();
    assert_eq!(vc.cpu().r[2], 0x63);
}
