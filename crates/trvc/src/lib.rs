//! Host driver for the TR3200 virtual computer: loads a ROM image and
//! either free-runs it paced against the wall clock or single-steps it
//! with a register monitor on stdin.

use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use typed_builder::TypedBuilder;

use trvc_tr3200::machine::FRAME_RATE_HZ;
use trvc_tr3200::{Cpu, Flag, VComputer, DEFAULT_CLOCK_HZ, REG_BP, REG_IA, REG_SP, REG_Y};

/// How often the free-run loop reports its achieved speed.
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Host-side run configuration.
#[derive(TypedBuilder)]
pub struct RunConfig {
    pub rom_path: String,
    #[builder(default = DEFAULT_CLOCK_HZ)]
    pub clock_hz: u32,
    #[builder(default = false)]
    pub step_mode: bool,
}

pub fn run(config: RunConfig) -> Result<()> {
    let rom = std::fs::read(&config.rom_path)
        .with_context(|| format!("failed to read ROM {}", config.rom_path))?;
    log::info!("loaded {} bytes from {}", rom.len(), config.rom_path);

    let mut vc = VComputer::new(config.clock_hz);
    vc.load_rom(&rom);

    if config.step_mode {
        run_stepped(&mut vc)
    } else {
        run_paced(&mut vc, config.clock_hz)
    }
}

/// Free-run the machine, pacing emulated cycles against the wall clock one
/// host frame at a time.
fn run_paced(vc: &mut VComputer, clock_hz: u32) -> Result<()> {
    let frame = Duration::from_secs(1) / FRAME_RATE_HZ;
    let cycles_per_frame = (clock_hz / FRAME_RATE_HZ) as u64;

    let mut frames: u64 = 0;
    let mut report_start = Instant::now();

    loop {
        // A sleeping CPU with interrupts disabled can never wake again.
        if vc.cpu().is_sleeping() && !vc.cpu().flag(Flag::EI) {
            log::info!("CPU asleep with interrupts disabled, halting");
            return Ok(());
        }

        let frame_start = Instant::now();
        vc.step_frame();
        frames += 1;

        let wall = report_start.elapsed();
        if wall >= REPORT_INTERVAL {
            let emulated = frames * cycles_per_frame;
            let speed = emulated as f64 / (clock_hz as f64 * wall.as_secs_f64()) * 100.0;
            log::info!("{emulated} cycles in {wall:.2?}, {speed:.1}% of real time");
            frames = 0;
            report_start = Instant::now();
        }

        let used = frame_start.elapsed();
        if used < frame {
            std::thread::sleep(frame - used);
        }
    }
}

/// Interactive monitor: one instruction per line of input, with register
/// and stack dumps after each step.
fn run_stepped(vc: &mut VComputer) -> Result<()> {
    println!("step mode: Enter executes one instruction, 'q' quits");
    let stdin = io::stdin();

    loop {
        let pc = vc.cpu().pc;
        let word = vc.read_d(pc);
        println!("PC : 0x{pc:08X} > 0x{word:08X}");
        if vc.cpu().is_skipping() {
            println!("(skipping)");
        }
        if vc.cpu().is_sleeping() {
            println!("(sleeping)");
        }

        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        if line.trim().eq_ignore_ascii_case("q") {
            return Ok(());
        }

        let cycles = vc.step();
        println!("took {cycles} cycles");
        print_regs(vc.cpu());
        print_stack(vc);
    }
}

fn print_regs(cpu: &Cpu) {
    for (i, value) in cpu.r.iter().enumerate().take(REG_Y) {
        print!("%r{i:<2}= 0x{value:08X} ");
        if i % 4 == 3 {
            println!();
        }
    }
    println!();
    println!(
        "%y= 0x{:08X} %bp= 0x{:08X} %sp= 0x{:08X} %ia= 0x{:08X}",
        cpu.r[REG_Y],
        cpu.r[REG_BP],
        cpu.r[REG_SP],
        cpu.r[REG_IA]
    );
    println!("%pc= 0x{:08X}", cpu.pc);
    println!(
        "ESS: {} EI: {}  IF: {} DE: {} OF: {} CF: {}",
        cpu.flag(Flag::ESS) as u8,
        cpu.flag(Flag::EI) as u8,
        cpu.flag(Flag::IF) as u8,
        cpu.flag(Flag::DE) as u8,
        cpu.flag(Flag::OF) as u8,
        cpu.flag(Flag::CF) as u8,
    );
}

fn print_stack(vc: &mut VComputer) {
    println!("stack:");
    let sp = vc.cpu().r[REG_SP];
    for i in 0..5u32 {
        let addr = sp.wrapping_add(i * 4);
        println!("0x{addr:08X}: 0x{:08X}", vc.read_d(addr));
        if addr >= 0xFFFF_FFFC {
            break;
        }
    }
}
