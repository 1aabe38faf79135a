//! Per-family execution: fetch, dispatch, cycle accounting and the skip
//! state machine.

use super::decode::{self, Format, Literal};
use super::{Bus, Cpu, Flag};
use crate::isa::{np, p1, p2, p3};
use crate::{REG_SP, REG_Y};

impl Cpu {
    /// Fetch, decode and execute one instruction; returns its cycle cost.
    ///
    /// After a non-skipped execution the step-mode trap and the interrupt
    /// controller run; a skipped instruction only consumes its words.
    pub(super) fn real_step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let inst = bus.read_d(self.pc);
        self.pc = self.pc.wrapping_add(4);

        if self.skipping {
            return self.skip_step(inst);
        }

        let cycles = match decode::format(inst) {
            Format::P3 => self.exec_p3(bus, inst),
            Format::P2 => self.exec_p2(bus, inst),
            Format::P1 => self.exec_p1(bus, inst),
            Format::Np => self.exec_np(bus, inst),
        };

        // Single-step trap: outside a handler, raise interrupt 0 after
        // every executed instruction.
        if self.step_mode && !self.flag(Flag::IF) {
            self.send_interrupt(0);
        }
        self.process_interrupt(bus);

        cycles
    }

    /// Consume one instruction without executing it, including its
    /// continuation word when the literal escapes to the next word.
    ///
    /// Skipping an `IFxx` keeps the skip state alive (chain-skipping);
    /// anything else ends it. Costs one cycle, touches nothing else.
    fn skip_step(&mut self, inst: u32) -> u32 {
        self.skipping = decode::is_branch(inst);
        if decode::has_big_literal(inst) {
            self.pc = self.pc.wrapping_add(4);
        }
        1
    }

    /// Resolve a decoded literal field, consuming the continuation word
    /// (one extra cycle) for the escape encoding.
    fn fetch_literal<B: Bus>(&mut self, bus: &mut B, lit: Literal, cycles: &mut u32) -> u32 {
        match lit {
            Literal::Inline(value) => value,
            Literal::NextWord => {
                let value = bus.read_d(self.pc);
                self.pc = self.pc.wrapping_add(4);
                *cycles += 1;
                value
            }
        }
    }

    fn exec_p3<B: Bus>(&mut self, bus: &mut B, inst: u32) -> u32 {
        let mut cycles = 3;
        let opcode = inst >> 24 & 0x3F;
        let rd = decode::rd(inst);

        let rn = if decode::has_literal(inst) {
            self.fetch_literal(bus, decode::lit13(inst), &mut cycles)
        } else {
            self.r[decode::rn(inst)]
        };
        let rs = self.r[decode::rs(inst)];

        match opcode {
            p3::AND => {
                self.r[rd] = rs & rn;
                self.clear_cf_of();
            }
            p3::OR => {
                self.r[rd] = rs | rn;
                self.clear_cf_of();
            }
            p3::XOR => {
                self.r[rd] = rs ^ rn;
                self.clear_cf_of();
            }
            p3::BITC => {
                self.r[rd] = rs & !rn;
                self.clear_cf_of();
            }

            p3::ADD => self.r[rd] = self.alu_add(rs, rn, 0),
            p3::ADDC => {
                let carry = self.flag(Flag::CF) as u32;
                self.r[rd] = self.alu_add(rs, rn, carry);
            }
            p3::SUB => self.r[rd] = self.alu_sub(rs, rn, 0),
            p3::SUBB => {
                let borrow = self.flag(Flag::CF) as u32;
                self.r[rd] = self.alu_sub(rs, rn, borrow);
            }
            p3::RSB => self.r[rd] = self.alu_rsb(rn, rs, 0),
            p3::RSBB => {
                let borrow = self.flag(Flag::CF) as u32;
                self.r[rd] = self.alu_rsb(rn, rs, borrow);
            }

            p3::LLS => self.r[rd] = self.alu_shl(rs, rn),
            p3::RLS => self.r[rd] = self.alu_shr(rs, rn),
            p3::ARS => self.r[rd] = self.alu_sar(rs, rn),
            p3::ROTL => {
                self.r[rd] = rs.rotate_left(rn % 32);
                self.clear_cf_of();
            }
            p3::ROTR => {
                self.r[rd] = rs.rotate_right(rn % 32);
                self.clear_cf_of();
            }

            p3::MUL => {
                cycles += 17;
                let product = rs as u64 * rn as u64;
                self.r[REG_Y] = (product >> 32) as u32;
                self.r[rd] = product as u32;
                self.clear_cf_of();
            }
            p3::SMUL => {
                cycles += 27;
                let product = (rs as i32 as i64) * (rn as i32 as i64);
                self.r[REG_Y] = (product >> 32) as u32;
                self.r[rd] = product as u32;
                self.clear_cf_of();
            }
            p3::DIV => {
                cycles += 27;
                if rn != 0 {
                    self.r[rd] = rs / rn;
                    self.r[REG_Y] = rs % rn;
                } else {
                    self.set_flag(Flag::DE, true);
                }
                self.clear_cf_of();
            }
            p3::SDIV => {
                cycles += 37;
                if rn != 0 {
                    let (srs, srn) = (rs as i32, rn as i32);
                    self.r[rd] = srs.wrapping_div(srn) as u32;
                    self.r[REG_Y] = srs.wrapping_rem(srn) as u32;
                } else {
                    self.set_flag(Flag::DE, true);
                }
                self.clear_cf_of();
            }

            p3::LOAD => self.r[rd] = bus.read_d(rs.wrapping_add(rn)),
            p3::LOADW => self.r[rd] = bus.read_w(rs.wrapping_add(rn)) as u32,
            p3::LOADB => self.r[rd] = bus.read_b(rs.wrapping_add(rn)) as u32,
            p3::STORE => bus.write_d(rs.wrapping_add(rn), self.r[rd]),
            p3::STOREW => bus.write_w(rs.wrapping_add(rn), self.r[rd] as u16),
            p3::STOREB => bus.write_b(rs.wrapping_add(rn), self.r[rd] as u8),

            _ => {
                log::debug!(
                    "unknown 3-operand opcode 0x{:02X} at 0x{:08X}, treated as NOP",
                    opcode,
                    self.pc.wrapping_sub(4)
                );
            }
        }

        cycles
    }

    fn exec_p2<B: Bus>(&mut self, bus: &mut B, inst: u32) -> u32 {
        let mut cycles = 3;
        let opcode = inst >> 24 & 0x7F;
        let rd = decode::rd(inst);
        let literal = decode::has_literal(inst);

        let rn = if literal {
            self.fetch_literal(bus, decode::lit18(inst), &mut cycles)
        } else {
            self.r[decode::rs(inst)]
        };

        match opcode {
            p2::MOV => self.r[rd] = rn,
            p2::SWP => {
                // With a literal RN there is nothing to swap back into.
                if !literal {
                    self.r.swap(rd, decode::rs(inst));
                }
            }
            p2::SIGXB => self.r[rd] = rn as u8 as i8 as i32 as u32,
            p2::SIGXW => self.r[rd] = rn as u16 as i16 as i32 as u32,
            p2::NOT => self.r[rd] = !rn,

            p2::LOAD2 => self.r[rd] = bus.read_d(rn),
            p2::LOADW2 => self.r[rd] = bus.read_w(rn) as u32,
            p2::LOADB2 => self.r[rd] = bus.read_b(rn) as u32,
            p2::STORE2 => bus.write_d(rn, self.r[rd]),
            p2::STOREW2 => bus.write_w(rn, self.r[rd] as u16),
            p2::STOREB2 => bus.write_b(rn, self.r[rd] as u8),

            p2::IFEQ => cycles += self.skip_unless(self.r[rd] == rn),
            p2::IFNEQ => cycles += self.skip_unless(self.r[rd] != rn),
            p2::IFL => cycles += self.skip_unless(self.r[rd] < rn),
            p2::IFSL => cycles += self.skip_unless((self.r[rd] as i32) < rn as i32),
            p2::IFLE => cycles += self.skip_unless(self.r[rd] <= rn),
            p2::IFSLE => cycles += self.skip_unless((self.r[rd] as i32) <= rn as i32),
            p2::IFBITS => cycles += self.skip_unless(self.r[rd] & rn != 0),
            p2::IFCLEAR => cycles += self.skip_unless(self.r[rd] & rn == 0),

            p2::JMP2 => self.pc = self.r[rd].wrapping_add(rn) & !3,
            p2::CALL2 => {
                cycles += 1;
                self.push_d(bus, self.pc);
                self.pc = self.r[rd].wrapping_add(rn) & !3;
            }

            _ => {
                log::debug!(
                    "unknown 2-operand opcode 0x{:02X} at 0x{:08X}, treated as NOP",
                    opcode,
                    self.pc.wrapping_sub(4)
                );
            }
        }

        cycles
    }

    /// Enter the skip state (and charge the extra cycle) when the
    /// predicate does not hold.
    fn skip_unless(&mut self, condition: bool) -> u32 {
        if condition {
            0
        } else {
            self.skipping = true;
            1
        }
    }

    fn exec_p1<B: Bus>(&mut self, bus: &mut B, inst: u32) -> u32 {
        let mut cycles = 3;
        let opcode = inst >> 24 & 0x1F;
        let literal = decode::has_literal(inst);

        // Without the literal flag the operand register index reuses the
        // RD field slot; this is an ISA quirk, not a bug.
        let reg = decode::rd(inst);
        let rn = if literal {
            self.fetch_literal(bus, decode::lit22(inst), &mut cycles)
        } else {
            self.r[reg]
        };

        match opcode {
            p1::XCHGB => {
                if !literal {
                    let v = self.r[reg];
                    self.r[reg] = (v & 0xFFFF_0000) | (v & 0xFF) << 8 | v >> 8 & 0xFF;
                }
            }
            p1::XCHGW => {
                if !literal {
                    self.r[reg] = self.r[reg].rotate_left(16);
                }
            }
            p1::GETPC => {
                if !literal {
                    // PC already points past this instruction.
                    self.r[reg] = self.pc;
                }
            }

            p1::POP => {
                if !literal {
                    // SP addresses the last pushed element.
                    self.r[reg] = bus.read_d(self.r[REG_SP]);
                    self.r[REG_SP] = self.r[REG_SP].wrapping_add(4);
                }
            }
            p1::PUSH => self.push_d(bus, rn),

            p1::JMP => self.pc = rn & !3,
            p1::CALL => {
                cycles += 1;
                self.push_d(bus, self.pc);
                self.pc = rn & !3;
            }
            p1::RJMP => self.pc = self.pc.wrapping_add(rn) & !3,
            p1::RCALL => {
                cycles += 1;
                self.push_d(bus, self.pc);
                self.pc = self.pc.wrapping_add(rn) & !3;
            }

            p1::INT => {
                cycles += 3;
                self.send_interrupt(rn as u8);
            }

            _ => {
                log::debug!(
                    "unknown 1-operand opcode 0x{:02X} at 0x{:08X}, treated as NOP",
                    opcode,
                    self.pc.wrapping_sub(4)
                );
            }
        }

        cycles
    }

    fn exec_np<B: Bus>(&mut self, bus: &mut B, inst: u32) -> u32 {
        match inst & 0x0FFF_FFFF {
            np::SLEEP => {
                self.sleeping = true;
                1
            }
            np::RET => {
                self.pc = self.pop_d(bus) & !3;
                4
            }
            np::RFI => {
                self.pc = self.pop_d(bus) & !3;
                self.r[0] = self.pop_d(bus);
                self.set_flag(Flag::IF, false);
                self.interrupt = false;
                6
            }
            // Unknown opcode: one-cycle no-op.
            _ => 1,
        }
    }
}
