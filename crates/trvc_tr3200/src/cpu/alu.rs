use super::{Cpu, Flag};

#[inline]
fn sign(value: u32) -> bool {
    value & 0x8000_0000 != 0
}

impl Cpu {
    /// 32-bit add with carry-in; CF is bit 32 of the 64-bit sum.
    ///
    /// OF is updated only when both operands carry the same sign, set iff
    /// the result sign disagrees; with mixed signs the previous OF value
    /// is preserved.
    pub(super) fn alu_add(&mut self, a: u32, b: u32, carry_in: u32) -> u32 {
        let sum = a as u64 + b as u64 + carry_in as u64;
        let result = sum as u32;
        self.set_flag(Flag::CF, sum & (1u64 << 32) != 0);
        if sign(a) == sign(b) {
            self.set_flag(Flag::OF, sign(b) != sign(result));
        }
        result
    }

    /// 32-bit subtract `a - (b + borrow_in)`.
    ///
    /// The effective subtrahend wraps in 32 bits before both the borrow
    /// test and the difference. CF is the unsigned borrow. OF is updated
    /// only when the operand signs differ, set iff the subtrahend sign
    /// equals the result sign.
    pub(super) fn alu_sub(&mut self, a: u32, b: u32, borrow_in: u32) -> u32 {
        let sub = b.wrapping_add(borrow_in);
        let result = a.wrapping_sub(sub);
        self.set_flag(Flag::CF, a < sub);
        if sign(a) != sign(b) {
            self.set_flag(Flag::OF, sign(b) == sign(result));
        }
        result
    }

    /// Reverse-subtract flag variant of [`Cpu::alu_sub`]: OF is updated
    /// only when the operand signs agree, set iff the minuend sign
    /// disagrees with the result sign.
    pub(super) fn alu_rsb(&mut self, a: u32, b: u32, borrow_in: u32) -> u32 {
        let sub = b.wrapping_add(borrow_in);
        let result = a.wrapping_sub(sub);
        self.set_flag(Flag::CF, a < sub);
        if sign(a) == sign(b) {
            self.set_flag(Flag::OF, sign(a) != sign(result));
        }
        result
    }

    /// Logical shift left through a 64-bit intermediate; CF is bit 32 of
    /// the widened result. Counts of 64 or more flush to zero.
    pub(super) fn alu_shl(&mut self, value: u32, count: u32) -> u32 {
        let wide = if count >= 64 { 0 } else { (value as u64) << count };
        self.set_flag(Flag::CF, wide & (1u64 << 32) != 0);
        self.set_flag(Flag::OF, false);
        wide as u32
    }

    /// Logical shift right. The value is pre-shifted left by one so the
    /// last bit shifted out stays observable; CF captures it before the
    /// final correcting shift.
    pub(super) fn alu_shr(&mut self, value: u32, count: u32) -> u32 {
        let wide = if count >= 64 {
            0
        } else {
            ((value as u64) << 1) >> count
        };
        self.set_flag(Flag::CF, wide & 1 != 0);
        self.set_flag(Flag::OF, false);
        (wide >> 1) as u32
    }

    /// Arithmetic shift right with the same carry capture as
    /// [`Cpu::alu_shr`]. Counts past the 64-bit intermediate saturate to
    /// a full sign fill.
    pub(super) fn alu_sar(&mut self, value: u32, count: u32) -> u32 {
        let wide = ((value as i32 as i64) << 1) >> count.min(63);
        self.set_flag(Flag::CF, wide & 1 != 0);
        self.set_flag(Flag::OF, false);
        (wide >> 1) as u32
    }

    #[inline]
    pub(super) fn clear_cf_of(&mut self) {
        self.set_flag(Flag::CF, false);
        self.set_flag(Flag::OF, false);
    }
}
