//! Synthesizes the initial stack frame for a freshly created task.
//!
//! A "push" on AVR is nothing more than "store a byte, then move the
//! stack pointer down by one" — there is no register involved that a
//! host build can't simulate. That means the frame's *shape* can be
//! built (and tested) as ordinary Rust pointer arithmetic; only the
//! mirror-image *restore*, which must recover the registers of a task
//! that is genuinely mid-execution, needs real inline assembly, and that
//! lives in `ports::avr::context` instead.
//!
//! Frame layout, deepest (lowest address, pushed first) to shallowest
//! (highest address, pushed last — i.e. popped first by `restore_context`):
//!
//! ```text
//! entry address low byte     \
//! entry address high byte     \__ consumed by `reti`'s own PC pop
//! r0 placeholder (0x00)
//! status word (0x80 = global interrupt enable set)
//! r1 .. r31, all zeroed
//! ```
//!
//! `spec.md` §9 raises an open question about the original source
//! pushing what looks like 31 registers while restore pops 32. Reading
//! `original_source/rtos.c`'s `InitTaskStackArea` and `RestoreContext`
//! side by side resolves it: the builder pushes a placeholder `r0`, the
//! status word, and 31 general registers (`r1..r31`) — [`FRAME_REGISTER_BYTES`]
//! bytes total, after the 2-byte return address — and `RestoreContext`
//! pops that same count (31 general registers, then the status word via
//! `r0`, then the real `r0`). The two sides already agree; this module
//! just gives the agreed count a name instead of a repeated literal.

use crate::task::TaskEntry;

/// Number of general-purpose registers pushed by the builder and popped
/// by the restore path, not counting the placeholder `r0` swapped in for
/// the status word (`r1` through `r31`).
pub const GENERAL_REGISTER_COUNT: usize = 31;

/// Bytes of register state after the return address: the `r0`
/// placeholder, the status word, and [`GENERAL_REGISTER_COUNT`] general
/// registers.
pub const FRAME_REGISTER_BYTES: usize = 2 + GENERAL_REGISTER_COUNT;

/// Bytes occupied by the pushed entry address.
pub const RETURN_ADDRESS_BYTES: usize = 2;

/// Total size of a freshly built frame.
pub const INITIAL_FRAME_BYTES: usize = RETURN_ADDRESS_BYTES + FRAME_REGISTER_BYTES;

/// Global interrupt enable bit in the AVR status register (`SREG`).
///
/// Set in the frame's saved status word so a task runs with interrupts
/// enabled from its very first instruction, per `spec.md` §4.3.
pub const GLOBAL_INTERRUPT_ENABLE_BIT: u8 = 0x80;

/// Writes `byte` at `*sp` and moves `sp` one byte lower, the same
/// decrement-after-store a hardware `push` performs.
unsafe fn push(sp: &mut *mut u8, byte: u8) {
    core::ptr::write_volatile(*sp, byte);
    *sp = sp.sub(1);
}

/// Builds an initial frame below `stack_top` so that `restore_context`
/// against it resumes execution at `entry`, with a zeroed register file
/// and interrupts enabled.
///
/// Returns the resulting stack pointer, to be written back into the
/// task's `Tcb::stack_pointer`.
///
/// # Safety
///
/// `stack_top` must point at the highest writable byte of a region at
/// least [`INITIAL_FRAME_BYTES`] bytes deep, exclusively owned by the
/// caller for the duration of the call.
pub unsafe fn build_initial_frame(stack_top: *mut u8, entry: TaskEntry) -> *mut u8 {
    let mut sp = stack_top;
    let addr = entry as usize;

    // Return address: low byte pushed first, exactly as
    // `original_source/rtos.c`'s `push %A2` / `push %B2` sequence does.
    push(&mut sp, (addr & 0xFF) as u8);
    push(&mut sp, ((addr >> 8) & 0xFF) as u8);

    // Placeholder for r0, overwritten with its real value the first
    // time this task is actually preempted.
    push(&mut sp, 0);

    // Status word: global interrupt enable bit set, everything else clear.
    push(&mut sp, GLOBAL_INTERRUPT_ENABLE_BIT);

    // r1..r31, zeroed.
    for _ in 0..GENERAL_REGISTER_COUNT {
        push(&mut sp, 0);
    }

    sp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_entry() -> ! {
        loop {}
    }

    /// Re-reads a frame built by [`build_initial_frame`] byte by byte,
    /// walking back up from the resulting stack pointer, to check its
    /// shape without needing real AVR restore code.
    struct FrameView {
        entry_low: u8,
        entry_high: u8,
        r0_placeholder: u8,
        status: u8,
        general_registers: [u8; GENERAL_REGISTER_COUNT],
    }

    unsafe fn read_frame(final_sp: *mut u8) -> FrameView {
        let mut p = final_sp;
        let mut next = || {
            p = p.add(1);
            core::ptr::read(p)
        };
        let mut general_registers = [0u8; GENERAL_REGISTER_COUNT];
        for slot in general_registers.iter_mut().rev() {
            *slot = next();
        }
        let status = next();
        let r0_placeholder = next();
        let entry_high = next();
        let entry_low = next();
        FrameView {
            entry_low,
            entry_high,
            r0_placeholder,
            status,
            general_registers,
        }
    }

    #[test]
    fn frame_consumes_exactly_initial_frame_bytes() {
        let mut buf = [0u8; 64];
        let stack_top = unsafe { buf.as_mut_ptr().add(40) };
        let final_sp = unsafe { build_initial_frame(stack_top, dummy_entry) };
        let consumed = stack_top as usize - final_sp as usize;
        assert_eq!(consumed, INITIAL_FRAME_BYTES);
    }

    #[test]
    fn frame_encodes_entry_address_little_endian() {
        let mut buf = [0u8; 64];
        let stack_top = unsafe { buf.as_mut_ptr().add(40) };
        let final_sp = unsafe { build_initial_frame(stack_top, dummy_entry) };
        let view = unsafe { read_frame(final_sp) };
        let addr = dummy_entry as usize;
        assert_eq!(view.entry_low, (addr & 0xFF) as u8);
        assert_eq!(view.entry_high, ((addr >> 8) & 0xFF) as u8);
    }

    #[test]
    fn frame_has_zeroed_registers_and_interrupts_enabled() {
        let mut buf = [0u8; 64];
        let stack_top = unsafe { buf.as_mut_ptr().add(40) };
        let final_sp = unsafe { build_initial_frame(stack_top, dummy_entry) };
        let view = unsafe { read_frame(final_sp) };
        assert_eq!(view.r0_placeholder, 0);
        assert_eq!(view.status, GLOBAL_INTERRUPT_ENABLE_BIT);
        assert!(view.general_registers.iter().all(|&b| b == 0));
    }
}
