//! Naked-function context save/restore for voluntary kernel entry points
//! on the ATmega328P-class target. The periodic-tick path has its own,
//! separately duplicated copy of the save sequence in
//! `ports::avr::mod`'s `__vector_11`; see that module's doc comment for
//! why it isn't factored out to share this one.
//!
//! The I/O port numbers below (`SREG`, `SPL`, `SPH`) are the literal
//! ATmega328P addresses rather than the named `__SREG__`/`__SP_L__`/
//! `__SP_H__` assembler macros the original uses, because those macros
//! come from avr-gcc's device headers and are not available to LLVM's
//! integrated assembler, which `rustc`'s AVR backend uses instead of
//! avr-gcc's `as`.

use crate::kernel::CURRENT;

/// `SREG` I/O address on the ATmega328P.
pub(crate) const SREG: u8 = 0x3f;
/// `SPL` (stack pointer low byte) I/O address.
pub(crate) const SPL: u8 = 0x3d;
/// `SPH` (stack pointer high byte) I/O address.
pub(crate) const SPH: u8 = 0x3e;

/// Saves the caller's full register file and status word onto its own
/// stack, records the resulting stack pointer into [`CURRENT`], switches
/// onto the scheduler's reserved scratch stack
/// (`crate::kernel::SCRATCH_STACK_TOP`), runs the portable selection
/// algorithm there, and restores whichever task it chose.
///
/// Declared as an ordinary, `()`-returning `extern "C" fn` — not `-> !` —
/// even though its body never executes a literal `ret`: every caller is
/// an ordinary voluntary kernel entry point (`delay_task`, `suspend_task`,
/// `resume_task`, `set_task_priority`) invoking this through a plain
/// `call` instruction, which pushes a return address pointing at
/// whatever Rust code follows that call site. That address becomes part
/// of the saved frame — it is the first thing restored — so the task
/// resumes exactly there, the next time the scheduler picks it, with
/// control appearing (from that caller's point of view) to have
/// returned normally from this function. Declaring it `-> !` would let
/// the compiler discard that continuation as unreachable.
///
/// # Safety
///
/// Must run with global interrupts already disabled and [`CURRENT`]
/// pointing at the task whose context this is.
#[unsafe(naked)]
pub unsafe extern "C" fn enter_scheduler() {
    core::arch::naked_asm!(
        "push r0",
        "in r0, {sreg}",
        "push r0",
        "push r1", "push r2", "push r3", "push r4", "push r5", "push r6", "push r7",
        "push r8", "push r9", "push r10", "push r11", "push r12", "push r13", "push r14",
        "push r15", "push r16", "push r17", "push r18", "push r19", "push r20", "push r21",
        "push r22", "push r23", "push r24", "push r25", "push r26", "push r27", "push r28",
        "push r29", "push r30", "push r31",
        "lds r30, {current}",
        "lds r31, {current}+1",
        "clr r1",
        "in r0, {spl}",
        "st Z+, r0",
        "in r0, {sph}",
        "st Z+, r0",
        "lds r24, {scratch_top}",
        "lds r25, {scratch_top}+1",
        "out {spl}, r24",
        "out {sph}, r25",
        "call {select_next_task}",
        "jmp {restore_context}",
        sreg = const SREG,
        spl = const SPL,
        sph = const SPH,
        current = sym CURRENT,
        scratch_top = sym crate::kernel::SCRATCH_STACK_TOP,
        select_next_task = sym crate::kernel::select_next_task,
        restore_context = sym restore_context,
    );
}

/// Loads the stack pointer from [`CURRENT`], pops the register file and
/// status word, and returns from interrupt — atomically re-enabling
/// interrupts via `reti`, regardless of the interrupt-enable bit's value
/// in the popped status word itself (that byte only restores the other
/// flags; `reti` always sets the global interrupt flag).
///
/// # Safety
///
/// Never returns to its caller in the ordinary sense; control resumes
/// inside whatever task [`CURRENT`] names. [`CURRENT`] must point at a
/// [`crate::task::Tcb`] whose `stack_pointer` addresses a well-formed
/// frame, per `spec.md` §3 invariant 5.
#[unsafe(naked)]
pub unsafe extern "C" fn restore_context() -> ! {
    core::arch::naked_asm!(
        "lds r26, {current}",
        "lds r27, {current}+1",
        "ld r0, X+",
        "out {spl}, r0",
        "ld r0, X+",
        "out {sph}, r0",
        "pop r31", "pop r30", "pop r29", "pop r28", "pop r27", "pop r26", "pop r25",
        "pop r24", "pop r23", "pop r22", "pop r21", "pop r20", "pop r19", "pop r18",
        "pop r17", "pop r16", "pop r15", "pop r14", "pop r13", "pop r12", "pop r11",
        "pop r10", "pop r9", "pop r8", "pop r7", "pop r6", "pop r5", "pop r4",
        "pop r3", "pop r2", "pop r1",
        "pop r0",
        "out {sreg}, r0",
        "pop r0",
        "reti",
        current = sym CURRENT,
        spl = const SPL,
        sph = const SPH,
        sreg = const SREG,
    );
}
