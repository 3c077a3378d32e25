/// Sleep until the next interrupt, which is what can make a thread runnable
/// again.
pub fn idle() {
    cortex_m::asm::wfi();
}
