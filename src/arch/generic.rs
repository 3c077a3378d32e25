pub fn idle() {
    core::hint::spin_loop();
}
