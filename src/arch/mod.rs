cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "arm", target_feature = "thumb2"))] {
        mod cortex_m;
        pub use self::cortex_m::*;
    } else {
        mod generic;
        pub use self::generic::*;
    }
}
