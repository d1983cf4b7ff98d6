/// Constructs a logger for tests, writing to a capture buffer instead of the
/// console.
pub fn test_logger() {
    // Ignore double initialisations since tests are ran in parallel.
    let _ = env_logger::builder().is_test(true).try_init();
}
