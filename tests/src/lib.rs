#![cfg_attr(not(test), no_std)]

use kestrel_drivers::pic::pic_quiesce_disable;
pub use kestrel_lib::testing::{
    HARNESS_MAX_SUITES, TestConfig, TestRunSummary, TestSuiteDesc, TestSuiteResult, Verbosity,
    measure_elapsed_ms,
};
use kestrel_lib::ports::QEMU_DEBUG_EXIT;
use kestrel_lib::testing::harness::report_suite;
use kestrel_lib::{cpu, klog_info, tsc};

#[cfg(feature = "builtin-tests")]
pub mod dispatch_tests;

pub const TESTS_MAX_SUITES: usize = HARNESS_MAX_SUITES;

/// Suites collected in the `.test_registry` link section.
#[cfg(target_os = "none")]
pub fn tests_registry() -> &'static [TestSuiteDesc] {
    unsafe extern "C" {
        static __test_registry_start: TestSuiteDesc;
        static __test_registry_end: TestSuiteDesc;
    }
    let start = &raw const __test_registry_start;
    let end = &raw const __test_registry_end;
    let bytes = (end as usize).saturating_sub(start as usize);
    let len = bytes / core::mem::size_of::<TestSuiteDesc>();
    // SAFETY: the linker script brackets the section with these symbols and
    // the section holds nothing but `TestSuiteDesc` statics.
    unsafe { core::slice::from_raw_parts(start, len) }
}

/// Hosted builds have no registry section.
#[cfg(not(target_os = "none"))]
pub fn tests_registry() -> &'static [TestSuiteDesc] {
    &[]
}

/// Run every suite in `registry`, filling `summary`. Returns 0 when all
/// tests passed.
pub fn tests_run_all(
    config: &TestConfig,
    summary: &mut TestRunSummary,
    registry: &[TestSuiteDesc],
) -> i32 {
    *summary = TestRunSummary::default();
    if !config.enabled {
        klog_info!("TESTS: Harness disabled");
        return 0;
    }

    klog_info!("TESTS: Starting {} test suites", registry.len());

    let start_cycles = tsc::rdtsc();
    for (idx, desc) in registry.iter().enumerate() {
        let mut res = TestSuiteResult::new(desc.name);
        if let Some(run) = desc.run {
            run(config, &mut res);
        }
        report_suite(config.verbosity, idx, &res);
        summary.add_suite_result(&res);
    }
    let overall_ms = measure_elapsed_ms(start_cycles, tsc::rdtsc());
    if overall_ms > summary.elapsed_ms {
        summary.elapsed_ms = overall_ms;
    }

    klog_info!(
        "TESTS SUMMARY: total={} passed={} failed={} elapsed_ms={}",
        summary.total_tests,
        summary.passed,
        summary.failed,
        summary.elapsed_ms,
    );

    if summary.all_passed() { 0 } else { -1 }
}

/// Leave the emulator through the debug-exit device, or halt on hardware.
pub fn tests_request_shutdown(failed: bool) -> ! {
    klog_info!("TEST: Requesting shutdown (failed={})", failed);
    pic_quiesce_disable();
    let exit_value: u8 = if failed { 1 } else { 0 };
    unsafe { QEMU_DEBUG_EXIT.write(exit_value) };
    cpu::halt_forever()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing_suite(_: &TestConfig, out: &mut TestSuiteResult) -> i32 {
        out.fill(3, 3, 1);
        0
    }

    fn failing_suite(_: &TestConfig, out: &mut TestSuiteResult) -> i32 {
        out.fill(1, 2, 1);
        -1
    }

    const REGISTRY: [TestSuiteDesc; 3] = [
        TestSuiteDesc {
            name: "alpha",
            run: Some(passing_suite),
        },
        TestSuiteDesc {
            name: "beta",
            run: Some(failing_suite),
        },
        TestSuiteDesc {
            name: "empty",
            run: None,
        },
    ];

    fn enabled() -> TestConfig {
        TestConfig {
            enabled: true,
            ..TestConfig::default()
        }
    }

    #[test]
    fn run_all_aggregates_every_suite() {
        let mut summary = TestRunSummary::default();
        let rc = tests_run_all(&enabled(), &mut summary, &REGISTRY);

        assert_eq!(rc, -1);
        assert_eq!(summary.suite_count, 3);
        assert_eq!(summary.total_tests, 5);
        assert_eq!(summary.passed, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.suites[0].name, "alpha");
        assert_eq!(summary.suites[2].total, 0);
    }

    #[test]
    fn passing_registry_returns_zero() {
        let mut summary = TestRunSummary::default();
        assert_eq!(tests_run_all(&enabled(), &mut summary, &REGISTRY[..1]), 0);
        assert!(summary.all_passed());
    }

    #[test]
    fn disabled_harness_runs_nothing() {
        let config = TestConfig {
            enabled: false,
            ..TestConfig::default()
        };
        let mut summary = TestRunSummary::default();
        assert_eq!(tests_run_all(&config, &mut summary, &REGISTRY), 0);
        assert_eq!(summary.suite_count, 0);
    }

    #[test]
    fn hosted_registry_is_empty() {
        assert!(tests_registry().is_empty());
    }
}
