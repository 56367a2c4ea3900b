//! Compile-pass tests for derived code.
//!
//! These tests verify that `#[derive(Maskable)]` expands to code that compiles
//! and runs for shapes that are awkward to cover inline, such as:
//! - generic aggregates whose parameters need derive-added bounds
//! - record-shaped aggregates built from `Default`

#[test]
fn compile_pass_tests() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/pass/*.rs");
}
