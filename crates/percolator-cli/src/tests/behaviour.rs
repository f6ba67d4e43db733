//! BDD steps mapping `tests/features/percolate.feature` onto CLI runs
//! against `/bin/sh` workers.

use std::cell::RefCell;
use std::process::ExitCode;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{ANSWERS_ONCE, FOX_MATCHER, RunOutput, run_script, test_config};

#[derive(Default)]
struct TestWorld {
    script: Option<&'static str>,
    output: Option<RunOutput>,
}

impl TestWorld {
    fn output(&self) -> &RunOutput {
        self.output.as_ref().expect("percolate should have run")
    }
}

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}

#[given("a worker that matches \"{phrase}\"")]
fn given_matching_worker(world: &RefCell<TestWorld>, phrase: String) {
    assert_eq!(phrase, "quick brown fox", "the shell matcher is fixed");
    world.borrow_mut().script = Some(FOX_MATCHER);
}

#[given("a worker that answers once and then closes its output")]
fn given_short_lived_worker(world: &RefCell<TestWorld>) {
    world.borrow_mut().script = Some(ANSWERS_ONCE);
}

#[when("percolate reads \"{first}\" and \"{second}\"")]
fn when_percolate_reads(world: &RefCell<TestWorld>, first: String, second: String) {
    let script = world.borrow().script.expect("worker configured");
    let input = format!("{first}\n{second}\n");
    world.borrow_mut().output = Some(run_script(test_config(), script, &input));
}

#[then("the run succeeds")]
fn then_run_succeeds(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let output = world.output();
    assert_eq!(output.exit_code, ExitCode::SUCCESS, "{}", output.stderr);
}

#[then("the run fails")]
fn then_run_fails(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().output().exit_code, ExitCode::FAILURE);
}

#[then("stdout line {index} is \"{expected}\"")]
fn then_stdout_line(world: &RefCell<TestWorld>, index: usize, expected: String) {
    let world = world.borrow();
    let line = index
        .checked_sub(1)
        .and_then(|position| world.output().stdout.lines().nth(position));
    assert_eq!(line, Some(expected.as_str()));
}

#[then("stdout line {index} is blank")]
fn then_stdout_line_blank(world: &RefCell<TestWorld>, index: usize) {
    let world = world.borrow();
    let line = index
        .checked_sub(1)
        .and_then(|position| world.output().stdout.lines().nth(position));
    assert_eq!(line, Some(""));
}

#[then("stderr mentions \"{fragment}\"")]
fn then_stderr_mentions(world: &RefCell<TestWorld>, fragment: String) {
    let world = world.borrow();
    let stderr = &world.output().stderr;
    assert!(stderr.contains(&fragment), "{stderr}");
}

#[scenario(path = "tests/features/percolate.feature")]
fn percolate_behaviour(#[from(world)] _: RefCell<TestWorld>) {}
