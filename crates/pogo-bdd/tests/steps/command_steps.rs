use cucumber::{then, when};

use pogo_bdd::verify::outcome;
use pogo_bdd::ExecutionMode;

use crate::world::{OrFail, World};

#[when(regex = r#"^I run "([^"]*)"$"#)]
pub async fn i_run(world: &mut World, directive: String) {
    world.ctx.run_suggested(&directive).await.or_fail();
}

#[when(regex = r#"^I run "([^"]*)" (in-process|as a subprocess)$"#)]
pub async fn i_run_in_mode(world: &mut World, directive: String, mode: String) {
    let mode = match mode.as_str() {
        "in-process" => ExecutionMode::InProcess,
        _ => ExecutionMode::Subprocess,
    };
    world.ctx.run(&directive, mode).await.or_fail();
}

#[when(regex = r#"^I try to run "([^"]*)"$"#)]
pub async fn i_try_to_run(world: &mut World, directive: String) {
    world.last_error = world
        .ctx
        .run_suggested(&directive)
        .await
        .err()
        .map(|e| e.to_string());
}

#[then(regex = r"^the command succeeds$")]
pub async fn the_command_succeeds(world: &mut World) {
    outcome::assert_success(world.ctx.last_command().or_fail()).or_fail();
}

#[then(regex = r"^the command fails$")]
pub async fn the_command_fails(world: &mut World) {
    outcome::assert_failure(world.ctx.last_command().or_fail()).or_fail();
}

#[then(regex = r"^the exit code is (-?\d+)$")]
pub async fn the_exit_code_is(world: &mut World, code: i32) {
    outcome::assert_exit_code(world.ctx.last_command().or_fail(), code).or_fail();
}

#[then(regex = r"^the command ran (in-process|as a subprocess)$")]
pub async fn the_command_ran_in(world: &mut World, mode: String) {
    let expected = match mode.as_str() {
        "in-process" => ExecutionMode::InProcess,
        _ => ExecutionMode::Subprocess,
    };
    assert_eq!(world.ctx.last_command().or_fail().mode, expected);
}

#[then(regex = r#"^the step failed with "([^"]+)"$"#)]
pub async fn the_step_failed_with(world: &mut World, expected: String) {
    let error = world
        .last_error
        .as_deref()
        .expect("an earlier step should have failed");
    assert!(
        error.contains(&expected),
        "expected error containing '{}', got: {}",
        expected,
        error
    );
}

#[then(regex = r#"^the command error mentions "([^"]+)"$"#)]
pub async fn the_command_error_mentions(world: &mut World, expected: String) {
    let command = world.ctx.last_command().or_fail();
    let error = command.error.as_deref().unwrap_or_default();
    assert!(
        error.contains(&expected),
        "expected command error containing '{}', got {:?}",
        expected,
        command.error
    );
}
