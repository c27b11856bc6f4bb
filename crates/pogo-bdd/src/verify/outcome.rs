use crate::error::VerifyError;
use crate::exec::CommandOutcome;

pub fn assert_exit_code(outcome: &CommandOutcome, expected: i32) -> Result<(), VerifyError> {
    if outcome.exit_code == expected {
        Ok(())
    } else {
        Err(exit_code_error(outcome, expected.to_string()))
    }
}

pub fn assert_success(outcome: &CommandOutcome) -> Result<(), VerifyError> {
    assert_exit_code(outcome, 0)
}

pub fn assert_failure(outcome: &CommandOutcome) -> Result<(), VerifyError> {
    if outcome.exit_code != 0 {
        Ok(())
    } else {
        Err(exit_code_error(outcome, "non-zero".to_string()))
    }
}

fn exit_code_error(outcome: &CommandOutcome, expected: String) -> VerifyError {
    let mut output = outcome.output.clone();
    if let Some(error) = &outcome.error {
        output.push_str("\n--- error ---\n");
        output.push_str(error);
    }
    VerifyError::ExitCode {
        expected,
        actual: outcome.exit_code,
        output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ExecutionMode;

    fn outcome(exit_code: i32, error: Option<&str>) -> CommandOutcome {
        let mut outcome = CommandOutcome::started("pogo --version", ExecutionMode::InProcess);
        outcome.output = "pogo 0.3.1".to_string();
        outcome.exit_code = exit_code;
        outcome.error = error.map(str::to_string);
        outcome
    }

    #[test]
    fn test_success_and_failure() {
        assert!(assert_success(&outcome(0, None)).is_ok());
        assert!(assert_failure(&outcome(0, None)).is_err());
        assert!(assert_failure(&outcome(2, None)).is_ok());
        assert!(assert_exit_code(&outcome(2, None), 2).is_ok());
    }

    #[test]
    fn test_launch_failure_is_never_success() {
        let err = assert_success(&outcome(-1, Some("No such file or directory"))).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("got -1"));
        assert!(msg.contains("No such file or directory"));
    }
}
