use std::process::ExitCode;

use correlation_log::{CorrelationGuard, CorrelationId, Logger};

/// Error type for the simulated automation run.
#[derive(thiserror::Error, Debug)]
enum RunError {
    #[error("no security policies available for evaluation")]
    NoPolicies,
}

fn main() -> ExitCode {
    if let Err(err) = correlation_log::configure_from_env() {
        eprintln!("invalid logging configuration: {}", err);
        return ExitCode::FAILURE;
    }

    // Explicit value would come from a caller chaining runs; otherwise the
    // CORRELATION_ID variable, otherwise a fresh UUID. Cleared when the
    // guard drops.
    let correlation_id = CorrelationId::resolve(None);
    let _guard = CorrelationGuard::set(correlation_id.as_str());

    let log = correlation_log::get("security_automation");
    log.info("security automation run started")
        .event("run_started")
        .emit();

    match run(&log) {
        Ok(()) => {
            log.info("security automation completed successfully")
                .event("run_completed")
                .emit();
            ExitCode::SUCCESS
        }
        Err(err) => {
            log.exception("security automation failed", &err)
                .event("run_failed")
                .emit();
            ExitCode::FAILURE
        }
    }
}

/// Simulated policy-evaluation run. Each step logs a tagged record so the
/// whole run can be reconstructed from the correlation ID.
fn run(log: &Logger) -> Result<(), RunError> {
    log.info("initializing security automation tasks")
        .event("init_tasks")
        .emit();

    let policies = load_policies();
    if policies.is_empty() {
        return Err(RunError::NoPolicies);
    }

    log.info("evaluating security policies")
        .event("policy_evaluated")
        .field("policy_count", policies.len())
        .emit();

    log.info("executing automated remediation")
        .event("automation_executed")
        .field("policies", &policies)
        .emit();

    Ok(())
}

/// Placeholder policy inventory; a real deployment would load these from
/// a policy store.
fn load_policies() -> Vec<&'static str> {
    vec![
        "credential-rotation",
        "network-egress-review",
        "patch-compliance",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use correlation_log::{configure_with_sink, set_correlation_id, LogConfig, MemorySink};

    #[test]
    fn simulated_run_emits_tagged_records() {
        let sink = Arc::new(MemorySink::new());
        configure_with_sink(LogConfig::default(), sink.clone());
        set_correlation_id("run-test");

        let log = correlation_log::get("security_automation");
        run(&log).unwrap();

        let lines = sink.lines();
        let events: Vec<String> = lines
            .iter()
            .map(|line| {
                let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
                assert_eq!(parsed["correlation_id"], "run-test");
                assert_eq!(parsed["logger"], "security_automation");
                parsed["event"].as_str().unwrap().to_string()
            })
            .collect();

        assert_eq!(
            events,
            vec!["init_tasks", "policy_evaluated", "automation_executed"]
        );
    }
}
