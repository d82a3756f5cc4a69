//! # Operation introspection.
//!
//! [`report_operation`] renders a human-readable snapshot of a running or
//! finished operation: current state, optionally the step list with a
//! progress marker, the env of the active scope, and sanitized history.
//! History snapshots only ever contain state-visible values (state, env,
//! result, fail reason); runtime-private fields such as the completion
//! slot, scope frames and timer handles are stripped at record time.

use std::fmt::Write;

use crate::runtime::operation::Operation;

/// Which sections [`report_operation`] renders.
#[derive(Clone, Copy, Debug)]
pub struct ReportOptions {
    /// Render the step list of the active sequence scope.
    pub steps: bool,
    /// Render the env of the active sequence scope.
    pub env: bool,
    /// Render recorded history.
    pub history: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            steps: true,
            env: true,
            history: false,
        }
    }
}

/// Pretty-prints the operation's current state.
pub fn report_operation(op: &Operation, opts: &ReportOptions) -> String {
    let mut out = String::new();
    let status = match op.status() {
        Ok(status) => status,
        Err(err) => {
            let _ = writeln!(out, "operation <unavailable>: {err}");
            return out;
        }
    };

    let name = op.name().unwrap_or("<anonymous>");
    let _ = writeln!(out, "operation '{name}': state={}", status.state);
    let _ = writeln!(out, "  result: {}", status.result);
    if let Some(reason) = &status.fail_reason {
        let _ = writeln!(out, "  fail-reason: {reason}");
    }

    if opts.steps && !status.steps.is_empty() {
        let _ = writeln!(out, "  steps:");
        for (i, label) in status.steps.iter().enumerate() {
            let marker = if i + 1 < status.started_steps {
                "done"
            } else if i + 1 == status.started_steps {
                "active"
            } else {
                "pending"
            };
            let _ = writeln!(out, "    [{i}] {label} ({marker})");
        }
    }

    if opts.env {
        if let Some(env) = &status.env {
            if !env.is_empty() {
                let _ = writeln!(out, "  env:");
                for (key, value) in env.iter() {
                    let _ = writeln!(out, "    {key} = {value}");
                }
            }
        }
    }

    if opts.history {
        if let Ok(history) = op.history() {
            if !history.is_empty() {
                let _ = writeln!(out, "  history:");
                for entry in &history {
                    let _ = write!(out, "    {} result={}", entry.state, entry.data.result);
                    if let Some(reason) = &entry.data.fail_reason {
                        let _ = write!(out, " fail-reason={reason}");
                    }
                    if let Some(env) = &entry.data.env {
                        if !env.is_empty() {
                            let _ = write!(out, " env={{");
                            for (i, (key, value)) in env.iter().enumerate() {
                                if i > 0 {
                                    let _ = write!(out, ", ");
                                }
                                let _ = write!(out, "{key}={value}");
                            }
                            let _ = write!(out, "}}");
                        }
                    }
                    let _ = writeln!(out);
                }
            }
        }
    }

    out
}
