use crate::executor::{CommandExecutor, ExecutionOutcome, ExecutorError};
use crate::intent::IntentResult;

/// The two calibrated confidence cut points. Constructed once, process-wide;
/// there is no adaptive adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingThresholds {
    confirmation: f64,
    auto_execute: f64,
}

impl RoutingThresholds {
    /// Fails unless `0.0 <= confirmation <= auto_execute <= 1.0`. A violation
    /// is a configuration error; the pipeline refuses to start on it.
    pub fn new(confirmation: f64, auto_execute: f64) -> Result<Self, String> {
        if !(0.0..=1.0).contains(&confirmation) || !(0.0..=1.0).contains(&auto_execute) {
            return Err(format!(
                "confidence thresholds must be within [0, 1], got confirmation={confirmation} auto_execute={auto_execute}"
            ));
        }
        if confirmation > auto_execute {
            return Err(format!(
                "confirmation threshold ({confirmation}) must not exceed auto-execute threshold ({auto_execute})"
            ));
        }
        Ok(Self {
            confirmation,
            auto_execute,
        })
    }

    pub fn confirmation(&self) -> f64 {
        self.confirmation
    }

    pub fn auto_execute(&self) -> f64 {
        self.auto_execute
    }
}

/// Three-way decision for one intent. A value, not an error: `Reject` and
/// `Confirm` are ordinary outcomes with their own user-visible behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Reject,
    Confirm,
    Execute,
}

impl RouteDecision {
    pub fn label(self) -> &'static str {
        match self {
            RouteDecision::Reject => "reject",
            RouteDecision::Confirm => "confirm",
            RouteDecision::Execute => "execute",
        }
    }
}

/// What the router did with an intent. On `Executed` the executor has already
/// run; the other variants carry the decision back to the caller, who owns the
/// user interaction.
#[derive(Debug)]
pub enum Routed {
    Executed(ExecutionOutcome),
    NeedsConfirmation,
    Rejected,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceRouter {
    thresholds: RoutingThresholds,
}

impl ConfidenceRouter {
    pub fn new(thresholds: RoutingThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> RoutingThresholds {
        self.thresholds
    }

    /// Pure decision function over the confidence alone. No side effects.
    pub fn decide(&self, confidence: f64) -> RouteDecision {
        if confidence < self.thresholds.confirmation {
            RouteDecision::Reject
        } else if confidence < self.thresholds.auto_execute {
            RouteDecision::Confirm
        } else {
            RouteDecision::Execute
        }
    }

    /// Route one intent. Only the `Execute` branch touches the executor;
    /// executor errors (`NotAllowed`, `ExecutionFailed`) propagate unchanged.
    pub fn route(
        &self,
        executor: &CommandExecutor,
        intent: &IntentResult,
    ) -> Result<Routed, ExecutorError> {
        match self.decide(intent.confidence) {
            RouteDecision::Reject => Ok(Routed::Rejected),
            RouteDecision::Confirm => Ok(Routed::NeedsConfirmation),
            RouteDecision::Execute => {
                let outcome = executor.execute(&intent.intent_id)?;
                Ok(Routed::Executed(outcome))
            }
        }
    }
}
