//! Failure injection for the mock submitter

use serde_json::Value;

/// Which submissions a rule applies to
#[derive(Debug, Clone, PartialEq)]
pub enum Match {
    /// Every submission
    Any,
    /// Submissions whose configuration equals this document
    Configuration(Value),
}

impl Match {
    fn matches(&self, configuration: &Value) -> bool {
        match self {
            Match::Any => true,
            Match::Configuration(expected) => expected == configuration,
        }
    }
}

/// One failure rule
#[derive(Debug, Clone)]
pub struct FailureRule {
    pub when: Match,
    /// Error message to return
    pub message: String,
    /// Number of matching calls to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureRule {
    /// Fail every submission
    pub fn always(message: impl Into<String>) -> Self {
        Self {
            when: Match::Any,
            message: message.into(),
            fail_count: None,
        }
    }

    /// Fail submissions carrying exactly this configuration
    pub fn for_configuration(configuration: Value, message: impl Into<String>) -> Self {
        Self {
            when: Match::Configuration(configuration),
            message: message.into(),
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

/// Failure injector: first matching rule wins
#[derive(Debug, Default)]
pub struct FailureInjector {
    rules: Vec<(FailureRule, u32)>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&mut self, rule: FailureRule) {
        self.rules.push((rule, 0));
    }

    /// Check if a submission should fail.
    /// Returns the failing rule if so, None otherwise.
    pub fn check(&mut self, configuration: &Value) -> Option<&FailureRule> {
        let (rule, count) = self
            .rules
            .iter_mut()
            .find(|(rule, _)| rule.when.matches(configuration))?;

        *count += 1;
        if let Some(fail_limit) = rule.fail_count {
            if *count > fail_limit {
                return None; // Exceeded fail count, succeed now
            }
        }
        Some(&*rule)
    }
}
