use tracing::error;

use crate::error::{CaseFailure, HarnessError, Result};
use crate::request::{Harness, Request, Response};

/// Collects independent sub-cases of a scenario.
///
/// A failing case is recorded and its siblings still run; [`Checks::finish`]
/// reports every failure at once.
pub struct Checks {
    scenario: String,
    failures: Vec<CaseFailure>,
}

impl Checks {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            failures: Vec::new(),
        }
    }

    /// Send `request` as its own case, returning the response if it passed.
    pub async fn request(&mut self, harness: &Harness, request: &Request) -> Option<Response> {
        match request.send(harness).await {
            Ok(response) => Some(response),
            Err(err) => {
                self.fail(request.description(), err);
                None
            }
        }
    }

    pub fn record(&mut self, desc: impl Into<String>, result: Result<()>) {
        if let Err(err) = result {
            self.fail(desc, err);
        }
    }

    fn fail(&mut self, desc: impl Into<String>, error: HarnessError) {
        let desc = desc.into();
        error!(scenario = %self.scenario, "{}: {}", desc, error);
        self.failures.push(CaseFailure { desc, error });
    }

    pub fn finish(self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::Failed {
                scenario: self.scenario,
                failures: self.failures,
            })
        }
    }
}
