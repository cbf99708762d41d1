//! Host-widget seam.
//!
//! The compiler's sole externally observable success effect (besides the
//! rendered summary) is writing the workflow document into the host model
//! and asking it to persist. The host also provides the alert-style channel
//! import errors are reported through.

use std::sync::{Arc, Mutex};

use crate::schema::workflow::Workflow;

pub trait HostModel: Send {
    /// Write the `workflow` field of the reactive host model.
    fn set_workflow(&mut self, workflow: Option<&Workflow>);

    /// Persist the model's current state.
    fn save_changes(&mut self);

    /// Surface a message through the host's alert channel.
    fn alert(&mut self, message: &str);
}

/// Host model that keeps the document in memory; the default for tests and
/// headless use.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    pub workflow: Option<Workflow>,
    pub saved: u64,
    pub alerts: Vec<String>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        InMemoryHost::default()
    }
}

impl HostModel for InMemoryHost {
    fn set_workflow(&mut self, workflow: Option<&Workflow>) {
        self.workflow = workflow.cloned();
    }

    fn save_changes(&mut self) {
        self.saved += 1;
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

/// Shared handle to a host model, for callers that keep inspecting the model
/// while the editor owns its half.
impl<H: HostModel> HostModel for Arc<Mutex<H>> {
    fn set_workflow(&mut self, workflow: Option<&Workflow>) {
        if let Ok(mut host) = self.lock() {
            host.set_workflow(workflow);
        }
    }

    fn save_changes(&mut self) {
        if let Ok(mut host) = self.lock() {
            host.save_changes();
        }
    }

    fn alert(&mut self, message: &str) {
        if let Ok(mut host) = self.lock() {
            host.alert(message);
        }
    }
}
