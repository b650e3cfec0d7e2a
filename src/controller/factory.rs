// src/controller/factory.rs

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::controller::Controller;
use crate::filter::Exclusions;
use crate::mirror::Mirror;
use crate::notifier::Notifier;
use crate::source::{ListOptions, ListWatch};

/// Settings shared by every controller a [`Factory`] builds.
#[derive(Debug, Clone, Default)]
pub struct FactorySettings {
    pub exclusions: Arc<Exclusions>,
    /// Forwarded verbatim to every list and watch call.
    pub label_selector: String,
    /// Restrict every list and watch call to one namespace; empty for all.
    pub namespace: String,
    /// Zero disables periodic resync.
    pub resync_interval: Duration,
    /// Keep `status` in notification payloads.
    pub unabridged: bool,
}

/// Builds one [`Controller`] per resource kind from shared settings.
#[derive(Debug, Clone)]
pub struct Factory {
    settings: FactorySettings,
}

impl Factory {
    pub fn new(settings: FactorySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FactorySettings {
        &self.settings
    }

    /// Build a controller mirroring `kind` from `source` into `notifier`.
    ///
    /// The controller is not started.
    pub fn new_controller(
        &self,
        source: Arc<dyn ListWatch>,
        notifier: Arc<dyn Notifier>,
        kind: &str,
    ) -> Controller {
        let options = ListOptions {
            label_selector: self.settings.label_selector.clone(),
            namespace: self.settings.namespace.clone(),
        };
        let mirror = Mirror::new(kind, source, options, self.settings.resync_interval);

        debug!(
            kind,
            selector = %self.settings.label_selector,
            namespace = %self.settings.namespace,
            resync = ?self.settings.resync_interval,
            "controller created"
        );

        Controller::new(
            kind.to_string(),
            mirror,
            notifier,
            Arc::clone(&self.settings.exclusions),
            self.settings.unabridged,
        )
    }
}
