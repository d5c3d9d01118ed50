//! Plugin host: compiled-in descriptor table and the loader that starts the
//! enabled entries against a [`PluginApi`].
//!
//! Design Notes:
//! - Discovery is a closed table; each descriptor carries a factory so the
//!   loader never needs runtime type lookup.
//! - `load_all` is idempotent. A second call reports nothing and starts nothing,
//!   so registrations are never duplicated.
//! - A plugin whose `start` fails or panics is recorded in the report; the
//!   remaining plugins still start.

use crate::PluginApi;
use crate::builtin::{DatePlugin, FindPlugin, SmileyPlugin};
use crate::bus::panic_message;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{info, warn};

/// A compiled-in extension.
pub trait Plugin {
    /// Human-readable name, as announced in the host plugin list.
    fn name(&self) -> &'static str;
    /// Register buttons and callbacks. Called once per load.
    fn start(&self, api: &mut dyn PluginApi) -> anyhow::Result<()>;
}

#[derive(Clone, Copy)]
pub struct PluginDescriptor {
    pub id: &'static str,
    pub factory: fn() -> Box<dyn Plugin>,
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

pub static BUILTIN_PLUGINS: &[PluginDescriptor] = &[
    PluginDescriptor {
        id: "find",
        factory: || Box::new(FindPlugin),
    },
    PluginDescriptor {
        id: "date",
        factory: || Box::new(DatePlugin),
    },
    PluginDescriptor {
        id: "smiley",
        factory: || Box::new(SmileyPlugin),
    },
];

pub fn descriptor(id: &str) -> Option<&'static PluginDescriptor> {
    BUILTIN_PLUGINS.iter().find(|d| d.id == id)
}

/// Instantiate and start one plugin, containing errors and panics.
pub fn start_plugin(desc: &PluginDescriptor, api: &mut dyn PluginApi) -> anyhow::Result<()> {
    let plugin = (desc.factory)();
    match catch_unwind(AssertUnwindSafe(|| plugin.start(&mut *api))) {
        Ok(Ok(())) => {
            info!(target: "plugin.host", id = desc.id, name = plugin.name(), "plugin_started");
            Ok(())
        }
        Ok(Err(err)) => {
            warn!(target: "plugin.host", id = desc.id, error = %err, "plugin_start_failed");
            Err(err.context(format!("plugin `{}` failed to start", desc.id)))
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            warn!(target: "plugin.host", id = desc.id, panic = msg.as_str(), "plugin_start_panicked");
            Err(anyhow::anyhow!("plugin `{}` panicked during start: {msg}", desc.id))
        }
    }
}

/// Which plugins a load started and which failed (id, reason).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub started: Vec<&'static str>,
    pub failed: Vec<(String, String)>,
}

impl LoadReport {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.failed.is_empty()
    }
}

/// Collection-oriented host: discovers plugins and starts them against `api`.
pub trait PluginHost {
    /// Stable identifier for logs.
    fn name(&self) -> &'static str;
    /// Start every plugin this host knows about. Repeated calls must not
    /// register anything twice.
    fn load_all(&mut self, api: &mut dyn PluginApi) -> anyhow::Result<LoadReport>;
}

impl<T: PluginHost + ?Sized> PluginHost for &mut T {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn load_all(&mut self, api: &mut dyn PluginApi) -> anyhow::Result<LoadReport> {
        (**self).load_all(api)
    }
}

/// Host over [`BUILTIN_PLUGINS`], filtered by the configured ids.
#[derive(Debug, Default)]
pub struct StaticPluginHost {
    enabled: Option<Vec<String>>,
    loaded: bool,
}

impl StaticPluginHost {
    /// Every built-in plugin, in table order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only the listed ids, in the order given. Unknown ids are reported as failures.
    pub fn with_enabled<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: Some(ids.into_iter().map(Into::into).collect()),
            loaded: false,
        }
    }
}

impl PluginHost for StaticPluginHost {
    fn name(&self) -> &'static str {
        "static-plugin-host"
    }

    fn load_all(&mut self, api: &mut dyn PluginApi) -> anyhow::Result<LoadReport> {
        let mut report = LoadReport::default();
        if self.loaded {
            return Ok(report);
        }
        self.loaded = true;

        let ids: Vec<String> = match &self.enabled {
            Some(ids) => ids.clone(),
            None => BUILTIN_PLUGINS.iter().map(|d| d.id.to_string()).collect(),
        };
        for id in ids {
            let Some(desc) = descriptor(&id) else {
                warn!(target: "plugin.host", id = id.as_str(), "unknown_plugin");
                report.failed.push((id, "unknown plugin id".to_string()));
                continue;
            };
            match start_plugin(desc, api) {
                Ok(()) => report.started.push(desc.id),
                Err(err) => report.failed.push((id, format!("{err:#}"))),
            }
        }
        info!(
            target: "plugin.host",
            host = self.name(),
            started = report.started.len(),
            failed = report.failed.len(),
            "load_all"
        );
        Ok(report)
    }
}
