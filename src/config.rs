use crate::internals::ErrorCustomizer;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Process-wide parse settings.
#[derive(Clone, Debug)]
pub struct Config {
    /// Consulted after per-call, per-check and per-schema customizers.
    pub custom_error: Option<ErrorCustomizer>,
    /// Whether finalized issues carry the offending input. A
    /// `ParseContext` may override this per call.
    pub report_input: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            custom_error: None,
            report_input: true,
        }
    }
}

static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));

pub fn configure(f: impl FnOnce(&mut Config)) {
    f(&mut CONFIG.write());
}

pub fn current() -> Config {
    CONFIG.read().clone()
}

pub fn reset() {
    *CONFIG.write() = Config::default();
}
