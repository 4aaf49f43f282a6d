//! Harness configuration.

/// Default maximum script call depth.
pub const DEFAULT_MAX_CALL_LEVELS: usize = 64;

/// Shape of the turn report on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// `debug_inspect_tables` / `debug_locate_queries`; units that returned
    /// nothing are reported as `{"Ok": null}`.
    #[default]
    Current,
    /// `debug_tables` / `debug_inspections`; units that returned nothing are
    /// omitted and every unit gets a debug table, even an empty one.
    Legacy,
}

/// Configuration for a harness run.
#[derive(Debug, Clone, Copy)]
pub struct HarnessConfig {
    /// Report shape.
    pub wire: WireFormat,
    /// Maximum nesting of script function calls.
    pub max_call_levels: usize,
    /// Mirror captured user output to the diagnostic log.
    pub echo_logs: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            wire: WireFormat::Current,
            max_call_levels: DEFAULT_MAX_CALL_LEVELS,
            echo_logs: false,
        }
    }
}
