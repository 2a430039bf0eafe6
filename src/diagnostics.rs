//! Runtime diagnostics.
//!
//! The periodic status line and the on-demand metrics snapshot served to
//! the diagnostics/RPC collaborator.  Both serialise to JSON.

use core::fmt;

use serde::Serialize;

/// Heap usage in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeapStats {
    pub free: u32,
    pub total: u32,
    pub min_free: u32,
}

impl HeapStats {
    #[cfg(target_os = "espidf")]
    pub fn collect() -> Self {
        use esp_idf_svc::sys::*;
        let free = unsafe { esp_get_free_heap_size() };
        let min_free = unsafe { esp_get_minimum_free_heap_size() };
        let total = unsafe { heap_caps_get_total_size(MALLOC_CAP_DEFAULT) } as u32;
        Self {
            free,
            total,
            min_free,
        }
    }

    /// Simulation: synthetic but plausible numbers.
    #[cfg(not(target_os = "espidf"))]
    pub fn collect() -> Self {
        Self {
            free: 180_224,
            total: 327_680,
            min_free: 153_600,
        }
    }
}

/// One periodic status report (every 8 housekeeping ticks).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub uptime_ms: u64,
    pub sessions: usize,
    pub cn: u16,
    pub heap: HeapStats,
    /// `None` when no sensor is configured or the read failed.
    pub temperature_c: Option<i32>,
    pub service_flags: u8,
    /// `"type.id: info; ..."` over all components.
    pub components: String,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Up {:.2}, HAP ns {} CN {}, RAM: {}/{}; st {}; fl 0x{:02x}; {}",
            self.uptime_ms as f64 / 1000.0,
            self.sessions,
            self.cn,
            self.heap.free,
            self.heap.total,
            self.temperature_c.unwrap_or(0),
            self.service_flags,
            self.components
        )
    }
}

/// Metrics snapshot collected on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeMetrics {
    pub uptime_secs: u64,
    pub housekeeping_ticks: u64,
    pub heap: HeapStats,
    pub sessions: usize,
    pub service_flags: u8,
    pub overheated: bool,
    pub components: usize,
    pub accessories: usize,
}

impl RuntimeMetrics {
    /// Serialise for the diagnostics RPC.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
