//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements          | Connects to               |
//! |--------------|---------------------|---------------------------|
//! | `device_id`  | -                   | eFuse factory MAC         |
//! | `hap_server` | AccessoryServerPort | protocol engine, `hap` NVS|
//! | `log_sink`   | EventSink           | Serial log output         |
//! | `network`    | NetworkPort         | ESP-IDF WiFi STA / AP     |
//! | `nvs`        | ConfigPort          | NVS / in-memory store     |
//! |              | StoragePort         |                           |
//! | `time`       | Clock               | ESP32 system timer        |

pub mod device_id;
pub mod hap_server;
pub mod log_sink;
pub mod network;
pub mod nvs;
pub mod time;
