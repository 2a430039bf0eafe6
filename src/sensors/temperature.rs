//! NTC thermistor on the relay board (10 kOhm @ 25 C, B = 3950).
//!
//! Wired in a voltage divider with a fixed 10 kOhm resistor and read via
//! ADC1.  The simplified Beta equation converts resistance to temperature.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: owns an ADC1 oneshot unit and reads one channel.
//! On host/test: reads from a static AtomicU16 for injection.

use core::sync::atomic::{AtomicU16, Ordering};

use crate::error::PeripheralError;
use crate::peripherals::TempSensor;

static SIM_TEMP_ADC: AtomicU16 = AtomicU16::new(2048);

/// Simulation: set the raw ADC value the next read returns.
pub fn sim_set_temp_adc(raw: u16) {
    SIM_TEMP_ADC.store(raw, Ordering::Relaxed);
}

const R25: f32 = 10_000.0;
const BETA: f32 = 3950.0;
const T25_K: f32 = 298.15;
const R_DIVIDER: f32 = 10_000.0;
const ADC_MAX: f32 = 4095.0;
const V_REF: f32 = 3.3;

/// Convert a raw 12-bit reading to Celsius.  Rails (open or shorted
/// thermistor) are rejected rather than mapped to a fake temperature.
pub fn adc_to_celsius(raw: u16) -> Result<f32, PeripheralError> {
    let voltage = (f32::from(raw) / ADC_MAX) * V_REF;
    if voltage <= 0.01 || voltage >= (V_REF - 0.01) {
        return Err(PeripheralError::OutOfRange);
    }
    let r_ntc = R_DIVIDER * voltage / (V_REF - voltage);
    let inv_t = (1.0 / T25_K) + (1.0 / BETA) * (r_ntc / R25).ln();
    if inv_t <= 0.0 {
        return Err(PeripheralError::OutOfRange);
    }
    Ok((1.0 / inv_t) - 273.15)
}

pub struct NtcThermistor {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    channel: u32,
    #[cfg(target_os = "espidf")]
    unit: esp_idf_svc::sys::adc_oneshot_unit_handle_t,
}

impl NtcThermistor {
    #[cfg(target_os = "espidf")]
    pub fn new(channel: u32) -> Result<Self, PeripheralError> {
        use esp_idf_svc::sys::*;

        let init_cfg = adc_oneshot_unit_init_cfg_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..Default::default()
        };
        let mut unit: adc_oneshot_unit_handle_t = core::ptr::null_mut();
        // SAFETY: called once from the main task before the control loop.
        if unsafe { adc_oneshot_new_unit(&init_cfg, &mut unit) } != ESP_OK {
            return Err(PeripheralError::AdcReadFailed);
        }
        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        // SAFETY: `unit` was just created above.
        if unsafe { adc_oneshot_config_channel(unit, channel, &chan_cfg) } != ESP_OK {
            return Err(PeripheralError::AdcReadFailed);
        }
        Ok(Self { channel, unit })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(channel: u32) -> Result<Self, PeripheralError> {
        Ok(Self { channel })
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> Result<u16, PeripheralError> {
        let mut raw: i32 = 0;
        // SAFETY: unit handle is valid for the lifetime of `self`; main-loop only.
        let ret = unsafe { esp_idf_svc::sys::adc_oneshot_read(self.unit, self.channel, &mut raw) };
        if ret != esp_idf_svc::sys::ESP_OK {
            return Err(PeripheralError::AdcReadFailed);
        }
        Ok(raw.clamp(0, 4095) as u16)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> Result<u16, PeripheralError> {
        Ok(SIM_TEMP_ADC.load(Ordering::Relaxed))
    }
}

impl TempSensor for NtcThermistor {
    fn temperature_c(&mut self) -> Result<f32, PeripheralError> {
        adc_to_celsius(self.read_adc()?)
    }
}
