//! FFI bindings for the progress engine
//!
//! This module provides C-compatible functions for calling the engine from
//! host applications. All functions take null-terminated C strings and return
//! allocated memory that must be freed by the caller using
//! `progress_free_string`. Reference times are RFC 3339 strings.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::pipeline::{parse_measurements, ProgressEngine};
use crate::types::TrendPeriod;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn parse_now(now: &str) -> Result<DateTime<Utc>, AnalyticsError> {
    DateTime::parse_from_rfc3339(now)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AnalyticsError::ParseError(format!("reference time {now:?}: {e}")))
}

/// Read a required string argument, recording an error when it is missing
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Option<String> {
    let value = cstr_to_string(ptr);
    if value.is_none() {
        set_last_error(&format!("Invalid {name} string pointer"));
    }
    value
}

/// Turn a computation result into an owned C string or NULL plus last error
fn finish(result: Result<String, AnalyticsError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze a JSON array of workouts and return a workout report as JSON.
///
/// # Safety
/// - `json` and `now` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `progress_free_string`.
/// - Returns NULL on error; call `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_analyze_workouts(
    json: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = required_arg(json, "JSON") else {
        return ptr::null_mut();
    };
    let Some(now_str) = required_arg(now, "reference time") else {
        return ptr::null_mut();
    };

    finish(parse_now(&now_str).and_then(|now| ProgressEngine::new().workouts_json(&json_str, now)))
}

/// Analyze a JSON array of measurements and return a measurement report as JSON.
///
/// # Safety
/// - `json` and `now` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `progress_free_string`.
/// - Returns NULL on error; call `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_analyze_measurements(
    json: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = required_arg(json, "JSON") else {
        return ptr::null_mut();
    };
    let Some(now_str) = required_arg(now, "reference time") else {
        return ptr::null_mut();
    };

    finish(
        parse_now(&now_str).and_then(|now| ProgressEngine::new().measurements_json(&json_str, now)),
    )
}

/// Compute the trend of one measurement type.
///
/// Returns the trend as a JSON object, or the JSON literal `null` when there
/// is not enough data in the period.
///
/// # Safety
/// - All arguments must be valid null-terminated C strings.
/// - `period` is one of `week`, `month`, `quarter` or `year`.
/// - Returns a newly allocated string that must be freed with `progress_free_string`.
/// - Returns NULL on error; call `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_measurement_trend(
    json: *const c_char,
    measurement_type: *const c_char,
    period: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = required_arg(json, "JSON") else {
        return ptr::null_mut();
    };
    let Some(type_str) = required_arg(measurement_type, "measurement type") else {
        return ptr::null_mut();
    };
    let Some(period_str) = required_arg(period, "period") else {
        return ptr::null_mut();
    };
    let Some(now_str) = required_arg(now, "reference time") else {
        return ptr::null_mut();
    };

    finish(trend_json(&json_str, &type_str, &period_str, &now_str))
}

fn trend_json(
    json: &str,
    measurement_type: &str,
    period: &str,
    now: &str,
) -> Result<String, AnalyticsError> {
    let measurements = parse_measurements(json)?;
    let period = TrendPeriod::from_str(period)?;
    let now = parse_now(now)?;
    let trend = ProgressEngine::new().trend(&measurements, measurement_type, period, now);
    Ok(serde_json::to_string(&trend)?)
}

/// Navy-method body fat percentage from a JSON array of measurements.
///
/// Returns a JSON object `{"gender": ..., "body_fat_percent": <number|null>}`.
///
/// # Safety
/// - `json` and `gender` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `progress_free_string`.
/// - Returns NULL on error (including an unsupported gender); call
///   `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_body_fat(
    json: *const c_char,
    gender: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = required_arg(json, "JSON") else {
        return ptr::null_mut();
    };
    let Some(gender_str) = required_arg(gender, "gender") else {
        return ptr::null_mut();
    };

    finish(body_fat_json(&json_str, &gender_str))
}

fn body_fat_json(json: &str, gender: &str) -> Result<String, AnalyticsError> {
    let measurements = parse_measurements(json)?;
    let body_fat = ProgressEngine::new().body_fat(&measurements, gender)?;
    Ok(serde_json::json!({
        "gender": gender.trim().to_ascii_lowercase(),
        "body_fat_percent": body_fat,
    })
    .to_string())
}

// ============================================================================
// Configured Engine API
// ============================================================================

/// Opaque handle to a configured ProgressEngine
pub struct ProgressEngineHandle {
    engine: ProgressEngine,
}

/// Create an engine from a JSON configuration.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string, or NULL for defaults.
/// - Returns a pointer to a newly allocated engine; free it with `progress_engine_free`.
/// - Returns NULL on an invalid configuration; call `progress_last_error`.
#[no_mangle]
pub unsafe extern "C" fn progress_engine_new(
    config_json: *const c_char,
) -> *mut ProgressEngineHandle {
    clear_last_error();

    let config = match cstr_to_string(config_json) {
        Some(json) => AnalyticsConfig::from_json(&json),
        None => Ok(AnalyticsConfig::default()),
    };

    match config.and_then(ProgressEngine::with_config) {
        Ok(engine) => Box::into_raw(Box::new(ProgressEngineHandle { engine })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `progress_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn progress_engine_free(engine: *mut ProgressEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Analyze workouts with a configured engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `progress_engine_new`.
/// - `json` and `now` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `progress_free_string`.
/// - Returns NULL on error; call `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_engine_analyze_workouts(
    engine: *const ProgressEngineHandle,
    json: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let handle = &*engine;

    let Some(json_str) = required_arg(json, "JSON") else {
        return ptr::null_mut();
    };
    let Some(now_str) = required_arg(now, "reference time") else {
        return ptr::null_mut();
    };

    finish(parse_now(&now_str).and_then(|now| handle.engine.workouts_json(&json_str, now)))
}

/// Analyze measurements with a configured engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `progress_engine_new`.
/// - `json` and `now` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `progress_free_string`.
/// - Returns NULL on error; call `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_engine_analyze_measurements(
    engine: *const ProgressEngineHandle,
    json: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let handle = &*engine;

    let Some(json_str) = required_arg(json, "JSON") else {
        return ptr::null_mut();
    };
    let Some(now_str) = required_arg(now, "reference time") else {
        return ptr::null_mut();
    };

    finish(parse_now(&now_str).and_then(|now| handle.engine.measurements_json(&json_str, now)))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by engine functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an engine function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn progress_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next engine call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn progress_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn progress_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    const NOW: &str = "2024-05-31T18:00:00Z";

    fn sample_workouts_json() -> CString {
        CString::new(
            r#"[{
                "id": "w1",
                "completed_at": "2024-05-30T18:00:00Z",
                "exercises": [{
                    "exercise_id": "squat",
                    "exercise_name": "Squat",
                    "sets": [
                        {"weight": 100.0, "reps": 5, "completed": true},
                        {"weight": 110.0, "reps": 5, "completed": true}
                    ]
                }]
            }]"#,
        )
        .unwrap()
    }

    fn sample_measurements_json() -> CString {
        CString::new(
            r#"[
                {"type": "height", "value": 180.0, "unit": "cm", "date": "2024-05-01T08:00:00Z"},
                {"type": "waist", "value": 85.0, "unit": "cm", "date": "2024-05-30T08:00:00Z"},
                {"type": "neck", "value": 38.0, "unit": "cm", "date": "2024-05-30T08:00:00Z"},
                {"type": "waist", "value": 87.0, "unit": "cm", "date": "2024-05-10T08:00:00Z"}
            ]"#,
        )
        .unwrap()
    }

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        progress_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_analyze_workouts() {
        let json = sample_workouts_json();
        let now = CString::new(NOW).unwrap();

        unsafe {
            let result = take_string(progress_analyze_workouts(json.as_ptr(), now.as_ptr()));
            let report: serde_json::Value = serde_json::from_str(&result).unwrap();
            assert_eq!(report["progress"][0]["best_weight"], 110.0);
            assert_eq!(report["computed_for"], "2024-05-31T18:00:00Z");
        }
    }

    #[test]
    fn test_ffi_analyze_measurements_and_trend() {
        let json = sample_measurements_json();
        let now = CString::new(NOW).unwrap();
        let waist = CString::new("waist").unwrap();
        let month = CString::new("month").unwrap();
        let week = CString::new("week").unwrap();

        unsafe {
            let result = take_string(progress_analyze_measurements(json.as_ptr(), now.as_ptr()));
            assert!(result.contains("\"stats\""));

            let trend = take_string(progress_measurement_trend(
                json.as_ptr(),
                waist.as_ptr(),
                month.as_ptr(),
                now.as_ptr(),
            ));
            let trend: serde_json::Value = serde_json::from_str(&trend).unwrap();
            assert_eq!(trend["current"], 85.0);
            assert_eq!(trend["previous"], 87.0);

            let none = take_string(progress_measurement_trend(
                json.as_ptr(),
                waist.as_ptr(),
                week.as_ptr(),
                now.as_ptr(),
            ));
            assert_eq!(none, "null");
        }
    }

    #[test]
    fn test_ffi_body_fat() {
        let json = sample_measurements_json();
        let male = CString::new("Male").unwrap();
        let other = CString::new("other").unwrap();

        unsafe {
            let result = take_string(progress_body_fat(json.as_ptr(), male.as_ptr()));
            let value: serde_json::Value = serde_json::from_str(&result).unwrap();
            assert_eq!(value["gender"], "male");
            let body_fat = value["body_fat_percent"].as_f64().unwrap();
            assert!((body_fat - 16.1).abs() < 0.1);

            let result = progress_body_fat(json.as_ptr(), other.as_ptr());
            assert!(result.is_null());
            let error = CStr::from_ptr(progress_last_error()).to_str().unwrap();
            assert!(error.contains("Unsupported gender"));
        }
    }

    #[test]
    fn test_ffi_engine_lifecycle() {
        let config = CString::new(r#"{"weight_unit": "lb"}"#).unwrap();
        let json = sample_workouts_json();
        let now = CString::new(NOW).unwrap();

        unsafe {
            let engine = progress_engine_new(config.as_ptr());
            assert!(!engine.is_null());

            let result = take_string(progress_engine_analyze_workouts(
                engine,
                json.as_ptr(),
                now.as_ptr(),
            ));
            let report: serde_json::Value = serde_json::from_str(&result).unwrap();
            assert_eq!(report["records"][0]["unit"], "lb");

            let measurements = sample_measurements_json();
            let result =
                progress_engine_analyze_measurements(engine, measurements.as_ptr(), now.as_ptr());
            take_string(result);

            progress_engine_free(engine);

            let defaults = progress_engine_new(ptr::null());
            assert!(!defaults.is_null());
            progress_engine_free(defaults);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let invalid_json = CString::new("not json").unwrap();
        let now = CString::new(NOW).unwrap();
        let bad_now = CString::new("yesterday").unwrap();
        let bad_config = CString::new(r#"{"anomaly_threshold": -1.0}"#).unwrap();

        unsafe {
            let result = progress_analyze_workouts(invalid_json.as_ptr(), now.as_ptr());
            assert!(result.is_null());
            let error = progress_last_error();
            assert!(!error.is_null());
            assert!(!CStr::from_ptr(error).to_str().unwrap().is_empty());

            let workouts = sample_workouts_json();
            assert!(progress_analyze_workouts(workouts.as_ptr(), bad_now.as_ptr()).is_null());
            assert!(progress_analyze_workouts(ptr::null(), now.as_ptr()).is_null());

            assert!(progress_engine_new(bad_config.as_ptr()).is_null());
            assert!(
                progress_engine_analyze_workouts(ptr::null(), workouts.as_ptr(), now.as_ptr())
                    .is_null()
            );

            // A successful call clears the previous error
            take_string(progress_analyze_workouts(workouts.as_ptr(), now.as_ptr()));
            assert!(progress_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = progress_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, crate::ENGINE_VERSION);
        }
    }
}
