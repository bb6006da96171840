use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub scheduling_api_url: String,
    pub scheduling_api_token: Option<String>,
    pub cart_storage_dir: Option<PathBuf>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            scheduling_api_url: "http://localhost:54321".to_string(),
            scheduling_api_token: Some("test-api-token".to_string()),
            cart_storage_dir: None,
        }
    }
}

impl TestConfig {
    pub fn with_api_url(url: &str) -> Self {
        Self {
            scheduling_api_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            scheduling_api_url: self.scheduling_api_url.clone(),
            scheduling_api_token: self.scheduling_api_token.clone(),
            redis_url: None,
            cart_storage_dir: self.cart_storage_dir.clone(),
            http_timeout_seconds: 5,
            sync_max_retries: 0,
            sync_retry_delay_ms: 0,
            cart_event_capacity: 64,
            port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub fn unique_subject_id() -> String {
    format!("subject-{}", Uuid::new_v4().simple())
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn tomorrow() -> NaiveDate {
    today() + Duration::days(1)
}

/// Canned availability payloads in the shapes the scheduling backend has been seen to return.
pub struct MockAvailabilityResponses;

impl MockAvailabilityResponses {
    pub fn bare_array() -> Value {
        json!([
            {"id": 101, "start_time": "09:00", "end_time": "09:30"},
            {"id": 102, "start_time": "14:00", "end_time": "14:30"},
            {"id": 103, "start_time": "18:15"}
        ])
    }

    pub fn under_key(key: &str, records: Value) -> Value {
        let mut body = serde_json::Map::new();
        body.insert("status".to_string(), json!("ok"));
        body.insert(key.to_string(), records);
        Value::Object(body)
    }

    pub fn doctor_availability() -> Value {
        json!({
            "doctor_id": 42,
            "date": "2025-05-01",
            "available_slots": [
                {"slot_id": "A-1", "startTime": "10:00 AM", "endTime": "10:30 AM"},
                {"slot_id": "A-2", "startTime": "01:00 PM", "endTime": "01:30 PM"}
            ]
        })
    }

    pub fn diagnostic_center_slots() -> Value {
        json!({
            "center": {"id": 9, "name": "Central Lab"},
            "test_slots": [
                {"time": "07:00"},
                {"time": "21:30"}
            ]
        })
    }

    pub fn unrecognized() -> Value {
        json!({
            "message": "no availability",
            "meta": {"page": 1}
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}
