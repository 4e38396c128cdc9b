use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::FieldError;

const INVALID_VALUE: &str = "Invalid value";

fn is_email(value: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").ok()
        })
        .as_ref()
        .map_or(false, |pattern| pattern.is_match(value))
}

/// Collects field errors while pulling typed values out of a JSON body.
///
/// In create mode absent fields are errors; in update mode they are skipped.
/// `null` counts as absent.
pub struct BodyFields<'a> {
    fields: Option<&'a Map<String, Value>>,
    required: bool,
    errors: Vec<FieldError>,
}

impl<'a> BodyFields<'a> {
    pub fn for_create(body: &'a Value) -> Self {
        Self::new(body, true)
    }

    pub fn for_update(body: &'a Value) -> Self {
        Self::new(body, false)
    }

    fn new(body: &'a Value, required: bool) -> Self {
        Self {
            fields: body.as_object(),
            required,
            errors: Vec::new(),
        }
    }

    fn value(&self, field: &str) -> Option<&'a Value> {
        self.fields
            .and_then(|fields| fields.get(field))
            .filter(|v| !v.is_null())
    }

    fn reject(&mut self, field: &str) {
        self.errors.push(FieldError::body(field, INVALID_VALUE));
    }

    /// Required unless updating; must be a non-empty string
    pub fn non_empty_string(&mut self, field: &str) -> Option<String> {
        match self.value(field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(_) => {
                self.reject(field);
                None
            }
            None => {
                if self.required {
                    self.reject(field);
                }
                None
            }
        }
    }

    /// Never required; a present value must be a string
    pub fn optional_string(&mut self, field: &str) -> Option<String> {
        match self.value(field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::String(_)) | None => None,
            Some(_) => {
                self.reject(field);
                None
            }
        }
    }

    pub fn email(&mut self, field: &str) -> Option<String> {
        let value = self.non_empty_string(field)?;
        if is_email(&value) {
            Some(value)
        } else {
            self.reject(field);
            None
        }
    }

    /// Number (or numeric string) that is finite and not negative
    pub fn non_negative_f64(&mut self, field: &str) -> Option<f64> {
        let parsed = match self.value(field) {
            None => {
                if self.required {
                    self.reject(field);
                }
                return None;
            }
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };

        match parsed {
            Some(n) if n.is_finite() && n >= 0.0 => Some(n),
            _ => {
                self.reject(field);
                None
            }
        }
    }

    /// Integer (or integer string) that is not negative
    pub fn non_negative_u64(&mut self, field: &str) -> Option<u64> {
        let parsed = match self.value(field) {
            None => {
                if self.required {
                    self.reject(field);
                }
                return None;
            }
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
        };

        if parsed.is_none() {
            self.reject(field);
        }
        parsed
    }

    /// Never required; a present value must deserialize into `T`
    pub fn optional<T: DeserializeOwned>(&mut self, field: &str) -> Option<T> {
        let value = self.value(field)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.reject(field);
                None
            }
        }
    }

    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
