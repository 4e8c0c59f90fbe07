// ActionParams - Named parameters collected for an action

use crate::action::error::{ActionError, ActionResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Parameter set handed from dialogs (or a macro) to a factory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionParams {
    values: BTreeMap<String, ParamValue>,
}

impl ActionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Numeric parameter; integers are accepted
    pub fn float(&self, name: &str) -> ActionResult<f64> {
        match self.values.get(name) {
            Some(ParamValue::Float(value)) => Ok(*value),
            Some(ParamValue::Int(value)) => Ok(*value as f64),
            Some(other) => Err(ActionError::user(format!(
                "Parameter '{}' must be a number, got {:?}",
                name, other
            ))),
            None => Err(ActionError::user(format!("Missing parameter '{}'", name))),
        }
    }

    pub fn float_or(&self, name: &str, default: f64) -> ActionResult<f64> {
        if self.contains(name) {
            self.float(name)
        } else {
            Ok(default)
        }
    }

    /// Non-negative integer parameter
    pub fn count(&self, name: &str) -> ActionResult<usize> {
        match self.values.get(name) {
            Some(ParamValue::Int(value)) if *value >= 0 => Ok(*value as usize),
            Some(other) => Err(ActionError::user(format!(
                "Parameter '{}' must be a non-negative integer, got {:?}",
                name, other
            ))),
            None => Err(ActionError::user(format!("Missing parameter '{}'", name))),
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(ParamValue::Bool(true)))
    }
}
