use crate::schema::Field;
use crate::types::{FieldValue, PredictionRequest};
use crate::vocabulary::Vocabulary;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("model expects column {name:?} which the request schema does not carry")]
    MissingColumn { name: String },

    #[error("column {name:?} is display-only and cannot be fed to the model")]
    UnencodableColumn { name: String },

    #[error("no encoding for {field}={value:?}; vocabulary and encoding map disagree")]
    UnknownEncoding { field: &'static str, value: String },
}

// Order and length always follow the column order it was encoded against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn get_field(&self, field: Field) -> Option<f64> {
        self.names
            .iter()
            .position(|n| Field::from_key(n) == Some(field))
            .map(|i| self.values[i])
    }

    pub fn set(&mut self, index: usize, value: f64) {
        self.values[index] = value;
    }
}

#[cfg(test)]
impl FeatureVector {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.position(name).map(|i| self.values[i])
    }
}

#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    vocabulary: Arc<Vocabulary>,
}

impl FeatureEncoder {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    pub fn encode(&self, req: &PredictionRequest, column_order: &[String]) -> Result<FeatureVector, EncodeError> {
        let mut values = Vec::with_capacity(column_order.len());

        for name in column_order {
            let field = Field::from_key(name).ok_or_else(|| EncodeError::MissingColumn { name: name.clone() })?;

            let value = match req.value(field) {
                FieldValue::Number(n) => n,
                FieldValue::Flag(b) => {
                    if b {
                        1.0
                    } else {
                        0.0
                    }
                }
                FieldValue::Category(category, canonical) => self
                    .vocabulary
                    .domain(category)
                    .encode(canonical)
                    .map(f64::from)
                    .ok_or_else(|| EncodeError::UnknownEncoding {
                        field: category.field_name(),
                        value: canonical.to_string(),
                    })?,
                FieldValue::Text(_) => {
                    return Err(EncodeError::UnencodableColumn { name: name.clone() });
                }
            };
            values.push(value);
        }

        Ok(FeatureVector::new(column_order.to_vec(), values))
    }
}
