use crate::normalize::fold_accents;
use crate::schema::{Field, FieldKind, MIN_AGE};
use crate::types::PredictionRequest;
use crate::vocabulary::{Category, CategoryError, Vocabulary};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

// Used when the payload omits years since graduation.
const DEFAULT_YEARS_SINCE_GRADUATION: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    Missing,
    UnknownField,
    DuplicateField,
    InvalidType,
    OutOfRange,
    InvalidCategory,
    InvalidBoolean,
    CrossField,
    TooLong,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl FieldError {
    pub(crate) fn new(field: impl Into<String>, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
            allowed: None,
            suggestion: None,
        }
    }
}

impl From<CategoryError> for FieldError {
    fn from(err: CategoryError) -> Self {
        let message = err.to_string();
        let CategoryError::InvalidCategory { field, allowed, suggestion, .. } = err;
        Self {
            field: field.to_string(),
            kind: FieldErrorKind::InvalidCategory,
            message,
            allowed: Some(allowed),
            suggestion,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Parsed {
    Number(f64),
    Category(&'static str),
    Flag(bool),
    Text(Option<String>),
}

#[derive(Debug, Clone)]
pub struct RequestValidator {
    vocabulary: Arc<Vocabulary>,
    accept_numeric_codes: bool,
}

impl RequestValidator {
    pub fn new(vocabulary: Arc<Vocabulary>, accept_numeric_codes: bool) -> Self {
        Self { vocabulary, accept_numeric_codes }
    }

    // Every violation is returned, not just the first one.
    pub fn validate(&self, payload: &Map<String, Value>) -> Result<PredictionRequest, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut present: HashMap<Field, &Value> = HashMap::new();

        // Closed schema: map each key onto a field, rejecting strays and repeats
        for (key, value) in payload {
            match Field::from_key(key) {
                None => errors.push(FieldError::new(
                    key.as_str(),
                    FieldErrorKind::UnknownField,
                    format!("unknown field {:?}", key),
                )),
                Some(field) if present.contains_key(&field) => errors.push(FieldError::new(
                    key.as_str(),
                    FieldErrorKind::DuplicateField,
                    format!("{:?} supplies {} more than once", key, field.name()),
                )),
                Some(field) => {
                    present.insert(field, value);
                }
            }
        }

        let mut parsed: HashMap<Field, Parsed> = HashMap::new();
        for field in Field::ALL {
            match present.get(&field).filter(|v| !v.is_null()) {
                None if field.is_required() => errors.push(FieldError::new(
                    field.name(),
                    FieldErrorKind::Missing,
                    format!("{} is required", field.name()),
                )),
                None => {}
                Some(value) => match self.parse_field(field, value) {
                    Ok(p) => {
                        parsed.insert(field, p);
                    }
                    Err(e) => errors.push(e),
                },
            }
        }

        let edad = number(&parsed, Field::Edad);
        let anios = number(&parsed, Field::AniosDesdeTitulo);
        if let (Some(edad), Some(anios)) = (edad, anios) {
            if anios > edad - MIN_AGE {
                errors.push(FieldError::new(
                    Field::AniosDesdeTitulo.name(),
                    FieldErrorKind::CrossField,
                    format!(
                        "anios_desde_titulo ({}) cannot exceed edad - {} ({})",
                        anios,
                        MIN_AGE,
                        edad - MIN_AGE
                    ),
                ));
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let edad = edad.unwrap_or(MIN_AGE);
        Ok(PredictionRequest {
            nombre: match parsed.remove(&Field::Nombre) {
                Some(Parsed::Text(t)) => t,
                _ => None,
            },
            edad,
            pais: category(&parsed, Field::Pais),
            genero: category(&parsed, Field::Genero),
            titulacion: category(&parsed, Field::Titulacion),
            anios_desde_titulo: anios
                .unwrap_or_else(|| DEFAULT_YEARS_SINCE_GRADUATION.min((edad - MIN_AGE).max(0.0))),
            campo_estudio: category(&parsed, Field::CampoEstudio),
            nivel_ingles: category(&parsed, Field::NivelIngles),
            universidad_ranking: category(&parsed, Field::UniversidadRanking),
            region_estudio: category(&parsed, Field::RegionEstudio),
            nota_media: number(&parsed, Field::NotaMedia).unwrap_or_default(),
            practicas: matches!(parsed.get(&Field::Practicas), Some(Parsed::Flag(true))),
            situacion_laboral: category(&parsed, Field::SituacionLaboral),
        })
    }

    fn parse_field(&self, field: Field, value: &Value) -> Result<Parsed, FieldError> {
        match field.kind() {
            FieldKind::Numeric { min, max } => {
                let n = parse_number(field, value)?;
                if n < min || n > max {
                    return Err(FieldError::new(
                        field.name(),
                        FieldErrorKind::OutOfRange,
                        format!("{} must be between {} and {} (got {})", field.name(), min, max, n),
                    ));
                }
                Ok(Parsed::Number(n))
            }
            FieldKind::Categorical(category) => self.parse_category(field, category, value),
            FieldKind::Boolean => parse_flag(field, value).map(Parsed::Flag),
            FieldKind::Text { max_len } => {
                let Some(s) = value.as_str() else {
                    return Err(invalid_type(field, "a string", value));
                };
                let trimmed = s.trim();
                if trimmed.chars().count() > max_len {
                    return Err(FieldError::new(
                        field.name(),
                        FieldErrorKind::TooLong,
                        format!("{} must be at most {} characters", field.name(), max_len),
                    ));
                }
                Ok(Parsed::Text((!trimmed.is_empty()).then(|| trimmed.to_string())))
            }
        }
    }

    fn parse_category(&self, field: Field, category: Category, value: &Value) -> Result<Parsed, FieldError> {
        let domain = self.vocabulary.domain(category);
        match value {
            Value::String(s) => Ok(Parsed::Category(domain.resolve(s)?)),
            Value::Number(n) if self.accept_numeric_codes => n
                .as_u64()
                .and_then(|code| u32::try_from(code).ok())
                .and_then(|code| domain.resolve_code(code))
                .map(Parsed::Category)
                .ok_or_else(|| {
                    let mut e = FieldError::new(
                        field.name(),
                        FieldErrorKind::InvalidCategory,
                        format!("{} is not a known code for {}", n, field.name()),
                    );
                    e.allowed = Some(domain.allowed());
                    e
                }),
            other => Err(invalid_type(field, "a string", other)),
        }
    }
}

fn parse_number(field: Field, value: &Value) -> Result<f64, FieldError> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
        .ok_or_else(|| invalid_type(field, "a number", value))
}

fn parse_flag(field: Field, value: &Value) -> Result<bool, FieldError> {
    match value {
        Value::Bool(b) => Ok(*b),
        // Accents fold ("sí") but punctuation stays, so "-1" or "true!" fail.
        Value::String(s) => match fold_accents(s).as_str() {
            "true" | "yes" | "si" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(invalid_flag(field, value)),
        },
        _ => Err(invalid_flag(field, value)),
    }
}

fn invalid_flag(field: Field, value: &Value) -> FieldError {
    FieldError::new(
        field.name(),
        FieldErrorKind::InvalidBoolean,
        format!(
            "{} must be a boolean or one of true/false/yes/no/si/1/0 (got {})",
            field.name(),
            value
        ),
    )
}

fn invalid_type(field: Field, expected: &str, got: &Value) -> FieldError {
    FieldError::new(
        field.name(),
        FieldErrorKind::InvalidType,
        format!("{} must be {} (got {})", field.name(), expected, got),
    )
}

fn number(parsed: &HashMap<Field, Parsed>, field: Field) -> Option<f64> {
    match parsed.get(&field) {
        Some(Parsed::Number(n)) => Some(*n),
        _ => None,
    }
}

// Only called once validation succeeded, so every required category is there.
fn category(parsed: &HashMap<Field, Parsed>, field: Field) -> &'static str {
    match parsed.get(&field) {
        Some(Parsed::Category(c)) => *c,
        _ => "",
    }
}
