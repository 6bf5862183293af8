use crate::error::AppError;
use crate::schema::Field;
use crate::types::{PredictionRequest, StatisticsResponse};
use crate::validation::{FieldError, FieldErrorKind};
use crate::vocabulary::{Category, Vocabulary};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

// Headline figure when no model can be queried.
pub const UNAVAILABLE_AVERAGE_SALARY: f64 = 45000.0;

// Every breakdown varies one dimension of this profile.
pub fn base_profile() -> PredictionRequest {
    PredictionRequest {
        nombre: None,
        edad: 28.0,
        pais: "españa",
        genero: "hombre",
        titulacion: "grado",
        anios_desde_titulo: 3.0,
        campo_estudio: "it",
        nivel_ingles: "intermedio",
        universidad_ranking: "medio",
        region_estudio: "europa",
        nota_media: 7.5,
        practicas: true,
        situacion_laboral: "empleado",
    }
}

// Keyed by English display label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub average_salary: f64,
    pub by_country: BTreeMap<String, f64>,
    pub by_education: BTreeMap<String, f64>,
    pub by_field: BTreeMap<String, f64>,
    pub by_gender: BTreeMap<String, f64>,
    pub average_age: f64,
    pub average_grade: f64,
    pub computed_at: Option<DateTime<Utc>>,
}

impl StatsSnapshot {
    // Failed profiles are logged and left out of their breakdown.
    pub fn compute<F>(profile: &PredictionRequest, vocabulary: &Vocabulary, predict: F) -> Self
    where
        F: Fn(&PredictionRequest) -> Result<f64, AppError>,
    {
        let by_country = breakdown(profile, vocabulary, &predict, Category::Pais, |p, v| p.pais = v);
        let by_education = breakdown(profile, vocabulary, &predict, Category::Titulacion, |p, v| p.titulacion = v);
        let by_field = breakdown(profile, vocabulary, &predict, Category::CampoEstudio, |p, v| p.campo_estudio = v);
        let by_gender = breakdown(profile, vocabulary, &predict, Category::Genero, |p, v| p.genero = v);

        let average_salary = predict(profile).unwrap_or_else(|e| {
            warn!("Statistics base profile failed: {}", e);
            UNAVAILABLE_AVERAGE_SALARY
        });

        Self {
            average_salary,
            by_country,
            by_education,
            by_field,
            by_gender,
            average_age: profile.edad,
            average_grade: profile.nota_media,
            computed_at: Some(Utc::now()),
        }
    }

    pub fn to_response(&self) -> StatisticsResponse {
        StatisticsResponse {
            average_salary: self.average_salary,
            by_country: self.by_country.clone(),
            by_education: self.by_education.clone(),
            by_field: self.by_field.clone(),
            by_gender: self.by_gender.clone(),
            average_age: self.average_age,
            average_grade: self.average_grade,
        }
    }
}

fn breakdown<F>(
    profile: &PredictionRequest,
    vocabulary: &Vocabulary,
    predict: &F,
    category: Category,
    vary: fn(&mut PredictionRequest, &'static str),
) -> BTreeMap<String, f64>
where
    F: Fn(&PredictionRequest) -> Result<f64, AppError>,
{
    let domain = vocabulary.domain(category);
    let mut out = BTreeMap::new();
    for &canonical in domain.values() {
        let mut variant = profile.clone();
        vary(&mut variant, canonical);
        match predict(&variant) {
            Ok(salary) => {
                let label = domain.label(canonical).unwrap_or(canonical);
                out.insert(label.to_string(), salary);
            }
            Err(e) => warn!("Statistics profile {}={} failed: {}", category.field_name(), canonical, e),
        }
    }
    out
}

// Writers replace the snapshot wholesale.
#[derive(Debug, Default)]
pub struct StatisticsCache {
    snapshot: RwLock<Arc<StatsSnapshot>>,
}

impl StatisticsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<StatsSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn replace(&self, snapshot: StatsSnapshot) {
        info!(
            "Statistics updated: {} countries, {} degrees, {} fields, {} genders",
            snapshot.by_country.len(),
            snapshot.by_education.len(),
            snapshot.by_field.len(),
            snapshot.by_gender.len()
        );
        *self.snapshot.write() = Arc::new(snapshot);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsFilters {
    pub pais: Option<&'static str>,
    pub genero: Option<&'static str>,
    pub titulacion: Option<&'static str>,
    pub campo_estudio: Option<&'static str>,
}

impl StatsFilters {
    pub fn from_payload(payload: &Map<String, Value>, vocabulary: &Vocabulary) -> Result<Self, Vec<FieldError>> {
        let mut filters = Self::default();
        let mut errors = Vec::new();

        for (key, value) in payload {
            let category = match Field::from_key(key) {
                Some(Field::Pais) => Category::Pais,
                Some(Field::Genero) => Category::Genero,
                Some(Field::Titulacion) => Category::Titulacion,
                Some(Field::CampoEstudio) => Category::CampoEstudio,
                _ => {
                    errors.push(FieldError::new(
                        key.as_str(),
                        FieldErrorKind::UnknownField,
                        format!("{:?} is not a statistics filter", key),
                    ));
                    continue;
                }
            };

            let raw = match value {
                Value::Null => continue,
                Value::String(s) if s.trim().is_empty() => continue,
                Value::String(s) => s,
                _ => {
                    errors.push(FieldError::new(
                        category.field_name(),
                        FieldErrorKind::InvalidType,
                        format!("{} filter must be a string", category.field_name()),
                    ));
                    continue;
                }
            };

            match vocabulary.resolve(category, raw) {
                Ok(canonical) => {
                    let slot = match category {
                        Category::Pais => &mut filters.pais,
                        Category::Genero => &mut filters.genero,
                        Category::Titulacion => &mut filters.titulacion,
                        _ => &mut filters.campo_estudio,
                    };
                    if slot.is_some() {
                        errors.push(FieldError::new(
                            key.as_str(),
                            FieldErrorKind::DuplicateField,
                            format!("{:?} supplies {} more than once", key, category.field_name()),
                        ));
                    }
                    *slot = Some(canonical);
                }
                Err(e) => errors.push(e.into()),
            }
        }

        if errors.is_empty() {
            Ok(filters)
        } else {
            Err(errors)
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, mut profile: PredictionRequest) -> PredictionRequest {
        if let Some(v) = self.pais {
            profile.pais = v;
        }
        if let Some(v) = self.genero {
            profile.genero = v;
        }
        if let Some(v) = self.titulacion {
            profile.titulacion = v;
        }
        if let Some(v) = self.campo_estudio {
            profile.campo_estudio = v;
        }
        profile
    }
}

#[cfg(test)]
impl StatsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.computed_at.is_none()
    }
}
