use crate::comparisons::Comparisons;
use crate::schema::Field;
use crate::vocabulary::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Fully canonicalized; built by the validator or for synthetic statistics profiles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    pub nombre: Option<String>,
    pub edad: f64,
    pub pais: &'static str,
    pub genero: &'static str,
    pub titulacion: &'static str,
    pub anios_desde_titulo: f64,
    pub campo_estudio: &'static str,
    pub nivel_ingles: &'static str,
    pub universidad_ranking: &'static str,
    pub region_estudio: &'static str,
    pub nota_media: f64,
    pub practicas: bool,
    pub situacion_laboral: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Number(f64),
    Category(Category, &'static str),
    Flag(bool),
    Text(Option<&'a str>),
}

impl PredictionRequest {
    pub fn value(&self, field: Field) -> FieldValue<'_> {
        match field {
            Field::Nombre => FieldValue::Text(self.nombre.as_deref()),
            Field::Edad => FieldValue::Number(self.edad),
            Field::Pais => FieldValue::Category(Category::Pais, self.pais),
            Field::Genero => FieldValue::Category(Category::Genero, self.genero),
            Field::Titulacion => FieldValue::Category(Category::Titulacion, self.titulacion),
            Field::AniosDesdeTitulo => FieldValue::Number(self.anios_desde_titulo),
            Field::CampoEstudio => FieldValue::Category(Category::CampoEstudio, self.campo_estudio),
            Field::NivelIngles => FieldValue::Category(Category::NivelIngles, self.nivel_ingles),
            Field::UniversidadRanking => {
                FieldValue::Category(Category::UniversidadRanking, self.universidad_ranking)
            }
            Field::RegionEstudio => FieldValue::Category(Category::RegionEstudio, self.region_estudio),
            Field::NotaMedia => FieldValue::Number(self.nota_media),
            Field::Practicas => FieldValue::Flag(self.practicas),
            Field::SituacionLaboral => {
                FieldValue::Category(Category::SituacionLaboral, self.situacion_laboral)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionStatistics {
    pub total_predictions: u64,
    pub salary_range: SalaryRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub form_id: String,
    pub salary: f64,
    pub model_version: String,
    pub using_real_model: bool,
    pub timestamp: DateTime<Utc>,
    pub comparisons: Comparisons,
    pub statistics: PredictionStatistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub server_session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfoResponse {
    pub version: String,
    pub trained_at: String,
    pub metrics: BTreeMap<String, serde_json::Value>,
    pub features: Vec<String>,
    pub predictor_available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsResponse {
    pub average_salary: f64,
    pub by_country: BTreeMap<String, f64>,
    pub by_education: BTreeMap<String, f64>,
    pub by_field: BTreeMap<String, f64>,
    pub by_gender: BTreeMap<String, f64>,
    pub average_age: f64,
    pub average_grade: f64,
}

#[cfg(test)]
pub(crate) fn sample_request() -> PredictionRequest {
    PredictionRequest {
        nombre: None,
        edad: 28.0,
        pais: "españa",
        genero: "mujer",
        titulacion: "master",
        anios_desde_titulo: 3.0,
        campo_estudio: "it",
        nivel_ingles: "avanzado",
        universidad_ranking: "alto",
        region_estudio: "europa",
        nota_media: 8.5,
        practicas: true,
        situacion_laboral: "empleado",
    }
}
