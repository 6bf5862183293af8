use crate::statistics::StatsSnapshot;
use crate::types::PredictionRequest;
use crate::vocabulary::{Category, Vocabulary};
use serde::Serialize;
use std::collections::BTreeMap;

// 0..=100, or 50 for a degenerate range.
pub fn percentile(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 50.0;
    }
    (((value - min) / (max - min)) * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldAverages {
    pub age: f64,
    pub grade: f64,
}

// Presentation only, never feeds a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTable {
    pub age_range: (f64, f64),
    // (below, above) the country average
    pub country_window: (f64, f64),
    pub field_averages: BTreeMap<&'static str, FieldAverages>,
    pub fallback_field_averages: FieldAverages,
    pub gender_distribution: BTreeMap<&'static str, u32>,
    pub ranking_impact: BTreeMap<&'static str, &'static str>,
    pub region_average_salary: BTreeMap<&'static str, f64>,
    pub fallback_country_salary: f64,
    pub fallback_degree_salary: f64,
    pub fallback_field_salary: f64,
}

impl Default for ReferenceTable {
    fn default() -> Self {
        let field_averages = [
            ("artes", 26.0, 7.2),
            ("ing", 27.0, 7.8),
            ("it", 25.0, 7.5),
            ("salud", 28.0, 8.0),
            ("s_sociales", 27.0, 7.3),
            ("empresa", 26.0, 7.6),
        ]
        .into_iter()
        .map(|(field, age, grade)| (field, FieldAverages { age, grade }))
        .collect();

        Self {
            age_range: (22.0, 35.0),
            country_window: (5000.0, 15000.0),
            field_averages,
            fallback_field_averages: FieldAverages { age: 27.0, grade: 7.5 },
            gender_distribution: [("hombre", 55), ("mujer", 40), ("otro", 5)].into_iter().collect(),
            ranking_impact: [("alto", "+15%"), ("medio", "+5%"), ("bajo", "0%")].into_iter().collect(),
            region_average_salary: [("usa", 60000.0), ("europa", 38000.0), ("australia", 45000.0)]
                .into_iter()
                .collect(),
            fallback_country_salary: 35000.0,
            fallback_degree_salary: 40000.0,
            fallback_field_salary: 40000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeComparison {
    pub user: f64,
    pub average: f64,
    pub field: String,
    pub percentile: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryComparison {
    pub user: String,
    pub average_salary: f64,
    pub percentile: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionComparison {
    pub user: String,
    pub distribution: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryComparison {
    pub user: String,
    pub average_salary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeComparison {
    pub user: f64,
    pub average: f64,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingComparison {
    pub user: String,
    pub impact: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionComparison {
    pub user: String,
    pub average_by_region: BTreeMap<String, f64>,
}

// Keys follow the frontend's naming.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparisons {
    pub edad: AgeComparison,
    pub pais: CountryComparison,
    pub genero: DistributionComparison,
    pub formacion: SalaryComparison,
    #[serde(rename = "campoEstudio")]
    pub campo_estudio: SalaryComparison,
    #[serde(rename = "notaMedia")]
    pub nota_media: GradeComparison,
    #[serde(rename = "universidadRanking")]
    pub universidad_ranking: RankingComparison,
    #[serde(rename = "regionEstudio")]
    pub region_estudio: RegionComparison,
}

fn average_for(
    breakdown: &BTreeMap<String, f64>,
    vocabulary: &Vocabulary,
    category: Category,
    canonical: &str,
    fallback: f64,
) -> f64 {
    vocabulary
        .label(category, canonical)
        .and_then(|label| breakdown.get(label))
        .copied()
        .unwrap_or(fallback)
}

fn owned<V: Clone>(map: &BTreeMap<&'static str, V>) -> BTreeMap<String, V> {
    map.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

pub fn build_comparisons(
    req: &PredictionRequest,
    salary: f64,
    stats: &StatsSnapshot,
    table: &ReferenceTable,
    vocabulary: &Vocabulary,
) -> Comparisons {
    let field_stats = table
        .field_averages
        .get(req.campo_estudio)
        .copied()
        .unwrap_or(table.fallback_field_averages);

    let country_avg = average_for(
        &stats.by_country,
        vocabulary,
        Category::Pais,
        req.pais,
        table.fallback_country_salary,
    );
    let degree_avg = average_for(
        &stats.by_education,
        vocabulary,
        Category::Titulacion,
        req.titulacion,
        table.fallback_degree_salary,
    );
    let field_avg = average_for(
        &stats.by_field,
        vocabulary,
        Category::CampoEstudio,
        req.campo_estudio,
        table.fallback_field_salary,
    );

    let (below, above) = table.country_window;
    let (age_min, age_max) = table.age_range;

    Comparisons {
        edad: AgeComparison {
            user: req.edad,
            average: field_stats.age,
            field: req.campo_estudio.to_string(),
            percentile: percentile(req.edad, age_min, age_max),
        },
        pais: CountryComparison {
            user: req.pais.to_string(),
            average_salary: country_avg,
            percentile: percentile(salary, country_avg - below, country_avg + above),
        },
        genero: DistributionComparison {
            user: req.genero.to_string(),
            distribution: owned(&table.gender_distribution),
        },
        formacion: SalaryComparison {
            user: req.titulacion.to_string(),
            average_salary: degree_avg,
        },
        campo_estudio: SalaryComparison {
            user: req.campo_estudio.to_string(),
            average_salary: field_avg,
        },
        nota_media: GradeComparison {
            user: req.nota_media,
            average: field_stats.grade,
            field: req.campo_estudio.to_string(),
        },
        universidad_ranking: RankingComparison {
            user: req.universidad_ranking.to_string(),
            impact: table
                .ranking_impact
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        },
        region_estudio: RegionComparison {
            user: req.region_estudio.to_string(),
            average_by_region: owned(&table.region_average_salary),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sample_request;

    fn vocab() -> Vocabulary {
        Vocabulary::standard().unwrap()
    }

    #[test]
    fn test_percentile_clamps() {
        assert_eq!(percentile(28.5, 22.0, 35.0), 50.0);
        assert_eq!(percentile(10.0, 22.0, 35.0), 0.0);
        assert_eq!(percentile(50.0, 22.0, 35.0), 100.0);
        assert_eq!(percentile(3.0, 7.0, 7.0), 50.0);
    }

    #[test]
    fn test_uses_fallbacks_when_stats_are_empty() {
        let c = build_comparisons(
            &sample_request(),
            40000.0,
            &StatsSnapshot::default(),
            &ReferenceTable::default(),
            &vocab(),
        );
        assert_eq!(c.pais.average_salary, 35000.0);
        assert_eq!(c.pais.percentile, 50.0);
        assert_eq!(c.formacion.average_salary, 40000.0);
        assert_eq!(c.campo_estudio.average_salary, 40000.0);
    }

    #[test]
    fn test_reads_stats_by_english_label() {
        let mut stats = StatsSnapshot::default();
        stats.by_country.insert("Spain".into(), 32000.0);
        stats.by_education.insert("Master".into(), 45000.0);
        stats.by_field.insert("Computer Science".into(), 60000.0);

        let c = build_comparisons(&sample_request(), 57000.0, &stats, &ReferenceTable::default(), &vocab());
        assert_eq!(c.pais.average_salary, 32000.0);
        assert_eq!(c.pais.percentile, 100.0);
        assert_eq!(c.formacion.average_salary, 45000.0);
        assert_eq!(c.campo_estudio.average_salary, 60000.0);
    }

    #[test]
    fn test_field_averages_follow_field_of_study() {
        let mut req = sample_request();
        req.campo_estudio = "salud";
        let c = build_comparisons(&req, 40000.0, &StatsSnapshot::default(), &ReferenceTable::default(), &vocab());
        assert_eq!(c.edad.average, 28.0);
        assert_eq!(c.nota_media.average, 8.0);
        assert_eq!(c.nota_media.field, "salud");
    }

    #[test]
    fn test_serializes_frontend_keys() {
        let c = build_comparisons(
            &sample_request(),
            40000.0,
            &StatsSnapshot::default(),
            &ReferenceTable::default(),
            &vocab(),
        );
        let json = serde_json::to_value(&c).unwrap();
        for key in [
            "edad",
            "pais",
            "genero",
            "formacion",
            "campoEstudio",
            "notaMedia",
            "universidadRanking",
            "regionEstudio",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["genero"]["distribution"]["hombre"], 55);
        assert_eq!(json["universidadRanking"]["impact"]["alto"], "+15%");
    }
}
