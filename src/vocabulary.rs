use crate::normalize::normalize;
use serde::Serialize;
use std::collections::HashMap;
use strsim::jaro_winkler;
use thiserror::Error;

// Below this similarity we don't offer a "did you mean".
const SUGGESTION_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pais,
    Genero,
    Titulacion,
    CampoEstudio,
    NivelIngles,
    UniversidadRanking,
    RegionEstudio,
    SituacionLaboral,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Pais,
        Category::Genero,
        Category::Titulacion,
        Category::CampoEstudio,
        Category::NivelIngles,
        Category::UniversidadRanking,
        Category::RegionEstudio,
        Category::SituacionLaboral,
    ];

    pub fn field_name(self) -> &'static str {
        match self {
            Category::Pais => "pais",
            Category::Genero => "genero",
            Category::Titulacion => "titulacion",
            Category::CampoEstudio => "campo_estudio",
            Category::NivelIngles => "nivel_ingles",
            Category::UniversidadRanking => "universidad_ranking",
            Category::RegionEstudio => "region_estudio",
            Category::SituacionLaboral => "situacion_laboral",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn specs(self) -> &'static [ValueSpec] {
        match self {
            Category::Pais => PAISES,
            Category::Genero => GENEROS,
            Category::Titulacion => TITULACIONES,
            Category::CampoEstudio => CAMPOS_ESTUDIO,
            Category::NivelIngles => NIVELES_INGLES,
            Category::UniversidadRanking => RANKINGS,
            Category::RegionEstudio => REGIONES,
            Category::SituacionLaboral => SITUACIONES,
        }
    }
}

// label is the English name statistics breakdowns report.
struct ValueSpec {
    canonical: &'static str,
    code: u32,
    label: &'static str,
    aliases: &'static [&'static str],
}

const PAISES: &[ValueSpec] = &[
    ValueSpec { canonical: "brasil", code: 0, label: "Brazil", aliases: &["brazil", "brasil"] },
    ValueSpec { canonical: "china", code: 1, label: "China", aliases: &[] },
    ValueSpec { canonical: "españa", code: 2, label: "Spain", aliases: &["spain"] },
    ValueSpec { canonical: "pakistán", code: 3, label: "Pakistan", aliases: &["pakistan"] },
    ValueSpec {
        canonical: "usa",
        code: 4,
        label: "USA",
        aliases: &["eeuu", "ee uu", "estados unidos", "united states", "us"],
    },
    ValueSpec { canonical: "india", code: 5, label: "India", aliases: &[] },
    ValueSpec { canonical: "vietnam", code: 6, label: "Vietnam", aliases: &["viet nam"] },
    ValueSpec { canonical: "nigeria", code: 7, label: "Nigeria", aliases: &[] },
];

const GENEROS: &[ValueSpec] = &[
    ValueSpec { canonical: "hombre", code: 0, label: "Male", aliases: &["man", "masculino"] },
    ValueSpec { canonical: "mujer", code: 1, label: "Female", aliases: &["woman", "femenino"] },
    ValueSpec { canonical: "otro", code: 2, label: "Other", aliases: &["otra", "other"] },
];

const TITULACIONES: &[ValueSpec] = &[
    ValueSpec {
        canonical: "fp",
        code: 0,
        label: "FP",
        aliases: &["formacion profesional", "vocational"],
    },
    ValueSpec {
        canonical: "grado",
        code: 1,
        label: "Bachelor",
        aliases: &["bachelors", "licenciatura"],
    },
    ValueSpec {
        canonical: "master",
        code: 2,
        label: "Master",
        aliases: &["mastere", "mastero", "maestria", "mastre", "masters"],
    },
    ValueSpec {
        canonical: "phd",
        code: 3,
        label: "PhD",
        aliases: &["ph d", "doctorado", "doctorate"],
    },
];

const CAMPOS_ESTUDIO: &[ValueSpec] = &[
    ValueSpec { canonical: "artes", code: 0, label: "Arts", aliases: &["arte"] },
    ValueSpec { canonical: "ing", code: 1, label: "Engineering", aliases: &["ingenieria"] },
    ValueSpec {
        canonical: "it",
        code: 2,
        label: "Computer Science",
        aliases: &["informatica", "cs"],
    },
    ValueSpec { canonical: "salud", code: 3, label: "Health", aliases: &[] },
    ValueSpec {
        canonical: "s_sociales",
        code: 4,
        label: "Social Sciences",
        aliases: &["s sociales", "s social", "s social es", "ciencias sociales"],
    },
    ValueSpec { canonical: "empresa", code: 5, label: "Business", aliases: &["negocios"] },
];

// Both the 4-level Spanish scale and CEFR bands land here.
const NIVELES_INGLES: &[ValueSpec] = &[
    ValueSpec { canonical: "basico", code: 0, label: "Basic", aliases: &["a1", "a2"] },
    ValueSpec { canonical: "intermedio", code: 1, label: "Intermediate", aliases: &["b1", "b2"] },
    ValueSpec { canonical: "avanzado", code: 2, label: "Advanced", aliases: &["c1"] },
    ValueSpec {
        canonical: "fluido",
        code: 3,
        label: "Fluent",
        aliases: &["c2", "nativo", "native", "bilingue"],
    },
];

const RANKINGS: &[ValueSpec] = &[
    ValueSpec { canonical: "bajo", code: 0, label: "Unranked", aliases: &["low"] },
    ValueSpec { canonical: "medio", code: 1, label: "Top 500", aliases: &["medium"] },
    ValueSpec { canonical: "alto", code: 2, label: "Top 100", aliases: &["high"] },
];

const REGIONES: &[ValueSpec] = &[
    ValueSpec { canonical: "australia", code: 0, label: "Australia", aliases: &[] },
    ValueSpec { canonical: "europa", code: 1, label: "Europe", aliases: &[] },
    ValueSpec {
        canonical: "usa",
        code: 2,
        label: "USA",
        aliases: &["eeuu", "ee uu", "estados unidos", "united states", "us"],
    },
];

const SITUACIONES: &[ValueSpec] = &[
    ValueSpec { canonical: "estudiando", code: 0, label: "Student", aliases: &["estudiante", "studying"] },
    ValueSpec { canonical: "desempleado", code: 1, label: "Unemployed", aliases: &["parado"] },
    ValueSpec { canonical: "empleado", code: 2, label: "Employed", aliases: &["trabajando"] },
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CategoryError {
    #[error("invalid value {raw:?} for {field}; allowed: {}", allowed.join(", "))]
    InvalidCategory {
        field: &'static str,
        raw: String,
        allowed: Vec<String>,
        suggestion: Option<String>,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VocabularyError {
    #[error("{field}: alias {alias:?} maps to both {first:?} and {second:?}")]
    AmbiguousAlias {
        field: &'static str,
        alias: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("{field}: alias {alias:?} targets {target:?} which has no encoding")]
    UnencodedTarget {
        field: &'static str,
        alias: String,
        target: &'static str,
    },

    #[error("{field}: code {code} is assigned more than once")]
    DuplicateCode { field: &'static str, code: u32 },
}

#[derive(Debug, Clone)]
pub struct CategoricalDomain {
    category: Category,
    canonical: Vec<&'static str>,
    aliases: HashMap<String, &'static str>,
    encoding: HashMap<&'static str, u32>,
    labels: HashMap<&'static str, &'static str>,
}

impl CategoricalDomain {
    fn build(category: Category) -> Result<Self, VocabularyError> {
        let field = category.field_name();
        let specs = category.specs();

        let mut canonical = Vec::with_capacity(specs.len());
        let mut aliases: HashMap<String, &'static str> = HashMap::new();
        let mut encoding = HashMap::new();
        let mut labels = HashMap::new();

        for spec in specs {
            canonical.push(spec.canonical);
            if encoding.values().any(|&c| c == spec.code) {
                return Err(VocabularyError::DuplicateCode { field, code: spec.code });
            }
            encoding.insert(spec.canonical, spec.code);
            labels.insert(spec.canonical, spec.label);

            let spellings = [spec.canonical, spec.label]
                .into_iter()
                .chain(spec.aliases.iter().copied());
            for spelling in spellings {
                let key = normalize(spelling);
                match aliases.get(&key) {
                    Some(&existing) if existing != spec.canonical => {
                        return Err(VocabularyError::AmbiguousAlias {
                            field,
                            alias: key,
                            first: existing,
                            second: spec.canonical,
                        });
                    }
                    _ => {
                        aliases.insert(key, spec.canonical);
                    }
                }
            }
        }

        Ok(Self { category, canonical, aliases, encoding, labels })
    }

    pub fn field_name(&self) -> &'static str {
        self.category.field_name()
    }

    // in code order
    pub fn values(&self) -> &[&'static str] {
        &self.canonical
    }

    pub fn allowed(&self) -> Vec<String> {
        self.canonical.iter().map(|v| v.to_string()).collect()
    }

    pub fn resolve(&self, raw: &str) -> Result<&'static str, CategoryError> {
        let key = normalize(raw);
        if let Some(&canonical) = self.aliases.get(&key) {
            return Ok(canonical);
        }

        Err(CategoryError::InvalidCategory {
            field: self.field_name(),
            raw: raw.to_string(),
            allowed: self.allowed(),
            suggestion: self.suggest(&key),
        })
    }

    // Only reachable with validation.accept_numeric_codes.
    pub fn resolve_code(&self, code: u32) -> Option<&'static str> {
        self.encoding
            .iter()
            .find(|(_, &c)| c == code)
            .map(|(&canonical, _)| canonical)
    }

    pub fn encode(&self, canonical: &str) -> Option<u32> {
        self.encoding.get(canonical).copied()
    }

    pub fn label(&self, canonical: &str) -> Option<&'static str> {
        self.labels.get(canonical).copied()
    }

    fn suggest(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }

        let mut best: Option<(&'static str, f64)> = None;
        for (alias, &canonical) in &self.aliases {
            let score = jaro_winkler(key, alias);
            if score >= SUGGESTION_THRESHOLD && best.map_or(true, |(_, s)| score > s) {
                best = Some((canonical, score));
            }
        }
        best.map(|(canonical, _)| canonical.to_string())
    }

    fn check(&self) -> Result<(), VocabularyError> {
        for (alias, &target) in &self.aliases {
            if !self.encoding.contains_key(target) {
                return Err(VocabularyError::UnencodedTarget {
                    field: self.field_name(),
                    alias: alias.clone(),
                    target,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Vocabulary {
    domains: Vec<CategoricalDomain>,
}

impl Vocabulary {
    pub fn standard() -> Result<Self, VocabularyError> {
        let domains = Category::ALL
            .iter()
            .map(|&c| CategoricalDomain::build(c))
            .collect::<Result<Vec<_>, _>>()?;

        let vocabulary = Self { domains };
        vocabulary.check()?;
        Ok(vocabulary)
    }

    pub fn domain(&self, category: Category) -> &CategoricalDomain {
        &self.domains[category.index()]
    }

    pub fn resolve(&self, category: Category, raw: &str) -> Result<&'static str, CategoryError> {
        self.domain(category).resolve(raw)
    }

    pub fn label(&self, category: Category, canonical: &str) -> Option<&'static str> {
        self.domain(category).label(canonical)
    }

    pub fn check(&self) -> Result<(), VocabularyError> {
        self.domains.iter().try_for_each(CategoricalDomain::check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::standard().unwrap()
    }

    #[test]
    fn test_standard_vocabulary_is_consistent() {
        let v = vocab();
        assert!(v.check().is_ok());
        for c in Category::ALL {
            let domain = v.domain(c);
            assert_eq!(domain.field_name(), c.field_name());
            for value in domain.values() {
                assert!(domain.encode(value).is_some(), "{} has no code", value);
            }
        }
    }

    #[test]
    fn test_country_aliases_resolve_to_same_value() {
        let v = vocab();
        for raw in ["España", "espana", "ESPAÑA ", "Spain", " españa"] {
            assert_eq!(v.resolve(Category::Pais, raw).unwrap(), "españa");
        }
        for raw in ["pakistan", "Pakistán", "PAKISTAN"] {
            assert_eq!(v.resolve(Category::Pais, raw).unwrap(), "pakistán");
        }
        for raw in ["EEUU", "EE.UU.", "Estados Unidos", "usa"] {
            assert_eq!(v.resolve(Category::Pais, raw).unwrap(), "usa");
        }
    }

    #[test]
    fn test_canonical_values_resolve_to_themselves() {
        let v = vocab();
        for c in Category::ALL {
            for value in v.domain(c).values() {
                assert_eq!(v.resolve(c, value).unwrap(), *value);
            }
        }
    }

    #[test]
    fn test_degree_and_field_variants() {
        let v = vocab();
        for raw in ["Master", "Máster", "MASTER", "maestría"] {
            assert_eq!(v.resolve(Category::Titulacion, raw).unwrap(), "master");
        }
        for raw in ["PhD", "Ph.D.", "doctorado"] {
            assert_eq!(v.resolve(Category::Titulacion, raw).unwrap(), "phd");
        }
        for raw in ["S.Sociales", "s_sociales", "S. Sociales", "Social Sciences"] {
            assert_eq!(v.resolve(Category::CampoEstudio, raw).unwrap(), "s_sociales");
        }
        assert_eq!(v.resolve(Category::CampoEstudio, "Ing").unwrap(), "ing");
    }

    #[test]
    fn test_english_scales() {
        let v = vocab();
        assert_eq!(v.resolve(Category::NivelIngles, "Básico").unwrap(), "basico");
        assert_eq!(v.resolve(Category::NivelIngles, "B2").unwrap(), "intermedio");
        assert_eq!(v.resolve(Category::NivelIngles, "C1").unwrap(), "avanzado");
        assert_eq!(v.resolve(Category::NivelIngles, "Fluent").unwrap(), "fluido");
        assert_eq!(v.resolve(Category::UniversidadRanking, "Top 100").unwrap(), "alto");
    }

    #[test]
    fn test_invalid_category_lists_allowed_values() {
        let v = vocab();
        let err = v.resolve(Category::Genero, "robot").unwrap_err();
        let CategoryError::InvalidCategory { field, raw, allowed, .. } = err;
        assert_eq!(field, "genero");
        assert_eq!(raw, "robot");
        assert_eq!(allowed, vec!["hombre", "mujer", "otro"]);
    }

    #[test]
    fn test_numeric_codes_not_accepted_as_strings() {
        let v = vocab();
        assert!(v.resolve(Category::Pais, "2").is_err());
        assert_eq!(v.domain(Category::Pais).resolve_code(2), Some("españa"));
        assert_eq!(v.domain(Category::Pais).resolve_code(99), None);
    }

    #[test]
    fn test_suggestion_for_near_miss() {
        let v = vocab();
        let CategoryError::InvalidCategory { suggestion, .. } =
            v.resolve(Category::Pais, "Nigerya").unwrap_err();
        assert_eq!(suggestion.as_deref(), Some("nigeria"));

        let CategoryError::InvalidCategory { suggestion, .. } =
            v.resolve(Category::Pais, "").unwrap_err();
        assert_eq!(suggestion, None);
    }

    #[test]
    fn test_encoding_matches_training_codes() {
        let v = vocab();
        assert_eq!(v.domain(Category::Pais).encode("españa"), Some(2));
        assert_eq!(v.domain(Category::Titulacion).encode("master"), Some(2));
        assert_eq!(v.domain(Category::UniversidadRanking).encode("alto"), Some(2));
        assert_eq!(v.domain(Category::SituacionLaboral).encode("empleado"), Some(2));
        assert_eq!(v.label(Category::CampoEstudio, "it"), Some("Computer Science"));
    }
}
