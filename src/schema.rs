use crate::vocabulary::Category;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Categorical(Category),
    Numeric { min: f64, max: f64 },
    Boolean,
    Text { max_len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Nombre,
    Edad,
    Pais,
    Genero,
    Titulacion,
    AniosDesdeTitulo,
    CampoEstudio,
    NivelIngles,
    UniversidadRanking,
    RegionEstudio,
    NotaMedia,
    Practicas,
    SituacionLaboral,
}

pub const MIN_AGE: f64 = 16.0;
pub const MAX_AGE: f64 = 80.0;
pub const MAX_GRADE: f64 = 10.0;
pub const MAX_YEARS_SINCE_GRADUATION: f64 = 40.0;
pub const MAX_NAME_LEN: usize = 100;

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Nombre,
        Field::Edad,
        Field::Pais,
        Field::Genero,
        Field::Titulacion,
        Field::AniosDesdeTitulo,
        Field::CampoEstudio,
        Field::NivelIngles,
        Field::UniversidadRanking,
        Field::RegionEstudio,
        Field::NotaMedia,
        Field::Practicas,
        Field::SituacionLaboral,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Nombre => "nombre",
            Field::Edad => "edad",
            Field::Pais => "pais",
            Field::Genero => "genero",
            Field::Titulacion => "titulacion",
            Field::AniosDesdeTitulo => "anios_desde_titulo",
            Field::CampoEstudio => "campo_estudio",
            Field::NivelIngles => "nivel_ingles",
            Field::UniversidadRanking => "universidad_ranking",
            Field::RegionEstudio => "region_estudio",
            Field::NotaMedia => "nota_media",
            Field::Practicas => "practicas",
            Field::SituacionLaboral => "situacion_laboral",
        }
    }

    // Lowercased; camelCase keys appear here folded (campoestudio).
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Nombre => &["name"],
            Field::Edad => &["age"],
            Field::Pais => &["country_of_origin", "country"],
            Field::Genero => &["gender"],
            Field::Titulacion => &["education_level", "formacion"],
            Field::AniosDesdeTitulo => &[
                "aniosdesdetitulo",
                "anios_desde_obtencion",
                "aniosdesdeobtencion",
                "years_since_graduation",
            ],
            Field::CampoEstudio => &["campoestudio", "field_of_study"],
            Field::NivelIngles => &["nivelingles", "language_proficiency"],
            Field::UniversidadRanking => &["universidadranking", "university_ranking"],
            Field::RegionEstudio => &["regionestudio", "region_of_study"],
            Field::NotaMedia => &["notamedia", "gpa", "gpa_10"],
            Field::Practicas => &["internship_experience", "internship"],
            Field::SituacionLaboral => &["situacionlaboral", "employment_status"],
        }
    }

    // Case-insensitive; payload keys and model column names alike.
    pub fn from_key(key: &str) -> Option<Field> {
        let key = key.trim().to_ascii_lowercase();
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.name() == key || f.aliases().contains(&key.as_str()))
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Nombre => FieldKind::Text { max_len: MAX_NAME_LEN },
            Field::Edad => FieldKind::Numeric { min: MIN_AGE, max: MAX_AGE },
            Field::Pais => FieldKind::Categorical(Category::Pais),
            Field::Genero => FieldKind::Categorical(Category::Genero),
            Field::Titulacion => FieldKind::Categorical(Category::Titulacion),
            Field::AniosDesdeTitulo => FieldKind::Numeric {
                min: 0.0,
                max: MAX_YEARS_SINCE_GRADUATION,
            },
            Field::CampoEstudio => FieldKind::Categorical(Category::CampoEstudio),
            Field::NivelIngles => FieldKind::Categorical(Category::NivelIngles),
            Field::UniversidadRanking => FieldKind::Categorical(Category::UniversidadRanking),
            Field::RegionEstudio => FieldKind::Categorical(Category::RegionEstudio),
            Field::NotaMedia => FieldKind::Numeric { min: 0.0, max: MAX_GRADE },
            Field::Practicas => FieldKind::Boolean,
            Field::SituacionLaboral => FieldKind::Categorical(Category::SituacionLaboral),
        }
    }

    pub fn is_required(self) -> bool {
        !matches!(self, Field::Nombre | Field::AniosDesdeTitulo)
    }

    pub fn is_model_input(self) -> bool {
        !matches!(self, Field::Nombre)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_key_accepts_all_naming_styles() {
        assert_eq!(Field::from_key("edad"), Some(Field::Edad));
        assert_eq!(Field::from_key("Age"), Some(Field::Edad));
        assert_eq!(Field::from_key("campoEstudio"), Some(Field::CampoEstudio));
        assert_eq!(Field::from_key("field_of_study"), Some(Field::CampoEstudio));
        assert_eq!(Field::from_key("Country_of_Origin"), Some(Field::Pais));
        assert_eq!(Field::from_key("GPA_10"), Some(Field::NotaMedia));
        assert_eq!(Field::from_key("aniosDesdeObtencion"), Some(Field::AniosDesdeTitulo));
        assert_eq!(Field::from_key("foo"), None);
    }

    #[test]
    fn test_aliases_are_unique_across_fields() {
        let mut seen = std::collections::HashSet::new();
        for f in Field::ALL {
            assert!(seen.insert(f.name()));
            for a in f.aliases() {
                assert!(seen.insert(a), "alias {} used twice", a);
            }
        }
    }

    #[test]
    fn test_required_fields() {
        let required: Vec<_> = Field::ALL.iter().filter(|f| f.is_required()).collect();
        assert_eq!(required.len(), 11);
        assert!(!Field::Nombre.is_model_input());
    }
}
