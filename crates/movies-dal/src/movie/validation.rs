//! Validation of client supplied movie payloads.
//!
//! Values are read field by field from the JSON object, so that a wrong type
//! is reported against the field that carries it, then the rules declared on
//! [`MoviePatch`] are checked with `garde`.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;

use garde::Validate as _;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use super::{CreateMovie, MoviePatch};

pub const MIN_YEAR: i32 = 1900;

/// Key used for problems with the payload as a whole.
pub const PAYLOAD: &str = "payload";

/// Per field list of violations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ValidationError {
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    fn add_report(&mut self, report: garde::Report) {
        for (path, error) in report.iter() {
            let field = path.to_string();
            let field = if field.is_empty() {
                PAYLOAD.to_string()
            } else {
                field
            };
            self.add(field, error.message());
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn max_year() -> i32 {
    time::OffsetDateTime::now_utc().year() + 1
}

pub(crate) fn valid_year(year: &i32, _ctx: &()) -> garde::Result {
    let max = max_year();
    if (MIN_YEAR..=max).contains(year) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "year must be between {MIN_YEAR} and {max}"
        )))
    }
}

#[allow(clippy::ptr_arg)]
pub(crate) fn not_blank(value: &String, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        Err(garde::Error::new("must not be blank"))
    } else {
        Ok(())
    }
}

#[allow(clippy::ptr_arg)]
pub(crate) fn unique_genres(genres: &Vec<String>, _ctx: &()) -> garde::Result {
    let mut seen = HashSet::with_capacity(genres.len());
    for genre in genres {
        if !seen.insert(genre.to_lowercase()) {
            return Err(garde::Error::new(format!("duplicate genre {genre}")));
        }
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn take_field<T>(map: &mut Map<String, Value>, field: &str, errors: &mut ValidationError) -> Option<T>
where
    T: DeserializeOwned,
{
    let value = map.remove(field)?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            errors.add(field, e.to_string());
            None
        }
    }
}

/// Whole numbers written as floats (`2010.0`) are accepted as integers.
fn take_integer(
    map: &mut Map<String, Value>,
    field: &str,
    errors: &mut ValidationError,
) -> Option<i32> {
    let value = map.remove(field)?;
    let integer = match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        _ => None,
    };
    match integer.map(i32::try_from) {
        Some(Ok(v)) => Some(v),
        Some(Err(_)) => {
            errors.add(field, format!("{value} is out of range"));
            None
        }
        None => {
            errors.add(
                field,
                format!("expected integer, got {}", describe(&value)),
            );
            None
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("number {n}"),
        other => type_name(other).to_string(),
    }
}

/// Reads known fields into a patch, returns fields that were not recognized.
fn read_patch(payload: Value, errors: &mut ValidationError) -> (MoviePatch, Map<String, Value>) {
    let mut map = match payload {
        Value::Object(map) => map,
        other => {
            errors.add(
                PAYLOAD,
                format!("expected JSON object, got {}", type_name(&other)),
            );
            return (MoviePatch::default(), Map::new());
        }
    };

    let patch = MoviePatch {
        title: take_field(&mut map, "title", errors),
        year: take_integer(&mut map, "year", errors),
        director: take_field(&mut map, "director", errors),
        duration: take_integer(&mut map, "duration", errors),
        poster: take_field(&mut map, "poster", errors),
        rate: take_field(&mut map, "rate", errors),
        genre: take_field(&mut map, "genre", errors),
    };
    (patch, map)
}

/// Validates a complete movie, every field is required, extra fields are dropped.
pub fn validate_full(payload: Value) -> Result<CreateMovie, ValidationError> {
    let mut errors = ValidationError::new();
    let (patch, _extra) = read_patch(payload, &mut errors);
    if errors.has_field(PAYLOAD) {
        return Err(errors);
    }

    if let Err(report) = patch.validate() {
        errors.add_report(report);
    }
    for field in patch.missing_fields() {
        if !errors.has_field(field) {
            errors.add(field, "field is required");
        }
    }

    match patch {
        MoviePatch {
            title: Some(title),
            year: Some(year),
            director: Some(director),
            duration: Some(duration),
            poster: Some(poster),
            rate: Some(rate),
            genre: Some(genre),
        } if errors.is_empty() => Ok(CreateMovie {
            title,
            year,
            director,
            duration,
            poster,
            rate,
            genre,
        }),
        _ => Err(errors),
    }
}

/// Validates a partial movie, fields are optional but unknown ones are rejected.
pub fn validate_partial(payload: Value) -> Result<MoviePatch, ValidationError> {
    let mut errors = ValidationError::new();
    let (patch, extra) = read_patch(payload, &mut errors);
    if errors.has_field(PAYLOAD) {
        return Err(errors);
    }

    for field in extra.keys() {
        errors.add(field.as_str(), "unknown field");
    }
    if let Err(report) = patch.validate() {
        errors.add_report(report);
    }

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn inception() -> Value {
        json!({
            "title": "Inception",
            "year": 2010,
            "director": "Nolan",
            "duration": 148,
            "poster": "http://x/p.jpg",
            "rate": 8.8,
            "genre": ["Sci-Fi", "Action"]
        })
    }

    #[test]
    fn test_full_valid() {
        let movie = validate_full(inception()).unwrap();
        assert_eq!(movie.title, "Inception");
        assert_eq!(movie.year, 2010);
        assert_eq!(movie.duration, 148);
        assert_eq!(movie.rate, 8.8);
        assert_eq!(movie.genre, vec!["Sci-Fi", "Action"]);
    }

    #[test]
    fn test_full_ignores_extra_fields() {
        let mut payload = inception();
        payload["id"] = json!("whatever");
        assert!(validate_full(payload).is_ok());
    }

    #[test]
    fn test_full_reports_missing_fields() {
        let err = validate_full(json!({"title": "Inception"})).unwrap_err();
        for field in ["year", "director", "duration", "poster", "rate", "genre"] {
            assert!(err.has_field(field), "missing {field} not reported");
        }
        assert!(!err.has_field("title"));
    }

    #[test]
    fn test_full_reports_wrong_types_per_field() {
        let mut payload = inception();
        payload["year"] = json!("2010");
        payload["genre"] = json!("Action");
        let err = validate_full(payload).unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert!(err.has_field("year"));
        assert!(err.has_field("genre"));
    }

    #[test]
    fn test_full_reports_bounds() {
        let mut payload = inception();
        payload["year"] = json!(1850);
        payload["rate"] = json!(11);
        payload["duration"] = json!(0);
        payload["poster"] = json!("not a url");
        payload["title"] = json!("");
        let err = validate_full(payload).unwrap_err();
        for field in ["year", "rate", "duration", "poster", "title"] {
            assert!(err.has_field(field), "violation of {field} not reported: {err}");
        }
    }

    #[test]
    fn test_whole_floats_are_integers() {
        let mut payload = inception();
        payload["year"] = json!(2010.0);
        payload["duration"] = json!(148.0);
        let movie = validate_full(payload).unwrap();
        assert_eq!(movie.year, 2010);
        assert_eq!(movie.duration, 148);

        let err = validate_partial(json!({"year": 2010.5, "duration": 5_000_000_000i64})).unwrap_err();
        assert_eq!(err.errors["year"], vec!["expected integer, got number 2010.5"]);
        assert!(err.has_field("duration"));
    }

    #[test]
    fn test_blank_strings() {
        let mut payload = inception();
        payload["title"] = json!("   ");
        payload["director"] = json!("\t\n");
        let err = validate_full(payload).unwrap_err();
        assert!(err.has_field("title"));
        assert!(err.has_field("director"));

        let patch = validate_partial(json!({"title": " Heat "})).unwrap();
        assert_eq!(patch.title.as_deref(), Some(" Heat "));
    }

    #[test]
    fn test_genre_rules() {
        let mut payload = inception();
        payload["genre"] = json!([]);
        assert!(validate_full(payload.clone()).unwrap_err().has_field("genre"));

        payload["genre"] = json!(["Drama", "drama"]);
        assert!(validate_full(payload.clone()).unwrap_err().has_field("genre"));

        payload["genre"] = json!(["Drama", ""]);
        let err = validate_full(payload.clone()).unwrap_err();
        assert!(
            err.errors.keys().all(|k| k.starts_with("genre")),
            "{err:?}"
        );

        payload["genre"] = json!(["Drama", 3]);
        assert!(validate_full(payload).unwrap_err().has_field("genre"));
    }

    #[test]
    fn test_next_year_allowed() {
        let mut payload = inception();
        payload["year"] = json!(max_year());
        assert!(validate_full(payload.clone()).is_ok());
        payload["year"] = json!(max_year() + 1);
        assert!(validate_full(payload).unwrap_err().has_field("year"));
    }

    #[test]
    fn test_not_an_object() {
        let err = validate_full(json!(["Inception"])).unwrap_err();
        assert!(err.has_field(PAYLOAD));
        let err = validate_partial(json!("Inception")).unwrap_err();
        assert!(err.has_field(PAYLOAD));
    }

    #[test]
    fn test_partial_empty_is_ok() {
        let patch = validate_partial(json!({})).unwrap();
        assert_eq!(patch, MoviePatch::default());
    }

    #[test]
    fn test_partial_subset() {
        let patch = validate_partial(json!({"rate": 9, "genre": ["Drama"]})).unwrap();
        assert_eq!(patch.rate, Some(9.0));
        assert_eq!(patch.genre, Some(vec!["Drama".to_string()]));
        assert!(patch.title.is_none());
    }

    #[test]
    fn test_partial_rejects_unknown_and_null() {
        let err = validate_partial(json!({"rating": 9, "title": null})).unwrap_err();
        assert!(err.has_field("rating"));
        assert!(err.has_field("title"));
    }

    #[test]
    fn test_partial_checks_present_fields() {
        let err = validate_partial(json!({"duration": -5})).unwrap_err();
        assert_eq!(err.errors.keys().collect::<Vec<_>>(), vec!["duration"]);
    }
}
