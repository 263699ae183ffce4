// src/engine/codec.rs

//! Conversão de um valor cru (JSON do corpo HTTP) para a representação tipada
//! de armazenamento de um campo customizado. A decisão é feita só pelo `kind`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

use crate::engine::error::FieldValueError;
use crate::models::custom_field::{CustomField, FieldId, FieldKind};

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Boolean(bool),
    User(i64),
    SelectOption(i64),
    Users(Vec<i64>),
    SelectOptions(Vec<i64>),
}

/// Valor interpretado + `has_value`.
///
/// `has_value` é a única fonte de verdade para a checagem de obrigatoriedade;
/// ninguém mais olha o valor cru.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub value: ParsedValue,
    pub has_value: bool,
}

impl Parsed {
    fn empty() -> Self {
        Parsed { value: ParsedValue::Empty, has_value: false }
    }

    fn scalar(value: ParsedValue) -> Self {
        Parsed { value, has_value: true }
    }

    fn list(value: ParsedValue, len: usize) -> Self {
        Parsed { value, has_value: len > 0 }
    }
}

/// Colunas da linha escalar. No máximo uma fica preenchida.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalarColumns {
    pub text: Option<String>,
    pub number: Option<f64>,
    pub date: Option<NaiveDate>,
    pub datetime: Option<DateTime<Utc>>,
    pub boolean: Option<bool>,
    pub user_id: Option<i64>,
    pub option_id: Option<i64>,
}

impl ParsedValue {
    /// Colunas para o upsert. Valores multi não têm representação escalar.
    pub fn into_columns(self) -> ScalarColumns {
        let mut columns = ScalarColumns::default();
        match self {
            ParsedValue::Text(v) => columns.text = Some(v),
            ParsedValue::Number(v) => columns.number = Some(v),
            ParsedValue::Date(v) => columns.date = Some(v),
            ParsedValue::DateTime(v) => columns.datetime = Some(v),
            ParsedValue::Boolean(v) => columns.boolean = Some(v),
            ParsedValue::User(v) => columns.user_id = Some(v),
            ParsedValue::SelectOption(v) => columns.option_id = Some(v),
            ParsedValue::Empty | ParsedValue::Users(_) | ParsedValue::SelectOptions(_) => {}
        }
        columns
    }

    /// Serialização canônica de volta para JSON. `parse(field, &v.to_raw())`
    /// devolve um valor equivalente.
    pub fn to_raw(&self) -> Value {
        match self {
            ParsedValue::Empty => Value::Null,
            ParsedValue::Text(v) => Value::String(v.clone()),
            ParsedValue::Number(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
            ParsedValue::Date(v) => Value::String(v.format("%Y-%m-%d").to_string()),
            ParsedValue::DateTime(v) => Value::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            ParsedValue::Boolean(v) => Value::Bool(*v),
            ParsedValue::User(v) | ParsedValue::SelectOption(v) => Value::from(*v),
            ParsedValue::Users(ids) | ParsedValue::SelectOptions(ids) => {
                Value::Array(ids.iter().map(|id| Value::from(*id)).collect())
            }
        }
    }
}

pub fn parse(field: &CustomField, raw: &Value) -> Result<Parsed, FieldValueError> {
    parse_kind(field.id, field.kind, raw)
}

pub fn parse_kind(field_id: FieldId, kind: FieldKind, raw: &Value) -> Result<Parsed, FieldValueError> {
    let invalid = || FieldValueError::InvalidValue { field_id, kind };

    match kind {
        // Arquivos e cálculos têm caminhos próprios
        FieldKind::File | FieldKind::Calculation => Ok(Parsed::empty()),

        FieldKind::Users => {
            let ids = parse_id_list(raw);
            let len = ids.len();
            Ok(Parsed::list(ParsedValue::Users(ids), len))
        }
        FieldKind::MultiSelect => {
            let ids = parse_id_list(raw);
            let len = ids.len();
            Ok(Parsed::list(ParsedValue::SelectOptions(ids), len))
        }

        _ if is_empty_scalar(raw) => Ok(Parsed::empty()),

        FieldKind::Text => Ok(Parsed::scalar(ParsedValue::Text(stringify(raw)))),
        FieldKind::Number => parse_number(raw).map(|n| Parsed::scalar(ParsedValue::Number(n))).ok_or_else(invalid),
        FieldKind::Date => parse_date(raw).map(|d| Parsed::scalar(ParsedValue::Date(d))).ok_or_else(invalid),
        FieldKind::Datetime => {
            parse_datetime(raw).map(|d| Parsed::scalar(ParsedValue::DateTime(d))).ok_or_else(invalid)
        }
        FieldKind::Boolean => parse_boolean(raw).map(|b| Parsed::scalar(ParsedValue::Boolean(b))).ok_or_else(invalid),
        FieldKind::User => coerce_id(raw).map(|id| Parsed::scalar(ParsedValue::User(id))).ok_or_else(invalid),
        FieldKind::SingleSelect => {
            coerce_id(raw).map(|id| Parsed::scalar(ParsedValue::SelectOption(id))).ok_or_else(invalid)
        }
    }
}

// --- HELPERS ---

fn is_empty_scalar(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn stringify(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_number(raw: &Value) -> Option<f64> {
    let n = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn parse_date(raw: &Value) -> Option<NaiveDate> {
    let s = raw.as_str()?.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn parse_datetime(raw: &Value) -> Option<DateTime<Utc>> {
    let s = raw.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Formato do <input type="datetime-local">, sem fuso: tratado como UTC
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn parse_boolean(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 1.0 => Some(true),
            Some(v) if v == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_id(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            // Fora da faixa de i64 o `as` saturaria para um id que não existe
            let in_range = (-(2f64.powi(63))..2f64.powi(63)).contains(&f);
            (in_range && f.fract() == 0.0).then_some(f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Lista de ids; entradas não numéricas são descartadas em silêncio e
/// repetições são removidas mantendo a ordem.
fn parse_id_list(raw: &Value) -> Vec<i64> {
    let candidates: Vec<&Value> = match raw {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    let mut ids = Vec::with_capacity(candidates.len());
    for id in candidates.into_iter().filter_map(coerce_id) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn parse(kind: FieldKind, raw: Value) -> Result<Parsed, FieldValueError> {
        parse_kind(7, kind, &raw)
    }

    #[test]
    fn empty_values_have_no_value() {
        for kind in [
            FieldKind::Text,
            FieldKind::Number,
            FieldKind::Date,
            FieldKind::Datetime,
            FieldKind::Boolean,
            FieldKind::User,
            FieldKind::SingleSelect,
        ] {
            assert_eq!(parse(kind, json!(null)).unwrap(), Parsed::empty(), "{kind:?}");
            assert_eq!(parse(kind, json!("")).unwrap(), Parsed::empty(), "{kind:?}");
        }
        assert!(!parse(FieldKind::Users, json!([])).unwrap().has_value);
        assert!(!parse(FieldKind::MultiSelect, json!(null)).unwrap().has_value);
    }

    #[test]
    fn text_is_kept_as_is() {
        let parsed = parse(FieldKind::Text, json!("  Olá ")).unwrap();
        assert_eq!(parsed.value, ParsedValue::Text("  Olá ".into()));
        assert!(parsed.has_value);
        assert_eq!(parse(FieldKind::Text, json!(42)).unwrap().value, ParsedValue::Text("42".into()));
    }

    #[test]
    fn number_accepts_json_numbers_and_numeric_strings() {
        assert_eq!(parse(FieldKind::Number, json!(12.5)).unwrap().value, ParsedValue::Number(12.5));
        assert_eq!(parse(FieldKind::Number, json!(" 42 ")).unwrap().value, ParsedValue::Number(42.0));
        assert_eq!(
            parse(FieldKind::Number, json!("abc")),
            Err(FieldValueError::InvalidValue { field_id: 7, kind: FieldKind::Number })
        );
        assert!(parse(FieldKind::Number, json!(true)).is_err());
        assert!(parse(FieldKind::Number, json!("NaN")).is_err());
    }

    #[test]
    fn dates_and_datetimes() {
        let date = parse(FieldKind::Date, json!("2026-03-01")).unwrap();
        assert_eq!(date.value, ParsedValue::Date(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()));
        assert!(parse(FieldKind::Date, json!("01/03/2026")).is_err());

        let expected = Utc.with_ymd_and_hms(2026, 3, 1, 14, 30, 0).unwrap();
        let rfc = parse(FieldKind::Datetime, json!("2026-03-01T11:30:00-03:00")).unwrap();
        assert_eq!(rfc.value, ParsedValue::DateTime(expected));
        let local = parse(FieldKind::Datetime, json!("2026-03-01T14:30")).unwrap();
        assert_eq!(local.value, ParsedValue::DateTime(expected));
        assert!(parse(FieldKind::Datetime, json!("amanhã")).is_err());
    }

    #[test]
    fn booleans() {
        assert_eq!(parse(FieldKind::Boolean, json!(true)).unwrap().value, ParsedValue::Boolean(true));
        assert_eq!(parse(FieldKind::Boolean, json!("false")).unwrap().value, ParsedValue::Boolean(false));
        assert_eq!(parse(FieldKind::Boolean, json!(1)).unwrap().value, ParsedValue::Boolean(true));
        assert_eq!(parse(FieldKind::Boolean, json!("0")).unwrap().value, ParsedValue::Boolean(false));
        assert!(parse(FieldKind::Boolean, json!("yes")).is_err());
        assert!(parse(FieldKind::Boolean, json!(2)).is_err());
        // false é um valor, não vazio
        assert!(parse(FieldKind::Boolean, json!(false)).unwrap().has_value);
    }

    #[test]
    fn single_ids_are_coerced_to_integers() {
        assert_eq!(parse(FieldKind::User, json!("15")).unwrap().value, ParsedValue::User(15));
        assert_eq!(parse(FieldKind::SingleSelect, json!(3)).unwrap().value, ParsedValue::SelectOption(3));
        assert_eq!(parse(FieldKind::SingleSelect, json!(3.0)).unwrap().value, ParsedValue::SelectOption(3));
        assert!(parse(FieldKind::User, json!("fulano")).is_err());
        assert!(parse(FieldKind::SingleSelect, json!(3.5)).is_err());
    }

    #[test]
    fn ids_beyond_i64_are_invalid_values() {
        assert_eq!(
            parse(FieldKind::SingleSelect, json!(1e30)),
            Err(FieldValueError::InvalidValue { field_id: 7, kind: FieldKind::SingleSelect })
        );
        assert_eq!(
            parse(FieldKind::User, json!(-1e30)),
            Err(FieldValueError::InvalidValue { field_id: 7, kind: FieldKind::User })
        );
        assert_eq!(parse(FieldKind::User, json!(u64::MAX)), Err(FieldValueError::InvalidValue { field_id: 7, kind: FieldKind::User }));
        assert_eq!(parse(FieldKind::Users, json!([1e30, 2])).unwrap().value, ParsedValue::Users(vec![2]));
    }

    #[test]
    fn id_lists_drop_garbage_and_duplicates() {
        let parsed = parse(FieldKind::Users, json!([3, "4", "x", null, 3, 5.0])).unwrap();
        assert_eq!(parsed.value, ParsedValue::Users(vec![3, 4, 5]));
        assert!(parsed.has_value);

        let garbage = parse(FieldKind::MultiSelect, json!(["a", "b"])).unwrap();
        assert_eq!(garbage.value, ParsedValue::SelectOptions(vec![]));
        assert!(!garbage.has_value);
    }

    #[test]
    fn file_and_calculation_are_always_empty_here() {
        assert_eq!(parse(FieldKind::File, json!("qualquer")).unwrap(), Parsed::empty());
        assert_eq!(parse(FieldKind::Calculation, json!(99)).unwrap(), Parsed::empty());
    }

    #[test]
    fn parsing_is_stable_over_its_own_serialization() {
        let samples = [
            (FieldKind::Text, json!("abc")),
            (FieldKind::Number, json!("3.25")),
            (FieldKind::Date, json!("2025-12-31")),
            (FieldKind::Datetime, json!("2025-12-31T23:59:59.250Z")),
            (FieldKind::Boolean, json!("1")),
            (FieldKind::User, json!("8")),
            (FieldKind::SingleSelect, json!(2)),
            (FieldKind::Users, json!([1, "2", 2])),
            (FieldKind::MultiSelect, json!([9])),
            (FieldKind::Number, json!(null)),
        ];
        for (kind, raw) in samples {
            let first = parse(kind, raw).unwrap();
            let second = parse(kind, first.value.to_raw()).unwrap();
            assert_eq!(first, second, "{kind:?}");
        }
    }

    #[test]
    fn into_columns_fills_exactly_one_column() {
        let columns = ParsedValue::SelectOption(4).into_columns();
        assert_eq!(columns, ScalarColumns { option_id: Some(4), ..Default::default() });
        assert_eq!(ParsedValue::Empty.into_columns(), ScalarColumns::default());
    }
}
