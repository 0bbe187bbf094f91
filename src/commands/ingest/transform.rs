use chrono::{Duration, NaiveDateTime};

use super::*;

const SERIAL_DATE_MAX_DAYS: f64 = 2_958_465.0;
const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TEXT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];
const TEXT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%Y%m%d"];

/// Rows ready for insertion. `columns` lists only the table columns whose
/// source header was present, in mapping order.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct TransformedBatch {
    pub(super) columns: Vec<&'static str>,
    pub(super) rows: Vec<Vec<Value>>,
    pub(super) mapped_source_columns: usize,
}

pub(super) fn transform_table(
    spec: &DatasetSpec,
    table: &RawTable,
    reporting_date: Option<NaiveDate>,
) -> TransformedBatch {
    let present: Vec<(usize, &ColumnSpec)> = spec
        .columns
        .iter()
        .filter_map(|column| table.column_index(column.source).map(|idx| (idx, column)))
        .collect();

    let mut columns: Vec<&'static str> = present.iter().map(|(_, column)| column.column).collect();
    let injected = match spec.partition_key {
        PartitionKey::FileReportingDate(column) => {
            columns.push(column);
            Some(
                reporting_date
                    .map(|date| Value::Text(date.format(DATE_FORMAT).to_string()))
                    .unwrap_or(Value::Null),
            )
        }
        PartitionKey::SourceColumn(_) => None,
    };

    let rows = table
        .rows
        .iter()
        .map(|raw_row| {
            let mut values: Vec<Value> = present
                .iter()
                .map(|(idx, column)| {
                    let cell = raw_row.get(*idx).unwrap_or(&RawCell::Empty);
                    coerce(cell, column.coercion)
                })
                .collect();
            if let Some(value) = &injected {
                values.push(value.clone());
            }
            values
        })
        .collect();

    TransformedBatch {
        columns,
        rows,
        mapped_source_columns: present.len(),
    }
}

pub(super) fn coerce(cell: &RawCell, coercion: Coercion) -> Value {
    let coerced = match coercion {
        Coercion::CurrencyDecimal => currency_value(cell).map(Value::Real),
        Coercion::Number => number_value(cell).map(Value::Real),
        Coercion::NullableInteger => integer_value(cell).map(Value::Integer),
        Coercion::NullableDate => {
            cell_datetime(cell).map(|ts| Value::Text(ts.format(DATE_FORMAT).to_string()))
        }
        Coercion::SerialDate => {
            cell_datetime(cell).map(|ts| Value::Text(ts.format(DATETIME_FORMAT).to_string()))
        }
        Coercion::Text => text_value(cell).map(Value::Text),
        Coercion::PrefixedIdentifier(prefix) => {
            identifier_value(cell).map(|code| Value::Text(format!("{prefix}{code}")))
        }
    };
    coerced.unwrap_or(Value::Null)
}

pub(super) fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .replace("R$", "")
        .replace('.', "")
        .replace(',', ".")
        .chars()
        .filter(|character| !character.is_whitespace())
        .collect();
    parse_finite(&cleaned)
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn currency_value(cell: &RawCell) -> Option<f64> {
    match cell {
        RawCell::Text(text) => parse_currency(text),
        RawCell::Int(value) => Some(*value as f64),
        RawCell::Float(value) => Some(*value).filter(|value| value.is_finite()),
        _ => None,
    }
}

fn number_value(cell: &RawCell) -> Option<f64> {
    match cell {
        RawCell::Text(text) => parse_finite(text.trim()),
        RawCell::Int(value) => Some(*value as f64),
        RawCell::Float(value) => Some(*value).filter(|value| value.is_finite()),
        _ => None,
    }
}

fn integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        Some(value as i64)
    } else {
        None
    }
}

fn integer_value(cell: &RawCell) -> Option<i64> {
    match cell {
        RawCell::Int(value) => Some(*value),
        RawCell::Float(value) => integral(*value),
        RawCell::Text(text) => {
            let trimmed = text.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| parse_finite(trimmed).and_then(integral))
        }
        _ => None,
    }
}

fn format_number(value: f64) -> String {
    match integral(value) {
        Some(whole) => whole.to_string(),
        None => value.to_string(),
    }
}

fn text_value(cell: &RawCell) -> Option<String> {
    match cell {
        RawCell::Empty => None,
        RawCell::Text(text) if text.is_empty() => None,
        RawCell::Text(text) => Some(text.clone()),
        RawCell::Int(value) => Some(value.to_string()),
        RawCell::Float(value) => Some(format_number(*value)),
        RawCell::Bool(value) => Some(value.to_string()),
        RawCell::DateTime(value) => Some(value.format(DATETIME_FORMAT).to_string()),
    }
}

fn identifier_value(cell: &RawCell) -> Option<String> {
    match cell {
        RawCell::Text(text) => Some(text.trim().to_string()).filter(|code| !code.is_empty()),
        RawCell::Int(value) => Some(value.to_string()),
        RawCell::Float(value) => Some(format_number(*value)),
        _ => None,
    }
}

/// Day 0 is 1899-12-31; fractional days carry the time of day.
pub(super) fn serial_to_datetime(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() || !(0.0..=SERIAL_DATE_MAX_DAYS).contains(&days) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 31)?.and_hms_opt(0, 0, 0)?;
    let millis = (days * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

fn parse_text_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    TEXT_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            TEXT_DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn cell_datetime(cell: &RawCell) -> Option<NaiveDateTime> {
    match cell {
        RawCell::Int(value) => serial_to_datetime(*value as f64),
        RawCell::Float(value) => serial_to_datetime(*value),
        RawCell::DateTime(value) => Some(*value),
        RawCell::Text(text) => parse_text_datetime(text),
        RawCell::Bool(_) | RawCell::Empty => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::{ORDENS_RF, POSITIVADOR, SALDO};

    fn text(value: &str) -> RawCell {
        RawCell::Text(value.to_string())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn currency_strips_symbol_and_separators() {
        assert_eq!(parse_currency("R$ 1.234,56"), Some(1234.56));
        assert_eq!(parse_currency("R$ 1.234.567,00"), Some(1_234_567.0));
        assert_eq!(parse_currency("-R$ 10,5"), Some(-10.5));
        assert_eq!(parse_currency("12"), Some(12.0));
        assert_eq!(parse_currency("R$ -"), None);
        assert_eq!(parse_currency(""), None);
        assert_eq!(parse_currency("n/d"), None);
    }

    #[test]
    fn currency_keeps_native_numbers() {
        assert_eq!(
            coerce(&RawCell::Float(1234.56), Coercion::CurrencyDecimal),
            Value::Real(1234.56)
        );
        assert_eq!(
            coerce(&text("R$ 1.234,56"), Coercion::CurrencyDecimal),
            Value::Real(1234.56)
        );
        assert_eq!(coerce(&RawCell::Empty, Coercion::CurrencyDecimal), Value::Null);
    }

    #[test]
    fn nullable_integer_turns_garbage_into_null() {
        assert_eq!(coerce(&text("abc"), Coercion::NullableInteger), Value::Null);
        assert_eq!(coerce(&text(" 42 "), Coercion::NullableInteger), Value::Integer(42));
        assert_eq!(coerce(&RawCell::Float(7.0), Coercion::NullableInteger), Value::Integer(7));
        assert_eq!(coerce(&RawCell::Float(7.5), Coercion::NullableInteger), Value::Null);
        assert_eq!(coerce(&RawCell::Empty, Coercion::NullableInteger), Value::Null);
    }

    #[test]
    fn serial_dates_count_from_last_day_of_1899() {
        assert_eq!(
            coerce(&RawCell::Float(45000.0), Coercion::SerialDate),
            Value::Text("2023-03-16 00:00:00".to_string())
        );
        assert_eq!(
            coerce(&RawCell::Int(45597), Coercion::NullableDate),
            Value::Text("2024-11-02".to_string())
        );
        assert_eq!(
            serial_to_datetime(45000.5),
            date(2023, 3, 16).and_hms_opt(12, 0, 0)
        );
        assert_eq!(serial_to_datetime(-1.0), None);
        assert_eq!(serial_to_datetime(f64::NAN), None);
    }

    #[test]
    fn textual_and_native_dates_are_accepted() {
        assert_eq!(
            coerce(&text("2024-11-02"), Coercion::NullableDate),
            Value::Text("2024-11-02".to_string())
        );
        assert_eq!(
            coerce(&text("02/11/2024"), Coercion::NullableDate),
            Value::Text("2024-11-02".to_string())
        );
        assert_eq!(
            coerce(&text("2024-11-02 10:30:00"), Coercion::SerialDate),
            Value::Text("2024-11-02 10:30:00".to_string())
        );
        let native = date(2024, 11, 2).and_hms_opt(9, 15, 0).expect("valid time");
        assert_eq!(
            coerce(&RawCell::DateTime(native), Coercion::NullableDate),
            Value::Text("2024-11-02".to_string())
        );
        assert_eq!(coerce(&text("soon"), Coercion::NullableDate), Value::Null);
    }

    #[test]
    fn prefixed_identifier_prepends_letter_and_keeps_nulls() {
        let advisor = Coercion::PrefixedIdentifier("A");
        assert_eq!(coerce(&RawCell::Float(42.0), advisor), Value::Text("A42".to_string()));
        assert_eq!(coerce(&RawCell::Int(42), advisor), Value::Text("A42".to_string()));
        assert_eq!(coerce(&text("42"), advisor), Value::Text("A42".to_string()));
        assert_eq!(coerce(&RawCell::Empty, advisor), Value::Null);
        assert_eq!(coerce(&text("  "), advisor), Value::Null);
    }

    #[test]
    fn text_renders_whole_numbers_without_fraction() {
        assert_eq!(coerce(&RawCell::Float(3.0), Coercion::Text), Value::Text("3".to_string()));
        assert_eq!(coerce(&RawCell::Float(3.25), Coercion::Text), Value::Text("3.25".to_string()));
        assert_eq!(coerce(&RawCell::Empty, Coercion::Text), Value::Null);
    }

    #[test]
    fn transform_drops_unmapped_and_omits_missing_columns() {
        let table = RawTable {
            headers: vec![
                "Data".to_string(),
                "Volume".to_string(),
                "Observação".to_string(),
                "Cód. conta".to_string(),
            ],
            rows: vec![vec![
                text("2024-11-04"),
                text("R$ 1.234,56"),
                text("ignored"),
                text("x"),
            ]],
        };

        let batch = transform_table(&ORDENS_RF, &table, date(2024, 11, 2).into());
        assert_eq!(batch.columns, vec!["data_ordem", "codigo_cliente", "volume"]);
        assert_eq!(batch.mapped_source_columns, 3);
        assert_eq!(
            batch.rows,
            vec![vec![
                Value::Text("2024-11-04".to_string()),
                Value::Null,
                Value::Real(1234.56),
            ]]
        );
    }

    #[test]
    fn header_matching_is_exact() {
        let table = RawTable {
            headers: vec!["data posição".to_string(), "Data Posicao".to_string()],
            rows: vec![vec![RawCell::Float(45597.0), RawCell::Float(45597.0)]],
        };

        let batch = transform_table(&POSITIVADOR, &table, None);
        assert!(batch.columns.is_empty());
        assert_eq!(batch.mapped_source_columns, 0);
    }

    #[test]
    fn snapshot_rows_receive_the_file_reporting_date() {
        let table = RawTable {
            headers: vec!["Assessor".to_string(), "Total".to_string()],
            rows: vec![
                vec![RawCell::Float(42.0), RawCell::Float(10.0)],
                vec![RawCell::Empty, text("abc")],
            ],
        };

        let batch = transform_table(&SALDO, &table, Some(date(2024, 11, 2)));
        assert_eq!(batch.columns, vec!["codigo_assessor", "saldo_total", "data_saldo"]);
        assert_eq!(
            batch.rows[0],
            vec![
                Value::Text("A42".to_string()),
                Value::Real(10.0),
                Value::Text("2024-11-02".to_string()),
            ]
        );
        assert_eq!(
            batch.rows[1],
            vec![Value::Null, Value::Null, Value::Text("2024-11-02".to_string())]
        );

        let undated = transform_table(&SALDO, &table, None);
        assert_eq!(undated.rows[0][2], Value::Null);
    }
}
