//! Human-readable summary of an employee record, used for logging.

use horoscope_shared::Record;

use crate::fields::EmployeeField;

/// Returned when a record has none of the displayed fields.
pub const EMPTY_CONTEXT: &str = "Данные о сотруднике отсутствуют";

/// Display order and labels.
const LABELS: [(EmployeeField, &str); 8] = [
    (EmployeeField::Name, "Имя"),
    (EmployeeField::Position, "Должность"),
    (EmployeeField::BirthDate, "Дата рождения"),
    (EmployeeField::Responsibility, "Зона ответственности"),
    (EmployeeField::City, "Город"),
    (EmployeeField::BitrixId, "Bitrix ID"),
    (EmployeeField::ZodiacSign, "Знак зодиака"),
    (EmployeeField::ZodiacAnimal, "Китайский календарь"),
];

/// Render one `Label: value` line per present field. Never empty.
pub fn format_context(record: &Record) -> String {
    let lines: Vec<String> = LABELS
        .iter()
        .filter_map(|(field, label)| field.value(record).map(|value| format!("{label}: {value}")))
        .collect();

    if lines.is_empty() {
        EMPTY_CONTEXT.to_string()
    } else {
        lines.join("\n")
    }
}
