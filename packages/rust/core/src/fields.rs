//! Employee columns the pipeline understands.

use horoscope_shared::Record;

use crate::normalize::normalize;

/// A recognized source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmployeeField {
    Name,
    Position,
    BirthDate,
    Responsibility,
    City,
    BitrixId,
    ZodiacSign,
    ZodiacAnimal,
    Pinyin,
}

impl EmployeeField {
    /// Column header as it appears in the source spreadsheets.
    pub fn column(self) -> &'static str {
        match self {
            Self::Name => "ИО",
            Self::Position => "Должность",
            Self::BirthDate => "День рождения",
            Self::Responsibility => "Чем занимаются",
            Self::City => "Город чист",
            Self::BitrixId => "BitrixId",
            Self::ZodiacSign => "Знак зодиака",
            Self::ZodiacAnimal => "Китайский календарь",
            Self::Pinyin => "Пиньинь",
        }
    }

    /// Normalized value of this column in `record`; missing columns are absent.
    pub fn value(self, record: &Record) -> Option<String> {
        record.get(self.column()).and_then(normalize)
    }
}
