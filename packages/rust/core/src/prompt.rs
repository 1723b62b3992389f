//! Prompt templates and per-record substitution.
//!
//! A template is plain text with `{placeholder}` markers. It is parsed once,
//! before any record is processed, so an unknown placeholder aborts the run
//! up front instead of failing every record. `{{` and `}}` stand for literal
//! braces.

use std::path::Path;
use std::sync::LazyLock;

use horoscope_shared::{HoroscopeError, Record, Result};
use regex::Regex;

use crate::fields::EmployeeField;

/// Built-in horoscope prompt.
pub const DEFAULT_TEMPLATE: &str = "\
Ты опытный астролог и корпоративный копирайтер. Составь персональный \
гороскоп на неделю для сотрудника компании.

Данные о сотруднике:
- Имя: {name}
- Должность: {position}
- Город: {city}
- Дата рождения: {birthdate}
- Знак зодиака: {zodiac_sign}
- Животное по китайскому календарю: {zodiac_animal}
- Имя на пиньинь: {pinyin}

Требования:
- Обращайся к сотруднику по имени, тон доброжелательный и с юмором.
- Свяжи прогноз с профессией и городом сотрудника.
- Учти знак зодиака и животное китайского календаря.
- Объём 3-4 абзаца, без markdown-разметки.
";

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("valid regex"));

/// A substitutable prompt variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Name,
    Position,
    City,
    Birthdate,
    ZodiacSign,
    ZodiacAnimal,
    Pinyin,
}

impl Placeholder {
    const ALL: [Placeholder; 7] = [
        Self::Name,
        Self::Position,
        Self::City,
        Self::Birthdate,
        Self::ZodiacSign,
        Self::ZodiacAnimal,
        Self::Pinyin,
    ];

    fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Position => "position",
            Self::City => "city",
            Self::Birthdate => "birthdate",
            Self::ZodiacSign => "zodiac_sign",
            Self::ZodiacAnimal => "zodiac_animal",
            Self::Pinyin => "pinyin",
        }
    }

    fn field(self) -> EmployeeField {
        match self {
            Self::Name => EmployeeField::Name,
            Self::Position => EmployeeField::Position,
            Self::City => EmployeeField::City,
            Self::Birthdate => EmployeeField::BirthDate,
            Self::ZodiacSign => EmployeeField::ZodiacSign,
            Self::ZodiacAnimal => EmployeeField::ZodiacAnimal,
            Self::Pinyin => EmployeeField::Pinyin,
        }
    }

    /// Text substituted when the record has no value.
    fn fallback(self) -> &'static str {
        match self {
            Self::Name | Self::Position => "Сотрудник",
            Self::Birthdate => "Не указана",
            Self::City | Self::ZodiacSign | Self::ZodiacAnimal | Self::Pinyin => "Не указан",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Value(Placeholder),
}

/// A validated prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse and validate a template.
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut last = 0;

        for caps in TOKEN_RE.captures_iter(template) {
            let Some(token) = caps.get(0) else { continue };
            push_text(&mut text, &template[last..token.start()])?;
            last = token.end();

            match token.as_str() {
                "{{" => text.push('{'),
                "}}" => text.push('}'),
                _ => {
                    let key = caps.get(1).map_or("", |m| m.as_str()).trim();
                    let placeholder = Placeholder::from_key(key).ok_or_else(|| {
                        HoroscopeError::template(format!("unknown placeholder '{{{key}}}'"))
                    })?;
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Value(placeholder));
                }
            }
        }
        push_text(&mut text, &template[last..])?;
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self { segments })
    }

    /// Read and parse a template file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| HoroscopeError::io(path, e))?;
        Self::parse(&content)
    }

    /// Substitute a record's values, falling back per placeholder.
    pub fn render(&self, record: &Record) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Value(placeholder) => match placeholder.field().value(record) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(placeholder.fallback()),
                },
            }
        }
        out
    }
}

/// Parse `template` and render it for `record` in one step.
pub fn build_prompt(template: &str, record: &Record) -> Result<String> {
    Ok(PromptTemplate::parse(template)?.render(record))
}

/// Append literal text, rejecting braces that are neither doubled nor closed.
fn push_text(buf: &mut String, literal: &str) -> Result<()> {
    if let Some(brace) = literal.chars().find(|c| *c == '{' || *c == '}') {
        return Err(HoroscopeError::template(format!(
            "unmatched '{brace}' in template"
        )));
    }
    buf.push_str(literal);
    Ok(())
}
