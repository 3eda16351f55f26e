use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MAX_COMPANY_NUMBER_LEN: usize = 16;

/// Registry number of a company; the unique key of a lead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompanyNumber(String);

impl CompanyNumber {
    /// Parse and normalize a registry number to uppercase, surrounding whitespace removed.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyCompanyNumber);
        }

        let len = trimmed.chars().count();
        if len > MAX_COMPANY_NUMBER_LEN {
            return Err(ValidationError::CompanyNumberTooLong {
                len,
                max: MAX_COMPANY_NUMBER_LEN,
            });
        }

        for (index, ch) in trimmed.chars().enumerate() {
            if !ch.is_ascii_alphanumeric() {
                return Err(ValidationError::CompanyNumberInvalidChar { ch, index });
            }
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CompanyNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CompanyNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for CompanyNumber {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CompanyNumber> for String {
    fn from(value: CompanyNumber) -> Self {
        value.0
    }
}

/// Registry numbers already present in the sink when a run starts.
///
/// Snapshot semantics: leads appended during the run are not added back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownIdentifierSet {
    ids: HashSet<CompanyNumber>,
}

impl KnownIdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set from raw sink cells, skipping blanks and malformed values.
    pub fn from_raw<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values
            .into_iter()
            .filter_map(|value| CompanyNumber::parse(value.as_ref()).ok())
            .collect()
    }

    pub fn contains(&self, id: &CompanyNumber) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<CompanyNumber> for KnownIdentifierSet {
    fn from_iter<T: IntoIterator<Item = CompanyNumber>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
