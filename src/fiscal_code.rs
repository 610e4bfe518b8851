//! Italian fiscal code (*codice fiscale*) generation.
//!
//! A fiscal code has 16 characters:
//!
//! | Chars | Meaning |
//! |---|---|
//! | 1–3 | surname consonants, then vowels, padded with `X` |
//! | 4–6 | name consonants (1st, 3rd and 4th if there are four or more), then vowels, padded with `X` |
//! | 7–8 | last two digits of the birth year |
//! | 9 | birth month letter |
//! | 10–11 | birth day, plus 40 for women |
//! | 12–15 | cadastral code of the birthplace (`Z…` for foreign countries) |
//! | 16 | check character |

use crate::{config::RegistrySettings, error::FiscalCodeError};
use chrono::{Datelike, NaiveDate};
use core::{
    fmt::{self, Display},
    str::FromStr,
};
use serde::{Deserialize, Serialize};

const MONTH_LETTERS: [char; 12] = ['A', 'B', 'C', 'D', 'E', 'H', 'L', 'M', 'P', 'R', 'S', 'T'];

/// Check-character weights of `0`–`9` and `A`–`Z` in odd (1-based) positions.
const ODD_DIGIT_WEIGHTS: [u32; 10] = [1, 0, 5, 7, 9, 13, 15, 17, 19, 21];
const ODD_LETTER_WEIGHTS: [u32; 26] = [
    1, 0, 5, 7, 9, 13, 15, 17, 19, 21, 2, 4, 18, 20, 11, 3, 6, 8, 12, 14, 16, 10, 22, 25, 24, 23,
];

const ITALY: [&str; 2] = ["italia", "italy"];

/// Sex as recorded on the permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    /// `M`
    #[serde(rename = "M")]
    Male,
    /// `F`
    #[serde(rename = "F")]
    Female,
}

impl FromStr for Sex {
    type Err = FiscalCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "M" | "m" => Ok(Self::Male),
            "F" | "f" => Ok(Self::Female),
            other => Err(FiscalCodeError::InvalidSex {
                value: other.to_owned(),
            }),
        }
    }
}

impl Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Male => "M",
            Self::Female => "F",
        })
    }
}

/// The personal data a fiscal code is derived from.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct Person<'a> {
    pub surname: &'a str,
    pub name: &'a str,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    /// Country of birth. `Italia` or `Italy` (any case) means born in Italy.
    pub birth_country: &'a str,
    /// Cadastral code of the municipality of birth, only meaningful when born in Italy.
    pub birthplace_code: Option<&'a str>,
}

/// A generated fiscal code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiscalCode(String);

impl FiscalCode {
    /// The 16 characters of the code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FiscalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FiscalCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Generates the fiscal code of `person`.
///
/// Anyone not born in Italy gets the configured foreign birthplace code. Someone born in Italy
/// gets their municipality code, or the configured fallback when it's missing.
///
/// ```
/// use ancora::{config::RegistrySettings, fiscal_code::{generate, Person, Sex}};
/// use chrono::NaiveDate;
///
/// let mario = Person {
///     surname: "Rossi",
///     name: "Mario",
///     birth_date: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
///     sex: Sex::Male,
///     birth_country: "Italia",
///     birthplace_code: Some("H501"),
/// };
/// let code = generate(&mario, &RegistrySettings::default()).unwrap();
/// assert_eq!(code.as_str(), "RSSMRA80A01H501U");
/// ```
///
/// # Errors
///
/// - [`FiscalCodeError::NoLetters`] if the surname or name has no letters.
/// - [`FiscalCodeError::InvalidBirthplaceCode`] if the birthplace code is not a letter followed
///   by three digits.
pub fn generate(
    person: &Person,
    settings: &RegistrySettings,
) -> Result<FiscalCode, FiscalCodeError> {
    let surname = surname_part(person.surname)?;
    let name = name_part(person.name)?;
    let birthplace = birthplace_code(person, settings)?;

    let birth_date = person.birth_date;
    let year = birth_date.year().rem_euclid(100);
    let month = MONTH_LETTERS[birth_date.month0() as usize];
    let day = match person.sex {
        Sex::Male => birth_date.day(),
        Sex::Female => birth_date.day() + 40,
    };

    let body = format!("{surname}{name}{year:02}{month}{day:02}{birthplace}");
    let code = format!("{body}{}", check_character(&body));

    tracing::debug!(code = %code, "generated fiscal code");
    Ok(FiscalCode(code))
}

fn birthplace_code(
    person: &Person,
    settings: &RegistrySettings,
) -> Result<String, FiscalCodeError> {
    let country = person.birth_country.trim().to_lowercase();
    let code = if !ITALY.contains(&country.as_str()) {
        settings.foreign_birthplace_code.to_uppercase()
    } else {
        match person.birthplace_code.map(str::trim) {
            Some(code) if !code.is_empty() => code.to_uppercase(),
            _ => settings.fallback_birthplace_code.to_uppercase(),
        }
    };

    let bytes = code.as_bytes();
    let well_formed = bytes.len() == 4
        && bytes[0].is_ascii_uppercase()
        && bytes[1..].iter().all(u8::is_ascii_digit);
    if !well_formed {
        return Err(FiscalCodeError::InvalidBirthplaceCode { code });
    }
    Ok(code)
}

/// Uppercases and folds accented Latin letters to ASCII, dropping everything that isn't a
/// letter (spaces, apostrophes, hyphens).
fn fold_letters(text: &str) -> Vec<char> {
    text.chars()
        .flat_map(char::to_uppercase)
        .filter_map(|c| {
            let folded = match c {
                'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
                'Ç' => 'C',
                'È' | 'É' | 'Ê' | 'Ë' => 'E',
                'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
                'Ñ' => 'N',
                'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
                'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
                'Ý' => 'Y',
                other => other,
            };
            folded.is_ascii_uppercase().then_some(folded)
        })
        .collect()
}

fn is_vowel(c: &char) -> bool {
    matches!(c, 'A' | 'E' | 'I' | 'O' | 'U')
}

fn split_letters(
    text: &str,
    field: &'static str,
) -> Result<(Vec<char>, Vec<char>), FiscalCodeError> {
    let letters = fold_letters(text);
    if letters.is_empty() {
        return Err(FiscalCodeError::NoLetters { field });
    }
    Ok(letters.into_iter().partition(|c| !is_vowel(c)))
}

fn triplet(consonants: &[char], vowels: &[char]) -> String {
    consonants
        .iter()
        .chain(vowels)
        .copied()
        .chain(std::iter::repeat('X'))
        .take(3)
        .collect()
}

fn surname_part(surname: &str) -> Result<String, FiscalCodeError> {
    let (consonants, vowels) = split_letters(surname, "Surname")?;
    Ok(triplet(&consonants, &vowels))
}

fn name_part(name: &str) -> Result<String, FiscalCodeError> {
    let (consonants, vowels) = split_letters(name, "Name")?;
    if consonants.len() >= 4 {
        return Ok([consonants[0], consonants[2], consonants[3]].iter().collect());
    }
    Ok(triplet(&consonants, &vowels))
}

fn check_character(body: &str) -> char {
    let sum: u32 = body
        .bytes()
        .enumerate()
        .map(|(index, byte)| {
            let (digit, letter) = if byte.is_ascii_digit() {
                (Some((byte - b'0') as usize), None)
            } else {
                (None, Some((byte - b'A') as usize))
            };
            // index 0 is position 1, which is odd
            if index % 2 == 0 {
                match (digit, letter) {
                    (Some(d), _) => ODD_DIGIT_WEIGHTS[d],
                    (_, Some(l)) => ODD_LETTER_WEIGHTS[l],
                    _ => 0,
                }
            } else {
                digit.or(letter).unwrap_or(0) as u32
            }
        })
        .sum();
    (b'A' + (sum % 26) as u8) as char
}
