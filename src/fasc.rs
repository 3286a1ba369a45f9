// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Federal Agency Smart Credential Number (FASC-N) codec.
//!
//! A FASC-N is a 200-bit (25 byte) string of 40 characters. Each character is
//! four data bits, least significant bit first, followed by an odd parity bit.
//! The character stream is:
//!
//! ```text
//! SS AGENCY(4) FS SYSTEM(4) FS CREDENTIAL(6) FS CS FS ICI FS PI(10) OC OI(4) POA ES LRC
//! ```
//!
//! where `SS`, `FS` and `ES` are the start sentinel, field separator and end
//! sentinel, and `LRC` is the XOR of the data bits of every preceding
//! character. PIV certificates carry the FASC-N as an otherName in the
//! subject alternative name; it is a legacy physical access identifier.
//!
//! # References
//!
//! - [Technical Implementation Guidance: Smart Card Enabled Physical Access Control Systems](https://www.idmanagement.gov/docs/pacs-tig-scepacs.pdf) Section 6
//! - [NIST SP 800-73-4](https://csrc.nist.gov/publications/detail/sp/800-73/4/final) Part 1

use crate::error::{PivError, Result};

/// Encoded length of a FASC-N in bytes.
pub const FASC_N_LEN: usize = 25;

const CHARACTERS: usize = 40;
const START_SENTINEL: u8 = 0b1011;
const FIELD_SEPARATOR: u8 = 0b1101;
const END_SENTINEL: u8 = 0b1111;

/// Character positions of framing symbols within the 40-character stream.
const FRAMING: [(usize, u8); 7] = [
    (0, START_SENTINEL),
    (5, FIELD_SEPARATOR),
    (10, FIELD_SEPARATOR),
    (17, FIELD_SEPARATOR),
    (19, FIELD_SEPARATOR),
    (21, FIELD_SEPARATOR),
    (38, END_SENTINEL),
];

/// A decoded FASC-N.
///
/// Fields are kept as decimal digit strings so that leading zeros survive a
/// decode/encode pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fasc {
    /// Agency code (4 digits).
    pub agency_code: String,
    /// System code (4 digits).
    pub system_code: String,
    /// Credential number (6 digits).
    pub credential: String,
    /// Credential series (1 digit).
    pub credential_series: String,
    /// Individual credential issue (1 digit).
    pub individual_credential_issue: String,
    /// Person identifier (10 digits).
    pub person_identifier: String,
    /// Organizational category (1 digit).
    pub organizational_category: String,
    /// Organizational identifier (4 digits).
    pub organizational_identifier: String,
    /// Person/organization association category (1 digit).
    pub person_association: String,
}

impl Fasc {
    /// Decode a 25-byte FASC-N.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != FASC_N_LEN {
            return Err(PivError::fasc(format!(
                "expected {} bytes, got {}",
                FASC_N_LEN,
                bytes.len()
            )));
        }

        let mut chars = [0u8; CHARACTERS];
        for (i, slot) in chars.iter_mut().enumerate() {
            *slot = read_character(bytes, i)?;
        }

        for (position, expected) in FRAMING {
            if chars[position] != expected {
                return Err(PivError::fasc(format!(
                    "expected framing symbol {:#06b} at character {}, found {:#06b}",
                    expected, position, chars[position]
                )));
            }
        }

        let lrc = chars[..CHARACTERS - 1].iter().fold(0u8, |acc, c| acc ^ c);
        if lrc != chars[CHARACTERS - 1] {
            return Err(PivError::fasc("longitudinal redundancy check mismatch"));
        }

        let digits = |range: std::ops::Range<usize>| -> Result<String> {
            chars[range.clone()]
                .iter()
                .enumerate()
                .map(|(offset, &c)| {
                    if c <= 9 {
                        Ok(char::from(b'0' + c))
                    } else {
                        Err(PivError::fasc(format!(
                            "non-digit symbol at character {}",
                            range.start + offset
                        )))
                    }
                })
                .collect()
        };

        Ok(Self {
            agency_code: digits(1..5)?,
            system_code: digits(6..10)?,
            credential: digits(11..17)?,
            credential_series: digits(18..19)?,
            individual_credential_issue: digits(20..21)?,
            person_identifier: digits(22..32)?,
            organizational_category: digits(32..33)?,
            organizational_identifier: digits(33..37)?,
            person_association: digits(37..38)?,
        })
    }

    /// Encode to the canonical 25-byte form.
    ///
    /// Fails if any field is not a decimal string of the expected width.
    pub fn encode(&self) -> Result<[u8; FASC_N_LEN]> {
        let mut chars = Vec::with_capacity(CHARACTERS);
        chars.push(START_SENTINEL);
        push_digits(&mut chars, "agency code", &self.agency_code, 4)?;
        chars.push(FIELD_SEPARATOR);
        push_digits(&mut chars, "system code", &self.system_code, 4)?;
        chars.push(FIELD_SEPARATOR);
        push_digits(&mut chars, "credential", &self.credential, 6)?;
        chars.push(FIELD_SEPARATOR);
        push_digits(&mut chars, "credential series", &self.credential_series, 1)?;
        chars.push(FIELD_SEPARATOR);
        push_digits(
            &mut chars,
            "individual credential issue",
            &self.individual_credential_issue,
            1,
        )?;
        chars.push(FIELD_SEPARATOR);
        push_digits(&mut chars, "person identifier", &self.person_identifier, 10)?;
        push_digits(
            &mut chars,
            "organizational category",
            &self.organizational_category,
            1,
        )?;
        push_digits(
            &mut chars,
            "organizational identifier",
            &self.organizational_identifier,
            4,
        )?;
        push_digits(&mut chars, "person association", &self.person_association, 1)?;
        chars.push(END_SENTINEL);
        let lrc = chars.iter().fold(0u8, |acc, c| acc ^ c);
        chars.push(lrc);

        let mut out = [0u8; FASC_N_LEN];
        for (i, &c) in chars.iter().enumerate() {
            write_character(&mut out, i, c);
        }
        Ok(out)
    }

    /// Organizational identifier, person identifier and association joined.
    ///
    /// This identifies the cardholder independently of the card issue and is
    /// handy for naming per-person output files.
    pub fn person_key(&self) -> String {
        format!(
            "{}{}{}",
            self.organizational_identifier, self.person_identifier, self.person_association
        )
    }

    /// Description of the organizational category.
    pub fn organizational_category_name(&self) -> &'static str {
        match self.organizational_category.as_str() {
            "1" => "Federal Government Agency",
            "2" => "State Government Agency",
            "3" => "Commercial Enterprise",
            "4" => "Foreign Government",
            _ => "Unknown",
        }
    }

    /// Description of the person/organization association category.
    pub fn person_association_name(&self) -> &'static str {
        match self.person_association.as_str() {
            "1" => "Employee",
            "2" => "Civil",
            "3" => "Executive Staff",
            "4" => "Uniformed Service",
            "5" => "Contractor",
            "6" => "Organizational Affiliate",
            "7" => "Organizational Beneficiary",
            _ => "Unknown",
        }
    }
}

impl std::fmt::Display for Fasc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "agency={} system={} credential={} series={} issue={} person={} category={} org={} association={}",
            self.agency_code,
            self.system_code,
            self.credential,
            self.credential_series,
            self.individual_credential_issue,
            self.person_identifier,
            self.organizational_category,
            self.organizational_identifier,
            self.person_association
        )
    }
}

fn bit(bytes: &[u8], n: usize) -> u8 {
    (bytes[n / 8] >> (7 - n % 8)) & 1
}

fn read_character(bytes: &[u8], index: usize) -> Result<u8> {
    let base = index * 5;
    let bits: [u8; 5] = std::array::from_fn(|i| bit(bytes, base + i));
    if bits.iter().sum::<u8>() % 2 != 1 {
        return Err(PivError::fasc(format!("parity error at character {}", index)));
    }
    Ok(bits[0] | bits[1] << 1 | bits[2] << 2 | bits[3] << 3)
}

fn write_character(out: &mut [u8], index: usize, value: u8) {
    let data = [value & 1, (value >> 1) & 1, (value >> 2) & 1, (value >> 3) & 1];
    let parity = 1 - data.iter().sum::<u8>() % 2;
    let base = index * 5;
    for (i, b) in data.iter().chain(std::iter::once(&parity)).enumerate() {
        let n = base + i;
        out[n / 8] |= b << (7 - n % 8);
    }
}

fn push_digits(chars: &mut Vec<u8>, field: &str, value: &str, width: usize) -> Result<()> {
    if value.len() != width || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PivError::fasc(format!(
            "{} must be {} decimal digits, got {:?}",
            field, width, value
        )));
    }
    chars.extend(value.bytes().map(|b| b - b'0'));
    Ok(())
}
