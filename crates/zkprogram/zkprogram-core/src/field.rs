//! Decimal encoding of field elements for the JSON proof format

use num_bigint::BigUint;

use crate::{Result, Scalar, ZkProgramError};

/// Byte width of a canonical scalar encoding
const SCALAR_BYTES: usize = 32;

/// Render a field element as its decimal representation
pub fn to_decimal(value: &Scalar) -> String {
    BigUint::from_bytes_le(&value.to_bytes()).to_str_radix(10)
}

/// Parse a decimal string into a canonical field element
pub fn from_decimal(text: &str) -> Result<Scalar> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ZkProgramError::InvalidField(format!(
            "`{text}` is not a decimal number"
        )));
    }
    let value = BigUint::parse_bytes(text.as_bytes(), 10)
        .ok_or_else(|| ZkProgramError::InvalidField(format!("`{text}` is not a decimal number")))?;
    let bytes = value.to_bytes_le();
    if bytes.len() > SCALAR_BYTES {
        return Err(ZkProgramError::InvalidField(format!(
            "`{text}` exceeds the field modulus"
        )));
    }
    let mut repr = [0u8; SCALAR_BYTES];
    repr[..bytes.len()].copy_from_slice(&bytes);
    Option::from(Scalar::from_bytes(&repr)).ok_or_else(|| {
        ZkProgramError::InvalidField(format!("`{text}` exceeds the field modulus"))
    })
}

/// Decimal strings for a field vector
pub fn fields_to_strings(fields: &[Scalar]) -> Vec<String> {
    fields.iter().map(to_decimal).collect()
}

/// Parse a vector of decimal strings
pub fn fields_from_strings(strings: &[String]) -> Result<Vec<Scalar>> {
    strings.iter().map(|s| from_decimal(s)).collect()
}
