// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion between Twilio WhatsApp addresses and national numbers.

const ADDRESS_PREFIX: &str = "whatsapp:";

#[derive(Debug, Clone)]
pub struct NumberFormat {
    country_code: String,
    national_prefix: String,
}

impl NumberFormat {
    pub fn new(country_code: &str, national_prefix: &str) -> Self {
        Self {
            country_code: country_code.trim_start_matches('+').to_string(),
            national_prefix: national_prefix.to_string(),
        }
    }

    /// `whatsapp:+38761222333` becomes `061222333`. Foreign numbers keep
    /// their international digits.
    pub fn to_national(&self, address: &str) -> String {
        let number = address.strip_prefix(ADDRESS_PREFIX).unwrap_or(address);
        let digits = number.trim_start_matches('+');
        match digits.strip_prefix(self.country_code.as_str()) {
            Some(rest) if number.starts_with('+') => format!("{}{rest}", self.national_prefix),
            _ => digits.to_string(),
        }
    }

    /// Inverse of [`NumberFormat::to_national`].
    pub fn to_whatsapp_address(&self, national: &str) -> String {
        match national.strip_prefix(self.national_prefix.as_str()) {
            Some(rest) if !self.national_prefix.is_empty() => {
                format!("{ADDRESS_PREFIX}+{}{rest}", self.country_code)
            }
            _ => format!("{ADDRESS_PREFIX}+{}", national.trim_start_matches('+')),
        }
    }
}
