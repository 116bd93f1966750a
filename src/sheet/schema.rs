//! Column layout of the registration sheet

use crate::error::{MailerError, Result};

/// Fixed column positions (zero-based) agreed with the sheet owners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetSchema {
    /// Recipient address column
    pub email: usize,

    /// Language / variant column, absent in single-variant sheets
    pub variant: Option<usize>,

    /// Status marker column; receives "Done" after a send
    pub status: usize,
}

impl SheetSchema {
    /// Registration form layout: email in B, language in D, status in K
    pub const fn registration() -> Self {
        Self {
            email: 1,
            variant: Some(3),
            status: 10,
        }
    }

    /// Compact layout: email in B, status in L, no language column
    pub const fn compact() -> Self {
        Self {
            email: 1,
            variant: None,
            status: 11,
        }
    }

    /// Minimum number of cells a row needs before it is considered
    pub fn min_row_len(&self) -> usize {
        let widest = [Some(self.email), self.variant, Some(self.status)]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(0);
        widest + 1
    }

    /// 1-based column number of the status cell, as used by cell writes
    pub fn status_column_number(&self) -> usize {
        self.status + 1
    }
}

impl Default for SheetSchema {
    fn default() -> Self {
        Self::registration()
    }
}

/// Parse an A1-style column label ("A", "K", "AB") into a zero-based index
pub fn parse_column(label: &str) -> Result<usize> {
    let label = label.trim();
    if label.is_empty() {
        return Err(MailerError::Config("Empty column label".to_string()));
    }

    let mut acc: usize = 0;
    for c in label.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(MailerError::Config(format!("Invalid column label: {}", label)));
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        acc = acc
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| MailerError::Config(format!("Column label too long: {}", label)))?;
    }

    Ok(acc - 1)
}

/// Format a zero-based column index as an A1-style label
pub fn column_label(index: usize) -> String {
    let mut n = index + 1;
    let mut label = Vec::new();
    while n > 0 {
        n -= 1;
        label.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// A1 reference for a 1-based (row, column) pair
pub fn cell_ref(row: usize, col: usize) -> String {
    format!("{}{}", column_label(col.saturating_sub(1)), row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_min_len() {
        assert_eq!(SheetSchema::registration().min_row_len(), 11);
        assert_eq!(SheetSchema::compact().min_row_len(), 12);
    }

    #[test]
    fn test_min_len_uses_widest_column() {
        let schema = SheetSchema {
            email: 14,
            variant: Some(2),
            status: 5,
        };
        assert_eq!(schema.min_row_len(), 15);
    }

    #[test]
    fn test_parse_column() {
        assert_eq!(parse_column("A").unwrap(), 0);
        assert_eq!(parse_column("b").unwrap(), 1);
        assert_eq!(parse_column("K").unwrap(), 10);
        assert_eq!(parse_column("Z").unwrap(), 25);
        assert_eq!(parse_column("AA").unwrap(), 26);
        assert_eq!(parse_column(" AZ ").unwrap(), 51);
    }

    #[test]
    fn test_parse_column_rejects_garbage() {
        assert!(parse_column("").is_err());
        assert!(parse_column("K1").is_err());
        assert!(parse_column("ЖЖ").is_err());
    }

    #[test]
    fn test_column_label() {
        assert_eq!(column_label(0), "A");
        assert_eq!(column_label(10), "K");
        assert_eq!(column_label(25), "Z");
        assert_eq!(column_label(26), "AA");
        assert_eq!(column_label(701), "ZZ");
        assert_eq!(column_label(702), "AAA");
    }

    #[test]
    fn test_cell_ref() {
        assert_eq!(cell_ref(3, 11), "K3");
        assert_eq!(cell_ref(12, 12), "L12");
    }
}
