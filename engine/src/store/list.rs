//! Encodings for list-shaped and composite user records.
//!
//! Lists are stored as `"<index>:<value>"` lines with 1-based indices and no
//! trailing newline; the empty list is the empty string. A selection made from
//! a list is staged as `"<symbol>,<balance>,<decimal>,<address>"`.

use crate::error::{EngineError, Result};

/// Encode values as an indexed list.
pub fn encode_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{}:{}", i + 1, v.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode an indexed list back into its values, in stored order.
///
/// Lines without an index are kept whole so hand-written data still reads.
pub fn decode_list(encoded: &str) -> Vec<String> {
    encoded
        .lines()
        .filter(|l| !l.is_empty())
        .map(|line| match line.split_once(':') {
            Some((idx, value)) if idx.parse::<usize>().is_ok() => value.to_string(),
            _ => line.to_string(),
        })
        .collect()
}

/// A row picked from a list screen, staged until the user confirms it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub symbol: String,
    pub balance: String,
    pub decimal: String,
    pub address: String,
}

impl Selection {
    pub fn encode(&self) -> String {
        format!(
            "{},{},{},{}",
            self.symbol, self.balance, self.decimal, self.address
        )
    }

    pub fn decode(record: &str) -> Result<Self> {
        let fields: Vec<&str> = record.split(',').collect();
        if fields.len() != 4 {
            return Err(EngineError::Data(format!(
                "malformed selection record: {record:?}"
            )));
        }
        Ok(Self {
            symbol: fields[0].to_string(),
            balance: fields[1].to_string(),
            decimal: fields[2].to_string(),
            address: fields[3].to_string(),
        })
    }
}

/// Parallel columns of a token list: row `i` of every column is one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenColumns {
    pub symbols: Vec<String>,
    pub balances: Vec<String>,
    pub decimals: Vec<String>,
    pub addresses: Vec<String>,
}

impl TokenColumns {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn push(&mut self, row: Selection) {
        self.symbols.push(row.symbol);
        self.balances.push(row.balance);
        self.decimals.push(row.decimal);
        self.addresses.push(row.address);
    }

    /// Row `i` (0-based) if every column has it.
    pub fn row(&self, i: usize) -> Option<Selection> {
        Some(Selection {
            symbol: self.symbols.get(i)?.clone(),
            balance: self.balances.get(i)?.clone(),
            decimal: self.decimals.get(i)?.clone(),
            address: self.addresses.get(i)?.clone(),
        })
    }

    /// Resolve user input against the list: a 1-based index, or otherwise a
    /// case-insensitive symbol match.
    pub fn select(&self, input: &str) -> Option<Selection> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if let Ok(idx) = input.parse::<usize>() {
            return idx.checked_sub(1).and_then(|i| self.row(i));
        }
        self.symbols
            .iter()
            .position(|s| s.eq_ignore_ascii_case(input))
            .and_then(|i| self.row(i))
    }

    /// Position of a symbol (case-insensitive).
    pub fn position_of(&self, symbol: &str) -> Option<usize> {
        self.symbols
            .iter()
            .position(|s| s.eq_ignore_ascii_case(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> TokenColumns {
        let mut cols = TokenColumns::default();
        cols.push(Selection {
            symbol: "SRF".into(),
            balance: "10.96".into(),
            decimal: "6".into(),
            address: "0xaaa".into(),
        });
        cols.push(Selection {
            symbol: "MILO".into(),
            balance: "2.00".into(),
            decimal: "18".into(),
            address: "0xbbb".into(),
        });
        cols
    }

    #[test]
    fn test_encode_list() {
        assert_eq!(encode_list(&["SRF", "MILO"]), "1:SRF\n2:MILO");
        assert_eq!(encode_list::<&str>(&[]), "");
    }

    #[test]
    fn test_decode_list_keeps_colons_in_values() {
        assert_eq!(
            decode_list("1:a:b\n2:c"),
            vec!["a:b".to_string(), "c".to_string()]
        );
        assert!(decode_list("").is_empty());
    }

    #[test]
    fn test_selection_record() {
        let sel = columns().row(0).unwrap();
        assert_eq!(sel.encode(), "SRF,10.96,6,0xaaa");
        assert_eq!(Selection::decode("SRF,10.96,6,0xaaa").unwrap(), sel);
        assert!(Selection::decode("SRF,10.96").is_err());
    }

    #[test]
    fn test_select_by_index_and_symbol() {
        let cols = columns();
        assert_eq!(cols.select("2").unwrap().symbol, "MILO");
        assert_eq!(cols.select("milo").unwrap().address, "0xbbb");
        assert_eq!(cols.select(" srf ").unwrap().decimal, "6");
        assert!(cols.select("0").is_none());
        assert!(cols.select("3").is_none());
        assert!(cols.select("KES").is_none());
        assert!(cols.select("").is_none());
    }
}
