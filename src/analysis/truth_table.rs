use crate::elements::DataField;
use bitvec::prelude::*;
use std::fmt::{self, Display, Formatter};
use std::io::{self, Write};

/// A result column of a [TruthTable], one bit per row.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct Column {
    name: String,
    values: BitVec,
}

/// The outputs of a combinational circuit for every combination of its input variables.
///
/// Rows are numbered so that variable 0 is the most significant bit of the row index.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TruthTable {
    variables: Vec<String>,
    results: Vec<Column>,
    rows: usize,
}

impl TruthTable {
    /// Returns a table of `variables` where every result in `results` is 0.
    pub fn new<S: Into<String>>(variables: Vec<String>, results: impl IntoIterator<Item = S>) -> Self {
        let rows = 1usize << variables.len();
        let results = results
            .into_iter()
            .map(|name| Column {
                name: name.into(),
                values: bitvec![0; rows],
            })
            .collect();
        Self {
            variables,
            results,
            rows,
        }
    }

    pub(crate) fn set(&mut self, row: usize, result: usize, value: bool) {
        self.results[result].values.set(row, value);
    }

    /// Returns the value of result `result` in row `row`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn value(&self, row: usize, result: usize) -> bool {
        self.results[result].values[row]
    }

    /// Returns the value variable `variable` takes in row `row`.
    pub fn variable_value(&self, row: usize, variable: usize) -> bool {
        (row >> (self.variables.len() - 1 - variable)) & 1 == 1
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    pub fn result_name(&self, result: usize) -> &str {
        &self.results[result].name
    }

    /// Returns the name of column `column`, variables come first, then results.
    pub fn column_name(&self, column: usize) -> &str {
        match column.checked_sub(self.variables.len()) {
            None => &self.variables[column],
            Some(result) => self.result_name(result),
        }
    }

    /// Returns the number of columns, variables and results.
    pub fn columns(&self) -> usize {
        self.variables.len() + self.results.len()
    }

    /// Writes the results in the `v2.0 raw` hex format, one word per row with result `i`
    /// stored in bit `i`.
    ///
    /// Fails with [io::ErrorKind::InvalidInput] when there are more than 64 results.
    ///
    /// # Example
    /// ```
    /// # use digisim::analysis::TruthTable;
    /// let table = TruthTable::new(vec!["A".into()], ["Y"]);
    /// let mut hex = Vec::new();
    /// table.write_hex(&mut hex).unwrap();
    /// assert_eq!(String::from_utf8(hex).unwrap(), "v2.0 raw\n0\n0\n");
    /// ```
    pub fn write_hex<W: Write>(&self, w: W) -> io::Result<()> {
        if self.results.len() > u64::BITS as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} results don't fit in a 64 bit word", self.results.len()),
            ));
        }
        let words = (0..self.rows)
            .map(|row| {
                self.results
                    .iter()
                    .enumerate()
                    .filter(|(_, column)| column.values[row])
                    .fold(0u64, |word, (i, _)| word | 1 << i)
            })
            .collect();
        DataField::from_words(words).write_hex(w)
    }
}

impl Display for TruthTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let header: Vec<&str> = (0..self.columns()).map(|c| self.column_name(c)).collect();
        writeln!(f, "{}", header.join("\t"))?;
        for row in 0..self.rows {
            let variables = (0..self.variables.len()).map(|v| self.variable_value(row, v));
            let results = self.results.iter().map(|column| column.values[row]);
            let cells: Vec<&str> = variables
                .chain(results)
                .map(|bit| if bit { "1" } else { "0" })
                .collect();
            writeln!(f, "{}", cells.join("\t"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn and_or() -> TruthTable {
        let mut t = TruthTable::new(vec!["A".into(), "B".into()], ["and", "or"]);
        for row in 0..4 {
            t.set(row, 0, row == 3);
            t.set(row, 1, row != 0);
        }
        t
    }

    #[test]
    fn test_layout() {
        let t = and_or();
        assert_eq!(t.rows(), 4);
        assert_eq!(t.columns(), 4);
        assert_eq!(t.column_name(0), "A");
        assert_eq!(t.column_name(3), "or");
        assert!(t.variable_value(2, 0));
        assert!(!t.variable_value(2, 1));
        assert!(t.value(1, 1));
        assert!(!t.value(1, 0));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            and_or().to_string(),
            "A\tB\tand\tor\n\
             0\t0\t0\t0\n\
             0\t1\t0\t1\n\
             1\t0\t0\t1\n\
             1\t1\t1\t1\n"
        );
    }

    #[test]
    fn test_write_hex() {
        let mut hex = Vec::new();
        and_or().write_hex(&mut hex).unwrap();
        assert_eq!(String::from_utf8(hex).unwrap(), "v2.0 raw\n0\n2\n2\n3\n");

        let mut t = TruthTable::new(vec!["A".into(), "B".into()], ["and"]);
        t.set(3, 0, true);
        let mut hex = Vec::new();
        t.write_hex(&mut hex).unwrap();
        assert_eq!(String::from_utf8(hex).unwrap(), "v2.0 raw\n0\n0\n0\n1\n");
    }

    #[test]
    fn test_write_hex_word_limit() {
        let names = |n: usize| (0..n).map(|i| format!("y{}", i)).collect::<Vec<_>>();
        let mut t = TruthTable::new(vec!["A".into()], names(64));
        t.set(1, 63, true);
        let mut hex = Vec::new();
        t.write_hex(&mut hex).unwrap();
        assert_eq!(
            String::from_utf8(hex).unwrap(),
            "v2.0 raw\n0\n8000000000000000\n"
        );

        let t = TruthTable::new(vec!["A".into()], names(65));
        let err = t.write_hex(Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
