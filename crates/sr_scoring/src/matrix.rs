//! Candidates × metrics score matrix and its CSV form.
//!
//! The CSV artifact has a `Set Index` column followed by the metric
//! names, one line per scored candidate, and a trailing `Winner : <i>`
//! line (`None` when no selection was made).
//!

use std::io::Read;
use std::io::Write;

use csv::ReaderBuilder;
use csv::WriterBuilder;
use ndarray::Array2;
use serde::Serialize;

use crate::ScoringError;

pub const SET_INDEX: &str = "Set Index";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    /// The candidate's replicate index.
    pub index: usize,
    pub values: Vec<f64>,
    /// Name of the complex with the largest defect, if known.
    pub worst_complex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreMatrix {
    names: Vec<String>,
    rows: Vec<ScoreRow>,
}

impl ScoreMatrix {
    pub fn new(names: Vec<String>) -> Self {
        Self { names, rows: Vec::new() }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn rows(&self) -> &[ScoreRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row; its metric names must equal the matrix header.
    pub fn push(&mut self, names: &[String], row: ScoreRow) -> Result<(), ScoringError> {
        if names != self.names.as_slice() {
            return Err(ScoringError::MismatchedRow {
                index: row.index,
                msg: format!("expected [{}], got [{}]", self.names.join(", "), names.join(", ")),
            });
        }
        if row.values.len() != self.names.len() {
            return Err(ScoringError::MismatchedRow {
                index: row.index,
                msg: format!("{} values for {} metrics", row.values.len(), self.names.len()),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Order rows by candidate index.
    pub fn finalize(&mut self) {
        self.rows.sort_by_key(|r| r.index);
    }

    pub fn set_indices(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.index).collect()
    }

    pub fn values(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.rows.len(), self.names.len()), |(i, j)| self.rows[i].values[j])
    }

    pub fn write_csv<W: Write>(&self, mut out: W, winner: Option<usize>) -> Result<(), ScoringError> {
        {
            let mut w = WriterBuilder::new().from_writer(&mut out);
            w.write_record(std::iter::once(SET_INDEX).chain(self.names.iter().map(String::as_str)))?;
            for row in &self.rows {
                w.write_record(
                    std::iter::once(row.index.to_string()).chain(row.values.iter().map(|v| v.to_string())),
                )?;
            }
            w.flush().map_err(|e| ScoringError::io("scores", e))?;
        }
        let winner = winner.map_or("None".to_string(), |w| w.to_string());
        writeln!(out, "Winner : {winner}").map_err(|e| ScoringError::io("scores", e))?;
        Ok(())
    }

    pub fn to_csv_string(&self, winner: Option<usize>) -> Result<String, ScoringError> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf, winner)?;
        String::from_utf8(buf).map_err(|e| ScoringError::MalformedScores(e.to_string()))
    }

    /// Read a scores artifact back; the `Winner` line is ignored.
    pub fn read_csv<R: Read>(input: R) -> Result<Self, ScoringError> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);
        let header = reader.headers()?.clone();
        let mut fields = header.iter();
        if fields.next() != Some(SET_INDEX) {
            return Err(ScoringError::MalformedScores(format!("first column must be '{SET_INDEX}'")));
        }
        let names: Vec<String> = fields.map(str::to_string).collect();
        let mut matrix = ScoreMatrix::new(names.clone());

        for record in reader.records() {
            let record = record?;
            let first = record.get(0).unwrap_or("");
            if first.starts_with("Winner") {
                continue;
            }
            let index = first.trim().parse::<usize>()
                .map_err(|_| ScoringError::MalformedScores(format!("bad set index '{first}'")))?;
            let values = record.iter().skip(1)
                .map(|v| v.trim().parse::<f64>()
                    .map_err(|_| ScoringError::MalformedScores(format!("bad value '{v}' for candidate {index}"))))
                .collect::<Result<Vec<_>, _>>()?;
            matrix.push(&names, ScoreRow { index, values, worst_complex: None })?;
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["TSI avg".to_string(), "SSU Min".to_string()]
    }

    #[test]
    fn test_push_checks_names() {
        let mut m = ScoreMatrix::new(names());
        m.push(&names(), ScoreRow { index: 3, values: vec![1.0, 0.5], worst_complex: None }).unwrap();
        let other = vec!["SSU Min".to_string(), "TSI avg".to_string()];
        assert!(matches!(
            m.push(&other, ScoreRow { index: 4, values: vec![1.0, 0.5], worst_complex: None }),
            Err(ScoringError::MismatchedRow { index: 4, .. })
        ));
        assert!(m.push(&names(), ScoreRow { index: 5, values: vec![1.0], worst_complex: None }).is_err());
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_csv_artifact() {
        let mut m = ScoreMatrix::new(names());
        m.push(&names(), ScoreRow { index: 2, values: vec![1.5, 0.25], worst_complex: None }).unwrap();
        m.push(&names(), ScoreRow { index: 0, values: vec![3.0, 0.75], worst_complex: None }).unwrap();
        m.finalize();
        assert_eq!(m.set_indices(), vec![0, 2]);

        let text = m.to_csv_string(Some(2)).unwrap();
        assert_eq!(text, "Set Index,TSI avg,SSU Min\n0,3,0.75\n2,1.5,0.25\nWinner : 2\n");
        let back = ScoreMatrix::read_csv(text.as_bytes()).unwrap();
        assert_eq!(back, m);

        let none = m.to_csv_string(None).unwrap();
        assert!(none.ends_with("Winner : None\n"));
    }

    #[test]
    fn test_read_rejects_garbage() {
        assert!(ScoreMatrix::read_csv("Index,a\n0,1\n".as_bytes()).is_err());
        assert!(ScoreMatrix::read_csv("Set Index,a\n0,x\n".as_bytes()).is_err());
        assert!(ScoreMatrix::read_csv("Set Index,a\n0,1,2\n".as_bytes()).is_err());
    }
}
