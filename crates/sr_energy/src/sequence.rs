//! Nucleotide encoding and batches of sequence ends.
//!
//! Nucleotides are encoded as `a=0, c=1, g=2, t=3`, so the Watson-Crick
//! complement of `x` is `3 - x` and an adjacent pair `(a, b)` maps to the
//! stacking index `4*a + b`.
//!

use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::Axis;
use serde::Deserialize;
use serde::Serialize;

use crate::EnergyError;

/// Number of distinct stacking contexts.
pub const N_STACKS: usize = 16;

pub fn encode_base(c: char) -> Result<u8, EnergyError> {
    match c.to_ascii_lowercase() {
        'a' => Ok(0),
        'c' => Ok(1),
        'g' => Ok(2),
        't' => Ok(3),
        _ => Err(EnergyError::InvalidNucleotide(c)),
    }
}

/// Encode a nucleotide string (case-insensitive).
pub fn encode(seq: &str) -> Result<Vec<u8>, EnergyError> {
    seq.chars().map(encode_base).collect()
}

/// Decode codes back into a lowercase string.
pub fn decode(codes: &[u8]) -> String {
    codes.iter().map(|&c| b"acgt"[c as usize] as char).collect()
}

#[inline]
pub fn complement(x: u8) -> u8 {
    debug_assert!(x < 4);
    3 - x
}

pub fn reverse_complement(codes: &[u8]) -> Vec<u8> {
    codes.iter().rev().map(|&c| complement(c)).collect()
}

/// Reverse complement on the string level, preserving the input case.
pub fn reverse_complement_str(seq: &str) -> Result<String, EnergyError> {
    seq.chars()
        .rev()
        .map(|c| {
            let rc = match c {
                'a' => 't', 'c' => 'g', 'g' => 'c', 't' => 'a',
                'A' => 'T', 'C' => 'G', 'G' => 'C', 'T' => 'A',
                _ => return Err(EnergyError::InvalidNucleotide(c)),
            };
            Ok(rc)
        })
        .collect()
}

#[inline]
pub fn stack_index(a: u8, b: u8) -> usize {
    4 * a as usize + b as usize
}

/// The complementary context of a stacking index, i.e. `15 - i`.
#[inline]
pub fn complement_stack(i: usize) -> usize {
    debug_assert!(i < N_STACKS);
    N_STACKS - 1 - i
}

/// Stacking indices of all consecutive pairs in `row`.
pub fn stacks(row: ArrayView1<u8>) -> Vec<usize> {
    row.windows(2)
        .into_iter()
        .map(|w| stack_index(w[0], w[1]))
        .collect()
}

/// Which end of a sequence carries the flanking base.
///
/// `Td`: toehold then flank, the flank is the 3'-most base.
/// `Dt`: flank then toehold, the flank is the 5'-most base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndType {
    Td,
    Dt,
}

/// A batch of equal-length sequence ends sharing one `EndType`.
///
/// Each row is a sequence of `len()` codes. The smallest meaningful end
/// is three bases long: two toehold bases plus the flank.
#[derive(Debug, Clone, PartialEq)]
pub struct EndArray {
    seqs: Array2<u8>,
    end_type: EndType,
}

impl EndArray {
    pub fn new(seqs: Array2<u8>, end_type: EndType) -> Result<Self, EnergyError> {
        if seqs.ncols() < 3 {
            return Err(EnergyError::IncompatibleShapes(format!(
                "sequence ends need at least 3 bases, got {}", seqs.ncols()
            )));
        }
        if let Some(&bad) = seqs.iter().find(|&&c| c > 3) {
            return Err(EnergyError::IncompatibleShapes(format!(
                "nucleotide code {bad} out of range"
            )));
        }
        Ok(Self { seqs, end_type })
    }

    pub fn from_strs<S: AsRef<str>>(seqs: &[S], end_type: EndType) -> Result<Self, EnergyError> {
        let encoded: Vec<Vec<u8>> = seqs.iter()
            .map(|s| encode(s.as_ref()))
            .collect::<Result<_, _>>()?;
        let ncols = encoded.first().map_or(0, |s| s.len());
        if let Some(bad) = encoded.iter().find(|s| s.len() != ncols) {
            return Err(EnergyError::IncompatibleShapes(format!(
                "sequences of length {} and {} in one batch", ncols, bad.len()
            )));
        }
        let flat: Vec<u8> = encoded.into_iter().flatten().collect();
        let seqs = Array2::from_shape_vec((seqs.len(), ncols), flat)
            .map_err(|e| EnergyError::IncompatibleShapes(e.to_string()))?;
        Self::new(seqs, end_type)
    }

    /// Repeat a single-row batch `n` times.
    pub fn tile(&self, n: usize) -> Result<Self, EnergyError> {
        if self.nrows() != 1 {
            return Err(EnergyError::IncompatibleShapes(format!(
                "only a single sequence can be tiled, batch has {} rows", self.nrows()
            )));
        }
        let row = self.seqs.row(0);
        let seqs = Array2::from_shape_fn((n, self.len()), |(_, j)| row[j]);
        Ok(Self { seqs, end_type: self.end_type })
    }

    pub fn nrows(&self) -> usize {
        self.seqs.nrows()
    }

    /// Length of every sequence in the batch.
    pub fn len(&self) -> usize {
        self.seqs.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.nrows() == 0
    }

    pub fn end_type(&self) -> EndType {
        self.end_type
    }

    pub fn seqs(&self) -> ArrayView2<'_, u8> {
        self.seqs.view()
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, u8> {
        self.seqs.index_axis(Axis(0), i)
    }
}

/// Row pairing of two batches: equal row counts, or one singleton that is
/// broadcast against the other batch.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pairing {
    pub rows: usize,
    a_single: bool,
    b_single: bool,
}

impl Pairing {
    pub fn new(a: &EndArray, b: &EndArray) -> Result<Self, EnergyError> {
        if a.end_type() != b.end_type() {
            return Err(EnergyError::IncompatibleShapes(format!(
                "end types differ ({:?} vs {:?})", a.end_type(), b.end_type()
            )));
        }
        if a.len() != b.len() {
            return Err(EnergyError::IncompatibleShapes(format!(
                "sequence lengths differ ({} vs {})", a.len(), b.len()
            )));
        }
        let (na, nb) = (a.nrows(), b.nrows());
        let rows = if na == nb {
            na
        } else if na == 1 {
            nb
        } else if nb == 1 {
            na
        } else {
            return Err(EnergyError::IncompatibleShapes(format!(
                "batches of {na} and {nb} sequences, neither is a singleton"
            )));
        };
        Ok(Self { rows, a_single: na == 1, b_single: nb == 1 })
    }

    #[inline]
    pub fn a(&self, i: usize) -> usize {
        if self.a_single { 0 } else { i }
    }

    #[inline]
    pub fn b(&self, i: usize) -> usize {
        if self.b_single { 0 } else { i }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let codes = encode("AcGt").unwrap();
        assert_eq!(codes, vec![0, 1, 2, 3]);
        assert_eq!(decode(&codes), "acgt");
        assert!(matches!(encode("acgn"), Err(EnergyError::InvalidNucleotide('n'))));
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(&encode("aacg").unwrap()), encode("cgtt").unwrap());
        assert_eq!(reverse_complement_str("AACg").unwrap(), "cGTT");
    }

    #[test]
    fn test_stacks() {
        let row = ndarray::arr1(&[0u8, 1, 3, 2]);
        assert_eq!(stacks(row.view()), vec![1, 7, 14]);
        for i in 0..N_STACKS {
            let (a, b) = ((i / 4) as u8, (i % 4) as u8);
            assert_eq!(complement_stack(i), stack_index(complement(a), complement(b)));
        }
    }

    #[test]
    fn test_end_array_shapes() {
        let ends = EndArray::from_strs(&["acgta", "ttgca"], EndType::Td).unwrap();
        assert_eq!(ends.nrows(), 2);
        assert_eq!(ends.len(), 5);
        assert!(EndArray::from_strs(&["acgta", "ttgc"], EndType::Td).is_err());
        assert!(EndArray::from_strs(&["ac"], EndType::Dt).is_err());

        let single = EndArray::from_strs(&["acgta"], EndType::Td).unwrap();
        let tiled = single.tile(3).unwrap();
        assert_eq!(tiled.nrows(), 3);
        assert_eq!(tiled.row(2), single.row(0));
        assert!(ends.tile(2).is_err());
    }

    #[test]
    fn test_pairing() {
        let five = EndArray::from_strs(&["acgta"; 5], EndType::Td).unwrap();
        let two = EndArray::from_strs(&["acgta"; 2], EndType::Td).unwrap();
        let one = EndArray::from_strs(&["acgta"], EndType::Td).unwrap();
        let dt = EndArray::from_strs(&["acgta"; 5], EndType::Dt).unwrap();

        let p = Pairing::new(&one, &five).unwrap();
        assert_eq!(p.rows, 5);
        assert_eq!((p.a(3), p.b(3)), (0, 3));
        let p = Pairing::new(&five, &one).unwrap();
        assert_eq!((p.a(3), p.b(3)), (3, 0));
        assert!(Pairing::new(&two, &five).is_err());
        assert!(Pairing::new(&five, &dt).is_err());
    }
}
