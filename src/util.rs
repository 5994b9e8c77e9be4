/**
 * File: /src/util.rs
 * Created Date: Tuesday, June 18th 2024
 * Author: Zihan
 * -----
 * Last Modified: Wednesday, 15th October 2025 3:27:51 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-15		Zihan	Mask helpers and BitSet for the branch and bound solver
**/

/// Number of `true` entries in a mask
pub fn count_true(mask: &[bool]) -> usize {
    mask.iter().filter(|&&b| b).count()
}

/// Positions of the `true` entries in a mask
pub fn indices_of(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &b)| if b { Some(i) } else { None })
        .collect()
}

pub fn mask_from_indices(len: usize, indices: &[usize]) -> Vec<bool> {
    let mut mask = vec![false; len];
    for &i in indices {
        mask[i] = true;
    }
    mask
}

/// Render a mask as a compact `0101...` string
pub fn mask_to_bits(mask: &[bool]) -> String {
    mask.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Inverse of [`mask_to_bits`]; `None` on any character other than 0/1
pub fn bits_to_mask(bits: &str) -> Option<Vec<bool>> {
    bits.chars()
        .map(|c| match c {
            '1' => Some(true),
            '0' => Some(false),
            _ => None,
        })
        .collect()
}

/// Fixed size bit set over `0..len`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; (len + 63) / 64],
            len,
        }
    }

    pub fn from_mask(mask: &[bool]) -> Self {
        let mut set = Self::new(mask.len());
        for i in indices_of(mask) {
            set.insert(i);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn insert(&mut self, i: usize) {
        self.words[i / 64] |= 1u64 << (i % 64);
    }

    pub fn remove(&mut self, i: usize) {
        self.words[i / 64] &= !(1u64 << (i % 64));
    }

    pub fn contains(&self, i: usize) -> bool {
        self.words[i / 64] & (1u64 << (i % 64)) != 0
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn intersect_with(&mut self, other: &BitSet) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= *b;
        }
    }

    pub fn intersection(&self, other: &BitSet) -> BitSet {
        let mut out = self.clone();
        out.intersect_with(other);
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.contains(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_helpers() {
        let mask = vec![true, false, true, true];
        assert_eq!(count_true(&mask), 3);
        assert_eq!(indices_of(&mask), vec![0, 2, 3]);
        assert_eq!(mask_from_indices(4, &[0, 2, 3]), mask);
        assert_eq!(mask_to_bits(&mask), "1011");
        assert_eq!(bits_to_mask("1011"), Some(mask));
        assert_eq!(bits_to_mask("10x1"), None);
    }

    #[test]
    fn test_bitset_ops() {
        let mut a = BitSet::from_mask(&[true; 70]);
        assert_eq!(a.count(), 70);
        a.remove(3);
        a.remove(65);
        assert!(!a.contains(65));
        assert!(a.contains(69));

        let b = BitSet::from_mask(&(0..70).map(|i| i % 2 == 1).collect::<Vec<_>>());
        let c = a.intersection(&b);
        assert_eq!(c.count(), 33);
        assert_eq!(c.iter().take(3).collect::<Vec<_>>(), vec![1, 5, 7]);
        assert_eq!(c.len(), 70);
    }
}
