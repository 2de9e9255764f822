//! Huffman coding over `i64` alphabets.
//!
//! The encoder side is a [`HuffmanTable`]: a map from value to prefix-free
//! [`Code`], built from observed frequencies with the classic min-heap
//! construction. The decoder side is a [`HuffmanTree`]: an arena of nodes
//! rebuilt from the serialized header, walked one bit at a time.
//!
//! Construction is deterministic: leaves are seeded in ascending value order
//! and heap ties are broken by insertion sequence, so the same frequency map
//! always yields the same codes. A single-symbol alphabet is given the 1-bit
//! code `0`; zero-length codes are never produced.
//!
//! Leaves and internal nodes are distinct enum variants, so a leaf carrying
//! the value 0 is unambiguous.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{QrWasmError, Result};
use crate::intlist;
use crate::numeric::TAG_WIDTH_BITS;

/// A prefix code: `len` bits stored in the low end of `bits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code {
    /// The code bits, MSB of the code at bit `len - 1`.
    pub bits: u64,
    /// Length of the code in bits (1..=63).
    pub len: u8,
}

/// Encoder-side table mapping each alphabet value to its prefix code.
#[derive(Debug, Clone, Default)]
pub struct HuffmanTable {
    codes: BTreeMap<i64, Code>,
}

/// Arena node of the decoder tree.
#[derive(Debug, Clone)]
enum Node {
    /// Interior node; children are created on demand during header parsing.
    Internal {
        left: Option<usize>,
        right: Option<usize>,
    },
    /// Terminal node carrying an alphabet value.
    Leaf(i64),
}

/// Decoder-side prefix tree.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
}

const ROOT: usize = 0;

/// Heap entry used while building: (frequency, insertion sequence, node).
type HeapEntry = Reverse<(u64, u64, BuildNode)>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum BuildNode {
    Leaf(i64),
    Internal(Box<BuildNode>, Box<BuildNode>),
}

impl HuffmanTable {
    /// Build a table from an explicit frequency map.
    ///
    /// Every frequency must be positive; an empty map is refused (use
    /// [`HuffmanTable::empty`] for categories with no observations).
    pub fn from_frequencies(frequencies: &BTreeMap<i64, u64>) -> Result<Self> {
        if frequencies.is_empty() {
            return Err(QrWasmError::corrupt(0, "huffman table built from no symbols"));
        }
        debug_assert!(frequencies.values().all(|&f| f > 0));

        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
        let mut seq = 0u64;
        for (&value, &freq) in frequencies {
            heap.push(Reverse((freq, seq, BuildNode::Leaf(value))));
            seq += 1;
        }

        while heap.len() > 1 {
            let Reverse((freq_a, _, a)) = heap.pop().expect("heap len checked");
            let Reverse((freq_b, _, b)) = heap.pop().expect("heap len checked");
            heap.push(Reverse((
                freq_a + freq_b,
                seq,
                BuildNode::Internal(Box::new(a), Box::new(b)),
            )));
            seq += 1;
        }

        let Reverse((_, _, root)) = heap.pop().expect("heap holds the root");
        let mut codes = BTreeMap::new();
        match root {
            // Single-symbol alphabet: the 1-bit code `0` by convention.
            BuildNode::Leaf(value) => {
                codes.insert(value, Code { bits: 0, len: 1 });
            }
            BuildNode::Internal(left, right) => {
                assign_codes(&left, 0, 1, &mut codes)?;
                assign_codes(&right, 1, 1, &mut codes)?;
            }
        }
        Ok(Self { codes })
    }

    /// Build a table by counting the occurrences in `values`.
    pub fn from_values(values: &[i64]) -> Result<Self> {
        let mut frequencies = BTreeMap::new();
        for &v in values {
            *frequencies.entry(v).or_insert(0u64) += 1;
        }
        Self::from_frequencies(&frequencies)
    }

    /// A table with no codes, for categories that observed no values.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the table holds no codes.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Look up the code for `value`.
    pub fn code(&self, value: i64) -> Option<Code> {
        self.codes.get(&value).copied()
    }

    /// Iterate over `(value, code)` pairs in ascending value order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, Code)> + '_ {
        self.codes.iter().map(|(&v, &c)| (v, c))
    }

    /// Write the code for `value` to the stream.
    pub fn encode_value(&self, writer: &mut BitWriter, value: i64) -> Result<()> {
        let code = self.codes.get(&value).ok_or_else(|| {
            QrWasmError::corrupt(writer.cursor(), format!("value {value} missing from huffman table"))
        })?;
        writer.write_bits_unsigned(code.bits, code.len);
        Ok(())
    }

    /// Serialize the table header: the value list (integer-list coded), then
    /// a `(6-bit length, code bits)` pair per value in the same order.
    pub fn write_header(&self, writer: &mut BitWriter) -> Result<()> {
        let values: Vec<i64> = self.codes.keys().copied().collect();
        intlist::write_list(writer, &values)?;
        for code in self.codes.values() {
            writer.write_bits_unsigned(code.len as u64, TAG_WIDTH_BITS);
            writer.write_bits_unsigned(code.bits, code.len);
        }
        Ok(())
    }
}

fn assign_codes(
    node: &BuildNode,
    bits: u64,
    len: u8,
    codes: &mut BTreeMap<i64, Code>,
) -> Result<()> {
    if len > 63 {
        return Err(QrWasmError::unsupported("huffman code longer than 63 bits"));
    }
    match node {
        BuildNode::Leaf(value) => {
            codes.insert(*value, Code { bits, len });
            Ok(())
        }
        BuildNode::Internal(left, right) => {
            assign_codes(left, bits << 1, len + 1, codes)?;
            assign_codes(right, (bits << 1) | 1, len + 1, codes)
        }
    }
}

impl HuffmanTree {
    /// Parse a table header and rebuild the decode tree.
    ///
    /// Two codes where one is a prefix of the other make the header
    /// self-inconsistent and fail with a corrupt-stream error.
    pub fn read_header(reader: &mut BitReader<'_>) -> Result<Self> {
        let values = intlist::read_list(reader)?;
        let mut tree = Self {
            nodes: vec![Node::Internal {
                left: None,
                right: None,
            }],
        };
        for value in values {
            let len = reader.read_bits_unsigned(TAG_WIDTH_BITS)? as u8;
            if len == 0 {
                return Err(QrWasmError::corrupt(
                    reader.bit_position(),
                    "zero-length huffman code",
                ));
            }
            let bits = reader.read_bits_unsigned(len)?;
            tree.insert(value, bits, len, reader.bit_position())?;
        }
        Ok(tree)
    }

    fn insert(&mut self, value: i64, bits: u64, len: u8, bit_position: u64) -> Result<()> {
        let mut node = ROOT;
        for depth in (0..len).rev() {
            let go_right = (bits >> depth) & 1 != 0;
            let child = match &self.nodes[node] {
                Node::Internal { left, right } => {
                    if go_right {
                        *right
                    } else {
                        *left
                    }
                }
                Node::Leaf(_) => {
                    return Err(QrWasmError::corrupt(
                        bit_position,
                        "huffman code extends through an existing leaf",
                    ));
                }
            };
            let child = match child {
                Some(id) => {
                    if depth == 0 {
                        return Err(QrWasmError::corrupt(
                            bit_position,
                            "huffman code is a prefix of another",
                        ));
                    }
                    id
                }
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(if depth == 0 {
                        Node::Leaf(value)
                    } else {
                        Node::Internal {
                            left: None,
                            right: None,
                        }
                    });
                    match &mut self.nodes[node] {
                        Node::Internal { left, right } => {
                            if go_right {
                                *right = Some(id);
                            } else {
                                *left = Some(id);
                            }
                        }
                        Node::Leaf(_) => unreachable!("checked above"),
                    }
                    id
                }
            };
            node = child;
        }
        Ok(())
    }

    /// Whether the tree holds no codes.
    pub fn is_empty(&self) -> bool {
        matches!(
            self.nodes[ROOT],
            Node::Internal {
                left: None,
                right: None
            }
        )
    }

    /// Decode one value by descending from the root, one bit per step.
    pub fn decode_value(&self, reader: &mut BitReader<'_>) -> Result<i64> {
        let mut node = ROOT;
        loop {
            match &self.nodes[node] {
                Node::Leaf(value) => return Ok(*value),
                Node::Internal { left, right } => {
                    let go_right = reader.read_bit()?;
                    let child = if go_right { *right } else { *left };
                    node = child
                        .ok_or_else(|| QrWasmError::invalid_huffman(reader.bit_position()))?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freq(pairs: &[(i64, u64)]) -> BTreeMap<i64, u64> {
        pairs.iter().copied().collect()
    }

    fn roundtrip_tree(table: &HuffmanTable) -> (Vec<u8>, HuffmanTree) {
        let mut writer = BitWriter::new();
        table.write_header(&mut writer).unwrap();
        let bytes = writer.finalize();
        let mut reader = BitReader::new(&bytes);
        let tree = HuffmanTree::read_header(&mut reader).unwrap();
        (bytes, tree)
    }

    #[test]
    fn test_code_lengths_follow_frequencies() {
        let table =
            HuffmanTable::from_frequencies(&freq(&[(b'A' as i64, 5), (b'B' as i64, 2), (b'C' as i64, 1), (b'D' as i64, 1)]))
                .unwrap();
        let a = table.code(b'A' as i64).unwrap();
        let b = table.code(b'B' as i64).unwrap();
        let c = table.code(b'C' as i64).unwrap();
        let d = table.code(b'D' as i64).unwrap();
        assert!(a.len <= b.len);
        assert!(b.len <= c.len);
        assert!(b.len <= d.len);
    }

    #[test]
    fn test_prefix_property() {
        let table = HuffmanTable::from_frequencies(&freq(&[
            (1, 9),
            (2, 4),
            (3, 4),
            (4, 2),
            (5, 1),
            (6, 1),
            (7, 1),
        ]))
        .unwrap();
        let codes: Vec<Code> = table.iter().map(|(_, c)| c).collect();
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i == j {
                    continue;
                }
                let (short, long) = if a.len <= b.len { (a, b) } else { (b, a) };
                let prefix = long.bits >> (long.len - short.len);
                assert!(
                    !(short.len == long.len && short.bits == long.bits),
                    "duplicate code"
                );
                assert!(
                    short.len == long.len || prefix != short.bits,
                    "code {:b}/{} is a prefix of {:b}/{}",
                    short.bits,
                    short.len,
                    long.bits,
                    long.len
                );
            }
        }
    }

    #[test]
    fn test_encode_decode_each_symbol() {
        let table =
            HuffmanTable::from_frequencies(&freq(&[(b'A' as i64, 5), (b'B' as i64, 2), (b'C' as i64, 1), (b'D' as i64, 1)]))
                .unwrap();
        let (_, tree) = roundtrip_tree(&table);

        for symbol in [b'A', b'B', b'C', b'D'] {
            let mut writer = BitWriter::new();
            table.encode_value(&mut writer, symbol as i64).unwrap();
            let bytes = writer.finalize();
            let mut reader = BitReader::new(&bytes);
            assert_eq!(tree.decode_value(&mut reader).unwrap(), symbol as i64);
        }
    }

    #[test]
    fn test_single_symbol_alphabet() {
        let table = HuffmanTable::from_frequencies(&freq(&[(42, 17)])).unwrap();
        let code = table.code(42).unwrap();
        assert_eq!((code.bits, code.len), (0, 1));

        let (_, tree) = roundtrip_tree(&table);
        let mut writer = BitWriter::new();
        table.encode_value(&mut writer, 42).unwrap();
        let bytes = writer.finalize();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(tree.decode_value(&mut reader).unwrap(), 42);
    }

    #[test]
    fn test_zero_is_an_ordinary_leaf_value() {
        let table = HuffmanTable::from_frequencies(&freq(&[(0, 10), (1, 1)])).unwrap();
        let (_, tree) = roundtrip_tree(&table);
        let mut writer = BitWriter::new();
        table.encode_value(&mut writer, 0).unwrap();
        table.encode_value(&mut writer, 1).unwrap();
        let bytes = writer.finalize();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(tree.decode_value(&mut reader).unwrap(), 0);
        assert_eq!(tree.decode_value(&mut reader).unwrap(), 1);
    }

    #[test]
    fn test_deterministic_construction() {
        let frequencies = freq(&[(10, 3), (20, 3), (30, 3), (40, 3)]);
        let first = HuffmanTable::from_frequencies(&frequencies).unwrap();
        let second = HuffmanTable::from_frequencies(&frequencies).unwrap();
        let a: Vec<_> = first.iter().collect();
        let b: Vec<_> = second.iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_negative_values_roundtrip() {
        let table = HuffmanTable::from_values(&[-5, -5, -5, 7, 7, -1000]).unwrap();
        let (_, tree) = roundtrip_tree(&table);
        let mut writer = BitWriter::new();
        for v in [-1000, 7, -5] {
            table.encode_value(&mut writer, v).unwrap();
        }
        let bytes = writer.finalize();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(tree.decode_value(&mut reader).unwrap(), -1000);
        assert_eq!(tree.decode_value(&mut reader).unwrap(), 7);
        assert_eq!(tree.decode_value(&mut reader).unwrap(), -5);
    }

    #[test]
    fn test_empty_table_header_roundtrip() {
        let table = HuffmanTable::empty();
        let mut writer = BitWriter::new();
        table.write_header(&mut writer).unwrap();
        let bytes = writer.finalize();
        let mut reader = BitReader::new(&bytes);
        let tree = HuffmanTree::read_header(&mut reader).unwrap();
        assert!(tree.is_empty());

        // Decoding against an empty tree must fail, not loop.
        let data = [0u8];
        let mut reader = BitReader::new(&data);
        assert!(tree.decode_value(&mut reader).is_err());
    }

    #[test]
    fn test_empty_frequencies_refused() {
        assert!(HuffmanTable::from_frequencies(&BTreeMap::new()).is_err());
    }

    #[test]
    fn test_conflicting_header_is_corrupt() {
        // Hand-build a header where the second code is a prefix of the first.
        let mut writer = BitWriter::new();
        intlist::write_list(&mut writer, &[1, 2]).unwrap();
        writer.write_bits_unsigned(2, TAG_WIDTH_BITS);
        writer.write_bits_unsigned(0b10, 2);
        writer.write_bits_unsigned(1, TAG_WIDTH_BITS);
        writer.write_bits_unsigned(0b1, 1);
        let bytes = writer.finalize();
        let mut reader = BitReader::new(&bytes);
        assert!(matches!(
            HuffmanTree::read_header(&mut reader),
            Err(QrWasmError::CorruptStream { .. })
        ));
    }

    #[test]
    fn test_header_roundtrip_many_symbols() {
        let values: Vec<i64> = (0..60).map(|i| i * i - 100).collect();
        let mut observed = Vec::new();
        for (i, &v) in values.iter().enumerate() {
            for _ in 0..=(i % 7) {
                observed.push(v);
            }
        }
        let table = HuffmanTable::from_values(&observed).unwrap();
        let (_, tree) = roundtrip_tree(&table);

        let mut writer = BitWriter::new();
        for &v in &observed {
            table.encode_value(&mut writer, v).unwrap();
        }
        let bytes = writer.finalize();
        let mut reader = BitReader::new(&bytes);
        for &v in &observed {
            assert_eq!(tree.decode_value(&mut reader).unwrap(), v);
        }
    }
}
