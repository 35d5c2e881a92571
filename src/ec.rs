//! The `ec` module applies Reed-Solomon error correction to the encoded
//! data codewords and interleaves the per-block streams.
//!
//! Generator polynomials are memoized per degree in a process-wide cache;
//! the first computation of each degree happens under a mutex, later reads
//! reuse the stored coefficients.

use std::sync::{Mutex, OnceLock};

use hashbrown::HashMap;

use crate::gf::GaloisField;
use crate::types::{EcLevel, QrError, QrResult, Version};

/// One row of the capacity table: the data/ECC block structure for a
/// (version, error correction level) pair.
///
/// Group 2 blocks, when present, carry one data codeword more than group 1
/// blocks; both groups share the same ECC codeword count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    /// Total data codewords across all blocks.
    pub total_data: usize,
    /// ECC codewords appended to every block.
    pub ec_per_block: usize,
    pub group1_blocks: usize,
    pub group1_data: usize,
    pub group2_blocks: usize,
    pub group2_data: usize,
}

/// Looks up the block structure for a version / level pair.
///
/// # Errors
///
/// Returns `Err(QrError::UnknownCapacityEntry)` if the table carries no
/// entry for the pair.
pub fn capacity(version: Version, ec_level: EcLevel) -> QrResult<Capacity> {
    let entry = version.fetch(ec_level, &CAPACITIES);
    if entry.total_data == 0 {
        return Err(QrError::UnknownCapacityEntry {
            version: version.number(),
            ec_level,
        });
    }
    Ok(entry)
}

/// A data block awaiting its ECC codewords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub data: Vec<u8>,
    pub ec_count: usize,
}

/// Splits the data codewords into blocks sized by the capacity table's
/// group 1 / group 2 fields.
///
/// # Errors
///
/// Returns `Err(QrError::UnknownCapacityEntry)` for a missing table entry,
/// and `Err(QrError::PayloadTooLarge)` if `data` does not hold exactly the
/// table's total data codeword count.
pub fn split_blocks(data: &[u8], version: Version, ec_level: EcLevel) -> QrResult<Vec<Block>> {
    let cap = capacity(version, ec_level)?;
    if data.len() != cap.total_data {
        return Err(QrError::PayloadTooLarge);
    }
    let mut blocks = Vec::with_capacity(cap.group1_blocks + cap.group2_blocks);
    let mut offset = 0;
    for _ in 0..cap.group1_blocks {
        blocks.push(Block {
            data: data[offset..offset + cap.group1_data].to_vec(),
            ec_count: cap.ec_per_block,
        });
        offset += cap.group1_data;
    }
    for _ in 0..cap.group2_blocks {
        blocks.push(Block {
            data: data[offset..offset + cap.group2_data].to_vec(),
            ec_count: cap.ec_per_block,
        });
        offset += cap.group2_data;
    }
    Ok(blocks)
}

/// Polynomial multiplication over GF(256), coefficients highest degree
/// first; convolution with XOR accumulation.
fn poly_mul(gf: &GaloisField, a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0 {
            continue;
        }
        for (j, &bj) in b.iter().enumerate() {
            out[i + j] ^= gf.mul(ai, bj);
        }
    }
    out
}

/// Remainder of polynomial long division over GF(256). The divisor must be
/// monic with a non-zero leading coefficient; the remainder has length
/// `divisor.len() - 1`.
fn poly_rem(gf: &GaloisField, dividend: &[u8], divisor: &[u8]) -> Vec<u8> {
    debug_assert!(divisor.len() > 1);
    let mut rem = dividend.to_vec();
    let steps = dividend.len() - (divisor.len() - 1);
    for i in 0..steps {
        let factor = gf.div(rem[i], divisor[0]);
        if factor == 0 {
            continue;
        }
        for (j, &d) in divisor.iter().enumerate() {
            rem[i + j] ^= gf.mul(factor, d);
        }
    }
    rem.split_off(steps)
}

/// The generator polynomial of degree `degree`, i.e.
/// `∏_{i=0}^{degree-1} (x + α^i)`, memoized process-wide.
pub fn generator_poly(degree: usize) -> Vec<u8> {
    static CACHE: OnceLock<Mutex<HashMap<usize, Vec<u8>>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut cache = cache.lock().expect("generator cache poisoned");
    cache
        .entry(degree)
        .or_insert_with(|| {
            let gf = GaloisField::global();
            let mut poly = vec![1u8];
            for i in 0..degree {
                poly = poly_mul(gf, &poly, &[1, gf.exp(i)]);
            }
            poly
        })
        .clone()
}

/// Computes `ec_count` ECC codewords for `data`: the remainder of
/// `data · x^ec_count` modulo the degree-`ec_count` generator polynomial,
/// left-padded with zero bytes if the remainder comes out short.
pub fn reed_solomon_encode(data: &[u8], ec_count: usize) -> Vec<u8> {
    let gf = GaloisField::global();
    let generator = generator_poly(ec_count);
    let mut message = data.to_vec();
    message.resize(data.len() + ec_count, 0);
    let rem = poly_rem(gf, &message, &generator);
    debug_assert!(rem.len() <= ec_count);
    let mut ecc = vec![0u8; ec_count - rem.len()];
    ecc.extend_from_slice(&rem);
    ecc
}

/// Splits `data` into blocks, computes each block's ECC, and interleaves
/// both streams codeword by codeword across blocks.
///
/// Returns the interleaved data codewords and the interleaved ECC
/// codewords, ready to be written into the matrix back to back.
pub fn construct_codewords(
    data: &[u8],
    version: Version,
    ec_level: EcLevel,
) -> QrResult<(Vec<u8>, Vec<u8>)> {
    let blocks = split_blocks(data, version, ec_level)?;
    let ec_blocks: Vec<Vec<u8>> = blocks
        .iter()
        .map(|b| reed_solomon_encode(&b.data, b.ec_count))
        .collect();

    let longest = blocks.iter().map(|b| b.data.len()).max().unwrap_or(0);
    let mut data_out = Vec::with_capacity(data.len());
    for i in 0..longest {
        for block in &blocks {
            if let Some(&byte) = block.data.get(i) {
                data_out.push(byte);
            }
        }
    }
    let ec_len = ec_blocks.first().map_or(0, Vec::len);
    let mut ec_out = Vec::with_capacity(ec_len * ec_blocks.len());
    for i in 0..ec_len {
        for block in &ec_blocks {
            ec_out.push(block[i]);
        }
    }
    Ok((data_out, ec_out))
}

const fn cap(
    total_data: usize,
    ec_per_block: usize,
    group1_blocks: usize,
    group1_data: usize,
    group2_blocks: usize,
    group2_data: usize,
) -> Capacity {
    Capacity {
        total_data,
        ec_per_block,
        group1_blocks,
        group1_data,
        group2_blocks,
        group2_data,
    }
}

/// Block structure per version, in the level order [L, M, Q, H].
/// From ISO/IEC 18004:2006 §6.5.1, Table 9.
#[rustfmt::skip]
static CAPACITIES: [[Capacity; 4]; 40] = [
    [cap(19, 7, 1, 19, 0, 0), cap(16, 10, 1, 16, 0, 0), cap(13, 13, 1, 13, 0, 0), cap(9, 17, 1, 9, 0, 0)], // 1
    [cap(34, 10, 1, 34, 0, 0), cap(28, 16, 1, 28, 0, 0), cap(22, 22, 1, 22, 0, 0), cap(16, 28, 1, 16, 0, 0)], // 2
    [cap(55, 15, 1, 55, 0, 0), cap(44, 26, 1, 44, 0, 0), cap(34, 18, 2, 17, 0, 0), cap(26, 22, 2, 13, 0, 0)], // 3
    [cap(80, 20, 1, 80, 0, 0), cap(64, 18, 2, 32, 0, 0), cap(48, 26, 2, 24, 0, 0), cap(36, 16, 4, 9, 0, 0)], // 4
    [cap(108, 26, 1, 108, 0, 0), cap(86, 24, 2, 43, 0, 0), cap(62, 18, 2, 15, 2, 16), cap(46, 22, 2, 11, 2, 12)], // 5
    [cap(136, 18, 2, 68, 0, 0), cap(108, 16, 4, 27, 0, 0), cap(76, 24, 4, 19, 0, 0), cap(60, 28, 4, 15, 0, 0)], // 6
    [cap(156, 20, 2, 78, 0, 0), cap(124, 18, 4, 31, 0, 0), cap(88, 18, 2, 14, 4, 15), cap(66, 26, 4, 13, 1, 14)], // 7
    [cap(194, 24, 2, 97, 0, 0), cap(154, 22, 2, 38, 2, 39), cap(110, 22, 4, 18, 2, 19), cap(86, 26, 4, 14, 2, 15)], // 8
    [cap(232, 30, 2, 116, 0, 0), cap(182, 22, 3, 36, 2, 37), cap(132, 20, 4, 16, 4, 17), cap(100, 24, 4, 12, 4, 13)], // 9
    [cap(274, 18, 2, 68, 2, 69), cap(216, 26, 4, 43, 1, 44), cap(154, 24, 6, 19, 2, 20), cap(122, 28, 6, 15, 2, 16)], // 10
    [cap(324, 20, 4, 81, 0, 0), cap(254, 30, 1, 50, 4, 51), cap(180, 28, 4, 22, 4, 23), cap(140, 24, 3, 12, 8, 13)], // 11
    [cap(370, 24, 2, 92, 2, 93), cap(290, 22, 6, 36, 2, 37), cap(206, 26, 4, 20, 6, 21), cap(158, 28, 7, 14, 4, 15)], // 12
    [cap(428, 26, 4, 107, 0, 0), cap(334, 22, 8, 37, 1, 38), cap(244, 24, 8, 20, 4, 21), cap(180, 22, 12, 11, 4, 12)], // 13
    [cap(461, 30, 3, 115, 1, 116), cap(365, 24, 4, 40, 5, 41), cap(261, 20, 11, 16, 5, 17), cap(197, 24, 11, 12, 5, 13)], // 14
    [cap(523, 22, 5, 87, 1, 88), cap(415, 24, 5, 41, 5, 42), cap(295, 30, 5, 24, 7, 25), cap(223, 24, 11, 12, 7, 13)], // 15
    [cap(589, 24, 5, 98, 1, 99), cap(453, 28, 7, 45, 3, 46), cap(325, 24, 15, 19, 2, 20), cap(253, 30, 3, 15, 13, 16)], // 16
    [cap(647, 28, 1, 107, 5, 108), cap(507, 28, 10, 46, 1, 47), cap(367, 28, 1, 22, 15, 23), cap(283, 28, 2, 14, 17, 15)], // 17
    [cap(721, 30, 5, 120, 1, 121), cap(563, 26, 9, 43, 4, 44), cap(397, 28, 17, 22, 1, 23), cap(313, 28, 2, 14, 19, 15)], // 18
    [cap(795, 28, 3, 113, 4, 114), cap(627, 26, 3, 44, 11, 45), cap(445, 26, 17, 21, 4, 22), cap(341, 26, 9, 13, 16, 14)], // 19
    [cap(861, 28, 3, 107, 5, 108), cap(669, 26, 3, 41, 13, 42), cap(485, 30, 15, 24, 5, 25), cap(385, 28, 15, 15, 10, 16)], // 20
    [cap(932, 28, 4, 116, 4, 117), cap(714, 26, 17, 42, 0, 0), cap(512, 28, 17, 22, 6, 23), cap(406, 30, 19, 16, 6, 17)], // 21
    [cap(1006, 28, 2, 111, 7, 112), cap(782, 28, 17, 46, 0, 0), cap(568, 30, 7, 24, 16, 25), cap(442, 24, 34, 13, 0, 0)], // 22
    [cap(1094, 30, 4, 121, 5, 122), cap(860, 28, 4, 47, 14, 48), cap(614, 30, 11, 24, 14, 25), cap(464, 30, 16, 15, 14, 16)], // 23
    [cap(1174, 30, 6, 117, 4, 118), cap(914, 28, 6, 45, 14, 46), cap(664, 30, 11, 24, 16, 25), cap(514, 30, 30, 16, 2, 17)], // 24
    [cap(1276, 26, 8, 106, 4, 107), cap(1000, 28, 8, 47, 13, 48), cap(718, 30, 7, 24, 22, 25), cap(538, 30, 22, 15, 13, 16)], // 25
    [cap(1370, 28, 10, 114, 2, 115), cap(1062, 28, 19, 46, 4, 47), cap(754, 28, 28, 22, 6, 23), cap(596, 30, 33, 16, 4, 17)], // 26
    [cap(1468, 30, 8, 122, 4, 123), cap(1128, 28, 22, 45, 3, 46), cap(808, 30, 8, 23, 26, 24), cap(628, 30, 12, 15, 28, 16)], // 27
    [cap(1531, 30, 3, 117, 10, 118), cap(1193, 28, 3, 45, 23, 46), cap(871, 30, 4, 24, 31, 25), cap(661, 30, 11, 15, 31, 16)], // 28
    [cap(1631, 30, 7, 116, 7, 117), cap(1267, 28, 21, 45, 7, 46), cap(911, 30, 1, 23, 37, 24), cap(701, 30, 19, 15, 26, 16)], // 29
    [cap(1735, 30, 5, 115, 10, 116), cap(1373, 28, 19, 47, 10, 48), cap(985, 30, 15, 24, 25, 25), cap(745, 30, 23, 15, 25, 16)], // 30
    [cap(1843, 30, 13, 115, 3, 116), cap(1455, 28, 2, 46, 29, 47), cap(1033, 30, 42, 24, 1, 25), cap(793, 30, 23, 15, 28, 16)], // 31
    [cap(1955, 30, 17, 115, 0, 0), cap(1541, 28, 10, 46, 23, 47), cap(1115, 30, 10, 24, 35, 25), cap(845, 30, 19, 15, 35, 16)], // 32
    [cap(2071, 30, 17, 115, 1, 116), cap(1631, 28, 14, 46, 21, 47), cap(1171, 30, 29, 24, 19, 25), cap(901, 30, 11, 15, 46, 16)], // 33
    [cap(2191, 30, 13, 115, 6, 116), cap(1725, 28, 14, 46, 23, 47), cap(1231, 30, 44, 24, 7, 25), cap(961, 30, 59, 16, 1, 17)], // 34
    [cap(2306, 30, 12, 121, 7, 122), cap(1812, 28, 12, 47, 26, 48), cap(1286, 30, 39, 24, 14, 25), cap(986, 30, 22, 15, 41, 16)], // 35
    [cap(2434, 30, 6, 121, 14, 122), cap(1914, 28, 6, 47, 34, 48), cap(1354, 30, 46, 24, 10, 25), cap(1054, 30, 2, 15, 64, 16)], // 36
    [cap(2566, 30, 17, 122, 4, 123), cap(1992, 28, 29, 46, 14, 47), cap(1426, 30, 49, 24, 10, 25), cap(1096, 30, 24, 15, 46, 16)], // 37
    [cap(2702, 30, 4, 122, 18, 123), cap(2102, 28, 13, 46, 32, 47), cap(1502, 30, 48, 24, 14, 25), cap(1142, 30, 42, 15, 32, 16)], // 38
    [cap(2812, 30, 20, 117, 4, 118), cap(2216, 28, 40, 47, 7, 48), cap(1582, 30, 43, 24, 22, 25), cap(1222, 30, 10, 15, 67, 16)], // 39
    [cap(2956, 30, 19, 118, 6, 119), cap(2334, 28, 18, 47, 31, 48), cap(1666, 30, 34, 24, 34, 25), cap(1276, 30, 20, 15, 61, 16)], // 40
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EcLevel::{H, L, M, Q};

    fn v(n: u8) -> Version {
        Version::new(n).unwrap()
    }

    #[test]
    fn test_capacity_consistency() {
        // Every entry's group structure must add up to its total, and the
        // group 2 blocks must carry exactly one codeword more.
        for version in 1..=40 {
            for level in [L, M, Q, H] {
                let c = capacity(v(version), level).unwrap();
                assert_eq!(
                    c.group1_blocks * c.group1_data + c.group2_blocks * c.group2_data,
                    c.total_data,
                    "version {version} level {level:?}"
                );
                if c.group2_blocks > 0 {
                    assert_eq!(c.group2_data, c.group1_data + 1);
                }
            }
        }
    }

    #[test]
    fn test_generator_poly_known_degree_7() {
        // ISO/IEC 18004 Annex A lists this polynomial's coefficients.
        assert_eq!(
            generator_poly(7),
            vec![0x01, 0x7F, 0x7A, 0x9A, 0xA4, 0x0B, 0x44, 0x75]
        );
    }

    #[test]
    fn test_generator_poly_cache_returns_equal_values() {
        let first = generator_poly(16);
        let second = generator_poly(16);
        assert_eq!(first, second);
        assert_eq!(first.len(), 17);
    }

    #[test]
    fn test_reed_solomon_golden_vector() {
        // The ISO worked example for "01234567" at version 1-M.
        let data = [
            0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11,
            0xEC, 0x11,
        ];
        assert_eq!(
            reed_solomon_encode(&data, 10),
            vec![0xA5, 0x24, 0xD4, 0xC1, 0xED, 0x36, 0xC7, 0x87, 0x2C, 0x55]
        );
    }

    #[test]
    fn test_reed_solomon_length_and_determinism() {
        for ec_count in [7, 10, 13, 30] {
            let data: Vec<u8> = (0u8..50).collect();
            let a = reed_solomon_encode(&data, ec_count);
            let b = reed_solomon_encode(&data, ec_count);
            assert_eq!(a.len(), ec_count);
            assert_eq!(a, b);
        }
        // A remainder naturally shorter than the divisor is left-padded.
        assert_eq!(reed_solomon_encode(&[0], 5), vec![0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_split_blocks_5h() {
        let cap5h = capacity(v(5), H).unwrap();
        let data: Vec<u8> = (0..cap5h.total_data as u8).collect();
        let blocks = split_blocks(&data, v(5), H).unwrap();
        let lens: Vec<usize> = blocks.iter().map(|b| b.data.len()).collect();
        assert_eq!(lens, vec![11, 11, 12, 12]);
        assert!(blocks.iter().all(|b| b.ec_count == 22));
    }

    #[test]
    fn test_split_blocks_rejects_wrong_length() {
        assert_eq!(
            split_blocks(&[0; 10], v(1), M),
            Err(QrError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_construct_codewords_counts() {
        for version in [1u8, 7, 14, 25, 40] {
            for level in [L, M, Q, H] {
                let c = capacity(v(version), level).unwrap();
                let data: Vec<u8> = (0..c.total_data).map(|i| (i % 251) as u8).collect();
                let (dw, ecw) = construct_codewords(&data, v(version), level).unwrap();
                assert_eq!(dw.len(), c.total_data);
                assert_eq!(
                    ecw.len(),
                    c.ec_per_block * (c.group1_blocks + c.group2_blocks)
                );
            }
        }
    }

    #[test]
    fn test_interleaving_order() {
        // Version 5-H: blocks of 11, 11, 12, 12 data codewords. The
        // interleaved stream cycles across blocks, with the longer group 2
        // blocks supplying the trailing codewords alone.
        let c = capacity(v(5), H).unwrap();
        let data: Vec<u8> = (0..c.total_data as u8).collect();
        let (dw, _) = construct_codewords(&data, v(5), H).unwrap();
        assert_eq!(&dw[..4], &[0, 11, 22, 34]);
        assert_eq!(&dw[dw.len() - 2..], &[33, 45]);
    }
}
