//! Huffman-coded base item codes (D2R item records)
//!
//! Each symbol's code is listed in stream order: the first character is the
//! first bit read.

use crate::bits::{BitReader, BitWriter};
use crate::{Error, Result};

const TABLE: [(char, &str); 37] = [
    (' ', "10"),
    ('0', "11111011"),
    ('1', "1111100"),
    ('2', "001100"),
    ('3', "1101101"),
    ('4', "11111010"),
    ('5', "00010110"),
    ('6', "1101111"),
    ('7', "01111"),
    ('8', "000100"),
    ('9', "01110"),
    ('a', "11110"),
    ('b', "0101"),
    ('c', "01000"),
    ('d', "110001"),
    ('e', "110000"),
    ('f', "010011"),
    ('g', "11010"),
    ('h', "00011"),
    ('i', "1111110"),
    ('j', "000101110"),
    ('k', "010010"),
    ('l', "11101"),
    ('m', "01101"),
    ('n', "001101"),
    ('o', "1111111"),
    ('p', "11001"),
    ('q', "11011001"),
    ('r', "11100"),
    ('s', "0010"),
    ('t', "01100"),
    ('u', "00001"),
    ('v', "1101110"),
    ('w', "00000"),
    ('x', "00111"),
    ('y', "0001010"),
    ('z', "11011000"),
];

const MAX_CODE_LEN: usize = 9;

pub(crate) fn read_symbol(reader: &mut BitReader<'_>) -> Result<char> {
    let start = reader.tell();
    let mut path = String::with_capacity(MAX_CODE_LEN);

    while path.len() < MAX_CODE_LEN {
        path.push(if reader.read_bit()? { '1' } else { '0' });
        if let Some(&(symbol, _)) = TABLE.iter().find(|(_, code)| *code == path) {
            return Ok(symbol);
        }
    }

    Err(Error::CorruptItemRecord {
        offset: start,
        reason: format!("no item code symbol for bits {path}"),
    })
}

pub(crate) fn write_symbol(writer: &mut BitWriter, symbol: char) -> Result<()> {
    let (_, code) = TABLE
        .iter()
        .find(|(c, _)| *c == symbol)
        .ok_or_else(|| Error::InvalidDocument(format!("{symbol:?} has no item code symbol")))?;

    for bit in code.chars() {
        writer.write_bit(bit == '1')?;
    }
    Ok(())
}
