//! Message padding and input-binding generation.
//!
//! Single-block SHA-256 padding only: up to 55 message bytes, then `0x80`,
//! zero fill, and the bit length as a 64-bit big-endian trailer. A byte
//! may be unknown (`?` in ASCII form, `XX` in hex form); unknown bytes
//! flow through padding untouched and expand to `X` bits downstream.

use itertools::Itertools;
use nandgraph_core::{binding::WordBinding, label};

use crate::error::Error;

/// Longest message that still fits a single padded block.
pub const MAX_MESSAGE_BYTES: usize = 55;

/// A message byte; `None` is the unknown byte.
pub type MessageByte = Option<u8>;

/// ASCII form: every byte stands for itself, `?` marks an unknown byte.
pub fn parse_ascii(text: &str) -> Vec<MessageByte> {
	text.bytes()
		.map(|byte| if byte == b'?' { None } else { Some(byte) })
		.collect()
}

/// Hex form: two characters per byte, `XX` (or `??`) marks an unknown
/// byte. Spaces and a leading `0x` are tolerated; an odd-length string is
/// zero-extended on the left.
pub fn parse_hex(text: &str) -> Result<Vec<MessageByte>, Error> {
	let cleaned: String = text
		.trim()
		.trim_start_matches("0x")
		.trim_start_matches("0X")
		.chars()
		.filter(|c| !c.is_whitespace())
		.collect();
	let padded = if cleaned.len() % 2 == 1 {
		format!("0{cleaned}")
	} else {
		cleaned
	};
	padded
		.chars()
		.tuples()
		.map(|(hi, lo)| {
			let pair: String = [hi, lo].iter().collect();
			if pair.eq_ignore_ascii_case("xx") || pair == "??" {
				return Ok(None);
			}
			u8::from_str_radix(&pair, 16)
				.map(Some)
				.map_err(|_| Error::BadHexByte { pair })
		})
		.collect()
}

/// Pads a message into one 512-bit block.
pub fn pad_block(message: &[MessageByte]) -> Result<[MessageByte; 64], Error> {
	if message.len() > MAX_MESSAGE_BYTES {
		return Err(Error::MessageTooLong { len: message.len() });
	}
	let mut block = [Some(0u8); 64];
	block[..message.len()].copy_from_slice(message);
	block[message.len()] = Some(0x80);
	let bit_len = (message.len() as u64) * 8;
	for (i, byte) in bit_len.to_be_bytes().into_iter().enumerate() {
		block[56 + i] = Some(byte);
	}
	Ok(block)
}

/// Packs a padded block into the sixteen big-endian input-word bindings.
pub fn input_bindings(block: &[MessageByte; 64]) -> Vec<WordBinding> {
	(0..16)
		.map(|i| WordBinding {
			label: label::input_word(i as u32),
			bytes: [
				block[i * 4],
				block[i * 4 + 1],
				block[i * 4 + 2],
				block[i * 4 + 3],
			],
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use nandgraph_core::Word32;

	use super::*;

	fn block_words(message: &[MessageByte]) -> [Word32; 16] {
		let block = pad_block(message).unwrap();
		let bindings = input_bindings(&block);
		std::array::from_fn(|i| bindings[i].value().unwrap())
	}

	#[test]
	fn pads_the_empty_message() {
		let words = block_words(&[]);
		assert_eq!(words[0], Word32(0x8000_0000));
		assert_eq!(words[15], Word32(0));
		for w in &words[1..15] {
			assert_eq!(*w, Word32(0));
		}
	}

	#[test]
	fn pads_abc_like_the_standard_says() {
		// The FIPS 180-4 worked example: "abc" is 24 bits.
		let words = block_words(&parse_ascii("abc"));
		assert_eq!(words[0], Word32(0x6162_6380));
		assert_eq!(words[15], Word32(24));
	}

	#[test]
	fn rejects_oversized_messages() {
		let long = vec![Some(0u8); 56];
		assert!(matches!(pad_block(&long), Err(Error::MessageTooLong { len: 56 })));
		assert!(pad_block(&vec![Some(0u8); 55]).is_ok());
	}

	#[test]
	fn unknown_bytes_survive_padding() {
		let message = parse_ascii("a?c");
		let block = pad_block(&message).unwrap();
		assert_eq!(block[0], Some(b'a'));
		assert_eq!(block[1], None);
		let bindings = input_bindings(&block);
		assert_eq!(bindings[0].value(), None);
		assert!(!bindings[0].bit(8).is_known());
	}

	#[test]
	fn hex_parsing_handles_unknowns_and_prefixes() {
		assert_eq!(parse_hex("0x6a09").unwrap(), vec![Some(0x6a), Some(0x09)]);
		assert_eq!(parse_hex("6aXX09").unwrap(), vec![Some(0x6a), None, Some(0x09)]);
		assert_eq!(parse_hex("f").unwrap(), vec![Some(0x0f)]);
		assert!(matches!(parse_hex("6g"), Err(Error::BadHexByte { .. })));
	}
}
