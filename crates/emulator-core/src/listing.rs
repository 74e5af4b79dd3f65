//! Machine-code listings and the program image loader.
//!
//! A listing is the machine-code interchange format: one line per word,
//! `address hex-word source-text`, where only the second field is
//! machine-read. An executable program is two listings, data then text,
//! concatenated into one image from address zero. The first data word is
//! reserved for the entry address of the text section.

use std::fmt;

use crate::fault::Fault;
use crate::word::Word;

/// One listing line: a placed word plus the source text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ListingEntry {
    /// Memory address the word loads at.
    pub address: usize,
    /// The encoded word.
    pub word: Word,
    /// Human-readable rendering, ignored by the loader.
    pub source: String,
}

impl fmt::Display for ListingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.address, self.word, self.source)
    }
}

/// Parses the words out of a listing.
///
/// Blank lines are skipped; every other line must carry at least an
/// address field and a 20-digit hex word.
///
/// # Errors
///
/// Returns [`Fault::MalformedListing`] naming the first bad line.
pub fn parse_listing(text: &str) -> Result<Vec<Word>, Fault> {
    let mut words = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(_address) = fields.next() else {
            continue;
        };
        let Some(hex) = fields.next() else {
            return Err(Fault::MalformedListing {
                line: index + 1,
                reason: "missing machine word field".to_owned(),
            });
        };
        let word = Word::from_hex(hex).map_err(|_| Fault::MalformedListing {
            line: index + 1,
            reason: format!("{hex:?} is not a 20-digit hex word"),
        })?;
        words.push(word);
    }
    Ok(words)
}

/// A loaded program: the flat word image plus its entry address.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ProgramImage {
    /// Words laid down from address zero.
    pub words: Vec<Word>,
    /// Address of the first instruction.
    pub entry: i32,
}

impl ProgramImage {
    /// Builds an image from already-decoded words. The entry address is
    /// the payload of word zero.
    #[must_use]
    pub fn from_words(words: Vec<Word>) -> Self {
        let entry = words.first().map_or(0, |word| word.payload());
        Self { words, entry }
    }

    /// Loads an image from its data and text listings.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::MalformedListing`] for an unparsable line, or for
    /// a data listing with no entry word.
    pub fn from_listings(data: &str, text: &str) -> Result<Self, Fault> {
        let mut words = parse_listing(data)?;
        if words.is_empty() {
            return Err(Fault::MalformedListing {
                line: 1,
                reason: "data listing has no entry word".to_owned(),
            });
        }
        words.extend(parse_listing(text)?);
        Ok(Self::from_words(words))
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_listing, ListingEntry, ProgramImage};
    use crate::fault::Fault;
    use crate::word::Word;

    #[test]
    fn entry_renders_as_three_fields() {
        let entry = ListingEntry {
            address: 3,
            word: Word::data(5),
            source: "5".to_owned(),
        };
        assert_eq!(entry.to_string(), "3 00000000005000000000 5");
    }

    #[test]
    fn parser_reads_the_second_field_only() {
        let listing = "0 00000000002000000000 2\n\n1 01100000000000000005 add %rax 5\n";
        let words = parse_listing(listing).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].payload(), 2);
    }

    #[test]
    fn parser_reports_bad_lines_by_number() {
        assert_eq!(
            parse_listing("0 00000000002000000000 2\n1 nonsense x"),
            Err(Fault::MalformedListing {
                line: 2,
                reason: "\"nonsense\" is not a 20-digit hex word".to_owned(),
            })
        );
        assert!(matches!(
            parse_listing("onlyaddress"),
            Err(Fault::MalformedListing { line: 1, .. })
        ));
    }

    #[test]
    fn image_concatenates_data_then_text() {
        let data = "0 00000000002000000000 2\n1 00000000000000000000 0\n";
        let text = "2 01100000000000000005 add %rax 5\n";
        let image = ProgramImage::from_listings(data, text).unwrap();
        assert_eq!(image.words.len(), 3);
        assert_eq!(image.entry, 2);
    }

    #[test]
    fn empty_data_listing_is_rejected() {
        assert!(matches!(
            ProgramImage::from_listings("", "2 01100000000000000005 add %rax 5"),
            Err(Fault::MalformedListing { .. })
        ));
    }
}
