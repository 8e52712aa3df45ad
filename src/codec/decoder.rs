//! Incremental UTF-8 decoding.

/// Decodes a stream of byte chunks into text.
///
/// A multi-byte character split across chunks is held back until the rest
/// of it arrives. Invalid sequences become U+FFFD; decoding never fails.
#[derive(Debug, Default)]
pub struct ByteDecoder {
    pending: Vec<u8>,
}

impl ByteDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, prefixed by any bytes held back from the last call.
    ///
    /// With `last == false` an incomplete trailing sequence is kept for the
    /// next call. With `last == true` it is flushed as U+FFFD.
    pub fn decode(&mut self, chunk: &[u8], last: bool) -> String {
        let joined;
        let mut input: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            joined = buf;
            &joined
        };

        let mut out = String::with_capacity(input.len());
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    // `valid_up_to` marks a verified UTF-8 prefix.
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[bad..];
                        }
                        None => {
                            if last {
                                out.push(char::REPLACEMENT_CHARACTER);
                            } else {
                                self.pending.extend_from_slice(rest);
                            }
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush held-back bytes at end of stream.
    pub fn finish(&mut self) -> String {
        self.decode(&[], true)
    }

    /// Whether bytes of an incomplete character are held back.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        let mut decoder = ByteDecoder::new();
        assert_eq!(decoder.decode(b"event: done\n", false), "event: done\n");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn split_multibyte_character_is_held_back() {
        let bytes = "héllo €".as_bytes();
        let mut decoder = ByteDecoder::new();
        let mut text = String::new();
        for byte in bytes {
            text.push_str(&decoder.decode(std::slice::from_ref(byte), false));
        }
        text.push_str(&decoder.finish());
        assert_eq!(text, "héllo €");
    }

    #[test]
    fn partial_euro_sign_waits_for_rest() {
        let euro = "€".as_bytes();
        let mut decoder = ByteDecoder::new();
        assert_eq!(decoder.decode(&euro[..2], false), "");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(&euro[2..], false), "€");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn invalid_bytes_become_replacement_characters() {
        let mut decoder = ByteDecoder::new();
        assert_eq!(decoder.decode(b"a\xffb", false), "a\u{FFFD}b");
    }

    #[test]
    fn truncated_tail_is_replaced_on_final_call() {
        let mut decoder = ByteDecoder::new();
        assert_eq!(decoder.decode(b"ok\xe2\x82", false), "ok");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert!(!decoder.has_pending());
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn invalid_sequence_split_across_chunks_matches_whole() {
        let whole = ByteDecoder::new().decode(b"\xe2\x82A", true);
        let mut split = ByteDecoder::new();
        let mut text = split.decode(b"\xe2", false);
        text.push_str(&split.decode(b"\x82A", true));
        assert_eq!(text, whole);
    }
}
