//! # Line Translation
//!
//! Rewrites a completed line under the fixed editing policy. `translate` is a
//! pure function: it reads the logical content of the input frame and builds a
//! fresh zero-padded frame of the same capacity.
//!
//! Erase removes exactly one previously written byte. On an empty output it
//! does nothing, so a line can never be driven below index zero.

use log::debug;

use crate::core::frame::Frame;
use crate::core::marker::EditUnit;

pub fn translate(input: &Frame) -> Frame {
    let mut output = Frame::new(input.capacity());
    let mut index = 0usize;

    for &byte in input.content() {
        match EditUnit::classify(byte) {
            EditUnit::Write(out) => {
                output.set(index, out);
                index += 1;
            }
            EditUnit::Erase => {
                if index == 0 {
                    debug!("Erase at start of line ignored");
                    continue;
                }
                index -= 1;
                output.set(index, 0);
            }
            EditUnit::KillLine => {
                output.clear();
                index = 0;
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(line: &[u8]) -> Vec<u8> {
        let output = translate(&Frame::from_content(line, 64));
        assert!(output.is_zero_padded());
        assert_eq!(output.capacity(), 64);
        output.content().to_vec()
    }

    #[test]
    fn test_rewrites_a_to_z() {
        assert_eq!(run(b"caf"), b"czf");
    }

    #[test]
    fn test_copies_other_bytes() {
        assert_eq!(run(b"hello, world!"), b"hello, world!");
    }

    #[test]
    fn test_erase_drops_previous_output_byte() {
        assert_eq!(run(b"abX"), b"z");
    }

    #[test]
    fn test_erase_drops_rewritten_byte() {
        assert_eq!(run(b"baX"), b"b");
    }

    #[test]
    fn test_erase_then_continue() {
        assert_eq!(run(b"abXc"), b"zc");
        assert_eq!(run(b"abcXXd"), b"zd");
    }

    #[test]
    fn test_erase_at_start_is_noop() {
        assert_eq!(run(b"Xa"), b"z");
        assert_eq!(run(b"XXX"), b"");
        assert_eq!(run(b"bXXc"), b"c");
    }

    #[test]
    fn test_kill_line_keeps_only_what_follows() {
        assert_eq!(run(b"aKb"), b"b");
        assert_eq!(run(b"abcK"), b"");
        assert_eq!(run(b"KKa"), b"z");
    }

    #[test]
    fn test_erase_after_kill_line_is_noop() {
        assert_eq!(run(b"abKXc"), b"c");
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(run(b""), b"");
    }

    #[test]
    fn test_full_frame_without_terminator() {
        let input = Frame::from_content(b"aaaa", 4);
        let output = translate(&input);
        assert_eq!(output.content(), b"zzzz");
    }

    #[test]
    fn test_translate_is_pure() {
        let input = Frame::from_content(b"aKbXca", 16);
        let first = translate(&input);
        let _ = translate(&Frame::from_content(b"zzzzzzzzzzzzzzz", 16));
        let second = translate(&input);
        assert_eq!(first, second);
        assert_eq!(first.content(), b"cz");
    }
}
