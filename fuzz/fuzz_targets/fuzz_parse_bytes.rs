#![no_main]

use libfuzzer_sys::fuzz_target;
use mime_walker::bytes::Bytes;
use mime_walker::Parser;

fuzz_target!(|data: &[u8]| {
    // The first byte picks a chunk size so that delimiters land on chunk edges.
    let (size, message) = match data.split_first() {
        Some((&size, message)) => (usize::from(size).max(1), message),
        None => return,
    };

    let mut parser = Parser::new();
    parser.inject(message.chunks(size).map(Bytes::copy_from_slice));

    if let Ok(parts) = parser.parse() {
        for part in parts {
            let span = part.span();
            assert!(span.start <= span.end);
            assert!(span.end <= message.len() as u64);
        }
    }
});
