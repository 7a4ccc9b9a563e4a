// Import mime-walker types.
use mime_walker::source::ReadSource;
use mime_walker::Parser;
use std::fs::File;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Take the path of a raw message, e.g. an `.eml` file saved by a mail client.
    let path = std::env::args().nth(1).ok_or("usage: parse_file <message.eml>")?;

    // The file is read in 8 KiB chunks as the parser asks for them.
    let mut parser = Parser::with_source(ReadSource::new(File::open(&path)?));
    let parts = parser.parse()?;

    if let Some(root) = parts.root() {
        if let Some(subject) = root.header().headers().get("subject") {
            println!("Subject: {}", String::from_utf8_lossy(subject.as_bytes()));
        }
    }

    for part in parts {
        let span = part.span();
        println!(
            "{:<12} {:<40} {:>8} bytes  encoding: {:?}  disposition: {:?}",
            part.number(),
            part.content_type().to_string(),
            span.len(),
            part.transfer_encoding(),
            part.disposition(),
        );
    }

    Ok(())
}
