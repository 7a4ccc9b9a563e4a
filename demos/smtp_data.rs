// Import mime-walker types.
use mime_walker::source;
use mime_walker::Parser;
use std::thread;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The parser runs next to the session and asks for a chunk whenever it runs dry.
    let (feeder, handoff) = source::handoff();

    let parser = thread::spawn(move || {
        let mut parser = Parser::with_source(handoff);
        parser.parse().map(|parts| parts.clone())
    });

    // Stand-in for an SMTP session receiving DATA line by line.
    for line in get_data_lines_from_somewhere() {
        if !feeder.feed(line) {
            // The parser stopped early, most likely on a malformed message.
            break;
        }
    }
    feeder.finish();

    let parts = parser.join().map_err(|_| "parser thread panicked")??;

    for part in &parts {
        println!("{} {}", part.number(), part.content_type());
    }

    Ok(())
}

// Generate the lines of a DATA command from somewhere e.g. an SMTP connection.
fn get_data_lines_from_somewhere() -> Vec<&'static str> {
    vec![
        "From: sender@example.com\r\n",
        "To: rcpt@example.com\r\n",
        "Subject: report\r\n",
        "Content-Type: multipart/mixed; boundary=\"X-BOUNDARY\"\r\n",
        "\r\n",
        "--X-BOUNDARY\r\n",
        "Content-Type: text/plain; charset=utf-8\r\n",
        "\r\n",
        "See the attached report.\r\n",
        "--X-BOUNDARY\r\n",
        "Content-Type: text/csv; name=\"report.csv\"\r\n",
        "Content-Disposition: attachment; filename=\"report.csv\"\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "\r\n",
        "YSxiLGMKMSwyLDMK\r\n",
        "--X-BOUNDARY--\r\n",
    ]
}
