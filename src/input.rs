use std::fs::File;
use std::io::{self, BufReader, IsTerminal, Read};
use std::path::Path;

use anyhow::Context;

fn is_zstd(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("zst")
}

/// Read all PGN text from a reader. Invalid UTF-8 is replaced rather than rejected.
pub fn read_pgn<R: Read>(mut reader: R) -> io::Result<String> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Read a .pgn file, decompressing on the fly when it ends in .zst.
pub fn read_file(path: &Path) -> anyhow::Result<String> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(f);
    let text = if is_zstd(path) {
        let decoder = zstd::stream::Decoder::new(reader)
            .with_context(|| format!("zstd decoder for {}", path.display()))?;
        read_pgn(decoder)
    } else {
        read_pgn(reader)
    };
    text.with_context(|| format!("reading {}", path.display()))
}

/// Read stdin, or None when it is an interactive terminal (nothing piped in).
pub fn read_stdin() -> anyhow::Result<Option<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let text = read_pgn(stdin.lock()).context("reading stdin")?;
    Ok(Some(text))
}
