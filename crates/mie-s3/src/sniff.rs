//! Content-type detection from the first bytes of a file.

/// Bytes read from the head of a file before sniffing.
pub const SNIFF_LEN: usize = 512;

const OCTET_STREAM: &str = "application/octet-stream";

/// Best-effort MIME type: magic numbers first, then the file extension.
pub fn sniff_content_type(head: &[u8], file_name: &str) -> String {
    if let Some(mime) = from_magic(head) {
        return mime.to_string();
    }
    mime_guess::from_path(file_name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

fn from_magic(head: &[u8]) -> Option<&'static str> {
    // ISO base media: size(4) + "ftyp" + major brand(4).
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return Some(match &head[8..12] {
            b"qt  " => "video/quicktime",
            b"M4A " | b"M4B " => "audio/mp4",
            _ => "video/mp4",
        });
    }
    if head.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        let doc_type_webm = head.windows(4).any(|w| w == b"webm");
        return Some(if doc_type_webm {
            "video/webm"
        } else {
            "video/x-matroska"
        });
    }
    if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if head.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if head.len() >= 12 && head.starts_with(b"RIFF") {
        match &head[8..12] {
            b"WEBP" => return Some("image/webp"),
            b"AVI " => return Some("video/x-msvideo"),
            b"WAVE" => return Some("audio/wav"),
            _ => {}
        }
    }
    if head.starts_with(b"OggS") {
        return Some("application/ogg");
    }
    if head.starts_with(b"ID3") || (head.len() >= 2 && head[0] == 0xFF && head[1] & 0xE0 == 0xE0)
    {
        return Some("audio/mpeg");
    }
    if head.starts_with(b"fLaC") {
        return Some("audio/flac");
    }
    None
}
