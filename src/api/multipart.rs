//! `multipart/form-data` request bodies.
//!
//! `ureq` 2 sends raw bytes only, so the analysis upload body is assembled
//! here. Only file parts and plain text parts are supported.

use std::path::Path;

/// Builder for a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    buf: Vec<u8>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    /// A body with a random boundary.
    pub fn new() -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        Self::with_boundary(format!("----govdoc{token}"))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            buf: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn add_text(&mut self, field: &str, value: &str) {
        self.open_part();
        self.push_line(&format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape(field)
        ));
        self.push_line("");
        self.buf.extend_from_slice(value.as_bytes());
        self.push_line("");
    }

    pub fn add_file(&mut self, field: &str, file_name: &str, data: &[u8]) {
        self.open_part();
        self.push_line(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
            escape(field),
            escape(file_name)
        ));
        self.push_line(&format!("Content-Type: {}", mime_for(file_name)));
        self.push_line("");
        self.buf.extend_from_slice(data);
        self.push_line("");
    }

    /// Close the body and return its bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.buf
    }

    fn open_part(&mut self) {
        let line = format!("--{}", self.boundary);
        self.push_line(&line);
    }

    fn push_line(&mut self, line: &str) {
        self.buf.extend_from_slice(line.as_bytes());
        self.buf.extend_from_slice(b"\r\n");
    }
}

/// MIME type for the upload types the service accepts.
pub fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn escape(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_file_and_text_parts() {
        let mut body = MultipartBody::with_boundary("XYZ");
        body.add_text("note", "hello");
        body.add_file("gst_file", "gst.pdf", b"%PDF");
        let bytes = body.finish();

        let expected = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"note\"\r\n\
            \r\n\
            hello\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"gst_file\"; filename=\"gst.pdf\"\r\n\
            Content-Type: application/pdf\r\n\
            \r\n\
            %PDF\r\n\
            --XYZ--\r\n";
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }

    #[test]
    fn empty_body_is_just_the_terminator() {
        let body = MultipartBody::with_boundary("b");
        assert_eq!(body.finish(), b"--b--\r\n");
    }

    #[test]
    fn content_type_names_boundary() {
        let body = MultipartBody::new();
        assert_eq!(
            body.content_type(),
            format!("multipart/form-data; boundary={}", body.boundary())
        );
        assert!(body.boundary().starts_with("----govdoc"));
    }

    #[test]
    fn quotes_in_file_names_are_escaped() {
        let mut body = MultipartBody::with_boundary("b");
        body.add_file("file", "a\"b.png", b"");
        let text = String::from_utf8(body.finish()).unwrap();
        assert!(text.contains("filename=\"a%22b.png\""));
        assert!(text.contains("Content-Type: image/png"));
    }

    #[test]
    fn mime_types_by_extension() {
        assert_eq!(mime_for("scan.JPG"), "image/jpeg");
        assert_eq!(mime_for("scan.jpeg"), "image/jpeg");
        assert_eq!(mime_for("notes.txt"), "application/octet-stream");
        assert_eq!(mime_for("noext"), "application/octet-stream");
    }
}
