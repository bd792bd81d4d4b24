/// `Content-Type` by file extension, per spec.md §6. Unknown extensions
/// fall back to `text/plain`.
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/x-javascript",
        "json" => "application/json",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "png" => "image/png",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tif",
        "ppm" => "image/ppm",
        _ => "text/plain",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_map_to_their_mime_type() {
        assert_eq!(content_type_for("html"), "text/html");
        assert_eq!(content_type_for("JPG"), "image/jpeg");
        assert_eq!(content_type_for("png"), "image/png");
        assert_eq!(content_type_for("json"), "application/json");
    }

    #[test]
    fn unknown_extension_falls_back_to_text_plain() {
        assert_eq!(content_type_for("xyz"), "text/plain");
        assert_eq!(content_type_for(""), "text/plain");
    }
}
