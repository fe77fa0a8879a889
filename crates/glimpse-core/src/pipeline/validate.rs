//! Upload validation before anything touches the disk.

use unicode_normalization::UnicodeNormalization;

use crate::config::ServerConfig;

/// Reasons an upload is refused before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    /// The client sent a file part with an empty filename
    EmptyFilename,
    /// The extension is not in the allow-list, or the name sanitizes away
    InvalidFormat,
}

/// Validates upload filenames against the configured extension allow-list.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    allowed_extensions: Vec<String>,
}

impl UploadValidator {
    /// Create a validator from the server settings.
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_extensions(config.allowed_extensions.iter().cloned())
    }

    /// Create a validator from an explicit extension list.
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_extensions: extensions
                .into_iter()
                .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether the filename carries an allowed extension (case-insensitive).
    pub fn is_allowed(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|allowed| *allowed == ext)
            }
            None => false,
        }
    }

    /// Check a client-supplied filename and return the name to store it under.
    pub fn validate(&self, filename: &str) -> Result<String, UploadRejection> {
        if filename.is_empty() {
            return Err(UploadRejection::EmptyFilename);
        }
        if !self.is_allowed(filename) {
            return Err(UploadRejection::InvalidFormat);
        }
        let sanitized = secure_filename(filename);
        if sanitized.is_empty() || !self.is_allowed(&sanitized) {
            return Err(UploadRejection::InvalidFormat);
        }
        Ok(sanitized)
    }
}

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "LPT1", "LPT2", "LPT3",
];

/// Reduce a client-supplied filename to a safe, flat ASCII name.
///
/// The name is NFKD-decomposed so accented letters keep their base letter,
/// remaining non-ASCII characters are dropped, path separators become whitespace,
/// whitespace runs collapse to `_`, anything outside `[A-Za-z0-9_.-]` is
/// removed and leading/trailing `.`/`_` are stripped. The result never
/// contains a path separator and may be empty.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .nfkd()
        .filter(|c| c.is_ascii())
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    let stem = trimmed.split('.').next().unwrap_or_default();
    if WINDOWS_DEVICE_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(stem))
    {
        format!("_{trimmed}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> UploadValidator {
        UploadValidator::new(&ServerConfig::default())
    }

    #[test]
    fn test_allowed_extensions_case_insensitive() {
        let v = validator();
        assert!(v.is_allowed("cat.jpg"));
        assert!(v.is_allowed("cat.JPEG"));
        assert!(v.is_allowed("archive.tar.png"));
        assert!(!v.is_allowed("notes.txt"));
        assert!(!v.is_allowed("jpg"));
        assert!(!v.is_allowed("cat."));
    }

    #[test]
    fn test_validate_rejections() {
        let v = validator();
        assert_eq!(v.validate(""), Err(UploadRejection::EmptyFilename));
        assert_eq!(v.validate("notes.txt"), Err(UploadRejection::InvalidFormat));
        // Sanitizes down to "jpg", which has no extension left
        assert_eq!(v.validate("..jpg"), Err(UploadRejection::InvalidFormat));
    }

    #[test]
    fn test_validate_returns_sanitized_name() {
        let v = validator();
        assert_eq!(v.validate("My Cat.PNG").unwrap(), "My_Cat.PNG");
        assert_eq!(v.validate("../../etc/passwd.jpg").unwrap(), "etc_passwd.jpg");
    }

    #[test]
    fn test_secure_filename_rules() {
        assert_eq!(secure_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("i contain cool \u{fc}ml\u{e4}uts.txt"), "i_contain_cool_umlauts.txt");
        assert_eq!(secure_filename("C:\\photos\\beach.jpg"), "C_photos_beach.jpg");
        assert_eq!(secure_filename("__init__.png"), "init__.png");
        assert_eq!(secure_filename("\u{65e5}\u{672c}"), "");
    }

    #[test]
    fn test_secure_filename_keeps_base_letters() {
        assert_eq!(secure_filename("caf\u{e9}.jpg"), "cafe.jpg");
        // Already-decomposed input gives the same result
        assert_eq!(secure_filename("cafe\u{301}.jpg"), "cafe.jpg");
        // Compatibility forms fold to ASCII
        assert_eq!(secure_filename("\u{ff21}\u{ff22}.png"), "AB.png");
        assert_eq!(validator().validate("Cr\u{e8}me Br\u{fb}l\u{e9}e.JPG").unwrap(), "Creme_Brulee.JPG");
    }

    #[test]
    fn test_secure_filename_windows_device_names() {
        assert_eq!(secure_filename("con.jpg"), "_con.jpg");
        assert_eq!(secure_filename("LPT1"), "_LPT1");
        assert_eq!(secure_filename("console.jpg"), "console.jpg");
    }

    #[test]
    fn test_custom_extension_list_normalized() {
        let v = UploadValidator::with_extensions([".WEBP"]);
        assert!(v.is_allowed("a.webp"));
        assert!(!v.is_allowed("a.png"));
    }
}
