/// Marks where the height goes in a version string.
pub const HEIGHT_PLACEHOLDER: &str = "{height}";

/// Separates the numeric version from the prerelease suffix.
pub const SUFFIX_DELIMITER: char = '-';

pub const DIGIT_DELIMITER: char = '.';

/// Combine a version string with a height.
///
/// In priority order: substitute [`HEIGHT_PLACEHOLDER`]; leave versions with
/// two or more dots before the suffix unchanged; insert `.{height}` before
/// the suffix; append `.{height}`.
pub fn format_version(version: &str, height: u32) -> String {
    if version.contains(HEIGHT_PLACEHOLDER) {
        return version.replace(HEIGHT_PLACEHOLDER, &height.to_string());
    }
    match version.find(SUFFIX_DELIMITER) {
        Some(at) => {
            let (numeric, suffix) = version.split_at(at);
            if numeric.matches(DIGIT_DELIMITER).count() >= 2 {
                version.to_string()
            } else {
                format!("{numeric}.{height}{suffix}")
            }
        }
        None => format!("{version}.{height}"),
    }
}
