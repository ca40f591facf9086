//! Remote path helpers
//!
//! Remote SFTP paths always use `/` as separator, whatever the local OS.

/// Base name of a remote path, ignoring trailing separators.
///
/// # Examples
/// ```
/// use remotefile::sftp::path_utils::remote_file_name;
/// assert_eq!(remote_file_name("/etc/app/app.conf"), "app.conf");
/// assert_eq!(remote_file_name("/var/log/"), "log");
/// assert_eq!(remote_file_name("notes.txt"), "notes.txt");
/// assert_eq!(remote_file_name("/"), "/");
/// ```
pub fn remote_file_name(path: &str) -> String {
    match path.trim_end_matches('/').rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ if path.starts_with('/') => "/".to_string(),
        _ => ".".to_string(),
    }
}

/// Parse an octal mode string ("0644", "755").
pub fn parse_octal_mode(mode: &str) -> Option<u32> {
    let mode = mode.trim();
    if mode.is_empty() || !mode.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return None;
    }
    u32::from_str_radix(mode, 8).ok().filter(|m| *m <= 0o7777)
}
