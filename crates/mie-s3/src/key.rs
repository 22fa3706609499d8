/// Object key for `file_name` under `prefix`.
///
/// An empty prefix puts the object at the bucket root; a trailing `/` on the
/// prefix is not doubled.
pub fn object_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{prefix}/{file_name}")
    }
}
