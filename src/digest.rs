/// Content fingerprint over an ordered list of URLs
use sha2::{Digest, Sha256};

/// Digest of `urls` in the given order.
///
/// The drag collaborator computes the same value when it records
/// [`LastDraggedTabs`](crate::tab_data::LastDraggedTabs), so a batch of
/// created bookmarks can be matched against the drag that produced it.
pub fn urls_digest<S: AsRef<str>>(urls: &[S]) -> String {
    let mut hasher = Sha256::new();
    for (i, url) in urls.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(url.as_ref().as_bytes());
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
