//! Helper utilities.

/// Returns the kernel memory page size in bytes.
///
/// Queried once at collector construction and used to convert sockstat's
/// page-count `mem` field into bytes.
pub fn page_size() -> u64 {
    // SAFETY: sysconf is thread-safe for this query and has no side effects.
    match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        -1 => 4096, // common default when sysconf cannot answer
        ps => ps as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_sane() {
        let ps = page_size();
        // Power of two, at least 4 KiB on every platform we run on.
        assert!(ps >= 4096);
        assert_eq!(ps & (ps - 1), 0);
    }
}
